//! CLI entry point for the notesmith pipeline.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::Parser;
use notesmith_core::{
    app_data_dir, load_config, load_items, save_config, status, ChunkSizePolicy, ContentItem,
    NotePipeline, NoteRequest, NoteStore, PipelineMode, TimeWindow,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "notesmith")]
#[command(about = "notesmith: educational notes from screen and audio captures")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Show backend status and the effective config.
    Status,
    /// Show where notesmith stores its config and notes (app data directory).
    DataDir,
    /// Inspect or change persisted settings.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Generate one note from captured items.
    Generate(GenerateArgs),
    /// Work with saved notes.
    Notes {
        #[command(subcommand)]
        action: NotesAction,
    },
}

#[derive(clap::Subcommand)]
enum ConfigAction {
    /// Print the config as TOML.
    Show,
    /// Set the generation model.
    SetModel {
        #[arg(value_name = "MODEL")]
        model: String,
    },
    /// Set the default custom prompt.
    SetPrompt {
        #[arg(value_name = "PROMPT")]
        prompt: String,
    },
}

#[derive(clap::Args)]
struct GenerateArgs {
    /// Capture JSON file, or a directory of them.
    #[arg(long, short, value_name = "PATH")]
    input: PathBuf,
    /// What the notes should focus on. Falls back to the configured prompt.
    #[arg(long, short)]
    prompt: Option<String>,
    /// Label titles are ranked against when merging (defaults to the prompt).
    #[arg(long)]
    label: Option<String>,
    /// Window start (RFC 3339). Defaults to the earliest item timestamp.
    #[arg(long)]
    start: Option<DateTime<Utc>>,
    /// Window end (RFC 3339). Defaults to the latest item timestamp.
    #[arg(long)]
    end: Option<DateTime<Utc>>,
    #[arg(long, value_parser = parse_mode)]
    mode: Option<PipelineMode>,
    #[arg(long, value_parser = parse_policy)]
    chunk_policy: Option<ChunkSizePolicy>,
    #[arg(long)]
    max_chunk_size: Option<usize>,
    /// Generation calls in flight at once.
    #[arg(long)]
    concurrency: Option<usize>,
    #[arg(long)]
    model: Option<String>,
    /// Skip near-duplicate removal.
    #[arg(long)]
    no_dedup: bool,
    /// Save the note to the local store.
    #[arg(long)]
    save: bool,
}

#[derive(clap::Subcommand)]
enum NotesAction {
    /// List saved notes, optionally only those with a tag.
    List {
        #[arg(long)]
        tag: Option<String>,
    },
    /// Print one note as JSON.
    Show { id: u64 },
    Delete { id: u64 },
}

fn parse_mode(s: &str) -> Result<PipelineMode, String> {
    match s {
        "ocr-text" => Ok(PipelineMode::OcrText),
        "structured-items" => Ok(PipelineMode::StructuredItems),
        other => Err(format!("unknown mode {other:?} (ocr-text | structured-items)")),
    }
}

fn parse_policy(s: &str) -> Result<ChunkSizePolicy, String> {
    match s {
        "words" => Ok(ChunkSizePolicy::Words),
        "chars" => Ok(ChunkSizePolicy::Chars),
        other => Err(format!("unknown chunk policy {other:?} (words | chars)")),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,notesmith_core=debug".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Status) {
        Commands::Status => {
            println!("notesmith backend");
            println!("  core: {}", status());
            let config = load_config();
            println!("  model: {} (embeddings: {})", config.model, config.embed_model);
            println!("  ollama: {}", config.ollama_url);
        }
        Commands::DataDir => match app_data_dir() {
            Some(p) => println!("{}", p.display()),
            None => eprintln!("Could not determine app data directory."),
        },
        Commands::Config { action } => run_config(action)?,
        Commands::Generate(args) => run_generate(args).await?,
        Commands::Notes { action } => run_notes(action)?,
    }
    Ok(())
}

fn run_config(action: ConfigAction) -> Result<()> {
    let mut config = load_config();
    match action {
        ConfigAction::Show => print!("{}", config.to_toml()?),
        ConfigAction::SetModel { model } => {
            config.model = model;
            save_config(&config)?;
        }
        ConfigAction::SetPrompt { prompt } => {
            config.custom_prompt = Some(prompt);
            save_config(&config)?;
        }
    }
    Ok(())
}

async fn run_generate(args: GenerateArgs) -> Result<()> {
    let mut config = load_config();
    if let Some(mode) = args.mode {
        config.mode = mode;
    }
    if let Some(policy) = args.chunk_policy {
        config.chunk_size_policy = policy;
    }
    if let Some(size) = args.max_chunk_size {
        config.max_chunk_size = size;
    }
    if let Some(limit) = args.concurrency {
        config.concurrency_limit = limit;
    }
    if let Some(model) = args.model {
        config.model = model;
    }
    if args.no_dedup {
        config.deduplication_enabled = false;
    }

    let Some(prompt) = args
        .prompt
        .or_else(|| config.custom_prompt.clone())
        .filter(|p| !p.trim().is_empty())
    else {
        bail!("a prompt is required (--prompt, or `notesmith config set-prompt`)");
    };

    let items = load_items(&args.input)
        .with_context(|| format!("failed to load capture items from {}", args.input.display()))?;
    info!(count = items.len(), "loaded capture items");

    let (first, last) = item_span(&items);
    let now = Utc::now();
    let start = args.start.or(first).unwrap_or(now);
    let end = args.end.or(last).unwrap_or(now);
    let window = TimeWindow::new(start, end).context("invalid time window")?;

    let mut request = NoteRequest::new(items, window, prompt);
    if let Some(label) = args.label {
        request = request.with_reference_label(label);
    }

    let pipeline = NotePipeline::from_ollama(config)?;
    let note = pipeline.run(&request).await.map_err(|failure| {
        anyhow::anyhow!("{failure}: {}", failure.diagnostic)
    })?;

    println!("{}", serde_json::to_string_pretty(&note)?);
    if args.save {
        let mut store = NoteStore::open_default()?;
        let id = store.add(note)?;
        eprintln!("Saved note {id}");
    }
    Ok(())
}

/// Earliest and latest capture timestamps among `items`.
fn item_span(items: &[ContentItem]) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
    let times = items.iter().filter_map(ContentItem::captured_at);
    let (mut min, mut max) = (None, None);
    for t in times {
        min = Some(min.map_or(t, |m: DateTime<Utc>| m.min(t)));
        max = Some(max.map_or(t, |m: DateTime<Utc>| m.max(t)));
    }
    (min, max)
}

fn run_notes(action: NotesAction) -> Result<()> {
    let mut store = NoteStore::open_default()?;
    match action {
        NotesAction::List { tag } => {
            let notes: Vec<_> = match tag.as_deref() {
                Some(tag) => store.with_tag(tag),
                None => store.list().iter().collect(),
            };
            println!("{} note(s)", notes.len());
            for n in notes {
                println!(
                    "  {:>4}  {}  {}  {}",
                    n.id,
                    n.created_at.format("%Y-%m-%d %H:%M"),
                    n.note.title,
                    n.note.tags.join(" ")
                );
            }
        }
        NotesAction::Show { id } => match store.get(id) {
            Some(n) => println!("{}", serde_json::to_string_pretty(n)?),
            None => bail!("no note with id {id}"),
        },
        NotesAction::Delete { id } => {
            if !store.delete(id)? {
                bail!("no note with id {id}");
            }
            println!("Deleted note {id}");
        }
    }
    Ok(())
}
