//! Where notesmith stores its own data (config, saved notes).

use std::path::PathBuf;

/// Returns the directory where notesmith stores config and saved notes.
/// On macOS: `~/Library/Application Support/Notesmith/`.
/// Creates the directory if it doesn't exist; returns `None` if we can't determine the path.
pub fn app_data_dir() -> Option<PathBuf> {
    let dir = directories::ProjectDirs::from("app", "Notesmith", "Notesmith")?
        .data_local_dir()
        .to_path_buf();
    std::fs::create_dir_all(&dir).ok()?;
    Some(dir)
}
