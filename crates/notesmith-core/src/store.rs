//! Saved notes, kept in a single JSON file in the app data directory.
//! Fine for the handful of notes a user keeps per day; not a database.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::app_data;
use crate::notes::Note;

const STORE_FILENAME: &str = "notes.json";

/// A note as stored, with its id and when it was saved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredNote {
    pub id: u64,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub note: Note,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoreFile {
    next_id: u64,
    notes: Vec<StoredNote>,
}

/// Notes store. Every change is written through to disk when backed by a file,
/// and only applied in memory once the write succeeded.
#[derive(Debug, Default)]
pub struct NoteStore {
    path: Option<PathBuf>,
    data: StoreFile,
}

impl NoteStore {
    /// A store that lives only in memory.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Opens the store at `path`, starting empty if the file does not exist.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let data = if path.exists() {
            let raw = std::fs::read_to_string(path)
                .map_err(|e| StoreError::Read(path.to_path_buf(), e))?;
            serde_json::from_str(&raw).map_err(|e| StoreError::Parse(path.to_path_buf(), e))?
        } else {
            StoreFile::default()
        };
        Ok(Self {
            path: Some(path.to_path_buf()),
            data,
        })
    }

    /// Opens the store in the app data directory.
    pub fn open_default() -> Result<Self, StoreError> {
        let dir = app_data::app_data_dir().ok_or(StoreError::NoDataDir)?;
        Self::open(&dir.join(STORE_FILENAME))
    }

    /// Saves a note and returns its new id.
    pub fn add(&mut self, note: Note) -> Result<u64, StoreError> {
        let mut next = self.data.clone();
        next.next_id += 1;
        let id = next.next_id;
        next.notes.push(StoredNote {
            id,
            created_at: Utc::now(),
            note,
        });
        self.commit(next)?;
        Ok(id)
    }

    pub fn get(&self, id: u64) -> Option<&StoredNote> {
        self.data.notes.iter().find(|n| n.id == id)
    }

    /// Deletes a note. Returns whether it existed.
    pub fn delete(&mut self, id: u64) -> Result<bool, StoreError> {
        if self.get(id).is_none() {
            return Ok(false);
        }
        let mut next = self.data.clone();
        next.notes.retain(|n| n.id != id);
        self.commit(next)?;
        Ok(true)
    }

    /// All notes, oldest first.
    pub fn list(&self) -> &[StoredNote] {
        &self.data.notes
    }

    /// Notes carrying `tag` (with or without the leading marker).
    pub fn with_tag(&self, tag: &str) -> Vec<&StoredNote> {
        self.data.notes.iter().filter(|n| n.note.has_tag(tag)).collect()
    }

    pub fn len(&self) -> usize {
        self.data.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.notes.is_empty()
    }

    fn commit(&mut self, next: StoreFile) -> Result<(), StoreError> {
        if let Some(path) = &self.path {
            let s = serde_json::to_string_pretty(&next).map_err(StoreError::Serialize)?;
            let tmp = path.with_extension("json.tmp");
            std::fs::write(&tmp, s).map_err(|e| StoreError::Write(tmp.clone(), e))?;
            std::fs::rename(&tmp, path).map_err(|e| StoreError::Write(path.clone(), e))?;
        }
        self.data = next;
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("could not determine app data directory")]
    NoDataDir,
    #[error("read error for {0}: {1}")]
    Read(PathBuf, std::io::Error),
    #[error("write error for {0}: {1}")]
    Write(PathBuf, std::io::Error),
    #[error("failed to serialize notes: {0}")]
    Serialize(serde_json::Error),
    #[error("invalid notes file {0}: {1}")]
    Parse(PathBuf, serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(title: &str, tags: &[&str]) -> Note {
        let t = Utc::now();
        Note {
            title: title.into(),
            content: "<p>body</p>".into(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            start_time: t,
            end_time: t,
        }
    }

    #[test]
    fn add_get_delete_in_memory() {
        let mut store = NoteStore::in_memory();
        let a = store.add(note("A", &["#rust"])).unwrap();
        let b = store.add(note("B", &["#go"])).unwrap();
        assert_ne!(a, b);
        assert_eq!(store.get(a).unwrap().note.title, "A");
        assert!(store.delete(a).unwrap());
        assert!(!store.delete(a).unwrap());
        assert!(store.get(a).is_none());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn filter_by_tag() {
        let mut store = NoteStore::in_memory();
        store.add(note("A", &["#rust", "#memory"])).unwrap();
        store.add(note("B", &["#go"])).unwrap();
        store.add(note("C", &["#rust"])).unwrap();
        let titles: Vec<_> = store
            .with_tag("rust")
            .iter()
            .map(|n| n.note.title.clone())
            .collect();
        assert_eq!(titles, vec!["A", "C"]);
    }

    #[test]
    fn persists_across_reopen_and_ids_never_repeat() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(STORE_FILENAME);
        let first_id = {
            let mut store = NoteStore::open(&path).unwrap();
            let id = store.add(note("Kept", &["#x"])).unwrap();
            let gone = store.add(note("Gone", &[])).unwrap();
            store.delete(gone).unwrap();
            id
        };
        let mut store = NoteStore::open(&path).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(first_id).unwrap().note.title, "Kept");
        let next = store.add(note("New", &[])).unwrap();
        assert_eq!(next, first_id + 2);
    }

    #[test]
    fn failed_write_leaves_store_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("data");
        std::fs::create_dir(&sub).unwrap();
        let path = sub.join(STORE_FILENAME);
        let mut store = NoteStore::open(&path).unwrap();
        let kept = store.add(note("Kept", &[])).unwrap();

        std::fs::remove_dir_all(&sub).unwrap();
        assert!(matches!(store.add(note("Lost", &[])), Err(StoreError::Write(..))));
        assert!(store.delete(kept).is_err());
        assert_eq!(store.len(), 1);
        assert!(store.get(kept).is_some());

        std::fs::create_dir(&sub).unwrap();
        let next = store.add(note("Next", &[])).unwrap();
        assert_eq!(next, kept + 1);
        assert_eq!(NoteStore::open(&path).unwrap().len(), 2);
    }
}
