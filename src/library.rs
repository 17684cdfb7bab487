use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{Entry, LibraryMode};
use crate::error::BibError;
use crate::fs_util::{read_json, write_json_atomic};

pub trait Destination {
    fn entries(&self) -> &[Entry];
    fn mode(&self) -> LibraryMode;
    fn insert(&mut self, entry: Entry) -> Result<(), BibError>;

    fn contains_key(&self, key: &str) -> bool {
        self.entries()
            .iter()
            .any(|entry| entry.citation_key.as_deref() == Some(key))
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct LibraryFile {
    #[serde(default)]
    mode: LibraryMode,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    entries: Vec<Entry>,
}

#[derive(Debug, Clone)]
pub struct Library {
    path: Option<Utf8PathBuf>,
    mode: LibraryMode,
    entries: Vec<Entry>,
    updated_at: Option<DateTime<Utc>>,
}

impl Library {
    pub fn in_memory(mode: LibraryMode) -> Self {
        Self {
            path: None,
            mode,
            entries: Vec::new(),
            updated_at: None,
        }
    }

    /// `mode` only applies when the file does not exist yet; an existing
    /// library keeps the mode it was saved with.
    pub fn open(path: &Utf8Path, mode: LibraryMode) -> Result<Self, BibError> {
        let file: Option<LibraryFile> = read_json(path)?;
        let library = match file {
            Some(file) => Self {
                path: Some(path.to_path_buf()),
                mode: file.mode,
                entries: file.entries,
                updated_at: file.updated_at,
            },
            None => Self {
                path: Some(path.to_path_buf()),
                ..Self::in_memory(mode)
            },
        };
        debug!(path = %path, entries = library.entries.len(), "library opened");
        Ok(library)
    }

    pub fn with_entries(mut self, entries: Vec<Entry>) -> Self {
        self.entries = entries;
        self
    }

    pub fn path(&self) -> Option<&Utf8Path> {
        self.path.as_deref()
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    pub fn save(&self) -> Result<(), BibError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let file = LibraryFile {
            mode: self.mode,
            updated_at: self.updated_at,
            entries: self.entries.clone(),
        };
        write_json_atomic(path, &file)
    }
}

impl Destination for Library {
    fn entries(&self) -> &[Entry] {
        &self.entries
    }

    fn mode(&self) -> LibraryMode {
        self.mode
    }

    fn insert(&mut self, entry: Entry) -> Result<(), BibError> {
        let previous = self.updated_at.replace(Utc::now());
        self.entries.push(entry);
        if let Err(err) = self.save() {
            self.entries.pop();
            self.updated_at = previous;
            return Err(err);
        }
        Ok(())
    }
}
