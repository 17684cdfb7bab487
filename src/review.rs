use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::domain::Entry;
use crate::error::BibError;
use crate::fs_util::{read_json, write_json_atomic};

pub trait ReviewQueue {
    fn enqueue(&mut self, entries: Vec<Entry>);
    fn mark_complete(&mut self);
    fn present(&mut self) -> Result<(), BibError>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingEntry {
    pub queued_at: DateTime<Utc>,
    pub entry: Entry,
}

#[derive(Debug, Default)]
pub struct ReviewInbox {
    path: Option<Utf8PathBuf>,
    pending: Vec<PendingEntry>,
    batch: Vec<PendingEntry>,
    complete: bool,
}

impl ReviewInbox {
    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn open(path: &Utf8Path) -> Result<Self, BibError> {
        let pending: Vec<PendingEntry> = read_json(path)?.unwrap_or_default();
        Ok(Self {
            path: Some(path.to_path_buf()),
            pending,
            ..Self::default()
        })
    }

    pub fn pending(&self) -> &[PendingEntry] {
        &self.pending
    }

    fn flush(&self) -> Result<(), BibError> {
        match &self.path {
            Some(path) => write_json_atomic(path, &self.pending),
            None => Ok(()),
        }
    }
}

impl ReviewQueue for ReviewInbox {
    fn enqueue(&mut self, entries: Vec<Entry>) {
        let queued_at = Utc::now();
        self.complete = false;
        self.batch
            .extend(entries.into_iter().map(|entry| PendingEntry { queued_at, entry }));
    }

    fn mark_complete(&mut self) {
        self.complete = true;
    }

    fn present(&mut self) -> Result<(), BibError> {
        if !self.complete {
            warn!(queued = self.batch.len(), "review batch presented before completion");
        }
        let count = self.batch.len();
        let before = self.pending.len();
        self.pending.append(&mut self.batch);
        if let Err(err) = self.flush() {
            self.pending.truncate(before);
            return Err(err);
        }
        info!(
            added = count,
            pending = self.pending.len(),
            path = ?self.path,
            "entries queued for duplicate review"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn present_appends_batch_to_file() {
        let temp = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(temp.path().join("review.json")).unwrap();

        let mut inbox = ReviewInbox::open(&path).unwrap();
        inbox.enqueue(vec![Entry::new("article").with_field("title", "First")]);
        inbox.mark_complete();
        inbox.present().unwrap();

        let mut reopened = ReviewInbox::open(&path).unwrap();
        assert_eq!(reopened.pending().len(), 1);

        reopened.enqueue(vec![Entry::new("book").with_field("title", "Second")]);
        reopened.mark_complete();
        reopened.present().unwrap();

        let reopened = ReviewInbox::open(&path).unwrap();
        assert_eq!(reopened.pending().len(), 2);
        assert_eq!(reopened.pending()[1].entry.title(), Some("Second"));
    }

    #[test]
    fn unwritable_inbox_reports_failure() {
        let temp = tempfile::tempdir().unwrap();
        let blocker = temp.path().join("not-a-dir");
        std::fs::write(&blocker, b"file").unwrap();
        let path = Utf8PathBuf::from_path_buf(blocker.join("review.json")).unwrap();

        let mut inbox = ReviewInbox::open(&path).unwrap();
        inbox.enqueue(vec![Entry::new("article").with_field("title", "Dropped")]);
        inbox.mark_complete();

        assert!(matches!(inbox.present(), Err(BibError::Filesystem(_))));
        assert!(inbox.pending().is_empty());
    }
}
