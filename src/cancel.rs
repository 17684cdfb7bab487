use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::BibError;

#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    pub fn checkpoint(&self) -> Result<(), BibError> {
        if self.is_cancelled() {
            return Err(BibError::Cancelled);
        }
        Ok(())
    }
}
