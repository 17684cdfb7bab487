use std::any::Any;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::mpsc::Sender;
use std::thread;

use tracing::debug;

use crate::cancel::CancelToken;
use crate::domain::Entry;
use crate::error::BibError;
use crate::providers::IdProvider;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

impl TaskId {
    pub fn first() -> Self {
        Self(1)
    }

    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Idle,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

impl TaskState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskState::Succeeded | TaskState::Failed | TaskState::Cancelled
        )
    }
}

#[derive(Clone)]
pub struct FetchRequest {
    provider: Arc<dyn IdProvider>,
    identifier: String,
}

impl FetchRequest {
    pub fn new(provider: Arc<dyn IdProvider>, identifier: &str) -> Self {
        Self {
            provider,
            identifier: identifier.to_string(),
        }
    }

    pub fn provider(&self) -> &Arc<dyn IdProvider> {
        &self.provider
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn is_blank(&self) -> bool {
        self.identifier.trim().is_empty()
    }
}

impl fmt::Debug for FetchRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchRequest")
            .field("provider", &self.provider.name())
            .field("identifier", &self.identifier)
            .finish()
    }
}

#[derive(Debug)]
pub enum FetchOutcome {
    Succeeded(Option<Entry>),
    Failed(BibError),
    Cancelled,
}

impl FetchOutcome {
    pub fn state(&self) -> TaskState {
        match self {
            FetchOutcome::Succeeded(_) => TaskState::Succeeded,
            FetchOutcome::Failed(_) => TaskState::Failed,
            FetchOutcome::Cancelled => TaskState::Cancelled,
        }
    }
}

#[derive(Debug)]
pub struct Completion {
    pub task: TaskId,
    pub request: FetchRequest,
    pub outcome: FetchOutcome,
}

#[derive(Debug)]
pub struct FetchTask {
    id: TaskId,
    state: TaskState,
    request: Option<FetchRequest>,
    cancel: CancelToken,
}

impl FetchTask {
    pub fn new(id: TaskId) -> Self {
        Self {
            id,
            state: TaskState::Idle,
            request: None,
            cancel: CancelToken::new(),
        }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn state(&self) -> TaskState {
        self.state
    }

    pub fn request(&self) -> Option<&FetchRequest> {
        self.request.as_ref()
    }

    pub fn is_running(&self) -> bool {
        self.state == TaskState::Running
    }

    pub fn cancel_requested(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn run(&mut self, request: FetchRequest, completions: Sender<Completion>) -> Result<(), BibError> {
        if self.state != TaskState::Idle {
            return Err(BibError::Unexpected(format!(
                "task {} cannot start from state {:?}",
                self.id, self.state
            )));
        }
        self.state = TaskState::Running;
        self.request = Some(request.clone());

        let id = self.id;
        let cancel = self.cancel.clone();
        let fallback = completions.clone();
        debug!(task = %id, provider = request.provider_name(), identifier = request.identifier(), "lookup started");

        let spawned = thread::Builder::new()
            .name(format!("bibfetch-task-{}", id.0))
            .spawn({
                let request = request.clone();
                move || {
                    let outcome = execute(&request, &cancel);
                    let _ = completions.send(Completion {
                        task: id,
                        request,
                        outcome,
                    });
                }
            });

        if let Err(err) = spawned {
            let _ = fallback.send(Completion {
                task: id,
                request,
                outcome: FetchOutcome::Failed(BibError::Unexpected(format!(
                    "failed to spawn lookup thread: {err}"
                ))),
            });
        }
        Ok(())
    }

    pub fn cancel(&self) -> bool {
        if !self.is_running() {
            return false;
        }
        self.cancel.cancel();
        true
    }

    pub fn finish(&mut self, outcome: &FetchOutcome) -> Result<TaskState, BibError> {
        if !self.is_running() {
            return Err(BibError::Unexpected(format!(
                "task {} already left the running state ({:?})",
                self.id, self.state
            )));
        }
        self.state = outcome.state();
        Ok(self.state)
    }
}

/// Runs one lookup on the current thread. Blank identifiers never reach the
/// provider, and a cancelled token always yields `Cancelled` regardless of
/// what the provider returned.
pub fn execute(request: &FetchRequest, cancel: &CancelToken) -> FetchOutcome {
    if cancel.is_cancelled() {
        return FetchOutcome::Cancelled;
    }
    if request.is_blank() {
        return FetchOutcome::Succeeded(None);
    }

    let identifier = request.identifier().trim();
    let result = catch_unwind(AssertUnwindSafe(|| {
        request.provider().lookup_by_id(identifier, cancel)
    }));

    if cancel.is_cancelled() {
        return FetchOutcome::Cancelled;
    }
    match result {
        Ok(Ok(entry)) => FetchOutcome::Succeeded(entry),
        Ok(Err(BibError::Cancelled)) => FetchOutcome::Cancelled,
        Ok(Err(err)) => FetchOutcome::Failed(err),
        Err(payload) => FetchOutcome::Failed(BibError::Unexpected(panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        return format!("provider panicked: {message}");
    }
    if let Some(message) = payload.downcast_ref::<String>() {
        return format!("provider panicked: {message}");
    }
    "provider panicked".to_string()
}
