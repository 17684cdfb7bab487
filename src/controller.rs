use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::error::BibError;
use crate::library::Destination;
use crate::outcome::{Action, OutcomeHandler, Resolution};
use crate::prefs::PreferenceStore;
use crate::providers::IdProvider;
use crate::task::{Completion, FetchOutcome, FetchRequest, FetchTask, TaskId, TaskState};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionState {
    pub providers: Vec<String>,
    pub selected: String,
    pub identifier: String,
    pub searching: bool,
    pub focus_requested: bool,
}

type Listener = Box<dyn Fn(&SelectionState)>;

/// Owns the selection and the single task slot. All methods are meant to be
/// called from one foreground thread; lookups run on worker threads and
/// report back through an internal channel.
pub struct RequestController {
    providers: Vec<Arc<dyn IdProvider>>,
    selected: usize,
    state: SelectionState,
    slot: FetchTask,
    last_id: TaskId,
    preferences: Box<dyn PreferenceStore>,
    handler: OutcomeHandler,
    sender: Sender<Completion>,
    receiver: Receiver<Completion>,
    listeners: Vec<Listener>,
}

impl RequestController {
    pub fn new(
        providers: Vec<Arc<dyn IdProvider>>,
        fallback: &str,
        preferences: Box<dyn PreferenceStore>,
        handler: OutcomeHandler,
    ) -> Result<Self, BibError> {
        if providers.is_empty() {
            return Err(BibError::NoProviders);
        }

        let stored = preferences.default_provider_name();
        let position = |name: &str| providers.iter().position(|p| p.name() == name);
        let selected = stored
            .as_deref()
            .and_then(position)
            .or_else(|| position(fallback))
            .unwrap_or(0);

        let state = SelectionState {
            providers: providers.iter().map(|p| p.name().to_string()).collect(),
            selected: providers[selected].name().to_string(),
            identifier: String::new(),
            searching: false,
            focus_requested: false,
        };
        let (sender, receiver) = mpsc::channel();
        let first = TaskId::first();

        Ok(Self {
            providers,
            selected,
            state,
            slot: FetchTask::new(first),
            last_id: first,
            preferences,
            handler,
            sender,
            receiver,
            listeners: Vec::new(),
        })
    }

    pub fn subscribe<F>(&mut self, listener: F)
    where
        F: Fn(&SelectionState) + 'static,
    {
        self.listeners.push(Box::new(listener));
    }

    pub fn state(&self) -> &SelectionState {
        &self.state
    }

    pub fn providers(&self) -> &[Arc<dyn IdProvider>] {
        &self.providers
    }

    pub fn selected_provider(&self) -> &Arc<dyn IdProvider> {
        &self.providers[self.selected]
    }

    pub fn library(&self) -> &dyn Destination {
        self.handler.library()
    }

    pub fn current_task(&self) -> TaskId {
        self.slot.id()
    }

    pub fn task_state(&self) -> TaskState {
        self.slot.state()
    }

    pub fn is_searching(&self) -> bool {
        self.state.searching
    }

    pub fn select_provider(&mut self, name: &str) -> Result<(), BibError> {
        let index = self
            .providers
            .iter()
            .position(|p| p.name() == name)
            .ok_or_else(|| BibError::UnknownProvider(name.to_string()))?;
        self.selected = index;
        self.state.selected = name.to_string();
        self.notify();
        Ok(())
    }

    pub fn set_identifier_text(&mut self, text: &str) {
        self.state.identifier = text.to_string();
        self.notify();
    }

    pub fn take_focus_request(&mut self) -> bool {
        std::mem::take(&mut self.state.focus_requested)
    }

    pub fn start(&mut self) -> Result<TaskId, BibError> {
        if self.slot.is_running() {
            debug!(task = %self.slot.id(), "cancelling running lookup before restart");
            self.slot.cancel();
            self.retire_slot();
        }

        let provider = self.providers[self.selected].clone();
        if let Err(err) = self.preferences.set_default_provider_name(provider.name()) {
            warn!(provider = provider.name(), error = %err, "failed to store selected provider");
        }

        self.state.searching = true;
        self.state.focus_requested = false;
        self.notify();

        let request = FetchRequest::new(provider, &self.state.identifier);
        self.slot.run(request, self.sender.clone())?;
        Ok(self.slot.id())
    }

    pub fn cancel(&mut self) {
        if self.slot.cancel() {
            debug!(task = %self.slot.id(), "cancellation requested");
        }
    }

    pub fn receive(&self, timeout: Duration) -> Option<Completion> {
        match self.receiver.recv_timeout(timeout) {
            Ok(completion) => Some(completion),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    pub fn complete(&mut self, completion: Completion) -> Option<Resolution> {
        let Completion {
            task,
            request,
            outcome,
        } = completion;

        if task != self.slot.id() {
            debug!(task = %task, current = %self.slot.id(), "discarding completion of retired task");
            return None;
        }

        let outcome = if self.slot.cancel_requested() {
            FetchOutcome::Cancelled
        } else {
            outcome
        };
        if let Err(err) = self.slot.finish(&outcome) {
            debug!(task = %task, error = %err, "ignoring repeated completion");
            return None;
        }

        let mut replaced = None;
        let mut resolution = None;
        for action in self.handler.handle(outcome, &request) {
            match action {
                Action::Finish(summary) => {
                    self.finish_request();
                    resolution = Some(replaced.take().unwrap_or(summary));
                }
                other => {
                    if let Some(summary) = self.handler.execute(other) {
                        replaced = Some(summary);
                    }
                }
            }
        }
        resolution
    }

    pub fn poll(&mut self) -> Vec<Resolution> {
        let mut resolutions = Vec::new();
        while let Ok(completion) = self.receiver.try_recv() {
            if let Some(resolution) = self.complete(completion) {
                resolutions.push(resolution);
            }
        }
        resolutions
    }

    pub fn wait(&mut self, timeout: Duration) -> Option<Resolution> {
        let deadline = Instant::now() + timeout;
        while self.slot.is_running() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return None;
            }
            let completion = self.receive(remaining)?;
            if let Some(resolution) = self.complete(completion) {
                return Some(resolution);
            }
        }
        None
    }

    fn finish_request(&mut self) {
        self.state.searching = false;
        self.state.focus_requested = true;
        self.retire_slot();
        self.notify();
    }

    fn retire_slot(&mut self) {
        self.last_id = self.last_id.next();
        self.slot = FetchTask::new(self.last_id);
    }

    fn notify(&self) {
        for listener in &self.listeners {
            listener(&self.state);
        }
    }
}
