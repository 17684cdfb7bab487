use serde::Serialize;
use tracing::{debug, error, info};

use crate::citekey::KeyGenerator;
use crate::config::KeyPattern;
use crate::dedup::DuplicateResolver;
use crate::domain::Entry;
use crate::library::Destination;
use crate::notify::Notifier;
use crate::review::ReviewQueue;
use crate::task::{FetchOutcome, FetchRequest};

pub const EMPTY_ID_TITLE: &str = "Empty search ID";
pub const EMPTY_ID_MESSAGE: &str = "The given search ID was empty.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum Resolution {
    Inserted,
    QueuedForReview,
    EmptyIdentifier,
    NotFound,
    Failed { message: String },
    Cancelled,
}

#[derive(Debug)]
pub enum Action {
    Review(Entry),
    Insert(Entry),
    Warn {
        title: String,
        message: String,
    },
    Error {
        title: String,
        message: String,
    },
    Log {
        provider: String,
        identifier: String,
        error: String,
    },
    Trace(String),
    Finish(Resolution),
}

pub fn classify<F>(outcome: FetchOutcome, request: &FetchRequest, is_duplicate: F) -> Vec<Action>
where
    F: FnOnce(&Entry) -> bool,
{
    let provider = request.provider_name().to_string();
    let identifier = request.identifier().to_string();

    match outcome {
        FetchOutcome::Cancelled => vec![
            Action::Trace(format!("lookup of '{identifier}' via {provider} cancelled")),
            Action::Finish(Resolution::Cancelled),
        ],
        FetchOutcome::Succeeded(Some(entry)) => {
            if is_duplicate(&entry) {
                vec![
                    Action::Review(entry),
                    Action::Finish(Resolution::QueuedForReview),
                ]
            } else {
                vec![Action::Insert(entry), Action::Finish(Resolution::Inserted)]
            }
        }
        FetchOutcome::Succeeded(None) if request.is_blank() => vec![
            Action::Warn {
                title: EMPTY_ID_TITLE.to_string(),
                message: EMPTY_ID_MESSAGE.to_string(),
            },
            Action::Finish(Resolution::EmptyIdentifier),
        ],
        FetchOutcome::Succeeded(None) => vec![
            Action::Trace(format!("{provider} found no entry for '{identifier}'")),
            Action::Finish(Resolution::NotFound),
        ],
        FetchOutcome::Failed(err) => {
            let (title, message) = if err.is_provider_failure() {
                (
                    "Error".to_string(),
                    format!("Error while fetching from {provider}.\n{}", err.detail()),
                )
            } else {
                (
                    "No files found.".to_string(),
                    format!(
                        "Fetcher '{provider}' did not find an entry for id '{identifier}'.\n{}",
                        err.detail()
                    ),
                )
            };
            vec![
                Action::Error { title, message },
                Action::Log {
                    provider,
                    identifier,
                    error: err.to_string(),
                },
                Action::Finish(Resolution::Failed {
                    message: err.to_string(),
                }),
            ]
        }
    }
}

pub struct Collaborators {
    pub duplicates: Box<dyn DuplicateResolver>,
    pub keys: Box<dyn KeyGenerator>,
    pub library: Box<dyn Destination>,
    pub review: Box<dyn ReviewQueue>,
    pub notifier: Box<dyn Notifier>,
}

pub struct OutcomeHandler {
    collaborators: Collaborators,
    key_pattern: KeyPattern,
}

impl OutcomeHandler {
    pub fn new(collaborators: Collaborators, key_pattern: KeyPattern) -> Self {
        Self {
            collaborators,
            key_pattern,
        }
    }

    pub fn library(&self) -> &dyn Destination {
        self.collaborators.library.as_ref()
    }

    pub fn is_duplicate(&self, entry: &Entry) -> bool {
        let library = self.collaborators.library.as_ref();
        self.collaborators
            .duplicates
            .find_duplicate(library, entry, library.mode())
            .is_some()
    }

    pub fn handle(&self, outcome: FetchOutcome, request: &FetchRequest) -> Vec<Action> {
        classify(outcome, request, |entry| self.is_duplicate(entry))
    }

    pub fn execute(&mut self, action: Action) -> Option<Resolution> {
        match action {
            Action::Review(entry) => {
                info!(title = entry.title().unwrap_or_default(), "duplicate found, routing entry to review");
                let review = &mut self.collaborators.review;
                review.enqueue(vec![entry]);
                review.mark_complete();
                match review.present() {
                    Ok(()) => None,
                    Err(err) => {
                        error!(error = %err, "failed to queue fetched entry for review");
                        self.collaborators.notifier.show_error(
                            "Error",
                            &format!("Could not queue the entry for review.\n{err}"),
                        );
                        Some(Resolution::Failed {
                            message: err.to_string(),
                        })
                    }
                }
            }
            Action::Insert(mut entry) => {
                let library = self.collaborators.library.as_ref();
                self.collaborators
                    .keys
                    .generate_and_assign(&mut entry, library, &self.key_pattern);
                let key = entry.citation_key.clone();
                match self.collaborators.library.insert(entry) {
                    Ok(()) => {
                        info!(key = key.as_deref().unwrap_or_default(), "entry inserted");
                        None
                    }
                    Err(err) => {
                        error!(error = %err, "failed to insert fetched entry");
                        self.collaborators
                            .notifier
                            .show_error("Error", &format!("Could not add the entry to the library.\n{err}"));
                        Some(Resolution::Failed {
                            message: err.to_string(),
                        })
                    }
                }
            }
            Action::Warn { title, message } => {
                self.collaborators.notifier.show_warning(&title, &message);
                None
            }
            Action::Error { title, message } => {
                self.collaborators.notifier.show_error(&title, &message);
                None
            }
            Action::Log {
                provider,
                identifier,
                error,
            } => {
                error!(
                    provider = %provider,
                    identifier = %identifier,
                    error = %error,
                    "exception during fetching"
                );
                None
            }
            Action::Trace(message) => {
                debug!("{message}");
                None
            }
            Action::Finish(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use assert_matches::assert_matches;

    use super::*;
    use crate::cancel::CancelToken;
    use crate::citekey::PatternKeyGenerator;
    use crate::dedup::EntryDuplicateCheck;
    use crate::domain::LibraryMode;
    use crate::error::BibError;
    use crate::library::Library;
    use crate::providers::IdProvider;

    struct Named;

    impl IdProvider for Named {
        fn name(&self) -> &str {
            "DOI"
        }

        fn lookup_by_id(&self, _id: &str, _cancel: &CancelToken) -> Result<Option<Entry>, BibError> {
            Ok(None)
        }
    }

    fn request(identifier: &str) -> FetchRequest {
        FetchRequest::new(Arc::new(Named), identifier)
    }

    #[test]
    fn non_duplicate_is_inserted() {
        let actions = classify(
            FetchOutcome::Succeeded(Some(Entry::new("article"))),
            &request("10.1000/x"),
            |_| false,
        );
        assert_eq!(actions.len(), 2);
        assert_matches!(actions[0], Action::Insert(_));
        assert_matches!(actions[1], Action::Finish(Resolution::Inserted));
    }

    #[test]
    fn duplicate_goes_to_review() {
        let actions = classify(
            FetchOutcome::Succeeded(Some(Entry::new("article"))),
            &request("10.1000/x"),
            |_| true,
        );
        assert_matches!(actions[0], Action::Review(_));
        assert_matches!(actions[1], Action::Finish(Resolution::QueuedForReview));
    }

    #[test]
    fn blank_identifier_warns_once() {
        let actions = classify(FetchOutcome::Succeeded(None), &request("  "), |_| {
            panic!("duplicate check must not run without an entry")
        });
        assert_eq!(actions.len(), 2);
        assert_matches!(&actions[0], Action::Warn { title, .. } if title == EMPTY_ID_TITLE);
        assert_matches!(actions[1], Action::Finish(Resolution::EmptyIdentifier));
    }

    #[test]
    fn absent_entry_for_real_identifier_is_silent() {
        let actions = classify(FetchOutcome::Succeeded(None), &request("10.1000/x"), |_| false);
        assert!(
            !actions
                .iter()
                .any(|action| matches!(action, Action::Warn { .. } | Action::Error { .. }))
        );
        assert_matches!(actions.last(), Some(Action::Finish(Resolution::NotFound)));
    }

    #[test]
    fn classified_failure_names_provider() {
        let err = BibError::ProviderStatus {
            provider: "DOI".to_string(),
            status: 503,
            message: "unavailable".to_string(),
        };
        let actions = classify(FetchOutcome::Failed(err), &request("10.1000/x"), |_| false);
        assert_matches!(
            &actions[0],
            Action::Error { title, message }
                if title == "Error" && message.contains("DOI") && message.contains("unavailable")
        );
        assert_matches!(&actions[1], Action::Log { provider, identifier, .. } if provider == "DOI" && identifier == "10.1000/x");
        assert_matches!(actions[2], Action::Finish(Resolution::Failed { .. }));
    }

    #[test]
    fn unclassified_failure_reports_not_found() {
        let actions = classify(
            FetchOutcome::Failed(BibError::Unexpected("boom".to_string())),
            &request("10.1000/x"),
            |_| false,
        );
        assert_matches!(
            &actions[0],
            Action::Error { title, message }
                if title == "No files found." && message.contains("'10.1000/x'") && message.contains("boom")
        );
    }

    #[test]
    fn cancellation_only_traces() {
        let actions = classify(FetchOutcome::Cancelled, &request("10.1000/x"), |_| true);
        assert_eq!(actions.len(), 2);
        assert_matches!(actions[0], Action::Trace(_));
        assert_matches!(actions[1], Action::Finish(Resolution::Cancelled));
    }

    struct Dialogs {
        errors: Arc<Mutex<Vec<String>>>,
    }

    impl Notifier for Dialogs {
        fn show_error(&self, _title: &str, message: &str) {
            self.errors.lock().unwrap().push(message.to_string());
        }

        fn show_warning(&self, _title: &str, _message: &str) {}
    }

    struct ReadOnlyLibrary(Library);

    impl Destination for ReadOnlyLibrary {
        fn entries(&self) -> &[Entry] {
            self.0.entries()
        }

        fn mode(&self) -> LibraryMode {
            self.0.mode()
        }

        fn insert(&mut self, _entry: Entry) -> Result<(), BibError> {
            Err(BibError::Filesystem("disk full".to_string()))
        }
    }

    struct BrokenInbox;

    impl ReviewQueue for BrokenInbox {
        fn enqueue(&mut self, _entries: Vec<Entry>) {}

        fn mark_complete(&mut self) {}

        fn present(&mut self) -> Result<(), BibError> {
            Err(BibError::Filesystem("review file locked".to_string()))
        }
    }

    fn handler(
        library: Box<dyn Destination>,
        review: Box<dyn ReviewQueue>,
        errors: Arc<Mutex<Vec<String>>>,
    ) -> OutcomeHandler {
        OutcomeHandler::new(
            Collaborators {
                duplicates: Box::new(EntryDuplicateCheck),
                keys: Box::new(PatternKeyGenerator),
                library,
                review,
                notifier: Box::new(Dialogs { errors }),
            },
            KeyPattern::default(),
        )
    }

    #[test]
    fn failed_insert_is_reported_as_failure() {
        let errors = Arc::new(Mutex::new(Vec::new()));
        let library = ReadOnlyLibrary(Library::in_memory(LibraryMode::Bibtex));
        let mut handler = handler(Box::new(library), Box::new(BrokenInbox), errors.clone());

        let entry = Entry::new("article").with_field("title", "Unsaved");
        let summary = handler.execute(Action::Insert(entry));

        assert_matches!(summary, Some(Resolution::Failed { ref message }) if message.contains("disk full"));
        assert!(handler.library().entries().is_empty());
        let errors = errors.lock().unwrap();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("disk full"));
    }

    #[test]
    fn failed_review_is_reported_as_failure() {
        let errors = Arc::new(Mutex::new(Vec::new()));
        let library = Library::in_memory(LibraryMode::Bibtex);
        let mut handler = handler(Box::new(library), Box::new(BrokenInbox), errors.clone());

        let entry = Entry::new("article").with_field("title", "Unreviewed");
        let summary = handler.execute(Action::Review(entry));

        assert_matches!(summary, Some(Resolution::Failed { ref message }) if message.contains("review file locked"));
        assert_eq!(errors.lock().unwrap().len(), 1);
    }
}
