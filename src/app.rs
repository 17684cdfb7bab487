use serde::Serialize;

use crate::citekey::PatternKeyGenerator;
use crate::config::ResolvedConfig;
use crate::controller::RequestController;
use crate::dedup::EntryDuplicateCheck;
use crate::domain::{Entry, LibraryMode};
use crate::error::BibError;
use crate::library::{Destination, Library};
use crate::notify::ConsoleNotifier;
use crate::outcome::{Collaborators, OutcomeHandler, Resolution};
use crate::prefs::{JsonPreferences, PreferenceStore};
use crate::providers::ProviderRegistry;
use crate::review::ReviewInbox;

#[derive(Debug, Clone, Copy)]
pub struct AppOptions {
    pub acknowledge_notifications: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct FetchReport {
    pub provider: String,
    pub identifier: String,
    #[serde(flatten)]
    pub resolution: Resolution,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry: Option<Entry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProviderListing {
    pub providers: Vec<ProviderItem>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProviderItem {
    pub name: String,
    pub selected: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct LibraryListing {
    pub path: Option<String>,
    pub mode: LibraryMode,
    pub entries: Vec<Entry>,
}

pub fn preferences_for(config: &ResolvedConfig) -> Result<JsonPreferences, BibError> {
    match &config.preferences_path {
        Some(path) => Ok(JsonPreferences::new(path)),
        None => JsonPreferences::default_location(),
    }
}

pub fn build_controller(
    config: &ResolvedConfig,
    options: AppOptions,
) -> Result<RequestController, BibError> {
    let providers = ProviderRegistry::list(config)?;
    let preferences = preferences_for(config)?;
    let library = Library::open(&config.library_path, config.mode)?;
    let review = ReviewInbox::open(&config.review_path)?;

    let collaborators = Collaborators {
        duplicates: Box::new(EntryDuplicateCheck),
        keys: Box::new(PatternKeyGenerator),
        library: Box::new(library),
        review: Box::new(review),
        notifier: Box::new(ConsoleNotifier::new(options.acknowledge_notifications)),
    };
    let handler = OutcomeHandler::new(collaborators, config.key_pattern.clone());
    RequestController::new(
        providers,
        &config.default_provider,
        Box::new(preferences),
        handler,
    )
}

pub fn fetch_report(
    controller: &RequestController,
    provider: &str,
    identifier: &str,
    resolution: Resolution,
) -> FetchReport {
    let entry = match resolution {
        Resolution::Inserted => controller.library().entries().last().cloned(),
        _ => None,
    };
    FetchReport {
        provider: provider.to_string(),
        identifier: identifier.to_string(),
        resolution,
        entry,
    }
}

pub fn provider_listing(config: &ResolvedConfig) -> Result<ProviderListing, BibError> {
    let providers = ProviderRegistry::list(config)?;
    let stored = preferences_for(config)?.default_provider_name();
    let selected = stored
        .filter(|name| providers.iter().any(|p| p.name() == name.as_str()))
        .unwrap_or_else(|| config.default_provider.clone());
    Ok(ProviderListing {
        providers: providers
            .iter()
            .map(|p| ProviderItem {
                name: p.name().to_string(),
                selected: p.name() == selected,
            })
            .collect(),
    })
}

pub fn library_listing(config: &ResolvedConfig) -> Result<LibraryListing, BibError> {
    let library = Library::open(&config.library_path, config.mode)?;
    Ok(LibraryListing {
        path: library.path().map(|path| path.to_string()),
        mode: library.mode(),
        entries: library.entries().to_vec(),
    })
}
