use std::sync::Arc;

use reqwest::StatusCode;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::de::DeserializeOwned;

use crate::cancel::CancelToken;
use crate::config::ResolvedConfig;
use crate::domain::Entry;
use crate::error::BibError;

pub mod doi;
pub mod isbn;

pub use doi::DoiProvider;
pub use isbn::IsbnProvider;

/// A remote source that resolves one identifier to at most one entry.
///
/// `Ok(None)` means the provider answered but knows no record for the
/// identifier. Implementations should call [`CancelToken::checkpoint`]
/// before and after every blocking request.
pub trait IdProvider: Send + Sync {
    fn name(&self) -> &str;
    fn lookup_by_id(&self, id: &str, cancel: &CancelToken) -> Result<Option<Entry>, BibError>;
}

pub struct ProviderRegistry;

impl ProviderRegistry {
    pub fn list(config: &ResolvedConfig) -> Result<Vec<Arc<dyn IdProvider>>, BibError> {
        let providers: Vec<Arc<dyn IdProvider>> = vec![
            Arc::new(DoiProvider::new(config)?),
            Arc::new(IsbnProvider::new(config)?),
        ];
        Ok(providers)
    }
}

pub(crate) fn http_client(provider: &str, config: &ResolvedConfig) -> Result<Client, BibError> {
    let agent = match &config.mailto {
        Some(mailto) => format!("bibfetch/{} (mailto:{mailto})", env!("CARGO_PKG_VERSION")),
        None => format!("bibfetch/{}", env!("CARGO_PKG_VERSION")),
    };
    let mut headers = HeaderMap::new();
    headers.insert(
        USER_AGENT,
        HeaderValue::from_str(&agent).map_err(|err| BibError::ProviderHttp {
            provider: provider.to_string(),
            message: err.to_string(),
        })?,
    );
    Client::builder()
        .default_headers(headers)
        .timeout(config.timeout)
        .build()
        .map_err(|err| BibError::ProviderHttp {
            provider: provider.to_string(),
            message: err.to_string(),
        })
}

pub(crate) fn get_json<T: DeserializeOwned>(
    client: &Client,
    provider: &str,
    url: &str,
    cancel: &CancelToken,
) -> Result<Option<T>, BibError> {
    cancel.checkpoint()?;
    let response = client
        .get(url)
        .send()
        .map_err(|err| BibError::ProviderHttp {
            provider: provider.to_string(),
            message: err.to_string(),
        })?;
    cancel.checkpoint()?;

    if response.status() == StatusCode::NOT_FOUND {
        return Ok(None);
    }
    if !response.status().is_success() {
        let status = response.status().as_u16();
        let message = response
            .text()
            .unwrap_or_else(|_| format!("{provider} request failed"));
        return Err(BibError::ProviderStatus {
            provider: provider.to_string(),
            status,
            message,
        });
    }
    let payload = response.json().map_err(|err| BibError::ProviderResponse {
        provider: provider.to_string(),
        message: err.to_string(),
    })?;
    Ok(Some(payload))
}

pub(crate) fn encode_url_component(value: &str) -> String {
    let mut out = String::new();
    for byte in value.as_bytes() {
        let ch = *byte as char;
        if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' || ch == '.' || ch == '~' {
            out.push(ch);
        } else {
            out.push_str(&format!("%{:02X}", byte));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_order_starts_with_doi() {
        let providers = ProviderRegistry::list(&ResolvedConfig::default()).unwrap();
        let names = providers.iter().map(|p| p.name()).collect::<Vec<_>>();
        assert_eq!(names, vec!["DOI", "ISBN"]);
    }

    #[test]
    fn encode_keeps_unreserved() {
        assert_eq!(
            encode_url_component("10.1000/a b"),
            "10.1000%2Fa%20b".to_string()
        );
    }
}
