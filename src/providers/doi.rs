use reqwest::blocking::Client;
use serde::Deserialize;

use crate::cancel::CancelToken;
use crate::config::ResolvedConfig;
use crate::domain::{Doi, Entry};
use crate::error::BibError;
use crate::providers::{IdProvider, encode_url_component, get_json, http_client};

const CROSSREF_BASE: &str = "https://api.crossref.org";
const NAME: &str = "DOI";

#[derive(Debug, Clone)]
pub struct DoiProvider {
    client: Client,
    base_url: String,
}

impl DoiProvider {
    pub fn new(config: &ResolvedConfig) -> Result<Self, BibError> {
        Ok(Self {
            client: http_client(NAME, config)?,
            base_url: CROSSREF_BASE.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn fetch_crossref(
        &self,
        doi: &Doi,
        cancel: &CancelToken,
    ) -> Result<Option<CrossrefMessage>, BibError> {
        let url = format!(
            "{}/works/{}",
            self.base_url,
            encode_url_component(doi.as_str())
        );
        let payload: Option<CrossrefResponse> = get_json(&self.client, NAME, &url, cancel)?;
        Ok(payload.map(|payload| payload.message))
    }
}

impl IdProvider for DoiProvider {
    fn name(&self) -> &str {
        NAME
    }

    fn lookup_by_id(&self, id: &str, cancel: &CancelToken) -> Result<Option<Entry>, BibError> {
        let doi: Doi = id.parse()?;
        let message = self.fetch_crossref(&doi, cancel)?;
        Ok(message.map(|message| entry_from_crossref(&message)))
    }
}

#[derive(Debug, Deserialize)]
pub struct CrossrefResponse {
    pub message: CrossrefMessage,
}

#[derive(Debug, Default, Deserialize)]
pub struct CrossrefMessage {
    #[serde(rename = "type")]
    kind: Option<String>,
    #[serde(rename = "DOI")]
    doi: Option<String>,
    #[serde(rename = "URL")]
    url: Option<String>,
    title: Option<Vec<String>>,
    #[serde(rename = "container-title")]
    container_title: Option<Vec<String>>,
    author: Option<Vec<CrossrefPerson>>,
    editor: Option<Vec<CrossrefPerson>>,
    publisher: Option<String>,
    volume: Option<String>,
    issue: Option<String>,
    page: Option<String>,
    #[serde(rename = "ISSN")]
    issn: Option<Vec<String>>,
    #[serde(rename = "ISBN")]
    isbn: Option<Vec<String>>,
    issued: Option<CrossrefDate>,
}

#[derive(Debug, Deserialize)]
struct CrossrefPerson {
    given: Option<String>,
    family: Option<String>,
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CrossrefDate {
    #[serde(rename = "date-parts")]
    date_parts: Option<Vec<Vec<Option<i32>>>>,
}

pub fn entry_from_crossref(message: &CrossrefMessage) -> Entry {
    let mut entry = Entry::new(entry_type_for(message.kind.as_deref()));

    if let Some(title) = first(&message.title) {
        entry.set_field("title", &title);
    }
    if let Some(authors) = join_people(&message.author) {
        entry.set_field("author", &authors);
    }
    if let Some(editors) = join_people(&message.editor) {
        entry.set_field("editor", &editors);
    }
    if let Some(container) = first(&message.container_title) {
        let field = match entry.entry_type.as_str() {
            "article" => "journal",
            _ => "booktitle",
        };
        entry.set_field(field, &container);
    }
    if let Some((year, month)) = issued(message) {
        entry.set_field("year", &year.to_string());
        if let Some(month) = month {
            entry.set_field("month", &month.to_string());
        }
    }

    let scalars = [
        ("publisher", &message.publisher),
        ("volume", &message.volume),
        ("number", &message.issue),
        ("doi", &message.doi),
        ("url", &message.url),
    ];
    for (name, value) in scalars {
        if let Some(value) = value {
            entry.set_field(name, value);
        }
    }
    if let Some(page) = &message.page {
        entry.set_field("pages", &page.replace('-', "--"));
    }
    if let Some(issn) = first(&message.issn) {
        entry.set_field("issn", &issn);
    }
    if let Some(isbn) = first(&message.isbn) {
        entry.set_field("isbn", &isbn);
    }

    entry
}

fn entry_type_for(kind: Option<&str>) -> &'static str {
    match kind {
        Some("journal-article") => "article",
        Some("book") | Some("monograph") | Some("edited-book") => "book",
        Some("book-chapter") | Some("book-section") => "incollection",
        Some("proceedings-article") => "inproceedings",
        Some("dissertation") => "phdthesis",
        Some("report") => "techreport",
        Some("posted-content") => "unpublished",
        _ => "misc",
    }
}

fn first(values: &Option<Vec<String>>) -> Option<String> {
    values
        .as_ref()
        .and_then(|values| values.iter().find(|value| !value.trim().is_empty()))
        .map(|value| value.trim().to_string())
}

fn join_people(people: &Option<Vec<CrossrefPerson>>) -> Option<String> {
    let people = people.as_ref()?;
    let names = people
        .iter()
        .filter_map(|person| match (&person.family, &person.given, &person.name) {
            (Some(family), Some(given), _) => Some(format!("{family}, {given}")),
            (Some(family), None, _) => Some(family.clone()),
            (None, _, Some(name)) => Some(format!("{{{name}}}")),
            _ => None,
        })
        .collect::<Vec<_>>();
    if names.is_empty() {
        return None;
    }
    Some(names.join(" and "))
}

fn issued(message: &CrossrefMessage) -> Option<(i32, Option<i32>)> {
    let parts = message.issued.as_ref()?.date_parts.as_ref()?.first()?;
    let year = (*parts.first()?)?;
    let month = parts.get(1).copied().flatten();
    Some((year, month))
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn invalid_doi_is_rejected_before_any_request() {
        let provider = DoiProvider::new(&ResolvedConfig::default())
            .unwrap()
            .with_base_url("http://127.0.0.1:9");
        let err = provider
            .lookup_by_id("definitely not a doi", &CancelToken::new())
            .unwrap_err();
        assert_matches!(err, BibError::InvalidIdentifier { kind: "DOI", .. });
        assert!(err.is_provider_failure());
    }

    #[test]
    fn cancelled_token_stops_before_request() {
        let provider = DoiProvider::new(&ResolvedConfig::default())
            .unwrap()
            .with_base_url("http://127.0.0.1:9");
        let cancel = CancelToken::new();
        cancel.cancel();
        let err = provider.lookup_by_id("10.1000/xyz", &cancel).unwrap_err();
        assert_matches!(err, BibError::Cancelled);
    }

    #[test]
    fn maps_chapter_container_to_booktitle() {
        let message: CrossrefMessage = serde_json::from_str(
            r#"{"type": "book-chapter", "container-title": ["Handbook"], "page": "1-10"}"#,
        )
        .unwrap();
        let entry = entry_from_crossref(&message);
        assert_eq!(entry.entry_type, "incollection");
        assert_eq!(entry.field("booktitle"), Some("Handbook"));
        assert_eq!(entry.field("pages"), Some("1--10"));
    }
}
