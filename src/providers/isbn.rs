use reqwest::blocking::Client;
use serde::Deserialize;

use crate::cancel::CancelToken;
use crate::config::ResolvedConfig;
use crate::domain::{Entry, Isbn, extract_year};
use crate::error::BibError;
use crate::providers::{IdProvider, get_json, http_client};

const OPEN_LIBRARY_BASE: &str = "https://openlibrary.org";
const NAME: &str = "ISBN";

#[derive(Debug, Clone)]
pub struct IsbnProvider {
    client: Client,
    base_url: String,
}

impl IsbnProvider {
    pub fn new(config: &ResolvedConfig) -> Result<Self, BibError> {
        Ok(Self {
            client: http_client(NAME, config)?,
            base_url: OPEN_LIBRARY_BASE.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn author_names(
        &self,
        edition: &OpenLibraryEdition,
        cancel: &CancelToken,
    ) -> Result<Vec<String>, BibError> {
        let mut names = Vec::new();
        for author in edition.authors.iter().flatten() {
            let url = format!("{}{}.json", self.base_url, author.key);
            let record: Option<OpenLibraryAuthor> = get_json(&self.client, NAME, &url, cancel)?;
            if let Some(name) = record.and_then(|record| record.name) {
                names.push(name);
            }
        }
        Ok(names)
    }
}

impl IdProvider for IsbnProvider {
    fn name(&self) -> &str {
        NAME
    }

    fn lookup_by_id(&self, id: &str, cancel: &CancelToken) -> Result<Option<Entry>, BibError> {
        let isbn: Isbn = id.parse()?;
        let url = format!("{}/isbn/{}.json", self.base_url, isbn.as_str());
        let Some(edition) = get_json::<OpenLibraryEdition>(&self.client, NAME, &url, cancel)?
        else {
            return Ok(None);
        };
        let authors = self.author_names(&edition, cancel)?;
        Ok(Some(entry_from_open_library(&edition, &authors, &isbn)))
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct OpenLibraryEdition {
    title: Option<String>,
    subtitle: Option<String>,
    publishers: Option<Vec<String>>,
    publish_date: Option<String>,
    number_of_pages: Option<u32>,
    edition_name: Option<String>,
    authors: Option<Vec<OpenLibraryKey>>,
}

#[derive(Debug, Deserialize)]
struct OpenLibraryKey {
    key: String,
}

#[derive(Debug, Deserialize)]
struct OpenLibraryAuthor {
    name: Option<String>,
}

pub fn entry_from_open_library(edition: &OpenLibraryEdition, authors: &[String], isbn: &Isbn) -> Entry {
    let mut entry = Entry::new("book");

    let title = match (&edition.title, &edition.subtitle) {
        (Some(title), Some(subtitle)) => Some(format!("{title}: {subtitle}")),
        (Some(title), None) => Some(title.clone()),
        _ => None,
    };
    if let Some(title) = title {
        entry.set_field("title", &title);
    }
    if !authors.is_empty() {
        entry.set_field("author", &authors.join(" and "));
    }
    if let Some(publisher) = edition.publishers.as_ref().and_then(|p| p.first()) {
        entry.set_field("publisher", publisher);
    }
    if let Some(year) = edition.publish_date.as_deref().and_then(extract_year) {
        entry.set_field("year", year);
    }
    if let Some(pages) = edition.number_of_pages {
        entry.set_field("pagetotal", &pages.to_string());
    }
    if let Some(edition_name) = &edition.edition_name {
        entry.set_field("edition", edition_name);
    }
    entry.set_field("isbn", isbn.as_str());
    entry
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn rejects_bad_checksum() {
        let provider = IsbnProvider::new(&ResolvedConfig::default())
            .unwrap()
            .with_base_url("http://127.0.0.1:9");
        let err = provider
            .lookup_by_id("978-0-306-40615-8", &CancelToken::new())
            .unwrap_err();
        assert_matches!(err, BibError::InvalidIdentifier { kind: "ISBN", .. });
    }

    #[test]
    fn maps_edition_fields() {
        let edition: OpenLibraryEdition = serde_json::from_str(
            r#"{
                "title": "The Pragmatic Programmer",
                "subtitle": "From Journeyman to Master",
                "publishers": ["Addison-Wesley"],
                "publish_date": "October 20, 1999",
                "number_of_pages": 321
            }"#,
        )
        .unwrap();
        let isbn: Isbn = "0-201-61622-X".parse().unwrap();
        let entry = entry_from_open_library(
            &edition,
            &["Andrew Hunt".to_string(), "David Thomas".to_string()],
            &isbn,
        );

        assert_eq!(entry.entry_type, "book");
        assert_eq!(
            entry.title(),
            Some("The Pragmatic Programmer: From Journeyman to Master")
        );
        assert_eq!(entry.field("author"), Some("Andrew Hunt and David Thomas"));
        assert_eq!(entry.year(), Some("1999"));
        assert_eq!(entry.field("year"), Some("1999"));
        assert_eq!(entry.field("isbn"), Some("020161622X"));
    }

    #[test]
    fn undated_edition_has_no_year() {
        let edition: OpenLibraryEdition =
            serde_json::from_str(r#"{"title": "Field Notes", "publish_date": "Spring"}"#).unwrap();
        let isbn: Isbn = "978-0-306-40615-7".parse().unwrap();
        let entry = entry_from_open_library(&edition, &[], &isbn);

        assert!(entry.field("year").is_none());
        assert!(entry.year().is_none());
    }
}
