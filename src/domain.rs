use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use clap::ValueEnum;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::BibError;

static DOI_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:https?://(?:dx\.)?doi\.org/|doi:\s*)").expect("valid DOI prefix regex")
});
static DOI_BODY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^10\.\d{4,9}/\S+$").expect("valid DOI regex"));
static YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{4})\b").expect("valid year regex"));

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LibraryMode {
    #[default]
    Bibtex,
    Biblatex,
}

impl fmt::Display for LibraryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LibraryMode::Bibtex => write!(f, "bibtex"),
            LibraryMode::Biblatex => write!(f, "biblatex"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub entry_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citation_key: Option<String>,
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
}

impl Entry {
    pub fn new(entry_type: &str) -> Self {
        Self {
            entry_type: entry_type.to_lowercase(),
            citation_key: None,
            fields: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, name: &str, value: &str) -> Self {
        self.set_field(name, value);
        self
    }

    pub fn set_field(&mut self, name: &str, value: &str) {
        let value = value.trim();
        if value.is_empty() {
            return;
        }
        self.fields.insert(name.to_lowercase(), value.to_string());
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn title(&self) -> Option<&str> {
        self.field("title")
    }

    pub fn authors(&self) -> Vec<&str> {
        self.field("author")
            .or_else(|| self.field("editor"))
            .map(|value| value.split(" and ").map(str::trim).collect())
            .unwrap_or_default()
    }

    pub fn surname(author: &str) -> &str {
        match author.split_once(',') {
            Some((last, _)) => last.trim(),
            None => author.split_whitespace().last().unwrap_or(author),
        }
    }

    pub fn year(&self) -> Option<&str> {
        extract_year(self.field("year").or_else(|| self.field("date"))?)
    }

    pub fn to_bibtex(&self) -> String {
        let mut out = format!(
            "@{}{{{},\n",
            self.entry_type,
            self.citation_key.as_deref().unwrap_or("")
        );
        for (name, value) in &self.fields {
            out.push_str(&format!("  {name} = {{{value}}},\n"));
        }
        out.push('}');
        out
    }
}

pub fn extract_year(value: &str) -> Option<&str> {
    YEAR.captures(value)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Doi(String);

impl Doi {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn matches(&self, other: &str) -> bool {
        match other.parse::<Doi>() {
            Ok(other) => self.0.eq_ignore_ascii_case(&other.0),
            Err(_) => false,
        }
    }
}

impl fmt::Display for Doi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Doi {
    type Err = BibError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        let normalized = DOI_PREFIX.replace(trimmed, "");
        if !DOI_BODY.is_match(&normalized) {
            return Err(BibError::InvalidIdentifier {
                kind: "DOI",
                value: value.to_string(),
            });
        }
        Ok(Self(normalized.into_owned()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Isbn(String);

impl Isbn {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Isbn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Isbn {
    type Err = BibError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value
            .trim()
            .chars()
            .filter(|ch| *ch != '-' && !ch.is_whitespace())
            .collect::<String>()
            .to_uppercase();
        let is_valid = match normalized.len() {
            10 => isbn10_checksum(&normalized),
            13 => isbn13_checksum(&normalized),
            _ => false,
        };
        if !is_valid {
            return Err(BibError::InvalidIdentifier {
                kind: "ISBN",
                value: value.to_string(),
            });
        }
        Ok(Self(normalized))
    }
}

fn isbn10_checksum(value: &str) -> bool {
    let mut sum = 0u32;
    for (idx, ch) in value.chars().enumerate() {
        let digit = match ch {
            'X' if idx == 9 => 10,
            _ => match ch.to_digit(10) {
                Some(digit) => digit,
                None => return false,
            },
        };
        sum += digit * (10 - idx as u32);
    }
    sum % 11 == 0
}

fn isbn13_checksum(value: &str) -> bool {
    let mut sum = 0u32;
    for (idx, ch) in value.chars().enumerate() {
        let Some(digit) = ch.to_digit(10) else {
            return false;
        };
        sum += if idx % 2 == 0 { digit } else { digit * 3 };
    }
    sum % 10 == 0
}
