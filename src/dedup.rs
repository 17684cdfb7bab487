use crate::domain::{Doi, Entry, Isbn, LibraryMode};
use crate::library::Destination;

pub trait DuplicateResolver {
    fn find_duplicate<'a>(
        &self,
        library: &'a dyn Destination,
        entry: &Entry,
        mode: LibraryMode,
    ) -> Option<&'a Entry>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EntryDuplicateCheck;

impl DuplicateResolver for EntryDuplicateCheck {
    fn find_duplicate<'a>(
        &self,
        library: &'a dyn Destination,
        entry: &Entry,
        mode: LibraryMode,
    ) -> Option<&'a Entry> {
        library
            .entries()
            .iter()
            .find(|existing| is_duplicate(existing, entry, mode))
    }
}

pub fn is_duplicate(a: &Entry, b: &Entry, mode: LibraryMode) -> bool {
    if let (Some(left), Some(right)) = (a.field("doi"), b.field("doi")) {
        return match left.parse::<Doi>() {
            Ok(doi) => doi.matches(right),
            Err(_) => left.eq_ignore_ascii_case(right),
        };
    }
    if let (Some(left), Some(right)) = (a.field("isbn"), b.field("isbn")) {
        return match (left.parse::<Isbn>(), right.parse::<Isbn>()) {
            (Ok(left), Ok(right)) => left == right,
            _ => left == right,
        };
    }

    if a.entry_type != b.entry_type {
        return false;
    }
    let (Some(left), Some(right)) = (a.title(), b.title()) else {
        return false;
    };
    if normalize(left) != normalize(right) {
        return false;
    }
    if let (Some(left), Some(right)) = (a.year(), b.year()) {
        if left != right {
            return false;
        }
    }
    if let (Some(left), Some(right)) = (first_surname(a), first_surname(b)) {
        if normalize(left) != normalize(right) {
            return false;
        }
    }
    if let (Some(left), Some(right)) = (venue(a, mode), venue(b, mode)) {
        if normalize(left) != normalize(right) {
            return false;
        }
    }
    true
}

fn first_surname(entry: &Entry) -> Option<&str> {
    entry.authors().first().map(|author| Entry::surname(author))
}

fn venue(entry: &Entry, mode: LibraryMode) -> Option<&str> {
    match mode {
        LibraryMode::Bibtex => entry.field("journal"),
        LibraryMode::Biblatex => entry
            .field("journaltitle")
            .or_else(|| entry.field("journal")),
    }
}

fn normalize(value: &str) -> String {
    value
        .chars()
        .filter(|ch| ch.is_alphanumeric() || ch.is_whitespace())
        .collect::<String>()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
