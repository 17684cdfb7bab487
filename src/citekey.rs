use tracing::debug;

use crate::config::KeyPattern;
use crate::domain::Entry;
use crate::library::Destination;

const FUNCTION_WORDS: &[&str] = &[
    "a", "an", "and", "at", "by", "for", "from", "in", "of", "on", "the", "to", "with",
];

pub trait KeyGenerator {
    /// Overwrites `entry.citation_key`. Leaves it `None` when the pattern
    /// expands to nothing for this entry.
    fn generate_and_assign(&self, entry: &mut Entry, library: &dyn Destination, pattern: &KeyPattern);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PatternKeyGenerator;

impl KeyGenerator for PatternKeyGenerator {
    fn generate_and_assign(&self, entry: &mut Entry, library: &dyn Destination, pattern: &KeyPattern) {
        let base = sanitize(&expand(pattern.as_str(), entry));
        if base.is_empty() {
            entry.citation_key = None;
            return;
        }

        let mut key = base.clone();
        let mut index = 0usize;
        while library.contains_key(&key) {
            key = format!("{base}{}", suffix(index));
            index += 1;
        }
        debug!(key = %key, "citation key generated");
        entry.citation_key = Some(key);
    }
}

pub fn expand(pattern: &str, entry: &Entry) -> String {
    let mut out = String::new();
    let mut rest = pattern;
    while let Some(start) = rest.find('[') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        match after.find(']') {
            Some(end) => {
                out.push_str(&expand_token(&after[..end], entry));
                rest = &after[end + 1..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

fn expand_token(token: &str, entry: &Entry) -> String {
    let surnames = entry
        .authors()
        .into_iter()
        .map(Entry::surname)
        .collect::<Vec<_>>();
    match token {
        "auth" => surnames.first().map(|s| s.to_string()).unwrap_or_default(),
        "authors" => surnames.concat(),
        "authors2" => match surnames.len() {
            0..=2 => surnames.concat(),
            _ => format!("{}EtAl", surnames[0]),
        },
        "year" => entry.year().unwrap_or_default().to_string(),
        "title" => title_words(entry, usize::MAX),
        "shorttitle" => title_words(entry, 3),
        "veryshorttitle" => title_words(entry, 1),
        _ => String::new(),
    }
}

fn title_words(entry: &Entry, limit: usize) -> String {
    let Some(title) = entry.title() else {
        return String::new();
    };
    title
        .split(|ch: char| ch.is_whitespace() || ch == '-' || ch == ':')
        .filter(|word| !word.is_empty())
        .filter(|word| !FUNCTION_WORDS.contains(&word.to_lowercase().as_str()))
        .take(limit)
        .map(capitalize)
        .collect()
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn sanitize(value: &str) -> String {
    value
        .chars()
        .filter(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | ':'))
        .collect()
}

fn suffix(mut index: usize) -> String {
    let mut out = Vec::new();
    loop {
        out.push(b'a' + (index % 26) as u8);
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}
