use std::io::{self, Write};

use crossterm::style::Stylize;
use serde::Serialize;

use crate::app::{FetchReport, LibraryListing, ProviderListing};
use crate::outcome::Resolution;

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Interactive,
    NonInteractive,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_fetch(report: &FetchReport) -> io::Result<()> {
        Self::print_json(report)
    }

    pub fn print_providers(listing: &ProviderListing) -> io::Result<()> {
        Self::print_json(listing)
    }

    pub fn print_library(listing: &LibraryListing) -> io::Result<()> {
        Self::print_json(listing)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

pub struct TextOutput;

impl TextOutput {
    pub fn print_fetch(report: &FetchReport) -> io::Result<()> {
        let mut stdout = io::stdout();
        let subject = format!("{} {}", report.provider, report.identifier);
        match &report.resolution {
            Resolution::Inserted => {
                writeln!(stdout, "{} {subject}", "added".green().bold())?;
                if let Some(entry) = &report.entry {
                    writeln!(stdout, "{}", entry.to_bibtex())?;
                }
            }
            Resolution::QueuedForReview => {
                writeln!(
                    stdout,
                    "{} {subject}: possible duplicate, queued for review",
                    "review".yellow().bold()
                )?;
            }
            Resolution::NotFound => {
                writeln!(stdout, "{} {subject}: no entry found", "empty".dim())?;
            }
            Resolution::Cancelled => {
                writeln!(stdout, "{} {subject}", "cancelled".dim())?;
            }
            Resolution::EmptyIdentifier | Resolution::Failed { .. } => {}
        }
        Ok(())
    }

    pub fn print_providers(listing: &ProviderListing) -> io::Result<()> {
        let mut stdout = io::stdout();
        for item in &listing.providers {
            if item.selected {
                writeln!(stdout, "* {}", item.name.as_str().bold())?;
            } else {
                writeln!(stdout, "  {}", item.name)?;
            }
        }
        Ok(())
    }

    pub fn print_library(listing: &LibraryListing) -> io::Result<()> {
        let mut stdout = io::stdout();
        for entry in &listing.entries {
            writeln!(stdout, "{}\n", entry.to_bibtex())?;
        }
        Ok(())
    }
}
