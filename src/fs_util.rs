use std::fs;
use std::io::Write;

use camino::Utf8Path;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::BibError;

pub fn write_json_atomic<T: Serialize>(path: &Utf8Path, value: &T) -> Result<(), BibError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent,
        _ => Utf8Path::new("."),
    };
    fs::create_dir_all(parent.as_std_path())
        .map_err(|err| BibError::Filesystem(err.to_string()))?;

    let content =
        serde_json::to_vec_pretty(value).map_err(|err| BibError::Filesystem(err.to_string()))?;
    let mut temp = tempfile::Builder::new()
        .prefix(".bibfetch")
        .tempfile_in(parent.as_std_path())
        .map_err(|err| BibError::Filesystem(err.to_string()))?;
    temp.write_all(&content)
        .map_err(|err| BibError::Filesystem(err.to_string()))?;
    temp.persist(path.as_std_path())
        .map_err(|err| BibError::Filesystem(err.to_string()))?;
    Ok(())
}

pub fn read_json<T: DeserializeOwned>(path: &Utf8Path) -> Result<Option<T>, BibError> {
    if !path.as_std_path().exists() {
        return Ok(None);
    }
    let content =
        fs::read_to_string(path.as_std_path()).map_err(|err| BibError::Filesystem(err.to_string()))?;
    let value = serde_json::from_str(&content)
        .map_err(|err| BibError::LibraryParse(format!("{path}: {err}")))?;
    Ok(Some(value))
}
