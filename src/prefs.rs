use camino::{Utf8Path, Utf8PathBuf};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::BibError;
use crate::fs_util::{read_json, write_json_atomic};

pub trait PreferenceStore {
    fn default_provider_name(&self) -> Option<String>;
    fn set_default_provider_name(&self, name: &str) -> Result<(), BibError>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Preferences {
    #[serde(default)]
    id_provider: Option<String>,
}

#[derive(Debug, Clone)]
pub struct JsonPreferences {
    path: Utf8PathBuf,
}

impl JsonPreferences {
    pub fn new(path: &Utf8Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    pub fn default_location() -> Result<Self, BibError> {
        let dirs = ProjectDirs::from("org", "bibfetch", "bibfetch").ok_or_else(|| {
            BibError::Filesystem("unable to resolve config directory".to_string())
        })?;
        let path = Utf8PathBuf::from_path_buf(dirs.config_dir().join("preferences.json"))
            .map_err(|_| BibError::Filesystem("invalid config path".to_string()))?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    fn load(&self) -> Result<Preferences, BibError> {
        Ok(read_json(&self.path)?.unwrap_or_default())
    }
}

impl PreferenceStore for JsonPreferences {
    fn default_provider_name(&self) -> Option<String> {
        self.load().ok().and_then(|prefs| prefs.id_provider)
    }

    fn set_default_provider_name(&self, name: &str) -> Result<(), BibError> {
        let mut prefs = self.load().unwrap_or_default();
        prefs.id_provider = Some(name.to_string());
        write_json_atomic(&self.path, &prefs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_name_round_trips() {
        let temp = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(temp.path().join("prefs.json")).unwrap();
        let prefs = JsonPreferences::new(&path);

        assert!(prefs.default_provider_name().is_none());
        prefs.set_default_provider_name("ISBN").unwrap();
        assert_eq!(
            JsonPreferences::new(&path).default_provider_name().as_deref(),
            Some("ISBN")
        );
    }

    #[test]
    fn corrupt_file_reads_as_unset() {
        let temp = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(temp.path().join("prefs.json")).unwrap();
        std::fs::write(path.as_std_path(), b"{not json").unwrap();

        let prefs = JsonPreferences::new(&path);
        assert!(prefs.default_provider_name().is_none());
        prefs.set_default_provider_name("DOI").unwrap();
        assert_eq!(prefs.default_provider_name().as_deref(), Some("DOI"));
    }
}
