use serde::{Deserialize, Serialize};
use std::io;
use std::path::PathBuf;
use tracing::info;

const PREFS_FILE: &str = "prefs.json";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Prefs {
    pub download_folder: PathBuf,
}

impl Default for Prefs {
    fn default() -> Self {
        Self {
            download_folder: dirs::download_dir().unwrap_or_else(|| PathBuf::from(".")),
        }
    }
}

/// Persisted user preferences, one JSON file rewritten wholesale on save.
/// No locking; last writer wins.
#[derive(Debug, Clone)]
pub struct PrefsStore {
    path: PathBuf,
}

impl PrefsStore {
    pub fn new(data_dir: &std::path::Path) -> Self {
        Self {
            path: data_dir.join(PREFS_FILE),
        }
    }

    /// Reads the stored preferences, falling back to the platform download
    /// directory when nothing has been saved yet.
    pub fn load(&self) -> io::Result<Prefs> {
        if !self.path.exists() {
            return Ok(Prefs::default());
        }
        let content = std::fs::read_to_string(&self.path)?;
        serde_json::from_str(&content).map_err(io::Error::other)
    }

    pub fn save(&self, prefs: &Prefs) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(prefs).map_err(io::Error::other)?;
        std::fs::write(&self.path, content)?;
        info!("Saved default download folder: {:?}", prefs.download_folder);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn load_without_file_returns_platform_default() {
        let tmp = tempdir().unwrap();
        let store = PrefsStore::new(tmp.path());
        let prefs = store.load().unwrap();
        assert_eq!(prefs, Prefs::default());
    }

    #[test]
    fn save_then_load_roundtrips() {
        let tmp = tempdir().unwrap();
        let store = PrefsStore::new(tmp.path());
        let prefs = Prefs {
            download_folder: PathBuf::from("/tmp/new"),
        };
        store.save(&prefs).unwrap();
        assert_eq!(store.load().unwrap(), prefs);
    }

    #[test]
    fn save_creates_missing_data_dir() {
        let tmp = tempdir().unwrap();
        let store = PrefsStore::new(&tmp.path().join("nested"));
        store
            .save(&Prefs {
                download_folder: PathBuf::from("/tmp/out"),
            })
            .unwrap();
        assert!(tmp.path().join("nested").join(PREFS_FILE).exists());
    }
}
