use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Snapshot of one download as reported to polling clients.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DownloadStatus {
    Downloading {
        filename: String,
        downloaded_bytes: u64,
        total_bytes: Option<u64>,
        speed: String,
        eta: String,
        percent: String,
    },
    Finished {
        filename: String,
    },
    Error {
        filename: String,
        message: String,
    },
}

/// Shared in-memory progress map, keyed by download identifier. Workers write
/// into it on every progress event; `/status` reads a snapshot. Entries for
/// errored downloads stay until the next request clears the store.
#[derive(Clone, Debug, Default)]
pub struct StatusStore {
    inner: Arc<Mutex<HashMap<String, DownloadStatus>>>,
}

impl StatusStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops every entry. A download still running keeps its identifier and
    /// re-inserts itself on its next progress event.
    pub fn clear(&self) {
        self.inner.lock().unwrap().clear();
    }

    pub fn update(&self, id: &str, entry: DownloadStatus) {
        self.inner.lock().unwrap().insert(id.to_string(), entry);
    }

    pub fn remove(&self, id: &str) {
        self.inner.lock().unwrap().remove(id);
    }

    pub fn read_all(&self) -> HashMap<String, DownloadStatus> {
        self.inner.lock().unwrap().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn downloading(percent: &str) -> DownloadStatus {
        DownloadStatus::Downloading {
            filename: "video.mkv".to_string(),
            downloaded_bytes: 42,
            total_bytes: Some(100),
            speed: "1.00MiB/s".to_string(),
            eta: "00:10".to_string(),
            percent: percent.to_string(),
        }
    }

    #[test]
    fn cleared_store_reads_empty() {
        let store = StatusStore::new();
        store.update("1", downloading("10.0%"));
        store.clear();
        assert!(store.read_all().is_empty());
    }

    #[test]
    fn updates_keep_latest_entry_per_id() {
        let store = StatusStore::new();
        store.update("1", downloading("10.0%"));
        store.update("2", downloading("50.0%"));
        store.update("1", downloading("42.0%"));

        let all = store.read_all();
        assert_eq!(all.len(), 2);
        assert_eq!(all.get("1"), Some(&downloading("42.0%")));
        assert_eq!(all.get("2"), Some(&downloading("50.0%")));
    }

    #[test]
    fn remove_deletes_and_ignores_unknown_ids() {
        let store = StatusStore::new();
        store.update("1", downloading("10.0%"));
        store.remove("1");
        store.remove("missing");
        assert!(store.read_all().is_empty());
    }

    #[test]
    fn status_serializes_with_tag() {
        let json = serde_json::to_value(downloading("42.0%")).unwrap();
        assert_eq!(json["status"], "downloading");
        assert_eq!(json["percent"], "42.0%");

        let json = serde_json::to_value(DownloadStatus::Error {
            filename: "video.mkv".to_string(),
            message: "network unreachable".to_string(),
        })
        .unwrap();
        assert_eq!(json["status"], "error");
    }
}
