use crate::status::{DownloadStatus, StatusStore};
use chrono::Utc;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// One stdout line per progress event, fields pipe-separated so they survive
/// yt-dlp's own formatting.
const PROGRESS_TEMPLATE: &str = "download:DL|%(progress.downloaded_bytes)s|%(progress.total_bytes)s|%(progress.total_bytes_estimate)s|%(progress._percent_str)s|%(progress._speed_str)s|%(progress._eta_str)s|%(progress.filename)s";

/// Identifier for a new download, derived from the current time.
pub fn new_download_id() -> String {
    Utc::now().timestamp_millis().to_string()
}

/// Live downloads, id -> cancellation token. Tokens are registered before the
/// worker task starts and dropped when it ends, whatever the outcome.
#[derive(Clone, Debug, Default)]
pub struct WorkerRegistry {
    inner: Arc<Mutex<HashMap<String, CancellationToken>>>,
}

impl WorkerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn register(&self, id: &str) -> CancellationToken {
        let token = CancellationToken::new();
        self.inner
            .lock()
            .unwrap()
            .insert(id.to_string(), token.clone());
        token
    }

    fn deregister(&self, id: &str) {
        self.inner.lock().unwrap().remove(id);
    }

    /// Cancels the worker for `id`. Returns false when no such worker is live.
    pub fn cancel(&self, id: &str) -> bool {
        match self.inner.lock().unwrap().get(id) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }
}

/// Launches a detached worker for `url`. The caller gets no handle back:
/// progress, completion, and failures are all reported through the status
/// store, cancellation goes through the registry.
pub fn spawn_download(
    ytdlp_path: PathBuf,
    id: String,
    url: String,
    folder: PathBuf,
    statuses: StatusStore,
    registry: WorkerRegistry,
) {
    let token = registry.register(&id);
    tokio::spawn(async move {
        run_download(ytdlp_path, &id, url, folder, &statuses, token).await;
        registry.deregister(&id);
    });
}

/// Drives one yt-dlp invocation to completion. Never returns an error: every
/// failure ends up as an `Error` entry in the status store.
async fn run_download(
    ytdlp_path: PathBuf,
    id: &str,
    url: String,
    folder: PathBuf,
    statuses: &StatusStore,
    token: CancellationToken,
) {
    info!("Starting download {} -> {:?} (ID: {})", url, folder, id);

    let mut child = match Command::new(&ytdlp_path)
        .arg("--no-playlist")
        .arg("--newline")
        .arg("--no-warnings")
        .arg("--progress-template")
        .arg(PROGRESS_TEMPLATE)
        .arg("-f")
        .arg("bestvideo+bestaudio")
        .arg("--merge-output-format")
        .arg("mkv")
        .arg("-o")
        .arg(folder.join("%(title)s.%(ext)s"))
        .arg(&url)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
    {
        Ok(child) => child,
        Err(e) => {
            warn!("Failed to start {:?}: {}", ytdlp_path, e);
            statuses.update(
                id,
                DownloadStatus::Error {
                    filename: url,
                    message: format!("Failed to start {}: {}", ytdlp_path.display(), e),
                },
            );
            return;
        }
    };

    // Keep the last stderr line around as the failure message.
    let stderr_tail = child.stderr.take().map(|stderr| {
        tokio::spawn(async move {
            let mut last = None;
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                let trimmed = line.trim();
                if !trimmed.is_empty() {
                    last = Some(trimmed.to_string());
                }
            }
            last
        })
    });

    // The filename shown in the UI: the URL until yt-dlp reports an output
    // file, then that file's basename.
    let mut label = url.clone();

    if let Some(stdout) = child.stdout.take() {
        let mut lines = BufReader::new(stdout).lines();
        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    info!("Cancelling download {} (ID: {})", url, id);
                    let _ = child.kill().await;
                    if let Some(task) = stderr_tail {
                        task.abort();
                    }
                    statuses.remove(id);
                    return;
                }
                line = lines.next_line() => match line {
                    Ok(Some(line)) => {
                        if let Some(mut snapshot) = parse_progress_line(&line) {
                            if let DownloadStatus::Downloading { filename, .. } = &mut snapshot {
                                if filename.is_empty() {
                                    *filename = label.clone();
                                } else {
                                    label = filename.clone();
                                }
                            }
                            statuses.update(id, snapshot);
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        warn!("Lost yt-dlp output stream for {}: {}", id, e);
                        break;
                    }
                }
            }
        }
    }

    let tail = match stderr_tail {
        Some(task) => task.await.ok().flatten(),
        None => None,
    };

    match child.wait().await {
        Ok(status) if status.success() => {
            info!("Download finished: {} (ID: {})", label, id);
            statuses.update(
                id,
                DownloadStatus::Finished {
                    filename: label.clone(),
                },
            );
            // Completed downloads drop out of the UI instead of lingering at 100%.
            statuses.remove(id);
        }
        Ok(status) => {
            let message = tail.unwrap_or_else(|| format!("yt-dlp exited with {}", status));
            warn!("Download failed: {} (ID: {}): {}", label, id, message);
            statuses.update(
                id,
                DownloadStatus::Error {
                    filename: label,
                    message,
                },
            );
        }
        Err(e) => {
            warn!("Failed to wait for yt-dlp (ID: {}): {}", id, e);
            statuses.update(
                id,
                DownloadStatus::Error {
                    filename: label,
                    message: format!("Failed to wait for yt-dlp: {}", e),
                },
            );
        }
    }
}

/// Parses one `--progress-template` stdout line. Lines without the `DL|`
/// marker (merge output, warnings) are skipped.
fn parse_progress_line(line: &str) -> Option<DownloadStatus> {
    let rest = line.trim().strip_prefix("DL|")?;
    let fields: Vec<&str> = rest.splitn(7, '|').collect();
    if fields.len() != 7 {
        return None;
    }

    let downloaded_bytes = parse_bytes(fields[0]).unwrap_or(0);
    // yt-dlp reports NA totals for live fragments; the estimate is a float.
    let total_bytes = parse_bytes(fields[1]).or_else(|| parse_bytes(fields[2]));
    let percent = match non_na(fields[3]) {
        Some(p) => p.to_string(),
        None => match total_bytes {
            Some(total) if total > 0 => {
                format!("{:.1}%", downloaded_bytes as f64 * 100.0 / total as f64)
            }
            _ => "0.0%".to_string(),
        },
    };
    let speed = non_na(fields[4]).unwrap_or("?").to_string();
    let eta = non_na(fields[5]).unwrap_or("?").to_string();
    let filename = non_na(fields[6])
        .and_then(|p| Path::new(p).file_name())
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    Some(DownloadStatus::Downloading {
        filename,
        downloaded_bytes,
        total_bytes,
        speed,
        eta,
        percent,
    })
}

fn non_na(field: &str) -> Option<&str> {
    let trimmed = field.trim();
    (!trimmed.is_empty() && trimmed != "NA").then_some(trimmed)
}

fn parse_bytes(field: &str) -> Option<u64> {
    non_na(field)?.parse::<f64>().ok().map(|v| v as u64)
}
