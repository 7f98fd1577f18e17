use crate::prefs::Prefs;
use crate::state::AppState;
use crate::worker;
use axum::{Form, extract::State, http::StatusCode, response::Html};
use serde::Deserialize;
use std::path::PathBuf;
use tracing::{error, info};

const PAGE_TEMPLATE: &str = include_str!("index.html");

const ALLOWED_URL_PREFIXES: &[&str] = &["https://www.youtube.com", "https://youtu.be"];

#[derive(Debug, Deserialize)]
pub struct DownloadForm {
    pub url: String,
    pub folder: String,
    // Checkbox: present ("on") when ticked, absent otherwise.
    #[serde(default)]
    pub set_default: Option<String>,
}

pub async fn index(State(state): State<AppState>) -> Result<Html<String>, StatusCode> {
    let prefs = state.prefs.load().map_err(internal_error)?;
    Ok(render_page(&prefs.download_folder, ""))
}

pub async fn submit(
    State(state): State<AppState>,
    Form(form): Form<DownloadForm>,
) -> Result<Html<String>, StatusCode> {
    if !is_allowed_url(&form.url) {
        info!("Rejected download URL: {}", form.url);
        let prefs = state.prefs.load().map_err(internal_error)?;
        return Ok(render_page(
            &prefs.download_folder,
            "Only youtube.com and youtu.be URLs are supported.",
        ));
    }

    let folder = form.folder.trim();
    if folder.is_empty() {
        let prefs = state.prefs.load().map_err(internal_error)?;
        return Ok(render_page(&prefs.download_folder, "A download folder is required."));
    }
    let folder = PathBuf::from(folder);

    if form.set_default.is_some() {
        state
            .prefs
            .save(&Prefs {
                download_folder: folder.clone(),
            })
            .map_err(internal_error)?;
    }

    // One request, one fresh view: older entries (including errored ones)
    // are dropped before the new worker is launched.
    state.statuses.clear();
    worker::spawn_download(
        state.settings.ytdlp_path.clone(),
        worker::new_download_id(),
        form.url,
        folder,
        state.statuses.clone(),
        state.workers.clone(),
    );

    let prefs = state.prefs.load().map_err(internal_error)?;
    Ok(render_page(&prefs.download_folder, "Download started."))
}

fn render_page(folder: &std::path::Path, message: &str) -> Html<String> {
    Html(
        PAGE_TEMPLATE
            .replace("{{folder}}", &escape_html(&folder.to_string_lossy()))
            .replace("{{message}}", &escape_html(message)),
    )
}

fn is_allowed_url(url: &str) -> bool {
    ALLOWED_URL_PREFIXES
        .iter()
        .any(|prefix| url.starts_with(prefix))
}

fn escape_html(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

fn internal_error(e: std::io::Error) -> StatusCode {
    error!("Preferences store failure: {}", e);
    StatusCode::INTERNAL_SERVER_ERROR
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_only_known_url_prefixes() {
        assert!(is_allowed_url("https://www.youtube.com/watch?v=abc123"));
        assert!(is_allowed_url("https://youtu.be/abc123"));
        assert!(!is_allowed_url("https://vimeo.com/12345"));
        assert!(!is_allowed_url("http://www.youtube.com/watch?v=abc123"));
        assert!(!is_allowed_url("youtube.com/watch?v=abc123"));
        assert!(!is_allowed_url(""));
    }

    #[test]
    fn rendered_page_escapes_values() {
        let Html(page) = render_page(std::path::Path::new("/tmp/<out>"), "a \"b\"");
        assert!(page.contains("/tmp/&lt;out&gt;"));
        assert!(page.contains("a &quot;b&quot;"));
        assert!(!page.contains("{{folder}}"));
        assert!(!page.contains("{{message}}"));
    }
}
