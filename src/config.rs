use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub server_port: u16,
    pub data_dir: PathBuf,
    pub ytdlp_path: PathBuf,
    pub log_level: String,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let builder = Config::builder()
            // Default settings
            .set_default("server_port", 5000)?
            .set_default("data_dir", "./data")?
            .set_default("ytdlp_path", "yt-dlp")?
            .set_default("log_level", "info")?
            // Config file (optional)
            .add_source(File::with_name("config").required(false))
            // Environment variables (e.g. TUBEDECK_SERVER_PORT=8080)
            .add_source(Environment::with_prefix("TUBEDECK"));

        builder.build()?.try_deserialize()
    }
}
