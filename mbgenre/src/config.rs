use crate::genres::{FormatOptions, GenreSource};
use crate::musicbrainz::DEFAULT_BASE_URL;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tokio::fs;

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Zero keeps every genre.
    pub max_genres: usize,
    /// Leave albums that already carry a genre alone.
    pub unset_only: bool,
    pub separator: String,
    pub source_order: Vec<GenreSource>,
    pub title_case: bool,
    /// Also write genres into the audio files, not just the library.
    pub write: bool,
    pub library: PathBuf,
    pub base_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_genres: 5,
            unset_only: true,
            separator: ", ".to_string(),
            source_order: vec![
                GenreSource::Release,
                GenreSource::ReleaseGroup,
                GenreSource::Artists,
            ],
            title_case: false,
            write: true,
            library: default_library_path(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

impl Config {
    pub fn format_options(&self) -> FormatOptions {
        FormatOptions {
            max_genres: self.max_genres,
            separator: self.separator.clone(),
            title_case: self.title_case,
        }
    }
}

fn home_dir() -> PathBuf {
    PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".to_string()))
}

pub fn default_library_path() -> PathBuf {
    home_dir().join(".config/beets/library.db")
}

pub fn default_config_path() -> PathBuf {
    home_dir().join(".config/mbgenre/config.toml")
}

pub fn parse_config(content: &str) -> Result<Config> {
    toml::from_str(content).context("Failed to parse config file")
}

/// Load `path`, or the default location when none is given. Only the
/// default location may be absent.
pub async fn load_config(path: Option<&Path>) -> Result<Config> {
    let (path, explicit) = match path {
        Some(path) => (path.to_path_buf(), true),
        None => (default_config_path(), false),
    };

    if !explicit && !fs::try_exists(&path).await.unwrap_or(false) {
        return Ok(Config::default());
    }

    let content = fs::read_to_string(&path)
        .await
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_config(&content)
}
