use crate::error::GenreError;
use crate::genres::GenreSource;
use anyhow::{Context, Result, bail};
use reqwest::{StatusCode, header};
use serde::Deserialize;
use std::future::Future;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{Instant, sleep};
use tracing::debug;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://musicbrainz.org/ws/2";

const USER_AGENT: &str = concat!(
    "mbgenre/",
    env!("CARGO_PKG_VERSION"),
    " ( https://codeberg.org/mtmn/tools )"
);

const TIMEOUT: Duration = Duration::from_secs(30);

/// MusicBrainz allows one request per second per client.
const RATE_LIMIT_INTERVAL: Duration = Duration::from_secs(1);

/// Fetches release documents by MusicBrainz release ID.
pub trait ReleaseLookup {
    fn lookup_release(
        &self,
        mbid: &str,
        sources: &[GenreSource],
    ) -> impl Future<Output = Result<Release, GenreError>> + Send;
}

pub struct MusicBrainzClient {
    client: reqwest::Client,
    base_url: Url,
    last_request: Mutex<Option<Instant>>,
}

impl MusicBrainzClient {
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_builder(base_url, reqwest::Client::builder())
    }

    fn with_builder(base_url: &str, builder: reqwest::ClientBuilder) -> Result<Self> {
        let base_url =
            Url::parse(base_url).with_context(|| format!("Invalid MusicBrainz URL: {base_url}"))?;
        if base_url.cannot_be_a_base() {
            bail!("MusicBrainz URL cannot be used as a base: {base_url}");
        }

        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::USER_AGENT,
            header::HeaderValue::from_static(USER_AGENT),
        );
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );

        let client = builder
            .default_headers(headers)
            .timeout(TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            base_url,
            last_request: Mutex::new(None),
        })
    }

    fn release_url(&self, mbid: &str) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().extend(["release", mbid]);
        }
        url
    }

    async fn wait_for_slot(&self) {
        let mut last_request = self.last_request.lock().await;

        if let Some(last) = *last_request {
            let elapsed = last.elapsed();
            if elapsed < RATE_LIMIT_INTERVAL {
                let wait = RATE_LIMIT_INTERVAL - elapsed;
                debug!(wait_ms = wait.as_millis(), "Waiting for MusicBrainz rate limit");
                sleep(wait).await;
            }
        }

        *last_request = Some(Instant::now());
    }
}

impl ReleaseLookup for MusicBrainzClient {
    async fn lookup_release(
        &self,
        mbid: &str,
        sources: &[GenreSource],
    ) -> Result<Release, GenreError> {
        self.wait_for_slot().await;

        let url = self.release_url(mbid);
        let inc = include_params(sources);
        debug!(%url, %inc, "Looking up MusicBrainz release");

        let response = self
            .client
            .get(url)
            .query(&[("inc", inc.as_str()), ("fmt", "json")])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        parse_release(status, &body)
    }
}

/// Sections to request alongside the release. Genres of the release group
/// and artists only come back when those entities are included.
pub fn include_params(sources: &[GenreSource]) -> String {
    let mut inc = vec!["genres"];
    if sources.contains(&GenreSource::ReleaseGroup) {
        inc.push("release-groups");
    }
    if sources.contains(&GenreSource::Artists) {
        inc.push("artists");
    }
    inc.join(" ")
}

/// Turn a MusicBrainz response into a release, surfacing its `error` field.
pub fn parse_release(status: StatusCode, body: &str) -> Result<Release, GenreError> {
    let document: serde_json::Value = match serde_json::from_str(body) {
        Ok(document) => document,
        Err(e) if status.is_success() => return Err(e.into()),
        Err(_) => return Err(GenreError::Api(format!("HTTP {status}"))),
    };

    if let Some(error) = document.get("error") {
        let message = error
            .as_str()
            .map_or_else(|| error.to_string(), str::to_string);
        return Err(GenreError::Api(message));
    }

    if !status.is_success() {
        return Err(GenreError::Api(format!("HTTP {status}")));
    }

    Ok(serde_json::from_value(document)?)
}

// --- Serde Structs ---

#[derive(Deserialize, Debug, Default)]
pub struct Release {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub genres: Vec<MbGenre>,
    #[serde(rename = "release-group")]
    pub release_group: Option<MbReleaseGroup>,
    #[serde(rename = "artist-credit", default)]
    pub artist_credit: Vec<MbArtistCredit>,
}

#[derive(Deserialize, Debug)]
pub struct MbGenre {
    pub name: String,
    #[serde(default)]
    pub count: u32,
}

#[derive(Deserialize, Debug, Default)]
pub struct MbReleaseGroup {
    #[serde(default)]
    pub genres: Vec<MbGenre>,
}

#[derive(Deserialize, Debug)]
pub struct MbArtistCredit {
    pub artist: Option<MbArtist>,
}

#[derive(Deserialize, Debug)]
pub struct MbArtist {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub genres: Vec<MbGenre>,
}
