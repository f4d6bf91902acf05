use thiserror::Error;

/// Failures while resolving the genres of a single album.
#[derive(Error, Debug)]
pub enum GenreError {
    #[error("No MusicBrainz album ID is set in library metadata")]
    MissingAlbumId,

    /// MusicBrainz answered, but with an error document or status.
    #[error("MusicBrainz error: {0}")]
    Api(String),

    #[error("Failed to decode MusicBrainz response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("MusicBrainz request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

impl GenreError {
    /// Whether a batch run should log this and move on to the next album.
    /// Transport failures usually mean every following request fails too.
    pub fn is_skippable(&self) -> bool {
        !matches!(self, Self::Transport(_))
    }
}
