use crate::config::Config;
use crate::error::GenreError;
use crate::genres::{FormatOptions, GenreSource, format_genres, rank_genres};
use crate::library::{Album, Item, Library};
use crate::musicbrainz::ReleaseLookup;
use crate::tagging;
use anyhow::{Context, Result};
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct TaggerOptions {
    pub source_order: Vec<GenreSource>,
    pub format: FormatOptions,
    pub unset_only: bool,
    /// Log what would change without storing anything.
    pub pretend: bool,
}

impl TaggerOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            source_order: config.source_order.clone(),
            format: config.format_options(),
            unset_only: config.unset_only,
            pretend: false,
        }
    }
}

/// What the import pipeline hands over after adding music to the library.
#[derive(Debug)]
pub enum ImportTask {
    Album(Album),
    Singleton(Item),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved,
    NoGenres,
}

/// Tally of a batch run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub updated: usize,
    pub already_set: usize,
    pub without_genres: usize,
    pub failed: usize,
}

pub struct GenreTagger<L> {
    lookup: L,
    options: TaggerOptions,
}

impl<L: ReleaseLookup> GenreTagger<L> {
    pub fn new(lookup: L, options: TaggerOptions) -> Self {
        Self { lookup, options }
    }

    fn keeps_existing(&self, album: &Album) -> bool {
        self.options.unset_only && !album.genre.is_empty()
    }

    /// Fetch, rank and format the genres of one album.
    pub async fn album_genres(&self, album: &Album) -> Result<String, GenreError> {
        let mbid = album.mb_albumid.trim();
        if mbid.is_empty() {
            return Err(GenreError::MissingAlbumId);
        }

        let release = self
            .lookup
            .lookup_release(mbid, &self.options.source_order)
            .await?;
        let names = rank_genres(&release, &self.options.source_order);
        debug!(album = %album, release = %release.title, ranked = names.len(), "Ranked genres");

        Ok(format_genres(&names, &self.options.format))
    }

    /// Store `genres` on the album and every one of its tracks, and into the
    /// audio files too when `write` is set.
    pub fn save_album_genres(
        &self,
        lib: &impl Library,
        album: &mut Album,
        genres: &str,
        write: bool,
    ) -> Result<SaveOutcome> {
        if genres.is_empty() {
            warn!("{album}: No genres found - no changes will be made");
            return Ok(SaveOutcome::NoGenres);
        }

        info!("{album}: {genres}");
        if self.options.pretend {
            return Ok(SaveOutcome::Saved);
        }

        album.genre = genres.to_string();
        lib.store_album(album)?;

        for mut item in lib.items(album)? {
            item.genre = genres.to_string();
            lib.store_item(&item)?;
            if write {
                tagging::try_write(&item);
            }
        }

        Ok(SaveOutcome::Saved)
    }

    /// Tag every album matching `query`, one MusicBrainz lookup each.
    pub async fn run_command(
        &self,
        lib: &impl Library,
        query: &[String],
        write: bool,
    ) -> Result<Summary> {
        let mut summary = Summary::default();

        for mut album in lib.albums(query)? {
            if self.keeps_existing(&album) {
                debug!("{album}: Skipping - genre data already set");
                summary.already_set += 1;
                continue;
            }

            debug!("Getting genres for {album}");
            let genres = match self.album_genres(&album).await {
                Ok(genres) => genres,
                Err(e) if e.is_skippable() => {
                    warn!("{album}: skipping - {e}");
                    summary.failed += 1;
                    continue;
                }
                Err(e) => return Err(e).with_context(|| format!("{album}")),
            };

            match self.save_album_genres(lib, &mut album, &genres, write)? {
                SaveOutcome::Saved => summary.updated += 1,
                SaveOutcome::NoGenres => summary.without_genres += 1,
            }
        }

        Ok(summary)
    }

    /// Import pipeline hook. Files are not rewritten here; the importer
    /// writes tags itself once every stage has run.
    pub async fn import_stage(&self, lib: &impl Library, task: &mut ImportTask) -> Result<()> {
        match task {
            ImportTask::Album(album) => {
                debug!("Getting genres for {album}");
                if self.keeps_existing(album) {
                    debug!("{album}: Skipping - genre data already set");
                    return Ok(());
                }

                match self.album_genres(album).await {
                    Ok(genres) => {
                        self.save_album_genres(lib, album, &genres, false)?;
                    }
                    Err(e) if e.is_skippable() => warn!("{album}: {e}"),
                    Err(e) => return Err(e).with_context(|| format!("{album}")),
                }
            }
            ImportTask::Singleton(item) => {
                warn!("{item}: Not an album, cannot get release genre data from MusicBrainz");
            }
        }

        Ok(())
    }
}
