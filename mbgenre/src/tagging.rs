use crate::library::Item;
use anyhow::{Context, Result};
use lofty::config::WriteOptions;
use lofty::prelude::*;
use lofty::probe::Probe;
use lofty::tag::{ItemKey, Tag};
use std::path::Path;
use tracing::{debug, error, warn};

/// Write the item's genre into its audio file. Failures are logged, not
/// returned, so one broken file doesn't stop the rest of the album.
pub fn try_write(item: &Item) -> bool {
    match write_genre(&item.path, &item.genre) {
        Ok(()) => {
            debug!(path = %item.path.display(), "Wrote genre tag");
            true
        }
        Err(e) => {
            warn!(path = %item.path.display(), "{item}: failed to write tags: {e:#}");
            false
        }
    }
}

fn write_genre(path: &Path, genre: &str) -> Result<()> {
    let path_display = path.display();

    if !path.exists() {
        return Err(anyhow::anyhow!("File does not exist: {path_display}"));
    }

    let mut tagged_file = Probe::open(path)
        .with_context(|| format!("Failed to open file: {path_display}"))?
        .guess_file_type()
        .with_context(|| format!("Failed to detect file type: {path_display}"))?
        .read()
        .with_context(|| format!("Failed to read tags from {path_display}"))?;

    if tagged_file.primary_tag().is_none() {
        let tag_type = tagged_file.primary_tag_type();
        tagged_file.insert_tag(Tag::new(tag_type));
    }
    let tag = tagged_file
        .primary_tag_mut()
        .context("No primary tag found")?;
    tag.insert_text(ItemKey::Genre, genre.to_string());

    // Keep a copy of the original until the save has gone through.
    let backup_path = path.with_extension(format!(
        "backup.{}",
        path.extension()
            .and_then(|s| s.to_str())
            .unwrap_or("bak")
    ));
    std::fs::copy(path, &backup_path)
        .with_context(|| format!("Failed to create backup file: {}", backup_path.display()))?;

    match tagged_file.save_to_path(path, WriteOptions::default()) {
        Ok(()) => {
            let _ = std::fs::remove_file(&backup_path);
            Ok(())
        }
        Err(e) => {
            if let Err(restore_err) = std::fs::copy(&backup_path, path) {
                error!(
                    backup = %backup_path.display(),
                    "Failed to restore {path_display} after write failure: {restore_err}"
                );
                return Err(anyhow::anyhow!(
                    "Also failed to restore from backup: {restore_err}"
                )
                .context(e));
            }
            let _ = std::fs::remove_file(&backup_path);
            Err(anyhow::anyhow!("Failed to write tags to file").context(e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn item(path: PathBuf) -> Item {
        Item {
            id: 1,
            album_id: Some(1),
            title: "Track".to_string(),
            path,
            genre: "ambient".to_string(),
        }
    }

    /// 16-bit mono PCM with a handful of silent samples.
    fn silent_wav() -> Vec<u8> {
        let samples = [0u8; 32];
        let mut wav = Vec::new();
        wav.extend_from_slice(b"RIFF");
        wav.extend_from_slice(&(36 + samples.len() as u32).to_le_bytes());
        wav.extend_from_slice(b"WAVE");
        wav.extend_from_slice(b"fmt ");
        wav.extend_from_slice(&16u32.to_le_bytes());
        wav.extend_from_slice(&1u16.to_le_bytes()); // PCM
        wav.extend_from_slice(&1u16.to_le_bytes()); // mono
        wav.extend_from_slice(&8000u32.to_le_bytes());
        wav.extend_from_slice(&16000u32.to_le_bytes()); // byte rate
        wav.extend_from_slice(&2u16.to_le_bytes()); // block align
        wav.extend_from_slice(&16u16.to_le_bytes());
        wav.extend_from_slice(b"data");
        wav.extend_from_slice(&(samples.len() as u32).to_le_bytes());
        wav.extend_from_slice(&samples);
        wav
    }

    fn read_genre(path: &Path) -> Option<String> {
        let tagged_file = lofty::read_from_path(path).unwrap();
        tagged_file
            .primary_tag()
            .and_then(|tag| tag.genre())
            .map(|genre| genre.into_owned())
    }

    #[test]
    fn writes_genre_into_primary_tag() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.wav");
        std::fs::write(&path, silent_wav()).unwrap();

        let mut track = item(path.clone());
        track.genre = "dub techno".to_string();
        assert!(try_write(&track));

        assert_eq!(read_genre(&path).as_deref(), Some("dub techno"));
        assert!(!dir.path().join("t.backup.wav").exists());
    }

    #[test]
    fn rewriting_replaces_previous_genre() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.wav");
        std::fs::write(&path, silent_wav()).unwrap();

        let mut track = item(path.clone());
        assert!(try_write(&track));
        track.genre = "drone".to_string();
        assert!(try_write(&track));

        assert_eq!(read_genre(&path).as_deref(), Some("drone"));
    }

    #[test]
    fn missing_file_is_reported_not_raised() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!try_write(&item(dir.path().join("missing.flac"))));
    }

    #[test]
    fn unreadable_file_is_left_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.flac");
        std::fs::write(&path, b"definitely not audio").unwrap();

        assert!(!try_write(&item(path.clone())));
        assert_eq!(std::fs::read(&path).unwrap(), b"definitely not audio");
        assert!(!dir.path().join("broken.backup.flac").exists());
    }
}
