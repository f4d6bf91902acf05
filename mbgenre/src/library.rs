use anyhow::{Context, Result};
use rusqlite::types::ValueRef;
use rusqlite::{Connection, Row, params};
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Album {
    pub id: i64,
    pub albumartist: String,
    pub album: String,
    pub mb_albumid: String,
    pub genre: String,
}

impl fmt::Display for Album {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.albumartist, self.album)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub id: i64,
    pub album_id: Option<i64>,
    pub title: String,
    pub path: PathBuf,
    pub genre: String,
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.title)
    }
}

/// Storage the genres end up in.
pub trait Library {
    /// Albums whose artist or title contain every term, case-insensitively.
    fn albums(&self, query: &[String]) -> Result<Vec<Album>>;
    fn items(&self, album: &Album) -> Result<Vec<Item>>;
    fn store_album(&self, album: &Album) -> Result<()>;
    fn store_item(&self, item: &Item) -> Result<()>;
}

/// A beets-style `library.db`.
pub struct SqliteLibrary {
    conn: Connection,
}

impl SqliteLibrary {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open library database: {}", path.display()))?;
        Ok(Self { conn })
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }
}

fn text_column(row: &Row, idx: usize) -> rusqlite::Result<String> {
    Ok(row.get::<_, Option<String>>(idx)?.unwrap_or_default())
}

/// beets stores paths as raw BLOBs, hand-made databases tend to use TEXT.
fn path_column(row: &Row, idx: usize) -> rusqlite::Result<PathBuf> {
    match row.get_ref(idx)? {
        ValueRef::Blob(bytes) | ValueRef::Text(bytes) => Ok(path_from_bytes(bytes)),
        _ => Ok(PathBuf::new()),
    }
}

#[cfg(unix)]
fn path_from_bytes(bytes: &[u8]) -> PathBuf {
    use std::os::unix::ffi::OsStrExt;
    PathBuf::from(std::ffi::OsStr::from_bytes(bytes))
}

#[cfg(not(unix))]
fn path_from_bytes(bytes: &[u8]) -> PathBuf {
    PathBuf::from(String::from_utf8_lossy(bytes).into_owned())
}

fn album_from_row(row: &Row) -> rusqlite::Result<Album> {
    Ok(Album {
        id: row.get(0)?,
        albumartist: text_column(row, 1)?,
        album: text_column(row, 2)?,
        mb_albumid: text_column(row, 3)?,
        genre: text_column(row, 4)?,
    })
}

impl Library for SqliteLibrary {
    fn albums(&self, query: &[String]) -> Result<Vec<Album>> {
        let mut sql =
            String::from("SELECT id, albumartist, album, mb_albumid, genre FROM albums WHERE 1=1");
        let mut patterns = Vec::with_capacity(query.len());

        for (i, term) in query.iter().enumerate() {
            let n = i + 1;
            sql.push_str(&format!(
                " AND (albumartist LIKE ?{n} ESCAPE '\\' OR album LIKE ?{n} ESCAPE '\\')"
            ));
            patterns.push(format!("%{}%", escape_like(term)));
        }
        sql.push_str(" ORDER BY id");

        let mut stmt = self.conn.prepare(&sql).context("Failed to query albums")?;
        let albums = stmt
            .query_map(rusqlite::params_from_iter(patterns.iter()), album_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(albums)
    }

    fn items(&self, album: &Album) -> Result<Vec<Item>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, album_id, title, path, genre
             FROM items
             WHERE album_id = ?1
             ORDER BY disc, track, id",
        )?;

        let items = stmt
            .query_map([album.id], |row| {
                Ok(Item {
                    id: row.get(0)?,
                    album_id: row.get(1)?,
                    title: text_column(row, 2)?,
                    path: path_column(row, 3)?,
                    genre: text_column(row, 4)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()
            .with_context(|| format!("Failed to read tracks of {album}"))?;

        Ok(items)
    }

    fn store_album(&self, album: &Album) -> Result<()> {
        self.conn
            .execute(
                "UPDATE albums SET genre = ?1 WHERE id = ?2",
                params![album.genre, album.id],
            )
            .with_context(|| format!("Failed to store album {album}"))?;
        Ok(())
    }

    fn store_item(&self, item: &Item) -> Result<()> {
        self.conn
            .execute(
                "UPDATE items SET genre = ?1 WHERE id = ?2",
                params![item.genre, item.id],
            )
            .with_context(|| format!("Failed to store track {item}"))?;
        Ok(())
    }
}

fn escape_like(term: &str) -> String {
    term.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}
