pub mod config;
pub mod error;
pub mod genres;
pub mod library;
pub mod musicbrainz;
pub mod tagger;
pub mod tagging;

pub use error::GenreError;
pub use genres::{FormatOptions, GenreSource};
pub use library::{Album, Item, Library, SqliteLibrary};
pub use musicbrainz::{MusicBrainzClient, ReleaseLookup};
pub use tagger::{GenreTagger, ImportTask, Summary, TaggerOptions};
