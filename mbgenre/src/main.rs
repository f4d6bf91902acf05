use anyhow::{Context, Result};
use clap::Parser;
use mbgenre::config::{Config, load_config};
use mbgenre::{GenreSource, GenreTagger, MusicBrainzClient, SqliteLibrary, TaggerOptions};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

static EXAMPLES: &str = r"EXAMPLES:
    Tag every album without a genre:
    mbgenre

    Re-tag albums by one artist, keeping at most three genres:
    mbgenre --all --max-genres 3 burial

    Prefer release group genres and update only the library:
    mbgenre --source-order release_group,release --no-write

    Show what would change without storing anything:
    mbgenre --pretend 'untrue'";

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Add genres to albums and tracks from MusicBrainz",
    long_about = None,
    after_help = EXAMPLES
)]
struct Args {
    /// Terms an album's artist or title must contain
    query: Vec<String>,

    /// Config file (default: ~/.config/mbgenre/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Library database
    #[arg(short, long)]
    library: Option<PathBuf>,

    /// Write genres into the audio files
    #[arg(short, long, conflicts_with = "no_write")]
    write: bool,

    /// Only update the library database
    #[arg(short = 'W', long)]
    no_write: bool,

    /// Also re-tag albums that already have a genre
    #[arg(short, long)]
    all: bool,

    /// Maximum number of genres to keep (0 keeps all)
    #[arg(short = 'n', long)]
    max_genres: Option<usize>,

    /// String placed between genres
    #[arg(short, long)]
    separator: Option<String>,

    /// Comma-separated source priority: release, release_group, artists
    #[arg(long, value_delimiter = ',')]
    source_order: Option<Vec<GenreSource>>,

    /// Title Case Every Genre
    #[arg(short, long)]
    title_case: bool,

    /// Print proposed genres without storing them
    #[arg(short, long)]
    pretend: bool,

    /// MusicBrainz web service root
    #[arg(long)]
    base_url: Option<String>,

    /// Log debug output
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn apply(&self, config: &mut Config) {
        if let Some(library) = &self.library {
            config.library.clone_from(library);
        }
        if self.write {
            config.write = true;
        }
        if self.no_write {
            config.write = false;
        }
        if self.all {
            config.unset_only = false;
        }
        if let Some(max_genres) = self.max_genres {
            config.max_genres = max_genres;
        }
        if let Some(separator) = &self.separator {
            config.separator.clone_from(separator);
        }
        if let Some(source_order) = &self.source_order {
            config.source_order.clone_from(source_order);
        }
        if self.title_case {
            config.title_case = true;
        }
        if let Some(base_url) = &self.base_url {
            config.base_url.clone_from(base_url);
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut config = load_config(args.config.as_deref()).await?;
    args.apply(&mut config);

    let lib = SqliteLibrary::open(&config.library)?;
    let client =
        MusicBrainzClient::new(&config.base_url).context("Failed to init MusicBrainz client")?;

    let mut options = TaggerOptions::from_config(&config);
    options.pretend = args.pretend;
    let tagger = GenreTagger::new(client, options);

    let summary = tagger
        .run_command(&lib, &args.query, config.write)
        .await?;

    println!(
        "{}updated: {}, already set: {}, no genres: {}, failed: {}",
        if args.pretend { "(pretend) " } else { "" },
        summary.updated,
        summary.already_set,
        summary.without_genres,
        summary.failed
    );

    Ok(())
}
