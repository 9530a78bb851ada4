use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use musicsloth_lib::metadata::MetadataExtractor;
use musicsloth_lib::settings::settings::SETTINGS_FILE;
use musicsloth_lib::{LibraryError, LibraryIndexer, LibrarySettings, MusicLibrary, PlaylistPatch};

#[derive(Parser, Debug)]
#[clap(name = "musicsloth", about = "Manage a Musicsloth music library")]
struct CliArgs {
    /// Path to the JSON settings file.
    #[clap(long, default_value = SETTINGS_FILE)]
    config: PathBuf,

    /// Database file. Overrides the settings file.
    #[clap(long)]
    database: Option<PathBuf>,

    /// Directory holding the managed audio/ and covers/ folders. Overrides the settings file.
    #[clap(long)]
    media_root: Option<PathBuf>,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List all artists
    Artists,
    /// Show one artist with album and track counts
    Artist { id: i64 },
    /// List all albums
    Albums,
    /// Show one album
    Album { id: i64 },
    /// List all tracks
    Tracks,
    /// Show one track
    Track { id: i64 },
    /// Copy an audio file into the library. Tags fill in anything not given.
    AddTrack {
        file: PathBuf,
        #[clap(long)]
        title: Option<String>,
        #[clap(long)]
        artist: Option<String>,
        #[clap(long)]
        album: Option<String>,
        #[clap(long)]
        year: Option<i32>,
        #[clap(long)]
        cover: Option<PathBuf>,
    },
    /// Delete a track and its managed files
    DeleteTrack { id: i64 },
    /// Import every supported file below a directory
    Import { directory: PathBuf },
    #[clap(subcommand)]
    Playlist(PlaylistCommand),
    /// Copy the database to a timestamped backup
    Backup,
    /// Rebuild the database with the current schema
    Migrate,
}

#[derive(Subcommand, Debug)]
enum PlaylistCommand {
    /// List all playlists
    List,
    Create { name: String },
    Rename { id: i64, name: String },
    Delete { id: i64 },
    /// Show the playlist summary and its tracks in order
    Show { id: i64 },
    /// Put a track at the top of the playlist
    Add { id: i64, track: i64 },
    Remove { id: i64, track: i64 },
    /// Move a track to a 1-based position
    Move { id: i64, track: i64, position: i64 },
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn found<T>(value: Option<T>, entity: &'static str, id: i64) -> Result<T> {
    value.ok_or_else(|| LibraryError::NotFound { entity, id }.into())
}

#[derive(Serialize)]
struct Affected {
    affected: usize,
}

fn load_settings(args: &CliArgs) -> Result<LibrarySettings> {
    let base = args
        .config
        .parent()
        .map(PathBuf::from)
        .unwrap_or_default();
    let mut settings = LibrarySettings::load(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?
        .resolve_paths(&base);
    if let Some(database) = &args.database {
        settings.database_path = database.clone();
    }
    if let Some(media_root) = &args.media_root {
        settings.media_root = media_root.clone();
    }
    Ok(settings)
}

fn run(args: CliArgs) -> Result<()> {
    let settings = load_settings(&args)?;
    let library = MusicLibrary::open(&settings)?;

    match args.command {
        Command::Artists => print_json(&library.artists().get_all()?),
        Command::Artist { id } => print_json(&found(library.artists().get_info(id)?, "artist", id)?),
        Command::Albums => print_json(&library.albums().get_all()?),
        Command::Album { id } => print_json(&found(library.albums().get_info(id)?, "album", id)?),
        Command::Tracks => print_json(&library.tracks().get_all()?),
        Command::Track { id } => print_json(&found(library.tracks().get_info(id)?, "track", id)?),
        Command::AddTrack {
            file,
            title,
            artist,
            album,
            year,
            cover,
        } => {
            let mut metadata = MetadataExtractor::extract_from_file(&file)?;
            metadata.title = title.unwrap_or(metadata.title);
            metadata.artist = artist.or(metadata.artist);
            metadata.album = album.or(metadata.album);
            metadata.year = year.or(metadata.year);
            let id = library.import_track(&file, &metadata, cover.as_deref())?;
            print_json(&found(library.tracks().get_info(id)?, "track", id)?)
        }
        Command::DeleteTrack { id } => print_json(&Affected {
            affected: library.tracks().delete(id)?,
        }),
        Command::Import { directory } => {
            let result = LibraryIndexer::import_directory(
                &directory,
                &settings.import.supported_extensions,
                &library,
                |progress| {
                    info!(
                        "[{}/{}] {}",
                        progress.current, progress.total, progress.current_file
                    )
                },
            )?;
            print_json(&result)
        }
        Command::Playlist(command) => run_playlist(&library, command),
        Command::Backup => {
            let path = library.backup()?;
            print_json(&path)
        }
        Command::Migrate => print_json(&library.update_db()?),
    }
}

fn run_playlist(library: &MusicLibrary, command: PlaylistCommand) -> Result<()> {
    let playlists = library.playlists();
    match command {
        PlaylistCommand::List => print_json(&playlists.get_all()?),
        PlaylistCommand::Create { name } => {
            let id = playlists.create(&name)?;
            print_json(&found(playlists.get_info(id)?, "playlist", id)?)
        }
        PlaylistCommand::Rename { id, name } => print_json(&Affected {
            affected: playlists.update(id, &PlaylistPatch { name: Some(name) })?,
        }),
        PlaylistCommand::Delete { id } => print_json(&Affected {
            affected: playlists.delete(id)?,
        }),
        PlaylistCommand::Show { id } => {
            #[derive(Serialize)]
            struct Show<I, T> {
                info: I,
                tracks: T,
            }
            let info = found(playlists.get_info(id)?, "playlist", id)?;
            print_json(&Show {
                info,
                tracks: playlists.get_tracks(id)?,
            })
        }
        PlaylistCommand::Add { id, track } => print_json(&Affected {
            affected: playlists.add_track(id, track)?,
        }),
        PlaylistCommand::Remove { id, track } => print_json(&Affected {
            affected: playlists.remove_track(id, track)?,
        }),
        PlaylistCommand::Move {
            id,
            track,
            position,
        } => print_json(&Affected {
            affected: playlists.move_track(id, track, position)?,
        }),
    }
}

fn main() -> Result<()> {
    let args = CliArgs::parse();

    // Logs go to stderr so stdout stays valid JSON
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()?;

    run(args)
}
