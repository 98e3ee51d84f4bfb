mod best_match;
mod config;
mod descriptor;
mod fetcher;
mod logging;
mod matcher;
mod pipeline;
mod ports;
mod reference;
mod resolver;
mod spotify;
mod tagger;
mod youtube;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::{Result, eyre::Context};

use crate::{
    config::Config,
    fetcher::Fetcher,
    logging::init_tracing,
    pipeline::{CancelFlag, CollectionReport, Pipeline, TrackReport},
    ports::source::AudioSource,
    resolver::Resolved,
    spotify::SpotifyClient,
    youtube::YtDlpSource,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// The config file to use
    #[arg(short, long, env = "MUSIC_FETCHER_CONFIG")]
    config: Option<PathBuf>,

    /// Log filter directive (e.g. "music_fetcher=debug")
    #[arg(long, default_value = "music_fetcher=info", global = true, env = "LOG_LEVEL")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

fn is_directory(s: &str) -> Result<PathBuf, String> {
    let p: PathBuf = s.into();
    if p.is_dir() {
        Ok(p)
    } else {
        Err(format!("`{}` is not an existing directory", s))
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Download a track, album, or playlist from a catalog reference
    Download {
        /// A Spotify track/album/playlist URL, URI, or reference
        reference: String,

        /// Directory to place finished files in (overrides the config)
        #[arg(short, long, value_parser = is_directory)]
        output_directory: Option<PathBuf>,
    },
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Create a default config file, if it doesn't exist
    CreateDefault,
    /// Print the path to the config file
    Path,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();
    init_tracing(&args.log_level)?;

    match args.command {
        Commands::Download {
            reference,
            output_directory,
        } => {
            let config = {
                if let Some(config) = args.config {
                    Config::from_file(&config)
                } else {
                    Config::load()
                }
            }
            .with_context(|| "Failed to load music-fetcher config")?;

            download(&config, &reference, output_directory).await?;
        }
        Commands::Config(config_commands) => match config_commands {
            ConfigCommands::CreateDefault => {
                let path = Config::create_default()?;
                println!("Config file at: {}", path.display());
            }
            ConfigCommands::Path => match Config::config_path() {
                Some(path) => println!("{}", path.display()),
                None => println!("No default config path found"),
            },
        },
    }

    Ok(())
}

async fn download(
    config: &Config,
    reference: &str,
    output_directory: Option<PathBuf>,
) -> Result<()> {
    let spotify_config = config.spotify_config();
    if spotify_config.client_id.is_empty() || spotify_config.client_secret.is_empty() {
        return Err(color_eyre::eyre::eyre!(
            "Spotify credentials missing. Set them in the config file or via SPOTIFY_CLIENT_ID / SPOTIFY_CLIENT_SECRET"
        ));
    }

    let output_directory = output_directory.unwrap_or_else(|| config.output_directory_path());
    std::fs::create_dir_all(&output_directory).with_context(|| {
        format!(
            "Failed to create output directory: {}",
            output_directory.display()
        )
    })?;

    let catalog = Arc::new(SpotifyClient::new(
        spotify_config.client_id,
        spotify_config.client_secret,
    ));
    let source: Arc<dyn AudioSource> = Arc::new(YtDlpSource::new()?);
    let fetcher = Fetcher::new(source.clone(), Fetcher::locate_ffmpeg()?);
    let pipeline = Pipeline::new(catalog, source, fetcher, output_directory);

    let resolved = pipeline
        .resolve(reference)
        .await
        .map_err(|e| color_eyre::eyre::eyre!("Failed to resolve {reference}: {e}"))?;

    match resolved {
        Resolved::Track(descriptor) => {
            let report = pipeline.run_track(&descriptor).await;
            print_track_report(&report);
            if let Err(e) = report.outcome {
                return Err(color_eyre::eyre::eyre!(e));
            }
        }
        Resolved::Collection(collection) => {
            println!(
                "Downloading '{}' ({} tracks{})",
                collection.name,
                collection.tracks().len(),
                if collection.total_tracks > collection.tracks().len() {
                    format!(", capped from {}", collection.total_tracks)
                } else {
                    String::new()
                }
            );

            let cancel = CancelFlag::new();
            {
                let cancel = cancel.clone();
                tokio::spawn(async move {
                    if tokio::signal::ctrl_c().await.is_ok() {
                        tracing::info!("Ctrl-C received, finishing current track");
                        cancel.cancel();
                    }
                });
            }

            let report = pipeline.run_collection(&collection, &cancel).await;
            print_collection_report(&report);
        }
    }

    Ok(())
}

fn print_track_report(report: &TrackReport) {
    match &report.outcome {
        Ok(path) => println!("Downloaded: {}", path.display()),
        Err(e) => println!(
            "Failed '{}' by '{}': {e}",
            report.descriptor.title,
            report.descriptor.primary_artist()
        ),
    }
}

fn print_collection_report(report: &CollectionReport) {
    for track in &report.reports {
        print_track_report(track);
    }
    println!(
        "'{}' complete: {} successful, {} failed{}",
        report.name,
        report.succeeded(),
        report.failed(),
        if report.cancelled { " (cancelled)" } else { "" }
    );
}
