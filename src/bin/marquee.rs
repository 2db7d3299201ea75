//! marquee: catalog CLI
//!
//! Reads the catalog through the configured cache and prints normalized
//! payloads as JSON.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::info;

use marquee::config::{Config, Secrets};
use marquee::{CatalogRead, DiscoverFilters, TimeWindow};

/// Marquee catalog CLI
#[derive(Parser)]
#[command(name = "marquee")]
#[command(version)]
#[command(about = "Cached, normalized reads against the TMDb movie catalog")]
struct Args {
    /// Path to configuration file.
    #[arg(short, long, env = "MARQUEE_CONFIG")]
    config: Option<PathBuf>,

    /// Print compact JSON instead of pretty-printed.
    #[arg(long)]
    compact: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Trending movies
    Trending {
        /// Time window: day or week
        #[arg(short, long, default_value = "day")]
        window: TimeWindow,
        #[arg(short, long, default_value_t = 1)]
        page: u32,
    },

    /// Popular movies
    Popular {
        #[arg(short, long, default_value_t = 1)]
        page: u32,
    },

    /// Top rated movies
    TopRated {
        #[arg(short, long, default_value_t = 1)]
        page: u32,
    },

    /// Movies currently in theaters
    NowPlaying {
        #[arg(short, long, default_value_t = 1)]
        page: u32,
    },

    /// Upcoming releases
    Upcoming {
        #[arg(short, long, default_value_t = 1)]
        page: u32,
    },

    /// Search movies by title
    Search {
        query: String,
        #[arg(short, long, default_value_t = 1)]
        page: u32,
    },

    /// Discover movies by filter
    Discover {
        /// Genre id
        #[arg(long)]
        genre: Option<u32>,
        /// Primary release year
        #[arg(long)]
        year: Option<u16>,
        /// Sort order, e.g. popularity.desc
        #[arg(long)]
        sort_by: Option<String>,
        #[arg(short, long, default_value_t = 1)]
        page: u32,
    },

    /// Movie details with videos and credits
    Detail {
        /// TMDb movie id
        id: u64,
    },

    /// Recommendations based on a movie
    Recommendations {
        id: u64,
        #[arg(short, long, default_value_t = 1)]
        page: u32,
    },

    /// Movies similar to a movie
    Similar {
        id: u64,
        #[arg(short, long, default_value_t = 1)]
        page: u32,
    },

    /// Official genre list
    Genres,

    /// Drop every cached entry carrying a tag (e.g. "movie:550", "genre")
    Invalidate { tag: String },

    /// Invalidate genre-derived entries and reload the genre list
    ResyncGenres,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialise tracing (default: warn for CLI; override with RUST_LOG).
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let args = Args::parse();

    let config = Config::load_or_default(args.config.as_deref())?;
    let secrets = Secrets::load()?;
    let catalog = config.build_catalog(&secrets).await?;
    info!(version = env!("CARGO_PKG_VERSION"), "marquee starting");

    let read = match args.command {
        Command::Trending { window, page } => catalog.trending(window, page).await?,
        Command::Popular { page } => catalog.popular(page).await?,
        Command::TopRated { page } => catalog.top_rated(page).await?,
        Command::NowPlaying { page } => catalog.now_playing(page).await?,
        Command::Upcoming { page } => catalog.upcoming(page).await?,
        Command::Search { query, page } => catalog.search(&query, page).await?,
        Command::Discover {
            genre,
            year,
            sort_by,
            page,
        } => {
            let filters = DiscoverFilters {
                genre,
                year,
                sort_by,
            };
            catalog.discover(filters, page).await?
        }
        Command::Detail { id } => catalog.detail(id).await?,
        Command::Recommendations { id, page } => catalog.recommendations(id, page).await?,
        Command::Similar { id, page } => catalog.similar(id, page).await?,
        Command::Genres => catalog.genres().await?,
        Command::ResyncGenres => catalog.resync_genres().await?,
        Command::Invalidate { tag } => {
            let removed = catalog.invalidate(&tag).await?;
            println!("removed {removed} entries tagged {tag:?}");
            return Ok(());
        }
    };

    print_read(&read, args.compact)?;
    Ok(())
}

fn print_read(read: &CatalogRead, compact: bool) -> Result<(), serde_json::Error> {
    if read.is_stale() {
        eprintln!("warning: upstream unavailable, showing stale data");
    }
    let json = if compact {
        serde_json::to_string(read.payload.as_ref())?
    } else {
        serde_json::to_string_pretty(read.payload.as_ref())?
    };
    println!("{json}");
    Ok(())
}
