//! Shelfwise CLI
//!
//! Command-line interface for Shelfwise - local-first personal book
//! tracking. Each invocation opens a session over the local data
//! directory, runs one command against it, and flushes pending writes
//! before exiting.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use shelfwise_core::cache::CacheStore;
use shelfwise_core::config::Config;
use shelfwise_core::models::Theme;
use shelfwise_core::session::Session;
use shelfwise_core::sync::{settings_collection_path, EntityKind, MemoryRemote, SETTINGS_DOC_ID};

mod catalog;
mod commands;
mod output;

use commands::book::{AddArgs, ListArgs};
use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "shelfwise")]
#[command(about = "Shelfwise - local-first personal book tracking")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a book to the library
    Add(AddArgs),
    /// List books with filters and sorting
    #[command(alias = "ls")]
    List(ListArgs),
    /// Show full details of one book
    Show {
        /// Book id (full, prefix, or exact title)
        id: String,
    },
    /// Delete a book
    #[command(alias = "rm")]
    Delete {
        /// Book id (full, prefix, or exact title)
        id: String,
    },
    /// Manage collections
    Collection {
        #[command(subcommand)]
        command: CollectionCommands,
    },
    /// Show library statistics
    Stats,
    /// Set the annual reading goal
    Goal {
        /// Number of books to read this year
        count: u32,
    },
    /// Set the color theme
    Theme {
        /// Theme name (dark, light, midnight, forest, rose, slate)
        name: Theme,
    },
    /// Set the display name
    Name {
        name: String,
    },
    /// Search the book catalogs (Hardcover, then Open Library)
    Search {
        /// Title query, or an ISBN with --isbn
        query: String,
        /// Look up by ISBN instead of title
        #[arg(long)]
        isbn: bool,
    },
    /// Import books from a file
    Import {
        #[command(subcommand)]
        command: ImportCommands,
    },
    /// Export the library
    Export {
        #[command(subcommand)]
        command: ExportCommands,
    },
    /// Permanently delete all books, collections, and settings
    ClearData {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
    /// Show session status
    Status,
}

#[derive(Subcommand)]
enum CollectionCommands {
    /// Create a new collection
    #[command(alias = "add")]
    New {
        name: String,
        /// Emoji glyph for the collection
        #[arg(short, long)]
        emoji: Option<String>,
    },
    /// List collections with book counts
    #[command(alias = "ls")]
    List,
    /// Delete a collection
    #[command(alias = "rm")]
    Delete {
        /// Collection id (full, prefix, or name)
        id: String,
    },
}

#[derive(Subcommand)]
enum ImportCommands {
    /// Import a Goodreads CSV export
    Goodreads { file: PathBuf },
    /// Restore a native JSON backup
    Backup { file: PathBuf },
}

#[derive(Subcommand)]
enum ExportCommands {
    /// Export as a native JSON backup
    Json {
        /// Output file (stdout when omitted)
        path: Option<PathBuf>,
    },
    /// Export as flattened CSV
    Csv {
        /// Output file (stdout when omitted)
        path: Option<PathBuf>,
    },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (data_dir, user)
        key: String,
        /// Configuration value
        value: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));

    // Config commands don't need a session
    if let Commands::Config { command } = &cli.command {
        return match command.clone() {
            Some(ConfigCommands::Set { key, value }) => commands::config::set(key, value, &output),
            Some(ConfigCommands::Show) | None => commands::config::show(&output),
        };
    }

    let config = Config::load()?;
    let mut session = open_session(&config).await?;

    let result = match cli.command {
        Commands::Config { .. } => unreachable!(), // Handled above
        Commands::Add(args) => commands::book::add(&mut session, args, &output).await,
        Commands::List(args) => commands::book::list(&session, args, &output),
        Commands::Show { id } => commands::book::show(&session, id, &output),
        Commands::Delete { id } => commands::book::delete(&mut session, id, &output).await,
        Commands::Collection { command } => match command {
            CollectionCommands::New { name, emoji } => {
                commands::collection::create(&mut session, name, emoji, &output).await
            }
            CollectionCommands::List => commands::collection::list(&session, &output),
            CollectionCommands::Delete { id } => {
                commands::collection::delete(&mut session, id, &output).await
            }
        },
        Commands::Stats => commands::stats::show(&session, &output),
        Commands::Goal { count } => commands::settings::set_goal(&mut session, count, &output).await,
        Commands::Theme { name } => {
            commands::settings::set_theme(&mut session, name, &output).await
        }
        Commands::Name { name } => {
            commands::settings::set_display_name(&mut session, name, &output).await
        }
        Commands::Search { query, isbn } => {
            commands::search::search(&session, query, isbn, &output).await
        }
        Commands::Import { command } => match command {
            ImportCommands::Goodreads { file } => {
                commands::data::import_goodreads(&mut session, file, &output).await
            }
            ImportCommands::Backup { file } => {
                commands::data::import_backup(&mut session, file, &output).await
            }
        },
        Commands::Export { command } => match command {
            ExportCommands::Json { path } => commands::data::export_json(&session, path, &output),
            ExportCommands::Csv { path } => commands::data::export_as_csv(&session, path, &output),
        },
        Commands::ClearData { yes } => commands::data::clear_all(&mut session, yes, &output).await,
        Commands::Status => commands::status::show(&session, &config, &output),
    };

    // Push any still-pending debounced writes before exiting
    session.flush().await;
    result
}

/// Open a session over the local data directory
///
/// The in-process document store is seeded from the cache so the initial
/// snapshot reflects the last known state; every mutation then flows
/// through the full remote-upsert → snapshot → cache-mirror path.
async fn open_session(config: &Config) -> Result<Session> {
    let cache = CacheStore::new(&config.data_dir);
    let remote = Arc::new(MemoryRemote::new());

    if let Some(books) = cache.load_books() {
        let docs = books
            .iter()
            .filter_map(|b| Some((b.id.clone(), serde_json::to_value(b).ok()?)))
            .collect();
        remote
            .seed(&EntityKind::Books.collection_path(&config.user), docs)
            .await;
    }
    if let Some(collections) = cache.load_collections() {
        let docs = collections
            .iter()
            .filter_map(|c| Some((c.id.clone(), serde_json::to_value(c).ok()?)))
            .collect();
        remote
            .seed(
                &EntityKind::Collections.collection_path(&config.user),
                docs,
            )
            .await;
    }
    if let Some(settings) = cache.load_settings() {
        if let Ok(doc) = serde_json::to_value(&settings) {
            remote
                .seed(
                    &settings_collection_path(&config.user),
                    vec![(SETTINGS_DOC_ID.to_string(), doc)],
                )
                .await;
        }
    }

    let mut session = Session::new(remote, cache);
    session.sign_in(&config.user).await?;
    Ok(session)
}
