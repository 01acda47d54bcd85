use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use replay_sessions::cli::{add, read, update};
use replay_sessions::{Config, SessionStore, SqlitePool};

#[derive(Parser)]
#[command(name = "sessionctl")]
#[command(about = "Inspect and repair session records of the replay backend")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, default_value = "sessions.yaml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the sessions table if missing
    Migrate,

    /// Add a session from a JSON document
    Add {
        /// JSON file, or '-' for stdin
        source: String,
    },

    /// Show a session
    Get {
        session_id: u64,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show start time and duration for several sessions
    GetMany {
        #[arg(required = true)]
        session_ids: Vec<u64>,
    },

    /// Print the stored duration (ms)
    Duration { session_id: u64 },

    /// Close a session, computing its duration from the end timestamp
    End {
        session_id: u64,
        /// End of the session, epoch millis
        end_timestamp: u64,
    },

    /// Set the user id
    SetUserId { session_id: u64, user_id: String },

    /// Set the anonymous user id
    SetAnonymousId { session_id: u64, anonymous_id: String },

    /// Set the referrer, unless one is already recorded
    SetReferrer {
        session_id: u64,
        referrer: String,
        base_referrer: String,
    },

    /// Set one of the ten metadata slots
    SetMetadata {
        session_id: u64,
        /// Slot number, 1-10
        slot: u32,
        value: String,
    },

    /// Store the replay file encryption key
    SetKey { session_id: u64, key: String },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load config
    let config = Config::load(&cli.config).unwrap_or_default();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    // Ensure parent directory exists
    let db_path = config.database_path();
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }

    let pool = SqlitePool::open(&db_path, config.busy_timeout())
        .with_context(|| format!("opening {}", db_path.display()))?;
    if let Commands::Migrate = cli.command {
        pool.migrate()?;
        println!("Schema ready at {}", db_path.display());
        return Ok(());
    }

    let store = SessionStore::new(pool);

    match cli.command {
        Commands::Migrate => {}
        Commands::Add { source } => {
            add::run(&store, &source)?;
        }
        Commands::Get { session_id, json } => {
            read::get(&store, session_id, json)?;
        }
        Commands::GetMany { session_ids } => {
            read::get_many(&store, &session_ids)?;
        }
        Commands::Duration { session_id } => {
            read::duration(&store, session_id)?;
        }
        Commands::End {
            session_id,
            end_timestamp,
        } => {
            update::end(&store, session_id, end_timestamp)?;
        }
        Commands::SetUserId {
            session_id,
            user_id,
        } => {
            update::user_id(&store, session_id, &user_id)?;
        }
        Commands::SetAnonymousId {
            session_id,
            anonymous_id,
        } => {
            update::anonymous_id(&store, session_id, &anonymous_id)?;
        }
        Commands::SetReferrer {
            session_id,
            referrer,
            base_referrer,
        } => {
            update::referrer(&store, session_id, &referrer, &base_referrer)?;
        }
        Commands::SetMetadata {
            session_id,
            slot,
            value,
        } => {
            update::metadata(&store, session_id, slot, &value)?;
        }
        Commands::SetKey { session_id, key } => {
            update::encryption_key(&store, session_id, &key)?;
        }
    }

    Ok(())
}
