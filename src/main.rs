use std::sync::Arc;

use anyhow::bail;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use videotube::config::{AuthConfig, ServerConfig};
use videotube::server::{AppState, create_router};
use videotube::store::{HistoryPolicy, SqliteStore, Store};

#[derive(Parser)]
#[command(name = "videotube")]
#[command(about = "A social-video platform backend", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the server (create the database)
    Init {
        /// Data directory for the database
        #[arg(long, default_value = "./data")]
        data_dir: String,
    },

    /// Start the server
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(long, short, default_value = "8080")]
        port: u16,

        /// Data directory for the database
        #[arg(long, default_value = "./data")]
        data_dir: String,

        /// Secret used to sign access tokens
        #[arg(long, env = "VIDEOTUBE_ACCESS_SECRET", hide_env_values = true)]
        access_secret: String,

        /// Secret used to sign refresh tokens
        #[arg(long, env = "VIDEOTUBE_REFRESH_SECRET", hide_env_values = true)]
        refresh_secret: String,

        /// Rewatching a video moves it to the front of the watch history
        /// instead of appending a duplicate entry
        #[arg(long, default_value_t = true)]
        history_dedupe: bool,

        /// Maximum watch-history length per identity (0 = unbounded)
        #[arg(long, default_value_t = 100)]
        history_max_len: u32,
    },
}

fn run_init(data_dir: String) -> anyhow::Result<()> {
    let data_path: std::path::PathBuf = data_dir.into();

    // The store creates the data directory itself.
    let db_path = data_path.join("videotube.db");
    let store = SqliteStore::new(&db_path)?;
    store.initialize()?;

    println!("Database initialized at {}", db_path.display());
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("videotube=info".parse()?))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init { data_dir } => {
            run_init(data_dir)?;
        }
        Commands::Serve {
            host,
            port,
            data_dir,
            access_secret,
            refresh_secret,
            history_dedupe,
            history_max_len,
        } => {
            let config = ServerConfig {
                host,
                port,
                data_dir: data_dir.into(),
                history: HistoryPolicy {
                    dedupe: history_dedupe,
                    max_len: (history_max_len > 0).then_some(history_max_len),
                },
            };

            if !config.db_path().exists() {
                bail!("Server not initialized. Run 'videotube init' first to create the database.");
            }

            let store = SqliteStore::new(config.db_path())?;
            store.initialize()?;

            let auth = AuthConfig::with_secrets(access_secret, refresh_secret);
            let state = Arc::new(AppState::new(Arc::new(store), &auth, config.history)?);

            let app = create_router(state);
            let addr = config.socket_addr()?;

            info!("Starting server on {}", addr);

            let listener = tokio::net::TcpListener::bind(addr).await?;
            axum::serve(listener, app).await?;
        }
    }

    Ok(())
}
