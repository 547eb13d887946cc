/// Tape Server - audio clip sharing server
use clap::{Parser, Subcommand};
use std::{net::SocketAddr, path::PathBuf, sync::Arc};
use tape_core::{AudioCatalog, Clock, CredentialStore, SystemClock, User, UserId};
use tape_server::{
    config::ServerConfig,
    router,
    services::{BlobStore, HttpBlobStore, MemoryBlobStore, PasswordHasher},
    state::{AppState, Stores},
};
use tape_storage::{MemoryStore, SqliteStore};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "tape-server")]
#[command(about = "Tape audio clip sharing server", long_about = None)]
struct Cli {
    /// Configuration file path (defaults to ./config.toml when present)
    #[arg(short, long, global = true, env = "TAPE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Keep all data in memory instead of SQLite and the remote blob store
        #[arg(long)]
        ephemeral: bool,
    },
    /// Create a new user
    AddUser {
        #[arg(short, long)]
        email: String,
        #[arg(short, long)]
        name: String,
        #[arg(short, long)]
        password: String,
    },
    /// List a user's audio, newest first
    ListAudio {
        /// User id
        #[arg(short, long)]
        user: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tape_server=info,tape_storage=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = ServerConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Serve { ephemeral } => serve(config, ephemeral).await?,
        Commands::AddUser {
            email,
            name,
            password,
        } => add_user(config, &email, &name, &password).await?,
        Commands::ListAudio { user } => list_audio(config, &user).await?,
    }

    Ok(())
}

async fn serve(config: ServerConfig, ephemeral: bool) -> anyhow::Result<()> {
    config.validate()?;

    tracing::info!("Starting Tape Server");
    tracing::info!("Host: {}", config.server.host);
    tracing::info!("Port: {}", config.server.port);

    let (stores, blobs): (Stores, Arc<dyn BlobStore>) = if ephemeral {
        tracing::warn!("Ephemeral mode: data is lost on shutdown");
        (
            Stores::shared(Arc::new(MemoryStore::new())),
            Arc::new(MemoryBlobStore::new()),
        )
    } else {
        config.blob.validate()?;
        let store = SqliteStore::connect(&config.storage.database_url).await?;
        (
            Stores::shared(Arc::new(store)),
            Arc::new(HttpBlobStore::new(&config.blob)?),
        )
    };

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let (app_state, reaper_task) = AppState::build(&config, stores, blobs, clock);
    let app = router(app_state);

    let addr = SocketAddr::from((
        config.server.host.parse::<std::net::IpAddr>()?,
        config.server.port,
    ));

    tracing::info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // The router (and with it every reaper handle) is gone; let queued
    // deletions finish.
    if let Err(e) = reaper_task.await {
        tracing::warn!("Blob reaper ended abnormally: {}", e);
    }
    tracing::info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}

async fn add_user(config: ServerConfig, email: &str, name: &str, password: &str) -> anyhow::Result<()> {
    let store = SqliteStore::connect(&config.storage.database_url).await?;
    let email = email.trim();

    if store.find_user_by_email(email).await?.is_some() {
        anyhow::bail!("A user with email {} already exists", email);
    }

    let hasher = PasswordHasher::new(config.auth.bcrypt_cost);
    let user = User {
        id: UserId::generate(),
        email: email.to_string(),
        name: name.to_string(),
        password_hash: hasher.hash(password)?,
        current_token: None,
    };
    let id = user.id.clone();
    store.insert_user(user).await?;

    println!("Created user {} ({})", id, email);
    Ok(())
}

async fn list_audio(config: ServerConfig, user: &str) -> anyhow::Result<()> {
    let store = SqliteStore::connect(&config.storage.database_url).await?;
    let records = store.list_by_owner(&UserId::new(user)).await?;

    println!("Audio for {}:", user);
    for record in records {
        println!(
            "  {} - {} ({:.1}s, uploaded {})",
            record.id,
            record.display_name,
            record.duration_seconds,
            record.uploaded_at.to_rfc3339()
        );
    }

    Ok(())
}
