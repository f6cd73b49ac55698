use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use actix_web::{web, App, HttpServer};
use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};

use kb_core::{ConversationEngine, ExchangeEngine, MemoryStore, RecordStore, SqliteStore};
use kb_crypto::FalconVerifier;

mod error;
mod routes;
mod state;

use crate::state::AppState;

#[derive(Parser, Debug)]
#[command(author, version, about = "Keybridge key-exchange coordination service", long_about = None)]
struct Cli {
    /// Address to bind the HTTP listener to.
    #[arg(long, default_value = "0.0.0.0:8080")]
    bind: String,

    /// SQLite database path. Omit to run with in-memory state only.
    #[arg(long)]
    db: Option<PathBuf>,

    /// Expire abandoned (non-terminal) handshakes older than this many
    /// seconds. Off by default; completed records are never expired.
    #[arg(long)]
    expire_after_secs: Option<u64>,

    /// How often the expiry sweep runs, when enabled.
    #[arg(long, default_value_t = 60)]
    sweep_interval_secs: u64,
}

#[actix_web::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let store: Arc<dyn RecordStore> = match &cli.db {
        Some(path) => {
            info!(db = %path.display(), "opening sqlite store");
            Arc::new(SqliteStore::open(path).await?)
        }
        None => {
            info!("running with in-memory store");
            Arc::new(MemoryStore::new())
        }
    };
    let verifier = Arc::new(FalconVerifier);

    let state = AppState {
        conversations: Arc::new(ConversationEngine::new(store.clone(), verifier.clone()).await?),
        exchanges: Arc::new(ExchangeEngine::new(store.clone(), verifier).await?),
    };

    if let Some(secs) = cli.expire_after_secs {
        spawn_sweeper(state.clone(), secs, cli.sweep_interval_secs);
    }

    info!(bind = %cli.bind, "coordinator listening");
    let app_state = web::Data::new(state);
    HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .configure(routes::configure)
    })
    .bind(&cli.bind)?
    .run()
    .await?;

    Ok(())
}

fn spawn_sweeper(state: AppState, expire_after_secs: u64, interval_secs: u64) {
    let max_age = chrono::Duration::seconds(expire_after_secs as i64);
    info!(expire_after_secs, interval_secs, "expiry sweep enabled");
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
        loop {
            tick.tick().await;
            match state.conversations.sweep_expired(max_age).await {
                Ok(n) if n > 0 => info!(removed = n, "swept stale conversations"),
                Ok(_) => {}
                Err(err) => warn!(%err, "conversation sweep failed"),
            }
            match state.exchanges.sweep_expired(max_age).await {
                Ok(n) if n > 0 => info!(removed = n, "swept stale exchanges"),
                Ok(_) => {}
                Err(err) => warn!(%err, "exchange sweep failed"),
            }
        }
    });
}
