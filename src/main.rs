use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use netclad::error::{NetcladError, Result};
use netclad::interface::KnowledgeBase;
use netclad::server;
use netclad::settings::Settings;

#[tokio::main]
async fn main() {
    let settings = match Settings::load() {
        Ok(settings) => settings,
        Err(e) => {
            // no subscriber yet, so the reason goes straight to stderr
            eprintln!("netclad: {e}");
            std::process::exit(1);
        }
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.log_filter)),
        )
        .init();

    if let Err(e) = run(settings).await {
        error!(error = %e, "netclad stopped");
        std::process::exit(1);
    }
}

async fn run(settings: Settings) -> Result<()> {
    let kb = Arc::new(KnowledgeBase::open(&settings)?);
    info!(triples = kb.len()?, mode = ?settings.persistence_mode(), "knowledge base ready");

    let listener = tokio::net::TcpListener::bind(&settings.bind_address)
        .await
        .map_err(|e| NetcladError::Server(format!("cannot bind {}: {}", settings.bind_address, e)))?;
    info!(address = %settings.bind_address, "listening");
    axum::serve(listener, server::router(kb))
        .await
        .map_err(|e| NetcladError::Server(e.to_string()))
}
