// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Pingback Receiver Service
//!
//! Accepts XML-RPC `pingback.ping` calls, verifies that the claimed source
//! really links to one of our published posts, and records accepted
//! pingbacks.
//!
//! ## Configuration
//!
//! Loaded from `PINGBACK_CONFIG` (default `pingback.toml`, optional) and
//! environment variables:
//!
//! - `PINGBACK_BIND_ADDR`: Server bind address (default: 0.0.0.0:8080)
//! - `PINGBACK_DATABASE__PATH`: `memory` or a RocksDB directory
//! - `PINGBACK_PINGBACK__ENABLED`: Accept pingbacks (default: true)
//! - `PINGBACK_PINGBACK__FETCH_TIMEOUT_SECS`: Source fetch timeout (default: 30)
//! - `PINGBACK_NOTIFICATION__WEBHOOK_URL`: Announce accepted pingbacks here

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use pingback_receiver::{
    config::Config,
    db::Database,
    examiner::SourceExaminer,
    handlers::{router, AppState},
    notifier::WebhookNotifier,
    pipeline::PingbackService,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().json())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    dotenvy::dotenv().ok();

    let config_file =
        std::env::var("PINGBACK_CONFIG").unwrap_or_else(|_| "pingback.toml".to_string());
    let config = Config::load(&config_file)?;
    info!(
        bind_addr = %config.bind_addr,
        enabled = config.pingback.enabled,
        fetch_timeout_secs = config.pingback.fetch_timeout_secs,
        database = %config.database.path,
        "Starting pingback receiver"
    );

    let db = Arc::new(Database::connect(&config.database).await?);
    info!("Connected to SurrealDB");

    let examiner = SourceExaminer::new(&config.pingback)?;
    let service = PingbackService::new(db.clone(), db, examiner);

    let notifier = match config.notification.webhook_url.clone() {
        Some(url) => {
            info!(webhook = %url, "Pingback notifications enabled");
            Some(WebhookNotifier::new(url, config.pingback.fetch_timeout())?)
        }
        None => None,
    };

    let state = Arc::new(AppState {
        service,
        notifier,
        config: config.clone(),
    });

    let app = router(state);

    let addr: SocketAddr = config.bind_addr.parse()?;
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %addr, "Server listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
