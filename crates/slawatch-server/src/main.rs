use anyhow::Result;
use chrono::Utc;
use slawatch_common::clock::{Clock, SystemClock};
use slawatch_common::types::User;
use slawatch_notify::channels::{EmailChannel, WebhookChannel};
use slawatch_notify::{NotificationChannel, NotificationDispatcher};
use slawatch_storage::IncidentStore;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tokio::signal;
use tokio::time::{interval, Duration};
use tracing_subscriber::EnvFilter;

use slawatch_server::app;
use slawatch_server::config::ServerConfig;
use slawatch_server::scheduler::SlaScanScheduler;
use slawatch_server::service::IncidentService;
use slawatch_server::state::AppState;

const DEFAULT_OPERATOR_EMAIL: &str = "operator@slawatch.local";
const DEFAULT_OPERATOR_USERNAME: &str = "operator";

fn env_i32(key: &str, default: i32) -> i32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[tokio::main]
async fn main() -> Result<()> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|e| anyhow::anyhow!("Failed to install default CryptoProvider: {e:?}"))?;

    // Machine/node IDs keep snowflake IDs distinct when several server
    // instances share one database.
    slawatch_common::id::init(
        env_i32("SLAWATCH_MACHINE_ID", 1),
        env_i32("SLAWATCH_NODE_ID", 1),
    );

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("slawatch=info".parse()?))
        .init();

    let args: Vec<String> = std::env::args().collect();
    let config_path = args.get(1).map(|s| s.as_str()).unwrap_or("config.toml");
    run_server(config_path).await
}

/// Build notification channels from config. A channel that fails to
/// construct is logged and skipped so the server still starts.
fn build_channels(config: &ServerConfig) -> Vec<Box<dyn NotificationChannel>> {
    let mut channels: Vec<Box<dyn NotificationChannel>> = Vec::new();

    if config.notify.email.enabled {
        let email = &config.notify.email;
        match EmailChannel::new(
            &email.smtp_host,
            email.smtp_port,
            email.smtp_username.as_deref(),
            email.smtp_password.as_deref(),
            &email.from,
        ) {
            Ok(ch) => {
                tracing::info!(host = %email.smtp_host, "Email notification channel enabled");
                channels.push(Box::new(ch));
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to build email channel");
            }
        }
    }

    if config.notify.webhook.enabled {
        for url in &config.notify.webhook.urls {
            match WebhookChannel::new(url, config.notify.webhook.timeout_secs) {
                Ok(ch) => {
                    tracing::info!(url = %url, "Webhook notification channel enabled");
                    channels.push(Box::new(ch));
                }
                Err(e) => {
                    tracing::error!(url = %url, error = %e, "Failed to build webhook channel");
                }
            }
        }
    }

    channels
}

async fn run_server(config_path: &str) -> Result<()> {
    let config = ServerConfig::load(config_path)?;

    tracing::info!(
        http_port = config.http_port,
        data_dir = %config.data_dir,
        db = %config.connection_url(),
        "slawatch-server starting"
    );

    let db_url = config.connection_url();
    let store = Arc::new(IncidentStore::new(&db_url, Path::new(&config.data_dir)).await?);

    // Default operator account: create if users table is empty, so a
    // fresh install can file incidents right away.
    match store.count_users().await {
        Ok(0) => {
            let now = Utc::now();
            let operator = User {
                id: slawatch_common::id::next_id(),
                email: DEFAULT_OPERATOR_EMAIL.to_string(),
                username: DEFAULT_OPERATOR_USERNAME.to_string(),
                full_name: None,
                active: true,
                created_at: now,
                updated_at: now,
            };
            match store.insert_user(&operator).await {
                Ok(()) => {
                    tracing::info!(
                        email = %operator.email,
                        "Created default operator account"
                    );
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to create default operator account");
                }
            }
        }
        Ok(count) => {
            tracing::info!(
                count,
                "Users table already has accounts, skipping default operator creation"
            );
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to check users table");
        }
    }

    let dispatcher = Arc::new(NotificationDispatcher::new(build_channels(&config)));
    tracing::info!(
        channels = dispatcher.channel_count(),
        "Notification dispatcher ready"
    );

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let service = Arc::new(IncidentService::new(
        store.clone(),
        dispatcher.clone(),
        clock.clone(),
        config.sla.policy(),
    ));

    let state = AppState {
        service,
        store: store.clone(),
        start_time: Utc::now(),
        config: Arc::new(config.clone()),
    };

    // HTTP/REST server
    let http_addr: SocketAddr = format!("0.0.0.0:{}", config.http_port).parse()?;
    let app = app::build_http_app(state);
    let http_listener = tokio::net::TcpListener::bind(http_addr).await?;
    let http_server = axum::serve(
        http_listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    );

    // Periodic purge of soft-deleted incidents past the retention window
    let retention_days = config.retention_days;
    let cleanup_store = store.clone();
    let cleanup_handle = tokio::spawn(async move {
        let mut tick = interval(Duration::from_secs(3600)); // Every hour
        loop {
            tick.tick().await;
            let cutoff = Utc::now() - chrono::Duration::days(retention_days as i64);
            match cleanup_store.purge_soft_deleted(cutoff).await {
                Ok(removed) if removed > 0 => {
                    tracing::info!(removed, "Purged soft-deleted incidents past retention")
                }
                Err(e) => tracing::error!(error = %e, "Incident purge failed"),
                _ => {}
            }
        }
    });

    // SLA breach/warning scan scheduler
    let scan_handle = if config.sla.enabled {
        let scheduler = SlaScanScheduler::new(
            store.clone(),
            dispatcher.clone(),
            clock.clone(),
            config.sla.breach_scan_secs,
            config.sla.warning_scan_secs,
        );
        Some(tokio::spawn(async move {
            scheduler.run().await;
        }))
    } else {
        tracing::info!("SLA scan scheduler disabled");
        None
    };

    tracing::info!(http = %http_addr, "Server started");

    tokio::select! {
        result = http_server.with_graceful_shutdown(async { signal::ctrl_c().await.ok(); }) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "HTTP server error");
            }
        }
        _ = signal::ctrl_c() => {
            tracing::info!("Shutting down gracefully");
        }
    }

    cleanup_handle.abort();
    if let Some(h) = scan_handle {
        h.abort();
    }
    tracing::info!("Server stopped");

    Ok(())
}
