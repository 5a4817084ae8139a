// SPDX-FileCopyrightText: 2026 Chatvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `chatvault serve` command implementation.
//!
//! Wires the store, source adapter, rate limiter, task scheduler,
//! missed-check timer, and HTTP/WS gateway together, then runs until a
//! shutdown signal arrives.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chatvault_bus::EventBus;
use chatvault_config::model::ChatvaultConfig;
use chatvault_core::{canonical_chat_id, ChatvaultError, RemoteSource};
use chatvault_gateway::auth::AuthConfig;
use chatvault_gateway::GatewayState;
use chatvault_ingest::{missed_tick, RateLimiter, ReplaySource, Scheduler};
use chatvault_storage::queries::{chats, stats};
use chatvault_storage::Database;
use tracing::{info, warn};

use crate::shutdown;

/// Dialogs pulled from the source at startup.
const DIALOG_SYNC_LIMIT: usize = 100;

/// Runs the `chatvault serve` command.
pub async fn run_serve(config: ChatvaultConfig) -> Result<(), ChatvaultError> {
    init_tracing(&config.log.level);

    info!("starting chatvault serve");

    let db = Database::open_with(&config.storage.database_path, config.storage.wal_mode).await?;
    info!(path = %config.storage.database_path, "archive store opened");

    let source = build_source(&config)?;
    let limiter = Arc::new(RateLimiter::new(
        config.ingest.requests_per_second,
        config.ingest.burst,
    ));
    let bus = EventBus::new();

    // Known dialogs become chat rows up front so read endpoints and the
    // missed-check timer see them before any history load runs.
    sync_dialogs(&db, source.as_ref()).await;

    let scheduler = Scheduler::new(
        db.clone(),
        Arc::clone(&source),
        limiter,
        bus.clone(),
        &config.ingest,
    );
    let queue = scheduler.handle();

    let cancel = shutdown::install_signal_handler();

    let scheduler_task = tokio::spawn(scheduler.run(cancel.clone()));
    let missed_task = tokio::spawn(missed_tick::run_missed_tick(
        db.clone(),
        queue.clone(),
        Duration::from_secs(config.ingest.missed_check_interval_secs),
        config.ingest.missed_check_chat_limit,
        cancel.clone(),
    ));

    let state = GatewayState {
        db: db.clone(),
        bus,
        queue,
        auth: AuthConfig {
            api_token: config.server.api_token.clone(),
        },
        start_time: Instant::now(),
    };
    chatvault_gateway::serve(&config.server, state, cancel.clone()).await?;

    // Gateway returned: shutdown is in progress. Drain the workers, then
    // checkpoint and close the store.
    cancel.cancel();
    let _ = scheduler_task.await;
    let _ = missed_task.await;
    db.close().await?;

    info!("chatvault serve shutdown complete");
    Ok(())
}

/// Runs the `chatvault stats` command.
pub async fn run_stats(config: ChatvaultConfig) -> Result<(), ChatvaultError> {
    let db = Database::open_with(&config.storage.database_path, config.storage.wal_mode).await?;
    let stats = stats::stats(&db).await?;
    db.close().await?;

    println!("chats:        {}", stats.total_chats);
    println!("  fully loaded: {}", stats.fully_loaded_chats);
    println!("messages:     {}", stats.total_messages);
    println!("  deleted:      {}", stats.total_deleted);
    println!("edits:        {}", stats.total_edits);
    Ok(())
}

fn build_source(config: &ChatvaultConfig) -> Result<Arc<dyn RemoteSource>, ChatvaultError> {
    match config.source.kind.as_str() {
        "replay" => {
            let path = config.source.replay_path.as_deref().ok_or_else(|| {
                ChatvaultError::Config(
                    "source.kind = \"replay\" requires source.replay_path".to_string(),
                )
            })?;
            let source = ReplaySource::from_file(std::path::Path::new(path))?;
            info!(path, "replay source loaded");
            Ok(Arc::new(source))
        }
        other => Err(ChatvaultError::Config(format!(
            "unknown source kind `{other}`"
        ))),
    }
}

/// Upsert the source's dialog list into the chats table. Failures are
/// logged and skipped; the archive still serves whatever it already has.
async fn sync_dialogs(db: &Database, source: &dyn RemoteSource) {
    let dialogs = match source.list_dialogs(DIALOG_SYNC_LIMIT, false).await {
        Ok(dialogs) => dialogs,
        Err(e) => {
            warn!(error = %e, "dialog sync failed, continuing with stored chats");
            return;
        }
    };
    let count = dialogs.len();
    for dialog in dialogs {
        let chat_id = canonical_chat_id(dialog.chat_id, dialog.kind);
        if let Err(e) = chats::upsert_chat(
            db,
            chat_id,
            &dialog.title,
            dialog.username.as_deref(),
            dialog.kind,
        )
        .await
        {
            warn!(chat_id, error = %e, "dialog upsert failed");
        }
    }
    info!(count, "dialogs synced");
}

fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("chatvault={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_source_kind_is_rejected() {
        let mut config = ChatvaultConfig::default();
        config.source.kind = "carrier-pigeon".to_string();
        assert!(build_source(&config).is_err());
    }

    #[test]
    fn replay_source_requires_a_path() {
        let config = ChatvaultConfig::default();
        assert!(build_source(&config).is_err());
    }
}
