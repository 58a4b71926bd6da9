//! `DraftLedger` - pushes locally stored draft actions to the mail server.
//!
//! Drafts saved, sent or scheduled while offline stay in the local database
//! with their pending action. Each run uploads their attachments and pushes
//! them, keeping those that hit a network error for the next run.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod settings;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use draftledger_core::{DraftDispatcher, HttpDraftApi, SqliteDraftStore, UploadCoordinator};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use settings::AppSettings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "draftledger=info,draftledger_core=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting DraftLedger");

    let settings = AppSettings::load().await?;
    let data_dir = AppSettings::data_dir();
    tokio::fs::create_dir_all(&data_dir)
        .await
        .with_context(|| format!("Failed to create {}", data_dir.display()))?;

    let db_path = settings::database_path(&data_dir)?;
    let store = Arc::new(
        SqliteDraftStore::new(&db_path)
            .await
            .context("Failed to open draft database")?,
    );
    let api = Arc::new(
        HttpDraftApi::new(
            &settings.api_base_url,
            settings.mailbox_uuid.clone(),
            settings.api_token.clone(),
        )
        .context("Invalid API settings")?,
    );
    let dispatcher = DraftDispatcher::new(
        store.clone(),
        api.clone(),
        UploadCoordinator::new(store, api),
    );

    let Some(interval) = settings.dispatch_interval_secs else {
        return dispatch_once(&dispatcher).await;
    };

    let mut ticker = tokio::time::interval(Duration::from_secs(interval.max(1)));
    loop {
        tokio::select! {
            _ = ticker.tick() => dispatch_once(&dispatcher).await?,
            _ = tokio::signal::ctrl_c() => {
                info!("Stopping DraftLedger");
                return Ok(());
            }
        }
    }
}

/// Push every pending draft and log how each one went.
async fn dispatch_once(dispatcher: &DraftDispatcher) -> anyhow::Result<()> {
    let results = dispatcher
        .process_all()
        .await
        .context("Failed to list pending drafts")?;

    let mut retry = 0;
    for (draft_id, result) in &results {
        match result {
            Ok(outcome) => info!(%draft_id, ?outcome, "Draft processed"),
            Err(e) if e.is_retryable() => {
                retry += 1;
                tracing::warn!(%draft_id, error = %e, "Draft will be retried");
            }
            Err(e) => tracing::error!(%draft_id, error = %e, "Draft failed"),
        }
    }

    info!(processed = results.len(), retry, "Dispatch run finished");
    Ok(())
}
