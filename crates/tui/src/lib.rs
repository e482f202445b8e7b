//! Terminal chat overlay for chirp.
//!
//! Presents a host view with a floating chat window, a status line fed by
//! the health monitor's watch channel, and a chat entry point that is
//! exposed only while the latest published status is healthy. The UI is a
//! read-only subscriber of health state; it never mutates it.

mod app;
mod cmd;
mod runtime;
mod theme;
mod ui;

use std::sync::Arc;

use anyhow::Result;
use chirp_api::BackendClient;
use chirp_types::HealthState;
use tokio::sync::watch;

pub use app::{App, Effect, FALLBACK_REPLY, Msg};

/// Run the chat overlay until the user quits.
///
/// `health_rx` is the monitor's subscription; the caller keeps the monitor
/// alive for the duration and stops it afterwards.
pub async fn run(client: Arc<BackendClient>, health_rx: watch::Receiver<HealthState>, model_name: String) -> Result<()> {
    runtime::run_app(client, health_rx, model_name).await
}
