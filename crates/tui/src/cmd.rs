//! Command execution layer: the boundary where pure state updates meet side
//! effects (clipboard writes, generation requests).
//!
//! [`Effect`]s from `App::update` are translated into [`Cmd`]s and executed;
//! generation requests run as spawned tasks whose handles the runtime polls
//! through a `FuturesUnordered`.

use std::sync::Arc;

use chirp_api::BackendClient;
use tokio::task::JoinHandle;
use tracing::warn;

use crate::app::{App, Effect};

/// Result of a background generation request.
#[derive(Debug, Clone)]
pub enum ChatOutcome {
    Reply(String),
    Failed(String),
}

/// Side-effectful commands executed outside of state updates.
#[derive(Debug)]
pub enum Cmd {
    /// Send a prompt to the generation endpoint with the configured model.
    SendPrompt { model_name: String, prompt: String },
    /// Write text into the system clipboard.
    ClipboardSet(String),
}

/// Convert application effects into commands.
pub fn from_effects(app: &App, effects: Vec<Effect>) -> Vec<Cmd> {
    effects
        .into_iter()
        .map(|effect| match effect {
            Effect::SendPrompt(prompt) => Cmd::SendPrompt {
                model_name: app.model_name.clone(),
                prompt,
            },
            Effect::CopyToClipboard(text) => Cmd::ClipboardSet(text),
        })
        .collect()
}

/// Execute commands; spawned request handles are returned for the runtime to
/// await.
pub fn run_cmds(client: &Arc<BackendClient>, commands: Vec<Cmd>) -> Vec<JoinHandle<ChatOutcome>> {
    let mut pending = Vec::new();
    for command in commands {
        match command {
            Cmd::SendPrompt { model_name, prompt } => {
                pending.push(spawn_generate(Arc::clone(client), model_name, prompt));
            }
            Cmd::ClipboardSet(text) => clipboard_set(text),
        }
    }
    pending
}

fn spawn_generate(client: Arc<BackendClient>, model_name: String, prompt: String) -> JoinHandle<ChatOutcome> {
    tokio::spawn(async move {
        match client.generate(&model_name, &prompt).await {
            Ok(reply) => ChatOutcome::Reply(reply),
            Err(error) => {
                warn!(%error, "generate request failed");
                ChatOutcome::Failed(error.to_string())
            }
        }
    })
}

fn clipboard_set(text: String) {
    if let Err(error) = arboard::Clipboard::new().and_then(|mut cb| cb.set_text(text)) {
        warn!(%error, "clipboard write failed");
    }
}
