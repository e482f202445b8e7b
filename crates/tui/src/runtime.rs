//! Runtime: terminal lifecycle and the unified event loop.
//!
//! Responsibilities
//! - Own the terminal lifecycle (enter/leave alternate screen, raw mode).
//! - Drive a single event loop over terminal input, health publications,
//!   completed generation requests, and animation ticks.
//! - Route keys into `App::update` and execute returned effects.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode};
use futures_util::StreamExt;
use futures_util::stream::FuturesUnordered;
use ratatui::Terminal;
use ratatui::prelude::CrosstermBackend;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tokio::signal;

use chirp_api::BackendClient;
use chirp_types::HealthState;

use crate::app::{App, Msg};
use crate::cmd::{self, ChatOutcome};
use crate::ui;

/// Spawn a dedicated task that polls terminal input and forwards events over
/// a channel, keeping `poll()` and `read()` together for reliable delivery.
fn spawn_input_task() -> mpsc::Receiver<Event> {
    let (sender, receiver) = mpsc::channel(100);
    tokio::task::spawn_blocking(move || {
        loop {
            match event::poll(Duration::from_millis(50)) {
                Ok(true) => match event::read() {
                    Ok(event) => {
                        if sender.blocking_send(event).is_err() {
                            break;
                        }
                    }
                    Err(error) => {
                        tracing::warn!(%error, "failed to read terminal event");
                        break;
                    }
                },
                Ok(false) => {
                    if sender.is_closed() {
                        break;
                    }
                }
                Err(error) => {
                    tracing::warn!(%error, "failed to poll terminal events");
                    break;
                }
            }
        }
    });
    receiver
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<std::io::Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    Ok(Terminal::new(CrosstermBackend::new(stdout))?)
}

fn cleanup_terminal(terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

/// Translate a key event into an application message.
fn key_to_msg(app: &App, key: crossterm::event::KeyEvent) -> Option<Msg> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return Some(Msg::Quit);
    }
    if app.chat_open {
        match key.code {
            KeyCode::Esc => Some(Msg::CloseChat),
            KeyCode::Enter => Some(Msg::Submit),
            KeyCode::Backspace => Some(Msg::InputBackspace),
            KeyCode::Char(c) => Some(Msg::InputChar(c)),
            _ => None,
        }
    } else {
        match key.code {
            KeyCode::Char('c') | KeyCode::Enter => Some(Msg::ToggleChat),
            KeyCode::Char('y') => Some(Msg::CopyLastReply),
            KeyCode::Char('q') | KeyCode::Esc => Some(Msg::Quit),
            _ => None,
        }
    }
}

/// Entry point for the TUI runtime: terminal setup, event loop, teardown.
pub async fn run_app(
    client: Arc<BackendClient>,
    mut health_rx: watch::Receiver<HealthState>,
    model_name: String,
) -> Result<()> {
    let mut input_receiver = spawn_input_task();
    let mut terminal = setup_terminal()?;
    let mut app = App::new(model_name);
    app.update(Msg::HealthChanged(health_rx.borrow_and_update().clone()));

    let mut pending_replies: FuturesUnordered<JoinHandle<ChatOutcome>> = FuturesUnordered::new();
    // The monitor outlives the UI in normal operation; if it goes away we
    // keep rendering the last known state.
    let mut health_live = true;

    // Fast ticks only while a request is animating.
    let fast_interval = Duration::from_millis(120);
    let idle_interval = Duration::from_millis(1000);
    let mut current_interval = idle_interval;
    let mut ticker = time::interval(current_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    terminal.draw(|frame| ui::draw(frame, &app))?;

    loop {
        let target_interval = if app.executing { fast_interval } else { idle_interval };
        if target_interval != current_interval {
            current_interval = target_interval;
            ticker = time::interval(current_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        }

        let mut needs_render = false;
        let mut effects = Vec::new();

        tokio::select! {
            maybe_event = input_receiver.recv() => {
                let Some(event) = maybe_event else { break };
                match event {
                    Event::Key(key) => {
                        if let Some(msg) = key_to_msg(&app, key) {
                            effects.extend(app.update(msg));
                        }
                    }
                    Event::Resize(..) => {}
                    _ => {}
                }
                needs_render = true;
            }

            changed = health_rx.changed(), if health_live => {
                match changed {
                    Ok(()) => {
                        let state = health_rx.borrow_and_update().clone();
                        effects.extend(app.update(Msg::HealthChanged(state)));
                        needs_render = true;
                    }
                    Err(_) => health_live = false,
                }
            }

            Some(joined) = pending_replies.next(), if !pending_replies.is_empty() => {
                let outcome = joined.unwrap_or_else(|error| ChatOutcome::Failed(format!("task failed: {error}")));
                let msg = match outcome {
                    ChatOutcome::Reply(text) => Msg::ReplyReceived(text),
                    ChatOutcome::Failed(error) => Msg::ReplyFailed(error),
                };
                effects.extend(app.update(msg));
                needs_render = true;
            }

            _ = ticker.tick() => {
                effects.extend(app.update(Msg::Tick));
                needs_render = app.executing;
            }

            _ = signal::ctrl_c() => break,
        }

        if !effects.is_empty() {
            let commands = cmd::from_effects(&app, effects);
            pending_replies.extend(cmd::run_cmds(&client, commands));
        }

        if app.should_quit {
            break;
        }
        if needs_render {
            terminal.draw(|frame| ui::draw(frame, &app))?;
        }
    }

    cleanup_terminal(&mut terminal)?;
    Ok(())
}
