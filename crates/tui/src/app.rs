//! Application state and update logic for the chat overlay.
//!
//! State updates are pure: input events and background results arrive as
//! [`Msg`] values, `App::update` mutates state and returns [`Effect`]s for
//! the command layer to execute. The health state is replaced wholesale on
//! every publication from the monitor; the app never edits it.

use chirp_types::{ChatMessage, HealthState, Sender};

/// Reply shown when the backend answers with an empty response.
pub const FALLBACK_REPLY: &str = "Please try again";

/// Messages that can update the application state.
#[derive(Debug, Clone)]
pub enum Msg {
    /// Toggle the floating chat window from the entry point.
    ToggleChat,
    /// Close the chat window.
    CloseChat,
    /// Add a character to the input field.
    InputChar(char),
    /// Remove the last character from the input field.
    InputBackspace,
    /// Send the current input as a prompt.
    Submit,
    /// The monitor published a new health state.
    HealthChanged(HealthState),
    /// A generation request completed with reply text.
    ReplyReceived(String),
    /// A generation request failed.
    ReplyFailed(String),
    /// Copy the most recent bot reply to the clipboard.
    CopyLastReply,
    /// Periodic animation tick.
    Tick,
    /// Exit the application.
    Quit,
}

/// Side effects requested by state updates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Send a prompt to the generation endpoint.
    SendPrompt(String),
    /// Write text into the system clipboard.
    CopyToClipboard(String),
}

/// Central state for the chat overlay.
pub struct App {
    /// Latest published health state; read-only here.
    pub health: HealthState,
    /// Whether the floating chat window is open.
    pub chat_open: bool,
    /// Current content of the input field.
    pub input: String,
    /// Chat transcript, oldest first.
    pub messages: Vec<ChatMessage>,
    /// Whether a generation request is in flight.
    pub executing: bool,
    /// Animation frame for the execution throbber.
    pub throbber_idx: usize,
    /// Model name sent with every prompt.
    pub model_name: String,
    pub should_quit: bool,
}

impl App {
    pub fn new(model_name: String) -> Self {
        Self {
            health: HealthState::checking(),
            chat_open: false,
            input: String::new(),
            messages: Vec::new(),
            executing: false,
            throbber_idx: 0,
            model_name,
            should_quit: false,
        }
    }

    /// Whether the chat entry point is exposed: derived from the latest
    /// published status, owned by the monitor.
    pub fn chat_enabled(&self) -> bool {
        self.health.status.chat_enabled()
    }

    /// Apply a message and return the effects it requests.
    pub fn update(&mut self, msg: Msg) -> Vec<Effect> {
        match msg {
            Msg::ToggleChat => {
                if self.chat_open {
                    self.chat_open = false;
                } else if self.chat_enabled() {
                    self.chat_open = true;
                }
                Vec::new()
            }
            Msg::CloseChat => {
                self.chat_open = false;
                Vec::new()
            }
            Msg::InputChar(c) => {
                if self.chat_open {
                    self.input.push(c);
                }
                Vec::new()
            }
            Msg::InputBackspace => {
                self.input.pop();
                Vec::new()
            }
            Msg::Submit => self.submit(),
            Msg::HealthChanged(state) => {
                self.health = state;
                Vec::new()
            }
            Msg::ReplyReceived(text) => {
                self.executing = false;
                let reply = if text.trim().is_empty() {
                    FALLBACK_REPLY.to_string()
                } else {
                    text
                };
                self.messages.push(ChatMessage::bot(reply));
                Vec::new()
            }
            Msg::ReplyFailed(error) => {
                self.executing = false;
                self.messages.push(ChatMessage::bot(format!("Error fetching response: {error}")));
                Vec::new()
            }
            Msg::CopyLastReply => self
                .messages
                .iter()
                .rev()
                .find(|m| m.sender == Sender::Bot)
                .map(|m| vec![Effect::CopyToClipboard(m.text.clone())])
                .unwrap_or_default(),
            Msg::Tick => {
                if self.executing {
                    self.throbber_idx = self.throbber_idx.wrapping_add(1);
                }
                Vec::new()
            }
            Msg::Quit => {
                self.should_quit = true;
                Vec::new()
            }
        }
    }

    fn submit(&mut self) -> Vec<Effect> {
        let prompt = self.input.trim().to_string();
        if prompt.is_empty() || self.executing || !self.chat_open {
            return Vec::new();
        }
        self.messages.push(ChatMessage::user(prompt.clone()));
        self.input.clear();
        self.executing = true;
        self.throbber_idx = 0;
        vec![Effect::SendPrompt(prompt)]
    }
}
