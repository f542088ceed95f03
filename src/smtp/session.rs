//! SMTP session driver
//!
//! A session owns one connection's protocol state and in-progress message.
//! It feeds each line to the matching action, applies the action's effect
//! and publishes sealed messages to the shared inbox.

use crate::smtp::commands::{CommandLine, Effect, Outcome, SmtpCommandHandler};
use crate::smtp::inbox::Inbox;
use crate::smtp::message::MessageBuilder;
use crate::smtp::response::SmtpResponse;
use crate::smtp::state::SmtpState;

use std::sync::Arc;

/// Manages the state and data for a single SMTP session
#[derive(Debug)]
pub struct SmtpSession {
    state: SmtpState,
    message: Option<MessageBuilder>,
    commands: Arc<SmtpCommandHandler>,
    inbox: Inbox,
}

impl SmtpSession {
    /// Create a new SMTP session delivering into `inbox`
    pub fn new(commands: Arc<SmtpCommandHandler>, inbox: Inbox) -> Self {
        Self {
            state: SmtpState::Connect,
            message: None,
            commands,
            inbox,
        }
    }

    pub fn state(&self) -> SmtpState {
        self.state
    }

    /// The message currently being received, if any
    pub fn message(&self) -> Option<&MessageBuilder> {
        self.message.as_ref()
    }

    /// Whether the client has quit
    pub fn is_closed(&self) -> bool {
        self.state.is_terminal()
    }

    /// Produce the connection greeting (220)
    pub fn greet(&mut self) -> SmtpResponse {
        let outcome = self.commands.connect(self.state);
        self.apply(outcome)
    }

    /// Process one line of client input (terminator already stripped).
    ///
    /// Returns `None` when the line gets no reply, as with message data.
    pub fn process_line(&mut self, line: &str) -> Option<SmtpResponse> {
        let line = CommandLine::parse(line);
        let outcome = self
            .commands
            .process(self.state, self.message.as_ref(), &line);
        let response = self.apply(outcome);

        if response.is_silent() {
            None
        } else {
            Some(response)
        }
    }

    /// The connection went away. Any unsealed message is dropped.
    pub fn disconnect(&mut self) {
        if self.message.take().is_some() {
            tracing::debug!(state = %self.state, "discarding unfinished message");
        }
        self.state = SmtpState::Quit;
    }

    fn apply(&mut self, outcome: Outcome) -> SmtpResponse {
        let Outcome { response, effect } = outcome;

        match effect {
            Effect::None => {}
            Effect::Begin => self.message = Some(MessageBuilder::new()),
            Effect::Discard => self.message = None,
            Effect::AddRecipient => self.current().add_recipient(),
            Effect::AddHeader { name, value } => self.current().add_header(name, value),
            Effect::ExtendHeader(text) => {
                self.current().extend_last_header(&text);
            }
            Effect::AppendBody(line) => self.current().append_body_line(line),
            Effect::Seal => {
                let message = self.message.take().unwrap_or_default().seal();
                self.inbox.push(message);
            }
        }

        if response.next_state != self.state {
            tracing::trace!(from = %self.state, to = %response.next_state, "state change");
        }
        self.state = response.next_state;
        response
    }

    fn current(&mut self) -> &mut MessageBuilder {
        self.message.get_or_insert_with(MessageBuilder::new)
    }
}
