//! Implementation of SMTP commands
//!
//! Every protocol line is handled by exactly one [`Action`]. An action is a
//! plain function from the session's state, its in-progress message and the
//! line to a response plus an [`Effect`] on the message; the session driver
//! applies the effect. Actions never perform I/O.

use crate::smtp::error::SmtpError;
use crate::smtp::message::MessageBuilder;
use crate::smtp::response::SmtpResponse;
use crate::smtp::state::SmtpState;

use std::collections::HashMap;

/// A single line of client input split into verb and parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    raw: String,
    verb: String,
    params: String,
}

impl CommandLine {
    /// Parse a line with its terminator already removed
    pub fn parse(line: &str) -> Self {
        let trimmed = line.trim_start();
        let (verb, params) = match trimmed.find(char::is_whitespace) {
            Some(end) => (&trimmed[..end], trimmed[end..].trim()),
            None => (trimmed, ""),
        };

        Self {
            raw: line.to_string(),
            verb: verb.to_ascii_uppercase(),
            params: params.to_string(),
        }
    }

    /// The line exactly as received
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The leading token, uppercased
    pub fn verb(&self) -> &str {
        &self.verb
    }

    pub fn params(&self) -> &str {
        &self.params
    }

    pub fn is_blank(&self) -> bool {
        self.raw.is_empty()
    }
}

/// Change an action makes to the session's in-progress message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    None,
    /// Start a fresh message, dropping any previous one
    Begin,
    /// Drop the in-progress message
    Discard,
    AddRecipient,
    AddHeader { name: String, value: String },
    /// Continue the previous header with a folded line
    ExtendHeader(String),
    AppendBody(String),
    /// Seal the message and deliver it to the inbox
    Seal,
}

/// Response and message effect produced by an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub response: SmtpResponse,
    pub effect: Effect,
}

impl Outcome {
    fn reply(response: SmtpResponse) -> Self {
        Self {
            response,
            effect: Effect::None,
        }
    }

    fn with(response: SmtpResponse, effect: Effect) -> Self {
        Self { response, effect }
    }
}

/// Everything an action may look at.
#[derive(Debug, Clone, Copy)]
pub struct Request<'a> {
    pub hostname: &'a str,
    pub state: SmtpState,
    pub message: Option<&'a MessageBuilder>,
    pub line: &'a CommandLine,
}

pub type Handler = fn(&Request<'_>) -> Result<Outcome, SmtpError>;

/// A named command handler.
#[derive(Debug, Clone, Copy)]
pub struct Action {
    name: &'static str,
    stateless: bool,
    handler: Handler,
}

impl Action {
    pub const fn new(name: &'static str, stateless: bool, handler: Handler) -> Self {
        Self {
            name,
            stateless,
            handler,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Whether the reply ignores the session's state and message
    pub fn is_stateless(&self) -> bool {
        self.stateless
    }

    /// Run the action. Rejections become error replies that leave the
    /// state unchanged.
    pub fn respond(&self, request: &Request<'_>) -> Outcome {
        match (self.handler)(request) {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::debug!(
                    action = self.name,
                    state = %request.state,
                    error = %e,
                    "command rejected"
                );
                Outcome::reply(SmtpResponse::error(
                    e.to_response_code(),
                    &e.to_response_message(),
                    request.state,
                ))
            }
        }
    }
}

fn require(request: &Request<'_>, verb: &str) -> Result<(), SmtpError> {
    if request.state.accepts(verb) {
        Ok(())
    } else {
        Err(SmtpError::bad_sequence(format!(
            "{verb} not allowed in {}",
            request.state
        )))
    }
}

fn connect(request: &Request<'_>) -> Result<Outcome, SmtpError> {
    if request.state != SmtpState::Connect {
        return Err(SmtpError::bad_sequence("already connected"));
    }
    Ok(Outcome::reply(SmtpResponse::greeting(request.hostname)))
}

fn helo(request: &Request<'_>) -> Result<Outcome, SmtpError> {
    require(request, "HELO")?;
    Ok(Outcome::with(
        SmtpResponse::helo(request.hostname, request.line.params()),
        Effect::Discard,
    ))
}

fn ehlo(request: &Request<'_>) -> Result<Outcome, SmtpError> {
    require(request, "EHLO")?;
    Ok(Outcome::with(
        SmtpResponse::ehlo(request.hostname, request.line.params()),
        Effect::Discard,
    ))
}

fn mail(request: &Request<'_>) -> Result<Outcome, SmtpError> {
    require(request, "MAIL")?;
    Ok(Outcome::with(
        SmtpResponse::ok(SmtpState::Rcpt),
        Effect::Begin,
    ))
}

fn rcpt(request: &Request<'_>) -> Result<Outcome, SmtpError> {
    require(request, "RCPT")?;
    Ok(Outcome::with(
        SmtpResponse::ok(SmtpState::Rcpt),
        Effect::AddRecipient,
    ))
}

fn data(request: &Request<'_>) -> Result<Outcome, SmtpError> {
    require(request, "DATA")?;
    let recipients = request.message.map_or(0, MessageBuilder::recipient_count);
    if recipients == 0 {
        return Err(SmtpError::bad_sequence("DATA requires RCPT first"));
    }
    Ok(Outcome::reply(SmtpResponse::data_start()))
}

fn rset(request: &Request<'_>) -> Result<Outcome, SmtpError> {
    require(request, "RSET")?;
    Ok(Outcome::with(SmtpResponse::ok(SmtpState::Mail), Effect::Discard))
}

fn noop(request: &Request<'_>) -> Result<Outcome, SmtpError> {
    require(request, "NOOP")?;
    Ok(Outcome::reply(SmtpResponse::ok(request.state)))
}

fn vrfy(request: &Request<'_>) -> Result<Outcome, SmtpError> {
    require(request, "VRFY")?;
    Ok(Outcome::reply(SmtpResponse::ok(request.state)))
}

fn expn(request: &Request<'_>) -> Result<Outcome, SmtpError> {
    require(request, "EXPN")?;
    Err(SmtpError::NotImplemented("EXPN".to_string()))
}

fn help(request: &Request<'_>) -> Result<Outcome, SmtpError> {
    require(request, "HELP")?;
    Ok(Outcome::reply(SmtpResponse::new(
        214,
        "Commands: HELO EHLO MAIL RCPT DATA RSET NOOP VRFY HELP QUIT",
        request.state,
    )))
}

fn quit(request: &Request<'_>) -> Result<Outcome, SmtpError> {
    require(request, "QUIT")?;
    Ok(Outcome::with(
        SmtpResponse::quit(request.hostname),
        Effect::Discard,
    ))
}

fn blank_line(request: &Request<'_>) -> Result<Outcome, SmtpError> {
    match request.state {
        SmtpState::DataHdr => Ok(Outcome::reply(SmtpResponse::silent(SmtpState::DataBody))),
        SmtpState::DataBody => Ok(Outcome::with(
            SmtpResponse::silent(SmtpState::DataBody),
            Effect::AppendBody(String::new()),
        )),
        _ => Err(SmtpError::bad_sequence("blank line")),
    }
}

fn data_line(request: &Request<'_>) -> Result<Outcome, SmtpError> {
    let raw = request.line.raw();
    match request.state {
        SmtpState::DataHdr => {
            let folded = raw.starts_with([' ', '\t'])
                && request.message.is_some_and(MessageBuilder::has_headers);
            let effect = if folded {
                Effect::ExtendHeader(raw.to_string())
            } else {
                let (name, value) = split_header(raw);
                Effect::AddHeader {
                    name: name.to_string(),
                    value: value.to_string(),
                }
            };
            Ok(Outcome::with(SmtpResponse::silent(SmtpState::DataHdr), effect))
        }
        SmtpState::DataBody => Ok(Outcome::with(
            SmtpResponse::silent(SmtpState::DataBody),
            Effect::AppendBody(raw.to_string()),
        )),
        _ => Err(SmtpError::bad_sequence("message data outside DATA")),
    }
}

fn data_end(request: &Request<'_>) -> Result<Outcome, SmtpError> {
    if !request.state.is_data() {
        return Err(SmtpError::bad_sequence("end of data outside DATA"));
    }
    Ok(Outcome::with(SmtpResponse::queued(), Effect::Seal))
}

fn unrecognized(request: &Request<'_>) -> Result<Outcome, SmtpError> {
    Err(SmtpError::UnrecognizedCommand(
        request.line.verb().to_string(),
    ))
}

/// Split a header line at its first colon. A line without a colon becomes
/// a header named after the whole line with an empty value.
fn split_header(line: &str) -> (&str, &str) {
    match line.split_once(':') {
        Some((name, value)) => (name.trim(), value.trim()),
        None => (line.trim(), ""),
    }
}

pub const CONNECT: Action = Action::new("Connect", false, connect);
pub const HELO: Action = Action::new("HELO", false, helo);
pub const EHLO: Action = Action::new("EHLO", false, ehlo);
pub const MAIL: Action = Action::new("MAIL", false, mail);
pub const RCPT: Action = Action::new("RCPT", false, rcpt);
pub const DATA: Action = Action::new("DATA", false, data);
pub const RSET: Action = Action::new("RSET", false, rset);
pub const NOOP: Action = Action::new("NOOP", true, noop);
pub const VRFY: Action = Action::new("VRFY", true, vrfy);
pub const EXPN: Action = Action::new("EXPN", true, expn);
pub const HELP: Action = Action::new("HELP", true, help);
pub const QUIT: Action = Action::new("QUIT", true, quit);
pub const BLANK_LINE: Action = Action::new("Blank line", false, blank_line);
pub const DATA_LINE: Action = Action::new("Data line", false, data_line);
pub const DATA_END: Action = Action::new("End of data", false, data_end);
pub const UNRECOGNIZED: Action = Action::new("Unrecognized command", true, unrecognized);

/// Maps protocol lines to actions and runs them
#[derive(Debug, Clone)]
pub struct SmtpCommandHandler {
    hostname: String,
    verbs: HashMap<String, Action>,
}

impl SmtpCommandHandler {
    /// Create a command handler with the standard verbs registered
    pub fn new(hostname: &str) -> Self {
        let mut handler = Self {
            hostname: hostname.to_owned(),
            verbs: HashMap::new(),
        };
        for action in [HELO, EHLO, MAIL, RCPT, DATA, RSET, NOOP, VRFY, EXPN, HELP, QUIT] {
            handler.register(action.name(), action);
        }
        handler
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// Register or replace the action for a verb
    pub fn register(&mut self, verb: &str, action: Action) {
        self.verbs.insert(verb.to_ascii_uppercase(), action);
    }

    /// Pick the action for a line.
    ///
    /// Blank lines are resolved before any verb lookup; inside DATA every
    /// other line is content except a lone `.`.
    pub fn select(&self, state: SmtpState, line: &CommandLine) -> Action {
        if line.is_blank() {
            return BLANK_LINE;
        }

        if state.is_data() {
            return if line.raw() == "." {
                DATA_END
            } else {
                DATA_LINE
            };
        }

        self.verbs
            .get(line.verb())
            .copied()
            .unwrap_or(UNRECOGNIZED)
    }

    /// Process a line and return the outcome
    pub fn process(
        &self,
        state: SmtpState,
        message: Option<&MessageBuilder>,
        line: &CommandLine,
    ) -> Outcome {
        let action = self.select(state, line);
        action.respond(&Request {
            hostname: &self.hostname,
            state,
            message,
            line,
        })
    }

    /// Outcome for a newly accepted connection
    pub fn connect(&self, state: SmtpState) -> Outcome {
        let line = CommandLine::parse("");
        CONNECT.respond(&Request {
            hostname: &self.hostname,
            state,
            message: None,
            line: &line,
        })
    }
}
