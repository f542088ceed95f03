//! # mocksmtp
//!
//! mocksmtp is an in-memory SMTP server for tests.
//!
//! It accepts mail from real SMTP clients and keeps every delivered message
//! in an [`Inbox`] so a test can inspect what was sent.
//!
//! ## Quick Start
//!
//! ```rust
//! use mocksmtp::{ServerOptions, SmtpServer};
//! use std::time::Duration;
//!
//! // Port 0 picks a free port
//! let server = SmtpServer::new(ServerOptions::new().with_port(0));
//! let mut handle = server.start().unwrap();
//! let addr = handle.local_addr();
//!
//! // Application sends email to `addr`
//! // ...
//!
//! // Check the contents of the sent email
//! let inbox = handle.inbox();
//! if inbox.wait_for(1, Duration::from_millis(100)) {
//!     println!("Subject: {:?}", inbox.messages()[0].subject());
//! }
//!
//! handle.stop();
//! ```
//!
//! ## Supported SMTP commands
//!
//! - `HELO` / `EHLO` - Identify the client
//! - `MAIL FROM` - Start a message (addresses are never validated)
//! - `RCPT TO` - Add a recipient (repeatable)
//! - `DATA` - Send headers and body, ended by a line holding only `.`
//! - `RSET` - Abandon the current message
//! - `NOOP`, `VRFY`, `HELP` - Always succeed
//! - `QUIT` - Close connection
//!
//! Commands issued out of order get `503` and leave the session where it
//! was. Unknown commands get `500`.
//!
//! ## Notes
//!
//! - Runs in-memory only. Messages are gone when the process exits.
//! - SMTP authentication is not supported.
//! - SSL/TLS connection is not supported.
//! - Mail relay is not supported.
//! - Bodies are stored exactly as received; no dot-unstuffing is applied.
//!
//! ## Concurrency
//!
//! By default connections are served one at a time. Use
//! [`ServerOptions::threaded`] to serve each connection on its own thread.
//! Either way all sessions append to the same inbox, and each append is
//! atomic.

pub mod config;
mod smtp;

pub use config::ServerOptions;
pub use smtp::{
    Action, CommandLine, Effect, Inbox, MailMessage, MessageBuilder, Outcome, ServerHandle,
    SmtpCommandHandler, SmtpError, SmtpResponse, SmtpServer, SmtpSession, SmtpState, commands,
};
