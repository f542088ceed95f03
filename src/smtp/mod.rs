//! SMTP protocol handling

pub mod commands;
pub mod error;
pub mod inbox;
pub mod message;
pub mod response;
pub mod server;
pub mod session;
pub mod state;

pub use commands::{Action, CommandLine, Effect, Outcome, SmtpCommandHandler};
pub use error::SmtpError;
pub use inbox::Inbox;
pub use message::{MailMessage, MessageBuilder};
pub use response::SmtpResponse;
pub use server::{ServerHandle, SmtpServer};
pub use session::SmtpSession;
pub use state::SmtpState;
