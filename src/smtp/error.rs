//! Error types for the SMTP server

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SmtpError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Command unrecognized: {0}")]
    UnrecognizedCommand(String),

    #[error("Command not implemented: {0}")]
    NotImplemented(String),

    #[error("Bad sequence of commands: {0}")]
    BadSequence(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Maps SMTP errors to appropriate response codes
impl SmtpError {
    pub fn bad_sequence(what: impl Into<String>) -> Self {
        SmtpError::BadSequence(what.into())
    }

    pub fn to_response_code(&self) -> u16 {
        match self {
            SmtpError::Io(_) => 421,
            SmtpError::UnrecognizedCommand(_) => 500,
            SmtpError::NotImplemented(_) => 502,
            SmtpError::BadSequence(_) => 503,
            SmtpError::InvalidConfig(_) => 421,
        }
    }

    pub fn to_response_message(&self) -> String {
        match self {
            SmtpError::Io(_) => "Service not available".to_string(),
            SmtpError::UnrecognizedCommand(_) => "Syntax error, command unrecognized".to_string(),
            SmtpError::NotImplemented(verb) => format!("Command not implemented: {verb}"),
            SmtpError::BadSequence(what) => format!("Bad sequence of commands: {what}"),
            SmtpError::InvalidConfig(_) => "Service not available".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_codes() {
        assert_eq!(SmtpError::bad_sequence("DATA").to_response_code(), 503);
        assert_eq!(
            SmtpError::UnrecognizedCommand("FOO".into()).to_response_code(),
            500
        );
        assert_eq!(
            SmtpError::NotImplemented("EXPN".into()).to_response_code(),
            502
        );
    }

    #[test]
    fn test_response_messages() {
        let err = SmtpError::bad_sequence("DATA requires RCPT first");
        assert_eq!(
            err.to_response_message(),
            "Bad sequence of commands: DATA requires RCPT first"
        );

        let err = SmtpError::UnrecognizedCommand("FOO".into());
        assert_eq!(
            err.to_response_message(),
            "Syntax error, command unrecognized"
        );
    }
}
