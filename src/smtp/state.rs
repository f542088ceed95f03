//! SMTP session phases and command legality

use std::fmt;

/// Represents the current phase of an SMTP session.
///
/// Each phase is named after what the session expects next: `Mail` means
/// the client has greeted and may open a transaction with `MAIL FROM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SmtpState {
    /// Connection accepted, greeting not yet sent
    Connect,
    /// Greeting sent - waiting for HELO/EHLO
    Greet,
    /// Ready for a MAIL command
    Mail,
    /// MAIL FROM received - collecting recipients
    Rcpt,
    /// DATA accepted - collecting header lines
    DataHdr,
    /// Header block finished - collecting body lines
    DataBody,
    /// QUIT received, session is over
    Quit,
}

impl SmtpState {
    /// Whether lines are message content rather than commands
    pub fn is_data(self) -> bool {
        matches!(self, SmtpState::DataHdr | SmtpState::DataBody)
    }

    pub fn is_terminal(self) -> bool {
        self == SmtpState::Quit
    }

    /// Check if a command verb is legal in this state.
    ///
    /// `verb` is matched case-insensitively. Unknown verbs are never legal.
    pub fn accepts(self, verb: &str) -> bool {
        if self.is_data() {
            return false;
        }

        match verb.to_ascii_uppercase().as_str() {
            "HELO" | "EHLO" => !self.is_terminal(),
            "MAIL" => self == SmtpState::Mail,
            "RCPT" | "DATA" => self == SmtpState::Rcpt,
            "RSET" => !self.is_terminal(),
            "NOOP" | "VRFY" | "EXPN" | "HELP" | "QUIT" => true,
            _ => false,
        }
    }
}

impl fmt::Display for SmtpState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SmtpState::Connect => "CONNECT",
            SmtpState::Greet => "GREET",
            SmtpState::Mail => "MAIL",
            SmtpState::Rcpt => "RCPT",
            SmtpState::DataHdr => "DATA_HDR",
            SmtpState::DataBody => "DATA_BODY",
            SmtpState::Quit => "QUIT",
        };
        f.write_str(name)
    }
}
