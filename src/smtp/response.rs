//! SMTP response handling

use crate::smtp::state::SmtpState;

/// Represents the outcome of one protocol line: the reply to send (if any)
/// and the state the session moves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpResponse {
    /// The SMTP reply code, or `None` when the line gets no reply
    pub code: Option<u16>,
    /// The human-readable message
    pub message: String,
    /// Continuation lines for multiline replies such as EHLO
    pub multiline: Option<Vec<String>>,
    /// State of the session after this response
    pub next_state: SmtpState,
}

impl SmtpResponse {
    /// Create a new SMTP response
    pub fn new(code: u16, message: &str, next_state: SmtpState) -> Self {
        Self {
            code: Some(code),
            message: message.to_string(),
            multiline: None,
            next_state,
        }
    }

    /// Create a new multiline SMTP response
    pub fn new_multiline(
        code: u16,
        message: &str,
        lines: Vec<String>,
        next_state: SmtpState,
    ) -> Self {
        Self {
            code: Some(code),
            message: message.to_owned(),
            multiline: Some(lines),
            next_state,
        }
    }

    /// Accept a data line without replying
    pub fn silent(next_state: SmtpState) -> Self {
        Self {
            code: None,
            message: String::new(),
            multiline: None,
            next_state,
        }
    }

    /// Create a success response (250 OK)
    pub fn ok(next_state: SmtpState) -> Self {
        Self::new(250, "OK", next_state)
    }

    /// Create a greeting response (220)
    pub fn greeting(hostname: &str) -> Self {
        Self::new(
            220,
            &format!("{hostname} ESMTP mocksmtp service ready"),
            SmtpState::Greet,
        )
    }

    /// Create a HELO response (250)
    pub fn helo(hostname: &str, client_domain: &str) -> Self {
        Self::new(250, &greeting_line(hostname, client_domain), SmtpState::Mail)
    }

    /// Create an EHLO response (250) with capabilities
    pub fn ehlo(hostname: &str, client_domain: &str) -> Self {
        let capabilities = vec!["8BITMIME".to_owned(), "HELP".to_owned()];
        Self::new_multiline(
            250,
            &greeting_line(hostname, client_domain),
            capabilities,
            SmtpState::Mail,
        )
    }

    /// Create a DATA intermediate response (354)
    pub fn data_start() -> Self {
        Self::new(
            354,
            "Start mail input; end with <CRLF>.<CRLF>",
            SmtpState::DataHdr,
        )
    }

    /// Message sealed and delivered to the inbox (250)
    pub fn queued() -> Self {
        Self::new(250, "OK: queued", SmtpState::Mail)
    }

    /// Create a QUIT response (221)
    pub fn quit(hostname: &str) -> Self {
        Self::new(
            221,
            &format!("{hostname} closing transmission channel"),
            SmtpState::Quit,
        )
    }

    /// Create an error response that keeps the session where it was
    pub fn error(code: u16, message: &str, state: SmtpState) -> Self {
        Self::new(code, message, state)
    }

    /// Format the response for sending over the wire.
    ///
    /// Silent responses format as the empty string.
    pub fn format(&self) -> String {
        let Some(code) = self.code else {
            return String::new();
        };

        match self.multiline {
            Some(ref lines) if !lines.is_empty() => {
                let mut result = format!("{code}-{}\r\n", self.message);
                for (i, line) in lines.iter().enumerate() {
                    let sep = if i == lines.len() - 1 { ' ' } else { '-' };
                    result.push_str(&format!("{code}{sep}{line}\r\n"));
                }
                result
            }
            _ => format!("{code} {}\r\n", self.message),
        }
    }

    /// Whether this response produces no reply line
    pub fn is_silent(&self) -> bool {
        self.code.is_none()
    }

    /// Check if this is a success response (2xx)
    pub fn is_success(&self) -> bool {
        matches!(self.code, Some(200..=299))
    }

    /// Check if this is an error response (4xx or 5xx)
    pub fn is_error(&self) -> bool {
        matches!(self.code, Some(400..=599))
    }
}

fn greeting_line(hostname: &str, client_domain: &str) -> String {
    if client_domain.is_empty() {
        format!("{hostname} Hello")
    } else {
        format!("{hostname} Hello {client_domain}")
    }
}
