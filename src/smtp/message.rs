//! Mail message data structures

use std::fmt;
use std::time::SystemTime;

/// An email message received by the SMTP server.
///
/// Messages are immutable once they have been delivered to the inbox.
/// Header lookups match names ASCII case-insensitively; the stored names
/// keep the case the client sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailMessage {
    headers: Vec<(String, String)>,
    body: String,
    received_at: SystemTime,
}

impl MailMessage {
    /// All headers in the order they were received, duplicates included
    pub fn headers(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    /// Distinct header names in first-seen order
    pub fn header_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for (name, _) in &self.headers {
            if !names.iter().any(|seen| seen.eq_ignore_ascii_case(name)) {
                names.push(name);
            }
        }
        names
    }

    /// Every value recorded for `name`, in arrival order
    pub fn header_values(&self, name: &str) -> Vec<&str> {
        self.headers
            .iter()
            .filter(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
            .collect()
    }

    /// The first value recorded for `name`
    pub fn first_header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Get the subject line from the email headers (if present)
    pub fn subject(&self) -> Option<&str> {
        self.first_header_value("Subject")
    }

    /// The message body, lines joined with `\n`
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Check if the email contains a specific text in headers or body
    pub fn contains_text(&self, text: &str) -> bool {
        self.body.contains(text)
            || self
                .headers
                .iter()
                .any(|(name, value)| name.contains(text) || value.contains(text))
    }

    /// When the message was sealed by the server
    pub fn received_at(&self) -> SystemTime {
        self.received_at
    }
}

impl fmt::Display for MailMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in &self.headers {
            writeln!(f, "{name}: {value}")?;
        }
        writeln!(f)?;
        f.write_str(&self.body)
    }
}

/// A message that is still being received by a session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageBuilder {
    headers: Vec<(String, String)>,
    body_lines: Vec<String>,
    recipients: usize,
}

impl MessageBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.push((name.into(), value.into()));
    }

    /// Append folded text to the most recent header's value.
    ///
    /// Returns `false` when there is no header to extend.
    pub fn extend_last_header(&mut self, text: &str) -> bool {
        match self.headers.last_mut() {
            Some((_, value)) => {
                value.push_str(text);
                true
            }
            None => false,
        }
    }

    pub fn append_body_line(&mut self, line: impl Into<String>) {
        self.body_lines.push(line.into());
    }

    /// Count one accepted recipient
    pub fn add_recipient(&mut self) {
        self.recipients += 1;
    }

    pub fn recipient_count(&self) -> usize {
        self.recipients
    }

    pub fn has_headers(&self) -> bool {
        !self.headers.is_empty()
    }

    /// Finish the message. The builder is consumed, so a message can only
    /// be sealed once.
    pub fn seal(self) -> MailMessage {
        MailMessage {
            headers: self.headers,
            body: self.body_lines.join("\n"),
            received_at: SystemTime::now(),
        }
    }
}
