//! Server configuration

use crate::smtp::SmtpError;

use std::env;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

/// Options for running an [`SmtpServer`](crate::SmtpServer)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerOptions {
    /// Address to listen on
    pub bind_address: IpAddr,
    /// Port to listen on, `0` for an ephemeral port
    pub port: u16,
    /// Name the server reports in its replies
    pub hostname: String,
    /// Handle each connection on its own thread instead of one at a time
    pub threaded: bool,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            bind_address: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 2525,
            hostname: "localhost".to_string(),
            threaded: false,
        }
    }
}

impl ServerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bind_address(mut self, address: IpAddr) -> Self {
        self.bind_address = address;
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_hostname(mut self, hostname: &str) -> Self {
        self.hostname = hostname.to_owned();
        self
    }

    pub fn threaded(mut self, threaded: bool) -> Self {
        self.threaded = threaded;
        self
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_address, self.port)
    }

    /// Load options from `MOCKSMTP_*` environment variables
    pub fn from_env() -> Result<Self, SmtpError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load options through `lookup`, falling back to defaults for
    /// variables it does not know.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SmtpError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut options = Self::default();

        if let Some(value) = lookup("MOCKSMTP_BIND_ADDRESS") {
            options.bind_address = parse_address(&value)?;
        }
        if let Some(value) = lookup("MOCKSMTP_PORT") {
            options.port = parse_port(&value)?;
        }
        if let Some(value) = lookup("MOCKSMTP_HOSTNAME") {
            options.hostname = value;
        }
        if let Some(value) = lookup("MOCKSMTP_THREADED") {
            options.threaded = parse_flag(&value)?;
        }

        tracing::debug!(?options, "loaded server options");
        Ok(options)
    }

    /// Override options from command-line arguments.
    ///
    /// Accepts a bare port number, `--threaded`, `--hostname=NAME` and
    /// `--bind=ADDR`.
    pub fn apply_args<I, S>(mut self, args: I) -> Result<Self, SmtpError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for arg in args {
            let arg = arg.as_ref();
            if arg == "--threaded" {
                self.threaded = true;
            } else if let Some(hostname) = arg.strip_prefix("--hostname=") {
                self.hostname = hostname.to_string();
            } else if let Some(address) = arg.strip_prefix("--bind=") {
                self.bind_address = parse_address(address)?;
            } else if !arg.starts_with('-') {
                self.port = parse_port(arg)?;
            } else {
                return Err(SmtpError::InvalidConfig(format!("unknown option '{arg}'")));
            }
        }
        Ok(self)
    }
}

fn parse_port(value: &str) -> Result<u16, SmtpError> {
    value
        .trim()
        .parse()
        .map_err(|_| SmtpError::InvalidConfig(format!("'{value}' is not a valid port number")))
}

fn parse_address(value: &str) -> Result<IpAddr, SmtpError> {
    value
        .trim()
        .parse()
        .map_err(|_| SmtpError::InvalidConfig(format!("'{value}' is not a valid IP address")))
}

fn parse_flag(value: &str) -> Result<bool, SmtpError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(SmtpError::InvalidConfig(format!(
            "'{value}' is not a valid boolean"
        ))),
    }
}
