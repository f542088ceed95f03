//! SMTP server implementation

use crate::config::ServerOptions;
use crate::smtp::commands::SmtpCommandHandler;
use crate::smtp::error::SmtpError;
use crate::smtp::inbox::Inbox;
use crate::smtp::response::SmtpResponse;
use crate::smtp::session::SmtpSession;

use std::io::{BufRead, BufReader, Write};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

/// Main SMTP server that accepts connections and records delivered mail
#[derive(Debug, Clone)]
pub struct SmtpServer {
    options: ServerOptions,
    commands: Arc<SmtpCommandHandler>,
    inbox: Inbox,
}

impl SmtpServer {
    /// Create a new SMTP server
    pub fn new(options: ServerOptions) -> Self {
        let commands = Arc::new(SmtpCommandHandler::new(&options.hostname));
        Self {
            options,
            commands,
            inbox: Inbox::new(),
        }
    }

    pub fn options(&self) -> &ServerOptions {
        &self.options
    }

    /// Handle to the messages received by this server
    pub fn inbox(&self) -> Inbox {
        self.inbox.clone()
    }

    /// Bind the configured address and serve in a background thread
    pub fn start(&self) -> Result<ServerHandle, SmtpError> {
        let listener = TcpListener::bind(self.options.socket_addr())?;
        self.start_with_listener(listener)
    }

    /// Serve an existing listener in a background thread
    pub fn start_with_listener(&self, listener: TcpListener) -> Result<ServerHandle, SmtpError> {
        let local_addr = listener.local_addr()?;
        let running = Arc::new(AtomicBool::new(true));

        let server = self.clone();
        let flag = Arc::clone(&running);
        let thread = thread::Builder::new()
            .name(format!("mocksmtp @ {}", local_addr.port()))
            .spawn(move || server.accept_loop(&listener, &flag))?;

        tracing::info!(
            %local_addr,
            threaded = self.options.threaded,
            "SMTP server started"
        );

        Ok(ServerHandle {
            local_addr,
            inbox: self.inbox(),
            running,
            thread: Some(thread),
        })
    }

    /// Bind the configured address and serve on this thread (blocking)
    pub fn run(&self) -> Result<(), SmtpError> {
        let listener = TcpListener::bind(self.options.socket_addr())?;
        self.serve(listener)
    }

    /// Serve an existing listener on this thread (blocking)
    pub fn serve(&self, listener: TcpListener) -> Result<(), SmtpError> {
        tracing::info!(
            local_addr = %listener.local_addr()?,
            threaded = self.options.threaded,
            "SMTP server listening"
        );
        self.accept_loop(&listener, &AtomicBool::new(true));
        Ok(())
    }

    fn accept_loop(&self, listener: &TcpListener, running: &AtomicBool) {
        for stream in listener.incoming() {
            if !running.load(Ordering::SeqCst) {
                break;
            }

            match stream {
                Ok(stream) => self.dispatch(stream),
                Err(e) => tracing::warn!(error = %e, "error accepting connection"),
            }
        }
    }

    fn dispatch(&self, stream: TcpStream) {
        if !self.options.threaded {
            handle_client(&self.commands, &self.inbox, stream);
            return;
        }

        let commands = Arc::clone(&self.commands);
        let inbox = self.inbox.clone();
        let spawned = thread::Builder::new()
            .name("mocksmtp-session".to_string())
            .spawn(move || handle_client(&commands, &inbox, stream));
        if let Err(e) = spawned {
            tracing::warn!(error = %e, "could not spawn session thread");
        }
    }
}

/// A server running in the background.
///
/// Dropping the handle stops the server.
#[derive(Debug)]
pub struct ServerHandle {
    local_addr: SocketAddr,
    inbox: Inbox,
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl ServerHandle {
    /// The address the server is bound to
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn inbox(&self) -> Inbox {
        self.inbox.clone()
    }

    pub fn is_running(&self) -> bool {
        self.thread.is_some()
    }

    /// Stop accepting connections and wait for the accept thread to exit.
    ///
    /// In sequential mode this waits for the connection currently being
    /// served; session threads of a threaded server are left to finish on
    /// their own. Calling `stop` again does nothing.
    pub fn stop(&mut self) {
        let Some(thread) = self.thread.take() else {
            return;
        };
        self.running.store(false, Ordering::SeqCst);

        // accept() only returns on a new connection, so make one.
        match TcpStream::connect(wake_addr(self.local_addr)) {
            Ok(_) => {
                if thread.join().is_err() {
                    tracing::warn!("accept thread panicked");
                }
            }
            Err(e) => tracing::warn!(error = %e, "could not wake accept thread"),
        }

        tracing::info!(
            local_addr = %self.local_addr,
            messages = self.inbox.len(),
            "SMTP server stopped"
        );
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

fn wake_addr(addr: SocketAddr) -> SocketAddr {
    let ip = match addr.ip() {
        IpAddr::V4(ip) if ip.is_unspecified() => IpAddr::V4(Ipv4Addr::LOCALHOST),
        IpAddr::V6(ip) if ip.is_unspecified() => IpAddr::V6(Ipv6Addr::LOCALHOST),
        ip => ip,
    };
    SocketAddr::new(ip, addr.port())
}

/// Handle a client connection until QUIT or disconnect
fn handle_client(commands: &Arc<SmtpCommandHandler>, inbox: &Inbox, stream: TcpStream) {
    let peer = stream
        .peer_addr()
        .map_or_else(|_| "unknown".to_string(), |addr| addr.to_string());
    tracing::info!(%peer, "connection accepted");

    let mut session = SmtpSession::new(Arc::clone(commands), inbox.clone());
    if let Err(e) = serve_session(&mut session, stream) {
        tracing::warn!(%peer, error = %e, "connection failed");
    }

    if !session.is_closed() {
        session.disconnect();
    }
    tracing::info!(%peer, "connection closed");
}

fn serve_session(session: &mut SmtpSession, mut stream: TcpStream) -> Result<(), SmtpError> {
    let mut reader = BufReader::new(stream.try_clone()?);
    send_response(&mut stream, &session.greet())?;

    let mut line_buffer = Vec::new();
    while !session.is_closed() {
        line_buffer.clear();
        if reader.read_until(b'\n', &mut line_buffer)? == 0 {
            break; // Connection closed
        }

        let line = String::from_utf8_lossy(strip_terminator(&line_buffer));
        tracing::trace!(state = %session.state(), %line, "received line");

        if let Some(response) = session.process_line(&line) {
            send_response(&mut stream, &response)?;
        }
    }

    Ok(())
}

/// Remove the trailing `\n` or `\r\n`, leaving the content untouched
fn strip_terminator(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

/// Send a response to the client
fn send_response(stream: &mut TcpStream, response: &SmtpResponse) -> Result<(), SmtpError> {
    stream.write_all(response.format().as_bytes())?;
    stream.flush()?;
    Ok(())
}
