//! Integration tests driving the server over real TCP connections

use mocksmtp::{ServerHandle, ServerOptions, SmtpServer};
use std::io::{BufRead, BufReader, Write};
use std::net::TcpStream;
use std::thread;
use std::time::Duration;

const WAIT: Duration = Duration::from_secs(2);

fn start_test_server(threaded: bool) -> ServerHandle {
    let options = ServerOptions::new()
        .with_port(0)
        .with_hostname("test.local")
        .threaded(threaded);
    SmtpServer::new(options).start().unwrap()
}

struct Client {
    stream: TcpStream,
    reader: BufReader<TcpStream>,
}

impl Client {
    fn connect(handle: &ServerHandle) -> Self {
        let stream = TcpStream::connect(handle.local_addr()).unwrap();
        let reader = BufReader::new(stream.try_clone().unwrap());
        let mut client = Self { stream, reader };
        assert!(client.reply().starts_with("220"));
        client
    }

    /// Send a line without waiting for a reply
    fn line(&mut self, line: &str) {
        write!(self.stream, "{line}\r\n").unwrap();
        self.stream.flush().unwrap();
    }

    fn command(&mut self, command: &str) -> String {
        self.line(command);
        self.reply()
    }

    fn reply(&mut self) -> String {
        let mut reply = String::new();
        loop {
            let mut line = String::new();
            self.reader.read_line(&mut line).unwrap();
            reply.push_str(&line);
            if line.as_bytes().get(3) != Some(&b'-') {
                return reply.trim_end().to_string();
            }
        }
    }

    fn send_message(&mut self, headers: &[&str], body: &[&str]) -> String {
        assert!(self.command("MAIL FROM:<sender@example.com>").starts_with("250"));
        assert!(self.command("RCPT TO:<recipient@example.com>").starts_with("250"));
        assert!(self.command("DATA").starts_with("354"));
        for header in headers {
            self.line(header);
        }
        self.line("");
        for line in body {
            self.line(line);
        }
        self.command(".")
    }
}

#[test]
fn test_send() {
    let handle = start_test_server(false);
    let mut client = Client::connect(&handle);
    assert!(client.command("HELO client.local").starts_with("250"));
    let reply = client.send_message(&["Subject: Test"], &["Test Body"]);
    assert!(reply.starts_with("250"));
    assert!(client.command("QUIT").starts_with("221"));

    let inbox = handle.inbox();
    assert_eq!(inbox.len(), 1);
    let message = inbox.get(0).unwrap();
    assert_eq!(message.first_header_value("Subject"), Some("Test"));
    assert_eq!(message.body(), "Test Body");
}

#[test]
fn test_threaded_send() {
    let handle = start_test_server(true);
    let mut client = Client::connect(&handle);
    client.command("EHLO client.local");
    client.send_message(&["Subject: Test"], &["Test Body"]);
    client.command("QUIT");

    let inbox = handle.inbox();
    assert!(inbox.wait_for(1, WAIT));
    assert_eq!(inbox.get(0).unwrap().body(), "Test Body");
}

#[test]
fn test_message_with_carriage_returns() {
    let handle = start_test_server(false);
    let mut client = Client::connect(&handle);
    client.command("HELO client.local");
    client.send_message(
        &["Subject: CRTest"],
        &["", "", "Keep these pesky carriage returns", "", ""],
    );
    client.command("QUIT");

    let message = handle.inbox().get(0).unwrap();
    assert_eq!(message.body(), "\n\nKeep these pesky carriage returns\n\n");
}

#[test]
fn test_two_messages_same_connection() {
    let handle = start_test_server(false);
    let mut client = Client::connect(&handle);
    client.command("EHLO client.local");
    client.send_message(&["Subject: Doodle1"], &["Bug1"]);
    client.send_message(&["Subject: Doodle2"], &["Bug2"]);
    client.command("QUIT");

    let messages = handle.inbox().messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].subject(), Some("Doodle1"));
    assert_eq!(messages[0].body(), "Bug1");
    assert_eq!(messages[1].subject(), Some("Doodle2"));
    assert_eq!(messages[1].body(), "Bug2");
}

#[test]
fn test_rset_between_messages() {
    let handle = start_test_server(false);
    let mut client = Client::connect(&handle);
    client.command("HELO client.local");
    client.command("MAIL FROM:<abandoned@example.com>");
    client.command("RCPT TO:<recipient@example.com>");
    assert!(client.command("RSET").starts_with("250"));

    client.send_message(&["Subject: After Reset"], &["This message came after RSET"]);
    client.command("QUIT");

    let messages = handle.inbox().messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].subject(), Some("After Reset"));
}

#[test]
fn test_duplicate_headers_and_headers_without_colon() {
    let handle = start_test_server(false);
    let mut client = Client::connect(&handle);
    client.command("HELO client.local");
    client.send_message(
        &["Received: first", "NotAHeader", "Received: second", "X-Mailer: test"],
        &["body"],
    );
    client.command("QUIT");

    let message = handle.inbox().get(0).unwrap();
    assert_eq!(message.header_values("Received"), vec!["first", "second"]);
    assert_eq!(message.first_header_value("NotAHeader"), Some(""));
    assert_eq!(
        message.header_names(),
        vec!["Received", "NotAHeader", "X-Mailer"]
    );
}

#[test]
fn test_data_before_rcpt() {
    let handle = start_test_server(false);
    let mut client = Client::connect(&handle);
    client.command("HELO client.local");
    client.command("MAIL FROM:<sender@example.com>");
    assert!(client.command("DATA").starts_with("503"));
    assert!(client.command("NOOP").starts_with("250"));
    client.command("QUIT");

    assert!(handle.inbox().is_empty());
}

#[test]
fn test_quit_discards_unfinished_message() {
    let handle = start_test_server(false);
    let mut client = Client::connect(&handle);
    client.command("HELO client.local");
    client.command("MAIL FROM:<sender@example.com>");
    client.command("RCPT TO:<recipient@example.com>");
    assert!(client.command("QUIT").starts_with("221"));

    // The server closes its side after QUIT
    let mut rest = String::new();
    assert_eq!(client.reader.read_line(&mut rest).unwrap(), 0);
    assert!(handle.inbox().is_empty());
}

#[test]
fn test_disconnect_during_data() {
    let handle = start_test_server(false);
    {
        let mut client = Client::connect(&handle);
        client.command("HELO client.local");
        client.command("MAIL FROM:<sender@example.com>");
        client.command("RCPT TO:<recipient@example.com>");
        client.command("DATA");
        client.line("Subject: never sent");
        client.line("");
        client.line("half a body");
    }

    // The next connection is served only after the dropped one is finished
    let mut client = Client::connect(&handle);
    assert!(client.command("QUIT").starts_with("221"));
    assert!(handle.inbox().is_empty());
}

#[test]
fn test_vrfy_and_unknown_commands() {
    let handle = start_test_server(false);
    let mut client = Client::connect(&handle);
    assert!(client.command("VRFY anybody").starts_with("250"));
    assert!(client.command("FROBNICATE").starts_with("500"));
    assert!(client.command("").starts_with("503"));
    assert!(client.command("HELP").starts_with("214"));
    client.command("QUIT");
}

#[test]
fn test_sequential_connections() {
    let handle = start_test_server(false);
    for i in 0..3 {
        let mut client = Client::connect(&handle);
        client.command("HELO client.local");
        client.send_message(&[format!("Subject: {i}").as_str()], &["body"]);
        client.command("QUIT");
    }

    let subjects: Vec<_> = handle
        .inbox()
        .messages()
        .iter()
        .map(|m| m.subject().unwrap_or_default().to_string())
        .collect();
    assert_eq!(subjects, vec!["0", "1", "2"]);
}

#[test]
fn test_concurrent_sessions() {
    const CLIENTS: usize = 10;
    let handle = start_test_server(true);
    let addr = handle.local_addr();

    let clients: Vec<_> = (0..CLIENTS)
        .map(|i| {
            thread::spawn(move || {
                let stream = TcpStream::connect(addr).unwrap();
                let reader = BufReader::new(stream.try_clone().unwrap());
                let mut client = Client { stream, reader };
                assert!(client.reply().starts_with("220"));
                client.command("HELO client.local");
                let reply = client.send_message(
                    &[
                        format!("Subject: client {i}").as_str(),
                        format!("X-Client: {i}").as_str(),
                    ],
                    &[format!("body of {i}").as_str(), "", "shared tail"],
                );
                assert!(reply.starts_with("250"));
                client.command("QUIT");
            })
        })
        .collect();
    for client in clients {
        client.join().unwrap();
    }

    let inbox = handle.inbox();
    assert!(inbox.wait_for(CLIENTS, WAIT));
    let messages = inbox.messages();
    assert_eq!(messages.len(), CLIENTS);

    let mut seen: Vec<usize> = messages
        .iter()
        .map(|m| {
            let id = m.first_header_value("X-Client").unwrap();
            assert_eq!(m.subject(), Some(format!("client {id}").as_str()));
            assert_eq!(m.body(), format!("body of {id}\n\nshared tail"));
            id.parse().unwrap()
        })
        .collect();
    seen.sort_unstable();
    assert_eq!(seen, (0..CLIENTS).collect::<Vec<_>>());
}

#[test]
fn test_subscribe_receives_messages() {
    let handle = start_test_server(true);
    let received = handle.inbox().subscribe();

    let mut client = Client::connect(&handle);
    client.command("HELO client.local");
    client.send_message(&["Subject: Pushed"], &["hello"]);
    client.command("QUIT");

    let message = received.recv_timeout(WAIT).unwrap();
    assert_eq!(message.subject(), Some("Pushed"));
}
