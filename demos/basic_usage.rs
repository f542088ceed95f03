//! Basic usage example for the mocksmtp server
//!
//! Starts a server on an ephemeral port, sends one message over a plain
//! TCP connection and prints what landed in the inbox.

use mocksmtp::{ServerOptions, SmtpServer};
use std::error::Error;
use std::io::{BufRead, BufReader, Write};
use std::net::{SocketAddr, TcpStream};
use std::time::Duration;

fn main() -> Result<(), Box<dyn Error>> {
    let options = ServerOptions::new().with_port(0).with_hostname("example.local");
    let mut handle = SmtpServer::new(options).start()?;
    println!("Server listening on {}", handle.local_addr());

    send_test_email(handle.local_addr())?;

    let inbox = handle.inbox();
    if !inbox.wait_for(1, Duration::from_secs(1)) {
        eprintln!("Timeout: no email received within 1 second");
        handle.stop();
        return Ok(());
    }

    for message in inbox.messages() {
        println!("Email received at {:?}:", message.received_at());
        println!("  Subject: {}", message.subject().unwrap_or("(none)"));
        for (name, value) in message.headers() {
            println!("  {name}: {value}");
        }
        println!("  Body:");
        for line in message.body().lines() {
            println!("    {line}");
        }
    }

    handle.stop();
    Ok(())
}

fn send_test_email(addr: SocketAddr) -> Result<(), Box<dyn Error>> {
    let mut stream = TcpStream::connect(addr)?;
    let mut reader = BufReader::new(stream.try_clone()?);
    let mut response = String::new();

    // Greeting
    reader.read_line(&mut response)?;
    print!("S: {response}");

    let commands = [
        "HELO client.example.com",
        "MAIL FROM:<sender@example.com>",
        "RCPT TO:<recipient@example.com>",
        "DATA",
    ];
    for command in commands {
        write!(stream, "{command}\r\n")?;
        response.clear();
        reader.read_line(&mut response)?;
        print!("S: {response}");
    }

    let content = [
        "From: sender@example.com",
        "To: recipient@example.com",
        "Subject: Test Email from mocksmtp",
        "",
        "This is a test email sent to demonstrate",
        "the mocksmtp server.",
        ".",
    ];
    for line in content {
        write!(stream, "{line}\r\n")?;
    }
    response.clear();
    reader.read_line(&mut response)?;
    print!("S: {response}");

    write!(stream, "QUIT\r\n")?;
    response.clear();
    reader.read_line(&mut response)?;
    print!("S: {response}");

    Ok(())
}
