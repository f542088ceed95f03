use mocksmtp::{ServerOptions, SmtpServer};
use std::env;
use std::thread;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let options = match ServerOptions::from_env().and_then(|o| o.apply_args(env::args().skip(1)))
    {
        Ok(options) => options,
        Err(e) => {
            tracing::error!("{e}");
            eprintln!("usage: mocksmtp [PORT] [--threaded] [--hostname=NAME] [--bind=ADDR]");
            std::process::exit(2);
        }
    };

    let server = SmtpServer::new(options);
    let received = server.inbox().subscribe();

    thread::spawn(move || {
        let mut count = 0;
        while let Ok(message) = received.recv() {
            count += 1;
            tracing::info!(
                count,
                subject = message.subject().unwrap_or("(none)"),
                headers = message.headers().count(),
                body_bytes = message.body().len(),
                "received message"
            );
        }
    });

    if let Err(e) = server.run() {
        tracing::error!("Failed to start server: {e}");
        std::process::exit(1);
    }
}
