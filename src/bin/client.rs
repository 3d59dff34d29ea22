//! line-echo relay client.
//!
//! Connects to the server, forwards stdin line by line, and prints every
//! server line prefixed with `Server: `. Exits when stdin ends or a send
//! fails.

use clap::Parser;
use line_echo::config::ClientArgs;
use line_echo::relay;
use tokio::net::TcpStream;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let args = ClientArgs::parse();

    // Diagnostics go to stderr; stdout carries the conversation
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let stream = match TcpStream::connect(&args.server).await {
        Ok(stream) => stream,
        Err(e) => {
            println!("Error connecting to server: {e}");
            return;
        }
    };

    println!("Connected to server. Type messages and press Enter.");

    if let Err(e) = relay::relay(stream, tokio::io::stdin(), tokio::io::stdout()).await {
        println!("Error sending message: {e}");
    }
}
