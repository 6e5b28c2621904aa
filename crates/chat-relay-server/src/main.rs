//! Chat relay binary.
//!
//! Run with: cargo run -p chat-relay-server -- serve
//!
//! Then connect with: cargo run -p chat-relay-server -- client

mod cli;
mod client;
mod serve;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Cli, Command};

fn init_tracing() {
    // Logs go to stderr so the client's chat output on stdout stays clean.
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    match cli.command {
        Command::Serve(args) => serve::run(args).await,
        Command::Client(args) => client::run(args).await,
    }
}
