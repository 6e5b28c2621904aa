use std::net::SocketAddr;

use chat_relay_session::RelayConfig;
use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the relay, accepting TCP (and optionally WebSocket) clients.
    Serve(ServeArgs),
    /// Connect to a relay over TCP and chat from the terminal.
    Client(ClientArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    /// Socket address for line-delimited JSON clients. Use port 0 for an ephemeral port.
    #[arg(long, default_value = "127.0.0.1:10000")]
    pub listen: SocketAddr,

    /// Optional socket address for WebSocket clients (`GET /ws`).
    #[arg(long)]
    pub ws_listen: Option<SocketAddr>,

    /// Maximum number of log entries; reaching it stops the relay.
    #[arg(long, env = "CHAT_RELAY_MAX_ENTRIES")]
    pub max_entries: Option<usize>,
}

impl ServeArgs {
    #[must_use]
    pub const fn relay_config(&self) -> RelayConfig {
        RelayConfig {
            max_entries: self.max_entries,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct ClientArgs {
    /// Address of the relay to connect to.
    #[arg(long, default_value = "127.0.0.1:10000")]
    pub server: SocketAddr,
}
