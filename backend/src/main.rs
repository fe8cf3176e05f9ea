use anyhow::Result;
use backend::{Server, ServerConfig};
use clap::Parser;
use std::net::SocketAddr;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Command-line overrides; anything unset falls back to `CHESS_*` variables,
/// then to the built-in defaults
#[derive(Parser, Debug)]
#[command(name = "backend")]
#[command(about = "Two-player chess matchmaking and relay server")]
struct Args {
    /// Address to listen on, host:port
    #[arg(long)]
    listen: Option<SocketAddr>,

    /// Maximum concurrent connections
    #[arg(long)]
    max_connections: Option<usize>,

    /// Liveness ping interval, e.g. "15s"
    #[arg(long, value_parser = humantime::parse_duration)]
    ping_interval: Option<Duration>,

    /// Lobby poll interval, e.g. "750ms"
    #[arg(long, value_parser = humantime::parse_duration)]
    lobby_poll_interval: Option<Duration>,
}

impl Args {
    fn apply(self, config: &mut ServerConfig) {
        if let Some(addr) = self.listen {
            config.listen_addr = addr;
        }
        if let Some(n) = self.max_connections {
            config.max_connections = n;
        }
        if let Some(interval) = self.ping_interval {
            config.ping_interval = interval;
        }
        if let Some(interval) = self.lobby_poll_interval {
            config.lobby_poll_interval = interval;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let mut config = ServerConfig::from_env()?;
    args.apply(&mut config);

    let server = Server::bind(config).await?;
    info!("[BACKEND] Chess server bound to {}", server.local_addr());
    let handle = server.start();

    tokio::signal::ctrl_c().await?;
    info!("[BACKEND] Ctrl-C received");
    handle.shutdown().await;
    Ok(())
}
