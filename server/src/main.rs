use clap::Parser;
use log::{error, info, warn};
use plantation_server::config::ServerConfig;
use plantation_server::network::{Server, ServerEvent};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

/// Authoritative server for the plantation strategy game.
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Address to bind to
    #[clap(short = 'H', long, default_value = "0.0.0.0")]
    host: String,
    /// Port to listen on
    #[clap(short, long, default_value = "5000")]
    port: u16,
    /// Lobby size that starts the session automatically
    #[clap(short, long, default_value = "4")]
    auto_start: usize,
    /// Number of cycles before final scoring
    #[clap(short, long, default_value = "15")]
    cycles: u32,
    /// Fixed seed for reproducible shuffles and raids
    #[clap(short, long)]
    seed: Option<u64>,
}

impl Args {
    fn into_config(self) -> ServerConfig {
        ServerConfig {
            host: self.host,
            port: self.port,
            auto_start_players: self.auto_start,
            total_cycles: self.cycles,
            rng_seed: self.seed,
            ..ServerConfig::default()
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Args::parse().into_config();
    let mut server = Server::new(&config).await?;
    info!("Enter 'start' to begin once at least {} players joined", config.min_players);

    tokio::spawn(read_console(server.command_sender()));

    tokio::select! {
        result = server.run() => {
            if let Err(e) = result {
                error!("Server stopped with error: {}", e);
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}

/// Forwards operator commands typed on stdin to the main loop.
async fn read_console(commands: mpsc::UnboundedSender<ServerEvent>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        match lines.next_line().await {
            Ok(Some(line)) => match line.trim() {
                "start" => {
                    if commands.send(ServerEvent::ForceStart).is_err() {
                        break;
                    }
                }
                "" => {}
                other => warn!("Unknown command '{}'", other),
            },
            Ok(None) => break,
            Err(e) => {
                error!("Failed to read console: {}", e);
                break;
            }
        }
    }
}
