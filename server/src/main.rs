use clap::Parser;
use log::{error, info};
use server::catalog::Catalog;
use server::game::GameServer;
use server::network::Server;
use shared::GameMode;
use std::path::PathBuf;
use std::time::Duration;

fn parse_mode(tag: &str) -> Result<GameMode, String> {
    GameMode::from_tag(tag).ok_or_else(|| {
        format!(
            "unknown mode '{}', expected one of: none, tdm, domination, ctf, snd, zombies",
            tag
        )
    })
}

/// Main-method of the application.
/// Parses command-line arguments, loads the quest catalog and runs the server loop.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Command line arguments
    #[derive(Parser, Debug)]
    #[clap(author, version, about)]
    struct Args {
        /// Server IP address to bind to
        #[clap(short = 'H', long, default_value = "127.0.0.1")]
        host: String,
        /// Server port to listen on
        #[clap(short, long, default_value = "8080")]
        port: u16,
        /// Tick rate (updates per second)
        #[clap(short, long, default_value = "30")]
        tick_rate: u32,
        /// Maximum number of connected clients
        #[clap(short, long, default_value = "32")]
        max_clients: usize,
        /// Number of Domination control points (1-5)
        #[clap(long, default_value = "3")]
        control_points: usize,
        /// Mode to start in (tdm, domination, ctf, snd, zombies)
        #[clap(long, value_parser = parse_mode, default_value = "none")]
        mode: GameMode,
        /// Quest and mission catalog; the bundled one is used when omitted
        #[clap(short, long)]
        catalog: Option<PathBuf>,
    }

    env_logger::init();

    // Parse command line arguments
    let args = Args::parse();

    let catalog = match &args.catalog {
        Some(path) => Catalog::load(path),
        None => Catalog::bundled(),
    };
    let catalog = match catalog {
        Ok(catalog) => catalog,
        Err(e) => {
            error!("Failed to load catalog: {}", e);
            return Err(e.into());
        }
    };

    let mut game = GameServer::with_control_points(args.control_points);
    catalog.install(&mut game);
    game.set_mode(args.mode);

    let tick_rate = args.tick_rate.max(1);
    let address = format!("{}:{}", args.host, args.port);
    info!(
        "Starting server on {} at {}Hz in mode {:?}",
        address, tick_rate, args.mode
    );

    let mut server = Server::new(
        &address,
        Duration::from_secs_f32(1.0 / tick_rate as f32),
        args.max_clients,
        game,
    )
    .await?;

    // Handle shutdown gracefully
    tokio::select! {
        result = server.run() => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down gracefully...");
        }
    }

    Ok(())
}
