//! Strictly Turns - Unified CLI
//!
//! Hosts a local network of parties over HTTP, or plays a demo game.

#![warn(missing_docs)]

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Command};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use strictly_turns::{GameState, LocalNetwork, NetworkConfig, PartyId, Position, StateStore};
use tracing::{info, instrument, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,strictly_turns=debug")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve { config, port } => run_server(&config, port).await,
        Command::Demo { config } => run_demo(&config).await,
    }
}

/// Serves the HTTP API for every configured party.
#[instrument(skip(path), fields(path = %path.display()))]
async fn run_server(path: &Path, port: Option<u16>) -> Result<()> {
    let mut config = NetworkConfig::load_or_default(path)?;
    if let Some(port) = port {
        config = config.with_port(port);
    }

    let network = Arc::new(LocalNetwork::from_config(&config));
    let app = strictly_turns::router(network.clone());

    let listener = tokio::net::TcpListener::bind(config.bind())
        .await
        .with_context(|| format!("Failed to bind {}", config.bind()))?;
    info!(
        bind = %config.bind(),
        parties = ?network.parties(),
        "Strictly Turns server listening"
    );

    axum::serve(listener, app).await?;
    Ok(())
}

/// Plays one game between the first two parties.
///
/// Parties without `auto_play` are driven here, marking the first empty cell.
#[instrument(skip(path), fields(path = %path.display()))]
async fn run_demo(path: &Path) -> Result<()> {
    let config = NetworkConfig::load_or_default(path)?;
    let network = LocalNetwork::from_config(&config);

    let (Some(first), Some(second)) = (config.parties().first(), config.parties().get(1)) else {
        anyhow::bail!("Demo needs two parties, found {}", config.parties().len());
    };
    let first = PartyId::from(first.name().as_str());
    let second = PartyId::from(second.name().as_str());
    let node = network
        .node(&first)
        .with_context(|| format!("No node for {}", first))?
        .clone();

    let receipt = node.coordinator().create_game(&second).await?;
    let game_id = receipt.state().id().clone();
    info!(%game_id, "Demo game created");
    print_version(receipt.state());

    let deadlines = config.coordinator_config();
    let stall_limit = deadlines.endorsement_timeout + deadlines.arbitration_timeout;
    let mut seen = 0;
    let mut last_progress = Instant::now();
    loop {
        let current = node.vault().fetch_current(&game_id).await?;
        if *current.version() > seen {
            seen = *current.version();
            last_progress = Instant::now();
            print_version(&current);
        } else if last_progress.elapsed() > stall_limit {
            anyhow::bail!("Game {} stalled at version {}", game_id, seen);
        }
        if *current.complete() {
            break;
        }
        let mover = network
            .node(current.active_player())
            .with_context(|| format!("No node for {}", current.active_player()))?;
        if *mover.auto_play() {
            // Bots answer through their own coordinator.
            tokio::time::sleep(Duration::from_millis(25)).await;
            continue;
        }
        let Some(position) = Position::valid_moves(current.board()).first().copied() else {
            break;
        };
        if let Err(err) = mover.coordinator().play_move(&game_id, position).await {
            warn!(party = %mover.party(), error = %err, "Demo move failed");
            return Err(err.into());
        }
    }

    let final_state = node.vault().fetch_current(&game_id).await?;
    match final_state.winner() {
        Some(winner) => println!("{} wins after {} versions", winner, final_state.version()),
        None => println!("Draw after {} versions", final_state.version()),
    }
    Ok(())
}

fn print_version(state: &GameState) {
    println!(
        "v{} ({} to move)\n{}",
        state.version(),
        state.active_player(),
        state.board().display()
    );
}
