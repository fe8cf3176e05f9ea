//! Terminal chess client
//!
//! Connects to the server, queues for a game and plays it from stdin using
//! coordinate moves (`e2e4`, `e7e8q`). After each game it queues again.

use anyhow::Context;
use clap::Parser;
use netchess::game::parse_coordinate_move;
use netchess::{ChessClient, ClientConfig, ClientEvent, GameUpdate, OnlineGame};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "netchess", about = "Play chess against another player over the network")]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:13000")]
    server: SocketAddr,

    /// Name shown to your opponents
    #[arg(short, long)]
    name: String,

    /// Seconds between liveness pings
    #[arg(long, default_value_t = 15)]
    ping_secs: u64,
}

const HELP: &str = "Enter moves like e2e4 or e7e8q. Other commands: board, help, quit";

/// Whether the main loop keeps running
enum Flow {
    Continue,
    Quit,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = ClientConfig {
        ping_interval: Duration::from_secs(args.ping_secs.max(1)),
        ..ClientConfig::default()
    };

    let (client, mut events) = ChessClient::connect(args.server, &args.name, config)
        .await
        .with_context(|| format!("connecting to {}", args.server))?;
    client.look_for_game().await?;
    println!("Waiting for an opponent...");

    let mut input = BufReader::new(tokio::io::stdin()).lines();
    let mut game: Option<OnlineGame> = None;

    loop {
        let flow = tokio::select! {
            event = events.recv() => match event {
                Some(event) => on_event(&client, &mut game, event).await?,
                None => Flow::Quit,
            },
            line = input.next_line() => match line? {
                Some(line) => on_input(&client, &mut game, line.trim()).await?,
                None => Flow::Quit,
            },
        };
        if let Flow::Quit = flow {
            break;
        }
    }

    client.disconnect().await;
    Ok(())
}

async fn on_event(
    client: &ChessClient,
    game: &mut Option<OnlineGame>,
    event: ClientEvent,
) -> anyhow::Result<Flow> {
    match &event {
        ClientEvent::Welcome { message } => println!("{message}"),
        ClientEvent::GameStarted { .. } => {
            *game = OnlineGame::from_event(&event);
            if let Some(current) = game.as_ref() {
                println!(
                    "Game {} started: you play {} against {}",
                    current.game_id(),
                    current.team(),
                    current.opponent()
                );
                println!("{HELP}");
                render(current);
            }
            return Ok(Flow::Continue);
        }
        ClientEvent::ServerFull { message } => {
            println!("{message}");
            return Ok(Flow::Quit);
        }
        _ => {}
    }

    let Some(current) = game.as_mut() else {
        return Ok(match event {
            ClientEvent::MoveRejected { reason, .. } => {
                println!("Server: {reason}");
                Flow::Continue
            }
            ClientEvent::ServerShuttingDown => {
                println!("Server is shutting down");
                Flow::Quit
            }
            ClientEvent::ConnectionLost => {
                println!("Connection to the server was lost");
                Flow::Quit
            }
            _ => Flow::Continue,
        });
    };

    let update = match current.apply_event(&event) {
        Ok(Some(update)) => update,
        Ok(None) => return Ok(Flow::Continue),
        Err(e) => {
            warn!("[CLIENT] Could not apply server event: {}", e);
            println!("Ignored an update the board could not replay: {e}");
            return Ok(Flow::Continue);
        }
    };

    match update {
        GameUpdate::OpponentMoved { descriptor, state } => {
            println!("{} played {}", current.opponent(), descriptor.notation());
            render(current);
            if state.is_terminal() {
                if let Err(e) = current.declare_outcome(client).await {
                    warn!("[CLIENT] Could not declare the result: {}", e);
                }
            }
        }
        GameUpdate::MoveRetracted { descriptor, reason } => {
            println!("Server refused {}: {reason}", descriptor.notation());
            render(current);
        }
        GameUpdate::Rejected { reason } => println!("Server: {reason}"),
        GameUpdate::Ended { state } => println!("{}", state.message()),
    }

    finish_if_over(client, game).await
}

async fn on_input(
    client: &ChessClient,
    game: &mut Option<OnlineGame>,
    line: &str,
) -> anyhow::Result<Flow> {
    match line {
        "" => return Ok(Flow::Continue),
        "quit" | "exit" => return Ok(Flow::Quit),
        "help" => {
            println!("{HELP}");
            return Ok(Flow::Continue);
        }
        _ => {}
    }

    let Some(current) = game.as_mut() else {
        println!("No game in progress; still waiting for an opponent");
        return Ok(Flow::Continue);
    };
    if line == "board" {
        render(current);
        return Ok(Flow::Continue);
    }

    let Some((from, to, promotion)) = parse_coordinate_move(line) else {
        println!("{HELP}");
        return Ok(Flow::Continue);
    };
    if !current.is_my_turn() {
        println!("Wait for {} to move", current.opponent());
        return Ok(Flow::Continue);
    }
    let Some(mv) = current.find_move(from, to, promotion)? else {
        println!("Illegal move: {line}");
        return Ok(Flow::Continue);
    };

    if let Err(e) = current.submit_move(client, &mv).await {
        println!("Move not played: {e}");
        return Ok(Flow::Continue);
    }
    render(current);
    finish_if_over(client, game).await
}

/// Report a finished game and queue for the next one
async fn finish_if_over(client: &ChessClient, game: &mut Option<OnlineGame>) -> anyhow::Result<Flow> {
    let Some(state) = game.as_ref().map(OnlineGame::match_state) else {
        return Ok(Flow::Continue);
    };
    if !state.is_terminal() {
        return Ok(Flow::Continue);
    }

    println!("Game over: {}", state.message());
    *game = None;
    if !client.is_connected() {
        return Ok(Flow::Quit);
    }
    if let Err(e) = client.look_for_game().await {
        println!("Cannot queue for another game: {e}");
        return Ok(Flow::Quit);
    }
    println!("Waiting for an opponent...");
    Ok(Flow::Continue)
}

fn render(game: &OnlineGame) {
    let session = game.session();
    println!("{}", session.board());
    if session.match_state().is_terminal() {
        return;
    }
    if game.is_my_turn() {
        let check = if session.is_in_check(game.team()) { " (check)" } else { "" };
        println!("Your move{check}:");
    } else {
        println!("{} to move", session.active_team());
    }
}
