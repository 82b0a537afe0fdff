//! # Warrens Main Entry Point
//!
//! Hosts or joins a game and drives it from a line-based prompt on stdin.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use warrens::game::ActorKind;
use warrens::server::SessionState;
use warrens::{
    Direction, EngineConfig, GameSnapshot, Intent, LocalServer, Position, RemoteServer, Server, Target,
    WarrensError, WarrensResult,
};

/// Command line arguments for Warrens.
#[derive(Parser, Debug)]
#[command(name = "warrens")]
#[command(about = "A turn-based dungeon crawl you can play alone or host for others")]
#[command(version)]
struct Args {
    /// Random seed for level generation
    #[arg(short, long, global = true)]
    seed: Option<u64>,

    /// TOML file with engine settings
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Option<Mode>,
}

#[derive(Subcommand, Debug, Clone)]
enum Mode {
    /// Play a new game in this process
    Play,
    /// Serve a new game over TCP until Ctrl-C
    Host {
        #[arg(long)]
        bind: Option<String>,
    },
    /// Join a hosted game
    Connect {
        #[arg(long, default_value = "127.0.0.1:7878")]
        addr: String,
    },
}

/// One line typed at the prompt.
#[derive(Debug, Clone, PartialEq)]
enum Command {
    Play(Intent),
    Say(String),
    Look,
    Help,
    Quit,
}

const HELP: &str = "Commands: n s e w ne nw se sw (move), a <dir> (attack), wait, get, portal, \
use <n> [x y], drop <n>, equip <n>, say <text>, look, help, quit";

#[tokio::main]
async fn main() {
    let args = Args::parse();
    if let Err(e) = initialize_logging(&args.log_level) {
        eprintln!("{}", e);
    }
    if let Err(e) = run(args).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Initializes the logging system based on the specified log level.
fn initialize_logging(log_level: &str) -> WarrensResult<()> {
    #[cfg(feature = "dev-tools")]
    {
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::new(log_level))
            .with_target(false)
            .try_init()
            .map_err(|e| WarrensError::Config(format!("Logging setup failed: {}", e)))?;
        tracing::debug!("tracing subscriber installed");
    }

    #[cfg(not(feature = "dev-tools"))]
    {
        env_logger::Builder::new()
            .parse_filters(log_level)
            .format_timestamp(None)
            .try_init()
            .map_err(|e| WarrensError::Config(format!("Logging setup failed: {}", e)))?;
    }

    Ok(())
}

async fn run(args: Args) -> WarrensResult<()> {
    let mut config = match &args.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.generation.seed = seed;
    }
    config.validate()?;
    log::info!("Starting Warrens v{} with seed {}", warrens::VERSION, config.seed());

    match args.command.unwrap_or(Mode::Play) {
        Mode::Play => {
            let mut server = LocalServer::start(&config)?;
            play(&mut server).await
        }
        Mode::Host { bind } => {
            let mut server = LocalServer::start(&config)?;
            let bind = bind.unwrap_or_else(|| config.server.bind.clone());
            let addr = server.listen(&bind).await?;
            println!("Hosting on {}, press Ctrl-C to stop", addr);
            tokio::signal::ctrl_c().await?;
            log::info!("Received shutdown signal, {} clients connected", server.hub().client_count());
            server.stop().await
        }
        Mode::Connect { addr } => {
            let mut server = RemoteServer::new(addr, config.server.clone());
            play(&mut server).await
        }
    }
}

/// The prompt loop shared by local and remote play.
async fn play<S: Server>(server: &mut S) -> WarrensResult<()> {
    let mut snapshot = server.connect().await?;
    println!("{}", render(&snapshot));
    println!("{}", HELP);
    let mut state = SessionState::Connected;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while state == SessionState::Connected {
        while let Some(text) = server.receive(Duration::ZERO).await {
            println!("* {}", text);
        }
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let command = match parse_command(&line, &snapshot) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                println!("{}", e);
                continue;
            }
        };

        match command {
            Command::Play(intent) => {
                let response = server.process(intent).await?;
                if let Some(reason) = &response.reason {
                    println!("{}", reason);
                }
                snapshot = response.snapshot;
                println!("{}", render(&snapshot));
                if snapshot.status.is_finished() {
                    state = SessionState::Closing;
                }
            }
            Command::Say(text) => server.put_game_message(&text).await?,
            Command::Look => {
                snapshot = server.snapshot().await?;
                println!("{}", render(&snapshot));
            }
            Command::Help => println!("{}", HELP),
            Command::Quit => state = SessionState::Closing,
        }
    }
    server.stop().await
}

/// Turns one prompt line into a command. Blank lines yield nothing.
fn parse_command(line: &str, snapshot: &GameSnapshot) -> WarrensResult<Option<Command>> {
    let words: Vec<&str> = line.split_whitespace().collect();
    let Some((&verb, rest)) = words.split_first() else {
        return Ok(None);
    };
    let bad = |text: &str| WarrensError::InvalidAction(text.to_string());

    if let Some(direction) = Direction::from_short_name(verb) {
        return Ok(Some(Command::Play(Intent::Move { direction })));
    }
    let command = match verb {
        "a" | "attack" => {
            let direction = rest
                .first()
                .and_then(|d| Direction::from_short_name(d))
                .ok_or_else(|| bad("Attack which way?"))?;
            Command::Play(Intent::Attack { direction })
        }
        "wait" | "." => Command::Play(Intent::Wait),
        "get" | "g" => Command::Play(Intent::Interact),
        "portal" | ">" | "<" => Command::Play(Intent::FollowPortal),
        "use" | "drop" | "equip" => {
            let item = inventory_item(snapshot, rest.first().copied())?;
            match verb {
                "use" => {
                    let target = match rest.get(1..3) {
                        Some([x, y]) => {
                            let x = x.parse().map_err(|_| bad("Target x must be a number"))?;
                            let y = y.parse().map_err(|_| bad("Target y must be a number"))?;
                            Some(Target::Tile(Position::new(x, y)))
                        }
                        _ => None,
                    };
                    Command::Play(Intent::UseItem { item, target })
                }
                "drop" => Command::Play(Intent::DropItem { item }),
                _ => Command::Play(Intent::Equip { item }),
            }
        }
        "say" => {
            if rest.is_empty() {
                return Err(bad("Say what?"));
            }
            Command::Say(rest.join(" "))
        }
        "look" | "l" => Command::Look,
        "help" | "?" => Command::Help,
        "quit" | "q" => Command::Quit,
        other => return Err(bad(&format!("Unknown command '{}', try help", other))),
    };
    Ok(Some(command))
}

/// Item id for a 1-based inventory number.
fn inventory_item(snapshot: &GameSnapshot, number: Option<&str>) -> WarrensResult<warrens::ActorId> {
    let index: usize = number
        .and_then(|n| n.parse().ok())
        .filter(|n| *n >= 1)
        .ok_or_else(|| WarrensError::InvalidAction("Which item? Give its inventory number".to_string()))?;
    snapshot
        .player
        .as_ref()
        .and_then(|p| p.inventory.get(index - 1))
        .map(|item| item.id)
        .ok_or_else(|| WarrensError::InvalidAction(format!("You have no item {}", index)))
}

const VIEW_WIDTH: i32 = 60;
const VIEW_HEIGHT: i32 = 20;

/// Plain text view of a snapshot centered on the player.
fn render(snapshot: &GameSnapshot) -> String {
    let mut out = String::new();
    let Some(level) = &snapshot.level else {
        return "No level".to_string();
    };
    let center = snapshot
        .player
        .as_ref()
        .and_then(|p| level.actors.iter().find(|a| a.id == p.id))
        .map_or(Position::new(level.width as i32 / 2, level.height as i32 / 2), |a| a.position);

    let left = (center.x - VIEW_WIDTH / 2).clamp(0, (level.width as i32 - VIEW_WIDTH).max(0));
    let top = (center.y - VIEW_HEIGHT / 2).clamp(0, (level.height as i32 - VIEW_HEIGHT).max(0));
    for y in top..(top + VIEW_HEIGHT).min(level.height as i32) {
        for x in left..(left + VIEW_WIDTH).min(level.width as i32) {
            let pos = Position::new(x, y);
            let glyph = match level.tile(pos) {
                Some(tile) if !tile.explored => ' ',
                Some(tile) => {
                    let actor = snapshot.actors_at(pos).max_by_key(|a| draw_priority(a.kind));
                    match actor {
                        Some(a) if tile.in_view || a.kind.is_fixture() => a.glyph,
                        _ => tile_glyph(tile.material, tile.blocked),
                    }
                }
                None => ' ',
            };
            out.push(glyph);
        }
        out.push('\n');
    }

    out.push_str(&format!("{} (difficulty {}) turn {}", level.name, level.difficulty, snapshot.turn));
    if let Some(player) = &snapshot.player {
        out.push_str(&format!(
            " | {} L{} HP {}/{} XP {}\n",
            player.name, player.level, player.hit_points.current, player.hit_points.max, player.xp
        ));
        for (i, item) in player.inventory.iter().enumerate() {
            let equipped = if item.equipped { " (equipped)" } else { "" };
            let stack = if item.stack_size > 1 { format!(" x{}", item.stack_size) } else { String::new() };
            out.push_str(&format!("  {}: {}{}{}\n", i + 1, item.name, stack, equipped));
        }
    } else {
        out.push('\n');
    }
    for message in &snapshot.messages {
        out.push_str(&format!("> {}\n", message));
    }
    if let warrens::GameStatus::Finished(outcome) = snapshot.status {
        out.push_str(&format!("Game over: {}\n", outcome));
    }
    out
}

/// Characters are drawn over whatever they stand on.
fn draw_priority(kind: ActorKind) -> u8 {
    match kind {
        ActorKind::Player => 4,
        ActorKind::Monster | ActorKind::Npc => 3,
        ActorKind::Item | ActorKind::Chest => 2,
        ActorKind::Portal => 1,
        ActorKind::Corpse => 0,
    }
}

fn tile_glyph(material: warrens::Material, blocked: bool) -> char {
    use warrens::Material;
    match (material, blocked) {
        (Material::Door, _) => '+',
        (Material::Water, false) => '~',
        (_, true) => '#',
        (Material::None, false) => ' ',
        _ => '.',
    }
}
