use std::sync::Arc;
use std::time::Duration;

use broadside::events::{BroadcastSink, NotificationSink};
use broadside::{init_logging, AiKind, AiTurn, Engine, EngineConfig, EngineError, Match, Participant, GRID_SIZE};
use clap::{Parser, Subcommand};
use log::{info, warn};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use serde_json::json;
use tokio::sync::broadcast::error::RecvError;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play one AI vs AI match, streaming events as JSON lines.
    Simulate {
        #[arg(long, help = "Fix RNG seed for reproducible matches (e.g., --seed 12345)")]
        seed: Option<u64>,
        #[arg(long, value_enum, default_value_t = AiKind::DensityWeighted)]
        host_ai: AiKind,
        #[arg(long, value_enum, default_value_t = AiKind::UniformRandom)]
        guest_ai: AiKind,
        #[arg(long, default_value_t = 1000)]
        max_turns: u32,
        #[arg(long, help = "Only print the final summary")]
        quiet: bool,
    },
    /// Play a batch of AI vs AI matches and print the aggregate density.
    Heatmap {
        #[arg(long, default_value_t = 20)]
        matches: u32,
        #[arg(long, help = "Fix RNG seed for reproducible matches (e.g., --seed 12345)")]
        seed: Option<u64>,
        #[arg(long, value_enum, default_value_t = AiKind::DensityWeighted)]
        ai: AiKind,
    },
}

fn make_rng(seed: Option<u64>) -> SmallRng {
    match seed {
        Some(s) => SmallRng::seed_from_u64(s),
        None => {
            let mut seed_rng = rand::rng();
            SmallRng::from_rng(&mut seed_rng)
        }
    }
}

/// Drive one match between two AIs until it finishes or `max_turns` shots
/// have been taken.
fn play_out(
    engine: &Engine,
    rng: &mut SmallRng,
    host: Participant,
    guest: Participant,
    max_turns: u32,
) -> Result<Match, EngineError> {
    let game = engine.create_match(host, Some(guest))?;
    engine.ai_place_ships(game.id, rng)?;
    for _ in 0..max_turns {
        match engine.ai_make_shot(game.id, rng)? {
            AiTurn::Fired(report) if report.winner.is_some() => break,
            AiTurn::Fired(_) => {}
            other => {
                warn!("match {} stopped early: {:?}", game.id, other);
                break;
            }
        }
    }
    engine.match_state(game.id)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Commands::Simulate {
            seed,
            host_ai,
            guest_ai,
            max_turns,
            quiet,
        } => {
            if let Some(s) = seed {
                info!("using fixed seed {}", s);
            }
            let sink = Arc::new(BroadcastSink::new(1024));
            let mut rx = sink.subscribe();
            let printer = tokio::spawn(async move {
                loop {
                    match rx.recv().await {
                        Ok(event) if !quiet => match serde_json::to_string(&event) {
                            Ok(line) => println!("{}", line),
                            Err(e) => warn!("could not encode event: {}", e),
                        },
                        Ok(_) => {}
                        Err(RecvError::Lagged(n)) => warn!("event printer skipped {} events", n),
                        Err(RecvError::Closed) => break,
                    }
                }
            });

            let engine_sink: Arc<dyn NotificationSink> = sink.clone();
            drop(sink);
            let summary = tokio::task::spawn_blocking(move || {
                let engine = Engine::in_memory(EngineConfig::from_env(), engine_sink);
                let mut rng = make_rng(seed);
                let game = play_out(
                    &engine,
                    &mut rng,
                    Participant::ai("host", host_ai),
                    Participant::ai("guest", guest_ai),
                    max_turns,
                )?;
                let moves = engine.moves(game.id)?.len();
                Ok::<_, EngineError>(json!({
                    "match_id": game.id,
                    "status": game.status,
                    "winner": game.winner,
                    "host": {"ai": host_ai, "shots": game.host.shots},
                    "guest": {"ai": guest_ai, "shots": game.guest.as_ref().map(|g| g.shots)},
                    "moves": moves,
                }))
            })
            .await??;
            // the engine, and with it the last sender, is gone once the task returns
            printer.await?;
            println!("{}", serde_json::to_string(&summary)?);
        }
        Commands::Heatmap { matches, seed, ai } => {
            let matrix = tokio::task::spawn_blocking(move || {
                // every AI shot should see the boards finished so far
                let config = EngineConfig {
                    cache_window: Duration::ZERO,
                    ..EngineConfig::from_env()
                };
                let engine = Engine::quiet(config);
                let mut rng = make_rng(seed);
                for _ in 0..matches {
                    play_out(
                        &engine,
                        &mut rng,
                        Participant::ai("alpha", ai),
                        Participant::ai("bravo", ai),
                        (GRID_SIZE * GRID_SIZE * 2) as u32,
                    )?;
                }
                engine.aggregate_density()
            })
            .await??;
            let rows: Vec<Vec<f64>> = matrix.iter().map(|row| row.to_vec()).collect();
            println!("{}", serde_json::to_string(&json!({ "matches": matches, "density": rows }))?);
        }
    }
    Ok(())
}
