//! # Arena Server
//!
//! Runs the arena on the threaded host with four seeded bots hammering it
//! with abilities, then prints what happened.
//!
//! ```text
//! arena_server [seed] [seconds] [host.toml]
//! ```
//!
//! Log verbosity follows `RUST_LOG` (default `info`).

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use hearth_abilities::AttributeId;
use hearth_arena::{ArenaCommand, ArenaEvent, ArenaSimulation, CommandEnvelope};
use hearth_host::{CommandSender, CorrelationId, Host, HostConfig, StopOutcome};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const BOTS: u8 = 4;
const GRANTS: [&str; 4] = ["Strike", "Shockwave", "Stun", "Mend"];
const ACTION_INTERVAL: Duration = Duration::from_millis(40);

struct Args {
    seed: u64,
    seconds: u64,
    config: HostConfig,
}

fn parse_args() -> Result<Args, Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let seed = args.next().map(|s| s.parse()).transpose()?.unwrap_or(0x4845_4152_5448);
    let seconds = args.next().map(|s| s.parse()).transpose()?.unwrap_or(10);
    let config = match args.next() {
        Some(path) => HostConfig::load(path)?,
        None => HostConfig::default(),
    };
    Ok(Args { seed, seconds, config })
}

/// Spawns the bots, grants every ability, then activates random abilities
/// until `shutdown` is set.
fn run_bots(sender: CommandSender<ArenaSimulation>, seed: u64, shutdown: Arc<AtomicBool>, sent: Arc<AtomicU64>) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut correlation: u128 = 0;
    let mut send = |command: ArenaCommand, sender_id: i64| {
        correlation += 1;
        if sender.send(CommandEnvelope::new(CorrelationId::from_u128(correlation), sender_id, command)) {
            sent.fetch_add(1, Ordering::Relaxed);
        }
    };

    for bot in 1..=BOTS {
        send(
            ArenaCommand::SpawnActor {
                name: format!("bot-{bot}"),
                health: rng.gen_range(80.0..120.0),
                attack_damage: rng.gen_range(6.0..14.0),
            },
            i64::from(bot),
        );
    }
    // Fresh arena: actor ids are 1..=BOTS and handles follow grant order.
    for bot in 1..=BOTS {
        for ability in GRANTS {
            send(
                ArenaCommand::GrantAbility {
                    actor: u64::from(bot),
                    ability: ability.to_string(),
                },
                i64::from(bot),
            );
        }
    }

    while !shutdown.load(Ordering::Relaxed) {
        let actor = rng.gen_range(1..=BOTS);
        let handle = rng.gen_range(1..=GRANTS.len() as u32);
        let mut target = rng.gen_range(1..=BOTS);
        if target == actor {
            target = target % BOTS + 1;
        }
        send(
            ArenaCommand::ActivateAbility {
                actor: u64::from(actor),
                handle,
                target: Some(u64::from(target)),
            },
            i64::from(actor),
        );
        thread::sleep(ACTION_INTERVAL);
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = parse_args()?;

    println!("╔══════════════════════════════════════════════════════════════════╗");
    println!("║         HEARTH ARENA - SEEDED BOT SERVER                         ║");
    println!("╚══════════════════════════════════════════════════════════════════╝");
    println!();
    println!("┌─ CONFIGURATION ─────────────────────────────────────────────────┐");
    println!("│ Seed:               {:#x}", args.seed);
    println!("│ Duration:           {} s", args.seconds);
    println!("│ Fixed Step:         {:.4} s", args.config.fixed_step);
    println!("│ Max Steps / Frame:  {}", args.config.max_steps_per_tick);
    println!("│ Snapshot Interval:  {} s", args.config.snapshot_interval);
    println!("└──────────────────────────────────────────────────────────────────┘");
    println!();

    let host = Host::new(ArenaSimulation::with_default_book()?, args.config);

    let rejected = Arc::new(AtomicU64::new(0));
    {
        let rejected = Arc::clone(&rejected);
        host.on_result(move |result| {
            if !result.header.success {
                rejected.fetch_add(1, Ordering::Relaxed);
            }
        });
    }
    let defeated = Arc::new(AtomicU64::new(0));
    {
        let defeated = Arc::clone(&defeated);
        host.on_event(move |event| match &event.event {
            ArenaEvent::ActorDefeated { actor } => {
                defeated.fetch_add(1, Ordering::Relaxed);
                info!(actor, tick = event.header.tick, "defeated");
            }
            ArenaEvent::CommandFailed { reason, .. } => warn!(%reason, "command failed"),
            _ => {}
        });
    }

    host.start_simulation()?;

    let shutdown = Arc::new(AtomicBool::new(false));
    let sent = Arc::new(AtomicU64::new(0));
    let producer = {
        let sender = host.command_sender();
        let shutdown = Arc::clone(&shutdown);
        let sent = Arc::clone(&sent);
        let seed = args.seed;
        thread::Builder::new()
            .name("arena-bots".into())
            .spawn(move || run_bots(sender, seed, shutdown, sent))?
    };

    let start = Instant::now();
    let deadline = Duration::from_secs(args.seconds);
    let mut next_report = Duration::from_secs(1);
    while start.elapsed() < deadline {
        host.flush_events();
        if start.elapsed() >= next_report {
            next_report += Duration::from_secs(1);
            if let Some(snapshot) = host.latest_snapshot() {
                let health: Vec<String> = snapshot
                    .actors
                    .iter()
                    .map(|a| {
                        format!(
                            "{}={:.0}",
                            a.owner.unwrap_or(0),
                            a.attribute(AttributeId::HEALTH).unwrap_or(0.0)
                        )
                    })
                    .collect();
                println!("[tick {:>6}] health {}", snapshot.header.tick, health.join(" "));
            }
        }
        thread::sleep(Duration::from_millis(10));
    }

    shutdown.store(true, Ordering::Relaxed);
    if producer.join().is_err() {
        warn!("bot thread panicked");
    }
    match host.stop_simulation() {
        StopOutcome::TimedOut => warn!("simulation thread did not stop in time"),
        StopOutcome::NotRunning => warn!("simulation thread had already exited"),
        StopOutcome::Stopped => {}
    }
    host.flush_events();

    if let Some(failure) = host.loop_failure() {
        warn!(%failure, "simulation loop failed");
    }

    let stats = host.stats();
    println!();
    println!("╔══════════════════════════════════════════════════════════════════╗");
    println!("║                    ARENA RESULTS                                 ║");
    println!("╚══════════════════════════════════════════════════════════════════╝");
    println!("│ Commands Sent:      {}", sent.load(Ordering::Relaxed));
    println!("│ Commands Processed: {}", stats.commands_processed);
    println!("│ Rejections:         {}", rejected.load(Ordering::Relaxed));
    println!("│ Command Failures:   {} ({:.2}%)", stats.command_failures, stats.command_failure_rate() * 100.0);
    println!("│ Defeats:            {}", defeated.load(Ordering::Relaxed));
    println!("│ Ticks:              {}", stats.ticks);
    println!("│ Step Time:          min {} us / avg {} us / max {} us", stats.min_step_us, stats.avg_step_us, stats.max_step_us);
    println!("│ Late Steps:         {}", stats.late_steps);
    println!("│ Capped Frames:      {}", stats.capped_frames);
    println!("│ Snapshots:          {} published, {} dropped", stats.snapshots_published, stats.snapshots_dropped);
    println!("│ Subscriber Panics:  {}", stats.subscriber_panics);

    host.dispose();
    Ok(())
}
