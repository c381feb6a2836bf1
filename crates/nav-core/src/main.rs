//! Swarm Navigation Demo
//!
//! Seeds a world of foraging agents, runs the navigation schedule for a
//! number of ticks, logs every broadcast to JSONL and writes periodic
//! navigation snapshots.

use clap::Parser;
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use swarm_nav::config::{NavConfig, DEFAULT_TUNING_PATH};
use swarm_nav::events::EventLogger;
use swarm_nav::setup::{create_world, get_spawn_summary};
use swarm_nav::systems::build_schedule;
use swarm_nav::telemetry::{nav_snapshot, write_snapshot, write_snapshot_to_dir, NavStats, SnapshotGenerator};
use swarm_nav::SimClock;

/// Command line arguments for the demo
#[derive(Parser, Debug)]
#[command(name = "swarm_nav")]
#[command(about = "Multi-agent navigation with flow fields, social gradients and trust")]
struct Args {
    /// Random seed for reproducibility
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Number of ticks to simulate (defaults to simulation.default_ticks)
    #[arg(long)]
    ticks: Option<u64>,

    /// Number of agents (defaults to simulation.agents)
    #[arg(long)]
    agents: Option<usize>,

    /// Tuning file
    #[arg(long, default_value = DEFAULT_TUNING_PATH)]
    config: PathBuf,

    /// Directory for the event log, snapshots and stats
    #[arg(long, default_value = "output")]
    output_dir: PathBuf,

    /// Interval between snapshots in ticks (defaults to simulation.snapshot_interval)
    #[arg(long)]
    snapshot_interval: Option<u64>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("swarm_nav=info")))
        .init();

    let args = Args::parse();
    let config = NavConfig::load_or_default(&args.config);
    let ticks = args.ticks.unwrap_or(config.simulation.default_ticks);
    let snapshot_interval = args.snapshot_interval.unwrap_or(config.simulation.snapshot_interval);

    println!("Swarm Navigation");
    println!("================");
    println!("Seed: {}", args.seed);
    println!("Ticks: {}", ticks);
    println!("Snapshot interval: {}", snapshot_interval);
    println!();

    let snapshot_dir = args.output_dir.join("snapshots");
    if let Err(e) = fs::create_dir_all(&snapshot_dir) {
        eprintln!("Warning: Could not create output directories: {}", e);
    }

    let mut world = create_world(&config, args.seed, args.agents);
    let summary = get_spawn_summary(&mut world);
    println!(
        "Spawned {} agents ({} dishonest)",
        summary.total_agents, summary.dishonest_agents
    );

    let log_path = args.output_dir.join("events.jsonl");
    match EventLogger::new(&log_path) {
        Ok(logger) => {
            world.insert_resource(logger);
            println!("Logging events to {}", log_path.display());
        }
        Err(e) => eprintln!("Warning: Could not open {}: {}. Events will not be logged.", log_path.display(), e),
    }
    world.insert_resource(SnapshotGenerator::new(snapshot_interval));

    let mut schedule = build_schedule();

    println!();
    println!("Starting simulation...");
    for _ in 0..ticks {
        let tick = world.resource::<SimClock>().tick;
        if world.resource::<SnapshotGenerator>().should_snapshot(tick) {
            let snapshot = nav_snapshot(&mut world);
            if let Err(e) = write_snapshot_to_dir(&snapshot, &snapshot_dir) {
                eprintln!("Warning: Could not write snapshot at tick {}: {}", tick, e);
            }
        }

        schedule.run(&mut world);

        if tick > 0 && tick % 100 == 0 {
            let stats = world.resource::<NavStats>();
            println!(
                "Tick {} / {}: {} discoveries, {} verifications ({:.0}% confirmed), {} stuck episodes",
                tick,
                ticks,
                stats.discoveries,
                stats.verifications(),
                stats.confirmation_rate() * 100.0,
                stats.stuck_episodes
            );
        }
    }

    let final_snapshot = nav_snapshot(&mut world);
    if let Err(e) = write_snapshot_to_dir(&final_snapshot, &snapshot_dir) {
        eprintln!("Warning: Could not write final snapshot: {}", e);
    }
    if let Err(e) = write_snapshot(&final_snapshot, args.output_dir.join("current_state.json")) {
        eprintln!("Warning: Could not write current state: {}", e);
    }

    let mut logger = world.resource_mut::<EventLogger>();
    if let Err(e) = logger.flush() {
        eprintln!("Warning: Could not flush event log: {}", e);
    }
    let events_logged = logger.event_count();

    let stats = world.resource::<NavStats>();
    if let Err(e) = stats.write(args.output_dir.join("stats.json")) {
        eprintln!("Warning: Could not write stats: {}", e);
    }

    println!();
    println!("Simulation complete. Ran {} ticks.", ticks);
    println!("Logged {} events.", events_logged);
    println!(
        "Verifications: {} ({} confirmed, {} failed); {} rumors spread; {} goals abandoned.",
        stats.verifications(),
        stats.confirmations,
        stats.verifications() - stats.confirmations,
        stats.rumors,
        stats.goals_abandoned
    );
    println!(
        "Generated {} snapshots.",
        world.resource::<SnapshotGenerator>().snapshot_count()
    );
}
