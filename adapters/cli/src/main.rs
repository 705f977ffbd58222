#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs a headless horde simulation.
//!
//! The driver scripts a target circling the origin on an open plain, routes
//! events from the world into the lane, wave, and formation systems, and
//! feeds the commands they produce back into the world on a fixed timestep.
//! Agents despawn after landing a fixed number of attacks so waves clear and
//! the director keeps escalating.

use std::collections::HashMap;
use std::time::Duration;

use clap::Parser;
use glam::Vec3;
use horde_core::{AgentId, Command, Event, HordeConfig, Navigation, Obstruction, planar};
use horde_system_flocking::Formation;
use horde_system_lanes::LaneAllocator;
use horde_system_waves::WaveDirector;
use horde_world::{apply, query, World};

/// Attacks an agent lands before the host removes it from the field.
const ATTACKS_PER_AGENT: u32 = 3;
/// Angular speed of the scripted target, in radians per simulated second.
const TARGET_ORBIT_SPEED: f32 = 0.05;
/// Radius of the scripted target's orbit around the origin.
const TARGET_ORBIT_RADIUS: f32 = 8.0;

#[derive(Debug, Parser)]
#[command(name = "horde", about = "Headless horde tactical simulation")]
struct Args {
    /// Number of fixed-step ticks to simulate.
    #[arg(long, default_value_t = 3_600)]
    ticks: u32,

    /// Simulated milliseconds per tick.
    #[arg(long, default_value_t = 100)]
    tick_ms: u64,

    /// Seed for every deterministic random stream.
    #[arg(long)]
    seed: Option<u64>,

    /// Fire a gunshot at the target every N ticks (0 disables gunshots).
    #[arg(long, default_value_t = 0)]
    gunshot_every: u32,

    /// Ticks between progress reports.
    #[arg(long, default_value_t = 100)]
    report_every: u32,
}

/// Featureless environment: everything is navigable and nothing blocks
/// line of sight.
struct OpenPlain;

impl Navigation for OpenPlain {
    fn sample_navigable_point(&self, near: Vec3, _radius: f32) -> Option<Vec3> {
        Some(planar(near))
    }

    fn compute_corridor(&self, from: Vec3, to: Vec3) -> Option<Vec<Vec3>> {
        Some(vec![planar(from), planar((from + to) * 0.5), planar(to)])
    }
}

impl Obstruction for OpenPlain {
    fn raycast_blocked(&self, _from: Vec3, _to: Vec3) -> bool {
        false
    }
}

/// Entry point for the horde simulation command-line interface.
fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut config = HordeConfig::default();
    if let Some(seed) = args.seed {
        config.rng_seed = seed;
    }
    config.validate()?;

    let mut world = World::new(config);
    let mut lanes = LaneAllocator::new(config.lanes, config.rng_seed.wrapping_add(1));
    let mut waves = WaveDirector::new(config.waves, config.rng_seed.wrapping_add(2));
    let mut formation = Formation::new(config.formation, config.rng_seed.wrapping_add(3));
    let environment = OpenPlain;

    let dt = Duration::from_millis(args.tick_ms);
    let mut events: Vec<Event> = Vec::new();
    let mut commands: Vec<Command> = Vec::new();
    let mut attack_counts: HashMap<AgentId, u32> = HashMap::new();
    let mut total_attacks = 0_u64;
    let mut total_spawned = 0_u64;

    for tick in 0..args.ticks {
        let time = tick as f32 * dt.as_secs_f32();
        let target = Vec3::new(
            (time * TARGET_ORBIT_SPEED).cos() * TARGET_ORBIT_RADIUS,
            (time * TARGET_ORBIT_SPEED).sin() * TARGET_ORBIT_RADIUS,
            0.0,
        );
        apply(&mut world, Command::SetTarget { position: target }, &mut events);
        apply(&mut world, Command::Tick { dt }, &mut events);

        if args.gunshot_every > 0 && tick % args.gunshot_every == 0 {
            apply(
                &mut world,
                Command::NotifyGunshot { position: target },
                &mut events,
            );
        }

        // Host-side combat resolution: retire agents that spent their attacks.
        let mut retired: Vec<AgentId> = Vec::new();
        for event in &events {
            match event {
                Event::AgentAttacked { agent } => {
                    total_attacks += 1;
                    let count = attack_counts.entry(*agent).or_insert(0);
                    *count += 1;
                    if *count >= ATTACKS_PER_AGENT {
                        retired.push(*agent);
                    }
                }
                Event::AgentSpawned { .. } => total_spawned += 1,
                Event::AgentDespawned { agent } => {
                    let _ = attack_counts.remove(agent);
                }
                _ => {}
            }
        }
        for agent in retired {
            apply(&mut world, Command::DespawnAgent { agent }, &mut events);
        }

        let agent_view = query::agent_view(&world);
        let lane_view = query::lane_view(&world);
        let target_position = query::target_position(&world);
        lanes.handle(&events, &lane_view, target_position, &environment, &mut commands);
        waves.handle(&events, target_position, &environment, &mut commands);
        formation.handle(
            &events,
            &agent_view,
            target_position,
            query::clock(&world),
            &environment,
            &mut commands,
        );

        // Events produced by system commands carry over into the next tick.
        events.clear();
        for command in commands.drain(..) {
            apply(&mut world, command, &mut events);
        }

        if args.report_every > 0 && tick % args.report_every == 0 {
            log::info!(
                "tick {tick}: {} agents, {} lanes, target at {target}",
                agent_view.len(),
                lane_view.len(),
            );
        }
    }

    println!(
        "simulated {:?}: {} agents spawned, {} attacks landed, {} still active",
        query::clock(&world),
        total_spawned,
        total_attacks,
        query::agent_view(&world).len(),
    );
    Ok(())
}
