use std::cell::RefCell;
use std::time::Duration;

use glam::Vec3;
use horde_core::{AgentId, Command, Event, Navigation, WaveTuning};
use horde_system_waves::WaveDirector;

/// Navigation stub where every point is already navigable.
struct OpenField;

impl Navigation for OpenField {
    fn sample_navigable_point(&self, near: Vec3, _radius: f32) -> Option<Vec3> {
        Some(near)
    }

    fn compute_corridor(&self, from: Vec3, to: Vec3) -> Option<Vec<Vec3>> {
        Some(vec![from, to])
    }
}

/// Navigation stub that never finds navigable ground.
struct Wasteland;

impl Navigation for Wasteland {
    fn sample_navigable_point(&self, _near: Vec3, _radius: f32) -> Option<Vec3> {
        None
    }

    fn compute_corridor(&self, _from: Vec3, _to: Vec3) -> Option<Vec<Vec3>> {
        None
    }
}

/// Navigation stub that rejects everything while recording each sampled
/// point.
#[derive(Default)]
struct RecordingWasteland {
    samples: RefCell<Vec<Vec3>>,
}

impl Navigation for RecordingWasteland {
    fn sample_navigable_point(&self, near: Vec3, _radius: f32) -> Option<Vec3> {
        self.samples.borrow_mut().push(near);
        None
    }

    fn compute_corridor(&self, _from: Vec3, _to: Vec3) -> Option<Vec<Vec3>> {
        None
    }
}

fn spawns(commands: &[Command]) -> Vec<Vec3> {
    commands
        .iter()
        .filter_map(|command| match command {
            Command::SpawnAgent { position } => Some(*position),
            _ => None,
        })
        .collect()
}

fn cleared_wave(director: &mut WaveDirector, target: Vec3, count: usize) {
    // Mark the active wave as fully despawned.
    let mut events: Vec<Event> = (0..count)
        .map(|index| Event::AgentDespawned {
            agent: AgentId::new(index as u32),
        })
        .collect();
    events.push(Event::HordeCleared);
    let mut commands = Vec::new();
    director.handle(&events, Some(target), &OpenField, &mut commands);
    assert!(commands.is_empty(), "spawned during the cooldown");
}

#[test]
fn initial_wave_waits_for_a_target() {
    let tuning = WaveTuning::default();
    let mut director = WaveDirector::new(tuning, 1);
    let mut commands = Vec::new();

    director.handle(&[], None, &OpenField, &mut commands);
    assert!(commands.is_empty());

    director.handle(&[], Some(Vec3::ZERO), &OpenField, &mut commands);
    assert_eq!(spawns(&commands).len(), tuning.initial_count as usize);
}

#[test]
fn an_active_wave_suppresses_further_spawning() {
    let tuning = WaveTuning::default();
    let mut director = WaveDirector::new(tuning, 2);
    let mut commands = Vec::new();
    director.handle(&[], Some(Vec3::ZERO), &OpenField, &mut commands);
    commands.clear();

    director.handle(
        &[Event::TimeAdvanced {
            dt: Duration::from_secs(60),
        }],
        Some(Vec3::ZERO),
        &OpenField,
        &mut commands,
    );
    assert!(commands.is_empty());
}

#[test]
fn cleared_waves_grow_after_the_inter_wave_pause() {
    let tuning = WaveTuning::default();
    let mut director = WaveDirector::new(tuning, 3);
    let mut commands = Vec::new();
    director.handle(&[], Some(Vec3::ZERO), &OpenField, &mut commands);
    let first = spawns(&commands).len();
    commands.clear();

    cleared_wave(&mut director, Vec3::ZERO, first);

    // Halfway through the pause nothing happens.
    director.handle(
        &[Event::TimeAdvanced {
            dt: tuning.time_between_waves / 2,
        }],
        Some(Vec3::ZERO),
        &OpenField,
        &mut commands,
    );
    assert!(commands.is_empty());

    director.handle(
        &[Event::TimeAdvanced {
            dt: tuning.time_between_waves,
        }],
        Some(Vec3::ZERO),
        &OpenField,
        &mut commands,
    );
    let expected = (first as f32 * tuning.growth_factor).ceil() as usize;
    assert_eq!(spawns(&commands).len(), expected);
}

#[test]
fn navigation_failure_degrades_to_raw_ring_points() {
    let tuning = WaveTuning::default();
    let mut director = WaveDirector::new(tuning, 4);
    let mut commands = Vec::new();

    director.handle(&[], Some(Vec3::ZERO), &Wasteland, &mut commands);
    assert_eq!(spawns(&commands).len(), tuning.initial_count as usize);
}

#[test]
fn spawn_sampling_tries_jittered_points_before_the_plain_ring_point() {
    let tuning = WaveTuning {
        initial_count: 1,
        nav_sample_max_attempts: 4,
        ..WaveTuning::default()
    };
    let mut director = WaveDirector::new(tuning, 6);
    let navigation = RecordingWasteland::default();
    let mut commands = Vec::new();

    director.handle(&[], Some(Vec3::ZERO), &navigation, &mut commands);

    let spawned = spawns(&commands);
    assert_eq!(spawned.len(), 1);

    let samples = navigation.samples.borrow();
    assert_eq!(
        samples.len(),
        tuning.nav_sample_max_attempts as usize + 1,
        "expected every jittered attempt plus the plain ring point"
    );
    // The plain ring point comes last and is the final unvalidated fallback.
    assert_eq!(*samples.last().expect("samples recorded"), spawned[0]);
    assert!(
        samples[..samples.len() - 1]
            .iter()
            .any(|sample| *sample != spawned[0]),
        "jittered attempts should differ from the plain ring point"
    );
}

#[test]
fn spawn_points_scatter_around_the_configured_radius() {
    let tuning = WaveTuning {
        initial_count: 200,
        spawn_radius: 30.0,
        spawn_jitter: 1.0,
        ..WaveTuning::default()
    };
    let center = Vec3::new(50.0, -20.0, 0.0);
    let mut director = WaveDirector::new(tuning, 5);
    let mut commands = Vec::new();

    director.handle(&[], Some(center), &OpenField, &mut commands);
    for position in spawns(&commands) {
        let distance = position.distance(center);
        assert!(
            (20.0..=40.0).contains(&distance),
            "spawn at distance {distance} from the target"
        );
        assert_eq!(position.z, 0.0);
    }
}
