#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Lane allocation system that carves approach corridors around the target.
//!
//! Lanes start on a sampling ring around the target and follow a navigation
//! corridor inward, trimmed so they never route agents through the surround
//! formation itself. The full lane set is rebuilt on a fixed interval and,
//! defensively, whenever no lanes are installed yet. Rebuilding discards all
//! previous lane identity.

use std::f32::consts::TAU;
use std::time::Duration;

use glam::Vec3;
use horde_core::{Command, Event, Lane, LaneId, LaneTuning, LaneView, Navigation};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// System that rebuilds the lane set and emits [`Command::InstallLanes`].
#[derive(Debug)]
pub struct LaneAllocator {
    tuning: LaneTuning,
    rng: ChaCha8Rng,
    accumulator: Duration,
}

impl LaneAllocator {
    /// Creates a new allocator with the provided tuning and random seed.
    #[must_use]
    pub fn new(tuning: LaneTuning, seed: u64) -> Self {
        Self {
            tuning,
            rng: ChaCha8Rng::seed_from_u64(seed),
            accumulator: Duration::ZERO,
        }
    }

    /// Consumes events and immutable views to emit lane rebuild commands.
    ///
    /// A rebuild fires when the recalc interval elapsed or when the lane set
    /// is empty. Without a target there is nothing to sample around, so the
    /// rebuild is skipped and retried once a target appears.
    pub fn handle(
        &mut self,
        events: &[Event],
        lanes: &LaneView,
        target: Option<Vec3>,
        navigation: &dyn Navigation,
        out: &mut Vec<Command>,
    ) {
        for event in events {
            if let Event::TimeAdvanced { dt } = event {
                self.accumulator = self.accumulator.saturating_add(*dt);
            }
        }

        let due = self.accumulator >= self.tuning.recalc_interval || lanes.is_empty();
        if !due {
            return;
        }

        let Some(center) = target else {
            log::debug!("lane rebuild skipped: no target");
            return;
        };

        self.accumulator = Duration::ZERO;
        let lanes = self.build_lanes(center, navigation);
        out.push(Command::InstallLanes { lanes });
    }

    /// Builds a fresh lane set around `center`.
    ///
    /// Directions that the navigation collaborator cannot service are
    /// skipped rather than failing the rebuild; an empty result is a valid
    /// outcome under total collaborator failure.
    fn build_lanes(&mut self, center: Vec3, navigation: &dyn Navigation) -> Vec<Lane> {
        let directions = self.tuning.sample_directions;
        if directions == 0 {
            return Vec::new();
        }

        let step = TAU / directions as f32;
        let jitter = step * 0.25;
        let mut accepted_angles: Vec<f32> = Vec::new();
        let mut lanes = Vec::new();

        for index in 0..directions {
            if lanes.len() >= self.tuning.max_lane_count {
                break;
            }

            let angle = index as f32 * step + self.rng.gen_range(-jitter..=jitter);
            if accepted_angles
                .iter()
                .any(|accepted| angular_distance(*accepted, angle) < self.tuning.min_separation_angle)
            {
                continue;
            }

            let ring_point = center
                + Vec3::new(angle.cos(), angle.sin(), 0.0) * self.tuning.start_radius;
            let Some(entry) =
                navigation.sample_navigable_point(ring_point, self.tuning.nav_sample_radius)
            else {
                log::debug!("lane direction {index} skipped: no navigable ring point");
                continue;
            };

            let Some(corridor) = navigation.compute_corridor(entry, center) else {
                log::debug!("lane direction {index} skipped: no corridor");
                continue;
            };
            if corridor.len() < 2 {
                log::debug!("lane direction {index} skipped: degenerate corridor");
                continue;
            }

            let waypoints = trim_corridor(&corridor, center, &self.tuning);
            let capacity = self
                .rng
                .gen_range(self.tuning.capacity.min()..=self.tuning.capacity.max());
            accepted_angles.push(angle);
            lanes.push(Lane::new(waypoints, capacity));
        }

        lanes
    }
}

/// Keeps the corridor's start plus up to `max_corners_used` later corners,
/// stopping at the first corner inside the surround radius and dropping
/// corners closer than `corner_proximity` to the previously kept point.
fn trim_corridor(corridor: &[Vec3], center: Vec3, tuning: &LaneTuning) -> Vec<Vec3> {
    let mut waypoints = Vec::with_capacity(tuning.max_corners_used + 1);
    let Some(start) = corridor.first() else {
        return waypoints;
    };
    waypoints.push(*start);

    let mut kept = 0;
    for corner in &corridor[1..] {
        if kept >= tuning.max_corners_used {
            break;
        }
        if corner.distance(center) < tuning.surround_radius {
            break;
        }
        let last = waypoints[waypoints.len() - 1];
        if corner.distance(last) < tuning.corner_proximity {
            continue;
        }
        waypoints.push(*corner);
        kept += 1;
    }

    waypoints
}

/// Shortest angular distance between two angles, in radians.
fn angular_distance(a: f32, b: f32) -> f32 {
    let delta = (a - b).rem_euclid(TAU);
    delta.min(TAU - delta)
}

/// Occupancy snapshot for one lane used when choosing an assignment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LaneLoad {
    /// Number of agents currently assigned to the lane.
    pub occupancy: u32,
    /// Concurrency cap fixed when the lane was built.
    pub capacity: u32,
}

/// Chooses a lane for a newly assigned agent.
///
/// Prefers a uniformly random lane with occupancy below capacity; when every
/// lane is full it falls back to a uniformly random lane so assignment never
/// blocks. Returns `None` only when no lanes are installed.
pub fn choose_lane<R: Rng>(loads: &[LaneLoad], rng: &mut R) -> Option<LaneId> {
    if loads.is_empty() {
        return None;
    }

    let free: Vec<usize> = loads
        .iter()
        .enumerate()
        .filter(|(_, load)| load.occupancy < load.capacity)
        .map(|(index, _)| index)
        .collect();

    let index = if free.is_empty() {
        log::debug!("all lanes at capacity, falling back to random assignment");
        rng.gen_range(0..loads.len())
    } else {
        free[rng.gen_range(0..free.len())]
    };

    Some(LaneId::new(index as u32))
}
