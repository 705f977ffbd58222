#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Formation engine that computes one tactical target per agent.
//!
//! Every tactical tick the engine rebuilds its spatial grid, derives a
//! single breathing surround radius shared by all agents, places each agent
//! on an angular slot around the target, and perturbs that slot with local
//! alignment, cohesion, and separation forces sampled from the grid's 3×3
//! neighborhood. A line-of-sight test drives the aggression state. Agents
//! beyond the LOD distance keep their previous target untouched.

use std::f32::consts::TAU;
use std::time::Duration;

use glam::Vec3;
use horde_core::{
    AgentSnapshot, AgentView, AggressionState, Command, Event, FormationTuning, Obstruction,
    planar,
};
use horde_system_spatial::SpatialGrid;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// System that owns the tactical update cycle.
#[derive(Debug)]
pub struct Formation {
    tuning: FormationTuning,
    rng: ChaCha8Rng,
    grid: SpatialGrid,
    accumulator: Duration,
}

impl Formation {
    /// Creates a new formation engine with the provided tuning and seed.
    #[must_use]
    pub fn new(tuning: FormationTuning, seed: u64) -> Self {
        Self {
            grid: SpatialGrid::new(tuning.cell_size),
            tuning,
            rng: ChaCha8Rng::seed_from_u64(seed),
            accumulator: Duration::ZERO,
        }
    }

    /// Consumes events and the agent view to emit tactical target pushes.
    ///
    /// The pass fires at most once per call, after `update_rate` worth of
    /// `TimeAdvanced` events accumulated. The grid rebuild always precedes
    /// target computation within the same pass.
    pub fn handle(
        &mut self,
        events: &[Event],
        agents: &AgentView,
        target: Option<Vec3>,
        clock: Duration,
        obstruction: &dyn Obstruction,
        out: &mut Vec<Command>,
    ) {
        for event in events {
            if let Event::TimeAdvanced { dt } = event {
                self.accumulator = self.accumulator.saturating_add(*dt);
            }
        }

        if self.accumulator < self.tuning.update_rate {
            return;
        }
        while self.accumulator >= self.tuning.update_rate {
            self.accumulator -= self.tuning.update_rate;
        }

        let Some(center) = target else {
            log::debug!("tactical tick skipped: no target");
            return;
        };

        if agents.is_empty() {
            return;
        }

        self.grid.rebuild(agents);

        let time = clock.as_secs_f32();
        let breathing = 1.0 + (time * self.tuning.breathe_speed).sin() * self.tuning.breathe_amplitude;
        let radius = self.tuning.surround_radius * breathing
            + (value_noise(time * 0.2) - 0.5) * self.tuning.noise_scale;

        let slot_step = TAU / agents.len() as f32;
        for (index, snapshot) in agents.iter().enumerate() {
            if snapshot.position.distance(center) > self.tuning.lod_distance {
                continue;
            }

            let angle = index as f32 * slot_step + snapshot.angle_noise;
            let jitter = self.tuning.positional_jitter;
            let base = center
                + Vec3::new(angle.cos(), angle.sin(), 0.0) * radius
                + Vec3::new(
                    self.rng.gen_range(-jitter..=jitter),
                    self.rng.gen_range(-jitter..=jitter),
                    0.0,
                );

            let offset = flock_offset(&self.grid, snapshot, &self.tuning);
            out.push(Command::SetTacticalTarget {
                agent: snapshot.id,
                point: planar(base + offset),
            });

            let state = if obstruction.raycast_blocked(snapshot.position, center) {
                AggressionState::Alert
            } else {
                AggressionState::Frenzy
            };
            if state != snapshot.aggression {
                out.push(Command::SetAggression {
                    agent: snapshot.id,
                    state,
                });
            }
        }
    }
}

/// Weighted sum of the local alignment, cohesion, and separation forces
/// sampled from the 3×3 neighborhood around the agent's own cell.
fn flock_offset(grid: &SpatialGrid, snapshot: &AgentSnapshot, tuning: &FormationTuning) -> Vec3 {
    let mut velocity_sum = Vec3::ZERO;
    let mut position_sum = Vec3::ZERO;
    let mut separation = Vec3::ZERO;
    let mut neighbor_count = 0u32;

    for entry in grid.neighborhood(snapshot.position) {
        if entry.agent == snapshot.id {
            continue;
        }
        neighbor_count += 1;
        velocity_sum += entry.velocity;
        position_sum += entry.position;

        let away = snapshot.position - entry.position;
        let distance = away.length();
        if distance > 0.0 && distance < tuning.separation_radius {
            separation += (away / distance) * (1.0 - distance / tuning.separation_radius);
        }
    }

    if neighbor_count == 0 {
        return Vec3::ZERO;
    }

    let inverse = 1.0 / neighbor_count as f32;
    let alignment = velocity_sum * inverse;
    let cohesion = position_sum * inverse - snapshot.position;

    alignment * tuning.align_weight
        + cohesion * tuning.cohesion_weight
        + separation * tuning.separation_weight
}

/// Smooth one-dimensional value noise in `[0, 1)`.
fn value_noise(t: f32) -> f32 {
    let cell = t.floor();
    let frac = t - cell;
    let a = lattice(cell as i64);
    let b = lattice(cell as i64 + 1);
    let smooth = frac * frac * (3.0 - 2.0 * frac);
    a + (b - a) * smooth
}

fn lattice(cell: i64) -> f32 {
    let mut z = (cell as u64).wrapping_add(0x9e37_79b9_7f4a_7c15);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^= z >> 31;
    (z >> 11) as f32 / (1u64 << 53) as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use horde_core::AgentId;

    fn snapshot(id: u32, position: Vec3, velocity: Vec3) -> AgentSnapshot {
        AgentSnapshot {
            id: AgentId::new(id),
            position,
            velocity,
            speed: 2.0,
            speed_multiplier: 1.0,
            aggression: AggressionState::Alert,
            lane: None,
            tactical_target: None,
            angle_noise: 0.0,
        }
    }

    #[test]
    fn flock_offset_is_zero_without_neighbors() {
        let tuning = FormationTuning::default();
        let lone = snapshot(0, Vec3::new(1.0, 1.0, 0.0), Vec3::ZERO);
        let mut grid = SpatialGrid::new(tuning.cell_size);
        grid.rebuild(&AgentView::from_snapshots(vec![lone.clone()]));

        assert_eq!(flock_offset(&grid, &lone, &tuning), Vec3::ZERO);
    }

    #[test]
    fn separation_pushes_directly_away_from_a_close_neighbor() {
        let tuning = FormationTuning {
            align_weight: 0.0,
            cohesion_weight: 0.0,
            separation_weight: 1.0,
            separation_radius: 2.5,
            ..FormationTuning::default()
        };
        let me = snapshot(0, Vec3::ZERO, Vec3::ZERO);
        let other = snapshot(1, Vec3::new(1.0, 0.0, 0.0), Vec3::ZERO);
        let mut grid = SpatialGrid::new(tuning.cell_size);
        grid.rebuild(&AgentView::from_snapshots(vec![me.clone(), other]));

        let offset = flock_offset(&grid, &me, &tuning);
        assert!(offset.x < 0.0, "separation should point away, got {offset}");
        assert_eq!(offset.y, 0.0);
    }

    #[test]
    fn alignment_averages_neighbor_velocities() {
        let tuning = FormationTuning {
            align_weight: 1.0,
            cohesion_weight: 0.0,
            separation_weight: 0.0,
            ..FormationTuning::default()
        };
        let me = snapshot(0, Vec3::ZERO, Vec3::ZERO);
        let a = snapshot(1, Vec3::new(3.0, 0.0, 0.0), Vec3::new(2.0, 0.0, 0.0));
        let b = snapshot(2, Vec3::new(0.0, 3.0, 0.0), Vec3::new(0.0, 4.0, 0.0));
        let mut grid = SpatialGrid::new(tuning.cell_size);
        grid.rebuild(&AgentView::from_snapshots(vec![me.clone(), a, b]));

        let offset = flock_offset(&grid, &me, &tuning);
        assert!((offset - Vec3::new(1.0, 2.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn value_noise_stays_in_unit_range_and_is_smoothly_continuous() {
        let mut previous = value_noise(0.0);
        let mut t = 0.0_f32;
        while t < 10.0 {
            let sample = value_noise(t);
            assert!((0.0..1.0).contains(&sample));
            assert!((sample - previous).abs() < 0.5, "discontinuity at {t}");
            previous = sample;
            t += 0.01;
        }
    }
}
