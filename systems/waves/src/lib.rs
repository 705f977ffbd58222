#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Wave direction system that paces agent spawning.
//!
//! The opening wave fires as soon as a target exists. Afterwards the
//! director waits for the horde to clear, pauses for the inter-wave
//! interval, and spawns the next batch grown by the configured factor.
//! Spawn points scatter on a noisy ring around the target and are snapped
//! onto navigable ground before the spawn command is issued.

use std::time::Duration;

use glam::Vec3;
use horde_core::{Command, Event, Navigation, WaveTuning};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal, UnitCircle};

/// Pacing state of the wave cycle.
#[derive(Clone, Copy, Debug, PartialEq)]
enum Phase {
    /// No wave issued yet; waiting for a target to spawn around.
    AwaitingTarget,
    /// A wave is on the field.
    WaveActive,
    /// The previous wave cleared; counting down to the next one.
    Cooldown {
        /// Time elapsed since the horde cleared.
        elapsed: Duration,
    },
}

/// System that decides when and where the next wave spawns.
#[derive(Debug)]
pub struct WaveDirector {
    tuning: WaveTuning,
    rng: ChaCha8Rng,
    phase: Phase,
    next_count: u32,
}

impl WaveDirector {
    /// Creates a new director with the provided tuning and random seed.
    #[must_use]
    pub fn new(tuning: WaveTuning, seed: u64) -> Self {
        Self {
            next_count: tuning.initial_count,
            tuning,
            rng: ChaCha8Rng::seed_from_u64(seed),
            phase: Phase::AwaitingTarget,
        }
    }

    /// Consumes events to emit spawn commands for due waves.
    pub fn handle(
        &mut self,
        events: &[Event],
        target: Option<Vec3>,
        navigation: &dyn Navigation,
        out: &mut Vec<Command>,
    ) {
        for event in events {
            match event {
                Event::TimeAdvanced { dt } => {
                    if let Phase::Cooldown { elapsed } = &mut self.phase {
                        *elapsed = elapsed.saturating_add(*dt);
                    }
                }
                Event::HordeCleared => {
                    if self.phase == Phase::WaveActive {
                        self.phase = Phase::Cooldown {
                            elapsed: Duration::ZERO,
                        };
                    }
                }
                _ => {}
            }
        }

        let due = match self.phase {
            Phase::AwaitingTarget => true,
            Phase::Cooldown { elapsed } => elapsed >= self.tuning.time_between_waves,
            Phase::WaveActive => false,
        };
        if !due {
            return;
        }

        let Some(center) = target else {
            log::debug!("wave deferred: no target to spawn around");
            return;
        };

        let count = self.next_count.max(1);
        for _ in 0..count {
            let position = self.sample_spawn_point(center, navigation);
            out.push(Command::SpawnAgent { position });
        }
        log::info!("wave of {count} agents issued");

        self.phase = Phase::WaveActive;
        self.next_count = grow(count, self.tuning.growth_factor);
    }

    /// Picks a navigable spawn point on the scatter ring around `center`.
    ///
    /// Navigation failures degrade rather than abort: jittered samples are
    /// tried first, then the un-jittered ring point, and as a last resort
    /// the raw ring point is used unvalidated.
    fn sample_spawn_point(&mut self, center: Vec3, navigation: &dyn Navigation) -> Vec3 {
        let [dx, dy]: [f32; 2] = UnitCircle.sample(&mut self.rng);
        let distance = match Normal::new(self.tuning.spawn_radius, self.tuning.spawn_jitter) {
            Ok(scatter) => scatter.sample(&mut self.rng).max(0.0),
            Err(_) => self.tuning.spawn_radius,
        };
        let raw = center + Vec3::new(dx, dy, 0.0) * distance;

        for _ in 0..self.tuning.nav_sample_max_attempts {
            let jittered = raw
                + Vec3::new(
                    self.rng.gen_range(-self.tuning.spawn_jitter..=self.tuning.spawn_jitter),
                    self.rng.gen_range(-self.tuning.spawn_jitter..=self.tuning.spawn_jitter),
                    0.0,
                );
            if let Some(point) =
                navigation.sample_navigable_point(jittered, self.tuning.nav_sample_radius)
            {
                return point;
            }
        }
        if let Some(point) = navigation.sample_navigable_point(raw, self.tuning.nav_sample_radius)
        {
            return point;
        }

        log::warn!("no navigable spawn point near {raw}, spawning on the raw ring point");
        raw
    }
}

/// Next wave size after applying the growth factor, never below one.
fn grow(count: u32, factor: f32) -> u32 {
    ((count as f32 * factor).ceil() as u32).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn growth_rounds_up_and_never_collapses_to_zero() {
        assert_eq!(grow(8, 1.5), 12);
        assert_eq!(grow(3, 1.5), 5);
        assert_eq!(grow(1, 0.1), 1);
    }
}
