#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the horde tactical-AI simulation.
//!
//! This crate defines the message surface that connects the host adapter,
//! the authoritative world, and pure systems. Adapters submit [`Command`]
//! values describing desired mutations, the world executes those commands
//! via its `apply` entry point, and then broadcasts [`Event`] values for
//! systems to react to. Systems consume event streams, query immutable
//! snapshots, and respond exclusively with new command batches.
//!
//! Positions live on the x/y plane embedded in three dimensions; the z axis
//! is kept degenerate (always zero) so collaborator interfaces that think in
//! 3-D space remain directly usable.

use std::time::Duration;

use glam::Vec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unique identifier assigned to a pursuing agent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentId(u32);

impl AgentId {
    /// Creates a new agent identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Index of a lane within the currently installed lane set.
///
/// Lane identity does not survive a rebuild: installing a new lane set
/// discards all previous lanes and restarts indices from zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LaneId(u32);

impl LaneId {
    /// Creates a new lane identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Perception-driven aggression state of an agent.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum AggressionState {
    /// Default pursuit behavior while the target is obstructed.
    #[default]
    Alert,
    /// Heightened pursuit triggered by clear line of sight to the target.
    Frenzy,
}

/// Projects a point onto the simulation plane by zeroing the degenerate axis.
#[must_use]
pub fn planar(point: Vec3) -> Vec3 {
    Vec3::new(point.x, point.y, 0.0)
}

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Advances the simulation clock by the provided delta time.
    Tick {
        /// Duration of simulated time that elapsed since the previous tick.
        dt: Duration,
    },
    /// Publishes the current position of the pursued target.
    SetTarget {
        /// World-space position of the target.
        position: Vec3,
    },
    /// Declares the pursued target absent until the next `SetTarget`.
    ClearTarget,
    /// Creates a new agent at the provided resolved spawn position.
    SpawnAgent {
        /// World-space position the agent materializes at.
        position: Vec3,
    },
    /// Removes an agent from every population collection.
    DespawnAgent {
        /// Identifier of the agent leaving the simulation.
        agent: AgentId,
    },
    /// Reports a gunshot so nearby agents receive a temporary speed surge.
    NotifyGunshot {
        /// World-space position the shot originated from.
        position: Vec3,
    },
    /// Replaces the installed lane set wholesale.
    InstallLanes {
        /// Freshly built approach lanes, indexed by [`LaneId`] in order.
        lanes: Vec<Lane>,
    },
    /// Stores the destination an agent should steer toward.
    SetTacticalTarget {
        /// Identifier of the agent receiving the destination.
        agent: AgentId,
        /// World-space destination point.
        point: Vec3,
    },
    /// Updates an agent's aggression state. Repeated identical calls are no-ops.
    SetAggression {
        /// Identifier of the agent changing state.
        agent: AgentId,
        /// State the agent should adopt.
        state: AggressionState,
    },
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Duration of simulated time that elapsed in the tick.
        dt: Duration,
    },
    /// Announces the target's newly published position.
    TargetMoved {
        /// World-space position of the target.
        position: Vec3,
    },
    /// Announces that the target became absent.
    TargetLost,
    /// Confirms that an agent was created and registered.
    AgentSpawned {
        /// Identifier assigned to the agent.
        agent: AgentId,
        /// Position the agent spawned at.
        position: Vec3,
        /// Lane the agent was assigned, if any lanes were installed.
        lane: Option<LaneId>,
    },
    /// Confirms that an agent was removed from the population.
    AgentDespawned {
        /// Identifier of the removed agent.
        agent: AgentId,
    },
    /// Reports that an agent in attack range completed an attack wind-up.
    AgentAttacked {
        /// Identifier of the attacking agent.
        agent: AgentId,
    },
    /// Reports that a gunshot surge was applied to an agent.
    AgentSurged {
        /// Identifier of the boosted agent.
        agent: AgentId,
    },
    /// Confirms that a new lane set replaced the previous one.
    LanesInstalled {
        /// Number of lanes in the installed set.
        count: usize,
    },
    /// Announces that the last active agent left the simulation.
    HordeCleared,
}

/// Precomputed approach corridor from a ring around the target inward.
#[derive(Clone, Debug, PartialEq)]
pub struct Lane {
    waypoints: Vec<Vec3>,
    capacity: u32,
}

impl Lane {
    /// Creates a lane from its ordered waypoints and concurrency cap.
    #[must_use]
    pub fn new(waypoints: Vec<Vec3>, capacity: u32) -> Self {
        Self {
            waypoints,
            capacity,
        }
    }

    /// Ordered waypoints from the ring-entry point toward the target.
    #[must_use]
    pub fn waypoints(&self) -> &[Vec3] {
        &self.waypoints
    }

    /// Maximum number of agents meant to occupy the lane concurrently.
    #[must_use]
    pub const fn capacity(&self) -> u32 {
        self.capacity
    }
}

/// Immutable representation of a single agent's state used for queries.
#[derive(Clone, Debug, PartialEq)]
pub struct AgentSnapshot {
    /// Unique identifier assigned to the agent.
    pub id: AgentId,
    /// World-space position of the agent.
    pub position: Vec3,
    /// World-space velocity of the agent.
    pub velocity: Vec3,
    /// Base movement speed drawn at spawn.
    pub speed: f32,
    /// Transient speed multiplier currently in effect (1.0 when none).
    pub speed_multiplier: f32,
    /// Perception-driven aggression state.
    pub aggression: AggressionState,
    /// Lane the agent is currently assigned to, if any.
    pub lane: Option<LaneId>,
    /// Last tactical destination pushed by the formation engine.
    pub tactical_target: Option<Vec3>,
    /// Persistent angular jitter applied to the agent's formation slot.
    pub angle_noise: f32,
}

/// Read-only snapshot describing all active agents.
#[derive(Clone, Debug, Default)]
pub struct AgentView {
    snapshots: Vec<AgentSnapshot>,
}

impl AgentView {
    /// Creates a new agent view from the provided snapshots.
    ///
    /// Snapshots are ordered by identifier; identifiers are allocated
    /// monotonically, so this matches spawn order for live agents.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<AgentSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured agent snapshots in deterministic order.
    pub fn iter(&self) -> impl Iterator<Item = &AgentSnapshot> {
        self.snapshots.iter()
    }

    /// Number of active agents captured by the view.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Reports whether the view captured no agents.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<AgentSnapshot> {
        self.snapshots
    }
}

/// Immutable representation of a single installed lane.
#[derive(Clone, Debug, PartialEq)]
pub struct LaneSnapshot {
    /// Index of the lane within the installed set.
    pub id: LaneId,
    /// Ordered waypoints from the ring-entry point toward the target.
    pub waypoints: Vec<Vec3>,
    /// Maximum number of agents meant to occupy the lane concurrently.
    pub capacity: u32,
    /// Number of agents currently assigned to the lane.
    pub occupancy: u32,
}

/// Read-only snapshot describing the installed lane set.
#[derive(Clone, Debug, Default)]
pub struct LaneView {
    snapshots: Vec<LaneSnapshot>,
}

impl LaneView {
    /// Creates a new lane view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<LaneSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured lane snapshots in deterministic order.
    pub fn iter(&self) -> impl Iterator<Item = &LaneSnapshot> {
        self.snapshots.iter()
    }

    /// Number of installed lanes captured by the view.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Reports whether no lanes are currently installed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<LaneSnapshot> {
        self.snapshots
    }
}

/// Navigation collaborator consumed by spawning and lane construction.
///
/// Implementations must never panic on unreachable queries; absence of a
/// result is expressed through `None` and callers degrade to best-effort
/// fallbacks.
pub trait Navigation {
    /// Finds a navigable point near the provided location, if one exists
    /// within `radius`.
    fn sample_navigable_point(&self, near: Vec3, radius: f32) -> Option<Vec3>;

    /// Computes an ordered corridor path between two points. `None` or a
    /// path shorter than two points means "no path found".
    fn compute_corridor(&self, from: Vec3, to: Vec3) -> Option<Vec<Vec3>>;
}

/// Obstruction collaborator consumed by the perception pass.
pub trait Obstruction {
    /// Reports whether the segment between the two points is blocked.
    fn raycast_blocked(&self, from: Vec3, to: Vec3) -> bool;
}

/// Inclusive floating-point range used for per-agent parameter draws.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParamRange {
    min: f32,
    max: f32,
}

impl ParamRange {
    /// Creates a new inclusive range.
    #[must_use]
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// Lower bound of the range.
    #[must_use]
    pub const fn min(&self) -> f32 {
        self.min
    }

    /// Upper bound of the range.
    #[must_use]
    pub const fn max(&self) -> f32 {
        self.max
    }
}

/// Inclusive duration range used for randomized cycle intervals.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DurationRange {
    min: Duration,
    max: Duration,
}

impl DurationRange {
    /// Creates a new inclusive duration range.
    #[must_use]
    pub const fn new(min: Duration, max: Duration) -> Self {
        Self { min, max }
    }

    /// Lower bound of the range.
    #[must_use]
    pub const fn min(&self) -> Duration {
        self.min
    }

    /// Upper bound of the range.
    #[must_use]
    pub const fn max(&self) -> Duration {
        self.max
    }
}

/// Inclusive integer range used for lane capacity draws.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapacityRange {
    min: u32,
    max: u32,
}

impl CapacityRange {
    /// Creates a new inclusive capacity range.
    #[must_use]
    pub const fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    /// Lower bound of the range.
    #[must_use]
    pub const fn min(&self) -> u32 {
        self.min
    }

    /// Upper bound of the range.
    #[must_use]
    pub const fn max(&self) -> u32 {
        self.max
    }
}

/// Per-agent movement parameters drawn once at spawn.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MovementTuning {
    /// Base movement speed range in world units per second.
    pub speed: ParamRange,
    /// Acceleration range in world units per second squared.
    pub acceleration: ParamRange,
    /// Turn-rate range in radians per second.
    pub angular_speed: ParamRange,
    /// Distance from the target at which the agent halts and attacks.
    pub stop_distance: f32,
    /// Cooldown between attack attempts while halted in range.
    pub attack_interval: Duration,
    /// Randomized steering-refresh interval, re-rolled after each replan.
    pub replan_interval: DurationRange,
    /// Minimum tactical-target displacement that forces an immediate replan.
    pub replan_refresh_threshold: f32,
    /// Distance at which a corridor waypoint counts as reached.
    pub waypoint_tolerance: f32,
}

impl Default for MovementTuning {
    fn default() -> Self {
        Self {
            speed: ParamRange::new(1.6, 3.4),
            acceleration: ParamRange::new(4.0, 8.0),
            angular_speed: ParamRange::new(2.0, 5.0),
            stop_distance: 1.8,
            attack_interval: Duration::from_millis(1_200),
            replan_interval: DurationRange::new(
                Duration::from_millis(250),
                Duration::from_millis(600),
            ),
            replan_refresh_threshold: 1.5,
            waypoint_tolerance: 1.0,
        }
    }
}

/// Stagger/lunge speed-variance cycle parameters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct VarianceTuning {
    /// Probability that a variance roll produces a stagger.
    pub stagger_chance: f32,
    /// Probability that a variance roll produces a lunge.
    pub lunge_chance: f32,
    /// Speed multiplier range applied during a stagger (below 1.0).
    pub stagger_multiplier: ParamRange,
    /// Speed multiplier range applied during a lunge (above 1.0).
    pub lunge_multiplier: ParamRange,
    /// Duration range of a stagger window.
    pub stagger_duration: DurationRange,
    /// Duration range of a lunge window.
    pub lunge_duration: DurationRange,
    /// Idle interval range between variance rolls.
    pub idle_interval: DurationRange,
}

impl Default for VarianceTuning {
    fn default() -> Self {
        Self {
            stagger_chance: 0.15,
            lunge_chance: 0.20,
            stagger_multiplier: ParamRange::new(0.4, 0.7),
            lunge_multiplier: ParamRange::new(1.4, 1.9),
            stagger_duration: DurationRange::new(
                Duration::from_millis(800),
                Duration::from_millis(1_600),
            ),
            lunge_duration: DurationRange::new(
                Duration::from_millis(400),
                Duration::from_millis(900),
            ),
            idle_interval: DurationRange::new(
                Duration::from_millis(1_500),
                Duration::from_millis(4_000),
            ),
        }
    }
}

/// Surround-formation and local-flocking parameters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FormationTuning {
    /// Fixed period of the tactical update cycle.
    pub update_rate: Duration,
    /// Edge length of a spatial-grid cell in world units.
    pub cell_size: f32,
    /// Base radius of the surround formation around the target.
    pub surround_radius: f32,
    /// Angular frequency of the radius breathing oscillation.
    pub breathe_speed: f32,
    /// Relative amplitude of the radius breathing oscillation.
    pub breathe_amplitude: f32,
    /// Scale of the low-frequency noise added to the surround radius.
    pub noise_scale: f32,
    /// Magnitude of the random jitter added to each formation slot.
    pub positional_jitter: f32,
    /// Maximum magnitude of the persistent per-agent angular slot jitter.
    pub angle_slot_noise: f32,
    /// Radius below which neighbors exert separation pressure.
    pub separation_radius: f32,
    /// Weight of the alignment flocking force.
    pub align_weight: f32,
    /// Weight of the cohesion flocking force.
    pub cohesion_weight: f32,
    /// Weight of the separation flocking force.
    pub separation_weight: f32,
    /// Distance from the target beyond which agents skip the tactical pass.
    pub lod_distance: f32,
}

impl Default for FormationTuning {
    fn default() -> Self {
        Self {
            update_rate: Duration::from_millis(350),
            cell_size: 4.0,
            surround_radius: 6.0,
            breathe_speed: 0.8,
            breathe_amplitude: 0.25,
            noise_scale: 2.0,
            positional_jitter: 1.2,
            angle_slot_noise: 0.12,
            separation_radius: 2.5,
            align_weight: 0.3,
            cohesion_weight: 0.25,
            separation_weight: 1.2,
            lod_distance: 60.0,
        }
    }
}

/// Lane sampling, trimming, and capacity parameters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LaneTuning {
    /// Fixed period of the lane rebuild cycle.
    pub recalc_interval: Duration,
    /// Number of evenly spaced sample directions around the target.
    pub sample_directions: u32,
    /// Minimum angular separation between accepted lanes, in radians.
    pub min_separation_angle: f32,
    /// Radius of the sampling ring the lanes start from.
    pub start_radius: f32,
    /// Search radius handed to the navigation collaborator per ring point.
    pub nav_sample_radius: f32,
    /// Maximum number of corridor corners kept after the ring-entry point.
    pub max_corners_used: usize,
    /// Minimum spacing between consecutive kept corridor corners.
    pub corner_proximity: f32,
    /// Surround radius inside which corridor corners are discarded.
    pub surround_radius: f32,
    /// Maximum number of lanes accepted per rebuild.
    pub max_lane_count: usize,
    /// Randomized concurrent-agent cap drawn per lane.
    pub capacity: CapacityRange,
}

impl Default for LaneTuning {
    fn default() -> Self {
        Self {
            recalc_interval: Duration::from_secs(12),
            sample_directions: 12,
            min_separation_angle: 20.0_f32.to_radians(),
            start_radius: 25.0,
            nav_sample_radius: 4.0,
            max_corners_used: 3,
            corner_proximity: 2.0,
            surround_radius: 6.0,
            max_lane_count: 6,
            capacity: CapacityRange::new(4, 9),
        }
    }
}

/// Wave sizing, pacing, and spawn-sampling parameters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct WaveTuning {
    /// Number of agents spawned by the opening wave.
    pub initial_count: u32,
    /// Multiplier applied to the wave size after each cleared wave.
    pub growth_factor: f32,
    /// Pause between a cleared wave and the next spawn batch.
    pub time_between_waves: Duration,
    /// Mean spawn distance from the target.
    pub spawn_radius: f32,
    /// Standard deviation of the spawn-distance scatter.
    pub spawn_jitter: f32,
    /// Number of jittered navigation samples attempted per spawn point.
    pub nav_sample_max_attempts: u32,
    /// Search radius handed to the navigation collaborator per attempt.
    pub nav_sample_radius: f32,
}

impl Default for WaveTuning {
    fn default() -> Self {
        Self {
            initial_count: 8,
            growth_factor: 1.5,
            time_between_waves: Duration::from_secs(8),
            spawn_radius: 30.0,
            spawn_jitter: 6.0,
            nav_sample_max_attempts: 4,
            nav_sample_radius: 3.0,
        }
    }
}

/// Gunshot-surge reaction parameters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SurgeTuning {
    /// Radius around the shot within which agents receive the boost.
    pub radius: f32,
    /// Speed multiplier applied for the duration of the surge.
    pub speed_multiplier: f32,
    /// Time until the multiplier reverts to 1.0.
    pub duration: Duration,
}

impl Default for SurgeTuning {
    fn default() -> Self {
        Self {
            radius: 12.0,
            speed_multiplier: 1.6,
            duration: Duration::from_millis(2_500),
        }
    }
}

/// Aggregated tuning surface for the whole simulation.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct HordeConfig {
    /// Per-agent movement parameters.
    pub movement: MovementTuning,
    /// Stagger/lunge variance cycle parameters.
    pub variance: VarianceTuning,
    /// Surround-formation and flocking parameters.
    pub formation: FormationTuning,
    /// Lane construction parameters.
    pub lanes: LaneTuning,
    /// Wave sizing and spawn parameters.
    pub waves: WaveTuning,
    /// Gunshot surge parameters.
    pub surge: SurgeTuning,
    /// Seed for every deterministic random stream.
    pub rng_seed: u64,
}

impl Default for HordeConfig {
    fn default() -> Self {
        Self {
            movement: MovementTuning::default(),
            variance: VarianceTuning::default(),
            formation: FormationTuning::default(),
            lanes: LaneTuning::default(),
            waves: WaveTuning::default(),
            surge: SurgeTuning::default(),
            rng_seed: 0x7a6d_6269_6573_2121,
        }
    }
}

/// Reasons a configuration fails validation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A range's lower bound exceeds its upper bound.
    #[error("range `{0}` has min greater than max")]
    InvertedRange(&'static str),
    /// A scalar that must be strictly positive is zero or negative.
    #[error("parameter `{0}` must be strictly positive")]
    NonPositive(&'static str),
    /// A periodic cycle interval is zero.
    #[error("interval `{0}` must be non-zero")]
    ZeroInterval(&'static str),
}

impl HordeConfig {
    /// Checks the tuning surface for degenerate values.
    ///
    /// Validation is intentionally coarse: it rejects configurations that
    /// would stall a periodic cycle or invert a sampling range, and leaves
    /// gameplay balance to the host.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range("movement.speed", self.movement.speed)?;
        check_range("movement.acceleration", self.movement.acceleration)?;
        check_range("movement.angular_speed", self.movement.angular_speed)?;
        check_duration_range("movement.replan_interval", self.movement.replan_interval)?;
        check_range(
            "variance.stagger_multiplier",
            self.variance.stagger_multiplier,
        )?;
        check_range("variance.lunge_multiplier", self.variance.lunge_multiplier)?;
        check_duration_range("variance.stagger_duration", self.variance.stagger_duration)?;
        check_duration_range("variance.lunge_duration", self.variance.lunge_duration)?;
        check_duration_range("variance.idle_interval", self.variance.idle_interval)?;

        if self.formation.update_rate.is_zero() {
            return Err(ConfigError::ZeroInterval("formation.update_rate"));
        }
        if self.formation.cell_size <= 0.0 {
            return Err(ConfigError::NonPositive("formation.cell_size"));
        }
        if self.lanes.recalc_interval.is_zero() {
            return Err(ConfigError::ZeroInterval("lanes.recalc_interval"));
        }
        if self.lanes.capacity.min() > self.lanes.capacity.max() {
            return Err(ConfigError::InvertedRange("lanes.capacity"));
        }
        if self.waves.spawn_radius <= 0.0 {
            return Err(ConfigError::NonPositive("waves.spawn_radius"));
        }
        if self.surge.radius <= 0.0 {
            return Err(ConfigError::NonPositive("surge.radius"));
        }
        Ok(())
    }
}

fn check_range(name: &'static str, range: ParamRange) -> Result<(), ConfigError> {
    if range.min() > range.max() {
        return Err(ConfigError::InvertedRange(name));
    }
    if range.min() <= 0.0 {
        return Err(ConfigError::NonPositive(name));
    }
    Ok(())
}

fn check_duration_range(name: &'static str, range: DurationRange) -> Result<(), ConfigError> {
    if range.min() > range.max() {
        return Err(ConfigError::InvertedRange(name));
    }
    if range.max().is_zero() {
        return Err(ConfigError::ZeroInterval(name));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::de::DeserializeOwned;

    fn assert_round_trip<T>(value: &T)
    where
        T: Serialize + DeserializeOwned + PartialEq + std::fmt::Debug,
    {
        let bytes = bincode::serialize(value).expect("serialize");
        let restored: T = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(&restored, value);
    }

    #[test]
    fn agent_id_round_trips_through_bincode() {
        assert_round_trip(&AgentId::new(42));
    }

    #[test]
    fn lane_id_round_trips_through_bincode() {
        assert_round_trip(&LaneId::new(3));
    }

    #[test]
    fn config_round_trips_through_bincode() {
        assert_round_trip(&HordeConfig::default());
    }

    #[test]
    fn default_config_passes_validation() {
        HordeConfig::default().validate().expect("default config");
    }

    #[test]
    fn inverted_speed_range_is_rejected() {
        let mut config = HordeConfig::default();
        config.movement.speed = ParamRange::new(4.0, 2.0);
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvertedRange("movement.speed"))
        );
    }

    #[test]
    fn zero_update_rate_is_rejected() {
        let mut config = HordeConfig::default();
        config.formation.update_rate = Duration::ZERO;
        assert_eq!(
            config.validate(),
            Err(ConfigError::ZeroInterval("formation.update_rate"))
        );
    }

    #[test]
    fn agent_view_orders_snapshots_by_id() {
        let make = |id: u32| AgentSnapshot {
            id: AgentId::new(id),
            position: Vec3::ZERO,
            velocity: Vec3::ZERO,
            speed: 2.0,
            speed_multiplier: 1.0,
            aggression: AggressionState::Alert,
            lane: None,
            tactical_target: None,
            angle_noise: 0.0,
        };
        let view = AgentView::from_snapshots(vec![make(4), make(1), make(2)]);
        let ids: Vec<u32> = view.iter().map(|snapshot| snapshot.id.get()).collect();
        assert_eq!(ids, vec![1, 2, 4]);
    }

    #[test]
    fn planar_zeroes_the_degenerate_axis() {
        let projected = planar(Vec3::new(1.5, -2.0, 7.0));
        assert_eq!(projected, Vec3::new(1.5, -2.0, 0.0));
    }
}
