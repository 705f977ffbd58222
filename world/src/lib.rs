#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative horde state management.
//!
//! The world owns the agent population, the published target position, and
//! the installed lane set. All mutation flows through [`apply`], which
//! executes one command deterministically and reports what happened through
//! events. Systems observe the world through the read-only [`query`] module
//! and never touch it directly.

use std::{
    collections::{HashMap, VecDeque},
    time::Duration,
};

use glam::Vec3;
use horde_core::{
    AgentId, AggressionState, Command, Event, HordeConfig, Lane, LaneId, MovementTuning,
    VarianceTuning, planar,
};
use horde_system_lanes::{choose_lane, LaneLoad};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

const VELOCITY_EPSILON: f32 = 1e-4;

/// Represents the authoritative horde world state.
#[derive(Debug)]
pub struct World {
    config: HordeConfig,
    target: Option<Vec3>,
    agents: Vec<Agent>,
    angle_noise: HashMap<AgentId, f32>,
    lane_assignments: HashMap<AgentId, Option<LaneId>>,
    lanes: Vec<Lane>,
    next_agent_id: u32,
    rng: ChaCha8Rng,
    clock: Duration,
}

impl World {
    /// Creates a new, empty world driven by the provided configuration.
    #[must_use]
    pub fn new(config: HordeConfig) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(config.rng_seed),
            config,
            target: None,
            agents: Vec::new(),
            angle_noise: HashMap::new(),
            lane_assignments: HashMap::new(),
            lanes: Vec::new(),
            next_agent_id: 0,
            clock: Duration::ZERO,
        }
    }

    fn agent_mut(&mut self, agent_id: AgentId) -> Option<&mut Agent> {
        self.agents.iter_mut().find(|agent| agent.id == agent_id)
    }

    fn lane_loads(&self) -> Vec<LaneLoad> {
        let mut loads: Vec<LaneLoad> = self
            .lanes
            .iter()
            .map(|lane| LaneLoad {
                occupancy: 0,
                capacity: lane.capacity(),
            })
            .collect();
        for assignment in self.lane_assignments.values().flatten() {
            if let Some(load) = loads.get_mut(assignment.get() as usize) {
                load.occupancy += 1;
            }
        }
        loads
    }

    fn spawn_agent(&mut self, position: Vec3, out_events: &mut Vec<Event>) {
        let id = AgentId::new(self.next_agent_id);
        self.next_agent_id = self.next_agent_id.saturating_add(1);

        let movement = self.config.movement;
        let variance = self.config.variance;
        let noise_bound = self.config.formation.angle_slot_noise;
        let agent = Agent::spawn(id, planar(position), &movement, &variance, &mut self.rng);
        let angle_noise = if noise_bound > 0.0 {
            self.rng.gen_range(-noise_bound..=noise_bound)
        } else {
            0.0
        };

        let lane = choose_lane(&self.lane_loads(), &mut self.rng);
        self.agents.push(agent);
        let _ = self.angle_noise.insert(id, angle_noise);
        let _ = self.lane_assignments.insert(id, lane);
        if let Some(lane_id) = lane {
            self.assign_corridor(id, lane_id);
        }

        out_events.push(Event::AgentSpawned {
            agent: id,
            position: planar(position),
            lane,
        });
    }

    fn despawn_agent(&mut self, agent_id: AgentId, out_events: &mut Vec<Event>) {
        let Some(index) = self.agents.iter().position(|agent| agent.id == agent_id) else {
            log::debug!("despawn of unknown agent {} ignored", agent_id.get());
            return;
        };

        let _ = self.agents.remove(index);
        let _ = self.angle_noise.remove(&agent_id);
        let _ = self.lane_assignments.remove(&agent_id);
        out_events.push(Event::AgentDespawned { agent: agent_id });

        if self.agents.is_empty() {
            out_events.push(Event::HordeCleared);
        }
    }

    /// Reassigns every live agent across the freshly installed lane set.
    ///
    /// Lane identity does not survive a rebuild, so previous assignments
    /// are discarded wholesale instead of being remapped.
    fn install_lanes(&mut self, lanes: Vec<Lane>, out_events: &mut Vec<Event>) {
        self.lanes = lanes;
        for assignment in self.lane_assignments.values_mut() {
            *assignment = None;
        }

        let agent_ids: Vec<AgentId> = self.agents.iter().map(|agent| agent.id).collect();
        for agent_id in agent_ids {
            let lane = choose_lane(&self.lane_loads(), &mut self.rng);
            let _ = self.lane_assignments.insert(agent_id, lane);
            if let Some(lane_id) = lane {
                self.assign_corridor(agent_id, lane_id);
            } else if let Some(agent) = self.agent_mut(agent_id) {
                agent.corridor.clear();
            }
        }

        out_events.push(Event::LanesInstalled {
            count: self.lanes.len(),
        });
    }

    fn assign_corridor(&mut self, agent_id: AgentId, lane_id: LaneId) {
        let waypoints: Option<VecDeque<Vec3>> = self
            .lanes
            .get(lane_id.get() as usize)
            .map(|lane| lane.waypoints().iter().copied().collect());
        if let (Some(corridor), Some(agent)) = (waypoints, self.agent_mut(agent_id)) {
            agent.corridor = corridor;
        }
    }

    fn apply_gunshot(&mut self, position: Vec3, out_events: &mut Vec<Event>) {
        if self.target.is_none() {
            log::debug!("gunshot ignored: horde is not engaged");
            return;
        }

        let surge = self.config.surge;
        let expiry = self.clock.saturating_add(surge.duration);
        let shot = planar(position);
        for agent in &mut self.agents {
            if agent.position.distance(shot) > surge.radius {
                continue;
            }
            // Surges override any variance window currently in effect.
            agent.speed_multiplier = surge.speed_multiplier;
            agent.multiplier_expiry = Some(expiry);
            out_events.push(Event::AgentSurged { agent: agent.id });
        }
    }

    fn tick(&mut self, dt: Duration, out_events: &mut Vec<Event>) {
        self.clock = self.clock.saturating_add(dt);
        out_events.push(Event::TimeAdvanced { dt });

        let World {
            config,
            target,
            agents,
            rng,
            clock,
            ..
        } = self;
        for agent in agents.iter_mut() {
            agent.expire_multiplier(*clock, &config.variance, rng);
            agent.roll_variance(dt, *clock, &config.variance, rng);
            agent.advance(dt, *target, &config.movement, rng, out_events);
        }
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::Tick { dt } => world.tick(dt, out_events),
        Command::SetTarget { position } => {
            world.target = Some(planar(position));
            out_events.push(Event::TargetMoved {
                position: planar(position),
            });
        }
        Command::ClearTarget => {
            world.target = None;
            out_events.push(Event::TargetLost);
        }
        Command::SpawnAgent { position } => world.spawn_agent(position, out_events),
        Command::DespawnAgent { agent } => world.despawn_agent(agent, out_events),
        Command::NotifyGunshot { position } => world.apply_gunshot(position, out_events),
        Command::InstallLanes { lanes } => world.install_lanes(lanes, out_events),
        Command::SetTacticalTarget { agent, point } => {
            let threshold = world.config.movement.replan_refresh_threshold;
            if let Some(agent) = world.agent_mut(agent) {
                agent.set_tactical_target(planar(point), threshold);
            }
        }
        Command::SetAggression { agent, state } => {
            if let Some(agent) = world.agent_mut(agent) {
                agent.aggression = state;
            }
        }
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use std::time::Duration;

    use glam::Vec3;
    use horde_core::{AgentSnapshot, AgentView, LaneId, LaneSnapshot, LaneView};

    use super::World;

    /// Captures a read-only view of the active agent population.
    #[must_use]
    pub fn agent_view(world: &World) -> AgentView {
        let snapshots: Vec<AgentSnapshot> = world
            .agents
            .iter()
            .map(|agent| AgentSnapshot {
                id: agent.id,
                position: agent.position,
                velocity: agent.velocity,
                speed: agent.speed,
                speed_multiplier: agent.speed_multiplier,
                aggression: agent.aggression,
                lane: world.lane_assignments.get(&agent.id).copied().flatten(),
                tactical_target: agent.tactical_target,
                angle_noise: world.angle_noise.get(&agent.id).copied().unwrap_or(0.0),
            })
            .collect();
        AgentView::from_snapshots(snapshots)
    }

    /// Captures a read-only view of the installed lane set with occupancy.
    #[must_use]
    pub fn lane_view(world: &World) -> LaneView {
        let mut occupancy = vec![0_u32; world.lanes.len()];
        for assignment in world.lane_assignments.values().flatten() {
            if let Some(count) = occupancy.get_mut(assignment.get() as usize) {
                *count += 1;
            }
        }

        let snapshots: Vec<LaneSnapshot> = world
            .lanes
            .iter()
            .zip(occupancy)
            .enumerate()
            .map(|(index, (lane, occupancy))| LaneSnapshot {
                id: LaneId::new(index as u32),
                waypoints: lane.waypoints().to_vec(),
                capacity: lane.capacity(),
                occupancy,
            })
            .collect();
        LaneView::from_snapshots(snapshots)
    }

    /// Currently published target position, if any.
    #[must_use]
    pub fn target_position(world: &World) -> Option<Vec3> {
        world.target
    }

    /// Total simulated time accumulated by the world.
    #[must_use]
    pub fn clock(world: &World) -> Duration {
        world.clock
    }
}

#[derive(Clone, Debug)]
struct Agent {
    id: AgentId,
    position: Vec3,
    velocity: Vec3,
    speed: f32,
    acceleration: f32,
    angular_speed: f32,
    aggression: AggressionState,
    speed_multiplier: f32,
    multiplier_expiry: Option<Duration>,
    tactical_target: Option<Vec3>,
    corridor: VecDeque<Vec3>,
    steering_point: Option<Vec3>,
    replan_timer: Duration,
    replan_interval: Duration,
    variance_timer: Duration,
    attack_cooldown: Duration,
}

impl Agent {
    fn spawn(
        id: AgentId,
        position: Vec3,
        movement: &MovementTuning,
        variance: &VarianceTuning,
        rng: &mut ChaCha8Rng,
    ) -> Self {
        Self {
            id,
            position,
            velocity: Vec3::ZERO,
            speed: sample_range(rng, movement.speed.min(), movement.speed.max()),
            acceleration: sample_range(
                rng,
                movement.acceleration.min(),
                movement.acceleration.max(),
            ),
            angular_speed: sample_range(
                rng,
                movement.angular_speed.min(),
                movement.angular_speed.max(),
            ),
            aggression: AggressionState::default(),
            speed_multiplier: 1.0,
            multiplier_expiry: None,
            tactical_target: None,
            corridor: VecDeque::new(),
            steering_point: None,
            replan_timer: Duration::ZERO,
            replan_interval: sample_duration(
                rng,
                movement.replan_interval.min(),
                movement.replan_interval.max(),
            ),
            variance_timer: sample_duration(
                rng,
                variance.idle_interval.min(),
                variance.idle_interval.max(),
            ),
            attack_cooldown: movement.attack_interval,
        }
    }

    /// Reverts an elapsed speed override to exactly 1.0 and schedules the
    /// next variance roll.
    fn expire_multiplier(&mut self, clock: Duration, variance: &VarianceTuning, rng: &mut ChaCha8Rng) {
        let Some(expiry) = self.multiplier_expiry else {
            return;
        };
        if clock < expiry {
            return;
        }
        self.speed_multiplier = 1.0;
        self.multiplier_expiry = None;
        self.variance_timer = sample_duration(
            rng,
            variance.idle_interval.min(),
            variance.idle_interval.max(),
        );
    }

    /// Runs the stagger/lunge cycle. At most one override is in effect at a
    /// time; while one is active the idle timer does not advance.
    fn roll_variance(
        &mut self,
        dt: Duration,
        clock: Duration,
        variance: &VarianceTuning,
        rng: &mut ChaCha8Rng,
    ) {
        if self.multiplier_expiry.is_some() {
            return;
        }
        if self.variance_timer > dt {
            self.variance_timer -= dt;
            return;
        }
        self.variance_timer = sample_duration(
            rng,
            variance.idle_interval.min(),
            variance.idle_interval.max(),
        );

        let roll: f32 = rng.gen();
        if roll < variance.stagger_chance {
            self.speed_multiplier = sample_range(
                rng,
                variance.stagger_multiplier.min(),
                variance.stagger_multiplier.max(),
            );
            let window = sample_duration(
                rng,
                variance.stagger_duration.min(),
                variance.stagger_duration.max(),
            );
            self.multiplier_expiry = Some(clock.saturating_add(window));
        } else if roll < variance.stagger_chance + variance.lunge_chance {
            self.speed_multiplier = sample_range(
                rng,
                variance.lunge_multiplier.min(),
                variance.lunge_multiplier.max(),
            );
            let window = sample_duration(
                rng,
                variance.lunge_duration.min(),
                variance.lunge_duration.max(),
            );
            self.multiplier_expiry = Some(clock.saturating_add(window));
        }
    }

    /// Stores the destination. A large correction while the agent is moving
    /// refreshes the steering point immediately instead of waiting out the
    /// throttled replan interval.
    fn set_tactical_target(&mut self, point: Vec3, refresh_threshold: f32) {
        let displaced = self
            .tactical_target
            .is_some_and(|previous| previous.distance(point) > refresh_threshold);
        let moving = self.velocity.length() > VELOCITY_EPSILON;
        self.tactical_target = Some(point);
        if (displaced && moving) || self.steering_point.is_none() {
            self.steering_point = Some(self.steering_destination(None));
        }
    }

    /// Destination the agent should currently steer toward: the corridor
    /// first, then the pushed tactical target, then the raw target as a
    /// last resort. Aggression is advisory and never reroutes steering.
    fn steering_destination(&self, target: Option<Vec3>) -> Vec3 {
        if let Some(waypoint) = self.corridor.front() {
            return *waypoint;
        }
        if let Some(point) = self.tactical_target {
            return point;
        }
        target.unwrap_or(self.position)
    }

    fn advance(
        &mut self,
        dt: Duration,
        target: Option<Vec3>,
        movement: &MovementTuning,
        rng: &mut ChaCha8Rng,
        out_events: &mut Vec<Event>,
    ) {
        while self
            .corridor
            .front()
            .is_some_and(|waypoint| self.position.distance(*waypoint) <= movement.waypoint_tolerance)
        {
            let _ = self.corridor.pop_front();
        }

        if let Some(center) = target {
            if self.position.distance(center) <= movement.stop_distance {
                self.velocity = Vec3::ZERO;
                self.attack_cooldown = self.attack_cooldown.saturating_sub(dt);
                if self.attack_cooldown.is_zero() {
                    self.attack_cooldown = movement.attack_interval;
                    out_events.push(Event::AgentAttacked { agent: self.id });
                }
                return;
            }
        }
        self.attack_cooldown = movement.attack_interval;

        self.replan_timer = self.replan_timer.saturating_add(dt);
        if self.replan_timer >= self.replan_interval || self.steering_point.is_none() {
            self.replan_timer = Duration::ZERO;
            self.replan_interval = sample_duration(
                rng,
                movement.replan_interval.min(),
                movement.replan_interval.max(),
            );
            self.steering_point = Some(self.steering_destination(target));
        }

        let Some(destination) = self.steering_point else {
            return;
        };
        let offset = planar(destination - self.position);
        if offset.length() < VELOCITY_EPSILON {
            self.velocity = Vec3::ZERO;
            return;
        }

        let seconds = dt.as_secs_f32();
        let desired_speed = self.speed * self.speed_multiplier;
        let desired_angle = offset.y.atan2(offset.x);

        let heading = if self.velocity.length() > VELOCITY_EPSILON {
            let current_angle = self.velocity.y.atan2(self.velocity.x);
            let turn = wrap_angle(desired_angle - current_angle)
                .clamp(-self.angular_speed * seconds, self.angular_speed * seconds);
            current_angle + turn
        } else {
            desired_angle
        };

        let current_speed = self.velocity.length();
        let speed_step = self.acceleration * seconds;
        let next_speed = current_speed
            + (desired_speed - current_speed).clamp(-speed_step, speed_step);

        self.velocity = Vec3::new(heading.cos(), heading.sin(), 0.0) * next_speed;
        self.position = planar(self.position + self.velocity * seconds);
    }
}

fn sample_range(rng: &mut ChaCha8Rng, min: f32, max: f32) -> f32 {
    if max > min {
        rng.gen_range(min..=max)
    } else {
        min
    }
}

fn sample_duration(rng: &mut ChaCha8Rng, min: Duration, max: Duration) -> Duration {
    if max > min {
        Duration::from_secs_f64(rng.gen_range(min.as_secs_f64()..=max.as_secs_f64()))
    } else {
        min
    }
}

fn wrap_angle(angle: f32) -> f32 {
    let wrapped = angle.rem_euclid(std::f32::consts::TAU);
    if wrapped > std::f32::consts::PI {
        wrapped - std::f32::consts::TAU
    } else {
        wrapped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spawn_one(world: &mut World, position: Vec3) -> AgentId {
        let mut events = Vec::new();
        apply(
            world,
            Command::SpawnAgent { position },
            &mut events,
        );
        match events.as_slice() {
            [Event::AgentSpawned { agent, .. }] => *agent,
            other => panic!("expected AgentSpawned, got {other:?}"),
        }
    }

    #[test]
    fn registration_keeps_every_collection_in_lockstep() {
        let mut world = World::new(HordeConfig::default());
        let first = spawn_one(&mut world, Vec3::ZERO);
        let second = spawn_one(&mut world, Vec3::new(5.0, 0.0, 0.0));

        assert_eq!(world.agents.len(), 2);
        assert_eq!(world.angle_noise.len(), 2);
        assert_eq!(world.lane_assignments.len(), 2);

        let mut events = Vec::new();
        apply(&mut world, Command::DespawnAgent { agent: first }, &mut events);
        assert_eq!(world.agents.len(), 1);
        assert_eq!(world.agents[0].id, second);
        assert!(!world.angle_noise.contains_key(&first));
        assert!(!world.lane_assignments.contains_key(&first));
    }

    #[test]
    fn spawned_agents_draw_parameters_within_the_configured_ranges() {
        let config = HordeConfig::default();
        let mut world = World::new(config);
        for index in 0..16 {
            let _ = spawn_one(&mut world, Vec3::new(index as f32, 0.0, 0.0));
        }

        for agent in &world.agents {
            assert!(agent.speed >= config.movement.speed.min());
            assert!(agent.speed <= config.movement.speed.max());
            assert!(agent.acceleration >= config.movement.acceleration.min());
            assert!(agent.acceleration <= config.movement.acceleration.max());
            assert_eq!(agent.speed_multiplier, 1.0);
        }
    }

    #[test]
    fn wrap_angle_maps_into_the_signed_half_turn() {
        assert!((wrap_angle(std::f32::consts::TAU + 0.1) - 0.1).abs() < 1e-5);
        assert!((wrap_angle(-0.2) + 0.2).abs() < 1e-5);
        assert!(wrap_angle(std::f32::consts::PI + 0.1) < 0.0);
    }

    #[test]
    fn steering_prefers_the_corridor_then_the_tactical_target() {
        let mut agent = Agent::spawn(
            AgentId::new(0),
            Vec3::ZERO,
            &MovementTuning::default(),
            &VarianceTuning::default(),
            &mut ChaCha8Rng::seed_from_u64(0),
        );
        let center = Vec3::new(20.0, 0.0, 0.0);
        assert_eq!(agent.steering_destination(Some(center)), center);

        agent.tactical_target = Some(Vec3::new(-5.0, 0.0, 0.0));
        assert_eq!(
            agent.steering_destination(Some(center)),
            Vec3::new(-5.0, 0.0, 0.0)
        );

        agent.corridor.push_back(Vec3::new(10.0, 10.0, 0.0));
        assert_eq!(
            agent.steering_destination(Some(center)),
            Vec3::new(10.0, 10.0, 0.0)
        );

        // Aggression is advisory state and never changes the destination.
        agent.aggression = AggressionState::Frenzy;
        assert_eq!(
            agent.steering_destination(Some(center)),
            Vec3::new(10.0, 10.0, 0.0)
        );
    }
}
