#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state management for Sprout Siege.

pub mod health;

use std::{
    collections::{BTreeMap, BTreeSet},
    time::Duration,
};

use log::debug;
use sprout_siege_core::{
    lift, planar, planar_distance, ActorId, ActorKind, ActorTemplate, ArenaBounds, Command, Cue,
    DamageRejection, Event, KindMask, PlayMode, ProjectileId, ProjectileTuning, SpawnOrigin,
    Timers, Vec2, Vec3, MOVING_SPEED_THRESHOLD, WELCOME_BANNER,
};

use crate::health::{HealthRecord, HitResolution};

/// Radius of the body every actor occupies for overlap queries.
pub const ACTOR_RADIUS: f32 = 0.5;

/// Health-driven wake-ups tracked per actor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum HealthTimer {
    InvulnerabilityEnds,
    KnockbackEnds,
    Deactivate,
}

/// Represents the authoritative Sprout Siege world state.
#[derive(Debug)]
pub struct World {
    banner: &'static str,
    arena: Option<ArenaBounds>,
    play_mode: PlayMode,
    tick_index: u64,
    elapsed: Duration,
    actors: BTreeMap<ActorId, Actor>,
    next_actor: u32,
    projectiles: BTreeMap<ProjectileId, Projectile>,
    next_projectile: u32,
    timers: Timers<(ActorId, HealthTimer)>,
    perceived: BTreeSet<(ActorId, ActorId)>,
}

impl World {
    /// Creates an empty, running world without arena bounds.
    #[must_use]
    pub fn new() -> Self {
        Self {
            banner: WELCOME_BANNER,
            arena: None,
            play_mode: PlayMode::Running,
            tick_index: 0,
            elapsed: Duration::ZERO,
            actors: BTreeMap::new(),
            next_actor: 0,
            projectiles: BTreeMap::new(),
            next_projectile: 0,
            timers: Timers::new(),
            perceived: BTreeSet::new(),
        }
    }

    fn spawn(
        &mut self,
        template: ActorTemplate,
        position: Vec3,
        origin: SpawnOrigin,
        out_events: &mut Vec<Event>,
    ) {
        let id = ActorId::new(self.next_actor);
        self.next_actor = self.next_actor.saturating_add(1);
        let actor = Actor {
            id,
            kind: template.kind,
            position: self.clamp_to_arena(position),
            velocity: Vec3::ZERO,
            facing: Vec2::Y,
            health: HealthRecord::new(template.health),
            perception_radius: template.perception_radius,
            active: true,
            collidable: true,
            controllable: true,
            moving: false,
        };
        let position = actor.position;
        let _ = self.actors.insert(id, actor);
        out_events.push(Event::ActorSpawned {
            actor: id,
            position,
            origin,
            template,
        });
    }

    fn damage(
        &mut self,
        target: ActorId,
        amount: f32,
        attacker: Option<Vec3>,
        out_events: &mut Vec<Event>,
    ) {
        let now = self.elapsed;
        let Some(actor) = self.actors.get_mut(&target).filter(|actor| actor.active) else {
            out_events.push(Event::DamageIgnored {
                target,
                reason: DamageRejection::MissingTarget,
            });
            return;
        };

        match actor
            .health
            .apply_damage(amount, attacker, actor.position, actor.facing)
        {
            HitResolution::Ignored(reason) => {
                out_events.push(Event::DamageIgnored { target, reason });
            }
            HitResolution::Wounded { knockback } => {
                let tuning = *actor.health.tuning();
                out_events.push(Event::DamageApplied {
                    target,
                    amount,
                    remaining: actor.health.current(),
                    fatal: false,
                });
                out_events.push(Event::CuePlayed {
                    actor: target,
                    cue: Cue::Damage,
                });
                if actor.health.is_invulnerable() {
                    let _ = self.timers.schedule(
                        (target, HealthTimer::InvulnerabilityEnds),
                        now,
                        tuning.invulnerability,
                    );
                }
                if let Some(velocity) = knockback {
                    actor.velocity = velocity;
                    out_events.push(Event::KnockbackStarted {
                        actor: target,
                        velocity,
                    });
                    if actor.health.is_knocked_back() {
                        let _ = self.timers.schedule(
                            (target, HealthTimer::KnockbackEnds),
                            now,
                            tuning.knockback_duration,
                        );
                    }
                }
            }
            HitResolution::Fatal => {
                let tuning = *actor.health.tuning();
                actor.controllable = false;
                actor.velocity = Vec3::ZERO;
                let kind = actor.kind;
                out_events.push(Event::DamageApplied {
                    target,
                    amount,
                    remaining: 0.0,
                    fatal: true,
                });
                out_events.push(Event::DeathStarted {
                    actor: target,
                    kind,
                });
                out_events.push(Event::CuePlayed {
                    actor: target,
                    cue: Cue::Death,
                });
                let _ = self
                    .timers
                    .cancel_key((target, HealthTimer::InvulnerabilityEnds));
                let _ = self.timers.cancel_key((target, HealthTimer::KnockbackEnds));
                let linger = if kind == ActorKind::Player {
                    Duration::ZERO
                } else {
                    tuning.linger
                };
                let _ = self.timers.schedule(
                    (target, HealthTimer::Deactivate),
                    now,
                    tuning.dying_duration.saturating_add(linger),
                );
                debug!("actor {} started dying", target.get());
            }
        }
    }

    fn strike(
        &mut self,
        attacker: ActorId,
        center: Vec3,
        radius: f32,
        damage: f32,
        targets: KindMask,
        out_events: &mut Vec<Event>,
    ) {
        let Some(origin) = self
            .actors
            .get(&attacker)
            .filter(|actor| actor.active && actor.controllable)
            .map(|actor| actor.position)
        else {
            return;
        };
        for target in self.overlap(center, radius, targets, Some(attacker)) {
            self.damage(target, damage, Some(origin), out_events);
        }
    }

    fn fire(
        &mut self,
        shooter: ActorId,
        origin: Vec3,
        direction: Vec2,
        tuning: ProjectileTuning,
        targets: KindMask,
        out_events: &mut Vec<Event>,
    ) {
        if !self
            .actors
            .get(&shooter)
            .is_some_and(|actor| actor.active && actor.controllable)
        {
            return;
        }
        let direction = direction.normalize_or_zero();
        if direction == Vec2::ZERO {
            return;
        }
        let projectile = ProjectileId::new(self.next_projectile);
        self.next_projectile = self.next_projectile.saturating_add(1);
        let velocity = lift(direction) * tuning.speed;
        let _ = self.projectiles.insert(
            projectile,
            Projectile {
                shooter,
                position: origin,
                velocity,
                tuning,
                targets,
                expires_at: self.elapsed.saturating_add(tuning.lifetime),
            },
        );
        out_events.push(Event::ProjectileFired {
            projectile,
            shooter,
            position: origin,
            velocity,
        });
    }

    fn advance(&mut self, dt: Duration, out_events: &mut Vec<Event>) {
        self.tick_index = self.tick_index.saturating_add(1);
        self.elapsed = self.elapsed.saturating_add(dt);
        out_events.push(Event::TimeAdvanced { dt });

        self.resolve_timers(out_events);
        self.integrate(dt);
        self.advance_projectiles(dt, out_events);
        self.refresh_moving(out_events);
        self.refresh_perception(out_events);
    }

    fn resolve_timers(&mut self, out_events: &mut Vec<Event>) {
        for (actor_id, timer) in self.timers.drain_due(self.elapsed) {
            let Some(actor) = self.actors.get_mut(&actor_id) else {
                continue;
            };
            match timer {
                HealthTimer::InvulnerabilityEnds => {
                    actor.health.end_invulnerability();
                    out_events.push(Event::InvulnerabilityEnded { actor: actor_id });
                }
                HealthTimer::KnockbackEnds => {
                    actor.health.end_knockback();
                    actor.velocity = Vec3::ZERO;
                    out_events.push(Event::KnockbackEnded { actor: actor_id });
                }
                HealthTimer::Deactivate => {
                    actor.active = false;
                    actor.collidable = false;
                    actor.velocity = Vec3::ZERO;
                    let dead = actor.health.is_dead();
                    out_events.push(Event::ActorDeactivated {
                        actor: actor_id,
                        dead,
                    });
                    self.forget_perception(actor_id, out_events);
                }
            }
        }
    }

    fn forget_perception(&mut self, actor: ActorId, out_events: &mut Vec<Event>) {
        let stale: Vec<(ActorId, ActorId)> = self
            .perceived
            .iter()
            .copied()
            .filter(|(observer, target)| *observer == actor || *target == actor)
            .collect();
        for pair in stale {
            let _ = self.perceived.remove(&pair);
            let (observer, target) = pair;
            if target == actor {
                out_events.push(Event::PerceptionExited { observer, target });
            }
        }
    }

    fn integrate(&mut self, dt: Duration) {
        let seconds = dt.as_secs_f32();
        let arena = self.arena;
        for actor in self.actors.values_mut().filter(|actor| actor.active) {
            let step = Vec3::new(actor.velocity.x, 0.0, actor.velocity.z) * seconds;
            let mut position = actor.position + step;
            if let Some(arena) = arena {
                position = clamp(position, arena);
            }
            actor.position = position;
        }
    }

    fn advance_projectiles(&mut self, dt: Duration, out_events: &mut Vec<Event>) {
        let seconds = dt.as_secs_f32();
        let ids: Vec<ProjectileId> = self.projectiles.keys().copied().collect();
        for id in ids {
            let Some(projectile) = self.projectiles.get_mut(&id) else {
                continue;
            };
            let from = projectile.position;
            projectile.position += projectile.velocity * seconds;
            let projectile = *projectile;

            let victim = self.first_on_path(from, &projectile);
            if let Some(target) = victim {
                let _ = self.projectiles.remove(&id);
                out_events.push(Event::ProjectileHit {
                    projectile: id,
                    target,
                });
                self.damage(
                    target,
                    projectile.tuning.damage,
                    Some(projectile.position - projectile.velocity),
                    out_events,
                );
            } else if self.elapsed >= projectile.expires_at {
                let _ = self.projectiles.remove(&id);
                out_events.push(Event::ProjectileExpired { projectile: id });
            }
        }
    }

    fn refresh_moving(&mut self, out_events: &mut Vec<Event>) {
        for actor in self.actors.values_mut().filter(|actor| actor.active) {
            let moving = planar(actor.velocity).length() > MOVING_SPEED_THRESHOLD;
            if moving != actor.moving {
                actor.moving = moving;
                out_events.push(Event::MovingChanged {
                    actor: actor.id,
                    moving,
                });
            }
        }
    }

    fn refresh_perception(&mut self, out_events: &mut Vec<Event>) {
        let mut current = BTreeSet::new();
        for observer in self.actors.values().filter(|actor| actor.active) {
            let Some(radius) = observer.perception_radius else {
                continue;
            };
            for target in self.actors.values().filter(|actor| {
                actor.active
                    && actor.collidable
                    && actor.kind == ActorKind::Player
                    && actor.id != observer.id
            }) {
                if planar_distance(observer.position, target.position) <= radius + ACTOR_RADIUS {
                    let _ = current.insert((observer.id, target.id));
                }
            }
        }

        for (observer, target) in self.perceived.difference(&current) {
            out_events.push(Event::PerceptionExited {
                observer: *observer,
                target: *target,
            });
        }
        for (observer, target) in current.difference(&self.perceived) {
            out_events.push(Event::PerceptionEntered {
                observer: *observer,
                target: *target,
            });
        }
        self.perceived = current;
    }

    fn first_on_path(&self, from: Vec3, projectile: &Projectile) -> Option<ActorId> {
        let reach = projectile.tuning.hit_radius + ACTOR_RADIUS;
        self.actors
            .values()
            .filter(|actor| {
                actor.active
                    && actor.collidable
                    && projectile.targets.contains(actor.kind)
                    && actor.id != projectile.shooter
            })
            .filter_map(|actor| {
                let (along, distance) = segment_offset(from, projectile.position, actor.position);
                (distance <= reach).then_some((along, actor.id))
            })
            .min_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)))
            .map(|(_, id)| id)
    }

    fn overlap(
        &self,
        center: Vec3,
        radius: f32,
        targets: KindMask,
        exclude: Option<ActorId>,
    ) -> Vec<ActorId> {
        self.actors
            .values()
            .filter(|actor| {
                actor.active
                    && actor.collidable
                    && targets.contains(actor.kind)
                    && Some(actor.id) != exclude
                    && planar_distance(center, actor.position) <= radius + ACTOR_RADIUS
            })
            .map(|actor| actor.id)
            .collect()
    }

    fn clamp_to_arena(&self, position: Vec3) -> Vec3 {
        match self.arena {
            Some(arena) => clamp(position, arena),
            None => position,
        }
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

/// Fraction along the planar segment closest to `point`, and the distance to it.
fn segment_offset(from: Vec3, to: Vec3, point: Vec3) -> (f32, f32) {
    let (a, b, p) = (planar(from), planar(to), planar(point));
    let segment = b - a;
    let length_squared = segment.length_squared();
    let along = if length_squared <= f32::EPSILON {
        0.0
    } else {
        ((p - a).dot(segment) / length_squared).clamp(0.0, 1.0)
    };
    (along, p.distance(a + segment * along))
}

fn clamp(position: Vec3, arena: ArenaBounds) -> Vec3 {
    let rect = arena.inset(0.0);
    let xz = planar(position).clamp(rect.min, rect.max);
    Vec3::new(xz.x, position.y, xz.y)
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::ConfigureArena { bounds } => {
            world.arena = Some(bounds);
            out_events.push(Event::ArenaConfigured { bounds });
        }
        Command::SetPlayMode { mode } => {
            if world.play_mode != mode {
                world.play_mode = mode;
                out_events.push(Event::PlayModeChanged { mode });
            }
        }
        Command::Tick { dt } => {
            if world.play_mode == PlayMode::Running {
                world.advance(dt, out_events);
            }
        }
        Command::SpawnActor {
            template,
            position,
            origin,
        } => world.spawn(template, position, origin, out_events),
        Command::SetVelocity { actor, velocity } => {
            if let Some(actor) = world.actors.get_mut(&actor).filter(|actor| {
                actor.active && actor.controllable && !actor.health.is_knocked_back()
            }) {
                actor.velocity = Vec3::new(velocity.x, 0.0, velocity.z);
            }
        }
        Command::SetFacing { actor, facing } => {
            let facing = facing.normalize_or_zero();
            if facing == Vec2::ZERO {
                return;
            }
            if let Some(actor) = world
                .actors
                .get_mut(&actor)
                .filter(|actor| actor.active && actor.controllable)
            {
                if actor.facing.distance_squared(facing) > f32::EPSILON {
                    actor.facing = facing;
                    out_events.push(Event::FacingChanged {
                        actor: actor.id,
                        facing,
                    });
                }
            }
        }
        Command::ApplyDamage {
            target,
            amount,
            attacker,
        } => world.damage(target, amount, attacker, out_events),
        Command::Strike {
            attacker,
            center,
            radius,
            damage,
            targets,
        } => world.strike(attacker, center, radius, damage, targets, out_events),
        Command::FireProjectile {
            shooter,
            origin,
            direction,
            tuning,
            targets,
        } => world.fire(shooter, origin, direction, tuning, targets, out_events),
        Command::PlayCue { actor, cue } => {
            if world.actors.get(&actor).is_some_and(|actor| actor.active) {
                out_events.push(Event::CuePlayed { actor, cue });
            }
        }
        Command::SetDamageImmunity { actor, immune } => {
            if let Some(actor) = world.actors.get_mut(&actor) {
                actor.health.set_immune(immune);
            }
        }
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use std::time::Duration;

    use sprout_siege_core::{
        ActorId, ActorKind, ActorSnapshot, ActorView, ArenaBounds, KindMask, PlayMode, Vec3,
    };

    use super::World;

    /// Retrieves the welcome banner that adapters may display to players.
    #[must_use]
    pub fn welcome_banner(world: &World) -> &'static str {
        world.banner
    }

    /// Arena bounds configured by the level host.
    #[must_use]
    pub fn arena(world: &World) -> Option<ArenaBounds> {
        world.arena
    }

    /// Reports the active play mode.
    #[must_use]
    pub fn play_mode(world: &World) -> PlayMode {
        world.play_mode
    }

    /// Number of running ticks processed so far.
    #[must_use]
    pub fn tick_index(world: &World) -> u64 {
        world.tick_index
    }

    /// Simulated time accumulated by running ticks.
    #[must_use]
    pub fn elapsed(world: &World) -> Duration {
        world.elapsed
    }

    /// Captures a read-only view of every actor, active or not.
    #[must_use]
    pub fn actor_view(world: &World) -> ActorView {
        ActorView::from_snapshots(world.actors.values().map(|actor| actor.snapshot()).collect())
    }

    /// Captures the snapshot of a single actor.
    #[must_use]
    pub fn actor(world: &World, actor: ActorId) -> Option<ActorSnapshot> {
        world.actors.get(&actor).map(|actor| actor.snapshot())
    }

    /// Identifier of the first active player.
    #[must_use]
    pub fn player(world: &World) -> Option<ActorId> {
        world
            .actors
            .values()
            .find(|actor| actor.active && actor.kind == ActorKind::Player)
            .map(|actor| actor.id)
    }

    /// Active, collidable actors of the requested kinds whose bodies touch the sphere.
    #[must_use]
    pub fn overlap(world: &World, center: Vec3, radius: f32, targets: KindMask) -> Vec<ActorId> {
        world.overlap(center, radius, targets, None)
    }

    /// Number of projectiles in flight.
    #[must_use]
    pub fn projectile_count(world: &World) -> usize {
        world.projectiles.len()
    }
}

#[derive(Clone, Debug)]
struct Actor {
    id: ActorId,
    kind: ActorKind,
    position: Vec3,
    velocity: Vec3,
    facing: Vec2,
    health: HealthRecord,
    perception_radius: Option<f32>,
    active: bool,
    collidable: bool,
    controllable: bool,
    moving: bool,
}

impl Actor {
    fn snapshot(&self) -> sprout_siege_core::ActorSnapshot {
        sprout_siege_core::ActorSnapshot {
            id: self.id,
            kind: self.kind,
            position: self.position,
            velocity: self.velocity,
            facing: self.facing,
            health: self.health.snapshot(),
            active: self.active,
            collidable: self.collidable,
            controllable: self.controllable,
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct Projectile {
    shooter: ActorId,
    position: Vec3,
    velocity: Vec3,
    tuning: ProjectileTuning,
    targets: KindMask,
    expires_at: Duration,
}
