#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Enemy behaviour state machine driving patrols, chases and attacks.
//!
//! Every enemy spawned with an [`EnemyProfile`] gets a brain. Brains are
//! stepped once per running tick in ascending [`ActorId`] order and answer
//! with velocity, facing, strike and projectile commands.

use std::{collections::BTreeMap, time::Duration};

use log::{debug, warn};
use sprout_siege_core::{
    lift, planar, planar_direction, planar_distance, ActorId, ActorSnapshot, ActorView,
    BehaviorType, Command, Cue, EnemyProfile, EnemyState, Event, KindMask, PlayMode, TimerHandle,
    Timers, Vec2, Vec3, MOVING_SPEED_THRESHOLD,
};

/// Kinds an enemy may hurt with its attacks.
const HOSTILE_TARGETS: KindMask = KindMask::PLAYERS.union(KindMask::DESTRUCTIBLES);

/// Pure system that reacts to world events and emits enemy commands.
#[derive(Debug)]
pub struct EnemyAi {
    brains: BTreeMap<ActorId, Brain>,
    waits: Timers<ActorId>,
    now: Duration,
    play_mode: PlayMode,
}

impl EnemyAi {
    /// Creates a system without any registered enemy.
    #[must_use]
    pub fn new() -> Self {
        Self {
            brains: BTreeMap::new(),
            waits: Timers::new(),
            now: Duration::ZERO,
            play_mode: PlayMode::Running,
        }
    }

    /// Consumes world events and the actor view to emit enemy commands.
    pub fn handle(&mut self, events: &[Event], actors: &ActorView, out: &mut Vec<Command>) {
        let mut ticked = false;
        for event in events {
            match event {
                Event::PlayModeChanged { mode } => self.play_mode = *mode,
                Event::TimeAdvanced { dt } => {
                    self.now = self.now.saturating_add(*dt);
                    ticked = true;
                }
                Event::ActorSpawned {
                    actor, template, ..
                } => {
                    if let Some(profile) = &template.enemy {
                        self.register(*actor, profile.clone());
                    }
                }
                Event::DeathStarted { actor, .. } | Event::ActorDeactivated { actor, .. } => {
                    if let Some(wait) = self.brains.remove(actor).and_then(|brain| brain.wait) {
                        self.waits.cancel(&wait);
                    }
                }
                Event::PerceptionEntered { observer, target } => {
                    if let Some(brain) = self.brains.get_mut(observer) {
                        if let Some(wait) = brain.wait.take() {
                            self.waits.cancel(&wait);
                        }
                        brain.target = Some(*target);
                        brain.transition(*observer, EnemyState::Chasing);
                    }
                }
                Event::PerceptionExited { observer, target } => {
                    if let Some(brain) = self.brains.get_mut(observer) {
                        if brain.target == Some(*target) {
                            brain.target = None;
                            let fallback = brain.default_state();
                            brain.transition(*observer, fallback);
                        }
                    }
                }
                _ => {}
            }
        }

        if !ticked || self.play_mode != PlayMode::Running {
            return;
        }

        for actor in self.waits.drain_due(self.now) {
            if let Some(brain) = self.brains.get_mut(&actor) {
                brain.wait = None;
                brain.advance_waypoint();
            }
        }

        let now = self.now;
        for (id, brain) in &mut self.brains {
            let Some(me) = actors
                .get(*id)
                .filter(|snapshot| snapshot.active && snapshot.controllable)
            else {
                continue;
            };
            if self.waits.is_pending(*id) {
                continue;
            }
            brain.step(me, actors, now, &mut self.waits, out);
        }
    }

    /// Current state of an enemy's state machine.
    #[must_use]
    pub fn state_of(&self, actor: ActorId) -> Option<EnemyState> {
        self.brains.get(&actor).map(|brain| brain.state)
    }

    /// Target currently pursued by an enemy.
    #[must_use]
    pub fn target_of(&self, actor: ActorId) -> Option<ActorId> {
        self.brains.get(&actor).and_then(|brain| brain.target)
    }

    /// Index of the waypoint an enemy currently walks toward.
    #[must_use]
    pub fn patrol_index(&self, actor: ActorId) -> Option<usize> {
        self.brains.get(&actor).map(|brain| brain.patrol_index)
    }

    /// Reports whether an enemy is suspended at a waypoint.
    #[must_use]
    pub fn is_waiting(&self, actor: ActorId) -> bool {
        self.waits.is_pending(actor)
    }

    /// Number of enemies with a live brain.
    #[must_use]
    pub fn len(&self) -> usize {
        self.brains.len()
    }

    /// Reports whether no enemy is driven by the system.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.brains.is_empty()
    }

    fn register(&mut self, actor: ActorId, profile: EnemyProfile) {
        let id = actor.get();
        match profile.behavior {
            BehaviorType::Patrol if profile.patrol_route.is_empty() => {
                warn!("enemy {id} patrols without a route and will stay idle");
            }
            BehaviorType::Ranged if profile.ranged.projectile.is_none() => {
                warn!("enemy {id} has no projectile profile; ranged attacks are skipped");
            }
            BehaviorType::Stationary | BehaviorType::Patrol if profile.melee.attack_point.is_none() => {
                warn!("enemy {id} has no attack point; melee strikes are skipped");
            }
            _ => {}
        }
        let brain = Brain::new(profile);
        debug!("enemy {id} registered in state {:?}", brain.state);
        let _ = self.brains.insert(actor, brain);
    }
}

impl Default for EnemyAi {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
struct Brain {
    profile: EnemyProfile,
    state: EnemyState,
    target: Option<ActorId>,
    patrol_index: usize,
    wait: Option<TimerHandle<ActorId>>,
    melee_ready_at: Duration,
    ranged_ready_at: Duration,
    facing: Option<Vec2>,
}

impl Brain {
    fn new(profile: EnemyProfile) -> Self {
        let mut brain = Self {
            profile,
            state: EnemyState::Idle,
            target: None,
            patrol_index: 0,
            wait: None,
            melee_ready_at: Duration::ZERO,
            ranged_ready_at: Duration::ZERO,
            facing: None,
        };
        brain.state = brain.default_state();
        brain
    }

    fn default_state(&self) -> EnemyState {
        match self.profile.behavior {
            BehaviorType::Patrol if !self.profile.patrol_route.is_empty() => EnemyState::Patrolling,
            _ => EnemyState::Idle,
        }
    }

    fn transition(&mut self, actor: ActorId, next: EnemyState) {
        if self.state != next {
            debug!("enemy {} {:?} -> {:?}", actor.get(), self.state, next);
            self.state = next;
        }
    }

    fn advance_waypoint(&mut self) {
        let len = self.profile.patrol_route.len();
        if len > 0 {
            self.patrol_index = (self.patrol_index + 1) % len;
        }
    }

    fn step(
        &mut self,
        me: &ActorSnapshot,
        actors: &ActorView,
        now: Duration,
        waits: &mut Timers<ActorId>,
        out: &mut Vec<Command>,
    ) {
        let target = match self.target {
            Some(target) => match actors
                .get(target)
                .filter(|snapshot| snapshot.active && !snapshot.health.dead)
            {
                Some(snapshot) => Some(*snapshot),
                None => {
                    self.target = None;
                    let fallback = self.default_state();
                    self.transition(me.id, fallback);
                    None
                }
            },
            None => None,
        };

        let velocity = match (self.state, target) {
            (EnemyState::Patrolling, _) => self.patrol(me, now, waits),
            (EnemyState::Chasing, Some(target)) => self.chase(me, &target),
            (EnemyState::MeleeAttacking, Some(target)) => self.melee(me, &target, now, out),
            (EnemyState::RangedAttacking, Some(target)) => self.ranged(me, &target, now, out),
            (EnemyState::Idle, _) | (_, None) => Vec2::ZERO,
        };

        out.push(Command::SetVelocity {
            actor: me.id,
            velocity: lift(velocity),
        });

        let facing = match target {
            Some(target) => planar_direction(me.position, target.position),
            None if velocity.length() > MOVING_SPEED_THRESHOLD => Some(velocity.normalize()),
            None => None,
        };
        if let Some(facing) = facing {
            if self.facing != Some(facing) {
                self.facing = Some(facing);
                out.push(Command::SetFacing {
                    actor: me.id,
                    facing,
                });
            }
        }
    }

    fn patrol(&mut self, me: &ActorSnapshot, now: Duration, waits: &mut Timers<ActorId>) -> Vec2 {
        let Some(waypoint) = self.profile.patrol_route.get(self.patrol_index).copied() else {
            self.transition(me.id, EnemyState::Idle);
            return Vec2::ZERO;
        };
        let movement = self.profile.movement;
        if planar_distance(me.position, waypoint) < movement.arrival_threshold {
            self.wait = Some(waits.schedule(me.id, now, movement.patrol_wait));
            return Vec2::ZERO;
        }
        toward(me.position, waypoint) * movement.patrol_speed
    }

    fn chase(&mut self, me: &ActorSnapshot, target: &ActorSnapshot) -> Vec2 {
        let distance = planar_distance(me.position, target.position);
        if self.profile.behavior == BehaviorType::Ranged {
            if distance <= self.profile.ranged.attack_distance {
                self.transition(me.id, EnemyState::RangedAttacking);
                return Vec2::ZERO;
            }
        } else {
            let engage = self
                .profile
                .movement
                .stopping_distance
                .max(self.profile.melee.attack_range);
            if distance <= engage {
                self.transition(me.id, EnemyState::MeleeAttacking);
                return Vec2::ZERO;
            }
        }
        toward(me.position, target.position) * self.profile.movement.chase_speed
    }

    fn melee(
        &mut self,
        me: &ActorSnapshot,
        target: &ActorSnapshot,
        now: Duration,
        out: &mut Vec<Command>,
    ) -> Vec2 {
        let melee = self.profile.melee;
        if planar_distance(me.position, target.position) > melee.attack_range + melee.exit_margin {
            self.transition(me.id, EnemyState::Chasing);
            return Vec2::ZERO;
        }
        if now < self.melee_ready_at {
            return Vec2::ZERO;
        }
        self.melee_ready_at = now.saturating_add(melee.cooldown);
        out.push(Command::PlayCue {
            actor: me.id,
            cue: Cue::Attack,
        });
        if let Some(offset) = melee.attack_point {
            let forward = toward(me.position, target.position);
            out.push(Command::Strike {
                attacker: me.id,
                center: me.position + lift(forward) * offset,
                radius: melee.attack_range,
                damage: melee.damage,
                targets: HOSTILE_TARGETS,
            });
        }
        Vec2::ZERO
    }

    fn ranged(
        &mut self,
        me: &ActorSnapshot,
        target: &ActorSnapshot,
        now: Duration,
        out: &mut Vec<Command>,
    ) -> Vec2 {
        let ranged = self.profile.ranged;
        let speed = self.profile.movement.chase_speed;
        let distance = planar_distance(me.position, target.position);
        let forward = toward(me.position, target.position);

        if distance < ranged.retreat_distance {
            return -forward * speed;
        }
        if distance > ranged.attack_distance {
            self.transition(me.id, EnemyState::Chasing);
            return Vec2::ZERO;
        }
        if distance > ranged.stopping_distance {
            return forward * speed;
        }
        if now < self.ranged_ready_at {
            return Vec2::ZERO;
        }
        self.ranged_ready_at = now.saturating_add(ranged.cooldown);
        out.push(Command::PlayCue {
            actor: me.id,
            cue: Cue::Attack,
        });
        if let Some(projectile) = ranged.projectile {
            out.push(Command::FireProjectile {
                shooter: me.id,
                origin: me.position + lift(forward) * projectile.fire_offset,
                direction: forward,
                tuning: projectile,
                targets: HOSTILE_TARGETS,
            });
        }
        Vec2::ZERO
    }
}

fn toward(from: Vec3, to: Vec3) -> Vec2 {
    planar_direction(from, to).unwrap_or(Vec2::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sprout_siege_core::{ActorKind, HealthSnapshot};

    fn snapshot(id: u32, kind: ActorKind, position: Vec3) -> ActorSnapshot {
        ActorSnapshot {
            id: ActorId::new(id),
            kind,
            position,
            velocity: Vec3::ZERO,
            facing: Vec2::Y,
            health: HealthSnapshot {
                current: 10.0,
                max: 10.0,
                dead: false,
                invulnerable: false,
                knocked_back: false,
                immune: false,
            },
            active: true,
            collidable: true,
            controllable: true,
        }
    }

    #[test]
    fn patrol_without_route_starts_idle() {
        let brain = Brain::new(EnemyProfile::new(BehaviorType::Patrol));
        assert_eq!(brain.state, EnemyState::Idle);
        let brain = Brain::new(EnemyProfile::new(BehaviorType::Patrol).with_route(vec![Vec3::X]));
        assert_eq!(brain.state, EnemyState::Patrolling);
    }

    #[test]
    fn lost_target_returns_to_default_state() {
        let mut brain = Brain::new(EnemyProfile::new(BehaviorType::Stationary));
        brain.target = Some(ActorId::new(9));
        brain.state = EnemyState::Chasing;
        let me = snapshot(1, ActorKind::Enemy, Vec3::ZERO);
        let view = ActorView::from_snapshots(vec![me]);
        let mut waits = Timers::new();
        let mut out = Vec::new();

        brain.step(&me, &view, Duration::ZERO, &mut waits, &mut out);

        assert_eq!(brain.state, EnemyState::Idle);
        assert_eq!(brain.target, None);
        assert_eq!(
            out,
            vec![Command::SetVelocity {
                actor: me.id,
                velocity: Vec3::ZERO
            }]
        );
    }

    #[test]
    fn missing_attack_point_still_consumes_the_cooldown() {
        let mut profile = EnemyProfile::new(BehaviorType::Stationary);
        profile.melee.attack_point = None;
        let mut brain = Brain::new(profile);
        brain.state = EnemyState::MeleeAttacking;
        let me = snapshot(1, ActorKind::Enemy, Vec3::ZERO);
        let player = snapshot(2, ActorKind::Player, Vec3::new(0.5, 0.0, 0.0));
        let mut out = Vec::new();

        let _ = brain.melee(&me, &player, Duration::from_secs(1), &mut out);

        assert_eq!(
            out,
            vec![Command::PlayCue {
                actor: me.id,
                cue: Cue::Attack
            }]
        );
        assert_eq!(brain.melee_ready_at, Duration::from_secs(4));
    }
}
