#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Sprout Siege simulation.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and pure systems. Adapters and systems submit
//! [`Command`] values describing desired mutations, the world executes those
//! commands via its `apply` entry point, and then broadcasts [`Event`] values
//! for systems to react to deterministically. Systems consume event streams,
//! query immutable snapshots such as [`ActorView`], and respond exclusively
//! with new command batches.
//!
//! Gameplay happens on the XZ plane of a Y-up coordinate system. Positions are
//! [`Vec3`] values and facings are [`Vec2`] values holding the X and Z
//! components.

mod config;
mod schedule;

use std::time::Duration;

pub use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

pub use config::{
    ActorTemplate, Archetype, ArchetypeTable, ArenaBounds, ArenaRect, ConfigError, EnemyProfile,
    HealthTuning, MeleeTuning, MovementTuning, ProjectileTuning, RangedTuning, SpawnerConfig,
    WaveDefinition,
};
pub use schedule::{TimerHandle, Timers};

/// Canonical banner emitted when the experience boots.
pub const WELCOME_BANNER: &str = "Welcome to Sprout Siege.";

/// Horizontal speed below which an actor is presented as standing still.
pub const MOVING_SPEED_THRESHOLD: f32 = 0.1;

/// Describes whether simulated time currently flows.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PlayMode {
    /// Standard mode where every tick advances the simulation.
    Running,
    /// Paused mode; ticks are ignored until the simulation resumes.
    Paused,
}

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Configures the rectangular arena supplied by the level host.
    ConfigureArena {
        /// Bounds of the arena on the XZ plane.
        bounds: ArenaBounds,
    },
    /// Requests that the world transition to the provided play mode.
    SetPlayMode {
        /// Mode the world should activate.
        mode: PlayMode,
    },
    /// Advances the simulation clock by the provided delta time.
    Tick {
        /// Duration of simulated time that elapsed since the previous tick.
        dt: Duration,
    },
    /// Requests that a new actor be created from the provided template.
    SpawnActor {
        /// Template describing the actor's kind, health and behaviour.
        template: ActorTemplate,
        /// Initial position of the actor.
        position: Vec3,
        /// Who requested the spawn.
        origin: SpawnOrigin,
    },
    /// Requests a new horizontal velocity for a controllable actor.
    SetVelocity {
        /// Actor whose velocity should change.
        actor: ActorId,
        /// Desired velocity; the vertical component is ignored.
        velocity: Vec3,
    },
    /// Requests that an actor face the provided planar direction.
    SetFacing {
        /// Actor whose facing should change.
        actor: ActorId,
        /// Desired facing on the XZ plane; normalised by the world.
        facing: Vec2,
    },
    /// Applies damage to a single actor through its health record.
    ApplyDamage {
        /// Actor receiving the damage.
        target: ActorId,
        /// Amount of hit points to subtract.
        amount: f32,
        /// Position of the attacker, used to resolve knockback.
        attacker: Option<Vec3>,
    },
    /// Performs a sphere overlap hit-test and damages every actor caught in it.
    Strike {
        /// Actor performing the strike.
        attacker: ActorId,
        /// Centre of the hit sphere.
        center: Vec3,
        /// Radius of the hit sphere.
        radius: f32,
        /// Damage applied to every actor caught by the strike.
        damage: f32,
        /// Kinds of actors the strike may hit.
        targets: KindMask,
    },
    /// Launches a projectile travelling along the provided planar direction.
    FireProjectile {
        /// Actor firing the projectile.
        shooter: ActorId,
        /// Position where the projectile appears.
        origin: Vec3,
        /// Planar direction of travel; normalised by the world.
        direction: Vec2,
        /// Speed, damage, size and lifetime of the projectile.
        tuning: ProjectileTuning,
        /// Kinds of actors the projectile may hit.
        targets: KindMask,
    },
    /// Forwards a fire-and-forget presentation cue for an actor.
    PlayCue {
        /// Actor the cue belongs to.
        actor: ActorId,
        /// Cue to present.
        cue: Cue,
    },
    /// Toggles explicit damage immunity on an actor.
    SetDamageImmunity {
        /// Actor whose immunity changes.
        actor: ActorId,
        /// Whether the actor ignores all further damage.
        immune: bool,
    },
}

/// Events broadcast by the world and by systems after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Duration of simulated time that elapsed in the tick.
        dt: Duration,
    },
    /// Announces that the simulation entered a new play mode.
    PlayModeChanged {
        /// Mode that became active after processing commands.
        mode: PlayMode,
    },
    /// Confirms that the arena bounds were configured.
    ArenaConfigured {
        /// Bounds applied to the arena.
        bounds: ArenaBounds,
    },
    /// Confirms that an actor was created.
    ActorSpawned {
        /// Identifier assigned to the new actor.
        actor: ActorId,
        /// Position the actor occupies after spawning.
        position: Vec3,
        /// Who requested the spawn.
        origin: SpawnOrigin,
        /// Template the actor was created from.
        template: ActorTemplate,
    },
    /// Reports that a target entered an observer's perception volume.
    PerceptionEntered {
        /// Actor owning the perception volume.
        observer: ActorId,
        /// Actor that entered the volume.
        target: ActorId,
    },
    /// Reports that a target left an observer's perception volume or vanished.
    PerceptionExited {
        /// Actor owning the perception volume.
        observer: ActorId,
        /// Actor that left the volume.
        target: ActorId,
    },
    /// Reports that damage reduced an actor's health.
    DamageApplied {
        /// Actor that received the damage.
        target: ActorId,
        /// Amount of damage requested.
        amount: f32,
        /// Health remaining after the hit.
        remaining: f32,
        /// Whether the hit started the death sequence.
        fatal: bool,
    },
    /// Reports that a damage request was ignored.
    DamageIgnored {
        /// Actor targeted by the request.
        target: ActorId,
        /// Reason the damage was ignored.
        reason: DamageRejection,
    },
    /// Reports that a hit pushed an actor away from its attacker.
    KnockbackStarted {
        /// Actor pushed by the hit.
        actor: ActorId,
        /// Velocity imparted by the impulse.
        velocity: Vec3,
    },
    /// Reports that an actor regained control after a knockback.
    KnockbackEnded {
        /// Actor that regained control.
        actor: ActorId,
    },
    /// Reports that an actor's post-hit invulnerability window elapsed.
    InvulnerabilityEnded {
        /// Actor that can be damaged again.
        actor: ActorId,
    },
    /// Reports that an actor started its death sequence and lost control.
    DeathStarted {
        /// Actor that died.
        actor: ActorId,
        /// Kind of the actor that died.
        kind: ActorKind,
    },
    /// Reports that an actor left the arena and stopped colliding.
    ActorDeactivated {
        /// Actor that was deactivated.
        actor: ActorId,
        /// Whether the actor was dead when it was deactivated.
        dead: bool,
    },
    /// Fire-and-forget presentation cue.
    CuePlayed {
        /// Actor the cue belongs to.
        actor: ActorId,
        /// Cue to present.
        cue: Cue,
    },
    /// Reports that an actor started or stopped moving.
    MovingChanged {
        /// Actor whose moving flag changed.
        actor: ActorId,
        /// Whether the actor is now moving.
        moving: bool,
    },
    /// Reports that an actor turned to face a new direction.
    FacingChanged {
        /// Actor that turned.
        actor: ActorId,
        /// New planar facing.
        facing: Vec2,
    },
    /// Confirms that a projectile was launched.
    ProjectileFired {
        /// Identifier of the projectile.
        projectile: ProjectileId,
        /// Actor that fired the projectile.
        shooter: ActorId,
        /// Launch position.
        position: Vec3,
        /// Launch velocity.
        velocity: Vec3,
    },
    /// Reports that a projectile struck an actor and was consumed.
    ProjectileHit {
        /// Identifier of the projectile.
        projectile: ProjectileId,
        /// Actor struck by the projectile.
        target: ActorId,
    },
    /// Reports that a projectile reached the end of its lifetime.
    ProjectileExpired {
        /// Identifier of the projectile.
        projectile: ProjectileId,
    },
    /// Announces the start of a wave.
    WaveStarted {
        /// Wave that started.
        wave: WaveId,
        /// Display name of the wave.
        name: String,
        /// Number of enemies the wave will spawn.
        count: u32,
    },
    /// Announces that every enemy of a wave was emitted.
    WaveSpawningFinished {
        /// Wave whose spawning finished.
        wave: WaveId,
    },
    /// Announces that every enemy of a wave died.
    WaveCleared {
        /// Wave that was cleared.
        wave: WaveId,
    },
    /// Announces that the final wave was cleared.
    AllWavesCompleted,
    /// Reports the integer health displayed for the plant objective.
    PlantHealthChanged {
        /// Plant actor.
        plant: ActorId,
        /// Remaining health rounded up to whole points.
        health: u32,
        /// Maximum health in whole points.
        max: u32,
    },
    /// Announces that the plant finished growing and its trigger is open.
    PlantGrown {
        /// Plant actor.
        plant: ActorId,
    },
    /// Requests that the host load the next scene.
    LevelAdvanceRequested {
        /// Name of the scene to load.
        scene: String,
    },
}

/// Fire-and-forget presentation cues.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cue {
    /// Attack animation or sound.
    Attack,
    /// Hurt flash for a non-fatal hit.
    Damage,
    /// Dying presentation.
    Death,
    /// Dash burst.
    Dash,
    /// Plant growth animation.
    Grow,
}

/// Reasons a damage request may be ignored by the health component.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DamageRejection {
    /// The target already died.
    Dead,
    /// The target is inside its post-hit invulnerability window.
    Invulnerable,
    /// The target was made immune to damage.
    Immune,
    /// The target is not known to the world or no longer active.
    MissingTarget,
}

/// Outcome of a single damage application.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct DamageResult {
    /// Whether the damage changed the health record.
    pub applied: bool,
    /// Whether the damage killed the actor.
    pub became_fatal: bool,
}

/// Who requested an actor spawn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SpawnOrigin {
    /// Actor placed by the level host.
    Level,
    /// Actor emitted by the wave spawner for the provided wave.
    Wave(WaveId),
}

/// Broad classification of an actor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorKind {
    /// The player character.
    Player,
    /// A hostile actor driven by the enemy behaviour state machine.
    Enemy,
    /// A destructible object such as the plant objective.
    Destructible,
}

/// Set of [`ActorKind`] values used to filter hit-tests.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct KindMask(u8);

impl KindMask {
    /// Mask matching only players.
    pub const PLAYERS: Self = Self::of(ActorKind::Player);
    /// Mask matching only enemies.
    pub const ENEMIES: Self = Self::of(ActorKind::Enemy);
    /// Mask matching only destructibles.
    pub const DESTRUCTIBLES: Self = Self::of(ActorKind::Destructible);

    /// Creates a mask matching a single kind.
    #[must_use]
    pub const fn of(kind: ActorKind) -> Self {
        Self(match kind {
            ActorKind::Player => 0b001,
            ActorKind::Enemy => 0b010,
            ActorKind::Destructible => 0b100,
        })
    }

    /// Returns a mask matching either operand.
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Reports whether the mask matches the provided kind.
    #[must_use]
    pub const fn contains(self, kind: ActorKind) -> bool {
        self.0 & Self::of(kind).0 != 0
    }
}

/// Behaviour classification of an enemy, fixed at creation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BehaviorType {
    /// Waits in place until a target is perceived.
    Stationary,
    /// Walks a cyclic patrol route until a target is perceived.
    Patrol,
    /// Keeps its distance and fires projectiles.
    Ranged,
}

/// State of the enemy behaviour state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EnemyState {
    /// Standing still without a target.
    Idle,
    /// Walking the patrol route.
    Patrolling,
    /// Moving toward the target.
    Chasing,
    /// Holding position and striking the target in melee range.
    MeleeAttacking,
    /// Keeping a stand-off distance and firing projectiles.
    RangedAttacking,
}

/// Unique identifier assigned to an actor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActorId(u32);

impl ActorId {
    /// Creates a new actor identifier with the provided numeric value.
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

/// Unique identifier assigned to a projectile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProjectileId(u32);

impl ProjectileId {
    /// Creates a new projectile identifier with the provided numeric value.
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

/// Identifier of an actor archetype registered in an [`ArchetypeTable`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ArchetypeId(u32);

impl ArchetypeId {
    /// Creates a new archetype identifier with the provided numeric value.
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

/// Zero-based index of a wave in the spawner configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WaveId(u32);

impl WaveId {
    /// Creates a new wave identifier with the provided index.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the wave index.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Immutable copy of a health record used for queries.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HealthSnapshot {
    /// Remaining hit points.
    pub current: f32,
    /// Maximum hit points.
    pub max: f32,
    /// Whether the actor died.
    pub dead: bool,
    /// Whether the actor is inside its invulnerability window.
    pub invulnerable: bool,
    /// Whether the actor is locked out of control by a knockback.
    pub knocked_back: bool,
    /// Whether the actor ignores all damage.
    pub immune: bool,
}

/// Immutable representation of a single actor used for queries.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ActorSnapshot {
    /// Unique identifier assigned to the actor.
    pub id: ActorId,
    /// Kind of the actor.
    pub kind: ActorKind,
    /// Current position.
    pub position: Vec3,
    /// Current velocity.
    pub velocity: Vec3,
    /// Current planar facing.
    pub facing: Vec2,
    /// Copy of the actor's health record.
    pub health: HealthSnapshot,
    /// Whether the actor is still part of the simulation.
    pub active: bool,
    /// Whether the actor can be hit by overlap queries.
    pub collidable: bool,
    /// Whether movement and AI commands still apply to the actor.
    pub controllable: bool,
}

/// Read-only snapshot describing all actors in the arena.
#[derive(Clone, Debug, Default)]
pub struct ActorView {
    snapshots: Vec<ActorSnapshot>,
}

impl ActorView {
    /// Creates a new actor view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<ActorSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured actor snapshots in deterministic order.
    pub fn iter(&self) -> impl Iterator<Item = &ActorSnapshot> {
        self.snapshots.iter()
    }

    /// Looks up the snapshot of a single actor.
    #[must_use]
    pub fn get(&self, actor: ActorId) -> Option<&ActorSnapshot> {
        self.snapshots
            .binary_search_by_key(&actor, |snapshot| snapshot.id)
            .ok()
            .map(|index| &self.snapshots[index])
    }

    /// Number of captured snapshots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Reports whether the view is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<ActorSnapshot> {
        self.snapshots
    }
}

/// Projects a position onto the horizontal XZ plane.
#[must_use]
pub fn planar(position: Vec3) -> Vec2 {
    Vec2::new(position.x, position.z)
}

/// Lifts a planar vector back into 3D space with a zero vertical component.
#[must_use]
pub fn lift(planar: Vec2) -> Vec3 {
    Vec3::new(planar.x, 0.0, planar.y)
}

/// Distance between two positions measured on the XZ plane.
#[must_use]
pub fn planar_distance(from: Vec3, to: Vec3) -> f32 {
    planar(from).distance(planar(to))
}

/// Normalised planar direction from one position to another, if they differ.
#[must_use]
pub fn planar_direction(from: Vec3, to: Vec3) -> Option<Vec2> {
    let delta = planar(to) - planar(from);
    if delta.length_squared() <= f32::EPSILON {
        None
    } else {
        Some(delta.normalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_mask_matches_union_members_only() {
        let mask = KindMask::PLAYERS.union(KindMask::DESTRUCTIBLES);
        assert!(mask.contains(ActorKind::Player));
        assert!(mask.contains(ActorKind::Destructible));
        assert!(!mask.contains(ActorKind::Enemy));
        assert!(!KindMask::ENEMIES.contains(ActorKind::Player));
    }

    #[test]
    fn actor_view_lookup_uses_sorted_order() {
        let view = ActorView::from_snapshots(vec![snapshot(7), snapshot(2), snapshot(4)]);
        let ids: Vec<u32> = view.iter().map(|snapshot| snapshot.id.get()).collect();
        assert_eq!(ids, vec![2, 4, 7]);
        assert_eq!(view.get(ActorId::new(4)).map(|s| s.id), Some(ActorId::new(4)));
        assert!(view.get(ActorId::new(5)).is_none());
    }

    #[test]
    fn planar_helpers_ignore_height() {
        let from = Vec3::new(0.0, 10.0, 0.0);
        let to = Vec3::new(3.0, -4.0, 4.0);
        assert!((planar_distance(from, to) - 5.0).abs() < 1e-6);
        let direction = planar_direction(from, to).expect("distinct positions");
        assert!((direction - Vec2::new(0.6, 0.8)).length() < 1e-6);
        assert!(planar_direction(from, Vec3::new(0.0, 3.0, 0.0)).is_none());
    }

    fn snapshot(id: u32) -> ActorSnapshot {
        ActorSnapshot {
            id: ActorId::new(id),
            kind: ActorKind::Enemy,
            position: Vec3::ZERO,
            velocity: Vec3::ZERO,
            facing: Vec2::X,
            health: HealthSnapshot {
                current: 1.0,
                max: 1.0,
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
}
