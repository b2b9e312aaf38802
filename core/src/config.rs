//! Tuning and configuration types shared by the world and its systems.

use std::{collections::BTreeMap, time::Duration};

use glam::{Vec2, Vec3};
use thiserror::Error;

use crate::{ActorKind, ArchetypeId, BehaviorType, WaveId};

/// Health, damage feedback and death sequencing parameters of an actor.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HealthTuning {
    /// Maximum and initial hit points.
    pub max_health: f32,
    /// Window after a non-fatal hit during which further damage is ignored.
    pub invulnerability: Duration,
    /// Horizontal speed imparted by a hit; zero disables knockback.
    pub knockback_force: f32,
    /// Duration of the movement lockout after a knockback.
    pub knockback_duration: Duration,
    /// Length of the dying presentation reported by the host.
    pub dying_duration: Duration,
    /// Additional delay before a dead non-player actor is deactivated.
    pub linger: Duration,
    /// Smallest amount a positive hit removes.
    pub minimum_hit: f32,
}

impl HealthTuning {
    /// Tuning for a static destructible with no hit feedback.
    #[must_use]
    pub fn destructible(max_health: f32) -> Self {
        Self {
            max_health,
            invulnerability: Duration::ZERO,
            knockback_force: 0.0,
            knockback_duration: Duration::ZERO,
            ..Self::default()
        }
    }
}

impl Default for HealthTuning {
    fn default() -> Self {
        Self {
            max_health: 10.0,
            invulnerability: Duration::from_millis(600),
            knockback_force: 8.0,
            knockback_duration: Duration::from_millis(180),
            dying_duration: Duration::from_millis(800),
            linger: Duration::from_secs(1),
            minimum_hit: 0.0,
        }
    }
}

/// Locomotion parameters of an enemy.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MovementTuning {
    /// Speed used while walking the patrol route.
    pub patrol_speed: f32,
    /// Speed used while chasing or retreating.
    pub chase_speed: f32,
    /// Distance at which a melee enemy stops chasing.
    pub stopping_distance: f32,
    /// Time spent at each waypoint before advancing.
    pub patrol_wait: Duration,
    /// Planar distance below which a waypoint counts as reached.
    pub arrival_threshold: f32,
}

impl Default for MovementTuning {
    fn default() -> Self {
        Self {
            patrol_speed: 1.5,
            chase_speed: 3.0,
            stopping_distance: 0.8,
            patrol_wait: Duration::from_secs(2),
            arrival_threshold: 0.6,
        }
    }
}

/// Melee attack parameters of an enemy.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MeleeTuning {
    /// Damage dealt to every actor caught by a strike.
    pub damage: f32,
    /// Minimum time between two strikes.
    pub cooldown: Duration,
    /// Radius of the strike and engagement distance.
    pub attack_range: f32,
    /// Extra distance beyond the attack range tolerated before chasing again.
    pub exit_margin: f32,
    /// Forward offset of the attack point; `None` when the actor has none.
    pub attack_point: Option<f32>,
}

impl Default for MeleeTuning {
    fn default() -> Self {
        Self {
            damage: 2.0,
            cooldown: Duration::from_secs(3),
            attack_range: 1.0,
            exit_margin: 0.2,
            attack_point: Some(0.5),
        }
    }
}

/// Projectile launched by a ranged enemy.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProjectileTuning {
    /// Travel speed.
    pub speed: f32,
    /// Damage dealt on impact.
    pub damage: f32,
    /// Radius of the projectile's hit sphere.
    pub hit_radius: f32,
    /// Time after which an unimpeded projectile disappears.
    pub lifetime: Duration,
    /// Forward offset of the fire point from the shooter.
    pub fire_offset: f32,
}

impl Default for ProjectileTuning {
    fn default() -> Self {
        Self {
            speed: 15.0,
            damage: 1.0,
            hit_radius: 0.3,
            lifetime: Duration::from_secs(5),
            fire_offset: 0.5,
        }
    }
}

/// Ranged attack parameters of an enemy.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RangedTuning {
    /// Distance within which the enemy starts its ranged attack.
    pub attack_distance: f32,
    /// Distance beyond which the enemy advances toward its target.
    pub stopping_distance: f32,
    /// Distance below which the enemy backs away from its target.
    pub retreat_distance: f32,
    /// Minimum time between two shots.
    pub cooldown: Duration,
    /// Projectile profile; `None` when the actor has none.
    pub projectile: Option<ProjectileTuning>,
}

impl Default for RangedTuning {
    fn default() -> Self {
        Self {
            attack_distance: 10.0,
            stopping_distance: 8.0,
            retreat_distance: 5.0,
            cooldown: Duration::from_secs(2),
            projectile: Some(ProjectileTuning::default()),
        }
    }
}

/// Behaviour configuration of an enemy actor.
#[derive(Clone, Debug, PartialEq)]
pub struct EnemyProfile {
    /// Behaviour classification fixed at creation.
    pub behavior: BehaviorType,
    /// Locomotion parameters.
    pub movement: MovementTuning,
    /// Waypoints visited cyclically by patrolling enemies.
    pub patrol_route: Vec<Vec3>,
    /// Melee attack parameters.
    pub melee: MeleeTuning,
    /// Ranged attack parameters.
    pub ranged: RangedTuning,
}

impl EnemyProfile {
    /// Creates a profile with default tuning for the provided behaviour.
    #[must_use]
    pub fn new(behavior: BehaviorType) -> Self {
        Self {
            behavior,
            movement: MovementTuning::default(),
            patrol_route: Vec::new(),
            melee: MeleeTuning::default(),
            ranged: RangedTuning::default(),
        }
    }

    /// Replaces the patrol route.
    #[must_use]
    pub fn with_route(mut self, route: Vec<Vec3>) -> Self {
        self.patrol_route = route;
        self
    }
}

/// Everything required to create an actor.
#[derive(Clone, Debug, PartialEq)]
pub struct ActorTemplate {
    /// Kind of the actor.
    pub kind: ActorKind,
    /// Health record parameters.
    pub health: HealthTuning,
    /// Radius of the perception sphere used to notice players.
    pub perception_radius: Option<f32>,
    /// Behaviour profile for enemies.
    pub enemy: Option<EnemyProfile>,
    /// Archetype the template was taken from, if any.
    pub archetype: Option<ArchetypeId>,
}

impl ActorTemplate {
    /// Template of the player character.
    #[must_use]
    pub fn player(health: HealthTuning) -> Self {
        Self {
            kind: ActorKind::Player,
            health,
            perception_radius: None,
            enemy: None,
            archetype: None,
        }
    }

    /// Template of an enemy with the provided profile and perception radius.
    #[must_use]
    pub fn enemy(health: HealthTuning, profile: EnemyProfile, perception_radius: f32) -> Self {
        Self {
            kind: ActorKind::Enemy,
            health,
            perception_radius: Some(perception_radius),
            enemy: Some(profile),
            archetype: None,
        }
    }

    /// Template of a destructible object.
    #[must_use]
    pub fn destructible(health: HealthTuning) -> Self {
        Self {
            kind: ActorKind::Destructible,
            health,
            perception_radius: None,
            enemy: None,
            archetype: None,
        }
    }
}

/// Rectangular arena on the XZ plane.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ArenaBounds {
    /// Centre of the arena (X, Z).
    pub center: Vec2,
    /// Extent of the arena along X and Z.
    pub size: Vec2,
}

impl ArenaBounds {
    /// Creates arena bounds centred on the origin.
    #[must_use]
    pub const fn centered(size: Vec2) -> Self {
        Self {
            center: Vec2::ZERO,
            size,
        }
    }

    /// Rectangle left after shrinking every edge by `margin`.
    #[must_use]
    pub fn inset(&self, margin: f32) -> ArenaRect {
        let half = self.size * 0.5 - Vec2::splat(margin);
        ArenaRect {
            min: self.center - half,
            max: self.center + half,
        }
    }

    /// Reports whether the arena is strictly larger than twice `margin` on both axes.
    #[must_use]
    pub fn fits_margin(&self, margin: f32) -> bool {
        self.size.x > 2.0 * margin && self.size.y > 2.0 * margin
    }
}

impl Default for ArenaBounds {
    fn default() -> Self {
        Self::centered(Vec2::new(40.0, 40.0))
    }
}

/// Axis-aligned rectangle on the XZ plane.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ArenaRect {
    /// Minimum X and Z.
    pub min: Vec2,
    /// Maximum X and Z.
    pub max: Vec2,
}

impl ArenaRect {
    /// Reports whether the planar point lies inside the rectangle, edges included.
    #[must_use]
    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= self.min.x && point.x <= self.max.x && point.y >= self.min.y && point.y <= self.max.y
    }
}

/// Named actor template registered for the spawner.
#[derive(Clone, Debug, PartialEq)]
pub struct Archetype {
    /// Display name.
    pub name: String,
    /// Template actors are created from.
    pub template: ActorTemplate,
}

/// Registry of archetypes keyed by identifier.
#[derive(Clone, Debug, Default)]
pub struct ArchetypeTable {
    entries: BTreeMap<ArchetypeId, Archetype>,
}

impl ArchetypeTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an archetype, returning the identifier assigned to it.
    pub fn register(&mut self, name: impl Into<String>, template: ActorTemplate) -> ArchetypeId {
        let id = ArchetypeId::new(self.entries.len() as u32);
        let mut template = template;
        template.archetype = Some(id);
        let _ = self.entries.insert(
            id,
            Archetype {
                name: name.into(),
                template,
            },
        );
        id
    }

    /// Looks up an archetype.
    #[must_use]
    pub fn get(&self, id: ArchetypeId) -> Option<&Archetype> {
        self.entries.get(&id)
    }

    /// Finds an archetype by display name.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<ArchetypeId> {
        self.entries
            .iter()
            .find(|(_, archetype)| archetype.name == name)
            .map(|(id, _)| *id)
    }

    /// Number of registered archetypes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Reports whether the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Definition of a single wave.
#[derive(Clone, Debug, PartialEq)]
pub struct WaveDefinition {
    /// Display name.
    pub name: String,
    /// Number of enemies the wave spawns.
    pub count: u32,
    /// Archetypes a spawn may pick from.
    pub archetypes: Vec<ArchetypeId>,
    /// Delay between two consecutive spawns.
    pub spawn_interval: Duration,
}

/// Configuration of the wave spawner.
#[derive(Clone, Debug, PartialEq)]
pub struct SpawnerConfig {
    /// Waves traversed in order.
    pub waves: Vec<WaveDefinition>,
    /// Delay between a wave clearing and the next wave starting.
    pub time_between_waves: Duration,
    /// Delay before the first wave.
    pub initial_delay: Duration,
    /// Arena the enemies spawn into.
    pub arena: ArenaBounds,
    /// Distance kept between spawn points and the arena edges.
    pub edge_margin: f32,
    /// Seed of the spawner's random number generator.
    pub rng_seed: u64,
}

impl SpawnerConfig {
    /// Creates a configuration with default timings for the provided waves.
    #[must_use]
    pub fn new(waves: Vec<WaveDefinition>) -> Self {
        Self {
            waves,
            time_between_waves: Duration::from_secs(5),
            initial_delay: Duration::from_secs(3),
            arena: ArenaBounds::default(),
            edge_margin: 2.0,
            rng_seed: 0,
        }
    }

    /// Checks the configuration against the provided archetype table.
    pub fn validate(&self, archetypes: &ArchetypeTable) -> Result<(), ConfigError> {
        if self.waves.is_empty() {
            return Err(ConfigError::NoWaves);
        }
        let rect = self.arena.inset(self.edge_margin);
        if !self.arena.center.is_finite()
            || !self.arena.size.is_finite()
            || !self.edge_margin.is_finite()
            || !(rect.max - rect.min).is_finite()
        {
            return Err(ConfigError::NonFiniteArena {
                center: self.arena.center,
                size: self.arena.size,
                margin: self.edge_margin,
            });
        }
        if !self.arena.fits_margin(self.edge_margin) {
            return Err(ConfigError::ArenaTooSmall {
                width: self.arena.size.x,
                depth: self.arena.size.y,
                margin: self.edge_margin,
            });
        }
        for (index, wave) in self.waves.iter().enumerate() {
            if let Some(missing) = wave
                .archetypes
                .iter()
                .find(|archetype| archetypes.get(**archetype).is_none())
            {
                return Err(ConfigError::UnknownArchetype {
                    wave: WaveId::new(index as u32),
                    archetype: *missing,
                });
            }
        }
        Ok(())
    }
}

/// Reasons a spawner configuration is rejected.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum ConfigError {
    /// No waves were configured.
    #[error("no waves are configured")]
    NoWaves,
    /// The arena is not larger than twice the edge margin.
    #[error("arena {width}x{depth} is too small for an edge margin of {margin}")]
    ArenaTooSmall {
        /// Arena extent along X.
        width: f32,
        /// Arena extent along Z.
        depth: f32,
        /// Configured edge margin.
        margin: f32,
    },
    /// The arena or its margin is not a finite rectangle.
    #[error("arena centred at {center} with size {size} and margin {margin} is not finite")]
    NonFiniteArena {
        /// Configured arena centre.
        center: Vec2,
        /// Configured arena extent.
        size: Vec2,
        /// Configured edge margin.
        margin: f32,
    },
    /// A wave references an archetype missing from the table.
    #[error("wave {} references unknown archetype {}", .wave.get(), .archetype.get())]
    UnknownArchetype {
        /// Offending wave.
        wave: WaveId,
        /// Missing archetype.
        archetype: ArchetypeId,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wave(count: u32, archetypes: Vec<ArchetypeId>) -> WaveDefinition {
        WaveDefinition {
            name: format!("wave of {count}"),
            count,
            archetypes,
            spawn_interval: Duration::from_millis(500),
        }
    }

    #[test]
    fn validation_rejects_empty_waves() {
        let config = SpawnerConfig::new(Vec::new());
        assert_eq!(config.validate(&ArchetypeTable::new()), Err(ConfigError::NoWaves));
    }

    #[test]
    fn validation_rejects_arena_within_margin() {
        let mut config = SpawnerConfig::new(vec![wave(1, Vec::new())]);
        config.arena = ArenaBounds::centered(Vec2::new(4.0, 40.0));
        assert!(matches!(
            config.validate(&ArchetypeTable::new()),
            Err(ConfigError::ArenaTooSmall { .. })
        ));
    }

    #[test]
    fn validation_rejects_non_finite_arenas() {
        let shifted = |center: Vec2, size: Vec2| ArenaBounds { center, size };
        let broken = [
            (shifted(Vec2::new(f32::NAN, 0.0), Vec2::splat(40.0)), 2.0),
            (ArenaBounds::centered(Vec2::new(f32::INFINITY, 40.0)), 2.0),
            (ArenaBounds::default(), f32::NAN),
            (shifted(Vec2::splat(f32::MAX), Vec2::splat(f32::MAX)), 0.0),
        ];
        for (arena, margin) in broken {
            let mut config = SpawnerConfig::new(vec![wave(1, Vec::new())]);
            config.arena = arena;
            config.edge_margin = margin;
            assert!(
                matches!(
                    config.validate(&ArchetypeTable::new()),
                    Err(ConfigError::NonFiniteArena { .. })
                ),
                "{arena:?} with margin {margin} was accepted"
            );
        }
    }

    #[test]
    fn validation_rejects_unknown_archetypes_but_accepts_empty_lists() {
        let mut table = ArchetypeTable::new();
        let grunt = table.register(
            "grunt",
            ActorTemplate::enemy(
                HealthTuning::default(),
                EnemyProfile::new(BehaviorType::Stationary),
                6.0,
            ),
        );
        let config = SpawnerConfig::new(vec![wave(2, vec![grunt]), wave(1, Vec::new())]);
        assert_eq!(config.validate(&table), Ok(()));

        let config = SpawnerConfig::new(vec![wave(2, vec![ArchetypeId::new(9)])]);
        assert_eq!(
            config.validate(&table),
            Err(ConfigError::UnknownArchetype {
                wave: WaveId::new(0),
                archetype: ArchetypeId::new(9),
            })
        );
    }

    #[test]
    fn registered_templates_remember_their_archetype() {
        let mut table = ArchetypeTable::new();
        let id = table.register("plant", ActorTemplate::destructible(HealthTuning::destructible(6.0)));
        assert_eq!(table.find("plant"), Some(id));
        assert_eq!(table.get(id).and_then(|entry| entry.template.archetype), Some(id));
    }

    #[test]
    fn inset_shrinks_every_edge() {
        let rect = ArenaBounds::default().inset(2.0);
        assert_eq!(rect.min, Vec2::new(-18.0, -18.0));
        assert_eq!(rect.max, Vec2::new(18.0, 18.0));
        assert!(rect.contains(Vec2::new(18.0, -18.0)));
        assert!(!rect.contains(Vec2::new(18.5, 0.0)));
    }
}
