#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure bootstrap system that prepares a Sprout Siege encounter.

use sprout_siege_core::{ActorTemplate, ArenaBounds, Command, HealthTuning, SpawnOrigin, Vec3};
use sprout_siege_world::{query, World};

/// Actor placed in the level by hand.
#[derive(Clone, Debug, PartialEq)]
pub struct PlacedActor {
    /// Template the actor is created from.
    pub template: ActorTemplate,
    /// Initial position.
    pub position: Vec3,
}

/// Everything the level host provides before the first tick.
#[derive(Clone, Debug, PartialEq)]
pub struct Level {
    /// Arena bounds.
    pub arena: ArenaBounds,
    /// Where the player starts.
    pub player_spawn: Vec3,
    /// Health tuning of the player.
    pub player_health: HealthTuning,
    /// The plant objective, if the level has one.
    pub plant: Option<PlacedActor>,
    /// Enemies present before the first wave, with their patrol routes.
    pub enemies: Vec<PlacedActor>,
}

impl Default for Level {
    fn default() -> Self {
        Self {
            arena: ArenaBounds::default(),
            player_spawn: Vec3::ZERO,
            player_health: HealthTuning::default(),
            plant: None,
            enemies: Vec::new(),
        }
    }
}

/// Produces data required to greet the player and populate the level.
#[derive(Debug, Default)]
pub struct Bootstrap;

impl Bootstrap {
    /// Derives the banner that should be shown when the experience starts.
    #[must_use]
    pub fn welcome_banner<'world>(&self, world: &'world World) -> &'world str {
        query::welcome_banner(world)
    }

    /// Arena the world was configured with, if any.
    #[must_use]
    pub fn arena(&self, world: &World) -> Option<ArenaBounds> {
        query::arena(world)
    }

    /// Initial command batch: arena first, then the player, the plant and placed enemies.
    #[must_use]
    pub fn encounter_commands(&self, level: &Level) -> Vec<Command> {
        let mut commands = vec![
            Command::ConfigureArena {
                bounds: level.arena,
            },
            Command::SpawnActor {
                template: ActorTemplate::player(level.player_health),
                position: level.player_spawn,
                origin: SpawnOrigin::Level,
            },
        ];
        commands.extend(
            level
                .plant
                .iter()
                .chain(level.enemies.iter())
                .map(|placed| Command::SpawnActor {
                    template: placed.template.clone(),
                    position: placed.position,
                    origin: SpawnOrigin::Level,
                }),
        );
        commands
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sprout_siege_core::{ActorKind, BehaviorType, EnemyProfile, Event};
    use sprout_siege_world as world;

    #[test]
    fn encounter_commands_populate_the_level_in_order() {
        let level = Level {
            plant: Some(PlacedActor {
                template: ActorTemplate::destructible(HealthTuning::destructible(6.0)),
                position: Vec3::new(0.0, 0.0, 2.0),
            }),
            enemies: vec![PlacedActor {
                template: ActorTemplate::enemy(
                    HealthTuning::default(),
                    EnemyProfile::new(BehaviorType::Patrol)
                        .with_route(vec![Vec3::new(5.0, 0.0, 5.0), Vec3::new(-5.0, 0.0, 5.0)]),
                    6.0,
                ),
                position: Vec3::new(5.0, 0.0, 5.0),
            }],
            ..Level::default()
        };

        let mut world = World::new();
        let mut events = Vec::new();
        for command in Bootstrap.encounter_commands(&level) {
            world::apply(&mut world, command, &mut events);
        }

        let kinds: Vec<ActorKind> = events
            .iter()
            .filter_map(|event| match event {
                Event::ActorSpawned { template, .. } => Some(template.kind),
                _ => None,
            })
            .collect();
        assert_eq!(
            kinds,
            vec![ActorKind::Player, ActorKind::Destructible, ActorKind::Enemy]
        );
        assert_eq!(Bootstrap.arena(&world), Some(ArenaBounds::default()));
        assert_eq!(Bootstrap.welcome_banner(&world), "Welcome to Sprout Siege.");
    }
}
