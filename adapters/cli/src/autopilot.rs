//! Scripted input used when the runner plays the encounter by itself.

use sprout_siege_core::{
    planar_direction, planar_distance, ActorId, ActorKind, ActorSnapshot, ActorView, Vec2, Vec3,
};
use sprout_siege_system_player_control::PlayerInput;

/// Distance at which the autopilot swings instead of walking.
const SWING_DISTANCE: f32 = 1.6;
/// Distance above which the autopilot dashes to close the gap.
const DASH_DISTANCE: f32 = 7.0;

/// Input that walks toward the nearest living enemy and attacks it, or heads
/// for `goal` once the arena is clear.
pub(crate) fn steer(actors: &ActorView, player: ActorId, goal: Option<Vec3>) -> PlayerInput {
    let Some(me) = actors.get(player).filter(|snapshot| !snapshot.health.dead) else {
        return PlayerInput::default();
    };

    if let Some(enemy) = nearest_enemy(actors, me) {
        let distance = planar_distance(me.position, enemy.position);
        let movement = planar_direction(me.position, enemy.position).unwrap_or(Vec2::ZERO);
        return PlayerInput {
            movement,
            dash: distance > DASH_DISTANCE,
            attack: distance <= SWING_DISTANCE,
        };
    }

    let movement = goal
        .and_then(|goal| planar_direction(me.position, goal))
        .unwrap_or(Vec2::ZERO);
    PlayerInput {
        movement,
        ..PlayerInput::default()
    }
}

fn nearest_enemy<'view>(actors: &'view ActorView, me: &ActorSnapshot) -> Option<&'view ActorSnapshot> {
    actors
        .iter()
        .filter(|snapshot| {
            snapshot.kind == ActorKind::Enemy && snapshot.active && !snapshot.health.dead
        })
        .min_by(|a, b| {
            planar_distance(me.position, a.position)
                .total_cmp(&planar_distance(me.position, b.position))
                .then(a.id.cmp(&b.id))
        })
}
