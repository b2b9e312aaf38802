use std::time::Duration;

use sprout_siege_core::{
    ActorId, ActorTemplate, BehaviorType, Command, Cue, EnemyProfile, Event, HealthTuning,
    SpawnOrigin, Vec2, Vec3,
};
use sprout_siege_system_player_control::{PlayerControl, PlayerInput};
use sprout_siege_world::{self as world, query, World};

const STEP: Duration = Duration::from_millis(50);

struct Harness {
    world: World,
    control: PlayerControl,
    pending: Vec<Event>,
}

impl Harness {
    fn new() -> Self {
        Self {
            world: World::new(),
            control: PlayerControl::default(),
            pending: Vec::new(),
        }
    }

    fn spawn(&mut self, template: ActorTemplate, position: Vec3) -> ActorId {
        let before = self.pending.len();
        world::apply(
            &mut self.world,
            Command::SpawnActor {
                template,
                position,
                origin: SpawnOrigin::Level,
            },
            &mut self.pending,
        );
        self.pending[before..]
            .iter()
            .find_map(|event| match event {
                Event::ActorSpawned { actor, .. } => Some(*actor),
                _ => None,
            })
            .expect("spawn confirmed")
    }

    fn frame(&mut self, input: PlayerInput) -> (Vec<Event>, Vec<Command>) {
        let mut events = std::mem::take(&mut self.pending);
        world::apply(&mut self.world, Command::Tick { dt: STEP }, &mut events);
        let view = query::actor_view(&self.world);
        let mut commands = Vec::new();
        self.control.handle(&events, input, &view, &mut commands);
        for command in commands.iter().cloned() {
            world::apply(&mut self.world, command, &mut self.pending);
        }
        (events, commands)
    }

    fn velocity(&self, actor: ActorId) -> Vec3 {
        query::actor(&self.world, actor).expect("actor exists").velocity
    }
}

fn idle() -> PlayerInput {
    PlayerInput::default()
}

fn target_dummy() -> ActorTemplate {
    let mut template = ActorTemplate::enemy(
        HealthTuning::default(),
        EnemyProfile::new(BehaviorType::Stationary),
        1.0,
    );
    template.perception_radius = None;
    template
}

#[test]
fn diagonal_input_is_clamped_to_move_speed() {
    let mut harness = Harness::new();
    let player = harness.spawn(ActorTemplate::player(HealthTuning::default()), Vec3::ZERO);

    let _ = harness.frame(PlayerInput {
        movement: Vec2::new(1.0, 1.0),
        ..idle()
    });

    assert!((harness.velocity(player).length() - 5.0).abs() < 1e-4);
}

#[test]
fn facing_follows_last_horizontal_input() {
    let mut harness = Harness::new();
    let player = harness.spawn(ActorTemplate::player(HealthTuning::default()), Vec3::ZERO);

    let (_, commands) = harness.frame(PlayerInput {
        movement: Vec2::new(-1.0, 0.0),
        ..idle()
    });
    assert!(commands.contains(&Command::SetFacing {
        actor: player,
        facing: Vec2::new(-1.0, 0.0)
    }));

    let (_, commands) = harness.frame(PlayerInput {
        movement: Vec2::new(0.0, 1.0),
        ..idle()
    });
    assert!(!commands
        .iter()
        .any(|command| matches!(command, Command::SetFacing { .. })));
    assert_eq!(harness.control.facing(), Vec2::new(-1.0, 0.0));
}

#[test]
fn attack_holds_still_strikes_after_wind_up_and_recovers() {
    let mut harness = Harness::new();
    let player = harness.spawn(ActorTemplate::player(HealthTuning::default()), Vec3::ZERO);
    let dummy = harness.spawn(target_dummy(), Vec3::new(1.5, 0.0, 0.0));
    let _ = harness.frame(idle());

    let (_, commands) = harness.frame(PlayerInput {
        movement: Vec2::new(1.0, 0.0),
        attack: true,
        ..idle()
    });
    assert!(commands.contains(&Command::PlayCue {
        actor: player,
        cue: Cue::Attack
    }));
    assert_eq!(harness.velocity(player), Vec3::ZERO);
    assert!(harness.control.is_attacking());

    let mut strike_frame = None;
    let mut hit = false;
    for frame in 1..=10 {
        let (events, commands) = harness.frame(PlayerInput {
            movement: Vec2::new(1.0, 0.0),
            ..idle()
        });
        if strike_frame.is_none()
            && commands
                .iter()
                .any(|command| matches!(command, Command::Strike { .. }))
        {
            strike_frame = Some(frame);
        }
        hit |= events
            .iter()
            .any(|event| matches!(event, Event::DamageApplied { target, .. } if *target == dummy));
        if frame < 8 {
            assert_eq!(harness.velocity(player), Vec3::ZERO, "moved during recovery");
        }
    }

    assert_eq!(strike_frame, Some(2), "strike should land 0.1 s after the cue");
    assert!(hit, "the dummy in front should be hit");
    assert!(!harness.control.is_attacking());
    assert!(harness.velocity(player).x > 0.0);
}

#[test]
fn dash_bursts_then_waits_for_cooldown() {
    let mut harness = Harness::new();
    let player = harness.spawn(ActorTemplate::player(HealthTuning::default()), Vec3::ZERO);

    let dash = PlayerInput {
        movement: Vec2::new(0.0, 1.0),
        dash: true,
        ..idle()
    };
    let (_, commands) = harness.frame(dash);
    assert!(commands.contains(&Command::PlayCue {
        actor: player,
        cue: Cue::Dash
    }));
    assert!((harness.velocity(player).z - 12.0).abs() < 1e-4);

    for _ in 0..5 {
        let _ = harness.frame(idle());
    }
    assert!(!harness.control.is_dashing());
    assert_eq!(harness.velocity(player), Vec3::ZERO);

    let (_, commands) = harness.frame(dash);
    assert!(!commands.contains(&Command::PlayCue {
        actor: player,
        cue: Cue::Dash
    }));

    for _ in 0..30 {
        let _ = harness.frame(idle());
    }
    assert!(harness.control.can_dash());
}

#[test]
fn controller_stops_when_the_player_dies() {
    let mut harness = Harness::new();
    let player = harness.spawn(ActorTemplate::player(HealthTuning::default()), Vec3::ZERO);
    let _ = harness.frame(idle());

    world::apply(
        &mut harness.world,
        Command::ApplyDamage {
            target: player,
            amount: 100.0,
            attacker: None,
        },
        &mut harness.pending,
    );
    let (_, commands) = harness.frame(PlayerInput {
        movement: Vec2::X,
        attack: true,
        dash: true,
    });

    assert!(harness.control.is_stopped());
    assert!(commands.is_empty());
}
