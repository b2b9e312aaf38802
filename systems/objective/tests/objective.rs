use std::time::Duration;

use sprout_siege_core::{
    ActorId, ActorTemplate, Command, Cue, Event, HealthTuning, SpawnOrigin, Vec3,
};
use sprout_siege_system_objective::{PlantObjective, PlantStage, PlantTuning};
use sprout_siege_world::{self as world, query, World};

const STEP: Duration = Duration::from_millis(100);

struct Harness {
    world: World,
    objective: PlantObjective,
    pending: Vec<Event>,
    emitted: Vec<Event>,
}

impl Harness {
    fn new(tuning: PlantTuning) -> (Self, ActorId, ActorId) {
        let plant_health = tuning.health();
        let mut harness = Self {
            world: World::new(),
            objective: PlantObjective::new(tuning),
            pending: Vec::new(),
            emitted: Vec::new(),
        };
        let player = harness.spawn(ActorTemplate::player(HealthTuning::default()), Vec3::new(5.0, 0.0, 0.0));
        let plant = harness.spawn(ActorTemplate::destructible(plant_health), Vec3::ZERO);
        let _ = harness.frame(Vec::new());
        (harness, player, plant)
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

    fn command(&mut self, command: Command) {
        world::apply(&mut self.world, command, &mut self.pending);
    }

    fn frame(&mut self, injected: Vec<Event>) -> Vec<Command> {
        let mut events = std::mem::take(&mut self.pending);
        world::apply(&mut self.world, Command::Tick { dt: STEP }, &mut events);
        events.extend(injected);
        let view = query::actor_view(&self.world);
        let mut commands = Vec::new();
        let mut emitted = Vec::new();
        self.objective
            .handle(&events, &view, &mut commands, &mut emitted);
        for command in commands.iter().cloned() {
            world::apply(&mut self.world, command, &mut self.pending);
        }
        self.emitted.extend(emitted);
        commands
    }
}

#[test]
fn plant_health_is_reported_in_whole_points() {
    let (mut harness, _, plant) = Harness::new(PlantTuning::default());
    assert!(harness.emitted.contains(&Event::PlantHealthChanged {
        plant,
        health: 6,
        max: 6
    }));

    harness.command(Command::ApplyDamage {
        target: plant,
        amount: 1.5,
        attacker: None,
    });
    let _ = harness.frame(Vec::new());
    assert_eq!(harness.objective.displayed_health(), 5);
    assert!(harness.emitted.contains(&Event::PlantHealthChanged {
        plant,
        health: 5,
        max: 6
    }));
}

#[test]
fn grazing_hits_still_cost_the_plant_a_point() {
    let (mut harness, _, plant) = Harness::new(PlantTuning::default());

    harness.command(Command::ApplyDamage {
        target: plant,
        amount: 0.25,
        attacker: None,
    });
    let _ = harness.frame(Vec::new());

    assert_eq!(harness.objective.displayed_health(), 5);
    let snapshot = query::actor(&harness.world, plant).expect("plant exists");
    assert_eq!(snapshot.health.current, 5.0);
}

#[test]
fn plant_death_takes_the_player_down() {
    let (mut harness, player, plant) = Harness::new(PlantTuning::default());

    // an invulnerability window must not save the player
    harness.command(Command::ApplyDamage {
        target: player,
        amount: 1.0,
        attacker: None,
    });
    harness.command(Command::ApplyDamage {
        target: plant,
        amount: 6.0,
        attacker: None,
    });
    for _ in 0..10 {
        let _ = harness.frame(Vec::new());
    }

    assert_eq!(harness.objective.stage(), PlantStage::Withered);
    let snapshot = query::actor(&harness.world, player).expect("player exists");
    assert!(snapshot.health.dead);
}

#[test]
fn grown_plant_is_immune_and_requests_the_next_scene_once() {
    let tuning = PlantTuning {
        next_scene: Some("Greenhouse".to_owned()),
        ..PlantTuning::default()
    };
    let (mut harness, player, plant) = Harness::new(tuning);

    let commands = harness.frame(vec![Event::AllWavesCompleted]);
    assert!(commands.contains(&Command::PlayCue {
        actor: plant,
        cue: Cue::Grow
    }));
    assert_eq!(harness.objective.stage(), PlantStage::Growing);

    harness.command(Command::ApplyDamage {
        target: plant,
        amount: 100.0,
        attacker: None,
    });
    for _ in 0..20 {
        let _ = harness.frame(Vec::new());
    }
    assert_eq!(harness.objective.stage(), PlantStage::Grown);
    assert!(harness.emitted.contains(&Event::PlantGrown { plant }));
    assert!(!query::actor(&harness.world, plant)
        .expect("plant exists")
        .health
        .dead);
    assert!(!harness
        .emitted
        .iter()
        .any(|event| matches!(event, Event::LevelAdvanceRequested { .. })));

    harness.command(Command::SetVelocity {
        actor: player,
        velocity: Vec3::new(-40.0, 0.0, 0.0),
    });
    let _ = harness.frame(Vec::new());
    harness.command(Command::SetVelocity {
        actor: player,
        velocity: Vec3::ZERO,
    });
    for _ in 0..5 {
        let _ = harness.frame(Vec::new());
    }

    let requests: Vec<&Event> = harness
        .emitted
        .iter()
        .filter(|event| matches!(event, Event::LevelAdvanceRequested { .. }))
        .collect();
    assert_eq!(
        requests,
        vec![&Event::LevelAdvanceRequested {
            scene: "Greenhouse".to_owned()
        }]
    );
}

#[test]
fn trigger_without_scene_only_logs() {
    let (mut harness, player, _) = Harness::new(PlantTuning::default());
    let _ = harness.frame(vec![Event::AllWavesCompleted]);
    for _ in 0..25 {
        let _ = harness.frame(Vec::new());
    }
    harness.command(Command::SetVelocity {
        actor: player,
        velocity: Vec3::new(-45.0, 0.0, 0.0),
    });
    let _ = harness.frame(Vec::new());
    let _ = harness.frame(Vec::new());

    assert!(harness.objective.level_advance_requested());
    assert!(!harness
        .emitted
        .iter()
        .any(|event| matches!(event, Event::LevelAdvanceRequested { .. })));
}
