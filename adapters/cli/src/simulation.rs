//! Fixed-step driver wiring the world to every gameplay system.

use std::{fmt, time::Duration};

use log::{debug, error, info, warn};
use sprout_siege_core::{ActorId, ActorKind, Command, Cue, Event, PlayMode, Vec3};
use sprout_siege_presentation::{
    GaugePolicy, HealthGauge, LogPresenter, Presenter, RecordingPresenter,
};
use sprout_siege_system_bootstrap::Bootstrap;
use sprout_siege_system_enemy_ai::EnemyAi;
use sprout_siege_system_objective::{PlantObjective, PlantStage};
use sprout_siege_system_player_control::{PlayerControl, PlayerInput};
use sprout_siege_system_spawning::WaveSpawner;
use sprout_siege_world::{self as world, query, World};

use crate::{autopilot, encounter::Encounter};

const PLAYER_GAUGE_SPRITES: usize = 5;
const PLANT_GAUGE_SPRITES: usize = 4;

/// Parameters of a single headless run.
#[derive(Clone, Copy, Debug)]
pub(crate) struct RunOptions {
    pub(crate) duration: Duration,
    pub(crate) tick: Duration,
    pub(crate) autopilot: bool,
    pub(crate) pause_at: Option<Duration>,
    pub(crate) pause_frames: u32,
}

/// How a run ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Outcome {
    Victory,
    Defeat,
    TimeUp,
}

/// Figures reported once the run ends.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Summary {
    pub(crate) encounter: String,
    pub(crate) outcome: Outcome,
    pub(crate) elapsed: Duration,
    pub(crate) ticks: u64,
    pub(crate) waves_cleared: u32,
    pub(crate) wave_count: usize,
    pub(crate) kills: u32,
    pub(crate) player_health: Option<(f32, f32)>,
    pub(crate) plant: Option<(u32, PlantStage)>,
    pub(crate) scene: Option<String>,
    pub(crate) attacks: usize,
    pub(crate) deaths: usize,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "encounter:     {}", self.encounter)?;
        writeln!(f, "outcome:       {:?}", self.outcome)?;
        writeln!(
            f,
            "elapsed:       {:.2}s over {} ticks",
            self.elapsed.as_secs_f32(),
            self.ticks
        )?;
        writeln!(f, "waves cleared: {}/{}", self.waves_cleared, self.wave_count)?;
        writeln!(f, "wave kills:    {}", self.kills)?;
        match self.player_health {
            Some((current, max)) => writeln!(f, "player health: {current:.1}/{max:.1}")?,
            None => writeln!(f, "player health: -")?,
        }
        match self.plant {
            Some((health, stage)) => writeln!(f, "plant:         {health} hp, {stage:?}")?,
            None => writeln!(f, "plant:         -")?,
        }
        if let Some(scene) = &self.scene {
            writeln!(f, "next scene:    {scene}")?;
        }
        writeln!(f, "attack cues:   {}", self.attacks)?;
        writeln!(f, "deaths:        {}", self.deaths)
    }
}

/// Owns the world and its systems and advances them one fixed tick at a time.
#[derive(Debug)]
pub(crate) struct Simulation {
    name: String,
    world: World,
    bootstrap: Bootstrap,
    enemies: EnemyAi,
    control: PlayerControl,
    spawner: Option<WaveSpawner>,
    objective: PlantObjective,
    log: LogPresenter,
    recorder: RecordingPresenter,
    player_gauge: Option<HealthGauge>,
    plant_gauge: Option<HealthGauge>,
    pending: Vec<Event>,
    player: Option<ActorId>,
    plant_position: Option<Vec3>,
    player_died: bool,
    scene: Option<String>,
}

impl Simulation {
    /// Boots the encounter: systems are created and the level is spawned.
    pub(crate) fn new(encounter: Encounter) -> Self {
        let Encounter {
            name,
            level,
            archetypes,
            spawner,
            plant,
            player,
        } = encounter;

        let spawner = match WaveSpawner::new(spawner, archetypes) {
            Ok(spawner) => Some(spawner),
            Err(error) => {
                error!("wave spawner disabled: {error}");
                None
            }
        };

        let bootstrap = Bootstrap::default();
        let mut world = World::new();
        let mut pending = Vec::new();
        for command in bootstrap.encounter_commands(&level) {
            world::apply(&mut world, command, &mut pending);
        }

        let player_id = query::player(&world);
        let plant_id = pending.iter().find_map(|event| match event {
            Event::ActorSpawned {
                actor, template, ..
            } if template.kind == ActorKind::Destructible => Some(*actor),
            _ => None,
        });

        Self {
            name,
            bootstrap,
            enemies: EnemyAi::new(),
            control: PlayerControl::new(player),
            spawner,
            objective: PlantObjective::new(plant),
            log: LogPresenter,
            recorder: RecordingPresenter::default(),
            player_gauge: player_id
                .and_then(|actor| gauge(actor, PLAYER_GAUGE_SPRITES, GaugePolicy::Linear)),
            plant_gauge: plant_id.and_then(|actor| {
                gauge(
                    actor,
                    PLANT_GAUGE_SPRITES,
                    GaugePolicy::NeverEmptyWhileAlive,
                )
            }),
            plant_position: level.plant.as_ref().map(|plant| plant.position),
            pending,
            player: player_id,
            player_died: false,
            scene: None,
            world,
        }
    }

    /// Banner greeting the player.
    pub(crate) fn banner(&self) -> &str {
        self.bootstrap.welcome_banner(&self.world)
    }

    /// Requests a play mode change; paused ticks do not advance the simulation.
    pub(crate) fn set_play_mode(&mut self, mode: PlayMode) {
        world::apply(&mut self.world, Command::SetPlayMode { mode }, &mut self.pending);
    }

    /// Runs one frame: world tick, systems, then their commands.
    pub(crate) fn step(&mut self, tick: Duration, input: PlayerInput) {
        let mut events = std::mem::take(&mut self.pending);
        world::apply(&mut self.world, Command::Tick { dt: tick }, &mut events);

        let view = query::actor_view(&self.world);
        let mut commands = Vec::new();
        let mut progress = Vec::new();
        self.enemies.handle(&events, &view, &mut commands);
        self.control.handle(&events, input, &view, &mut commands);
        if let Some(spawner) = self.spawner.as_mut() {
            spawner.handle(&events, &mut commands, &mut progress);
        }
        self.objective
            .handle(&events, &view, &mut commands, &mut progress);

        self.observe(&events);

        for command in commands {
            world::apply(&mut self.world, command, &mut self.pending);
        }
        self.pending.extend(progress);
        self.refresh_gauges();
    }

    /// Runs until the encounter is decided or `options.duration` of game time passed.
    pub(crate) fn run(mut self, options: &RunOptions) -> Summary {
        if options.tick.is_zero() {
            error!("a zero-length tick never advances game time; run abandoned");
            return self.summary(Outcome::TimeUp);
        }
        let mut pause = options.pause_at;
        let mut paused_frames = 0;
        loop {
            if let Some(outcome) = self.outcome() {
                return self.summary(outcome);
            }
            if query::elapsed(&self.world) >= options.duration {
                return self.summary(Outcome::TimeUp);
            }
            if pause.is_some_and(|at| query::elapsed(&self.world) >= at) {
                pause = None;
                if options.pause_frames > 0 {
                    self.set_play_mode(PlayMode::Paused);
                    paused_frames = options.pause_frames;
                }
            }

            let input = match self.player {
                Some(player) if options.autopilot && paused_frames == 0 => autopilot::steer(
                    &query::actor_view(&self.world),
                    player,
                    self.plant_position,
                ),
                _ => PlayerInput::default(),
            };
            self.step(options.tick, input);

            if paused_frames > 0 {
                paused_frames -= 1;
                if paused_frames == 0 {
                    self.set_play_mode(PlayMode::Running);
                }
            }
        }
    }

    fn observe(&mut self, events: &[Event]) {
        self.log.present_all(events);
        self.recorder.present_all(events);
        for event in events {
            match event {
                Event::DeathStarted {
                    actor,
                    kind: ActorKind::Player,
                } if Some(*actor) == self.player => self.player_died = true,
                Event::LevelAdvanceRequested { scene } => self.scene = Some(scene.clone()),
                _ => {}
            }
        }
    }

    fn refresh_gauges(&mut self) {
        let view = query::actor_view(&self.world);
        if let Some(index) = self.player_gauge.as_mut().and_then(|g| g.refresh(&view)) {
            debug!("player gauge shows sprite {index}");
        }
        if let Some(index) = self.plant_gauge.as_mut().and_then(|g| g.refresh(&view)) {
            debug!("plant gauge shows sprite {index}");
        }
    }

    fn outcome(&self) -> Option<Outcome> {
        if self.scene.is_some() || self.objective.level_advance_requested() {
            Some(Outcome::Victory)
        } else if self.player_died || self.objective.stage() == PlantStage::Withered {
            Some(Outcome::Defeat)
        } else {
            None
        }
    }

    fn summary(&self, outcome: Outcome) -> Summary {
        info!("encounter '{}' ended: {outcome:?}", self.name);
        let player_health = self
            .player
            .and_then(|player| query::actor(&self.world, player))
            .map(|snapshot| (snapshot.health.current, snapshot.health.max));
        Summary {
            encounter: self.name.clone(),
            outcome,
            elapsed: query::elapsed(&self.world),
            ticks: query::tick_index(&self.world),
            waves_cleared: self.spawner.as_ref().map_or(0, WaveSpawner::waves_cleared),
            wave_count: self.spawner.as_ref().map_or(0, WaveSpawner::wave_count),
            kills: self.spawner.as_ref().map_or(0, WaveSpawner::kills),
            player_health,
            plant: self
                .objective
                .plant()
                .map(|_| (self.objective.displayed_health(), self.objective.stage())),
            scene: self.scene.clone(),
            attacks: self.recorder.count(Cue::Attack),
            deaths: self.recorder.deaths().len(),
        }
    }
}

fn gauge(actor: ActorId, sprites: usize, policy: GaugePolicy) -> Option<HealthGauge> {
    match HealthGauge::for_actor(actor, sprites, policy) {
        Ok(gauge) => Some(gauge),
        Err(error) => {
            warn!("no health gauge for actor {}: {error}", actor.get());
            None
        }
    }
}
