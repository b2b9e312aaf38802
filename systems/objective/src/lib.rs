#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Plant objective: the destructible the player defends until every wave is cleared.
//!
//! While the plant is a seedling its death takes the player down with it. Once
//! the spawner reports that all waves are completed the plant grows, becomes
//! immune, and opens a trigger that asks the host to load the next scene.

use std::time::Duration;

use log::{error, info};
use sprout_siege_core::{
    planar_distance, ActorId, ActorKind, ActorView, Command, Cue, Event, HealthTuning, PlayMode,
};

/// Tuning of the plant objective.
#[derive(Clone, Debug, PartialEq)]
pub struct PlantTuning {
    /// Whole hit points of the plant.
    pub max_health: u32,
    /// Length of the growth animation before the trigger opens.
    pub growth_duration: Duration,
    /// Planar radius of the trigger opened by the grown plant.
    pub trigger_radius: f32,
    /// Whether the plant ignores damage once it starts growing.
    pub immune_after_growth: bool,
    /// Scene requested when the player enters the open trigger.
    pub next_scene: Option<String>,
}

impl PlantTuning {
    /// Health tuning of the plant actor; every hit costs it at least one point.
    #[must_use]
    pub fn health(&self) -> HealthTuning {
        HealthTuning {
            minimum_hit: 1.0,
            ..HealthTuning::destructible(self.max_health as f32)
        }
    }
}

impl Default for PlantTuning {
    fn default() -> Self {
        Self {
            max_health: 6,
            growth_duration: Duration::from_secs(2),
            trigger_radius: 1.5,
            immune_after_growth: true,
            next_scene: None,
        }
    }
}

/// Life stage of the plant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlantStage {
    /// Vulnerable; its death ends the encounter.
    Seedling,
    /// Growing after the last wave was cleared.
    Growing,
    /// Fully grown; its trigger is open.
    Grown,
    /// Destroyed before it could grow.
    Withered,
}

/// Pure system tracking the plant objective.
#[derive(Debug)]
pub struct PlantObjective {
    tuning: PlantTuning,
    plant: Option<ActorId>,
    player: Option<ActorId>,
    stage: PlantStage,
    play_mode: PlayMode,
    now: Duration,
    grown_at: Duration,
    displayed: u32,
    advance_requested: bool,
}

impl PlantObjective {
    /// Creates the objective; the first destructible spawned becomes the plant.
    #[must_use]
    pub fn new(tuning: PlantTuning) -> Self {
        let displayed = tuning.max_health;
        Self {
            tuning,
            plant: None,
            player: None,
            stage: PlantStage::Seedling,
            play_mode: PlayMode::Running,
            now: Duration::ZERO,
            grown_at: Duration::ZERO,
            displayed,
            advance_requested: false,
        }
    }

    /// Consumes world and system events, emitting objective commands and events.
    pub fn handle(
        &mut self,
        events: &[Event],
        actors: &ActorView,
        out: &mut Vec<Command>,
        out_events: &mut Vec<Event>,
    ) {
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
                } => match template.kind {
                    ActorKind::Destructible if self.plant.is_none() => {
                        self.plant = Some(*actor);
                        self.displayed = template.health.max_health.ceil().max(0.0) as u32;
                        out_events.push(self.health_event(*actor));
                    }
                    ActorKind::Player if self.player.is_none() => self.player = Some(*actor),
                    _ => {}
                },
                Event::DamageApplied {
                    target, remaining, ..
                } if Some(*target) == self.plant => {
                    let shown = remaining.ceil().max(0.0) as u32;
                    if shown != self.displayed {
                        self.displayed = shown;
                        out_events.push(self.health_event(*target));
                    }
                }
                Event::DeathStarted { actor, .. } if Some(*actor) == self.plant => {
                    if self.stage == PlantStage::Seedling {
                        info!("the plant withered; the player falls with it");
                        self.stage = PlantStage::Withered;
                        self.take_player_down(actors, out);
                    }
                }
                Event::AllWavesCompleted => self.start_growing(out),
                _ => {}
            }
        }

        if !ticked || self.play_mode != PlayMode::Running {
            return;
        }

        match self.stage {
            PlantStage::Growing if self.now >= self.grown_at => {
                self.stage = PlantStage::Grown;
                if let Some(plant) = self.plant {
                    info!("the plant finished growing");
                    out_events.push(Event::PlantGrown { plant });
                }
            }
            PlantStage::Grown if !self.advance_requested => self.check_trigger(actors, out_events),
            PlantStage::Withered => self.take_player_down(actors, out),
            _ => {}
        }
    }

    /// Current stage of the plant.
    #[must_use]
    pub fn stage(&self) -> PlantStage {
        self.stage
    }

    /// Plant actor, once spawned.
    #[must_use]
    pub fn plant(&self) -> Option<ActorId> {
        self.plant
    }

    /// Whole hit points shown on the HUD.
    #[must_use]
    pub fn displayed_health(&self) -> u32 {
        self.displayed
    }

    /// Whether the player already walked into the open trigger.
    #[must_use]
    pub fn level_advance_requested(&self) -> bool {
        self.advance_requested
    }

    fn health_event(&self, plant: ActorId) -> Event {
        Event::PlantHealthChanged {
            plant,
            health: self.displayed,
            max: self.tuning.max_health,
        }
    }

    fn start_growing(&mut self, out: &mut Vec<Command>) {
        let Some(plant) = self.plant else {
            return;
        };
        if self.stage != PlantStage::Seedling {
            return;
        }
        info!("every wave is cleared; the plant starts growing");
        self.stage = PlantStage::Growing;
        self.grown_at = self.now.saturating_add(self.tuning.growth_duration);
        out.push(Command::PlayCue {
            actor: plant,
            cue: Cue::Grow,
        });
        if self.tuning.immune_after_growth {
            out.push(Command::SetDamageImmunity {
                actor: plant,
                immune: true,
            });
        }
    }

    fn take_player_down(&self, actors: &ActorView, out: &mut Vec<Command>) {
        let (Some(player), Some(plant)) = (self.player, self.plant) else {
            return;
        };
        let Some(victim) = actors
            .get(player)
            .filter(|snapshot| snapshot.active && !snapshot.health.dead)
        else {
            return;
        };
        out.push(Command::ApplyDamage {
            target: player,
            amount: victim.health.current.max(1.0),
            attacker: actors.get(plant).map(|snapshot| snapshot.position),
        });
    }

    fn check_trigger(&mut self, actors: &ActorView, out_events: &mut Vec<Event>) {
        let (Some(player), Some(plant)) = (self.player, self.plant) else {
            return;
        };
        let (Some(player), Some(plant)) = (actors.get(player), actors.get(plant)) else {
            return;
        };
        if !player.active || planar_distance(player.position, plant.position) > self.tuning.trigger_radius {
            return;
        }
        self.advance_requested = true;
        match &self.tuning.next_scene {
            Some(scene) if !scene.is_empty() => {
                info!("player reached the grown plant; loading '{scene}'");
                out_events.push(Event::LevelAdvanceRequested {
                    scene: scene.clone(),
                });
            }
            _ => error!("the grown plant has no next scene configured"),
        }
    }
}

impl Default for PlantObjective {
    fn default() -> Self {
        Self::new(PlantTuning::default())
    }
}
