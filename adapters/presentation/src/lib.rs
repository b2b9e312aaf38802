#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Presentation sinks for Sprout Siege adapters.
//!
//! The simulation never waits on presentation: cues, moving flags and HUD
//! updates are fire-and-forget events that a [`Presenter`] may render, log or
//! record.

use log::{debug, info};
use sprout_siege_core::{ActorId, ActorView, Cue, Event};
use thiserror::Error;

/// Sink receiving the fire-and-forget side of the event stream.
pub trait Presenter {
    /// Presents a single event; events without a presentation are ignored.
    fn present(&mut self, event: &Event);

    /// Presents a batch of events in order.
    fn present_all(&mut self, events: &[Event]) {
        for event in events {
            self.present(event);
        }
    }
}

/// Presenter writing cues and HUD updates through the `log` facade.
#[derive(Debug, Default)]
pub struct LogPresenter;

impl Presenter for LogPresenter {
    fn present(&mut self, event: &Event) {
        match event {
            Event::CuePlayed { actor, cue } => debug!("actor {} plays {cue:?}", actor.get()),
            Event::MovingChanged { actor, moving } => {
                debug!("actor {} moving: {moving}", actor.get());
            }
            Event::DeathStarted { actor, kind } => info!("{kind:?} {} died", actor.get()),
            Event::WaveStarted { wave, name, count } => {
                info!("wave {} '{name}' incoming: {count} enemies", wave.get() + 1);
            }
            Event::WaveCleared { wave } => info!("wave {} cleared", wave.get() + 1),
            Event::AllWavesCompleted => info!("all waves completed"),
            Event::PlantHealthChanged { health, max, .. } => info!("plant health {health}/{max}"),
            Event::PlantGrown { .. } => info!("the plant has grown"),
            Event::LevelAdvanceRequested { scene } => info!("advancing to '{scene}'"),
            Event::PlayModeChanged { mode } => info!("play mode {mode:?}"),
            _ => {}
        }
    }
}

/// Presenter keeping every cue it receives, for inspection in tests and replays.
#[derive(Debug, Default)]
pub struct RecordingPresenter {
    cues: Vec<(ActorId, Cue)>,
    deaths: Vec<ActorId>,
}

impl RecordingPresenter {
    /// Cues received so far, in order.
    #[must_use]
    pub fn cues(&self) -> &[(ActorId, Cue)] {
        &self.cues
    }

    /// Number of cues of the provided kind.
    #[must_use]
    pub fn count(&self, cue: Cue) -> usize {
        self.cues.iter().filter(|(_, played)| *played == cue).count()
    }

    /// Actors whose death started, in order.
    #[must_use]
    pub fn deaths(&self) -> &[ActorId] {
        &self.deaths
    }
}

impl Presenter for RecordingPresenter {
    fn present(&mut self, event: &Event) {
        match event {
            Event::CuePlayed { actor, cue } => self.cues.push((*actor, *cue)),
            Event::DeathStarted { actor, .. } => self.deaths.push(*actor),
            _ => {}
        }
    }
}

/// How a health gauge treats the empty sprite.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GaugePolicy {
    /// Health maps linearly onto the sprite list.
    Linear,
    /// The empty sprite is shown only once health reaches zero.
    NeverEmptyWhileAlive,
}

/// Reasons a health gauge cannot be built.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum GaugeError {
    /// The sprite list is empty.
    #[error("a health gauge needs at least one sprite")]
    NoSprites,
    /// The policy needs more sprites than provided.
    #[error("{policy:?} needs at least {required} sprites, got {provided}")]
    TooFewSprites {
        /// Policy that was requested.
        policy: GaugePolicy,
        /// Minimum sprite count for the policy.
        required: usize,
        /// Sprite count provided.
        provided: usize,
    },
}

/// Maps `current / max` onto a sprite index where 0 is full and the last index is empty.
#[must_use]
pub fn sprite_index(current: f32, max: f32, sprites: usize, policy: GaugePolicy) -> usize {
    let Some(last) = sprites.checked_sub(1) else {
        return 0;
    };
    let ratio = if max > 0.0 { current / max } else { 0.0 };
    let index = if ratio >= 1.0 {
        0
    } else if ratio.is_nan() || ratio <= 0.0 {
        last
    } else {
        last - ((ratio * last as f32).floor() as usize).min(last)
    };
    match policy {
        GaugePolicy::NeverEmptyWhileAlive if current > 0.0 && index == last && last > 0 => last - 1,
        _ => index,
    }
}

/// HUD health bar bound to a single actor at wiring time.
#[derive(Clone, Debug)]
pub struct HealthGauge {
    actor: ActorId,
    sprites: usize,
    policy: GaugePolicy,
    last_health: Option<f32>,
    index: usize,
}

impl HealthGauge {
    /// Binds a gauge with `sprites` frames to an actor.
    pub fn for_actor(actor: ActorId, sprites: usize, policy: GaugePolicy) -> Result<Self, GaugeError> {
        if sprites == 0 {
            return Err(GaugeError::NoSprites);
        }
        if policy == GaugePolicy::NeverEmptyWhileAlive && sprites < 2 {
            return Err(GaugeError::TooFewSprites {
                policy,
                required: 2,
                provided: sprites,
            });
        }
        Ok(Self {
            actor,
            sprites,
            policy,
            last_health: None,
            index: 0,
        })
    }

    /// Re-reads the bound actor and returns the new sprite index when its health changed.
    pub fn refresh(&mut self, actors: &ActorView) -> Option<usize> {
        let health = actors.get(self.actor)?.health;
        if self.last_health == Some(health.current) {
            return None;
        }
        self.last_health = Some(health.current);
        self.index = sprite_index(health.current, health.max, self.sprites, self.policy);
        Some(self.index)
    }

    /// Sprite index currently displayed.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Actor the gauge is bound to.
    #[must_use]
    pub fn actor(&self) -> ActorId {
        self.actor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sprout_siege_core::{ActorKind, ActorSnapshot, HealthSnapshot, Vec2, Vec3};

    fn view(current: f32) -> ActorView {
        ActorView::from_snapshots(vec![ActorSnapshot {
            id: ActorId::new(0),
            kind: ActorKind::Player,
            position: Vec3::ZERO,
            velocity: Vec3::ZERO,
            facing: Vec2::X,
            health: HealthSnapshot {
                current,
                max: 10.0,
                dead: current <= 0.0,
                invulnerable: false,
                knocked_back: false,
                immune: false,
            },
            active: true,
            collidable: true,
            controllable: true,
        }])
    }

    #[test]
    fn linear_mapping_covers_full_partial_and_empty() {
        assert_eq!(sprite_index(10.0, 10.0, 5, GaugePolicy::Linear), 0);
        assert_eq!(sprite_index(12.0, 10.0, 5, GaugePolicy::Linear), 0);
        assert_eq!(sprite_index(9.9, 10.0, 5, GaugePolicy::Linear), 1);
        assert_eq!(sprite_index(5.0, 10.0, 5, GaugePolicy::Linear), 2);
        assert_eq!(sprite_index(1.0, 10.0, 5, GaugePolicy::Linear), 4);
        assert_eq!(sprite_index(0.0, 10.0, 5, GaugePolicy::Linear), 4);
        assert_eq!(sprite_index(3.0, 0.0, 5, GaugePolicy::Linear), 4);
    }

    #[test]
    fn plant_policy_never_shows_empty_while_alive() {
        assert_eq!(sprite_index(1.0, 6.0, 4, GaugePolicy::NeverEmptyWhileAlive), 2);
        assert_eq!(sprite_index(0.0, 6.0, 4, GaugePolicy::NeverEmptyWhileAlive), 3);
    }

    #[test]
    fn gauge_requires_enough_sprites() {
        assert_eq!(
            HealthGauge::for_actor(ActorId::new(0), 0, GaugePolicy::Linear).err(),
            Some(GaugeError::NoSprites)
        );
        assert!(matches!(
            HealthGauge::for_actor(ActorId::new(0), 1, GaugePolicy::NeverEmptyWhileAlive),
            Err(GaugeError::TooFewSprites { required: 2, .. })
        ));
    }

    #[test]
    fn gauge_reports_only_when_health_changes() {
        let mut gauge =
            HealthGauge::for_actor(ActorId::new(0), 5, GaugePolicy::Linear).expect("valid gauge");
        assert_eq!(gauge.refresh(&view(10.0)), Some(0));
        assert_eq!(gauge.refresh(&view(10.0)), None);
        assert_eq!(gauge.refresh(&view(5.0)), Some(2));
        assert_eq!(gauge.index(), 2);
        assert_eq!(gauge.refresh(&ActorView::default()), None);
    }

    #[test]
    fn recording_presenter_keeps_cues_in_order() {
        let mut presenter = RecordingPresenter::default();
        let actor = ActorId::new(4);
        presenter.present_all(&[
            Event::CuePlayed {
                actor,
                cue: Cue::Attack,
            },
            Event::AllWavesCompleted,
            Event::CuePlayed {
                actor,
                cue: Cue::Damage,
            },
        ]);
        assert_eq!(presenter.cues(), &[(actor, Cue::Attack), (actor, Cue::Damage)]);
        assert_eq!(presenter.count(Cue::Damage), 1);
    }
}
