#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Player controller translating per-frame input into movement, dashes and attacks.

use std::time::Duration;

use log::debug;
use sprout_siege_core::{
    lift, ActorId, ActorKind, ActorView, Command, Cue, Event, KindMask, PlayMode, Timers, Vec2,
};

/// Input sampled from the host once per frame.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PlayerInput {
    /// Horizontal (X) and depth (Z) movement axes.
    pub movement: Vec2,
    /// Whether the dash button was pressed this frame.
    pub dash: bool,
    /// Whether the attack button was pressed this frame.
    pub attack: bool,
}

/// Tuning knobs of the player controller.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlayerTuning {
    /// Walking speed.
    pub move_speed: f32,
    /// Speed during a dash.
    pub dash_speed: f32,
    /// Length of a dash.
    pub dash_duration: Duration,
    /// Delay after a dash ends before the next one is available.
    pub dash_cooldown: Duration,
    /// Radius of the attack sphere.
    pub attack_range: f32,
    /// Damage dealt to every enemy caught by an attack.
    pub attack_damage: f32,
    /// Time after the attack starts before the player may act again.
    pub attack_recovery: Duration,
    /// Wind-up between the attack cue and the hit-test.
    pub strike_delay: Duration,
    /// Forward offset of the attack point.
    pub attack_offset: f32,
}

impl Default for PlayerTuning {
    fn default() -> Self {
        Self {
            move_speed: 5.0,
            dash_speed: 12.0,
            dash_duration: Duration::from_millis(250),
            dash_cooldown: Duration::from_millis(1_200),
            attack_range: 1.5,
            attack_damage: 2.5,
            attack_recovery: Duration::from_millis(400),
            strike_delay: Duration::from_millis(100),
            attack_offset: 0.75,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum PlayerTimer {
    DashEnds,
    DashReady,
    Strike,
    AttackEnds,
}

/// Pure system steering the player actor.
#[derive(Debug)]
pub struct PlayerControl {
    tuning: PlayerTuning,
    player: Option<ActorId>,
    timers: Timers<PlayerTimer>,
    now: Duration,
    play_mode: PlayMode,
    dashing: bool,
    dash_ready: bool,
    dash_direction: Vec2,
    attacking: bool,
    facing: Vec2,
    stopped: bool,
}

impl PlayerControl {
    /// Creates a controller that adopts the first player actor spawned.
    #[must_use]
    pub fn new(tuning: PlayerTuning) -> Self {
        Self {
            tuning,
            player: None,
            timers: Timers::new(),
            now: Duration::ZERO,
            play_mode: PlayMode::Running,
            dashing: false,
            dash_ready: true,
            dash_direction: Vec2::X,
            attacking: false,
            facing: Vec2::X,
            stopped: false,
        }
    }

    /// Consumes world events plus the frame's input and emits player commands.
    pub fn handle(
        &mut self,
        events: &[Event],
        input: PlayerInput,
        actors: &ActorView,
        out: &mut Vec<Command>,
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
                } if template.kind == ActorKind::Player && self.player.is_none() => {
                    self.player = Some(*actor);
                }
                Event::DeathStarted { actor, .. } if Some(*actor) == self.player => {
                    debug!("player {} died; controller stopped", actor.get());
                    self.stopped = true;
                    self.dashing = false;
                    self.attacking = false;
                    self.timers.clear();
                }
                _ => {}
            }
        }

        if !ticked || self.stopped || self.play_mode != PlayMode::Running {
            return;
        }
        let Some(me) = self
            .player
            .and_then(|player| actors.get(player))
            .filter(|snapshot| snapshot.active && snapshot.controllable)
            .copied()
        else {
            return;
        };

        for timer in self.timers.drain_due(self.now) {
            match timer {
                PlayerTimer::DashEnds => self.dashing = false,
                PlayerTimer::DashReady => self.dash_ready = true,
                PlayerTimer::AttackEnds => self.attacking = false,
                PlayerTimer::Strike => out.push(Command::Strike {
                    attacker: me.id,
                    center: me.position + lift(self.facing) * self.tuning.attack_offset,
                    radius: self.tuning.attack_range,
                    damage: self.tuning.attack_damage,
                    targets: KindMask::ENEMIES,
                }),
            }
        }

        let movement = clamp_movement(input.movement);
        if movement.x != 0.0 {
            let facing = Vec2::new(movement.x.signum(), 0.0);
            if facing != self.facing {
                self.facing = facing;
                out.push(Command::SetFacing {
                    actor: me.id,
                    facing,
                });
            }
        }

        if input.attack && !self.dashing && !self.attacking {
            self.attacking = true;
            out.push(Command::PlayCue {
                actor: me.id,
                cue: Cue::Attack,
            });
            let _ = self
                .timers
                .schedule(PlayerTimer::Strike, self.now, self.tuning.strike_delay);
            let _ = self
                .timers
                .schedule(PlayerTimer::AttackEnds, self.now, self.tuning.attack_recovery);
        } else if input.dash && self.dash_ready && !self.dashing && !self.attacking {
            self.dashing = true;
            self.dash_ready = false;
            self.dash_direction = if movement == Vec2::ZERO {
                self.facing
            } else {
                movement.normalize()
            };
            out.push(Command::PlayCue {
                actor: me.id,
                cue: Cue::Dash,
            });
            let _ = self
                .timers
                .schedule(PlayerTimer::DashEnds, self.now, self.tuning.dash_duration);
            let _ = self.timers.schedule(
                PlayerTimer::DashReady,
                self.now,
                self.tuning.dash_duration.saturating_add(self.tuning.dash_cooldown),
            );
        }

        let velocity = if self.dashing {
            self.dash_direction * self.tuning.dash_speed
        } else if self.attacking {
            Vec2::ZERO
        } else {
            movement * self.tuning.move_speed
        };
        out.push(Command::SetVelocity {
            actor: me.id,
            velocity: lift(velocity),
        });
    }

    /// Player actor steered by the controller.
    #[must_use]
    pub fn player(&self) -> Option<ActorId> {
        self.player
    }

    /// Whether a dash is in progress.
    #[must_use]
    pub fn is_dashing(&self) -> bool {
        self.dashing
    }

    /// Whether a dash may start.
    #[must_use]
    pub fn can_dash(&self) -> bool {
        self.dash_ready && !self.dashing && !self.attacking && !self.stopped
    }

    /// Whether the attack lockout is active.
    #[must_use]
    pub fn is_attacking(&self) -> bool {
        self.attacking
    }

    /// Whether the player died and the controller stopped.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Last horizontal facing.
    #[must_use]
    pub fn facing(&self) -> Vec2 {
        self.facing
    }
}

impl Default for PlayerControl {
    fn default() -> Self {
        Self::new(PlayerTuning::default())
    }
}

fn clamp_movement(movement: Vec2) -> Vec2 {
    if !movement.is_finite() {
        return Vec2::ZERO;
    }
    if movement.length_squared() > 1.0 {
        movement.normalize()
    } else {
        movement
    }
}
