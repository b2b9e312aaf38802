#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic wave spawner emitting enemy spawn commands wave by wave.

pub mod listener;

use std::{collections::BTreeSet, time::Duration};

use log::{debug, error, info};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use sprout_siege_core::{
    ActorId, ArchetypeTable, Command, ConfigError, Event, PlayMode, SpawnOrigin, SpawnerConfig,
    Vec2, Vec3, WaveId,
};

use crate::listener::DeathListener;

/// Number of leading spawns of a wave that go to the arena edges.
const EDGE_SPAWNS: u32 = 4;

/// Progress of the spawner through its waves.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpawnerPhase {
    /// No running tick was observed yet.
    NotStarted,
    /// Waiting out the delay before the first wave.
    InitialDelay,
    /// Emitting the enemies of a wave.
    Spawning {
        /// Wave being spawned.
        wave: WaveId,
    },
    /// Every enemy of the wave was emitted; waiting for them to die.
    AwaitingClear {
        /// Wave being fought.
        wave: WaveId,
    },
    /// The wave was cleared; waiting out the delay before the next one.
    WaveCleared {
        /// Wave that was cleared.
        wave: WaveId,
    },
    /// The final wave was cleared.
    AllWavesCompleted,
}

/// Edge of the arena a directional spawn is placed on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Edge {
    North,
    South,
    East,
    West,
}

const EDGE_ORDER: [Edge; EDGE_SPAWNS as usize] = [Edge::North, Edge::South, Edge::East, Edge::West];

/// Pure system that spawns configured waves and tracks the enemies they produce.
#[derive(Debug)]
pub struct WaveSpawner {
    config: SpawnerConfig,
    archetypes: ArchetypeTable,
    rng: ChaCha8Rng,
    phase: SpawnerPhase,
    play_mode: PlayMode,
    now: Duration,
    next_at: Duration,
    emitted: u32,
    live: BTreeSet<ActorId>,
    pending_spawns: u32,
    listener: DeathListener,
    kills: u32,
    waves_cleared: u32,
}

impl WaveSpawner {
    /// Creates a spawner after validating the configuration against the archetype table.
    pub fn new(config: SpawnerConfig, archetypes: ArchetypeTable) -> Result<Self, ConfigError> {
        config.validate(&archetypes)?;
        let rng = ChaCha8Rng::seed_from_u64(config.rng_seed);
        Ok(Self {
            config,
            archetypes,
            rng,
            phase: SpawnerPhase::NotStarted,
            play_mode: PlayMode::Running,
            now: Duration::ZERO,
            next_at: Duration::ZERO,
            emitted: 0,
            live: BTreeSet::new(),
            pending_spawns: 0,
            listener: DeathListener::new(),
            kills: 0,
            waves_cleared: 0,
        })
    }

    /// Consumes world events, emitting spawn commands and wave progression events.
    pub fn handle(&mut self, events: &[Event], out: &mut Vec<Command>, out_events: &mut Vec<Event>) {
        let mut ticked = false;
        for event in events {
            match event {
                Event::PlayModeChanged { mode } => self.play_mode = *mode,
                Event::TimeAdvanced { dt } => {
                    self.now = self.now.saturating_add(*dt);
                    ticked = true;
                }
                Event::ActorSpawned {
                    actor,
                    origin: SpawnOrigin::Wave(_),
                    ..
                } => {
                    self.pending_spawns = self.pending_spawns.saturating_sub(1);
                    let _ = self.live.insert(*actor);
                    self.listener.subscribe(*actor);
                }
                Event::ActorDeactivated { .. } => {
                    if let Some(actor) = self.listener.notify(event) {
                        self.report_death(actor);
                    }
                }
                _ => {}
            }
        }

        if !ticked || self.play_mode != PlayMode::Running {
            return;
        }

        while self.advance(out, out_events) {}
    }

    /// Removes a dead actor from the live set; unknown or repeated reports are ignored.
    pub fn report_death(&mut self, actor: ActorId) {
        if self.live.remove(&actor) {
            self.kills = self.kills.saturating_add(1);
            debug!(
                "wave enemy {} died, {} still alive",
                actor.get(),
                self.live.len()
            );
        }
    }

    /// Current phase of the spawner.
    #[must_use]
    pub fn phase(&self) -> SpawnerPhase {
        self.phase
    }

    /// Wave currently spawning or being fought.
    #[must_use]
    pub fn current_wave(&self) -> Option<WaveId> {
        match self.phase {
            SpawnerPhase::Spawning { wave }
            | SpawnerPhase::AwaitingClear { wave }
            | SpawnerPhase::WaveCleared { wave } => Some(wave),
            SpawnerPhase::NotStarted
            | SpawnerPhase::InitialDelay
            | SpawnerPhase::AllWavesCompleted => None,
        }
    }

    /// Whether the spawner is emitting enemies.
    #[must_use]
    pub fn is_spawning(&self) -> bool {
        matches!(self.phase, SpawnerPhase::Spawning { .. })
    }

    /// Whether the final wave was cleared.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.phase == SpawnerPhase::AllWavesCompleted
    }

    /// Number of spawned enemies still alive.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    /// Number of spawn requests not yet confirmed by the world.
    #[must_use]
    pub fn pending_spawns(&self) -> u32 {
        self.pending_spawns
    }

    /// Number of spawned enemies whose death was reported.
    #[must_use]
    pub fn kills(&self) -> u32 {
        self.kills
    }

    /// Number of waves cleared so far.
    #[must_use]
    pub fn waves_cleared(&self) -> u32 {
        self.waves_cleared
    }

    /// Total number of configured waves.
    #[must_use]
    pub fn wave_count(&self) -> usize {
        self.config.waves.len()
    }

    fn advance(&mut self, out: &mut Vec<Command>, out_events: &mut Vec<Event>) -> bool {
        match self.phase {
            SpawnerPhase::NotStarted => {
                self.phase = SpawnerPhase::InitialDelay;
                self.next_at = self.now.saturating_add(self.config.initial_delay);
                true
            }
            SpawnerPhase::InitialDelay => {
                if self.now < self.next_at {
                    return false;
                }
                self.start_wave(WaveId::new(0), out_events);
                true
            }
            SpawnerPhase::Spawning { wave } => self.spawn_due(wave, out, out_events),
            SpawnerPhase::AwaitingClear { wave } => {
                if self.pending_spawns > 0 || !self.live.is_empty() {
                    return false;
                }
                self.waves_cleared = self.waves_cleared.saturating_add(1);
                out_events.push(Event::WaveCleared { wave });
                let next = wave.get() as usize + 1;
                if next >= self.config.waves.len() {
                    info!("all {} waves completed", self.config.waves.len());
                    self.phase = SpawnerPhase::AllWavesCompleted;
                    out_events.push(Event::AllWavesCompleted);
                } else {
                    info!("wave {} cleared", wave.get());
                    self.phase = SpawnerPhase::WaveCleared { wave };
                    self.next_at = self.now.saturating_add(self.config.time_between_waves);
                }
                true
            }
            SpawnerPhase::WaveCleared { wave } => {
                if self.now < self.next_at {
                    return false;
                }
                self.start_wave(WaveId::new(wave.get() + 1), out_events);
                true
            }
            SpawnerPhase::AllWavesCompleted => false,
        }
    }

    fn start_wave(&mut self, wave: WaveId, out_events: &mut Vec<Event>) {
        let Some(definition) = self.config.waves.get(wave.get() as usize) else {
            return;
        };
        info!(
            "wave {} '{}' starts with {} enemies",
            wave.get(),
            definition.name,
            definition.count
        );
        out_events.push(Event::WaveStarted {
            wave,
            name: definition.name.clone(),
            count: definition.count,
        });
        self.phase = SpawnerPhase::Spawning { wave };
        self.emitted = 0;
        self.next_at = self.now;
    }

    fn spawn_due(&mut self, wave: WaveId, out: &mut Vec<Command>, out_events: &mut Vec<Event>) -> bool {
        let Some(definition) = self.config.waves.get(wave.get() as usize) else {
            self.phase = SpawnerPhase::AllWavesCompleted;
            return false;
        };
        let count = definition.count;
        let interval = definition.spawn_interval;

        while self.emitted < count && self.now >= self.next_at {
            self.spawn_one(wave, out);
            self.emitted += 1;
            self.next_at = self.next_at.saturating_add(interval);
        }

        if self.emitted >= count && self.now >= self.next_at {
            debug!("wave {} finished spawning", wave.get());
            out_events.push(Event::WaveSpawningFinished { wave });
            self.phase = SpawnerPhase::AwaitingClear { wave };
            return true;
        }
        false
    }

    fn spawn_one(&mut self, wave: WaveId, out: &mut Vec<Command>) {
        let Some(definition) = self.config.waves.get(wave.get() as usize) else {
            return;
        };
        if definition.archetypes.is_empty() {
            error!(
                "wave {} '{}' has no archetypes; spawn {} skipped",
                wave.get(),
                definition.name,
                self.emitted
            );
            return;
        }
        let pick = definition.archetypes[self.rng.gen_range(0..definition.archetypes.len())];
        let Some(archetype) = self.archetypes.get(pick) else {
            error!("archetype {} vanished from the table", pick.get());
            return;
        };
        let template = archetype.template.clone();
        let edge = (definition.count >= EDGE_SPAWNS)
            .then(|| EDGE_ORDER.get(self.emitted as usize).copied())
            .flatten();
        let position = self.spawn_point(edge);

        self.pending_spawns = self.pending_spawns.saturating_add(1);
        out.push(Command::SpawnActor {
            template,
            position,
            origin: SpawnOrigin::Wave(wave),
        });
    }

    fn spawn_point(&mut self, edge: Option<Edge>) -> Vec3 {
        let rect = self.config.arena.inset(self.config.edge_margin);
        let x = self.rng.gen_range(rect.min.x..=rect.max.x);
        let z = self.rng.gen_range(rect.min.y..=rect.max.y);
        let point = match edge {
            Some(Edge::North) => Vec2::new(x, rect.max.y),
            Some(Edge::South) => Vec2::new(x, rect.min.y),
            Some(Edge::East) => Vec2::new(rect.max.x, z),
            Some(Edge::West) => Vec2::new(rect.min.x, z),
            None => Vec2::new(x, z),
        };
        Vec3::new(point.x, 0.0, point.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sprout_siege_core::WaveDefinition;

    #[test]
    fn rejects_configuration_without_waves() {
        let result = WaveSpawner::new(SpawnerConfig::new(Vec::new()), ArchetypeTable::new());
        assert!(matches!(result, Err(ConfigError::NoWaves)));
    }

    #[test]
    fn wave_without_archetypes_still_counts_its_spawns() {
        let mut config = SpawnerConfig::new(vec![WaveDefinition {
            name: "empty".to_owned(),
            count: 2,
            archetypes: Vec::new(),
            spawn_interval: Duration::from_millis(100),
        }]);
        config.initial_delay = Duration::ZERO;
        let mut spawner = WaveSpawner::new(config, ArchetypeTable::new()).expect("valid config");

        let mut commands = Vec::new();
        let mut events = Vec::new();
        for _ in 0..3 {
            spawner.handle(
                &[Event::TimeAdvanced {
                    dt: Duration::from_millis(100),
                }],
                &mut commands,
                &mut events,
            );
        }

        assert!(commands.is_empty());
        assert!(spawner.is_complete());
        assert_eq!(events.last(), Some(&Event::AllWavesCompleted));
    }
}
