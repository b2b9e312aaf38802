//! Encounter files: TOML descriptions of a level, its archetypes and waves.

use std::{collections::BTreeSet, fs, path::Path, time::Duration};

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use sprout_siege_core::{
    ActorTemplate, ArchetypeTable, ArenaBounds, BehaviorType, EnemyProfile, HealthTuning,
    SpawnerConfig, Vec2, Vec3, WaveDefinition,
};
use sprout_siege_system_bootstrap::{Level, PlacedActor};
use sprout_siege_system_objective::PlantTuning;
use sprout_siege_system_player_control::PlayerTuning;

const DEFAULT_ENCOUNTER: &str = include_str!("../encounters/meadow.toml");
const DEFAULT_PERCEPTION_RADIUS: f32 = 8.0;

/// Fully resolved encounter ready to be simulated.
#[derive(Debug)]
pub(crate) struct Encounter {
    pub(crate) name: String,
    pub(crate) level: Level,
    pub(crate) archetypes: ArchetypeTable,
    pub(crate) spawner: SpawnerConfig,
    pub(crate) plant: PlantTuning,
    pub(crate) player: PlayerTuning,
}

/// Loads an encounter from a TOML file.
pub(crate) fn load(path: &Path) -> Result<Encounter> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read encounter at {}", path.display()))?;
    parse(&contents).with_context(|| format!("invalid encounter {}", path.display()))
}

/// Encounter bundled with the binary.
pub(crate) fn builtin() -> Result<Encounter> {
    parse(DEFAULT_ENCOUNTER).context("bundled encounter is invalid")
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct EncounterFile {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    arena: ArenaSection,
    #[serde(default)]
    player: PlayerSection,
    #[serde(default)]
    plant: Option<PlantSection>,
    #[serde(default)]
    archetypes: Vec<ArchetypeSection>,
    #[serde(default)]
    placed: Vec<PlacedSection>,
    #[serde(default)]
    spawner: SpawnerSection,
    #[serde(default)]
    waves: Vec<WaveSection>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ArenaSection {
    center: Option<[f32; 2]>,
    size: Option<[f32; 2]>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct HealthSection {
    max_health: Option<f32>,
    invulnerability_secs: Option<f32>,
    knockback_force: Option<f32>,
    knockback_secs: Option<f32>,
    dying_secs: Option<f32>,
    linger_secs: Option<f32>,
    minimum_hit: Option<f32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct PlayerSection {
    spawn: Option<[f32; 3]>,
    #[serde(default)]
    health: HealthSection,
    move_speed: Option<f32>,
    dash_speed: Option<f32>,
    dash_secs: Option<f32>,
    dash_cooldown_secs: Option<f32>,
    attack_range: Option<f32>,
    attack_damage: Option<f32>,
    attack_recovery_secs: Option<f32>,
    strike_delay_secs: Option<f32>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PlantSection {
    #[serde(default)]
    position: [f32; 3],
    max_health: Option<u32>,
    growth_secs: Option<f32>,
    trigger_radius: Option<f32>,
    immune_after_growth: Option<bool>,
    next_scene: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ArchetypeSection {
    name: String,
    behavior: BehaviorType,
    perception_radius: Option<f32>,
    #[serde(default)]
    health: HealthSection,
    #[serde(default)]
    movement: MovementSection,
    #[serde(default)]
    melee: MeleeSection,
    #[serde(default)]
    ranged: RangedSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct MovementSection {
    patrol_speed: Option<f32>,
    chase_speed: Option<f32>,
    stopping_distance: Option<f32>,
    patrol_wait_secs: Option<f32>,
    arrival_threshold: Option<f32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct MeleeSection {
    damage: Option<f32>,
    cooldown_secs: Option<f32>,
    attack_range: Option<f32>,
    attack_point: Option<f32>,
    #[serde(default)]
    no_attack_point: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RangedSection {
    attack_distance: Option<f32>,
    stopping_distance: Option<f32>,
    retreat_distance: Option<f32>,
    cooldown_secs: Option<f32>,
    projectile_speed: Option<f32>,
    projectile_damage: Option<f32>,
    #[serde(default)]
    no_projectile: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PlacedSection {
    archetype: String,
    position: [f32; 3],
    #[serde(default)]
    route: Vec<[f32; 3]>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct SpawnerSection {
    initial_delay_secs: Option<f32>,
    time_between_waves_secs: Option<f32>,
    edge_margin: Option<f32>,
    seed: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct WaveSection {
    name: String,
    count: u32,
    #[serde(default)]
    archetypes: Vec<String>,
    spawn_interval_secs: f32,
}

/// Parses and resolves an encounter from TOML text.
pub(crate) fn parse(contents: &str) -> Result<Encounter> {
    let file: EncounterFile =
        toml::from_str(contents).context("failed to parse encounter toml contents")?;

    let arena = resolve_arena(&file.arena)?;
    let archetypes = resolve_archetypes(&file.archetypes)?;

    let mut level = Level {
        arena,
        player_spawn: file.player.spawn.map_or(Vec3::ZERO, point),
        player_health: resolve_health(HealthTuning::default(), &file.player.health)
            .context("invalid [player.health]")?,
        plant: None,
        enemies: Vec::with_capacity(file.placed.len()),
    };
    let player = resolve_player(&file.player).context("invalid [player]")?;

    let plant = match &file.plant {
        Some(section) => {
            let tuning = resolve_plant(section).context("invalid [plant]")?;
            level.plant = Some(PlacedActor {
                template: ActorTemplate::destructible(tuning.health()),
                position: point(section.position),
            });
            tuning
        }
        None => PlantTuning::default(),
    };

    for (index, placed) in file.placed.iter().enumerate() {
        let actor = resolve_placed(&archetypes, placed)
            .with_context(|| format!("invalid placed actor #{index}"))?;
        level.enemies.push(actor);
    }

    let spawner = resolve_spawner(&file.spawner, &file.waves, &archetypes, arena)?;

    Ok(Encounter {
        name: file.name.unwrap_or_else(|| "Untitled".to_owned()),
        level,
        archetypes,
        spawner,
        plant,
        player,
    })
}

fn point([x, y, z]: [f32; 3]) -> Vec3 {
    Vec3::new(x, y, z)
}

fn seconds(field: &str, value: f32) -> Result<Duration> {
    Duration::try_from_secs_f32(value)
        .with_context(|| format!("`{field}` must be a non-negative number of seconds, got {value}"))
}

fn finite(field: &str, value: f32) -> Result<f32> {
    if !value.is_finite() {
        bail!("`{field}` must be a finite number, got {value}");
    }
    Ok(value)
}

fn positive(field: &str, value: f32) -> Result<f32> {
    if !value.is_finite() || value <= 0.0 {
        bail!("`{field}` must be a positive number, got {value}");
    }
    Ok(value)
}

fn non_negative(field: &str, value: f32) -> Result<f32> {
    if !value.is_finite() || value < 0.0 {
        bail!("`{field}` must not be negative, got {value}");
    }
    Ok(value)
}

fn overlay_secs(target: &mut Duration, field: &str, value: Option<f32>) -> Result<()> {
    if let Some(value) = value {
        *target = seconds(field, value)?;
    }
    Ok(())
}

fn overlay(
    target: &mut f32,
    field: &str,
    value: Option<f32>,
    check: fn(&str, f32) -> Result<f32>,
) -> Result<()> {
    if let Some(value) = value {
        *target = check(field, value)?;
    }
    Ok(())
}

fn resolve_arena(section: &ArenaSection) -> Result<ArenaBounds> {
    let mut arena = ArenaBounds::default();
    if let Some([x, z]) = section.center {
        arena.center = Vec2::new(finite("arena.center[0]", x)?, finite("arena.center[1]", z)?);
    }
    if let Some([width, depth]) = section.size {
        arena.size = Vec2::new(
            positive("arena.size[0]", width)?,
            positive("arena.size[1]", depth)?,
        );
    }
    Ok(arena)
}

fn resolve_health(mut tuning: HealthTuning, section: &HealthSection) -> Result<HealthTuning> {
    overlay(&mut tuning.max_health, "max_health", section.max_health, positive)?;
    overlay_secs(
        &mut tuning.invulnerability,
        "invulnerability_secs",
        section.invulnerability_secs,
    )?;
    overlay(
        &mut tuning.knockback_force,
        "knockback_force",
        section.knockback_force,
        non_negative,
    )?;
    overlay_secs(
        &mut tuning.knockback_duration,
        "knockback_secs",
        section.knockback_secs,
    )?;
    overlay_secs(&mut tuning.dying_duration, "dying_secs", section.dying_secs)?;
    overlay_secs(&mut tuning.linger, "linger_secs", section.linger_secs)?;
    overlay(&mut tuning.minimum_hit, "minimum_hit", section.minimum_hit, non_negative)?;
    Ok(tuning)
}

fn resolve_player(section: &PlayerSection) -> Result<PlayerTuning> {
    let mut tuning = PlayerTuning::default();
    overlay(&mut tuning.move_speed, "move_speed", section.move_speed, positive)?;
    overlay(&mut tuning.dash_speed, "dash_speed", section.dash_speed, positive)?;
    overlay_secs(&mut tuning.dash_duration, "dash_secs", section.dash_secs)?;
    overlay_secs(
        &mut tuning.dash_cooldown,
        "dash_cooldown_secs",
        section.dash_cooldown_secs,
    )?;
    overlay(&mut tuning.attack_range, "attack_range", section.attack_range, positive)?;
    overlay(
        &mut tuning.attack_damage,
        "attack_damage",
        section.attack_damage,
        non_negative,
    )?;
    overlay_secs(
        &mut tuning.attack_recovery,
        "attack_recovery_secs",
        section.attack_recovery_secs,
    )?;
    overlay_secs(
        &mut tuning.strike_delay,
        "strike_delay_secs",
        section.strike_delay_secs,
    )?;
    Ok(tuning)
}

fn resolve_plant(section: &PlantSection) -> Result<PlantTuning> {
    let mut tuning = PlantTuning::default();
    if let Some(max_health) = section.max_health {
        if max_health == 0 {
            bail!("`max_health` of the plant must be at least 1");
        }
        tuning.max_health = max_health;
    }
    overlay_secs(&mut tuning.growth_duration, "growth_secs", section.growth_secs)?;
    overlay(
        &mut tuning.trigger_radius,
        "trigger_radius",
        section.trigger_radius,
        positive,
    )?;
    if let Some(immune) = section.immune_after_growth {
        tuning.immune_after_growth = immune;
    }
    tuning.next_scene = section.next_scene.clone();
    Ok(tuning)
}

fn resolve_profile(section: &ArchetypeSection) -> Result<EnemyProfile> {
    let mut profile = EnemyProfile::new(section.behavior);

    let movement = &mut profile.movement;
    let source = &section.movement;
    overlay(&mut movement.patrol_speed, "patrol_speed", source.patrol_speed, non_negative)?;
    overlay(&mut movement.chase_speed, "chase_speed", source.chase_speed, non_negative)?;
    overlay(
        &mut movement.stopping_distance,
        "stopping_distance",
        source.stopping_distance,
        non_negative,
    )?;
    overlay_secs(&mut movement.patrol_wait, "patrol_wait_secs", source.patrol_wait_secs)?;
    overlay(
        &mut movement.arrival_threshold,
        "arrival_threshold",
        source.arrival_threshold,
        positive,
    )?;

    let melee = &mut profile.melee;
    let source = &section.melee;
    overlay(&mut melee.damage, "melee.damage", source.damage, non_negative)?;
    overlay_secs(&mut melee.cooldown, "melee.cooldown_secs", source.cooldown_secs)?;
    overlay(
        &mut melee.attack_range,
        "melee.attack_range",
        source.attack_range,
        positive,
    )?;
    if source.no_attack_point {
        melee.attack_point = None;
    } else if let Some(offset) = source.attack_point {
        melee.attack_point = Some(non_negative("melee.attack_point", offset)?);
    }

    let ranged = &mut profile.ranged;
    let source = &section.ranged;
    overlay(
        &mut ranged.attack_distance,
        "ranged.attack_distance",
        source.attack_distance,
        positive,
    )?;
    overlay(
        &mut ranged.stopping_distance,
        "ranged.stopping_distance",
        source.stopping_distance,
        non_negative,
    )?;
    overlay(
        &mut ranged.retreat_distance,
        "ranged.retreat_distance",
        source.retreat_distance,
        non_negative,
    )?;
    overlay_secs(&mut ranged.cooldown, "ranged.cooldown_secs", source.cooldown_secs)?;
    if source.no_projectile {
        ranged.projectile = None;
    } else if let Some(projectile) = ranged.projectile.as_mut() {
        overlay(
            &mut projectile.speed,
            "ranged.projectile_speed",
            source.projectile_speed,
            positive,
        )?;
        overlay(
            &mut projectile.damage,
            "ranged.projectile_damage",
            source.projectile_damage,
            non_negative,
        )?;
    }
    if ranged.retreat_distance > ranged.stopping_distance
        || ranged.stopping_distance > ranged.attack_distance
    {
        bail!(
            "ranged distances must satisfy retreat <= stopping <= attack, got {} / {} / {}",
            ranged.retreat_distance,
            ranged.stopping_distance,
            ranged.attack_distance
        );
    }

    Ok(profile)
}

fn resolve_archetypes(sections: &[ArchetypeSection]) -> Result<ArchetypeTable> {
    let mut table = ArchetypeTable::new();
    let mut names = BTreeSet::new();
    for section in sections {
        if !names.insert(section.name.as_str()) {
            bail!("duplicate archetype `{}`", section.name);
        }
        let health = resolve_health(HealthTuning::default(), &section.health)
            .with_context(|| format!("invalid health of archetype `{}`", section.name))?;
        let profile = resolve_profile(section)
            .with_context(|| format!("invalid archetype `{}`", section.name))?;
        let radius = positive(
            "perception_radius",
            section
                .perception_radius
                .unwrap_or(DEFAULT_PERCEPTION_RADIUS),
        )
        .with_context(|| format!("invalid archetype `{}`", section.name))?;
        let _ = table.register(
            section.name.clone(),
            ActorTemplate::enemy(health, profile, radius),
        );
    }
    Ok(table)
}

fn resolve_placed(archetypes: &ArchetypeTable, section: &PlacedSection) -> Result<PlacedActor> {
    let id = archetypes
        .find(&section.archetype)
        .with_context(|| format!("unknown archetype `{}`", section.archetype))?;
    let archetype = archetypes
        .get(id)
        .with_context(|| format!("archetype `{}` is not registered", section.archetype))?;
    let mut template = archetype.template.clone();
    if !section.route.is_empty() {
        let Some(profile) = template.enemy.as_mut() else {
            bail!("archetype `{}` cannot follow a patrol route", section.archetype);
        };
        profile.patrol_route = section.route.iter().copied().map(point).collect();
    }
    Ok(PlacedActor {
        template,
        position: point(section.position),
    })
}

fn resolve_spawner(
    section: &SpawnerSection,
    waves: &[WaveSection],
    archetypes: &ArchetypeTable,
    arena: ArenaBounds,
) -> Result<SpawnerConfig> {
    let mut definitions = Vec::with_capacity(waves.len());
    for wave in waves {
        let mut ids = Vec::with_capacity(wave.archetypes.len());
        for name in &wave.archetypes {
            let id = archetypes
                .find(name)
                .with_context(|| format!("wave `{}` names unknown archetype `{name}`", wave.name))?;
            ids.push(id);
        }
        definitions.push(WaveDefinition {
            name: wave.name.clone(),
            count: wave.count,
            archetypes: ids,
            spawn_interval: seconds("spawn_interval_secs", wave.spawn_interval_secs)
                .with_context(|| format!("invalid wave `{}`", wave.name))?,
        });
    }

    let mut config = SpawnerConfig::new(definitions);
    config.arena = arena;
    overlay_secs(
        &mut config.initial_delay,
        "spawner.initial_delay_secs",
        section.initial_delay_secs,
    )?;
    overlay_secs(
        &mut config.time_between_waves,
        "spawner.time_between_waves_secs",
        section.time_between_waves_secs,
    )?;
    overlay(
        &mut config.edge_margin,
        "spawner.edge_margin",
        section.edge_margin,
        non_negative,
    )?;
    if let Some(seed) = section.seed {
        config.rng_seed = seed;
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sprout_siege_core::ActorKind;

    #[test]
    fn bundled_encounter_resolves() {
        let encounter = builtin().expect("bundled encounter parses");
        assert_eq!(encounter.name, "Meadow");
        assert_eq!(encounter.archetypes.len(), 3);
        assert_eq!(encounter.spawner.waves.len(), 3);
        assert_eq!(encounter.spawner.rng_seed, 7);
        assert_eq!(encounter.plant.next_scene.as_deref(), Some("Greenhouse"));
        assert!(encounter.spawner.validate(&encounter.archetypes).is_ok());

        let plant = encounter.level.plant.expect("meadow has a plant");
        assert_eq!(plant.template.kind, ActorKind::Destructible);
        assert_eq!(plant.template.health.max_health, 6.0);

        let patrol = &encounter.level.enemies[0];
        let route = &patrol.template.enemy.as_ref().expect("enemy profile").patrol_route;
        assert_eq!(route.len(), 4);
        assert_eq!(route[1], Vec3::new(-8.0, 0.0, 8.0));
    }

    #[test]
    fn omitted_sections_fall_back_to_defaults() {
        let encounter = parse("name = \"Empty\"").expect("minimal encounter parses");
        assert_eq!(encounter.level.arena, ArenaBounds::default());
        assert_eq!(encounter.player, PlayerTuning::default());
        assert!(encounter.level.plant.is_none());
        assert!(encounter.spawner.waves.is_empty());
    }

    #[test]
    fn archetype_overrides_reach_the_template() {
        let encounter = parse(
            r#"
            [[archetypes]]
            name = "brute"
            behavior = "stationary"
            perception_radius = 3.5

            [archetypes.health]
            max_health = 20.0
            knockback_force = 0.0

            [archetypes.melee]
            damage = 4.0
            no_attack_point = true
            "#,
        )
        .expect("archetype parses");
        let id = encounter.archetypes.find("brute").expect("registered");
        let template = &encounter.archetypes.get(id).expect("present").template;
        assert_eq!(template.perception_radius, Some(3.5));
        assert_eq!(template.health.max_health, 20.0);
        assert_eq!(template.health.knockback_force, 0.0);
        assert_eq!(template.archetype, Some(id));
        let profile = template.enemy.as_ref().expect("enemy profile");
        assert_eq!(profile.behavior, BehaviorType::Stationary);
        assert_eq!(profile.melee.damage, 4.0);
        assert_eq!(profile.melee.attack_point, None);
    }

    #[test]
    fn unknown_wave_archetype_is_reported() {
        let error = parse(
            r#"
            [[waves]]
            name = "Ghosts"
            count = 2
            archetypes = ["ghost"]
            spawn_interval_secs = 1.0
            "#,
        )
        .expect_err("unknown archetype");
        assert!(format!("{error:#}").contains("unknown archetype `ghost`"));
    }

    #[test]
    fn negative_durations_are_rejected() {
        let error = parse(
            r#"
            [spawner]
            initial_delay_secs = -1.0
            "#,
        )
        .expect_err("negative delay");
        assert!(format!("{error:#}").contains("initial_delay_secs"));
    }

    #[test]
    fn non_finite_arena_is_rejected() {
        let error = parse("[arena]\ncenter = [nan, 0.0]").expect_err("nan centre");
        assert!(format!("{error:#}").contains("arena.center[0]"));

        let error = parse("[arena]\nsize = [inf, 40.0]").expect_err("infinite size");
        assert!(format!("{error:#}").contains("arena.size[0]"));

        let error = parse("[spawner]\nedge_margin = nan").expect_err("nan margin");
        assert!(format!("{error:#}").contains("spawner.edge_margin"));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(parse("[player]\nsped = 3.0").is_err());
    }

    #[test]
    fn duplicate_archetypes_are_rejected() {
        let error = parse(
            r#"
            [[archetypes]]
            name = "grunt"
            behavior = "patrol"

            [[archetypes]]
            name = "grunt"
            behavior = "ranged"
            "#,
        )
        .expect_err("duplicate archetype");
        assert!(format!("{error:#}").contains("duplicate archetype `grunt`"));
    }
}
