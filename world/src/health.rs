//! Health records owned by every actor.

use sprout_siege_core::{
    lift, planar, DamageRejection, DamageResult, HealthSnapshot, HealthTuning, Vec2, Vec3,
};

/// Squared planar distance below which attacker and victim count as coincident.
const COINCIDENT_DISTANCE_SQUARED: f32 = 0.001;

/// Outcome of routing a hit through a [`HealthRecord`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum HitResolution {
    /// The hit changed nothing.
    Ignored(DamageRejection),
    /// The hit reduced health without killing.
    Wounded {
        /// Velocity imparted by the hit, when the actor is knockback-eligible.
        knockback: Option<Vec3>,
    },
    /// The hit reduced health to zero and started the death sequence.
    Fatal,
}

impl From<HitResolution> for DamageResult {
    fn from(resolution: HitResolution) -> Self {
        match resolution {
            HitResolution::Ignored(_) => DamageResult::default(),
            HitResolution::Wounded { .. } => DamageResult {
                applied: true,
                became_fatal: false,
            },
            HitResolution::Fatal => DamageResult {
                applied: true,
                became_fatal: true,
            },
        }
    }
}

/// Hit points plus the damage-feedback flags of a single actor.
///
/// `current` never leaves `[0, max]` and `dead` never clears once set.
#[derive(Clone, Debug)]
pub struct HealthRecord {
    tuning: HealthTuning,
    current: f32,
    dead: bool,
    invulnerable: bool,
    knocked_back: bool,
    immune: bool,
}

impl HealthRecord {
    /// Creates a full health record.
    #[must_use]
    pub fn new(tuning: HealthTuning) -> Self {
        let max = sanitize(tuning.max_health);
        Self {
            tuning: HealthTuning {
                max_health: max,
                minimum_hit: sanitize(tuning.minimum_hit),
                ..tuning
            },
            current: max,
            dead: false,
            invulnerable: false,
            knocked_back: false,
            immune: false,
        }
    }

    /// Single entry point for damage.
    ///
    /// `position` and `facing` belong to the damaged actor and resolve the
    /// knockback direction away from `attacker`.
    pub fn apply_damage(
        &mut self,
        amount: f32,
        attacker: Option<Vec3>,
        position: Vec3,
        facing: Vec2,
    ) -> HitResolution {
        if self.dead {
            return HitResolution::Ignored(DamageRejection::Dead);
        }
        if self.immune {
            return HitResolution::Ignored(DamageRejection::Immune);
        }
        if self.invulnerable {
            return HitResolution::Ignored(DamageRejection::Invulnerable);
        }

        let mut amount = sanitize(amount);
        if amount > 0.0 {
            amount = amount.max(self.tuning.minimum_hit);
        }
        self.current = (self.current - amount).max(0.0);
        if self.current <= 0.0 {
            self.dead = true;
            self.invulnerable = false;
            self.knocked_back = false;
            return HitResolution::Fatal;
        }

        self.invulnerable = !self.tuning.invulnerability.is_zero();
        let knockback = attacker
            .filter(|_| self.tuning.knockback_force > 0.0)
            .map(|attacker| {
                knockback_direction(attacker, position, facing) * self.tuning.knockback_force
            });
        self.knocked_back = knockback.is_some() && !self.tuning.knockback_duration.is_zero();
        HitResolution::Wounded { knockback }
    }

    /// Closes the post-hit invulnerability window.
    pub fn end_invulnerability(&mut self) {
        self.invulnerable = false;
    }

    /// Returns control after a knockback.
    pub fn end_knockback(&mut self) {
        self.knocked_back = false;
    }

    /// Toggles explicit damage immunity.
    pub fn set_immune(&mut self, immune: bool) {
        self.immune = immune;
    }

    /// Tuning the record was created with.
    #[must_use]
    pub fn tuning(&self) -> &HealthTuning {
        &self.tuning
    }

    /// Remaining hit points.
    #[must_use]
    pub fn current(&self) -> f32 {
        self.current
    }

    /// Maximum hit points.
    #[must_use]
    pub fn max(&self) -> f32 {
        self.tuning.max_health
    }

    /// Whether the actor died.
    #[must_use]
    pub fn is_dead(&self) -> bool {
        self.dead
    }

    /// Whether damage is currently ignored because of a recent hit.
    #[must_use]
    pub fn is_invulnerable(&self) -> bool {
        self.invulnerable
    }

    /// Whether movement commands are locked out by a knockback.
    #[must_use]
    pub fn is_knocked_back(&self) -> bool {
        self.knocked_back
    }

    /// Whether damage is ignored unconditionally.
    #[must_use]
    pub fn is_immune(&self) -> bool {
        self.immune
    }

    /// Copies the record into a query snapshot.
    #[must_use]
    pub fn snapshot(&self) -> HealthSnapshot {
        HealthSnapshot {
            current: self.current,
            max: self.tuning.max_health,
            dead: self.dead,
            invulnerable: self.invulnerable,
            knocked_back: self.knocked_back,
            immune: self.immune,
        }
    }
}

fn sanitize(amount: f32) -> f32 {
    if amount.is_nan() || amount < 0.0 {
        0.0
    } else {
        amount
    }
}

fn knockback_direction(attacker: Vec3, position: Vec3, facing: Vec2) -> Vec3 {
    let away = planar(position) - planar(attacker);
    let direction = if away.length_squared() < COINCIDENT_DISTANCE_SQUARED {
        facing.normalize_or_zero()
    } else {
        away.normalize()
    };
    lift(direction)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn record() -> HealthRecord {
        HealthRecord::new(HealthTuning::default())
    }

    fn hit(record: &mut HealthRecord, amount: f32) -> HitResolution {
        record.apply_damage(amount, None, Vec3::ZERO, Vec2::Y)
    }

    #[test]
    fn current_stays_within_bounds() {
        let mut record = HealthRecord::new(HealthTuning {
            invulnerability: Duration::ZERO,
            ..HealthTuning::default()
        });
        for amount in [3.0, -4.0, f32::NAN, 2.5, 100.0, 7.0] {
            let _ = hit(&mut record, amount);
            assert!(record.current() >= 0.0);
            assert!(record.current() <= record.max());
        }
        assert_eq!(record.current(), 0.0);
    }

    #[test]
    fn minimum_hit_rounds_small_hits_up() {
        let mut record = HealthRecord::new(HealthTuning {
            minimum_hit: 1.0,
            ..HealthTuning::destructible(6.0)
        });
        let _ = hit(&mut record, 0.25);
        assert_eq!(record.current(), 5.0);
        let _ = hit(&mut record, 2.5);
        assert_eq!(record.current(), 2.5);
        let _ = hit(&mut record, 0.0);
        assert_eq!(record.current(), 2.5);
    }

    #[test]
    fn invulnerability_blocks_follow_up_hits() {
        let mut record = record();
        assert!(matches!(hit(&mut record, 3.0), HitResolution::Wounded { .. }));
        assert!(record.is_invulnerable());
        assert_eq!(
            hit(&mut record, 3.0),
            HitResolution::Ignored(DamageRejection::Invulnerable)
        );
        assert_eq!(record.current(), 7.0);

        record.end_invulnerability();
        let _ = hit(&mut record, 3.0);
        assert_eq!(record.current(), 4.0);
    }

    #[test]
    fn death_is_final() {
        let mut record = record();
        assert_eq!(hit(&mut record, 25.0), HitResolution::Fatal);
        assert!(record.is_dead());
        assert!(!record.is_invulnerable());
        assert_eq!(hit(&mut record, 1.0), HitResolution::Ignored(DamageRejection::Dead));
        assert_eq!(DamageResult::from(hit(&mut record, 1.0)), DamageResult::default());
        assert!(record.is_dead());
    }

    #[test]
    fn knockback_points_away_from_attacker() {
        let mut record = record();
        let resolution = record.apply_damage(
            1.0,
            Some(Vec3::new(0.0, 3.0, -2.0)),
            Vec3::ZERO,
            Vec2::X,
        );
        let HitResolution::Wounded {
            knockback: Some(velocity),
        } = resolution
        else {
            panic!("expected a knockback, got {resolution:?}");
        };
        assert!((velocity - Vec3::new(0.0, 0.0, 8.0)).length() < 1e-5);
        assert!(record.is_knocked_back());
    }

    #[test]
    fn coincident_attacker_falls_back_to_facing() {
        let mut record = record();
        let resolution =
            record.apply_damage(1.0, Some(Vec3::new(0.01, 0.0, 0.0)), Vec3::ZERO, Vec2::X);
        assert_eq!(
            resolution,
            HitResolution::Wounded {
                knockback: Some(Vec3::new(8.0, 0.0, 0.0))
            }
        );
    }

    #[test]
    fn immune_records_ignore_damage() {
        let mut record = HealthRecord::new(HealthTuning::destructible(6.0));
        record.set_immune(true);
        assert_eq!(hit(&mut record, 6.0), HitResolution::Ignored(DamageRejection::Immune));
        record.set_immune(false);
        assert!(matches!(
            hit(&mut record, 1.0),
            HitResolution::Wounded { knockback: None }
        ));
        assert!(!record.is_invulnerable());
    }
}
