use super::parameter::round2;

/// How a flow decides whether it fires: a percentage roll or a cooldown.
///
/// A flow uses exactly one of these; the scaling rules of the two modes are
/// never combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActivationTrigger {
    Chance,
    Cooldown,
}

/// Chance (percent) and cooldown (seconds) after tier scaling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedActivation {
    pub chance: f64,
    pub cooldown: f64,
}

/// Fraction of the base cooldown left at the highest tier.
pub const MIN_COOLDOWN_FACTOR: f64 = 0.2;

/// Tier policy for activation odds and cooldowns.
pub struct ActivationScaling;

impl ActivationScaling {
    /// Scales activation for `tier` out of `max_tier`.
    ///
    /// Chance-triggered flows multiply the base chance by the tier (capped at
    /// 100) and drop the cooldown. Cooldown-triggered flows shrink the
    /// cooldown linearly from the full base at tier 1 to 20% of it at
    /// `max_tier`, and always fire.
    pub fn resolve(
        trigger: ActivationTrigger,
        base_chance: f64,
        base_cooldown: f64,
        tier: i32,
        max_tier: i32,
    ) -> ResolvedActivation {
        match trigger {
            ActivationTrigger::Chance => ResolvedActivation {
                chance: Self::chance(base_chance, tier),
                cooldown: 0.0,
            },
            ActivationTrigger::Cooldown => ResolvedActivation {
                chance: 100.0,
                cooldown: Self::cooldown(base_cooldown, tier, max_tier),
            },
        }
    }

    pub fn chance(base_chance: f64, tier: i32) -> f64 {
        (base_chance * tier.max(1) as f64).min(100.0)
    }

    pub fn cooldown(base_cooldown: f64, tier: i32, max_tier: i32) -> f64 {
        let max_tier = max_tier.max(1);
        if max_tier == 1 {
            return base_cooldown;
        }
        let tier = tier.clamp(1, max_tier);
        let progress = (tier - 1) as f64 / (max_tier - 1) as f64;
        round2(base_cooldown * (1.0 - (1.0 - MIN_COOLDOWN_FACTOR) * progress))
    }
}
