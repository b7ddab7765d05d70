//! Reward decomposition

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-term reward of one step
///
/// Terms are summed in declaration order. Floating-point addition is not
/// associative, so every implementation must accumulate in this same order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RewardBreakdown {
    /// Credits gained from sales, scaled
    pub sell: f32,
    /// Growth in held cargo value
    pub extract: f32,
    pub fuel: f32,
    pub time: f32,
    pub wear: f32,
    /// Quadratic penalty for heat above the safe band
    pub heat: f32,
    pub damage: f32,
    pub scan: f32,
    pub invalid: f32,
    pub pirate: f32,
    /// Stranded/destroyed penalties or the clean-ending bonus
    pub terminal: f32,
}

impl RewardBreakdown {
    pub fn total(&self) -> f32 {
        self.sell
            + self.extract
            + self.fuel
            + self.time
            + self.wear
            + self.heat
            + self.damage
            + self.scan
            + self.invalid
            + self.pirate
            + self.terminal
    }

    /// Named components for logging
    pub fn components(&self) -> BTreeMap<&'static str, f32> {
        BTreeMap::from([
            ("sell", self.sell),
            ("extract", self.extract),
            ("fuel", self.fuel),
            ("time", self.time),
            ("wear", self.wear),
            ("heat", self.heat),
            ("damage", self.damage),
            ("scan", self.scan),
            ("invalid", self.invalid),
            ("pirate", self.pirate),
            ("terminal", self.terminal),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_sums_every_term() {
        let breakdown = RewardBreakdown {
            sell: 1.0,
            time: -0.001,
            terminal: -50.0,
            ..Default::default()
        };
        assert!((breakdown.total() - (1.0 - 0.001 - 50.0)).abs() < 1e-6);
        assert_eq!(breakdown.components().len(), 11);
    }
}
