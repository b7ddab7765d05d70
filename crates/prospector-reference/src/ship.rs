//! Ship condition, hold and consumables

use serde::{Deserialize, Serialize};

use prospector_core::constants::{
    ALERT_MAX, CARGO_MAX, FUEL_MAX, HEAT_MAX, HULL_MAX, N_COMMODITIES, TOOL_MAX,
};

use crate::tuning::{STARTING_DECOYS, STARTING_REPAIR_KITS, STARTING_STABILIZERS};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ship {
    pub fuel: f32,
    pub hull: f32,
    pub heat: f32,
    pub tool: f32,
    pub alert: f32,
    pub credits: f32,
    pub cargo: [f32; N_COMMODITIES],
    pub repair_kits: u32,
    pub stabilizers: u32,
    pub decoys: u32,
    /// Ticks left on the emergency-burn escape window
    pub escape_ticks: u32,
}

impl Default for Ship {
    fn default() -> Self {
        Self {
            fuel: FUEL_MAX,
            hull: HULL_MAX,
            heat: 0.0,
            tool: TOOL_MAX,
            alert: 0.0,
            credits: 0.0,
            cargo: [0.0; N_COMMODITIES],
            repair_kits: STARTING_REPAIR_KITS,
            stabilizers: STARTING_STABILIZERS,
            decoys: STARTING_DECOYS,
            escape_ticks: 0,
        }
    }
}

impl Ship {
    pub fn cargo_total(&self) -> f32 {
        self.cargo.iter().sum()
    }

    pub fn free_capacity(&self) -> f32 {
        (CARGO_MAX - self.cargo_total()).max(0.0)
    }

    pub fn raise_alert(&mut self, amount: f32) {
        self.alert += amount;
    }

    pub fn lower_alert(&mut self, amount: f32) {
        self.alert = (self.alert - amount).max(0.0);
    }

    /// Pull every gauge back into range and rescale an overfull hold
    pub fn clamp(&mut self) {
        self.fuel = self.fuel.clamp(0.0, FUEL_MAX);
        self.hull = self.hull.clamp(0.0, HULL_MAX);
        self.heat = self.heat.clamp(0.0, HEAT_MAX);
        self.tool = self.tool.clamp(0.0, TOOL_MAX);
        self.alert = self.alert.clamp(0.0, ALERT_MAX);

        for amount in self.cargo.iter_mut() {
            *amount = amount.clamp(0.0, CARGO_MAX);
        }
        let total = self.cargo_total();
        if total > CARGO_MAX {
            let scale = CARGO_MAX / total;
            for amount in self.cargo.iter_mut() {
                *amount *= scale;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_rescales_overfull_hold() {
        let mut ship = Ship {
            cargo: [150.0, 150.0, 0.0, 0.0, 0.0, -3.0],
            fuel: -1.0,
            heat: 140.0,
            ..Ship::default()
        };
        ship.clamp();
        assert_eq!(ship.fuel, 0.0);
        assert_eq!(ship.heat, HEAT_MAX);
        assert_eq!(ship.cargo[5], 0.0);
        assert!((ship.cargo_total() - CARGO_MAX).abs() < 1e-3);
        assert_eq!(ship.cargo[0], ship.cargo[1]);
    }

    #[test]
    fn test_alert_never_goes_negative() {
        let mut ship = Ship::default();
        ship.raise_alert(2.0);
        ship.lower_alert(20.0);
        assert_eq!(ship.alert, 0.0);
    }

    #[test]
    fn test_serializes_for_inspection() {
        let json = serde_json::to_value(Ship::default()).unwrap();
        assert_eq!(json["repair_kits"], 3);
        assert_eq!(json["fuel"], 1000.0);
    }
}
