//! Gameplay tuning
//!
//! Per-mode profiles for scanning and mining plus the scalar constants the
//! dynamics use. Reciprocal constants are multiplied, never divided by, so
//! results round exactly like the compiled core.

use prospector_core::constants::{MAX_NODES, N_COMMODITIES};
use prospector_core::{FuelPack, MiningMode, ScanMode, Supply};

pub const STARTING_REPAIR_KITS: u32 = 3;
pub const STARTING_STABILIZERS: u32 = 2;
pub const STARTING_DECOYS: u32 = 1;
pub const SUPPLY_CAP: u32 = 12;

pub const CREDITS_NORM_CAP: f32 = 10_000_000.0;
pub const TRAVEL_TIME_CAP: u32 = 8;
pub const TRAVEL_FUEL_CAP: f32 = 160.0;
pub const RECIP_TRAVEL_TIME_CAP: f32 = 1.0 / 8.0;
pub const RECIP_TRAVEL_FUEL_CAP: f32 = 1.0 / TRAVEL_FUEL_CAP;
pub const RECIP_PRICE_DELTA_SCALE: f32 = 1.0 / 100.0;
pub const RECIP_INVENTORY_CAP: f32 = 1.0 / 500.0;
pub const RECIP_NODE_SPAN: f32 = 1.0 / (MAX_NODES - 1) as f32;

pub const HOLD_ALERT_RELIEF: f32 = 3.0;
pub const HEAT_SHED_PER_TICK: f32 = 2.5;
pub const OVERHEAT_HULL_PER_UNIT: f32 = 1.25;

pub const BURN_FUEL: f32 = 18.0;
pub const BURN_ALERT: f32 = 10.0;
pub const ESCAPE_TICKS: u32 = 4;

pub const LISTEN_TICKS: u32 = 2;
pub const LISTEN_NOISE: f32 = 0.08;

pub const STABILIZE_TICKS: u32 = 2;
pub const STABILIZE_BUFF: u32 = 6;

pub const REFINE_TICKS: u32 = 2;
pub const REFINE_FUEL: f32 = 4.0;
pub const REFINE_HEAT: f32 = 6.0;
pub const REFINE_ALERT: f32 = 3.0;
pub const REFINE_INPUT_SHARE: f32 = 0.15;
pub const REFINE_YIELD: f32 = 0.65;

pub const COOLDOWN_TICKS: u32 = 2;
pub const COOLDOWN_FUEL: f32 = 2.0;
pub const COOLDOWN_HEAT: f32 = 20.0;
pub const COOLDOWN_ALERT: f32 = 1.0;

pub const REPAIR_TICKS: u32 = 2;
pub const TOOL_REPAIR: f32 = 25.0;
pub const HULL_PATCH: f32 = 20.0;

pub const JETTISON_ALERT_RELIEF: f32 = 8.0;
pub const DOCK_ALERT_RELIEF: f32 = 20.0;

pub const OVERHAUL_TICKS: u32 = 3;
pub const OVERHAUL_COST: f32 = 280.0;

pub const DEPLETION_PER_UNIT: f32 = 0.01;
pub const FRACTURE_HULL_DAMAGE: f32 = 12.0;
pub const FRACTURE_HAZARD_BUMP: f32 = 0.1;

pub const HAZARD_HULL: f32 = 0.7;
pub const HAZARD_HEAT: f32 = 0.5;
pub const HAZARD_ALERT: f32 = 0.8;

pub const PIRATE_BASE_LOGIT: f32 = -4.0;
pub const PIRATE_INTENSITY_WEIGHT: f32 = 3.0;
pub const PIRATE_ALERT_WEIGHT: f32 = 2.2;
pub const PIRATE_CARGO_WEIGHT: f32 = 0.8;
pub const PIRATE_ESCAPE_RELIEF: f32 = 2.8;
pub const PIRATE_ALERT_GAIN: f32 = 8.0;
pub const DECOY_SUCCESS: f32 = 0.6;
pub const DECOY_LOSS_SCALE: f32 = 0.3;

/// Reward term weights
pub mod reward {
    pub const EXTRACT: f32 = 0.02;
    pub const FUEL: f32 = 0.10;
    pub const TIME: f32 = 0.001;
    pub const WEAR: f32 = 0.05;
    pub const HEAT: f32 = 0.20;
    pub const DAMAGE: f32 = 1.0;
    pub const PIRATE: f32 = 1.0;
    pub const SCAN: f32 = 0.005;
    pub const HEAT_SAFE_SHARE: f32 = 0.70;
    pub const STRANDED: f32 = 50.0;
    pub const DESTROYED: f32 = 100.0;
    pub const CLEAN_FINISH: f32 = 0.002;
}

/// Static price band of one commodity
#[derive(Debug, Clone, Copy)]
pub struct PriceBand {
    pub base: f32,
    pub recip_base: f32,
    pub floor: f32,
    pub ceiling: f32,
}

pub const PRICE_BANDS: [PriceBand; N_COMMODITIES] = [
    PriceBand { base: 45.0, recip_base: 1.0 / 45.0, floor: 12.0, ceiling: 180.0 },
    PriceBand { base: 55.0, recip_base: 1.0 / 55.0, floor: 15.0, ceiling: 200.0 },
    PriceBand { base: 85.0, recip_base: 1.0 / 85.0, floor: 20.0, ceiling: 240.0 },
    PriceBand { base: 145.0, recip_base: 1.0 / 145.0, floor: 50.0, ceiling: 320.0 },
    PriceBand { base: 210.0, recip_base: 1.0 / 210.0, floor: 80.0, ceiling: 420.0 },
    PriceBand { base: 120.0, recip_base: 1.0 / 120.0, floor: 30.0, ceiling: 300.0 },
];

pub const SLIPPAGE_LINEAR: f32 = 0.25;
pub const SLIPPAGE_SQRT: f32 = 0.2;
pub const SLIPPAGE_CAP: f32 = 0.70;
pub const INVENTORY_PRESSURE: f32 = 0.04;
pub const SALES_PRESSURE: f32 = 0.05;
pub const PRICE_NOISE: f32 = 0.03;
pub const SALES_MEMORY_TICKS: f32 = 14.0;
pub const INVENTORY_RETENTION: f32 = 0.998;

#[derive(Debug, Clone, Copy)]
pub struct ScanProfile {
    pub ticks: u32,
    pub fuel: f32,
    pub alert: f32,
    pub blend: f32,
    pub confidence_gain: f32,
    pub noise_scale: f32,
}

pub fn scan_profile(mode: ScanMode) -> ScanProfile {
    match mode {
        ScanMode::Wide => ScanProfile {
            ticks: 3,
            fuel: 5.0,
            alert: 4.0,
            blend: 0.22,
            confidence_gain: 0.10,
            noise_scale: 1.35,
        },
        ScanMode::Focused => ScanProfile {
            ticks: 2,
            fuel: 4.0,
            alert: 3.0,
            blend: 0.42,
            confidence_gain: 0.20,
            noise_scale: 1.0,
        },
        ScanMode::Deep => ScanProfile {
            ticks: 4,
            fuel: 8.0,
            alert: 6.0,
            blend: 0.80,
            confidence_gain: 0.45,
            noise_scale: 0.55,
        },
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MiningProfile {
    pub yield_scale: f32,
    pub heat: f32,
    pub wear: f32,
    pub alert: f32,
    pub yield_sigma: f32,
    pub fracture_bias: f32,
}

pub fn mining_profile(mode: MiningMode) -> MiningProfile {
    match mode {
        MiningMode::Conservative => MiningProfile {
            yield_scale: 0.80,
            heat: 2.0,
            wear: 0.8,
            alert: 1.2,
            yield_sigma: 0.05,
            fracture_bias: -0.7,
        },
        MiningMode::Standard => MiningProfile {
            yield_scale: 1.15,
            heat: 4.0,
            wear: 1.6,
            alert: 2.2,
            yield_sigma: 0.10,
            fracture_bias: 0.0,
        },
        MiningMode::Aggressive => MiningProfile {
            yield_scale: 1.55,
            heat: 7.0,
            wear: 2.8,
            alert: 4.0,
            yield_sigma: 0.16,
            fracture_bias: 0.8,
        },
    }
}

/// `(fuel units, credits)`
pub fn fuel_pack(pack: FuelPack) -> (f32, f32) {
    match pack {
        FuelPack::Small => (120.0, 60.0),
        FuelPack::Medium => (260.0, 120.0),
        FuelPack::Large => (480.0, 210.0),
    }
}

pub fn supply_cost(supply: Supply) -> f32 {
    match supply {
        Supply::RepairKit => 150.0,
        Supply::Stabilizer => 175.0,
        Supply::Decoy => 110.0,
    }
}
