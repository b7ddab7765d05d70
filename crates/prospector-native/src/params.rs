//! Tuning constants for the compiled core

use prospector_core::constants::{MAX_NODES, N_COMMODITIES};

pub const CREDITS_CAP: f32 = 10_000_000.0;

pub const REPAIR_KITS_CAP: u32 = 12;
pub const STABILIZERS_CAP: u32 = 12;
pub const DECOYS_CAP: u32 = 12;

pub const TRAVEL_TIME_MAX: f32 = 8.0;
pub const TRAVEL_FUEL_COST_MAX: f32 = 160.0;
pub const INV_TRAVEL_TIME_MAX: f32 = 1.0 / TRAVEL_TIME_MAX;
pub const INV_TRAVEL_FUEL_COST_MAX: f32 = 1.0 / TRAVEL_FUEL_COST_MAX;

pub const PRICE_SCALE: f32 = 100.0;
pub const INV_PRICE_SCALE: f32 = 1.0 / PRICE_SCALE;
pub const INV_STATION_INVENTORY_NORM_CAP: f32 = 1.0 / 500.0;
pub const INV_MAX_NODE_INDEX: f32 = 1.0 / (MAX_NODES - 1) as f32;

pub const WIDE_SCAN_TIME: u32 = 3;
pub const FOCUSED_SCAN_TIME: u32 = 2;
pub const DEEP_SCAN_TIME: u32 = 4;
pub const THREAT_LISTEN_TIME: u32 = 2;
pub const STABILIZE_TIME: u32 = 2;
pub const REFINE_TIME: u32 = 2;
pub const COOLDOWN_TIME: u32 = 2;
pub const MAINT_TIME: u32 = 2;
pub const PATCH_TIME: u32 = 2;
pub const DOCK_TIME: u32 = 1;
pub const OVERHAUL_TIME: u32 = 3;

pub const WIDE_SCAN_FUEL: f32 = 5.0;
pub const FOCUSED_SCAN_FUEL: f32 = 4.0;
pub const DEEP_SCAN_FUEL: f32 = 8.0;
pub const REFINE_FUEL: f32 = 4.0;
pub const COOLDOWN_FUEL: f32 = 2.0;
pub const EMERGENCY_BURN_FUEL: f32 = 18.0;

pub const REFINE_HEAT: f32 = 6.0;
pub const COOLDOWN_AMOUNT: f32 = 20.0;

pub const EMERGENCY_BURN_ALERT: f32 = 10.0;
pub const WIDE_SCAN_ALERT: f32 = 4.0;
pub const FOCUSED_SCAN_ALERT: f32 = 3.0;
pub const DEEP_SCAN_ALERT: f32 = 6.0;
pub const REFINE_ALERT: f32 = 3.0;
pub const COOLDOWN_ALERT: f32 = 1.0;
pub const ALERT_DECAY_HOLD: f32 = 3.0;
pub const DOCK_ALERT_DROP: f32 = 20.0;
pub const JETTISON_ALERT_RELIEF: f32 = 8.0;

pub const HEAT_DISSIPATION_PER_TICK: f32 = 2.5;
pub const OVERHEAT_DAMAGE_PER_UNIT: f32 = 1.25;

pub const TOOL_REPAIR_AMOUNT: f32 = 25.0;
pub const HULL_PATCH_AMOUNT: f32 = 20.0;

pub const ESCAPE_BUFF_TICKS: u32 = 4;
pub const STABILIZE_BUFF_TICKS: u32 = 6;

pub const FRACTURE_DEPLETION_RATE: f32 = 0.01;

pub const HAZARD_DAMAGE_PER_TICK: f32 = 0.7;
pub const HAZARD_HEAT_PER_TICK: f32 = 0.5;
pub const HAZARD_ALERT_PER_TICK: f32 = 0.8;

pub const PIRATE_BIAS: f32 = -4.0;
pub const PIRATE_INTENSITY_W: f32 = 3.0;
pub const PIRATE_ALERT_W: f32 = 2.2;
pub const PIRATE_CARGO_W: f32 = 0.8;
pub const PIRATE_ESCAPE_W: f32 = 2.8;

pub const SLIPPAGE_K: f32 = 0.25;
pub const SLIPPAGE_ROOT: f32 = 0.2;

pub const INVENTORY_PRESSURE_K: f32 = 0.04;
pub const SALES_PRESSURE_K: f32 = 0.05;
pub const MARKET_NOISE_K: f32 = 0.03;
pub const SALES_DECAY_TAU: f32 = 14.0;

pub const BUY_FUEL_SMALL: (f32, f32) = (120.0, 60.0);
pub const BUY_FUEL_MED: (f32, f32) = (260.0, 120.0);
pub const BUY_FUEL_LARGE: (f32, f32) = (480.0, 210.0);
pub const BUY_REPAIR_KIT_COST: f32 = 150.0;
pub const BUY_STABILIZER_COST: f32 = 175.0;
pub const BUY_DECOY_COST: f32 = 110.0;
pub const OVERHAUL_COST: f32 = 280.0;

pub const REWARD_ALPHA_EXTRACT: f32 = 0.02;
pub const REWARD_BETA_FUEL: f32 = 0.10;
pub const REWARD_GAMMA_TIME: f32 = 0.001;
pub const REWARD_DELTA_WEAR: f32 = 0.05;
pub const REWARD_EPSILON_HEAT: f32 = 0.20;
pub const REWARD_ZETA_DAMAGE: f32 = 1.00;
pub const REWARD_KAPPA_PIRATE: f32 = 1.00;
pub const REWARD_SCAN_COST: f32 = 0.005;
pub const REWARD_HEAT_SAFE_FRAC: f32 = 0.70;
pub const REWARD_STRANDED_PEN: f32 = 50.0;
pub const REWARD_DESTROYED_PEN: f32 = 100.0;
pub const REWARD_TERMINAL_BONUS_B: f32 = 0.002;

pub const BASE_PRICE: [f32; N_COMMODITIES] = [45.0, 55.0, 85.0, 145.0, 210.0, 120.0];
pub const INV_BASE_PRICE: [f32; N_COMMODITIES] = [
    1.0 / 45.0,
    1.0 / 55.0,
    1.0 / 85.0,
    1.0 / 145.0,
    1.0 / 210.0,
    1.0 / 120.0,
];
pub const MIN_PRICE: [f32; N_COMMODITIES] = [12.0, 15.0, 20.0, 50.0, 80.0, 30.0];
pub const MAX_PRICE: [f32; N_COMMODITIES] = [180.0, 200.0, 240.0, 320.0, 420.0, 300.0];
