//! Frozen dimensions shared by every implementation

/// Length of every observation vector
pub const OBS_DIM: usize = 260;

/// Number of discrete actions (valid actions are `0..N_ACTIONS`)
pub const N_ACTIONS: usize = 69;

/// Largest valid action index
pub const MAX_ACTION: u8 = (N_ACTIONS - 1) as u8;

pub const N_COMMODITIES: usize = 6;
pub const MAX_NODES: usize = 32;
pub const MAX_NEIGHBORS: usize = 6;
pub const MAX_ASTEROIDS: usize = 16;
pub const NODE_TYPES: usize = 3;

pub const NODE_STATION: u8 = 0;
pub const NODE_CLUSTER: u8 = 1;
pub const NODE_HAZARD: u8 = 2;

/// Commodity names in cargo/market slot order
pub const COMMODITY_NAMES: [&str; N_COMMODITIES] = [
    "iron",
    "nickel",
    "water_ice",
    "pge",
    "rare_isotopes",
    "volatiles",
];

pub const CREDIT_SCALE: f32 = 1000.0;
pub const FUEL_MAX: f32 = 1000.0;
pub const HULL_MAX: f32 = 100.0;
pub const HEAT_MAX: f32 = 100.0;
pub const TOOL_MAX: f32 = 100.0;
pub const CARGO_MAX: f32 = 200.0;
pub const ALERT_MAX: f32 = 100.0;

/// Default episode time budget in ticks
pub const DEFAULT_TIME_MAX: f32 = 20000.0;
pub const DEFAULT_INVALID_ACTION_PENALTY: f32 = 0.01;

/// PCG32 stream selector for the environment's random stream
pub const ENV_RNG_STREAM: u64 = 54;

/// Observation slot offsets
pub mod obs_layout {
    pub const SHIP_BASE: usize = 0;
    pub const CREDITS: usize = 7;
    pub const CARGO_BASE: usize = 8;
    pub const SUPPLIES_BASE: usize = 14;
    pub const AT_STATION: usize = 17;
    pub const SELECTED_VALID: usize = 18;
    pub const NODE_TYPE_BASE: usize = 19;
    pub const NODE_INDEX: usize = 22;
    pub const STEPS_TO_STATION: usize = 23;
    pub const NEIGHBOR_BASE: usize = 24;
    pub const NEIGHBOR_STRIDE: usize = 7;
    pub const ASTEROID_BASE: usize = 68;
    pub const ASTEROID_STRIDE: usize = 11;
    pub const PRICE_BASE: usize = 244;
    pub const DPRICE_BASE: usize = 250;
    pub const INVENTORY_BASE: usize = 256;
    /// Commodities whose station inventory is observed, in slot order
    pub const OBSERVED_INVENTORY: [usize; 4] = [0, 2, 3, 4];
}
