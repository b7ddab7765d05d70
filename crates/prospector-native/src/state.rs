//! Flat simulation state
//!
//! Everything lives in fixed-size arrays indexed by node, neighbour slot,
//! asteroid slot and commodity. A neighbour entry of `-1` marks an empty slot.

use bytemuck::Zeroable;
use prospector_core::abi::{AbpEvent, MAX_EVENTS};
use prospector_core::constants::{
    MAX_ASTEROIDS, MAX_NEIGHBORS, MAX_NODES, N_COMMODITIES, NODE_STATION,
};
use prospector_core::EventKind;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) enum Phase {
    #[default]
    Fresh,
    Running,
    Ended,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct EventLog {
    pub entries: [AbpEvent; MAX_EVENTS],
    pub count: usize,
}

impl Default for EventLog {
    fn default() -> Self {
        Self {
            entries: [AbpEvent::zeroed(); MAX_EVENTS],
            count: 0,
        }
    }
}

impl EventLog {
    pub fn clear(&mut self) {
        self.count = 0;
    }

    pub fn push(&mut self, kind: EventKind, value: f32) {
        if self.count < MAX_EVENTS {
            self.entries[self.count] = AbpEvent {
                kind: kind.code(),
                value,
            };
            self.count += 1;
        }
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct CoreState {
    pub time_max: f32,
    pub invalid_action_penalty: f32,
    pub rng: crate::rng::Pcg32,
    pub seed: u64,
    pub phase: Phase,

    pub ticks_elapsed: u32,
    pub time_remaining: f32,

    pub node_count: usize,
    pub current_node: usize,
    pub selected_asteroid: i32,

    pub credits: f32,
    pub fuel: f32,
    pub hull: f32,
    pub heat: f32,
    pub tool_condition: f32,
    pub alert: f32,
    pub cargo: [f32; N_COMMODITIES],

    pub repair_kits: u32,
    pub stabilizers: u32,
    pub decoys: u32,
    pub escape_buff_ticks: u32,
    pub stabilize_buff_ticks: [u32; MAX_ASTEROIDS],

    pub node_type: [u8; MAX_NODES],
    pub node_hazard: [f32; MAX_NODES],
    pub node_pirate: [f32; MAX_NODES],
    pub steps_to_station: [u8; MAX_NODES],
    pub neighbors: [[i32; MAX_NEIGHBORS]; MAX_NODES],
    pub edge_travel_time: [[u32; MAX_NEIGHBORS]; MAX_NODES],
    pub edge_fuel_cost: [[f32; MAX_NEIGHBORS]; MAX_NODES],
    pub edge_threat_true: [[f32; MAX_NEIGHBORS]; MAX_NODES],
    pub edge_threat_est: [[f32; MAX_NEIGHBORS]; MAX_NODES],

    pub ast_valid: [[bool; MAX_ASTEROIDS]; MAX_NODES],
    pub true_comp: [[[f32; N_COMMODITIES]; MAX_ASTEROIDS]; MAX_NODES],
    pub richness: [[f32; MAX_ASTEROIDS]; MAX_NODES],
    pub stability_true: [[f32; MAX_ASTEROIDS]; MAX_NODES],
    pub noise_profile: [[f32; MAX_ASTEROIDS]; MAX_NODES],

    pub comp_est: [[[f32; N_COMMODITIES]; MAX_ASTEROIDS]; MAX_NODES],
    pub stability_est: [[f32; MAX_ASTEROIDS]; MAX_NODES],
    pub scan_conf: [[f32; MAX_ASTEROIDS]; MAX_NODES],
    pub depletion: [[f32; MAX_ASTEROIDS]; MAX_NODES],

    pub market_price: [f32; N_COMMODITIES],
    pub market_prev_price: [f32; N_COMMODITIES],
    pub price_phase: [f32; N_COMMODITIES],
    pub price_period: [f32; N_COMMODITIES],
    pub price_amp: [f32; N_COMMODITIES],
    pub station_inventory: [f32; N_COMMODITIES],
    pub recent_sales: [f32; N_COMMODITIES],

    pub total_spend: f32,
    pub overheat_ticks: u32,
    pub pirate_encounters: u32,
    pub value_lost_to_pirates: f32,
    pub scan_count: u32,
    pub mining_ticks: u32,
    pub fuel_start: f32,
    pub hull_start: f32,
    pub tool_start: f32,
    pub cargo_util_sum: f32,
    pub cargo_util_count: f32,

    pub events: EventLog,
}

pub(crate) fn clampf(value: f32, low: f32, high: f32) -> f32 {
    if value < low {
        return low;
    }
    if value > high {
        return high;
    }
    value
}

pub(crate) fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

impl CoreState {
    pub fn cargo_sum(&self) -> f32 {
        let mut total = 0.0f32;
        for value in &self.cargo {
            total += *value;
        }
        total
    }

    pub fn is_at_station(&self) -> bool {
        self.node_type[self.current_node] == NODE_STATION
    }

    pub fn selected_asteroid_valid(&self) -> bool {
        let a = self.selected_asteroid;
        if a < 0 || a >= MAX_ASTEROIDS as i32 {
            return false;
        }
        let a = a as usize;
        self.ast_valid[self.current_node][a] && self.depletion[self.current_node][a] < 1.0
    }

    pub fn est_cargo_value(&self) -> f32 {
        let mut value = 0.0f32;
        for c in 0..N_COMMODITIES {
            value += self.cargo[c] * self.market_price[c];
        }
        value
    }

    pub fn steps_to_station_here(&self) -> u8 {
        if self.current_node >= self.node_count {
            return (MAX_NODES - 1) as u8;
        }
        self.steps_to_station[self.current_node]
    }
}
