//! Observation packing

use prospector_core::constants::obs_layout::*;
use prospector_core::constants::{
    ALERT_MAX, CARGO_MAX, FUEL_MAX, HEAT_MAX, HULL_MAX, MAX_ASTEROIDS, MAX_NEIGHBORS,
    N_COMMODITIES, NODE_TYPES, OBS_DIM, TOOL_MAX,
};

use crate::params::*;
use crate::state::{CoreState, clampf};

fn normalize_comp_est(input: &[f32; N_COMMODITIES], out: &mut [f32]) {
    let mut sum = 0.0f32;
    for c in 0..N_COMMODITIES {
        let mut value = input[c];
        if value < 1.0e-8 {
            value = 1.0e-8;
        }
        out[c] = value;
        sum += value;
    }
    if sum <= 0.0 {
        out[..N_COMMODITIES].fill(1.0 / N_COMMODITIES as f32);
        return;
    }
    let inv_sum = 1.0 / sum;
    for value in out[..N_COMMODITIES].iter_mut() {
        *value *= inv_sum;
    }
}

pub(crate) fn pack_obs(state: &CoreState, obs: &mut [f32; OBS_DIM]) {
    obs.fill(0.0);

    let cargo_total = state.cargo_sum();

    obs[0] = clampf(state.fuel / FUEL_MAX, 0.0, 1.0);
    obs[1] = clampf(state.hull / HULL_MAX, 0.0, 1.0);
    obs[2] = clampf(state.heat / HEAT_MAX, 0.0, 1.0);
    obs[3] = clampf(state.tool_condition / TOOL_MAX, 0.0, 1.0);
    obs[4] = clampf(cargo_total / CARGO_MAX, 0.0, 1.0);
    obs[5] = clampf(state.alert / ALERT_MAX, 0.0, 1.0);
    obs[6] = clampf(state.time_remaining / state.time_max, 0.0, 1.0);

    let credits_norm = state.credits.max(0.0).ln_1p() / CREDITS_CAP.ln_1p();
    obs[CREDITS] = clampf(credits_norm, 0.0, 1.0);

    for c in 0..N_COMMODITIES {
        obs[CARGO_BASE + c] = clampf(state.cargo[c] / CARGO_MAX, 0.0, 1.0);
    }

    obs[SUPPLIES_BASE] = clampf(state.repair_kits as f32 / REPAIR_KITS_CAP as f32, 0.0, 1.0);
    obs[SUPPLIES_BASE + 1] = clampf(state.stabilizers as f32 / STABILIZERS_CAP as f32, 0.0, 1.0);
    obs[SUPPLIES_BASE + 2] = clampf(state.decoys as f32 / DECOYS_CAP as f32, 0.0, 1.0);

    obs[AT_STATION] = if state.is_at_station() { 1.0 } else { 0.0 };
    obs[SELECTED_VALID] = if state.selected_asteroid_valid() { 1.0 } else { 0.0 };

    let node = state.current_node;
    let node_type = state.node_type[node] as usize;
    if node_type < NODE_TYPES {
        obs[NODE_TYPE_BASE + node_type] = 1.0;
    }

    obs[NODE_INDEX] = clampf(node as f32 * INV_MAX_NODE_INDEX, 0.0, 1.0);
    obs[STEPS_TO_STATION] = clampf(
        state.steps_to_station_here() as f32 * INV_MAX_NODE_INDEX,
        0.0,
        1.0,
    );

    for slot in 0..MAX_NEIGHBORS {
        let base = NEIGHBOR_BASE + NEIGHBOR_STRIDE * slot;
        let neighbor = state.neighbors[node][slot];
        if neighbor < 0 {
            continue;
        }
        obs[base] = 1.0;
        let neigh_type = state.node_type[neighbor as usize] as usize;
        if neigh_type < NODE_TYPES {
            obs[base + 1 + neigh_type] = 1.0;
        }
        obs[base + 4] = clampf(
            state.edge_travel_time[node][slot] as f32 * INV_TRAVEL_TIME_MAX,
            0.0,
            1.0,
        );
        obs[base + 5] = clampf(
            state.edge_fuel_cost[node][slot] * INV_TRAVEL_FUEL_COST_MAX,
            0.0,
            1.0,
        );
        obs[base + 6] = clampf(state.edge_threat_est[node][slot], 0.0, 1.0);
    }

    for a in 0..MAX_ASTEROIDS {
        let base = ASTEROID_BASE + ASTEROID_STRIDE * a;
        if !state.ast_valid[node][a] {
            continue;
        }
        obs[base] = 1.0;
        normalize_comp_est(&state.comp_est[node][a], &mut obs[base + 1..base + 7]);
        obs[base + 7] = clampf(state.stability_est[node][a], 0.0, 1.0);
        obs[base + 8] = clampf(state.depletion[node][a], 0.0, 1.0);
        obs[base + 9] = clampf(state.scan_conf[node][a], 0.0, 1.0);
        obs[base + 10] = if a as i32 == state.selected_asteroid { 1.0 } else { 0.0 };
    }

    for c in 0..N_COMMODITIES {
        let price_norm = state.market_price[c] * INV_BASE_PRICE[c];
        obs[PRICE_BASE + c] = clampf(price_norm, 0.0, 1.0);

        let d_price = (state.market_price[c] - state.market_prev_price[c]) * INV_PRICE_SCALE;
        obs[DPRICE_BASE + c] = clampf(d_price, -1.0, 1.0);
    }

    for (i, &c) in OBSERVED_INVENTORY.iter().enumerate() {
        obs[INVENTORY_BASE + i] = clampf(
            state.station_inventory[c] * INV_STATION_INVENTORY_NORM_CAP,
            0.0,
            1.0,
        );
    }
}
