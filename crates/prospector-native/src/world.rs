//! Episode initialisation and world generation
//!
//! Draw order here is part of the parity contract: node types, spanning tree,
//! extra edges, asteroids, then the market.

use prospector_core::constants::{
    ENV_RNG_STREAM, FUEL_MAX, HULL_MAX, MAX_ASTEROIDS, MAX_NEIGHBORS, MAX_NODES,
    N_COMMODITIES, NODE_CLUSTER, NODE_HAZARD, NODE_STATION, TOOL_MAX,
};

use crate::params::*;
use crate::state::{CoreState, Phase, clampf};

/// Reinitialise every field from `seed`, keeping the instance configuration
pub(crate) fn init_episode(state: &mut CoreState, seed: u64) {
    let time_max = state.time_max;
    let penalty = state.invalid_action_penalty;
    *state = CoreState::default();
    state.time_max = time_max;
    state.invalid_action_penalty = penalty;

    state.seed = seed;
    state.selected_asteroid = -1;

    state.fuel = FUEL_MAX;
    state.hull = HULL_MAX;
    state.heat = 0.0;
    state.tool_condition = TOOL_MAX;
    state.alert = 0.0;
    state.time_remaining = state.time_max;
    state.credits = 0.0;

    state.repair_kits = 3;
    state.stabilizers = 2;
    state.decoys = 1;

    state.fuel_start = state.fuel;
    state.hull_start = state.hull;
    state.tool_start = state.tool_condition;

    state.rng.seed(seed, ENV_RNG_STREAM);
    generate_world(state);
    state.phase = Phase::Running;
}

fn generate_world(state: &mut CoreState) {
    state.node_count = state.rng.u32_range(8, MAX_NODES as u32 + 1) as usize;
    state.current_node = 0;

    for node in 0..MAX_NODES {
        state.node_type[node] = NODE_CLUSTER;
        state.node_hazard[node] = 0.0;
        state.node_pirate[node] = 0.0;
        state.steps_to_station[node] = (MAX_NODES - 1) as u8;
        for slot in 0..MAX_NEIGHBORS {
            state.neighbors[node][slot] = -1;
            state.edge_travel_time[node][slot] = 1;
            state.edge_fuel_cost[node][slot] = 0.0;
            state.edge_threat_true[node][slot] = 0.0;
            state.edge_threat_est[node][slot] = 0.5;
        }
    }

    state.node_type[0] = NODE_STATION;

    for node in 1..state.node_count {
        state.node_type[node] = if state.rng.next_f32() < 0.25 {
            NODE_HAZARD
        } else {
            NODE_CLUSTER
        };
        state.node_hazard[node] = state.rng.uniform(0.05, 0.35);
        state.node_pirate[node] = state.rng.uniform(0.05, 0.30);
        if state.node_type[node] == NODE_HAZARD {
            state.node_hazard[node] += 0.25;
            state.node_pirate[node] += 0.12;
        }
    }

    for node in 1..state.node_count {
        let parent = state.rng.u32_range(0, node as u32) as usize;
        add_edge(state, node, parent);
    }

    let count = state.node_count as u32;
    for _ in 0..state.node_count {
        let u = state.rng.u32_range(0, count) as usize;
        let v = state.rng.u32_range(0, count) as usize;
        if u == v {
            continue;
        }
        add_edge(state, u, v);
    }

    recompute_steps_to_station(state);
    generate_asteroids(state);
    generate_market(state);
}

fn edge_exists(state: &CoreState, u: usize, v: usize) -> bool {
    state.neighbors[u].iter().any(|&n| n == v as i32)
}

fn first_free_slot(state: &CoreState, node: usize) -> Option<usize> {
    state.neighbors[node].iter().position(|&n| n < 0)
}

fn add_edge(state: &mut CoreState, u: usize, v: usize) {
    if u >= state.node_count || v >= state.node_count {
        return;
    }
    if edge_exists(state, u, v) {
        return;
    }
    let (Some(u_slot), Some(v_slot)) = (first_free_slot(state, u), first_free_slot(state, v))
    else {
        return;
    };

    let t_time = state.rng.u32_range(1, TRAVEL_TIME_MAX as u32 + 1);
    let fuel_cost = state.rng.uniform(20.0, TRAVEL_FUEL_COST_MAX * 0.7);

    let mut threat = 0.5 * (state.node_hazard[u] + state.node_hazard[v])
        + 0.5 * (state.node_pirate[u] + state.node_pirate[v])
        + state.rng.normal(0.0, 0.05);
    threat = clampf(threat, 0.0, 1.0);

    state.neighbors[u][u_slot] = v as i32;
    state.neighbors[v][v_slot] = u as i32;

    state.edge_travel_time[u][u_slot] = t_time;
    state.edge_travel_time[v][v_slot] = t_time;

    state.edge_fuel_cost[u][u_slot] = fuel_cost;
    state.edge_fuel_cost[v][v_slot] = fuel_cost;

    state.edge_threat_true[u][u_slot] = threat;
    state.edge_threat_true[v][v_slot] = threat;
    state.edge_threat_est[u][u_slot] = 0.5;
    state.edge_threat_est[v][v_slot] = 0.5;
}

/// Breadth-first hop counts from the station
fn recompute_steps_to_station(state: &mut CoreState) {
    let cap = (MAX_NODES - 1) as u8;
    let mut visited = [false; MAX_NODES];
    let mut queue = [0usize; MAX_NODES];
    let (mut head, mut tail) = (0usize, 0usize);

    state.steps_to_station = [cap; MAX_NODES];
    if state.node_count == 0 {
        return;
    }

    visited[0] = true;
    state.steps_to_station[0] = 0;
    queue[tail] = 0;
    tail += 1;

    while head < tail {
        let cur = queue[head];
        head += 1;
        let cur_dist = state.steps_to_station[cur];
        for slot in 0..MAX_NEIGHBORS {
            let neighbor = state.neighbors[cur][slot];
            if neighbor < 0 || neighbor as usize >= state.node_count {
                continue;
            }
            let neighbor = neighbor as usize;
            if visited[neighbor] {
                continue;
            }
            visited[neighbor] = true;
            state.steps_to_station[neighbor] = if cur_dist < cap { cur_dist + 1 } else { cap };
            if tail < MAX_NODES {
                queue[tail] = neighbor;
                tail += 1;
            }
        }
    }
}

fn generate_asteroids(state: &mut CoreState) {
    for node in 0..state.node_count {
        if state.node_type[node] == NODE_STATION {
            continue;
        }

        let n_ast = state.rng.u32_range(5, MAX_ASTEROIDS as u32 + 1) as usize;
        for a in 0..n_ast {
            let mut dir = [0.0f32; N_COMMODITIES];
            let mut dir_est = [0.0f32; N_COMMODITIES];

            state.ast_valid[node][a] = true;

            state.rng.dirichlet_ones(&mut dir);
            state.true_comp[node][a] = dir;

            state.richness[node][a] = clampf(state.rng.lognormal(-0.2, 0.65), 0.2, 4.0);
            state.stability_true[node][a] = state.rng.beta_3_2();
            state.noise_profile[node][a] = state.rng.uniform(0.04, 0.22);

            state.rng.dirichlet_ones(&mut dir_est);
            state.comp_est[node][a] = dir_est;
            state.stability_est[node][a] = 0.5;
            state.scan_conf[node][a] = 0.1;
            state.depletion[node][a] = 0.0;
        }
    }
}

fn generate_market(state: &mut CoreState) {
    state.recent_sales = [0.0; N_COMMODITIES];

    for c in 0..N_COMMODITIES {
        state.station_inventory[c] = state.rng.uniform(20.0, 120.0);

        let phase = state.rng.uniform(0.0, 2.0 * std::f32::consts::PI);
        let period = state.rng.uniform(180.0, 380.0);
        let amp_factor = state.rng.uniform(0.10, 0.30);

        state.price_phase[c] = phase;
        state.price_period[c] = period;
        state.price_amp[c] = BASE_PRICE[c] * amp_factor;

        let cycle = state.price_amp[c] * state.price_phase[c].sin();
        let price = clampf(BASE_PRICE[c] + cycle, MIN_PRICE[c], MAX_PRICE[c]);

        state.market_price[c] = price;
        state.market_prev_price[c] = price;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prospector_core::constants::CARGO_MAX;

    fn fresh(seed: u64) -> CoreState {
        let mut state = CoreState {
            time_max: 2000.0,
            invalid_action_penalty: 0.01,
            ..CoreState::default()
        };
        init_episode(&mut state, seed);
        state
    }

    #[test]
    fn test_world_shape() {
        for seed in 0..50 {
            let state = fresh(seed);
            assert!((8..=MAX_NODES).contains(&state.node_count));
            assert_eq!(state.node_type[0], NODE_STATION);
            assert_eq!(state.steps_to_station[0], 0);
            for node in 1..state.node_count {
                assert!(state.steps_to_station[node] > 0);
                let count = state.ast_valid[node].iter().filter(|v| **v).count();
                assert!((5..=MAX_ASTEROIDS).contains(&count));
            }
            assert!(state.ast_valid[0].iter().all(|v| !v));
            assert_eq!(state.cargo_sum(), 0.0);
            assert!(state.cargo_sum() <= CARGO_MAX);
        }
    }

    #[test]
    fn test_edges_are_symmetric() {
        let state = fresh(42);
        for u in 0..state.node_count {
            for slot in 0..MAX_NEIGHBORS {
                let v = state.neighbors[u][slot];
                if v < 0 {
                    continue;
                }
                let v = v as usize;
                let back = state.neighbors[v]
                    .iter()
                    .position(|&n| n == u as i32)
                    .expect("reverse edge");
                assert_eq!(state.edge_travel_time[u][slot], state.edge_travel_time[v][back]);
                assert_eq!(state.edge_fuel_cost[u][slot], state.edge_fuel_cost[v][back]);
                assert!((1..=8).contains(&state.edge_travel_time[u][slot]));
            }
        }
    }

    #[test]
    fn test_station_first_slot_leads_to_node_one() {
        for seed in 0..20 {
            let state = fresh(seed);
            assert_eq!(state.neighbors[0][0], 1);
            assert_eq!(state.neighbors[1][0], 0);
        }
    }

    #[test]
    fn test_same_seed_same_world() {
        let a = fresh(7);
        let b = fresh(7);
        assert_eq!(a.node_count, b.node_count);
        assert_eq!(a.neighbors, b.neighbors);
        assert_eq!(a.market_price, b.market_price);
        assert_eq!(a.true_comp, b.true_comp);
    }
}
