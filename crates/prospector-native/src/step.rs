//! Step dynamics for the compiled core
//!
//! Order inside one step: snapshot, action, (hold on invalid), global
//! dynamics, termination checks, reward, observation, metrics.

use prospector_core::abi::{AbpMetrics, AbpStepResult};
use prospector_core::constants::{
    ALERT_MAX, CARGO_MAX, CREDIT_SCALE, FUEL_MAX, HEAT_MAX, HULL_MAX, MAX_ASTEROIDS,
    MAX_NEIGHBORS, N_COMMODITIES, TOOL_MAX,
};
use prospector_core::{EventKind, NodeContext, TerminationReason};

use crate::obs::pack_obs;
use crate::params::*;
use crate::state::{CoreState, Phase, clampf, sigmoid};

struct Snapshot {
    credits: f32,
    fuel: f32,
    hull: f32,
    tool: f32,
    cargo_value: f32,
    value_lost_to_pirates: f32,
}

fn passive_heat_dissipation(state: &mut CoreState, dt: u32) {
    state.heat = 0.0f32.max(state.heat - HEAT_DISSIPATION_PER_TICK * dt as f32);
}

fn apply_hold(state: &mut CoreState) {
    state.alert = 0.0f32.max(state.alert - ALERT_DECAY_HOLD);
    passive_heat_dissipation(state, 1);
}

fn apply_emergency_burn(state: &mut CoreState) {
    state.fuel -= EMERGENCY_BURN_FUEL;
    state.alert += EMERGENCY_BURN_ALERT;
    if state.escape_buff_ticks < ESCAPE_BUFF_TICKS {
        state.escape_buff_ticks = ESCAPE_BUFF_TICKS;
    }
    state.events.push(EventKind::EmergencyBurn, 0.0);
}

/// Roll for a pirate encounter; a negative `intensity` uses the current node's
fn maybe_pirate_encounter(state: &mut CoreState, dt: u32, intensity: f32) {
    if state.is_at_station() {
        return;
    }

    let pirate_intensity = if intensity < 0.0 {
        state.node_pirate[state.current_node]
    } else {
        intensity
    };

    let cargo_value_before = state.est_cargo_value();

    let logit = PIRATE_BIAS
        + PIRATE_INTENSITY_W * pirate_intensity
        + PIRATE_ALERT_W * clampf(state.alert / ALERT_MAX, 0.0, 1.0)
        + PIRATE_CARGO_W * (cargo_value_before / CREDIT_SCALE).ln_1p()
        - PIRATE_ESCAPE_W * if state.escape_buff_ticks > 0 { 1.0 } else { 0.0 };

    let base_prob = sigmoid(logit);
    let exposure = if dt == 0 { 1 } else { dt };
    let p_encounter = 1.0 - (1.0 - base_prob).powf(exposure as f32);

    if state.rng.next_f32() >= p_encounter {
        return;
    }

    state.pirate_encounters += 1;

    let mut loss_frac = state.rng.uniform(0.08, 0.20);
    if state.decoys > 0 && state.rng.next_f32() < 0.6 {
        state.decoys -= 1;
        loss_frac *= 0.3;
        state.events.push(EventKind::DecoyDeployed, 0.0);
    }

    for c in 0..N_COMMODITIES {
        state.cargo[c] *= 1.0 - loss_frac;
    }

    let cargo_value_after = state.est_cargo_value();
    let mut lost = 0.0f32;
    if cargo_value_before > cargo_value_after {
        lost = cargo_value_before - cargo_value_after;
        state.value_lost_to_pirates += lost;
    }
    state.events.push(EventKind::PirateEncounter, lost);

    state.hull -= state.rng.uniform(1.0, 4.0);
    state.alert += 8.0;
}

fn apply_edge_hazards_and_pirates(state: &mut CoreState, dt: u32, edge_threat: f32) {
    if dt == 0 {
        return;
    }

    let mut hazard_dmg = dt as f32 * edge_threat * HAZARD_DAMAGE_PER_TICK;
    hazard_dmg *= state.rng.uniform(0.85, 1.15);
    state.hull -= hazard_dmg;

    state.heat += dt as f32 * edge_threat * HAZARD_HEAT_PER_TICK;
    state.alert += dt as f32 * edge_threat * HAZARD_ALERT_PER_TICK;

    maybe_pirate_encounter(state, dt, edge_threat);
}

/// Returns `(dt, invalid)`
fn apply_travel(state: &mut CoreState, slot: usize) -> (u32, bool) {
    let from = state.current_node;
    let neighbor = state.neighbors[from][slot];
    if neighbor < 0 {
        return (1, true);
    }

    let mut dt = state.edge_travel_time[from][slot];
    if dt == 0 {
        dt = 1;
    }

    let mass_factor = 1.0 + 0.5 * (state.cargo_sum() / CARGO_MAX);
    let fuel_cost = state.edge_fuel_cost[from][slot] * mass_factor;
    let threat = state.edge_threat_true[from][slot];

    state.fuel -= fuel_cost;
    state.current_node = neighbor as usize;
    state.selected_asteroid = -1;
    state.events.push(EventKind::Travel, neighbor as f32);

    apply_edge_hazards_and_pirates(state, dt, threat);
    (dt, false)
}

fn normalize_probs(input: &[f32; N_COMMODITIES]) -> [f32; N_COMMODITIES] {
    let mut out = [0.0f32; N_COMMODITIES];
    let mut sum = 0.0f32;
    for c in 0..N_COMMODITIES {
        let mut v = input[c];
        if v < 1.0e-8 {
            v = 1.0e-8;
        }
        out[c] = v;
        sum += v;
    }
    if sum <= 0.0 {
        return [1.0 / N_COMMODITIES as f32; N_COMMODITIES];
    }
    for v in out.iter_mut() {
        *v /= sum;
    }
    out
}

/// Scan mode 0 wide, 1 focused, 2 deep
fn update_asteroid_estimates(state: &mut CoreState, a: usize, mode: u8) {
    let node = state.current_node;
    if !state.ast_valid[node][a] {
        return;
    }

    let (blend, conf_gain, noise_mult) = match mode {
        0 => (0.22f32, 0.10f32, 1.35f32),
        1 => (0.42, 0.20, 1.0),
        _ => (0.80, 0.45, 0.55),
    };

    let base_noise = state.noise_profile[node][a];
    let conf = state.scan_conf[node][a];
    let sigma = base_noise * (1.0 - conf + 0.1) * noise_mult;

    let mut noisy_truth_raw = [0.0f32; N_COMMODITIES];
    for c in 0..N_COMMODITIES {
        noisy_truth_raw[c] = state.true_comp[node][a][c] + state.rng.normal(0.0, sigma);
    }
    let noisy_truth = normalize_probs(&noisy_truth_raw);

    let mut mixed = [0.0f32; N_COMMODITIES];
    for c in 0..N_COMMODITIES {
        mixed[c] = (1.0 - blend) * state.comp_est[node][a][c] + blend * noisy_truth[c];
    }
    state.comp_est[node][a] = normalize_probs(&mixed);

    let stable_truth = state.stability_true[node][a];
    let stable_noisy = clampf(stable_truth + state.rng.normal(0.0, sigma), 0.0, 1.0);
    let stable_est = (1.0 - blend) * state.stability_est[node][a] + blend * stable_noisy;
    state.stability_est[node][a] = clampf(stable_est, 0.0, 1.0);

    state.scan_conf[node][a] = clampf(state.scan_conf[node][a] + conf_gain, 0.0, 1.0);
}

fn wide_scan(state: &mut CoreState) {
    let node = state.current_node;
    for a in 0..MAX_ASTEROIDS {
        if state.ast_valid[node][a] {
            update_asteroid_estimates(state, a, 0);
        }
    }
}

fn update_neighbor_threat_estimates(state: &mut CoreState) {
    let node = state.current_node;
    for slot in 0..MAX_NEIGHBORS {
        if state.neighbors[node][slot] < 0 {
            continue;
        }
        let truth = state.edge_threat_true[node][slot];
        let est = state.edge_threat_est[node][slot];
        let noisy = clampf(truth + state.rng.normal(0.0, 0.08), 0.0, 1.0);
        state.edge_threat_est[node][slot] = 0.25 * est + 0.75 * noisy;
    }
}

fn select_asteroid(state: &mut CoreState, a: usize) -> bool {
    if a >= MAX_ASTEROIDS {
        return false;
    }
    let node = state.current_node;
    if !state.ast_valid[node][a] || state.depletion[node][a] >= 1.0 {
        return false;
    }
    state.selected_asteroid = a as i32;
    true
}

fn mine_selected(state: &mut CoreState, action: u8) {
    let (mode_mult, heat_gain, wear_gain, alert_gain, sigma, fracture_bias) = match action {
        28 => (0.80f32, 2.0f32, 0.8f32, 1.2f32, 0.05f32, -0.7f32),
        29 => (1.15, 4.0, 1.6, 2.2, 0.10, 0.0),
        _ => (1.55, 7.0, 2.8, 4.0, 0.16, 0.8),
    };
    let node = state.current_node;
    let a = state.selected_asteroid as usize;

    let richness = state.richness[node][a];
    let depletion = state.depletion[node][a];
    let base = richness * 0.0f32.max(1.0 - depletion);

    let tool_frac = clampf(state.tool_condition / TOOL_MAX, 0.0, 1.0);
    let heat_frac = clampf(state.heat / HEAT_MAX, 0.0, 2.0);

    let eff_tool = 0.4 + 0.6 * tool_frac;
    let eff_heat = if heat_frac <= 0.7 {
        1.0
    } else {
        0.1f32.max(1.0 - (heat_frac - 0.7) / 0.3)
    };

    let noise = state.rng.normal(0.0, sigma).exp();
    let mut extracted = [0.0f32; N_COMMODITIES];
    let mut total_extracted = 0.0f32;
    for c in 0..N_COMMODITIES {
        extracted[c] =
            base * eff_tool * eff_heat * mode_mult * noise * state.true_comp[node][a][c];
        total_extracted += extracted[c];
    }

    let available_capacity = 0.0f32.max(CARGO_MAX - state.cargo_sum());
    if total_extracted > available_capacity && total_extracted > 0.0 {
        let scale = available_capacity / total_extracted;
        total_extracted = available_capacity;
        for value in extracted.iter_mut() {
            *value *= scale;
        }
    }

    for c in 0..N_COMMODITIES {
        state.cargo[c] += extracted[c];
    }
    state.heat += heat_gain;
    state.tool_condition -= wear_gain;
    state.alert += alert_gain;

    state.depletion[node][a] = clampf(
        state.depletion[node][a] + FRACTURE_DEPLETION_RATE * total_extracted,
        0.0,
        1.0,
    );
    state.mining_ticks += 1;
    state.events.push(EventKind::Mined, total_extracted);

    let logit = -3.1 + fracture_bias + 2.5 * (1.0 - state.stability_true[node][a])
        + 2.2 * 0.0f32.max(heat_frac - 0.7)
        + 1.5 * (1.0 - tool_frac)
        - if state.stabilize_buff_ticks[a] > 0 { 1.1 } else { 0.0 };

    if state.rng.next_f32() < sigmoid(logit) {
        let severity = state.rng.uniform(0.5, 1.0);
        let damage = 12.0 * severity;
        state.hull -= damage;
        state.depletion[node][a] = 1.0;
        state.node_hazard[node] = clampf(state.node_hazard[node] + 0.1, 0.0, 1.0);
        state.events.push(EventKind::Fracture, damage);
    }
}

/// Converts part of the iron/nickel hold into rare isotopes; returns units produced
fn refine_some_cargo(state: &mut CoreState) -> f32 {
    let low_value = state.cargo[0] + state.cargo[1];
    if low_value <= 0.0 {
        return 0.0;
    }

    let refine_input = 0.15 * low_value;
    let total_low = state.cargo[0] + state.cargo[1];
    if total_low <= 0.0 {
        return 0.0;
    }

    let take_ratio = 1.0f32.min(refine_input / total_low);
    state.cargo[0] *= 1.0 - take_ratio;
    state.cargo[1] *= 1.0 - take_ratio;

    let output = 0.65 * refine_input;
    state.cargo[4] += output;
    output
}

fn slippage(qty: f32, inventory: f32) -> f32 {
    if qty <= 0.0 {
        return 0.0;
    }
    let ratio = qty / 1.0f32.max(inventory + qty);
    let raw = SLIPPAGE_K * ratio + SLIPPAGE_ROOT * ratio.sqrt();
    clampf(raw, 0.0, 0.70)
}

fn sell(state: &mut CoreState, action: u8) {
    let c = ((action - 43) / 3) as usize;
    let frac = match (action - 43) % 3 {
        0 => 0.25f32,
        1 => 0.50,
        _ => 1.0,
    };

    let qty = state.cargo[c] * frac;
    if qty <= 0.0 {
        return;
    }

    let slip = slippage(qty, state.station_inventory[c]);
    let effective_price = state.market_price[c] * (1.0 - slip);
    let gained = qty * effective_price;

    state.credits += gained;
    state.cargo[c] = 0.0f32.max(state.cargo[c] - qty);
    state.station_inventory[c] += qty;
    state.recent_sales[c] += qty;
    state.events.push(EventKind::Sold, gained);
}

fn spend(state: &mut CoreState, cost: f32) {
    state.credits -= cost;
    state.total_spend += cost;
    state.events.push(EventKind::Purchased, cost);
}

fn purchase(state: &mut CoreState, action: u8) -> bool {
    let (qty, cost) = match action {
        61 => BUY_FUEL_SMALL,
        62 => BUY_FUEL_MED,
        63 => BUY_FUEL_LARGE,
        64 => {
            if state.credits < BUY_REPAIR_KIT_COST || state.repair_kits >= REPAIR_KITS_CAP {
                return false;
            }
            spend(state, BUY_REPAIR_KIT_COST);
            state.repair_kits += 1;
            return true;
        }
        65 => {
            if state.credits < BUY_STABILIZER_COST || state.stabilizers >= STABILIZERS_CAP {
                return false;
            }
            spend(state, BUY_STABILIZER_COST);
            state.stabilizers += 1;
            return true;
        }
        66 => {
            if state.credits < BUY_DECOY_COST || state.decoys >= DECOYS_CAP {
                return false;
            }
            spend(state, BUY_DECOY_COST);
            state.decoys += 1;
            return true;
        }
        _ => return false,
    };

    if state.credits < cost {
        return false;
    }
    spend(state, cost);
    state.fuel = FUEL_MAX.min(state.fuel + qty);
    true
}

fn apply_node_hazards(state: &mut CoreState, dt: u32) {
    let hazard = state.node_hazard[state.current_node];
    if hazard <= 0.0 {
        return;
    }

    let hull_damage = dt as f32 * hazard * HAZARD_DAMAGE_PER_TICK * state.rng.uniform(0.8, 1.2);
    let heat_gain = dt as f32 * hazard * HAZARD_HEAT_PER_TICK;
    let alert_gain = dt as f32 * hazard * HAZARD_ALERT_PER_TICK;

    state.hull -= hull_damage;
    state.heat += heat_gain;
    state.alert += alert_gain;
}

fn update_market(state: &mut CoreState, dt: u32) {
    let t = (state.ticks_elapsed + dt) as f32;

    state.market_prev_price = state.market_price;

    for c in 0..N_COMMODITIES {
        let cycles = state.price_amp[c]
            * (2.0 * std::f32::consts::PI * (t / state.price_period[c]) + state.price_phase[c])
                .sin();
        let inv_pressure = INVENTORY_PRESSURE_K * state.station_inventory[c];
        let sale_pressure = SALES_PRESSURE_K * state.recent_sales[c];

        let noise_std = MARKET_NOISE_K * BASE_PRICE[c] * (dt.max(1) as f32).sqrt();
        let noise = state.rng.normal(0.0, noise_std);

        let new_price = BASE_PRICE[c] + cycles - inv_pressure - sale_pressure + noise;
        state.market_price[c] = clampf(new_price, MIN_PRICE[c], MAX_PRICE[c]);
    }

    let decay = (-(dt as f32) / SALES_DECAY_TAU).exp();
    for c in 0..N_COMMODITIES {
        state.recent_sales[c] *= decay;
        state.station_inventory[c] = (state.station_inventory[c] * 0.998).max(0.0);
    }
}

fn clamp_state(state: &mut CoreState) {
    state.fuel = clampf(state.fuel, 0.0, FUEL_MAX);
    state.hull = clampf(state.hull, 0.0, HULL_MAX);
    state.heat = clampf(state.heat, 0.0, HEAT_MAX);
    state.tool_condition = clampf(state.tool_condition, 0.0, TOOL_MAX);
    state.alert = clampf(state.alert, 0.0, ALERT_MAX);
    state.time_remaining = clampf(state.time_remaining, 0.0, state.time_max);

    let mut total_cargo = 0.0f32;
    for c in 0..N_COMMODITIES {
        state.cargo[c] = clampf(state.cargo[c], 0.0, CARGO_MAX);
        total_cargo += state.cargo[c];
    }
    if total_cargo > CARGO_MAX && total_cargo > 0.0 {
        let scale = CARGO_MAX / total_cargo;
        for value in state.cargo.iter_mut() {
            *value *= scale;
        }
    }
}

fn track_cargo_utilization(state: &mut CoreState, dt: u32) {
    let frac = clampf(state.cargo_sum() / CARGO_MAX, 0.0, 1.0);
    state.cargo_util_sum += frac * dt as f32;
    state.cargo_util_count += dt as f32;
}

fn apply_global_dynamics(state: &mut CoreState, dt: u32) {
    state.time_remaining -= dt as f32;

    passive_heat_dissipation(state, dt);

    state.escape_buff_ticks = state.escape_buff_ticks.saturating_sub(dt);
    for ticks in state.stabilize_buff_ticks.iter_mut() {
        *ticks = ticks.saturating_sub(dt);
    }

    if state.heat > HEAT_MAX {
        let overflow = state.heat - HEAT_MAX;
        state.hull -= OVERHEAT_DAMAGE_PER_UNIT * overflow;
        state.heat = HEAT_MAX;
        state.overheat_ticks += dt;
        state.events.push(EventKind::Overheat, overflow);
    }

    if !state.is_at_station() {
        apply_node_hazards(state, dt);
        maybe_pirate_encounter(state, dt, -1.0);
    }

    update_market(state, dt);
    clamp_state(state);
    track_cargo_utilization(state, dt);
}

#[allow(clippy::too_many_arguments)]
fn compute_reward(
    state: &CoreState,
    snapshot: &Snapshot,
    cargo_value_after: f32,
    action: u8,
    dt: u32,
    invalid: bool,
    destroyed: bool,
    stranded: bool,
    done: bool,
) -> f32 {
    let delta_credits = state.credits - snapshot.credits;
    let r_sell = delta_credits / CREDIT_SCALE;

    let delta_cargo_value = 0.0f32.max(cargo_value_after - snapshot.cargo_value);
    let r_extract = REWARD_ALPHA_EXTRACT * (delta_cargo_value / CREDIT_SCALE);

    let r_fuel = -REWARD_BETA_FUEL * 0.0f32.max(snapshot.fuel - state.fuel) / 100.0;
    let r_time = -REWARD_GAMMA_TIME * dt as f32;
    let r_wear = -REWARD_DELTA_WEAR * 0.0f32.max(snapshot.tool - state.tool_condition) / 10.0;
    let r_damage = -REWARD_ZETA_DAMAGE * 0.0f32.max(snapshot.hull - state.hull) / 10.0;

    let heat_safe = REWARD_HEAT_SAFE_FRAC * HEAT_MAX;
    let heat_excess = 0.0f32.max(state.heat - heat_safe);
    let heat_term = heat_excess / HEAT_MAX;
    let r_heat = -REWARD_EPSILON_HEAT * heat_term * heat_term;

    let r_scan = if (8..=10).contains(&action) {
        -REWARD_SCAN_COST
    } else {
        0.0
    };
    let r_invalid = if invalid {
        -state.invalid_action_penalty
    } else {
        0.0
    };

    let delta_pirate_loss =
        0.0f32.max(state.value_lost_to_pirates - snapshot.value_lost_to_pirates);
    let r_pirate = -REWARD_KAPPA_PIRATE * (delta_pirate_loss / CREDIT_SCALE);

    let mut r_terminal = 0.0f32;
    if stranded {
        r_terminal -= REWARD_STRANDED_PEN;
    }
    if destroyed {
        r_terminal -= REWARD_DESTROYED_PEN;
    }
    if done && !destroyed && !stranded {
        r_terminal += REWARD_TERMINAL_BONUS_B * (state.credits / CREDIT_SCALE);
    }

    r_sell
        + r_extract
        + r_fuel
        + r_time
        + r_wear
        + r_heat
        + r_damage
        + r_scan
        + r_invalid
        + r_pirate
        + r_terminal
}

fn fill_metrics(state: &CoreState, destroyed: bool, stranded: bool) -> AbpMetrics {
    let net_profit = state.credits - state.total_spend;
    let profit_per_tick = net_profit / state.ticks_elapsed.max(1) as f32;
    let cargo_util_avg = if state.cargo_util_count > 0.0 {
        state.cargo_util_sum / state.cargo_util_count
    } else {
        0.0
    };

    AbpMetrics {
        credits: state.credits,
        net_profit,
        profit_per_tick,
        survival: if destroyed || stranded { 0.0 } else { 1.0 },
        overheat_ticks: state.overheat_ticks as f32,
        pirate_encounters: state.pirate_encounters as f32,
        value_lost_to_pirates: state.value_lost_to_pirates,
        fuel_used: 0.0f32.max(state.fuel_start - state.fuel),
        hull_damage: 0.0f32.max(state.hull_start - state.hull),
        tool_wear: 0.0f32.max(state.tool_start - state.tool_condition),
        scan_count: state.scan_count as f32,
        mining_ticks: state.mining_ticks as f32,
        cargo_utilization_avg: clampf(cargo_util_avg, 0.0, 1.0),
        time_remaining: state.time_remaining,
    }
}

/// Apply one validated action (`0..=68`) to a running episode
pub(crate) fn step(state: &mut CoreState, action: u8, out: &mut AbpStepResult) {
    let mut terminated = false;
    let mut invalid = false;
    let mut dt: u32 = 1;

    state.events.clear();

    let snapshot = Snapshot {
        credits: state.credits,
        fuel: state.fuel,
        hull: state.hull,
        tool: state.tool_condition,
        cargo_value: state.est_cargo_value(),
        value_lost_to_pirates: state.value_lost_to_pirates,
    };

    match action {
        0..=5 => {
            let (travel_dt, travel_invalid) = apply_travel(state, action as usize);
            dt = travel_dt;
            invalid = travel_invalid;
        }
        6 => apply_hold(state),
        7 => apply_emergency_burn(state),
        8 => {
            dt = WIDE_SCAN_TIME;
            state.fuel -= WIDE_SCAN_FUEL;
            state.alert += WIDE_SCAN_ALERT;
            wide_scan(state);
            state.scan_count += 1;
            state.events.push(EventKind::Scan, 0.0);
        }
        9 | 10 => {
            let (scan_dt, fuel, alert, mode) = if action == 9 {
                (FOCUSED_SCAN_TIME, FOCUSED_SCAN_FUEL, FOCUSED_SCAN_ALERT, 1u8)
            } else {
                (DEEP_SCAN_TIME, DEEP_SCAN_FUEL, DEEP_SCAN_ALERT, 2u8)
            };
            dt = scan_dt;
            state.fuel -= fuel;
            state.alert += alert;
            if !state.selected_asteroid_valid() {
                invalid = true;
            } else {
                update_asteroid_estimates(state, state.selected_asteroid as usize, mode);
                state.scan_count += 1;
                state.events.push(EventKind::Scan, mode as f32);
            }
        }
        11 => {
            dt = THREAT_LISTEN_TIME;
            update_neighbor_threat_estimates(state);
            state.events.push(EventKind::ThreatListen, 0.0);
        }
        12..=27 => {
            let index = (action - 12) as usize;
            if select_asteroid(state, index) {
                state.events.push(EventKind::AsteroidSelected, index as f32);
            } else {
                invalid = true;
            }
        }
        28..=30 => {
            if state.selected_asteroid_valid() {
                mine_selected(state, action);
            } else {
                invalid = true;
            }
        }
        31 => {
            dt = STABILIZE_TIME;
            if !state.selected_asteroid_valid() || state.stabilizers == 0 {
                invalid = true;
            } else {
                let a = state.selected_asteroid as usize;
                state.stabilizers -= 1;
                state.stabilize_buff_ticks[a] = STABILIZE_BUFF_TICKS;
                state.events.push(EventKind::Stabilized, a as f32);
            }
        }
        32 => {
            dt = REFINE_TIME;
            state.fuel -= REFINE_FUEL;
            state.heat += REFINE_HEAT;
            state.alert += REFINE_ALERT;
            let produced = refine_some_cargo(state);
            state.events.push(EventKind::Refined, produced);
        }
        33 => {
            dt = COOLDOWN_TIME;
            state.fuel -= COOLDOWN_FUEL;
            state.heat = 0.0f32.max(state.heat - COOLDOWN_AMOUNT);
            state.alert += COOLDOWN_ALERT;
            state.events.push(EventKind::Cooldown, 0.0);
        }
        34 => {
            dt = MAINT_TIME;
            if state.repair_kits == 0 {
                invalid = true;
            } else {
                state.repair_kits -= 1;
                state.tool_condition = TOOL_MAX.min(state.tool_condition + TOOL_REPAIR_AMOUNT);
                state.events.push(EventKind::ToolRepaired, 0.0);
            }
        }
        35 => {
            dt = PATCH_TIME;
            if state.repair_kits == 0 {
                invalid = true;
            } else {
                state.repair_kits -= 1;
                state.hull = HULL_MAX.min(state.hull + HULL_PATCH_AMOUNT);
                state.events.push(EventKind::HullPatched, 0.0);
            }
        }
        36..=41 => {
            let c = (action - 36) as usize;
            let dumped = state.cargo[c];
            state.cargo[c] = 0.0;
            state.alert = 0.0f32.max(state.alert - JETTISON_ALERT_RELIEF);
            state.events.push(EventKind::Jettisoned, dumped);
        }
        42 => {
            dt = DOCK_TIME;
            if !state.is_at_station() {
                invalid = true;
            } else {
                state.alert = 0.0f32.max(state.alert - DOCK_ALERT_DROP);
                state.events.push(EventKind::Docked, 0.0);
            }
        }
        43..=60 => {
            if !state.is_at_station() {
                invalid = true;
            } else {
                sell(state, action);
            }
        }
        61..=66 => {
            if !state.is_at_station() || !purchase(state, action) {
                invalid = true;
            }
        }
        67 => {
            dt = OVERHAUL_TIME;
            if !state.is_at_station() || state.credits < OVERHAUL_COST {
                invalid = true;
            } else {
                state.credits -= OVERHAUL_COST;
                state.total_spend += OVERHAUL_COST;
                state.hull = HULL_MAX;
                state.tool_condition = TOOL_MAX;
                state.events.push(EventKind::Overhauled, OVERHAUL_COST);
            }
        }
        _ => terminated = true,
    }

    if invalid {
        state.events.push(EventKind::InvalidAction, action as f32);
        dt = 1;
        apply_hold(state);
    }

    apply_global_dynamics(state, dt);
    state.ticks_elapsed += dt;

    let destroyed = state.hull <= 0.0;
    let stranded = state.fuel <= 0.0 && !state.is_at_station();
    let retired = terminated;
    if destroyed || stranded {
        terminated = true;
    }
    let truncated = state.time_remaining <= 0.0 && !terminated;
    let done = terminated || truncated;

    let cargo_value_after = state.est_cargo_value();
    let reward = compute_reward(
        state,
        &snapshot,
        cargo_value_after,
        action,
        dt,
        invalid,
        destroyed,
        stranded,
        done,
    );

    if destroyed {
        state.events.push(EventKind::Destroyed, 0.0);
    }
    if stranded {
        state.events.push(EventKind::Stranded, 0.0);
    }
    if terminated {
        state.events.push(EventKind::Terminated, 0.0);
    } else if truncated {
        state.events.push(EventKind::Truncated, 0.0);
    }

    let end_reason = if destroyed {
        Some(TerminationReason::Destroyed)
    } else if stranded {
        Some(TerminationReason::Stranded)
    } else if retired {
        Some(TerminationReason::Retired)
    } else if truncated {
        Some(TerminationReason::TimeLimit)
    } else {
        None
    };

    pack_obs(state, &mut out.obs);
    out.reward = reward;
    out.dt = dt;
    out.t = state.ticks_elapsed;
    out.action = action as i32;
    out.terminated = terminated as u8;
    out.truncated = truncated as u8;
    out.invalid_action = invalid as u8;
    out.end_reason = end_reason.map_or(0, |r| r.code());
    out.node_context = if state.is_at_station() {
        NodeContext::Station.code()
    } else {
        NodeContext::Field.code()
    };
    out.event_count = state.events.count as u32;
    out.events = state.events.entries;
    out.metrics = fill_metrics(state, destroyed, stranded);

    if done {
        state.phase = Phase::Ended;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::init_episode;
    use bytemuck::Zeroable;
    use prospector_core::constants::OBS_DIM;

    fn running(seed: u64, time_max: f32) -> CoreState {
        let mut state = CoreState {
            time_max,
            invalid_action_penalty: 0.01,
            ..CoreState::default()
        };
        init_episode(&mut state, seed);
        state
    }

    fn events(out: &AbpStepResult) -> Vec<EventKind> {
        out.event_slice()
            .iter()
            .map(|e| EventKind::from_code(e.kind).expect("known kind"))
            .collect()
    }

    #[test]
    fn test_end_episode_terminates_not_truncates() {
        let mut state = running(3, 1.0);
        let mut out = AbpStepResult::zeroed();
        step(&mut state, 68, &mut out);
        assert_eq!(out.terminated, 1);
        assert_eq!(out.truncated, 0);
        assert_eq!(out.end_reason, TerminationReason::Retired.code());
        assert_eq!(state.phase, Phase::Ended);
        assert_eq!(events(&out).last(), Some(&EventKind::Terminated));
    }

    #[test]
    fn test_time_budget_truncates() {
        let mut state = running(3, 1.0);
        let mut out = AbpStepResult::zeroed();
        step(&mut state, 6, &mut out);
        assert_eq!(out.terminated, 0);
        assert_eq!(out.truncated, 1);
        assert_eq!(out.end_reason, TerminationReason::TimeLimit.code());
        assert_eq!(out.metrics.time_remaining, 0.0);
    }

    #[test]
    fn test_hull_failure_ends_as_destroyed() {
        let mut state = running(5, 1.0);
        state.hull = 0.0;
        let mut out = AbpStepResult::zeroed();
        step(&mut state, 6, &mut out);

        assert_eq!(out.terminated, 1);
        assert_eq!(out.truncated, 0);
        assert_eq!(out.end_reason, TerminationReason::Destroyed.code());
        assert_eq!(
            events(&out),
            vec![EventKind::Destroyed, EventKind::Terminated]
        );
        // only the time cost rides on top of the penalty
        assert!((out.reward + REWARD_DESTROYED_PEN + REWARD_GAMMA_TIME).abs() < 1e-3);
        assert_eq!(out.metrics.survival, 0.0);
        assert_eq!(state.phase, Phase::Ended);
    }

    #[test]
    fn test_empty_tank_in_the_field_ends_as_stranded() {
        let mut state = running(8, 1.0);
        state.current_node = 1;
        state.fuel = 0.0;
        let mut out = AbpStepResult::zeroed();
        step(&mut state, 6, &mut out);

        assert_eq!(out.terminated, 1);
        assert_eq!(out.truncated, 0);
        assert_eq!(out.end_reason, TerminationReason::Stranded.code());
        assert_eq!(out.node_context, NodeContext::Field.code());
        let kinds = events(&out);
        assert!(kinds.ends_with(&[EventKind::Stranded, EventKind::Terminated]));
        assert!(!kinds.contains(&EventKind::Truncated));
        assert!(out.reward <= -REWARD_STRANDED_PEN);
        assert!(out.reward > -REWARD_STRANDED_PEN - 5.0);
        assert_eq!(out.metrics.survival, 0.0);
    }

    #[test]
    fn test_destroyed_outranks_stranded() {
        let mut state = running(8, 1.0);
        state.current_node = 1;
        state.hull = 0.0;
        state.fuel = 0.0;
        let mut out = AbpStepResult::zeroed();
        step(&mut state, 6, &mut out);

        assert_eq!((out.terminated, out.truncated), (1, 0));
        assert_eq!(out.end_reason, TerminationReason::Destroyed.code());
        assert!(events(&out).ends_with(&[
            EventKind::Destroyed,
            EventKind::Stranded,
            EventKind::Terminated
        ]));
        assert!(out.reward <= -(REWARD_DESTROYED_PEN + REWARD_STRANDED_PEN));
        assert_eq!(out.metrics.survival, 0.0);
    }

    #[test]
    fn test_dock_away_from_station_is_invalid_hold() {
        let mut state = running(11, 2000.0);
        let mut out = AbpStepResult::zeroed();
        step(&mut state, 0, &mut out);
        assert_eq!(out.invalid_action, 0);
        assert_eq!(events(&out)[0], EventKind::Travel);
        assert_eq!(out.dt, state.edge_travel_time[0][0]);

        step(&mut state, 42, &mut out);
        assert_eq!(out.invalid_action, 1);
        assert_eq!(out.dt, 1);
        assert!(events(&out).contains(&EventKind::InvalidAction));
        assert!(out.reward < 0.0);
    }

    #[test]
    fn test_sell_without_cargo_is_a_quiet_noop() {
        let mut state = running(5, 2000.0);
        let mut out = AbpStepResult::zeroed();
        step(&mut state, 45, &mut out);
        assert_eq!(out.invalid_action, 0);
        assert!(!events(&out).contains(&EventKind::Sold));
    }

    #[test]
    fn test_mining_fills_cargo() {
        let mut state = running(21, 2000.0);
        let mut out = AbpStepResult::zeroed();
        step(&mut state, 0, &mut out);
        if out.terminated == 1 {
            return;
        }
        step(&mut state, 12, &mut out);
        assert_eq!(out.invalid_action, 0);
        assert_eq!(events(&out)[0], EventKind::AsteroidSelected);
        step(&mut state, 29, &mut out);
        assert_eq!(events(&out)[0], EventKind::Mined);
        assert!(state.cargo_sum() > 0.0);
        assert!(state.cargo_sum() <= CARGO_MAX);
        assert_eq!(out.metrics.mining_ticks, 1.0);
        assert_eq!(out.obs.len(), OBS_DIM);
    }

    #[test]
    fn test_observation_stays_finite_and_bounded() {
        let mut state = running(99, 2000.0);
        let mut out = AbpStepResult::zeroed();
        let script = [8u8, 12, 30, 30, 30, 32, 33, 7, 11, 0, 1, 2, 6, 42, 43, 61, 64, 67];
        for (i, &action) in script.iter().cycle().take(300).enumerate() {
            if state.phase == Phase::Ended {
                init_episode(&mut state, 99 + i as u64);
            }
            step(&mut state, action, &mut out);
            assert!(out.obs.iter().all(|v| v.is_finite()));
            assert!(out.obs.iter().all(|v| (-1.0..=1.0).contains(v)));
            assert!(out.reward.is_finite());
            assert!(!(out.terminated == 1 && out.truncated == 1));
            assert!(state.cargo_sum() <= CARGO_MAX * 1.0001);
        }
    }
}
