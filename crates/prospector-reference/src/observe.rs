//! Observation encoding

use prospector_core::Observation;
use prospector_core::constants::obs_layout::*;
use prospector_core::constants::{
    ALERT_MAX, CARGO_MAX, FUEL_MAX, HEAT_MAX, HULL_MAX, N_COMMODITIES, OBS_DIM, TOOL_MAX,
};

use crate::sim::Simulation;
use crate::tuning::{
    CREDITS_NORM_CAP, PRICE_BANDS, RECIP_INVENTORY_CAP, RECIP_NODE_SPAN, RECIP_PRICE_DELTA_SCALE,
    RECIP_TRAVEL_FUEL_CAP, RECIP_TRAVEL_TIME_CAP, SUPPLY_CAP,
};

fn unit(value: f32) -> f32 {
    value.clamp(0.0, 1.0)
}

fn flag(value: bool) -> f32 {
    if value { 1.0 } else { 0.0 }
}

/// Composition estimate rescaled to a distribution for display
fn estimate_shares(estimate: &[f32; N_COMMODITIES]) -> [f32; N_COMMODITIES] {
    let floored = estimate.map(|v| v.max(1.0e-8));
    let sum: f32 = floored.iter().sum();
    if sum <= 0.0 {
        return [1.0 / N_COMMODITIES as f32; N_COMMODITIES];
    }
    let recip = 1.0 / sum;
    floored.map(|v| v * recip)
}

pub(crate) fn encode(sim: &Simulation) -> Observation {
    let mut obs = [0.0f32; OBS_DIM];
    let ship = &sim.ship;

    let gauges = [
        ship.fuel / FUEL_MAX,
        ship.hull / HULL_MAX,
        ship.heat / HEAT_MAX,
        ship.tool / TOOL_MAX,
        ship.cargo_total() / CARGO_MAX,
        ship.alert / ALERT_MAX,
        sim.time_remaining / sim.time_max,
    ];
    for (slot, value) in gauges.into_iter().enumerate() {
        obs[SHIP_BASE + slot] = unit(value);
    }
    obs[CREDITS] = unit(ship.credits.max(0.0).ln_1p() / CREDITS_NORM_CAP.ln_1p());

    for (c, amount) in ship.cargo.iter().enumerate() {
        obs[CARGO_BASE + c] = unit(amount / CARGO_MAX);
    }
    let supplies = [ship.repair_kits, ship.stabilizers, ship.decoys];
    for (slot, count) in supplies.into_iter().enumerate() {
        obs[SUPPLIES_BASE + slot] = unit(count as f32 / SUPPLY_CAP as f32);
    }

    obs[AT_STATION] = flag(sim.at_station());
    obs[SELECTED_VALID] = flag(sim.selection().is_some());

    let node = &sim.world.nodes[sim.location];
    obs[NODE_TYPE_BASE + node.kind.slot()] = 1.0;
    obs[NODE_INDEX] = unit(sim.location as f32 * RECIP_NODE_SPAN);
    obs[STEPS_TO_STATION] = unit(node.hops_to_station as f32 * RECIP_NODE_SPAN);

    for (slot, lane) in node.lanes.iter().enumerate() {
        let Some(lane) = lane else { continue };
        let base = NEIGHBOR_BASE + NEIGHBOR_STRIDE * slot;
        obs[base] = 1.0;
        obs[base + 1 + sim.world.nodes[lane.to].kind.slot()] = 1.0;
        obs[base + 4] = unit(lane.ticks as f32 * RECIP_TRAVEL_TIME_CAP);
        obs[base + 5] = unit(lane.fuel_cost * RECIP_TRAVEL_FUEL_CAP);
        obs[base + 6] = unit(lane.threat_estimate);
    }

    for (index, asteroid) in node.asteroids.iter().enumerate() {
        let base = ASTEROID_BASE + ASTEROID_STRIDE * index;
        obs[base] = 1.0;
        obs[base + 1..base + 7].copy_from_slice(&estimate_shares(&asteroid.composition_estimate));
        obs[base + 7] = unit(asteroid.stability_estimate);
        obs[base + 8] = unit(asteroid.depletion);
        obs[base + 9] = unit(asteroid.confidence);
        obs[base + 10] = flag(sim.selected == Some(index));
    }

    for (c, (commodity, band)) in sim.market.commodities.iter().zip(PRICE_BANDS).enumerate() {
        obs[PRICE_BASE + c] = unit(commodity.price * band.recip_base);
        obs[DPRICE_BASE + c] = ((commodity.price - commodity.previous_price)
            * RECIP_PRICE_DELTA_SCALE)
            .clamp(-1.0, 1.0);
    }
    for (slot, c) in OBSERVED_INVENTORY.into_iter().enumerate() {
        obs[INVENTORY_BASE + slot] = unit(sim.market.commodities[c].inventory * RECIP_INVENTORY_CAP);
    }

    Observation::from_array(obs)
}
