//! One episode of the simulation
//!
//! A step runs in a fixed order: snapshot, action, (one-tick hold when the
//! action's preconditions fail), global dynamics for the elapsed ticks,
//! ending checks, reward, observation. The random stream is consumed in that
//! same order, which is what keeps this implementation in lockstep with the
//! compiled core.

use prospector_core::abi::MAX_EVENTS;
use prospector_core::constants::{
    ALERT_MAX, CARGO_MAX, CREDIT_SCALE, FUEL_MAX, HEAT_MAX, HULL_MAX, MAX_ASTEROIDS,
    N_COMMODITIES, TOOL_MAX,
};
use prospector_core::{
    Action, ActionKind, CoreConfig, EpisodeMetrics, Event, EventKind, FuelPack, MiningMode,
    NodeContext, RandomStream, RewardBreakdown, ScanMode, SellFraction, StepInfo, StepResult,
    Supply, TerminationReason,
};

use crate::market::Market;
use crate::observe;
use crate::ship::Ship;
use crate::tuning::*;
use crate::world::{NodeKind, STATION, World};

/// How an action resolved before global dynamics run
enum Resolution {
    /// Applied; consumed this many ticks
    Done(u32),
    /// Preconditions failed; becomes a one-tick hold
    Invalid,
    /// Voluntary end of the episode
    Retire,
}

/// Values captured before the action, for reward deltas
struct Snapshot {
    credits: f32,
    fuel: f32,
    hull: f32,
    tool: f32,
    cargo_value: f32,
    pirate_losses: f32,
}

/// Running totals behind [`EpisodeMetrics`]
#[derive(Debug, Clone, Default)]
pub(crate) struct Ledger {
    pub total_spend: f32,
    pub overheat_ticks: u32,
    pub pirate_encounters: u32,
    pub pirate_losses: f32,
    pub scans: u32,
    pub mining_ticks: u32,
    pub utilization_sum: f32,
    pub utilization_ticks: f32,
}

#[derive(Debug, Clone)]
pub(crate) struct Simulation {
    rng: RandomStream,
    pub world: World,
    pub market: Market,
    pub ship: Ship,
    pub location: usize,
    pub selected: Option<usize>,
    /// Stabilizer buff per asteroid slot
    stabilized: [u32; MAX_ASTEROIDS],
    pub ticks: u32,
    pub time_remaining: f32,
    pub time_max: f32,
    invalid_action_penalty: f32,
    start: Ship,
    ledger: Ledger,
    events: Vec<Event>,
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Floor at 1e-8 and rescale to sum to one
fn normalize(values: [f32; N_COMMODITIES]) -> [f32; N_COMMODITIES] {
    let floored = values.map(|v| v.max(1.0e-8));
    let sum: f32 = floored.iter().sum();
    if sum <= 0.0 {
        return [1.0 / N_COMMODITIES as f32; N_COMMODITIES];
    }
    floored.map(|v| v / sum)
}

impl Simulation {
    pub fn new(config: &CoreConfig, seed: u64) -> Self {
        let mut rng = RandomStream::new(seed);
        let world = World::generate(&mut rng);
        let market = Market::generate(&mut rng);
        let ship = Ship::default();
        Self {
            rng,
            world,
            market,
            start: ship.clone(),
            ship,
            location: STATION,
            selected: None,
            stabilized: [0; MAX_ASTEROIDS],
            ticks: 0,
            time_remaining: config.time_max,
            time_max: config.time_max,
            invalid_action_penalty: config.invalid_action_penalty,
            ledger: Ledger::default(),
            events: Vec::with_capacity(MAX_EVENTS),
        }
    }

    pub fn at_station(&self) -> bool {
        self.world.nodes[self.location].kind == NodeKind::Station
    }

    /// Selected asteroid, if it is still there to be mined
    pub fn selection(&self) -> Option<usize> {
        let index = self.selected?;
        let asteroid = self.world.nodes[self.location].asteroids.get(index)?;
        asteroid.is_minable().then_some(index)
    }

    fn cargo_value(&self) -> f32 {
        self.market.value_of(&self.ship.cargo)
    }

    fn emit(&mut self, kind: EventKind, value: f32) {
        if self.events.len() < MAX_EVENTS {
            self.events.push(Event::new(kind, value));
        }
    }

    pub fn step(&mut self, action: Action) -> (StepResult, RewardBreakdown) {
        self.events.clear();
        let before = Snapshot {
            credits: self.ship.credits,
            fuel: self.ship.fuel,
            hull: self.ship.hull,
            tool: self.ship.tool,
            cargo_value: self.cargo_value(),
            pirate_losses: self.ledger.pirate_losses,
        };

        let kind = action.kind();
        let resolution = self.apply(kind);
        let (dt, invalid, retired) = match resolution {
            Resolution::Done(ticks) => (ticks, false, false),
            Resolution::Retire => (1, false, true),
            Resolution::Invalid => {
                self.emit(EventKind::InvalidAction, action.index() as f32);
                self.hold();
                (1, true, false)
            }
        };

        self.advance(dt);
        self.ticks += dt;

        let destroyed = self.ship.hull <= 0.0;
        let stranded = self.ship.fuel <= 0.0 && !self.at_station();
        let terminated = retired || destroyed || stranded;
        let truncated = self.time_remaining <= 0.0 && !terminated;
        let done = terminated || truncated;

        let reward = self.reward(&before, kind, dt, invalid, destroyed, stranded, done);

        if destroyed {
            self.emit(EventKind::Destroyed, 0.0);
        }
        if stranded {
            self.emit(EventKind::Stranded, 0.0);
        }
        if terminated {
            self.emit(EventKind::Terminated, 0.0);
        } else if truncated {
            self.emit(EventKind::Truncated, 0.0);
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

        let result = StepResult {
            observation: observe::encode(self),
            reward: reward.total(),
            terminated,
            truncated,
            events: self.events.clone(),
            info: StepInfo {
                action: action.index(),
                dt,
                t: self.ticks,
                invalid_action: invalid,
                end_reason,
                node_context: if self.at_station() {
                    NodeContext::Station
                } else {
                    NodeContext::Field
                },
                metrics: self.metrics(destroyed || stranded),
            },
        };
        (result, reward)
    }

    fn apply(&mut self, kind: ActionKind) -> Resolution {
        match kind {
            ActionKind::Travel { slot } => self.travel(slot),
            ActionKind::Hold => {
                self.hold();
                Resolution::Done(1)
            }
            ActionKind::EmergencyBurn => {
                self.ship.fuel -= BURN_FUEL;
                self.ship.raise_alert(BURN_ALERT);
                self.ship.escape_ticks = self.ship.escape_ticks.max(ESCAPE_TICKS);
                self.emit(EventKind::EmergencyBurn, 0.0);
                Resolution::Done(1)
            }
            ActionKind::Scan(mode) => self.scan(mode),
            ActionKind::ThreatListen => {
                self.listen();
                self.emit(EventKind::ThreatListen, 0.0);
                Resolution::Done(LISTEN_TICKS)
            }
            ActionKind::SelectAsteroid { index } => {
                let minable = self.world.nodes[self.location]
                    .asteroids
                    .get(index)
                    .is_some_and(|a| a.is_minable());
                if !minable {
                    return Resolution::Invalid;
                }
                self.selected = Some(index);
                self.emit(EventKind::AsteroidSelected, index as f32);
                Resolution::Done(1)
            }
            ActionKind::Mine(mode) => match self.selection() {
                Some(index) => {
                    self.mine(index, mode);
                    Resolution::Done(1)
                }
                None => Resolution::Invalid,
            },
            ActionKind::Stabilize => match self.selection() {
                Some(index) if self.ship.stabilizers > 0 => {
                    self.ship.stabilizers -= 1;
                    self.stabilized[index] = STABILIZE_BUFF;
                    self.emit(EventKind::Stabilized, index as f32);
                    Resolution::Done(STABILIZE_TICKS)
                }
                _ => Resolution::Invalid,
            },
            ActionKind::Refine => {
                self.ship.fuel -= REFINE_FUEL;
                self.ship.heat += REFINE_HEAT;
                self.ship.raise_alert(REFINE_ALERT);
                let produced = self.refine();
                self.emit(EventKind::Refined, produced);
                Resolution::Done(REFINE_TICKS)
            }
            ActionKind::Cooldown => {
                self.ship.fuel -= COOLDOWN_FUEL;
                self.ship.heat = (self.ship.heat - COOLDOWN_HEAT).max(0.0);
                self.ship.raise_alert(COOLDOWN_ALERT);
                self.emit(EventKind::Cooldown, 0.0);
                Resolution::Done(COOLDOWN_TICKS)
            }
            ActionKind::ToolRepair => {
                if self.ship.repair_kits == 0 {
                    return Resolution::Invalid;
                }
                self.ship.repair_kits -= 1;
                self.ship.tool = (self.ship.tool + TOOL_REPAIR).min(TOOL_MAX);
                self.emit(EventKind::ToolRepaired, 0.0);
                Resolution::Done(REPAIR_TICKS)
            }
            ActionKind::HullPatch => {
                if self.ship.repair_kits == 0 {
                    return Resolution::Invalid;
                }
                self.ship.repair_kits -= 1;
                self.ship.hull = (self.ship.hull + HULL_PATCH).min(HULL_MAX);
                self.emit(EventKind::HullPatched, 0.0);
                Resolution::Done(REPAIR_TICKS)
            }
            ActionKind::Jettison { commodity } => {
                let dumped = std::mem::take(&mut self.ship.cargo[commodity]);
                self.ship.lower_alert(JETTISON_ALERT_RELIEF);
                self.emit(EventKind::Jettisoned, dumped);
                Resolution::Done(1)
            }
            ActionKind::Dock => {
                if !self.at_station() {
                    return Resolution::Invalid;
                }
                self.ship.lower_alert(DOCK_ALERT_RELIEF);
                self.emit(EventKind::Docked, 0.0);
                Resolution::Done(1)
            }
            ActionKind::Sell { commodity, fraction } => {
                if !self.at_station() {
                    return Resolution::Invalid;
                }
                self.sell(commodity, fraction);
                Resolution::Done(1)
            }
            ActionKind::BuyFuel(pack) => self.buy_fuel(pack),
            ActionKind::BuySupply(supply) => self.buy_supply(supply),
            ActionKind::Overhaul => {
                if !self.at_station() || self.ship.credits < OVERHAUL_COST {
                    return Resolution::Invalid;
                }
                self.ship.credits -= OVERHAUL_COST;
                self.ledger.total_spend += OVERHAUL_COST;
                self.ship.hull = HULL_MAX;
                self.ship.tool = TOOL_MAX;
                self.emit(EventKind::Overhauled, OVERHAUL_COST);
                Resolution::Done(OVERHAUL_TICKS)
            }
            ActionKind::EndEpisode => Resolution::Retire,
        }
    }

    fn shed_heat(&mut self, ticks: u32) {
        self.ship.heat = (self.ship.heat - HEAT_SHED_PER_TICK * ticks as f32).max(0.0);
    }

    fn hold(&mut self) {
        self.ship.lower_alert(HOLD_ALERT_RELIEF);
        self.shed_heat(1);
    }

    fn travel(&mut self, slot: usize) -> Resolution {
        let Some(lane) = self.world.lane(self.location, slot).copied() else {
            return Resolution::Invalid;
        };
        let ticks = lane.ticks.max(1);

        let mass_factor = 1.0 + 0.5 * (self.ship.cargo_total() / CARGO_MAX);
        self.ship.fuel -= lane.fuel_cost * mass_factor;
        self.location = lane.to;
        self.selected = None;
        self.emit(EventKind::Travel, lane.to as f32);

        let exposure = ticks as f32 * lane.threat;
        let mut damage = exposure * HAZARD_HULL;
        damage *= self.rng.uniform(0.85, 1.15);
        self.ship.hull -= damage;
        self.ship.heat += exposure * HAZARD_HEAT;
        self.ship.raise_alert(exposure * HAZARD_ALERT);

        self.pirate_roll(ticks, lane.threat);
        Resolution::Done(ticks)
    }

    fn scan(&mut self, mode: ScanMode) -> Resolution {
        let profile = scan_profile(mode);
        self.ship.fuel -= profile.fuel;
        self.ship.raise_alert(profile.alert);

        if mode == ScanMode::Wide {
            let count = self.world.nodes[self.location].asteroids.len();
            for index in 0..count {
                self.refresh_estimate(index, &profile);
            }
        } else {
            let Some(index) = self.selection() else {
                return Resolution::Invalid;
            };
            self.refresh_estimate(index, &profile);
        }

        self.ledger.scans += 1;
        self.emit(EventKind::Scan, mode.code() as f32);
        Resolution::Done(profile.ticks)
    }

    /// Blend a noisy reading of the truth into the asteroid's estimates
    fn refresh_estimate(&mut self, index: usize, profile: &ScanProfile) {
        let rng = &mut self.rng;
        let asteroid = &mut self.world.nodes[self.location].asteroids[index];
        let sigma = asteroid.noise_profile * (1.0 - asteroid.confidence + 0.1) * profile.noise_scale;
        let blend = profile.blend;

        let reading = normalize(std::array::from_fn(|c| {
            asteroid.composition[c] + rng.normal(0.0, sigma)
        }));
        let mixed = std::array::from_fn(|c| {
            (1.0 - blend) * asteroid.composition_estimate[c] + blend * reading[c]
        });
        asteroid.composition_estimate = normalize(mixed);

        let stability_reading = (asteroid.stability + rng.normal(0.0, sigma)).clamp(0.0, 1.0);
        asteroid.stability_estimate = ((1.0 - blend) * asteroid.stability_estimate
            + blend * stability_reading)
            .clamp(0.0, 1.0);
        asteroid.confidence = (asteroid.confidence + profile.confidence_gain).clamp(0.0, 1.0);
    }

    fn listen(&mut self) {
        let rng = &mut self.rng;
        for lane in self.world.nodes[self.location].lanes.iter_mut().flatten() {
            let reading = (lane.threat + rng.normal(0.0, LISTEN_NOISE)).clamp(0.0, 1.0);
            lane.threat_estimate = 0.25 * lane.threat_estimate + 0.75 * reading;
        }
    }

    fn mine(&mut self, index: usize, mode: MiningMode) {
        let profile = mining_profile(mode);
        let free_capacity = self.ship.free_capacity();
        let tool_share = (self.ship.tool / TOOL_MAX).clamp(0.0, 1.0);
        let heat_share = (self.ship.heat / HEAT_MAX).clamp(0.0, 2.0);

        let tool_efficiency = 0.4 + 0.6 * tool_share;
        let heat_efficiency = if heat_share <= 0.7 {
            1.0
        } else {
            (1.0 - (heat_share - 0.7) / 0.3).max(0.1)
        };
        let luck = self.rng.normal(0.0, profile.yield_sigma).exp();

        let asteroid = &self.world.nodes[self.location].asteroids[index];
        let yield_rate = asteroid.richness
            * (1.0 - asteroid.depletion).max(0.0)
            * tool_efficiency
            * heat_efficiency
            * profile.yield_scale
            * luck;
        let mut extracted = asteroid.composition.map(|share| yield_rate * share);
        let mut total: f32 = 0.0;
        for amount in &extracted {
            total += amount;
        }
        if total > free_capacity && total > 0.0 {
            let scale = free_capacity / total;
            total = free_capacity;
            extracted = extracted.map(|amount| amount * scale);
        }

        for (held, amount) in self.ship.cargo.iter_mut().zip(extracted) {
            *held += amount;
        }
        self.ship.heat += profile.heat;
        self.ship.tool -= profile.wear;
        self.ship.raise_alert(profile.alert);

        let stabilized = self.stabilized[index] > 0;
        let asteroid = &mut self.world.nodes[self.location].asteroids[index];
        asteroid.depletion = (asteroid.depletion + DEPLETION_PER_UNIT * total).clamp(0.0, 1.0);
        let stability = asteroid.stability;
        self.ledger.mining_ticks += 1;
        self.emit(EventKind::Mined, total);

        let mut fracture_logit = -3.1
            + profile.fracture_bias
            + 2.5 * (1.0 - stability)
            + 2.2 * (heat_share - 0.7).max(0.0)
            + 1.5 * (1.0 - tool_share);
        if stabilized {
            fracture_logit -= 1.1;
        }
        if self.rng.next_uniform() < sigmoid(fracture_logit) {
            let damage = FRACTURE_HULL_DAMAGE * self.rng.uniform(0.5, 1.0);
            self.ship.hull -= damage;
            let node = &mut self.world.nodes[self.location];
            node.asteroids[index].depletion = 1.0;
            node.hazard = (node.hazard + FRACTURE_HAZARD_BUMP).clamp(0.0, 1.0);
            self.emit(EventKind::Fracture, damage);
        }
    }

    /// Turn a share of iron and nickel into rare isotopes; returns units made
    fn refine(&mut self) -> f32 {
        let low_grade = self.ship.cargo[0] + self.ship.cargo[1];
        if low_grade <= 0.0 {
            return 0.0;
        }
        let input = REFINE_INPUT_SHARE * low_grade;
        let taken = (input / low_grade).min(1.0);
        self.ship.cargo[0] *= 1.0 - taken;
        self.ship.cargo[1] *= 1.0 - taken;

        let output = REFINE_YIELD * input;
        self.ship.cargo[4] += output;
        output
    }

    fn sell(&mut self, commodity: usize, fraction: SellFraction) {
        let qty = self.ship.cargo[commodity] * fraction.value();
        if qty <= 0.0 {
            return;
        }
        let proceeds = self.market.sell(commodity, qty);
        self.ship.credits += proceeds;
        self.ship.cargo[commodity] = (self.ship.cargo[commodity] - qty).max(0.0);
        self.emit(EventKind::Sold, proceeds);
    }

    fn pay(&mut self, cost: f32) {
        self.ship.credits -= cost;
        self.ledger.total_spend += cost;
        self.emit(EventKind::Purchased, cost);
    }

    fn buy_fuel(&mut self, pack: FuelPack) -> Resolution {
        let (amount, cost) = fuel_pack(pack);
        if !self.at_station() || self.ship.credits < cost {
            return Resolution::Invalid;
        }
        self.pay(cost);
        self.ship.fuel = (self.ship.fuel + amount).min(FUEL_MAX);
        Resolution::Done(1)
    }

    fn buy_supply(&mut self, supply: Supply) -> Resolution {
        let cost = supply_cost(supply);
        let held = match supply {
            Supply::RepairKit => self.ship.repair_kits,
            Supply::Stabilizer => self.ship.stabilizers,
            Supply::Decoy => self.ship.decoys,
        };
        if !self.at_station() || self.ship.credits < cost || held >= SUPPLY_CAP {
            return Resolution::Invalid;
        }
        self.pay(cost);
        match supply {
            Supply::RepairKit => self.ship.repair_kits += 1,
            Supply::Stabilizer => self.ship.stabilizers += 1,
            Supply::Decoy => self.ship.decoys += 1,
        }
        Resolution::Done(1)
    }

    /// Roll for pirates over `ticks` of exposure at `intensity`
    fn pirate_roll(&mut self, ticks: u32, intensity: f32) {
        if self.at_station() {
            return;
        }
        let value_before = self.cargo_value();
        let escaping = if self.ship.escape_ticks > 0 { 1.0 } else { 0.0 };
        let logit = PIRATE_BASE_LOGIT
            + PIRATE_INTENSITY_WEIGHT * intensity
            + PIRATE_ALERT_WEIGHT * (self.ship.alert / ALERT_MAX).clamp(0.0, 1.0)
            + PIRATE_CARGO_WEIGHT * (value_before / CREDIT_SCALE).ln_1p()
            - PIRATE_ESCAPE_RELIEF * escaping;
        let per_tick = sigmoid(logit);
        let chance = 1.0 - (1.0 - per_tick).powf(ticks.max(1) as f32);
        if self.rng.next_uniform() >= chance {
            return;
        }

        self.ledger.pirate_encounters += 1;
        let mut loss = self.rng.uniform(0.08, 0.20);
        if self.ship.decoys > 0 && self.rng.next_uniform() < DECOY_SUCCESS {
            self.ship.decoys -= 1;
            loss *= DECOY_LOSS_SCALE;
            self.emit(EventKind::DecoyDeployed, 0.0);
        }
        for amount in self.ship.cargo.iter_mut() {
            *amount *= 1.0 - loss;
        }

        let value_after = self.cargo_value();
        let lost = if value_before > value_after {
            value_before - value_after
        } else {
            0.0
        };
        self.ledger.pirate_losses += lost;
        self.emit(EventKind::PirateEncounter, lost);

        self.ship.hull -= self.rng.uniform(1.0, 4.0);
        self.ship.raise_alert(PIRATE_ALERT_GAIN);
    }

    /// Everything that happens with time, independent of the action
    fn advance(&mut self, dt: u32) {
        self.time_remaining -= dt as f32;
        self.shed_heat(dt);

        self.ship.escape_ticks = self.ship.escape_ticks.saturating_sub(dt);
        for buff in self.stabilized.iter_mut() {
            *buff = buff.saturating_sub(dt);
        }

        if self.ship.heat > HEAT_MAX {
            let overflow = self.ship.heat - HEAT_MAX;
            self.ship.hull -= OVERHEAT_HULL_PER_UNIT * overflow;
            self.ship.heat = HEAT_MAX;
            self.ledger.overheat_ticks += dt;
            self.emit(EventKind::Overheat, overflow);
        }

        if !self.at_station() {
            let node = &self.world.nodes[self.location];
            let (hazard, pirate) = (node.hazard, node.pirate);
            if hazard > 0.0 {
                let exposure = dt as f32 * hazard;
                self.ship.hull -= exposure * HAZARD_HULL * self.rng.uniform(0.8, 1.2);
                self.ship.heat += exposure * HAZARD_HEAT;
                self.ship.raise_alert(exposure * HAZARD_ALERT);
            }
            self.pirate_roll(dt, pirate);
        }

        self.market.advance(&mut self.rng, self.ticks + dt, dt);

        self.ship.clamp();
        self.time_remaining = self.time_remaining.clamp(0.0, self.time_max);

        let utilization = (self.ship.cargo_total() / CARGO_MAX).clamp(0.0, 1.0);
        self.ledger.utilization_sum += utilization * dt as f32;
        self.ledger.utilization_ticks += dt as f32;
    }

    #[allow(clippy::too_many_arguments)]
    fn reward(
        &self,
        before: &Snapshot,
        kind: ActionKind,
        dt: u32,
        invalid: bool,
        destroyed: bool,
        stranded: bool,
        done: bool,
    ) -> RewardBreakdown {
        let ship = &self.ship;
        let heat_excess = (ship.heat - reward::HEAT_SAFE_SHARE * HEAT_MAX).max(0.0);
        let heat_term = heat_excess / HEAT_MAX;
        let pirate_delta = (self.ledger.pirate_losses - before.pirate_losses).max(0.0);

        let mut terminal = 0.0;
        if stranded {
            terminal -= reward::STRANDED;
        }
        if destroyed {
            terminal -= reward::DESTROYED;
        }
        if done && !destroyed && !stranded {
            terminal += reward::CLEAN_FINISH * (ship.credits / CREDIT_SCALE);
        }

        RewardBreakdown {
            sell: (ship.credits - before.credits) / CREDIT_SCALE,
            extract: reward::EXTRACT
                * ((self.cargo_value() - before.cargo_value).max(0.0) / CREDIT_SCALE),
            fuel: -reward::FUEL * (before.fuel - ship.fuel).max(0.0) / 100.0,
            time: -reward::TIME * dt as f32,
            wear: -reward::WEAR * (before.tool - ship.tool).max(0.0) / 10.0,
            heat: -reward::HEAT * heat_term * heat_term,
            damage: -reward::DAMAGE * (before.hull - ship.hull).max(0.0) / 10.0,
            scan: if matches!(kind, ActionKind::Scan(_)) {
                -reward::SCAN
            } else {
                0.0
            },
            invalid: if invalid {
                -self.invalid_action_penalty
            } else {
                0.0
            },
            pirate: -reward::PIRATE * (pirate_delta / CREDIT_SCALE),
            terminal,
        }
    }

    fn metrics(&self, failed: bool) -> EpisodeMetrics {
        let ledger = &self.ledger;
        let net_profit = self.ship.credits - ledger.total_spend;
        let utilization = if ledger.utilization_ticks > 0.0 {
            ledger.utilization_sum / ledger.utilization_ticks
        } else {
            0.0
        };
        EpisodeMetrics {
            credits: self.ship.credits,
            net_profit,
            profit_per_tick: net_profit / self.ticks.max(1) as f32,
            survival: if failed { 0.0 } else { 1.0 },
            overheat_ticks: ledger.overheat_ticks as f32,
            pirate_encounters: ledger.pirate_encounters as f32,
            value_lost_to_pirates: ledger.pirate_losses,
            fuel_used: (self.start.fuel - self.ship.fuel).max(0.0),
            hull_damage: (self.start.hull - self.ship.hull).max(0.0),
            tool_wear: (self.start.tool - self.ship.tool).max(0.0),
            scan_count: ledger.scans as f32,
            mining_ticks: ledger.mining_ticks as f32,
            cargo_utilization_avg: utilization.clamp(0.0, 1.0),
            time_remaining: self.time_remaining,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sim(seed: u64) -> Simulation {
        Simulation::new(&CoreConfig::with_time_max(2000.0), seed)
    }

    fn act(sim: &mut Simulation, raw: i64) -> StepResult {
        sim.step(Action::new(raw).unwrap()).0
    }

    fn kinds(result: &StepResult) -> Vec<EventKind> {
        result.events.iter().map(|e| e.kind).collect()
    }

    #[test]
    fn test_normalize_floors_and_sums_to_one() {
        let out = normalize([0.0, -1.0, 2.0, 2.0, 0.0, 0.0]);
        let sum: f32 = out.iter().sum();
        assert!((sum - 1.0).abs() < 1e-6);
        assert!(out.iter().all(|v| *v > 0.0));
    }

    #[test]
    fn test_invalid_action_becomes_hold() {
        let mut sim = sim(4);
        // mining with nothing selected
        let result = act(&mut sim, 28);
        assert!(result.info.invalid_action);
        assert_eq!(result.info.dt, 1);
        assert_eq!(kinds(&result)[0], EventKind::InvalidAction);
        assert_eq!(result.events[0].value, 28.0);
    }

    #[test]
    fn test_travel_then_select_then_mine() {
        let mut sim = sim(21);
        let result = act(&mut sim, 0);
        assert_eq!(result.events[0], Event::new(EventKind::Travel, 1.0));
        assert_eq!(result.info.node_context, NodeContext::Field);
        if result.terminated {
            return;
        }

        let result = act(&mut sim, 12);
        assert_eq!(kinds(&result)[0], EventKind::AsteroidSelected);
        assert_eq!(sim.selection(), Some(0));

        let result = act(&mut sim, 30);
        assert_eq!(kinds(&result)[0], EventKind::Mined);
        assert!(sim.ship.cargo_total() > 0.0);
        assert_eq!(result.info.metrics.mining_ticks, 1.0);
    }

    #[test]
    fn test_selling_at_station_earns_credits() {
        let mut sim = sim(2);
        sim.ship.cargo[3] = 40.0;
        let result = act(&mut sim, 43 + 3 * 3 + 2);
        assert_eq!(kinds(&result)[0], EventKind::Sold);
        assert!(sim.ship.credits > 0.0);
        assert_eq!(sim.ship.cargo[3], 0.0);
        assert!(result.reward > 0.0);
    }

    #[test]
    fn test_purchases_respect_credits() {
        let mut sim = sim(2);
        assert!(act(&mut sim, 61).info.invalid_action);

        sim.ship.credits = 1000.0;
        let result = act(&mut sim, 64);
        assert!(!result.info.invalid_action);
        assert_eq!(sim.ship.repair_kits, STARTING_REPAIR_KITS + 1);
        assert_eq!(result.info.metrics.net_profit, 1000.0 - 150.0 - 150.0);
    }

    #[test]
    fn test_retire_reports_reason() {
        let mut sim = sim(2);
        let result = act(&mut sim, 68);
        assert!(result.terminated);
        assert!(!result.truncated);
        assert_eq!(result.info.end_reason, Some(TerminationReason::Retired));
        assert_eq!(kinds(&result).last(), Some(&EventKind::Terminated));
        assert_eq!(result.info.metrics.survival, 1.0);
    }

    fn last_tick(seed: u64) -> Simulation {
        Simulation::new(&CoreConfig::with_time_max(1.0), seed)
    }

    #[test]
    fn test_hull_failure_ends_as_destroyed() {
        let mut sim = last_tick(5);
        sim.ship.hull = 0.0;
        let (result, breakdown) = sim.step(Action::new(6).unwrap());

        assert!(result.terminated);
        assert!(!result.truncated);
        assert_eq!(result.info.end_reason, Some(TerminationReason::Destroyed));
        assert_eq!(
            kinds(&result),
            vec![EventKind::Destroyed, EventKind::Terminated]
        );
        assert_eq!(breakdown.terminal, -reward::DESTROYED);
        assert_eq!(breakdown.damage, 0.0);
        assert_eq!(result.info.metrics.survival, 0.0);
    }

    #[test]
    fn test_empty_tank_in_the_field_ends_as_stranded() {
        let mut sim = last_tick(8);
        sim.location = 1;
        sim.ship.fuel = 0.0;
        let (result, breakdown) = sim.step(Action::new(6).unwrap());

        assert!(result.terminated);
        assert!(!result.truncated);
        assert_eq!(result.info.end_reason, Some(TerminationReason::Stranded));
        assert_eq!(result.info.node_context, NodeContext::Field);
        assert!(kinds(&result).ends_with(&[EventKind::Stranded, EventKind::Terminated]));
        assert!(!kinds(&result).contains(&EventKind::Truncated));
        assert_eq!(breakdown.terminal, -reward::STRANDED);
        assert_eq!(result.info.metrics.survival, 0.0);
    }

    #[test]
    fn test_empty_tank_at_station_is_not_stranded() {
        let mut sim = sim(8);
        sim.ship.fuel = 0.0;
        let result = act(&mut sim, 6);
        assert!(!result.terminated);
        assert_eq!(result.info.end_reason, None);
    }

    #[test]
    fn test_destroyed_outranks_stranded() {
        let mut sim = last_tick(8);
        sim.location = 1;
        sim.ship.hull = 0.0;
        sim.ship.fuel = 0.0;
        let (result, breakdown) = sim.step(Action::new(6).unwrap());

        assert!(result.terminated && !result.truncated);
        assert_eq!(result.info.end_reason, Some(TerminationReason::Destroyed));
        assert!(kinds(&result).ends_with(&[
            EventKind::Destroyed,
            EventKind::Stranded,
            EventKind::Terminated
        ]));
        assert_eq!(breakdown.terminal, -(reward::DESTROYED + reward::STRANDED));
        assert_eq!(result.info.metrics.survival, 0.0);
    }

    #[test]
    fn test_cooldown_and_overheat() {
        let mut sim = sim(3);
        sim.ship.heat = 130.0;
        let result = act(&mut sim, 6);
        assert!(kinds(&result).contains(&EventKind::Overheat));
        assert_eq!(sim.ship.heat, HEAT_MAX);
        assert!(sim.ship.hull < HULL_MAX);

        let result = act(&mut sim, 33);
        assert_eq!(result.info.dt, COOLDOWN_TICKS);
        assert!(sim.ship.heat < HEAT_MAX);
    }
}
