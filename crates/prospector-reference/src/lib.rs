//! # prospector-reference
//!
//! Portable reference implementation of the Prospector environment.
//!
//! Written for readability: the world is a graph of [`world::Node`]s with
//! lanes and asteroids, the ship and market are plain structs, and every
//! action is decoded through [`ActionKind`](prospector_core::ActionKind). It
//! shares no simulation code with the compiled core; agreement between the
//! two is checked by the parity harness.

mod market;
mod observe;
mod ship;
mod sim;
mod tuning;
pub mod world;

pub use ship::Ship;

use prospector_core::{
    Action, Backend, CoreConfig, Environment, Observation, ProspectorError, Result,
    RewardBreakdown, StepResult,
};
use tracing::debug;

use sim::Simulation;

enum Lifecycle {
    Uninitialized,
    Running(Box<Simulation>),
    Ended(Box<Simulation>),
    Closed,
}

/// Reference [`Environment`]
pub struct ReferenceEnv {
    config: CoreConfig,
    lifecycle: Lifecycle,
    last_reward: Option<RewardBreakdown>,
}

impl ReferenceEnv {
    pub fn new(config: CoreConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            lifecycle: Lifecycle::Uninitialized,
            last_reward: None,
        })
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    /// Per-term reward of the most recent accepted step
    pub fn last_reward_breakdown(&self) -> Option<&RewardBreakdown> {
        self.last_reward.as_ref()
    }

    /// Current ship state, if an episode has been started
    pub fn ship(&self) -> Option<&Ship> {
        self.simulation().map(|sim| &sim.ship)
    }

    /// World of the current episode, if any
    pub fn world(&self) -> Option<&world::World> {
        self.simulation().map(|sim| &sim.world)
    }

    fn simulation(&self) -> Option<&Simulation> {
        match &self.lifecycle {
            Lifecycle::Running(sim) | Lifecycle::Ended(sim) => Some(sim),
            Lifecycle::Uninitialized | Lifecycle::Closed => None,
        }
    }
}

impl Environment for ReferenceEnv {
    fn backend(&self) -> Backend {
        Backend::Reference
    }

    fn reset(&mut self, seed: u64) -> Result<Observation> {
        if matches!(self.lifecycle, Lifecycle::Closed) {
            return Err(ProspectorError::HandleClosed);
        }
        debug!(seed, time_max = self.config.time_max, "reference reset");
        let sim = Box::new(Simulation::new(&self.config, seed));
        let obs = observe::encode(&sim);
        self.lifecycle = Lifecycle::Running(sim);
        self.last_reward = None;
        Ok(obs)
    }

    fn step(&mut self, action: i64) -> Result<StepResult> {
        let sim = match &mut self.lifecycle {
            Lifecycle::Closed => return Err(ProspectorError::HandleClosed),
            Lifecycle::Uninitialized => return Err(ProspectorError::NotReset),
            Lifecycle::Ended(_) => return Err(ProspectorError::EpisodeEnded),
            Lifecycle::Running(sim) => sim,
        };
        let action = Action::new(action)?;

        let (result, reward) = sim.step(action);
        self.last_reward = Some(reward);

        if result.is_done() {
            if let Lifecycle::Running(sim) =
                std::mem::replace(&mut self.lifecycle, Lifecycle::Uninitialized)
            {
                self.lifecycle = Lifecycle::Ended(sim);
            }
        }
        Ok(result)
    }

    fn close(&mut self) -> Result<()> {
        if matches!(self.lifecycle, Lifecycle::Closed) {
            return Err(ProspectorError::HandleClosed);
        }
        self.lifecycle = Lifecycle::Closed;
        Ok(())
    }
}
