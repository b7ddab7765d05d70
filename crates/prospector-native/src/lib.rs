//! Compiled Prospector core
//!
//! Builds as a `cdylib` exporting the versioned C ABI described in
//! [`prospector_core::abi`], and as an `rlib` so Rust callers can link the
//! same code directly through [`api`] or drive a [`NativeCore`] without any
//! foreign calls.
//!
//! All state lives in flat fixed-size arrays and every step is a pure
//! function of the state and the action, so two instances seeded alike
//! produce bit-identical output.

pub mod ffi;
mod obs;
mod params;
mod rng;
mod state;
mod step;
mod world;

use prospector_core::abi::{AbpCoreApi, AbpCoreConfig, AbpStatus, AbpStepResult};
use prospector_core::constants::{MAX_ACTION, OBS_DIM};
use prospector_core::{CoreConfig, Result};

use state::{CoreState, Phase};

/// One simulation instance
///
/// Boxed internally; the state is several tens of kilobytes.
#[derive(Debug, Clone)]
pub struct NativeCore {
    state: Box<CoreState>,
}

impl NativeCore {
    /// Create an instance that must be reset before stepping
    pub fn new(config: &CoreConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_abi_config(AbpCoreConfig::from(config)))
    }

    pub(crate) fn from_abi_config(config: AbpCoreConfig) -> Self {
        let state = CoreState {
            time_max: config.time_max,
            invalid_action_penalty: config.invalid_action_penalty,
            ..CoreState::default()
        };
        Self {
            state: Box::new(state),
        }
    }

    /// Start a new episode from `seed` and write the first observation
    pub fn reset(&mut self, seed: u64, obs_out: &mut [f32; OBS_DIM]) {
        world::init_episode(&mut self.state, seed);
        obs::pack_obs(&self.state, obs_out);
    }

    /// Advance one step
    ///
    /// On any status other than [`AbpStatus::Ok`] neither the instance nor
    /// `out` is modified.
    pub fn step(&mut self, action: i32, out: &mut AbpStepResult) -> AbpStatus {
        match self.state.phase {
            Phase::Fresh => return AbpStatus::NotReset,
            Phase::Ended => return AbpStatus::EpisodeEnded,
            Phase::Running => {}
        }
        if !(0..=MAX_ACTION as i32).contains(&action) {
            return AbpStatus::InvalidAction;
        }
        step::step(&mut self.state, action as u8, out);
        AbpStatus::Ok
    }

    /// Seed of the current (or last) episode
    pub fn seed(&self) -> u64 {
        self.state.seed
    }

    pub fn episode_over(&self) -> bool {
        self.state.phase == Phase::Ended
    }
}

/// Function table for callers linking this crate directly
pub fn api() -> &'static AbpCoreApi {
    &ffi::API
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytemuck::Zeroable;

    fn core() -> NativeCore {
        NativeCore::new(&CoreConfig::default()).expect("default config")
    }

    #[test]
    fn test_step_before_reset_is_rejected() {
        let mut core = core();
        let mut out = AbpStepResult::zeroed();
        assert_eq!(core.step(6, &mut out), AbpStatus::NotReset);
        assert_eq!(out, AbpStepResult::zeroed());
    }

    #[test]
    fn test_out_of_range_action_is_rejected_without_mutation() {
        let mut core = core();
        let mut obs = [0.0f32; OBS_DIM];
        core.reset(9, &mut obs);
        let before = core.clone();

        let mut out = AbpStepResult::zeroed();
        for action in [-1, 69, 255, i32::MIN, i32::MAX] {
            assert_eq!(core.step(action, &mut out), AbpStatus::InvalidAction);
        }
        assert_eq!(out, AbpStepResult::zeroed());

        let mut a = AbpStepResult::zeroed();
        let mut b = AbpStepResult::zeroed();
        let mut untouched = before;
        assert_eq!(core.step(6, &mut a), AbpStatus::Ok);
        assert_eq!(untouched.step(6, &mut b), AbpStatus::Ok);
        assert_eq!(a, b);
    }

    #[test]
    fn test_phase_checks_win_over_range_check() {
        let mut core = core();
        let mut out = AbpStepResult::zeroed();
        assert_eq!(core.step(500, &mut out), AbpStatus::NotReset);

        let mut obs = [0.0f32; OBS_DIM];
        core.reset(1, &mut obs);
        assert_eq!(core.step(68, &mut out), AbpStatus::Ok);
        assert!(core.episode_over());
        assert_eq!(core.step(500, &mut out), AbpStatus::EpisodeEnded);
        assert_eq!(core.step(6, &mut out), AbpStatus::EpisodeEnded);
    }

    #[test]
    fn test_same_seed_same_trajectory() {
        let mut a = core();
        let mut b = core();
        let mut obs_a = [0.0f32; OBS_DIM];
        let mut obs_b = [0.0f32; OBS_DIM];
        a.reset(1234, &mut obs_a);
        b.reset(1234, &mut obs_b);
        assert_eq!(obs_a, obs_b);

        let mut out_a = AbpStepResult::zeroed();
        let mut out_b = AbpStepResult::zeroed();
        for i in 0..200 {
            let action = (i * 7 % 69) as i32;
            if a.episode_over() {
                a.reset(1234 + i, &mut obs_a);
                b.reset(1234 + i, &mut obs_b);
            }
            assert_eq!(a.step(action, &mut out_a), AbpStatus::Ok);
            assert_eq!(b.step(action, &mut out_b), AbpStatus::Ok);
            assert_eq!(out_a, out_b);
        }
    }

    #[test]
    fn test_reset_observation_starts_at_station() {
        let mut core = core();
        let mut obs = [0.0f32; OBS_DIM];
        core.reset(42, &mut obs);
        assert_eq!(obs[0], 1.0);
        assert_eq!(obs[1], 1.0);
        assert_eq!(obs[prospector_core::constants::obs_layout::AT_STATION], 1.0);
        assert_eq!(core.seed(), 42);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = CoreConfig {
            time_max: 0.0,
            ..CoreConfig::default()
        };
        assert!(NativeCore::new(&config).is_err());
    }
}
