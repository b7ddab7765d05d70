//! [`Environment`] over a compiled-core handle

use std::ptr::NonNull;

use prospector_core::abi::{AbpCoreHandle, AbpStatus, AbpStepResult};
use prospector_core::constants::OBS_DIM;
use prospector_core::{Backend, Environment, Observation, ProspectorError, Result, StepResult};
use tracing::debug;

use crate::module::NativeModule;

/// Sent across the boundary for actions that do not fit in an `i32`
const UNREPRESENTABLE_ACTION: i32 = -1;

/// One instance of the compiled core
///
/// Owns its handle exclusively and destroys it exactly once, on
/// [`close`](Environment::close) or drop.
pub struct NativeEnv {
    module: NativeModule,
    handle: Option<NonNull<AbpCoreHandle>>,
    scratch: Box<AbpStepResult>,
}

// The handle is only reached through `&mut self`.
unsafe impl Send for NativeEnv {}

impl NativeEnv {
    pub(crate) fn new(module: NativeModule, handle: NonNull<AbpCoreHandle>) -> Self {
        Self {
            module,
            handle: Some(handle),
            scratch: AbpStepResult::zeroed_boxed(),
        }
    }

    pub fn module(&self) -> &NativeModule {
        &self.module
    }

    pub fn is_closed(&self) -> bool {
        self.handle.is_none()
    }

    fn handle(&self) -> Result<NonNull<AbpCoreHandle>> {
        self.handle.ok_or(ProspectorError::HandleClosed)
    }
}

/// Map a native status code onto the shared error taxonomy
fn check_status(status: i32, action: i64) -> Result<()> {
    match AbpStatus::from_i32(status) {
        Some(AbpStatus::Ok) => Ok(()),
        Some(AbpStatus::NullHandle) => Err(ProspectorError::HandleClosed),
        Some(AbpStatus::NullBuffer) => Err(ProspectorError::AbiLayout(
            "native core received a null buffer".to_string(),
        )),
        Some(AbpStatus::InvalidAction) => Err(ProspectorError::InvalidAction(action)),
        Some(AbpStatus::NotReset) => Err(ProspectorError::NotReset),
        Some(AbpStatus::EpisodeEnded) => Err(ProspectorError::EpisodeEnded),
        Some(AbpStatus::Panic) => Err(ProspectorError::NativePanic),
        None => Err(ProspectorError::NativeStatus(status)),
    }
}

impl Environment for NativeEnv {
    fn backend(&self) -> Backend {
        Backend::Native
    }

    fn reset(&mut self, seed: u64) -> Result<Observation> {
        let handle = self.handle()?;
        let mut obs = [0.0f32; OBS_DIM];
        let status = unsafe { (self.module.api().reset)(handle.as_ptr(), seed, obs.as_mut_ptr()) };
        check_status(status, 0)?;
        debug!(seed, "native reset");
        Ok(Observation::from_array(obs))
    }

    fn step(&mut self, action: i64) -> Result<StepResult> {
        let handle = self.handle()?;
        // Out-of-range values still go through the core so that phase errors
        // take precedence over the range check.
        let raw = i32::try_from(action).unwrap_or(UNREPRESENTABLE_ACTION);
        let status = unsafe { (self.module.api().step)(handle.as_ptr(), raw, &mut *self.scratch) };
        check_status(status, action)?;
        self.scratch.to_step_result()
    }

    fn close(&mut self) -> Result<()> {
        let handle = self.handle.take().ok_or(ProspectorError::HandleClosed)?;
        unsafe { (self.module.api().destroy)(handle.as_ptr()) };
        debug!("native handle destroyed");
        Ok(())
    }
}

impl Drop for NativeEnv {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            unsafe { (self.module.api().destroy)(handle.as_ptr()) };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prospector_core::CoreConfig;

    fn env() -> NativeEnv {
        NativeModule::linked(prospector_native::api())
            .unwrap()
            .create_env(&CoreConfig::with_time_max(2000.0))
            .unwrap()
    }

    #[test]
    fn test_status_mapping() {
        assert!(check_status(0, 5).is_ok());
        assert!(matches!(check_status(1, 5), Err(ProspectorError::HandleClosed)));
        assert!(matches!(check_status(3, 99), Err(ProspectorError::InvalidAction(99))));
        assert!(matches!(check_status(4, 5), Err(ProspectorError::NotReset)));
        assert!(matches!(check_status(5, 5), Err(ProspectorError::EpisodeEnded)));
        assert!(matches!(check_status(6, 5), Err(ProspectorError::NativePanic)));
        assert!(matches!(check_status(42, 5), Err(ProspectorError::NativeStatus(42))));
    }

    #[test]
    fn test_contract_through_the_table() {
        let mut env = env();
        assert_eq!(env.backend(), Backend::Native);
        assert!(matches!(env.step(6), Err(ProspectorError::NotReset)));
        assert!(matches!(env.step(i64::MAX), Err(ProspectorError::NotReset)));

        let obs = env.reset(11).unwrap();
        assert_eq!(obs.len(), OBS_DIM);
        assert!(obs.is_finite());

        for raw in [-1, 69, i64::MAX, i64::MIN] {
            assert!(matches!(
                env.step(raw),
                Err(ProspectorError::InvalidAction(v)) if v == raw
            ));
        }

        let result = env.step(68).unwrap();
        assert!(result.terminated);
        assert!(matches!(env.step(6), Err(ProspectorError::EpisodeEnded)));
        assert!(matches!(env.step(-3), Err(ProspectorError::EpisodeEnded)));
    }

    #[test]
    fn test_close_is_final() {
        let mut env = env();
        env.reset(1).unwrap();
        env.close().unwrap();
        assert!(env.is_closed());
        assert!(matches!(env.reset(1), Err(ProspectorError::HandleClosed)));
        assert!(matches!(env.step(6), Err(ProspectorError::HandleClosed)));
        assert!(matches!(env.close(), Err(ProspectorError::HandleClosed)));
    }

    #[test]
    fn test_rejected_action_does_not_disturb_the_episode() {
        let mut a = env();
        let mut b = env();
        a.reset(23).unwrap();
        b.reset(23).unwrap();
        assert!(a.step(500).is_err());
        for action in [8, 11, 29, 0, 6] {
            assert_eq!(a.step(action).unwrap(), b.step(action).unwrap());
        }
    }

    #[test]
    fn test_env_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<NativeEnv>();
    }
}
