//! C ABI exports
//!
//! Handles are `Box<NativeCore>` pointers. Panics never cross the boundary:
//! `reset` and `step` catch them and report [`AbpStatus::Panic`].

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::ptr;

use prospector_core::CoreConfig;
use prospector_core::abi::{
    ABI_VERSION, AbpCoreApi, AbpCoreConfig, AbpCoreHandle, AbpStatus, AbpStepResult, MAX_EVENTS,
};
use prospector_core::constants::{N_ACTIONS, OBS_DIM};

use crate::NativeCore;

pub(crate) static API: AbpCoreApi = AbpCoreApi {
    abi_version: ABI_VERSION,
    obs_dim: OBS_DIM as u32,
    n_actions: N_ACTIONS as u32,
    max_events: MAX_EVENTS as u32,
    step_result_size: std::mem::size_of::<AbpStepResult>() as u32,
    create: core_create,
    destroy: core_destroy,
    reset: core_reset,
    step: core_step,
};

#[unsafe(no_mangle)]
pub extern "C" fn abp_core_abi_version() -> u32 {
    ABI_VERSION
}

#[unsafe(no_mangle)]
pub extern "C" fn abp_core_api() -> *const AbpCoreApi {
    &API
}

/// # Safety
/// `config` must be null or point to a valid [`AbpCoreConfig`].
unsafe extern "C" fn core_create(config: *const AbpCoreConfig) -> *mut AbpCoreHandle {
    let config = if config.is_null() {
        AbpCoreConfig::from(&CoreConfig::default())
    } else {
        unsafe { *config }
    };
    if CoreConfig::from(config).validate().is_err() {
        return ptr::null_mut();
    }
    let core = Box::new(NativeCore::from_abi_config(config));
    Box::into_raw(core).cast()
}

/// # Safety
/// `handle` must be null or come from `core_create` and not yet be destroyed.
unsafe extern "C" fn core_destroy(handle: *mut AbpCoreHandle) {
    if handle.is_null() {
        return;
    }
    drop(unsafe { Box::from_raw(handle.cast::<NativeCore>()) });
}

/// # Safety
/// `handle` as for `core_destroy`; `obs_out` must be null or point to
/// `OBS_DIM` writable floats.
unsafe extern "C" fn core_reset(handle: *mut AbpCoreHandle, seed: u64, obs_out: *mut f32) -> i32 {
    if handle.is_null() {
        return AbpStatus::NullHandle as i32;
    }
    if obs_out.is_null() {
        return AbpStatus::NullBuffer as i32;
    }
    let core = unsafe { &mut *handle.cast::<NativeCore>() };
    let obs = unsafe { &mut *obs_out.cast::<[f32; OBS_DIM]>() };

    match catch_unwind(AssertUnwindSafe(|| core.reset(seed, obs))) {
        Ok(()) => AbpStatus::Ok as i32,
        Err(_) => AbpStatus::Panic as i32,
    }
}

/// # Safety
/// `handle` as for `core_destroy`; `out` must be null or point to a writable
/// [`AbpStepResult`].
unsafe extern "C" fn core_step(handle: *mut AbpCoreHandle, action: i32, out: *mut AbpStepResult) -> i32 {
    if handle.is_null() {
        return AbpStatus::NullHandle as i32;
    }
    if out.is_null() {
        return AbpStatus::NullBuffer as i32;
    }
    let core = unsafe { &mut *handle.cast::<NativeCore>() };
    let out = unsafe { &mut *out };

    match catch_unwind(AssertUnwindSafe(|| core.step(action, out))) {
        Ok(status) => status as i32,
        Err(_) => AbpStatus::Panic as i32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytemuck::Zeroable;

    #[test]
    fn test_table_matches_contract() {
        assert_eq!(abp_core_abi_version(), ABI_VERSION);
        let api = unsafe { &*abp_core_api() };
        api.check_layout().expect("layout");
    }

    #[test]
    fn test_lifecycle_through_table() {
        let api = crate::api();
        unsafe {
            let handle = (api.create)(ptr::null());
            assert!(!handle.is_null());

            let mut out = AbpStepResult::zeroed();
            assert_eq!((api.step)(handle, 6, &mut out), AbpStatus::NotReset as i32);

            let mut obs = [0.0f32; OBS_DIM];
            assert_eq!((api.reset)(handle, 42, obs.as_mut_ptr()), AbpStatus::Ok as i32);
            assert_eq!((api.step)(handle, 6, &mut out), AbpStatus::Ok as i32);
            assert_eq!(out.action, 6);
            assert_eq!(out.t, 1);

            assert_eq!((api.reset)(handle, 42, ptr::null_mut()), AbpStatus::NullBuffer as i32);
            assert_eq!((api.step)(handle, 6, ptr::null_mut()), AbpStatus::NullBuffer as i32);
            (api.destroy)(handle);
        }
    }

    #[test]
    fn test_null_handle_and_bad_config() {
        let api = crate::api();
        unsafe {
            let mut out = AbpStepResult::zeroed();
            assert_eq!(
                (api.step)(ptr::null_mut(), 0, &mut out),
                AbpStatus::NullHandle as i32
            );
            (api.destroy)(ptr::null_mut());

            let bad = AbpCoreConfig {
                time_max: -1.0,
                invalid_action_penalty: 0.01,
            };
            assert!((api.create)(&bad).is_null());
        }
    }
}
