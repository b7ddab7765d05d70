//! Versioned C ABI between the compiled core and its callers
//!
//! The compiled module exports two symbols:
//! - [`VERSION_SYMBOL`]: `extern "C" fn() -> u32`, the module's ABI version
//! - [`API_SYMBOL`]: `extern "C" fn() -> *const AbpCoreApi`, the function table
//!
//! Callers read the version first and refuse to touch the table when it does
//! not equal [`ABI_VERSION`]. Every buffer crossing the boundary is `#[repr(C)]`
//! and padding-free (`bytemuck::Pod`), so its size is a complete description
//! of its layout.

use bytemuck::{Pod, Zeroable};
use std::marker::{PhantomData, PhantomPinned};

use crate::config::CoreConfig;
use crate::constants::{N_ACTIONS, OBS_DIM};
use crate::error::{ProspectorError, Result};
use crate::event::{Event, EventKind};
use crate::observation::{
    EpisodeMetrics, NodeContext, Observation, StepInfo, StepResult, TerminationReason,
};

/// Current ABI version
pub const ABI_VERSION: u32 = 1;

/// Capacity of the per-step event buffer
pub const MAX_EVENTS: usize = 16;

pub const VERSION_SYMBOL: &[u8] = b"abp_core_abi_version\0";
pub const API_SYMBOL: &[u8] = b"abp_core_api\0";

/// Status codes returned by `reset` and `step`
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbpStatus {
    Ok = 0,
    NullHandle = 1,
    NullBuffer = 2,
    InvalidAction = 3,
    NotReset = 4,
    EpisodeEnded = 5,
    Panic = 6,
}

impl AbpStatus {
    pub fn from_i32(value: i32) -> Option<Self> {
        match value {
            0 => Some(AbpStatus::Ok),
            1 => Some(AbpStatus::NullHandle),
            2 => Some(AbpStatus::NullBuffer),
            3 => Some(AbpStatus::InvalidAction),
            4 => Some(AbpStatus::NotReset),
            5 => Some(AbpStatus::EpisodeEnded),
            6 => Some(AbpStatus::Panic),
            _ => None,
        }
    }
}

/// Configuration passed to `create`
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct AbpCoreConfig {
    pub time_max: f32,
    pub invalid_action_penalty: f32,
}

impl From<&CoreConfig> for AbpCoreConfig {
    fn from(config: &CoreConfig) -> Self {
        Self {
            time_max: config.time_max,
            invalid_action_penalty: config.invalid_action_penalty,
        }
    }
}

impl From<AbpCoreConfig> for CoreConfig {
    fn from(config: AbpCoreConfig) -> Self {
        Self {
            time_max: config.time_max,
            invalid_action_penalty: config.invalid_action_penalty,
        }
    }
}

/// One event record; `kind` is an [`EventKind`](crate::EventKind) code
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct AbpEvent {
    pub kind: u32,
    pub value: f32,
}

/// Episode metrics block, same order as [`EpisodeMetrics`](crate::EpisodeMetrics)
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct AbpMetrics {
    pub credits: f32,
    pub net_profit: f32,
    pub profit_per_tick: f32,
    pub survival: f32,
    pub overheat_ticks: f32,
    pub pirate_encounters: f32,
    pub value_lost_to_pirates: f32,
    pub fuel_used: f32,
    pub hull_damage: f32,
    pub tool_wear: f32,
    pub scan_count: f32,
    pub mining_ticks: f32,
    pub cargo_utilization_avg: f32,
    pub time_remaining: f32,
}

/// Output buffer filled by `step`
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct AbpStepResult {
    pub obs: [f32; OBS_DIM],
    pub reward: f32,
    pub dt: u32,
    /// Ticks elapsed since reset
    pub t: u32,
    pub action: i32,
    pub terminated: u8,
    pub truncated: u8,
    pub invalid_action: u8,
    /// [`TerminationReason`](crate::TerminationReason) code, `0` while running
    pub end_reason: u8,
    /// [`NodeContext`](crate::NodeContext) code
    pub node_context: u32,
    /// Number of valid entries in `events`
    pub event_count: u32,
    pub events: [AbpEvent; MAX_EVENTS],
    pub metrics: AbpMetrics,
}

impl AbpStepResult {
    pub fn zeroed_boxed() -> Box<Self> {
        Box::new(Self::zeroed())
    }

    /// Valid prefix of the event buffer
    pub fn event_slice(&self) -> &[AbpEvent] {
        let count = (self.event_count as usize).min(MAX_EVENTS);
        &self.events[..count]
    }

    /// Decode into the shared [`StepResult`], rejecting out-of-contract codes
    pub fn to_step_result(&self) -> Result<StepResult> {
        let action = u8::try_from(self.action)
            .map_err(|_| ProspectorError::AbiLayout(format!("action {} out of range", self.action)))?;
        let end_reason = match self.end_reason {
            0 => None,
            code => Some(TerminationReason::from_code(code).ok_or_else(|| {
                ProspectorError::AbiLayout(format!("unknown end reason {}", code))
            })?),
        };
        let node_context = NodeContext::from_code(self.node_context).ok_or_else(|| {
            ProspectorError::AbiLayout(format!("unknown node context {}", self.node_context))
        })?;
        let events = self
            .event_slice()
            .iter()
            .map(|e| {
                EventKind::from_code(e.kind)
                    .map(|kind| Event::new(kind, e.value))
                    .ok_or_else(|| ProspectorError::AbiLayout(format!("unknown event kind {}", e.kind)))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(StepResult {
            observation: Observation::from_array(self.obs),
            reward: self.reward,
            terminated: self.terminated != 0,
            truncated: self.truncated != 0,
            events,
            info: StepInfo {
                action,
                dt: self.dt,
                t: self.t,
                invalid_action: self.invalid_action != 0,
                end_reason,
                node_context,
                metrics: EpisodeMetrics::from(self.metrics),
            },
        })
    }
}

impl From<AbpMetrics> for EpisodeMetrics {
    fn from(m: AbpMetrics) -> Self {
        Self {
            credits: m.credits,
            net_profit: m.net_profit,
            profit_per_tick: m.profit_per_tick,
            survival: m.survival,
            overheat_ticks: m.overheat_ticks,
            pirate_encounters: m.pirate_encounters,
            value_lost_to_pirates: m.value_lost_to_pirates,
            fuel_used: m.fuel_used,
            hull_damage: m.hull_damage,
            tool_wear: m.tool_wear,
            scan_count: m.scan_count,
            mining_ticks: m.mining_ticks,
            cargo_utilization_avg: m.cargo_utilization_avg,
            time_remaining: m.time_remaining,
        }
    }
}

/// Opaque per-instance state owned by the compiled module
#[repr(C)]
pub struct AbpCoreHandle {
    _private: [u8; 0],
    _marker: PhantomData<(*mut u8, PhantomPinned)>,
}

pub type CreateFn = unsafe extern "C" fn(config: *const AbpCoreConfig) -> *mut AbpCoreHandle;
pub type DestroyFn = unsafe extern "C" fn(handle: *mut AbpCoreHandle);
pub type ResetFn = unsafe extern "C" fn(handle: *mut AbpCoreHandle, seed: u64, obs_out: *mut f32) -> i32;
pub type StepFn =
    unsafe extern "C" fn(handle: *mut AbpCoreHandle, action: i32, out: *mut AbpStepResult) -> i32;
pub type VersionFn = unsafe extern "C" fn() -> u32;
pub type ApiFn = unsafe extern "C" fn() -> *const AbpCoreApi;

/// Function table exported by the compiled module
///
/// `create` with a null config uses the defaults and returns null when the
/// config is rejected. `destroy` accepts null. `reset` and `step` return an
/// [`AbpStatus`] code and leave the instance untouched on any non-`Ok` status.
#[repr(C)]
#[derive(Debug)]
pub struct AbpCoreApi {
    pub abi_version: u32,
    pub obs_dim: u32,
    pub n_actions: u32,
    pub max_events: u32,
    pub step_result_size: u32,
    pub create: CreateFn,
    pub destroy: DestroyFn,
    pub reset: ResetFn,
    pub step: StepFn,
}

impl AbpCoreApi {
    /// Check that the table describes the same contract this crate was built with
    pub fn check_layout(&self) -> Result<()> {
        if self.abi_version != ABI_VERSION {
            return Err(ProspectorError::AbiVersionMismatch {
                expected: ABI_VERSION,
                found: self.abi_version,
            });
        }
        let expected = [
            ("obs_dim", OBS_DIM as u32, self.obs_dim),
            ("n_actions", N_ACTIONS as u32, self.n_actions),
            ("max_events", MAX_EVENTS as u32, self.max_events),
            (
                "step_result_size",
                std::mem::size_of::<AbpStepResult>() as u32,
                self.step_result_size,
            ),
        ];
        for (field, want, got) in expected {
            if want != got {
                return Err(ProspectorError::AbiLayout(format!(
                    "{} is {}, expected {}",
                    field, got, want
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ptr;

    unsafe extern "C" fn noop_create(_: *const AbpCoreConfig) -> *mut AbpCoreHandle {
        ptr::null_mut()
    }
    unsafe extern "C" fn noop_destroy(_: *mut AbpCoreHandle) {}
    unsafe extern "C" fn noop_reset(_: *mut AbpCoreHandle, _: u64, _: *mut f32) -> i32 {
        AbpStatus::NullHandle as i32
    }
    unsafe extern "C" fn noop_step(_: *mut AbpCoreHandle, _: i32, _: *mut AbpStepResult) -> i32 {
        AbpStatus::NullHandle as i32
    }

    fn table(abi_version: u32, obs_dim: u32) -> AbpCoreApi {
        AbpCoreApi {
            abi_version,
            obs_dim,
            n_actions: N_ACTIONS as u32,
            max_events: MAX_EVENTS as u32,
            step_result_size: std::mem::size_of::<AbpStepResult>() as u32,
            create: noop_create,
            destroy: noop_destroy,
            reset: noop_reset,
            step: noop_step,
        }
    }

    #[test]
    fn test_step_result_has_documented_size() {
        // 260 obs + 4 scalars + 4 flag bytes + 2 words + 16 events + 14 metrics
        let expected = 4 * OBS_DIM + 16 + 4 + 8 + 8 * MAX_EVENTS + 4 * 14;
        assert_eq!(std::mem::size_of::<AbpStepResult>(), expected);
        assert_eq!(std::mem::size_of::<AbpEvent>(), 8);
        assert_eq!(std::mem::size_of::<AbpCoreConfig>(), 8);
    }

    #[test]
    fn test_check_layout() {
        assert!(table(ABI_VERSION, OBS_DIM as u32).check_layout().is_ok());
        assert!(matches!(
            table(ABI_VERSION + 1, OBS_DIM as u32).check_layout(),
            Err(ProspectorError::AbiVersionMismatch { expected: 1, found: 2 })
        ));
        assert!(matches!(
            table(ABI_VERSION, 259).check_layout(),
            Err(ProspectorError::AbiLayout(_))
        ));
    }

    #[test]
    fn test_status_codes() {
        for code in 0..=6 {
            let status = AbpStatus::from_i32(code).expect("known status");
            assert_eq!(status as i32, code);
        }
        assert_eq!(AbpStatus::from_i32(-1), None);
    }

    #[test]
    fn test_event_slice_is_bounded() {
        let mut out = AbpStepResult::zeroed();
        out.event_count = 40;
        assert_eq!(out.event_slice().len(), MAX_EVENTS);
        out.event_count = 2;
        assert_eq!(out.event_slice().len(), 2);
    }

    #[test]
    fn test_decode_step_result() {
        let mut out = AbpStepResult::zeroed();
        out.action = 42;
        out.dt = 1;
        out.t = 7;
        out.node_context = NodeContext::Field.code();
        out.invalid_action = 1;
        out.event_count = 1;
        out.events[0] = AbpEvent {
            kind: EventKind::InvalidAction.code(),
            value: 42.0,
        };
        let step = out.to_step_result().expect("decodes");
        assert_eq!(step.info.action, 42);
        assert!(step.info.invalid_action);
        assert_eq!(step.info.end_reason, None);
        assert_eq!(step.events, vec![Event::new(EventKind::InvalidAction, 42.0)]);

        out.events[0].kind = 999;
        assert!(matches!(out.to_step_result(), Err(ProspectorError::AbiLayout(_))));
        out.events[0].kind = EventKind::Docked.code();
        out.end_reason = 9;
        assert!(out.to_step_result().is_err());
    }
}
