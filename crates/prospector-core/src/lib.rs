//! # prospector-core
//!
//! Shared contract for the Prospector asteroid-mining environment.
//!
//! Both environment implementations (the portable reference and the compiled
//! native core) speak the types defined here:
//! - Frozen dimensions and action/observation layout
//! - Step results, events and episode metrics
//! - The seeded random stream
//! - The versioned C ABI used across the foreign-function boundary
//! - Replay frames and trajectory digests built from step results

pub mod abi;
pub mod action;
pub mod config;
pub mod constants;
pub mod digest;
pub mod environment;
pub mod error;
pub mod event;
pub mod observation;
pub mod replay;
pub mod reward;
pub mod rng;

pub use action::{Action, ActionKind, FuelPack, MiningMode, ScanMode, SellFraction, Supply};
pub use config::CoreConfig;
pub use digest::TrajectoryDigest;
pub use environment::{Backend, Environment};
pub use error::{ErrorCategory, ProspectorError, Result, error_codes};
pub use event::{Event, EventKind};
pub use observation::{EpisodeMetrics, NodeContext, Observation, StepInfo, StepResult, TerminationReason};
pub use replay::{REPLAY_SCHEMA_VERSION, RenderState, ReplayFrame};
pub use reward::RewardBreakdown;
pub use rng::RandomStream;
