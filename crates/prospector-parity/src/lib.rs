//! # prospector-parity
//!
//! Drives the reference environment and the compiled core in lockstep with
//! identical seeds and action streams and reports the first field on which
//! they disagree.
//!
//! A run is a grid of [`Case`]s (suite x time budget x seed). Each case steps
//! both sides `steps` times, auto-resetting with `seed + episode` whenever an
//! episode ends, and records a SHA-256 digest of each side's trajectory.

pub mod bundle;
pub mod compare;
pub mod config;
pub mod harness;
pub mod runner;
pub mod suite;

pub use bundle::MismatchBundle;
pub use compare::FieldMismatch;
pub use config::{ParityConfig, Tolerance};
pub use harness::{Case, CaseReport, Divergence, EnvFactory, StandardFactory, replay_actions, run_case};
pub use runner::{ParityReport, plan_cases, run_parity};
pub use suite::{ActionPolicy, Suite};
