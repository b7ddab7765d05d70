//! Environment trait shared by the reference and native implementations

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::observation::{Observation, StepResult};

/// Which implementation sits behind an [`Environment`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    Reference,
    Native,
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Backend::Reference => write!(f, "reference"),
            Backend::Native => write!(f, "native"),
        }
    }
}

/// One environment instance
///
/// Instances own their simulation state exclusively and are driven from a
/// single thread at a time. Every error leaves the instance exactly as it was
/// before the call.
pub trait Environment: Send {
    fn backend(&self) -> Backend;

    /// Regenerate the world from `seed` and return the initial observation
    fn reset(&mut self, seed: u64) -> Result<Observation>;

    /// Advance one step. `action` is the raw caller value; anything outside
    /// `0..=68` is rejected with `InvalidAction`.
    fn step(&mut self, action: i64) -> Result<StepResult>;

    /// Release the instance. Any later call fails with `HandleClosed`.
    fn close(&mut self) -> Result<()>;
}

impl<E: Environment + ?Sized> Environment for Box<E> {
    fn backend(&self) -> Backend {
        (**self).backend()
    }

    fn reset(&mut self, seed: u64) -> Result<Observation> {
        (**self).reset(seed)
    }

    fn step(&mut self, action: i64) -> Result<StepResult> {
        (**self).step(action)
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }
}
