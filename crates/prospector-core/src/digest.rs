//! Trajectory digests
//!
//! A SHA-256 over the exact bits of every observation, reward, flag and event
//! of a run. Two runs with equal digests produced bit-identical trajectories.

use sha2::{Digest, Sha256};

use crate::observation::{Observation, StepResult};

#[derive(Clone, Default)]
pub struct TrajectoryDigest {
    hasher: Sha256,
    steps: u64,
}

impl std::fmt::Debug for TrajectoryDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrajectoryDigest")
            .field("steps", &self.steps)
            .finish_non_exhaustive()
    }
}

impl TrajectoryDigest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_reset(&mut self, seed: u64, observation: &Observation) {
        self.hasher.update(b"R");
        self.hasher.update(seed.to_le_bytes());
        self.update_observation(observation);
    }

    pub fn record_step(&mut self, step: &StepResult) {
        self.steps += 1;
        self.hasher.update(b"S");
        self.update_observation(&step.observation);
        self.hasher.update(step.reward.to_bits().to_le_bytes());
        self.hasher.update([
            step.terminated as u8,
            step.truncated as u8,
            step.info.invalid_action as u8,
            step.info.action,
        ]);
        self.hasher.update(step.info.dt.to_le_bytes());
        self.hasher.update((step.events.len() as u32).to_le_bytes());
        for event in &step.events {
            self.hasher.update(event.kind.code().to_le_bytes());
            self.hasher.update(event.value.to_bits().to_le_bytes());
        }
        for (_, value) in step.info.metrics.fields() {
            self.hasher.update(value.to_bits().to_le_bytes());
        }
    }

    /// Record a rejected step by its error code
    pub fn record_rejection(&mut self, action: i64, code: i32) {
        self.hasher.update(b"X");
        self.hasher.update(action.to_le_bytes());
        self.hasher.update(code.to_le_bytes());
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn finish(self) -> String {
        hex::encode(self.hasher.finalize())
    }

    fn update_observation(&mut self, observation: &Observation) {
        for value in observation.as_slice() {
            self.hasher.update(value.to_bits().to_le_bytes());
        }
    }
}
