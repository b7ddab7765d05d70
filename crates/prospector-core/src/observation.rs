//! Observation and step result types

use serde::{Deserialize, Serialize};

use crate::constants::OBS_DIM;
use crate::error::ProspectorError;
use crate::event::Event;

/// Fixed-length observation vector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f32>", into = "Vec<f32>")]
pub struct Observation([f32; OBS_DIM]);

impl Observation {
    pub fn zeros() -> Self {
        Observation([0.0; OBS_DIM])
    }

    pub fn from_array(values: [f32; OBS_DIM]) -> Self {
        Observation(values)
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn as_array(&self) -> &[f32; OBS_DIM] {
        &self.0
    }

    pub fn len(&self) -> usize {
        OBS_DIM
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn is_finite(&self) -> bool {
        self.0.iter().all(|v| v.is_finite())
    }
}

impl Default for Observation {
    fn default() -> Self {
        Self::zeros()
    }
}

impl std::ops::Index<usize> for Observation {
    type Output = f32;

    fn index(&self, index: usize) -> &f32 {
        &self.0[index]
    }
}

impl TryFrom<Vec<f32>> for Observation {
    type Error = ProspectorError;

    fn try_from(values: Vec<f32>) -> Result<Self, Self::Error> {
        let len = values.len();
        let array: [f32; OBS_DIM] = values.try_into().map_err(|_| {
            ProspectorError::SerializationError(format!(
                "observation has {} values, expected {}",
                len, OBS_DIM
            ))
        })?;
        Ok(Observation(array))
    }
}

impl From<Observation> for Vec<f32> {
    fn from(obs: Observation) -> Self {
        obs.0.to_vec()
    }
}

/// Result of a simulation step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    /// Observation after the step
    pub observation: Observation,

    /// Scalar reward signal
    pub reward: f32,

    /// Episode ended with a definitive outcome
    pub terminated: bool,

    /// Episode cut off by the time budget
    pub truncated: bool,

    /// Events in the order they occurred
    #[serde(default)]
    pub events: Vec<Event>,

    /// Auxiliary step data
    pub info: StepInfo,
}

impl StepResult {
    pub fn is_done(&self) -> bool {
        self.terminated || self.truncated
    }
}

/// Auxiliary data returned with every step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepInfo {
    /// Action that was applied
    pub action: u8,

    /// Ticks consumed by this step
    pub dt: u32,

    /// Ticks elapsed since reset, including this step
    pub t: u32,

    /// Action was in range but its preconditions failed
    pub invalid_action: bool,

    /// Why the episode ended
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_reason: Option<TerminationReason>,

    /// Where the ship is after the step
    pub node_context: NodeContext,

    /// Episode-level running metrics
    pub metrics: EpisodeMetrics,
}

/// Why an episode ended
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    Destroyed,
    Stranded,
    /// Agent ended the episode voluntarily
    Retired,
    TimeLimit,
}

impl TerminationReason {
    /// ABI code, `0` meaning "not ended"
    pub fn code(self) -> u8 {
        match self {
            TerminationReason::Destroyed => 1,
            TerminationReason::Stranded => 2,
            TerminationReason::Retired => 3,
            TerminationReason::TimeLimit => 4,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(TerminationReason::Destroyed),
            2 => Some(TerminationReason::Stranded),
            3 => Some(TerminationReason::Retired),
            4 => Some(TerminationReason::TimeLimit),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NodeContext {
    Station,
    Field,
}

impl NodeContext {
    pub fn code(self) -> u32 {
        match self {
            NodeContext::Station => 0,
            NodeContext::Field => 1,
        }
    }

    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(NodeContext::Station),
            1 => Some(NodeContext::Field),
            _ => None,
        }
    }
}

/// Running episode metrics reported after every step
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EpisodeMetrics {
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

impl EpisodeMetrics {
    /// Named view over every metric, in declaration order
    pub fn fields(&self) -> [(&'static str, f32); 14] {
        [
            ("credits", self.credits),
            ("net_profit", self.net_profit),
            ("profit_per_tick", self.profit_per_tick),
            ("survival", self.survival),
            ("overheat_ticks", self.overheat_ticks),
            ("pirate_encounters", self.pirate_encounters),
            ("value_lost_to_pirates", self.value_lost_to_pirates),
            ("fuel_used", self.fuel_used),
            ("hull_damage", self.hull_damage),
            ("tool_wear", self.tool_wear),
            ("scan_count", self.scan_count),
            ("mining_ticks", self.mining_ticks),
            ("cargo_utilization_avg", self.cargo_utilization_avg),
            ("time_remaining", self.time_remaining),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_observation_length_is_checked() {
        assert!(Observation::try_from(vec![0.0; OBS_DIM]).is_ok());
        assert!(Observation::try_from(vec![0.0; OBS_DIM - 1]).is_err());

        let json = format!("[{}]", vec!["0.5"; OBS_DIM + 1].join(","));
        assert!(serde_json::from_str::<Observation>(&json).is_err());
    }

    #[test]
    fn test_end_reason_codes() {
        for reason in [
            TerminationReason::Destroyed,
            TerminationReason::Stranded,
            TerminationReason::Retired,
            TerminationReason::TimeLimit,
        ] {
            assert_eq!(TerminationReason::from_code(reason.code()), Some(reason));
        }
        assert_eq!(TerminationReason::from_code(0), None);
    }
}
