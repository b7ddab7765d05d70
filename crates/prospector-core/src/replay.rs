//! Replay frame records
//!
//! One frame per step, built only from the public [`StepResult`]; nothing
//! here reaches into simulation state.

use serde::{Deserialize, Serialize};

use crate::error::{ProspectorError, Result};
use crate::event::EventKind;
use crate::observation::{NodeContext, Observation, StepInfo, StepResult};

pub const REPLAY_SCHEMA_VERSION: u32 = 1;

/// Subset of the step needed to draw a frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderState {
    pub observation: Observation,
    pub time_remaining: f32,
    pub credits: f32,
    pub net_profit: f32,
    pub survival: f32,
    pub cargo_utilization_avg: f32,
    pub node_context: NodeContext,
}

/// A single replay frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayFrame {
    pub schema_version: u32,
    pub frame_index: i64,
    pub t: u32,
    pub dt: u32,
    pub action: u8,
    pub reward: f32,
    pub terminated: bool,
    pub truncated: bool,
    pub render_state: RenderState,
    pub events: Vec<EventKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub info: Option<StepInfo>,
}

impl ReplayFrame {
    pub fn from_step(frame_index: i64, step: &StepResult, include_info: bool) -> Self {
        let metrics = &step.info.metrics;
        Self {
            schema_version: REPLAY_SCHEMA_VERSION,
            frame_index,
            t: step.info.t,
            dt: step.info.dt,
            action: step.info.action,
            reward: step.reward,
            terminated: step.terminated,
            truncated: step.truncated,
            render_state: RenderState {
                observation: step.observation.clone(),
                time_remaining: metrics.time_remaining,
                credits: metrics.credits,
                net_profit: metrics.net_profit,
                survival: metrics.survival,
                cargo_utilization_avg: metrics.cargo_utilization_avg,
                node_context: step.info.node_context,
            },
            events: step.events.iter().map(|e| e.kind).collect(),
            info: include_info.then(|| step.info.clone()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.schema_version != REPLAY_SCHEMA_VERSION {
            return Err(ProspectorError::ReplaySchema(format!(
                "unsupported replay schema version: {} (expected {})",
                self.schema_version, REPLAY_SCHEMA_VERSION
            )));
        }
        if self.frame_index < 0 {
            return Err(ProspectorError::ReplaySchema(
                "frame_index must be non-negative".into(),
            ));
        }
        if self.dt == 0 {
            return Err(ProspectorError::ReplaySchema("dt must be positive".into()));
        }
        if self.terminated && self.truncated {
            return Err(ProspectorError::ReplaySchema(
                "frame is both terminated and truncated".into(),
            ));
        }
        Ok(())
    }

    /// Parse and validate a JSON frame
    pub fn from_json(text: &str) -> Result<Self> {
        let frame: ReplayFrame = serde_json::from_str(text)?;
        frame.validate()?;
        Ok(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Event;
    use crate::observation::EpisodeMetrics;

    fn sample_step() -> StepResult {
        StepResult {
            observation: Observation::zeros(),
            reward: -0.25,
            terminated: false,
            truncated: false,
            events: vec![Event::new(EventKind::Travel, 3.0)],
            info: StepInfo {
                action: 0,
                dt: 4,
                t: 4,
                invalid_action: false,
                end_reason: None,
                node_context: NodeContext::Field,
                metrics: EpisodeMetrics {
                    credits: 10.0,
                    time_remaining: 1996.0,
                    ..Default::default()
                },
            },
        }
    }

    #[test]
    fn test_frame_from_step_validates() {
        let frame = ReplayFrame::from_step(0, &sample_step(), false);
        assert!(frame.validate().is_ok());
        assert_eq!(frame.events, vec![EventKind::Travel]);
        assert_eq!(frame.render_state.time_remaining, 1996.0);
        assert!(frame.info.is_none());

        let json = serde_json::to_string(&frame).unwrap();
        assert!(!json.contains("\"info\""));
        let parsed = ReplayFrame::from_json(&json).unwrap();
        assert_eq!(parsed, frame);
    }

    #[test]
    fn test_validation_rules() {
        let mut frame = ReplayFrame::from_step(3, &sample_step(), true);
        assert!(frame.info.is_some());

        frame.frame_index = -1;
        assert!(frame.validate().is_err());
        frame.frame_index = 3;

        frame.dt = 0;
        assert!(frame.validate().is_err());
        frame.dt = 1;

        frame.schema_version = 2;
        assert!(frame.validate().is_err());
    }
}
