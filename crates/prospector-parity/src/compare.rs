//! Field-by-field comparison of two step outcomes

use prospector_core::{Observation, ProspectorError, StepResult};
use serde::{Deserialize, Serialize};

use crate::config::ParityConfig;

/// First field on which the two sides disagree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldMismatch {
    pub field: String,
    pub reference: String,
    pub native: String,
}

impl FieldMismatch {
    fn new(field: impl Into<String>, reference: impl ToString, native: impl ToString) -> Self {
        Self {
            field: field.into(),
            reference: reference.to_string(),
            native: native.to_string(),
        }
    }
}

fn describe(outcome: &prospector_core::Result<StepResult>) -> String {
    match outcome {
        Ok(_) => "accepted".to_string(),
        Err(err) => format!("rejected: {}", err),
    }
}

fn same_rejection(a: &ProspectorError, b: &ProspectorError) -> bool {
    match (a, b) {
        (ProspectorError::InvalidAction(x), ProspectorError::InvalidAction(y)) => x == y,
        _ => a.code() == b.code(),
    }
}

pub fn compare_observations(
    config: &ParityConfig,
    field: &str,
    reference: &Observation,
    native: &Observation,
) -> Option<FieldMismatch> {
    reference
        .as_slice()
        .iter()
        .zip(native.as_slice())
        .position(|(r, n)| !config.observation.accepts(*r, *n))
        .map(|i| FieldMismatch::new(format!("{}[{}]", field, i), reference[i], native[i]))
}

/// Compare two outcomes of the same step
pub fn compare_outcomes(
    config: &ParityConfig,
    reference: &prospector_core::Result<StepResult>,
    native: &prospector_core::Result<StepResult>,
) -> Option<FieldMismatch> {
    match (reference, native) {
        (Ok(r), Ok(n)) => compare_steps(config, r, n),
        (Err(r), Err(n)) if same_rejection(r, n) => None,
        _ => Some(FieldMismatch::new(
            "outcome",
            describe(reference),
            describe(native),
        )),
    }
}

/// Compare two accepted steps
pub fn compare_steps(
    config: &ParityConfig,
    reference: &StepResult,
    native: &StepResult,
) -> Option<FieldMismatch> {
    let (ri, ni) = (&reference.info, &native.info);
    let exact = [
        ("terminated", reference.terminated, native.terminated),
        ("truncated", reference.truncated, native.truncated),
        ("invalid_action", ri.invalid_action, ni.invalid_action),
    ];
    for (field, r, n) in exact {
        if r != n {
            return Some(FieldMismatch::new(field, r, n));
        }
    }
    if ri.action != ni.action {
        return Some(FieldMismatch::new("action", ri.action, ni.action));
    }
    if ri.dt != ni.dt {
        return Some(FieldMismatch::new("dt", ri.dt, ni.dt));
    }
    if ri.t != ni.t {
        return Some(FieldMismatch::new("t", ri.t, ni.t));
    }
    if ri.end_reason != ni.end_reason {
        return Some(FieldMismatch::new(
            "end_reason",
            format!("{:?}", ri.end_reason),
            format!("{:?}", ni.end_reason),
        ));
    }
    if ri.node_context != ni.node_context {
        return Some(FieldMismatch::new(
            "node_context",
            format!("{:?}", ri.node_context),
            format!("{:?}", ni.node_context),
        ));
    }

    let kinds = |step: &StepResult| {
        step.events
            .iter()
            .map(|e| e.kind.name())
            .collect::<Vec<_>>()
            .join(",")
    };
    if reference.events.len() != native.events.len()
        || reference
            .events
            .iter()
            .zip(&native.events)
            .any(|(r, n)| r.kind != n.kind)
    {
        return Some(FieldMismatch::new("events", kinds(reference), kinds(native)));
    }
    for (i, (r, n)) in reference.events.iter().zip(&native.events).enumerate() {
        if !config.observation.accepts(r.value, n.value) {
            return Some(FieldMismatch::new(
                format!("events[{}].value", i),
                r.value,
                n.value,
            ));
        }
    }

    if !config.reward.accepts(reference.reward, native.reward) {
        return Some(FieldMismatch::new("reward", reference.reward, native.reward));
    }
    if let Some(mismatch) =
        compare_observations(config, "observation", &reference.observation, &native.observation)
    {
        return Some(mismatch);
    }

    ri.metrics
        .fields()
        .into_iter()
        .zip(ni.metrics.fields())
        .find(|((_, r), (_, n))| !config.info_accepts(*r, *n))
        .map(|((name, r), (_, n))| FieldMismatch::new(format!("info.{}", name), r, n))
}

#[cfg(test)]
mod tests {
    use super::*;
    use prospector_core::{CoreConfig, Environment, Event, EventKind};
    use prospector_reference::ReferenceEnv;

    fn sample_step() -> StepResult {
        let mut env = ReferenceEnv::new(CoreConfig::default()).unwrap();
        env.reset(3).unwrap();
        env.step(8).unwrap()
    }

    #[test]
    fn test_identical_steps_match() {
        let step = sample_step();
        assert!(compare_steps(&ParityConfig::default(), &step, &step).is_none());
    }

    #[test]
    fn test_reports_first_field() {
        let config = ParityConfig::default();
        let reference = sample_step();

        let mut native = reference.clone();
        native.truncated = !native.truncated;
        native.reward += 1.0;
        let mismatch = compare_steps(&config, &reference, &native).unwrap();
        assert_eq!(mismatch.field, "truncated");

        let mut native = reference.clone();
        native.events.push(Event::marker(EventKind::Terminated));
        assert_eq!(compare_steps(&config, &reference, &native).unwrap().field, "events");

        let mut values: Vec<f32> = reference.observation.clone().into();
        values[17] += 0.5;
        let mut native = reference.clone();
        native.observation = Observation::try_from(values).unwrap();
        assert_eq!(
            compare_steps(&config, &reference, &native).unwrap().field,
            "observation[17]"
        );
    }

    #[test]
    fn test_tiny_drift_is_tolerated() {
        let reference = sample_step();
        let mut native = reference.clone();
        native.reward += reference.reward.abs() * 1.0e-7;
        assert!(compare_steps(&ParityConfig::default(), &reference, &native).is_none());
    }

    #[test]
    fn test_rejections_must_agree() {
        let config = ParityConfig::default();
        let same = compare_outcomes(
            &config,
            &Err(ProspectorError::InvalidAction(-2)),
            &Err(ProspectorError::InvalidAction(-2)),
        );
        assert!(same.is_none());

        let differ = compare_outcomes(
            &config,
            &Err(ProspectorError::InvalidAction(-2)),
            &Err(ProspectorError::EpisodeEnded),
        )
        .unwrap();
        assert_eq!(differ.field, "outcome");

        let one_sided = compare_outcomes(&config, &Ok(sample_step()), &Err(ProspectorError::NotReset));
        assert!(one_sided.is_some());
    }
}
