//! Lockstep driver for one case

use prospector_binding::NativeModule;
use prospector_core::{
    CoreConfig, Environment, Observation, Result, StepResult, TrajectoryDigest,
};
use prospector_reference::ReferenceEnv;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::compare::{FieldMismatch, compare_observations, compare_outcomes};
use crate::config::ParityConfig;
use crate::suite::Suite;

/// Builds the two sides of a case
pub trait EnvFactory: Send + Sync {
    fn reference(&self, config: &CoreConfig) -> Result<Box<dyn Environment>>;
    fn native(&self, config: &CoreConfig) -> Result<Box<dyn Environment>>;
}

/// [`ReferenceEnv`] against a compiled core
#[derive(Debug, Clone)]
pub struct StandardFactory {
    module: NativeModule,
}

impl StandardFactory {
    pub fn new(module: NativeModule) -> Self {
        Self { module }
    }

    pub fn module(&self) -> &NativeModule {
        &self.module
    }
}

impl EnvFactory for StandardFactory {
    fn reference(&self, config: &CoreConfig) -> Result<Box<dyn Environment>> {
        Ok(Box::new(ReferenceEnv::new(*config)?))
    }

    fn native(&self, config: &CoreConfig) -> Result<Box<dyn Environment>> {
        Ok(Box::new(self.module.create_env(config)?))
    }
}

/// One seed of one suite under one time budget
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Case {
    pub suite: Suite,
    pub seed: u64,
    pub time_max: f32,
}

impl Case {
    fn core_config(&self) -> CoreConfig {
        CoreConfig::with_time_max(self.time_max)
    }
}

/// First disagreement in a case, with what is needed to reproduce it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Divergence {
    pub case: Case,

    /// Episodes completed before the diverging one; it was reset with
    /// `case.seed + episode`
    pub episode: u64,

    /// Step index within the case, `None` when the reset itself diverged
    pub step_index: Option<usize>,

    #[serde(flatten)]
    pub mismatch: FieldMismatch,

    /// Every action sent since the case started
    pub actions: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseReport {
    pub case: Case,
    pub steps: usize,
    pub episodes: u64,
    /// Steps both sides rejected
    pub rejections: u64,
    pub reference_digest: String,
    pub native_digest: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub divergence: Option<Divergence>,
}

impl CaseReport {
    pub fn passed(&self) -> bool {
        self.divergence.is_none()
    }
}

struct Side {
    env: Box<dyn Environment>,
    digest: TrajectoryDigest,
}

impl Side {
    fn new(env: Box<dyn Environment>) -> Self {
        Self {
            env,
            digest: TrajectoryDigest::new(),
        }
    }

    fn reset(&mut self, seed: u64) -> Result<Observation> {
        let obs = self.env.reset(seed)?;
        self.digest.record_reset(seed, &obs);
        Ok(obs)
    }

    fn step(&mut self, action: i64) -> Result<StepResult> {
        let outcome = self.env.step(action);
        match &outcome {
            Ok(step) => self.digest.record_step(step),
            Err(err) => self.digest.record_rejection(action, err.code()),
        }
        outcome
    }
}

/// Run `case` with the suite's policy for `config.steps` steps
pub fn run_case(factory: &dyn EnvFactory, config: &ParityConfig, case: Case) -> Result<CaseReport> {
    let mut policy = case.suite.policy(case.seed);
    drive(factory, config, case, config.steps, || policy.next_action())
}

/// Replay a recorded action list under `case`
pub fn replay_actions(
    factory: &dyn EnvFactory,
    config: &ParityConfig,
    case: Case,
    actions: &[i64],
) -> Result<CaseReport> {
    let mut iter = actions.iter().copied();
    drive(factory, config, case, actions.len(), || iter.next().unwrap_or(0))
}

fn drive(
    factory: &dyn EnvFactory,
    config: &ParityConfig,
    case: Case,
    steps: usize,
    mut next_action: impl FnMut() -> i64,
) -> Result<CaseReport> {
    let core = case.core_config();
    let mut reference = Side::new(factory.reference(&core)?);
    let mut native = Side::new(factory.native(&core)?);

    let mut actions = Vec::with_capacity(steps);
    let mut episode = 0u64;
    let mut rejections = 0u64;
    let mut taken = 0usize;
    let mut divergence = None;

    let diverged = |episode, step_index, mismatch, actions: &[i64]| Divergence {
        case,
        episode,
        step_index,
        mismatch,
        actions: actions.to_vec(),
    };

    let r = reference.reset(case.seed)?;
    let n = native.reset(case.seed)?;
    if let Some(m) = compare_observations(config, "reset_observation", &r, &n) {
        divergence = Some(diverged(episode, None, m, &actions));
    }

    while divergence.is_none() && taken < steps {
        let action = next_action();
        actions.push(action);
        let step_index = taken;
        taken += 1;

        let r = reference.step(action);
        let n = native.step(action);
        if let Some(m) = compare_outcomes(config, &r, &n) {
            divergence = Some(diverged(episode, Some(step_index), m, &actions));
            break;
        }

        match r {
            Err(_) => rejections += 1,
            Ok(step) if step.is_done() => {
                episode += 1;
                let seed = case.seed.wrapping_add(episode);
                let r = reference.reset(seed)?;
                let n = native.reset(seed)?;
                if let Some(m) = compare_observations(config, "reset_observation", &r, &n) {
                    divergence = Some(diverged(episode, None, m, &actions));
                }
            }
            Ok(_) => {}
        }
    }

    reference.env.close()?;
    native.env.close()?;

    if let Some(d) = &divergence {
        warn!(
            suite = %case.suite,
            seed = case.seed,
            time_max = case.time_max,
            step = ?d.step_index,
            field = %d.mismatch.field,
            reference = %d.mismatch.reference,
            native = %d.mismatch.native,
            "parity divergence"
        );
    } else {
        debug!(suite = %case.suite, seed = case.seed, steps = taken, episodes = episode, "case passed");
    }

    Ok(CaseReport {
        case,
        steps: taken,
        episodes: episode,
        rejections,
        reference_digest: reference.digest.finish(),
        native_digest: native.digest.finish(),
        divergence,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use prospector_core::{Backend, ProspectorError};

    pub(crate) fn linked_factory() -> StandardFactory {
        StandardFactory::new(NativeModule::linked(prospector_native::api()).unwrap())
    }

    /// Native side whose reward drifts once `after` steps have been taken,
    /// limited to one time budget when `only_time_max` is set
    pub(crate) struct DriftingFactory {
        pub(crate) inner: StandardFactory,
        pub(crate) after: usize,
        pub(crate) only_time_max: Option<f32>,
    }

    struct Drifting {
        env: Box<dyn Environment>,
        steps: usize,
        after: usize,
    }

    impl Environment for Drifting {
        fn backend(&self) -> Backend {
            self.env.backend()
        }

        fn reset(&mut self, seed: u64) -> Result<Observation> {
            self.env.reset(seed)
        }

        fn step(&mut self, action: i64) -> Result<StepResult> {
            let mut step = self.env.step(action)?;
            self.steps += 1;
            if self.steps > self.after {
                step.reward += 0.5;
            }
            Ok(step)
        }

        fn close(&mut self) -> Result<()> {
            self.env.close()
        }
    }

    impl EnvFactory for DriftingFactory {
        fn reference(&self, config: &CoreConfig) -> Result<Box<dyn Environment>> {
            self.inner.reference(config)
        }

        fn native(&self, config: &CoreConfig) -> Result<Box<dyn Environment>> {
            if self.only_time_max.is_some_and(|t| t != config.time_max) {
                return self.inner.native(config);
            }
            Ok(Box::new(Drifting {
                env: self.inner.native(config)?,
                steps: 0,
                after: self.after,
            }))
        }
    }

    fn quick_config(steps: usize) -> ParityConfig {
        ParityConfig {
            steps,
            ..ParityConfig::default()
        }
    }

    #[test]
    fn test_seed_42_always_zero() {
        let factory = linked_factory();
        let core = CoreConfig::default();
        let mut reference = factory.reference(&core).unwrap();
        let mut native = factory.native(&core).unwrap();
        reference.reset(42).unwrap();
        native.reset(42).unwrap();

        let config = ParityConfig::default();
        let mut episode = 0;
        let (mut last_r, mut last_n) = (None, None);
        for _ in 0..100 {
            let r = reference.step(0).unwrap();
            let n = native.step(0).unwrap();
            assert!(!r.events.is_empty());
            assert!(!n.events.is_empty());
            assert!(compare_outcomes(&config, &Ok(r.clone()), &Ok(n.clone())).is_none());
            if r.is_done() {
                episode += 1;
                reference.reset(42 + episode).unwrap();
                native.reset(42 + episode).unwrap();
            }
            last_r = Some(r);
            last_n = Some(n);
        }
        let (r, n) = (last_r.unwrap(), last_n.unwrap());
        assert!(compare_observations(&config, "observation", &r.observation, &n.observation).is_none());
    }

    #[test]
    fn test_every_suite_agrees() {
        let factory = linked_factory();
        let config = quick_config(400);
        for suite in Suite::ALL {
            for seed in 0..3 {
                for time_max in [20_000.0, 150.0] {
                    let case = Case { suite, seed, time_max };
                    let report = run_case(&factory, &config, case).unwrap();
                    assert!(report.passed(), "{:?}", report.divergence);
                    assert_eq!(report.steps, 400);
                }
            }
        }
    }

    #[test]
    fn test_large_seeds_agree() {
        let factory = linked_factory();
        let config = quick_config(400);
        let drawn = ParityConfig {
            seeds: 0,
            random_seeds: 2,
            ..ParityConfig::default()
        }
        .seed_list();
        // the last one wraps to zero between episodes
        let seeds = drawn.into_iter().chain([u64::MAX - 1]);
        for seed in seeds {
            assert!(seed > 1 << 40);
            for suite in [Suite::Random, Suite::FieldLoop] {
                let case = Case {
                    suite,
                    seed,
                    time_max: 150.0,
                };
                let report = run_case(&factory, &config, case).unwrap();
                assert!(report.passed(), "{:?}", report.divergence);
                assert!(report.episodes > 1);
            }
        }
    }

    #[test]
    fn test_adversarial_counts_rejections() {
        let factory = linked_factory();
        let case = Case {
            suite: Suite::Adversarial,
            seed: 7,
            time_max: 20_000.0,
        };
        let report = run_case(&factory, &quick_config(500), case).unwrap();
        assert!(report.passed());
        assert!(report.rejections > 0);
    }

    #[test]
    fn test_reruns_produce_identical_digests() {
        let factory = linked_factory();
        let case = Case {
            suite: Suite::Random,
            seed: 11,
            time_max: 600.0,
        };
        let a = run_case(&factory, &quick_config(300), case).unwrap();
        let b = run_case(&factory, &quick_config(300), case).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.reference_digest.len(), 64);
    }

    #[test]
    fn test_divergence_carries_reproduction_context() {
        let factory = DriftingFactory {
            inner: linked_factory(),
            after: 5,
            only_time_max: None,
        };
        let case = Case {
            suite: Suite::FieldLoop,
            seed: 3,
            time_max: 20_000.0,
        };
        let report = run_case(&factory, &quick_config(100), case).unwrap();
        let divergence = report.divergence.unwrap();
        assert_eq!(divergence.step_index, Some(5));
        assert_eq!(divergence.mismatch.field, "reward");
        assert_eq!(divergence.actions.len(), 6);
        assert_eq!(divergence.case, case);

        let replay = replay_actions(&factory, &quick_config(100), case, &divergence.actions).unwrap();
        assert_eq!(replay.divergence.map(|d| d.step_index), Some(Some(5)));
    }

    #[test]
    fn test_factory_errors_propagate() {
        let factory = linked_factory();
        let case = Case {
            suite: Suite::Random,
            seed: 0,
            time_max: -1.0,
        };
        assert!(matches!(
            run_case(&factory, &quick_config(10), case),
            Err(ProspectorError::InvalidConfig(_))
        ));
    }
}
