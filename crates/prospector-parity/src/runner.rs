//! Parallel execution of every case in a [`ParityConfig`]

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use prospector_core::Result;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, info, warn};

use crate::bundle::MismatchBundle;
use crate::config::ParityConfig;
use crate::harness::{Case, CaseReport, Divergence, EnvFactory, run_case};

/// Outcome of a full run, cases in plan order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParityReport {
    pub cases: Vec<CaseReport>,
    /// Planned cases left out of the report because the run stopped early
    pub skipped: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bundles: Vec<PathBuf>,
}

impl ParityReport {
    pub fn passed(&self) -> bool {
        self.cases.iter().all(CaseReport::passed)
    }

    pub fn divergences(&self) -> impl Iterator<Item = &Divergence> {
        self.cases.iter().filter_map(|c| c.divergence.as_ref())
    }

    pub fn total_steps(&self) -> usize {
        self.cases.iter().map(|c| c.steps).sum()
    }
}

/// Every case in run order: suite, then time budget, then seed
pub fn plan_cases(config: &ParityConfig) -> Vec<Case> {
    let seeds = config.seed_list();
    let mut cases = Vec::new();
    for &suite in &config.suites {
        for &time_max in &config.time_budgets {
            for &seed in &seeds {
                cases.push(Case {
                    suite,
                    seed,
                    time_max,
                });
            }
        }
    }
    cases
}

/// Re-raise a case panic on the caller; cancelled tasks are dropped
fn rethrow(err: JoinError) {
    if err.is_panic() {
        std::panic::resume_unwind(err.into_panic());
    }
}

/// Run one case on the blocking pool; `None` when the task was cancelled
async fn run_blocking(
    factory: Arc<dyn EnvFactory>,
    config: Arc<ParityConfig>,
    case: Case,
) -> Result<Option<CaseReport>> {
    debug!(suite = %case.suite, seed = case.seed, time_max = case.time_max, "case started");
    match tokio::task::spawn_blocking(move || run_case(factory.as_ref(), &config, case)).await {
        Ok(report) => report.map(Some),
        Err(err) => {
            rethrow(err);
            Ok(None)
        }
    }
}

/// Run all planned cases, at most `config.effective_jobs()` at a time
///
/// Each case runs on the blocking pool. Reports come back in plan order
/// whatever order the cases finish in. With `stop_on_first` the report is
/// the plan up to and including the first failing case: cases halted ahead
/// of it are run afterwards, and anything after it is dropped.
pub async fn run_parity(factory: Arc<dyn EnvFactory>, config: ParityConfig) -> Result<ParityReport> {
    config.validate()?;
    let cases = plan_cases(&config);
    let planned = cases.len();
    let jobs = config.effective_jobs();
    info!(cases = planned, jobs, "starting parity run");

    let config = Arc::new(config);
    let semaphore = Arc::new(Semaphore::new(jobs));
    let halted = Arc::new(AtomicBool::new(false));
    let mut tasks = JoinSet::new();

    for (order, &case) in cases.iter().enumerate() {
        let factory = Arc::clone(&factory);
        let config = Arc::clone(&config);
        let semaphore = Arc::clone(&semaphore);
        let halted = Arc::clone(&halted);

        tasks.spawn(async move {
            let Ok(_permit) = semaphore.acquire_owned().await else {
                return Ok((order, None));
            };
            if halted.load(Ordering::Acquire) {
                return Ok((order, None));
            }
            let stop_on_first = config.stop_on_first;
            let report = run_blocking(factory, config, case).await?;
            if stop_on_first && report.as_ref().is_some_and(|r| !r.passed()) {
                halted.store(true, Ordering::Release);
            }
            Ok::<_, prospector_core::ProspectorError>((order, report))
        });
    }

    let mut finished = Vec::with_capacity(planned);
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(outcome) => finished.push(outcome?),
            Err(err) => rethrow(err),
        }
    }
    finished.sort_by_key(|(order, _)| *order);

    let mut reports = Vec::with_capacity(planned);
    for (order, slot) in finished {
        let report = match slot {
            Some(report) => report,
            None if config.stop_on_first => {
                debug!(order, "running case halted ahead of the first failure");
                let rerun =
                    run_blocking(Arc::clone(&factory), Arc::clone(&config), cases[order]).await?;
                match rerun {
                    Some(report) => report,
                    None => break,
                }
            }
            None => continue,
        };
        let failed = !report.passed();
        reports.push(report);
        if config.stop_on_first && failed {
            break;
        }
    }

    let mut bundles = Vec::new();
    if let Some(dir) = &config.bundle_dir {
        for divergence in reports.iter().filter_map(|r| r.divergence.clone()) {
            let path = MismatchBundle::new(divergence).write(dir)?;
            warn!(path = %path.display(), "mismatch bundle written");
            bundles.push(path);
        }
    }

    let report = ParityReport {
        skipped: planned - reports.len(),
        cases: reports,
        bundles,
    };
    info!(
        cases = report.cases.len(),
        skipped = report.skipped,
        steps = report.total_steps(),
        divergences = report.divergences().count(),
        "parity run finished"
    );
    Ok(report)
}
