//! Prospector parity harness
//!
//! Runs the reference environment against the compiled core and exits
//! non-zero when any case diverges.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use prospector_binding::{NativeModule, default_library_path};
use prospector_parity::{
    EnvFactory, MismatchBundle, ParityConfig, ParityReport, StandardFactory, Suite, replay_actions,
    run_parity,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "prospector-parity", about = "Check the compiled core against the reference")]
struct Args {
    /// JSON config file; flags override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Compiled core to load; defaults to $PROSPECTOR_NATIVE_LIB or the build directory
    #[arg(long, conflicts_with = "linked")]
    native_library: Option<PathBuf>,

    /// Use the core linked into this binary instead of loading a library
    #[arg(long)]
    linked: bool,

    #[arg(long)]
    seeds: Option<u64>,

    #[arg(long)]
    seed_start: Option<u64>,

    /// Extra large seeds drawn from --seed-meta
    #[arg(long)]
    random_seeds: Option<u64>,

    #[arg(long)]
    seed_meta: Option<u64>,

    #[arg(long)]
    steps: Option<usize>,

    /// Comma-separated suite names
    #[arg(long, value_delimiter = ',')]
    suites: Vec<Suite>,

    /// Comma-separated episode time budgets
    #[arg(long, value_delimiter = ',')]
    time_budgets: Vec<f32>,

    #[arg(long)]
    jobs: Option<usize>,

    /// Directory for mismatch bundles
    #[arg(long)]
    bundle_dir: Option<PathBuf>,

    #[arg(long)]
    stop_on_first: bool,

    /// Exit zero even when cases diverge
    #[arg(long)]
    allow_mismatch: bool,

    /// Print the full report as JSON on stdout
    #[arg(long)]
    json: bool,

    /// Re-run the actions recorded in a mismatch bundle instead of the suites
    #[arg(long)]
    replay: Option<PathBuf>,
}

impl Args {
    fn parity_config(&self) -> Result<ParityConfig> {
        let mut config = match &self.config {
            Some(path) => ParityConfig::from_file(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => ParityConfig::default(),
        };
        if let Some(seeds) = self.seeds {
            config.seeds = seeds;
        }
        if let Some(seed_start) = self.seed_start {
            config.seed_start = seed_start;
        }
        if let Some(random_seeds) = self.random_seeds {
            config.random_seeds = random_seeds;
        }
        if let Some(seed_meta) = self.seed_meta {
            config.seed_meta = seed_meta;
        }
        if let Some(steps) = self.steps {
            config.steps = steps;
        }
        if !self.suites.is_empty() {
            config.suites = self.suites.clone();
        }
        if !self.time_budgets.is_empty() {
            config.time_budgets = self.time_budgets.clone();
        }
        if let Some(jobs) = self.jobs {
            config.jobs = jobs;
        }
        if self.bundle_dir.is_some() {
            config.bundle_dir = self.bundle_dir.clone();
        }
        config.stop_on_first |= self.stop_on_first;
        config.validate()?;
        Ok(config)
    }

    fn native_module(&self) -> Result<NativeModule> {
        if self.linked {
            return Ok(NativeModule::linked(prospector_native::api())?);
        }
        let path = self
            .native_library
            .clone()
            .unwrap_or_else(default_library_path);
        Ok(NativeModule::load(&path)?)
    }
}

fn print_summary(report: &ParityReport) {
    for divergence in report.divergences() {
        let case = &divergence.case;
        eprintln!(
            "DIVERGED {} seed={} time_max={} episode={} step={:?} field={} reference={} native={}",
            case.suite,
            case.seed,
            case.time_max,
            divergence.episode,
            divergence.step_index,
            divergence.mismatch.field,
            divergence.mismatch.reference,
            divergence.mismatch.native,
        );
    }
    let diverged = report.divergences().count();
    eprintln!(
        "{} cases, {} steps, {} diverged, {} skipped",
        report.cases.len(),
        report.total_steps(),
        diverged,
        report.skipped
    );
}

fn replay(factory: &dyn EnvFactory, config: &ParityConfig, path: &Path) -> Result<bool> {
    let bundle = MismatchBundle::read(path).with_context(|| format!("reading {}", path.display()))?;
    let divergence = &bundle.divergence;
    info!(
        suite = %divergence.case.suite,
        seed = divergence.case.seed,
        actions = divergence.actions.len(),
        "replaying bundle"
    );
    let report = replay_actions(factory, config, divergence.case, &divergence.actions)?;
    match &report.divergence {
        Some(again) => {
            warn!(field = %again.mismatch.field, step = ?again.step_index, "divergence reproduced");
            Ok(false)
        }
        None => {
            info!("bundle no longer diverges");
            Ok(true)
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = args.parity_config()?;
    let factory = StandardFactory::new(args.native_module()?);

    if let Some(path) = &args.replay {
        let passed = replay(&factory, &config, path)?;
        if !passed && !args.allow_mismatch {
            bail!("bundle {} still diverges", path.display());
        }
        return Ok(());
    }

    let factory: Arc<dyn EnvFactory> = Arc::new(factory);
    let report = run_parity(factory, config).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    print_summary(&report);

    if !report.passed() && !args.allow_mismatch {
        bail!("{} case(s) diverged", report.divergences().count());
    }
    Ok(())
}
