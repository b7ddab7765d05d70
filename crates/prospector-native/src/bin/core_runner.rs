//! Prospector core runner
//!
//! Drives the compiled core directly (no dynamic loading) and writes one
//! replay frame per step as JSON lines. Actions come from a raw byte file
//! (one action per byte) or from a seeded uniform policy.

use anyhow::{Context, Result, bail};
use clap::Parser;
use prospector_core::abi::{AbpStatus, AbpStepResult};
use prospector_core::constants::{N_ACTIONS, OBS_DIM};
use prospector_core::{CoreConfig, RandomStream, ReplayFrame};
use prospector_native::NativeCore;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "prospector-core-runner", about = "Run the compiled Prospector core")]
struct Args {
    /// Environment seed; episode `i` uses `seed + i`
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Raw action file, one byte per action
    #[arg(long, conflicts_with = "random")]
    actions: Option<PathBuf>,

    /// Number of uniformly random actions to play
    #[arg(long)]
    random: Option<usize>,

    /// Seed for the random policy
    #[arg(long, default_value_t = 1)]
    policy_seed: u64,

    /// Episode time budget in ticks
    #[arg(long)]
    time_max: Option<f32>,

    /// Include the full step info in every frame
    #[arg(long)]
    info: bool,

    /// Output file; stdout when omitted
    #[arg(long)]
    out: Option<PathBuf>,
}

fn load_actions(args: &Args) -> Result<Vec<i32>> {
    if let Some(path) = &args.actions {
        let bytes =
            std::fs::read(path).with_context(|| format!("reading actions from {}", path.display()))?;
        return Ok(bytes.into_iter().map(i32::from).collect());
    }
    if let Some(count) = args.random {
        let mut policy = RandomStream::new(args.policy_seed);
        return Ok((0..count)
            .map(|_| policy.next_int(N_ACTIONS as u32) as i32)
            .collect());
    }
    bail!("either --actions or --random is required");
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let actions = load_actions(&args)?;

    let mut config = CoreConfig::default();
    if let Some(time_max) = args.time_max {
        config.time_max = time_max;
    }
    let mut core = NativeCore::new(&config)?;

    let mut writer: Box<dyn Write> = match &args.out {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("creating {}", path.display()))?,
        )),
        None => Box::new(BufWriter::new(std::io::stdout().lock())),
    };

    info!(seed = args.seed, steps = actions.len(), "running core");

    let mut obs = [0.0f32; OBS_DIM];
    let mut out = AbpStepResult::zeroed_boxed();
    let mut episode = 0u64;
    core.reset(args.seed, &mut obs);

    for (frame_index, &action) in actions.iter().enumerate() {
        if core.episode_over() {
            episode += 1;
            debug!(episode, "auto-reset");
            core.reset(args.seed + episode, &mut obs);
        }
        match core.step(action, &mut out) {
            AbpStatus::Ok => {}
            status => bail!("step {} rejected action {}: {:?}", frame_index, action, status),
        }
        let step = out.to_step_result()?;
        let frame = ReplayFrame::from_step(frame_index as i64, &step, args.info);
        serde_json::to_writer(&mut writer, &frame)?;
        writer.write_all(b"\n")?;
    }

    writer.flush()?;
    info!(episodes = episode + 1, "done");
    Ok(())
}
