//! Harness configuration

use std::path::{Path, PathBuf};

use prospector_core::{ProspectorError, RandomStream, Result};
use serde::{Deserialize, Serialize};

use crate::suite::Suite;

/// Absolute plus relative tolerance: `|a - b| <= atol + rtol * |b|`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tolerance {
    pub atol: f32,
    pub rtol: f32,
}

impl Tolerance {
    pub const fn new(atol: f32, rtol: f32) -> Self {
        Self { atol, rtol }
    }

    /// `reference` is the scale the relative part applies to
    pub fn accepts(&self, reference: f32, native: f32) -> bool {
        if reference.to_bits() == native.to_bits() {
            return true;
        }
        if !reference.is_finite() || !native.is_finite() {
            return false;
        }
        (reference - native).abs() <= self.atol + self.rtol * reference.abs()
    }
}

impl Default for Tolerance {
    fn default() -> Self {
        Self::new(1.0e-6, 1.0e-5)
    }
}

/// Stream id for drawing extra seeds, apart from any environment or policy stream
const SEED_STREAM: u64 = 4057;

const DEFAULT_SEED_META: u64 = 0x5EED_0FA1_1ED5;

/// Lower bound of every drawn seed
pub const LARGE_SEED_FLOOR: u64 = 1 << 40;

/// Parity run settings
///
/// Every field has a default, so a JSON file only needs the overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParityConfig {
    /// Number of consecutive seeds per suite and budget
    pub seeds: u64,

    /// First seed; seeds run `seed_start..seed_start + seeds`
    pub seed_start: u64,

    /// Extra seeds at or above `2^40`, drawn from `seed_meta`
    pub random_seeds: u64,

    /// Seed of the stream the extra seeds are drawn from
    pub seed_meta: u64,

    /// Steps per case, spanning episodes
    pub steps: usize,

    pub suites: Vec<Suite>,

    /// Episode time budgets to run every suite under
    pub time_budgets: Vec<f32>,

    pub observation: Tolerance,

    pub reward: Tolerance,

    /// Numeric info fields match when within `info_scale * max(1, |a|, |b|)`
    pub info_scale: f32,

    /// Where mismatch bundles are written; none when unset
    pub bundle_dir: Option<PathBuf>,

    /// Stop scheduling cases after the first divergence
    pub stop_on_first: bool,

    /// Cases run concurrently; `0` means one per available core
    pub jobs: usize,
}

impl Default for ParityConfig {
    fn default() -> Self {
        Self {
            seeds: 20,
            seed_start: 0,
            random_seeds: 4,
            seed_meta: DEFAULT_SEED_META,
            steps: 1500,
            suites: Suite::ALL.to_vec(),
            time_budgets: vec![20_000.0, 600.0],
            observation: Tolerance::default(),
            reward: Tolerance::default(),
            info_scale: 1.0e-4,
            bundle_dir: None,
            stop_on_first: false,
            jobs: 0,
        }
    }
}

impl ParityConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: ParityConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.suites.is_empty() {
            return Err(ProspectorError::InvalidConfig("no suites selected".to_string()));
        }
        if let Some(budget) = self
            .time_budgets
            .iter()
            .find(|b| !b.is_finite() || **b <= 0.0)
        {
            return Err(ProspectorError::InvalidConfig(format!(
                "time budget must be positive, got {}",
                budget
            )));
        }
        if self.time_budgets.is_empty() {
            return Err(ProspectorError::InvalidConfig("no time budgets".to_string()));
        }
        if self.seeds == 0 && self.random_seeds == 0 {
            return Err(ProspectorError::InvalidConfig("no seeds selected".to_string()));
        }
        Ok(())
    }

    /// Every seed a suite runs under one budget: the consecutive range, then
    /// `random_seeds` large ones
    ///
    /// The drawn seeds depend only on `seed_meta`, so re-runs use the same
    /// list.
    pub fn seed_list(&self) -> Vec<u64> {
        let mut seeds: Vec<u64> = (0..self.seeds)
            .map(|offset| self.seed_start.wrapping_add(offset))
            .collect();
        let mut stream = RandomStream::with_stream(self.seed_meta, SEED_STREAM);
        for _ in 0..self.random_seeds {
            let high = u64::from(stream.next_u32());
            let low = u64::from(stream.next_u32());
            seeds.push((high << 32) | low | LARGE_SEED_FLOOR);
        }
        seeds
    }

    /// Concurrency actually used
    pub fn effective_jobs(&self) -> usize {
        if self.jobs > 0 {
            return self.jobs;
        }
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    }

    pub fn info_accepts(&self, reference: f32, native: f32) -> bool {
        if reference.to_bits() == native.to_bits() {
            return true;
        }
        let scale = 1.0f32.max(reference.abs()).max(native.abs());
        (reference - native).abs() <= self.info_scale * scale
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_tolerance() {
        let tol = Tolerance::default();
        assert!(tol.accepts(1.0, 1.0 + 5.0e-6));
        assert!(!tol.accepts(1.0, 1.001));
        assert!(tol.accepts(0.0, 5.0e-7));
        assert!(!tol.accepts(0.0, f32::NAN));
        assert!(tol.accepts(f32::INFINITY, f32::INFINITY));
    }

    #[test]
    fn test_info_scale_grows_with_magnitude() {
        let config = ParityConfig::default();
        assert!(config.info_accepts(10_000.0, 10_000.5));
        assert!(!config.info_accepts(0.0, 0.01));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"seeds": 3, "suites": ["random", "field_loop"]}}"#).unwrap();

        let config = ParityConfig::from_file(file.path()).unwrap();
        assert_eq!(config.seeds, 3);
        assert_eq!(config.suites, vec![Suite::Random, Suite::FieldLoop]);
        assert_eq!(config.steps, ParityConfig::default().steps);
    }

    #[test]
    fn test_seed_list_mixes_small_and_large() {
        let config = ParityConfig {
            seeds: 3,
            seed_start: 10,
            random_seeds: 5,
            ..ParityConfig::default()
        };
        let seeds = config.seed_list();
        assert_eq!(seeds.len(), 8);
        assert_eq!(seeds[..3], [10, 11, 12]);
        assert!(seeds[3..].iter().all(|s| *s >= LARGE_SEED_FLOOR));
        assert_eq!(seeds, config.seed_list());

        let other = ParityConfig {
            seed_meta: config.seed_meta + 1,
            ..config.clone()
        };
        assert_ne!(other.seed_list()[3..], seeds[3..]);
        assert_eq!(other.seed_list()[..3], seeds[..3]);
    }

    #[test]
    fn test_rejects_empty_selection() {
        let config = ParityConfig {
            suites: Vec::new(),
            ..ParityConfig::default()
        };
        assert!(config.validate().is_err());

        let config = ParityConfig {
            time_budgets: vec![-1.0],
            ..ParityConfig::default()
        };
        assert!(config.validate().is_err());

        let config = ParityConfig {
            seeds: 0,
            random_seeds: 0,
            ..ParityConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
