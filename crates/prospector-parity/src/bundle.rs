//! Mismatch bundles: one JSON file per divergence

use std::path::{Path, PathBuf};

use prospector_core::{CoreConfig, ProspectorError, Result};
use serde::{Deserialize, Serialize};

use crate::harness::Divergence;

pub const BUNDLE_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MismatchBundle {
    pub version: u32,
    pub core_config: CoreConfig,
    pub divergence: Divergence,
}

impl MismatchBundle {
    pub fn new(divergence: Divergence) -> Self {
        Self {
            version: BUNDLE_VERSION,
            core_config: CoreConfig::with_time_max(divergence.case.time_max),
            divergence,
        }
    }

    pub fn file_name(&self) -> String {
        let d = &self.divergence;
        let step = d
            .step_index
            .map_or_else(|| format!("reset{}", d.episode), |i| format!("step{}", i));
        format!(
            "mismatch-{}-seed{}-t{}-{}.json",
            d.case.suite, d.case.seed, d.case.time_max, step
        )
    }

    /// Write into `dir`, creating it if needed
    pub fn write(&self, dir: impl AsRef<Path>) -> Result<PathBuf> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;
        let path = dir.join(self.file_name());
        std::fs::write(&path, serde_json::to_string_pretty(self)?)?;
        Ok(path)
    }

    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let bundle: MismatchBundle = serde_json::from_str(&text)?;
        if bundle.version != BUNDLE_VERSION {
            return Err(ProspectorError::SerializationError(format!(
                "unsupported bundle version {}",
                bundle.version
            )));
        }
        Ok(bundle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compare::FieldMismatch;
    use crate::harness::Case;
    use crate::suite::Suite;

    fn divergence() -> Divergence {
        Divergence {
            case: Case {
                suite: Suite::StationLoop,
                seed: 12,
                time_max: 600.0,
            },
            episode: 1,
            step_index: Some(31),
            mismatch: FieldMismatch {
                field: "observation[244]".to_string(),
                reference: "0.51".to_string(),
                native: "0.52".to_string(),
            },
            actions: vec![43, 61, 67, -3],
        }
    }

    #[test]
    fn test_written_bundle_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let bundle = MismatchBundle::new(divergence());
        let path = bundle.write(dir.path().join("bundles")).unwrap();

        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            "mismatch-station_loop-seed12-t600-step31.json"
        );
        let loaded = MismatchBundle::read(&path).unwrap();
        assert_eq!(loaded, bundle);
        assert_eq!(loaded.core_config.time_max, 600.0);
    }

    #[test]
    fn test_field_is_flattened() {
        let json = serde_json::to_value(MismatchBundle::new(divergence())).unwrap();
        assert_eq!(json["divergence"]["field"], "observation[244]");
        assert_eq!(json["divergence"]["case"]["suite"], "station_loop");
    }

    #[test]
    fn test_rejects_unknown_version() {
        let dir = tempfile::tempdir().unwrap();
        let mut bundle = MismatchBundle::new(divergence());
        bundle.version = 9;
        let path = bundle.write(dir.path()).unwrap();
        assert!(MismatchBundle::read(path).is_err());
    }
}
