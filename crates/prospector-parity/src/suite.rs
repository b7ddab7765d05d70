//! Action suites the harness drives both sides with

use std::fmt;
use std::str::FromStr;

use prospector_core::constants::{MAX_ACTION, N_ACTIONS};
use prospector_core::{ProspectorError, RandomStream};
use serde::{Deserialize, Serialize};

/// Stream id of policy generators, distinct from the environment stream
const POLICY_STREAM: u64 = 1013;

/// Offset between a case seed and its policy seed
const POLICY_SEED_OFFSET: u64 = 1000;

/// Out-of-range margin on each side of the action space
const ADVERSARIAL_MARGIN: u32 = 5;

/// Buy, dock, sell and overhaul mixed with junk values
const STATION_LOOP: [i64; 16] = [43, 61, 67, 28, 29, 30, 10, 9, 7, 33, 200, -3, 255, 6, 42, 68];

/// Travel, scan, mine and manage heat out in the field
const FIELD_LOOP: [i64; 14] = [8, 11, 12, 29, 33, 6, 0, 42, 45, 32, 35, 7, 6, 68];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Suite {
    Random,
    Adversarial,
    AlwaysZero,
    AlwaysMax,
    Alternating,
    StationLoop,
    FieldLoop,
}

impl Suite {
    pub const ALL: [Suite; 7] = [
        Suite::Random,
        Suite::Adversarial,
        Suite::AlwaysZero,
        Suite::AlwaysMax,
        Suite::Alternating,
        Suite::StationLoop,
        Suite::FieldLoop,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Suite::Random => "random",
            Suite::Adversarial => "adversarial",
            Suite::AlwaysZero => "always_zero",
            Suite::AlwaysMax => "always_max",
            Suite::Alternating => "alternating",
            Suite::StationLoop => "station_loop",
            Suite::FieldLoop => "field_loop",
        }
    }

    /// Action source for one case
    pub fn policy(self, seed: u64) -> ActionPolicy {
        let rng = match self {
            Suite::Random | Suite::Adversarial => Some(RandomStream::with_stream(
                seed.wrapping_add(POLICY_SEED_OFFSET),
                POLICY_STREAM,
            )),
            _ => None,
        };
        ActionPolicy {
            suite: self,
            rng,
            cursor: 0,
        }
    }
}

impl fmt::Display for Suite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Suite {
    type Err = ProspectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Suite::ALL
            .into_iter()
            .find(|suite| suite.name() == s)
            .ok_or_else(|| ProspectorError::InvalidConfig(format!("unknown suite: {}", s)))
    }
}

/// Deterministic action generator
///
/// The sequence depends only on the suite, the case seed and how many actions
/// were drawn, never on what the environments returned.
#[derive(Debug, Clone)]
pub struct ActionPolicy {
    suite: Suite,
    rng: Option<RandomStream>,
    cursor: usize,
}

impl ActionPolicy {
    pub fn next_action(&mut self) -> i64 {
        let index = self.cursor;
        self.cursor += 1;
        match (self.suite, self.rng.as_mut()) {
            (Suite::Random, Some(rng)) => i64::from(rng.range(0, N_ACTIONS as u32)),
            (Suite::Adversarial, Some(rng)) => {
                let span = N_ACTIONS as u32 + 2 * ADVERSARIAL_MARGIN;
                i64::from(rng.range(0, span)) - i64::from(ADVERSARIAL_MARGIN)
            }
            (Suite::AlwaysMax, _) => i64::from(MAX_ACTION),
            (Suite::Alternating, _) => {
                if index % 2 == 0 {
                    0
                } else {
                    i64::from(MAX_ACTION)
                }
            }
            (Suite::StationLoop, _) => STATION_LOOP[index % STATION_LOOP.len()],
            (Suite::FieldLoop, _) => FIELD_LOOP[index % FIELD_LOOP.len()],
            _ => 0,
        }
    }
}
