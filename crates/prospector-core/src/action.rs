//! Action types
//!
//! Actions are plain integers on the wire. [`Action`] is the validated form:
//! constructing one is the only place the `0..=68` range is checked, and
//! [`Action::kind`] decodes it into the gameplay meaning.

use serde::{Deserialize, Serialize};

use crate::constants::{MAX_ACTION, N_ACTIONS};
use crate::error::{ProspectorError, Result};

/// A validated action index in `0..=68`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Action(u8);

impl Action {
    pub const TRAVEL_FIRST: Action = Action(0);
    pub const HOLD: Action = Action(6);
    pub const END_EPISODE: Action = Action(MAX_ACTION);

    /// Validate a raw action value
    pub fn new(raw: i64) -> Result<Self> {
        if (0..N_ACTIONS as i64).contains(&raw) {
            Ok(Action(raw as u8))
        } else {
            Err(ProspectorError::InvalidAction(raw))
        }
    }

    pub fn index(self) -> u8 {
        self.0
    }

    /// Every valid action in index order
    pub fn all() -> impl Iterator<Item = Action> {
        (0..N_ACTIONS as u8).map(Action)
    }

    pub fn kind(self) -> ActionKind {
        let a = self.0;
        match a {
            0..=5 => ActionKind::Travel { slot: a as usize },
            6 => ActionKind::Hold,
            7 => ActionKind::EmergencyBurn,
            8 => ActionKind::Scan(ScanMode::Wide),
            9 => ActionKind::Scan(ScanMode::Focused),
            10 => ActionKind::Scan(ScanMode::Deep),
            11 => ActionKind::ThreatListen,
            12..=27 => ActionKind::SelectAsteroid {
                index: (a - 12) as usize,
            },
            28 => ActionKind::Mine(MiningMode::Conservative),
            29 => ActionKind::Mine(MiningMode::Standard),
            30 => ActionKind::Mine(MiningMode::Aggressive),
            31 => ActionKind::Stabilize,
            32 => ActionKind::Refine,
            33 => ActionKind::Cooldown,
            34 => ActionKind::ToolRepair,
            35 => ActionKind::HullPatch,
            36..=41 => ActionKind::Jettison {
                commodity: (a - 36) as usize,
            },
            42 => ActionKind::Dock,
            43..=60 => {
                let offset = a - 43;
                let fraction = match offset % 3 {
                    0 => SellFraction::Quarter,
                    1 => SellFraction::Half,
                    _ => SellFraction::All,
                };
                ActionKind::Sell {
                    commodity: (offset / 3) as usize,
                    fraction,
                }
            }
            61 => ActionKind::BuyFuel(FuelPack::Small),
            62 => ActionKind::BuyFuel(FuelPack::Medium),
            63 => ActionKind::BuyFuel(FuelPack::Large),
            64 => ActionKind::BuySupply(Supply::RepairKit),
            65 => ActionKind::BuySupply(Supply::Stabilizer),
            66 => ActionKind::BuySupply(Supply::Decoy),
            67 => ActionKind::Overhaul,
            _ => ActionKind::EndEpisode,
        }
    }

    pub fn is_scan(self) -> bool {
        matches!(self.kind(), ActionKind::Scan(_))
    }
}

impl TryFrom<i64> for Action {
    type Error = ProspectorError;

    fn try_from(raw: i64) -> Result<Self> {
        Action::new(raw)
    }
}

impl From<Action> for i64 {
    fn from(action: Action) -> Self {
        action.0 as i64
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.0, self.kind().name())
    }
}

/// Decoded gameplay meaning of an action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Travel { slot: usize },
    Hold,
    EmergencyBurn,
    Scan(ScanMode),
    ThreatListen,
    SelectAsteroid { index: usize },
    Mine(MiningMode),
    Stabilize,
    Refine,
    Cooldown,
    ToolRepair,
    HullPatch,
    Jettison { commodity: usize },
    Dock,
    Sell { commodity: usize, fraction: SellFraction },
    BuyFuel(FuelPack),
    BuySupply(Supply),
    Overhaul,
    EndEpisode,
}

impl ActionKind {
    pub fn name(&self) -> &'static str {
        match self {
            ActionKind::Travel { .. } => "travel",
            ActionKind::Hold => "hold",
            ActionKind::EmergencyBurn => "emergency_burn",
            ActionKind::Scan(ScanMode::Wide) => "wide_scan",
            ActionKind::Scan(ScanMode::Focused) => "focused_scan",
            ActionKind::Scan(ScanMode::Deep) => "deep_scan",
            ActionKind::ThreatListen => "threat_listen",
            ActionKind::SelectAsteroid { .. } => "select_asteroid",
            ActionKind::Mine(MiningMode::Conservative) => "mine_conservative",
            ActionKind::Mine(MiningMode::Standard) => "mine_standard",
            ActionKind::Mine(MiningMode::Aggressive) => "mine_aggressive",
            ActionKind::Stabilize => "stabilize",
            ActionKind::Refine => "refine",
            ActionKind::Cooldown => "cooldown",
            ActionKind::ToolRepair => "tool_repair",
            ActionKind::HullPatch => "hull_patch",
            ActionKind::Jettison { .. } => "jettison",
            ActionKind::Dock => "dock",
            ActionKind::Sell { .. } => "sell",
            ActionKind::BuyFuel(_) => "buy_fuel",
            ActionKind::BuySupply(_) => "buy_supply",
            ActionKind::Overhaul => "overhaul",
            ActionKind::EndEpisode => "end_episode",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanMode {
    Wide,
    Focused,
    Deep,
}

impl ScanMode {
    /// Numeric mode carried as the scan event payload
    pub fn code(self) -> u8 {
        match self {
            ScanMode::Wide => 0,
            ScanMode::Focused => 1,
            ScanMode::Deep => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MiningMode {
    Conservative,
    Standard,
    Aggressive,
}

/// Share of held cargo sold by a sell action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SellFraction {
    Quarter,
    Half,
    All,
}

impl SellFraction {
    pub fn value(self) -> f32 {
        match self {
            SellFraction::Quarter => 0.25,
            SellFraction::Half => 0.50,
            SellFraction::All => 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FuelPack {
    Small,
    Medium,
    Large,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Supply {
    RepairKit,
    Stabilizer,
    Decoy,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_is_enforced() {
        assert!(Action::new(0).is_ok());
        assert!(Action::new(68).is_ok());
        assert!(matches!(
            Action::new(-1),
            Err(ProspectorError::InvalidAction(-1))
        ));
        assert!(matches!(
            Action::new(69),
            Err(ProspectorError::InvalidAction(69))
        ));
        assert_eq!(Action::all().count(), N_ACTIONS);
    }

    #[test]
    fn test_decoding() {
        let decode = |raw: i64| Action::new(raw).unwrap().kind();
        assert_eq!(decode(5), ActionKind::Travel { slot: 5 });
        assert_eq!(decode(27), ActionKind::SelectAsteroid { index: 15 });
        assert_eq!(decode(41), ActionKind::Jettison { commodity: 5 });
        assert_eq!(
            decode(43),
            ActionKind::Sell {
                commodity: 0,
                fraction: SellFraction::Quarter
            }
        );
        assert_eq!(
            decode(60),
            ActionKind::Sell {
                commodity: 5,
                fraction: SellFraction::All
            }
        );
        assert_eq!(decode(66), ActionKind::BuySupply(Supply::Decoy));
        assert_eq!(decode(68), ActionKind::EndEpisode);
        assert!(Action::new(10).unwrap().is_scan());
        assert!(!Action::new(11).unwrap().is_scan());
    }

    #[test]
    fn test_serde_rejects_out_of_range() {
        let action: Action = serde_json::from_str("42").unwrap();
        assert_eq!(action.index(), 42);
        assert_eq!(serde_json::to_string(&action).unwrap(), "42");
        assert!(serde_json::from_str::<Action>("69").is_err());
    }
}
