//! Events emitted during a step
//!
//! Events are recorded in the order they happen inside a step. Each kind has
//! a stable numeric code so the native core can report it through a flat
//! buffer.

use serde::{Deserialize, Serialize};

/// Kind of in-episode event
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Arrived at a neighbour (value: destination node)
    Travel = 1,
    EmergencyBurn = 2,
    /// Asteroid estimates refreshed (value: scan mode 0/1/2)
    Scan = 3,
    ThreatListen = 4,
    /// value: asteroid index
    AsteroidSelected = 5,
    /// value: units extracted
    Mined = 6,
    /// value: hull damage taken
    Fracture = 7,
    /// value: asteroid index
    Stabilized = 8,
    /// value: units produced
    Refined = 9,
    Cooldown = 10,
    ToolRepaired = 11,
    HullPatched = 12,
    /// value: units dumped
    Jettisoned = 13,
    Docked = 14,
    /// value: credits gained
    Sold = 15,
    /// value: credits spent
    Purchased = 16,
    /// value: credits spent
    Overhauled = 17,
    /// In-game invalid action resolved as a hold (value: requested action)
    InvalidAction = 18,
    DecoyDeployed = 19,
    /// value: cargo value lost
    PirateEncounter = 20,
    /// value: heat above the cap before it was clipped
    Overheat = 21,
    Destroyed = 22,
    Stranded = 23,
    Terminated = 24,
    Truncated = 25,
}

impl EventKind {
    pub fn code(self) -> u32 {
        self as u32
    }

    pub fn from_code(code: u32) -> Option<Self> {
        let kind = match code {
            1 => EventKind::Travel,
            2 => EventKind::EmergencyBurn,
            3 => EventKind::Scan,
            4 => EventKind::ThreatListen,
            5 => EventKind::AsteroidSelected,
            6 => EventKind::Mined,
            7 => EventKind::Fracture,
            8 => EventKind::Stabilized,
            9 => EventKind::Refined,
            10 => EventKind::Cooldown,
            11 => EventKind::ToolRepaired,
            12 => EventKind::HullPatched,
            13 => EventKind::Jettisoned,
            14 => EventKind::Docked,
            15 => EventKind::Sold,
            16 => EventKind::Purchased,
            17 => EventKind::Overhauled,
            18 => EventKind::InvalidAction,
            19 => EventKind::DecoyDeployed,
            20 => EventKind::PirateEncounter,
            21 => EventKind::Overheat,
            22 => EventKind::Destroyed,
            23 => EventKind::Stranded,
            24 => EventKind::Terminated,
            25 => EventKind::Truncated,
            _ => return None,
        };
        Some(kind)
    }

    pub fn name(self) -> &'static str {
        match self {
            EventKind::Travel => "travel",
            EventKind::EmergencyBurn => "emergency_burn",
            EventKind::Scan => "scan",
            EventKind::ThreatListen => "threat_listen",
            EventKind::AsteroidSelected => "asteroid_selected",
            EventKind::Mined => "mined",
            EventKind::Fracture => "fracture",
            EventKind::Stabilized => "stabilized",
            EventKind::Refined => "refined",
            EventKind::Cooldown => "cooldown",
            EventKind::ToolRepaired => "tool_repaired",
            EventKind::HullPatched => "hull_patched",
            EventKind::Jettisoned => "jettisoned",
            EventKind::Docked => "docked",
            EventKind::Sold => "sold",
            EventKind::Purchased => "purchased",
            EventKind::Overhauled => "overhauled",
            EventKind::InvalidAction => "invalid_action",
            EventKind::DecoyDeployed => "decoy_deployed",
            EventKind::PirateEncounter => "pirate_encounter",
            EventKind::Overheat => "overheat",
            EventKind::Destroyed => "destroyed",
            EventKind::Stranded => "stranded",
            EventKind::Terminated => "terminated",
            EventKind::Truncated => "truncated",
        }
    }
}

/// A single event record
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub kind: EventKind,

    /// Kind-specific payload, zero when the kind carries none
    #[serde(default)]
    pub value: f32,
}

impl Event {
    pub fn new(kind: EventKind, value: f32) -> Self {
        Self { kind, value }
    }

    pub fn marker(kind: EventKind) -> Self {
        Self { kind, value: 0.0 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_round_trip() {
        for code in 1..=25 {
            let kind = EventKind::from_code(code).expect("known code");
            assert_eq!(kind.code(), code);
        }
        assert_eq!(EventKind::from_code(0), None);
        assert_eq!(EventKind::from_code(26), None);
    }

    #[test]
    fn test_serde_names_match() {
        let event = Event::new(EventKind::PirateEncounter, 12.5);
        let json = serde_json::to_value(event).unwrap();
        assert_eq!(json["kind"], EventKind::PirateEncounter.name());
        assert_eq!(json["value"], 12.5);
    }
}
