//! Cross-source match identifiers
//!
//! The live queue source, the results source and the prediction source all
//! name the same match differently:
//!
//! - live queue: free-text labels such as `"Qualification 12"`, `"Playoff 3"`,
//!   `"Final 2"`
//! - results: keys such as `2025dal_qm12`, `2025dal_sf3m1`, `2025dal_f1m2`
//! - prediction: the results-source key
//!
//! Every grammar is parsed into [`MatchId`] and rendered back out from it, so
//! a naming change in one source only touches its parser. A label that does
//! not parse yields `None`; callers treat that as "no prediction available".

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

/// Competition level of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompLevel {
    Qualification,
    /// Double-elimination playoff round; one match per set
    Playoff,
    Final,
}

impl CompLevel {
    fn results_code(&self) -> &'static str {
        match self {
            CompLevel::Qualification => "qm",
            CompLevel::Playoff => "sf",
            CompLevel::Final => "f",
        }
    }

    fn from_results_code(code: &str) -> Option<Self> {
        match code {
            "qm" => Some(CompLevel::Qualification),
            "sf" => Some(CompLevel::Playoff),
            "f" => Some(CompLevel::Final),
            _ => None,
        }
    }
}

/// Canonical, source-independent identity of a match within one event.
///
/// `set` and `number` follow the results-source convention: a qualification
/// is set 1 match N, a playoff is set N match 1 (replays aside), a final is
/// set 1 match N.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MatchId {
    pub level: CompLevel,
    pub set: u32,
    pub number: u32,
}

fn live_label_re() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^\s*(qualification|playoff|final)\s+(\d+)\s*$").ok())
        .as_ref()
}

fn results_key_re() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([0-9a-z]+)_(qm|sf|f)(\d+)(?:m(\d+))?$").ok())
        .as_ref()
}

impl MatchId {
    pub fn qualification(number: u32) -> Self {
        Self {
            level: CompLevel::Qualification,
            set: 1,
            number,
        }
    }

    pub fn playoff(set: u32) -> Self {
        Self {
            level: CompLevel::Playoff,
            set,
            number: 1,
        }
    }

    pub fn final_match(number: u32) -> Self {
        Self {
            level: CompLevel::Final,
            set: 1,
            number,
        }
    }

    /// Parse a live queue label like `"Qualification 12"`.
    pub fn from_live_label(label: &str) -> Option<Self> {
        let caps = live_label_re()?.captures(label)?;
        let n: u32 = caps.get(2)?.as_str().parse().ok()?;
        match caps.get(1)?.as_str().to_lowercase().as_str() {
            "qualification" => Some(Self::qualification(n)),
            "playoff" => Some(Self::playoff(n)),
            "final" => Some(Self::final_match(n)),
            _ => None,
        }
    }

    /// Parse a results-source key like `2025dal_sf3m1`, returning the event
    /// key alongside the id.
    pub fn from_results_key(key: &str) -> Option<(String, Self)> {
        let caps = results_key_re()?.captures(key)?;
        let event = caps.get(1)?.as_str().to_string();
        let level = CompLevel::from_results_code(caps.get(2)?.as_str())?;
        let first: u32 = caps.get(3)?.as_str().parse().ok()?;
        let second: Option<u32> = match caps.get(4) {
            Some(m) => Some(m.as_str().parse().ok()?),
            None => None,
        };

        let id = match (level, second) {
            (CompLevel::Qualification, None) => Self::qualification(first),
            (CompLevel::Playoff, Some(m)) | (CompLevel::Final, Some(m)) => Self {
                level,
                set: first,
                number: m,
            },
            _ => return None,
        };
        Some((event, id))
    }

    /// Build from the structured fields of a results-source match record.
    pub fn from_results_fields(comp_level: &str, set_number: u32, match_number: u32) -> Option<Self> {
        let level = CompLevel::from_results_code(comp_level)?;
        Some(Self {
            level,
            set: if level == CompLevel::Qualification { 1 } else { set_number },
            number: match_number,
        })
    }

    /// Key on the results source for this match at `event_key`.
    pub fn results_key(&self, event_key: &str) -> String {
        match self.level {
            CompLevel::Qualification => format!("{}_qm{}", event_key, self.number),
            _ => format!(
                "{}_{}{}m{}",
                event_key,
                self.level.results_code(),
                self.set,
                self.number
            ),
        }
    }

    /// Key the prediction source is looked up by. It reuses results keys.
    pub fn prediction_key(&self, event_key: &str) -> String {
        self.results_key(event_key)
    }

    /// Human label in the live queue grammar.
    pub fn label(&self) -> String {
        match self.level {
            CompLevel::Qualification => format!("Qualification {}", self.number),
            CompLevel::Playoff => format!("Playoff {}", self.set),
            CompLevel::Final => format!("Final {}", self.number),
        }
    }
}

impl fmt::Display for MatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_live_labels() {
        assert_eq!(
            MatchId::from_live_label("Qualification 12"),
            Some(MatchId::qualification(12))
        );
        assert_eq!(MatchId::from_live_label("Playoff 3"), Some(MatchId::playoff(3)));
        assert_eq!(MatchId::from_live_label("final 2"), Some(MatchId::final_match(2)));
        assert_eq!(MatchId::from_live_label("Practice 4"), None);
        assert_eq!(MatchId::from_live_label("Qualification"), None);
        assert_eq!(MatchId::from_live_label(""), None);
    }

    #[test]
    fn test_results_keys_from_live_labels() {
        let event = "2025dal";
        let key = |label: &str| MatchId::from_live_label(label).map(|id| id.results_key(event));
        assert_eq!(key("Qualification 12").as_deref(), Some("2025dal_qm12"));
        assert_eq!(key("Playoff 3").as_deref(), Some("2025dal_sf3m1"));
        assert_eq!(key("Final 2").as_deref(), Some("2025dal_f1m2"));
    }

    #[test]
    fn test_prediction_keys_from_live_labels() {
        let key = |label: &str| MatchId::from_live_label(label).map(|id| id.prediction_key("2025cur"));
        assert_eq!(key("Qualification 88").as_deref(), Some("2025cur_qm88"));
        assert_eq!(key("Playoff 11").as_deref(), Some("2025cur_sf11m1"));
        assert_eq!(key("Einstein 1"), None);
    }

    #[test]
    fn test_parse_results_keys() {
        assert_eq!(
            MatchId::from_results_key("2025dal_qm12"),
            Some(("2025dal".to_string(), MatchId::qualification(12)))
        );
        assert_eq!(
            MatchId::from_results_key("2025dal_sf13m1"),
            Some(("2025dal".to_string(), MatchId::playoff(13)))
        );
        assert_eq!(
            MatchId::from_results_key("2025dal_f1m3"),
            Some(("2025dal".to_string(), MatchId::final_match(3)))
        );
        assert_eq!(MatchId::from_results_key("2025dal_qf1m1"), None);
        assert_eq!(MatchId::from_results_key("2025dal_sf3"), None);
        assert_eq!(MatchId::from_results_key("garbage"), None);
    }

    #[test]
    fn test_round_trip_through_label() {
        for key in ["2025joh_qm7", "2025joh_sf2m1", "2025joh_f1m1"] {
            let (event, id) = MatchId::from_results_key(key).unwrap();
            assert_eq!(id.results_key(&event), key);
            assert_eq!(MatchId::from_live_label(&id.label()), Some(id));
        }
    }

    #[test]
    fn test_from_results_fields() {
        assert_eq!(
            MatchId::from_results_fields("qm", 1, 40),
            Some(MatchId::qualification(40))
        );
        assert_eq!(MatchId::from_results_fields("sf", 5, 1), Some(MatchId::playoff(5)));
        assert_eq!(MatchId::from_results_fields("ef", 1, 1), None);
    }
}
