use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::BitOr;

use crate::constants::transition_bits;

/// Bitmask of region transitions a watch reports (enter / exit / dwell)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransitionType(u8);

impl TransitionType {
    pub const ENTER: Self = Self(transition_bits::ENTER);
    pub const EXIT: Self = Self(transition_bits::EXIT);
    pub const DWELL: Self = Self(transition_bits::DWELL);
    pub const BOTH: Self = Self(transition_bits::ENTER | transition_bits::EXIT);

    /// Build from raw bits, rejecting unknown bits
    pub fn from_bits(bits: u8) -> Option<Self> {
        if bits & !transition_bits::ALL == 0 {
            Some(Self(bits))
        } else {
            None
        }
    }

    pub fn bits(&self) -> u8 {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// True when every bit of `other` is set here
    pub fn contains(&self, other: Self) -> bool {
        other.0 != 0 && self.0 & other.0 == other.0
    }

    /// True when bits outside enter/exit/dwell are set
    pub fn has_unknown_bits(&self) -> bool {
        self.0 & !transition_bits::ALL != 0
    }
}

impl BitOr for TransitionType {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

impl fmt::Display for TransitionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names = Vec::new();
        if self.contains(Self::ENTER) {
            names.push("enter");
        }
        if self.contains(Self::EXIT) {
            names.push("exit");
        }
        if self.contains(Self::DWELL) {
            names.push("dwell");
        }
        if names.is_empty() {
            write!(f, "none")
        } else {
            write!(f, "{}", names.join("|"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_both_contains_enter_and_exit() {
        assert!(TransitionType::BOTH.contains(TransitionType::ENTER));
        assert!(TransitionType::BOTH.contains(TransitionType::EXIT));
        assert!(!TransitionType::BOTH.contains(TransitionType::DWELL));
        assert_eq!(TransitionType::ENTER | TransitionType::EXIT, TransitionType::BOTH);
    }

    #[test]
    fn test_from_bits_rejects_unknown() {
        assert_eq!(TransitionType::from_bits(3), Some(TransitionType::BOTH));
        assert!(TransitionType::from_bits(8).is_none());
        assert!(TransitionType::from_bits(0).unwrap().is_empty());
    }

    #[test]
    fn test_serializes_as_plain_number() {
        let json = serde_json::to_string(&TransitionType::BOTH).unwrap();
        assert_eq!(json, "3");
        let parsed: TransitionType = serde_json::from_str("12").unwrap();
        assert!(parsed.has_unknown_bits());
    }

    #[test]
    fn test_display() {
        assert_eq!(TransitionType::BOTH.to_string(), "enter|exit");
        assert_eq!(TransitionType::from_bits(0).unwrap().to_string(), "none");
    }
}
