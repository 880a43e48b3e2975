//! Save snapshot naming.
//!
//! A snapshot directory is named `<n>_step`. The index is what orders a save
//! line; the name is only its on-disk spelling.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::DomainError;

const STEP_SUFFIX: &str = "_step";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SaveStep(u64);

impl SaveStep {
    /// The snapshot every save line starts from.
    pub const INITIAL: SaveStep = SaveStep(0);

    pub fn new(index: u64) -> Self {
        Self(index)
    }

    pub fn index(&self) -> u64 {
        self.0
    }

    pub fn is_initial(&self) -> bool {
        self.0 == 0
    }

    /// The snapshot name that follows this one when nothing newer exists.
    pub fn next(&self) -> SaveStep {
        SaveStep(self.0.saturating_add(1))
    }

    /// Allocate the name for a fork of `from` given every step already on disk.
    ///
    /// Rewinding to an older snapshot and playing on must never reuse a name
    /// that is already taken, so allocation continues after the highest index.
    pub fn next_free<'a>(from: SaveStep, existing: impl IntoIterator<Item = &'a SaveStep>) -> SaveStep {
        existing
            .into_iter()
            .copied()
            .chain(std::iter::once(from))
            .max()
            .unwrap_or(from)
            .next()
    }
}

impl Default for SaveStep {
    fn default() -> Self {
        Self::INITIAL
    }
}

impl fmt::Display for SaveStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.0, STEP_SUFFIX)
    }
}

impl FromStr for SaveStep {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .trim()
            .strip_suffix(STEP_SUFFIX)
            .ok_or_else(|| DomainError::invalid_id(format!("save step must end with '{STEP_SUFFIX}': {s}")))?;
        digits
            .parse::<u64>()
            .map(SaveStep)
            .map_err(|_| DomainError::invalid_id(format!("save step index is not a number: {s}")))
    }
}

impl Serialize for SaveStep {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SaveStep {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_displays_step_names() {
        let step: SaveStep = "12_step".parse().unwrap();
        assert_eq!(step.index(), 12);
        assert_eq!(step.to_string(), "12_step");
        assert_eq!(step.next().to_string(), "13_step");
    }

    #[test]
    fn rejects_malformed_names() {
        assert!("step_1".parse::<SaveStep>().is_err());
        assert!("abc_step".parse::<SaveStep>().is_err());
        assert!("".parse::<SaveStep>().is_err());
    }

    #[test]
    fn next_free_skips_past_newer_snapshots() {
        let existing = [SaveStep::new(0), SaveStep::new(1), SaveStep::new(2), SaveStep::new(5)];
        // Rewound to 1_step while 5_step exists: the fork must not collide with 2_step.
        assert_eq!(SaveStep::next_free(SaveStep::new(1), &existing), SaveStep::new(6));
    }

    #[test]
    fn next_free_survives_deleted_gaps() {
        let existing = [SaveStep::new(0), SaveStep::new(3)];
        assert_eq!(SaveStep::next_free(SaveStep::new(3), &existing), SaveStep::new(4));
        assert_eq!(SaveStep::next_free(SaveStep::new(0), &[]), SaveStep::new(1));
    }

    #[test]
    fn orders_numerically_not_lexically() {
        let mut steps: Vec<SaveStep> = ["10_step", "2_step", "0_step"]
            .iter()
            .map(|s| s.parse().unwrap())
            .collect();
        steps.sort();
        let names: Vec<String> = steps.iter().map(ToString::to_string).collect();
        assert_eq!(names, vec!["0_step", "2_step", "10_step"]);
    }
}
