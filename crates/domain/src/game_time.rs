use serde::{Deserialize, Serialize};

// =============================================================================
// Time of Day
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeOfDay {
    Morning,
    Afternoon,
    Evening,
    Night,
}

impl TimeOfDay {
    pub fn display_name(&self) -> &'static str {
        match self {
            TimeOfDay::Morning => "Morning",
            TimeOfDay::Afternoon => "Afternoon",
            TimeOfDay::Evening => "Evening",
            TimeOfDay::Night => "Night",
        }
    }

    /// Period containing the given hour (0-23).
    pub fn from_hour(hour: u8) -> TimeOfDay {
        match hour {
            5..=11 => TimeOfDay::Morning,
            12..=17 => TimeOfDay::Afternoon,
            18..=21 => TimeOfDay::Evening,
            _ => TimeOfDay::Night,
        }
    }
}

impl std::fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

// =============================================================================
// Game Time
// =============================================================================

const SECONDS_PER_MINUTE: u64 = 60;
const MINUTES_PER_DAY: u64 = 24 * 60;

/// Hour of day a fresh save line starts at.
pub const START_HOUR: u8 = 12;

/// In-world clock of one save line.
///
/// `elapsed_seconds` is the authoritative counter; `day`/`hour`/`minute` are
/// kept alongside it in the persisted record so the file is readable on its own.
/// Scene `enter_time` values are measured against `elapsed_seconds`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameTime {
    pub elapsed_seconds: u64,
    pub day: u32,
    pub hour: u8,
    pub minute: u8,
}

impl GameTime {
    /// Day 1, noon, nothing elapsed.
    pub fn start() -> Self {
        Self {
            elapsed_seconds: 0,
            day: 1,
            hour: START_HOUR,
            minute: 0,
        }
    }

    /// Clock reading after `elapsed_seconds` have passed since the start.
    pub fn from_elapsed_seconds(elapsed_seconds: u64) -> Self {
        let start_minutes = u64::from(START_HOUR) * 60;
        let total_minutes = start_minutes + elapsed_seconds / SECONDS_PER_MINUTE;
        let day = total_minutes / MINUTES_PER_DAY + 1;
        let minute_of_day = total_minutes % MINUTES_PER_DAY;

        Self {
            elapsed_seconds,
            day: u32::try_from(day).unwrap_or(u32::MAX),
            hour: (minute_of_day / 60) as u8,
            minute: (minute_of_day % 60) as u8,
        }
    }

    /// Advance by a (possibly fractional) number of in-game minutes.
    ///
    /// Negative, NaN, or infinite inputs do not move the clock; callers decide
    /// what a sensible fallback is before getting here.
    pub fn advance_minutes(&self, minutes: f64) -> Self {
        if !minutes.is_finite() || minutes <= 0.0 {
            return *self;
        }
        let seconds = (minutes * SECONDS_PER_MINUTE as f64).round() as u64;
        Self::from_elapsed_seconds(self.elapsed_seconds.saturating_add(seconds))
    }

    pub fn time_of_day(&self) -> TimeOfDay {
        TimeOfDay::from_hour(self.hour)
    }

    /// Seconds between `since` and now, zero if `since` lies in the future.
    pub fn seconds_since(&self, since: u64) -> u64 {
        self.elapsed_seconds.saturating_sub(since)
    }
}

impl Default for GameTime {
    fn default() -> Self {
        Self::start()
    }
}

impl std::fmt::Display for GameTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Day {} {:02}:{:02}", self.day, self.hour, self.minute)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_on_day_one_at_noon() {
        let time = GameTime::default();
        assert_eq!(time.to_string(), "Day 1 12:00");
        assert_eq!(time.time_of_day(), TimeOfDay::Afternoon);
    }

    #[test]
    fn advance_rolls_over_midnight() {
        let time = GameTime::start().advance_minutes(12.0 * 60.0 + 5.0);
        assert_eq!(time.day, 2);
        assert_eq!(time.hour, 0);
        assert_eq!(time.minute, 5);
        assert_eq!(time.elapsed_seconds, (12 * 60 + 5) * 60);
        assert_eq!(time.time_of_day(), TimeOfDay::Night);
    }

    #[test]
    fn fractional_minutes_accumulate_in_seconds() {
        let time = GameTime::start().advance_minutes(0.5).advance_minutes(0.5);
        assert_eq!(time.elapsed_seconds, 60);
        assert_eq!(time.to_string(), "Day 1 12:01");
    }

    #[test]
    fn invalid_advances_are_ignored() {
        let start = GameTime::start();
        assert_eq!(start.advance_minutes(-3.0), start);
        assert_eq!(start.advance_minutes(f64::NAN), start);
        assert_eq!(start.advance_minutes(f64::INFINITY), start);
    }

    #[test]
    fn seconds_since_saturates() {
        let time = GameTime::from_elapsed_seconds(120);
        assert_eq!(time.seconds_since(60), 60);
        assert_eq!(time.seconds_since(500), 0);
    }
}
