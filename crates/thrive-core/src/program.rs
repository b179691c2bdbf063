//! Program phase resolution.
//!
//! The phase is a pure function of the program day, and the program day
//! is a pure function of the start date and the current instant. Nothing
//! is stored beyond the start date; phases advance by re-evaluation.
//!
//! ```text
//! no start date ............ NotStarted (day 0)
//! day <= 0 (future start) .. NotStarted
//! day 1..=7 ................ WeekOne
//! day 8..=56 ............... Personalized
//! day > 56 ................. Maintenance
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::calendar::elapsed_days;
use crate::cornerstone::{focused_theme, Cornerstone};

/// Last day of the fixed first week.
pub const WEEK_ONE_LAST_DAY: i64 = 7;
/// Last day of the personalized phase (eight weeks).
pub const PERSONALIZED_LAST_DAY: i64 = 56;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProgramPhase {
    NotStarted,
    WeekOne,
    Personalized,
    Maintenance,
}

impl ProgramPhase {
    /// Phase for a program day.
    pub fn for_day(day: i64) -> Self {
        match day {
            d if d <= 0 => ProgramPhase::NotStarted,
            d if d <= WEEK_ONE_LAST_DAY => ProgramPhase::WeekOne,
            d if d <= PERSONALIZED_LAST_DAY => ProgramPhase::Personalized,
            _ => ProgramPhase::Maintenance,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProgramPhase::NotStarted => "not-started",
            ProgramPhase::WeekOne => "week-one",
            ProgramPhase::Personalized => "personalized",
            ProgramPhase::Maintenance => "maintenance",
        }
    }
}

/// Where a user stands in the program at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProgramPosition {
    pub phase: ProgramPhase,
    /// 1-based program day; 0 when not started, negative for a future start.
    pub day: i64,
}

impl ProgramPosition {
    pub fn not_started() -> Self {
        Self {
            phase: ProgramPhase::NotStarted,
            day: 0,
        }
    }

    /// Position for an explicit program day.
    pub fn on_day(day: i64) -> Self {
        Self {
            phase: ProgramPhase::for_day(day),
            day,
        }
    }

    /// Resolve from a start date. The start date itself is day 1.
    pub fn resolve(start: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Self {
        match start {
            None => Self::not_started(),
            Some(start) => Self::on_day(program_day(start, now)),
        }
    }

    /// Cornerstone in focus for this position.
    pub fn theme(&self) -> &'static Cornerstone {
        focused_theme(self.day)
    }

    pub fn is_started(&self) -> bool {
        self.phase != ProgramPhase::NotStarted
    }
}

/// 1-based program day for `now`.
pub fn program_day(start: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    elapsed_days(start, now) + 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn start_today_is_week_one_day_one() {
        let now = Utc::now();
        let pos = ProgramPosition::resolve(Some(now), now);
        assert_eq!(pos.day, 1);
        assert_eq!(pos.phase, ProgramPhase::WeekOne);
    }

    #[test]
    fn ten_days_in_is_personalized_day_eleven() {
        let now = Utc::now();
        let pos = ProgramPosition::resolve(Some(now - Duration::days(10)), now);
        assert_eq!(pos.day, 11);
        assert_eq!(pos.phase, ProgramPhase::Personalized);
    }

    #[test]
    fn sixty_days_in_is_maintenance() {
        let now = Utc::now();
        let pos = ProgramPosition::resolve(Some(now - Duration::days(60)), now);
        assert_eq!(pos.phase, ProgramPhase::Maintenance);
    }

    #[test]
    fn no_start_date_is_not_started() {
        let pos = ProgramPosition::resolve(None, Utc::now());
        assert_eq!(pos, ProgramPosition::not_started());
        assert!(!pos.is_started());
    }

    #[test]
    fn future_start_is_not_started_with_non_positive_day() {
        let now = Utc::now();
        let pos = ProgramPosition::resolve(Some(now + Duration::days(3)), now);
        assert!(pos.day <= 0);
        assert_eq!(pos.phase, ProgramPhase::NotStarted);
        assert_eq!(pos.theme().position, 1);
    }

    #[test]
    fn phase_boundaries() {
        assert_eq!(ProgramPhase::for_day(0), ProgramPhase::NotStarted);
        assert_eq!(ProgramPhase::for_day(1), ProgramPhase::WeekOne);
        assert_eq!(ProgramPhase::for_day(7), ProgramPhase::WeekOne);
        assert_eq!(ProgramPhase::for_day(8), ProgramPhase::Personalized);
        assert_eq!(ProgramPhase::for_day(56), ProgramPhase::Personalized);
        assert_eq!(ProgramPhase::for_day(57), ProgramPhase::Maintenance);
    }

    #[test]
    fn phase_serializes_kebab_case() {
        let json = serde_json::to_string(&ProgramPhase::NotStarted).unwrap();
        assert_eq!(json, "\"not-started\"");
        assert_eq!(ProgramPhase::WeekOne.as_str(), "week-one");
    }
}
