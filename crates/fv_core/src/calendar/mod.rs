//! # Calendar / Stage Resolver
//!
//! Turns a (year, quarter) pair into the ordered weeks of the quarter and the
//! four contiguous workload stages.
//!
//! - Weeks start on the quarter's first day (not on Monday), span 7 days and
//!   are clipped at quarter end. Each week is labelled with the ISO week of
//!   its start date.
//! - Stages split the quarter's days into four parts of `days / 4`; stage 4
//!   takes the remainder.

mod quarter;
mod stage;
mod week;

pub use quarter::Quarter;
pub use stage::{is_workday, Stage, STAGE_COUNT};
pub use week::{IsoWeekKey, Week};

use crate::error::Result;
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// Resolved weeks and stages of one quarter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuarterCalendar {
    pub quarter: Quarter,
    pub weeks: Vec<Week>,
    pub stages: Vec<Stage>,
}

impl QuarterCalendar {
    /// Resolve the calendar for `year`/`quarter` with one coefficient per stage.
    pub fn resolve(year: i32, quarter: u32, coefficients: [f64; STAGE_COUNT]) -> Result<Self> {
        let quarter = Quarter::new(year, quarter)?;
        let stages = Stage::split_quarter(&quarter, coefficients)?;
        let weeks = Self::build_weeks(&quarter);

        Ok(Self { quarter, weeks, stages })
    }

    fn build_weeks(quarter: &Quarter) -> Vec<Week> {
        let end = quarter.end_date();
        let mut weeks = Vec::with_capacity(14);
        let mut current = quarter.start_date();

        while current <= end {
            let week_end = (current + Duration::days(6)).min(end);
            weeks.push(Week::new(current, week_end));
            current = week_end + Duration::days(1);
        }

        weeks
    }

    pub fn start_date(&self) -> NaiveDate {
        self.quarter.start_date()
    }

    pub fn end_date(&self) -> NaiveDate {
        self.quarter.end_date()
    }

    pub fn coefficient_sum(&self) -> f64 {
        self.stages.iter().map(|s| s.coefficient).sum()
    }

    /// Quarter week whose date range contains `date`.
    pub fn week_containing(&self, date: NaiveDate) -> Option<&Week> {
        self.weeks.iter().find(|w| w.contains(date))
    }

    /// Quarter week labelled with the given ISO week.
    pub fn week_for_iso(&self, iso: IsoWeekKey) -> Option<&Week> {
        self.weeks.iter().find(|w| w.iso == iso)
    }

    /// Index of the quarter week a single day's work is booked against.
    ///
    /// The day's own ISO week wins; days whose ISO week labels no quarter week
    /// (possible at a year boundary) fall back to the containing week.
    /// `None` for days outside the quarter.
    pub fn week_index_for_day(&self, date: NaiveDate) -> Option<usize> {
        if !self.quarter.contains(date) {
            return None;
        }
        let iso = IsoWeekKey::of(date);
        self.weeks
            .iter()
            .position(|w| w.iso == iso)
            .or_else(|| self.weeks.iter().position(|w| w.contains(date)))
    }

    pub fn stage_for_date(&self, date: NaiveDate) -> Option<&Stage> {
        self.stages.iter().find(|s| s.contains(date))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PlanError;

    const COEFFS: [f64; 4] = [0.8, 1.0, 1.2, 0.9];

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_q1_2025_has_13_weeks() {
        let cal = QuarterCalendar::resolve(2025, 1, COEFFS).unwrap();

        assert_eq!(cal.start_date(), d(2025, 1, 1));
        assert_eq!(cal.end_date(), d(2025, 3, 31));
        assert_eq!(cal.weeks.len(), 13);
        assert_eq!(cal.weeks[0].iso.week, 1);
        assert_eq!(cal.weeks[0].end_date, d(2025, 1, 7));
        // Final week is clipped at quarter end
        let last = cal.weeks.last().unwrap();
        assert_eq!(last.start_date, d(2025, 3, 26));
        assert_eq!(last.end_date, d(2025, 3, 31));
    }

    #[test]
    fn test_weeks_tile_quarter_without_gaps() {
        for q in 1..=4 {
            let cal = QuarterCalendar::resolve(2024, q, COEFFS).unwrap();
            assert_eq!(cal.weeks.first().unwrap().start_date, cal.start_date());
            assert_eq!(cal.weeks.last().unwrap().end_date, cal.end_date());
            for pair in cal.weeks.windows(2) {
                assert_eq!(pair[0].end_date + Duration::days(1), pair[1].start_date);
            }
        }
    }

    #[test]
    fn test_q4_rolls_into_next_year() {
        let cal = QuarterCalendar::resolve(2025, 4, COEFFS).unwrap();
        assert_eq!(cal.end_date(), d(2025, 12, 31));
        // Dec 31 2025 falls in ISO week 1 of 2026
        let last = cal.weeks.last().unwrap();
        assert_eq!(last.iso, IsoWeekKey { year: 2026, week: 1 });
    }

    #[test]
    fn test_stages_tile_quarter_and_last_absorbs_remainder() {
        let cal = QuarterCalendar::resolve(2025, 1, COEFFS).unwrap();
        // 90 days: 22 + 22 + 22 + 24
        let lengths: Vec<i64> = cal.stages.iter().map(|s| s.day_count()).collect();
        assert_eq!(lengths, vec![22, 22, 22, 24]);
        assert_eq!(cal.stages[0].start_date, cal.start_date());
        assert_eq!(cal.stages[3].end_date, cal.end_date());
        for pair in cal.stages.windows(2) {
            assert_eq!(pair[0].end_date + Duration::days(1), pair[1].start_date);
        }
        assert!((cal.coefficient_sum() - 3.9).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_inputs_rejected() {
        assert_eq!(
            QuarterCalendar::resolve(2025, 0, COEFFS).unwrap_err(),
            PlanError::InvalidQuarter { quarter: 0 }
        );
        assert_eq!(
            QuarterCalendar::resolve(2025, 5, COEFFS).unwrap_err(),
            PlanError::InvalidQuarter { quarter: 5 }
        );
        assert!(matches!(
            QuarterCalendar::resolve(2025, 2, [1.0, 0.0, 1.0, 1.0]),
            Err(PlanError::InvalidCoefficient { stage: 2, .. })
        ));
        assert!(matches!(
            QuarterCalendar::resolve(2025, 2, [1.0, 1.0, f64::NAN, 1.0]),
            Err(PlanError::InvalidCoefficient { stage: 3, .. })
        ));
        assert_eq!(
            QuarterCalendar::resolve(-5, 1, COEFFS).unwrap_err(),
            PlanError::InvalidYear { year: -5 }
        );
    }

    #[test]
    fn test_week_index_for_day_prefers_iso_label() {
        let cal = QuarterCalendar::resolve(2025, 1, COEFFS).unwrap();
        // Mon Jan 6 sits in the first quarter week (Jan 1-7) but is ISO week 2
        assert_eq!(cal.week_index_for_day(d(2025, 1, 6)), Some(1));
        assert_eq!(cal.week_containing(d(2025, 1, 6)).unwrap().iso.week, 1);
        assert_eq!(cal.week_index_for_day(d(2025, 4, 1)), None);
    }

    #[test]
    fn test_stage_for_date() {
        let cal = QuarterCalendar::resolve(2025, 1, COEFFS).unwrap();
        assert_eq!(cal.stage_for_date(d(2025, 1, 1)).unwrap().index, 1);
        assert_eq!(cal.stage_for_date(d(2025, 3, 31)).unwrap().index, 4);
    }
}
