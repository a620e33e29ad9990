use super::Quarter;
use crate::error::{PlanError, Result};
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

pub const STAGE_COUNT: usize = 4;

/// Monday to Friday.
pub fn is_workday(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// A contiguous sub-period of the quarter with its own load coefficient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stage {
    /// 1-based stage index
    pub index: usize,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub coefficient: f64,
}

impl Stage {
    /// Split a quarter into [`STAGE_COUNT`] stages.
    pub(crate) fn split_quarter(
        quarter: &Quarter,
        coefficients: [f64; STAGE_COUNT],
    ) -> Result<Vec<Stage>> {
        for (i, &value) in coefficients.iter().enumerate() {
            if !value.is_finite() || value <= 0.0 {
                return Err(PlanError::InvalidCoefficient { stage: i + 1, value });
            }
        }

        let stage_length = quarter.total_days() / STAGE_COUNT as i64;
        let mut stages = Vec::with_capacity(STAGE_COUNT);
        let mut start = quarter.start_date();

        for (i, &coefficient) in coefficients.iter().enumerate() {
            let end = if i == STAGE_COUNT - 1 {
                quarter.end_date()
            } else {
                start + Duration::days(stage_length - 1)
            };
            stages.push(Stage { index: i + 1, start_date: start, end_date: end, coefficient });
            start = end + Duration::days(1);
        }

        Ok(stages)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start_date && date <= self.end_date
    }

    pub fn day_count(&self) -> i64 {
        (self.end_date - self.start_date).num_days() + 1
    }

    /// Mon-Fri days of the stage in date order.
    pub fn workable_days(&self) -> Vec<NaiveDate> {
        self.start_date
            .iter_days()
            .take_while(|d| *d <= self.end_date)
            .filter(|d| is_workday(*d))
            .collect()
    }
}
