use crate::error::{PlanError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Supported calendar years.
const MIN_YEAR: i32 = 1;
const MAX_YEAR: i32 = 9999;

/// A fiscal quarter: three calendar months (Q1 = Jan-Mar).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Quarter {
    pub year: i32,
    pub quarter: u32,
    start: NaiveDate,
    end: NaiveDate,
}

impl Quarter {
    pub fn new(year: i32, quarter: u32) -> Result<Self> {
        if !(1..=4).contains(&quarter) {
            return Err(PlanError::InvalidQuarter { quarter });
        }
        if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
            return Err(PlanError::InvalidYear { year });
        }

        let first_month = (quarter - 1) * 3 + 1;
        let start = NaiveDate::from_ymd_opt(year, first_month, 1)
            .ok_or(PlanError::InvalidYear { year })?;

        let next_start = if quarter == 4 {
            NaiveDate::from_ymd_opt(year + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(year, first_month + 3, 1)
        };
        let end = next_start
            .and_then(|d| d.pred_opt())
            .ok_or(PlanError::InvalidYear { year })?;

        Ok(Self { year, quarter, start, end })
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start
    }

    pub fn end_date(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// Number of calendar days, both ends inclusive.
    pub fn total_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    pub fn label(&self) -> String {
        format!("Q{} {}", self.quarter, self.year)
    }
}
