use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// ISO-8601 week identifier. Ordered by (year, week).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IsoWeekKey {
    pub year: i32,
    pub week: u32,
}

impl IsoWeekKey {
    pub fn of(date: NaiveDate) -> Self {
        let iso = date.iso_week();
        Self { year: iso.year(), week: iso.week() }
    }
}

impl fmt::Display for IsoWeekKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-W{:02}", self.year, self.week)
    }
}

/// One week of a quarter, labelled with the ISO week of its start date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Week {
    pub iso: IsoWeekKey,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl Week {
    pub fn new(start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self { iso: IsoWeekKey::of(start_date), start_date, end_date }
    }

    pub fn iso_week(&self) -> u32 {
        self.iso.week
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start_date && date <= self.end_date
    }

    pub fn day_count(&self) -> i64 {
        (self.end_date - self.start_date).num_days() + 1
    }

    /// e.g. `Week 14 (01.04-07.04)`
    pub fn label(&self) -> String {
        format!(
            "Week {} ({}-{})",
            self.iso.week,
            self.start_date.format("%d.%m"),
            self.end_date.format("%d.%m")
        )
    }
}
