//! Generation calendar

use chrono::NaiveDate;
use horizon_core::{CalendarProvider, HorizonError, Result};

/// Inclusive daily range `[start, end]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRangeCalendar {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRangeCalendar {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(HorizonError::Calendar(format!(
                "start {start} is after end {end}"
            )));
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Number of days, both ends included
    pub fn days(&self) -> usize {
        (self.end - self.start).num_days() as usize + 1
    }
}

impl Default for DateRangeCalendar {
    /// Three years: 2023-01-01 through 2025-12-31
    fn default() -> Self {
        Self {
            start: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap_or(NaiveDate::MIN),
            end: NaiveDate::from_ymd_opt(2025, 12, 31).unwrap_or(NaiveDate::MIN),
        }
    }
}

impl CalendarProvider for DateRangeCalendar {
    fn dates(&self) -> Result<Vec<NaiveDate>> {
        Ok(self.start.iter_days().take(self.days()).collect())
    }
}
