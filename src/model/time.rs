//! Logical game time
//!
//! One tick is one in-world minute. The calendar chain (minute -> hour ->
//! day -> week -> month -> year) only exists for display; the simulation
//! itself cares about `total_ticks` alone.

use crate::core::types::Tick;
use serde::{Deserialize, Serialize};

pub const TICKS_PER_MINUTE: Tick = 1;
pub const MINUTES_PER_HOUR: Tick = 60;
pub const HOURS_PER_DAY: Tick = 24;
pub const DAYS_PER_WEEK: Tick = 7;
pub const WEEKS_PER_MONTH: Tick = 4;
pub const MONTHS_PER_YEAR: Tick = 12;

/// Logical clock for the simulation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GameTime {
    pub total_ticks: Tick,
}

impl GameTime {
    pub fn new(total_ticks: Tick) -> Self {
        Self { total_ticks }
    }

    pub fn ticks_per_hour(&self) -> Tick {
        TICKS_PER_MINUTE * MINUTES_PER_HOUR
    }

    pub fn ticks_per_day(&self) -> Tick {
        self.ticks_per_hour() * HOURS_PER_DAY
    }

    /// Advance the clock; returns true when a day boundary was crossed.
    pub fn advance_ticks(&mut self, ticks_to_add: Tick) -> bool {
        let old_day = self.total_ticks / self.ticks_per_day();
        self.total_ticks += ticks_to_add;
        let new_day = self.total_ticks / self.ticks_per_day();
        new_day > old_day
    }

    pub fn year(&self) -> Tick {
        let den = self.ticks_per_day() * DAYS_PER_WEEK * WEEKS_PER_MONTH * MONTHS_PER_YEAR;
        1 + self.total_ticks / den
    }

    pub fn month(&self) -> Tick {
        let den_year = self.ticks_per_day() * DAYS_PER_WEEK * WEEKS_PER_MONTH * MONTHS_PER_YEAR;
        let den_month = self.ticks_per_day() * DAYS_PER_WEEK * WEEKS_PER_MONTH;
        let ticks_in_year = self.total_ticks % den_year;
        1 + ticks_in_year / den_month
    }

    pub fn hour(&self) -> Tick {
        let ticks_in_day = self.total_ticks % self.ticks_per_day();
        ticks_in_day / self.ticks_per_hour()
    }

    pub fn minute(&self) -> Tick {
        let ticks_in_day = self.total_ticks % self.ticks_per_day();
        let ticks_in_hour = ticks_in_day % self.ticks_per_hour();
        ticks_in_hour / TICKS_PER_MINUTE
    }

    pub fn time_to_string(&self) -> String {
        format!(
            "Year {}, Month {}, {:02}:{:02}",
            self.year(),
            self.month(),
            self.hour(),
            self.minute()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_reports_day_rollover() {
        let mut time = GameTime::default();
        assert!(!time.advance_ticks(60));
        assert_eq!(time.hour(), 1);
        assert!(time.advance_ticks(24 * 60));
    }

    #[test]
    fn test_clock_fields() {
        let time = GameTime::new(61);
        assert_eq!(time.hour(), 1);
        assert_eq!(time.minute(), 1);
        assert_eq!(time.year(), 1);
    }
}
