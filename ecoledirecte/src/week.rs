//! The Monday–Sunday window used for schedule queries.
use chrono::{Datelike, Duration, NaiveDate, Utc};
use chrono_tz::Europe::Paris;
use serde::{Deserialize, Serialize};

/// Format of the dates the portal expects.
pub const DATE_FMT: &str = "%Y-%m-%d";

/// A week, Monday to Sunday inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    /// Monday.
    pub start: NaiveDate,
    /// Sunday.
    pub end: NaiveDate,
}

impl DateWindow {
    /// The week containing `today`.
    #[must_use]
    pub fn containing(today: NaiveDate) -> Self {
        let offset = today.weekday().num_days_from_monday();
        let start = today - Duration::days(i64::from(offset));

        Self {
            start,
            end: start + Duration::days(6),
        }
    }

    /// The current week, as seen from Paris.
    #[must_use]
    pub fn current() -> Self {
        Self::containing(Utc::now().with_timezone(&Paris).date_naive())
    }

    /// All seven days in order.
    #[must_use]
    pub fn days(&self) -> [NaiveDate; 7] {
        let mut days = [self.start; 7];
        for (day, offset) in days.iter_mut().zip(0..) {
            *day = self.start + Duration::days(offset);
        }
        days
    }

    /// All seven days formatted as `YYYY-MM-DD`.
    #[must_use]
    pub fn day_strings(&self) -> Vec<String> {
        self.days()
            .iter()
            .map(|d| d.format(DATE_FMT).to_string())
            .collect()
    }

    /// Whether `date` falls within the window.
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        (self.start..=self.end).contains(&date)
    }
}

/// The seven `YYYY-MM-DD` days of the week containing `today`.
#[must_use]
pub fn week_days(today: NaiveDate) -> Vec<String> {
    DateWindow::containing(today).day_strings()
}
