use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// One ISO-8601 week: Monday start, week 1 is the week containing the
/// year's first Thursday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekWindow {
    pub week: u32,
    pub year: i32,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl WeekWindow {
    pub fn from_iso(year: i32, week: u32) -> Result<Self> {
        let start = NaiveDate::from_isoywd_opt(year, week, Weekday::Mon)
            .ok_or_else(|| Error::InvalidWeek(format!("no ISO week {week} in {year}")))?;
        let end = NaiveDate::from_isoywd_opt(year, week, Weekday::Sun)
            .ok_or_else(|| Error::InvalidWeek(format!("no ISO week {week} in {year}")))?;
        Ok(Self { week, year, start, end })
    }

    /// The ISO week containing the given date.
    pub fn for_date(date: NaiveDate) -> Self {
        let iso = date.iso_week();
        // from_isoywd_opt cannot fail for a week number produced by iso_week
        Self::from_iso(iso.year(), iso.week()).unwrap_or(Self {
            week: iso.week(),
            year: iso.year(),
            start: date,
            end: date,
        })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// Human-readable range, e.g. "Mar 4 - Mar 10, 2024".
    pub fn date_range_label(&self) -> String {
        format!(
            "{} - {}, {}",
            self.start.format("%b %-d"),
            self.end.format("%b %-d"),
            self.end.year()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn week_boundaries_are_monday_to_sunday() {
        let window = WeekWindow::from_iso(2024, 10).unwrap();
        assert_eq!(window.start, NaiveDate::from_ymd_opt(2024, 3, 4).unwrap());
        assert_eq!(window.end, NaiveDate::from_ymd_opt(2024, 3, 10).unwrap());
        assert_eq!(window.start.weekday(), Weekday::Mon);
        assert_eq!(window.end.weekday(), Weekday::Sun);
    }

    #[test]
    fn week_one_contains_first_thursday() {
        // 2021-01-01 was a Friday, so ISO week 1 of 2021 starts on Jan 4.
        let window = WeekWindow::from_iso(2021, 1).unwrap();
        assert_eq!(window.start, NaiveDate::from_ymd_opt(2021, 1, 4).unwrap());
    }

    #[test]
    fn for_date_round_trips() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        let window = WeekWindow::for_date(date);
        assert_eq!(window.week, 10);
        assert_eq!(window.year, 2024);
        assert!(window.contains(date));
        assert!(window.contains(window.start));
        assert!(window.contains(window.end));
        assert!(!window.contains(window.end.succ_opt().unwrap()));
    }

    #[test]
    fn year_boundary_belongs_to_iso_year() {
        // 2024-12-30 is a Monday in ISO week 1 of 2025.
        let date = NaiveDate::from_ymd_opt(2024, 12, 30).unwrap();
        let window = WeekWindow::for_date(date);
        assert_eq!(window.week, 1);
        assert_eq!(window.year, 2025);
    }

    #[test]
    fn invalid_week_is_rejected() {
        assert!(WeekWindow::from_iso(2024, 54).is_err());
        // 2020 had 53 ISO weeks, 2024 does not.
        assert!(WeekWindow::from_iso(2020, 53).is_ok());
        assert!(WeekWindow::from_iso(2024, 53).is_err());
    }

    #[test]
    fn range_label_is_human_readable() {
        let window = WeekWindow::from_iso(2024, 10).unwrap();
        assert_eq!(window.date_range_label(), "Mar 4 - Mar 10, 2024");
    }
}
