//! Fixed-width search windows.
//!
//! The collection loop does not mutate a running "today" cursor; the whole
//! window sequence is computed once up front and consumed in order.

use chrono::{Months, NaiveDate};

/// A half-open date range `[start, end)` scoping one search query.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl TimeWindow {
    /// Last day inside the range, for the hosting API's inclusive `..`
    /// search syntax.
    pub fn last_day(&self) -> NaiveDate {
        self.end.pred_opt().unwrap_or(self.end)
    }
}

/// Produces `count` consecutive non-overlapping one-month windows walking
/// backward from `today`. The first window ends at `today`; each subsequent
/// window ends where the previous one started.
pub fn month_windows(today: NaiveDate, count: u32) -> Vec<TimeWindow> {
    let mut windows = Vec::with_capacity(count as usize);
    let mut end = today;
    for _ in 0..count {
        let Some(start) = end.checked_sub_months(Months::new(1)) else {
            break;
        };
        windows.push(TimeWindow { start, end });
        end = start;
    }
    windows
}

/// The oldest window boundary reached, used as the lower bound for
/// zero-filling when no record carries a usable timestamp.
pub fn oldest_boundary(windows: &[TimeWindow], today: NaiveDate) -> NaiveDate {
    windows.last().map(|w| w.start).unwrap_or(today)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn windows_tile_the_full_range() {
        let today = date(2024, 6, 15);
        let windows = month_windows(today, 24);

        assert_eq!(windows.len(), 24);
        assert_eq!(windows[0].end, today);
        // Consecutive windows share exactly one boundary: no gaps, no overlap.
        for pair in windows.windows(2) {
            assert_eq!(pair[0].start, pair[1].end);
        }
        assert_eq!(oldest_boundary(&windows, today), date(2022, 6, 15));
    }

    #[test]
    fn month_end_clamping() {
        // One month before May 31 clamps to April 30.
        let windows = month_windows(date(2024, 5, 31), 1);
        assert_eq!(windows[0].start, date(2024, 4, 30));
        assert_eq!(windows[0].last_day(), date(2024, 5, 30));
    }

    #[test]
    fn every_day_falls_in_exactly_one_window() {
        // Half-open [start, end) ranges: a record can never be re-fetched by
        // two windows, and nothing in the covered range is missed.
        let today = date(2024, 3, 31);
        let windows = month_windows(today, 6);
        let oldest = oldest_boundary(&windows, today);

        let mut day = oldest;
        while day < today {
            let containing = windows
                .iter()
                .filter(|w| w.start <= day && day < w.end)
                .count();
            assert_eq!(containing, 1, "day {day} covered by {containing} windows");
            day = day.succ_opt().unwrap();
        }
    }

    #[test]
    fn zero_count_yields_no_windows() {
        let today = date(2024, 6, 15);
        assert!(month_windows(today, 0).is_empty());
        assert_eq!(oldest_boundary(&[], today), today);
    }
}
