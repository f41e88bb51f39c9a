//! Calendar bucketing of date sequences into zero-filled period series.

use chrono::{Datelike, Days, Months, NaiveDate};
use std::collections::BTreeMap;

/// Bucket width for a period series.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Granularity {
    Day,
    Week,
    Month,
}

impl Granularity {
    /// First day of the period containing `date` (weeks start Monday).
    fn anchor(self, date: NaiveDate) -> NaiveDate {
        match self {
            Granularity::Day => date,
            Granularity::Week => {
                let back = Days::new(date.weekday().num_days_from_monday() as u64);
                date.checked_sub_days(back).unwrap_or(date)
            }
            Granularity::Month => date.with_day(1).unwrap_or(date),
        }
    }

    fn next(self, anchor: NaiveDate) -> Option<NaiveDate> {
        match self {
            Granularity::Day => anchor.succ_opt(),
            Granularity::Week => anchor.checked_add_days(Days::new(7)),
            Granularity::Month => anchor.checked_add_months(Months::new(1)),
        }
    }

    fn label(self, anchor: NaiveDate) -> String {
        match self {
            Granularity::Day => anchor.format("%Y-%m-%d").to_string(),
            Granularity::Week => anchor.format("%G-W%V").to_string(),
            Granularity::Month => anchor.format("%Y-%m").to_string(),
        }
    }
}

/// Buckets dates into a contiguous, chronologically ascending
/// `(period_label, count)` series. `None` entries (still-open records) are
/// excluded from counting. Every period between the minimum and maximum
/// observed date is present, zero-filled where nothing fell.
///
/// When every input is `None`, the series spans `fallback` (oldest window
/// boundary through today) with all-zero counts instead of an undefined
/// empty range.
pub fn bucket_counts(
    dates: &[Option<NaiveDate>],
    granularity: Granularity,
    fallback: (NaiveDate, NaiveDate),
) -> Vec<(String, u64)> {
    let mut counts: BTreeMap<NaiveDate, u64> = BTreeMap::new();
    for date in dates.iter().flatten() {
        *counts.entry(granularity.anchor(*date)).or_default() += 1;
    }

    let (first, last) = match (counts.keys().next(), counts.keys().next_back()) {
        (Some(&first), Some(&last)) => (first, last),
        _ => (
            granularity.anchor(fallback.0),
            granularity.anchor(fallback.1),
        ),
    };

    let mut series = Vec::new();
    let mut anchor = first;
    loop {
        series.push((
            granularity.label(anchor),
            counts.get(&anchor).copied().unwrap_or(0),
        ));
        if anchor >= last {
            break;
        }
        match granularity.next(anchor) {
            Some(next) => anchor = next,
            None => break,
        }
    }
    series
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
        Some(NaiveDate::from_ymd_opt(y, m, d).unwrap())
    }

    fn fallback() -> (NaiveDate, NaiveDate) {
        (
            NaiveDate::from_ymd_opt(2023, 11, 15).unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 15).unwrap(),
        )
    }

    #[test]
    fn monthly_buckets_are_contiguous_and_counts_sum() {
        let dates = vec![
            date(2024, 1, 5),
            date(2024, 1, 28),
            None,
            date(2024, 4, 2),
            date(2024, 2, 14),
        ];
        let series = bucket_counts(&dates, Granularity::Month, fallback());

        let labels: Vec<&str> = series.iter().map(|(l, _)| l.as_str()).collect();
        assert_eq!(labels, ["2024-01", "2024-02", "2024-03", "2024-04"]);
        assert_eq!(series[2].1, 0); // gap month zero-filled
        let total: u64 = series.iter().map(|(_, n)| n).sum();
        assert_eq!(total, 4); // equals the number of non-null dates
    }

    #[test]
    fn all_null_input_falls_back_to_zero_series() {
        let series = bucket_counts(&[None, None], Granularity::Month, fallback());

        let labels: Vec<&str> = series.iter().map(|(l, _)| l.as_str()).collect();
        assert_eq!(labels, ["2023-11", "2023-12", "2024-01", "2024-02"]);
        assert!(series.iter().all(|(_, n)| *n == 0));
    }

    #[test]
    fn empty_input_also_falls_back() {
        let series = bucket_counts(&[], Granularity::Week, fallback());
        assert!(!series.is_empty());
        assert!(series.iter().all(|(_, n)| *n == 0));
    }

    #[test]
    fn weekly_buckets_anchor_on_monday() {
        // 2024-01-03 is a Wednesday; 2024-01-08 the following Monday.
        let dates = vec![date(2024, 1, 3), date(2024, 1, 8), date(2024, 1, 10)];
        let series = bucket_counts(&dates, Granularity::Week, fallback());

        assert_eq!(series.len(), 2);
        assert_eq!(series[0], ("2024-W01".to_string(), 1));
        assert_eq!(series[1], ("2024-W02".to_string(), 2));
    }

    #[test]
    fn daily_buckets_fill_every_day() {
        let dates = vec![date(2024, 3, 1), date(2024, 3, 4)];
        let series = bucket_counts(&dates, Granularity::Day, fallback());

        let labels: Vec<&str> = series.iter().map(|(l, _)| l.as_str()).collect();
        assert_eq!(labels, ["2024-03-01", "2024-03-02", "2024-03-03", "2024-03-04"]);
        assert_eq!(series[0].1, 1);
        assert_eq!(series[3].1, 1);
    }

    #[test]
    fn single_date_yields_single_bucket() {
        let series = bucket_counts(&[date(2024, 6, 1)], Granularity::Month, fallback());
        assert_eq!(series, vec![("2024-06".to_string(), 1)]);
    }
}
