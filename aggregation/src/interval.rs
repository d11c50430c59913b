use std::fmt;
use std::str::FromStr;

use chrono::{
    DateTime, Datelike, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeDelta,
    TimeZone, Timelike, Utc,
};
use serde::{Deserialize, Serialize};

use crate::error::{AggregationError, Result};

/// Width of a single bucket in a metrics view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    #[default]
    Hour,
    Day,
    Week,
}

impl Granularity {
    pub const ALL: [Granularity; 3] = [Granularity::Hour, Granularity::Day, Granularity::Week];

    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::Hour => "hour",
            Granularity::Day => "day",
            Granularity::Week => "week",
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Granularity {
    type Err = AggregationError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "hour" => Ok(Granularity::Hour),
            "day" => Ok(Granularity::Day),
            "week" => Ok(Granularity::Week),
            other => Err(AggregationError::UnknownGranularity {
                value: other.to_owned(),
            }),
        }
    }
}

/// Half-open window `[start, end)` with a display label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Interval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub label: String,
}

impl Interval {
    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        self.start <= ts && ts < self.end
    }
}

/// Builds `bucket_count` contiguous intervals, oldest first, whose last
/// interval contains `reference`.
///
/// Flooring to the hour/day/week and label formatting happen in the time zone
/// carried by `reference`; the returned bounds are UTC instants. Weeks start
/// on Monday and are labelled with their last day (Sunday).
pub fn build_intervals<Tz: TimeZone>(
    granularity: Granularity,
    reference: &DateTime<Tz>,
    bucket_count: usize,
) -> Result<Vec<Interval>> {
    if bucket_count == 0 {
        return Err(AggregationError::ZeroBucketCount);
    }

    let tz = reference.timezone();
    let boundaries = match granularity {
        Granularity::Hour => {
            let current = floor_to_hour(reference);
            (0..=bucket_count)
                .map(|i| current + TimeDelta::hours(steps_from_current(i, bucket_count)))
                .collect::<Vec<_>>()
        }
        Granularity::Day => day_boundaries(&tz, reference.date_naive(), 1, bucket_count),
        Granularity::Week => {
            let today = reference.date_naive();
            let monday =
                today - TimeDelta::days(i64::from(today.weekday().num_days_from_monday()));
            day_boundaries(&tz, monday, 7, bucket_count)
        }
    };

    Ok(boundaries
        .windows(2)
        .map(|pair| {
            let (start, end) = (pair[0], pair[1]);
            Interval {
                start,
                end,
                label: label_for(granularity, &tz, start, end),
            }
        })
        .collect())
}

/// Signed bucket offset of boundary `i` relative to the bucket holding the
/// reference instant. Boundary `bucket_count` is the end of the last bucket.
fn steps_from_current(i: usize, bucket_count: usize) -> i64 {
    i as i64 - (bucket_count as i64 - 1)
}

fn floor_to_hour<Tz: TimeZone>(reference: &DateTime<Tz>) -> DateTime<Utc> {
    let local = reference.naive_local();
    let into_hour = TimeDelta::minutes(i64::from(local.minute()))
        + TimeDelta::seconds(i64::from(local.second()))
        + TimeDelta::nanoseconds(i64::from(local.nanosecond()));
    reference.with_timezone(&Utc) - into_hour
}

fn day_boundaries<Tz: TimeZone>(
    tz: &Tz,
    anchor: NaiveDate,
    step_days: i64,
    bucket_count: usize,
) -> Vec<DateTime<Utc>> {
    (0..=bucket_count)
        .map(|i| {
            let date = anchor + TimeDelta::days(steps_from_current(i, bucket_count) * step_days);
            resolve_local(tz, date.and_time(NaiveTime::MIN))
        })
        .collect()
}

fn resolve_local<Tz: TimeZone>(tz: &Tz, local: NaiveDateTime) -> DateTime<Utc> {
    match tz.from_local_datetime(&local) {
        LocalResult::Single(t) | LocalResult::Ambiguous(t, _) => t.with_timezone(&Utc),
        // Wall clock skips this time (DST gap); use the offset in force before it.
        LocalResult::None => {
            let before = tz.offset_from_utc_datetime(&(local - TimeDelta::days(1)));
            let offset = i64::from(before.fix().local_minus_utc());
            Utc.from_utc_datetime(&(local - TimeDelta::seconds(offset)))
        }
    }
}

fn label_for<Tz: TimeZone>(
    granularity: Granularity,
    tz: &Tz,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> String {
    match granularity {
        Granularity::Hour => start
            .with_timezone(tz)
            .naive_local()
            .format("%-I:%M %p")
            .to_string(),
        Granularity::Day => start
            .with_timezone(tz)
            .date_naive()
            .format("%b %-d")
            .to_string(),
        Granularity::Week => {
            let last_day = end.with_timezone(tz).date_naive() - TimeDelta::days(1);
            last_day.format("%b %-d").to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::FixedOffset;

    use super::*;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    fn labels(intervals: &[Interval]) -> Vec<&str> {
        intervals.iter().map(|i| i.label.as_str()).collect()
    }

    #[test]
    fn hour_buckets_end_on_the_reference_hour() {
        let reference = utc(2025, 3, 10, 10, 30);
        let intervals = build_intervals(Granularity::Hour, &reference, 5).unwrap();

        assert_eq!(intervals.len(), 5);
        assert_eq!(intervals[0].start, utc(2025, 3, 10, 6, 0));
        assert_eq!(intervals[4].start, utc(2025, 3, 10, 10, 0));
        assert_eq!(intervals[4].end, utc(2025, 3, 10, 11, 0));
        assert_eq!(
            labels(&intervals),
            ["6:00 AM", "7:00 AM", "8:00 AM", "9:00 AM", "10:00 AM"]
        );
    }

    #[test]
    fn hour_floor_uses_the_reference_offset() {
        // +05:30 puts local hour boundaries on the half hour in UTC.
        let tz = FixedOffset::east_opt(5 * 3600 + 30 * 60).unwrap();
        let reference = tz.with_ymd_and_hms(2025, 3, 10, 14, 45, 0).unwrap();
        let intervals = build_intervals(Granularity::Hour, &reference, 2).unwrap();

        assert_eq!(intervals[1].start, utc(2025, 3, 10, 8, 30));
        assert_eq!(intervals[1].end, utc(2025, 3, 10, 9, 30));
        assert_eq!(labels(&intervals), ["1:00 PM", "2:00 PM"]);
    }

    #[test]
    fn day_buckets_start_at_local_midnight() {
        let tz = FixedOffset::east_opt(2 * 3600).unwrap();
        let reference = tz.with_ymd_and_hms(2025, 3, 10, 10, 30, 0).unwrap();
        let intervals = build_intervals(Granularity::Day, &reference, 5).unwrap();

        assert_eq!(intervals[4].start, utc(2025, 3, 9, 22, 0));
        assert_eq!(intervals[4].end, utc(2025, 3, 10, 22, 0));
        assert_eq!(
            labels(&intervals),
            ["Mar 6", "Mar 7", "Mar 8", "Mar 9", "Mar 10"]
        );
    }

    #[test]
    fn week_buckets_start_on_monday_and_label_the_sunday() {
        // 2025-03-12 is a Wednesday.
        let reference = utc(2025, 3, 12, 18, 0);
        let intervals = build_intervals(Granularity::Week, &reference, 5).unwrap();

        assert_eq!(intervals[0].start, utc(2025, 2, 10, 0, 0));
        assert_eq!(intervals[4].start, utc(2025, 3, 10, 0, 0));
        assert_eq!(intervals[4].end, utc(2025, 3, 17, 0, 0));
        assert_eq!(
            labels(&intervals),
            ["Feb 16", "Feb 23", "Mar 2", "Mar 9", "Mar 16"]
        );
    }

    #[test]
    fn sunday_belongs_to_the_week_that_started_the_monday_before() {
        let sunday = utc(2025, 3, 16, 23, 59);
        let intervals = build_intervals(Granularity::Week, &sunday, 1).unwrap();
        assert_eq!(intervals[0].start, utc(2025, 3, 10, 0, 0));

        let monday = utc(2025, 3, 17, 0, 0);
        let intervals = build_intervals(Granularity::Week, &monday, 1).unwrap();
        assert_eq!(intervals[0].start, utc(2025, 3, 17, 0, 0));
    }

    #[test]
    fn generated_sequences_are_contiguous_and_hold_the_reference() {
        let tz = FixedOffset::west_opt(7 * 3600).unwrap();
        let reference = tz.with_ymd_and_hms(2024, 12, 31, 23, 59, 59).unwrap();
        let reference_utc = reference.with_timezone(&Utc);

        for granularity in Granularity::ALL {
            for n in 1..=8 {
                let intervals = build_intervals(granularity, &reference, n).unwrap();
                assert_eq!(intervals.len(), n);
                for interval in &intervals {
                    assert!(interval.start < interval.end);
                }
                for pair in intervals.windows(2) {
                    assert_eq!(pair[0].end, pair[1].start);
                }
                let last = intervals.last().unwrap();
                assert!(last.contains(reference_utc), "{granularity} with {n} buckets");
            }
        }
    }

    #[test]
    fn zero_buckets_is_rejected() {
        let err = build_intervals(Granularity::Day, &Utc::now(), 0).unwrap_err();
        assert_eq!(err, AggregationError::ZeroBucketCount);
    }

    #[test]
    fn unknown_granularity_does_not_default() {
        assert_eq!("week".parse::<Granularity>(), Ok(Granularity::Week));
        let err = "month".parse::<Granularity>().unwrap_err();
        assert_eq!(
            err,
            AggregationError::UnknownGranularity {
                value: "month".to_owned()
            }
        );
    }
}
