use std::fmt;

use serde::{Serialize, Serializer};

use crate::interval::Interval;
use crate::record::Record;

/// Number of gaps between tick marks on a progress scale.
pub const TICK_DIVISIONS: u64 = 4;

/// Counts records per interval. A record is counted in every interval whose
/// half-open window contains its timestamp; records outside all windows are
/// ignored.
pub fn count_buckets<R: Record>(records: &[R], intervals: &[Interval]) -> Vec<u64> {
    let mut counts = vec![0u64; intervals.len()];
    for record in records {
        let created_at = record.created_at();
        for (idx, interval) in intervals.iter().enumerate() {
            if interval.contains(created_at) {
                counts[idx] += 1;
            }
        }
    }
    counts
}

/// Change of the latest bucket relative to the one before it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ChangePercent {
    Percent(f64),
    /// Previous bucket was empty and the latest is not.
    Unbounded,
}

impl fmt::Display for ChangePercent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangePercent::Unbounded => f.write_str("+∞%"),
            ChangePercent::Percent(p) if *p >= 0.0 => write!(f, "+{p:.2}%"),
            ChangePercent::Percent(p) => write!(f, "{p:.2}%"),
        }
    }
}

impl ChangePercent {
    pub fn is_decrease(&self) -> bool {
        matches!(self, ChangePercent::Percent(p) if *p < 0.0)
    }
}

impl Serialize for ChangePercent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ChangePercent::Percent(p) => serializer.serialize_f64(*p),
            ChangePercent::Unbounded => serializer.serialize_str("unbounded"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrendStat {
    pub current_count: u64,
    pub previous_count: u64,
    pub change_percent: ChangePercent,
}

pub fn derive_trend(counts: &[u64]) -> TrendStat {
    let current_count = counts.last().copied().unwrap_or(0);
    let previous_count = counts
        .len()
        .checked_sub(2)
        .map_or(0, |idx| counts[idx]);

    let change_percent = match (previous_count, current_count) {
        (0, 0) => ChangePercent::Percent(0.0),
        (0, _) => ChangePercent::Unbounded,
        (prev, cur) => {
            let prev = prev as f64;
            ChangePercent::Percent((cur as f64 - prev) / prev * 100.0)
        }
    };

    TrendStat {
        current_count,
        previous_count,
        change_percent,
    }
}

/// Tick marks and per-bucket fill percentages for a progress-bar chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressScale {
    pub tick_interval: u64,
    pub tick_marks: [u64; TICK_DIVISIONS as usize + 1],
    pub largest_tick: u64,
    pub values: Vec<f64>,
}

pub fn progress_scale(counts: &[u64]) -> ProgressScale {
    let max_count = counts.iter().copied().max().unwrap_or(0);
    let tick_interval = max_count.div_ceil(TICK_DIVISIONS);
    let largest_tick = tick_interval * TICK_DIVISIONS;

    let mut tick_marks = [0u64; TICK_DIVISIONS as usize + 1];
    for (i, tick) in tick_marks.iter_mut().enumerate() {
        *tick = i as u64 * tick_interval;
    }

    let values = counts
        .iter()
        .map(|&count| {
            if largest_tick == 0 {
                0.0
            } else {
                (count as f64 / largest_tick as f64 * 100.0).clamp(0.0, 100.0)
            }
        })
        .collect();

    ProgressScale {
        tick_interval,
        tick_marks,
        largest_tick,
        values,
    }
}
