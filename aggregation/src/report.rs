use chrono::{DateTime, TimeZone};
use serde::Serialize;

use crate::bucket::{ProgressScale, TrendStat, count_buckets, derive_trend, progress_scale};
use crate::error::Result;
use crate::interval::{Granularity, Interval, build_intervals};
use crate::page::{Page, paginate};
use crate::rank::{RankedEntry, rank};
use crate::record::Record;

pub const DEFAULT_BUCKET_COUNT: usize = 5;
pub const DEFAULT_RANKING_PAGE_SIZE: usize = 5;

/// View controls for one aggregation pass.
#[derive(Debug, Clone)]
pub struct ReportRequest<Tz: TimeZone> {
    pub granularity: Granularity,
    pub reference: DateTime<Tz>,
    pub bucket_count: usize,
    pub ranking_page: usize,
    pub ranking_page_size: usize,
}

impl<Tz: TimeZone> ReportRequest<Tz> {
    pub fn new(granularity: Granularity, reference: DateTime<Tz>) -> Self {
        ReportRequest {
            granularity,
            reference,
            bucket_count: DEFAULT_BUCKET_COUNT,
            ranking_page: 1,
            ranking_page_size: DEFAULT_RANKING_PAGE_SIZE,
        }
    }
}

/// Everything a metrics view shows, computed from one record snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsReport {
    pub granularity: Granularity,
    pub intervals: Vec<Interval>,
    pub counts: Vec<u64>,
    pub trend: TrendStat,
    pub scale: ProgressScale,
    pub ranking: Page<RankedEntry>,
}

impl MetricsReport {
    /// Runs the whole pipeline over `records`. The bucketed half only sees
    /// records inside the generated intervals; the ranking covers every
    /// record passed in.
    pub fn compute<R: Record, Tz: TimeZone>(
        records: &[R],
        request: &ReportRequest<Tz>,
    ) -> Result<Self> {
        let intervals =
            build_intervals(request.granularity, &request.reference, request.bucket_count)?;
        let counts = count_buckets(records, &intervals);
        let trend = derive_trend(&counts);
        let scale = progress_scale(&counts);
        let ranking = paginate(
            &rank(records),
            request.ranking_page,
            request.ranking_page_size,
        )?;

        Ok(MetricsReport {
            granularity: request.granularity,
            intervals,
            counts,
            trend,
            scale,
            ranking,
        })
    }
}
