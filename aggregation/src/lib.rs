//! Time-bucketed metrics aggregation for the device dashboard.
//!
//! Everything here is a pure function of an in-memory record snapshot: build
//! the time windows for a view, count records into them, derive the trend and
//! progress-bar scale, and rank/paginate category labels. Hosts own the
//! snapshot and re-run the pipeline whenever it changes.

mod bucket;
mod error;
mod interval;
mod page;
mod rank;
mod record;
mod report;

pub use bucket::{
    ChangePercent, ProgressScale, TICK_DIVISIONS, TrendStat, count_buckets, derive_trend,
    progress_scale,
};
pub use error::{AggregationError, Result};
pub use interval::{Granularity, Interval, build_intervals};
pub use page::{Page, page_size_for, paginate};
pub use rank::{RankedEntry, rank};
pub use record::Record;
pub use report::{DEFAULT_BUCKET_COUNT, DEFAULT_RANKING_PAGE_SIZE, MetricsReport, ReportRequest};
