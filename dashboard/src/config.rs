//! Behavioral constants for data retention, pruning, and metrics views.

use chrono::Duration;

pub const PREDICTION_RETENTION: Duration = Duration::days(90);
pub const PRUNE_INTERVAL: std::time::Duration = std::time::Duration::from_secs(3600);

pub const METRICS_BUCKET_COUNT: usize = 5;
pub const TOP_WORDS_PAGE_SIZE: usize = 5;
pub const RECENT_PREDICTIONS_LIMIT: usize = 10;

/// Viewport width assumed by the device list when the client sends none.
pub const DEFAULT_VIEWPORT_WIDTH: u32 = 1280;
