use aggregation::{Granularity, MetricsReport, ReportRequest};
use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::{METRICS_BUCKET_COUNT, TOP_WORDS_PAGE_SIZE};
use crate::error::ApiError;
use crate::state::AppState;
use crate::store::Device;
use crate::view_state::{self, ViewState};

/// View controls a metrics request may carry. Anything omitted falls back to
/// the user's persisted [`ViewState`].
#[derive(Debug, Default, Deserialize)]
pub struct MetricsQuery {
    pub device: Option<String>,
    pub view: Option<String>,
    pub page: Option<usize>,
    /// Reference instant; defaults to now in the display offset.
    pub at: Option<DateTime<FixedOffset>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeviceSummary {
    pub device_id: String,
    pub claimed: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&Device> for DeviceSummary {
    fn from(device: &Device) -> Self {
        DeviceSummary {
            device_id: device.device_id.clone(),
            claimed: device.claimed,
            created_at: device.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsView {
    pub selected_device: Option<String>,
    pub devices: Vec<DeviceSummary>,
    pub view: ViewState,
    pub report: MetricsReport,
}

/// Resolves the user's view controls, runs one aggregation pass over the
/// selected device's predictions and persists the controls that were used.
///
/// Controls are only persisted once the pass succeeds, so a bad `view` or
/// `page` never sticks.
pub fn build_metrics_view(
    state: &AppState,
    user_id: &str,
    query: &MetricsQuery,
) -> Result<MetricsView, ApiError> {
    let mut view = view_state::load(&state.view_state_dir, user_id).unwrap_or_else(|e| {
        warn!(user_id, "failed to load view state: {e}");
        ViewState::default()
    });
    let granularity = query
        .view
        .as_deref()
        .map(str::parse::<Granularity>)
        .transpose()?;
    let mut changed = view.apply(query.device.as_deref(), granularity, query.page);

    let store = state.store();
    let devices: Vec<DeviceSummary> = store
        .devices_for_user(user_id)
        .into_iter()
        .map(DeviceSummary::from)
        .collect();

    let owned = |id: &str| devices.iter().any(|d| d.device_id == id);
    let selected_device = match view.selected_device.as_deref() {
        Some(id) if owned(id) => Some(id.to_owned()),
        Some(_) if query.device.is_some() => return Err(ApiError::NotFound),
        // Stale selection (device unlinked) or nothing chosen yet.
        _ => devices.first().map(|d| d.device_id.clone()),
    };
    if selected_device != view.selected_device {
        view.selected_device = selected_device.clone();
        changed = true;
    }

    let records = selected_device
        .as_deref()
        .map(|id| store.predictions_for_device(id, None))
        .unwrap_or_default();
    let reference = query
        .at
        .unwrap_or_else(|| Utc::now().with_timezone(&state.display_offset));

    let mut request = ReportRequest::new(view.granularity, reference);
    request.bucket_count = METRICS_BUCKET_COUNT;
    request.ranking_page = view.top_words_page;
    request.ranking_page_size = TOP_WORDS_PAGE_SIZE;
    let report = MetricsReport::compute(&records, &request)?;
    drop(store);

    if changed {
        if let Err(e) = view_state::save(&state.view_state_dir, user_id, &view) {
            warn!(user_id, "failed to save view state: {e}");
        }
    }

    Ok(MetricsView {
        selected_device,
        devices,
        view,
        report,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use aggregation::ChangePercent;
    use chrono::TimeZone;
    use shared::config::DashboardConfig;

    use super::*;

    pub(crate) fn test_state(dir: &tempfile::TempDir) -> AppState {
        AppState::new(&DashboardConfig {
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            data_dir: dir.path().to_path_buf(),
            display_offset: FixedOffset::east_opt(0).unwrap(),
        })
    }

    fn seed(state: &AppState) {
        let mut store = state.store_mut();
        store.register_device("sensor01", "secret").unwrap();
        store.register_device("sensor02", "secret").unwrap();
        store.link_device("alice", "sensor01", "secret").unwrap();
        for (h, m, label) in [(9, 15, "fire"), (9, 50, "fire"), (10, 5, "smoke")] {
            let at = Utc.with_ymd_and_hms(2025, 3, 10, h, m, 0).unwrap();
            store
                .record_prediction("sensor01", "secret", label, "kws", Some(at))
                .unwrap();
        }
    }

    fn query_at(view: &str) -> MetricsQuery {
        MetricsQuery {
            view: Some(view.to_owned()),
            at: Some("2025-03-10T10:30:00Z".parse().unwrap()),
            ..MetricsQuery::default()
        }
    }

    #[test]
    fn defaults_to_the_first_owned_device() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir);
        seed(&state);

        let view = build_metrics_view(&state, "alice", &query_at("hour")).unwrap();
        assert_eq!(view.selected_device.as_deref(), Some("sensor01"));
        assert_eq!(view.report.counts, vec![0, 0, 0, 2, 1]);
        assert_eq!(
            view.report.trend.change_percent,
            ChangePercent::Percent(-50.0)
        );
        assert_eq!(view.report.ranking.items[0].label, "fire");
    }

    #[test]
    fn controls_persist_between_requests() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir);
        seed(&state);

        build_metrics_view(&state, "alice", &query_at("week")).unwrap();
        let later = MetricsQuery {
            at: Some("2025-03-10T10:30:00Z".parse().unwrap()),
            ..MetricsQuery::default()
        };
        let view = build_metrics_view(&state, "alice", &later).unwrap();
        assert_eq!(view.view.granularity, Granularity::Week);
        assert_eq!(view.report.counts.iter().sum::<u64>(), 3);
    }

    #[test]
    fn invalid_controls_are_rejected_and_not_saved() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir);
        seed(&state);

        let err = build_metrics_view(&state, "alice", &query_at("month")).unwrap_err();
        assert!(matches!(err, ApiError::Aggregation(_)));

        let mut bad_page = query_at("day");
        bad_page.page = Some(0);
        assert!(build_metrics_view(&state, "alice", &bad_page).is_err());
        let saved = view_state::load(&state.view_state_dir, "alice").unwrap();
        assert_eq!(saved, ViewState::default());
    }

    #[test]
    fn devices_of_other_users_are_hidden() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir);
        seed(&state);

        let mut query = query_at("hour");
        query.device = Some("sensor02".to_owned());
        let err = build_metrics_view(&state, "alice", &query).unwrap_err();
        assert!(matches!(err, ApiError::NotFound));

        let view = build_metrics_view(&state, "bob", &query_at("day")).unwrap();
        assert!(view.selected_device.is_none());
        assert_eq!(view.report.counts, vec![0; METRICS_BUCKET_COUNT]);
        assert!(view.report.ranking.items.is_empty());
    }
}
