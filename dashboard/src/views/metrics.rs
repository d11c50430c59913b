use std::sync::Arc;

use aggregation::{Granularity, MetricsReport, Page, RankedEntry, TrendStat};
use axum::extract::{Query, State};
use maud::{Markup, html};
use tracing::debug;

use crate::charts;
use crate::error::ApiError;
use crate::metrics::{MetricsQuery, MetricsView, build_metrics_view};
use crate::routes::UserId;
use crate::state::AppState;

use super::page_shell;

pub async fn metrics_page(
    State(state): State<Arc<AppState>>,
    UserId(user_id): UserId,
    Query(query): Query<MetricsQuery>,
) -> Result<Markup, ApiError> {
    let view = build_metrics_view(&state, &user_id, &query)?;
    debug!(user_id = %user_id, device = ?view.selected_device, "{}", summarize(&view.report));
    Ok(page_shell("Metrics | BetterHealth", render_metrics(&view)))
}

fn render_metrics(view: &MetricsView) -> Markup {
    let report = &view.report;
    html! {
        h1 { "Metrics" }
        (render_device_selector(view))

        @if view.selected_device.is_none() {
            p { "No devices linked to your account." }
        }

        section {
            h2 { "Response Statistics" }
            (render_trend(&report.trend))
            (render_granularity_selector(report.granularity))
            (charts::render_progress_bars(&report.intervals, &report.counts, &report.scale))
        }

        section {
            h2 { "Top Words" }
            (render_ranking(&report.ranking))
        }
    }
}

fn render_device_selector(view: &MetricsView) -> Markup {
    html! {
        nav.devices {
            "Devices: "
            @if view.devices.is_empty() {
                "No devices found"
            }
            @for device in &view.devices {
                @let active = view.selected_device.as_deref() == Some(device.device_id.as_str());
                a href=(format!("/?device={}", device.device_id)) aria-current=[active.then_some("true")] {
                    (device.device_id)
                }
                " "
            }
        }
    }
}

fn render_granularity_selector(active: Granularity) -> Markup {
    html! {
        nav.granularity {
            @for granularity in Granularity::ALL {
                a href=(format!("/?view={granularity}"))
                    aria-current=[(granularity == active).then_some("true")]
                {
                    (granularity)
                }
                " "
            }
        }
    }
}

fn render_trend(trend: &TrendStat) -> Markup {
    let colour = if trend.change_percent.is_decrease() {
        "var(--decrease)"
    } else {
        "var(--increase)"
    };
    html! {
        p.trend {
            strong { (trend.current_count) }
            " "
            span style=(format!("color: {colour}")) { (trend.change_percent) }
        }
    }
}

fn render_ranking(page: &Page<RankedEntry>) -> Markup {
    html! {
        @if page.items.is_empty() {
            p { "No data found" }
        } @else {
            table {
                thead {
                    tr { th { "Rank" } th { "Word" } th { "Count" } }
                }
                tbody {
                    @for (idx, entry) in page.items.iter().enumerate() {
                        tr {
                            td { (page.offset + idx + 1) }
                            td { (entry.label) }
                            td { (entry.count) }
                        }
                    }
                }
            }
        }
        @if page.total_pages > 1 {
            nav.pagination {
                @for number in 1..=page.total_pages {
                    a href=(format!("/?page={number}"))
                        aria-current=[(number == page.page_number).then_some("page")]
                    {
                        (number)
                    }
                    " "
                }
            }
        }
    }
}

/// One-line plain-text summary of a report.
pub fn summarize(report: &MetricsReport) -> String {
    let buckets: Vec<String> = report
        .intervals
        .iter()
        .zip(&report.counts)
        .map(|(interval, count)| format!("{}={count}", interval.label))
        .collect();
    format!(
        "{} [{}] current={} change={}",
        report.granularity,
        buckets.join(", "),
        report.trend.current_count,
        report.trend.change_percent
    )
}

#[cfg(test)]
mod tests {
    use aggregation::ReportRequest;
    use chrono::{DateTime, TimeZone, Utc};

    use super::*;
    use crate::metrics::DeviceSummary;
    use crate::view_state::ViewState;

    struct Row(DateTime<Utc>, &'static str);

    impl aggregation::Record for Row {
        fn created_at(&self) -> DateTime<Utc> {
            self.0
        }

        fn category_label(&self) -> Option<&str> {
            Some(self.1)
        }
    }

    fn view_with(records: &[Row]) -> MetricsView {
        let reference = Utc.with_ymd_and_hms(2025, 3, 10, 10, 30, 0).unwrap();
        let mut request = ReportRequest::new(Granularity::Hour, reference);
        request.ranking_page_size = 1;
        MetricsView {
            selected_device: Some("sensor01".to_owned()),
            devices: vec![DeviceSummary {
                device_id: "sensor01".to_owned(),
                claimed: true,
                created_at: reference,
            }],
            view: ViewState::default(),
            report: MetricsReport::compute(records, &request).unwrap(),
        }
    }

    #[test]
    fn page_lists_trend_ranking_and_pagination() {
        let at = |h, m| Utc.with_ymd_and_hms(2025, 3, 10, h, m, 0).unwrap();
        let view = view_with(&[Row(at(9, 15), "fire"), Row(at(9, 50), "fire"), Row(at(10, 5), "smoke")]);
        let html = render_metrics(&view).into_string();

        assert!(html.contains("-50.00%"));
        assert!(html.contains("<td>fire</td>"));
        assert!(!html.contains("<td>smoke</td>"));
        assert!(html.contains("href=\"/?page=2\""));
        assert_eq!(
            summarize(&view.report),
            "hour [6:00 AM=0, 7:00 AM=0, 8:00 AM=0, 9:00 AM=2, 10:00 AM=1] current=1 change=-50.00%"
        );
    }

    #[test]
    fn empty_report_renders_placeholders() {
        let html = render_metrics(&view_with(&[])).into_string();
        assert!(html.contains("No data found"));
        assert!(html.contains("+0.00%"));
        assert!(!html.contains("class=\"pagination\""));
    }
}
