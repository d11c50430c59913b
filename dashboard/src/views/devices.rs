use std::sync::Arc;

use aggregation::{Page, page_size_for, paginate};
use axum::extract::{Path, Query, State};
use chrono::FixedOffset;
use maud::{Markup, html};
use serde::Deserialize;

use crate::config::{DEFAULT_VIEWPORT_WIDTH, RECENT_PREDICTIONS_LIMIT};
use crate::error::ApiError;
use crate::metrics::DeviceSummary;
use crate::routes::UserId;
use crate::state::AppState;
use crate::store::{Device, Prediction};

use super::page_shell;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Deserialize)]
pub struct DeviceListQuery {
    width: Option<u32>,
    page: Option<usize>,
}

pub async fn device_list(
    State(state): State<Arc<AppState>>,
    UserId(user_id): UserId,
    Query(query): Query<DeviceListQuery>,
) -> Result<Markup, ApiError> {
    let devices: Vec<DeviceSummary> = state
        .store()
        .devices_for_user(&user_id)
        .into_iter()
        .map(DeviceSummary::from)
        .collect();

    let width = query.width.unwrap_or(DEFAULT_VIEWPORT_WIDTH);
    let page = paginate(&devices, query.page.unwrap_or(1), page_size_for(width))?;

    Ok(page_shell(
        "My Devices | BetterHealth",
        render_device_list(&page, width, state.display_offset),
    ))
}

fn render_device_list(page: &Page<DeviceSummary>, width: u32, offset: FixedOffset) -> Markup {
    html! {
        h1 { "My Devices" }
        @if page.total_pages == 0 {
            p { "No devices linked to your account." }
        } @else if page.items.is_empty() {
            p {
                "No devices on this page. "
                a href=(format!("/devices?width={width}&page=1")) { "Back to the first page" }
            }
        }
        ul.devices {
            @for device in &page.items {
                li {
                    a href=(format!("/devices/{}", device.device_id)) {
                        "Device ID: " (device.device_id)
                    }
                    p {
                        "Registered on: "
                        (device.created_at.with_timezone(&offset).format(TIMESTAMP_FORMAT))
                    }
                    p {
                        "Status: " (if device.claimed { "Linked" } else { "Unclaimed" })
                    }
                }
            }
        }
        @if page.total_pages > 1 {
            nav.pagination {
                @if page.has_previous() {
                    a href=(format!("/devices?width={width}&page={}", page.page_number - 1)) {
                        "Older Devices"
                    }
                }
                " "
                @if page.has_next() {
                    a href=(format!("/devices?width={width}&page={}", page.page_number + 1)) {
                        "Newer Devices"
                    }
                }
            }
        }
    }
}

pub async fn device_detail(
    Path(device_id): Path<String>,
    State(state): State<Arc<AppState>>,
    UserId(user_id): UserId,
) -> Result<Markup, ApiError> {
    let store = state.store();
    let device = store
        .device(&device_id)
        .filter(|d| d.user_id.as_deref() == Some(user_id.as_str()))
        .ok_or(ApiError::NotFound)?;
    let recent = store.recent_predictions(&device_id, RECENT_PREDICTIONS_LIMIT);

    let content = render_device_detail(device, &recent, state.display_offset);
    drop(store);

    Ok(page_shell(&format!("{device_id} | BetterHealth"), content))
}

fn render_device_detail(device: &Device, recent: &[&Prediction], offset: FixedOffset) -> Markup {
    html! {
        table.device {
            thead {
                tr { th { "Device ID" } th { "User ID" } }
            }
            tbody {
                tr {
                    td { (device.device_id) }
                    td { (device.user_id.as_deref().unwrap_or("-")) }
                }
            }
        }

        @if recent.is_empty() {
            p { "No predictions yet." }
        } @else {
            table.predictions {
                thead {
                    tr { th { "Predicted Label" } th { "Created At" } }
                }
                tbody {
                    @for prediction in recent {
                        tr {
                            td { (prediction.predicted_label.as_deref().unwrap_or("-")) }
                            td { (prediction.created_at.with_timezone(&offset).format(TIMESTAMP_FORMAT)) }
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, TimeZone, Utc};

    use super::*;

    fn summary(id: &str) -> DeviceSummary {
        DeviceSummary {
            device_id: id.to_owned(),
            claimed: true,
            created_at: Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap(),
        }
    }

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    #[test]
    fn device_list_pages_by_viewport_width() {
        let devices: Vec<DeviceSummary> = ["a", "b", "c", "d", "e"].map(summary).to_vec();

        // 800px → two per page
        let page = paginate(&devices, 2, page_size_for(800)).unwrap();
        let html = render_device_list(&page, 800, utc()).into_string();
        assert!(html.contains("Device ID: c"));
        assert!(html.contains("Device ID: d"));
        assert!(!html.contains("Device ID: e"));
        assert!(html.contains("href=\"/devices?width=800&amp;page=1\""));
        assert!(html.contains("href=\"/devices?width=800&amp;page=3\""));

        // 1280px → four per page, last page has no newer link
        let page = paginate(&devices, 2, page_size_for(1280)).unwrap();
        let html = render_device_list(&page, 1280, utc()).into_string();
        assert!(html.contains("Device ID: e"));
        assert!(html.contains("Older Devices"));
        assert!(!html.contains("Newer Devices"));
    }

    #[test]
    fn single_page_hides_navigation() {
        let devices = vec![summary("a")];
        let page = paginate(&devices, 1, page_size_for(1024)).unwrap();
        let html = render_device_list(&page, 1024, utc()).into_string();
        assert!(html.contains("Registered on: 2025-03-01 12:00:00"));
        assert!(!html.contains("Older Devices"));
    }

    #[test]
    fn page_past_the_end_links_back_to_the_first() {
        let devices = vec![summary("a"), summary("b")];
        let page = paginate(&devices, 5, page_size_for(800)).unwrap();
        let html = render_device_list(&page, 800, utc()).into_string();
        assert!(!html.contains("No devices linked"));
        assert!(html.contains("href=\"/devices?width=800&amp;page=1\""));

        let empty: Vec<DeviceSummary> = Vec::new();
        let page = paginate(&empty, 1, page_size_for(800)).unwrap();
        let html = render_device_list(&page, 800, utc()).into_string();
        assert!(html.contains("No devices linked to your account."));
    }

    #[test]
    fn detail_lists_recent_predictions_in_local_time() {
        let at: DateTime<Utc> = Utc.with_ymd_and_hms(2025, 3, 10, 9, 15, 0).unwrap();
        let device = Device {
            device_id: "sensor01".to_owned(),
            device_password: "secret".to_owned(),
            claimed: true,
            user_id: Some("alice".to_owned()),
            created_at: at,
        };
        let prediction = Prediction {
            id: 1,
            device_id: "sensor01".to_owned(),
            predicted_label: Some("fire".to_owned()),
            model_type: "kws".to_owned(),
            created_at: at,
        };

        let offset = FixedOffset::east_opt(2 * 3600).unwrap();
        let html = render_device_detail(&device, &[&prediction], offset).into_string();
        assert!(html.contains("<td>alice</td>"));
        assert!(html.contains("<td>fire</td>"));
        assert!(html.contains("2025-03-10 11:15:00"));
        assert!(!html.contains("secret"));
    }
}
