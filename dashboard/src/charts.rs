use aggregation::{Interval, ProgressScale};
use maud::{Markup, html};

const WIDTH: f64 = 600.0;
const MARGIN_LEFT: f64 = 80.0;
const MARGIN_RIGHT: f64 = 20.0;
const MARGIN_TOP: f64 = 10.0;
const MARGIN_BOTTOM: f64 = 24.0;
const ROW_HEIGHT: f64 = 28.0;
const BAR_HEIGHT: f64 = 14.0;

const TEXT_STYLE: &str = "fill: var(--foreground); font-family: inherit";
const SVG_CONTAINER_STYLE: &str = "width:100%;height:auto";

/// One horizontal bar per interval, filled to the scale's normalized value,
/// with the tick marks along the bottom.
pub fn render_progress_bars(intervals: &[Interval], counts: &[u64], scale: &ProgressScale) -> Markup {
    let chart_w = WIDTH - MARGIN_LEFT - MARGIN_RIGHT;
    let height = MARGIN_TOP + ROW_HEIGHT * intervals.len() as f64 + MARGIN_BOTTOM;
    let tick_y = height - 6.0;
    let last_tick = scale.tick_marks.len().saturating_sub(1).max(1) as f64;

    html! {
        svg viewBox=(format!("0 0 {WIDTH} {height}")) xmlns="http://www.w3.org/2000/svg" style=(SVG_CONTAINER_STYLE) {
            rect width=(WIDTH) height=(height) style="fill: var(--background)" {}
            @for (i, interval) in intervals.iter().enumerate() {
                @let row_y = MARGIN_TOP + i as f64 * ROW_HEIGHT;
                @let bar_y = row_y + (ROW_HEIGHT - BAR_HEIGHT) / 2.0;
                @let value = scale.values.get(i).copied().unwrap_or(0.0);
                @let count = counts.get(i).copied().unwrap_or(0);
                text x=(MARGIN_LEFT - 8.0) y=(bar_y + BAR_HEIGHT - 2.0) font-size="11" text-anchor="end" style=(TEXT_STYLE) {
                    (interval.label)
                }
                rect x=(MARGIN_LEFT) y=(bar_y) width=(chart_w) height=(BAR_HEIGHT) rx="4" style="fill: var(--muted)" {}
                rect x=(MARGIN_LEFT) y=(bar_y) width=(chart_w * value / 100.0) height=(BAR_HEIGHT) rx="4" style="fill: var(--accent)" {
                    title { (interval.label) ": " (count) }
                }
            }
            @for (i, tick) in scale.tick_marks.iter().enumerate() {
                @let x = MARGIN_LEFT + i as f64 / last_tick * chart_w;
                @let anchor = match i {
                    0 => "start",
                    i if i == scale.tick_marks.len() - 1 => "end",
                    _ => "middle",
                };
                text x=(x) y=(tick_y) font-size="10" text-anchor=(anchor) style=(TEXT_STYLE) {
                    (tick)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use aggregation::{Granularity, build_intervals, progress_scale};
    use chrono::{TimeZone, Utc};

    use super::*;

    #[test]
    fn renders_a_bar_and_label_per_interval() {
        let reference = Utc.with_ymd_and_hms(2025, 3, 10, 10, 30, 0).unwrap();
        let intervals = build_intervals(Granularity::Hour, &reference, 5).unwrap();
        let counts = [0, 0, 0, 2, 1];
        let svg = render_progress_bars(&intervals, &counts, &progress_scale(&counts)).into_string();

        assert_eq!(svg.matches("<title>").count(), 5);
        assert!(svg.contains("10:00 AM: 1"));
        // max 2 → tick interval 1, largest tick 4, so the 2-count bar is half full
        assert!(svg.contains(&format!("width=\"{}\"", 500.0 * 0.5)));
    }
}
