//! File and directory names under the configured data directory.

pub const DEVICES_FILE: &str = "devices.jsonl";
pub const PREDICTIONS_FILE: &str = "predictions.jsonl";
pub const SURVEY_ENTRIES_FILE: &str = "student-entries.jsonl";
pub const VIEW_STATE_DIR: &str = "view-state";
