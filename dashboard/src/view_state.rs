//! Per-user view controls (selected device, granularity, ranking page),
//! persisted as TOML so they survive reloads.

use std::fs;
use std::io;
use std::path::Path;

use aggregation::Granularity;
use serde::{Deserialize, Serialize};

use crate::storage;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ViewState {
    #[serde(default)]
    pub selected_device: Option<String>,
    #[serde(default)]
    pub granularity: Granularity,
    #[serde(default = "first_page")]
    pub top_words_page: usize,
}

fn first_page() -> usize {
    1
}

impl Default for ViewState {
    fn default() -> Self {
        ViewState {
            selected_device: None,
            granularity: Granularity::default(),
            top_words_page: first_page(),
        }
    }
}

impl ViewState {
    /// Applies the controls a request supplied. Selecting a different device
    /// starts its ranking from the first page unless a page was also given.
    /// Returns whether anything changed.
    pub fn apply(
        &mut self,
        device: Option<&str>,
        granularity: Option<Granularity>,
        page: Option<usize>,
    ) -> bool {
        let mut changed = false;
        if let Some(device) = device.filter(|d| self.selected_device.as_deref() != Some(*d)) {
            self.selected_device = Some(device.to_owned());
            self.top_words_page = first_page();
            changed = true;
        }
        if let Some(granularity) = granularity.filter(|g| *g != self.granularity) {
            self.granularity = granularity;
            changed = true;
        }
        if let Some(page) = page.filter(|p| *p != self.top_words_page) {
            self.top_words_page = page;
            changed = true;
        }
        changed
    }
}

/// Loads a user's view state. Returns `ViewState::default()` if the file
/// doesn't exist; propagates other I/O and parse errors.
pub fn load(dir: &Path, user_id: &str) -> io::Result<ViewState> {
    let path = dir.join(format!("{}.toml", storage::sanitize_key(user_id)));
    match fs::read_to_string(&path) {
        Ok(content) => {
            toml::from_str(&content).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(ViewState::default()),
        Err(e) => Err(e),
    }
}

pub fn save(dir: &Path, user_id: &str, state: &ViewState) -> io::Result<()> {
    fs::create_dir_all(dir)?;
    let path = dir.join(format!("{}.toml", storage::sanitize_key(user_id)));
    let content =
        toml::to_string_pretty(state).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    fs::write(&path, content)
}
