use std::path::PathBuf;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::FixedOffset;
use shared::config::DashboardConfig;

use crate::config::PREDICTION_RETENTION;
use crate::paths::VIEW_STATE_DIR;
use crate::store::RecordStore;

pub struct AppState {
    store: RwLock<RecordStore>,
    pub view_state_dir: PathBuf,
    pub display_offset: FixedOffset,
}

impl AppState {
    pub fn new(config: &DashboardConfig) -> Self {
        AppState {
            store: RwLock::new(RecordStore::open(
                config.data_dir.clone(),
                PREDICTION_RETENTION,
            )),
            view_state_dir: config.data_dir.join(VIEW_STATE_DIR),
            display_offset: config.display_offset,
        }
    }

    // Store mutations validate before touching state, so a poisoned lock
    // still guards a whole snapshot.
    pub fn store(&self) -> RwLockReadGuard<'_, RecordStore> {
        self.store.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn store_mut(&self) -> RwLockWriteGuard<'_, RecordStore> {
        self.store.write().unwrap_or_else(PoisonError::into_inner)
    }
}
