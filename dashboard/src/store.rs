use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;

use aggregation::Record;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::StoreError;
use crate::paths::{DEVICES_FILE, PREDICTIONS_FILE, SURVEY_ENTRIES_FILE};
use crate::storage;
use crate::survey::{SurveyEntry, SurveyFields};

const PASSWORD_SYMBOLS: &str = "@#$%^&*!";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    pub device_id: String,
    pub device_password: String,
    #[serde(default)]
    pub claimed: bool,
    #[serde(default)]
    pub user_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Device {
    fn password_matches(&self, password: &str) -> bool {
        self.device_password == password
    }
}

/// One keyword prediction reported by a device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prediction {
    pub id: u64,
    pub device_id: String,
    #[serde(default)]
    pub predicted_label: Option<String>,
    /// Model that produced the label; empty for rows stored before it was tracked.
    #[serde(default)]
    pub model_type: String,
    pub created_at: DateTime<Utc>,
}

impl Record for Prediction {
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn category_label(&self) -> Option<&str> {
        self.predicted_label.as_deref()
    }
}

/// The host-owned snapshot of devices, predictions and survey entries.
///
/// Every mutation runs to completion under the caller's write lock, so readers
/// aggregating under a read lock always see a whole snapshot.
pub struct RecordStore {
    devices: HashMap<String, Device>,
    predictions: VecDeque<Prediction>,
    next_prediction_id: u64,
    survey_entries: Vec<SurveyEntry>,
    next_survey_id: u64,
    retention: Duration,
    data_dir: PathBuf,
}

impl RecordStore {
    pub fn open(data_dir: PathBuf, retention: Duration) -> Self {
        let devices: HashMap<String, Device> =
            match storage::load_lines::<Device>(&data_dir.join(DEVICES_FILE)) {
                Ok(devices) => devices
                    .into_iter()
                    .map(|d| (d.device_id.clone(), d))
                    .collect(),
                Err(e) => {
                    warn!("failed to load devices: {e}");
                    HashMap::new()
                }
            };

        let predictions: VecDeque<Prediction> =
            match storage::load_lines::<Prediction>(&data_dir.join(PREDICTIONS_FILE)) {
                Ok(predictions) => predictions.into(),
                Err(e) => {
                    warn!("failed to load predictions: {e}");
                    VecDeque::new()
                }
            };
        let next_prediction_id = predictions.iter().map(|p| p.id + 1).max().unwrap_or(1);

        let survey_entries =
            match storage::load_lines::<SurveyEntry>(&data_dir.join(SURVEY_ENTRIES_FILE)) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!("failed to load survey entries: {e}");
                    Vec::new()
                }
            };
        let next_survey_id = survey_entries.iter().map(|e| e.id + 1).max().unwrap_or(1);

        info!(
            devices = devices.len(),
            predictions = predictions.len(),
            survey_entries = survey_entries.len(),
            "loaded record store"
        );

        RecordStore {
            devices,
            predictions,
            next_prediction_id,
            survey_entries,
            next_survey_id,
            retention,
            data_dir,
        }
    }

    /// Adds an unclaimed device. Id and password are trimmed and must use the
    /// allowed character sets.
    pub fn register_device(&mut self, device_id: &str, password: &str) -> Result<&Device, StoreError> {
        let device_id = device_id.trim();
        let password = password.trim();
        if !is_valid_device_id(device_id) {
            return Err(StoreError::InvalidDeviceId);
        }
        if !is_valid_device_password(password) {
            return Err(StoreError::InvalidDevicePassword);
        }
        if self.devices.contains_key(device_id) {
            return Err(StoreError::DeviceExists {
                device_id: device_id.to_owned(),
            });
        }

        let device = Device {
            device_id: device_id.to_owned(),
            device_password: password.to_owned(),
            claimed: false,
            user_id: None,
            created_at: Utc::now(),
        };
        if let Err(e) = storage::append_line(&self.devices_path(), &device) {
            warn!(device_id, "failed to persist device: {e}");
        }
        info!(device_id, "registered device");

        Ok(self.devices.entry(device_id.to_owned()).or_insert(device))
    }

    /// Claims an unclaimed device for `user_id`. A wrong id and a wrong
    /// password are indistinguishable to the caller.
    pub fn link_device(
        &mut self,
        user_id: &str,
        device_id: &str,
        password: &str,
    ) -> Result<&Device, StoreError> {
        let device = self
            .devices
            .get_mut(device_id.trim())
            .filter(|d| d.password_matches(password.trim()))
            .ok_or(StoreError::DeviceNotFound)?;
        if device.claimed {
            return Err(StoreError::AlreadyClaimed);
        }
        device.claimed = true;
        device.user_id = Some(user_id.to_owned());
        let device_id = device.device_id.clone();

        self.persist_devices();
        info!(device_id, user_id, "linked device");

        self.devices
            .get(&device_id)
            .ok_or(StoreError::DeviceNotFound)
    }

    /// Stores a prediction from an authenticated device. Label and model type
    /// are checked before the device; `client_timestamp` defaults to now.
    pub fn record_prediction(
        &mut self,
        device_id: &str,
        password: &str,
        predicted_label: &str,
        model_type: &str,
        client_timestamp: Option<DateTime<Utc>>,
    ) -> Result<&Prediction, StoreError> {
        let predicted_label = predicted_label.trim();
        if predicted_label.is_empty() {
            return Err(StoreError::EmptyLabel);
        }
        let model_type = model_type.trim();
        if model_type.is_empty() {
            return Err(StoreError::MissingModelType);
        }
        let device = self
            .devices
            .get(device_id.trim())
            .ok_or(StoreError::DeviceNotFound)?;
        if !device.password_matches(password.trim()) {
            return Err(StoreError::InvalidCredentials);
        }

        let prediction = Prediction {
            id: self.next_prediction_id,
            device_id: device.device_id.clone(),
            predicted_label: Some(predicted_label.to_owned()),
            model_type: model_type.to_owned(),
            created_at: client_timestamp.unwrap_or_else(Utc::now),
        };
        self.next_prediction_id += 1;

        if let Err(e) = storage::append_line(&self.predictions_path(), &prediction) {
            warn!(device_id = %prediction.device_id, "failed to persist prediction: {e}");
        }
        debug!(
            device_id = %prediction.device_id,
            label = predicted_label,
            model_type,
            "recorded prediction"
        );

        let idx = self.predictions.len();
        self.predictions.push_back(prediction);
        Ok(&self.predictions[idx])
    }

    /// Stores a validated survey row for `user_id`.
    pub fn record_survey_entry(&mut self, user_id: &str, fields: SurveyFields) -> &SurveyEntry {
        let entry = SurveyEntry {
            id: self.next_survey_id,
            user_id: user_id.to_owned(),
            school: fields.school,
            sex: fields.sex,
            age: fields.age,
            weekend_alcohol_level: fields.weekend_alcohol_level,
            final_grade: fields.final_grade,
            absences: fields.absences,
            created_at: Utc::now(),
        };
        self.next_survey_id += 1;

        if let Err(e) = storage::append_line(&self.survey_entries_path(), &entry) {
            warn!(user_id, "failed to persist survey entry: {e}");
        }
        debug!(user_id, id = entry.id, "recorded survey entry");

        let idx = self.survey_entries.len();
        self.survey_entries.push(entry);
        &self.survey_entries[idx]
    }

    /// Survey rows entered by `user_id`, oldest first.
    pub fn survey_entries_for_user(&self, user_id: &str) -> Vec<&SurveyEntry> {
        self.survey_entries
            .iter()
            .filter(|e| e.user_id == user_id)
            .collect()
    }

    pub fn device(&self, device_id: &str) -> Option<&Device> {
        self.devices.get(device_id)
    }

    /// Devices claimed by `user_id`, oldest registration first.
    pub fn devices_for_user(&self, user_id: &str) -> Vec<&Device> {
        let mut devices: Vec<&Device> = self
            .devices
            .values()
            .filter(|d| d.user_id.as_deref() == Some(user_id))
            .collect();
        devices.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.device_id.cmp(&b.device_id))
        });
        devices
    }

    /// Predictions for a device, optionally limited to `[start, end)`.
    pub fn predictions_for_device(
        &self,
        device_id: &str,
        range: Option<(DateTime<Utc>, DateTime<Utc>)>,
    ) -> Vec<&Prediction> {
        self.predictions
            .iter()
            .filter(|p| p.device_id == device_id)
            .filter(|p| range.is_none_or(|(start, end)| start <= p.created_at && p.created_at < end))
            .collect()
    }

    /// The newest `limit` predictions for a device, newest first.
    pub fn recent_predictions(&self, device_id: &str, limit: usize) -> Vec<&Prediction> {
        let mut recent = self.predictions_for_device(device_id, None);
        recent.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        recent.truncate(limit);
        recent
    }

    /// Drops predictions older than the retention window and rewrites the
    /// predictions file if anything was removed. Returns the number removed.
    pub fn prune(&mut self, now: DateTime<Utc>) -> usize {
        let cutoff = now - self.retention;
        let before = self.predictions.len();
        self.predictions.retain(|p| p.created_at >= cutoff);
        let removed = before - self.predictions.len();

        if removed > 0 {
            if let Err(e) = storage::rewrite_lines(&self.predictions_path(), self.predictions.iter()) {
                warn!("failed to rewrite predictions: {e}");
            }
            info!(removed, "pruned expired predictions");
        }
        removed
    }

    fn persist_devices(&self) {
        if let Err(e) = storage::rewrite_lines(&self.devices_path(), self.devices.values()) {
            warn!("failed to rewrite devices: {e}");
        }
    }

    fn devices_path(&self) -> PathBuf {
        self.data_dir.join(DEVICES_FILE)
    }

    fn predictions_path(&self) -> PathBuf {
        self.data_dir.join(PREDICTIONS_FILE)
    }

    fn survey_entries_path(&self) -> PathBuf {
        self.data_dir.join(SURVEY_ENTRIES_FILE)
    }
}

fn is_valid_device_id(id: &str) -> bool {
    !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric())
}

fn is_valid_device_password(password: &str) -> bool {
    !password.is_empty()
        && password
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || PASSWORD_SYMBOLS.contains(c))
}
