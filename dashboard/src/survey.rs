//! Manually entered student survey rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sex {
    F,
    M,
}

/// One survey row, owned by the user who entered it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurveyEntry {
    pub id: u64,
    pub user_id: String,
    #[serde(default)]
    pub school: Option<String>,
    pub sex: Sex,
    pub age: f64,
    pub weekend_alcohol_level: f64,
    pub final_grade: f64,
    pub absences: f64,
    pub created_at: DateTime<Utc>,
}

/// Survey form as submitted. Numeric fields accept JSON numbers or numeric
/// strings.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyForm {
    #[serde(default)]
    pub school: Option<String>,
    #[serde(default)]
    pub sex: Option<Value>,
    #[serde(default)]
    pub age: Option<Value>,
    #[serde(default)]
    pub weekend_alcohol_level: Option<Value>,
    #[serde(default)]
    pub final_grade: Option<Value>,
    #[serde(default)]
    pub absences: Option<Value>,
}

/// A validated [`SurveyForm`], ready to be stored.
#[derive(Debug, Clone, PartialEq)]
pub struct SurveyFields {
    pub school: Option<String>,
    pub sex: Sex,
    pub age: f64,
    pub weekend_alcohol_level: f64,
    pub final_grade: f64,
    pub absences: f64,
}

impl SurveyForm {
    pub fn validate(&self) -> Result<SurveyFields, StoreError> {
        let sex = match self.sex.as_ref().and_then(Value::as_str).map(str::trim) {
            Some("F") => Sex::F,
            Some("M") => Sex::M,
            _ => return Err(StoreError::InvalidSex),
        };

        Ok(SurveyFields {
            school: self
                .school
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_owned),
            sex,
            age: number("age", self.age.as_ref())?,
            weekend_alcohol_level: number(
                "weekendAlcoholLevel",
                self.weekend_alcohol_level.as_ref(),
            )?,
            final_grade: number("finalGrade", self.final_grade.as_ref())?,
            absences: number("absences", self.absences.as_ref())?,
        })
    }
}

fn number(field: &'static str, value: Option<&Value>) -> Result<f64, StoreError> {
    let parsed = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed
        .filter(|n| n.is_finite())
        .ok_or(StoreError::InvalidSurveyNumber { field })
}
