//! Patient Models
//!
//! A patient is stored as one row per visit. The OPD id is assigned on the
//! first visit and carried unchanged by every later one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use std::str::FromStr;

/// Biological sex recorded at registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "patient_sex", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Sex {
    Male,
    Female,
    Other,
}

impl FromStr for Sex {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "male" => Ok(Sex::Male),
            "female" => Ok(Sex::Female),
            "other" => Ok(Sex::Other),
            other => Err(format!("unknown sex '{}'", other)),
        }
    }
}

/// Postal address; every part is optional
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Address {
    pub locality: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub pincode: Option<String>,
}

/// One visit of a patient
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct PatientVisit {
    pub id: i64,
    pub name: String,
    pub mobile: String,
    pub opd_id: String,
    pub age: i32,
    pub sex: Sex,
    #[sqlx(flatten)]
    pub address: Address,
    /// 1-based, incremented on every revisit
    pub visit_number: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Values for a new visit row
#[derive(Debug, Clone, PartialEq)]
pub struct NewPatientVisit {
    pub name: String,
    pub mobile: String,
    pub opd_id: String,
    pub age: i32,
    pub sex: Sex,
    pub address: Address,
    pub visit_number: i32,
}

/// Result of looking a patient up by mobile number
#[derive(Debug, Clone, Serialize)]
pub struct PatientLookup {
    pub mobile: String,
    pub opd_id: String,
    /// Oldest first
    pub visits: Vec<PatientVisit>,
    pub latest_visit: PatientVisit,
}

/// Result of registering a visit
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatientRegistration {
    pub id: i64,
    pub opd_id: String,
    pub visit_number: i32,
}

/// A prescribed medicine with its daily schedule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Medicine {
    pub name: String,
    #[serde(default)]
    pub dose: Option<String>,
    #[serde(default)]
    pub morning: bool,
    #[serde(default)]
    pub afternoon: bool,
    #[serde(default)]
    pub night: bool,
}

/// Database row of an OPD consultation record
#[derive(Debug, Clone, FromRow)]
pub struct OpdRecordRow {
    pub id: i64,
    pub patient_id: i64,
    pub opd_id: String,
    pub visit_number: i32,
    pub doctor_id: i64,
    pub symptoms: Json<Vec<String>>,
    pub prescription: Json<Vec<String>>,
    pub medicines: Json<Vec<Medicine>>,
    pub future_suggestions: Json<Vec<String>>,
    pub template_version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// OPD consultation record attached to a patient visit
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OpdRecord {
    pub id: i64,
    pub patient_id: i64,
    pub opd_id: String,
    pub visit_number: i32,
    pub doctor_id: i64,
    pub symptoms: Vec<String>,
    pub prescription: Vec<String>,
    pub medicines: Vec<Medicine>,
    pub future_suggestions: Vec<String>,
    pub template_version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<OpdRecordRow> for OpdRecord {
    fn from(row: OpdRecordRow) -> Self {
        Self {
            id: row.id,
            patient_id: row.patient_id,
            opd_id: row.opd_id,
            visit_number: row.visit_number,
            doctor_id: row.doctor_id,
            symptoms: row.symptoms.0,
            prescription: row.prescription.0,
            medicines: row.medicines.0,
            future_suggestions: row.future_suggestions.0,
            template_version: row.template_version,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Values for a new OPD record
#[derive(Debug, Clone, PartialEq)]
pub struct NewOpdRecord {
    pub patient_id: i64,
    pub doctor_id: i64,
    pub symptoms: Vec<String>,
    pub prescription: Vec<String>,
    pub medicines: Vec<Medicine>,
    pub future_suggestions: Vec<String>,
    pub template_version: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sex_parsing_is_case_insensitive() {
        assert_eq!("Female".parse::<Sex>().unwrap(), Sex::Female);
        assert_eq!(" MALE ".parse::<Sex>().unwrap(), Sex::Male);
        assert_eq!("other".parse::<Sex>().unwrap(), Sex::Other);
        assert!("unknown".parse::<Sex>().is_err());
    }

    #[test]
    fn test_medicine_schedule_defaults() {
        let medicine: Medicine = serde_json::from_str(r#"{"name": "Paracetamol"}"#).unwrap();
        assert_eq!(medicine.dose, None);
        assert!(!medicine.morning && !medicine.afternoon && !medicine.night);
    }
}
