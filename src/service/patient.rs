//! Patient Service
//!
//! Phone lookup, first-visit and revisit registration, and OPD
//! consultation records.

use log::info;
use std::sync::Arc;
use thiserror::Error;
use validator::Validate;

use crate::models::{
    Address, CreateOpdRecordRequest, NewOpdRecord, NewPatientVisit, OpdRecord,
    PatientLookup, PatientRegisterRequest, PatientRegistration, PatientVisit, Sex,
};
use crate::repository::{retry_read, PatientRepository, RepositoryError};
use crate::utils::error::{codes, CodedError};
use crate::utils::security::generate_opd_id;
use crate::utils::validation::{describe_errors, validate_mobile, validate_name};

/// Template version stamped on OPD records that do not name one
pub const DEFAULT_TEMPLATE_VERSION: i32 = 1;

const MIN_AGE: i32 = 1;
const MAX_AGE: i32 = 150;

#[derive(Error, Debug)]
pub enum PatientError {
    #[error("Mobile number must be exactly 10 digits")]
    InvalidMobile,

    #[error("Invalid patient data: {0}")]
    InvalidData(String),

    #[error("Patient not found")]
    NotFound,

    /// The OPD id exists but belongs to another mobile number
    #[error("OPD id does not belong to this mobile number")]
    OpdMismatch,

    #[error("Patient visit already registered")]
    AlreadyRegistered,

    #[error("No OPD records found")]
    OpdRecordsNotFound,

    #[error("Invalid OPD record: {0}")]
    InvalidOpdData(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl CodedError for PatientError {
    fn code(&self) -> &'static str {
        match self {
            PatientError::InvalidMobile => codes::INVALID_MOBILE,
            PatientError::InvalidData(_) => codes::INVALID_PATIENT_DATA,
            PatientError::NotFound => codes::PATIENT_NOT_FOUND,
            PatientError::OpdMismatch => codes::OPD_MISMATCH,
            PatientError::AlreadyRegistered => codes::PATIENT_ALREADY_REGISTERED,
            PatientError::OpdRecordsNotFound => codes::OPD_NOT_FOUND,
            PatientError::InvalidOpdData(_) => codes::INVALID_OPD_DATA,
            PatientError::Repository(_) => codes::SERVICE_UNAVAILABLE,
        }
    }
}

pub type PatientResult<T> = Result<T, PatientError>;

/// Non-blank trimmed text, or `None`
fn supplied(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn parse_name(name: &str) -> PatientResult<String> {
    if !validate_name(name) {
        return Err(PatientError::InvalidData(format!("invalid name '{}'", name)));
    }
    Ok(name.to_string())
}

fn parse_age(age: i32) -> PatientResult<i32> {
    if !(MIN_AGE..=MAX_AGE).contains(&age) {
        return Err(PatientError::InvalidData(format!(
            "age must be between {} and {}",
            MIN_AGE, MAX_AGE
        )));
    }
    Ok(age)
}

fn parse_sex(sex: &str) -> PatientResult<Sex> {
    sex.parse().map_err(PatientError::InvalidData)
}

/// Age 0 is how clients send "unchanged"
fn supplied_age(age: Option<i32>) -> Option<i32> {
    age.filter(|&a| a != 0)
}

fn merge_address(previous: &Address, update: &Address) -> Address {
    let pick = |new: &Option<String>, old: &Option<String>| {
        supplied(new.as_deref()).or_else(|| old.clone())
    };

    Address {
        locality: pick(&update.locality, &previous.locality),
        city: pick(&update.city, &previous.city),
        state: pick(&update.state, &previous.state),
        pincode: pick(&update.pincode, &previous.pincode),
    }
}

fn clean_address(address: &Address) -> Address {
    merge_address(&Address::default(), address)
}

pub struct PatientService {
    repository: Arc<dyn PatientRepository>,
    hospital_tag: String,
}

impl PatientService {
    pub fn new(repository: Arc<dyn PatientRepository>, hospital_tag: impl Into<String>) -> Self {
        Self {
            repository,
            hospital_tag: hospital_tag.into(),
        }
    }

    /// All visits for a mobile number, oldest first
    pub async fn lookup(&self, mobile: &str) -> PatientResult<PatientLookup> {
        let mobile = mobile.trim();
        if !validate_mobile(mobile) {
            return Err(PatientError::InvalidMobile);
        }

        let visits = retry_read("patient lookup by mobile", || {
            self.repository.visits_by_mobile(mobile)
        })
        .await?;

        let latest_visit = visits.last().cloned().ok_or(PatientError::NotFound)?;

        Ok(PatientLookup {
            mobile: mobile.to_string(),
            opd_id: latest_visit.opd_id.clone(),
            visits,
            latest_visit,
        })
    }

    /// Register a visit.
    ///
    /// Without an OPD id the patient is new: name, age and sex are required
    /// and a fresh OPD id is assigned. With an OPD id the visit follows the
    /// latest one for that id; omitted fields keep their previous values.
    pub async fn register(&self, request: PatientRegisterRequest) -> PatientResult<PatientRegistration> {
        let mobile = request.mobile.trim();
        if !validate_mobile(mobile) {
            return Err(PatientError::InvalidMobile);
        }

        let visit = match supplied(request.opd_id.as_deref()) {
            None => self.first_visit(mobile, &request)?,
            Some(opd_id) => self.next_visit(mobile, &opd_id, &request).await?,
        };

        let created = self
            .repository
            .create_visit(visit)
            .await
            .map_err(|err| match err {
                RepositoryError::Duplicate(_) => PatientError::AlreadyRegistered,
                other => PatientError::Repository(other),
            })?;

        info!(
            "Registered visit {} for patient {}",
            created.visit_number, created.opd_id
        );

        Ok(PatientRegistration {
            id: created.id,
            opd_id: created.opd_id,
            visit_number: created.visit_number,
        })
    }

    /// Attach a consultation record to the latest visit of `opd_id`
    pub async fn record_consultation(
        &self,
        doctor_id: i64,
        opd_id: &str,
        request: CreateOpdRecordRequest,
    ) -> PatientResult<OpdRecord> {
        if request.is_empty() {
            return Err(PatientError::InvalidOpdData(
                "record must contain at least one entry".to_string(),
            ));
        }
        request
            .validate()
            .map_err(|errors| PatientError::InvalidOpdData(describe_errors(&errors)))?;

        let template_version = match request.template_version {
            None => DEFAULT_TEMPLATE_VERSION,
            Some(version) if version >= 1 => version,
            Some(version) => {
                return Err(PatientError::InvalidOpdData(format!(
                    "invalid template version {}",
                    version
                )))
            }
        };

        let visit = self
            .latest_visit(opd_id.trim())
            .await?
            .ok_or(PatientError::NotFound)?;

        let record = self
            .repository
            .create_opd_record(NewOpdRecord {
                patient_id: visit.id,
                doctor_id,
                symptoms: request.symptoms,
                prescription: request.prescription,
                medicines: request.medicines,
                future_suggestions: request.future_suggestions,
                template_version,
            })
            .await
            .map_err(|err| match err {
                RepositoryError::Missing(_) => PatientError::NotFound,
                other => PatientError::Repository(other),
            })?;

        info!(
            "Doctor {} recorded consultation for {} visit {}",
            doctor_id, record.opd_id, record.visit_number
        );
        Ok(record)
    }

    /// OPD records across every visit of `opd_id`, oldest first
    pub async fn consultation_history(&self, opd_id: &str) -> PatientResult<Vec<OpdRecord>> {
        let opd_id = opd_id.trim();
        let records = retry_read("opd record lookup", || {
            self.repository.opd_records_by_opd_id(opd_id)
        })
        .await?;

        if records.is_empty() {
            return Err(PatientError::OpdRecordsNotFound);
        }
        Ok(records)
    }

    fn first_visit(&self, mobile: &str, request: &PatientRegisterRequest) -> PatientResult<NewPatientVisit> {
        let name = supplied(request.name.as_deref())
            .ok_or_else(|| PatientError::InvalidData("name is required".to_string()))?;
        let age = supplied_age(request.age)
            .ok_or_else(|| PatientError::InvalidData("age is required".to_string()))?;
        let sex = supplied(request.sex.as_deref())
            .ok_or_else(|| PatientError::InvalidData("sex is required".to_string()))?;

        Ok(NewPatientVisit {
            name: parse_name(&name)?,
            mobile: mobile.to_string(),
            opd_id: generate_opd_id(&self.hospital_tag),
            age: parse_age(age)?,
            sex: parse_sex(&sex)?,
            address: clean_address(&request.address),
            visit_number: 1,
        })
    }

    async fn next_visit(
        &self,
        mobile: &str,
        opd_id: &str,
        request: &PatientRegisterRequest,
    ) -> PatientResult<NewPatientVisit> {
        let previous = self
            .latest_visit(opd_id)
            .await?
            .ok_or(PatientError::NotFound)?;

        if previous.mobile != mobile {
            return Err(PatientError::OpdMismatch);
        }

        let name = match supplied(request.name.as_deref()) {
            Some(name) => parse_name(&name)?,
            None => previous.name.clone(),
        };
        let age = match supplied_age(request.age) {
            Some(age) => parse_age(age)?,
            None => previous.age,
        };
        let sex = match supplied(request.sex.as_deref()) {
            Some(sex) => parse_sex(&sex)?,
            None => previous.sex,
        };

        Ok(NewPatientVisit {
            name,
            mobile: previous.mobile.clone(),
            opd_id: previous.opd_id.clone(),
            age,
            sex,
            address: merge_address(&previous.address, &request.address),
            visit_number: previous.visit_number + 1,
        })
    }

    async fn latest_visit(&self, opd_id: &str) -> PatientResult<Option<PatientVisit>> {
        Ok(retry_read("patient lookup by opd id", || {
            self.repository.latest_visit_by_opd_id(opd_id)
        })
        .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Medicine;
    use crate::test_support::InMemoryPatientRepository;

    fn service() -> (PatientService, Arc<InMemoryPatientRepository>) {
        let repository = Arc::new(InMemoryPatientRepository::new());
        (PatientService::new(repository.clone(), "LAEL"), repository)
    }

    fn new_patient(mobile: &str) -> PatientRegisterRequest {
        PatientRegisterRequest {
            mobile: mobile.to_string(),
            name: Some("Anita Sharma".to_string()),
            age: Some(30),
            sex: Some("female".to_string()),
            address: Address {
                locality: Some("MG Road".to_string()),
                city: Some("Pune".to_string()),
                state: Some("Maharashtra".to_string()),
                pincode: Some("411001".to_string()),
            },
            ..Default::default()
        }
    }

    fn revisit(mobile: &str, opd_id: &str) -> PatientRegisterRequest {
        PatientRegisterRequest {
            mobile: mobile.to_string(),
            opd_id: Some(opd_id.to_string()),
            ..Default::default()
        }
    }

    fn consultation() -> CreateOpdRecordRequest {
        CreateOpdRecordRequest {
            symptoms: vec!["fever".to_string()],
            medicines: vec![Medicine {
                name: "Paracetamol".to_string(),
                dose: Some("500mg".to_string()),
                morning: true,
                afternoon: false,
                night: true,
            }],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_new_patient_lookup_returns_single_visit() {
        let (service, _) = service();
        let registration = service.register(new_patient("9999999999")).await.unwrap();

        assert_eq!(registration.visit_number, 1);
        assert!(registration.opd_id.starts_with("LAEL"));

        let lookup = service.lookup("9999999999").await.unwrap();
        assert_eq!(lookup.visits.len(), 1);
        assert_eq!(lookup.visits[0].visit_number, 1);
        assert_eq!(lookup.opd_id, registration.opd_id);
        assert_eq!(lookup.latest_visit.id, registration.id);
    }

    #[tokio::test]
    async fn test_lookup_validation_and_not_found() {
        let (service, _) = service();

        assert!(matches!(
            service.lookup("99999").await,
            Err(PatientError::InvalidMobile)
        ));
        assert!(matches!(
            service.lookup("9999999999").await,
            Err(PatientError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_new_patient_requires_demographics() {
        let (service, repository) = service();

        let cases = [
            PatientRegisterRequest {
                name: None,
                ..new_patient("9999999999")
            },
            PatientRegisterRequest {
                age: Some(0),
                ..new_patient("9999999999")
            },
            PatientRegisterRequest {
                age: Some(151),
                ..new_patient("9999999999")
            },
            PatientRegisterRequest {
                sex: Some("unknown".to_string()),
                ..new_patient("9999999999")
            },
        ];

        for request in cases {
            let err = service.register(request).await.unwrap_err();
            assert_eq!(err.code(), codes::INVALID_PATIENT_DATA);
        }
        assert!(repository.visits().is_empty());
    }

    #[tokio::test]
    async fn test_revisit_with_only_age_keeps_other_fields() {
        let (service, _) = service();
        let first = service.register(new_patient("9999999999")).await.unwrap();

        let second = service
            .register(PatientRegisterRequest {
                age: Some(31),
                ..revisit("9999999999", &first.opd_id)
            })
            .await
            .unwrap();

        assert_eq!(second.opd_id, first.opd_id);
        assert_eq!(second.visit_number, 2);

        let lookup = service.lookup("9999999999").await.unwrap();
        let (before, after) = (&lookup.visits[0], &lookup.visits[1]);
        assert_eq!(after.age, 31);
        assert_eq!(after.name, before.name);
        assert_eq!(after.sex, before.sex);
        assert_eq!(after.address, before.address);
        assert_eq!(lookup.latest_visit.visit_number, 2);
    }

    #[tokio::test]
    async fn test_revisit_merges_address_fields_individually() {
        let (service, _) = service();
        let first = service.register(new_patient("9999999999")).await.unwrap();

        service
            .register(PatientRegisterRequest {
                address: Address {
                    city: Some("Mumbai".to_string()),
                    pincode: Some("  ".to_string()),
                    ..Default::default()
                },
                ..revisit("9999999999", &first.opd_id)
            })
            .await
            .unwrap();

        let latest = service.lookup("9999999999").await.unwrap().latest_visit;
        assert_eq!(latest.address.city.as_deref(), Some("Mumbai"));
        assert_eq!(latest.address.locality.as_deref(), Some("MG Road"));
        assert_eq!(latest.address.pincode.as_deref(), Some("411001"));
    }

    #[tokio::test]
    async fn test_revisit_with_foreign_mobile_is_mismatch() {
        let (service, _) = service();
        let first = service.register(new_patient("7777777777")).await.unwrap();

        let err = service
            .register(revisit("9999999999", &first.opd_id))
            .await
            .unwrap_err();

        assert!(matches!(err, PatientError::OpdMismatch));
        assert_eq!(err.code(), codes::OPD_MISMATCH);
        assert!(!err.to_string().contains("7777777777"));
    }

    #[tokio::test]
    async fn test_revisit_unknown_opd_id_is_not_found() {
        let (service, _) = service();

        let err = service
            .register(revisit("9999999999", "LAELdoesnotexist"))
            .await
            .unwrap_err();
        assert!(matches!(err, PatientError::NotFound));
    }

    #[tokio::test]
    async fn test_revisit_rejects_invalid_supplied_values() {
        let (service, _) = service();
        let first = service.register(new_patient("9999999999")).await.unwrap();

        for request in [
            PatientRegisterRequest {
                age: Some(200),
                ..revisit("9999999999", &first.opd_id)
            },
            PatientRegisterRequest {
                sex: Some("x".to_string()),
                ..revisit("9999999999", &first.opd_id)
            },
        ] {
            let err = service.register(request).await.unwrap_err();
            assert!(matches!(err, PatientError::InvalidData(_)));
        }
    }

    #[tokio::test]
    async fn test_consultation_records() {
        let (service, _) = service();
        let first = service.register(new_patient("9999999999")).await.unwrap();

        assert!(matches!(
            service.consultation_history(&first.opd_id).await,
            Err(PatientError::OpdRecordsNotFound)
        ));

        let record = service
            .record_consultation(3, &first.opd_id, consultation())
            .await
            .unwrap();
        assert_eq!(record.template_version, DEFAULT_TEMPLATE_VERSION);
        assert_eq!(record.visit_number, 1);

        service
            .register(revisit("9999999999", &first.opd_id))
            .await
            .unwrap();
        let second = service
            .record_consultation(3, &first.opd_id, consultation())
            .await
            .unwrap();
        assert_eq!(second.visit_number, 2);

        let history = service.consultation_history(&first.opd_id).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].id, record.id);
    }

    #[tokio::test]
    async fn test_consultation_template_version() {
        let (service, _) = service();
        let first = service.register(new_patient("9999999999")).await.unwrap();

        let record = service
            .record_consultation(
                3,
                &first.opd_id,
                CreateOpdRecordRequest {
                    template_version: Some(2),
                    ..consultation()
                },
            )
            .await
            .unwrap();
        assert_eq!(record.template_version, 2);

        let err = service
            .record_consultation(
                3,
                &first.opd_id,
                CreateOpdRecordRequest {
                    template_version: Some(0),
                    ..consultation()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, PatientError::InvalidOpdData(_)));
    }

    #[tokio::test]
    async fn test_consultation_validation() {
        let (service, _) = service();
        let first = service.register(new_patient("9999999999")).await.unwrap();

        let err = service
            .record_consultation(3, &first.opd_id, CreateOpdRecordRequest::default())
            .await
            .unwrap_err();
        assert_eq!(err.code(), codes::INVALID_OPD_DATA);

        let mut blank_medicine = consultation();
        blank_medicine.medicines[0].name = " ".to_string();
        let err = service
            .record_consultation(3, &first.opd_id, blank_medicine)
            .await
            .unwrap_err();
        assert_eq!(err.code(), codes::INVALID_OPD_DATA);

        let err = service
            .record_consultation(3, "LAELmissing", consultation())
            .await
            .unwrap_err();
        assert!(matches!(err, PatientError::NotFound));
    }
}
