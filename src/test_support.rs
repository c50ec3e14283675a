// In-memory stand-ins for PostgreSQL and SMTP
//
// Used by unit tests and by the integration tests under tests/. They honour
// the same unique constraints as the schema so duplicate handling can be
// exercised without a database.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::app::{self, Infrastructure};
use crate::config::{
    AppConfig, HospitalConfig, JwtConfig, OtpConfig, SecurityConfig, ServerConfig,
};
use crate::database::DatabaseConfig;
use crate::di::Container;
use crate::models::{
    NewOpdRecord, NewOtp, NewPatientVisit, NewUser, OpdRecord, OtpRecord, OtpType, PatientVisit,
    UserStatus, UserWithPassword,
};
use crate::repository::{
    OtpRepository, PatientRepository, RepositoryError, RepositoryResult, UserRepository,
};
use crate::service::email_service::{MailError, Mailer};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Configuration with fast bcrypt and no SMTP
pub fn test_config() -> AppConfig {
    AppConfig {
        environment: "test".to_string(),
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8080,
            cors_origins: vec!["*".to_string()],
        },
        database: DatabaseConfig::default(),
        jwt: JwtConfig {
            secret: "test-secret".to_string(),
            access_token_expires_minutes: 60,
            refresh_token_expires_days: 7,
            issuer: "lael-hospital".to_string(),
        },
        otp: OtpConfig {
            expiration_minutes: 5,
            max_retries: None,
            cleanup_interval_seconds: 3600,
        },
        security: SecurityConfig { bcrypt_cost: 4 },
        email: None,
        hospital: HospitalConfig {
            name: "Lael Hospital".to_string(),
            tag: "LAEL".to_string(),
        },
        error_registry_path: None,
    }
}

// =============================================================================
// Users
// =============================================================================

#[derive(Default)]
pub struct InMemoryUserRepository {
    users: Mutex<Vec<UserWithPassword>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn users(&self) -> Vec<UserWithPassword> {
        lock(&self.users).clone()
    }

    pub fn get(&self, id: i64) -> Option<UserWithPassword> {
        lock(&self.users).iter().find(|u| u.id == id).cloned()
    }

    pub fn set_status(&self, id: i64, status: UserStatus) {
        if let Some(user) = lock(&self.users).iter_mut().find(|u| u.id == id) {
            user.status = status;
        }
    }

    fn update<R>(
        &self,
        id: i64,
        apply: impl FnOnce(&mut UserWithPassword) -> R,
    ) -> RepositoryResult<R> {
        let mut users = lock(&self.users);
        let user = users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(|| RepositoryError::Missing(format!("users/{}", id)))?;
        let result = apply(user);
        user.updated_at = Utc::now();
        Ok(result)
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn get_by_email(&self, email: &str) -> RepositoryResult<Option<UserWithPassword>> {
        Ok(lock(&self.users).iter().find(|u| u.email == email).cloned())
    }

    async fn get_by_mobile(&self, mobile: &str) -> RepositoryResult<Option<UserWithPassword>> {
        Ok(lock(&self.users).iter().find(|u| u.mobile == mobile).cloned())
    }

    async fn get_by_id(&self, id: i64) -> RepositoryResult<Option<UserWithPassword>> {
        Ok(self.get(id))
    }

    async fn create(&self, user: NewUser) -> RepositoryResult<UserWithPassword> {
        let mut users = lock(&self.users);

        if users.iter().any(|u| u.mobile == user.mobile) {
            return Err(RepositoryError::Duplicate("users_mobile_key".to_string()));
        }
        if users.iter().any(|u| u.email == user.email) {
            return Err(RepositoryError::Duplicate("users_email_key".to_string()));
        }

        let now = Utc::now();
        let created = UserWithPassword {
            id: users.len() as i64 + 1,
            name: user.name,
            mobile: user.mobile,
            email: user.email,
            designation: user.designation,
            status: UserStatus::Active,
            is_admin: user.is_admin,
            is_approved: user.is_approved,
            is_verified: user.is_verified,
            approved_by: None,
            password_hash: user.password_hash,
            created_at: now,
            updated_at: now,
            last_login: None,
        };
        users.push(created.clone());
        Ok(created)
    }

    async fn update_password(&self, id: i64, password_hash: &str) -> RepositoryResult<()> {
        self.update(id, |user| user.password_hash = Some(password_hash.to_string()))
    }

    async fn approve(&self, id: i64, approver_id: i64) -> RepositoryResult<UserWithPassword> {
        self.update(id, |user| {
            user.is_approved = true;
            user.approved_by = Some(approver_id);
            user.clone()
        })
    }

    async fn mark_verified(&self, id: i64) -> RepositoryResult<()> {
        self.update(id, |user| user.is_verified = true)
    }

    async fn update_last_login(&self, id: i64, at: DateTime<Utc>) -> RepositoryResult<()> {
        self.update(id, |user| user.last_login = Some(at))
    }
}

// =============================================================================
// OTPs
// =============================================================================

#[derive(Default)]
pub struct InMemoryOtpRepository {
    records: Mutex<Vec<OtpRecord>>,
}

impl InMemoryOtpRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<OtpRecord> {
        lock(&self.records).clone()
    }

    /// Code of the latest unvalidated record, as the recipient would read it
    pub fn latest_code(&self, email: &str, otp_type: OtpType) -> Option<String> {
        lock(&self.records)
            .iter()
            .rev()
            .find(|r| r.email == email && r.otp_type == otp_type && !r.is_validated)
            .map(|r| r.otp_code.clone())
    }

    /// Move every record's expiry into the past
    pub fn expire_all(&self) {
        let past = Utc::now() - Duration::minutes(1);
        for record in lock(&self.records).iter_mut() {
            record.expires_at = past;
        }
    }

    fn update(&self, id: i64, apply: impl FnOnce(&mut OtpRecord)) -> RepositoryResult<()> {
        let mut records = lock(&self.records);
        let record = records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| RepositoryError::Missing(format!("otps/{}", id)))?;
        apply(record);
        record.updated_at = Utc::now();
        Ok(())
    }
}

#[async_trait]
impl OtpRepository for InMemoryOtpRepository {
    async fn create(&self, otp: NewOtp) -> RepositoryResult<OtpRecord> {
        let mut records = lock(&self.records);
        let now = Utc::now();
        let record = OtpRecord {
            id: records.iter().map(|r| r.id).max().unwrap_or(0) + 1,
            mobile: otp.mobile,
            email: otp.email,
            otp_code: otp.otp_code,
            otp_type: otp.otp_type,
            expires_at: otp.expires_at,
            is_validated: false,
            retry_count: 0,
            created_at: now,
            updated_at: now,
        };
        records.push(record.clone());
        Ok(record)
    }

    async fn latest_unvalidated(
        &self,
        email: &str,
        otp_type: OtpType,
    ) -> RepositoryResult<Option<OtpRecord>> {
        Ok(lock(&self.records)
            .iter()
            .filter(|r| r.email == email && r.otp_type == otp_type && !r.is_validated)
            .max_by_key(|r| r.id)
            .cloned())
    }

    async fn mark_validated(&self, id: i64) -> RepositoryResult<bool> {
        let mut claimed = false;
        self.update(id, |record| {
            claimed = !record.is_validated;
            record.is_validated = true;
        })?;
        Ok(claimed)
    }

    async fn increment_retry(&self, id: i64) -> RepositoryResult<()> {
        self.update(id, |record| record.retry_count += 1)
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> RepositoryResult<u64> {
        let mut records = lock(&self.records);
        let before = records.len();
        records.retain(|r| r.expires_at >= now);
        Ok((before - records.len()) as u64)
    }
}

// =============================================================================
// Patients
// =============================================================================

#[derive(Default)]
pub struct InMemoryPatientRepository {
    visits: Mutex<Vec<PatientVisit>>,
    opd_records: Mutex<Vec<OpdRecord>>,
}

impl InMemoryPatientRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn visits(&self) -> Vec<PatientVisit> {
        lock(&self.visits).clone()
    }
}

#[async_trait]
impl PatientRepository for InMemoryPatientRepository {
    async fn create_visit(&self, visit: NewPatientVisit) -> RepositoryResult<PatientVisit> {
        let mut visits = lock(&self.visits);

        if visits
            .iter()
            .any(|v| v.opd_id == visit.opd_id && v.visit_number == visit.visit_number)
        {
            return Err(RepositoryError::Duplicate(
                "patients_opd_visit_key".to_string(),
            ));
        }

        let now = Utc::now();
        let created = PatientVisit {
            id: visits.len() as i64 + 1,
            name: visit.name,
            mobile: visit.mobile,
            opd_id: visit.opd_id,
            age: visit.age,
            sex: visit.sex,
            address: visit.address,
            visit_number: visit.visit_number,
            created_at: now,
            updated_at: now,
        };
        visits.push(created.clone());
        Ok(created)
    }

    async fn visits_by_mobile(&self, mobile: &str) -> RepositoryResult<Vec<PatientVisit>> {
        let mut visits: Vec<_> = lock(&self.visits)
            .iter()
            .filter(|v| v.mobile == mobile)
            .cloned()
            .collect();
        visits.sort_by_key(|v| (v.visit_number, v.id));
        Ok(visits)
    }

    async fn latest_visit_by_opd_id(&self, opd_id: &str) -> RepositoryResult<Option<PatientVisit>> {
        Ok(lock(&self.visits)
            .iter()
            .filter(|v| v.opd_id == opd_id)
            .max_by_key(|v| v.visit_number)
            .cloned())
    }

    async fn create_opd_record(&self, record: NewOpdRecord) -> RepositoryResult<OpdRecord> {
        let visit = lock(&self.visits)
            .iter()
            .find(|v| v.id == record.patient_id)
            .cloned()
            .ok_or_else(|| RepositoryError::Missing(format!("patients/{}", record.patient_id)))?;

        let mut records = lock(&self.opd_records);
        let now = Utc::now();
        let created = OpdRecord {
            id: records.len() as i64 + 1,
            patient_id: visit.id,
            opd_id: visit.opd_id,
            visit_number: visit.visit_number,
            doctor_id: record.doctor_id,
            symptoms: record.symptoms,
            prescription: record.prescription,
            medicines: record.medicines,
            future_suggestions: record.future_suggestions,
            template_version: record.template_version,
            created_at: now,
            updated_at: now,
        };
        records.push(created.clone());
        Ok(created)
    }

    async fn opd_records_by_opd_id(&self, opd_id: &str) -> RepositoryResult<Vec<OpdRecord>> {
        Ok(lock(&self.opd_records)
            .iter()
            .filter(|r| r.opd_id == opd_id)
            .cloned()
            .collect())
    }
}

// =============================================================================
// Mail
// =============================================================================

/// An email captured by [`RecordingMailer`]
#[derive(Debug, Clone)]
pub struct SentEmail {
    pub to: String,
    pub subject: String,
    pub html: String,
}

/// Mailer that records every message instead of sending it
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<SentEmail>>,
    failing: AtomicBool,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<SentEmail> {
        lock(&self.sent).clone()
    }

    /// Make every following send fail with a transport error
    pub fn fail_deliveries(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> Result<(), MailError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(MailError::Transport("connection refused".to_string()));
        }

        lock(&self.sent).push(SentEmail {
            to: to.to_string(),
            subject: subject.to_string(),
            html: html_body.to_string(),
        });
        Ok(())
    }
}

// =============================================================================
// Harness
// =============================================================================

/// The in-memory infrastructure plus handles to inspect it
pub struct TestHarness {
    pub config: AppConfig,
    pub users: Arc<InMemoryUserRepository>,
    pub otps: Arc<InMemoryOtpRepository>,
    pub patients: Arc<InMemoryPatientRepository>,
    pub mailer: Arc<RecordingMailer>,
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::with_config(test_config())
    }
}

impl TestHarness {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: AppConfig) -> Self {
        Self {
            config,
            users: Arc::new(InMemoryUserRepository::new()),
            otps: Arc::new(InMemoryOtpRepository::new()),
            patients: Arc::new(InMemoryPatientRepository::new()),
            mailer: Arc::new(RecordingMailer::new()),
        }
    }

    pub fn infrastructure(&self) -> Infrastructure {
        Infrastructure {
            users: self.users.clone(),
            otps: self.otps.clone(),
            patients: self.patients.clone(),
            mailer: self.mailer.clone(),
        }
    }

    /// A fully wired container over the in-memory infrastructure
    pub fn container(&self) -> Arc<Container> {
        app::build_container(self.config.clone(), self.infrastructure())
    }
}
