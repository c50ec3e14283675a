//! PostgreSQL patient repository

use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::PgPool;

use crate::models::{NewOpdRecord, NewPatientVisit, OpdRecord, OpdRecordRow, PatientVisit};
use crate::repository::{PatientRepository, RepositoryResult};

const VISIT_COLUMNS: &str = "id, name, mobile, opd_id, age, sex, locality, city, state, pincode, \
     visit_number, created_at, updated_at";

pub struct PgPatientRepository {
    db_pool: PgPool,
}

impl PgPatientRepository {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl PatientRepository for PgPatientRepository {
    async fn create_visit(&self, visit: NewPatientVisit) -> RepositoryResult<PatientVisit> {
        let query = format!(
            r#"
            INSERT INTO patients (name, mobile, opd_id, age, sex, locality, city, state, pincode, visit_number)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {}
            "#,
            VISIT_COLUMNS
        );

        let created = sqlx::query_as::<_, PatientVisit>(&query)
            .bind(&visit.name)
            .bind(&visit.mobile)
            .bind(&visit.opd_id)
            .bind(visit.age)
            .bind(visit.sex)
            .bind(&visit.address.locality)
            .bind(&visit.address.city)
            .bind(&visit.address.state)
            .bind(&visit.address.pincode)
            .bind(visit.visit_number)
            .fetch_one(&self.db_pool)
            .await?;

        Ok(created)
    }

    async fn visits_by_mobile(&self, mobile: &str) -> RepositoryResult<Vec<PatientVisit>> {
        let query = format!(
            "SELECT {} FROM patients WHERE mobile = $1 ORDER BY visit_number ASC, id ASC",
            VISIT_COLUMNS
        );

        let visits = sqlx::query_as::<_, PatientVisit>(&query)
            .bind(mobile)
            .fetch_all(&self.db_pool)
            .await?;

        Ok(visits)
    }

    async fn latest_visit_by_opd_id(&self, opd_id: &str) -> RepositoryResult<Option<PatientVisit>> {
        let query = format!(
            "SELECT {} FROM patients WHERE opd_id = $1 ORDER BY visit_number DESC LIMIT 1",
            VISIT_COLUMNS
        );

        let visit = sqlx::query_as::<_, PatientVisit>(&query)
            .bind(opd_id)
            .fetch_optional(&self.db_pool)
            .await?;

        Ok(visit)
    }

    async fn create_opd_record(&self, record: NewOpdRecord) -> RepositoryResult<OpdRecord> {
        let row = sqlx::query_as::<_, OpdRecordRow>(
            r#"
            WITH inserted AS (
                INSERT INTO opd_records
                    (patient_id, doctor_id, symptoms, prescription, medicines, future_suggestions, template_version)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                RETURNING *
            )
            SELECT i.id, i.patient_id, p.opd_id, p.visit_number, i.doctor_id, i.symptoms,
                   i.prescription, i.medicines, i.future_suggestions, i.template_version,
                   i.created_at, i.updated_at
            FROM inserted i
            JOIN patients p ON p.id = i.patient_id
            "#,
        )
        .bind(record.patient_id)
        .bind(record.doctor_id)
        .bind(Json(&record.symptoms))
        .bind(Json(&record.prescription))
        .bind(Json(&record.medicines))
        .bind(Json(&record.future_suggestions))
        .bind(record.template_version)
        .fetch_one(&self.db_pool)
        .await?;

        Ok(row.into())
    }

    async fn opd_records_by_opd_id(&self, opd_id: &str) -> RepositoryResult<Vec<OpdRecord>> {
        let rows = sqlx::query_as::<_, OpdRecordRow>(
            r#"
            SELECT r.id, r.patient_id, p.opd_id, p.visit_number, r.doctor_id, r.symptoms,
                   r.prescription, r.medicines, r.future_suggestions, r.template_version,
                   r.created_at, r.updated_at
            FROM opd_records r
            JOIN patients p ON p.id = r.patient_id
            WHERE p.opd_id = $1
            ORDER BY r.created_at ASC, r.id ASC
            "#,
        )
        .bind(opd_id)
        .fetch_all(&self.db_pool)
        .await?;

        Ok(rows.into_iter().map(OpdRecord::from).collect())
    }
}
