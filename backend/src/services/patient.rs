//! Patient records
//!
//! Intake fills every blank optional field from `PATIENT_FIELD_DEFAULTS`, and
//! `fix_missing_fields` applies the same list to rows stored before that rule
//! existed.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::Deserialize;
use shared::{
    FieldFixCount, NewPatient, PaginatedResponse, Pagination, PaginationMeta, Patient,
    PATIENT_FIELD_DEFAULTS,
};
use sqlx::{FromRow, PgPool};

use crate::error::{AppError, AppResult};

/// Patient service
#[derive(Clone)]
pub struct PatientService {
    db: PgPool,
}

const PATIENT_COLUMNS: &str = "id, patient_number, first_name, last_name, birth_date, \
     middle_name, sex, civil_status, address, contact_number, email, occupation, religion, \
     nationality, emergency_contact_name, emergency_contact_number, \
     emergency_contact_relationship, blood_type, allergies, medical_history, \
     current_medications, hmo_provider, hmo_member_id, created_at, updated_at";

/// Stored row; older rows may still hold NULLs in defaulted columns
#[derive(Debug, FromRow)]
struct PatientRow {
    id: i64,
    patient_number: String,
    first_name: String,
    last_name: String,
    birth_date: Option<NaiveDate>,
    middle_name: Option<String>,
    sex: Option<String>,
    civil_status: Option<String>,
    address: Option<String>,
    contact_number: Option<String>,
    email: Option<String>,
    occupation: Option<String>,
    religion: Option<String>,
    nationality: Option<String>,
    emergency_contact_name: Option<String>,
    emergency_contact_number: Option<String>,
    emergency_contact_relationship: Option<String>,
    blood_type: Option<String>,
    allergies: Option<String>,
    medical_history: Option<String>,
    current_medications: Option<String>,
    hmo_provider: Option<String>,
    hmo_member_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<PatientRow> for Patient {
    fn from(row: PatientRow) -> Self {
        let intake = NewPatient {
            first_name: row.first_name,
            last_name: row.last_name,
            birth_date: row.birth_date,
            middle_name: row.middle_name,
            sex: row.sex,
            civil_status: row.civil_status,
            address: row.address,
            contact_number: row.contact_number,
            email: row.email,
            occupation: row.occupation,
            religion: row.religion,
            nationality: row.nationality,
            emergency_contact_name: row.emergency_contact_name,
            emergency_contact_number: row.emergency_contact_number,
            emergency_contact_relationship: row.emergency_contact_relationship,
            blood_type: row.blood_type,
            allergies: row.allergies,
            medical_history: row.medical_history,
            current_medications: row.current_medications,
            hmo_provider: row.hmo_provider,
            hmo_member_id: row.hmo_member_id,
        };
        let details = intake.resolve();

        Self {
            id: row.id,
            patient_number: row.patient_number,
            first_name: intake.first_name,
            last_name: intake.last_name,
            birth_date: intake.birth_date,
            details,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Patient listing filter
#[derive(Debug, Default, Deserialize)]
pub struct PatientFilter {
    pub search: Option<String>,
}

/// Check the fields intake cannot default
fn validate_intake(input: &NewPatient) -> AppResult<()> {
    let provided = |value: &Option<String>| {
        value
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };

    // Column widths of the patients table
    let bounded = [
        ("first_name", Some(input.first_name.as_str()), 100),
        ("last_name", Some(input.last_name.as_str()), 100),
        ("middle_name", input.middle_name.as_deref(), 100),
        ("sex", input.sex.as_deref(), 20),
        ("civil_status", input.civil_status.as_deref(), 30),
        ("contact_number", input.contact_number.as_deref(), 30),
        ("email", input.email.as_deref(), 255),
        ("occupation", input.occupation.as_deref(), 100),
        ("religion", input.religion.as_deref(), 100),
        ("nationality", input.nationality.as_deref(), 100),
        ("emergency_contact_name", input.emergency_contact_name.as_deref(), 150),
        ("emergency_contact_number", input.emergency_contact_number.as_deref(), 30),
        (
            "emergency_contact_relationship",
            input.emergency_contact_relationship.as_deref(),
            50,
        ),
        ("blood_type", input.blood_type.as_deref(), 20),
        ("hmo_provider", input.hmo_provider.as_deref(), 100),
        ("hmo_member_id", input.hmo_member_id.as_deref(), 50),
    ];
    for (field, value, max) in bounded {
        if value.is_some_and(|v| v.trim().chars().count() > max) {
            return Err(AppError::validation(
                field,
                format!("{} must be at most {} characters", field, max),
            ));
        }
    }

    if input.first_name.trim().is_empty() {
        return Err(AppError::validation("first_name", "First name is required"));
    }
    if input.last_name.trim().is_empty() {
        return Err(AppError::validation("last_name", "Last name is required"));
    }
    if let Some(email) = provided(&input.email) {
        shared::validate_email(&email).map_err(|m| AppError::validation("email", m))?;
    }
    if let Some(number) = provided(&input.contact_number) {
        shared::validate_mobile_number(&number)
            .map_err(|m| AppError::validation("contact_number", m))?;
    }
    if let Some(blood_type) = provided(&input.blood_type) {
        shared::validate_blood_type(&blood_type)
            .map_err(|m| AppError::validation("blood_type", m))?;
    }
    if let Some(birth_date) = input.birth_date {
        if birth_date > Utc::now().date_naive() {
            return Err(AppError::validation(
                "birth_date",
                "Birth date cannot be in the future",
            ));
        }
    }
    Ok(())
}

impl PatientService {
    /// Create a new PatientService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Register a patient, defaulting every blank optional field
    pub async fn create(&self, input: NewPatient) -> AppResult<Patient> {
        validate_intake(&input)?;
        let details = input.resolve();

        let id = sqlx::query_scalar::<_, i64>(
            "SELECT nextval(pg_get_serial_sequence('patients', 'id'))",
        )
        .fetch_one(&self.db)
        .await?;
        let patient_number = shared::format_patient_number(Utc::now().year(), id);

        let row = sqlx::query_as::<_, PatientRow>(&format!(
            r#"
            INSERT INTO patients (
                id, patient_number, first_name, last_name, birth_date,
                middle_name, sex, civil_status, address, contact_number, email,
                occupation, religion, nationality, emergency_contact_name,
                emergency_contact_number, emergency_contact_relationship, blood_type,
                allergies, medical_history, current_medications, hmo_provider, hmo_member_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15,
                    $16, $17, $18, $19, $20, $21, $22, $23)
            RETURNING {}
            "#,
            PATIENT_COLUMNS
        ))
        .bind(id)
        .bind(&patient_number)
        .bind(input.first_name.trim())
        .bind(input.last_name.trim())
        .bind(input.birth_date)
        .bind(&details.middle_name)
        .bind(&details.sex)
        .bind(&details.civil_status)
        .bind(&details.address)
        .bind(&details.contact_number)
        .bind(&details.email)
        .bind(&details.occupation)
        .bind(&details.religion)
        .bind(&details.nationality)
        .bind(&details.emergency_contact_name)
        .bind(&details.emergency_contact_number)
        .bind(&details.emergency_contact_relationship)
        .bind(&details.blood_type)
        .bind(&details.allergies)
        .bind(&details.medical_history)
        .bind(&details.current_medications)
        .bind(&details.hmo_provider)
        .bind(&details.hmo_member_id)
        .fetch_one(&self.db)
        .await
        .map_err(|e| AppError::from_unique_violation(e, "patient_number"))?;

        let patient = Patient::from(row);
        tracing::info!(
            patient_id = patient.id,
            patient_number = %patient.patient_number,
            placeholders = patient.details.placeholder_count(),
            "Patient registered"
        );
        Ok(patient)
    }

    /// Get a patient by id
    pub async fn get(&self, patient_id: i64) -> AppResult<Patient> {
        sqlx::query_as::<_, PatientRow>(&format!(
            "SELECT {} FROM patients WHERE id = $1",
            PATIENT_COLUMNS
        ))
        .bind(patient_id)
        .fetch_optional(&self.db)
        .await?
        .map(Patient::from)
        .ok_or_else(|| AppError::NotFound("Patient".to_string()))
    }

    /// List patients by name, paginated
    pub async fn list(
        &self,
        filter: &PatientFilter,
        pagination: &Pagination,
    ) -> AppResult<PaginatedResponse<Patient>> {
        let search = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", s));

        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM patients
            WHERE $1::text IS NULL
               OR first_name ILIKE $1 OR last_name ILIKE $1 OR patient_number ILIKE $1
            "#,
        )
        .bind(&search)
        .fetch_one(&self.db)
        .await?;

        let rows = sqlx::query_as::<_, PatientRow>(&format!(
            r#"
            SELECT {}
            FROM patients
            WHERE $1::text IS NULL
               OR first_name ILIKE $1 OR last_name ILIKE $1 OR patient_number ILIKE $1
            ORDER BY last_name ASC, first_name ASC, id ASC
            LIMIT $2 OFFSET $3
            "#,
            PATIENT_COLUMNS
        ))
        .bind(&search)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        Ok(PaginatedResponse {
            data: rows.into_iter().map(Patient::from).collect(),
            pagination: PaginationMeta::new(pagination, u64::try_from(total).unwrap_or(0)),
        })
    }

    /// Write the fallback into every NULL or blank defaulted column.
    ///
    /// Idempotent: a second run reports zero rows for every column.
    pub async fn fix_missing_fields(&self) -> AppResult<Vec<FieldFixCount>> {
        let mut tx = self.db.begin().await?;
        let mut counts = Vec::with_capacity(PATIENT_FIELD_DEFAULTS.len());

        for default in PATIENT_FIELD_DEFAULTS {
            // Column names come from the fixed list above, never from input
            let sql = format!(
                "UPDATE patients SET {col} = $1, updated_at = NOW() \
                 WHERE {col} IS NULL OR TRIM({col}) = ''",
                col = default.column
            );
            let result = sqlx::query(&sql)
                .bind(default.fallback)
                .execute(&mut *tx)
                .await?;

            if result.rows_affected() > 0 {
                tracing::info!(
                    column = default.column,
                    rows = result.rows_affected(),
                    "Filled missing patient field"
                );
            }

            counts.push(FieldFixCount {
                column: default.column.to_string(),
                fallback: default.fallback.to_string(),
                rows_updated: result.rows_affected(),
            });
        }

        tx.commit().await?;
        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn intake() -> NewPatient {
        NewPatient {
            first_name: "Maria".to_string(),
            last_name: "Santos".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn minimal_intake_is_valid() {
        assert!(validate_intake(&intake()).is_ok());
    }

    #[test]
    fn names_are_required() {
        let mut input = intake();
        input.first_name = "  ".to_string();
        assert!(matches!(
            validate_intake(&input),
            Err(AppError::Validation { ref field, .. }) if field == "first_name"
        ));
    }

    #[test]
    fn provided_contact_details_are_checked() {
        let mut input = intake();
        input.contact_number = Some("12345".to_string());
        assert!(validate_intake(&input).is_err());

        input.contact_number = Some("0917-123-4567".to_string());
        assert!(validate_intake(&input).is_ok());

        input.email = Some("not-an-email".to_string());
        assert!(validate_intake(&input).is_err());
    }

    #[test]
    fn over_long_fields_are_rejected_per_column() {
        let mut input = intake();
        input.sex = Some("x".repeat(21));
        assert!(matches!(
            validate_intake(&input),
            Err(AppError::Validation { ref field, .. }) if field == "sex"
        ));

        let mut input = intake();
        input.contact_number = Some(format!("09171234567{}", "x".repeat(30)));
        assert!(matches!(
            validate_intake(&input),
            Err(AppError::Validation { ref field, .. }) if field == "contact_number"
        ));

        let mut input = intake();
        input.middle_name = Some("M".repeat(100));
        input.hmo_member_id = Some("H".repeat(50));
        assert!(validate_intake(&input).is_ok());
        input.hmo_member_id = Some("H".repeat(51));
        assert!(validate_intake(&input).is_err());
    }

    #[test]
    fn blank_optional_fields_are_not_validated() {
        let mut input = intake();
        input.email = Some("   ".to_string());
        input.blood_type = Some(String::new());
        assert!(validate_intake(&input).is_ok());
    }
}
