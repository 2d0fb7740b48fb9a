//! Patient records and the default policy for fields left blank at intake

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Placeholder for demographics the front desk still has to collect
pub const TO_BE_COMPLETED: &str = "To be completed";
/// Placeholder for clinical lists with nothing to declare
pub const NONE_DECLARED: &str = "NONE";
/// Placeholder for optional extras that do not apply
pub const NOT_APPLICABLE: &str = "N/A";

/// One patient column and the value it falls back to when missing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldDefault {
    pub column: &'static str,
    pub fallback: &'static str,
}

const fn field(column: &'static str, fallback: &'static str) -> FieldDefault {
    FieldDefault { column, fallback }
}

/// Every defaulted patient column, in table order.
///
/// Both intake (`NewPatient::resolve`) and the integrity sweep over existing
/// rows read this list, so the two cannot drift apart.
pub const PATIENT_FIELD_DEFAULTS: &[FieldDefault] = &[
    field("middle_name", NOT_APPLICABLE),
    field("sex", TO_BE_COMPLETED),
    field("civil_status", TO_BE_COMPLETED),
    field("address", TO_BE_COMPLETED),
    field("contact_number", TO_BE_COMPLETED),
    field("email", NOT_APPLICABLE),
    field("occupation", TO_BE_COMPLETED),
    field("religion", TO_BE_COMPLETED),
    field("nationality", TO_BE_COMPLETED),
    field("emergency_contact_name", TO_BE_COMPLETED),
    field("emergency_contact_number", TO_BE_COMPLETED),
    field("emergency_contact_relationship", TO_BE_COMPLETED),
    field("blood_type", TO_BE_COMPLETED),
    field("allergies", NONE_DECLARED),
    field("medical_history", NONE_DECLARED),
    field("current_medications", NONE_DECLARED),
    field("hmo_provider", NONE_DECLARED),
    field("hmo_member_id", NOT_APPLICABLE),
];

/// Fallback for a patient column, if the column is defaulted at all
pub fn default_for(column: &str) -> Option<&'static str> {
    PATIENT_FIELD_DEFAULTS
        .iter()
        .find(|f| f.column == column)
        .map(|f| f.fallback)
}

/// A stored patient record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Patient {
    pub id: i64,
    pub patient_number: String,
    pub first_name: String,
    pub last_name: String,
    pub birth_date: Option<NaiveDate>,
    #[serde(flatten)]
    pub details: PatientDetails,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The defaulted columns of a patient, always filled once resolved
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PatientDetails {
    pub middle_name: String,
    pub sex: String,
    pub civil_status: String,
    pub address: String,
    pub contact_number: String,
    pub email: String,
    pub occupation: String,
    pub religion: String,
    pub nationality: String,
    pub emergency_contact_name: String,
    pub emergency_contact_number: String,
    pub emergency_contact_relationship: String,
    pub blood_type: String,
    pub allergies: String,
    pub medical_history: String,
    pub current_medications: String,
    pub hmo_provider: String,
    pub hmo_member_id: String,
}

impl PatientDetails {
    /// Values in `PATIENT_FIELD_DEFAULTS` order
    pub fn values(&self) -> [&str; 18] {
        [
            self.middle_name.as_str(),
            self.sex.as_str(),
            self.civil_status.as_str(),
            self.address.as_str(),
            self.contact_number.as_str(),
            self.email.as_str(),
            self.occupation.as_str(),
            self.religion.as_str(),
            self.nationality.as_str(),
            self.emergency_contact_name.as_str(),
            self.emergency_contact_number.as_str(),
            self.emergency_contact_relationship.as_str(),
            self.blood_type.as_str(),
            self.allergies.as_str(),
            self.medical_history.as_str(),
            self.current_medications.as_str(),
            self.hmo_provider.as_str(),
            self.hmo_member_id.as_str(),
        ]
    }

    /// Number of fields still carrying a placeholder value
    pub fn placeholder_count(&self) -> usize {
        self.values()
            .into_iter()
            .zip(PATIENT_FIELD_DEFAULTS.iter())
            .filter(|(value, d)| *value == d.fallback)
            .count()
    }
}

/// Patient intake as submitted by the front desk
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewPatient {
    pub first_name: String,
    pub last_name: String,
    pub birth_date: Option<NaiveDate>,
    pub middle_name: Option<String>,
    pub sex: Option<String>,
    pub civil_status: Option<String>,
    pub address: Option<String>,
    pub contact_number: Option<String>,
    pub email: Option<String>,
    pub occupation: Option<String>,
    pub religion: Option<String>,
    pub nationality: Option<String>,
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_number: Option<String>,
    pub emergency_contact_relationship: Option<String>,
    pub blood_type: Option<String>,
    pub allergies: Option<String>,
    pub medical_history: Option<String>,
    pub current_medications: Option<String>,
    pub hmo_provider: Option<String>,
    pub hmo_member_id: Option<String>,
}

impl NewPatient {
    /// Fill every missing or blank field from `PATIENT_FIELD_DEFAULTS`
    pub fn resolve(&self) -> PatientDetails {
        let pick = |value: &Option<String>, column: &str| -> String {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .or_else(|| default_for(column).map(str::to_string))
                .unwrap_or_default()
        };

        PatientDetails {
            middle_name: pick(&self.middle_name, "middle_name"),
            sex: pick(&self.sex, "sex"),
            civil_status: pick(&self.civil_status, "civil_status"),
            address: pick(&self.address, "address"),
            contact_number: pick(&self.contact_number, "contact_number"),
            email: pick(&self.email, "email"),
            occupation: pick(&self.occupation, "occupation"),
            religion: pick(&self.religion, "religion"),
            nationality: pick(&self.nationality, "nationality"),
            emergency_contact_name: pick(&self.emergency_contact_name, "emergency_contact_name"),
            emergency_contact_number: pick(
                &self.emergency_contact_number,
                "emergency_contact_number",
            ),
            emergency_contact_relationship: pick(
                &self.emergency_contact_relationship,
                "emergency_contact_relationship",
            ),
            blood_type: pick(&self.blood_type, "blood_type"),
            allergies: pick(&self.allergies, "allergies"),
            medical_history: pick(&self.medical_history, "medical_history"),
            current_medications: pick(&self.current_medications, "current_medications"),
            hmo_provider: pick(&self.hmo_provider, "hmo_provider"),
            hmo_member_id: pick(&self.hmo_member_id, "hmo_member_id"),
        }
    }
}

/// Patient numbers look like `PT-2024-000123`
pub fn format_patient_number(year: i32, sequence: i64) -> String {
    format!("PT-{}-{:06}", year, sequence)
}

/// Result of the integrity sweep for one column
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FieldFixCount {
    pub column: String,
    pub fallback: String,
    pub rows_updated: u64,
}
