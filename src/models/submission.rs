use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ActivitySubmission {
    pub id: i64,
    pub activity_id: i64,
    pub student_id: i64,
    pub submission_text: Option<String>,
    pub checkpoint_data: Option<JsonValue>,
    pub is_late: bool,
    pub submitted_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
    pub grade: Option<f64>,
    pub feedback: Option<String>,
    pub graded_by: Option<i64>,
    pub graded_at: Option<DateTime<Utc>>,
}

/// Submission row joined with the student's identity, as listed to instructors.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SubmissionWithStudent {
    #[sqlx(flatten)]
    pub submission: ActivitySubmission,
    pub student_name: String,
    pub student_email: String,
}

/// Content written by a submit call. Text and checkpoint always replace what
/// the row held before.
#[derive(Debug, Clone)]
pub struct SubmissionDraft {
    pub activity_id: i64,
    pub student_id: i64,
    pub submission_text: Option<String>,
    pub checkpoint_data: Option<JsonValue>,
    pub is_late: bool,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct GradeUpdate {
    pub grade: Option<f64>,
    pub feedback: Option<String>,
    pub graded_by: i64,
    pub graded_at: DateTime<Utc>,
}

/// Result of an insert-or-update keyed on (activity, student).
#[derive(Debug, Clone, FromRow)]
pub struct UpsertedSubmission {
    #[sqlx(flatten)]
    pub submission: ActivitySubmission,
    pub created: bool,
}
