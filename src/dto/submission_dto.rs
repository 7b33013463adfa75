use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use validator::Validate;

use super::attachment_dto::AttachmentView;
use crate::services::submission_service::{SubmissionDetails, SubmitOutcome};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionView {
    pub id: i64,
    pub activity_id: i64,
    pub student_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_email: Option<String>,
    pub submission_text: Option<String>,
    pub checkpoint_data: Option<JsonValue>,
    pub is_late: bool,
    pub submitted_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
    pub grade: Option<f64>,
    pub feedback: Option<String>,
    pub graded_by: Option<i64>,
    pub graded_at: Option<DateTime<Utc>>,
    pub attachments: Vec<AttachmentView>,
}

impl SubmissionView {
    pub fn from_details(details: SubmissionDetails, base_url: &str) -> Self {
        let s = details.submission;
        Self {
            id: s.id,
            activity_id: s.activity_id,
            student_id: s.student_id,
            student_name: details.student_name,
            student_email: details.student_email,
            submission_text: s.submission_text,
            checkpoint_data: s.checkpoint_data,
            is_late: s.is_late,
            submitted_at: s.submitted_at,
            updated_at: s.updated_at,
            grade: s.grade,
            feedback: s.feedback,
            graded_by: s.graded_by,
            graded_at: s.graded_at,
            attachments: AttachmentView::from_records(details.attachments, base_url),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub submission_id: i64,
    pub activity_id: i64,
    pub student_id: i64,
    pub status: &'static str,
    pub message: &'static str,
    pub is_late: bool,
    pub attachments: Vec<AttachmentView>,
}

impl SubmitResponse {
    pub fn from_outcome(outcome: SubmitOutcome, base_url: &str) -> Self {
        Self {
            submission_id: outcome.submission.id,
            activity_id: outcome.submission.activity_id,
            student_id: outcome.submission.student_id,
            status: outcome.status.as_str(),
            message: outcome.status.message(),
            is_late: outcome.submission.is_late,
            attachments: AttachmentView::from_records(outcome.attachments, base_url),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CheckpointRequest {
    #[validate(length(max = 255))]
    pub component: Option<String>,
    #[validate(range(min = 0.0, max = 100.0))]
    pub progress: Option<f64>,
    #[serde(default)]
    pub is_completed: bool,
    pub checkpoint_data: Option<JsonValue>,
}

impl CheckpointRequest {
    /// The payload stored on the submission: the whole autosave, so a client
    /// can resume from it.
    pub fn to_payload(&self) -> JsonValue {
        serde_json::json!({
            "component": self.component,
            "progress": self.progress,
            "isCompleted": self.is_completed,
            "checkpointData": self.checkpoint_data,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckpointResponse {
    pub submission_id: i64,
    pub activity_id: i64,
    pub student_id: i64,
    pub component: Option<String>,
    pub progress: Option<f64>,
    pub is_completed: bool,
    pub checkpoint_data: Option<JsonValue>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OwnSubmissionResponse {
    pub submission: Option<SubmissionView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmissionListResponse {
    pub submissions: Vec<SubmissionView>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct GradeRequest {
    pub grade: Option<f64>,
    #[validate(length(max = 10000))]
    pub feedback: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeResponse {
    pub submission_id: i64,
    pub grade: Option<f64>,
    pub feedback: Option<String>,
    pub graded_by: Option<i64>,
    pub graded_at: Option<DateTime<Utc>>,
}
