use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value as JsonValue;
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::models::attachment::{AttachmentOwner, AttachmentRecord, ClassworkMeta, UploadedFile};
use crate::models::submission::{ActivitySubmission, GradeUpdate, SubmissionDraft};
use crate::repositories::{ActivityRepository, SubmissionRepository};
use crate::services::access_gate::AccessGate;
use crate::services::reconciler::{new_attachments, AttachmentReconciler, ReconcilePlan};
use crate::utils::time::Clock;
use crate::utils::validation::{non_blank, require_id};

#[derive(Debug, Clone)]
pub struct SubmitRequest {
    pub activity_id: i64,
    pub student_id: i64,
    pub submission_text: Option<String>,
    pub checkpoint_data: Option<JsonValue>,
    pub files: Vec<UploadedFile>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionStatus {
    Created,
    Updated,
}

impl SubmissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionStatus::Created => "created",
            SubmissionStatus::Updated => "updated",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            SubmissionStatus::Created => "Submission received",
            SubmissionStatus::Updated => "Submission updated",
        }
    }
}

#[derive(Debug, Clone)]
pub struct SubmitOutcome {
    pub submission: ActivitySubmission,
    pub status: SubmissionStatus,
    /// Attachments added by this call, newest first.
    pub attachments: Vec<AttachmentRecord>,
}

/// A submission with everything a reader needs to render it.
#[derive(Debug, Clone)]
pub struct SubmissionDetails {
    pub submission: ActivitySubmission,
    pub student_name: Option<String>,
    pub student_email: Option<String>,
    pub attachments: Vec<AttachmentRecord>,
}

#[derive(Clone)]
pub struct SubmissionService {
    activities: Arc<dyn ActivityRepository>,
    submissions: Arc<dyn SubmissionRepository>,
    reconciler: AttachmentReconciler,
    gate: AccessGate,
    clock: Arc<dyn Clock>,
}

impl SubmissionService {
    pub fn new(
        activities: Arc<dyn ActivityRepository>,
        submissions: Arc<dyn SubmissionRepository>,
        reconciler: AttachmentReconciler,
        gate: AccessGate,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            activities,
            submissions,
            reconciler,
            gate,
            clock,
        }
    }

    pub fn reconciler(&self) -> &AttachmentReconciler {
        &self.reconciler
    }

    /// First submit creates the row, later ones overwrite text and checkpoint.
    /// Files are always appended to what the submission already holds.
    pub async fn submit(&self, req: SubmitRequest) -> Result<SubmitOutcome> {
        let activity_id = require_id(req.activity_id, "activityId")?;
        let student_id = require_id(req.student_id, "studentId")?;
        let now = self.clock.now();

        let is_late = match self.activities.find_activity(activity_id).await {
            Ok(Some(activity)) => activity.config.is_late_at(now),
            Ok(None) => {
                return Err(Error::NotFound(format!("Activity {} not found", activity_id)));
            }
            Err(e) => {
                warn!(activity_id, error = %e, "Could not read activity; recording submission as on time");
                false
            }
        };

        let plan = ReconcilePlan::append(new_attachments(req.files, &ClassworkMeta::default()));
        let (changes, pending) = plan.split();
        let draft = SubmissionDraft {
            activity_id,
            student_id,
            submission_text: req.submission_text,
            checkpoint_data: req.checkpoint_data,
            is_late,
            at: now,
        };
        let (upserted, inserted) = self
            .submissions
            .upsert_submission(draft, changes.insert)
            .await?;
        let attachments = self.reconciler.finish(pending, inserted).await;

        let status = if upserted.created {
            SubmissionStatus::Created
        } else {
            SubmissionStatus::Updated
        };
        info!(
            submission_id = upserted.submission.id,
            activity_id,
            student_id,
            status = status.as_str(),
            is_late,
            attachments = attachments.len(),
            "Stored submission"
        );
        Ok(SubmitOutcome {
            submission: upserted.submission,
            status,
            attachments,
        })
    }

    /// Autosave of interactive progress. Only the checkpoint payload changes.
    pub async fn save_checkpoint(
        &self,
        activity_id: i64,
        student_id: i64,
        checkpoint: JsonValue,
    ) -> Result<ActivitySubmission> {
        let activity_id = require_id(activity_id, "activityId")?;
        let student_id = require_id(student_id, "studentId")?;
        if self.activities.find_activity(activity_id).await?.is_none() {
            return Err(Error::NotFound(format!("Activity {} not found", activity_id)));
        }
        let upserted = self
            .submissions
            .upsert_checkpoint(activity_id, student_id, checkpoint, self.clock.now())
            .await?;
        tracing::debug!(
            submission_id = upserted.submission.id,
            created = upserted.created,
            "Saved checkpoint"
        );
        Ok(upserted.submission)
    }

    /// The student's own submission. Store failures read as "nothing yet".
    pub async fn get_own_submission(
        &self,
        activity_id: i64,
        student_id: i64,
    ) -> Option<SubmissionDetails> {
        match self.load_own_submission(activity_id, student_id).await {
            Ok(found) => found,
            Err(e) => {
                warn!(activity_id, student_id, error = %e, "Failed to load own submission");
                None
            }
        }
    }

    async fn load_own_submission(
        &self,
        activity_id: i64,
        student_id: i64,
    ) -> Result<Option<SubmissionDetails>> {
        let Some(submission) = self
            .submissions
            .find_for_student(activity_id, student_id)
            .await?
        else {
            return Ok(None);
        };
        let attachments = self
            .reconciler
            .list(AttachmentOwner::Submission(submission.id))
            .await?;
        Ok(Some(SubmissionDetails {
            submission,
            student_name: None,
            student_email: None,
            attachments,
        }))
    }

    /// Instructor view of every submission to an activity.
    pub async fn list_submissions(
        &self,
        activity_id: i64,
        instructor_id: i64,
    ) -> Result<Vec<SubmissionDetails>> {
        self.gate
            .authorize_instructor_for_activity(activity_id, instructor_id)
            .await?;

        let rows = self.submissions.list_for_activity(activity_id).await?;
        let ids: Vec<i64> = rows.iter().map(|r| r.submission.id).collect();
        let mut by_submission: HashMap<i64, Vec<AttachmentRecord>> = HashMap::new();
        for record in self.reconciler.list_for_submissions(&ids).await? {
            by_submission.entry(record.owner_id).or_default().push(record);
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let attachments = by_submission
                    .remove(&row.submission.id)
                    .unwrap_or_default();
                SubmissionDetails {
                    submission: row.submission,
                    student_name: Some(row.student_name),
                    student_email: Some(row.student_email),
                    attachments,
                }
            })
            .collect())
    }

    /// Records a grade and/or feedback. A grade of 0 counts as a grade.
    pub async fn save_grade(
        &self,
        submission_id: i64,
        instructor_id: i64,
        grade: Option<f64>,
        feedback: Option<String>,
    ) -> Result<ActivitySubmission> {
        let submission_id = require_id(submission_id, "submissionId")?;
        let feedback = non_blank(feedback);
        if grade.is_none() && feedback.is_none() {
            return Err(Error::BadRequest(
                "Provide a grade or feedback".to_string(),
            ));
        }
        if let Some(g) = grade {
            if !g.is_finite() || g < 0.0 {
                return Err(Error::BadRequest(format!("Invalid grade: {}", g)));
            }
        }

        self.gate
            .authorize_instructor_for_submission(submission_id, instructor_id)
            .await?;

        let graded = self
            .submissions
            .save_grade(
                submission_id,
                GradeUpdate {
                    grade,
                    feedback,
                    graded_by: instructor_id,
                    graded_at: self.clock.now(),
                },
            )
            .await?;
        info!(submission_id, instructor_id, grade = ?graded.grade, "Saved grade");
        Ok(graded)
    }
}
