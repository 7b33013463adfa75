//! Persistence seams.
//!
//! Every method that mutates an owner row together with its attachments runs
//! as one unit: either the whole change is stored or none of it is.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;

use crate::error::Result;
use crate::models::activity::{Activity, ActivityUpdate, NewActivity};
use crate::models::attachment::{AttachmentChanges, AttachmentOwner, AttachmentRecord, NewAttachment};
use crate::models::submission::{
    ActivitySubmission, GradeUpdate, SubmissionDraft, SubmissionWithStudent, UpsertedSubmission,
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait ActivityRepository: Send + Sync {
    async fn create_activity(
        &self,
        activity: NewActivity,
        attachments: Vec<NewAttachment>,
    ) -> Result<(Activity, Vec<AttachmentRecord>)>;

    async fn find_activity(&self, id: i64) -> Result<Option<Activity>>;

    /// Rewrites the activity row and applies `changes` to its classwork
    /// attachments. Returns the updated row and the inserted attachments.
    async fn update_activity(
        &self,
        id: i64,
        update: ActivityUpdate,
        changes: AttachmentChanges,
    ) -> Result<(Activity, Vec<AttachmentRecord>)>;

    /// Deletes the activity, its submissions and every attachment row under
    /// either. Returns the removed attachment rows so their blobs can go too.
    async fn delete_activity(&self, id: i64) -> Result<Vec<AttachmentRecord>>;
}

#[async_trait]
pub trait SubmissionRepository: Send + Sync {
    async fn find_submission(&self, id: i64) -> Result<Option<ActivitySubmission>>;

    async fn find_for_student(
        &self,
        activity_id: i64,
        student_id: i64,
    ) -> Result<Option<ActivitySubmission>>;

    /// Insert-or-update keyed on (activity, student), then append
    /// `attachments` to the resulting submission.
    async fn upsert_submission(
        &self,
        draft: SubmissionDraft,
        attachments: Vec<NewAttachment>,
    ) -> Result<(UpsertedSubmission, Vec<AttachmentRecord>)>;

    /// Insert-or-update keyed on (activity, student) that only writes the
    /// checkpoint payload.
    async fn upsert_checkpoint(
        &self,
        activity_id: i64,
        student_id: i64,
        checkpoint: JsonValue,
        at: DateTime<Utc>,
    ) -> Result<UpsertedSubmission>;

    /// Most recently submitted first.
    async fn list_for_activity(&self, activity_id: i64) -> Result<Vec<SubmissionWithStudent>>;

    /// Writes the provided grade fields; `None` leaves the stored value alone.
    async fn save_grade(&self, id: i64, update: GradeUpdate) -> Result<ActivitySubmission>;

    /// Owning instructor of the submission's activity.
    async fn instructor_for_submission(&self, submission_id: i64) -> Result<Option<i64>>;
}

#[async_trait]
pub trait AttachmentRepository: Send + Sync {
    /// Newest upload first.
    async fn list_attachments(&self, owner: AttachmentOwner) -> Result<Vec<AttachmentRecord>>;

    /// Attachments of several submissions at once, newest upload first.
    async fn list_submission_attachments(
        &self,
        submission_ids: &[i64],
    ) -> Result<Vec<AttachmentRecord>>;
}
