use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// The record an attachment belongs to. Classwork files hang off an activity,
/// student uploads off a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum AttachmentOwner {
    Activity(i64),
    Submission(i64),
}

impl AttachmentOwner {
    pub fn id(&self) -> i64 {
        match self {
            AttachmentOwner::Activity(id) | AttachmentOwner::Submission(id) => *id,
        }
    }
}

/// A persisted attachment row of either kind. The classwork-only columns are
/// `None` for submission attachments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct AttachmentRecord {
    pub id: i64,
    pub owner_id: i64,
    pub asset_type: Option<String>,
    pub original_name: String,
    pub stored_name: String,
    pub path: String,
    pub due_date_override: Option<DateTime<Utc>>,
    pub mime_type: String,
    pub size: i64,
    pub uploaded_by: Option<i64>,
    pub uploaded_at: DateTime<Utc>,
}

/// A file already written to blob storage, as handed over by the upload layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadedFile {
    pub original_name: String,
    pub stored_name: String,
    pub path: String,
    pub mime_type: String,
    pub size: i64,
}

/// Descriptive fields for classwork uploads that submission uploads lack.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassworkMeta {
    pub asset_type: Option<String>,
    pub due_date_override: Option<DateTime<Utc>>,
    pub uploaded_by: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewAttachment {
    pub file: UploadedFile,
    pub meta: ClassworkMeta,
    pub uploaded_at: DateTime<Utc>,
}

impl NewAttachment {
    pub fn into_record(self, id: i64, owner_id: i64) -> AttachmentRecord {
        AttachmentRecord {
            id,
            owner_id,
            asset_type: self.meta.asset_type,
            original_name: self.file.original_name,
            stored_name: self.file.stored_name,
            path: self.file.path,
            due_date_override: self.meta.due_date_override,
            mime_type: self.file.mime_type,
            size: self.file.size,
            uploaded_by: self.meta.uploaded_by,
            uploaded_at: self.uploaded_at,
        }
    }
}

/// Metadata mutations for one owner, applied together with the owner row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttachmentChanges {
    pub delete_ids: Vec<i64>,
    pub insert: Vec<NewAttachment>,
}

/// Newest upload first; equal timestamps fall back to the higher id.
pub fn sort_newest_first(records: &mut [AttachmentRecord]) {
    records.sort_by(|a, b| {
        b.uploaded_at
            .cmp(&a.uploaded_at)
            .then_with(|| b.id.cmp(&a.id))
    });
}
