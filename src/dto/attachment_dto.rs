use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::attachment::AttachmentRecord;
use crate::storage::public_url;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentView {
    pub id: i64,
    pub original_name: String,
    pub stored_name: String,
    pub path: String,
    pub url: String,
    pub mime_type: String,
    pub size: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date_override: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uploaded_by: Option<i64>,
    pub uploaded_at: DateTime<Utc>,
}

impl AttachmentView {
    pub fn from_record(record: AttachmentRecord, base_url: &str) -> Self {
        Self {
            url: public_url(base_url, &record.path),
            id: record.id,
            original_name: record.original_name,
            stored_name: record.stored_name,
            path: record.path,
            mime_type: record.mime_type,
            size: record.size,
            asset_type: record.asset_type,
            due_date_override: record.due_date_override,
            uploaded_by: record.uploaded_by,
            uploaded_at: record.uploaded_at,
        }
    }

    pub fn from_records(records: Vec<AttachmentRecord>, base_url: &str) -> Vec<Self> {
        records
            .into_iter()
            .map(|r| Self::from_record(r, base_url))
            .collect()
    }
}
