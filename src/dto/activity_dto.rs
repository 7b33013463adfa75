use chrono::{DateTime, Utc};
use serde::Serialize;

use super::attachment_dto::AttachmentView;
use crate::models::activity::{ActivityConfig, ActivityType};
use crate::services::activity_service::ActivityWithAttachments;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityView {
    pub id: i64,
    pub instructor_id: i64,
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub activity_type: ActivityType,
    pub config: ActivityConfig,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub attachments: Vec<AttachmentView>,
}

impl ActivityView {
    pub fn new(value: ActivityWithAttachments, base_url: &str) -> Self {
        let a = value.activity;
        Self {
            id: a.id,
            instructor_id: a.instructor_id,
            title: a.title,
            description: a.description,
            activity_type: a.activity_type,
            config: a.config.0,
            created_at: a.created_at,
            updated_at: a.updated_at,
            attachments: AttachmentView::from_records(value.attachments, base_url),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ActivityAttachmentsResponse {
    pub attachments: Vec<AttachmentView>,
}
