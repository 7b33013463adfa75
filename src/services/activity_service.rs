use std::collections::HashSet;
use std::sync::Arc;

use tracing::info;

use crate::error::{Error, Result};
use crate::models::activity::{Activity, ActivityUpdate, NewActivity};
use crate::models::attachment::{
    sort_newest_first, AttachmentOwner, AttachmentRecord, ClassworkMeta, UploadedFile,
};
use crate::repositories::ActivityRepository;
use crate::services::access_gate::AccessGate;
use crate::services::reconciler::{new_attachments, AttachmentReconciler, ReconcilePolicy};
use crate::utils::validation::require_id;

#[derive(Debug, Clone)]
pub struct ActivityWithAttachments {
    pub activity: Activity,
    pub attachments: Vec<AttachmentRecord>,
}

#[derive(Clone)]
pub struct ActivityService {
    activities: Arc<dyn ActivityRepository>,
    reconciler: AttachmentReconciler,
    gate: AccessGate,
}

impl ActivityService {
    pub fn new(
        activities: Arc<dyn ActivityRepository>,
        reconciler: AttachmentReconciler,
        gate: AccessGate,
    ) -> Self {
        Self {
            activities,
            reconciler,
            gate,
        }
    }

    pub async fn create_activity(
        &self,
        input: NewActivity,
        files: Vec<UploadedFile>,
        meta: ClassworkMeta,
    ) -> Result<ActivityWithAttachments> {
        require_id(input.instructor_id, "instructorId")?;
        if input.title.trim().is_empty() {
            return Err(Error::BadRequest("title is required".to_string()));
        }

        let (activity, mut attachments) = self
            .activities
            .create_activity(input, new_attachments(files, &meta))
            .await?;
        sort_newest_first(&mut attachments);
        info!(
            activity_id = activity.id,
            instructor_id = activity.instructor_id,
            activity_type = activity.activity_type.as_str(),
            attachments = attachments.len(),
            "Created activity"
        );
        Ok(ActivityWithAttachments {
            activity,
            attachments,
        })
    }

    pub async fn get_activity(&self, activity_id: i64) -> Result<ActivityWithAttachments> {
        let activity_id = require_id(activity_id, "activityId")?;
        let activity = self
            .activities
            .find_activity(activity_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Activity {} not found", activity_id)))?;
        let attachments = self
            .reconciler
            .list(AttachmentOwner::Activity(activity_id))
            .await?;
        Ok(ActivityWithAttachments {
            activity,
            attachments,
        })
    }

    /// Rewrites the activity and its classwork. Attachments whose ids are not
    /// in `keep_ids` are removed; an empty set removes all of them.
    pub async fn update_activity(
        &self,
        activity_id: i64,
        instructor_id: i64,
        update: ActivityUpdate,
        keep_ids: HashSet<i64>,
        files: Vec<UploadedFile>,
        meta: ClassworkMeta,
    ) -> Result<ActivityWithAttachments> {
        let activity_id = require_id(activity_id, "activityId")?;
        if update.title.trim().is_empty() {
            return Err(Error::BadRequest("title is required".to_string()));
        }
        self.gate
            .authorize_instructor_for_activity(activity_id, instructor_id)
            .await?;

        let owner = AttachmentOwner::Activity(activity_id);
        let plan = self
            .reconciler
            .plan(
                owner,
                &ReconcilePolicy::ReplaceByKeepSet(keep_ids),
                new_attachments(files, &meta),
            )
            .await?;
        let (changes, pending) = plan.split();
        let removed = changes.delete_ids.len();

        let (activity, inserted) = self
            .activities
            .update_activity(activity_id, update, changes)
            .await?;
        let attachments = self.reconciler.finish(pending, inserted).await;
        info!(
            activity_id,
            instructor_id,
            removed,
            attachments = attachments.len(),
            "Updated activity"
        );
        Ok(ActivityWithAttachments {
            activity,
            attachments,
        })
    }

    /// Deletes the activity with its submissions and attachments, then
    /// removes the blobs behind them.
    pub async fn delete_activity(&self, activity_id: i64, instructor_id: i64) -> Result<()> {
        let activity_id = require_id(activity_id, "activityId")?;
        self.gate
            .authorize_instructor_for_activity(activity_id, instructor_id)
            .await?;

        let removed = self.activities.delete_activity(activity_id).await?;
        self.reconciler.purge_blobs(&removed).await;
        info!(
            activity_id,
            instructor_id,
            attachments = removed.len(),
            "Deleted activity"
        );
        Ok(())
    }
}
