use std::sync::Arc;

use tracing::warn;

use crate::error::{Error, Result};
use crate::models::activity::Activity;
use crate::repositories::{ActivityRepository, SubmissionRepository};

/// Ownership checks that run before an instructor touches data under an
/// activity. Missing records and foreign records fail differently.
#[derive(Clone)]
pub struct AccessGate {
    activities: Arc<dyn ActivityRepository>,
    submissions: Arc<dyn SubmissionRepository>,
}

impl AccessGate {
    pub fn new(
        activities: Arc<dyn ActivityRepository>,
        submissions: Arc<dyn SubmissionRepository>,
    ) -> Self {
        Self {
            activities,
            submissions,
        }
    }

    pub async fn authorize_instructor_for_activity(
        &self,
        activity_id: i64,
        instructor_id: i64,
    ) -> Result<Activity> {
        let activity = self
            .activities
            .find_activity(activity_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Activity {} not found", activity_id)))?;
        if activity.instructor_id != instructor_id {
            warn!(activity_id, instructor_id, "Instructor does not own activity");
            return Err(Error::Forbidden(
                "You do not have access to this activity".to_string(),
            ));
        }
        Ok(activity)
    }

    pub async fn authorize_instructor_for_submission(
        &self,
        submission_id: i64,
        instructor_id: i64,
    ) -> Result<()> {
        let owner = self
            .submissions
            .instructor_for_submission(submission_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Submission {} not found", submission_id)))?;
        if owner != instructor_id {
            warn!(submission_id, instructor_id, "Instructor does not own submission");
            return Err(Error::Forbidden(
                "You do not have access to this submission".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::submission::SubmissionDraft;
    use crate::repositories::MemoryStore;
    use crate::services::test_support::{at, seed_activity};

    #[tokio::test]
    async fn activity_gate_distinguishes_missing_from_foreign() {
        let store = Arc::new(MemoryStore::new());
        let gate = AccessGate::new(store.clone(), store.clone());
        let activity_id = seed_activity(&store, 10, None).await;

        assert!(gate.authorize_instructor_for_activity(activity_id, 10).await.is_ok());
        assert!(matches!(
            gate.authorize_instructor_for_activity(activity_id, 11).await,
            Err(Error::Forbidden(_))
        ));
        assert!(matches!(
            gate.authorize_instructor_for_activity(9_999, 10).await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn submission_gate_follows_the_parent_activity() {
        let store = Arc::new(MemoryStore::new());
        let gate = AccessGate::new(store.clone(), store.clone());
        let activity_id = seed_activity(&store, 10, None).await;
        let (upserted, _) = store
            .upsert_submission(
                SubmissionDraft {
                    activity_id,
                    student_id: 77,
                    submission_text: Some("hi".into()),
                    checkpoint_data: None,
                    is_late: false,
                    at: at(2024, 1, 1),
                },
                Vec::new(),
            )
            .await
            .unwrap();
        let submission_id = upserted.submission.id;

        assert!(gate.authorize_instructor_for_submission(submission_id, 10).await.is_ok());
        assert!(matches!(
            gate.authorize_instructor_for_submission(submission_id, 12).await,
            Err(Error::Forbidden(_))
        ));
        assert!(matches!(
            gate.authorize_instructor_for_submission(424_242, 10).await,
            Err(Error::NotFound(_))
        ));
    }
}
