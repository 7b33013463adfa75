//! In-process store with the same guarantees as the Postgres one: a single
//! lock covers each call, so find-or-create stays atomic and owner updates
//! land together with their attachment changes.
//!
//! Used by the test suites and for running the API without a database.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::types::Json;

use super::{ActivityRepository, AttachmentRepository, SubmissionRepository};
use crate::error::{Error, Result};
use crate::models::activity::{Activity, ActivityUpdate, NewActivity};
use crate::models::attachment::{
    sort_newest_first, AttachmentChanges, AttachmentOwner, AttachmentRecord, NewAttachment,
};
use crate::models::submission::{
    ActivitySubmission, GradeUpdate, SubmissionDraft, SubmissionWithStudent, UpsertedSubmission,
};

#[derive(Debug, Clone)]
struct StoredUser {
    name: String,
    email: String,
}

#[derive(Debug, Default)]
struct State {
    next_id: i64,
    users: HashMap<i64, StoredUser>,
    activities: BTreeMap<i64, Activity>,
    submissions: BTreeMap<i64, ActivitySubmission>,
    attachments: BTreeMap<i64, (AttachmentOwner, AttachmentRecord)>,
}

impl State {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn insert_attachments(
        &mut self,
        owner: AttachmentOwner,
        attachments: Vec<NewAttachment>,
    ) -> Vec<AttachmentRecord> {
        attachments
            .into_iter()
            .map(|attachment| {
                let id = self.next_id();
                let record = attachment.into_record(id, owner.id());
                self.attachments.insert(id, (owner, record.clone()));
                record
            })
            .collect()
    }

    fn delete_attachments(&mut self, owner: AttachmentOwner, ids: &[i64]) {
        self.attachments
            .retain(|id, (record_owner, _)| !(*record_owner == owner && ids.contains(id)));
    }

    fn attachments_of(&self, owner: AttachmentOwner) -> Vec<AttachmentRecord> {
        let mut records: Vec<AttachmentRecord> = self
            .attachments
            .values()
            .filter(|(record_owner, _)| *record_owner == owner)
            .map(|(_, record)| record.clone())
            .collect();
        sort_newest_first(&mut records);
        records
    }

    fn submission_for(&self, activity_id: i64, student_id: i64) -> Option<i64> {
        self.submissions
            .values()
            .find(|s| s.activity_id == activity_id && s.student_id == student_id)
            .map(|s| s.id)
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    fail_reads: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a user so instructor listings can join their identity.
    pub fn add_user(&self, id: i64, name: &str, email: &str) -> Result<()> {
        let mut state = self.lock()?;
        state.users.insert(
            id,
            StoredUser {
                name: name.to_string(),
                email: email.to_string(),
            },
        );
        Ok(())
    }

    /// Makes every read fail with a store error while writes keep working.
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Number of submission rows stored for the (activity, student) pair.
    pub fn submission_rows(&self, activity_id: i64, student_id: i64) -> Result<usize> {
        let state = self.lock()?;
        Ok(state
            .submissions
            .values()
            .filter(|s| s.activity_id == activity_id && s.student_id == student_id)
            .count())
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|_| Error::Internal("memory store lock poisoned".to_string()))
    }

    fn read(&self) -> Result<MutexGuard<'_, State>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(Error::Internal("store unavailable".to_string()));
        }
        self.lock()
    }
}

#[async_trait]
impl ActivityRepository for MemoryStore {
    async fn create_activity(
        &self,
        activity: NewActivity,
        attachments: Vec<NewAttachment>,
    ) -> Result<(Activity, Vec<AttachmentRecord>)> {
        let mut state = self.lock()?;
        let now = Utc::now();
        let id = state.next_id();
        let created = Activity {
            id,
            instructor_id: activity.instructor_id,
            title: activity.title,
            description: activity.description,
            activity_type: activity.activity_type,
            config: Json(activity.config),
            created_at: now,
            updated_at: now,
        };
        state.activities.insert(id, created.clone());
        let inserted = state.insert_attachments(AttachmentOwner::Activity(id), attachments);
        Ok((created, inserted))
    }

    async fn find_activity(&self, id: i64) -> Result<Option<Activity>> {
        Ok(self.read()?.activities.get(&id).cloned())
    }

    async fn update_activity(
        &self,
        id: i64,
        update: ActivityUpdate,
        changes: AttachmentChanges,
    ) -> Result<(Activity, Vec<AttachmentRecord>)> {
        let mut state = self.lock()?;
        let activity = state
            .activities
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound(format!("Activity {} not found", id)))?;
        activity.title = update.title;
        activity.description = update.description;
        activity.config = Json(update.config);
        activity.updated_at = Utc::now();
        let updated = activity.clone();

        let owner = AttachmentOwner::Activity(id);
        state.delete_attachments(owner, &changes.delete_ids);
        let inserted = state.insert_attachments(owner, changes.insert);
        Ok((updated, inserted))
    }

    async fn delete_activity(&self, id: i64) -> Result<Vec<AttachmentRecord>> {
        let mut state = self.lock()?;
        if state.activities.remove(&id).is_none() {
            return Err(Error::NotFound(format!("Activity {} not found", id)));
        }
        let submission_ids: Vec<i64> = state
            .submissions
            .values()
            .filter(|s| s.activity_id == id)
            .map(|s| s.id)
            .collect();
        state.submissions.retain(|_, s| s.activity_id != id);

        let mut removed = Vec::new();
        state.attachments.retain(|_, (owner, record)| {
            let doomed = match *owner {
                AttachmentOwner::Activity(activity_id) => activity_id == id,
                AttachmentOwner::Submission(submission_id) => submission_ids.contains(&submission_id),
            };
            if doomed {
                removed.push(record.clone());
            }
            !doomed
        });
        Ok(removed)
    }
}

#[async_trait]
impl SubmissionRepository for MemoryStore {
    async fn find_submission(&self, id: i64) -> Result<Option<ActivitySubmission>> {
        Ok(self.read()?.submissions.get(&id).cloned())
    }

    async fn find_for_student(
        &self,
        activity_id: i64,
        student_id: i64,
    ) -> Result<Option<ActivitySubmission>> {
        let state = self.read()?;
        Ok(state
            .submission_for(activity_id, student_id)
            .and_then(|id| state.submissions.get(&id).cloned()))
    }

    async fn upsert_submission(
        &self,
        draft: SubmissionDraft,
        attachments: Vec<NewAttachment>,
    ) -> Result<(UpsertedSubmission, Vec<AttachmentRecord>)> {
        let mut state = self.lock()?;
        let existing = state.submission_for(draft.activity_id, draft.student_id);
        let (submission, created) = match existing {
            Some(id) => {
                let row = state
                    .submissions
                    .get_mut(&id)
                    .ok_or_else(|| Error::Internal(format!("submission {} vanished", id)))?;
                row.submission_text = draft.submission_text;
                row.checkpoint_data = draft.checkpoint_data;
                row.is_late = draft.is_late;
                row.submitted_at = row.submitted_at.or(Some(draft.at));
                row.updated_at = draft.at;
                (row.clone(), false)
            }
            None => {
                let id = state.next_id();
                let row = ActivitySubmission {
                    id,
                    activity_id: draft.activity_id,
                    student_id: draft.student_id,
                    submission_text: draft.submission_text,
                    checkpoint_data: draft.checkpoint_data,
                    is_late: draft.is_late,
                    submitted_at: Some(draft.at),
                    updated_at: draft.at,
                    grade: None,
                    feedback: None,
                    graded_by: None,
                    graded_at: None,
                };
                state.submissions.insert(id, row.clone());
                (row, true)
            }
        };
        let inserted =
            state.insert_attachments(AttachmentOwner::Submission(submission.id), attachments);
        Ok((UpsertedSubmission { submission, created }, inserted))
    }

    async fn upsert_checkpoint(
        &self,
        activity_id: i64,
        student_id: i64,
        checkpoint: JsonValue,
        at: DateTime<Utc>,
    ) -> Result<UpsertedSubmission> {
        let mut state = self.lock()?;
        let existing = state.submission_for(activity_id, student_id);
        if let Some(id) = existing {
            let row = state
                .submissions
                .get_mut(&id)
                .ok_or_else(|| Error::Internal(format!("submission {} vanished", id)))?;
            row.checkpoint_data = Some(checkpoint);
            row.updated_at = at;
            return Ok(UpsertedSubmission {
                submission: row.clone(),
                created: false,
            });
        }

        let id = state.next_id();
        let row = ActivitySubmission {
            id,
            activity_id,
            student_id,
            submission_text: None,
            checkpoint_data: Some(checkpoint),
            is_late: false,
            submitted_at: None,
            updated_at: at,
            grade: None,
            feedback: None,
            graded_by: None,
            graded_at: None,
        };
        state.submissions.insert(id, row.clone());
        Ok(UpsertedSubmission {
            submission: row,
            created: true,
        })
    }

    async fn list_for_activity(&self, activity_id: i64) -> Result<Vec<SubmissionWithStudent>> {
        let state = self.read()?;
        let mut rows: Vec<SubmissionWithStudent> = state
            .submissions
            .values()
            .filter(|s| s.activity_id == activity_id)
            .filter_map(|s| {
                let user = state.users.get(&s.student_id)?;
                Some(SubmissionWithStudent {
                    submission: s.clone(),
                    student_name: user.name.clone(),
                    student_email: user.email.clone(),
                })
            })
            .collect();
        // None sorts last, matching DESC NULLS LAST.
        rows.sort_by(|a, b| {
            b.submission
                .submitted_at
                .cmp(&a.submission.submitted_at)
                .then_with(|| b.submission.updated_at.cmp(&a.submission.updated_at))
                .then_with(|| b.submission.id.cmp(&a.submission.id))
        });
        Ok(rows)
    }

    async fn save_grade(&self, id: i64, update: GradeUpdate) -> Result<ActivitySubmission> {
        let mut state = self.lock()?;
        let row = state
            .submissions
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound(format!("Submission {} not found", id)))?;
        if update.grade.is_some() {
            row.grade = update.grade;
        }
        if update.feedback.is_some() {
            row.feedback = update.feedback;
        }
        row.graded_by = Some(update.graded_by);
        row.graded_at = Some(update.graded_at);
        Ok(row.clone())
    }

    async fn instructor_for_submission(&self, submission_id: i64) -> Result<Option<i64>> {
        let state = self.read()?;
        Ok(state
            .submissions
            .get(&submission_id)
            .and_then(|s| state.activities.get(&s.activity_id))
            .map(|a| a.instructor_id))
    }
}

#[async_trait]
impl AttachmentRepository for MemoryStore {
    async fn list_attachments(&self, owner: AttachmentOwner) -> Result<Vec<AttachmentRecord>> {
        Ok(self.read()?.attachments_of(owner))
    }

    async fn list_submission_attachments(
        &self,
        submission_ids: &[i64],
    ) -> Result<Vec<AttachmentRecord>> {
        let state = self.read()?;
        let mut records: Vec<AttachmentRecord> = state
            .attachments
            .values()
            .filter(|(owner, _)| {
                matches!(owner, AttachmentOwner::Submission(id) if submission_ids.contains(id))
            })
            .map(|(_, record)| record.clone())
            .collect();
        sort_newest_first(&mut records);
        Ok(records)
    }
}
