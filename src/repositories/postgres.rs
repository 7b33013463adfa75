use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Transaction};

use super::{ActivityRepository, AttachmentRepository, SubmissionRepository};
use crate::error::{Error, Result};
use crate::models::activity::{Activity, ActivityUpdate, NewActivity};
use crate::models::attachment::{AttachmentChanges, AttachmentOwner, AttachmentRecord, NewAttachment};
use crate::models::submission::{
    ActivitySubmission, GradeUpdate, SubmissionDraft, SubmissionWithStudent, UpsertedSubmission,
};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

async fn insert_attachments(
    tx: &mut Transaction<'_, Postgres>,
    owner: AttachmentOwner,
    attachments: Vec<NewAttachment>,
) -> Result<Vec<AttachmentRecord>> {
    let mut inserted = Vec::with_capacity(attachments.len());
    for attachment in attachments {
        let record = match owner {
            AttachmentOwner::Activity(activity_id) => {
                sqlx::query_as::<_, AttachmentRecord>(
                    r#"
                    INSERT INTO classwork_attachments (
                        activity_id, asset_type, original_name, stored_name, path,
                        due_date_override, mime_type, size, uploaded_by, uploaded_at
                    ) VALUES ($1, COALESCE($2, 'file'), $3, $4, $5, $6, $7, $8, $9, $10)
                    RETURNING id, activity_id AS owner_id, asset_type, original_name, stored_name, path,
                              due_date_override, mime_type, size, uploaded_by, uploaded_at
                    "#,
                )
                .bind(activity_id)
                .bind(attachment.meta.asset_type)
                .bind(attachment.file.original_name)
                .bind(attachment.file.stored_name)
                .bind(attachment.file.path)
                .bind(attachment.meta.due_date_override)
                .bind(attachment.file.mime_type)
                .bind(attachment.file.size)
                .bind(attachment.meta.uploaded_by)
                .bind(attachment.uploaded_at)
                .fetch_one(&mut **tx)
                .await?
            }
            AttachmentOwner::Submission(submission_id) => {
                sqlx::query_as::<_, AttachmentRecord>(
                    r#"
                    INSERT INTO submission_attachments (
                        submission_id, original_name, stored_name, path, mime_type, size, uploaded_at
                    ) VALUES ($1, $2, $3, $4, $5, $6, $7)
                    RETURNING id, submission_id AS owner_id, NULL::text AS asset_type, original_name,
                              stored_name, path, NULL::timestamptz AS due_date_override, mime_type, size,
                              NULL::bigint AS uploaded_by, uploaded_at
                    "#,
                )
                .bind(submission_id)
                .bind(attachment.file.original_name)
                .bind(attachment.file.stored_name)
                .bind(attachment.file.path)
                .bind(attachment.file.mime_type)
                .bind(attachment.file.size)
                .bind(attachment.uploaded_at)
                .fetch_one(&mut **tx)
                .await?
            }
        };
        inserted.push(record);
    }
    Ok(inserted)
}

async fn delete_attachments(
    tx: &mut Transaction<'_, Postgres>,
    owner: AttachmentOwner,
    ids: &[i64],
) -> Result<()> {
    if ids.is_empty() {
        return Ok(());
    }
    let query = match owner {
        AttachmentOwner::Activity(_) => {
            "DELETE FROM classwork_attachments WHERE activity_id = $1 AND id = ANY($2)"
        }
        AttachmentOwner::Submission(_) => {
            "DELETE FROM submission_attachments WHERE submission_id = $1 AND id = ANY($2)"
        }
    };
    sqlx::query(query)
        .bind(owner.id())
        .bind(ids)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

#[async_trait]
impl ActivityRepository for PgStore {
    async fn create_activity(
        &self,
        activity: NewActivity,
        attachments: Vec<NewAttachment>,
    ) -> Result<(Activity, Vec<AttachmentRecord>)> {
        let mut tx = self.pool.begin().await?;
        let created = sqlx::query_as::<_, Activity>(
            r#"
            INSERT INTO activities (instructor_id, title, description, activity_type, config)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(activity.instructor_id)
        .bind(activity.title)
        .bind(activity.description)
        .bind(activity.activity_type.as_str())
        .bind(Json(activity.config))
        .fetch_one(&mut *tx)
        .await?;

        let inserted =
            insert_attachments(&mut tx, AttachmentOwner::Activity(created.id), attachments).await?;
        tx.commit().await?;
        Ok((created, inserted))
    }

    async fn find_activity(&self, id: i64) -> Result<Option<Activity>> {
        let activity = sqlx::query_as::<_, Activity>(r#"SELECT * FROM activities WHERE id = $1"#)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(activity)
    }

    async fn update_activity(
        &self,
        id: i64,
        update: ActivityUpdate,
        changes: AttachmentChanges,
    ) -> Result<(Activity, Vec<AttachmentRecord>)> {
        let mut tx = self.pool.begin().await?;
        let updated = sqlx::query_as::<_, Activity>(
            r#"
            UPDATE activities
            SET title = $1, description = $2, config = $3, updated_at = NOW()
            WHERE id = $4
            RETURNING *
            "#,
        )
        .bind(update.title)
        .bind(update.description)
        .bind(Json(update.config))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Activity {} not found", id)))?;

        let owner = AttachmentOwner::Activity(id);
        delete_attachments(&mut tx, owner, &changes.delete_ids).await?;
        let inserted = insert_attachments(&mut tx, owner, changes.insert).await?;
        tx.commit().await?;
        Ok((updated, inserted))
    }

    async fn delete_activity(&self, id: i64) -> Result<Vec<AttachmentRecord>> {
        let mut tx = self.pool.begin().await?;

        let mut removed = sqlx::query_as::<_, AttachmentRecord>(
            r#"
            DELETE FROM classwork_attachments WHERE activity_id = $1
            RETURNING id, activity_id AS owner_id, asset_type, original_name, stored_name, path,
                      due_date_override, mime_type, size, uploaded_by, uploaded_at
            "#,
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;

        let submission_files = sqlx::query_as::<_, AttachmentRecord>(
            r#"
            DELETE FROM submission_attachments
            WHERE submission_id IN (SELECT id FROM activity_submissions WHERE activity_id = $1)
            RETURNING id, submission_id AS owner_id, NULL::text AS asset_type, original_name,
                      stored_name, path, NULL::timestamptz AS due_date_override, mime_type, size,
                      NULL::bigint AS uploaded_by, uploaded_at
            "#,
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;
        removed.extend(submission_files);

        sqlx::query(r#"DELETE FROM activity_submissions WHERE activity_id = $1"#)
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query(r#"DELETE FROM activities WHERE id = $1"#)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("Activity {} not found", id)));
        }

        tx.commit().await?;
        Ok(removed)
    }
}

#[async_trait]
impl SubmissionRepository for PgStore {
    async fn find_submission(&self, id: i64) -> Result<Option<ActivitySubmission>> {
        let submission = sqlx::query_as::<_, ActivitySubmission>(
            r#"SELECT * FROM activity_submissions WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(submission)
    }

    async fn find_for_student(
        &self,
        activity_id: i64,
        student_id: i64,
    ) -> Result<Option<ActivitySubmission>> {
        let submission = sqlx::query_as::<_, ActivitySubmission>(
            r#"SELECT * FROM activity_submissions WHERE activity_id = $1 AND student_id = $2"#,
        )
        .bind(activity_id)
        .bind(student_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(submission)
    }

    async fn upsert_submission(
        &self,
        draft: SubmissionDraft,
        attachments: Vec<NewAttachment>,
    ) -> Result<(UpsertedSubmission, Vec<AttachmentRecord>)> {
        let mut tx = self.pool.begin().await?;
        let upserted = sqlx::query_as::<_, UpsertedSubmission>(
            r#"
            INSERT INTO activity_submissions (
                activity_id, student_id, submission_text, checkpoint_data, is_late, submitted_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $6)
            ON CONFLICT (activity_id, student_id) DO UPDATE SET
                submission_text = EXCLUDED.submission_text,
                checkpoint_data = EXCLUDED.checkpoint_data,
                is_late = EXCLUDED.is_late,
                submitted_at = COALESCE(activity_submissions.submitted_at, EXCLUDED.submitted_at),
                updated_at = EXCLUDED.updated_at
            RETURNING *, (xmax = 0) AS created
            "#,
        )
        .bind(draft.activity_id)
        .bind(draft.student_id)
        .bind(draft.submission_text)
        .bind(draft.checkpoint_data)
        .bind(draft.is_late)
        .bind(draft.at)
        .fetch_one(&mut *tx)
        .await?;

        let inserted = insert_attachments(
            &mut tx,
            AttachmentOwner::Submission(upserted.submission.id),
            attachments,
        )
        .await?;
        tx.commit().await?;
        Ok((upserted, inserted))
    }

    async fn upsert_checkpoint(
        &self,
        activity_id: i64,
        student_id: i64,
        checkpoint: JsonValue,
        at: DateTime<Utc>,
    ) -> Result<UpsertedSubmission> {
        let upserted = sqlx::query_as::<_, UpsertedSubmission>(
            r#"
            INSERT INTO activity_submissions (activity_id, student_id, checkpoint_data, updated_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (activity_id, student_id) DO UPDATE SET
                checkpoint_data = EXCLUDED.checkpoint_data,
                updated_at = EXCLUDED.updated_at
            RETURNING *, (xmax = 0) AS created
            "#,
        )
        .bind(activity_id)
        .bind(student_id)
        .bind(checkpoint)
        .bind(at)
        .fetch_one(&self.pool)
        .await?;
        Ok(upserted)
    }

    async fn list_for_activity(&self, activity_id: i64) -> Result<Vec<SubmissionWithStudent>> {
        let rows = sqlx::query_as::<_, SubmissionWithStudent>(
            r#"
            SELECT s.*, u.name AS student_name, u.email AS student_email
            FROM activity_submissions s
            JOIN users u ON u.id = s.student_id
            WHERE s.activity_id = $1
            ORDER BY s.submitted_at DESC NULLS LAST, s.updated_at DESC, s.id DESC
            "#,
        )
        .bind(activity_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn save_grade(&self, id: i64, update: GradeUpdate) -> Result<ActivitySubmission> {
        let submission = sqlx::query_as::<_, ActivitySubmission>(
            r#"
            UPDATE activity_submissions
            SET grade = COALESCE($1, grade),
                feedback = COALESCE($2, feedback),
                graded_by = $3,
                graded_at = $4
            WHERE id = $5
            RETURNING *
            "#,
        )
        .bind(update.grade)
        .bind(update.feedback)
        .bind(update.graded_by)
        .bind(update.graded_at)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Submission {} not found", id)))?;
        Ok(submission)
    }

    async fn instructor_for_submission(&self, submission_id: i64) -> Result<Option<i64>> {
        let instructor_id: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT a.instructor_id
            FROM activity_submissions s
            JOIN activities a ON a.id = s.activity_id
            WHERE s.id = $1
            "#,
        )
        .bind(submission_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(instructor_id)
    }
}

#[async_trait]
impl AttachmentRepository for PgStore {
    async fn list_attachments(&self, owner: AttachmentOwner) -> Result<Vec<AttachmentRecord>> {
        let query = match owner {
            AttachmentOwner::Activity(_) => {
                r#"
                SELECT id, activity_id AS owner_id, asset_type, original_name, stored_name, path,
                       due_date_override, mime_type, size, uploaded_by, uploaded_at
                FROM classwork_attachments
                WHERE activity_id = $1
                ORDER BY uploaded_at DESC, id DESC
                "#
            }
            AttachmentOwner::Submission(_) => {
                r#"
                SELECT id, submission_id AS owner_id, NULL::text AS asset_type, original_name,
                       stored_name, path, NULL::timestamptz AS due_date_override, mime_type, size,
                       NULL::bigint AS uploaded_by, uploaded_at
                FROM submission_attachments
                WHERE submission_id = $1
                ORDER BY uploaded_at DESC, id DESC
                "#
            }
        };
        let records = sqlx::query_as::<_, AttachmentRecord>(query)
            .bind(owner.id())
            .fetch_all(&self.pool)
            .await?;
        Ok(records)
    }

    async fn list_submission_attachments(
        &self,
        submission_ids: &[i64],
    ) -> Result<Vec<AttachmentRecord>> {
        if submission_ids.is_empty() {
            return Ok(Vec::new());
        }
        let records = sqlx::query_as::<_, AttachmentRecord>(
            r#"
            SELECT id, submission_id AS owner_id, NULL::text AS asset_type, original_name,
                   stored_name, path, NULL::timestamptz AS due_date_override, mime_type, size,
                   NULL::bigint AS uploaded_by, uploaded_at
            FROM submission_attachments
            WHERE submission_id = ANY($1)
            ORDER BY uploaded_at DESC, id DESC
            "#,
        )
        .bind(submission_ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(records)
    }
}
