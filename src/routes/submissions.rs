use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use validator::Validate;

use crate::dto::submission_dto::{
    CheckpointRequest, CheckpointResponse, GradeRequest, GradeResponse, OwnSubmissionResponse,
    SubmissionListResponse, SubmissionView, SubmitResponse,
};
use crate::error::Result;
use crate::models::user::AuthUser;
use crate::routes::upload::UploadForm;
use crate::services::submission_service::{SubmissionStatus, SubmitRequest};
use crate::storage::UploadPurpose;
use crate::AppState;

#[axum::debug_handler]
pub async fn submit_work(
    State(state): State<AppState>,
    user: AuthUser,
    Path(activity_id): Path<i64>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse> {
    let student_id = user.require_student()?;
    let form = UploadForm::read(&state, &mut multipart, UploadPurpose::Submissions).await?;

    let checkpoint_data = match form.json("checkpointData") {
        Ok(value) => value,
        Err(e) => {
            form.discard(&state).await;
            return Err(e);
        }
    };
    let request = SubmitRequest {
        activity_id,
        student_id,
        submission_text: form.text("submissionText"),
        checkpoint_data,
        files: form.files.clone(),
    };

    let outcome = match state.submission_service.submit(request).await {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::error!(activity_id, student_id, error = %e, "Submission failed");
            form.discard(&state).await;
            return Err(e);
        }
    };

    let status = match outcome.status {
        SubmissionStatus::Created => StatusCode::CREATED,
        SubmissionStatus::Updated => StatusCode::OK,
    };
    Ok((
        status,
        Json(SubmitResponse::from_outcome(outcome, &state.config.public_base_url)),
    ))
}

pub async fn save_checkpoint(
    State(state): State<AppState>,
    user: AuthUser,
    Path(activity_id): Path<i64>,
    Json(payload): Json<CheckpointRequest>,
) -> Result<Json<CheckpointResponse>> {
    let student_id = user.require_student()?;
    payload.validate()?;

    let saved = state
        .submission_service
        .save_checkpoint(activity_id, student_id, payload.to_payload())
        .await?;

    Ok(Json(CheckpointResponse {
        submission_id: saved.id,
        activity_id,
        student_id,
        component: payload.component,
        progress: payload.progress,
        is_completed: payload.is_completed,
        checkpoint_data: payload.checkpoint_data,
    }))
}

pub async fn get_own_submission(
    State(state): State<AppState>,
    user: AuthUser,
    Path(activity_id): Path<i64>,
) -> Result<Json<OwnSubmissionResponse>> {
    let student_id = user.require_student()?;
    let submission = state
        .submission_service
        .get_own_submission(activity_id, student_id)
        .await
        .map(|details| SubmissionView::from_details(details, &state.config.public_base_url));
    Ok(Json(OwnSubmissionResponse { submission }))
}

pub async fn list_submissions(
    State(state): State<AppState>,
    user: AuthUser,
    Path(activity_id): Path<i64>,
) -> Result<Json<SubmissionListResponse>> {
    let instructor_id = user.require_instructor()?;
    let base_url = &state.config.public_base_url;
    let submissions = state
        .submission_service
        .list_submissions(activity_id, instructor_id)
        .await?
        .into_iter()
        .map(|details| SubmissionView::from_details(details, base_url))
        .collect();
    Ok(Json(SubmissionListResponse { submissions }))
}

pub async fn grade_submission(
    State(state): State<AppState>,
    user: AuthUser,
    Path(submission_id): Path<i64>,
    Json(payload): Json<GradeRequest>,
) -> Result<Json<GradeResponse>> {
    let instructor_id = user.require_instructor()?;
    payload.validate()?;

    let graded = state
        .submission_service
        .save_grade(submission_id, instructor_id, payload.grade, payload.feedback)
        .await?;
    Ok(Json(GradeResponse {
        submission_id: graded.id,
        grade: graded.grade,
        feedback: graded.feedback,
        graded_by: graded.graded_by,
        graded_at: graded.graded_at,
    }))
}
