use std::collections::HashSet;

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crate::dto::activity_dto::{ActivityAttachmentsResponse, ActivityView};
use crate::dto::attachment_dto::AttachmentView;
use crate::error::{Error, Result};
use crate::models::activity::{ActivityConfig, ActivityType, ActivityUpdate, NewActivity};
use crate::models::attachment::ClassworkMeta;
use crate::models::user::AuthUser;
use crate::routes::upload::UploadForm;
use crate::storage::UploadPurpose;
use crate::utils::time::from_rfc3339;
use crate::utils::validation::parse_id_list;
use crate::AppState;

fn parse_config(form: &UploadForm) -> Result<Option<ActivityConfig>> {
    form.json("config")?
        .map(|value| {
            serde_json::from_value(value)
                .map_err(|e| Error::BadRequest(format!("config is invalid: {}", e)))
        })
        .transpose()
}

fn classwork_meta(form: &UploadForm, instructor_id: i64) -> Result<ClassworkMeta> {
    let due_date_override = match form.text("dueDateOverride").filter(|v| !v.trim().is_empty()) {
        Some(raw) => Some(
            from_rfc3339(&raw)
                .map_err(|e| Error::BadRequest(format!("dueDateOverride is invalid: {}", e)))?,
        ),
        None => None,
    };
    Ok(ClassworkMeta {
        asset_type: Some(
            form.text("assetType")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| "file".to_string()),
        ),
        due_date_override,
        uploaded_by: Some(instructor_id),
    })
}

fn new_activity(form: &UploadForm, instructor_id: i64) -> Result<NewActivity> {
    let activity_type = form
        .text("type")
        .ok_or_else(|| Error::BadRequest("type is required".to_string()))?
        .parse::<ActivityType>()
        .map_err(|e| Error::BadRequest(e.to_string()))?;
    Ok(NewActivity {
        instructor_id,
        title: form.text("title").unwrap_or_default().trim().to_string(),
        description: form.text("description").unwrap_or_default(),
        activity_type,
        config: parse_config(form)?.unwrap_or_default(),
    })
}

#[axum::debug_handler]
pub async fn create_activity(
    State(state): State<AppState>,
    user: AuthUser,
    mut multipart: Multipart,
) -> Result<impl IntoResponse> {
    let instructor_id = user.require_instructor()?;
    let form = UploadForm::read(&state, &mut multipart, UploadPurpose::Classwork).await?;

    let created = async {
        let input = new_activity(&form, instructor_id)?;
        let meta = classwork_meta(&form, instructor_id)?;
        state
            .activity_service
            .create_activity(input, form.files.clone(), meta)
            .await
    }
    .await;

    match created {
        Ok(created) => Ok((
            StatusCode::CREATED,
            Json(ActivityView::new(created, &state.config.public_base_url)),
        )),
        Err(e) => {
            form.discard(&state).await;
            Err(e)
        }
    }
}

pub async fn get_activity(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(activity_id): Path<i64>,
) -> Result<Json<ActivityView>> {
    let found = state.activity_service.get_activity(activity_id).await?;
    Ok(Json(ActivityView::new(found, &state.config.public_base_url)))
}

/// Text fields left out of the form keep their stored values.
/// `keepAttachmentIds` is the complete list of classwork to keep; leaving it
/// out or blank removes every existing attachment.
#[axum::debug_handler]
pub async fn update_activity(
    State(state): State<AppState>,
    user: AuthUser,
    Path(activity_id): Path<i64>,
    mut multipart: Multipart,
) -> Result<Json<ActivityAttachmentsResponse>> {
    let instructor_id = user.require_instructor()?;
    let form = UploadForm::read(&state, &mut multipart, UploadPurpose::Classwork).await?;

    let updated = async {
        let current = state.activity_service.get_activity(activity_id).await?;
        let update = ActivityUpdate {
            title: form
                .text("title")
                .map(|t| t.trim().to_string())
                .unwrap_or(current.activity.title),
            description: form
                .text("description")
                .unwrap_or(current.activity.description),
            config: parse_config(&form)?.unwrap_or(current.activity.config.0),
        };
        let keep_ids: HashSet<i64> = form
            .text("keepAttachmentIds")
            .map(|raw| parse_id_list(&raw))
            .transpose()?
            .unwrap_or_default();
        let meta = classwork_meta(&form, instructor_id)?;
        state
            .activity_service
            .update_activity(
                activity_id,
                instructor_id,
                update,
                keep_ids,
                form.files.clone(),
                meta,
            )
            .await
    }
    .await;

    match updated {
        Ok(updated) => Ok(Json(ActivityAttachmentsResponse {
            attachments: AttachmentView::from_records(
                updated.attachments,
                &state.config.public_base_url,
            ),
        })),
        Err(e) => {
            tracing::error!(activity_id, instructor_id, error = %e, "Activity update failed");
            form.discard(&state).await;
            Err(e)
        }
    }
}

pub async fn delete_activity(
    State(state): State<AppState>,
    user: AuthUser,
    Path(activity_id): Path<i64>,
) -> Result<StatusCode> {
    let instructor_id = user.require_instructor()?;
    state
        .activity_service
        .delete_activity(activity_id, instructor_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
