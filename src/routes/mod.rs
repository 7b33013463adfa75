pub mod activities;
pub mod health;
pub mod submissions;
pub mod upload;

use axum::{
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::middleware::{
    auth::require_auth,
    cors::api_cors,
    rate_limit::{rps_middleware, RateLimiter},
};
use crate::AppState;

/// The full HTTP surface: health, authenticated API and stored uploads.
pub fn app(state: AppState) -> Router {
    let config = state.config.clone();

    let api = Router::new()
        .route("/api/activities", post(activities::create_activity))
        .route(
            "/api/activities/:activity_id",
            get(activities::get_activity)
                .put(activities::update_activity)
                .delete(activities::delete_activity),
        )
        .route(
            "/api/activities/:activity_id/submissions",
            get(submissions::list_submissions).post(submissions::submit_work),
        )
        .route(
            "/api/activities/:activity_id/submissions/me",
            get(submissions::get_own_submission),
        )
        .route(
            "/api/activities/:activity_id/checkpoint",
            post(submissions::save_checkpoint),
        )
        .route(
            "/api/submissions/:submission_id/grade",
            post(submissions::grade_submission),
        )
        .route_layer(from_fn_with_state(state.clone(), require_auth))
        .layer(from_fn_with_state(
            RateLimiter::new(config.api_rps),
            rps_middleware,
        ));

    tracing::info!(uploads_dir = %config.uploads_dir.display(), "Serving uploads");

    Router::new()
        .route("/health", get(health::health))
        .merge(api)
        .nest_service("/uploads", ServeDir::new(&config.uploads_dir))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(api_cors())
                .layer(DefaultBodyLimit::max(config.max_upload_bytes)),
        )
}
