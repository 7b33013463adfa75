pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod services;
pub mod storage;
pub mod utils;

use std::sync::Arc;

use crate::config::Config;
use crate::repositories::{ActivityRepository, AttachmentRepository, SubmissionRepository};
use crate::services::{
    access_gate::AccessGate, activity_service::ActivityService,
    reconciler::AttachmentReconciler, submission_service::SubmissionService,
};
use crate::storage::BlobStore;
use crate::utils::time::{Clock, SystemClock};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub blobs: Arc<dyn BlobStore>,
    pub submission_service: SubmissionService,
    pub activity_service: ActivityService,
}

impl AppState {
    pub fn new(
        config: Config,
        activities: Arc<dyn ActivityRepository>,
        submissions: Arc<dyn SubmissionRepository>,
        attachments: Arc<dyn AttachmentRepository>,
        blobs: Arc<dyn BlobStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let reconciler = AttachmentReconciler::new(attachments, blobs.clone(), config.blob_timeout);
        let gate = AccessGate::new(activities.clone(), submissions.clone());
        let submission_service = SubmissionService::new(
            activities.clone(),
            submissions,
            reconciler.clone(),
            gate.clone(),
            clock,
        );
        let activity_service = ActivityService::new(activities, reconciler, gate);

        Self {
            config: Arc::new(config),
            blobs,
            submission_service,
            activity_service,
        }
    }

    /// Wires every repository seam to one store that implements all of them.
    pub fn with_store<S>(config: Config, store: Arc<S>, blobs: Arc<dyn BlobStore>) -> Self
    where
        S: ActivityRepository + SubmissionRepository + AttachmentRepository + 'static,
    {
        Self::new(
            config,
            store.clone(),
            store.clone(),
            store,
            blobs,
            Arc::new(SystemClock),
        )
    }
}
