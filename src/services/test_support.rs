use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, TimeZone, Utc};

use crate::error::{Error, Result};
use crate::models::activity::{ActivityConfig, ActivityType, NewActivity};
use crate::models::attachment::UploadedFile;
use crate::repositories::{ActivityRepository, MemoryStore};
use crate::storage::{BlobStore, UploadPurpose};

#[derive(Debug, Default)]
enum Mode {
    #[default]
    Ok,
    Failing,
    Slow(Duration),
}

/// Blob store that keeps no bytes and records which paths were removed.
#[derive(Debug, Default)]
pub struct RecordingBlobStore {
    mode: Mode,
    removed: Mutex<Vec<String>>,
}

impl RecordingBlobStore {
    pub fn failing() -> Self {
        Self {
            mode: Mode::Failing,
            ..Default::default()
        }
    }

    pub fn slow(delay: Duration) -> Self {
        Self {
            mode: Mode::Slow(delay),
            ..Default::default()
        }
    }

    pub fn removed(&self) -> Vec<String> {
        self.removed.lock().unwrap().clone()
    }
}

#[async_trait]
impl BlobStore for RecordingBlobStore {
    async fn store(
        &self,
        purpose: UploadPurpose,
        original_name: &str,
        mime_type: &str,
        data: Bytes,
    ) -> Result<UploadedFile> {
        Ok(UploadedFile {
            original_name: original_name.to_string(),
            stored_name: original_name.to_string(),
            path: format!("{}/{}", purpose.dir_name(), original_name),
            mime_type: mime_type.to_string(),
            size: data.len() as i64,
        })
    }

    async fn remove(&self, path: &str) -> Result<()> {
        match self.mode {
            Mode::Ok => {
                self.removed.lock().unwrap().push(path.to_string());
                Ok(())
            }
            Mode::Failing => Err(Error::Storage(format!("disk gone: {}", path))),
            Mode::Slow(delay) => {
                tokio::time::sleep(delay).await;
                Ok(())
            }
        }
    }
}

pub fn upload(name: &str) -> UploadedFile {
    UploadedFile {
        original_name: name.to_string(),
        stored_name: name.to_string(),
        path: format!("classwork/{}", name),
        mime_type: "application/pdf".to_string(),
        size: 4,
    }
}

pub fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
}

pub async fn seed_activity(
    store: &Arc<MemoryStore>,
    instructor_id: i64,
    due: Option<DateTime<Utc>>,
) -> i64 {
    let (activity, _) = store
        .create_activity(
            NewActivity {
                instructor_id,
                title: "Week 1".to_string(),
                description: String::new(),
                activity_type: ActivityType::Assignment,
                config: ActivityConfig {
                    due_date_time: due,
                    ..Default::default()
                },
            },
            Vec::new(),
        )
        .await
        .unwrap();
    activity.id
}
