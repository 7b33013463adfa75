//! Runs against a real database: `DATABASE_URL=... cargo test -- --ignored`.

use std::env;
use std::sync::Arc;

use chrono::Utc;
use classroom_backend::models::activity::{ActivityConfig, ActivityType, NewActivity};
use classroom_backend::models::submission::SubmissionDraft;
use classroom_backend::repositories::{ActivityRepository, PgStore, SubmissionRepository};
use serde_json::json;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

async fn store() -> PgStore {
    dotenvy::dotenv().ok();
    let url = env::var("DATABASE_URL").expect("DATABASE_URL");
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&url)
        .await
        .expect("pool");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("migrations");
    PgStore::new(pool)
}

async fn seed_user(store: &PgStore, role: &str) -> i64 {
    let tag = Uuid::new_v4();
    sqlx::query_scalar::<_, i64>(
        "INSERT INTO users (name, email, role) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(format!("{} {}", role, tag))
    .bind(format!("{}@example.com", tag))
    .bind(role)
    .fetch_one(store.pool())
    .await
    .expect("seed user")
}

#[tokio::test]
#[ignore]
async fn concurrent_upserts_keep_one_row() {
    let store = Arc::new(store().await);
    let instructor = seed_user(&store, "instructor").await;
    let student = seed_user(&store, "student").await;
    let (activity, _) = store
        .create_activity(
            NewActivity {
                instructor_id: instructor,
                title: "Race".into(),
                description: String::new(),
                activity_type: ActivityType::DragDrop,
                config: ActivityConfig::default(),
            },
            Vec::new(),
        )
        .await
        .expect("activity");

    let mut handles = Vec::new();
    for i in 0..10 {
        let store = store.clone();
        let activity_id = activity.id;
        handles.push(tokio::spawn(async move {
            if i % 2 == 0 {
                store
                    .upsert_submission(
                        SubmissionDraft {
                            activity_id,
                            student_id: student,
                            submission_text: Some(format!("attempt {}", i)),
                            checkpoint_data: None,
                            is_late: false,
                            at: Utc::now(),
                        },
                        Vec::new(),
                    )
                    .await
                    .map(|(u, _)| u.submission.id)
            } else {
                store
                    .upsert_checkpoint(activity_id, student, json!({ "i": i }), Utc::now())
                    .await
                    .map(|u| u.submission.id)
            }
        }));
    }
    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.expect("join").expect("upsert"));
    }
    ids.dedup();
    assert_eq!(ids.len(), 1);

    let rows: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM activity_submissions WHERE activity_id = $1 AND student_id = $2",
    )
    .bind(activity.id)
    .bind(student)
    .fetch_one(store.pool())
    .await
    .expect("count");
    assert_eq!(rows, 1);

    let removed = store.delete_activity(activity.id).await.expect("delete");
    assert!(removed.is_empty());
    assert!(store.find_submission(ids[0]).await.expect("find").is_none());
}
