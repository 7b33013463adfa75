mod common;

use axum::http::StatusCode;
use serde_json::Value as JsonValue;

use common::{
    create_activity, get_request, multipart_request, send, spawn_app, token, Part, INSTRUCTOR,
    OTHER_INSTRUCTOR, STUDENT,
};

fn attachment_id(body: &JsonValue, name: &str) -> i64 {
    body["attachments"]
        .as_array()
        .expect("attachments")
        .iter()
        .find(|a| a["originalName"] == name)
        .and_then(|a| a["id"].as_i64())
        .expect("attachment id")
}

fn attachment_path(body: &JsonValue, name: &str) -> String {
    body["attachments"]
        .as_array()
        .expect("attachments")
        .iter()
        .find(|a| a["originalName"] == name)
        .and_then(|a| a["path"].as_str())
        .expect("attachment path")
        .to_string()
}

fn names(body: &JsonValue) -> Vec<String> {
    body["attachments"]
        .as_array()
        .expect("attachments")
        .iter()
        .filter_map(|a| a["originalName"].as_str().map(str::to_string))
        .collect()
}

#[tokio::test]
async fn create_and_fetch_activity() {
    let app = spawn_app();
    let (activity_id, created) = create_activity(
        &app,
        r#"{"due_date_time":"2030-05-01T12:00:00Z","board":{"rows":2}}"#,
        &[("brief.pdf", "%PDF-1.4")],
    )
    .await;
    assert_eq!(created["type"], "assignment");
    assert_eq!(created["instructorId"], INSTRUCTOR);

    let (status, fetched) = send(
        &app.router,
        get_request(&format!("/api/activities/{}", activity_id), &token(STUDENT, "student")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["title"], "Week 1 essay");
    assert_eq!(fetched["config"]["board"]["rows"], 2);
    assert_eq!(fetched["attachments"][0]["assetType"], "file");
    assert_eq!(fetched["attachments"][0]["uploadedBy"], INSTRUCTOR);

    let path = attachment_path(&fetched, "brief.pdf");
    let res = send(
        &app.router,
        axum::http::Request::builder()
            .uri(format!("/uploads/{}", path))
            .body(axum::body::Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(res.0, StatusCode::OK);

    let (status, _) = send(
        &app.router,
        multipart_request(
            "POST",
            "/api/activities",
            &token(STUDENT, "student"),
            &[Part::Text("title", "Nope"), Part::Text("type", "quiz")],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &app.router,
        multipart_request(
            "POST",
            "/api/activities",
            &token(INSTRUCTOR, "instructor"),
            &[Part::Text("title", "Odd"), Part::Text("type", "essay")],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn update_keeps_only_listed_attachments() {
    let app = spawn_app();
    let (activity_id, created) = create_activity(
        &app,
        "{}",
        &[("x.pdf", "x-bytes"), ("y.pdf", "y-bytes")],
    )
    .await;
    let x = attachment_id(&created, "x.pdf");
    let y_path = attachment_path(&created, "y.pdf");
    assert!(app.uploads.path().join(&y_path).exists());

    let keep = x.to_string();
    let (status, updated) = send(
        &app.router,
        multipart_request(
            "PUT",
            &format!("/api/activities/{}", activity_id),
            &token(INSTRUCTOR, "instructor"),
            &[
                Part::Text("title", "Week 1 essay (revised)"),
                Part::Text("keepAttachmentIds", &keep),
                Part::File("files", "z.pdf", b"z-bytes"),
            ],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", updated);
    assert_eq!(names(&updated), vec!["z.pdf", "x.pdf"]);
    assert!(!app.uploads.path().join(&y_path).exists());

    let (_, fetched) = send(
        &app.router,
        get_request(&format!("/api/activities/{}", activity_id), &token(INSTRUCTOR, "instructor")),
    )
    .await;
    assert_eq!(fetched["title"], "Week 1 essay (revised)");
    assert_eq!(fetched["description"], "Write about ownership");
    assert_eq!(names(&fetched), vec!["z.pdf", "x.pdf"]);
}

#[tokio::test]
async fn absent_or_blank_keep_list_removes_everything() {
    let app = spawn_app();
    let instructor = token(INSTRUCTOR, "instructor");

    let (activity_id, created) =
        create_activity(&app, "{}", &[("a.pdf", "a"), ("b.pdf", "b")]).await;
    let uri = format!("/api/activities/{}", activity_id);
    let (status, retitled) = send(
        &app.router,
        multipart_request("PUT", &uri, &instructor, &[Part::Text("title", "t2")]),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", retitled);
    assert!(names(&retitled).is_empty());
    for name in ["a.pdf", "b.pdf"] {
        let path = attachment_path(&created, name);
        assert!(!app.uploads.path().join(path).exists());
    }
    let (_, fetched) = send(&app.router, get_request(&uri, &instructor)).await;
    assert_eq!(fetched["title"], "t2");

    let (activity_id, created) =
        create_activity(&app, "{}", &[("c.pdf", "c"), ("d.pdf", "d")]).await;
    let uri = format!("/api/activities/{}", activity_id);
    let (status, cleared) = send(
        &app.router,
        multipart_request("PUT", &uri, &instructor, &[Part::Text("keepAttachmentIds", "")]),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(names(&cleared).is_empty());
    for name in ["c.pdf", "d.pdf"] {
        let path = attachment_path(&created, name);
        assert!(!app.uploads.path().join(path).exists());
    }
}

#[tokio::test]
async fn other_instructor_cannot_update_or_delete() {
    let app = spawn_app();
    let (activity_id, created) = create_activity(&app, "{}", &[("keep.pdf", "k")]).await;
    let uri = format!("/api/activities/{}", activity_id);
    let intruder = token(OTHER_INSTRUCTOR, "instructor");

    let (status, _) = send(
        &app.router,
        multipart_request(
            "PUT",
            &uri,
            &intruder,
            &[
                Part::Text("title", "Hijacked"),
                Part::Text("keepAttachmentIds", ""),
                Part::File("files", "evil.pdf", b"e"),
            ],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let res = send(
        &app.router,
        axum::http::Request::builder()
            .method("DELETE")
            .uri(&uri)
            .header("authorization", format!("Bearer {}", intruder))
            .body(axum::body::Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(res.0, StatusCode::FORBIDDEN);

    let (_, fetched) = send(&app.router, get_request(&uri, &token(INSTRUCTOR, "instructor"))).await;
    assert_eq!(fetched["title"], "Week 1 essay");
    assert_eq!(names(&fetched), vec!["keep.pdf"]);
    assert!(app.uploads.path().join(attachment_path(&created, "keep.pdf")).exists());

    let classwork = std::fs::read_dir(app.uploads.path().join("classwork"))
        .expect("classwork dir")
        .count();
    assert_eq!(classwork, 1);
}

#[tokio::test]
async fn delete_cascades_to_submissions_and_files() {
    let app = spawn_app();
    let (activity_id, created) = create_activity(&app, "{}", &[("brief.pdf", "b")]).await;
    let student = token(STUDENT, "student");
    let instructor = token(INSTRUCTOR, "instructor");

    let (status, submitted) = send(
        &app.router,
        multipart_request(
            "POST",
            &format!("/api/activities/{}/submissions", activity_id),
            &student,
            &[
                Part::Text("submissionText", "done"),
                Part::File("files", "answer.pdf", b"a"),
            ],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let answer_path = submitted["attachments"][0]["path"].as_str().unwrap().to_string();
    let brief_path = attachment_path(&created, "brief.pdf");

    let uri = format!("/api/activities/{}", activity_id);
    let res = send(
        &app.router,
        axum::http::Request::builder()
            .method("DELETE")
            .uri(&uri)
            .header("authorization", format!("Bearer {}", instructor))
            .body(axum::body::Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(res.0, StatusCode::NO_CONTENT);

    let (status, _) = send(&app.router, get_request(&uri, &instructor)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(app.store.submission_rows(activity_id, STUDENT).unwrap(), 0);
    assert!(!app.uploads.path().join(answer_path).exists());
    assert!(!app.uploads.path().join(brief_path).exists());

    let (_, own) = send(
        &app.router,
        get_request(&format!("/api/activities/{}/submissions/me", activity_id), &student),
    )
    .await;
    assert!(own["submission"].is_null());
}
