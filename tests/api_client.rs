use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use tasklane::api::TaskClient;
use tasklane::bulk::BulkOp;
use tasklane::error::ApiError;
use tasklane::model::{ItemPatch, Priority};
use tasklane::runtime::{self, Msg, Request};

const TOKEN: &str = "secret-token";

fn client(server: &MockServer) -> TaskClient {
    TaskClient::new(&server.uri(), TOKEN, Duration::from_secs(5)).expect("client")
}

async fn mount_json(server: &MockServer, route: &str, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(route))
        .and(header("authorization", format!("Bearer {TOKEN}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn snapshot_reads_every_collection() {
    let server = MockServer::start().await;
    mount_json(
        &server,
        "/tasks",
        json!([
            {
                "id": "1",
                "content": "Buy milk",
                "project_id": "p1",
                "priority": 4,
                "labels": ["errand"],
                "due": { "date": "2024-01-05", "is_recurring": true, "string": "every fri" }
            },
            { "id": "2", "content": "Read", "project_id": "p1", "section_id": "s1" }
        ]),
    )
    .await;
    mount_json(
        &server,
        "/projects",
        json!([{ "id": "p1", "name": "Inbox", "is_inbox_project": true }]),
    )
    .await;
    mount_json(
        &server,
        "/sections",
        json!([{ "id": "s1", "name": "Later", "project_id": "p1", "order": 1 }]),
    )
    .await;
    mount_json(
        &server,
        "/labels",
        json!([{ "id": "l1", "name": "errand", "is_favorite": true }]),
    )
    .await;

    let snapshot = client(&server).snapshot().await.expect("snapshot");
    assert_eq!(snapshot.items.len(), 2);
    assert!(snapshot.projects[0].inbox);
    assert_eq!(snapshot.sections[0].name, "Later");
    assert!(snapshot.labels[0].favorite);

    let first = &snapshot.items[0];
    assert_eq!(first.priority, Priority::HIGHEST);
    let due = first.due.as_ref().expect("due");
    assert_eq!(due.date, NaiveDate::from_ymd_opt(2024, 1, 5).expect("date"));
    assert!(due.recurring);
    assert_eq!(snapshot.items[1].section_id.as_deref(), Some("s1"));
}

#[tokio::test]
async fn rejected_token_is_reported_as_unauthorized() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/tasks"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Forbidden"))
        .mount(&server)
        .await;

    let err = client(&server).items().await.expect_err("401");
    assert!(err.is_unauthorized());
    match err {
        ApiError::Status { status, body, .. } => {
            assert_eq!(status, 401);
            assert_eq!(body, "Forbidden");
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[tokio::test]
async fn comments_are_requested_per_item() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/comments"))
        .and(query_param("task_id", "42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": "c1", "task_id": "42", "content": "first", "posted_at": "2024-01-01T10:00:00Z" }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let comments = client(&server).comments("42").await.expect("comments");
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0].text, "first");
    assert_eq!(comments[0].item_id, "42");
}

#[tokio::test]
async fn update_sends_only_changed_fields() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/tasks/7"))
        .and(body_partial_json(json!({ "priority": 4 })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "id": "7", "content": "x", "priority": 4 })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let patch = ItemPatch {
        priority: Priority::from_display(1),
        ..ItemPatch::default()
    };
    let item = client(&server)
        .update_item("7", &patch)
        .await
        .expect("update");
    assert_eq!(item.priority, Priority::HIGHEST);
}

#[tokio::test]
async fn bulk_close_reports_partial_failure() {
    let server = MockServer::start().await;
    for id in ["a", "b"] {
        Mock::given(method("POST"))
            .and(path(format!("/tasks/{id}/close")))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;
    }
    Mock::given(method("POST"))
        .and(path("/tasks/c/close"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let msg = runtime::execute(
        Arc::new(client(&server)),
        Request::Bulk {
            op: BulkOp::Complete,
            ids: vec!["a".into(), "b".into(), "c".into()],
        },
    )
    .await;
    match msg {
        Msg::Bulk(report) => {
            assert_eq!(report.succeeded, 2);
            assert_eq!(report.failed, 1);
            assert_eq!(report.message(), "Completed 2 items, 1 failed");
        }
        other => panic!("unexpected message {other:?}"),
    }
}

#[tokio::test]
async fn delete_project_round_trips_through_execute() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/projects/p9"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let request = Request::DeleteProject { id: "p9".into() };
    let msg = runtime::execute(Arc::new(client(&server)), request.clone()).await;
    match msg {
        Msg::Mutation {
            request: echoed,
            result,
        } => {
            assert_eq!(echoed, request);
            assert!(result.is_ok());
        }
        other => panic!("unexpected message {other:?}"),
    }
}

#[test]
fn invalid_base_url_is_rejected() {
    let err = TaskClient::new("not a url", TOKEN, Duration::from_secs(1)).expect_err("bad url");
    assert!(matches!(err, ApiError::BaseUrl(_)));
}
