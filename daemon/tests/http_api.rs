use axum::body::Body;
use axum::extract::connect_info::MockConnectInfo;
use axum::http::{Request, StatusCode};
use axum::Router;
use common::{Job, JobRecord, JobOutcome, JobReport, JobStatus, ResultInfo};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use taskq_daemon::clock::{SystemClock, ThreadSleeper};
use taskq_daemon::store::{RetryPolicy, SqliteConnector};
use taskq_daemon::{routes, Dispatcher, StoreClient};
use tower::ServiceExt;

fn store_at(path: std::path::PathBuf) -> StoreClient {
    let connector = SqliteConnector::new(path, Duration::from_secs(5));
    let retry = RetryPolicy { attempts: 2, delay: Duration::ZERO };
    StoreClient::new(Arc::new(connector), Arc::new(ThreadSleeper), retry)
}

fn app(store: StoreClient, peer: [u8; 4]) -> Router {
    let dispatcher = Dispatcher::new(store, Arc::new(SystemClock));
    routes::router(dispatcher).layer(MockConnectInfo(SocketAddr::from((peer, 40000))))
}

fn test_app(dir: &tempfile::TempDir, peer: [u8; 4]) -> Router {
    let store = store_at(dir.path().join("jobs.db"));
    store.migrate().unwrap();
    app(store, peer)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<String>) -> (StatusCode, Vec<u8>) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(body) => {
            builder = builder.header("content-type", "application/json");
            Body::from(body)
        }
        None => Body::empty(),
    };
    let response = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, bytes.to_vec())
}

async fn claim(app: &Router) -> Value {
    let (status, body) = send(app, "GET", "/get_job", None).await;
    assert_eq!(status, StatusCode::OK);
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn empty_queue_returns_empty_object() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(&dir, [10, 0, 0, 1]);
    for _ in 0..3 {
        assert_eq!(claim(&app).await, json!({}));
    }
}

#[tokio::test]
async fn create_echoes_body() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(&dir, [10, 0, 0, 1]);
    let body = r#"{"job_type": "count", "job_arg": "/tmp/words.txt"}"#;

    let (status, echoed) = send(&app, "POST", "/task", Some(body.to_string())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(echoed, body.as_bytes());
}

#[tokio::test]
async fn create_rejects_invalid_bodies() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(&dir, [10, 0, 0, 1]);

    for body in [
        "not json",
        r#"{"job_type": "format_disk", "job_arg": "/"}"#,
        r#"{"job_type": "create_file"}"#,
        r#"{"job_arg": "/tmp/a"}"#,
    ] {
        let (status, _) = send(&app, "POST", "/task", Some(body.to_string())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "body {}", body);
    }
    assert_eq!(claim(&app).await, json!({}));
}

#[tokio::test]
async fn create_claim_report_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(&dir, [10, 0, 0, 1]);

    let (status, _) = send(
        &app,
        "POST",
        "/task",
        Some(json!({"job_type": "create_file", "job_arg": "/tmp/a"}).to_string()),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let job: Job = serde_json::from_value(claim(&app).await).unwrap();
    assert_eq!(job.status, JobStatus::InProgress);
    assert_eq!(job.client_host, "10.0.0.1");
    assert_eq!(job.job_arg, "/tmp/a");
    assert!(job.stime.is_some());

    let report = JobReport(job.clone(), ResultInfo::pass("File /tmp/a created", 0.1));
    let (status, body) = send(&app, "PUT", "/job_result", Some(serde_json::to_string(&report).unwrap())).await;
    assert_eq!(status, StatusCode::OK);
    let finished: Job = serde_json::from_slice(&body).unwrap();
    assert_eq!(finished.status, JobStatus::Finished);

    assert_eq!(claim(&app).await, json!({}));

    let (status, body) = send(&app, "GET", &format!("/job/{}", job.id), None).await;
    assert_eq!(status, StatusCode::OK);
    let record: JobRecord = serde_json::from_slice(&body).unwrap();
    assert_eq!(record.job.status, JobStatus::Finished);
    let result = record.result.unwrap();
    assert_eq!(result.result, JobOutcome::Pass);
    assert_eq!(result.result_info, "File /tmp/a created");
}

#[tokio::test]
async fn report_unknown_job_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(&dir, [10, 0, 0, 1]);

    let body = json!([{"id": 4242}, {"result": "ERROR", "result_info": "boom", "run_time": 0.0}]);
    let (status, _) = send(&app, "PUT", "/job_result", Some(body.to_string())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, "GET", "/job/4242", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn report_rejects_malformed_body() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(&dir, [10, 0, 0, 1]);

    for body in ["{}", r#"[{"id": 1}]"#, r#"[{"id": 1}, {"result": "MAYBE", "result_info": ""}]"#] {
        let (status, _) = send(&app, "PUT", "/job_result", Some(body.to_string())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "body {}", body);
    }
}

#[tokio::test]
async fn store_failure_is_reported_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(store_at(dir.path().join("missing").join("jobs.db")), [10, 0, 0, 1]);

    let (status, _) = send(&app, "GET", "/get_job", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(
        &app,
        "POST",
        "/task",
        Some(json!({"job_type": "count", "job_arg": "/tmp/a"}).to_string()),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unknown_paths_are_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(&dir, [10, 0, 0, 1]);
    let (status, _) = send(&app, "GET", "/update", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
