use std::sync::Arc;

use serde_json::Value;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use openparliament::config::AppConfig;
use openparliament::core::error::AppError;
use openparliament::features::jobs::{Job, JobContext, find_job, job_names, run_job};
use openparliament::store::Store;

fn context(dir: &TempDir, server: &MockServer) -> JobContext {
    let mut config = AppConfig::for_data_dir(dir.path());
    config.source_base = server.uri();
    config.admin_notify_url = Some(format!("{}/notify", server.uri()));
    let store = Store::temporary().expect("store");
    JobContext::new(Arc::new(config), Arc::new(store)).expect("context")
}

#[test]
fn every_registered_job_can_be_found() {
    let names = job_names();
    assert!(names.contains(&"hansards"));
    assert!(names.contains(&"corpus_for_old_debates"));
    for name in names {
        assert_eq!(find_job(name).expect("job").name(), name);
    }
}

#[test]
fn unknown_job_is_rejected() {
    let err = find_job("reticulate_splines").err().expect("unknown job");
    assert!(matches!(err, AppError::BadRequest(message) if message.contains("hansards")));
}

#[tokio::test]
async fn failed_job_notifies_admins() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/notify"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    let dir = TempDir::new().expect("tempdir");
    let ctx = context(&dir, &server);

    // The member list isn't served, so the job fails upstream.
    let err = run_job(&ctx, "mps").await.expect_err("job should fail");
    assert!(matches!(err, AppError::Upstream(_)));

    let requests = server.received_requests().await.expect("recorded requests");
    let notice = requests
        .iter()
        .find(|request| request.url.path() == "/notify")
        .expect("notification");
    let body: Value = serde_json::from_slice(&notice.body).expect("json body");
    assert_eq!(body["subject"], "Exception in job mps");
}

#[tokio::test]
async fn prune_job_succeeds_on_an_empty_database() {
    let server = MockServer::start().await;
    let dir = TempDir::new().expect("tempdir");
    let ctx = context(&dir, &server);
    run_job(&ctx, "prune_activities").await.expect("prune");
}
