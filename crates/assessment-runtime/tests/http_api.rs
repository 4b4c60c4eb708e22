use std::time::Duration;

use assessment_runtime::{AssessmentApi, HttpAssessmentApi, RuntimeError, SubmissionPayload};
use assessment_spec::{FileHandle, Response, ResponseMap, SectionSpec};
use serde_json::json;
use wiremock::matchers::{body_json, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> HttpAssessmentApi {
    HttpAssessmentApi::new(server.uri(), Duration::from_secs(5)).expect("client")
}

#[tokio::test]
async fn fetch_reads_sections_and_tolerates_missing_forms() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/assessments/3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jobId": 3,
            "sections": [{
                "id": "s1",
                "title": "Intro",
                "questions": [{ "id": "q1", "type": "short_text", "text": "Name" }]
            }]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/assessments/4"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let api = client(&server);
    let form = api.fetch_assessment("3").await.expect("fetch");
    assert_eq!(form.job_id.as_deref(), Some("3"));
    assert_eq!(form.sections[0].questions[0].id, "q1");

    let missing = api.fetch_assessment("4").await.expect("fetch missing");
    assert!(missing.sections.is_empty());
    assert!(!api.has_assessment("4").await.expect("has"));
}

#[tokio::test]
async fn save_failure_carries_server_message() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/assessments/3"))
        .respond_with(
            ResponseTemplate::new(500).set_body_json(json!({ "message": "random write failure" })),
        )
        .mount(&server)
        .await;

    let err = client(&server)
        .save_assessment("3", &[SectionSpec::default()])
        .await
        .expect_err("rejected");
    match err {
        RuntimeError::TransientWrite { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message, "random write failure");
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[tokio::test]
async fn save_sends_the_section_list() {
    let server = MockServer::start().await;
    let mut section = SectionSpec::new("Intro");
    section.id = "s1".into();
    section.description = None;
    Mock::given(method("PUT"))
        .and(path("/assessments/3"))
        .and(body_json(json!({ "sections": [{ "id": "s1", "title": "Intro", "questions": [] }] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jobId": "3",
            "sections": [{ "id": "s1", "title": "Intro", "questions": [] }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let saved = client(&server)
        .save_assessment("3", &[section])
        .await
        .expect("save");
    assert_eq!(saved.sections.len(), 1);
}

#[tokio::test]
async fn plain_submission_is_json_and_records_are_decoded() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/assessments/3/submit"))
        .and(body_json(json!({ "q1": "Ada" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": 1700000000000u64,
            "jobId": 3,
            "responses": { "q1": "Ada" },
            "submittedAt": 1700000000000u64
        })))
        .mount(&server)
        .await;

    let responses = ResponseMap::from([("q1".to_string(), Response::text("Ada"))]);
    let payload = SubmissionPayload::from_responses(&responses).expect("payload");
    let record = client(&server).submit("3", payload).await.expect("submit");
    assert_eq!(record.id, "1700000000000");
    assert_eq!(record.job_id, "3");
    assert_eq!(record.responses, responses);
}

#[tokio::test]
async fn file_submission_is_multipart() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/assessments/3/submit"))
        .and(header_exists("content-type"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": "sub-1",
            "jobId": "3",
            "responses": {},
            "submittedAt": "2024-05-01T10:00:00Z"
        })))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().expect("tempdir");
    let file_path = dir.path().join("cv.pdf");
    std::fs::write(&file_path, b"%PDF-1.4").expect("write");

    let responses = ResponseMap::from([
        ("q1".to_string(), Response::text("Ada")),
        (
            "cv".to_string(),
            Response::File(FileHandle::from_path(&file_path).expect("handle")),
        ),
    ]);
    let payload = SubmissionPayload::from_responses(&responses).expect("payload");
    assert!(payload.is_multipart());
    client(&server).submit("3", payload).await.expect("submit");

    let requests = server.received_requests().await.expect("recorded");
    let content_type = requests[0]
        .headers
        .get("content-type")
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(content_type.starts_with("multipart/form-data"));
    let body = String::from_utf8_lossy(&requests[0].body);
    assert!(body.contains("name=\"cv\""));
    assert!(body.contains("filename=\"cv.pdf\""));
    assert!(body.contains("%PDF-1.4"));
    assert!(body.contains("\"Ada\""));
}

#[tokio::test]
async fn submissions_are_listed_newest_first() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/assessments/3/submissions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [
                { "id": "old", "jobId": 3, "responses": {}, "submittedAt": 1000 },
                { "id": "new", "jobId": 3, "responses": {}, "submittedAt": 3000 }
            ],
            "total": 2
        })))
        .mount(&server)
        .await;

    let page = client(&server)
        .list_submissions("3")
        .await
        .expect("list");
    assert_eq!(page.total, 2);
    assert_eq!(page.items[0].id, "new");
}
