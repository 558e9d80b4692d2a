use std::sync::Arc;

use recruitment_assistant::{
    config::TableIds,
    services::{
        embed_service::EmbedService,
        knowledge_service::KnowledgeBase,
        nocodb_service::NocoDbService,
        tool_service::{messages, HrTools},
    },
};
use reqwest::Client;
use serde_json::{json, Value as JsonValue};
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn tools(server: &MockServer, store: &std::path::Path) -> HrTools {
    let tables = TableIds {
        candidates: "cand".into(),
        job_opportunities: "jobs".into(),
        hiring_records: "hiring".into(),
        feedbacks: "feedback".into(),
    };
    let records = NocoDbService::new(server.uri(), "nc-test".into(), tables).expect("nocodb");
    let embedder = EmbedService::new(
        Client::new(),
        "sk-test".into(),
        server.uri(),
        "text-embedding-3-large".into(),
    );
    HrTools::new(
        records,
        Arc::new(KnowledgeBase::new(embedder, store.to_path_buf())),
    )
}

#[tokio::test]
async fn list_open_jobs_never_returns_non_open_jobs() {
    let server = MockServer::start().await;
    let store = tempfile::tempdir().unwrap();
    Mock::given(method("GET"))
        .and(path("/api/v2/tables/jobs/records"))
        .and(query_param("where", "(وضعیت,eq,باز)"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "list": [
                { "Id": 1, "عنوان": "Backend Engineer", "وضعیت": "باز" },
                { "Id": 2, "عنوان": "Old Role", "وضعیت": "بسته" },
            ]
        })))
        .mount(&server)
        .await;

    let output = tools(&server, store.path()).list_open_jobs().await;
    let jobs: JsonValue = serde_json::from_str(&output).expect("json output");

    assert_eq!(jobs, json!([{ "Id": 1, "Title": "Backend Engineer" }]));
}

#[tokio::test]
async fn list_open_jobs_reports_empty_board() {
    let server = MockServer::start().await;
    let store = tempfile::tempdir().unwrap();
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "list": [] })))
        .mount(&server)
        .await;

    let output = tools(&server, store.path()).list_open_jobs().await;
    assert_eq!(output, messages::NO_OPEN_JOBS);
}

#[tokio::test]
async fn apply_for_job_creates_titled_hiring_record() {
    let server = MockServer::start().await;
    let store = tempfile::tempdir().unwrap();
    Mock::given(method("GET"))
        .and(path("/api/v2/tables/jobs/records/42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Id": 42, "عنوان": "Backend Engineer", "وضعیت": "باز"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v2/tables/cand/records/7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Id": 7, "نام": "Sara", "نام خانوادگی": "Ahmadi"
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v2/tables/hiring/records"))
        .and(body_json(json!({
            "عنوان": "Sara Ahmadi - Backend Engineer",
            "وضعیت": "اقدام شده",
            "nc__0jr___کاندیدها_id": 7,
            "nc__0jr___فرصت های شغلی_id": 42,
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "Id": 1 })))
        .expect(1)
        .mount(&server)
        .await;

    let output = tools(&server, store.path())
        .dispatch("apply_for_job_position", r#"{"position_id": "42", "candidate_id": 7}"#)
        .await;
    assert_eq!(output, messages::applied("Backend Engineer"));
}

#[tokio::test]
async fn apply_for_job_writes_nothing_when_candidate_is_missing() {
    let server = MockServer::start().await;
    let store = tempfile::tempdir().unwrap();
    Mock::given(method("GET"))
        .and(path("/api/v2/tables/jobs/records/42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Id": 42, "عنوان": "Backend Engineer"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v2/tables/cand/records/99"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let output = tools(&server, store.path()).apply_for_job(42, 99).await;
    assert_eq!(output, messages::candidate_missing(99));
}

#[tokio::test]
async fn application_status_reads_job_title_from_relation() {
    let server = MockServer::start().await;
    let store = tempfile::tempdir().unwrap();
    Mock::given(method("GET"))
        .and(path("/api/v2/tables/cand/records"))
        .and(query_param("where", "(شماره تماس,eq,09123456789)"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "list": [{ "Id": 7 }] })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v2/tables/hiring/records"))
        .and(query_param("where", "(nc__0jr___کاندیدها_id,eq,7)"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "list": [
                { "Id": 1, "وضعیت": "اقدام شده", "فرصت های شغلی": { "Id": 42, "عنوان": "Backend Engineer" } },
                { "Id": 2 },
            ]
        })))
        .mount(&server)
        .await;

    let output = tools(&server, store.path())
        .check_application_status("09123456789")
        .await;
    let statuses: JsonValue = serde_json::from_str(&output).expect("json output");

    assert_eq!(
        statuses,
        json!([
            { "Status": "اقدام شده", "JobTitle": "Backend Engineer" },
            { "Status": "نامشخص", "JobTitle": "نامشخص" },
        ])
    );
}

#[tokio::test]
async fn application_status_without_records_returns_message() {
    let server = MockServer::start().await;
    let store = tempfile::tempdir().unwrap();
    Mock::given(method("GET"))
        .and(path("/api/v2/tables/cand/records"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "list": [{ "Id": 7 }] })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v2/tables/hiring/records"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "list": [] })))
        .mount(&server)
        .await;

    let output = tools(&server, store.path())
        .check_application_status("09123456789")
        .await;
    assert_eq!(output, messages::NO_APPLICATIONS);
}

#[tokio::test]
async fn job_details_refuses_missing_id_and_reports_bad_ids() {
    let server = MockServer::start().await;
    let store = tempfile::tempdir().unwrap();
    let hr = tools(&server, store.path());

    assert_eq!(hr.dispatch("get_job_details", "{}").await, messages::JOB_ID_REQUIRED);
    assert_eq!(
        hr.dispatch("get_job_details", r#"{"position_id": "abc"}"#).await,
        messages::JOB_NOT_FOUND
    );
    assert_eq!(
        hr.dispatch("fire_everyone", "{}").await,
        messages::unknown_tool("fire_everyone")
    );
}

#[tokio::test]
async fn feedback_is_stored_with_external_rating() {
    let server = MockServer::start().await;
    let store = tempfile::tempdir().unwrap();
    Mock::given(method("POST"))
        .and(path("/api/v2/tables/feedback/records"))
        .and(body_json(json!({
            "کاربر": "09123456789",
            "پبام": "what is the salary?",
            "پاسخ": "It depends on the role.",
            "وضعیت": "خوب",
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "Id": 3 })))
        .expect(1)
        .mount(&server)
        .await;

    let hr = tools(&server, store.path());
    let output = hr
        .record_feedback(
            "09123456789",
            "what is the salary?",
            "It depends on the role.",
            "GOOD",
        )
        .await;
    assert_eq!(output, messages::FEEDBACK_RECORDED);

    let refused = hr
        .record_feedback("09123456789", "q", "r", "meh")
        .await;
    assert_eq!(refused, messages::INVALID_RATING);
}

#[tokio::test]
async fn knowledge_tool_reports_unavailable_before_ingestion() {
    let server = MockServer::start().await;
    let store = tempfile::tempdir().unwrap();

    let output = tools(&server, store.path())
        .dispatch("query_knowledge_base", r#"{"query": "benefits"}"#)
        .await;
    assert_eq!(output, messages::KNOWLEDGE_UNAVAILABLE);
}
