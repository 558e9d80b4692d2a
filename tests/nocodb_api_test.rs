use recruitment_assistant::{
    config::TableIds,
    error::Error,
    models::{Candidate, HiringRecord, JobOpportunity},
    services::nocodb_service::{NocoDbService, Query},
};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn tables() -> TableIds {
    TableIds {
        candidates: "cand".into(),
        job_opportunities: "jobs".into(),
        hiring_records: "hiring".into(),
        feedbacks: "feedback".into(),
    }
}

fn client(server: &MockServer) -> NocoDbService {
    NocoDbService::new(server.uri(), "nc-test".into(), tables()).expect("client")
}

#[tokio::test]
async fn find_one_filters_by_translated_column_and_sends_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2/tables/cand/records"))
        .and(header("xc-token", "nc-test"))
        .and(query_param("where", "(شماره تماس,eq,09123456789)"))
        .and(query_param("limit", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "list": [{
                "Id": 7,
                "شماره تماس": "09123456789",
                "نام": "Sara",
                "نام خانوادگی": "Ahmadi",
                "CreatedAt": "2025-01-01",
            }],
            "pageInfo": { "totalRows": 1 }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let candidate = client(&server)
        .find_one::<Candidate>("PhoneNumber", "09123456789")
        .await
        .expect("lookup")
        .expect("candidate");

    assert_eq!(candidate.id, Some(7));
    assert_eq!(candidate.full_name(), "Sara Ahmadi");
}

#[tokio::test]
async fn records_with_numeric_text_columns_still_decode() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2/tables/cand/records"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "list": [{ "Id": 7, "شماره تماس": "09123456789", "نام": "Sara", "سابقه کار": 3 }]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v2/tables/hiring/records"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "list": [
                { "Id": 1, "وضعیت": "اقدام شده" },
                { "Id": 2, "وضعیت": 4, "عنوان": 2024 },
            ]
        })))
        .mount(&server)
        .await;

    let nocodb = client(&server);
    let candidate = nocodb
        .find_one::<Candidate>("PhoneNumber", "09123456789")
        .await
        .expect("lookup")
        .expect("candidate");
    assert_eq!(candidate.work_experience.as_deref(), Some("3"));

    let records = nocodb
        .find_many::<HiringRecord>(&Query::eq("CandidateId", 7))
        .await
        .expect("hiring records");
    assert_eq!(records.len(), 2);
    assert_eq!(records[1].status.as_deref(), Some("4"));
    assert_eq!(records[1].title.as_deref(), Some("2024"));
}

#[tokio::test]
async fn find_one_returns_none_for_empty_list() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "list": [] })))
        .mount(&server)
        .await;

    let found = client(&server)
        .find_one::<Candidate>("PhoneNumber", "09000000000")
        .await
        .expect("lookup");
    assert!(found.is_none());
}

#[tokio::test]
async fn find_many_projects_fields_and_caps_limit() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2/tables/jobs/records"))
        .and(query_param("fields", "Id,عنوان"))
        .and(query_param("limit", "25"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "list": [{ "Id": 1, "عنوان": "Designer" }, { "Id": "2", "عنوان": "QA" }]
        })))
        .mount(&server)
        .await;

    let jobs = client(&server)
        .find_many::<JobOpportunity>(&Query::all().fields(&["Id", "Title"]).limit(500))
        .await
        .expect("jobs");

    assert_eq!(jobs.len(), 2);
    assert_eq!(jobs[1].id, Some(2));
    assert_eq!(jobs[1].title.as_deref(), Some("QA"));
}

#[tokio::test]
async fn get_by_id_maps_missing_records_to_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2/tables/jobs/records/404"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v2/tables/jobs/records/5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v2/tables/jobs/records/500"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let nocodb = client(&server);
    assert!(matches!(
        nocodb.get_by_id::<JobOpportunity>(404).await,
        Err(Error::NotFound(_))
    ));
    assert!(matches!(
        nocodb.get_by_id::<JobOpportunity>(5).await,
        Err(Error::NotFound(_))
    ));
    assert!(matches!(
        nocodb.get_by_id::<JobOpportunity>(500).await,
        Err(Error::ExternalService { service: "nocodb", .. })
    ));
}

#[tokio::test]
async fn create_posts_external_keys_and_returns_generated_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v2/tables/hiring/records"))
        .and(body_json(json!({
            "عنوان": "Sara Ahmadi - Backend Engineer",
            "وضعیت": "اقدام شده",
            "nc__0jr___کاندیدها_id": 7,
            "nc__0jr___فرصت های شغلی_id": 42,
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "Id": 900 })))
        .expect(1)
        .mount(&server)
        .await;

    let created = client(&server)
        .create(&HiringRecord::application(
            "Sara Ahmadi - Backend Engineer".into(),
            7,
            42,
        ))
        .await
        .expect("created");

    assert_eq!(created.id, Some(900));
    assert_eq!(created.candidate_id, Some(7));
    assert_eq!(created.title.as_deref(), Some("Sara Ahmadi - Backend Engineer"));
}

#[tokio::test]
async fn malformed_list_body_is_an_external_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
        .mount(&server)
        .await;

    let err = client(&server)
        .find_many::<JobOpportunity>(&Query::all())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ExternalService { .. }));
}
