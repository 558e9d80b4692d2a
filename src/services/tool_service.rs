use crate::error::{Error, Result};
use crate::models::job_opportunity::JOB_STATUS_OPEN;
use crate::models::{Candidate, Feedback, HiringRecord, JobOpportunity, Rating};
use crate::services::knowledge_service::{KnowledgeBase, TOP_K};
use crate::services::nocodb_service::{NocoDbService, Query, MAX_PAGE_SIZE};
use serde::Serialize;
use serde_json::{json, Map, Value as JsonValue};
use std::sync::Arc;
use tracing::{error, info, warn};

pub const LIST_OPEN_JOBS: &str = "get_open_job_positions";
pub const GET_JOB_DETAILS: &str = "get_job_details";
pub const CHECK_APPLICATION_STATUS: &str = "get_application_status";
pub const APPLY_FOR_JOB: &str = "apply_for_job_position";
pub const RECORD_FEEDBACK: &str = "record_feedback";
pub const QUERY_KNOWLEDGE_BASE: &str = "query_knowledge_base";

/// User-facing results. Tools never hand raw errors to the agent.
pub mod messages {
    pub const NO_OPEN_JOBS: &str = "متاسفانه در حال حاضر هیچ موقعیت شغلی بازی وجود ندارد.";
    pub const JOBS_UNAVAILABLE: &str =
        "خطا در برقراری ارتباط با سیستم مشاغل. لطفاً بعداً دوباره امتحان کنید.";
    pub const JOB_ID_REQUIRED: &str =
        "خطا: برای دریافت جزئیات شغل، به شناسه موقعیت (ID) نیاز است.";
    pub const JOB_NOT_FOUND: &str =
        "موقعیت شغلی با این شناسه یافت نشد یا در ارتباط با سیستم خطایی رخ داده است.";
    pub const PHONE_REQUIRED: &str = "خطا: برای بررسی وضعیت، به شماره تلفن کاربر نیاز است.";
    pub const CANDIDATE_NOT_FOUND: &str = "کاندیدی با این شماره تلفن یافت نشد.";
    pub const NO_APPLICATIONS: &str = "هیچ درخواست فعالی برای این شماره تلفن یافت نشد.";
    pub const STATUS_UNAVAILABLE: &str =
        "خطا در برقراری ارتباط با سیستم. لطفاً بعداً دوباره امتحان کنید.";
    pub const APPLY_ARGUMENTS_REQUIRED: &str =
        "خطا: برای ثبت درخواست، شناسه موقعیت شغلی و شناسه کارجو لازم است.";
    pub const APPLY_JOB_NOT_FOUND: &str = "خطا: موقعیت شغلی مورد نظر برای ثبت درخواست یافت نشد.";
    pub const APPLY_FAILED: &str =
        "متاسفانه در ثبت درخواست شما مشکلی پیش آمد. لطفاً دقایقی دیگر مجددا تلاش کنید.";
    pub const FEEDBACK_RECORDED: &str = "بازخورد شما با موفقیت ثبت شد. متشکریم!";
    pub const FEEDBACK_FAILED: &str =
        "خطایی در ثبت بازخورد شما رخ داد. لطفاً بعداً دوباره تلاش کنید.";
    pub const FEEDBACK_ARGUMENTS_REQUIRED: &str =
        "خطا: برای ثبت بازخورد، شماره تلفن، پرسش، پاسخ و امتیاز لازم است.";
    pub const INVALID_RATING: &str = "خطا: امتیاز بازخورد باید good یا bad باشد.";
    pub const KNOWLEDGE_QUERY_REQUIRED: &str = "خطا: برای جستجو در پایگاه دانش، متن پرسش لازم است.";
    pub const KNOWLEDGE_UNAVAILABLE: &str =
        "پایگاه دانش در حال حاضر در دسترس نیست. لطفاً بعداً دوباره امتحان کنید.";
    pub const INVALID_ARGUMENTS: &str = "خطا: آرگومان‌های ارسال‌شده برای ابزار معتبر نیستند.";
    pub const UNKNOWN: &str = "نامشخص";

    pub fn candidate_missing(candidate_id: i64) -> String {
        format!(
            "خطا: اطلاعات کارجو با شناسه {} یافت نشد و درخواست ثبت نگردید.",
            candidate_id
        )
    }

    pub fn applied(job_title: &str) -> String {
        format!(
            "درخواست شما برای موقعیت شغلی '{}' با موفقیت ثبت شد. به زودی نتیجه آن به شما اطلاع داده خواهد شد.",
            job_title
        )
    }

    pub fn unknown_tool(name: &str) -> String {
        format!("خطا: ابزاری با نام «{}» وجود ندارد.", name)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct JobSummary {
    id: Option<i64>,
    title: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct ApplicationStatus {
    status: String,
    job_title: String,
}

/// The operations the agent may invoke, each returning a display string.
#[derive(Clone)]
pub struct HrTools {
    records: NocoDbService,
    knowledge: Arc<KnowledgeBase>,
}

impl HrTools {
    pub fn new(records: NocoDbService, knowledge: Arc<KnowledgeBase>) -> Self {
        Self { records, knowledge }
    }

    /// Open positions, re-checked locally so a non-open status never leaks.
    pub async fn open_jobs(&self) -> Result<Vec<JobOpportunity>> {
        let query = Query::eq("Status", JOB_STATUS_OPEN)
            .fields(&["Id", "Title", "Status"])
            .limit(MAX_PAGE_SIZE);
        let jobs = self.records.find_many::<JobOpportunity>(&query).await?;
        Ok(jobs.into_iter().filter(JobOpportunity::is_open).collect())
    }

    pub async fn list_open_jobs(&self) -> String {
        match self.open_jobs().await {
            Ok(jobs) if jobs.is_empty() => messages::NO_OPEN_JOBS.to_string(),
            Ok(jobs) => {
                let summaries: Vec<JobSummary> = jobs
                    .into_iter()
                    .map(|job| JobSummary {
                        id: job.id,
                        title: job.title,
                    })
                    .collect();
                to_json_string(&summaries)
            }
            Err(e) => {
                error!(error = %e, "Listing open jobs failed");
                messages::JOBS_UNAVAILABLE.to_string()
            }
        }
    }

    pub async fn get_job_details(&self, position_id: Option<&JsonValue>) -> String {
        let Some(raw) = position_id.filter(|v| !is_blank(v)) else {
            return messages::JOB_ID_REQUIRED.to_string();
        };
        let Some(id) = parse_id(raw) else {
            return messages::JOB_NOT_FOUND.to_string();
        };

        match self.records.get_by_id::<JobOpportunity>(id).await {
            Ok(job) => to_json_string(&job),
            Err(e) => {
                warn!(job_id = id, error = %e, "Job details unavailable");
                messages::JOB_NOT_FOUND.to_string()
            }
        }
    }

    pub async fn check_application_status(&self, phone_number: &str) -> String {
        let phone_number = phone_number.trim();
        if phone_number.is_empty() {
            return messages::PHONE_REQUIRED.to_string();
        }

        match self.application_statuses(phone_number).await {
            Ok(None) => messages::CANDIDATE_NOT_FOUND.to_string(),
            Ok(Some(statuses)) if statuses.is_empty() => messages::NO_APPLICATIONS.to_string(),
            Ok(Some(statuses)) => to_json_string(&statuses),
            Err(e) => {
                error!(error = %e, "Application status lookup failed");
                messages::STATUS_UNAVAILABLE.to_string()
            }
        }
    }

    async fn application_statuses(&self, phone_number: &str) -> Result<Option<Vec<ApplicationStatus>>> {
        let lookup = Query::eq("PhoneNumber", phone_number)
            .fields(&["Id"])
            .limit(1);
        let candidate_id = self
            .records
            .find_many::<Candidate>(&lookup)
            .await?
            .into_iter()
            .next()
            .and_then(|c| c.id);
        let Some(candidate_id) = candidate_id else {
            return Ok(None);
        };

        let records = self
            .records
            .find_many::<HiringRecord>(&Query::eq("CandidateId", candidate_id))
            .await?;

        Ok(Some(
            records
                .iter()
                .map(|record| ApplicationStatus {
                    status: record
                        .status
                        .clone()
                        .unwrap_or_else(|| messages::UNKNOWN.to_string()),
                    job_title: record
                        .job_title()
                        .unwrap_or_else(|| messages::UNKNOWN.to_string()),
                })
                .collect(),
        ))
    }

    /// Reads the job and the candidate, then creates exactly one hiring
    /// record. Nothing is written unless both reads succeed.
    pub async fn apply_for_job(&self, job_id: i64, candidate_id: i64) -> String {
        let job_title = match self.records.get_by_id::<JobOpportunity>(job_id).await {
            Ok(JobOpportunity {
                title: Some(title), ..
            }) if !title.trim().is_empty() => title,
            Ok(_) | Err(Error::NotFound(_)) => return messages::APPLY_JOB_NOT_FOUND.to_string(),
            Err(e) => {
                error!(job_id, error = %e, "Job lookup failed while applying");
                return messages::APPLY_FAILED.to_string();
            }
        };

        let candidate = match self.records.get_by_id::<Candidate>(candidate_id).await {
            Ok(candidate) => candidate,
            Err(Error::NotFound(_)) => return messages::candidate_missing(candidate_id),
            Err(e) => {
                error!(candidate_id, error = %e, "Candidate lookup failed while applying");
                return messages::APPLY_FAILED.to_string();
            }
        };

        let title = format!("{} - {}", candidate.full_name(), job_title);
        let record = HiringRecord::application(title, candidate_id, job_id);
        match self.records.create(&record).await {
            Ok(_) => {
                info!(candidate_id, job_id, "Hiring record created");
                messages::applied(&job_title)
            }
            Err(e) => {
                error!(candidate_id, job_id, error = %e, "Hiring record creation failed");
                messages::APPLY_FAILED.to_string()
            }
        }
    }

    pub async fn record_feedback(
        &self,
        user_phone: &str,
        query: &str,
        response: &str,
        rating: &str,
    ) -> String {
        let Some(rating) = Rating::from_token(rating) else {
            return messages::INVALID_RATING.to_string();
        };

        let feedback = Feedback {
            user: Some(user_phone.to_string()),
            query: Some(query.to_string()),
            response: Some(response.to_string()),
            rating: Some(rating),
        };
        match self.records.create(&feedback).await {
            Ok(_) => {
                info!(user = user_phone, rating = rating.token(), "Feedback recorded");
                messages::FEEDBACK_RECORDED.to_string()
            }
            Err(e) => {
                error!(user = user_phone, error = %e, "Feedback creation failed");
                messages::FEEDBACK_FAILED.to_string()
            }
        }
    }

    pub async fn query_knowledge_base(&self, query: &str) -> String {
        match self.knowledge.search(query, TOP_K).await {
            Ok(chunks) if chunks.is_empty() => messages::KNOWLEDGE_UNAVAILABLE.to_string(),
            Ok(chunks) => format!("Retrieved context:\n{}", chunks.join("\n\n---\n\n")),
            Err(e) => {
                warn!(error = %e, "Knowledge base query failed");
                messages::KNOWLEDGE_UNAVAILABLE.to_string()
            }
        }
    }

    /// Runs the named tool with a JSON object of arguments.
    pub async fn dispatch(&self, name: &str, arguments: &str) -> String {
        let args = match parse_arguments(arguments) {
            Some(args) => args,
            None => {
                warn!(tool = name, arguments, "Malformed tool arguments");
                return messages::INVALID_ARGUMENTS.to_string();
            }
        };
        info!(tool = name, "Dispatching tool call");

        match name {
            LIST_OPEN_JOBS => self.list_open_jobs().await,
            GET_JOB_DETAILS => self.get_job_details(args.get("position_id")).await,
            CHECK_APPLICATION_STATUS => match string_arg(&args, "phone_number") {
                Some(phone) => self.check_application_status(phone).await,
                None => messages::PHONE_REQUIRED.to_string(),
            },
            APPLY_FOR_JOB => {
                let job_id = args.get("position_id").and_then(parse_id);
                let candidate_id = args.get("candidate_id").and_then(parse_id);
                match (job_id, candidate_id) {
                    (Some(job_id), Some(candidate_id)) => {
                        self.apply_for_job(job_id, candidate_id).await
                    }
                    _ => messages::APPLY_ARGUMENTS_REQUIRED.to_string(),
                }
            }
            RECORD_FEEDBACK => {
                let fields = ["user_phone", "query", "response", "rating"]
                    .map(|key| string_arg(&args, key));
                match fields {
                    [Some(phone), Some(query), Some(response), Some(rating)] => {
                        self.record_feedback(phone, query, response, rating).await
                    }
                    _ => messages::FEEDBACK_ARGUMENTS_REQUIRED.to_string(),
                }
            }
            QUERY_KNOWLEDGE_BASE => match string_arg(&args, "query") {
                Some(query) => self.query_knowledge_base(query).await,
                None => messages::KNOWLEDGE_QUERY_REQUIRED.to_string(),
            },
            other => messages::unknown_tool(other),
        }
    }

    /// Function-calling schemas for every tool, in chat-completions format.
    pub fn definitions() -> Vec<JsonValue> {
        let id = json!({ "type": ["integer", "string"] });
        vec![
            function(
                LIST_OPEN_JOBS,
                "Use this tool to find all currently open job positions available for candidates. It returns a list of jobs with their titles and IDs.",
                json!({}),
                &[],
            ),
            function(
                GET_JOB_DETAILS,
                "Use this tool to get the detailed description and requirements of a specific job when you have its unique ID.",
                json!({ "position_id": id }),
                &["position_id"],
            ),
            function(
                CHECK_APPLICATION_STATUS,
                "Use this tool to check the status of ALL applications for a candidate using their phone number.",
                json!({ "phone_number": { "type": "string" } }),
                &["phone_number"],
            ),
            function(
                APPLY_FOR_JOB,
                "Use this tool to apply a candidate for a specific job position. This creates a new hiring record linking the candidate and the job.",
                json!({ "position_id": id, "candidate_id": id }),
                &["position_id", "candidate_id"],
            ),
            function(
                RECORD_FEEDBACK,
                "Records the user's rating of an answer. Rating must be 'good' or 'bad'.",
                json!({
                    "user_phone": { "type": "string" },
                    "query": { "type": "string" },
                    "response": { "type": "string" },
                    "rating": { "type": "string", "enum": ["good", "bad"] },
                }),
                &["user_phone", "query", "response", "rating"],
            ),
            function(
                QUERY_KNOWLEDGE_BASE,
                "Use this tool to answer user questions about the company, its culture, benefits, and the hiring process from internal company documents.",
                json!({ "query": { "type": "string" } }),
                &["query"],
            ),
        ]
    }
}

fn function(name: &str, description: &str, properties: JsonValue, required: &[&str]) -> JsonValue {
    json!({
        "type": "function",
        "function": {
            "name": name,
            "description": description,
            "parameters": {
                "type": "object",
                "properties": properties,
                "required": required,
            },
        },
    })
}

fn parse_arguments(raw: &str) -> Option<Map<String, JsonValue>> {
    if raw.trim().is_empty() {
        return Some(Map::new());
    }
    match serde_json::from_str(raw).ok()? {
        JsonValue::Object(map) => Some(map),
        JsonValue::Null => Some(Map::new()),
        _ => None,
    }
}

fn string_arg<'a>(args: &'a Map<String, JsonValue>, key: &str) -> Option<&'a str> {
    args.get(key)
        .and_then(JsonValue::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn is_blank(value: &JsonValue) -> bool {
    match value {
        JsonValue::Null => true,
        JsonValue::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// Accepts a JSON integer or a string of ASCII digits.
pub fn parse_id(value: &JsonValue) -> Option<i64> {
    match value {
        JsonValue::Number(n) => n.as_i64(),
        JsonValue::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn to_json_string<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| {
        error!(error = %e, "Tool output serialization failed");
        messages::STATUS_UNAVAILABLE.to_string()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_accept_numbers_and_numeric_strings() {
        assert_eq!(parse_id(&json!(42)), Some(42));
        assert_eq!(parse_id(&json!(" 42 ")), Some(42));
        assert_eq!(parse_id(&json!("forty-two")), None);
        assert_eq!(parse_id(&json!(4.2)), None);
        assert_eq!(parse_id(&json!(null)), None);
    }

    #[test]
    fn arguments_must_be_an_object() {
        assert_eq!(parse_arguments(""), Some(Map::new()));
        assert_eq!(parse_arguments("null"), Some(Map::new()));
        assert!(parse_arguments("[1,2]").is_none());
        assert!(parse_arguments("{not json").is_none());
        assert_eq!(
            parse_arguments(r#"{"query":"benefits"}"#)
                .and_then(|m| m.get("query").cloned()),
            Some(json!("benefits"))
        );
    }

    #[test]
    fn every_tool_has_a_schema() {
        let names: Vec<String> = HrTools::definitions()
            .iter()
            .filter_map(|d| d["function"]["name"].as_str().map(str::to_string))
            .collect();
        assert_eq!(
            names,
            vec![
                LIST_OPEN_JOBS,
                GET_JOB_DETAILS,
                CHECK_APPLICATION_STATUS,
                APPLY_FOR_JOB,
                RECORD_FEEDBACK,
                QUERY_KNOWLEDGE_BASE,
            ]
        );
        for definition in HrTools::definitions() {
            assert_eq!(definition["function"]["parameters"]["type"], "object");
        }
    }
}
