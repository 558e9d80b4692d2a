use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::{
    deserialize_flexible_id, deserialize_lenient_text, Entity, JobOpportunity, Table,
};
use crate::utils::translator::{FieldMap, Record};

/// The external enumeration value for a fresh application.
pub const HIRING_STATUS_APPLIED: &str = "اقدام شده";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct HiringRecord {
    #[serde(
        deserialize_with = "deserialize_flexible_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<i64>,
    #[serde(
        deserialize_with = "deserialize_lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub title: Option<String>,
    #[serde(
        deserialize_with = "deserialize_lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub status: Option<String>,
    /// Relation as returned by NocoDB, still keyed by candidate columns.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidate: Option<JsonValue>,
    /// Relation as returned by NocoDB, still keyed by job columns.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_opportunity: Option<JsonValue>,
    #[serde(
        deserialize_with = "deserialize_flexible_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub candidate_id: Option<i64>,
    #[serde(
        deserialize_with = "deserialize_flexible_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub job_opportunity_id: Option<i64>,
}

impl HiringRecord {
    pub fn application(title: String, candidate_id: i64, job_opportunity_id: i64) -> Self {
        Self {
            title: Some(title),
            status: Some(HIRING_STATUS_APPLIED.to_string()),
            candidate_id: Some(candidate_id),
            job_opportunity_id: Some(job_opportunity_id),
            ..Default::default()
        }
    }

    /// Title of the linked job, read through the job field map. The relation
    /// may come back as a single object or as a one-element list.
    pub fn job_title(&self) -> Option<String> {
        let relation = match self.job_opportunity.as_ref()? {
            JsonValue::Array(items) => items.first()?,
            other => other,
        };
        let external: &Record = relation.as_object()?;
        let job = JobOpportunity::FIELDS.from_external(external);
        job.get("Title")?.as_str().map(str::to_string)
    }
}

impl Entity for HiringRecord {
    const TABLE: Table = Table::HiringRecords;
    const FIELDS: FieldMap<'static> = FieldMap::new(&[
        ("Id", "Id"),
        ("Status", "وضعیت"),
        ("Candidate", "کاندیدها"),
        ("JobOpportunity", "فرصت های شغلی"),
        ("Title", "عنوان"),
        ("CandidateId", "nc__0jr___کاندیدها_id"),
        ("JobOpportunityId", "nc__0jr___فرصت های شغلی_id"),
    ]);
}
