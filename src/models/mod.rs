pub mod candidate;
pub mod feedback;
pub mod hiring_record;
pub mod job_opportunity;

pub use candidate::Candidate;
pub use feedback::{Feedback, Rating};
pub use hiring_record::HiringRecord;
pub use job_opportunity::JobOpportunity;

use crate::utils::translator::FieldMap;
use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};
use serde_json::Value as JsonValue;

/// NocoDB tables this service talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Candidates,
    JobOpportunities,
    HiringRecords,
    Feedbacks,
}

impl Table {
    pub fn name(self) -> &'static str {
        match self {
            Table::Candidates => "candidates",
            Table::JobOpportunities => "job_opportunities",
            Table::HiringRecords => "hiring_records",
            Table::Feedbacks => "feedbacks",
        }
    }
}

/// A record type stored in one NocoDB table. Serde names are the internal
/// (English) keys; `FIELDS` maps them to the table's columns.
pub trait Entity: Serialize + DeserializeOwned + Send + Sync {
    const TABLE: Table;
    const FIELDS: FieldMap<'static>;
}

/// NocoDB returns ids as numbers, while tools and links sometimes hand them
/// over as strings.
pub(crate) fn deserialize_flexible_id<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum IdOrString {
        Int(i64),
        String(String),
    }

    match Option::<IdOrString>::deserialize(deserializer)? {
        None => Ok(None),
        Some(IdOrString::Int(id)) => Ok(Some(id)),
        Some(IdOrString::String(s)) if s.trim().is_empty() => Ok(None),
        Some(IdOrString::String(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("Invalid record id: {}", s))),
    }
}

/// Text columns are not typed strictly by NocoDB; numbers, booleans and
/// nested values come back as JSON and are kept as their JSON text.
pub(crate) fn deserialize_lenient_text<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<JsonValue>::deserialize(deserializer)? {
        None | Some(JsonValue::Null) => None,
        Some(JsonValue::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}
