use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::{deserialize_flexible_id, deserialize_lenient_text, Entity, Table};
use crate::utils::translator::FieldMap;

/// The external enumeration value for an open position.
pub const JOB_STATUS_OPEN: &str = "باز";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct JobOpportunity {
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
    pub description: Option<String>,
    #[serde(
        deserialize_with = "deserialize_lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub full_description: Option<String>,
    #[serde(
        deserialize_with = "deserialize_lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<JsonValue>,
}

impl JobOpportunity {
    pub fn is_open(&self) -> bool {
        self.status.as_deref() == Some(JOB_STATUS_OPEN)
    }
}

impl Entity for JobOpportunity {
    const TABLE: Table = Table::JobOpportunities;
    const FIELDS: FieldMap<'static> = FieldMap::new(&[
        ("Id", "Id"),
        ("Title", "عنوان"),
        ("Description", "توضیحات"),
        ("FullDescription", "شرح وظابف"),
        ("Status", "وضعیت"),
        ("Department", "دپارتمان ها"),
    ]);
}
