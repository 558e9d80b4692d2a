use serde::{Deserialize, Serialize};

use super::{Entity, Table};
use crate::utils::translator::FieldMap;

/// Two-valued rating column; serialized as the external enumeration values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rating {
    #[serde(rename = "خوب")]
    Good,
    #[serde(rename = "بد")]
    Bad,
}

impl Rating {
    /// Parses the `good` / `bad` token used by the feedback buttons.
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "good" => Some(Rating::Good),
            "bad" => Some(Rating::Bad),
            _ => None,
        }
    }

    pub fn token(self) -> &'static str {
        match self {
            Rating::Good => "good",
            Rating::Bad => "bad",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Feedback {
    /// Phone number of the rating user; not a relation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<Rating>,
}

impl Entity for Feedback {
    const TABLE: Table = Table::Feedbacks;
    const FIELDS: FieldMap<'static> = FieldMap::new(&[
        ("User", "کاربر"),
        ("Query", "پبام"),
        ("Response", "پاسخ"),
        ("Rating", "وضعیت"),
    ]);
}
