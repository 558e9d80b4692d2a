use serde::{Deserialize, Serialize};

use super::{deserialize_flexible_id, deserialize_lenient_text, Entity, Table};
use crate::utils::translator::FieldMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Candidate {
    #[serde(
        deserialize_with = "deserialize_flexible_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<i64>,
    #[serde(
        deserialize_with = "deserialize_lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub phone_number: Option<String>,
    #[serde(
        deserialize_with = "deserialize_lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub first_name: Option<String>,
    #[serde(
        deserialize_with = "deserialize_lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_name: Option<String>,
    #[serde(
        deserialize_with = "deserialize_lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub expertise: Option<String>,
    #[serde(
        deserialize_with = "deserialize_lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub work_experience: Option<String>,
}

impl Candidate {
    pub fn full_name(&self) -> String {
        format!(
            "{} {}",
            self.first_name.as_deref().unwrap_or_default(),
            self.last_name.as_deref().unwrap_or_default()
        )
        .trim()
        .to_string()
    }
}

impl Entity for Candidate {
    const TABLE: Table = Table::Candidates;
    const FIELDS: FieldMap<'static> = FieldMap::new(&[
        ("Id", "Id"),
        ("PhoneNumber", "شماره تماس"),
        ("FirstName", "نام"),
        ("LastName", "نام خانوادگی"),
        ("WorkExperience", "سابقه کار"),
        ("Expertise", "تخصص و مهارت"),
    ]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn full_name_trims_missing_parts() {
        let candidate = Candidate {
            first_name: Some("Sara".into()),
            last_name: Some("Ahmadi".into()),
            ..Default::default()
        };
        assert_eq!(candidate.full_name(), "Sara Ahmadi");

        let only_first = Candidate {
            first_name: Some("Ali".into()),
            ..Default::default()
        };
        assert_eq!(only_first.full_name(), "Ali");
    }

    #[test]
    fn deserializes_internal_record_with_nulls_and_string_id() {
        let candidate: Candidate = serde_json::from_value(json!({
            "Id": "7",
            "PhoneNumber": "09123456789",
            "FirstName": "Sara",
            "Expertise": null,
        }))
        .expect("candidate");

        assert_eq!(candidate.id, Some(7));
        assert_eq!(candidate.expertise, None);
        assert_eq!(candidate.last_name, None);
    }

    #[test]
    fn non_string_text_columns_are_kept_as_text() {
        let candidate: Candidate = serde_json::from_value(json!({
            "Id": 9,
            "PhoneNumber": 9123456789u64,
            "WorkExperience": 3,
            "Expertise": ["Rust", "SQL"],
            "FirstName": true,
        }))
        .expect("candidate");

        assert_eq!(candidate.work_experience.as_deref(), Some("3"));
        assert_eq!(candidate.phone_number.as_deref(), Some("9123456789"));
        assert_eq!(candidate.expertise.as_deref(), Some(r#"["Rust","SQL"]"#));
        assert_eq!(candidate.first_name.as_deref(), Some("true"));
    }
}
