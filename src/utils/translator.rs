//! Key remapping between internal English field names and the Persian
//! column names used by NocoDB.
//!
//! Both directions keep only keys present in the map. Values are moved
//! across untouched, so nested relation objects keep their external keys and
//! must be translated separately with the related entity's map.

use serde_json::{Map, Value as JsonValue};
use std::collections::HashMap;

pub type Record = Map<String, JsonValue>;

/// Ordered pairs of `(internal, external)` field names for one entity.
#[derive(Debug, Clone, Copy)]
pub struct FieldMap<'a> {
    entries: &'a [(&'a str, &'a str)],
}

impl<'a> FieldMap<'a> {
    pub const fn new(entries: &'a [(&'a str, &'a str)]) -> Self {
        Self { entries }
    }

    pub fn external_key(&self, internal: &str) -> Option<&'a str> {
        self.entries
            .iter()
            .find(|(key, _)| *key == internal)
            .map(|(_, external)| *external)
    }

    pub fn internal_keys(&self) -> impl Iterator<Item = &'a str> + '_ {
        self.entries.iter().map(|(key, _)| *key)
    }

    pub fn to_external(&self, record: &Record) -> Record {
        to_external(record, self)
    }

    pub fn from_external(&self, record: &Record) -> Record {
        from_external(record, self)
    }
}

pub fn to_external(record: &Record, map: &FieldMap<'_>) -> Record {
    record
        .iter()
        .filter_map(|(key, value)| {
            map.external_key(key)
                .map(|external| (external.to_string(), value.clone()))
        })
        .collect()
}

pub fn from_external(record: &Record, map: &FieldMap<'_>) -> Record {
    let inverted: HashMap<&str, &str> = map
        .entries
        .iter()
        .map(|(internal, external)| (*external, *internal))
        .collect();

    record
        .iter()
        .filter_map(|(key, value)| {
            inverted
                .get(key.as_str())
                .map(|internal| (internal.to_string(), value.clone()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const MAP: FieldMap<'static> = FieldMap::new(&[
        ("Id", "Id"),
        ("FirstName", "نام"),
        ("LastName", "نام خانوادگی"),
    ]);

    fn record(value: JsonValue) -> Record {
        value.as_object().cloned().expect("object")
    }

    #[test]
    fn to_external_renames_and_drops_unmapped_keys() {
        let internal = record(json!({ "Id": 7, "FirstName": "Sara", "Nickname": "S" }));
        let external = to_external(&internal, &MAP);

        assert_eq!(external, record(json!({ "Id": 7, "نام": "Sara" })));
    }

    #[test]
    fn from_external_inverts_and_drops_unmapped_columns() {
        let external = record(json!({
            "Id": 3,
            "نام خانوادگی": "Ahmadi",
            "CreatedAt": "2024-01-01",
        }));

        assert_eq!(
            from_external(&external, &MAP),
            record(json!({ "Id": 3, "LastName": "Ahmadi" }))
        );
    }

    #[test]
    fn values_pass_through_without_coercion() {
        let internal = record(json!({ "FirstName": { "nested": [1, "2", null] }, "Id": "42" }));
        let back = from_external(&to_external(&internal, &MAP), &MAP);

        assert_eq!(back["FirstName"], json!({ "nested": [1, "2", null] }));
        assert_eq!(back["Id"], json!("42"));
    }

    #[test]
    fn round_trip_restores_mapped_keys_for_any_entry_order() {
        let reversed: [(&str, &str); 3] =
            [("LastName", "نام خانوادگی"), ("FirstName", "نام"), ("Id", "Id")];
        let samples = [
            json!({}),
            json!({ "Id": 1 }),
            json!({ "Id": 1, "FirstName": "Ali", "LastName": "Rezaei", "Extra": true }),
            json!({ "LastName": null, "Unknown": 5 }),
        ];

        for map in [MAP, FieldMap::new(&reversed)] {
            for sample in &samples {
                let original = record(sample.clone());
                let expected: Record = original
                    .iter()
                    .filter(|(key, _)| map.external_key(key).is_some())
                    .map(|(key, value)| (key.clone(), value.clone()))
                    .collect();

                assert_eq!(map.from_external(&map.to_external(&original)), expected);
            }
        }
    }

    #[test]
    fn external_key_resolves_single_fields() {
        assert_eq!(MAP.external_key("LastName"), Some("نام خانوادگی"));
        assert_eq!(MAP.external_key("Expertise"), None);
        assert_eq!(MAP.internal_keys().collect::<Vec<_>>(), ["Id", "FirstName", "LastName"]);
    }
}
