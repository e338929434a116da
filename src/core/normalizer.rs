//! Turns raw API entities into flat, scalar-only rows.
//!
//! Custom fields arrive as `custom_fields: {"custom_label_42": value, ...}` and
//! are renamed to their label from the [`FieldDirectory`]. Nested objects and
//! arrays are spread into `<key>_<subkey>` columns.

use crate::core::field_directory::FieldDirectory;
use crate::core::{Entity, UnknownFieldPolicy};
use crate::utils::error::{ExportError, Result};
use serde_json::{Map, Value};
use std::collections::HashSet;

pub const CUSTOM_FIELDS_KEY: &str = "custom_fields";

/// Extracts the field id from a custom-field key of the form
/// `cf_<category>_<fieldId>`: the third `_`-separated segment.
///
/// PipelineDeals sends keys such as `custom_label_1234`, where `custom` and
/// `label` fill the first two segments. Anything after the third segment is
/// ignored.
pub fn parse_custom_field_id(key: &str) -> Option<&str> {
    key.split('_').nth(2).filter(|id| !id.is_empty())
}

pub struct Normalizer<'a> {
    directory: &'a FieldDirectory,
    excluded_keys: HashSet<String>,
    unknown_fields: UnknownFieldPolicy,
}

impl<'a> Normalizer<'a> {
    pub fn new(
        directory: &'a FieldDirectory,
        excluded_keys: HashSet<String>,
        unknown_fields: UnknownFieldPolicy,
    ) -> Self {
        Self {
            directory,
            excluded_keys,
            unknown_fields,
        }
    }

    pub fn normalize(&self, entities: Vec<Entity>) -> Result<Vec<Entity>> {
        entities
            .into_iter()
            .map(|entity| self.normalize_entity(entity))
            .collect()
    }

    pub fn normalize_entity(&self, entity: Entity) -> Result<Entity> {
        let expanded = self.expand_custom_fields(entity.data)?;

        let mut flat = Map::with_capacity(expanded.len());
        let mut synthetic = HashSet::new();
        for (key, value) in expanded {
            if self.excluded_keys.contains(&key) {
                continue;
            }
            match value {
                composite @ (Value::Object(_) | Value::Array(_)) => {
                    flatten_into(&mut flat, &mut synthetic, key, composite);
                }
                // A flattened `<parent>_<child>` value outranks a plain key of the same name.
                scalar => {
                    if !synthetic.contains(&key) {
                        flat.insert(key, scalar);
                    }
                }
            }
        }

        Ok(Entity::new(flat))
    }

    /// Replaces the `custom_fields` mapping with one entry per labelled field.
    /// Labels overwrite existing keys of the same name.
    fn expand_custom_fields(&self, mut data: Map<String, Value>) -> Result<Map<String, Value>> {
        let custom_fields = match data.shift_remove(CUSTOM_FIELDS_KEY) {
            Some(Value::Object(fields)) => fields,
            _ => return Ok(data),
        };

        for (key, value) in custom_fields {
            match self.resolve_label(&key)? {
                Some(name) => {
                    data.insert(name.to_string(), value);
                }
                None => continue,
            }
        }

        Ok(data)
    }

    fn resolve_label(&self, key: &str) -> Result<Option<&'a str>> {
        let field_id = parse_custom_field_id(key).unwrap_or_default();
        match self.directory.get(field_id) {
            Some(descriptor) => Ok(Some(descriptor.name.as_str())),
            None => match self.unknown_fields {
                UnknownFieldPolicy::Fail => Err(ExportError::UnknownField {
                    key: key.to_string(),
                    field_id: field_id.to_string(),
                }),
                UnknownFieldPolicy::Skip => {
                    tracing::warn!("⚠️ skipping custom field '{}': no label for id '{}'", key, field_id);
                    Ok(None)
                }
            },
        }
    }
}

/// Spreads objects and arrays into `key_subkey` entries until only scalars
/// remain, recording every key written in `synthetic`.
fn flatten_into(out: &mut Map<String, Value>, synthetic: &mut HashSet<String>, key: String, value: Value) {
    match value {
        Value::Object(fields) => {
            for (sub_key, sub_value) in fields {
                flatten_into(out, synthetic, format!("{}_{}", key, sub_key), sub_value);
            }
        }
        Value::Array(items) => {
            for (index, item) in items.into_iter().enumerate() {
                flatten_into(out, synthetic, format!("{}_{}", key, index), item);
            }
        }
        scalar => {
            synthetic.insert(key.clone());
            out.insert(key, scalar);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::FieldDescriptor;
    use serde_json::json;

    fn entity(value: Value) -> Entity {
        match value {
            Value::Object(data) => Entity::new(data),
            other => panic!("not an object: {}", other),
        }
    }

    fn directory() -> FieldDirectory {
        FieldDirectory::build(vec![vec![
            FieldDescriptor::new("42", "Region"),
            FieldDescriptor::new("7", "Owner"),
        ]])
    }

    fn normalize_one(value: Value) -> Result<Entity> {
        let directory = directory();
        Normalizer::new(&directory, HashSet::new(), UnknownFieldPolicy::Fail).normalize_entity(entity(value))
    }

    #[test]
    fn test_parse_custom_field_id() {
        assert_eq!(parse_custom_field_id("cf_foo_42"), Some("42"));
        assert_eq!(parse_custom_field_id("custom_label_1234"), Some("1234"));
        assert_eq!(parse_custom_field_id("custom_label_12_extra"), Some("12"));
        assert_eq!(parse_custom_field_id("custom_label"), None);
        assert_eq!(parse_custom_field_id("custom_label_"), None);
    }

    #[test]
    fn test_custom_fields_resolved_to_labels() {
        let result = normalize_one(json!({"custom_fields": {"cf_foo_42": "East"}})).unwrap();

        assert_eq!(result, entity(json!({"Region": "East"})));
        assert!(!result.data.contains_key(CUSTOM_FIELDS_KEY));
    }

    #[test]
    fn test_custom_field_label_overwrites_existing_key() {
        let result = normalize_one(json!({
            "Region": "stale",
            "id": 1,
            "custom_fields": {"custom_label_42": "West"}
        }))
        .unwrap();

        assert_eq!(result.data["Region"], json!("West"));
        let keys: Vec<&String> = result.data.keys().collect();
        assert_eq!(keys, vec!["Region", "id"]);
    }

    #[test]
    fn test_unknown_field_fails_by_default() {
        let err = normalize_one(json!({"custom_fields": {"cf_foo_99": "x"}})).unwrap_err();

        match err {
            ExportError::UnknownField { key, field_id } => {
                assert_eq!(key, "cf_foo_99");
                assert_eq!(field_id, "99");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_malformed_custom_field_key_fails_by_default() {
        let err = normalize_one(json!({"custom_fields": {"region": "x"}})).unwrap_err();
        assert!(matches!(err, ExportError::UnknownField { .. }));
    }

    #[test]
    fn test_unknown_field_skipped_under_skip_policy() {
        let directory = directory();
        let normalizer = Normalizer::new(&directory, HashSet::new(), UnknownFieldPolicy::Skip);

        let result = normalizer
            .normalize_entity(entity(json!({
                "id": 3,
                "custom_fields": {"cf_foo_99": "lost", "cf_foo_7": "Ada"}
            })))
            .unwrap();

        assert_eq!(result, entity(json!({"id": 3, "Owner": "Ada"})));
    }

    #[test]
    fn test_null_custom_fields_removed() {
        let result = normalize_one(json!({"id": 1, "custom_fields": null})).unwrap();
        assert_eq!(result, entity(json!({"id": 1})));
    }

    #[test]
    fn test_nested_object_flattened() {
        let result = normalize_one(json!({"id": 1, "address": {"city": "X", "zip": "9"}})).unwrap();
        assert_eq!(result, entity(json!({"id": 1, "address_city": "X", "address_zip": "9"})));
    }

    #[test]
    fn test_arrays_and_deep_objects_flattened() {
        let result = normalize_one(json!({
            "tags": ["hot", "b2b"],
            "owner": {"name": "Ada", "geo": {"lat": 1.5}},
            "notes": [],
            "closed": false,
            "value": null
        }))
        .unwrap();

        assert_eq!(
            result,
            entity(json!({
                "tags_0": "hot",
                "tags_1": "b2b",
                "owner_name": "Ada",
                "owner_geo_lat": 1.5,
                "closed": false,
                "value": null
            }))
        );
        assert!(result.data.values().all(|v| !v.is_object() && !v.is_array()));
    }

    #[test]
    fn test_flattened_value_beats_later_plain_key() {
        let result = normalize_one(json!({"address": {"city": "X"}, "address_city": "Y"})).unwrap();
        assert_eq!(result, entity(json!({"address_city": "X"})));
    }

    #[test]
    fn test_flattened_value_beats_earlier_plain_key() {
        let result = normalize_one(json!({"address_city": "Y", "id": 1, "address": {"city": "X"}})).unwrap();
        assert_eq!(result.data["address_city"], json!("X"));
        let keys: Vec<&String> = result.data.keys().collect();
        assert_eq!(keys, vec!["address_city", "id"]);
    }

    #[test]
    fn test_custom_field_object_value_flattened() {
        let result = normalize_one(json!({"custom_fields": {"cf_foo_42": {"label": "East", "code": 3}}})).unwrap();
        assert_eq!(result, entity(json!({"Region_label": "East", "Region_code": 3})));
    }

    #[test]
    fn test_excluded_keys_dropped() {
        let directory = directory();
        let excluded = HashSet::from(["secret".to_string(), "Owner".to_string(), "company".to_string()]);
        let normalizer = Normalizer::new(&directory, excluded, UnknownFieldPolicy::Fail);

        let result = normalizer
            .normalize_entity(entity(json!({
                "id": 1,
                "secret": "token",
                "company": {"id": 4, "name": "Acme"},
                "custom_fields": {"cf_foo_7": "Ada"}
            })))
            .unwrap();

        assert_eq!(result, entity(json!({"id": 1})));
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let directory = directory();
        let normalizer = Normalizer::new(&directory, HashSet::new(), UnknownFieldPolicy::Fail);
        let raw = vec![
            entity(json!({"id": 1, "address": {"city": "X"}, "custom_fields": {"cf_foo_42": "East"}})),
            entity(json!({"id": 2, "name": "Beta"})),
        ];

        let once = normalizer.normalize(raw).unwrap();
        let twice = normalizer.normalize(once.clone()).unwrap();

        assert_eq!(once, twice);
    }
}
