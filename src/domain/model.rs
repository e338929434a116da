use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// One exported record. Keys keep the order they arrived in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Entity {
    pub data: Map<String, Value>,
}

impl Entity {
    pub fn new(data: Map<String, Value>) -> Self {
        Self { data }
    }
}

impl From<Map<String, Value>> for Entity {
    fn from(data: Map<String, Value>) -> Self {
        Self { data }
    }
}

/// The PipelineDeals collections this tool reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Companies,
    Users,
    Deals,
    CompanyFields,
    DealFields,
    PersonFields,
}

impl EntityKind {
    /// Exported collections, in the order their files are written.
    pub const EXPORTED: [EntityKind; 3] = [EntityKind::Companies, EntityKind::Users, EntityKind::Deals];

    /// Custom-field label collections, in directory merge order.
    pub const FIELD_LABELS: [EntityKind; 3] = [
        EntityKind::CompanyFields,
        EntityKind::DealFields,
        EntityKind::PersonFields,
    ];

    pub fn path(&self) -> &'static str {
        match self {
            EntityKind::Companies => "companies",
            EntityKind::Users => "users",
            EntityKind::Deals => "deals",
            EntityKind::CompanyFields => "admin/company_custom_field_labels",
            EntityKind::DealFields => "admin/deal_custom_field_labels",
            EntityKind::PersonFields => "admin/person_custom_field_labels",
        }
    }

    pub fn file_name(&self) -> Option<&'static str> {
        match self {
            EntityKind::Companies => Some("companies.csv"),
            EntityKind::Users => Some("users.csv"),
            EntityKind::Deals => Some("deals.csv"),
            _ => None,
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.path())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u64,
    pub pages: u64,
}

/// One page of any collection endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct PageResponse {
    pub pagination: Pagination,
    #[serde(default)]
    pub entries: Vec<Map<String, Value>>,
}

/// A custom-field label definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    #[serde(deserialize_with = "id_as_string")]
    pub id: String,
    pub name: String,
    /// Vendor metadata (field type, dropdown entries, ...) that the export ignores.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FieldDescriptor {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            extra: Map::new(),
        }
    }
}

fn id_as_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "field id must be a number or string, got {}",
            other
        ))),
    }
}

/// Output of the transform stage for one collection.
#[derive(Debug, Clone)]
pub struct ExportResult {
    pub kind: EntityKind,
    pub records: Vec<Entity>,
    pub csv_output: String,
}
