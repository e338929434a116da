use crate::core::paginator::Paginator;
use crate::core::EntityKind;
use crate::domain::model::FieldDescriptor;
use crate::utils::error::Result;
use std::collections::HashMap;

/// Custom-field id → label definition, merged across company, deal and person fields.
#[derive(Debug, Clone, Default)]
pub struct FieldDirectory {
    fields: HashMap<String, FieldDescriptor>,
}

impl FieldDirectory {
    /// Merges the descriptor sets in the order given. A later descriptor
    /// replaces an earlier one with the same id.
    pub fn build<I>(descriptor_sets: I) -> Self
    where
        I: IntoIterator<Item = Vec<FieldDescriptor>>,
    {
        let mut fields = HashMap::new();
        for descriptor in descriptor_sets.into_iter().flatten() {
            if let Some(previous) = fields.insert(descriptor.id.clone(), descriptor) {
                tracing::warn!(
                    "⚠️ custom field id {} defined more than once; '{}' replaced",
                    previous.id,
                    previous.name
                );
            }
        }
        Self { fields }
    }

    /// Fetches the company, deal and person label collections, in that order.
    pub async fn fetch(paginator: &Paginator) -> Result<Self> {
        let mut sets = Vec::with_capacity(EntityKind::FIELD_LABELS.len());
        for kind in EntityKind::FIELD_LABELS {
            let descriptors = paginator
                .fetch_all(kind)
                .await?
                .into_iter()
                .map(|entity| serde_json::from_value(serde_json::Value::Object(entity.data)))
                .collect::<std::result::Result<Vec<FieldDescriptor>, _>>()?;
            sets.push(descriptors);
        }

        let directory = Self::build(sets);
        tracing::info!("🗂️ field directory holds {} custom field labels", directory.len());
        Ok(directory)
    }

    pub fn get(&self, field_id: &str) -> Option<&FieldDescriptor> {
        self.fields.get(field_id)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
