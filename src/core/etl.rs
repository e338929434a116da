use crate::core::{EntityKind, Pipeline};
use crate::utils::error::Result;

pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
    kinds: Vec<EntityKind>,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self {
            pipeline,
            kinds: EntityKind::EXPORTED.to_vec(),
        }
    }

    /// Restricts the run to `kinds`, exported in the order given.
    pub fn with_kinds(mut self, kinds: Vec<EntityKind>) -> Self {
        self.kinds = kinds;
        self
    }

    /// Builds the field directory once, then exports each collection in turn.
    /// Returns the written paths. The first failure aborts the run; files
    /// written before it stay on disk.
    pub async fn run(&self) -> Result<Vec<String>> {
        tracing::info!("🚀 Starting export of {} collections", self.kinds.len());

        let directory = self.pipeline.field_directory().await?;

        let mut outputs = Vec::with_capacity(self.kinds.len());
        for &kind in &self.kinds {
            tracing::info!("📥 Extracting {}", kind);
            let raw = self.pipeline.extract(kind).await?;

            let result = self.pipeline.transform(kind, raw, &directory).await?;
            tracing::info!("🔄 {}: {} rows ready", kind, result.records.len());

            let output_path = self.pipeline.load(result).await?;
            tracing::info!("💾 {} saved to {}", kind, output_path);
            outputs.push(output_path);
        }

        Ok(outputs)
    }
}
