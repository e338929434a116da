use crate::core::csv_encoder::CsvEncoder;
use crate::core::field_directory::FieldDirectory;
use crate::core::normalizer::Normalizer;
use crate::core::paginator::Paginator;
use crate::core::{ConfigProvider, Entity, EntityKind, ExportResult, Pipeline, Storage};
use crate::utils::error::{ExportError, Result};
use reqwest::Client;
use std::path::Path;

/// Exports PipelineDeals collections to CSV files through `storage`.
pub struct ExportPipeline<S: Storage, C: ConfigProvider> {
    storage: S,
    config: C,
    paginator: Paginator,
}

impl<S: Storage, C: ConfigProvider> ExportPipeline<S, C> {
    pub fn new(storage: S, config: C) -> Self {
        let paginator = Paginator::new(Client::new(), config.base_url(), config.api_key())
            .with_timeout(config.request_timeout());
        Self {
            storage,
            config,
            paginator,
        }
    }
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for ExportPipeline<S, C> {
    async fn field_directory(&self) -> Result<FieldDirectory> {
        FieldDirectory::fetch(&self.paginator).await
    }

    async fn extract(&self, kind: EntityKind) -> Result<Vec<Entity>> {
        self.paginator.fetch_all(kind).await
    }

    async fn transform(
        &self,
        kind: EntityKind,
        data: Vec<Entity>,
        directory: &FieldDirectory,
    ) -> Result<ExportResult> {
        let normalizer = Normalizer::new(
            directory,
            self.config.excluded_keys(),
            self.config.unknown_field_policy(),
        );
        let records = normalizer.normalize(data)?;
        let csv_output = CsvEncoder::new(self.config.quote_policy()).encode(&records)?;

        tracing::debug!("🔄 {}: normalized {} records", kind, records.len());
        Ok(ExportResult {
            kind,
            records,
            csv_output,
        })
    }

    async fn load(&self, result: ExportResult) -> Result<String> {
        let file_name = result.kind.file_name().ok_or_else(|| ExportError::Config {
            message: format!("'{}' is not an exported collection", result.kind),
        })?;

        tracing::debug!("💾 Writing {} ({} bytes)", file_name, result.csv_output.len());
        self.storage
            .write_file(file_name, result.csv_output.as_bytes())
            .await?;

        Ok(Path::new(self.config.output_path())
            .join(file_name)
            .to_string_lossy()
            .into_owned())
    }
}
