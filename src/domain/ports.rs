use crate::core::field_directory::FieldDirectory;
use crate::domain::model::{Entity, EntityKind, ExportResult};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::collections::HashSet;
use std::time::Duration;

pub trait Storage: Send + Sync {
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// What to do with a custom field whose id has no label definition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UnknownFieldPolicy {
    #[default]
    Fail,
    Skip,
}

/// How double quotes inside string cells are written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum QuotePolicy {
    /// `"` becomes `""` (RFC 4180).
    #[default]
    Escape,
    /// `"` becomes `'`.
    Fold,
}

pub trait ConfigProvider: Send + Sync {
    fn base_url(&self) -> &str;
    fn api_key(&self) -> &str;
    fn output_path(&self) -> &str;
    fn excluded_keys(&self) -> HashSet<String>;
    fn unknown_field_policy(&self) -> UnknownFieldPolicy;
    fn quote_policy(&self) -> QuotePolicy;
    fn request_timeout(&self) -> Option<Duration>;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn field_directory(&self) -> Result<FieldDirectory>;
    async fn extract(&self, kind: EntityKind) -> Result<Vec<Entity>>;
    async fn transform(
        &self,
        kind: EntityKind,
        data: Vec<Entity>,
        directory: &FieldDirectory,
    ) -> Result<ExportResult>;
    async fn load(&self, result: ExportResult) -> Result<String>;
}
