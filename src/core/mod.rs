pub mod csv_encoder;
pub mod etl;
pub mod field_directory;
pub mod normalizer;
pub mod paginator;
pub mod pipeline;

pub use crate::domain::model::{Entity, EntityKind, ExportResult};
pub use crate::domain::ports::{ConfigProvider, Pipeline, QuotePolicy, Storage, UnknownFieldPolicy};
pub use crate::utils::error::Result;
