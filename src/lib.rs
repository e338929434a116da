pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::{cli::LocalStorage, toml_config::TomlConfig};

pub use core::{
    csv_encoder::CsvEncoder, etl::EtlEngine, field_directory::FieldDirectory,
    normalizer::Normalizer, paginator::Paginator, pipeline::ExportPipeline,
};
pub use utils::error::{ExportError, Result};
