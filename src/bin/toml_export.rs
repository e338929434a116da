use clap::Parser;
use pipedeals_export::config::toml_config::TomlConfig;
use pipedeals_export::core::{ConfigProvider, EntityKind, QuotePolicy, UnknownFieldPolicy};
use pipedeals_export::utils::{logger, validation::Validate};
use pipedeals_export::{EtlEngine, ExportPipeline, LocalStorage};

#[derive(Parser)]
#[command(name = "toml-export")]
#[command(about = "PipelineDeals CSV export driven by a TOML configuration file")]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "export-config.toml")]
    config: String,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Show what would be exported without calling the API
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let config = match TomlConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config file '{}': {}", args.config, e);
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(1);
        }
    };

    let verbose = args.verbose || config.verbose();
    if config.json_logs() {
        logger::init_json_logger(verbose);
    } else {
        logger::init_cli_logger(verbose);
    }
    tracing::info!("📁 Loaded configuration from: {}", args.config);

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    let kinds = config.collections()?;
    display_plan(&config, &kinds);

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - no requests were made");
        return Ok(());
    }

    let storage = LocalStorage::new(config.output_path());
    let engine = EtlEngine::new(ExportPipeline::new(storage, config)).with_kinds(kinds);

    match engine.run().await {
        Ok(paths) => {
            tracing::info!("✅ Export completed: {} files", paths.len());
            for path in paths {
                println!("📁 {}", path);
            }
            Ok(())
        }
        Err(e) => {
            tracing::error!(
                "❌ Export failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());
            std::process::exit(e.severity().exit_code());
        }
    }
}

fn display_plan(config: &TomlConfig, kinds: &[EntityKind]) {
    println!("📋 Export plan:");
    println!("  Source: {}", config.base_url());
    println!("  Output: {}", config.output_path());
    println!("  Field labels:");
    for kind in EntityKind::FIELD_LABELS {
        println!("    - {}", kind.path());
    }
    println!("  Collections:");
    for kind in kinds {
        println!("    - {} -> {}", kind.path(), kind.file_name().unwrap_or_default());
    }

    let mut excluded: Vec<String> = config.excluded_keys().into_iter().collect();
    excluded.sort();
    if !excluded.is_empty() {
        println!("  Excluded columns: {}", excluded.join(", "));
    }

    let unknown = match config.unknown_field_policy() {
        UnknownFieldPolicy::Fail => "fail the run",
        UnknownFieldPolicy::Skip => "skip with a warning",
    };
    println!("  Unlabelled custom fields: {}", unknown);

    let quotes = match config.quote_policy() {
        QuotePolicy::Escape => "doubled",
        QuotePolicy::Fold => "folded to single quotes",
    };
    println!("  Embedded double quotes: {}", quotes);
    println!();
}
