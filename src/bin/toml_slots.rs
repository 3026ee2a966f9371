use clap::Parser;
use slot_etl::config::toml_config::{LogFormat, TomlConfig};
use slot_etl::core::{ConfigProvider, Pipeline};
use slot_etl::utils::{logger, validation::Validate};
use slot_etl::{EtlEngine, LocalStorage, ScheduleRecord, SlotPipeline};

#[derive(Parser)]
#[command(name = "toml-slots")]
#[command(about = "Slot ETL driven by a TOML configuration file")]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "slots-config.toml")]
    config: String,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Override the time zone from config
    #[arg(long)]
    timezone: Option<String>,

    /// Print the slot list to stdout
    #[arg(long)]
    print: bool,

    /// Fetch and split schedules without writing any output
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match TomlConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config file '{}': {}", args.config, e);
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(1);
        }
    };

    let verbose = args.verbose || config.verbose_logging();
    match config.log_format() {
        LogFormat::Compact => logger::init_cli_logger(verbose),
        LogFormat::Json => logger::init_json_logger(verbose),
    }

    tracing::info!("🚀 Starting TOML-based slot ETL");
    tracing::info!("📁 Configuration loaded from: {}", args.config);

    if let Some(timezone) = &args.timezone {
        config.transform.timezone = Some(timezone.clone());
        tracing::info!("🔧 Time zone overridden to: {}", timezone);
    }
    if args.print {
        config.load.print_result = Some(true);
    }

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    display_config_summary(&config, &args);

    let storage = LocalStorage::new(config.output_path().to_string());
    let engine = EtlEngine::new(SlotPipeline::new(storage, config));

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - no output will be written");
        perform_dry_run(&engine).await?;
        return Ok(());
    }

    match engine.run().await {
        Ok(summary) => {
            println!(
                "✅ {} slots from {} schedules",
                summary.slot_count, summary.record_count
            );
            if summary.rejected_count > 0 {
                println!("⚠️  {} schedules skipped", summary.rejected_count);
            }
            println!("📁 Output saved to: {}", summary.output_path);
        }
        Err(e) => {
            tracing::error!(
                "❌ Slot ETL failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());
            std::process::exit(e.severity().exit_code());
        }
    }

    Ok(())
}

fn display_config_summary(config: &TomlConfig, args: &Args) {
    println!("📋 Configuration Summary:");
    println!(
        "  Pipeline: {} v{}",
        config.pipeline.name, config.pipeline.version
    );
    match config.source() {
        Ok(source) => println!("  Source: {:?}", source),
        Err(e) => println!("  Source: {}", e),
    }
    if let Some(timezone) = &config.transform.timezone {
        println!("  Time zone: {}", timezone);
    }
    println!("  Output: {}", config.output_path());
    let formats: Vec<String> = config
        .output_formats()
        .iter()
        .map(|f| f.to_string())
        .collect();
    println!("  Formats: {}", formats.join(", "));
    if let Some(archive) = config.archive_name() {
        println!("  Compression: {} (ZIP)", archive);
    }
    println!("  On record error: {:?}", config.on_record_error());

    if args.dry_run {
        println!("  🔍 DRY RUN MODE ENABLED");
    }

    println!();
}

async fn perform_dry_run<P: Pipeline>(
    engine: &EtlEngine<P>,
) -> Result<(), Box<dyn std::error::Error>> {
    let records = engine.pipeline().extract().await?;
    let result = engine.pipeline().transform(records.clone()).await?;

    println!("🔍 Dry Run Analysis:");
    println!("  Schedules: {}", records.len());
    for value in records {
        // Undecodable records show up below with the rejected ones.
        let Ok(record) = ScheduleRecord::from_value(value) else {
            continue;
        };
        let breaks = record
            .break_fields()
            .iter()
            .filter(|fields| !fields.is_unset())
            .count();
        println!(
            "  #{} {} {} {}-{} ({} break(s))",
            record.schedule_id,
            record.employee_name,
            record.start_date,
            record.start_time,
            record.end_time,
            breaks
        );
    }
    println!("  Bookable slots: {}", result.slots.len());
    for rejected in &result.rejected {
        match rejected.schedule_id {
            Some(id) => println!("  ⚠️  #{} skipped: {}", id, rejected.reason),
            None => println!("  ⚠️  record skipped: {}", rejected.reason),
        }
    }

    println!();
    println!("✅ Dry run complete. Nothing was written.");

    Ok(())
}
