use clap::Parser;
use fraud_alert_etl::config::toml_config::TomlConfig;
use fraud_alert_etl::utils::{logger, validation::Validate};
use fraud_alert_etl::{EtlEngine, HttpFraudApi, LocalStorage};
use tokio::sync::watch;

#[derive(Parser)]
#[command(name = "toml-etl")]
#[command(about = "Fraud-alert ETL driven by a TOML configuration file")]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "etl-config.toml")]
    config: String,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Override monitoring setting from config
    #[arg(long)]
    monitor: Option<bool>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // 初始化日誌
    logger::init_cli_logger(args.verbose);

    tracing::info!("🚀 Starting TOML-based fraud-alert ETL");
    tracing::info!("📁 Loading configuration from: {}", args.config);

    // 載入 TOML 配置
    let config = match TomlConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config file '{}': {}", args.config, e);
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(1);
        }
    };

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    tracing::info!("✅ Configuration loaded and validated successfully");
    display_config_summary(&config);

    // 決定監控設定
    let monitor_enabled = args.monitor.unwrap_or_else(|| config.monitoring_enabled());
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    // Ctrl-C 轉成合作式取消
    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("⛔ Interrupt received. Saving collected results so far...");
            let _ = cancel_tx.send(true);
        }
    });

    let api = match HttpFraudApi::from_config(&config) {
        Ok(api) => api,
        Err(e) => {
            eprintln!("❌ {}", e.user_friendly_message());
            std::process::exit(3);
        }
    };
    let storage = LocalStorage::new();
    let engine = EtlEngine::new_with_monitoring(api, storage, config, cancel_rx, monitor_enabled);

    match engine.run().await {
        Ok(output_path) => {
            tracing::info!("✅ ETL process completed successfully!");
            println!("✅ ETL process completed successfully!");
            println!("📁 Output saved to: {}", output_path);
        }
        Err(e) => {
            tracing::error!(
                "❌ ETL process failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 建議: {}", e.recovery_suggestion());

            let exit_code = match e.severity() {
                fraud_alert_etl::utils::error::ErrorSeverity::Low => 0,
                fraud_alert_etl::utils::error::ErrorSeverity::Medium => 2,
                fraud_alert_etl::utils::error::ErrorSeverity::High => 1,
                fraud_alert_etl::utils::error::ErrorSeverity::Critical => 3,
            };
            if exit_code > 0 {
                std::process::exit(exit_code);
            }
        }
    }

    Ok(())
}

fn display_config_summary(config: &TomlConfig) {
    use fraud_alert_etl::core::ConfigProvider;

    println!("📋 Configuration Summary:");
    println!("  Job: {} v{}", config.job.name, config.job.version);
    println!("  API: {}", config.base_url());
    println!("  Input: {}", config.input_path());
    println!("  Output: {}", config.output_path());
    println!("  Mode: {:?}", config.run_mode());
    println!("  Max Workers: {}", config.max_workers());
    println!();
}
