use clap::Parser;
use fraud_alert_etl::utils::{logger, validation::Validate};
use fraud_alert_etl::{CliConfig, EtlEngine, HttpFraudApi, LocalStorage};
use tokio::sync::watch;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = CliConfig::parse();

    // 初始化日誌
    logger::init_cli_logger(config.verbose);

    tracing::info!("Starting fraud-alert-etl CLI");
    if config.verbose {
        tracing::debug!("CLI config: {:?}", config);
    }

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    let monitor_enabled = config.monitor;
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    // Ctrl-C 轉成合作式取消：不再派新工作、在途收完、結果照 flush
    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("⛔ Interrupt received. Saving collected results so far...");
            let _ = cancel_tx.send(true);
        }
    });

    // 創建 API client、存儲與引擎
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
            tracing::info!("📁 Output saved to: {}", output_path);
            println!("✅ ETL process completed successfully!");
            println!("📁 Output saved to: {}", output_path);
        }
        Err(e) => {
            // 記錄詳細錯誤信息
            tracing::error!(
                "❌ ETL process failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            // 輸出用戶友好的錯誤信息
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 建議: {}", e.recovery_suggestion());

            // 根據錯誤嚴重程度決定退出碼
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
