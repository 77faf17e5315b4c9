use crate::adapters::csv_io;
use crate::core::dispatch::{sort_by_txn_time, Dispatcher};
use crate::core::normalize::FieldPolicy;
use crate::core::tps::{run_observer, TpsWindow};
use crate::domain::ports::{ConfigProvider, FraudApi, Storage};
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;

/// 整個 run 的編排：認證 → 讀檔 → 排序 → 並發送審 → 寫出結果。
///
/// 不論正常跑完或中途取消，輸出都只 flush 一次。
pub struct EtlEngine<A: FraudApi, S: Storage, C: ConfigProvider> {
    api: A,
    storage: S,
    config: C,
    monitor: SystemMonitor,
    cancel: watch::Receiver<bool>,
}

impl<A: FraudApi, S: Storage, C: ConfigProvider> EtlEngine<A, S, C> {
    pub fn new(api: A, storage: S, config: C, cancel: watch::Receiver<bool>) -> Self {
        Self::new_with_monitoring(api, storage, config, cancel, false)
    }

    pub fn new_with_monitoring(
        api: A,
        storage: S,
        config: C,
        cancel: watch::Receiver<bool>,
        monitor_enabled: bool,
    ) -> Self {
        Self {
            api,
            storage,
            config,
            monitor: SystemMonitor::new(monitor_enabled),
            cancel,
        }
    }

    pub async fn run(&self) -> Result<String> {
        let run_clock = Instant::now();

        // 認證失敗直接中止，一筆都不送
        let token = self.api.authenticate().await?;
        tracing::info!("🔑 Authenticated against {}", self.config.base_url());

        let raw_bytes = self.storage.read_file(self.config.input_path()).await?;
        let mut records = csv_io::parse_records(&raw_bytes)?;
        tracing::info!(
            "📋 Loaded {} transactions from {}",
            records.len(),
            self.config.input_path()
        );
        sort_by_txn_time(&mut records);
        self.monitor.log_stats("Extract");

        // TPS 觀測迴圈跟著整個送審階段跑；
        // 引擎自己的 stop channel 讓正常跑完也能收掉它
        let tps = Arc::new(TpsWindow::new());
        let (observer_stop, observer_rx) = watch::channel(false);
        let observer = tokio::spawn(run_observer(
            Arc::clone(&tps),
            self.config.tps_log_path().to_string(),
            observer_rx,
        ));

        let mut policy = FieldPolicy::new(self.config.batch_prefix());
        policy.prefix_hashcodes = self.config.prefix_hashcodes();
        policy.clear_incorporation_dates = self.config.clear_incorporation_dates();

        let dispatcher = Dispatcher::new(
            &self.api,
            policy,
            self.config.run_mode(),
            self.config.max_workers(),
            self.config.progress_every(),
        );
        let rows = dispatcher
            .run(records, &token, &tps, self.cancel.clone())
            .await;
        self.monitor.log_stats("Dispatch");

        // 關掉觀測迴圈，最多等兩秒
        let final_tps = tps.current();
        let _ = observer_stop.send(true);
        if tokio::time::timeout(Duration::from_secs(2), observer)
            .await
            .is_err()
        {
            tracing::warn!("⚠️ TPS observer did not stop within bounded wait");
        }

        let csv_bytes = csv_io::write_output_csv(&rows)?;
        self.storage
            .write_file(self.config.output_path(), &csv_bytes)
            .await?;

        tracing::info!(
            "✅ Done. {} rows saved to '{}' in {:.2} sec",
            rows.len(),
            self.config.output_path(),
            run_clock.elapsed().as_secs_f64()
        );
        tracing::info!("📊 Final TPS recorded (last second): {}", final_tps);
        self.monitor.log_final_stats();

        Ok(self.config.output_path().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{
        AlertEnvelope, ApiResponse, NormalizedPayload, RunMode, Token,
    };
    use crate::utils::error::EtlError;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use tokio::sync::Mutex;

    #[derive(Clone)]
    struct MockStorage {
        files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    }

    impl MockStorage {
        fn new() -> Self {
            Self {
                files: Arc::new(Mutex::new(HashMap::new())),
            }
        }

        async fn put(&self, path: &str, data: &[u8]) {
            self.files.lock().await.insert(path.to_string(), data.to_vec());
        }

        async fn get(&self, path: &str) -> Option<Vec<u8>> {
            self.files.lock().await.get(path).cloned()
        }
    }

    impl Storage for MockStorage {
        async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
            self.files.lock().await.get(path).cloned().ok_or_else(|| {
                EtlError::IoError(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("File not found: {}", path),
                ))
            })
        }

        async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
            self.files.lock().await.insert(path.to_string(), data.to_vec());
            Ok(())
        }
    }

    struct MockApi;

    #[async_trait]
    impl FraudApi for MockApi {
        async fn authenticate(&self) -> Result<Token> {
            Ok(Token("mock".to_string()))
        }

        async fn submit(
            &self,
            payload: &NormalizedPayload,
            _token: &Token,
            _mode: RunMode,
        ) -> Result<ApiResponse> {
            let envelope: AlertEnvelope = serde_json::from_value(serde_json::json!({
                "alert": {
                    "txn": { "transaction_id": payload.transaction_id },
                    "ruleAlert": [{ "ruleId": "R-1" }]
                }
            }))
            .unwrap();
            Ok(ApiResponse::Alert(envelope))
        }
    }

    struct MockConfig {
        tps_log_path: String,
    }

    impl ConfigProvider for MockConfig {
        fn base_url(&self) -> &str {
            "http://localhost"
        }
        fn auth_endpoint(&self) -> &str {
            "/auth"
        }
        fn alert_endpoint(&self) -> &str {
            "/alert"
        }
        fn ack_endpoint(&self) -> &str {
            "/ack"
        }
        fn tenant_id(&self) -> &str {
            "1"
        }
        fn basic_auth(&self) -> &str {
            "dXNlcjpwYXNz"
        }
        fn input_path(&self) -> &str {
            "input.csv"
        }
        fn output_path(&self) -> &str {
            "output.csv"
        }
        fn tps_log_path(&self) -> &str {
            &self.tps_log_path
        }
        fn max_workers(&self) -> usize {
            4
        }
        fn run_mode(&self) -> RunMode {
            RunMode::Alert
        }
        fn batch_prefix(&self) -> &str {
            "B"
        }
        fn progress_every(&self) -> usize {
            100
        }
        fn request_timeout_secs(&self) -> Option<u64> {
            None
        }
        fn prefix_hashcodes(&self) -> bool {
            false
        }
        fn clear_incorporation_dates(&self) -> bool {
            false
        }
    }

    fn test_config(dir: &tempfile::TempDir) -> MockConfig {
        MockConfig {
            tps_log_path: dir
                .path()
                .join("tps_log.txt")
                .to_str()
                .unwrap()
                .to_string(),
        }
    }

    #[tokio::test]
    async fn test_run_writes_flattened_output() {
        let dir = tempfile::tempdir().unwrap();
        let storage = MockStorage::new();
        storage
            .put(
                "input.csv",
                b"transaction_id,txn_date_time\nT1,7/1/2025 12:10 AM\nT2,7/1/2025 12:20 AM\n",
            )
            .await;

        let (_tx, rx) = watch::channel(false);
        let engine = EtlEngine::new(MockApi, storage.clone(), test_config(&dir), rx);

        let output_path = engine.run().await.unwrap();
        assert_eq!(output_path, "output.csv");

        let written = storage.get("output.csv").await.unwrap();
        let text = String::from_utf8(written).unwrap();
        assert!(text.contains("transaction_id"));
        assert!(text.contains("BTxnT1"));
        assert!(text.contains("BTxnT2"));
        assert!(text.contains("ruleId"));
    }

    #[tokio::test]
    async fn test_cancelled_run_still_flushes_output() {
        let dir = tempfile::tempdir().unwrap();
        let storage = MockStorage::new();
        storage
            .put("input.csv", b"transaction_id,txn_date_time\nT1,7/1/2025 12:10 AM\n")
            .await;

        let (tx, rx) = watch::channel(false);
        tx.send(true).unwrap();
        let engine = EtlEngine::new(MockApi, storage.clone(), test_config(&dir), rx);

        engine.run().await.unwrap();

        // 取消了也要 flush（這裡是空結果，所以是空檔案）
        assert!(storage.get("output.csv").await.is_some());
    }

    #[tokio::test]
    async fn test_missing_input_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let storage = MockStorage::new();
        let (_tx, rx) = watch::channel(false);
        let engine = EtlEngine::new(MockApi, storage, test_config(&dir), rx);

        assert!(engine.run().await.is_err());
    }
}
