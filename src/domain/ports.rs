use crate::domain::model::{ApiResponse, NormalizedPayload, RunMode, Token};
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// 遠端詐欺偵測 API 的抽象；dispatcher 測試用 mock 實作替換
#[async_trait]
pub trait FraudApi: Send + Sync {
    /// 每次執行只呼叫一次；失敗即中止整個 run
    async fn authenticate(&self) -> Result<Token>;

    /// 單筆交易送審；非 2xx 轉成 ApiError，不自動重試
    async fn submit(
        &self,
        payload: &NormalizedPayload,
        token: &Token,
        mode: RunMode,
    ) -> Result<ApiResponse>;
}

pub trait ConfigProvider: Send + Sync {
    fn base_url(&self) -> &str;
    fn auth_endpoint(&self) -> &str;
    fn alert_endpoint(&self) -> &str;
    fn ack_endpoint(&self) -> &str;
    fn tenant_id(&self) -> &str;
    fn basic_auth(&self) -> &str;
    fn input_path(&self) -> &str;
    fn output_path(&self) -> &str;
    fn tps_log_path(&self) -> &str;
    fn max_workers(&self) -> usize;
    fn run_mode(&self) -> RunMode;
    fn batch_prefix(&self) -> &str;
    fn progress_every(&self) -> usize;
    fn request_timeout_secs(&self) -> Option<u64>;
    fn prefix_hashcodes(&self) -> bool;
    fn clear_incorporation_dates(&self) -> bool;
}
