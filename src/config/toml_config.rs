use crate::core::ConfigProvider;
use crate::domain::model::RunMode;
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{
    self, validate_non_empty_string, validate_path, validate_positive_number, validate_url,
    Validate,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub job: JobConfig,
    pub api: ApiConfig,
    pub io: IoConfig,
    pub dispatch: Option<DispatchConfig>,
    pub normalize: Option<NormalizeConfig>,
    pub monitoring: Option<MonitoringConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    pub name: String,
    pub description: String,
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    pub auth_endpoint: String,
    pub alert_endpoint: String,
    pub ack_endpoint: String,
    pub tenant_id: String,
    /// Base64 basic-auth 憑證；建議放 ${FRAUD_API_BASIC_AUTH} 由環境帶入
    pub basic_auth: String,
    pub request_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IoConfig {
    pub input_path: String,
    pub output_path: String,
    pub tps_log_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    pub max_workers: Option<usize>,
    pub mode: Option<String>,
    pub progress_every: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizeConfig {
    pub batch_prefix: Option<String>,
    pub prefix_hashcodes: Option<bool>,
    pub clear_incorporation_dates: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub enabled: bool,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(EtlError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        // 處理環境變數替換
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| EtlError::InvalidConfigValueError {
            field: "toml_parsing".to_string(),
            value: String::new(),
            reason: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${FRAUD_API_BASIC_AUTH})
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").unwrap();

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn validate_config(&self) -> Result<()> {
        validate_url("api.base_url", &self.api.base_url)?;
        validation::validate_endpoint_path("api.auth_endpoint", &self.api.auth_endpoint)?;
        validation::validate_endpoint_path("api.alert_endpoint", &self.api.alert_endpoint)?;
        validation::validate_endpoint_path("api.ack_endpoint", &self.api.ack_endpoint)?;
        validate_non_empty_string("api.tenant_id", &self.api.tenant_id)?;
        validate_non_empty_string("api.basic_auth", &self.api.basic_auth)?;
        validate_path("io.input_path", &self.io.input_path)?;
        validate_path("io.output_path", &self.io.output_path)?;
        validate_positive_number("dispatch.max_workers", self.max_workers(), 1)?;
        validate_positive_number("dispatch.progress_every", self.progress_every(), 1)?;

        let mode = self.mode_str();
        mode.parse::<RunMode>()
            .map_err(|reason| EtlError::InvalidConfigValueError {
                field: "dispatch.mode".to_string(),
                value: mode.to_string(),
                reason,
            })?;

        Ok(())
    }

    fn mode_str(&self) -> &str {
        self.dispatch
            .as_ref()
            .and_then(|d| d.mode.as_deref())
            .unwrap_or("alert")
    }

    pub fn max_workers(&self) -> usize {
        self.dispatch
            .as_ref()
            .and_then(|d| d.max_workers)
            .unwrap_or(50)
    }

    pub fn progress_every(&self) -> usize {
        self.dispatch
            .as_ref()
            .and_then(|d| d.progress_every)
            .unwrap_or(100)
    }

    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.as_ref().map(|m| m.enabled).unwrap_or(false)
    }
}

impl ConfigProvider for TomlConfig {
    fn base_url(&self) -> &str {
        &self.api.base_url
    }

    fn auth_endpoint(&self) -> &str {
        &self.api.auth_endpoint
    }

    fn alert_endpoint(&self) -> &str {
        &self.api.alert_endpoint
    }

    fn ack_endpoint(&self) -> &str {
        &self.api.ack_endpoint
    }

    fn tenant_id(&self) -> &str {
        &self.api.tenant_id
    }

    fn basic_auth(&self) -> &str {
        &self.api.basic_auth
    }

    fn input_path(&self) -> &str {
        &self.io.input_path
    }

    fn output_path(&self) -> &str {
        &self.io.output_path
    }

    fn tps_log_path(&self) -> &str {
        self.io.tps_log_path.as_deref().unwrap_or("tps_log.txt")
    }

    fn max_workers(&self) -> usize {
        self.max_workers()
    }

    fn run_mode(&self) -> RunMode {
        self.mode_str().parse().unwrap_or(RunMode::Alert)
    }

    fn batch_prefix(&self) -> &str {
        self.normalize
            .as_ref()
            .and_then(|n| n.batch_prefix.as_deref())
            .unwrap_or("")
    }

    fn progress_every(&self) -> usize {
        self.progress_every()
    }

    fn request_timeout_secs(&self) -> Option<u64> {
        self.api.request_timeout_secs
    }

    fn prefix_hashcodes(&self) -> bool {
        self.normalize
            .as_ref()
            .and_then(|n| n.prefix_hashcodes)
            .unwrap_or(false)
    }

    fn clear_incorporation_dates(&self) -> bool {
        self.normalize
            .as_ref()
            .and_then(|n| n.clear_incorporation_dates)
            .unwrap_or(false)
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
