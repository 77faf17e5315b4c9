pub mod toml_config;

use crate::core::ConfigProvider;
use crate::domain::model::RunMode;
use crate::utils::error::Result;
use crate::utils::validation::{
    self, validate_non_empty_string, validate_path, validate_positive_number, validate_url,
    Validate,
};
use clap::Parser;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(name = "fraud-alert-etl")]
#[command(about = "Submit a transaction batch to a fraud-detection API and collect flattened responses")]
pub struct CliConfig {
    #[arg(long, default_value = "https://caas-pilot-tdss.tookitaki.ai")]
    pub base_url: String,

    #[arg(long, default_value = "/api/v1/users/auth")]
    pub auth_endpoint: String,

    #[arg(long, default_value = "/api/v1/realtime/5/fraud-alert")]
    pub alert_endpoint: String,

    #[arg(long, default_value = "/api/v1/realtime/5/fraud-ack")]
    pub ack_endpoint: String,

    #[arg(long, default_value = "5")]
    pub tenant_id: String,

    /// Base64 basic-auth credential for the auth handshake
    #[arg(long, default_value = "")]
    pub basic_auth: String,

    #[arg(long, default_value = "sample.csv")]
    pub input_path: String,

    #[arg(long, default_value = "output_responses.csv")]
    pub output_path: String,

    #[arg(long, default_value = "tps_log.txt")]
    pub tps_log_path: String,

    /// Maximum concurrent in-flight submissions
    #[arg(long, default_value = "50")]
    pub max_workers: usize,

    /// Run mode: alert | ack
    #[arg(long, default_value = "alert")]
    pub mode: String,

    /// Prefix prepended to transaction ids to namespace this batch
    #[arg(long, default_value = "")]
    pub batch_prefix: String,

    /// Log a progress line every N completed calls
    #[arg(long, default_value = "100")]
    pub progress_every: usize,

    /// Optional per-request timeout in seconds (no timeout when unset)
    #[arg(long)]
    pub request_timeout_secs: Option<u64>,

    /// Also prefix sender/receiver hashcodes
    #[arg(long)]
    pub prefix_hashcodes: bool,

    /// Force both incorporation dates to "NA"
    #[arg(long)]
    pub clear_incorporation_dates: bool,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Enable system monitoring")]
    pub monitor: bool,
}

impl ConfigProvider for CliConfig {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn auth_endpoint(&self) -> &str {
        &self.auth_endpoint
    }

    fn alert_endpoint(&self) -> &str {
        &self.alert_endpoint
    }

    fn ack_endpoint(&self) -> &str {
        &self.ack_endpoint
    }

    fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    fn basic_auth(&self) -> &str {
        &self.basic_auth
    }

    fn input_path(&self) -> &str {
        &self.input_path
    }

    fn output_path(&self) -> &str {
        &self.output_path
    }

    fn tps_log_path(&self) -> &str {
        &self.tps_log_path
    }

    fn max_workers(&self) -> usize {
        self.max_workers
    }

    fn run_mode(&self) -> RunMode {
        // validate() 已擋掉壞值
        self.mode.parse().unwrap_or(RunMode::Alert)
    }

    fn batch_prefix(&self) -> &str {
        &self.batch_prefix
    }

    fn progress_every(&self) -> usize {
        self.progress_every
    }

    fn request_timeout_secs(&self) -> Option<u64> {
        self.request_timeout_secs
    }

    fn prefix_hashcodes(&self) -> bool {
        self.prefix_hashcodes
    }

    fn clear_incorporation_dates(&self) -> bool {
        self.clear_incorporation_dates
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validate_url("base_url", &self.base_url)?;
        validation::validate_endpoint_path("auth_endpoint", &self.auth_endpoint)?;
        validation::validate_endpoint_path("alert_endpoint", &self.alert_endpoint)?;
        validation::validate_endpoint_path("ack_endpoint", &self.ack_endpoint)?;
        validate_non_empty_string("tenant_id", &self.tenant_id)?;
        validate_non_empty_string("basic_auth", &self.basic_auth)?;
        validate_path("input_path", &self.input_path)?;
        validate_path("output_path", &self.output_path)?;
        validate_path("tps_log_path", &self.tps_log_path)?;
        validate_positive_number("max_workers", self.max_workers, 1)?;
        validate_positive_number("progress_every", self.progress_every, 1)?;

        self.mode.parse::<RunMode>().map_err(|reason| {
            crate::utils::error::EtlError::InvalidConfigValueError {
                field: "mode".to_string(),
                value: self.mode.clone(),
                reason,
            }
        })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> CliConfig {
        CliConfig::parse_from(["fraud-alert-etl", "--basic-auth", "dXNlcjpwYXNz"])
    }

    #[test]
    fn test_defaults_validate() {
        let config = base_config();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_workers, 50);
        assert_eq!(config.progress_every, 100);
        assert_eq!(config.run_mode(), RunMode::Alert);
        assert!(config.request_timeout_secs.is_none());
    }

    #[test]
    fn test_missing_credential_fails_validation() {
        let config = CliConfig::parse_from(["fraud-alert-etl"]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bad_mode_fails_validation() {
        let mut config = base_config();
        config.mode = "bulk".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_ack_mode_parses() {
        let mut config = base_config();
        config.mode = "ack".to_string();
        assert!(config.validate().is_ok());
        assert_eq!(config.run_mode(), RunMode::Ack);
    }
}
