use crate::domain::model::{AlertEnvelope, ApiResponse, NormalizedPayload, RunMode, Token};
use crate::domain::ports::{ConfigProvider, FraudApi};
use crate::utils::error::{EtlError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

/// 送 API 的固定信封格式
#[derive(Debug, Serialize)]
struct SubmitEnvelope<'a> {
    payload: &'a NormalizedPayload,
    format: &'a str,
    version: &'a str,
}

/// 詐欺偵測 API 的 reqwest 實作：一次性認證握手 + 單筆送審
pub struct HttpFraudApi {
    client: Client,
    base_url: String,
    auth_endpoint: String,
    alert_endpoint: String,
    ack_endpoint: String,
    tenant_id: String,
    basic_auth: String,
}

impl HttpFraudApi {
    pub fn from_config<C: ConfigProvider>(config: &C) -> Result<Self> {
        let mut builder = Client::builder();
        // 預設不設 timeout，也不做任何自動重試
        if let Some(secs) = config.request_timeout_secs() {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build()?;

        Ok(Self {
            client,
            base_url: config.base_url().trim_end_matches('/').to_string(),
            auth_endpoint: config.auth_endpoint().to_string(),
            alert_endpoint: config.alert_endpoint().to_string(),
            ack_endpoint: config.ack_endpoint().to_string(),
            tenant_id: config.tenant_id().to_string(),
            basic_auth: config.basic_auth().to_string(),
        })
    }
}

#[async_trait]
impl FraudApi for HttpFraudApi {
    async fn authenticate(&self) -> Result<Token> {
        let url = format!("{}{}", self.base_url, self.auth_endpoint);
        tracing::debug!("Authenticating at {}", url);

        let response = self
            .client
            .post(&url)
            .query(&[("tenantId", self.tenant_id.as_str())])
            .json(&serde_json::json!({}))
            .header("Accept-Language", "en-GB,en-US;q=0.9,en;q=0.8")
            .header("Authorization", format!("Basic {}", self.basic_auth))
            .header("Connection", "keep-alive")
            .header("Content-Type", "application/json;charset=UTF-8")
            .header("Origin", &self.base_url)
            .header("Referer", format!("{}/", self.base_url))
            .header("User-Agent", "Mozilla/5.0")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(EtlError::AuthError {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let body: serde_json::Value = response.json().await?;
        match body.get("token").and_then(|v| v.as_str()) {
            Some(token) if !token.is_empty() => Ok(Token(token.to_string())),
            _ => Err(EtlError::AuthError {
                status: status.as_u16(),
                message: "token missing in auth response".to_string(),
            }),
        }
    }

    async fn submit(
        &self,
        payload: &NormalizedPayload,
        token: &Token,
        mode: RunMode,
    ) -> Result<ApiResponse> {
        let endpoint = match mode {
            RunMode::Alert => &self.alert_endpoint,
            RunMode::Ack => &self.ack_endpoint,
        };
        let url = format!("{}{}", self.base_url, endpoint);
        let envelope = SubmitEnvelope {
            payload,
            format: "tt_json",
            version: "1",
        };

        // 傳輸層錯誤也算單筆失敗，收斂成 ApiError 讓整批繼續跑
        let api_error = |message: String| EtlError::ApiError {
            transaction_id: payload.transaction_id.clone(),
            message,
        };

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Token {}", token.as_str()))
            .json(&envelope)
            .send()
            .await
            .map_err(|e| api_error(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(api_error(format!("HTTP {}: {}", status.as_u16(), body)));
        }

        match mode {
            RunMode::Alert => {
                let text = response.text().await.map_err(|e| api_error(e.to_string()))?;
                let envelope: AlertEnvelope = serde_json::from_str(&text)
                    .map_err(|e| api_error(format!("malformed alert response: {}", e)))?;
                Ok(ApiResponse::Alert(envelope))
            }
            RunMode::Ack => {
                let text = response.text().await.map_err(|e| api_error(e.to_string()))?;
                Ok(ApiResponse::Ack(text.trim().to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::normalize::{normalize, FieldPolicy};
    use crate::domain::model::RawRecord;
    use httpmock::prelude::*;

    struct TestConfig {
        base_url: String,
    }

    impl ConfigProvider for TestConfig {
        fn base_url(&self) -> &str {
            &self.base_url
        }
        fn auth_endpoint(&self) -> &str {
            "/api/v1/users/auth"
        }
        fn alert_endpoint(&self) -> &str {
            "/api/v1/realtime/5/fraud-alert"
        }
        fn ack_endpoint(&self) -> &str {
            "/api/v1/realtime/5/fraud-ack"
        }
        fn tenant_id(&self) -> &str {
            "5"
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
            "tps_log.txt"
        }
        fn max_workers(&self) -> usize {
            5
        }
        fn run_mode(&self) -> RunMode {
            RunMode::Alert
        }
        fn batch_prefix(&self) -> &str {
            "X"
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

    fn api_for(server: &MockServer) -> HttpFraudApi {
        HttpFraudApi::from_config(&TestConfig {
            base_url: server.base_url(),
        })
        .unwrap()
    }

    fn payload() -> NormalizedPayload {
        let mut record = RawRecord::default();
        record
            .data
            .insert("transaction_id".to_string(), "T1".to_string());
        normalize(&record, &FieldPolicy::new("X"))
    }

    #[tokio::test]
    async fn test_submit_wraps_payload_in_envelope() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/api/v1/realtime/5/fraud-alert")
                .header("Authorization", "Token tok-1")
                .json_body_partial(r#"{ "format": "tt_json", "version": "1" }"#);
            then.status(200).json_body(serde_json::json!({
                "alert": { "txn": {}, "ruleAlert": [] }
            }));
        });

        let api = api_for(&server);
        let response = api
            .submit(&payload(), &Token("tok-1".to_string()), RunMode::Alert)
            .await
            .unwrap();

        mock.assert();
        assert!(matches!(response, ApiResponse::Alert(_)));
    }

    #[tokio::test]
    async fn test_submit_non_2xx_is_api_error_with_transaction_id() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/api/v1/realtime/5/fraud-alert");
            then.status(422).body("rejected");
        });

        let api = api_for(&server);
        let err = api
            .submit(&payload(), &Token("tok".to_string()), RunMode::Alert)
            .await
            .unwrap_err();

        match err {
            EtlError::ApiError {
                transaction_id,
                message,
            } => {
                assert_eq!(transaction_id, "XTxnT1");
                assert!(message.contains("422"));
                assert!(message.contains("rejected"));
            }
            other => panic!("expected ApiError, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_submit_malformed_alert_body_is_api_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/api/v1/realtime/5/fraud-alert");
            then.status(200).body("not json");
        });

        let api = api_for(&server);
        let err = api
            .submit(&payload(), &Token("tok".to_string()), RunMode::Alert)
            .await
            .unwrap_err();
        assert!(matches!(err, EtlError::ApiError { .. }));
    }

    #[tokio::test]
    async fn test_ack_mode_returns_trimmed_text() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST).path("/api/v1/realtime/5/fraud-ack");
            then.status(200).body("request_received\n");
        });

        let api = api_for(&server);
        let response = api
            .submit(&payload(), &Token("tok".to_string()), RunMode::Ack)
            .await
            .unwrap();

        mock.assert();
        assert_eq!(response, ApiResponse::Ack("request_received".to_string()));
    }
}
