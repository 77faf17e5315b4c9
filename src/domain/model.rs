use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

/// 輸入 CSV 的一列，欄名對應原始字串值（缺值為空字串）
#[derive(Debug, Clone, Default)]
pub struct RawRecord {
    pub data: HashMap<String, String>,
}

impl RawRecord {
    pub fn get(&self, column: &str) -> &str {
        self.data.get(column).map(String::as_str).unwrap_or("")
    }

    /// Error rows 使用原始（未加前綴）的 transaction_id
    pub fn transaction_id_or_unknown(&self) -> String {
        let id = self.get("transaction_id").trim();
        if id.is_empty() {
            "UNKNOWN".to_string()
        } else {
            id.to_string()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Intermediary {
    #[serde(default)]
    pub hashcode: String,
}

impl Intermediary {
    pub fn placeholder() -> Vec<Intermediary> {
        vec![Intermediary {
            hashcode: String::new(),
        }]
    }
}

/// API-ready 的交易 payload。
///
/// 所有必要欄位都是具名欄位而非 map，缺值政策（"NA"、0.0、佔位 intermediary）
/// 在 normalize 階段就已套用，序列化後保證含有完整欄位集合。
/// 輸入檔多出來的欄位透過 `extra` 原樣帶過。
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NormalizedPayload {
    pub transaction_id: String,
    pub txn_date_time: String,
    pub txn_type: String,
    pub txn_type_code: String,
    pub txn_status: String,
    pub source_of_funds: String,
    pub external_id: String,
    pub external_code: String,
    pub sending_partner_code: String,
    pub receiving_partner_code: String,

    pub sender_hashcode: String,
    pub sender_advance_hashcode: String,
    pub sender_first_name: String,
    pub sender_last_name: String,
    pub sender_address: String,
    pub sender_msisdn: String,
    pub sender_currency: String,
    pub sender_country: String,
    pub sender_city: String,
    pub sender_incorporation_date: String,
    pub sender_amount: f64,
    pub sender_amount_usd: f64,

    pub receiver_hashcode: String,
    pub receiver_advance_hashcode: String,
    pub receiver_first_name: String,
    pub receiver_last_name: String,
    pub receiver_address: String,
    pub receiver_msisdn: String,
    pub receiver_currency: String,
    pub receiver_country: String,
    pub receiver_type: String,
    pub receiver_incorporation_date: String,
    pub receiver_amount: f64,

    pub intermediary: Vec<Intermediary>,

    #[serde(flatten)]
    pub extra: HashMap<String, String>,
}

/// 認證成功後取得的 bearer token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token(pub String);

impl Token {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Alert,
    Ack,
}

impl FromStr for RunMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "alert" => Ok(RunMode::Alert),
            "ack" => Ok(RunMode::Ack),
            other => Err(format!("unknown run mode '{}', expected alert|ack", other)),
        }
    }
}

/// 單筆 submit 的回應：alert 模式回巢狀結構，ack 模式回純文字
#[derive(Debug, Clone, PartialEq)]
pub enum ApiResponse {
    Alert(AlertEnvelope),
    Ack(String),
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct AlertEnvelope {
    pub alert: Alert,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Alert {
    #[serde(default)]
    pub txn: serde_json::Map<String, serde_json::Value>,
    #[serde(rename = "ruleAlert", default)]
    pub rule_alert: Vec<RuleAlert>,
}

/// 回應中的單一規則命中；欄位型別不固定（字串/數字/布林都出現過），保持寬鬆
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RuleAlert {
    #[serde(rename = "ruleId", default)]
    pub rule_id: Option<serde_json::Value>,
    #[serde(rename = "ruleName", default)]
    pub rule_name: Option<serde_json::Value>,
    #[serde(rename = "typologyId", default)]
    pub typology_id: Option<serde_json::Value>,
    #[serde(rename = "typologyName", default)]
    pub typology_name: Option<serde_json::Value>,
    #[serde(rename = "ruleTriggered", default)]
    pub rule_triggered: Option<serde_json::Value>,
    #[serde(rename = "messageType", default)]
    pub message_type: Option<serde_json::Value>,
    #[serde(rename = "functionValue", default)]
    pub function_value: serde_json::Map<String, serde_json::Value>,
}

/// 一筆輸出列：有序的 (欄名, 值) 組，欄位順序即首次寫入順序。
/// 輸出 CSV 的表頭是整批所有列的欄名聯集。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutputRow {
    cells: Vec<(String, String)>,
}

impl OutputRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, column: &str, value: impl Into<String>) {
        let value = value.into();
        if let Some(cell) = self.cells.iter_mut().find(|(c, _)| c == column) {
            cell.1 = value;
        } else {
            self.cells.push((column.to_string(), value));
        }
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.cells
            .iter()
            .find(|(c, _)| c == column)
            .map(|(_, v)| v.as_str())
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(c, _)| c.as_str())
    }

    pub fn is_error(&self) -> bool {
        self.get("error").is_some()
    }

    /// 失敗交易的合成輸出列：只有 transaction_id 和 error 兩欄
    pub fn error_row(transaction_id: &str, error: &str) -> Self {
        let mut row = OutputRow::new();
        row.set("transaction_id", transaction_id);
        row.set("error", error);
        row
    }
}
