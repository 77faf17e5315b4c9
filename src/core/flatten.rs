use crate::domain::model::{ApiResponse, OutputRow, RuleAlert};

/// 每個 rule match 都要複製的交易層欄位，順序即輸出欄位順序
const TXN_FIELDS: &[&str] = &[
    "transaction_id",
    "txn_date_time",
    "txn_type",
    "sender_hashcode",
    "sender_first_name",
    "sender_last_name",
    "sender_amount",
    "sender_msisdn",
    "sender_incorporation_date",
    "receiver_incorporation_date",
    "receiver_hashcode",
    "receiver_first_name",
    "receiver_last_name",
    "receiver_amount",
    "receiver_msisdn",
];

/// 把一筆 API 回應攤平成零到多筆輸出列。
///
/// Alert 模式：每個 rule match 一列，共用交易欄位複製進每一列；
/// 沒有 rule match 就是零列（刻意的，不是錯誤）。
/// Ack 模式：固定一列，帶 transaction_id 和回應原文。
pub fn flatten(transaction_id: &str, response: &ApiResponse) -> Vec<OutputRow> {
    match response {
        ApiResponse::Ack(text) => {
            let mut row = OutputRow::new();
            row.set("transaction_id", transaction_id);
            row.set("ack_status", text.as_str());
            vec![row]
        }
        ApiResponse::Alert(envelope) => envelope
            .alert
            .rule_alert
            .iter()
            .map(|rule| {
                let mut row = OutputRow::new();
                for field in TXN_FIELDS {
                    row.set(field, scalar(envelope.alert.txn.get(*field)));
                }
                append_rule_fields(&mut row, rule);
                row
            })
            .collect(),
    }
}

fn append_rule_fields(row: &mut OutputRow, rule: &RuleAlert) {
    row.set("ruleId", scalar(rule.rule_id.as_ref()));
    row.set("ruleName", scalar(rule.rule_name.as_ref()));
    row.set("typologyId", scalar(rule.typology_id.as_ref()));
    row.set("typologyName", scalar(rule.typology_name.as_ref()));
    row.set("ruleTriggered", scalar(rule.rule_triggered.as_ref()));
    row.set("messageType", scalar(rule.message_type.as_ref()));

    // functionValue：值是 {type, field} 結構就拆兩欄，否則一欄
    for (key, value) in &rule.function_value {
        if let Some(object) = value.as_object() {
            row.set(&format!("{} (type)", key), scalar(object.get("type")));
            row.set(&format!("{} (value)", key), scalar(object.get("field")));
        } else {
            row.set(&format!("{} (value)", key), scalar(Some(value)));
        }
    }
}

fn scalar(value: Option<&serde_json::Value>) -> String {
    match value {
        None | Some(serde_json::Value::Null) => String::new(),
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
