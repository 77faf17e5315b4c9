use crate::domain::model::{Intermediary, NormalizedPayload, RawRecord};
use chrono::NaiveDateTime;

/// 接受的輸入日期格式，依優先序嘗試，第一個解析成功者為準
pub const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.fZ",
    "%Y-%m-%dT%H:%M:%SZ",
    "%Y-%m-%dT%H:%M:%S",
    "%m/%d/%Y %I:%M %p",
    "%Y-%m-%d %H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
];

/// 所有日期欄位統一輸出成這個格式
pub const CANONICAL_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// 送 API 前一律設成 "NA" 的字串欄位（transaction_id 和 hashcode 另有處理）
const STRING_NA_FIELDS: &[&str] = &[
    "source_of_funds",
    "txn_type_code",
    "txn_type",
    "txn_status",
    "sender_currency",
    "sender_country",
    "sender_city",
    "receiver_type",
    "receiver_currency",
    "receiver_country",
    "external_id",
    "external_code",
    "sender_advance_hashcode",
    "receiver_advance_hashcode",
    "sender_first_name",
    "sender_last_name",
    "sender_address",
    "receiver_first_name",
    "receiver_last_name",
    "receiver_address",
    "sending_partner_code",
    "receiving_partner_code",
    "sender_msisdn",
    "receiver_msisdn",
];

/// 正規化政策。近似重複的上游批次之間只差在這幾個開關，
/// 所以做成設定值而不是寫死（見 DESIGN.md）。
#[derive(Debug, Clone)]
pub struct FieldPolicy {
    /// 批次命名空間前綴，改寫 transaction_id 用
    pub batch_prefix: String,
    /// 開啟時 hashcode 也加前綴（prefix + "C" + 原值）
    pub prefix_hashcodes: bool,
    /// 開啟時兩個 incorporation date 一律送 "NA"
    pub clear_incorporation_dates: bool,
    /// 欄值尾端的遮罩標記，送出前剝掉
    pub mask_suffix: String,
}

impl FieldPolicy {
    pub fn new(batch_prefix: &str) -> Self {
        Self {
            batch_prefix: batch_prefix.to_string(),
            prefix_hashcodes: false,
            clear_incorporation_dates: false,
            mask_suffix: "***".to_string(),
        }
    }
}

/// 依優先序的格式清單解析日期字串；全部失敗回 None，不報錯
pub fn parse_datetime_flexible(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if value.is_empty() || value == "NA" {
        return None;
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
}

/// 把一筆原始輸入列轉成 API-ready payload。
///
/// 全函數：任何輸入都不會失敗，缺值或解析不了的欄位一律落到文件化的預設值。
/// 同一筆輸入與同一份政策永遠產生相同輸出。
pub fn normalize(raw: &RawRecord, policy: &FieldPolicy) -> NormalizedPayload {
    let cell = |column: &str| clean_value(raw.get(column), &policy.mask_suffix);

    // transaction_id：有值就加 prefix + "Txn"，缺值落到 "NA"
    let raw_id = cell("transaction_id");
    let transaction_id = if raw_id.is_empty() || raw_id == "NA" {
        "NA".to_string()
    } else {
        format!("{}Txn{}", policy.batch_prefix, raw_id)
    };

    // 交易時間決定 incorporation date 的遞補值（交易時間減 7 天）
    let parsed_txn_time = parse_datetime_flexible(&cell("txn_date_time"));
    let txn_date_time = parsed_txn_time
        .map(|dt| dt.format(CANONICAL_DATE_FORMAT).to_string())
        .unwrap_or_else(|| "NA".to_string());
    let derived_incorporation = parsed_txn_time
        .map(|dt| {
            (dt - chrono::Duration::days(7))
                .format(CANONICAL_DATE_FORMAT)
                .to_string()
        })
        .unwrap_or_else(|| "NA".to_string());

    let incorporation_date = |column: &str| {
        if policy.clear_incorporation_dates {
            return "NA".to_string();
        }
        match parse_datetime_flexible(&cell(column)) {
            Some(dt) => dt.format(CANONICAL_DATE_FORMAT).to_string(),
            None => derived_incorporation.clone(),
        }
    };

    let hashcode = |column: &str| {
        let value = cell(column);
        if value.is_empty() || value == "NA" {
            "NA".to_string()
        } else if policy.prefix_hashcodes {
            format!("{}C{}", policy.batch_prefix, value)
        } else {
            value
        }
    };

    let string_or_na = |column: &str| {
        let value = cell(column);
        if value.is_empty() {
            "NA".to_string()
        } else {
            value
        }
    };

    let amount = |column: &str| cell(column).parse::<f64>().unwrap_or(0.0);

    let intermediary = parse_intermediary(&cell("intermediary"));

    // 不在已知欄位集合裡的輸入欄原樣帶過
    let extra = raw
        .data
        .keys()
        .filter(|column| !is_known_column(column))
        .map(|column| (column.clone(), cell(column)))
        .collect();

    NormalizedPayload {
        transaction_id,
        txn_date_time,
        txn_type: string_or_na("txn_type"),
        txn_type_code: string_or_na("txn_type_code"),
        txn_status: string_or_na("txn_status"),
        source_of_funds: string_or_na("source_of_funds"),
        external_id: string_or_na("external_id"),
        external_code: string_or_na("external_code"),
        sending_partner_code: string_or_na("sending_partner_code"),
        receiving_partner_code: string_or_na("receiving_partner_code"),

        sender_hashcode: hashcode("sender_hashcode"),
        sender_advance_hashcode: string_or_na("sender_advance_hashcode"),
        sender_first_name: string_or_na("sender_first_name"),
        sender_last_name: string_or_na("sender_last_name"),
        sender_address: string_or_na("sender_address"),
        sender_msisdn: string_or_na("sender_msisdn"),
        sender_currency: string_or_na("sender_currency"),
        sender_country: string_or_na("sender_country"),
        sender_city: string_or_na("sender_city"),
        sender_incorporation_date: incorporation_date("sender_incorporation_date"),
        sender_amount: amount("sender_amount"),
        sender_amount_usd: amount("sender_amount_usd"),

        receiver_hashcode: hashcode("receiver_hashcode"),
        receiver_advance_hashcode: string_or_na("receiver_advance_hashcode"),
        receiver_first_name: string_or_na("receiver_first_name"),
        receiver_last_name: string_or_na("receiver_last_name"),
        receiver_address: string_or_na("receiver_address"),
        receiver_msisdn: string_or_na("receiver_msisdn"),
        receiver_currency: string_or_na("receiver_currency"),
        receiver_country: string_or_na("receiver_country"),
        receiver_type: string_or_na("receiver_type"),
        receiver_incorporation_date: incorporation_date("receiver_incorporation_date"),
        receiver_amount: amount("receiver_amount"),

        intermediary,
        extra,
    }
}

/// 去空白、剝掉尾端遮罩標記，並把表格工具殘留的 "nan"/"NaN"/"None" 當成缺值
fn clean_value(value: &str, mask_suffix: &str) -> String {
    let trimmed = value.trim();
    let unmasked = if !mask_suffix.is_empty() {
        trimmed.strip_suffix(mask_suffix).unwrap_or(trimmed).trim()
    } else {
        trimmed
    };
    match unmasked {
        "nan" | "NaN" | "None" => String::new(),
        other => other.to_string(),
    }
}

/// intermediary 欄是文字編碼的結構清單。容忍單引號寫法；
/// 缺值或解析失敗一律落回單元素佔位清單，絕不往外丟錯。
fn parse_intermediary(value: &str) -> Vec<Intermediary> {
    if value.is_empty() || value == "NA" {
        return Intermediary::placeholder();
    }
    if let Ok(list) = serde_json::from_str::<Vec<Intermediary>>(value) {
        return list;
    }
    let relaxed = value.replace('\'', "\"");
    serde_json::from_str::<Vec<Intermediary>>(&relaxed).unwrap_or_else(|_| {
        tracing::debug!("Unparsable intermediary value, using placeholder: {}", value);
        Intermediary::placeholder()
    })
}

fn is_known_column(column: &str) -> bool {
    column == "transaction_id"
        || column == "txn_date_time"
        || column == "sender_hashcode"
        || column == "receiver_hashcode"
        || column == "sender_incorporation_date"
        || column == "receiver_incorporation_date"
        || column == "sender_amount"
        || column == "sender_amount_usd"
        || column == "receiver_amount"
        || column == "intermediary"
        || STRING_NA_FIELDS.contains(&column)
}
