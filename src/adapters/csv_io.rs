use crate::domain::model::{OutputRow, RawRecord};
use crate::utils::error::{EtlError, Result};
use std::collections::HashMap;

/// 把輸入 CSV 位元組解析成 RawRecords。
///
/// 欄值去頭尾空白；重複欄名保留最後一個；短列補空字串。
pub fn parse_records(data: &[u8]) -> Result<Vec<RawRecord>> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(data);
    let headers = reader.headers()?.clone();

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        let mut data = HashMap::new();
        for (index, header) in headers.iter().enumerate() {
            let value = row.get(index).unwrap_or("").trim().to_string();
            // HashMap insert：同名欄位自然保留最後出現的值
            data.insert(header.trim().to_string(), value);
        }
        records.push(RawRecord { data });
    }
    Ok(records)
}

/// 把整批輸出列寫成一份 CSV。
///
/// 表頭是所有列的欄名聯集，順序照首次出現；
/// 某列沒有的欄位補空字串。零列就是空輸出。
pub fn write_output_csv(rows: &[OutputRow]) -> Result<Vec<u8>> {
    let mut columns: Vec<String> = Vec::new();
    for row in rows {
        for column in row.columns() {
            if !columns.iter().any(|existing| existing == column) {
                columns.push(column.to_string());
            }
        }
    }

    if columns.is_empty() {
        return Ok(Vec::new());
    }

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(&columns)?;
    for row in rows {
        writer.write_record(columns.iter().map(|column| row.get(column).unwrap_or("")))?;
    }
    writer.flush()?;
    writer
        .into_inner()
        .map_err(|e| EtlError::ProcessingError {
            message: format!("CSV buffer error: {}", e),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_records_trims_and_defaults_missing() {
        let data = b"transaction_id,txn_date_time,sender_amount\n T1 ,7/1/2025 12:10 AM\n";
        let records = parse_records(data).unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get("transaction_id"), "T1");
        // flexible 模式下短列的缺欄是空字串
        assert_eq!(records[0].get("sender_amount"), "");
    }

    #[test]
    fn test_parse_records_duplicate_header_keeps_last() {
        let data = b"transaction_id,receiver_incorporation_date,receiver_incorporation_date\nT1,2020-01-01 00:00:00,2021-01-01 00:00:00\n";
        let records = parse_records(data).unwrap();

        assert_eq!(
            records[0].get("receiver_incorporation_date"),
            "2021-01-01 00:00:00"
        );
    }

    #[test]
    fn test_write_output_csv_union_of_columns() {
        let mut success = OutputRow::new();
        success.set("transaction_id", "T1");
        success.set("ruleId", "R-1");

        let error = OutputRow::error_row("T2", "boom");

        let bytes = write_output_csv(&[success, error]).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "transaction_id,ruleId,error");
        assert_eq!(lines[1], "T1,R-1,");
        assert_eq!(lines[2], "T2,,boom");
    }

    #[test]
    fn test_write_output_csv_empty_batch() {
        let bytes = write_output_csv(&[]).unwrap();
        assert!(bytes.is_empty());
    }
}
