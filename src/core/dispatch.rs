use crate::core::flatten::flatten;
use crate::core::normalize::{normalize, parse_datetime_flexible, FieldPolicy};
use crate::core::tps::TpsWindow;
use crate::domain::model::{OutputRow, RawRecord, RunMode, Token};
use crate::domain::ports::FraudApi;
use futures::stream::{FuturesUnordered, StreamExt};
use std::time::Instant;
use tokio::sync::watch;

/// 把整批記錄以固定上限的並發量送進 API，完成順序回收結果。
///
/// 單筆失敗在 task 邊界就地轉成 error row，不會中斷整批。
/// 取消訊號設起後：不再補進新 task、尚未開跑的 task 直接回空、
/// 已在途的 task 跑完照常回報，回收迴圈把在途的收完就返回。
pub struct Dispatcher<'a, A: FraudApi> {
    api: &'a A,
    policy: FieldPolicy,
    mode: RunMode,
    workers: usize,
    progress_every: usize,
}

impl<'a, A: FraudApi> Dispatcher<'a, A> {
    pub fn new(
        api: &'a A,
        policy: FieldPolicy,
        mode: RunMode,
        workers: usize,
        progress_every: usize,
    ) -> Self {
        Self {
            api,
            policy,
            mode,
            workers: workers.max(1),
            progress_every: progress_every.max(1),
        }
    }

    pub async fn run(
        &self,
        records: Vec<RawRecord>,
        token: &Token,
        tps: &TpsWindow,
        cancel: watch::Receiver<bool>,
    ) -> Vec<OutputRow> {
        let total = records.len();
        let mut results: Vec<OutputRow> = Vec::new();

        let mut pending = records.into_iter();
        let mut in_flight = FuturesUnordered::new();

        // 先填滿 worker 上限
        for _ in 0..self.workers {
            if let Some(record) = pending.next() {
                in_flight.push(self.process_record(record, token, tps, cancel.clone()));
            }
        }

        let mut done = 0usize;
        let mut report_clock = Instant::now();

        // 完成一筆收一筆（完成順序，不是送出順序），收完就補下一筆
        while let Some(rows) = in_flight.next().await {
            results.extend(rows);
            done += 1;

            if done % self.progress_every == 0 || done == total {
                tracing::info!(
                    "🕒 API calls done: {} | Remaining: {} | Time elapsed: {:.2} sec",
                    done,
                    total - done,
                    report_clock.elapsed().as_secs_f64()
                );
                report_clock = Instant::now();
            }

            if !*cancel.borrow() {
                if let Some(record) = pending.next() {
                    in_flight.push(self.process_record(record, token, tps, cancel.clone()));
                }
            }
        }

        if *cancel.borrow() && done < total {
            tracing::info!(
                "⛔ Cancelled after {} of {} records; keeping collected results",
                done,
                total
            );
        }

        results
    }

    async fn process_record(
        &self,
        record: RawRecord,
        token: &Token,
        tps: &TpsWindow,
        cancel: watch::Receiver<bool>,
    ) -> Vec<OutputRow> {
        if *cancel.borrow() {
            return Vec::new();
        }

        let payload = normalize(&record, &self.policy);
        match self.api.submit(&payload, token, self.mode).await {
            Ok(response) => {
                tps.record();
                flatten(&payload.transaction_id, &response)
            }
            Err(e) => {
                let transaction_id = record.transaction_id_or_unknown();
                tracing::warn!("⚠️ Submission failed for {}: {}", transaction_id, e);
                vec![OutputRow::error_row(&transaction_id, &e.to_string())]
            }
        }
    }
}

/// 依交易時間排序（彈性解析，解析不了的排最後，其餘維持原順序）
pub fn sort_by_txn_time(records: &mut [RawRecord]) {
    records.sort_by_key(|record| {
        let parsed = parse_datetime_flexible(record.get("txn_date_time"));
        (parsed.is_none(), parsed)
    });
}
