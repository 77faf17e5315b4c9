use std::collections::VecDeque;
use std::io::Write;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tokio::sync::watch;

/// 成功送審的時間戳滑動視窗，尾端一秒內的筆數就是即時 TPS。
///
/// worker task（寫入端）與 observer loop（淘汰/讀取端）
/// 共用同一把鎖序列化存取。
#[derive(Debug)]
pub struct TpsWindow {
    inner: Mutex<VecDeque<Instant>>,
    window: Duration,
}

impl TpsWindow {
    pub fn new() -> Self {
        Self::with_window(Duration::from_secs(1))
    }

    pub fn with_window(window: Duration) -> Self {
        Self {
            inner: Mutex::new(VecDeque::new()),
            window,
        }
    }

    /// 每次成功的 API 呼叫記一筆
    pub fn record(&self) {
        self.record_at(Instant::now());
    }

    pub fn record_at(&self, at: Instant) {
        let mut buf = self.inner.lock().expect("tps window mutex poisoned");
        buf.push_back(at);
    }

    /// 淘汰視窗外的時間戳並回傳剩餘筆數
    pub fn current(&self) -> usize {
        self.current_at(Instant::now())
    }

    pub fn current_at(&self, now: Instant) -> usize {
        let mut buf = self.inner.lock().expect("tps window mutex poisoned");
        if let Some(cutoff) = now.checked_sub(self.window) {
            while let Some(front) = buf.front() {
                if *front < cutoff {
                    buf.pop_front();
                } else {
                    break;
                }
            }
        }
        buf.len()
    }
}

impl Default for TpsWindow {
    fn default() -> Self {
        Self::new()
    }
}

/// 背景 TPS 觀測迴圈：每秒淘汰過期時間戳、回報目前吞吐量，
/// 並在側邊 log 檔追加一行。取消訊號設起後跑完當輪就退出。
pub async fn run_observer(
    window: std::sync::Arc<TpsWindow>,
    log_path: String,
    mut cancel: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            // 同時就緒時先完成當輪回報再處理取消
            biased;
            _ = ticker.tick() => {
                let tps = window.current();
                tracing::info!("📈 Real-time TPS: {}", tps);
                if let Err(e) = append_log_line(&log_path, tps) {
                    tracing::warn!("⚠️ TPS log write failed: {}", e);
                }
            }
            changed = cancel.changed() => {
                if changed.is_err() || *cancel.borrow() {
                    break;
                }
            }
        }
    }
}

fn append_log_line(path: &str, tps: usize) -> std::io::Result<()> {
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    writeln!(
        file,
        "{} - TPS: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.6f"),
        tps
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_burst_then_decay() {
        let window = TpsWindow::new();
        let t0 = Instant::now() + Duration::from_secs(10);

        for _ in 0..10 {
            window.record_at(t0);
        }

        assert_eq!(window.current_at(t0), 10);
        assert_eq!(window.current_at(t0 + Duration::from_millis(500)), 10);
        // 視窗過了就歸零
        assert_eq!(window.current_at(t0 + Duration::from_secs(2)), 0);
    }

    #[test]
    fn test_eviction_is_permanent() {
        let window = TpsWindow::new();
        let t0 = Instant::now() + Duration::from_secs(10);

        window.record_at(t0);
        assert_eq!(window.current_at(t0 + Duration::from_secs(5)), 0);
        assert_eq!(window.current_at(t0), 0);
    }

    #[test]
    fn test_partial_window_eviction() {
        let window = TpsWindow::new();
        let t0 = Instant::now() + Duration::from_secs(10);

        window.record_at(t0);
        window.record_at(t0 + Duration::from_millis(800));
        assert_eq!(window.current_at(t0 + Duration::from_millis(1500)), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_observer_exits_on_cancel_and_writes_log() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("tps_log.txt");
        let window = Arc::new(TpsWindow::new());
        let (tx, rx) = watch::channel(false);

        let handle = tokio::spawn(run_observer(
            Arc::clone(&window),
            log_path.to_str().unwrap().to_string(),
            rx,
        ));

        tokio::time::sleep(Duration::from_secs(3)).await;
        tx.send(true).unwrap();

        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("observer did not exit within bounded wait")
            .unwrap();

        let contents = std::fs::read_to_string(&log_path).unwrap();
        assert!(contents.lines().any(|line| line.contains("TPS: 0")));
    }
}
