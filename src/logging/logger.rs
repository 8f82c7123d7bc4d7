// src/logging/logger.rs

use std::io::Write;
use std::sync::Arc;
use tokio::sync::mpsc::{self, Receiver, Sender};
use tokio::sync::oneshot;
use tokio::task;
use tokio::time::{self, Duration};
use tracing_appender::rolling;
use tracing_appender::rolling::RollingFileAppender;
use tracing_subscriber::fmt::MakeWriter;

use crate::logging::bid_log::BidLog;

enum LogCommand {
    Line(String),
    Shutdown(oneshot::Sender<()>),
}

/// **请求日志管理器**
///
/// 每个 /bid 请求一行 JSON，写入按小时滚动的 `bid_log.json`，
/// 后台任务按批量/定时刷盘。
pub struct LogManager {
    sender: Sender<LogCommand>,
}

impl LogManager {
    pub fn new(log_dir: &str, buffer_size: usize, batch_size: usize, flush_interval: u64) -> Arc<Self> {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let log_file = Arc::new(rolling::hourly(log_dir, "bid_log.json"));

        tokio::spawn(Self::background_log_writer(log_file, receiver, batch_size, flush_interval));

        Arc::new(Self { sender })
    }

    /// 发送请求日志，通道满时丢弃而不是阻塞请求
    pub fn log(&self, entry: &BidLog) {
        let line = match serde_json::to_string(entry) {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!(error = %e, "failed to serialize bid log");
                return;
            }
        };
        if let Err(e) = self.sender.try_send(LogCommand::Line(line)) {
            tracing::warn!(error = %e, "bid log channel unavailable, dropping entry");
        }
    }

    async fn background_log_writer(
        log_file: Arc<RollingFileAppender>,
        mut receiver: Receiver<LogCommand>,
        batch_size: usize,
        flush_interval: u64,
    ) {
        let mut buffer = Vec::new();
        let mut interval = time::interval(Duration::from_millis(flush_interval));

        loop {
            tokio::select! {
                command = receiver.recv() => match command {
                    Some(LogCommand::Line(line)) => {
                        buffer.push(line);
                        if buffer.len() >= batch_size {
                            Self::write_logs_to_disk(log_file.clone(), &mut buffer).await;
                        }
                    }
                    Some(LogCommand::Shutdown(done)) => {
                        Self::write_logs_to_disk(log_file.clone(), &mut buffer).await;
                        let _ = done.send(());
                        break;
                    }
                    None => {
                        Self::write_logs_to_disk(log_file.clone(), &mut buffer).await;
                        break;
                    }
                },
                _ = interval.tick() => {
                    Self::write_logs_to_disk(log_file.clone(), &mut buffer).await;
                }
            }
        }
    }

    async fn write_logs_to_disk(file: Arc<RollingFileAppender>, buffer: &mut Vec<String>) {
        if buffer.is_empty() {
            return;
        }
        let content = buffer.join("\n") + "\n";
        buffer.clear();

        let result = task::spawn_blocking(move || {
            let mut writer = file.make_writer();
            writer.write_all(content.as_bytes())
        })
        .await;
        match result {
            Ok(Err(e)) => eprintln!("Failed to write bid logs to file: {}", e),
            Err(e) => eprintln!("Bid log writer task failed: {}", e),
            Ok(Ok(())) => {}
        }
    }

    /// 刷盘并停止后台任务
    pub async fn shutdown(&self) {
        let (done, wait) = oneshot::channel();
        if self.sender.send(LogCommand::Shutdown(done)).await.is_ok() {
            let _ = wait.await;
        }
    }
}
