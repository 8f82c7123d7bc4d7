// src/logging/runtime_logger.rs

use chrono::Utc;
use serde_json::json;
use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;
use std::time::SystemTime;
use tokio::sync::mpsc::{self, Receiver, Sender};
use tokio::sync::oneshot;
use tokio::task;
use tokio::time::{self, Duration};
use tracing_appender::rolling;
use tracing_appender::rolling::RollingFileAppender;
use tracing_subscriber::fmt::MakeWriter;

const LEVELS: [&str; 5] = ["TRACE", "DEBUG", "INFO", "WARN", "ERROR"];

/// 单条日志消息
struct LogEntry {
    level: String,
    content: String,
}

enum RuntimeCommand {
    Entry(LogEntry),
    Shutdown(oneshot::Sender<()>),
}

/// 运行日志管理器（RuntimeLogger）
/// 将服务运行状态日志按级别分流到不同的日志文件中（`<prefix>_<level>.json`），
/// 并定期清理超过保留时间的日志文件。
pub struct RuntimeLogger {
    sender: Sender<RuntimeCommand>,
}

impl RuntimeLogger {
    /// - `log_dir`: 日志文件存放目录
    /// - `file_prefix`: 文件前缀，例如 "runtime"
    /// - `buffer_size`: mpsc 通道缓冲区大小
    /// - `batch_size`: 每个日志级别批量写入的日志条数
    /// - `flush_interval`: 定时刷新日志的时间间隔（毫秒）
    /// - `retention_hours`: 日志文件保留时长
    pub fn new(
        log_dir: &str,
        file_prefix: &str,
        buffer_size: usize,
        batch_size: usize,
        flush_interval: u64,
        retention_hours: u64,
    ) -> Arc<Self> {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let mut log_files = HashMap::new();
        for level in LEVELS {
            let file_name = format!("{}_{}.json", file_prefix, level.to_lowercase());
            log_files.insert(level.to_string(), Arc::new(rolling::hourly(log_dir, &file_name)));
        }
        tokio::spawn(Self::background_log_writer(log_files, receiver, batch_size, flush_interval));

        // 每小时扫描一次，删除过期日志
        let log_dir = log_dir.to_string();
        tokio::spawn(async move {
            let mut interval = time::interval(Duration::from_secs(3600));
            loop {
                interval.tick().await;
                Self::cleanup_old_logs(&log_dir, retention_hours).await;
            }
        });

        Arc::new(Self { sender })
    }

    /// 记录运行日志
    pub async fn log(&self, level: &str, message: &str) {
        let content = json!({
            "timestamp": Utc::now().to_rfc3339(),
            "level": level,
            "message": message,
        })
        .to_string();

        let entry = LogEntry {
            level: level.to_uppercase(),
            content,
        };
        if let Err(e) = self.sender.send(RuntimeCommand::Entry(entry)).await {
            eprintln!("Failed to send runtime log message: {}", e);
        }
    }

    async fn background_log_writer(
        log_files: HashMap<String, Arc<RollingFileAppender>>,
        mut receiver: Receiver<RuntimeCommand>,
        batch_size: usize,
        flush_interval: u64,
    ) {
        let mut buffers: HashMap<String, Vec<String>> = HashMap::new();
        let mut interval = time::interval(Duration::from_millis(flush_interval));
        loop {
            tokio::select! {
                command = receiver.recv() => match command {
                    Some(RuntimeCommand::Entry(entry)) => {
                        let buffer = buffers.entry(entry.level.clone()).or_default();
                        buffer.push(entry.content);
                        if buffer.len() >= batch_size {
                            Self::flush_level(&log_files, &entry.level, buffer).await;
                        }
                    }
                    Some(RuntimeCommand::Shutdown(done)) => {
                        Self::flush_all(&log_files, &mut buffers).await;
                        let _ = done.send(());
                        break;
                    }
                    None => {
                        Self::flush_all(&log_files, &mut buffers).await;
                        break;
                    }
                },
                _ = interval.tick() => {
                    Self::flush_all(&log_files, &mut buffers).await;
                }
            }
        }
    }

    async fn flush_all(log_files: &HashMap<String, Arc<RollingFileAppender>>, buffers: &mut HashMap<String, Vec<String>>) {
        for (level, buffer) in buffers.iter_mut() {
            Self::flush_level(log_files, level, buffer).await;
        }
    }

    /// 未知级别写入 INFO 文件
    async fn flush_level(log_files: &HashMap<String, Arc<RollingFileAppender>>, level: &str, buffer: &mut Vec<String>) {
        if buffer.is_empty() {
            return;
        }
        let appender = match log_files.get(level).or_else(|| log_files.get("INFO")) {
            Some(appender) => appender.clone(),
            None => return,
        };
        let content = buffer.join("\n") + "\n";
        buffer.clear();

        let result = task::spawn_blocking(move || {
            let mut writer = appender.make_writer();
            writer.write_all(content.as_bytes())
        })
        .await;
        match result {
            Ok(Err(e)) => eprintln!("Failed to write runtime logs: {}", e),
            Err(e) => eprintln!("Runtime log writer task failed: {}", e),
            Ok(Ok(())) => {}
        }
    }

    async fn cleanup_old_logs(log_dir: &str, retention_hours: u64) {
        let retention = Duration::from_secs(retention_hours * 3600);
        let now = SystemTime::now();
        let mut dir = match tokio::fs::read_dir(log_dir).await {
            Ok(dir) => dir,
            Err(e) => {
                eprintln!("Failed to read log directory {}: {}", log_dir, e);
                return;
            }
        };
        while let Ok(Some(entry)) = dir.next_entry().await {
            let path = entry.path();
            let modified = match entry.metadata().await.and_then(|m| m.modified()) {
                Ok(modified) => modified,
                Err(_) => continue,
            };
            if now.duration_since(modified).unwrap_or_default() > retention {
                if let Err(e) = tokio::fs::remove_file(&path).await {
                    eprintln!("Failed to delete old log file {:?}: {}", path, e);
                }
            }
        }
    }

    /// 刷盘并停止后台写入任务
    pub async fn shutdown(&self) {
        let (done, wait) = oneshot::channel();
        if self.sender.send(RuntimeCommand::Shutdown(done)).await.is_ok() {
            let _ = wait.await;
        }
    }
}
