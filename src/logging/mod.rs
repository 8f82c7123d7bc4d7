// src/logging/mod.rs

pub mod bid_log;
pub mod logger;
pub mod runtime_logger;
