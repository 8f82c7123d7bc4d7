// src/model/mod.rs

pub mod bid;
pub mod creative;
