// src/bidding/mod.rs

pub mod engine;
pub mod template;
