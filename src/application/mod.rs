pub mod config;
pub mod error;
pub mod metrics;
pub mod pagination;
pub mod retry;
pub mod service;
