pub mod aircraft;
pub mod cli;
pub mod config;
pub mod dedup;
pub mod enrichment;
pub mod geodesy;
pub mod http;
pub mod ingestor;
pub mod logging;
pub mod notification;
pub mod pipeline;
pub mod receiver;
pub mod thread_manager;
pub mod types;
