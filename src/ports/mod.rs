//! Port traits the pipeline depends on; adapters implement them.

pub mod config_port;
pub mod data_port;
pub mod export_port;
