pub mod bridge;
pub mod build_info;
pub mod commands;
pub mod error;
pub mod log;
pub mod migrate;
pub mod model;
pub mod output;
pub mod store;
