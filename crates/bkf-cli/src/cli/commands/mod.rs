//! CLI command handlers.

mod backup;
mod show_config;

pub use backup::run_backup;
pub use show_config::run_show_config;
