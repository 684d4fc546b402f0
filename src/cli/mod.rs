//! CLI command handling

pub mod cache;
pub mod check_config;
pub mod notify;
pub mod output;

pub use cache::*;
pub use check_config::*;
pub use notify::*;
pub use output::*;
