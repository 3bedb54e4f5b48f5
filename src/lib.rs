pub mod billing;
pub mod cli;
pub mod config;
pub mod desk;
pub mod error;
pub mod gateway;
pub mod lifecycle;
pub mod log;
pub mod models;
pub mod store;
pub mod transition;

#[cfg(test)]
mod test_helpers;

pub use crate::cli::Args;
pub use crate::config::DeskConfig;
pub use crate::lifecycle::{LifecycleEngine, Notice, NoticeLevel, Outcome};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
