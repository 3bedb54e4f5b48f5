mod desk;
mod log;

pub use desk::{DeskConfig, LifecycleConfig, PaymentConfig, StoreConfig};
pub use log::{LogConfig, LogFormat, LogLevel, LogOutput};

pub const DESK_PREFIX: &str = "DESK";
pub const DEFAULT_CONFIG_FILE_PATH: &str = "frontdesk.toml";
pub const DEFAULT_STORE_PATH: &str = "frontdesk.json";
