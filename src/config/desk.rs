use super::{LogConfig, DEFAULT_CONFIG_FILE_PATH, DEFAULT_STORE_PATH, DESK_PREFIX};
use crate::error::{ConfigError, Error};
use crate::log::CONFIG;
use crate::Args;
use config::{Config, Environment};
use serde::Deserialize;
use std::path::PathBuf;
use tracing::debug;

pub const APPOINTMENT_ID_PLACEHOLDER: &str = "{appointment_id}";

#[derive(Clone, Debug, Default, Deserialize)]
pub struct DeskConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub payment: PaymentConfig,
    #[serde(default)]
    pub lifecycle: LifecycleConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Clone, Debug, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "StoreConfig::default_path")]
    pub path: PathBuf,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct PaymentConfig {
    #[serde(default = "PaymentConfig::default_currency")]
    pub currency: String,

    #[serde(default = "PaymentConfig::default_checkout_base_url")]
    pub checkout_base_url: String,

    /// Where the gateway sends the patient after a successful checkout.
    /// Must contain `{appointment_id}`.
    #[serde(default = "PaymentConfig::default_success_url")]
    pub success_url: String,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct LifecycleConfig {
    /// How many times a transition is re-read and re-guarded after losing a
    /// compare-and-set race.
    #[serde(default = "LifecycleConfig::default_conflict_retries")]
    pub conflict_retries: u32,
}

/// Desk settings, read from `frontdesk.toml` (or JSON) in the working directory
/// and then from `DESK_` variables, where `__` separates the section from the
/// key: `DESK_PAYMENT__CURRENCY=usd`.
impl DeskConfig {
    pub fn default_path() -> String {
        DEFAULT_CONFIG_FILE_PATH.to_string()
    }

    pub fn load(args: &Args) -> Result<DeskConfig, Error> {
        if !PathBuf::from(&args.config_file_path).exists() {
            println!(
                "Configuration file was not found: {}",
                args.config_file_path
            );
            println!("Loading config values from environment variables.");
        }
        let mut config = DeskConfig::build(&args.config_file_path)?;

        // Command-line flags only fill in what the file and environment left at the default
        if config.log.level == LogConfig::default_log_level() {
            config.log.level = args.log_level;
        }

        if config.log.format == LogConfig::default_log_format() {
            config.log.format = args.log_format;
        }

        Ok(config)
    }

    pub fn build(path: &str) -> Result<Self, Error> {
        let env_source = Environment::with_prefix(DESK_PREFIX)
            .try_parsing(true)
            .separator("__")
            .prefix_separator("_");

        let config: Self = Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(env_source)
            .build()
            .map_err(ConfigError::from)?
            .try_deserialize()
            .map_err(|err| match err {
                config::ConfigError::Message(ref s) => match s {
                    s if s.contains("missing field") => ConfigError::MissingParameter {
                        name: extract_field_name(s).unwrap_or_else(|| "unknown".to_string()),
                    },
                    s if s.contains("does not have variant constructor") => {
                        let (name, value) = extract_invalid_field(s);
                        ConfigError::InvalidParameter { name, value }
                    }
                    _ => err.into(),
                },
                _ => err.into(),
            })?;

        config.validate()?;
        debug!(target: CONFIG, ?config);

        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let currency = &self.payment.currency;
        if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ConfigError::InvalidParameter {
                name: "payment.currency".to_string(),
                value: currency.to_owned(),
            });
        }

        if !self.payment.success_url.contains(APPOINTMENT_ID_PLACEHOLDER) {
            return Err(ConfigError::InvalidSuccessUrl {
                url: self.payment.success_url.to_owned(),
            });
        }

        Ok(())
    }
}

impl StoreConfig {
    pub fn default_path() -> PathBuf {
        PathBuf::from(DEFAULT_STORE_PATH)
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            path: StoreConfig::default_path(),
        }
    }
}

impl PaymentConfig {
    pub fn default_currency() -> String {
        "inr".to_string()
    }

    pub fn default_checkout_base_url() -> String {
        "https://checkout.sandbox.local/pay".to_string()
    }

    pub fn default_success_url() -> String {
        "http://localhost:8000/patient/paymentsuccess/{appointment_id}/".to_string()
    }

    /// The success URL for a specific appointment.
    pub fn success_url_for(&self, appointment_id: &uuid::Uuid) -> String {
        self.success_url
            .replace(APPOINTMENT_ID_PLACEHOLDER, &appointment_id.to_string())
    }
}

impl Default for PaymentConfig {
    fn default() -> Self {
        PaymentConfig {
            currency: PaymentConfig::default_currency(),
            checkout_base_url: PaymentConfig::default_checkout_base_url(),
            success_url: PaymentConfig::default_success_url(),
        }
    }
}

impl LifecycleConfig {
    pub const fn default_conflict_retries() -> u32 {
        2
    }
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        LifecycleConfig {
            conflict_retries: LifecycleConfig::default_conflict_retries(),
        }
    }
}

/// The backticked name in a message such as "missing field `currency`".
fn extract_field_name(input: &str) -> Option<String> {
    input
        .split('`')
        .nth(1)
        .filter(|name| !name.is_empty())
        .map(|name| name.to_string())
}

/// Splits "enum {name} does not have variant constructor {value}" into name and value.
fn extract_invalid_field(input: &str) -> (String, String) {
    let words = input.split(' ').collect::<Vec<_>>();

    if !input.starts_with("enum") {
        return ("unknown".to_string(), "".to_string());
    }

    let name = words.get(1).map_or("unknown".to_string(), |w| w.to_string());
    let value = words.last().map_or("".to_string(), |w| w.to_string());

    (name, value)
}
