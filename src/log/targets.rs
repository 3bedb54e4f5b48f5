use crate::config::LogLevel;

// Targets for `target: X` in log macros, each with a matching `x_level` in LogConfig
macro_rules! define_log_targets {
    ($(($const_name:ident, $field_name:ident, $target_str:literal)),* $(,)?) => {
        $(
            pub const $const_name: &str = $target_str;
        )*

        pub fn log_targets() -> Vec<&'static str> {
            vec![
                $(
                    $const_name,
                )*
            ]
        }

        pub fn log_level_for(config: &crate::config::LogConfig, target: &str) -> LogLevel {
            match target {
                $(
                    $const_name => config.$field_name,
                )*
                _ => config.level,
            }
        }

        // LogConfig must name a level for every target
        pub const fn validate_log_config_fields() {
            use crate::config::LogConfig;

            let _config = LogConfig {
                ansi_enabled: true,
                format: crate::config::LogFormat::Pretty,
                output: crate::config::LogOutput::Stderr,
                level: LogLevel::Info,
                $(
                    $field_name: LogLevel::Info,
                )*
            };
        }

        // A new target also needs its level field and a line in LogConfig::with_level
    };
}

define_log_targets!(
    (BILLING, billing_level, "billing"),
    (CONFIG, config_level, "config"),
    (DESK, desk_level, "desk"),
    (LIFECYCLE, lifecycle_level, "lifecycle"),
    (PAYMENT, payment_level, "payment"),
    (STORE, store_level, "store"),
);

const _: () = validate_log_config_fields();
