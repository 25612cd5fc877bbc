use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub business_rules: BusinessRules,
}

/// Marketplace policy knobs. Amounts are in whole đ.
#[derive(Debug, Deserialize, Clone)]
pub struct BusinessRules {
    pub max_tour_duration_days: u32,
    pub edit_window_hours: i64,
    /// Platform default when a tour request does not propose a rate.
    pub default_commission_bps: i64,
    pub min_withdrawal_vnd: i64,
    pub guide_decision_timeout_hours: i64,
    pub payment_timeout_hours: i64,
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_seconds: u64,
}

fn default_sweep_interval() -> u64 {
    300
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_expiration_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            // Base configuration, always present
            .add_source(config::File::with_name("config/default"))
            // Per-environment overrides, optional
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Local overrides, not checked in
            .add_source(config::File::with_name("config/local").required(false))
            // Environment wins last, e.g. TOURVIA__SERVER__PORT=8080
            .add_source(config::Environment::with_prefix("TOURVIA").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
