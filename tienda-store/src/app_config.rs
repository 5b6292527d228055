use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub api: ApiConfig,
    #[serde(default)]
    pub payment: PaymentConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PaymentConfig {
    /// Poll cadence for asynchronous payment outcomes.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Processor public key, when the hosted checkout needs it.
    pub public_key: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SessionConfig {
    #[serde(default = "default_refresh_check_seconds")]
    pub refresh_check_seconds: u64,
    /// Refresh the token once less than this much lifetime remains.
    #[serde(default = "default_refresh_threshold_seconds")]
    pub refresh_threshold_seconds: u64,
    /// Routes a signed-out visitor may stay on; everything else redirects
    /// to the login entry point on session expiry.
    #[serde(default = "default_public_routes")]
    pub public_routes: Vec<String>,
}

fn default_timeout_seconds() -> u64 {
    900
}

fn default_poll_interval_ms() -> u64 {
    10_000
}

fn default_refresh_check_seconds() -> u64 {
    60
}

fn default_refresh_threshold_seconds() -> u64 {
    90
}

fn default_public_routes() -> Vec<String> {
    vec!["/".into(), "/auth/login".into(), "/auth/register".into()]
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            public_key: None,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            refresh_check_seconds: default_refresh_check_seconds(),
            refresh_threshold_seconds: default_refresh_threshold_seconds(),
            public_routes: default_public_routes(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig {
                base_url: "http://localhost:3000/api".into(),
                timeout_seconds: default_timeout_seconds(),
            },
            payment: PaymentConfig::default(),
            session: SessionConfig::default(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            .add_source(config::File::with_name("config/local").required(false))
            // Environment overrides, e.g. `TIENDA_API__BASE_URL`
            .add_source(config::Environment::with_prefix("TIENDA").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
