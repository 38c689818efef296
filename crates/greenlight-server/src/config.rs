use crate::error::Result;
pub use clap::Parser;
use greenlight_app::state::{AppConfig, LimiterConfig};
use greenlight_types::config::BackendConfig;

#[derive(Debug, Clone, clap::Parser)]
pub struct ServerConfig {
    #[arg(
        short,
        long,
        default_value_t = 4000,
        env = "GREENLIGHT_LISTEN_PORT",
        help = "Port to listen on"
    )]
    pub port: u16,
    #[arg(
        short,
        long,
        default_value = "127.0.0.1",
        env = "GREENLIGHT_LISTEN_ADDRESS",
        help = "Address to listen on"
    )]
    pub listen_address: String,

    #[arg(
        long = "env",
        default_value = "development",
        env = "GREENLIGHT_ENV",
        help = "Environment name (development, staging, production)"
    )]
    pub environment: String,

    #[command(flatten)]
    pub backend: BackendConfig,

    #[arg(
        long,
        default_value_t = 2.0,
        env = "GREENLIGHT_LIMITER_RPS",
        help = "Rate limiter maximum requests per second"
    )]
    pub limiter_rps: f64,

    #[arg(
        long,
        default_value_t = 4,
        env = "GREENLIGHT_LIMITER_BURST",
        help = "Rate limiter maximum burst"
    )]
    pub limiter_burst: u32,

    #[arg(long, env = "GREENLIGHT_NO_LIMITER", help = "Disable rate limiter")]
    pub no_limiter: bool,

    #[arg(long, env = "GREENLIGHT_NO_CORS", help = "Disable CORS")]
    pub no_cors: bool,
}

impl ServerConfig {
    pub fn load() -> Result<Self> {
        ServerConfig::try_parse().map_err(|e| e.into())
    }
}

impl From<&ServerConfig> for AppConfig {
    fn from(config: &ServerConfig) -> Self {
        let limiter = (!config.no_limiter).then_some(LimiterConfig {
            rps: config.limiter_rps,
            burst: config.limiter_burst,
        });
        AppConfig {
            environment: config.environment.clone(),
            limiter,
        }
    }
}
