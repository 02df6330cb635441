use clap::Parser;

use sekretar_models::errors::SendableError;

#[derive(Parser, Debug, Clone)]
pub struct Config {
    /// "sqlite" or "postgres"
    #[arg(long, default_value = "sqlite")]
    pub store_backend: String,

    #[arg(long, default_value = "actions.db")]
    pub sqlite_path: String,

    #[arg(long, default_value = "")]
    pub postgres_url: String,

    #[arg(long, default_value = "http://127.0.0.1:8080/")]
    pub backend_api_url: String,

    #[arg(long, default_value = "")]
    pub backend_api_token: String,

    #[arg(long, default_value = "https://api.cloudpayments.ru/")]
    pub gateway_url: String,

    #[arg(long, default_value = "")]
    pub gateway_public_id: String,

    #[arg(long, default_value = "")]
    pub gateway_api_secret: String,

    #[arg(long, default_value_t = 30)]
    pub api_timeout_seconds: u64,

    #[arg(long, default_value_t = 5)]
    pub max_crash_attempts: i64,

    /// Debug-level logging (includes sqlx statement logs)
    #[arg(long)]
    pub verbose: bool,
}

impl Config {
    pub fn log_level(&self) -> log::LevelFilter {
        if self.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        }
    }
}

pub fn parse_config() -> Result<Config, SendableError> {
    Ok(Config::try_parse()?)
}
