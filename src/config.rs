use std::net::SocketAddr;

use clap::Parser;

use crate::auth::DEFAULT_PASSWORD_COST;

const DEV_JWT_SECRET: &str = "airdnd-dev-secret";

/// Server configuration. Every flag falls back to an environment variable,
/// and a `.env` file is loaded before parsing.
#[derive(Parser, Debug, Clone)]
#[command(name = "airdnd")]
#[command(about = "Vacation-rental REST backend", long_about = None)]
pub struct Config {
    #[arg(long, env = "AIRDND_BIND", default_value = "0.0.0.0:3030")]
    pub bind: SocketAddr,

    #[arg(long, env = "AIRDND_DB_PATH", default_value = "airdnd_data")]
    pub db_path: String,

    #[arg(long, env = "AIRDND_JWT_SECRET")]
    pub jwt_secret: Option<String>,

    #[arg(long, env = "AIRDND_TOKEN_TTL_SECS", default_value_t = 24 * 60 * 60)]
    pub token_ttl_secs: u64,

    #[arg(long, env = "AIRDND_BCRYPT_COST", default_value_t = DEFAULT_PASSWORD_COST)]
    pub bcrypt_cost: u32,

    #[arg(long, env = "AIRDND_LOG_JSON", default_value_t = false)]
    pub log_json: bool,

    #[arg(
        long,
        env = "AIRDND_CORS_ORIGINS",
        value_delimiter = ',',
        default_value = "http://127.0.0.1:8080,http://localhost:3000,http://127.0.0.1:5173,http://localhost:5173"
    )]
    pub cors_origins: Vec<String>,
}

impl Config {
    pub fn load() -> Self {
        let _ = dotenvy::dotenv();
        Config::parse()
    }

    pub fn jwt_secret(&self) -> String {
        match &self.jwt_secret {
            Some(secret) if !secret.is_empty() => secret.clone(),
            _ => {
                tracing::warn!("AIRDND_JWT_SECRET not set; using insecure dev default");
                DEV_JWT_SECRET.to_string()
            }
        }
    }
}
