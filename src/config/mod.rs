use std::env;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use sqlx::PgPool;

use crate::services::netsuite::NetSuiteConfig;
use crate::services::response_cache::ResponseCache;

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub database: String,
    pub ssl_mode: String,
}

impl DatabaseConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            host: env::var("DATABASE_HOST").unwrap_or_else(|_| "localhost".to_string()),
            port: env::var("DATABASE_PORT")
                .unwrap_or_else(|_| "5432".to_string())
                .parse()?,
            username: env::var("DATABASE_USER").unwrap_or_else(|_| "postgres".to_string()),
            password: env::var("DATABASE_PASSWORD")?,
            database: env::var("DATABASE_NAME").unwrap_or_else(|_| "millwright".to_string()),
            ssl_mode: env::var("DATABASE_SSL_MODE").unwrap_or_else(|_| "prefer".to_string()),
        })
    }

    pub fn connection_string(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}?sslmode={}",
            self.username, self.password, self.host, self.port, self.database, self.ssl_mode
        )
    }
}

pub fn netsuite_config_from_env() -> Result<NetSuiteConfig> {
    let config = NetSuiteConfig {
        account_id: env::var("NETSUITE_ACCOUNT_ID").unwrap_or_default(),
        consumer_key: env::var("NETSUITE_CONSUMER_KEY").unwrap_or_default(),
        consumer_secret: env::var("NETSUITE_CONSUMER_SECRET").unwrap_or_default(),
        token_id: env::var("NETSUITE_TOKEN_ID").unwrap_or_default(),
        token_secret: env::var("NETSUITE_TOKEN_SECRET").unwrap_or_default(),
        realm: env::var("NETSUITE_REALM").ok(),
    };
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("NetSuite configuration invalid: {}", e))?;
    Ok(config)
}

pub fn server_address_from_env() -> String {
    let host = env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port = env::var("SERVER_PORT").unwrap_or_else(|_| "8080".to_string());
    format!("{}:{}", host, port)
}

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub netsuite: NetSuiteConfig,
    pub report_cache: Arc<ResponseCache>,
}

impl AppState {
    pub async fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let database = DatabaseConfig::from_env()?;
        let db_pool = PgPool::connect(&database.connection_string()).await?;
        let netsuite = netsuite_config_from_env()?;

        let cache_ttl_secs = env::var("REPORT_CACHE_TTL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(300);

        Ok(Self {
            db_pool,
            netsuite,
            report_cache: Arc::new(ResponseCache::new(Duration::from_secs(cache_ttl_secs))),
        })
    }
}
