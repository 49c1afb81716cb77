use serde::{Deserialize, Serialize};
use std::env;

use crate::entities::OrderStatus;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    #[serde(default)]
    pub orders: OrdersConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    /// Apply pending migrations on boot. Off by default: schema changes are
    /// a deployment step (`cargo run -p migration`), not a server side effect.
    #[serde(default)]
    pub run_migrations: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub access_token_expires_in: i64,  // seconds
    pub refresh_token_expires_in: i64, // seconds
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OrdersConfig {
    #[serde(default)]
    pub cancellation_policy: CancellationPolicy,
}

/// Which order statuses a buyer (or admin) may cancel from. Two policies
/// exist in the product's history; the marketplace default is the stricter
/// one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CancellationPolicy {
    /// Only `pending` and `processing` orders are cancellable.
    #[default]
    PendingProcessing,
    /// Anything not yet delivered or cancelled is cancellable.
    AnyActive,
}

impl CancellationPolicy {
    /// The statuses an order may be cancelled from under this policy.
    pub fn cancellable_statuses(&self) -> &'static [OrderStatus] {
        match self {
            CancellationPolicy::PendingProcessing => {
                &[OrderStatus::Pending, OrderStatus::Processing]
            }
            CancellationPolicy::AnyActive => &[
                OrderStatus::Pending,
                OrderStatus::Processing,
                OrderStatus::Shipped,
            ],
        }
    }

    pub fn allows(&self, status: OrderStatus) -> bool {
        self.cancellable_statuses().contains(&status)
    }
}

impl Config {
    pub fn from_toml() -> Result<Self, Box<dyn std::error::Error>> {
        let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
        use std::io::ErrorKind;

        // Read the config file if present, otherwise build entirely from
        // environment variables.
        let config_result = std::fs::read_to_string(&config_path);

        let mut config: Config = match config_result {
            Ok(config_str) => {
                toml::from_str(&config_str).map_err(|e| format!("Failed to parse config: {e}"))?
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                fn get_env(name: &str) -> Option<String> {
                    env::var(name).ok()
                }
                fn get_env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
                    env::var(name)
                        .ok()
                        .and_then(|v| v.parse::<T>().ok())
                        .unwrap_or(default)
                }

                let database_url = get_env("DATABASE_URL")
                    .ok_or("DATABASE_URL is required when no config.toml is present")?;

                Config {
                    server: ServerConfig {
                        host: get_env("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                        port: get_env_parse("SERVER_PORT", 3000u16),
                    },
                    database: DatabaseConfig {
                        url: database_url,
                        max_connections: get_env_parse("DB_MAX_CONNECTIONS", 10u32),
                        run_migrations: get_env_parse("DB_RUN_MIGRATIONS", false),
                    },
                    jwt: JwtConfig {
                        secret: get_env("JWT_SECRET")
                            .unwrap_or_else(|| "change-me-in-production".to_string()),
                        access_token_expires_in: get_env_parse("JWT_ACCESS_EXPIRES_IN", 7200i64),
                        refresh_token_expires_in: get_env_parse(
                            "JWT_REFRESH_EXPIRES_IN",
                            2_592_000i64,
                        ),
                    },
                    orders: OrdersConfig::default(),
                }
            }
            Err(e) => {
                return Err(format!("Failed to read config file {config_path}: {e}").into());
            }
        };

        // Environment overrides apply even when the file exists.
        if let Ok(v) = env::var("SERVER_HOST") {
            config.server.host = v;
        }
        if let Ok(v) = env::var("SERVER_PORT") {
            if let Ok(p) = v.parse() {
                config.server.port = p;
            }
        }
        if let Ok(v) = env::var("DATABASE_URL") {
            config.database.url = v;
        }
        if let Ok(v) = env::var("DB_MAX_CONNECTIONS") {
            if let Ok(mc) = v.parse() {
                config.database.max_connections = mc;
            }
        }
        if let Ok(v) = env::var("DB_RUN_MIGRATIONS") {
            if let Ok(b) = v.parse() {
                config.database.run_migrations = b;
            }
        }
        if let Ok(v) = env::var("JWT_SECRET") {
            config.jwt.secret = v;
        }
        if let Ok(v) = env::var("JWT_ACCESS_EXPIRES_IN") {
            if let Ok(n) = v.parse() {
                config.jwt.access_token_expires_in = n;
            }
        }
        if let Ok(v) = env::var("JWT_REFRESH_EXPIRES_IN") {
            if let Ok(n) = v.parse() {
                config.jwt.refresh_token_expires_in = n;
            }
        }
        if let Ok(v) = env::var("ORDERS_CANCELLATION_POLICY") {
            config.orders.cancellation_policy = match v.as_str() {
                "pending_processing" => CancellationPolicy::PendingProcessing,
                "any_active" => CancellationPolicy::AnyActive,
                other => {
                    return Err(format!("Unknown cancellation policy: {other}").into());
                }
            };
        }

        Ok(config)
    }
}
