use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    #[serde(default)]
    pub raffle: RaffleConfig,
    pub pix: PixGatewayConfig,
    pub card: CardGatewayConfig,
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
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub access_token_expires_in: i64, // seconds
}

/// Raffle policy knobs. Defaults mirror the production raffle: a fixed pool
/// of 130 numbers, at most 10 held per user, 10-minute interactive
/// reservations and an effectively-infinite hold for manual PIX confirmation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaffleConfig {
    #[serde(default = "default_total_numbers")]
    pub total_numbers: i64,
    #[serde(default = "default_max_per_user")]
    pub max_per_user: i64,
    #[serde(default = "default_reservation_ttl")]
    pub reservation_ttl_minutes: i64,
    #[serde(default = "default_manual_pix_ttl")]
    pub manual_pix_ttl_minutes: i64,
    #[serde(default = "default_checkout_ttl")]
    pub checkout_ttl_minutes: i64,
    #[serde(default = "default_ticket_price")]
    pub ticket_price_cents: i64,
}

fn default_total_numbers() -> i64 {
    130
}
fn default_max_per_user() -> i64 {
    10
}
fn default_reservation_ttl() -> i64 {
    10
}
fn default_manual_pix_ttl() -> i64 {
    999_999
}
fn default_checkout_ttl() -> i64 {
    10
}
fn default_ticket_price() -> i64 {
    1000
}

impl Default for RaffleConfig {
    fn default() -> Self {
        Self {
            total_numbers: default_total_numbers(),
            max_per_user: default_max_per_user(),
            reservation_ttl_minutes: default_reservation_ttl(),
            manual_pix_ttl_minutes: default_manual_pix_ttl(),
            checkout_ttl_minutes: default_checkout_ttl(),
            ticket_price_cents: default_ticket_price(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PixGatewayConfig {
    pub base_url: String,
    pub api_key: String,
    pub webhook_secret: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardGatewayConfig {
    pub base_url: String,
    pub api_key: String,
    pub webhook_secret: String,
}

impl Config {
    pub fn from_toml() -> Result<Self, Box<dyn std::error::Error>> {
        let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
        use std::io::ErrorKind;

        let config_result = std::fs::read_to_string(&config_path);

        let mut config: Config = match config_result {
            Ok(config_str) => {
                toml::from_str(&config_str).map_err(|e| format!("Failed to parse config: {e}"))?
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                // No config file: build from environment variables and defaults.
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
                        port: get_env_parse("SERVER_PORT", 8080u16),
                    },
                    database: DatabaseConfig {
                        url: database_url,
                        max_connections: get_env_parse("DB_MAX_CONNECTIONS", 10u32),
                    },
                    jwt: JwtConfig {
                        secret: get_env("JWT_SECRET")
                            .unwrap_or_else(|| "change-me-in-production".to_string()),
                        access_token_expires_in: get_env_parse("JWT_ACCESS_EXPIRES_IN", 7200i64),
                    },
                    raffle: RaffleConfig {
                        total_numbers: get_env_parse("RAFFLE_TOTAL_NUMBERS", 130i64),
                        max_per_user: get_env_parse("RAFFLE_MAX_PER_USER", 10i64),
                        reservation_ttl_minutes: get_env_parse("RAFFLE_RESERVATION_TTL", 10i64),
                        manual_pix_ttl_minutes: get_env_parse("RAFFLE_MANUAL_PIX_TTL", 999_999i64),
                        checkout_ttl_minutes: get_env_parse("RAFFLE_CHECKOUT_TTL", 10i64),
                        ticket_price_cents: get_env_parse("RAFFLE_TICKET_PRICE_CENTS", 1000i64),
                    },
                    pix: PixGatewayConfig {
                        base_url: get_env("PIX_BASE_URL").unwrap_or_default(),
                        api_key: get_env("PIX_API_KEY").unwrap_or_default(),
                        webhook_secret: get_env("PIX_WEBHOOK_SECRET").unwrap_or_default(),
                    },
                    card: CardGatewayConfig {
                        base_url: get_env("CARD_BASE_URL").unwrap_or_default(),
                        api_key: get_env("CARD_API_KEY").unwrap_or_default(),
                        webhook_secret: get_env("CARD_WEBHOOK_SECRET").unwrap_or_default(),
                    },
                }
            }
            Err(e) => {
                return Err(format!("Failed to read config file {config_path}: {e}").into());
            }
        };

        // Environment variables override file values when both are present.
        if let Ok(v) = env::var("SERVER_HOST") {
            config.server.host = v;
        }
        if let Ok(v) = env::var("SERVER_PORT")
            && let Ok(p) = v.parse()
        {
            config.server.port = p;
        }
        if let Ok(v) = env::var("DATABASE_URL") {
            config.database.url = v;
        }
        if let Ok(v) = env::var("DB_MAX_CONNECTIONS")
            && let Ok(mc) = v.parse()
        {
            config.database.max_connections = mc;
        }
        if let Ok(v) = env::var("JWT_SECRET") {
            config.jwt.secret = v;
        }
        if let Ok(v) = env::var("JWT_ACCESS_EXPIRES_IN")
            && let Ok(n) = v.parse()
        {
            config.jwt.access_token_expires_in = n;
        }
        if let Ok(v) = env::var("PIX_BASE_URL") {
            config.pix.base_url = v;
        }
        if let Ok(v) = env::var("PIX_API_KEY") {
            config.pix.api_key = v;
        }
        if let Ok(v) = env::var("PIX_WEBHOOK_SECRET") {
            config.pix.webhook_secret = v;
        }
        if let Ok(v) = env::var("CARD_BASE_URL") {
            config.card.base_url = v;
        }
        if let Ok(v) = env::var("CARD_API_KEY") {
            config.card.api_key = v;
        }
        if let Ok(v) = env::var("CARD_WEBHOOK_SECRET") {
            config.card.webhook_secret = v;
        }

        Ok(config)
    }
}
