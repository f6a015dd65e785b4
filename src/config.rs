use std::{env, fmt::Display, path::PathBuf, str::FromStr};

use thiserror::Error;
use tracing::{info, warn};

/// Runtime settings, read from `.env` and the process environment.
#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: String,
    pub jwt_secret: String,
    pub upload_dir: PathBuf,
    pub file_size_limit: usize,
    pub admin: SeedAdmin,
}

/// Account created on first start when the admin table is empty.
#[derive(Clone, Debug)]
pub struct SeedAdmin {
    pub email: String,
    pub password: String,
    pub name: String,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("Invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        Ok(Self {
            database_url: try_load("DATABASE_URL", "sqlite://rita-aloe.db?mode=rwc")?,
            bind_addr: try_load("BIND_ADDR", "0.0.0.0:3000")?,
            jwt_secret: required("JWT_SECRET")?,
            upload_dir: try_load::<String>("UPLOAD_DIR", "./uploads")?.into(),
            file_size_limit: try_load("FILE_SIZE_LIMIT", "5242880")?,
            admin: SeedAdmin {
                email: try_load::<String>("ADMIN_EMAIL", "admin@rita-aloe.com")?.to_lowercase(),
                password: required("ADMIN_PASSWORD")?,
                name: try_load("ADMIN_NAME", "Administrateur")?,
            },
        })
    }
}

fn required(key: &'static str) -> Result<String, ConfigError> {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::Missing(key)),
    }
}

fn try_load<T: FromStr>(key: &'static str, default: &str) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    let raw = env::var(key).unwrap_or_else(|_| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });

    raw.parse().map_err(|e: T::Err| {
        warn!("Invalid {key} value: {e}");
        ConfigError::Invalid {
            key,
            reason: e.to_string(),
        }
    })
}
