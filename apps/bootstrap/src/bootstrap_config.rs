use std::env;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use scholaris_core::{AppError, AppResult};

#[derive(Debug, Clone)]
pub struct BootstrapConfig {
    pub migrate_only: bool,
    pub database_url: String,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
    pub statement_timeout_ms: u64,
    pub seed_timeout: Duration,
}

impl BootstrapConfig {
    pub fn load() -> AppResult<Self> {
        let migrate_only = env::args().nth(1).as_deref() == Some("migrate");
        let database_url = required_env("DATABASE_URL")?;

        let max_connections = parse_env("DATABASE_MAX_CONNECTIONS", 5_u32)?;
        if max_connections == 0 {
            return Err(AppError::Validation(
                "DATABASE_MAX_CONNECTIONS must be at least 1".to_owned(),
            ));
        }

        Ok(Self {
            migrate_only,
            database_url,
            max_connections,
            acquire_timeout: Duration::from_secs(parse_env("DATABASE_ACQUIRE_TIMEOUT_SECS", 10)?),
            statement_timeout_ms: parse_env("DATABASE_STATEMENT_TIMEOUT_MS", 5_000)?,
            seed_timeout: Duration::from_secs(parse_env("SEED_TIMEOUT_SECS", 60)?),
        })
    }
}

fn required_env(name: &str) -> AppResult<String> {
    let value =
        env::var(name).map_err(|_| AppError::Validation(format!("{name} is required")))?;
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{name} must not be empty")));
    }

    Ok(value)
}

fn parse_env<T>(name: &str, default: T) -> AppResult<T>
where
    T: FromStr,
    T::Err: Display,
{
    parse_setting(name, env::var(name).ok(), default)
}

fn parse_setting<T>(name: &str, raw: Option<String>, default: T) -> AppResult<T>
where
    T: FromStr,
    T::Err: Display,
{
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(default),
        Some(value) => value.parse::<T>().map_err(|error| {
            AppError::Validation(format!("invalid {name} value '{value}': {error}"))
        }),
    }
}
