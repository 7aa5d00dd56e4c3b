use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

/// Session secrets shipped in sample `.env` files. Refused at start-up.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
    "changeme",
];

const MIN_SECRET_LEN: usize = 32;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),

    #[error("invalid {name}: {reason}")]
    Invalid { name: &'static str, reason: String },

    #[error("QUILL_SESSION_SECRET is a placeholder or shorter than {MIN_SECRET_LEN} bytes")]
    WeakSecret,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_path: PathBuf,
    pub session_secret: String,
    pub host: String,
    pub port: u16,
    pub session_ttl_hours: i64,
    pub max_messages_per_day: u32,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| lookup(name).ok_or(ConfigError::Missing(name));

        let session_secret = required("QUILL_SESSION_SECRET")?;
        if session_secret.len() < MIN_SECRET_LEN
            || PLACEHOLDER_SECRETS.contains(&session_secret.as_str())
        {
            return Err(ConfigError::WeakSecret);
        }

        Ok(Config {
            database_path: required("QUILL_DATABASE_PATH")?.into(),
            session_secret,
            host: lookup("QUILL_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parsed(&lookup, "QUILL_PORT", 3000)?,
            session_ttl_hours: parsed(&lookup, "QUILL_SESSION_TTL_HOURS", 720)?,
            max_messages_per_day: parsed(&lookup, "QUILL_MAX_MESSAGES_PER_DAY", 100)?,
        })
    }

    pub fn server_address(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
                name: "QUILL_HOST",
                reason: e.to_string(),
            })
    }
}

fn parsed<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn config(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_fill_optional_values() {
        let cfg = config(&[
            ("QUILL_DATABASE_PATH", "quill.db"),
            ("QUILL_SESSION_SECRET", SECRET),
        ])
        .unwrap();

        assert_eq!(cfg.database_path, PathBuf::from("quill.db"));
        assert_eq!(cfg.port, 3000);
        assert_eq!(cfg.session_ttl_hours, 720);
        assert_eq!(cfg.max_messages_per_day, 100);
        assert_eq!(cfg.server_address().unwrap().to_string(), "0.0.0.0:3000");
    }

    #[test]
    fn missing_required_values() {
        assert_eq!(
            config(&[("QUILL_SESSION_SECRET", SECRET)]).unwrap_err(),
            ConfigError::Missing("QUILL_DATABASE_PATH")
        );
        assert_eq!(
            config(&[("QUILL_DATABASE_PATH", "quill.db")]).unwrap_err(),
            ConfigError::Missing("QUILL_SESSION_SECRET")
        );
    }

    #[test]
    fn weak_secrets_are_refused() {
        for secret in ["short", "dev-secret-change-me"] {
            assert_eq!(
                config(&[("QUILL_DATABASE_PATH", "quill.db"), ("QUILL_SESSION_SECRET", secret)])
                    .unwrap_err(),
                ConfigError::WeakSecret
            );
        }
    }

    #[test]
    fn unparsable_numbers_name_the_variable() {
        let err = config(&[
            ("QUILL_DATABASE_PATH", "quill.db"),
            ("QUILL_SESSION_SECRET", SECRET),
            ("QUILL_PORT", "eighty"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "QUILL_PORT", .. }));
    }
}
