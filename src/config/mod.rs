use log::{info, warn};
use std::collections::HashSet;
use std::env;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

const DEFAULT_QUESTION: &str = "What is your favourite programming language?";
const DEFAULT_OPTIONS: &str = "a) Python, b) JavaScript, c) Java, d) C++";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid {key} value: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    Json { data_dir: PathBuf },
    Sqlite { database_url: String },
}

// Poll settings, read once at startup and shared read-only afterwards.
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_address: String,
    pub storage: StorageBackend,
    pub question: String,
    pub options: Vec<String>,
    pub admin_username: String,
    pub admin_password: String,
    pub reset_token: String,
    pub reset_requires_admin: bool,
    pub store_raw_address: bool,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let storage = match lookup("POLL_STORAGE").as_deref().map(str::trim) {
            None | Some("json") => StorageBackend::Json {
                data_dir: PathBuf::from(or_default(&lookup, "POLL_DATA_DIR", ".")),
            },
            Some("sqlite") => StorageBackend::Sqlite {
                database_url: or_default(&lookup, "DATABASE_URL", "sqlite:single_vote.db"),
            },
            Some(other) => {
                return Err(ConfigError::Invalid {
                    key: "POLL_STORAGE",
                    reason: format!("expected `json` or `sqlite`, got `{other}`"),
                });
            }
        };

        Ok(Self {
            bind_address: or_default(&lookup, "POLL_BIND", "0.0.0.0:5000"),
            storage,
            question: or_default(&lookup, "POLL_QUESTION", DEFAULT_QUESTION),
            options: parse_options(&or_default(&lookup, "POLL_OPTIONS", DEFAULT_OPTIONS))?,
            admin_username: secret(&lookup, "ADMIN_USERNAME", "admin"),
            admin_password: secret(&lookup, "ADMIN_PASSWORD", "admin"),
            reset_token: secret(&lookup, "RESET_TOKEN", "change-me"),
            reset_requires_admin: parsed(&lookup, "RESET_REQUIRES_ADMIN", false)?,
            store_raw_address: parsed(&lookup, "STORE_RAW_ADDRESS", true)?,
        })
    }

    pub fn is_option(&self, choice: &str) -> bool {
        self.options.iter().any(|option| option == choice)
    }
}

// Splits a comma-separated option list, dropping blanks.
pub fn parse_options(raw: &str) -> Result<Vec<String>, ConfigError> {
    let options: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|option| !option.is_empty())
        .map(String::from)
        .collect();

    if options.is_empty() {
        return Err(ConfigError::Invalid {
            key: "POLL_OPTIONS",
            reason: "at least one option is required".to_string(),
        });
    }

    let mut seen = HashSet::new();
    if let Some(duplicate) = options.iter().find(|option| !seen.insert(option.as_str())) {
        return Err(ConfigError::Invalid {
            key: "POLL_OPTIONS",
            reason: format!("duplicate option `{duplicate}`"),
        });
    }

    Ok(options)
}

fn or_default<F>(lookup: &F, key: &str, default: &str) -> String
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    })
}

fn secret<F>(lookup: &F, key: &str, default: &str) -> String
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).unwrap_or_else(|| {
        warn!("{key} not set, falling back to the built-in default. Set it before going public.");
        default.to_string()
    })
}

fn parsed<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + Display,
    T::Err: Display,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            reason: e.to_string(),
        }),
        None => {
            info!("{key} not set, using default: {default}");
            Ok(default)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_when_environment_is_empty() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.options.len(), 4);
        assert_eq!(config.options[0], "a) Python");
        assert_eq!(
            config.storage,
            StorageBackend::Json { data_dir: PathBuf::from(".") }
        );
        assert!(!config.reset_requires_admin);
        assert!(config.store_raw_address);
    }

    #[test]
    fn reads_sqlite_backend_and_flags() {
        let config = config_from(&[
            ("POLL_STORAGE", "sqlite"),
            ("DATABASE_URL", "sqlite:test.db"),
            ("RESET_REQUIRES_ADMIN", "true"),
            ("STORE_RAW_ADDRESS", "false"),
            ("POLL_OPTIONS", "Tea,Coffee"),
        ])
        .unwrap();
        assert_eq!(
            config.storage,
            StorageBackend::Sqlite { database_url: "sqlite:test.db".to_string() }
        );
        assert!(config.reset_requires_admin);
        assert!(!config.store_raw_address);
        assert!(config.is_option("Coffee"));
        assert!(!config.is_option("coffee"));
    }

    #[test]
    fn rejects_unknown_backend_and_bad_flags() {
        assert!(config_from(&[("POLL_STORAGE", "redis")]).is_err());
        assert!(config_from(&[("RESET_REQUIRES_ADMIN", "maybe")]).is_err());
    }

    #[test]
    fn option_list_is_trimmed_and_checked() {
        assert_eq!(parse_options(" A , ,B ").unwrap(), vec!["A", "B"]);
        assert!(parse_options(" , ").is_err());
        assert!(parse_options("A,B,A").is_err());
    }
}
