use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

use crate::logging::Severity;
use crate::tasks::Scheduler;
use crate::tasks::thread_creation::DEFAULT_MESSAGE;

pub const CONFIG_FILE_VAR: &str = "CONFIG_FILE";
pub const DEFAULT_WAIT_MS: u64 = 1000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config line {line}: {content}")]
    InvalidLine { line: usize, content: String },
    #[error("invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },
}

/// KEY=VALUE settings, falling back to the process environment for keys the
/// file does not set.
#[derive(Debug, Default, Clone)]
pub struct AppConfig {
    values: HashMap<String, String>,
    use_env: bool,
}

impl AppConfig {
    /// Loads the file named by `CONFIG_FILE`, or an env-only config when the
    /// variable is unset.
    pub fn load() -> Result<Self, ConfigError> {
        match env::var(CONFIG_FILE_VAR) {
            Ok(path) => Self::from_file(path),
            Err(_) => Ok(Self::from_env()),
        }
    }

    pub fn from_env() -> Self {
        Self {
            values: HashMap::new(),
            use_env: true,
        }
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::parse(&content)?;
        config.use_env = true;
        Ok(config)
    }

    /// Parses file content only; the environment is not consulted.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let mut values = HashMap::new();
        for (idx, line) in content.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let trimmed = trimmed.strip_prefix("export ").unwrap_or(trimmed);
            let Some((key, value)) = trimmed.split_once('=') else {
                return Err(ConfigError::InvalidLine {
                    line: idx + 1,
                    content: line.to_string(),
                });
            };
            let key = key.trim();
            if key.is_empty() {
                return Err(ConfigError::InvalidLine {
                    line: idx + 1,
                    content: line.to_string(),
                });
            }
            values.insert(key.to_string(), unquote(value.trim()).to_string());
        }
        Ok(Self {
            values,
            use_env: false,
        })
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.values
            .get(key)
            .cloned()
            .or_else(|| self.use_env.then(|| env::var(key).ok()).flatten())
    }

    pub fn log_level(&self) -> Result<Severity, ConfigError> {
        self.parsed("LOG_LEVEL", Severity::Info)
    }

    pub fn task_message(&self) -> String {
        self.get("TASK_MESSAGE")
            .unwrap_or_else(|| DEFAULT_MESSAGE.to_string())
    }

    pub fn scheduler(&self) -> Result<Scheduler, ConfigError> {
        self.parsed("SCHEDULER", Scheduler::Thread)
    }

    pub fn wait(&self) -> Result<Duration, ConfigError> {
        self.parsed("WAIT_MS", DEFAULT_WAIT_MS)
            .map(Duration::from_millis)
    }

    fn parsed<T>(&self, key: &str, default: T) -> Result<T, ConfigError>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get(key) {
            Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
                key: key.to_string(),
                reason: e.to_string(),
            }),
            None => Ok(default),
        }
    }
}

fn unquote(value: &str) -> &str {
    let quoted = value.len() >= 2
        && ((value.starts_with('"') && value.ends_with('"'))
            || (value.starts_with('\'') && value.ends_with('\'')));
    if quoted {
        &value[1..value.len() - 1]
    } else {
        value
    }
}
