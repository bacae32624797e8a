use std::fmt;
use std::time::Duration;

use reqwest::header::HeaderValue;
use reqwest::Url;

pub const HEALTH_PATH: &str = "/health";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_COMMAND_PATH: &str = "/slack/command";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
/// Token budget sent with every completion request.
pub const DEFAULT_MAX_TOKENS: u32 = 50;

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Process-wide settings, read once at startup.
#[derive(Clone)]
pub struct Config {
    pub completion_endpoint: Url,
    pub api_key: String,
    pub verification_token: String,
    pub port: u16,
    pub command_path: String,
    pub request_timeout: Duration,
    pub max_tokens: u32,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("completion_endpoint", &self.completion_endpoint.as_str())
            .field("api_key", &"<redacted>")
            .field("verification_token", &"<redacted>")
            .field("port", &self.port)
            .field("command_path", &self.command_path)
            .field("request_timeout", &self.request_timeout)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let required = |name: &'static str| get(name).ok_or(ConfigError::Missing(name));

        let endpoint = required("AZURE_OPENAI_ENDPOINT")?;
        let completion_endpoint = Url::parse(endpoint.trim()).map_err(|e| ConfigError::Invalid {
            name: "AZURE_OPENAI_ENDPOINT",
            reason: e.to_string(),
        })?;
        let api_key = required("AZURE_API_KEY")?;
        if HeaderValue::from_str(&format!("Bearer {api_key}")).is_err() {
            return Err(ConfigError::Invalid {
                name: "AZURE_API_KEY",
                reason: "not usable in an Authorization header".to_string(),
            });
        }
        let verification_token = required("SLACK_VERIFICATION_TOKEN")?;

        let port = match get("PORT") {
            Some(raw) => raw.trim().parse::<u16>().map_err(|e| ConfigError::Invalid {
                name: "PORT",
                reason: e.to_string(),
            })?,
            None => DEFAULT_PORT,
        };

        let command_path = get("SLACK_COMMAND_PATH").unwrap_or_else(|| DEFAULT_COMMAND_PATH.to_string());
        if !command_path.starts_with('/') {
            return Err(ConfigError::Invalid {
                name: "SLACK_COMMAND_PATH",
                reason: "must start with '/'".to_string(),
            });
        }
        if command_path == HEALTH_PATH {
            return Err(ConfigError::Invalid {
                name: "SLACK_COMMAND_PATH",
                reason: format!("{HEALTH_PATH} is reserved for the liveness probe"),
            });
        }

        let timeout_secs = match get("COMPLETION_TIMEOUT_SECS") {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => secs,
                Ok(_) => {
                    return Err(ConfigError::Invalid {
                        name: "COMPLETION_TIMEOUT_SECS",
                        reason: "must be greater than zero".to_string(),
                    })
                }
                Err(e) => {
                    return Err(ConfigError::Invalid {
                        name: "COMPLETION_TIMEOUT_SECS",
                        reason: e.to_string(),
                    })
                }
            },
            None => DEFAULT_TIMEOUT_SECS,
        };

        Ok(Self {
            completion_endpoint,
            api_key,
            verification_token,
            port,
            command_path,
            request_timeout: Duration::from_secs(timeout_secs),
            max_tokens: DEFAULT_MAX_TOKENS,
        })
    }
}

/// Load `./.env` into the process environment without overriding variables
/// that are already set. Must run before any other thread is spawned.
pub fn load_dotenv() {
    match std::fs::read_to_string(".env") {
        Ok(contents) => {
            for (key, value) in parse_dotenv(&contents) {
                if std::env::var_os(&key).is_some() {
                    continue;
                }
                std::env::set_var(&key, value);
                eprintln!(".env: loaded {key}");
            }
        }
        Err(e) => {
            eprintln!(".env: not loaded ({e})");
        }
    }
}

fn parse_dotenv(contents: &str) -> Vec<(String, String)> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            let line = line.strip_prefix("export ").unwrap_or(line);
            let (key, value) = line.split_once('=')?;
            let key = key.trim();
            if key.is_empty() {
                return None;
            }
            Some((key.to_string(), unquote(value.trim()).to_string()))
        })
        .collect()
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}
