//! Agent configuration loaded from environment variables.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use loadshield_core::decision::{ShieldPolicy, DEFAULT_COOLDOWN_MINUTES, DEFAULT_LOAD_THRESHOLD};

/// Default Cloudflare API origin.
pub const DEFAULT_API_BASE_URL: &str = "https://api.cloudflare.com";

/// Marker file name, resolved next to the executable unless overridden.
pub const DEFAULT_MARKER_FILE: &str = "cloudflare.txt";

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    Missing(&'static str),

    #[error("{var} is invalid: {reason}")]
    Invalid { var: &'static str, reason: String },
}

/// Log output style.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

/// Identifies the WAF rule to toggle and how to authenticate.
#[derive(Clone)]
pub struct RuleTarget {
    pub api_base_url: String,
    pub api_token: String,
    pub zone_id: String,
    pub ruleset_id: String,
    pub rule_id: String,
    /// Sent verbatim in the PATCH body.
    pub action: String,
    pub description: String,
    pub expression: String,
}

impl fmt::Debug for RuleTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleTarget")
            .field("api_base_url", &self.api_base_url)
            .field("api_token", &"<redacted>")
            .field("zone_id", &self.zone_id)
            .field("ruleset_id", &self.ruleset_id)
            .field("rule_id", &self.rule_id)
            .field("action", &self.action)
            .field("description", &self.description)
            .field("expression", &self.expression)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub rule: RuleTarget,
    pub policy: ShieldPolicy,
    pub marker_path: PathBuf,
    pub request_timeout: Duration,
    pub log_format: LogFormat,
}

impl AgentConfig {
    /// Load configuration from the process environment.
    ///
    /// | Env Var                   | Default                          |
    /// |---------------------------|----------------------------------|
    /// | `CF_API_TOKEN`            | required                         |
    /// | `CF_ZONE_ID`              | required                         |
    /// | `CF_RULESET_ID`           | required                         |
    /// | `CF_RULE_ID`              | required                         |
    /// | `CF_API_BASE_URL`         | `https://api.cloudflare.com`     |
    /// | `CF_RULE_ACTION`          | empty                            |
    /// | `CF_RULE_DESCRIPTION`     | empty                            |
    /// | `CF_RULE_EXPRESSION`      | empty                            |
    /// | `SHIELD_LOAD_THRESHOLD`   | `80.0`                           |
    /// | `SHIELD_COOLDOWN_MINUTES` | `15`                             |
    /// | `SHIELD_MARKER_PATH`      | `cloudflare.txt` beside the binary |
    /// | `REQUEST_TIMEOUT_SECS`    | `30`                             |
    /// | `LOG_FORMAT`              | `text`                           |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |var: &'static str| -> Result<String, ConfigError> {
            lookup(var)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or(ConfigError::Missing(var))
        };
        let optional = |var: &str| lookup(var).unwrap_or_default();

        let rule = RuleTarget {
            api_base_url: lookup("CF_API_BASE_URL")
                .map(|v| v.trim().trim_end_matches('/').to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string()),
            api_token: required("CF_API_TOKEN")?,
            zone_id: required("CF_ZONE_ID")?,
            ruleset_id: required("CF_RULESET_ID")?,
            rule_id: required("CF_RULE_ID")?,
            action: optional("CF_RULE_ACTION"),
            description: optional("CF_RULE_DESCRIPTION"),
            expression: optional("CF_RULE_EXPRESSION"),
        };

        let threshold: f64 = parse_or(&lookup, "SHIELD_LOAD_THRESHOLD", DEFAULT_LOAD_THRESHOLD)?;
        let cooldown_minutes: i64 =
            parse_or(&lookup, "SHIELD_COOLDOWN_MINUTES", DEFAULT_COOLDOWN_MINUTES)?;
        let policy = ShieldPolicy::new(threshold, cooldown_minutes).map_err(|e| {
            ConfigError::Invalid {
                var: "SHIELD_LOAD_THRESHOLD/SHIELD_COOLDOWN_MINUTES",
                reason: e.to_string(),
            }
        })?;

        let marker_path = match lookup("SHIELD_MARKER_PATH").filter(|v| !v.trim().is_empty()) {
            Some(path) => PathBuf::from(path.trim()),
            None => default_marker_path(),
        };

        let timeout_secs: u64 =
            parse_or(&lookup, "REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS)?;
        if timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                var: "REQUEST_TIMEOUT_SECS",
                reason: "must be at least 1".into(),
            });
        }

        let log_format = match lookup("LOG_FORMAT").as_deref().map(str::trim) {
            None | Some("") | Some("text") => LogFormat::Text,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    var: "LOG_FORMAT",
                    reason: format!("expected `text` or `json`, got `{other}`"),
                })
            }
        };

        Ok(Self {
            rule,
            policy,
            marker_path,
            request_timeout: Duration::from_secs(timeout_secs),
            log_format,
        })
    }
}

fn parse_or<F, T>(lookup: &F, var: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(var) {
        Some(raw) if !raw.trim().is_empty() => {
            raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
                var,
                reason: e.to_string(),
            })
        }
        _ => Ok(default),
    }
}

/// `cloudflare.txt` in the executable's directory, or the working
/// directory if the executable path cannot be resolved.
fn default_marker_path() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(DEFAULT_MARKER_FILE)))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_MARKER_FILE))
}
