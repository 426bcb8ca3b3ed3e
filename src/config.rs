//! Application-level configuration loading, including quiz defaults and admin accounts.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "QUIZ_LIVE_BACK_CONFIG_PATH";

const DEFAULT_OTP_TTL_SECS: u64 = 600;
const DEFAULT_ANSWER_GRACE_SECS: u64 = 3;
const DEFAULT_TIME_LIMIT_SECS: u32 = 45;
const DEFAULT_QUESTION_POINTS: u32 = 10;

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    admin_emails: Vec<String>,
    allowed_email_domain: Option<String>,
    otp_ttl_secs: u64,
    answer_grace_secs: u64,
    default_time_limit_secs: u32,
    default_question_points: u32,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to baked-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        admins = config.admin_emails.len(),
                        "loaded configuration from file"
                    );
                    config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Configuration preset for tests.
    #[cfg(test)]
    pub fn for_tests(admin_emails: Vec<String>, allowed_email_domain: Option<String>) -> Self {
        Self {
            admin_emails,
            allowed_email_domain,
            ..Self::default()
        }
    }

    /// Whether a first login with this email should create an administrator account.
    pub fn is_admin_email(&self, email: &str) -> bool {
        self.admin_emails
            .iter()
            .any(|admin| admin.eq_ignore_ascii_case(email))
    }

    /// Whether the email is accepted by the configured domain restriction, if any.
    pub fn email_allowed(&self, email: &str) -> bool {
        match &self.allowed_email_domain {
            Some(domain) => email
                .rsplit_once('@')
                .is_some_and(|(_, d)| d.eq_ignore_ascii_case(domain)),
            None => true,
        }
    }

    /// Validity window for one-time login codes.
    pub fn otp_ttl(&self) -> Duration {
        Duration::from_secs(self.otp_ttl_secs)
    }

    /// Network-latency tolerance added on top of a question's answering window.
    pub fn answer_grace(&self) -> Duration {
        Duration::from_secs(self.answer_grace_secs)
    }

    /// Per-question time limit applied when a quiz does not override it.
    pub fn default_time_limit_secs(&self) -> u32 {
        self.default_time_limit_secs
    }

    /// Base points applied when a question does not specify its own.
    pub fn default_question_points(&self) -> u32 {
        self.default_question_points
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            admin_emails: Vec::new(),
            allowed_email_domain: None,
            otp_ttl_secs: DEFAULT_OTP_TTL_SECS,
            answer_grace_secs: DEFAULT_ANSWER_GRACE_SECS,
            default_time_limit_secs: DEFAULT_TIME_LIMIT_SECS,
            default_question_points: DEFAULT_QUESTION_POINTS,
        }
    }
}

#[derive(Debug, Deserialize)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    #[serde(default)]
    admin_emails: Vec<String>,
    #[serde(default)]
    allowed_email_domain: Option<String>,
    #[serde(default)]
    otp_ttl_secs: Option<u64>,
    #[serde(default)]
    answer_grace_secs: Option<u64>,
    #[serde(default)]
    default_time_limit_secs: Option<u32>,
    #[serde(default)]
    default_question_points: Option<u32>,
}

impl From<RawConfig> for AppConfig {
    fn from(raw: RawConfig) -> Self {
        Self {
            admin_emails: raw.admin_emails,
            allowed_email_domain: raw.allowed_email_domain,
            otp_ttl_secs: raw.otp_ttl_secs.unwrap_or(DEFAULT_OTP_TTL_SECS),
            answer_grace_secs: raw.answer_grace_secs.unwrap_or(DEFAULT_ANSWER_GRACE_SECS),
            default_time_limit_secs: raw
                .default_time_limit_secs
                .unwrap_or(DEFAULT_TIME_LIMIT_SECS),
            default_question_points: raw
                .default_question_points
                .unwrap_or(DEFAULT_QUESTION_POINTS),
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}
