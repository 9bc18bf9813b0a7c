/// Configuration management for the Oxbow backend
use crate::error::{OxbowError, OxbowResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub service: ServiceConfig,
    pub database: DatabaseConfig,
    pub llm: LlmConfig,
    pub mirror: MirrorConfig,
    pub push: PushConfig,
    pub reminders: ReminderConfig,
    pub rate_limit: RateLimitConfig,
    pub logging: LoggingConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub hostname: String,
    pub port: u16,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub path: PathBuf,
    pub max_connections: u32,
}

/// LLM provider configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Absent key disables generation and transcription
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub transcription_model: String,
    pub max_output_tokens: u32,
    /// Wall-clock budget per call for full Mirrors
    pub mirror_timeout_secs: u64,
    /// Wall-clock budget per call for previews, transcription and focus themes
    pub preview_timeout_secs: u64,
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("transcription_model", &self.transcription_model)
            .field("max_output_tokens", &self.max_output_tokens)
            .field("mirror_timeout_secs", &self.mirror_timeout_secs)
            .field("preview_timeout_secs", &self.preview_timeout_secs)
            .finish()
    }
}

impl LlmConfig {
    pub fn mirror_timeout(&self) -> Duration {
        Duration::from_secs(self.mirror_timeout_secs)
    }

    pub fn preview_timeout(&self) -> Duration {
        Duration::from_secs(self.preview_timeout_secs)
    }
}

/// Mirror admission and retry policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MirrorConfig {
    /// Unassigned journals needed before a standard Mirror
    pub default_threshold: usize,
    /// Cohort with a lower admission threshold
    pub cohort_name: String,
    pub cohort_threshold: usize,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
}

impl MirrorConfig {
    /// Threshold that applies to a user in `group_name`
    pub fn threshold_for(&self, group_name: Option<&str>) -> usize {
        match group_name {
            Some(group) if group == self.cohort_name => self.cohort_threshold,
            _ => self.default_threshold,
        }
    }
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            default_threshold: 10,
            cohort_name: "Mens Group".to_string(),
            cohort_threshold: 6,
            max_retries: 1,
            retry_delay_ms: 2000,
        }
    }
}

/// Push gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushConfig {
    pub gateway_url: String,
}

/// Wednesday journal reminder configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReminderConfig {
    pub enabled: bool,
    pub cohort_name: String,
    /// Mountain-Time hour at which the in-process job fires
    pub hour: u32,
}

/// Rate limiting for LLM-backed endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub generation_requests_per_minute: u32,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn env_string(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> OxbowResult<Self> {
        dotenv::dotenv().ok();

        let hostname = env_string("OXBOW_HOSTNAME", "0.0.0.0");
        let port = env::var("OXBOW_PORT")
            .unwrap_or_else(|_| "8787".to_string())
            .parse()
            .map_err(|_| OxbowError::Validation("Invalid port number".to_string()))?;

        let database = DatabaseConfig {
            path: env_string("OXBOW_DATABASE_PATH", "./data/oxbow.sqlite").into(),
            max_connections: env_or("OXBOW_DATABASE_MAX_CONNECTIONS", 10),
        };

        let api_key = env::var("OPENAI_API_KEY")
            .ok()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty());

        let llm = LlmConfig {
            api_key,
            base_url: env_string("OXBOW_LLM_BASE_URL", "https://api.openai.com/v1"),
            model: env_string("OXBOW_LLM_MODEL", "gpt-4o"),
            transcription_model: env_string("OXBOW_TRANSCRIPTION_MODEL", "whisper-1"),
            max_output_tokens: env_or("OXBOW_LLM_MAX_OUTPUT_TOKENS", 4000),
            mirror_timeout_secs: env_or("OXBOW_MIRROR_TIMEOUT_SECS", 240),
            preview_timeout_secs: env_or("OXBOW_PREVIEW_TIMEOUT_SECS", 60),
        };

        let defaults = MirrorConfig::default();
        let mirror = MirrorConfig {
            default_threshold: env_or("OXBOW_MIRROR_DEFAULT_THRESHOLD", defaults.default_threshold),
            cohort_name: env_string("OXBOW_MIRROR_COHORT_NAME", &defaults.cohort_name),
            cohort_threshold: env_or("OXBOW_MIRROR_COHORT_THRESHOLD", defaults.cohort_threshold),
            max_retries: env_or("OXBOW_MIRROR_MAX_RETRIES", defaults.max_retries),
            retry_delay_ms: env_or("OXBOW_MIRROR_RETRY_DELAY_MS", defaults.retry_delay_ms),
        };

        let push = PushConfig {
            gateway_url: env_string(
                "OXBOW_PUSH_GATEWAY_URL",
                "https://exp.host/--/api/v2/push/send",
            ),
        };

        let reminders = ReminderConfig {
            enabled: env_or("OXBOW_REMINDERS_ENABLED", true),
            cohort_name: env_string("OXBOW_REMINDER_COHORT", "Mens Group"),
            hour: env_or("OXBOW_REMINDER_HOUR", 18),
        };

        let rate_limit = RateLimitConfig {
            enabled: env_or("OXBOW_RATE_LIMITS_ENABLED", true),
            generation_requests_per_minute: env_or("OXBOW_GENERATION_REQUESTS_PER_MINUTE", 30),
        };

        let logging = LoggingConfig {
            level: env_string("RUST_LOG", "info"),
            json: env_string("OXBOW_LOG_FORMAT", "pretty").eq_ignore_ascii_case("json"),
        };

        Ok(ServerConfig {
            service: ServiceConfig { hostname, port },
            database,
            llm,
            mirror,
            push,
            reminders,
            rate_limit,
            logging,
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> OxbowResult<()> {
        if self.service.hostname.is_empty() {
            return Err(OxbowError::Validation("Hostname cannot be empty".to_string()));
        }

        if self.mirror.default_threshold == 0 || self.mirror.cohort_threshold == 0 {
            return Err(OxbowError::Validation(
                "Mirror journal thresholds must be at least 1".to_string(),
            ));
        }

        if self.llm.mirror_timeout_secs == 0 || self.llm.preview_timeout_secs == 0 {
            return Err(OxbowError::Validation(
                "LLM timeouts must be at least 1 second".to_string(),
            ));
        }

        if self.llm.model.trim().is_empty() {
            return Err(OxbowError::Validation("LLM model cannot be empty".to_string()));
        }

        if self.reminders.hour > 23 {
            return Err(OxbowError::Validation(
                "Reminder hour must be between 0 and 23".to_string(),
            ));
        }

        Ok(())
    }

    /// Configuration for tests and local tooling
    pub fn for_testing() -> Self {
        Self {
            service: ServiceConfig {
                hostname: "127.0.0.1".to_string(),
                port: 0,
            },
            database: DatabaseConfig {
                path: PathBuf::from(":memory:"),
                max_connections: 1,
            },
            llm: LlmConfig {
                api_key: None,
                base_url: "http://127.0.0.1:9".to_string(),
                model: "gpt-4o".to_string(),
                transcription_model: "whisper-1".to_string(),
                max_output_tokens: 4000,
                mirror_timeout_secs: 240,
                preview_timeout_secs: 60,
            },
            mirror: MirrorConfig {
                retry_delay_ms: 10,
                ..MirrorConfig::default()
            },
            push: PushConfig {
                gateway_url: "http://127.0.0.1:9/push".to_string(),
            },
            reminders: ReminderConfig {
                enabled: false,
                cohort_name: "Mens Group".to_string(),
                hour: 18,
            },
            rate_limit: RateLimitConfig {
                enabled: false,
                generation_requests_per_minute: 30,
            },
            logging: LoggingConfig {
                level: "debug".to_string(),
                json: false,
            },
        }
    }
}
