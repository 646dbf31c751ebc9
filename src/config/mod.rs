use std::env;
use std::path::PathBuf;

use crate::error::AppError;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub oracle: OracleConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub request: RequestConfig,
    pub interview: InterviewConfig,
}

/// Question-oracle API configuration
#[derive(Debug, Clone)]
pub struct OracleConfig {
    pub api_key: String,
    pub base_url: String,
    pub pipe_name: String,
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub path: PathBuf,
    pub max_connections: u32,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

/// Log output format
#[derive(Debug, Clone, PartialEq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// HTTP request configuration
#[derive(Debug, Clone)]
pub struct RequestConfig {
    pub timeout_ms: u64,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
}

/// Interview traversal limits and automation pacing
#[derive(Debug, Clone)]
pub struct InterviewConfig {
    /// Maximum question depth reachable by child creation.
    pub max_depth: usize,
    /// Optional cap on total questions per session.
    pub max_questions: Option<usize>,
    /// Settle delay between an accepted suggestion and applying it.
    pub auto_settle_ms: u64,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, AppError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let oracle = OracleConfig {
            api_key: env::var("ORACLE_API_KEY").map_err(|_| AppError::Config {
                message: "ORACLE_API_KEY is required".to_string(),
            })?,
            base_url: env::var("ORACLE_BASE_URL")
                .unwrap_or_else(|_| "https://api.langbase.com".to_string()),
            pipe_name: env::var("ORACLE_PIPE")
                .unwrap_or_else(|_| "design-interview-v1".to_string()),
        };

        let database = DatabaseConfig {
            path: PathBuf::from(
                env::var("DATABASE_PATH").unwrap_or_else(|_| "./data/interview.db".to_string()),
            ),
            max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5),
        };

        let logging = LoggingConfig {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            format: match env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "pretty".to_string())
                .to_lowercase()
                .as_str()
            {
                "json" => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
        };

        let request = RequestConfig {
            timeout_ms: env::var("REQUEST_TIMEOUT_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30000),
            max_retries: env::var("MAX_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3),
            retry_delay_ms: env::var("RETRY_DELAY_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1000),
        };

        let interview = InterviewConfig {
            max_depth: env::var("INTERVIEW_MAX_DEPTH")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5),
            max_questions: env::var("INTERVIEW_MAX_QUESTIONS")
                .ok()
                .and_then(|s| s.parse().ok()),
            auto_settle_ms: env::var("AUTO_SETTLE_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1500),
        };

        Ok(Config {
            oracle,
            database,
            logging,
            request,
            interview,
        })
    }
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 30000,
            max_retries: 3,
            retry_delay_ms: 1000,
        }
    }
}

impl Default for InterviewConfig {
    fn default() -> Self {
        Self {
            max_depth: 5,
            max_questions: None,
            auto_settle_ms: 1500,
        }
    }
}
