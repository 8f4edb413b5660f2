//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::Level;

/// Google's OpenAI-compatible endpoint for Gemini models.
pub const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/openai";

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Which service backs the scorer, judge and topic generator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AiBackend {
    OpenAi,
    Gemini,
    /// No network calls: fallback scoring and topics, judging unavailable.
    Offline,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SttBackend {
    Whisper,
    Offline,
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub database_max_connections: u32,
    pub log_level: Level,
    pub ai_backend: AiBackend,
    pub openai_api_key: Option<String>,
    pub gemini_api_key: Option<String>,
    pub gemini_api_base: String,
    pub scoring_model: String,
    pub judge_model: String,
    pub topic_model: String,
    pub stt_backend: SttBackend,
    pub stt_model: String,
    pub local_storage_path: PathBuf,
    pub cors_origin: String,
    pub auth_token_ttl_days: i64,
    pub upload_limit_bytes: usize,
}

fn parsed<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidValue(key.to_string(), e.to_string())),
        None => Ok(default),
    }
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key/value source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        // Blank values count as unset.
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        // --- Server and Database Settings ---
        let bind_address = parsed(&lookup, "BIND_ADDRESS", SocketAddr::from(([0, 0, 0, 0], 8000)))?;

        let database_url =
            lookup("DATABASE_URL").ok_or_else(|| ConfigError::MissingVar("DATABASE_URL".to_string()))?;
        let database_max_connections = parsed(&lookup, "DATABASE_MAX_CONNECTIONS", 5u32)?;

        let log_level_str = lookup("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- API Keys (as optional) ---
        let openai_api_key = lookup("OPENAI_API_KEY");
        let gemini_api_key = lookup("GEMINI_API_KEY");
        let gemini_api_base = lookup("GEMINI_API_BASE").unwrap_or_else(|| DEFAULT_GEMINI_API_BASE.to_string());

        // --- AI Backend Selection ---
        let ai_backend = match lookup("AI_BACKEND").map(|v| v.trim().to_lowercase()) {
            Some(v) if v == "openai" => AiBackend::OpenAi,
            Some(v) if v == "gemini" => AiBackend::Gemini,
            Some(v) if v == "offline" => AiBackend::Offline,
            Some(other) => {
                return Err(ConfigError::InvalidValue(
                    "AI_BACKEND".to_string(),
                    format!("'{}' is not one of openai, gemini, offline", other),
                ))
            }
            None if gemini_api_key.is_some() => AiBackend::Gemini,
            None if openai_api_key.is_some() => AiBackend::OpenAi,
            None => AiBackend::Offline,
        };
        match ai_backend {
            AiBackend::OpenAi if openai_api_key.is_none() => {
                return Err(ConfigError::MissingVar("OPENAI_API_KEY".to_string()))
            }
            AiBackend::Gemini if gemini_api_key.is_none() => {
                return Err(ConfigError::MissingVar("GEMINI_API_KEY".to_string()))
            }
            _ => {}
        }

        let (default_chat, default_judge) = match ai_backend {
            AiBackend::Gemini => ("gemini-2.0-flash", "gemini-2.0-flash"),
            _ => ("gpt-4o-mini", "gpt-4o"),
        };
        let scoring_model = lookup("SCORING_MODEL").unwrap_or_else(|| default_chat.to_string());
        let judge_model = lookup("JUDGE_MODEL").unwrap_or_else(|| default_judge.to_string());
        let topic_model = lookup("TOPIC_MODEL").unwrap_or_else(|| default_chat.to_string());

        // --- Speech-to-Text ---
        let stt_backend = match lookup("STT_BACKEND").map(|v| v.trim().to_lowercase()) {
            Some(v) if v == "whisper" => SttBackend::Whisper,
            Some(v) if v == "offline" => SttBackend::Offline,
            Some(other) => {
                return Err(ConfigError::InvalidValue(
                    "STT_BACKEND".to_string(),
                    format!("'{}' is not one of whisper, offline", other),
                ))
            }
            None if openai_api_key.is_some() => SttBackend::Whisper,
            None => SttBackend::Offline,
        };
        if stt_backend == SttBackend::Whisper && openai_api_key.is_none() {
            return Err(ConfigError::MissingVar("OPENAI_API_KEY".to_string()));
        }
        let stt_model = lookup("STT_MODEL").unwrap_or_else(|| "whisper-1".to_string());

        // --- Storage, CORS, Auth, Uploads ---
        let local_storage_path = lookup("LOCAL_STORAGE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./storage/audio"));
        let cors_origin = lookup("CORS_ORIGIN").unwrap_or_else(|| "http://localhost:3000".to_string());
        let auth_token_ttl_days = parsed(&lookup, "AUTH_TOKEN_TTL_DAYS", 7i64)?;
        if auth_token_ttl_days <= 0 {
            return Err(ConfigError::InvalidValue(
                "AUTH_TOKEN_TTL_DAYS".to_string(),
                "must be at least 1".to_string(),
            ));
        }
        let upload_limit_bytes = parsed(&lookup, "UPLOAD_LIMIT_BYTES", 25 * 1024 * 1024usize)?;

        Ok(Self {
            bind_address,
            database_url,
            database_max_connections,
            log_level,
            ai_backend,
            openai_api_key,
            gemini_api_key,
            gemini_api_base,
            scoring_model,
            judge_model,
            topic_model,
            stt_backend,
            stt_model,
            local_storage_path,
            cors_origin,
            auth_token_ttl_days,
            upload_limit_bytes,
        })
    }
}
