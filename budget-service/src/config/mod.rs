use serde::Deserialize;
use service_core::config::{self as core_config, get_env, is_production};
use service_core::error::AppError;
use std::path::PathBuf;

/// Per-file ceiling for accepted PDFs (20MB).
pub const DEFAULT_MAX_FILE_BYTES: usize = 20 * 1024 * 1024;

/// Whole-request ceiling; several PDFs may share one form.
pub const DEFAULT_MAX_BODY_BYTES: usize = 64 * 1024 * 1024;

pub const DEFAULT_TEXT_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_ALLOWED_ORIGINS: &str = "https://budgeted.ruhangupta.com,http://localhost:5173";

#[derive(Debug, Clone, Deserialize)]
pub struct BudgetConfig {
    #[serde(flatten)]
    pub common: core_config::Config,
    pub genai: GenaiConfig,
    pub cors: CorsConfig,
    pub upload: UploadConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenaiConfig {
    pub api_key: String,
    /// Model used for every generation call (e.g., gemini-2.0-flash)
    pub text_model: String,
    pub api_base: String,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    pub max_file_bytes: usize,
    pub max_body_bytes: usize,
    pub storage: StorageMode,
    /// Parent directory for per-request scratch directories.
    pub scratch_root: PathBuf,
}

/// Where accepted attachments live between parsing and prompt assembly.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageMode {
    Memory,
    Disk,
}

impl BudgetConfig {
    pub fn load() -> Result<Self, AppError> {
        let common_config = core_config::Config::load()?;
        let is_prod = is_production();

        Ok(BudgetConfig {
            common: common_config,
            genai: GenaiConfig {
                api_key: get_env("GOOGLE_GENAI_API_KEY", None, is_prod)?,
                text_model: get_env("GENAI_TEXT_MODEL", Some(DEFAULT_TEXT_MODEL), is_prod)?,
                api_base: get_env("GENAI_API_BASE", Some(DEFAULT_API_BASE), is_prod)?,
                request_timeout_secs: parse_number(
                    "GENAI_REQUEST_TIMEOUT_SECS",
                    &get_env(
                        "GENAI_REQUEST_TIMEOUT_SECS",
                        Some(&DEFAULT_REQUEST_TIMEOUT_SECS.to_string()),
                        is_prod,
                    )?,
                )?,
            },
            cors: CorsConfig {
                allowed_origins: parse_origins(&get_env(
                    "CORS_ALLOWED_ORIGINS",
                    Some(DEFAULT_ALLOWED_ORIGINS),
                    is_prod,
                )?),
            },
            upload: UploadConfig {
                max_file_bytes: parse_number(
                    "UPLOAD_MAX_FILE_BYTES",
                    &get_env(
                        "UPLOAD_MAX_FILE_BYTES",
                        Some(&DEFAULT_MAX_FILE_BYTES.to_string()),
                        is_prod,
                    )?,
                )?,
                max_body_bytes: parse_number(
                    "UPLOAD_MAX_BODY_BYTES",
                    &get_env(
                        "UPLOAD_MAX_BODY_BYTES",
                        Some(&DEFAULT_MAX_BODY_BYTES.to_string()),
                        is_prod,
                    )?,
                )?,
                storage: get_env("UPLOAD_STORAGE", Some("memory"), is_prod)?
                    .parse()
                    .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?,
                scratch_root: match std::env::var("UPLOAD_SCRATCH_DIR") {
                    Ok(dir) if !dir.is_empty() => PathBuf::from(dir),
                    _ => std::env::temp_dir(),
                },
            },
        })
    }
}

impl std::str::FromStr for StorageMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "memory" => Ok(StorageMode::Memory),
            "disk" => Ok(StorageMode::Disk),
            _ => Err(format!("Invalid upload storage mode: {}", s)),
        }
    }
}

/// Split a comma-separated origin list, dropping blanks and trailing slashes.
pub fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|origin| origin.trim().trim_end_matches('/'))
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, AppError>
where
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| {
        AppError::ConfigError(anyhow::anyhow!("{} must be a number: {}", key, e))
    })
}
