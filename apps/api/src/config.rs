use anyhow::{Context, Result};

pub const DEFAULT_DATA_FILE: &str = "MyContactsTable.csv";
pub const DEFAULT_NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org/search";
pub const DEFAULT_HUGGINGFACE_URL: &str =
    "https://api-inference.huggingface.co/models/mistralai/Mixtral-8x7B-Instruct-v0.1";
pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";

/// Application configuration loaded from environment variables.
/// Startup fails if a required secret is missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub github_owner: String,
    pub github_repo: String,
    pub github_token: String,
    pub huggingface_token: String,
    pub data_file: String,
    pub nominatim_url: String,
    pub huggingface_url: String,
    pub github_api_url: String,
    pub http_timeout_secs: u64,
    pub session_idle_ttl_secs: u64,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            github_owner: require_env("GITHUB_OWNER")?,
            github_repo: require_env("GITHUB_REPO")?,
            github_token: require_env("GITHUB_TOKEN")?,
            huggingface_token: require_env("HUGGINGFACE_TOKEN")?,
            data_file: env_or("DATA_FILE", DEFAULT_DATA_FILE),
            nominatim_url: env_or("NOMINATIM_URL", DEFAULT_NOMINATIM_URL),
            huggingface_url: env_or("HUGGINGFACE_URL", DEFAULT_HUGGINGFACE_URL),
            github_api_url: env_or("GITHUB_API_URL", DEFAULT_GITHUB_API_URL),
            http_timeout_secs: env_or("HTTP_TIMEOUT_SECS", "30")
                .parse::<u64>()
                .context("HTTP_TIMEOUT_SECS must be a whole number of seconds")?,
            session_idle_ttl_secs: env_or("SESSION_IDLE_TTL_SECS", "1800")
                .parse::<u64>()
                .context("SESSION_IDLE_TTL_SECS must be a whole number of seconds")?,
            port: env_or("PORT", "8080")
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: env_or("RUST_LOG", "info"),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
