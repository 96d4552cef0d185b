use anyhow::{Context, Result, anyhow};
use blog_client::api::DEFAULT_SIGNUP_PATH;

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8080";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub api_url: String,
    pub signup_path: String,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub log_level: String,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let api_url =
            non_empty(&lookup, "BLOG_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let signup_path = non_empty(&lookup, "BLOG_SIGNUP_PATH")
            .unwrap_or_else(|| DEFAULT_SIGNUP_PATH.to_string());
        if !signup_path.starts_with('/') {
            return Err(anyhow!("BLOG_SIGNUP_PATH must start with '/'"));
        }

        let connect_timeout_secs = parse_u64_env(&lookup, "BLOG_CONNECT_TIMEOUT_SECS", 5)?;
        let request_timeout_secs = parse_u64_env(&lookup, "BLOG_REQUEST_TIMEOUT_SECS", 15)?;
        let log_level = non_empty(&lookup, "LOG_LEVEL")
            .or_else(|| non_empty(&lookup, "RUST_LOG"))
            .unwrap_or_else(|| "warn".to_string());

        Ok(Self {
            api_url,
            signup_path,
            connect_timeout_secs,
            request_timeout_secs,
            log_level,
        })
    }
}

fn non_empty(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_u64_env(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: u64,
) -> Result<u64> {
    let value = lookup(key)
        .unwrap_or_else(|| default.to_string())
        .trim()
        .parse::<u64>()
        .with_context(|| format!("Failed to parse {key}, expecting positive integer"))?;

    if value == 0 {
        return Err(anyhow!("{key} must be > 0"));
    }
    Ok(value)
}
