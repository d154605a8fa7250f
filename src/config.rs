use serde::Deserialize;
use std::time::Duration;

use crate::submission::RedirectPolicy;

pub const DEFAULT_SUBMIT_URL: &str = "http://localhost:3000/api/submit-form";
pub const DEFAULT_VIACEP_BASE_URL: &str = "https://viacep.com.br";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub submit_url: String,
    pub viacep_base_url: String,
    pub redirect_url: Option<String>,
    pub redirect_delay_ms: u64,
    pub http_timeout_secs: u64,
    pub cep_cache_ttl_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            submit_url: DEFAULT_SUBMIT_URL.to_string(),
            viacep_base_url: DEFAULT_VIACEP_BASE_URL.to_string(),
            redirect_url: None,
            redirect_delay_ms: 3000,
            http_timeout_secs: 30,
            cep_cache_ttl_secs: 3600,
        }
    }
}

fn http_url(var: &str, url: String) -> anyhow::Result<String> {
    if url.trim().is_empty() {
        anyhow::bail!("{} cannot be empty", var);
    }
    if !url.starts_with("http://") && !url.starts_with("https://") {
        anyhow::bail!("{} must start with http:// or https://", var);
    }
    Ok(url)
}

fn number(var: &str, default: u64) -> anyhow::Result<u64> {
    match std::env::var(var) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("{} must be a non-negative integer", var)),
        Err(_) => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let defaults = Self::default();

        let config = Self {
            submit_url: http_url(
                "ENROLLMENT_SUBMIT_URL",
                std::env::var("ENROLLMENT_SUBMIT_URL").unwrap_or(defaults.submit_url),
            )?,
            viacep_base_url: http_url(
                "VIACEP_BASE_URL",
                std::env::var("VIACEP_BASE_URL").unwrap_or(defaults.viacep_base_url),
            )?,
            redirect_url: std::env::var("ENROLLMENT_REDIRECT_URL")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(|url| http_url("ENROLLMENT_REDIRECT_URL", url))
                .transpose()?,
            redirect_delay_ms: number("ENROLLMENT_REDIRECT_DELAY_MS", defaults.redirect_delay_ms)?,
            http_timeout_secs: number("HTTP_TIMEOUT_SECS", defaults.http_timeout_secs)
                .and_then(|secs| {
                    if secs == 0 {
                        anyhow::bail!("HTTP_TIMEOUT_SECS must be greater than zero");
                    }
                    Ok(secs)
                })?,
            cep_cache_ttl_secs: number("CEP_CACHE_TTL_SECS", defaults.cep_cache_ttl_secs)?,
        };

        tracing::info!("Configuration loaded successfully");
        tracing::debug!("Submit URL: {}", config.submit_url);
        tracing::debug!("ViaCEP Base URL: {}", config.viacep_base_url);
        if let Some(ref redirect) = config.redirect_url {
            tracing::info!(
                "Post-submit redirect configured: {} after {}ms",
                redirect,
                config.redirect_delay_ms
            );
        }

        Ok(config)
    }

    pub fn redirect_policy(&self) -> RedirectPolicy {
        RedirectPolicy {
            url: self.redirect_url.clone(),
            delay: Duration::from_millis(self.redirect_delay_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_url_validation() {
        assert!(http_url("X", "https://viacep.com.br".to_string()).is_ok());
        assert!(http_url("X", "  ".to_string()).is_err());
        assert!(http_url("X", "ftp://example.com".to_string()).is_err());
    }

    #[test]
    fn test_redirect_policy_from_config() {
        let config = Config {
            redirect_url: Some("https://example.com/obrigado".to_string()),
            redirect_delay_ms: 1500,
            ..Config::default()
        };

        let policy = config.redirect_policy();
        assert_eq!(policy.url.as_deref(), Some("https://example.com/obrigado"));
        assert_eq!(policy.delay, Duration::from_millis(1500));
    }
}
