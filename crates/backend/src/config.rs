//! Backend connection configuration loaded from environment variables.

use std::time::Duration;

use secrecy::SecretString;

/// How to reach the storefront backend.
///
/// Reads from environment variables:
/// - `STOREFRONT_API_BASE`: base URL including the `/api` prefix
///   (default: `"http://127.0.0.1:3000/api"`)
/// - `STOREFRONT_ACCESS_TOKEN`: bearer token, if already signed in
/// - `STOREFRONT_HTTP_TIMEOUT_SECS`: per-request timeout (default: `12`)
///
/// Implements `Debug` manually to redact the access token.
#[derive(Clone)]
pub struct BackendConfig {
    pub base_url: String,
    pub access_token: Option<SecretString>,
    pub timeout: Duration,
}

impl BackendConfig {
    pub const DEFAULT_BASE_URL: &'static str = "http://127.0.0.1:3000/api";
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(12);

    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            base_url: std::env::var("STOREFRONT_API_BASE")
                .ok()
                .map(|url| url.trim().trim_end_matches('/').to_string())
                .filter(|url| !url.is_empty())
                .unwrap_or_else(|| Self::DEFAULT_BASE_URL.to_string()),
            access_token: std::env::var("STOREFRONT_ACCESS_TOKEN")
                .ok()
                .filter(|token| !token.trim().is_empty())
                .map(SecretString::from),
            timeout: std::env::var("STOREFRONT_HTTP_TIMEOUT_SECS")
                .ok()
                .and_then(|secs| secs.parse::<u64>().ok())
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(Self::DEFAULT_TIMEOUT),
        }
    }

    /// Configuration pointing at `base_url` with default settings.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            ..Self::default()
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: Self::DEFAULT_BASE_URL.to_string(),
            access_token: None,
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }
}

impl std::fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendConfig")
            .field("base_url", &self.base_url)
            .field("access_token", &self.access_token.as_ref().map(|_| "[REDACTED]"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use secrecy::ExposeSecret;
    use serial_test::serial;

    use super::*;

    const VARS: [&str; 3] = [
        "STOREFRONT_API_BASE",
        "STOREFRONT_ACCESS_TOKEN",
        "STOREFRONT_HTTP_TIMEOUT_SECS",
    ];

    fn clear_env() {
        for var in VARS {
            // SAFETY: tests touching the environment are serialized.
            unsafe { std::env::remove_var(var) };
        }
    }

    #[test]
    #[serial]
    fn defaults_without_env() {
        clear_env();
        let config = BackendConfig::from_env();
        assert_eq!(config.base_url, BackendConfig::DEFAULT_BASE_URL);
        assert!(config.access_token.is_none());
        assert_eq!(config.timeout, Duration::from_secs(12));
    }

    #[test]
    #[serial]
    fn reads_env_and_normalizes_base_url() {
        clear_env();
        // SAFETY: tests touching the environment are serialized.
        unsafe {
            std::env::set_var("STOREFRONT_API_BASE", "https://shop.example/api/");
            std::env::set_var("STOREFRONT_ACCESS_TOKEN", "tok_123");
            std::env::set_var("STOREFRONT_HTTP_TIMEOUT_SECS", "3");
        }

        let config = BackendConfig::from_env();
        assert_eq!(config.base_url, "https://shop.example/api");
        assert_eq!(
            config.access_token.as_ref().map(|t| t.expose_secret().to_string()),
            Some("tok_123".to_string())
        );
        assert_eq!(config.timeout, Duration::from_secs(3));
        clear_env();
    }

    #[test]
    #[serial]
    fn invalid_timeout_falls_back() {
        clear_env();
        // SAFETY: tests touching the environment are serialized.
        unsafe { std::env::set_var("STOREFRONT_HTTP_TIMEOUT_SECS", "0") };
        assert_eq!(BackendConfig::from_env().timeout, BackendConfig::DEFAULT_TIMEOUT);
        clear_env();
    }

    #[test]
    fn debug_redacts_token() {
        let config = BackendConfig {
            access_token: Some(SecretString::from("super-secret".to_string())),
            ..BackendConfig::default()
        };
        let rendered = format!("{config:?}");
        assert!(rendered.contains("[REDACTED]"));
        assert!(!rendered.contains("super-secret"));
    }
}
