//! Stub server configuration loaded from environment variables.

/// Server configuration with defaults matching the client's default base URL.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"127.0.0.1"`)
/// - `PORT`: listen port (default: `3000`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `STUB_REQUIRE_AUTH`: reject cart calls without a bearer token
///   (default: `true`)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub require_auth: bool,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: std::env::var("HOST").unwrap_or(defaults.host),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            log_level: std::env::var("RUST_LOG").unwrap_or(defaults.log_level),
            require_auth: std::env::var("STUB_REQUIRE_AUTH")
                .ok()
                .map(|v| !matches!(v.trim(), "0" | "false" | "no"))
                .unwrap_or(defaults.require_auth),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            require_auth: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = Config::default();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 3000);
        assert_eq!(config.log_level, "info");
        assert!(config.require_auth);
    }

    #[test]
    fn test_addr_formatting() {
        let config = Config {
            host: "0.0.0.0".to_string(),
            port: 8080,
            ..Config::default()
        };
        assert_eq!(config.addr(), "0.0.0.0:8080");
    }
}
