use std::env;
use std::net::SocketAddr;
use std::str::FromStr;

use crate::error::ConfigError;

const DEV_JWT_SECRET: &str = "your-super-secret-jwt-key-change-in-production";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub default_page_size: usize,
    pub max_page_size: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            jwt_secret: DEV_JWT_SECRET.to_string(),
            default_page_size: 20,
            max_page_size: 100,
        }
    }
}

impl AppConfig {
    /// Reads `HOST`, `PORT`, `JWT_SECRET`, `DEFAULT_PAGE_SIZE` and `MAX_PAGE_SIZE`,
    /// falling back to [`AppConfig::default`] for anything unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let jwt_secret = match env::var("JWT_SECRET") {
            Ok(secret) if !secret.is_empty() => secret,
            _ => {
                tracing::warn!("JWT_SECRET not set, using the development secret");
                defaults.jwt_secret
            }
        };

        Ok(Self {
            host: env::var("HOST").unwrap_or(defaults.host),
            port: parse_var("PORT", "port number", defaults.port)?,
            jwt_secret,
            default_page_size: parse_var(
                "DEFAULT_PAGE_SIZE",
                "page size",
                defaults.default_page_size,
            )?,
            max_page_size: parse_var("MAX_PAGE_SIZE", "page size", defaults.max_page_size)?,
        })
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let raw = format!("{}:{}", self.host, self.port);
        raw.parse().map_err(|_| ConfigError::Invalid {
            name: "HOST",
            expected: "socket address",
            value: raw,
        })
    }
}

fn parse_var<T: FromStr>(name: &'static str, expected: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, expected, value }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_bind_addr_is_loopback() {
        let config = AppConfig::default();
        assert_eq!(config.bind_addr().unwrap().to_string(), "127.0.0.1:3000");
    }

    #[test]
    fn bad_host_is_rejected() {
        let config = AppConfig {
            host: "not a host".to_string(),
            ..AppConfig::default()
        };
        assert!(matches!(config.bind_addr(), Err(ConfigError::Invalid { name: "HOST", .. })));
    }

    #[test]
    fn malformed_number_reports_variable() {
        // Variable name is unique to this test so parallel tests do not race on it.
        env::set_var("BLOG_SOCKETS_TEST_PAGE", "lots");
        let err = parse_var::<usize>("BLOG_SOCKETS_TEST_PAGE", "page size", 10).unwrap_err();
        env::remove_var("BLOG_SOCKETS_TEST_PAGE");
        assert!(err.to_string().contains("BLOG_SOCKETS_TEST_PAGE"));
    }

    #[test]
    fn unset_variable_uses_default() {
        let value = parse_var::<u16>("BLOG_SOCKETS_TEST_UNSET_PORT", "port number", 8080).unwrap();
        assert_eq!(value, 8080);
    }
}
