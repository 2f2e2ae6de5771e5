//! Server configuration.

use std::env;

use anyhow::Context;
use mailer::DEFAULT_APP_URL;
use media::ImageKitConfig;

const DEFAULT_PORT: u16 = 5004;

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host address.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Log level.
    pub log_level: String,
    /// Deployment environment (`production`, `development`, `test`).
    pub environment: String,
    /// Whether the site is served over HTTPS. Only consulted in production.
    pub use_https: bool,
    /// Public URL used in email links.
    pub app_url: String,
    /// Resend API key. Emails are skipped without it.
    pub resend_api_key: Option<String>,
    /// ImageKit credentials and display settings.
    pub imagekit: ImageKitConfig,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Loads configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = match non_empty("PORT") {
            Some(port) => port
                .trim()
                .parse()
                .with_context(|| format!("PORT must be a port number, got {port:?}"))?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            host: non_empty("BUENAVISTA_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            log_level: non_empty("BUENAVISTA_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            environment: non_empty("BUENAVISTA_ENV")
                .unwrap_or_else(|| "development".to_string())
                .to_lowercase(),
            use_https: lookup("USE_HTTPS").is_none_or(|v| v.trim() != "false"),
            app_url: non_empty("APP_URL")
                .map(|url| url.trim().trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_APP_URL.to_string()),
            resend_api_key: non_empty("RESEND_API_KEY"),
            imagekit: ImageKitConfig {
                private_key: lookup("IMAGEKIT_PRIVATE_KEY"),
                public_key: lookup("IMAGEKIT_PUBLIC_KEY"),
                url_endpoint: lookup("IMAGEKIT_URL"),
                use_web_proxy: lookup("IMAGEKIT_USE_WEB_PROXY").as_deref() == Some("true"),
            },
        })
    }

    /// Returns the server address.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Returns true when running in production.
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Returns true if the session cookie should carry the `Secure` flag.
    pub fn secure_cookies(&self) -> bool {
        self.is_production() && self.use_https
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(vars: &[(&str, &str)]) -> anyhow::Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();

        assert_eq!(config.server_addr(), "0.0.0.0:5004");
        assert_eq!(config.log_level, "info");
        assert_eq!(config.app_url, "https://buenavista.in");
        assert!(config.resend_api_key.is_none());
        assert!(!config.is_production());
        assert!(!config.secure_cookies());
    }

    #[test]
    fn test_secure_cookies_in_production() {
        let config = config_from(&[("BUENAVISTA_ENV", "Production")]).unwrap();
        assert!(config.secure_cookies());

        let config =
            config_from(&[("BUENAVISTA_ENV", "production"), ("USE_HTTPS", "false")]).unwrap();
        assert!(!config.secure_cookies());
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("PORT", "8080"),
            ("APP_URL", "http://localhost:8080/"),
            ("RESEND_API_KEY", "re_123"),
            ("IMAGEKIT_USE_WEB_PROXY", "true"),
        ])
        .unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.app_url, "http://localhost:8080");
        assert_eq!(config.resend_api_key.as_deref(), Some("re_123"));
        assert!(config.imagekit.use_web_proxy);
    }

    #[test]
    fn test_invalid_port() {
        assert!(config_from(&[("PORT", "eighty")]).is_err());
    }
}
