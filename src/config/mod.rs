//! Configuration management for Sonargate Core

use crate::installation::Installation;
use anyhow::{Context, Result};
use std::env;
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server host
    pub http_host: String,
    /// HTTP server port
    pub http_port: u16,
    /// Quality server configuration
    pub sonar: SonarConfig,
    /// Inbound webhook configuration
    pub webhook: WebhookConfig,
    /// Logging and metrics configuration
    pub telemetry: TelemetryConfig,
}

#[derive(Debug, Clone)]
pub struct SonarConfig {
    /// Configured installations; `Installation`'s Debug hides secrets
    pub installations: Vec<Installation>,
    /// Lowest server version the resolver accepts (e.g. "5.6")
    pub min_server_version: String,
    /// Per-request timeout for calls to the quality server
    pub http_timeout: Duration,
    pub http_connect_timeout: Duration,
    /// Upper bound for waiting on a task through the wait endpoint
    pub wait_timeout: Duration,
    /// Interval between status polls while waiting for a webhook
    pub poll_interval: Duration,
}

impl Default for SonarConfig {
    fn default() -> Self {
        Self {
            installations: vec![],
            min_server_version: crate::sonar::MINIMUM_SUPPORTED_VERSION.to_string(),
            http_timeout: Duration::from_secs(30),
            http_connect_timeout: Duration::from_secs(10),
            wait_timeout: Duration::from_secs(300),
            poll_interval: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone)]
pub struct WebhookConfig {
    /// Path segment the quality server posts to, without slashes
    pub path: String,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            path: "sonarqube-webhook".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// "pretty" or "json"
    pub log_format: String,
    pub metrics_enabled: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_format: "pretty".to_string(),
            metrics_enabled: false,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from a variable lookup
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        Ok(Self {
            http_host: get("HTTP_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            http_port: get("HTTP_PORT")
                .unwrap_or_else(|| "8080".to_string())
                .parse()
                .context("Invalid HTTP_PORT")?,
            sonar: SonarConfig {
                installations: installations_from_lookup(&get)?,
                min_server_version: get("SONAR_MIN_SERVER_VERSION")
                    .unwrap_or_else(|| crate::sonar::MINIMUM_SUPPORTED_VERSION.to_string()),
                http_timeout: secs_from_lookup(&get, "SONAR_HTTP_TIMEOUT_SECS", 30)?,
                http_connect_timeout: secs_from_lookup(&get, "SONAR_HTTP_CONNECT_TIMEOUT_SECS", 10)?,
                wait_timeout: secs_from_lookup(&get, "SONAR_WAIT_TIMEOUT_SECS", 300)?,
                poll_interval: secs_from_lookup(&get, "SONAR_POLL_INTERVAL_SECS", 10)?,
            },
            webhook: WebhookConfig {
                path: webhook_path(get("SONAR_WEBHOOK_PATH"))?,
            },
            telemetry: TelemetryConfig {
                log_format: get("LOG_FORMAT").unwrap_or_else(|| "pretty".to_string()),
                metrics_enabled: get("METRICS_ENABLED")
                    .map(|s| s.to_lowercase() == "true")
                    .unwrap_or(false),
            },
        })
    }

    /// Get HTTP server address; IPv6 hosts are bracketed
    pub fn http_addr(&self) -> String {
        if self.http_host.contains(':') && !self.http_host.starts_with('[') {
            format!("[{}]:{}", self.http_host, self.http_port)
        } else {
            format!("{}:{}", self.http_host, self.http_port)
        }
    }
}

fn secs_from_lookup(
    get: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: u64,
) -> Result<Duration> {
    let secs: u64 = match get(key) {
        Some(value) => value
            .trim()
            .parse()
            .with_context(|| format!("Invalid {}", key))?,
        None => default,
    };
    Ok(Duration::from_secs(secs))
}

/// Slashes are trimmed and an empty value falls back to the default.
/// Route syntax is rejected so the path stays a literal segment.
fn webhook_path(raw: Option<String>) -> Result<String> {
    let path = match raw.map(|p| p.trim_matches('/').to_string()) {
        Some(p) if !p.is_empty() => p,
        _ => return Ok(WebhookConfig::default().path),
    };
    if path.contains(|c: char| matches!(c, '*' | '{' | '}')) {
        return Err(anyhow::anyhow!("route syntax is not allowed: {}", path))
            .context("Invalid SONAR_WEBHOOK_PATH");
    }
    Ok(path)
}

/// Installations from `SONAR_INSTALLATIONS` (JSON array) plus the
/// single-installation shorthand `SONAR_HOST_URL` & co.
fn installations_from_lookup(get: &impl Fn(&str) -> Option<String>) -> Result<Vec<Installation>> {
    let mut installations: Vec<Installation> = match get("SONAR_INSTALLATIONS") {
        Some(json) if !json.trim().is_empty() => {
            serde_json::from_str(&json).context("Invalid SONAR_INSTALLATIONS")?
        }
        _ => vec![],
    };

    if let Some(server_url) = get("SONAR_HOST_URL") {
        let name = get("SONAR_INSTALLATION_NAME").unwrap_or_else(|| "default".to_string());
        installations.retain(|i| i.name != name);
        installations.push(Installation {
            name,
            server_url,
            token: get("SONAR_AUTH_TOKEN"),
            login: get("SONAR_LOGIN"),
            password: get("SONAR_PASSWORD"),
        });
    }

    Ok(installations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    fn test_config() -> Config {
        Config {
            http_host: "127.0.0.1".to_string(),
            http_port: 8080,
            sonar: SonarConfig {
                installations: vec![Installation::new("sq", "http://localhost:9000")
                    .with_token("squ_secret_token")],
                ..SonarConfig::default()
            },
            webhook: WebhookConfig::default(),
            telemetry: TelemetryConfig::default(),
        }
    }

    #[test]
    fn test_config_addresses() {
        let config = test_config();
        assert_eq!(config.http_addr(), "127.0.0.1:8080");
    }

    #[test]
    fn test_config_http_addr_ipv6() {
        let mut config = test_config();
        config.http_host = "::1".to_string();
        config.http_port = 3000;

        assert_eq!(config.http_addr(), "[::1]:3000");
        assert!(config.http_addr().parse::<std::net::SocketAddr>().is_ok());
    }

    #[test]
    fn test_from_lookup_defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.http_addr(), "0.0.0.0:8080");
        assert_eq!(config.sonar.poll_interval, Duration::from_secs(10));
        assert_eq!(config.webhook.path, "sonarqube-webhook");
        assert!(config.sonar.installations.is_empty());
    }

    #[test]
    fn test_from_lookup_installations_json() {
        let config = Config::from_lookup(lookup(&[(
            "SONAR_INSTALLATIONS",
            r#"[{"name":"sq","serverUrl":"http://sq:9000","token":"t1"},
                {"name":"legacy","serverUrl":"http://old:9000","login":"admin","password":"pw"}]"#,
        )]))
        .unwrap();

        let installations = &config.sonar.installations;
        assert_eq!(installations.len(), 2);
        assert_eq!(installations[0].name, "sq");
        assert_eq!(installations[0].server_url, "http://sq:9000");
        assert_eq!(installations[0].token.as_deref(), Some("t1"));
        assert_eq!(installations[1].login.as_deref(), Some("admin"));
        assert_eq!(installations[1].password.as_deref(), Some("pw"));
    }

    #[test]
    fn test_from_lookup_host_url_replaces_same_name() {
        let config = Config::from_lookup(lookup(&[
            (
                "SONAR_INSTALLATIONS",
                r#"[{"name":"sq","serverUrl":"http://old:9000"},{"name":"other","serverUrl":"http://other:9000"}]"#,
            ),
            ("SONAR_HOST_URL", "http://new:9000"),
            ("SONAR_INSTALLATION_NAME", "sq"),
            ("SONAR_AUTH_TOKEN", "fresh"),
        ]))
        .unwrap();

        let installations = &config.sonar.installations;
        assert_eq!(installations.len(), 2);
        let sq: Vec<_> = installations.iter().filter(|i| i.name == "sq").collect();
        assert_eq!(sq.len(), 1);
        assert_eq!(sq[0].server_url, "http://new:9000");
        assert_eq!(sq[0].token.as_deref(), Some("fresh"));
        assert!(installations.iter().any(|i| i.name == "other"));
    }

    #[test]
    fn test_from_lookup_host_url_default_name() {
        let config =
            Config::from_lookup(lookup(&[("SONAR_HOST_URL", "http://sq:9000")])).unwrap();
        assert_eq!(config.sonar.installations[0].name, "default");
        assert_eq!(config.sonar.installations[0].token, None);
    }

    #[test]
    fn test_from_lookup_invalid_number_names_variable() {
        let err = Config::from_lookup(lookup(&[("SONAR_POLL_INTERVAL_SECS", "soon")])).unwrap_err();
        assert!(format!("{:#}", err).contains("SONAR_POLL_INTERVAL_SECS"));

        let err = Config::from_lookup(lookup(&[("HTTP_PORT", "http")])).unwrap_err();
        assert!(format!("{:#}", err).contains("HTTP_PORT"));
    }

    #[test]
    fn test_from_lookup_invalid_installations_json() {
        let err = Config::from_lookup(lookup(&[("SONAR_INSTALLATIONS", "[{")])).unwrap_err();
        assert!(format!("{:#}", err).contains("SONAR_INSTALLATIONS"));
    }

    #[test]
    fn test_from_lookup_webhook_path_trimmed() {
        let config =
            Config::from_lookup(lookup(&[("SONAR_WEBHOOK_PATH", "/hooks/quality/")])).unwrap();
        assert_eq!(config.webhook.path, "hooks/quality");

        let config = Config::from_lookup(lookup(&[("SONAR_WEBHOOK_PATH", "//")])).unwrap();
        assert_eq!(config.webhook.path, "sonarqube-webhook");
    }

    #[test]
    fn test_from_lookup_webhook_path_rejects_route_syntax() {
        for path in ["a/*rest", "{x}", "hooks/{id}"] {
            let err = Config::from_lookup(lookup(&[("SONAR_WEBHOOK_PATH", path)])).unwrap_err();
            assert!(format!("{:#}", err).contains("SONAR_WEBHOOK_PATH"), "{}", path);
        }
    }

    #[test]
    fn test_sonar_config_default() {
        let config = SonarConfig::default();
        assert_eq!(config.min_server_version, "5.6");
        assert_eq!(config.http_timeout, Duration::from_secs(30));
        assert_eq!(config.wait_timeout, Duration::from_secs(300));
        assert!(config.installations.is_empty());
    }

    #[test]
    fn test_webhook_config_default() {
        assert_eq!(WebhookConfig::default().path, "sonarqube-webhook");
    }

    #[test]
    fn test_config_debug_hides_token() {
        let config = test_config();
        let debug = format!("{:?}", config);
        assert!(debug.contains("http://localhost:9000"));
        assert!(!debug.contains("squ_secret_token"));
    }

    #[test]
    fn test_telemetry_config_default() {
        let config = TelemetryConfig::default();
        assert_eq!(config.log_format, "pretty");
        assert!(!config.metrics_enabled);
    }
}
