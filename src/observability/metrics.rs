//! Prometheus metrics.

use crate::config::MetricsSettings;
use crate::{Error, Result};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

/// Default port for the Prometheus scrape endpoint.
pub const DEFAULT_METRICS_PORT: u16 = 9090;

/// Metrics configuration.
///
/// # Environment Variables
///
/// | Variable | Description |
/// |----------|-------------|
/// | `DUPCHECK_METRICS_ENABLED` | `true`/`1`/`yes` to enable |
/// | `DUPCHECK_METRICS_PORT` | Scrape endpoint port |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsConfig {
    /// Whether metrics are enabled.
    pub enabled: bool,
    /// Address to bind the metrics exporter.
    pub listen_addr: SocketAddr,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), DEFAULT_METRICS_PORT),
        }
    }
}

impl MetricsConfig {
    /// Builds metrics configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_settings(None)
    }

    /// Builds metrics configuration from config settings with env overrides.
    #[must_use]
    pub fn from_settings(settings: Option<&MetricsSettings>) -> Self {
        let enabled = settings.and_then(|config| config.enabled).unwrap_or(false);
        let port = settings
            .and_then(|config| config.port)
            .unwrap_or(DEFAULT_METRICS_PORT);

        let mut config = Self {
            enabled,
            listen_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port),
        };

        if let Some(enabled) = parse_bool_env("DUPCHECK_METRICS_ENABLED") {
            config.enabled = enabled;
        }
        if let Some(port) = parse_port_env("DUPCHECK_METRICS_PORT") {
            config.listen_addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port);
        }

        config
    }
}

/// Installs the Prometheus recorder.
///
/// With `expose` the scrape endpoint listens on `listen_addr`; the exporter
/// runs on its own background thread. Returns `None` when metrics are
/// disabled.
///
/// # Errors
///
/// Returns an error if a recorder is already installed or the listener
/// cannot bind.
pub fn install_prometheus(config: &MetricsConfig, expose: bool) -> Result<Option<PrometheusHandle>> {
    if !config.enabled {
        return Ok(None);
    }

    if expose {
        let builder = PrometheusBuilder::new().with_http_listener(config.listen_addr);
        builder.install().map_err(|e| Error::OperationFailed {
            operation: "metrics_listener_install".to_string(),
            cause: e.to_string(),
        })?;
        tracing::info!(addr = %config.listen_addr, "Prometheus metrics endpoint listening");
        return Ok(None);
    }

    PrometheusBuilder::new()
        .install_recorder()
        .map(Some)
        .map_err(|e| Error::OperationFailed {
            operation: "metrics_recorder_install".to_string(),
            cause: e.to_string(),
        })
}

fn parse_bool_env(key: &str) -> Option<bool> {
    std::env::var(key).ok().map(|value| {
        let value = value.to_lowercase();
        value == "true" || value == "1" || value == "yes"
    })
}

fn parse_port_env(key: &str) -> Option<u16> {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_by_default() {
        let config = MetricsConfig::default();
        assert!(!config.enabled);
        assert_eq!(config.listen_addr.port(), 9090);
    }

    #[test]
    fn test_from_settings() {
        if std::env::var("DUPCHECK_METRICS_ENABLED").is_ok()
            || std::env::var("DUPCHECK_METRICS_PORT").is_ok()
        {
            return;
        }
        let settings = MetricsSettings {
            enabled: Some(true),
            port: Some(9464),
        };
        let config = MetricsConfig::from_settings(Some(&settings));
        assert!(config.enabled);
        assert_eq!(config.listen_addr.port(), 9464);
    }

    #[test]
    fn test_install_disabled_is_noop() {
        let handle = install_prometheus(&MetricsConfig::default(), true).unwrap();
        assert!(handle.is_none());
    }
}
