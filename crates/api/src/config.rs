//! Application configuration loaded from environment variables.

use std::time::Duration;

use booking::{HttpInventoryClientConfig, RetryPolicy};

/// Default port of the booking service.
pub const BOOKING_DEFAULT_PORT: u16 = 3000;
/// Default port of the inventory service.
pub const INVENTORY_DEFAULT_PORT: u16 = 3001;

/// Service configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`, `PORT`: bind address (default `0.0.0.0` and the service's port)
/// - `RUST_LOG`: tracing filter directive (default `"info"`)
/// - `DATABASE_URL`: PostgreSQL connection string; in-memory stores when unset
/// - `SERVICE_TOKEN`: bearer credential between the services
/// - `INVENTORY_BASE_URL`, `INVENTORY_RETRY_MAX_ATTEMPTS`,
///   `INVENTORY_RETRY_BACKOFF_MS`, `INVENTORY_CONNECT_TIMEOUT_MS`,
///   `INVENTORY_READ_TIMEOUT_MS`: remote inventory client
/// - `SEED_DEMO_ROOMS`: load demo rooms into an empty inventory
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub database_url: Option<String>,
    pub service_token: String,
    pub inventory: InventoryClientSettings,
    pub seed_demo_rooms: bool,
}

/// How the booking service reaches the inventory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryClientSettings {
    pub base_url: String,
    pub max_attempts: u32,
    pub backoff: Vec<Duration>,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
}

impl Default for InventoryClientSettings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:3001".to_string(),
            max_attempts: 3,
            backoff: RetryPolicy::default().backoff().to_vec(),
            connect_timeout: Duration::from_millis(2000),
            read_timeout: Duration::from_millis(3000),
        }
    }
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env(default_port: u16) -> Self {
        Self::from_lookup(default_port, |key| std::env::var(key).ok())
    }

    /// Builds configuration from an arbitrary key lookup.
    pub fn from_lookup(default_port: u16, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::with_port(default_port);
        let parsed = |key: &str| lookup(key).and_then(|v| v.trim().parse::<u64>().ok());

        let inventory = InventoryClientSettings {
            base_url: lookup("INVENTORY_BASE_URL").unwrap_or(defaults.inventory.base_url),
            max_attempts: parsed("INVENTORY_RETRY_MAX_ATTEMPTS")
                .map(|n| u32::try_from(n).unwrap_or(u32::MAX).max(1))
                .unwrap_or(defaults.inventory.max_attempts),
            backoff: lookup("INVENTORY_RETRY_BACKOFF_MS")
                .map(|csv| RetryPolicy::parse_backoff(&csv))
                .unwrap_or(defaults.inventory.backoff),
            connect_timeout: parsed("INVENTORY_CONNECT_TIMEOUT_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.inventory.connect_timeout),
            read_timeout: parsed("INVENTORY_READ_TIMEOUT_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.inventory.read_timeout),
        };

        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: lookup("PORT")
                .and_then(|p| p.trim().parse().ok())
                .unwrap_or(defaults.port),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            service_token: lookup("SERVICE_TOKEN").unwrap_or(defaults.service_token),
            inventory,
            seed_demo_rooms: lookup("SEED_DEMO_ROOMS")
                .map(|v| !matches!(v.trim().to_ascii_lowercase().as_str(), "false" | "0" | "no"))
                .unwrap_or(defaults.seed_demo_rooms),
        }
    }

    /// Defaults for a service listening on `port`.
    pub fn with_port(port: u16) -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port,
            log_level: "info".to_string(),
            database_url: None,
            service_token: "dev-service-token".to_string(),
            inventory: InventoryClientSettings::default(),
            seed_demo_rooms: true,
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Settings for the booking service's inventory client.
    pub fn inventory_client(&self) -> HttpInventoryClientConfig {
        HttpInventoryClientConfig::new(&self.inventory.base_url, &self.service_token)
            .with_retry(RetryPolicy::new(
                self.inventory.max_attempts,
                self.inventory.backoff.clone(),
            ))
            .with_timeouts(self.inventory.connect_timeout, self.inventory.read_timeout)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::with_port(BOOKING_DEFAULT_PORT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_values() {
        let config = Config::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.log_level, "info");
        assert!(config.database_url.is_none());
        assert_eq!(config.service_token, "dev-service-token");
        assert!(config.seed_demo_rooms);
        assert_eq!(config.inventory.max_attempts, 3);
        assert_eq!(
            config.inventory.backoff,
            vec![
                Duration::from_millis(200),
                Duration::from_millis(500),
                Duration::from_millis(1000)
            ]
        );
    }

    #[test]
    fn test_addr_formatting() {
        let config = Config {
            host: "127.0.0.1".to_string(),
            ..Config::with_port(8080)
        };
        assert_eq!(config.addr(), "127.0.0.1:8080");
    }

    #[test]
    fn test_service_default_port_applies_without_override() {
        let config = Config::from_lookup(INVENTORY_DEFAULT_PORT, lookup(&[]));
        assert_eq!(config.addr(), "0.0.0.0:3001");
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(
            BOOKING_DEFAULT_PORT,
            lookup(&[
                ("PORT", "9000"),
                ("DATABASE_URL", "postgres://localhost/booking"),
                ("INVENTORY_BASE_URL", "http://inventory:3001"),
                ("INVENTORY_RETRY_MAX_ATTEMPTS", "5"),
                ("INVENTORY_RETRY_BACKOFF_MS", "10,20"),
                ("INVENTORY_READ_TIMEOUT_MS", "750"),
                ("SEED_DEMO_ROOMS", "false"),
            ]),
        );

        assert_eq!(config.port, 9000);
        assert_eq!(config.database_url.as_deref(), Some("postgres://localhost/booking"));
        assert_eq!(config.inventory.base_url, "http://inventory:3001");
        assert_eq!(config.inventory.max_attempts, 5);
        assert_eq!(
            config.inventory.backoff,
            vec![Duration::from_millis(10), Duration::from_millis(20)]
        );
        assert_eq!(config.inventory.read_timeout, Duration::from_millis(750));
        assert_eq!(config.inventory.connect_timeout, Duration::from_millis(2000));
        assert!(!config.seed_demo_rooms);
    }

    #[test]
    fn test_bad_values_fall_back() {
        let config = Config::from_lookup(
            BOOKING_DEFAULT_PORT,
            lookup(&[
                ("PORT", "not-a-port"),
                ("INVENTORY_RETRY_MAX_ATTEMPTS", "0"),
                ("INVENTORY_RETRY_BACKOFF_MS", "fast"),
                ("DATABASE_URL", " "),
            ]),
        );

        assert_eq!(config.port, 3000);
        assert_eq!(config.inventory.max_attempts, 1);
        assert_eq!(config.inventory.backoff.len(), 3);
        assert!(config.database_url.is_none());
    }
}
