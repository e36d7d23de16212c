//! Application configuration loaded from environment variables.

use std::time::Duration;

use saga::{CircuitBreaker, HotelCallPolicy, RetryPolicy};

/// Default listen port of the hotel service.
pub const HOTEL_SERVICE_PORT: u16 = 8082;

/// Default listen port of the booking service.
pub const BOOKING_SERVICE_PORT: u16 = 8081;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl LogFormat {
    fn parse(raw: &str) -> Self {
        if raw.eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Text
        }
    }
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST` bind address (default: `"0.0.0.0"`)
/// - `PORT` listen port (default: per service)
/// - `RUST_LOG` tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT` `text` or `json` (default: `text`)
/// - `DATABASE_URL` Postgres URL; in-memory stores with demo data when unset
/// - `HOTEL_SERVICE_URL` base URL of the hotel service (default: `http://localhost:8082`)
/// - `HOTEL_RPC_TIMEOUT_MS` per-attempt timeout (default: `2000`)
/// - `HOTEL_RETRY_MAX_ATTEMPTS` attempts per hotel call (default: `3`)
/// - `HOTEL_RETRY_BACKOFF_MS` first backoff delay (default: `100`)
/// - `HOTEL_BREAKER_FAILURE_THRESHOLD` failures that open the breaker (default: `5`)
/// - `HOTEL_BREAKER_OPEN_SECS` breaker cool-down (default: `10`)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub database_url: Option<String>,
    pub hotel_service_url: String,
    pub hotel_rpc_timeout: Duration,
    pub retry_max_attempts: u32,
    pub retry_backoff: Duration,
    pub breaker_failure_threshold: u32,
    pub breaker_open_for: Duration,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env(default_port: u16) -> Self {
        Self::from_lookup(default_port, |key| std::env::var(key).ok())
    }

    /// Loads configuration from `lookup`; unparsable values fall back to defaults.
    pub fn from_lookup(default_port: u16, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::with_port(default_port);
        let number = |key: &str| lookup(key).and_then(|v| v.trim().parse::<u64>().ok());

        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: lookup("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            log_format: lookup("LOG_FORMAT")
                .map(|v| LogFormat::parse(&v))
                .unwrap_or(defaults.log_format),
            database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            hotel_service_url: lookup("HOTEL_SERVICE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.hotel_service_url),
            hotel_rpc_timeout: number("HOTEL_RPC_TIMEOUT_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.hotel_rpc_timeout),
            retry_max_attempts: number("HOTEL_RETRY_MAX_ATTEMPTS")
                .and_then(|n| u32::try_from(n).ok())
                .unwrap_or(defaults.retry_max_attempts),
            retry_backoff: number("HOTEL_RETRY_BACKOFF_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.retry_backoff),
            breaker_failure_threshold: number("HOTEL_BREAKER_FAILURE_THRESHOLD")
                .and_then(|n| u32::try_from(n).ok())
                .unwrap_or(defaults.breaker_failure_threshold),
            breaker_open_for: number("HOTEL_BREAKER_OPEN_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.breaker_open_for),
        }
    }

    /// Defaults with the given listen port.
    pub fn with_port(port: u16) -> Self {
        Self {
            port,
            ..Self::default()
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Builds the retry, breaker and timeout policy for hotel calls.
    pub fn hotel_call_policy(&self) -> HotelCallPolicy {
        HotelCallPolicy::new(
            RetryPolicy::new(self.retry_max_attempts, self.retry_backoff),
            CircuitBreaker::new(
                "hotel-service",
                self.breaker_failure_threshold,
                self.breaker_open_for,
            ),
            self.hotel_rpc_timeout,
        )
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: BOOKING_SERVICE_PORT,
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            database_url: None,
            hotel_service_url: format!("http://localhost:{HOTEL_SERVICE_PORT}"),
            hotel_rpc_timeout: Duration::from_millis(2000),
            retry_max_attempts: 3,
            retry_backoff: Duration::from_millis(100),
            breaker_failure_threshold: 5,
            breaker_open_for: Duration::from_secs(10),
        }
    }
}
