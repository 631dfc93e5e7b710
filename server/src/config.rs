//! Server configuration.

use std::time::Duration;

/// Per-stage time budgets.
///
/// The persist budget is deliberately far smaller than the fetch budget: a
/// slow store must not be allowed to dominate request latency. `validate`
/// enforces the relationship so it stays an invariant, not a tuning accident.
#[derive(Debug, Clone)]
pub struct StageBudgets {
    /// Maximum duration of the remote fetch stage.
    pub fetch: Duration,
    /// Maximum duration of the persist stage.
    pub persist: Duration,
}

impl Default for StageBudgets {
    fn default() -> Self {
        Self {
            fetch: Duration::from_millis(200),
            persist: Duration::from_millis(10),
        }
    }
}

/// Body shape returned by `GET /cotacao`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFormat {
    /// Plain-text bid value only.
    BidText,
    /// The full quote record as JSON.
    QuoteJson,
}

/// Main server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Listen address.
    pub listen_addr: String,
    /// Listen port.
    pub listen_port: u16,
    /// Remote quote source URL.
    pub quote_url: String,
    /// Currency pair key expected in the source envelope.
    pub pair: String,
    /// Per-stage budgets.
    pub budgets: StageBudgets,
    /// Overall deadline applied to each inbound request, if any.
    pub request_timeout: Option<Duration>,
    /// Database URL; `None` runs fetch-only (persistence disabled).
    pub database_url: Option<String>,
    /// Response body shape.
    pub response_format: ResponseFormat,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0".to_string(),
            listen_port: 8080,
            quote_url: "https://economia.awesomeapi.com.br/json/last/USD-BRL".to_string(),
            pair: "USDBRL".to_string(),
            budgets: StageBudgets::default(),
            request_timeout: None,
            database_url: None,
            response_format: ResponseFormat::BidText,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("COTACAO_LISTEN_ADDR") {
            config.listen_addr = addr;
        }

        if let Ok(port) = std::env::var("COTACAO_LISTEN_PORT") {
            if let Ok(port) = port.parse() {
                config.listen_port = port;
            }
        }

        if let Ok(url) = std::env::var("COTACAO_QUOTE_URL") {
            config.quote_url = url;
        }

        if let Ok(pair) = std::env::var("COTACAO_PAIR") {
            config.pair = pair;
        }

        if let Some(ms) = env_millis("COTACAO_FETCH_TIMEOUT_MS") {
            config.budgets.fetch = ms;
        }

        if let Some(ms) = env_millis("COTACAO_PERSIST_TIMEOUT_MS") {
            config.budgets.persist = ms;
        }

        if let Some(ms) = env_millis("COTACAO_REQUEST_TIMEOUT_MS") {
            config.request_timeout = Some(ms);
        }

        if let Ok(url) = std::env::var("DATABASE_URL") {
            config.database_url = Some(url);
        }

        if let Ok(format) = std::env::var("COTACAO_RESPONSE_FORMAT") {
            if format.eq_ignore_ascii_case("json") {
                config.response_format = ResponseFormat::QuoteJson;
            }
        }

        config
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.listen_port == 0 {
            return Err("Listen port cannot be 0".to_string());
        }

        if self.quote_url.is_empty() {
            return Err("Quote URL cannot be empty".to_string());
        }

        if self.pair.is_empty() {
            return Err("Pair code cannot be empty".to_string());
        }

        if self.budgets.fetch.is_zero() {
            return Err("Fetch budget cannot be zero".to_string());
        }

        if self.budgets.persist >= self.budgets.fetch {
            return Err("Persist budget must be smaller than fetch budget".to_string());
        }

        Ok(())
    }
}

fn env_millis(key: &str) -> Option<Duration> {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .map(Duration::from_millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.budgets.persist < config.budgets.fetch);
    }

    #[test]
    fn test_zero_port_rejected() {
        let mut config = ServerConfig::default();
        config.listen_port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_persist_budget_must_stay_below_fetch_budget() {
        let mut config = ServerConfig::default();
        config.budgets.persist = config.budgets.fetch;
        assert!(config.validate().is_err());

        config.budgets.persist = config.budgets.fetch + Duration::from_millis(1);
        assert!(config.validate().is_err());
    }
}
