//! Cotacao Quote Server
//!
//! Fetches a foreign-exchange quote from a remote HTTP API, exposes it over a
//! local HTTP endpoint, and optionally persists it. Each pipeline stage runs
//! under its own deadline, derived from (and never exceeding) the inbound
//! request's deadline.

pub mod config;
pub mod fetcher;
pub mod http;
pub mod persister;
pub mod pipeline;

pub use config::ServerConfig;
pub use pipeline::QuotePipeline;

#[cfg(test)]
pub(crate) mod test_support;
