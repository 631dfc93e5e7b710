//! Canonical quote record and its wire envelope.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A foreign-exchange quote as reported by the remote source.
///
/// All price fields are decimal-as-text to preserve the source's precision
/// exactly; no arithmetic is ever performed on them. A `Quote` is immutable
/// once decoded from a successful fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    /// Base currency code (e.g. "USD").
    pub code: String,
    /// Counter currency code (e.g. "BRL").
    pub codein: String,
    /// Human-readable pair name.
    pub name: String,
    /// Day high.
    pub high: String,
    /// Day low.
    pub low: String,
    /// Bid variation.
    #[serde(rename = "varBid")]
    pub var_bid: String,
    /// Percent change.
    #[serde(rename = "pctChange")]
    pub pct_change: String,
    /// Current bid.
    pub bid: String,
    /// Current ask.
    pub ask: String,
    /// Source timestamp (unix seconds as text).
    pub timestamp: String,
    /// Source creation date.
    #[serde(rename = "create_date")]
    pub create_date: String,
}

impl Quote {
    /// Concatenated pair code, matching the envelope key (e.g. "USDBRL").
    pub fn pair(&self) -> String {
        format!("{}{}", self.code, self.codein)
    }
}

/// Wire shape returned by the remote source: a single-key mapping from
/// pair code to the quote payload. Exists only during decode.
#[derive(Debug, Deserialize)]
pub struct RawQuoteEnvelope(HashMap<String, Quote>);

impl RawQuoteEnvelope {
    /// Extract the quote keyed by the given pair code, if present.
    pub fn into_quote(mut self, pair: &str) -> Option<Quote> {
        self.0.remove(pair)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const USDBRL_BODY: &str = r#"{
        "USDBRL": {
            "code": "USD",
            "codein": "BRL",
            "name": "Dólar Americano/Real Brasileiro",
            "high": "5.45",
            "low": "5.38",
            "varBid": "0.02",
            "pctChange": "0.37",
            "bid": "5.43",
            "ask": "5.44",
            "timestamp": "1717782000",
            "create_date": "2024-06-07 14:00:00"
        }
    }"#;

    #[test]
    fn test_envelope_decode() {
        let envelope: RawQuoteEnvelope = serde_json::from_str(USDBRL_BODY).unwrap();
        let quote = envelope.into_quote("USDBRL").unwrap();

        assert_eq!(quote.code, "USD");
        assert_eq!(quote.codein, "BRL");
        assert_eq!(quote.bid, "5.43");
        assert_eq!(quote.ask, "5.44");
        assert_eq!(quote.var_bid, "0.02");
        assert_eq!(quote.pct_change, "0.37");
        assert_eq!(quote.create_date, "2024-06-07 14:00:00");
        assert_eq!(quote.pair(), "USDBRL");
    }

    #[test]
    fn test_envelope_missing_pair() {
        let envelope: RawQuoteEnvelope = serde_json::from_str(USDBRL_BODY).unwrap();
        assert!(envelope.into_quote("EURBRL").is_none());
    }

    #[test]
    fn test_quote_json_round_trip() {
        let envelope: RawQuoteEnvelope = serde_json::from_str(USDBRL_BODY).unwrap();
        let quote = envelope.into_quote("USDBRL").unwrap();

        let encoded = serde_json::to_string(&quote).unwrap();
        let decoded: Quote = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, quote);

        // Wire field names survive re-encoding.
        assert!(encoded.contains("\"varBid\""));
        assert!(encoded.contains("\"pctChange\""));
        assert!(encoded.contains("\"create_date\""));
    }

    #[test]
    fn test_malformed_body_fails_decode() {
        assert!(serde_json::from_str::<RawQuoteEnvelope>("not json").is_err());
        assert!(serde_json::from_str::<RawQuoteEnvelope>(r#"{"USDBRL": {"code": 1}}"#).is_err());
    }
}
