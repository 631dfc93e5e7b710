//! Shared fixtures for unit tests.

use cotacao_common::Quote;

pub(crate) fn sample_quote() -> Quote {
    Quote {
        code: "USD".to_string(),
        codein: "BRL".to_string(),
        name: "Dólar Americano/Real Brasileiro".to_string(),
        high: "5.45".to_string(),
        low: "5.38".to_string(),
        var_bid: "0.02".to_string(),
        pct_change: "0.37".to_string(),
        bid: "5.43".to_string(),
        ask: "5.44".to_string(),
        timestamp: "1717782000".to_string(),
        create_date: "2024-06-07 14:00:00".to_string(),
    }
}
