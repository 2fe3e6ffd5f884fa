use serde::Serialize;

/// One ticker row. Crypto reports a 24h move, stocks the move against the
/// previous close; both are percentages.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MarketQuote {
    Crypto {
        symbol: String,
        name: String,
        price: f64,
        #[serde(rename = "change24h")]
        change_24h: f64,
    },
    Stock {
        symbol: String,
        name: String,
        price: f64,
        change: f64,
    },
}

impl MarketQuote {
    pub fn symbol(&self) -> &str {
        match self {
            MarketQuote::Crypto { symbol, .. } | MarketQuote::Stock { symbol, .. } => symbol,
        }
    }
}
