use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// Upstream quote providers, in failover order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    /// stockprices.dev, real-time, undecorated domestic tickers only.
    Stockprices,
    /// Stooq, delayed, any market via explicit suffix.
    Stooq,
}

impl ProviderId {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stockprices => "stockprices",
            Self::Stooq => "stooq",
        }
    }
}

impl Display for ProviderId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
