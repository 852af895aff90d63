//! Provider adapters.
//!
//! | Adapter | Provider | Freshness | Symbols |
//! |---------|----------|-----------|---------|
//! | [`StockpricesAdapter`] | stockprices.dev | real-time | undecorated domestic tickers |
//! | [`StooqAdapter`] | Stooq | delayed | any, via market suffix |

pub mod stockprices;
pub mod stooq;

pub use stockprices::{InstrumentKind, StockpricesAdapter};
pub use stooq::StooqAdapter;
