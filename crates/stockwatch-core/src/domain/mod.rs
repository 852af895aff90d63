//! # Domain Models
//!
//! Canonical types shared by the quote layer and the alert engine.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Symbol`] | Validated ticker with optional market suffix |
//! | [`Quote`] | Price fetched from one provider during a cycle |
//! | [`UtcDateTime`] | UTC timestamp, RFC3339 on the wire |
//!
//! All types enforce their invariants at construction time, so an invalid
//! ticker or a non-finite price never reaches the alert engine.

mod models;
mod symbol;
mod timestamp;

pub use models::Quote;
pub use symbol::{
    normalize_for_delayed, normalize_for_primary, Symbol, DOMESTIC_MARKET_SUFFIX,
    MARKET_DELIMITER,
};
pub use timestamp::UtcDateTime;
