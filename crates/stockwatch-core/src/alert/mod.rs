//! Alert rules and the per-symbol notification state machine.
//!
//! [`rule`] decides whether a price is "in alert" for a rule. [`state`]
//! turns that boolean into at most one notification per alert episode, plus
//! optional reminders while the episode lasts.

pub mod rule;
pub mod state;

pub use rule::{
    is_triggered, percent_distance, AlertRule, Direction, RejectedRule, RuleEncoding, RuleSet,
    FAR_DISTANCE_PERCENT,
};
pub use state::{advance, AlertKind, AlertStates, SymbolAlertState};
