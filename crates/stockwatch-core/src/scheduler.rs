use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::time::Duration;

use crate::alert::RuleSet;
use crate::Symbol;

/// Why the scheduler picked an interval.
#[derive(Debug, Clone, PartialEq)]
pub enum PollReason {
    NoQuotes,
    Triggered {
        symbol: Symbol,
    },
    NearThreshold {
        symbol: Symbol,
        distance_percent: f64,
        threshold_percent: f64,
    },
    AllFar,
}

impl Display for PollReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoQuotes => f.write_str("no successful quotes"),
            Self::Triggered { symbol } => write!(f, "{symbol} is in alert"),
            Self::NearThreshold {
                symbol,
                distance_percent,
                threshold_percent,
            } => write!(
                f,
                "{symbol} is {distance_percent:.2}% from its threshold (near at {threshold_percent}%)"
            ),
            Self::AllFar => f.write_str("all symbols far from threshold"),
        }
    }
}

/// Delay before the next poll cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct PollDecision {
    pub interval: Duration,
    pub reason: PollReason,
}

/// Poll fast only when a state change looks imminent.
///
/// Symbols with a price but no rule are ignored. When several symbols
/// qualify, the one cited in the reason is the first in symbol order.
pub fn next_interval(
    prices: &BTreeMap<Symbol, f64>,
    rules: &RuleSet,
    base_interval: Duration,
    near_interval: Duration,
    near_threshold_percent: f64,
) -> PollDecision {
    if prices.is_empty() {
        return PollDecision {
            interval: base_interval,
            reason: PollReason::NoQuotes,
        };
    }

    let priced_rules: Vec<_> = prices
        .iter()
        .filter_map(|(symbol, price)| rules.get(symbol).map(|rule| (symbol, *price, rule)))
        .collect();

    if let Some((symbol, _, _)) = priced_rules
        .iter()
        .find(|(_, price, rule)| rule.is_triggered(*price))
    {
        return PollDecision {
            interval: near_interval,
            reason: PollReason::Triggered {
                symbol: (*symbol).clone(),
            },
        };
    }

    let nearest = priced_rules
        .iter()
        .map(|(symbol, price, rule)| (*symbol, rule.percent_distance(*price)))
        .find(|(_, distance)| *distance <= near_threshold_percent);
    if let Some((symbol, distance_percent)) = nearest {
        return PollDecision {
            interval: near_interval,
            reason: PollReason::NearThreshold {
                symbol: symbol.clone(),
                distance_percent,
                threshold_percent: near_threshold_percent,
            },
        };
    }

    PollDecision {
        interval: base_interval,
        reason: PollReason::AllFar,
    }
}
