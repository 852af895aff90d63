use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{Symbol, UtcDateTime};

/// Persisted alert status of one symbol.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "StateEncoding", rename_all = "camelCase")]
pub struct SymbolAlertState {
    pub in_alert: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_notified_at: Option<UtcDateTime>,
}

impl SymbolAlertState {
    pub const fn clear() -> Self {
        Self {
            in_alert: false,
            last_notified_at: None,
        }
    }

    pub const fn alerted_at(at: UtcDateTime) -> Self {
        Self {
            in_alert: true,
            last_notified_at: Some(at),
        }
    }
}

/// Older state files stored a bare boolean per symbol.
#[derive(Deserialize)]
#[serde(untagged)]
enum StateEncoding {
    Legacy(bool),
    Structured(StructuredState),
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StructuredState {
    #[serde(default)]
    in_alert: bool,
    #[serde(default)]
    last_notified_at: Option<UtcDateTime>,
}

impl From<StateEncoding> for SymbolAlertState {
    fn from(value: StateEncoding) -> Self {
        match value {
            StateEncoding::Legacy(in_alert) => Self {
                in_alert,
                last_notified_at: None,
            },
            StateEncoding::Structured(state) => Self {
                in_alert: state.in_alert,
                last_notified_at: state.last_notified_at,
            },
        }
    }
}

/// Why a notification is due this cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertKind {
    /// First cycle of a new alert episode.
    Triggered,
    /// Still in alert and the reminder interval has elapsed.
    Reminder,
}

/// Step the alert state machine for one symbol.
///
/// Returns the next state and whether a notification is due. A zero
/// `reminder_interval` disables reminders, so an episode notifies once.
pub fn advance(
    previous: Option<&SymbolAlertState>,
    triggered: bool,
    reminder_interval: Duration,
    now: UtcDateTime,
) -> (SymbolAlertState, Option<AlertKind>) {
    if !triggered {
        return (SymbolAlertState::clear(), None);
    }

    let previous = match previous {
        Some(previous) if previous.in_alert => *previous,
        _ => return (SymbolAlertState::alerted_at(now), Some(AlertKind::Triggered)),
    };

    if reminder_interval.is_zero() {
        return (previous, None);
    }

    let due = previous
        .last_notified_at
        .map_or(true, |last| now.saturating_since(last) >= reminder_interval);
    if due {
        (SymbolAlertState::alerted_at(now), Some(AlertKind::Reminder))
    } else {
        (previous, None)
    }
}

/// Alert state for every watched symbol, persisted between runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlertStates {
    states: BTreeMap<Symbol, SymbolAlertState>,
}

impl AlertStates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, symbol: &Symbol) -> Option<&SymbolAlertState> {
        self.states.get(symbol)
    }

    /// Advance `symbol` and store the resulting state.
    pub fn evaluate(
        &mut self,
        symbol: &Symbol,
        triggered: bool,
        reminder_interval: Duration,
        now: UtcDateTime,
    ) -> Option<AlertKind> {
        let (next, notify) = advance(self.states.get(symbol), triggered, reminder_interval, now);
        self.states.insert(symbol.clone(), next);
        notify
    }

    /// Drop symbols for which `keep` is false; returns how many went.
    pub fn retain_where(&mut self, mut keep: impl FnMut(&Symbol) -> bool) -> usize {
        let before = self.states.len();
        self.states.retain(|symbol, _| keep(symbol));
        before - self.states.len()
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Symbol, &SymbolAlertState)> {
        self.states.iter()
    }
}

impl FromIterator<(Symbol, SymbolAlertState)> for AlertStates {
    fn from_iter<I: IntoIterator<Item = (Symbol, SymbolAlertState)>>(iter: I) -> Self {
        Self {
            states: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::{AlertRule, RuleSet};

    const HOUR: Duration = Duration::from_secs(3_600);

    fn t0() -> UtcDateTime {
        UtcDateTime::parse("2024-03-01T14:00:00Z").expect("valid timestamp")
    }

    fn symbol(raw: &str) -> Symbol {
        Symbol::parse(raw).expect("valid symbol")
    }

    #[test]
    fn not_triggered_clears_state_and_stays_silent() {
        let stale = SymbolAlertState::alerted_at(t0());
        let (next, notify) = advance(Some(&stale), false, HOUR, t0());

        assert_eq!(next, SymbolAlertState::clear());
        assert_eq!(notify, None);
    }

    #[test]
    fn debounce_notifies_once_per_episode() {
        let mut states = AlertStates::new();
        let aapl = symbol("AAPL");
        let mut now = t0();

        let mut fired = Vec::new();
        for triggered in [true, true, true, false, true, true] {
            fired.push(states.evaluate(&aapl, triggered, Duration::ZERO, now));
            now = now.saturating_add(HOUR);
        }

        assert_eq!(
            fired,
            vec![
                Some(AlertKind::Triggered),
                None,
                None,
                None,
                Some(AlertKind::Triggered),
                None,
            ]
        );
    }

    #[test]
    fn reminders_follow_interval() {
        let mut states = AlertStates::new();
        let aapl = symbol("AAPL");
        let interval = 2 * HOUR;

        assert_eq!(
            states.evaluate(&aapl, true, interval, t0()),
            Some(AlertKind::Triggered)
        );
        assert_eq!(states.evaluate(&aapl, true, interval, t0().saturating_add(HOUR)), None);
        assert_eq!(
            states.evaluate(&aapl, true, interval, t0().saturating_add(2 * HOUR)),
            Some(AlertKind::Reminder)
        );
        assert_eq!(
            states.get(&aapl).and_then(|state| state.last_notified_at),
            Some(t0().saturating_add(2 * HOUR))
        );
    }

    #[test]
    fn legacy_in_alert_without_timestamp_gets_reminder_immediately() {
        let legacy = SymbolAlertState {
            in_alert: true,
            last_notified_at: None,
        };

        let (next, notify) = advance(Some(&legacy), true, HOUR, t0());
        assert_eq!(notify, Some(AlertKind::Reminder));
        assert_eq!(next, SymbolAlertState::alerted_at(t0()));

        let (unchanged, silent) = advance(Some(&legacy), true, Duration::ZERO, t0());
        assert_eq!(silent, None);
        assert_eq!(unchanged, legacy);
    }

    #[test]
    fn removed_symbols_are_garbage_collected() {
        let mut states: AlertStates = [
            (symbol("AAPL"), SymbolAlertState::alerted_at(t0())),
            (symbol("MSFT"), SymbolAlertState::clear()),
        ]
        .into_iter()
        .collect();
        let rules: RuleSet = [(symbol("AAPL"), AlertRule::below(100.0).expect("valid"))]
            .into_iter()
            .collect();

        assert_eq!(states.retain_where(|symbol| rules.contains(symbol)), 1);
        assert!(states.get(&symbol("MSFT")).is_none());
        assert!(states.get(&symbol("AAPL")).is_some());
    }

    #[test]
    fn decodes_legacy_and_structured_entries() {
        let states: AlertStates = serde_json::from_str(
            r#"{"AAPL": true, "MSFT": false, "TSLA": {"inAlert": true, "lastNotifiedAt": "2024-03-01T14:00:00Z"}}"#,
        )
        .expect("valid state json");

        assert_eq!(
            states.get(&symbol("AAPL")),
            Some(&SymbolAlertState {
                in_alert: true,
                last_notified_at: None,
            })
        );
        assert_eq!(states.get(&symbol("MSFT")), Some(&SymbolAlertState::clear()));
        assert_eq!(
            states.get(&symbol("TSLA")),
            Some(&SymbolAlertState::alerted_at(t0()))
        );
    }

    #[test]
    fn encodes_structured_entries_only() {
        let states: AlertStates = [
            (symbol("AAPL"), SymbolAlertState::alerted_at(t0())),
            (symbol("MSFT"), SymbolAlertState::clear()),
        ]
        .into_iter()
        .collect();

        let json = serde_json::to_string(&states).expect("serialize");
        assert_eq!(
            json,
            r#"{"AAPL":{"inAlert":true,"lastNotifiedAt":"2024-03-01T14:00:00Z"},"MSFT":{"inAlert":false}}"#
        );
    }
}
