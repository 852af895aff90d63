//! Behavior tests for full poll cycles: rules on disk, scripted prices,
//! recorded notifications and the persisted alert state.

use std::collections::HashMap;
use std::fs;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use stockwatch_core::data_source::PriceFuture;
use stockwatch_core::scheduler::PollReason;
use stockwatch_core::store::{RULES_FILE, SETTINGS_FILE, STATE_FILE};
use stockwatch_core::{
    AlertKind, FailoverController, FileStore, Monitor, ProviderId, QuoteSource,
    RecordingNotifier, SourceError, Symbol, UtcDateTime,
};
use tempfile::TempDir;

/// Quote source whose prices the test moves between cycles.
struct MarketScript {
    id: ProviderId,
    prices: Mutex<HashMap<String, f64>>,
}

impl MarketScript {
    fn new(id: ProviderId) -> Arc<Self> {
        Arc::new(Self {
            id,
            prices: Mutex::new(HashMap::new()),
        })
    }

    fn set(&self, symbol: &str, price: f64) {
        self.prices
            .lock()
            .expect("prices lock")
            .insert(symbol.to_owned(), price);
    }
}

impl QuoteSource for MarketScript {
    fn id(&self) -> ProviderId {
        self.id
    }

    fn fetch_price<'a>(&'a self, symbol: &'a Symbol) -> PriceFuture<'a> {
        let price = self
            .prices
            .lock()
            .expect("prices lock")
            .get(symbol.as_str())
            .copied();
        Box::pin(async move {
            price.ok_or_else(|| SourceError::unavailable(format!("no price for {symbol}")))
        })
    }
}

struct Harness {
    dir: TempDir,
    market: Arc<MarketScript>,
    notifier: Arc<RecordingNotifier>,
    controller: Arc<FailoverController>,
}

impl Harness {
    fn new(rules: &str) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join(RULES_FILE), rules).expect("write rules");
        let market = MarketScript::new(ProviderId::Stockprices);
        let delayed = MarketScript::new(ProviderId::Stooq);
        Self {
            dir,
            controller: Arc::new(FailoverController::new(market.clone(), delayed)),
            market,
            notifier: Arc::new(RecordingNotifier::new()),
        }
    }

    fn store(&self) -> FileStore {
        FileStore::new(self.dir.path())
    }

    fn write(&self, file: &str, body: &str) {
        fs::write(self.dir.path().join(file), body).expect("write file");
    }

    fn read_state(&self) -> serde_json::Value {
        let body = fs::read_to_string(self.dir.path().join(STATE_FILE)).expect("state file");
        serde_json::from_str(&body).expect("state json")
    }

    async fn monitor(&self) -> Monitor {
        self.monitor_with_env(HashMap::new()).await
    }

    async fn monitor_with_env(&self, env: HashMap<&'static str, &'static str>) -> Monitor {
        Monitor::start(self.store(), self.controller.clone(), self.notifier.clone())
            .await
            .with_notification_pause(Duration::ZERO)
            .with_env(move |name| env.get(name).map(|value| (*value).to_owned()))
    }
}

fn at(rfc3339: &str) -> UtcDateTime {
    UtcDateTime::parse(rfc3339).expect("valid timestamp")
}

// =============================================================================
// Alert episodes
// =============================================================================

#[tokio::test]
async fn when_price_crosses_threshold_user_is_notified_once_per_episode() {
    // Given: a below-100 rule and a price already under it
    let harness = Harness::new(r#"{"aapl": 100}"#);
    harness.market.set("AAPL", 95.0);
    let mut monitor = harness.monitor().await;

    // When: two cycles see the same low price
    let first = monitor.run_cycle_at(at("2026-03-02T15:00:00Z")).await;
    let second = monitor.run_cycle_at(at("2026-03-02T15:10:00Z")).await;

    // Then: only the first cycle notifies
    assert_eq!(first.alerts.len(), 1);
    assert_eq!(first.alerts[0].kind, AlertKind::Triggered);
    assert!(second.alerts.is_empty());
    assert_eq!(
        harness.notifier.messages(),
        vec![String::from("Price of stock AAPL: 95.00 (below 100.00)")]
    );

    // And: the episode is persisted
    let state = harness.read_state();
    assert_eq!(state["AAPL"]["inAlert"], true);
    assert_eq!(state["AAPL"]["lastNotifiedAt"], "2026-03-02T15:00:00Z");
}

#[tokio::test]
async fn when_price_recovers_and_crosses_again_a_new_episode_starts() {
    // Given
    let harness = Harness::new(r#"{"TSLA": {"threshold": 300, "direction": "above"}}"#);
    let mut monitor = harness.monitor().await;

    // When: above, back below, above again
    harness.market.set("TSLA", 305.0);
    monitor.run_cycle_at(at("2026-03-02T15:00:00Z")).await;
    harness.market.set("TSLA", 290.0);
    let recovered = monitor.run_cycle_at(at("2026-03-02T15:10:00Z")).await;
    harness.market.set("TSLA", 301.0);
    monitor.run_cycle_at(at("2026-03-02T15:20:00Z")).await;

    // Then
    assert!(recovered.alerts.is_empty());
    assert_eq!(
        harness.notifier.messages(),
        vec![
            String::from("Price of stock TSLA: 305.00 (above 300.00)"),
            String::from("Price of stock TSLA: 301.00 (above 300.00)"),
        ]
    );
}

#[tokio::test]
async fn when_reminders_are_enabled_a_lasting_alert_is_repeated() {
    // Given: hourly reminders from the settings file
    let harness = Harness::new(r#"{"NVDA": 900}"#);
    harness.write(SETTINGS_FILE, r#"{"reminderInterval": "1h"}"#);
    harness.market.set("NVDA", 880.0);
    let mut monitor = harness.monitor().await;

    // When
    let first = monitor.run_cycle_at(at("2026-03-02T15:00:00Z")).await;
    let early = monitor.run_cycle_at(at("2026-03-02T15:30:00Z")).await;
    let due = monitor.run_cycle_at(at("2026-03-02T16:00:00Z")).await;

    // Then
    assert_eq!(first.alerts[0].kind, AlertKind::Triggered);
    assert!(early.alerts.is_empty());
    assert_eq!(due.alerts[0].kind, AlertKind::Reminder);
    assert_eq!(
        harness.notifier.messages().last().map(String::as_str),
        Some("Reminder: Price of stock NVDA: 880.00 (below 900.00)")
    );
}

// =============================================================================
// Failures
// =============================================================================

#[tokio::test]
async fn when_a_quote_fails_the_user_is_told_and_its_state_is_kept() {
    // Given: AMD was in alert in a previous run and has no price now
    let harness = Harness::new(r#"{"AMD": 150, "AAPL": 100}"#);
    harness.write(
        STATE_FILE,
        r#"{"AMD": {"inAlert": true, "lastNotifiedAt": "2026-03-01T10:00:00Z"}}"#,
    );
    harness.market.set("AAPL", 180.0);
    let mut monitor = harness.monitor().await;

    // When
    let report = monitor.run_cycle_at(at("2026-03-02T15:00:00Z")).await;

    // Then
    assert_eq!(report.failures.len(), 1);
    assert_eq!(
        harness.notifier.messages(),
        vec![String::from("Error: no price for AMD")]
    );
    let state = harness.read_state();
    assert_eq!(state["AMD"]["inAlert"], true);
    assert_eq!(state["AAPL"]["inAlert"], false);
}

#[tokio::test]
async fn when_rules_file_is_not_json_state_is_left_alone() {
    // Given: a persisted episode and a rules file cut off mid-write
    let harness = Harness::new(r#"{"AAPL": 100, "MSFT""#);
    let persisted = r#"{"AAPL": true}"#;
    harness.write(STATE_FILE, persisted);
    harness.market.set("AAPL", 95.0);
    let mut monitor = harness.monitor().await;

    // When
    let report = monitor.run_cycle_at(at("2026-03-02T15:00:00Z")).await;

    // Then: one error, no quotes, state file untouched, base interval
    assert_eq!(report.errors.len(), 1);
    assert!(report.quotes.is_empty());
    assert_eq!(report.next_poll.interval, Duration::from_secs(600));
    let messages = harness.notifier.messages();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].starts_with("Error: invalid JSON in "));
    let on_disk = fs::read_to_string(harness.dir.path().join(STATE_FILE)).expect("state");
    assert_eq!(on_disk, persisted);
}

#[tokio::test]
async fn when_one_rule_is_bad_the_other_rules_still_alert() {
    // Given: a bad direction for AAPL next to a valid TSLA rule, and an
    // AAPL episode from an earlier run
    let harness = Harness::new(
        r#"{
            "AAPL": {"threshold": 100, "direction": "sideways"},
            "TSLA": {"threshold": 300, "direction": "above"}
        }"#,
    );
    harness.write(STATE_FILE, r#"{"AAPL": true}"#);
    harness.market.set("AAPL", 95.0);
    harness.market.set("TSLA", 305.0);
    let mut monitor = harness.monitor().await;

    // When
    let report = monitor.run_cycle_at(at("2026-03-02T15:00:00Z")).await;

    // Then: TSLA is quoted and alerts, AAPL is reported and not quoted
    assert_eq!(report.quotes.len(), 1);
    assert_eq!(report.alerts.len(), 1);
    assert_eq!(report.alerts[0].symbol.as_str(), "TSLA");
    assert_eq!(report.errors.len(), 1);
    let messages = harness.notifier.messages();
    assert_eq!(messages.len(), 2);
    assert!(messages[0].starts_with("Error: invalid rule for AAPL: "));
    assert!(messages[0].contains("sideways"));
    assert_eq!(messages[1], "Price of stock TSLA: 305.00 (above 300.00)");

    // And: the AAPL episode survives until its entry is fixed
    assert_eq!(report.pruned, 0);
    let state = harness.read_state();
    assert_eq!(state["AAPL"]["inAlert"], true);
    assert_eq!(state["TSLA"]["inAlert"], true);
}

#[tokio::test]
async fn when_state_file_is_corrupt_monitor_starts_fresh() {
    // Given
    let harness = Harness::new(r#"{"AAPL": 100}"#);
    harness.write(STATE_FILE, "{ definitely not json");

    // When
    let monitor = harness.monitor().await;

    // Then
    assert!(monitor.states().is_empty());
    let messages = harness.notifier.messages();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].starts_with("Error: "));
}

// =============================================================================
// State housekeeping
// =============================================================================

#[tokio::test]
async fn when_a_symbol_leaves_the_rules_its_state_is_dropped() {
    // Given
    let harness = Harness::new(r#"{"AAPL": 100, "MSFT": 400}"#);
    harness.market.set("AAPL", 95.0);
    harness.market.set("MSFT", 390.0);
    let mut monitor = harness.monitor().await;
    monitor.run_cycle_at(at("2026-03-02T15:00:00Z")).await;

    // When: MSFT is removed from the rules file
    harness.write(RULES_FILE, r#"{"AAPL": 100}"#);
    let report = monitor.run_cycle_at(at("2026-03-02T15:10:00Z")).await;

    // Then
    assert_eq!(report.pruned, 1);
    let state = harness.read_state();
    assert!(state.get("MSFT").is_none());
    assert_eq!(state["AAPL"]["inAlert"], true);
}

#[tokio::test]
async fn when_legacy_boolean_state_is_loaded_the_episode_continues() {
    // Given: an old state file saying AAPL already alerted
    let harness = Harness::new(r#"{"AAPL": 100}"#);
    harness.write(STATE_FILE, r#"{"AAPL": true}"#);
    harness.market.set("AAPL", 90.0);
    let mut monitor = harness.monitor().await;

    // When
    let report = monitor.run_cycle_at(at("2026-03-02T15:00:00Z")).await;

    // Then: no duplicate notification for an episode already announced
    assert!(report.alerts.is_empty());
    assert!(harness.notifier.messages().is_empty());
}

// =============================================================================
// Scheduling
// =============================================================================

#[tokio::test]
async fn when_a_price_nears_its_threshold_polling_speeds_up() {
    // Given: AAPL at 1% above a below-100 threshold
    let harness = Harness::new(r#"{"AAPL": 100}"#);
    harness.write(SETTINGS_FILE, r#"{"pollInterval": "15m", "pollNearInterval": "1m"}"#);
    harness.market.set("AAPL", 101.0);
    let mut monitor = harness.monitor().await;

    // When
    let near = monitor.run_cycle_at(at("2026-03-02T15:00:00Z")).await;
    harness.market.set("AAPL", 150.0);
    let far = monitor.run_cycle_at(at("2026-03-02T15:01:00Z")).await;

    // Then
    assert_eq!(near.next_poll.interval, Duration::from_secs(60));
    assert!(matches!(near.next_poll.reason, PollReason::NearThreshold { .. }));
    assert_eq!(far.next_poll.interval, Duration::from_secs(15 * 60));
    assert_eq!(far.next_poll.reason, PollReason::AllFar);
}

#[tokio::test]
async fn when_environment_overrides_settings_the_environment_wins() {
    // Given: the settings file and the environment disagree
    let harness = Harness::new(r#"{"AAPL": 100}"#);
    harness.write(SETTINGS_FILE, r#"{"pollInterval": "15m"}"#);
    harness.market.set("AAPL", 150.0);
    let env = HashMap::from([("STOCKWATCH_POLL_INTERVAL", "5m")]);
    let mut monitor = harness.monitor_with_env(env).await;

    // When
    let report = monitor.run_cycle_at(at("2026-03-02T15:00:00Z")).await;

    // Then
    assert_eq!(report.config.poll_interval, Duration::from_secs(300));
    assert_eq!(report.next_poll.interval, Duration::from_secs(300));
}
