use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{error, info, warn};

use crate::alert::{AlertKind, AlertRule, AlertStates};
use crate::config::{self, RuntimeConfig};
use crate::data_source::SourceError;
use crate::notify::Notifier;
use crate::routing::FailoverController;
use crate::scheduler::{next_interval, PollDecision, PollReason};
use crate::store::{FileStore, LoadedRules};
use crate::{ProviderId, Quote, Symbol, UtcDateTime};

/// Pause after each alert so the OS notification centre can clear the last one.
pub const DEFAULT_NOTIFICATION_PAUSE: Duration = Duration::from_secs(2);

type EnvLookup = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// An alert that is due this cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertNotification {
    pub symbol: Symbol,
    pub kind: AlertKind,
    pub price: f64,
    pub rule: AlertRule,
    pub source: ProviderId,
}

impl AlertNotification {
    pub fn message(&self) -> String {
        let prefix = match self.kind {
            AlertKind::Triggered => "",
            AlertKind::Reminder => "Reminder: ",
        };
        format!(
            "{prefix}Price of stock {}: {:.2} ({} {:.2})",
            self.symbol,
            self.price,
            self.rule.direction(),
            self.rule.threshold()
        )
    }
}

/// Everything one poll cycle observed and decided.
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub config: RuntimeConfig,
    pub quotes: BTreeMap<Symbol, Quote>,
    pub failures: BTreeMap<Symbol, SourceError>,
    pub alerts: Vec<AlertNotification>,
    /// State entries dropped because their symbol left the rule set.
    pub pruned: usize,
    /// Rules, settings or state file problems, including rejected rule entries.
    pub errors: Vec<String>,
    pub next_poll: PollDecision,
}

/// Runs poll cycles: resolve prices, step alert state, persist, notify.
pub struct Monitor {
    store: FileStore,
    controller: Arc<FailoverController>,
    notifier: Arc<dyn Notifier>,
    states: AlertStates,
    notification_pause: Duration,
    env: EnvLookup,
}

impl Monitor {
    pub fn new(
        store: FileStore,
        controller: Arc<FailoverController>,
        notifier: Arc<dyn Notifier>,
        states: AlertStates,
    ) -> Self {
        Self {
            store,
            controller,
            notifier,
            states,
            notification_pause: DEFAULT_NOTIFICATION_PAUSE,
            env: Box::new(|name| std::env::var(name).ok()),
        }
    }

    /// Build a monitor with the persisted alert state. A corrupt state file is
    /// reported and replaced by an empty state.
    pub async fn start(
        store: FileStore,
        controller: Arc<FailoverController>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let states = match store.load_state() {
            Ok(states) => states,
            Err(err) => {
                error!(error = %err, "starting with empty alert state");
                if let Err(notify_error) = notifier.notify(&format!("Error: {err}")).await {
                    warn!(error = %notify_error, "notify error");
                }
                AlertStates::new()
            }
        };
        Self::new(store, controller, notifier, states)
    }

    pub fn with_notification_pause(mut self, pause: Duration) -> Self {
        self.notification_pause = pause;
        self
    }

    /// Replace the environment lookup used to resolve overrides.
    pub fn with_env<F>(mut self, env: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        self.env = Box::new(env);
        self
    }

    pub fn states(&self) -> &AlertStates {
        &self.states
    }

    pub async fn run_cycle(&mut self) -> CycleReport {
        self.run_cycle_at(UtcDateTime::now()).await
    }

    pub async fn run_cycle_at(&mut self, now: UtcDateTime) -> CycleReport {
        let mut errors = Vec::new();

        let settings = self.store.load_settings().unwrap_or_else(|err| {
            error!(error = %err, "using default settings");
            errors.push(err.to_string());
            Default::default()
        });
        let config = config::resolve(&settings, &self.env);

        let loaded = match self.store.load_rules() {
            Ok(loaded) => loaded,
            Err(err) => {
                // Without a rule set there is nothing to evaluate and no safe
                // basis for pruning state, so the cycle stops here.
                error!(error = %err, "cannot load rules");
                errors.push(err.to_string());
                self.deliver_errors(&errors).await;
                return CycleReport {
                    config,
                    quotes: BTreeMap::new(),
                    failures: BTreeMap::new(),
                    alerts: Vec::new(),
                    pruned: 0,
                    errors,
                    next_poll: PollDecision {
                        interval: config.poll_interval,
                        reason: PollReason::NoQuotes,
                    },
                };
            }
        };

        for entry in &loaded.rejected {
            error!(key = %entry.key, error = %entry.error, "skipping rule");
            errors.push(entry.to_string());
        }
        let rules = &loaded.rules;

        let results = self
            .controller
            .resolve_all(rules.symbols().cloned(), config.allow_delayed_fallback)
            .await;

        let mut quotes = BTreeMap::new();
        let mut failures = BTreeMap::new();
        let mut alerts = Vec::new();
        for (symbol, result) in results {
            let Some(rule) = rules.get(&symbol).copied() else {
                continue;
            };
            match result {
                Ok(quote) => {
                    info!(
                        %symbol,
                        price = quote.price,
                        threshold = rule.threshold(),
                        direction = %rule.direction(),
                        source = %quote.source,
                        "quote"
                    );
                    let triggered = rule.is_triggered(quote.price);
                    if let Some(kind) =
                        self.states
                            .evaluate(&symbol, triggered, config.reminder_interval, now)
                    {
                        alerts.push(AlertNotification {
                            symbol: symbol.clone(),
                            kind,
                            price: quote.price,
                            rule,
                            source: quote.source,
                        });
                    }
                    quotes.insert(symbol, quote);
                }
                Err(err) => {
                    error!(%symbol, error = %err, "quote unavailable");
                    failures.insert(symbol, err);
                }
            }
        }

        // A rejected entry still names a watched symbol; its state waits for
        // the entry to be fixed.
        let pruned = self.states.retain_where(|symbol| loaded.mentions(symbol));
        if pruned > 0 {
            info!(pruned, "dropped alert state for removed symbols");
        }
        if let Err(err) = self.store.save_state(&self.states) {
            error!(error = %err, "failed to save alert state");
            errors.push(err.to_string());
        }

        self.deliver_errors(&errors).await;
        for error in failures.values() {
            self.deliver(&format!("Error: {}", error.message())).await;
        }
        for alert in &alerts {
            self.deliver(&alert.message()).await;
            if !self.notification_pause.is_zero() {
                tokio::time::sleep(self.notification_pause).await;
            }
        }

        let prices = quotes
            .iter()
            .map(|(symbol, quote)| (symbol.clone(), quote.price))
            .collect();
        let next_poll = next_interval(
            &prices,
            rules,
            config.poll_interval,
            config.poll_near_interval,
            config.near_threshold_percent,
        );
        info!(
            interval_secs = next_poll.interval.as_secs(),
            reason = %next_poll.reason,
            "next poll scheduled"
        );

        CycleReport {
            config,
            quotes,
            failures,
            alerts,
            pruned,
            errors,
            next_poll,
        }
    }

    async fn deliver_errors(&self, errors: &[String]) {
        for error in errors {
            self.deliver(&format!("Error: {error}")).await;
        }
    }

    async fn deliver(&self, message: &str) {
        if let Err(err) = self.notifier.notify(message).await {
            warn!(error = %err, message, "notify error");
        }
    }
}

/// Result line of a one-shot quote check.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuoteCheck {
    /// Normalized symbol, or the raw key of a rejected rules entry.
    pub symbol: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<ProviderId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Resolve every configured symbol once without touching alert state.
/// Rejected rules entries are listed after the resolved ones as errors.
pub async fn check_quotes(
    loaded: &LoadedRules,
    controller: &Arc<FailoverController>,
    allow_delayed_fallback: bool,
) -> Vec<QuoteCheck> {
    let mut checks: Vec<QuoteCheck> = controller
        .resolve_all(loaded.rules.symbols().cloned(), allow_delayed_fallback)
        .await
        .into_iter()
        .map(|(symbol, result)| match result {
            Ok(quote) => QuoteCheck {
                symbol: symbol.to_string(),
                price: Some(quote.price),
                source: Some(quote.source),
                error: None,
            },
            Err(err) => QuoteCheck {
                symbol: symbol.to_string(),
                price: None,
                source: None,
                error: Some(err.message().to_owned()),
            },
        })
        .collect();

    checks.extend(loaded.rejected.iter().map(|entry| QuoteCheck {
        symbol: entry
            .symbol()
            .map(|symbol| symbol.to_string())
            .unwrap_or_else(|| entry.key.trim().to_owned()),
        price: None,
        source: None,
        error: Some(entry.to_string()),
    }));
    checks
}
