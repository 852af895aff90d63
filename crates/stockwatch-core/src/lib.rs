//! # Stockwatch Core
//!
//! Price alerts for a watch list of stock tickers.
//!
//! ## Overview
//!
//! This crate provides everything the `stockwatch` binary runs on:
//!
//! - **Provider adapters** for a real-time and a delayed quote source
//! - **Failover routing** guarded by a circuit breaker
//! - **Alert rules** and a per-symbol notification state machine
//! - **Adaptive polling** that speeds up near a threshold
//! - **File store** for rules, settings and persisted alert state
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`adapters`] | stockprices.dev (real-time) and Stooq (delayed) |
//! | [`alert`] | Rules, trigger logic and alert state |
//! | [`circuit_breaker`] | Disables the real-time provider after repeated failures |
//! | [`config`] | Settings file and environment overrides |
//! | [`data_source`] | Quote source trait and structured errors |
//! | [`domain`] | Domain models (Symbol, Quote, UtcDateTime) |
//! | [`error`] | Validation and store errors |
//! | [`http_client`] | HTTP client abstraction |
//! | [`monitor`] | One poll cycle from rules to notifications |
//! | [`notify`] | Notification sink trait |
//! | [`routing`] | Provider failover |
//! | [`scheduler`] | Next poll interval |
//! | [`source`] | Provider identifiers |
//! | [`store`] | Watch directory files |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use stockwatch_core::{FailoverController, FileStore, LogNotifier, Monitor};
//!
//! #[tokio::main]
//! async fn main() {
//!     let store = FileStore::new("./watch");
//!     let controller = Arc::new(FailoverController::default());
//!     let mut monitor = Monitor::start(store, controller, Arc::new(LogNotifier)).await;
//!
//!     loop {
//!         let report = monitor.run_cycle().await;
//!         tokio::time::sleep(report.next_poll.interval).await;
//!     }
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌──────────────────┐
//! │  Monitor        │────▶│ File Store       │
//! └────────┬────────┘     └──────────────────┘
//!          │
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │ Failover        │────▶│ Circuit Breaker  │
//! │ Controller      │     └──────────────────┘
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │ Quote Source    │────▶│ HTTP Client      │
//! │ (Adapter Trait) │     │ (reqwest)        │
//! └─────────────────┘     └──────────────────┘
//!          │
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │ Alert State     │────▶│ Notifier         │
//! │ + Scheduler     │     └──────────────────┘
//! └─────────────────┘
//! ```
//!
//! ## Error Handling
//!
//! Quote failures are values, not panics, and never stop the poll loop:
//!
//! ```rust
//! use stockwatch_core::{SourceError, SourceErrorKind};
//!
//! fn describe(error: &SourceError) -> &'static str {
//!     match error.kind() {
//!         SourceErrorKind::CircuitOpen => "real-time provider cooling down",
//!         SourceErrorKind::Unsupported => "enable delayed fallback",
//!         _ => "quote unavailable this cycle",
//!     }
//! }
//! ```

pub mod adapters;
pub mod alert;
pub mod circuit_breaker;
pub mod config;
pub mod data_source;
pub mod domain;
pub mod error;
pub mod http_client;
pub mod monitor;
pub mod notify;
pub mod routing;
pub mod scheduler;
pub mod source;
pub mod store;

// Adapter implementations
pub use adapters::{InstrumentKind, StockpricesAdapter, StooqAdapter};

// Alert rules and state
pub use alert::{
    is_triggered, percent_distance, AlertKind, AlertRule, AlertStates, Direction, RejectedRule, RuleSet,
    SymbolAlertState,
};

// Circuit breaker
pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};

// Configuration
pub use config::{RuntimeConfig, SettingsFile};

// Data source trait and errors
pub use data_source::{QuoteSource, SourceError, SourceErrorKind};

// Domain models
pub use domain::{normalize_for_delayed, normalize_for_primary, Quote, Symbol, UtcDateTime};

// Error types
pub use error::{StoreError, ValidationError};

// HTTP client types
pub use http_client::{HttpClient, HttpError, HttpRequest, HttpResponse, ReqwestHttpClient};

// Poll cycle
pub use monitor::{check_quotes, AlertNotification, CycleReport, Monitor, QuoteCheck};

// Notifications
pub use notify::{LogNotifier, Notifier, NotifyError, RecordingNotifier};

// Routing
pub use routing::FailoverController;

// Scheduling
pub use scheduler::{next_interval, PollDecision, PollReason};

// Source identifiers
pub use source::ProviderId;

// Storage
pub use store::{FileStore, LoadedRules};
