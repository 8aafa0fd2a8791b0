//! Human-readable run notifications.
//!
//! The message text is free-form. `LogNotifier` routes it through `tracing`;
//! other transports implement `Notifier`.

use std::sync::Mutex;

use mrha_core::domain::SignalAction;
use tracing::info;

use crate::signals::SignalRecord;
use crate::universe::RankedTicker;

pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str);
}

/// Emits every message as an INFO event on the `mrha::notify` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, message: &str) {
        info!(target: "mrha::notify", "{message}");
    }
}

/// Keeps messages in memory.
#[derive(Debug, Default)]
pub struct CollectingNotifier {
    messages: Mutex<Vec<String>>,
}

impl CollectingNotifier {
    pub fn messages(&self) -> Vec<String> {
        self.messages
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

impl Notifier for CollectingNotifier {
    fn notify(&self, message: &str) {
        self.messages
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(message.to_string());
    }
}

pub fn format_run_started(label: &str, symbols: usize) -> String {
    format!("MRHA scan started: {label} ({symbols} symbols)")
}

pub fn format_selection(ranked: &[RankedTicker]) -> String {
    let names: Vec<&str> = ranked.iter().map(|r| r.ticker.as_str()).collect();
    format!("Selected {} tickers: {}", names.len(), join_or_none(&names))
}

/// One line per action with the tickers that produced it.
pub fn format_signal_counts(records: &[SignalRecord]) -> String {
    SignalAction::ALL
        .iter()
        .map(|&action| {
            let tickers: Vec<&str> = records
                .iter()
                .filter(|r| r.signal == action)
                .map(|r| r.ticker.as_str())
                .collect();
            format!("{action} ({}): {}", tickers.len(), join_or_none(&tickers))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_run_completed(records: &[SignalRecord], failures: usize) -> String {
    format!(
        "MRHA scan completed: {} signals, {failures} failed\n{}",
        records.len(),
        format_signal_counts(records)
    )
}

pub fn format_error(ticker: &str, error: &dyn std::fmt::Display) -> String {
    format!("Error processing {ticker}: {error}")
}

fn join_or_none(items: &[&str]) -> String {
    if items.is_empty() {
        "none".to_string()
    } else {
        items.join(", ")
    }
}
