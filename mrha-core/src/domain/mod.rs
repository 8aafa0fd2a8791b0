//! Domain types for the MRHA pipeline

pub mod bar;
pub mod signal;
pub mod trade;

pub use bar::{validate_series, PriceBar};
pub use signal::{Position, Signal, SignalAction};
pub use trade::{Trade, TradeSide};

/// Symbol type alias
pub type Symbol = String;
