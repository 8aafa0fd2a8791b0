//! Fatal analysis errors.
//!
//! A run either completes with every series populated or fails with one of
//! these before any output is produced.

use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    #[error("duplicate date {date} in price series")]
    DuplicateDate { date: NaiveDate },

    #[error("price series is not in ascending date order ({previous} followed by {next})")]
    UnorderedDates {
        previous: NaiveDate,
        next: NaiveDate,
    },

    #[error("invalid {field} price {value} on {date}")]
    InvalidPrice {
        date: NaiveDate,
        field: &'static str,
        value: f64,
    },

    #[error("insufficient data: need at least {required} bars, got {available}")]
    InsufficientData { required: usize, available: usize },
}
