//! Review-history replay core
//!
//! - Session aggregation from raw review-log rows
//! - The memory-state emulator that folds sessions into a recall belief
//! - Recall queries against a fitted belief

mod emulator;
mod models;

pub use emulator::{aggregate_reviews, emulate};
pub use models::*;
