//! mneme: replay Anki review histories through a Bayesian recall model
//!
//! Given an exported deck package, the crate reconstructs what the learner's
//! memory looked like after every review, then reports how well each card
//! should be remembered right now and when it will decay to a target recall
//! probability.
//!
//! - [`anki`]: deck-package extraction and read-only collection queries
//! - [`memory`]: session aggregation and the memory-state emulator
//! - [`ebisu`]: the Beta-on-recall belief engine
//! - [`timefmt`]: coarse relative-time phrases
//! - [`report`]: per-card lines, summary totals, and the JSON document

pub mod anki;
pub mod ebisu;
pub mod memory;
pub mod report;
pub mod timefmt;
