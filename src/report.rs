//! Rendering of emulated recall beliefs, human- and machine-readable.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::json;

use crate::memory::{CardBelief, CardId, RecallModel};
use crate::timefmt::fuzzy_delta;

/// Import totals for the closing summary line.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub cards: usize,
    pub reviews: usize,
    pub avg_per_card: f64,
}

impl Summary {
    pub fn new(cards: usize, reviews: usize) -> Self {
        let avg_per_card = if cards == 0 {
            0.0
        } else {
            reviews as f64 / cards as f64
        };
        Summary {
            cards,
            reviews,
            avg_per_card,
        }
    }

    /// Totals over every belief the emulator produced.
    pub fn of_beliefs<M>(beliefs: &BTreeMap<CardId, CardBelief<M>>) -> Self {
        let reviews = beliefs.values().map(|b| b.review_log.len()).sum();
        Summary::new(beliefs.len(), reviews)
    }

    pub fn line(&self) -> String {
        format!(
            "Imported {} cards with {} reviews (~{:.1}/card).",
            self.cards, self.reviews, self.avg_per_card
        )
    }
}

/// One human-readable line for a card: recall right now, how long ago the
/// last review was, and when recall is projected to hit the target.
pub fn card_line<M: RecallModel>(belief: &CardBelief<M>, now: i64, target: f64) -> String {
    let elapsed = (now - belief.last_review) as f64;
    let recall_now = belief.recall_at(Some(elapsed));
    let until_target = belief.recall_when(target) - elapsed;

    format!(
        "card[{}] ({:.2}% recall now, {} later) will have {:.0}% recall {}.",
        belief.card_id,
        recall_now * 100.0,
        fuzzy_delta(elapsed as i64, true),
        target * 100.0,
        fuzzy_delta(until_target as i64, false),
    )
}

/// The full report as a JSON document: one object per card plus the same
/// totals the summary line carries.
pub fn json_report<M: RecallModel>(
    beliefs: &BTreeMap<CardId, CardBelief<M>>,
    now: i64,
    target: f64,
) -> serde_json::Value {
    let cards: Vec<serde_json::Value> = beliefs
        .values()
        .map(|belief| {
            let elapsed = (now - belief.last_review) as f64;
            json!({
                "id": belief.card_id,
                "lastReview": belief.last_review,
                "reviews": belief.review_log.len(),
                "recallNow": belief.recall_at(Some(elapsed)),
                "secondsSinceReview": elapsed,
                "targetRecall": target,
                "secondsUntilTarget": belief.recall_when(target) - elapsed,
            })
        })
        .collect();

    json!({
        "cards": cards,
        "summary": Summary::of_beliefs(beliefs),
    })
}
