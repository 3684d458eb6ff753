//! Replays a card's review history through a recall model.
//!
//! - `aggregate_reviews` groups raw log rows into per-second sessions
//! - `emulate` folds the sessions into a fitted [`CardBelief`]
//!
//! The replay is anchored at the first session containing a pass: a belief
//! about recall only makes sense once the fact has been recalled at least
//! once, so earlier all-fail sessions carry no usable signal and are
//! skipped. A history with no pass at all yields no belief.

use std::collections::BTreeMap;

use super::models::{CardBelief, CardId, RecallModel, ReviewRow, ReviewSession};

/// Group raw review rows into sessions keyed by their timestamp in epoch
/// seconds. Rows may arrive in any order; the result is ascending by time,
/// and rows landing on the same second merge into one session.
pub fn aggregate_reviews(rows: &[ReviewRow]) -> Vec<ReviewSession> {
    let mut by_second: BTreeMap<i64, Vec<bool>> = BTreeMap::new();
    for row in rows {
        let time = row.timestamp_ms / 1000;
        by_second.entry(time).or_default().push(row.passed());
    }

    by_second
        .into_iter()
        .map(|(time, trials)| ReviewSession { time, trials })
        .collect()
}

/// Where the replay currently stands. No model update may run before an
/// anchor exists, and every update measures elapsed time from the most
/// recent session regardless of its outcome.
#[derive(Clone, Copy)]
enum ReplayPhase {
    AwaitingAnchor,
    Tracking { last_review: i64 },
}

/// Replay `sessions` (ascending by time) through a fresh model with the
/// given starting half-life.
///
/// Returns `None` when no session contains a pass; that is an answerless
/// card, not an error.
pub fn emulate<M: RecallModel>(
    card_id: CardId,
    sessions: Vec<ReviewSession>,
    half_life_secs: f64,
) -> Option<CardBelief<M>> {
    let mut model = M::prior(half_life_secs);
    let mut phase = ReplayPhase::AwaitingAnchor;

    for session in &sessions {
        match phase {
            ReplayPhase::AwaitingAnchor => {
                if session.any_passed() {
                    phase = ReplayPhase::Tracking {
                        last_review: session.time,
                    };
                }
            }
            ReplayPhase::Tracking { last_review } => {
                let elapsed = (session.time - last_review) as f64;
                model = model.update(session.successes(), session.total(), elapsed);
                phase = ReplayPhase::Tracking {
                    last_review: session.time,
                };
            }
        }
    }

    match phase {
        ReplayPhase::AwaitingAnchor => None,
        ReplayPhase::Tracking { last_review } => Some(CardBelief {
            card_id,
            model,
            last_review,
            review_log: sessions,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ebisu::EbisuModel;
    use crate::memory::DEFAULT_HALF_LIFE_SECS;

    /// Records every update it receives; lets the tests check the replay's
    /// control flow without any probability math.
    #[derive(Debug, Clone, PartialEq)]
    struct TraceModel {
        updates: Vec<(u32, u32, f64)>,
    }

    impl RecallModel for TraceModel {
        fn prior(_half_life_secs: f64) -> Self {
            TraceModel { updates: Vec::new() }
        }

        fn update(&self, successes: u32, total: u32, elapsed_secs: f64) -> Self {
            let mut updates = self.updates.clone();
            updates.push((successes, total, elapsed_secs));
            TraceModel { updates }
        }

        fn predict(&self, _elapsed_secs: f64, _exact: bool) -> f64 {
            1.0
        }

        fn percentile_to_elapsed(&self, _percentile: f64) -> f64 {
            0.0
        }
    }

    fn row(timestamp_ms: i64, grade: i64) -> ReviewRow {
        ReviewRow { timestamp_ms, grade }
    }

    #[test]
    fn test_aggregate_merges_same_second() {
        let rows = vec![row(100_000, 3), row(100_000, 1), row(100_000, 3)];
        let sessions = aggregate_reviews(&rows);
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].time, 100);
        assert_eq!(sessions[0].total(), 3);
        assert_eq!(sessions[0].successes(), 2);
    }

    #[test]
    fn test_aggregate_normalizes_milliseconds() {
        let sessions = aggregate_reviews(&[row(1_600_000_000_000, 3)]);
        assert_eq!(sessions[0].time, 1_600_000_000);
    }

    #[test]
    fn test_aggregate_sorts_unordered_rows() {
        let rows = vec![row(300_000, 3), row(100_000, 1), row(200_000, 4)];
        let times: Vec<i64> = aggregate_reviews(&rows).iter().map(|s| s.time).collect();
        assert_eq!(times, vec![100, 200, 300]);
    }

    #[test]
    fn test_no_pass_yields_no_belief() {
        let sessions = aggregate_reviews(&[row(100_000, 1), row(200_000, 1)]);
        assert!(emulate::<TraceModel>(1, sessions, DEFAULT_HALF_LIFE_SECS).is_none());
        assert!(emulate::<TraceModel>(1, Vec::new(), DEFAULT_HALF_LIFE_SECS).is_none());
    }

    #[test]
    fn test_anchor_session_runs_no_update() {
        let sessions = aggregate_reviews(&[row(100_000, 3)]);
        let belief = emulate::<TraceModel>(1, sessions, DEFAULT_HALF_LIFE_SECS).unwrap();
        assert_eq!(belief.last_review, 100);
        assert!(belief.model.updates.is_empty());
    }

    #[test]
    fn test_failed_sessions_before_anchor_are_skipped() {
        let sessions = aggregate_reviews(&[
            row(100_000, 1),
            row(200_000, 3),
            row(260_000, 3),
        ]);
        let belief = emulate::<TraceModel>(1, sessions, DEFAULT_HALF_LIFE_SECS).unwrap();
        // Anchor is the session at 200; the single update spans 200 -> 260.
        assert_eq!(belief.model.updates, vec![(1, 1, 60.0)]);
        assert_eq!(belief.last_review, 260);
    }

    #[test]
    fn test_elapsed_measured_from_previous_session() {
        let t0 = 1_600_000_000;
        let sessions = aggregate_reviews(&[
            row(t0 * 1000, 3),
            row((t0 + 600) * 1000, 3),
            row((t0 + 86_400) * 1000, 1),
        ]);
        let belief = emulate::<TraceModel>(1, sessions, DEFAULT_HALF_LIFE_SECS).unwrap();
        assert_eq!(
            belief.model.updates,
            vec![(1, 1, 600.0), (0, 1, 85_800.0)]
        );
    }

    #[test]
    fn test_failure_advances_last_review() {
        let sessions = aggregate_reviews(&[row(100_000, 3), row(400_000, 1)]);
        let belief = emulate::<TraceModel>(1, sessions, DEFAULT_HALF_LIFE_SECS).unwrap();
        assert_eq!(belief.last_review, 400);
    }

    #[test]
    fn test_anchor_only_belief_is_prior() {
        let sessions = aggregate_reviews(&[row(100_000, 3)]);
        let belief = emulate::<EbisuModel>(7, sessions, DEFAULT_HALF_LIFE_SECS).unwrap();
        assert_eq!(belief.model, EbisuModel::prior(DEFAULT_HALF_LIFE_SECS));
        assert_eq!(belief.card_id, 7);
    }

    #[test]
    fn test_failure_lowers_predicted_recall() {
        let t0 = 1_600_000_000;
        let base = vec![row(t0 * 1000, 3), row((t0 + 600) * 1000, 3)];

        let mut failed = base.clone();
        failed.push(row((t0 + 86_400) * 1000, 1));
        let mut passed = base;
        passed.push(row((t0 + 86_400) * 1000, 3));

        let failed = emulate::<EbisuModel>(
            1,
            aggregate_reviews(&failed),
            DEFAULT_HALF_LIFE_SECS,
        )
        .unwrap();
        let passed = emulate::<EbisuModel>(
            1,
            aggregate_reviews(&passed),
            DEFAULT_HALF_LIFE_SECS,
        )
        .unwrap();

        assert_eq!(failed.last_review, t0 + 86_400);

        let elapsed = 3600.0;
        assert!(failed.recall_at(Some(elapsed)) < passed.recall_at(Some(elapsed)));
    }

    #[test]
    fn test_future_dated_review_reports_full_recall() {
        // Device clock skew can stamp a review ahead of the machine running
        // the replay; the queries must report certainty, not panic.
        let ahead_ms = (chrono::Utc::now().timestamp() + 7200) * 1000;
        let belief = emulate::<EbisuModel>(
            1,
            aggregate_reviews(&[row(ahead_ms, 3)]),
            DEFAULT_HALF_LIFE_SECS,
        )
        .unwrap();

        assert_eq!(belief.recall_at(None), 1.0);
        assert_eq!(belief.recall_at(Some(-7200.0)), 1.0);
    }

    #[test]
    fn test_recall_queries_are_pure() {
        let sessions = aggregate_reviews(&[row(100_000, 3), row(700_000, 3)]);
        let belief = emulate::<EbisuModel>(1, sessions, DEFAULT_HALF_LIFE_SECS).unwrap();

        let first = belief.recall_at(Some(1800.0));
        let second = belief.recall_at(Some(1800.0));
        assert_eq!(first.to_bits(), second.to_bits());

        let when_first = belief.recall_when(0.85);
        let when_second = belief.recall_when(0.85);
        assert_eq!(when_first.to_bits(), when_second.to_bits());
    }
}
