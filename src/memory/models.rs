use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Anki card identifier (primary key of the `cards` table).
pub type CardId = i64;

/// Review grade that counts as a failure. Anki buttons run 1..=4
/// ("again", "hard", "good", "easy"); only "again" means the card
/// was not recalled.
pub const FAILING_GRADE: i64 = 1;

/// Default half-life in seconds assumed for a freshly learned card.
/// Matches Anki's ten-minute learning step.
pub const DEFAULT_HALF_LIFE_SECS: f64 = 600.0;

/// One raw review event as stored in the collection's review log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRow {
    /// Review timestamp in epoch milliseconds.
    pub timestamp_ms: i64,
    /// Button pressed, 1..=4.
    pub grade: i64,
}

impl ReviewRow {
    /// Whether the card was recalled. Grades collapse to pass/fail:
    /// everything above [`FAILING_GRADE`] is a pass.
    pub fn passed(&self) -> bool {
        self.grade != FAILING_GRADE
    }
}

/// All trials of one card that share a review timestamp, in epoch seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewSession {
    /// Session timestamp in epoch seconds.
    pub time: i64,
    /// Pass/fail outcome of each trial in the session.
    pub trials: Vec<bool>,
}

impl ReviewSession {
    pub fn successes(&self) -> u32 {
        self.trials.iter().filter(|&&passed| passed).count() as u32
    }

    pub fn total(&self) -> u32 {
        self.trials.len() as u32
    }

    pub fn any_passed(&self) -> bool {
        self.trials.iter().any(|&passed| passed)
    }
}

/// A probabilistic belief about recall of a single fact.
///
/// Implementations are immutable value types: `update` returns a new belief
/// and never mutates the receiver, so replaying a history is a pure fold.
pub trait RecallModel: Clone {
    /// Maximal-uncertainty starting belief whose predicted recall is 0.5
    /// once `half_life_secs` have elapsed.
    fn prior(half_life_secs: f64) -> Self;

    /// Posterior belief after observing `successes` out of `total` trials,
    /// all performed `elapsed_secs` after the belief's reference point.
    ///
    /// `total` must be at least 1 and `successes` at most `total`;
    /// `elapsed_secs` may be any non-negative value.
    fn update(&self, successes: u32, total: u32, elapsed_secs: f64) -> Self;

    /// Expected recall probability `elapsed_secs` after the reference point.
    ///
    /// Returns the probability itself when `exact`, otherwise its natural
    /// logarithm (cheaper, and sufficient for ranking cards). Negative
    /// `elapsed_secs` reads as zero: a review dated after the query time
    /// (device clock skew) means the card was just seen, not that recall
    /// is undefined.
    fn predict(&self, elapsed_secs: f64, exact: bool) -> f64;

    /// Elapsed seconds after the reference point at which predicted recall
    /// has decayed to `percentile` (exclusive between 0 and 1).
    fn percentile_to_elapsed(&self, percentile: f64) -> f64;
}

/// The emulator's verdict on one card: the fitted belief plus the replay
/// provenance it was derived from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardBelief<M> {
    pub card_id: CardId,
    /// Belief fitted to the full review history.
    pub model: M,
    /// Timestamp of the most recent review session, epoch seconds.
    pub last_review: i64,
    /// The aggregated sessions the belief was replayed from.
    pub review_log: Vec<ReviewSession>,
}

impl<M: RecallModel> CardBelief<M> {
    /// Expected recall `elapsed_secs` after the last review, or as of the
    /// current wall clock when `elapsed_secs` is `None`.
    pub fn recall_at(&self, elapsed_secs: Option<f64>) -> f64 {
        let elapsed = elapsed_secs
            .unwrap_or_else(|| (Utc::now().timestamp() - self.last_review) as f64);
        self.model.predict(elapsed, true)
    }

    /// Seconds after the last review at which recall decays to `percentile`.
    ///
    /// Lower targets map to longer elapsed times; that monotonicity is an
    /// assumption inherited from the model's decay curve, not checked here.
    pub fn recall_when(&self, percentile: f64) -> f64 {
        self.model.percentile_to_elapsed(percentile)
    }
}
