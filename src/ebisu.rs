//! Ebisu recall engine
//!
//! Implements the Ebisu v2 scheduling model. The belief about one fact is a
//! Beta(alpha, beta) distribution on the probability of recall at a reference
//! time `t` seconds after the last review. Recall at any other elapsed time
//! is the belief pushed through the exponential-forgetting transform
//! `p^(elapsed / t)`, which keeps everything analytic:
//!
//! - prediction is a ratio of Beta functions, evaluated in log space
//! - a quiz result (k passes out of n trials) yields a posterior whose
//!   moments are alternating sums of Beta functions; the posterior is
//!   projected back onto a Beta distribution by matching mean and variance
//! - a lopsided posterior is rebalanced by re-running the update with the
//!   reference time moved to the posterior's approximate half-life, which
//!   keeps the shape parameters in a numerically comfortable range over
//!   arbitrarily long review histories

use serde::{Deserialize, Serialize};
use statrs::function::beta::ln_beta;

use crate::memory::RecallModel;

/// Shape of the starting Beta prior. Both parameters start here, so the
/// prior predicts exactly 0.5 recall at its reference time.
const PRIOR_SHAPE: f64 = 3.0;

/// Floor for the elapsed time of an update. The forgetting transform is
/// degenerate at zero delay; an epsilon delay carries the same (absent)
/// information without dividing by zero.
const MIN_ELAPSED_SECS: f64 = 1e-9;

const BISECTION_STEPS: usize = 50;

/// Beta-on-recall belief at a reference elapsed time of `t` seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EbisuModel {
    pub alpha: f64,
    pub beta: f64,
    /// Reference elapsed time in seconds.
    pub t: f64,
}

impl RecallModel for EbisuModel {
    fn prior(half_life_secs: f64) -> Self {
        EbisuModel {
            alpha: PRIOR_SHAPE,
            beta: PRIOR_SHAPE,
            t: half_life_secs,
        }
    }

    fn update(&self, successes: u32, total: u32, elapsed_secs: f64) -> Self {
        debug_assert!(total >= 1 && successes <= total);
        self.update_recall(successes, total, elapsed_secs, None, true)
    }

    fn predict(&self, elapsed_secs: f64, exact: bool) -> f64 {
        // Device clock skew can date a review after the query time, making
        // the elapsed time negative. Reading it as zero keeps the Beta
        // arguments positive; anything else would push alpha + dt below
        // zero once elapsed < -alpha * t and panic inside ln_beta.
        let dt = elapsed_secs.max(0.0) / self.t;
        let log_mean = ln_beta(self.alpha + dt, self.beta) - ln_beta(self.alpha, self.beta);
        if exact {
            log_mean.exp()
        } else {
            log_mean
        }
    }

    fn percentile_to_elapsed(&self, percentile: f64) -> f64 {
        self.percentile_decay(percentile, false)
    }
}

impl EbisuModel {
    /// Moment-matched posterior after `successes` of `total` trials at
    /// `elapsed_secs`. The result's reference time is `t_back` (the current
    /// one when `None`); when the proposed shapes come out lopsided and
    /// `rebalance` is set, the update is re-run once against the proposal's
    /// coarse half-life.
    fn update_recall(
        &self,
        successes: u32,
        total: u32,
        elapsed_secs: f64,
        t_back: Option<f64>,
        rebalance: bool,
    ) -> EbisuModel {
        let elapsed = elapsed_secs.max(MIN_ELAPSED_SECS);
        let dt = elapsed / self.t;
        let t_back = t_back.unwrap_or(self.t);
        let et = t_back / elapsed;

        let failures = (total - successes) as usize;
        let k = f64::from(successes);
        let binom_lns: Vec<f64> = (0..=failures)
            .map(|i| binom_ln(failures as f64, i as f64))
            .collect();

        // Unnormalized m-th posterior moment of recall at t_back, in log
        // space. The (1 - p^dt)^failures factor expands into the
        // alternating sum.
        let log_moment = |m: f64, et: f64| -> f64 {
            let terms: Vec<f64> = (0..=failures)
                .map(|i| {
                    binom_lns[i]
                        + ln_beta(self.alpha + dt * (k + i as f64) + m * dt * et, self.beta)
                })
                .collect();
            log_sum_exp_alternating(&terms)
        };

        let log_denominator = log_moment(0.0, 0.0);
        let mean = (log_moment(1.0, et) - log_denominator).exp();
        let second_moment = (log_moment(2.0, et) - log_denominator).exp();
        let variance = second_moment - mean * mean;

        let (alpha, beta) = beta_from_moments(mean, variance);
        let proposed = EbisuModel {
            alpha,
            beta,
            t: t_back,
        };

        if rebalance && (alpha > 2.0 * beta || beta > 2.0 * alpha) {
            let rough_half_life = proposed.percentile_decay(0.5, true);
            return self.update_recall(successes, total, elapsed_secs, Some(rough_half_life), false);
        }
        proposed
    }

    /// Elapsed seconds at which predicted recall decays to `percentile`.
    ///
    /// Works on ln(elapsed / t): the objective is strictly decreasing there,
    /// so a fixed-width bracket slid towards the sign change pins the root,
    /// then bisection finishes. `coarse` stops at the bracket midpoint,
    /// which is all the rebalancing step needs.
    fn percentile_decay(&self, percentile: f64, coarse: bool) -> f64 {
        debug_assert!(percentile > 0.0 && percentile < 1.0);
        let log_bab = ln_beta(self.alpha, self.beta);
        let log_percentile = percentile.ln();
        let f = |ln_delta: f64| {
            ln_beta(self.alpha + ln_delta.exp(), self.beta) - log_bab - log_percentile
        };

        let bracket_width = if coarse { 1.0 } else { 6.0 };
        let mut low = -bracket_width / 2.0;
        let mut high = bracket_width / 2.0;
        let mut f_low = f(low);
        let mut f_high = f(high);
        while f_low > 0.0 && f_high > 0.0 {
            low = high;
            f_low = f_high;
            high += bracket_width;
            f_high = f(high);
        }
        while f_low < 0.0 && f_high < 0.0 {
            high = low;
            f_high = f_low;
            low -= bracket_width;
            f_low = f(low);
        }

        if coarse {
            return (low.exp() + high.exp()) / 2.0 * self.t;
        }

        for _ in 0..BISECTION_STEPS {
            let mid = (low + high) / 2.0;
            if f(mid) > 0.0 {
                low = mid;
            } else {
                high = mid;
            }
        }
        ((low + high) / 2.0).exp() * self.t
    }
}

/// ln C(n, k) by way of the Beta function.
fn binom_ln(n: f64, k: f64) -> f64 {
    -ln_beta(1.0 + n - k, 1.0 + k) - (n + 1.0).ln()
}

/// log|sum_i sign_i * exp(term_i)| with alternating signs (+, -, +, ...).
fn log_sum_exp_alternating(terms: &[f64]) -> f64 {
    let max = terms.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let sum: f64 = terms
        .iter()
        .enumerate()
        .map(|(i, &term)| {
            let sign = if i % 2 == 0 { 1.0 } else { -1.0 };
            sign * (term - max).exp()
        })
        .sum();
    max + sum.abs().ln()
}

/// Beta shapes with the given mean and variance.
fn beta_from_moments(mean: f64, variance: f64) -> (f64, f64) {
    let concentration = mean * (1.0 - mean) / variance - 1.0;
    (mean * concentration, (1.0 - mean) * concentration)
}
