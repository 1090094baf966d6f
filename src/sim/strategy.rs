//! Bidding strategies.
//!
//! A [`Strategy`] maps a batch of valuations to a batch of bids. The
//! environment and learner only ever see this contract, so truthful
//! baselines, parametric strategies under training, and quadrature-backed
//! analytic best responses are interchangeable.
//!
//! Matrix games use the separate [`MatrixStrategy`] contract: actions are
//! indices, not bid vectors, and complete-information strategies take no
//! valuation input.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::Rng;
use rayon::prelude::*;

use crate::batch::BatchMatrix;
use crate::error::{AuctionError, Result};
use crate::mechanisms::MatrixGame;

/// A bidding strategy: batch of valuations in, batch of bids out.
///
/// Implementations must be pure with respect to their parameters; any
/// randomness belongs to the caller (the bidder owns the RNG that drives
/// valuation draws, not the strategy).
pub trait Strategy: Send + Sync {
    /// Compute bids for a batch of valuations, shape-preserving.
    fn play(&self, valuations: &BatchMatrix) -> BatchMatrix;
}

/// Bids exactly the valuation. Equilibrium play under second-price rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct TruthfulStrategy;

impl TruthfulStrategy {
    /// Create a truthful strategy.
    pub fn new() -> Self {
        Self
    }
}

impl Strategy for TruthfulStrategy {
    fn play(&self, valuations: &BatchMatrix) -> BatchMatrix {
        valuations.clone()
    }
}

/// Affine bid function `b(v) = intercept + slope * v`, floored at zero.
///
/// This is the parametric family the self-play learner searches over. It
/// covers truthful play (`slope = 1`) and the constant-shading equilibria
/// of symmetric first-price auctions (`slope = (n-1)/n` for risk-neutral
/// bidders with uniform valuations starting at zero).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearBidStrategy {
    /// Additive offset applied to every bid.
    pub intercept: f64,
    /// Multiplier on the valuation.
    pub slope: f64,
}

impl LinearBidStrategy {
    /// Create a strategy with the given intercept and slope.
    pub fn new(intercept: f64, slope: f64) -> Self {
        Self { intercept, slope }
    }

    /// The identity strategy `b(v) = v`.
    pub fn truthful() -> Self {
        Self::new(0.0, 1.0)
    }

    /// Pure shading `b(v) = slope * v`.
    pub fn proportional(slope: f64) -> Self {
        Self::new(0.0, slope)
    }
}

impl Strategy for LinearBidStrategy {
    fn play(&self, valuations: &BatchMatrix) -> BatchMatrix {
        let mut bids = valuations.clone();
        bids.map_in_place(|v| (self.intercept + self.slope * v).max(0.0));
        bids
    }
}

type RowClosure = dyn Fn(&[f64]) -> Vec<f64> + Send + Sync;

/// Wraps an arbitrary per-row bid function.
///
/// Used for analytic best responses whose evaluation is expensive, e.g.
/// numerical integration against the opponent value distribution. The
/// closure receives one valuation row and must return a bid row of the
/// same length; a mismatched length is a caller bug and panics.
///
/// With `parallel` enabled rows are evaluated on the rayon thread pool,
/// which pays off when each row costs a quadrature pass.
pub struct ClosureStrategy {
    closure: Arc<RowClosure>,
    parallel: bool,
}

impl ClosureStrategy {
    /// Wrap a row closure, evaluated sequentially.
    pub fn new<F>(closure: F) -> Self
    where
        F: Fn(&[f64]) -> Vec<f64> + Send + Sync + 'static,
    {
        Self {
            closure: Arc::new(closure),
            parallel: false,
        }
    }

    /// Wrap a row closure, evaluated in parallel across batch rows.
    pub fn parallel<F>(closure: F) -> Self
    where
        F: Fn(&[f64]) -> Vec<f64> + Send + Sync + 'static,
    {
        Self {
            closure: Arc::new(closure),
            parallel: true,
        }
    }
}

impl std::fmt::Debug for ClosureStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClosureStrategy")
            .field("parallel", &self.parallel)
            .finish()
    }
}

impl Strategy for ClosureStrategy {
    fn play(&self, valuations: &BatchMatrix) -> BatchMatrix {
        let batch = valuations.batch_size();
        let items = valuations.n_items();

        let rows: Vec<Vec<f64>> = if self.parallel {
            let inputs: Vec<&[f64]> = valuations.rows().collect();
            inputs.par_iter().map(|row| (self.closure)(row)).collect()
        } else {
            valuations.rows().map(|row| (self.closure)(row)).collect()
        };

        let mut data = Vec::with_capacity(batch * items);
        for row in rows {
            if row.len() != items {
                panic!(
                    "strategy closure returned {} bids for {} items",
                    row.len(),
                    items
                );
            }
            data.extend(row);
        }

        match BatchMatrix::from_vec(data, batch, items) {
            Ok(bids) => bids,
            // Unreachable: every row length was checked above.
            Err(e) => panic!("closure strategy output: {}", e),
        }
    }
}

/// A strategy for complete-information matrix games: a batch of action
/// indices, no valuation input.
pub trait MatrixStrategy: Send + Sync {
    /// Sample one action index per batch row.
    fn play(&self, batch_size: usize, rng: &mut StdRng) -> Vec<usize>;
}

/// A fixed probability vector over actions, sampled independently per row.
#[derive(Debug, Clone)]
pub struct MixedStrategy {
    probabilities: Vec<f64>,
}

impl MixedStrategy {
    /// Create a mixed strategy from action probabilities.
    ///
    /// Probabilities must be non-negative and sum to one (within 1e-6).
    pub fn new(probabilities: Vec<f64>) -> Result<Self> {
        if probabilities.is_empty() {
            return Err(AuctionError::InvalidDistribution {
                player: 0,
                reason: "empty probability vector".into(),
            });
        }
        if probabilities.iter().any(|&p| !p.is_finite() || p < 0.0) {
            return Err(AuctionError::InvalidDistribution {
                player: 0,
                reason: "negative or non-finite probability".into(),
            });
        }
        let total: f64 = probabilities.iter().sum();
        if (total - 1.0).abs() > 1e-6 {
            return Err(AuctionError::InvalidDistribution {
                player: 0,
                reason: format!("probabilities sum to {}", total),
            });
        }
        Ok(Self { probabilities })
    }

    /// Degenerate strategy playing one action with probability one.
    pub fn pure(action: usize, n_actions: usize) -> Result<Self> {
        if action >= n_actions {
            return Err(AuctionError::InvalidAction {
                player: 0,
                action,
                n_actions,
            });
        }
        let mut probabilities = vec![0.0; n_actions];
        probabilities[action] = 1.0;
        Ok(Self { probabilities })
    }

    /// Uniform distribution over `n_actions` actions.
    pub fn uniform(n_actions: usize) -> Result<Self> {
        if n_actions == 0 {
            return Err(AuctionError::InvalidDistribution {
                player: 0,
                reason: "zero actions".into(),
            });
        }
        Ok(Self {
            probabilities: vec![1.0 / n_actions as f64; n_actions],
        })
    }

    /// The underlying probability vector.
    pub fn probabilities(&self) -> &[f64] {
        &self.probabilities
    }

    fn sample(&self, rng: &mut StdRng) -> usize {
        let r: f64 = rng.gen();
        let mut cumsum = 0.0;
        for (i, &prob) in self.probabilities.iter().enumerate() {
            cumsum += prob;
            if r < cumsum {
                return i;
            }
        }
        // Fallback to last action (handles floating point imprecision)
        self.probabilities.len() - 1
    }
}

impl MatrixStrategy for MixedStrategy {
    fn play(&self, batch_size: usize, rng: &mut StdRng) -> Vec<usize> {
        (0..batch_size).map(|_| self.sample(rng)).collect()
    }
}

/// Fictitious play over a matrix game.
///
/// Tracks empirical counts of every player's past actions and best-responds
/// to the implied mixed profile. Counts start at one per action so the first
/// response is against the uniform profile. Deterministic: argmax ties go to
/// the lowest action index.
#[derive(Debug, Clone)]
pub struct FictitiousPlayStrategy {
    game: MatrixGame,
    action_counts: Vec<Vec<f64>>,
}

impl FictitiousPlayStrategy {
    /// Start fictitious play on a game.
    pub fn new(game: &MatrixGame) -> Self {
        let action_counts = (0..game.n_players())
            .map(|p| vec![1.0; game.n_actions(p)])
            .collect();
        Self {
            game: game.clone(),
            action_counts,
        }
    }

    /// The empirical mixed strategy of every player so far.
    pub fn empirical_strategies(&self) -> Vec<Vec<f64>> {
        self.action_counts
            .iter()
            .map(|counts| {
                let total: f64 = counts.iter().sum();
                counts.iter().map(|c| c / total).collect()
            })
            .collect()
    }

    /// Best response of `player` against the empirical profile.
    pub fn best_response(&self, player: usize) -> Result<usize> {
        let strategies = self.empirical_strategies();
        let payoffs = self.game.expected_action_payoffs(&strategies, player)?;

        let mut best = 0;
        for (a, &u) in payoffs.iter().enumerate() {
            if u > payoffs[best] {
                best = a;
            }
        }
        Ok(best)
    }

    /// Record one joint action profile into the empirical counts.
    pub fn observe(&mut self, profile: &[usize]) -> Result<()> {
        if profile.len() != self.game.n_players() {
            return Err(AuctionError::PlayerCount {
                expected: self.game.n_players(),
                actual: profile.len(),
            });
        }
        for (p, &a) in profile.iter().enumerate() {
            if a >= self.game.n_actions(p) {
                return Err(AuctionError::InvalidAction {
                    player: p,
                    action: a,
                    n_actions: self.game.n_actions(p),
                });
            }
            self.action_counts[p][a] += 1.0;
        }
        Ok(())
    }

    /// Play one action for `player`: the current best response.
    pub fn play(&self, player: usize) -> Result<usize> {
        self.best_response(player)
    }
}

/// Run simultaneous fictitious play for a number of rounds and return the
/// final empirical mixed strategies.
pub fn run_fictitious_play(game: &MatrixGame, rounds: usize) -> Result<Vec<Vec<f64>>> {
    let mut fp = FictitiousPlayStrategy::new(game);
    let n = game.n_players();

    for _ in 0..rounds {
        let mut profile = Vec::with_capacity(n);
        for player in 0..n {
            profile.push(fp.best_response(player)?);
        }
        fp.observe(&profile)?;
    }

    Ok(fp.empirical_strategies())
}
