//! Players: Bayesian bidders and matrix-game players.
//!
//! A [`Bidder`] owns a private valuation drawn from a prior, turns it into
//! bids through its strategy, and scores outcomes as quasilinear utility.
//! The valuation moves through a two-state lifecycle: `draw_valuations`
//! marks it [`ValuationState::Stale`], and a caching `get_action` marks it
//! [`ValuationState::Fresh`] once bids have been computed for it. With
//! caching enabled, repeated `get_action` calls between draws return the
//! cached bids bit for bit.
//!
//! [`MatrixGamePlayer`] is the complete-information counterpart: no
//! valuations, a fixed player position, and utility equal to the negated
//! payment.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

use crate::batch::BatchMatrix;
use crate::error::{AuctionError, Result};
use crate::sim::correlation::{CorrelationDevice, Weights};
use crate::sim::strategy::{MatrixStrategy, Strategy};

/// A custom valuation sampler, for priors beyond uniform and Gaussian.
pub trait ValuationSampler: Send + Sync {
    /// Fill `out` with a fresh batch of draws.
    fn sample_into(&self, rng: &mut StdRng, out: &mut BatchMatrix) -> Result<()>;
}

/// The prior distribution a bidder's valuations are drawn from.
///
/// Each variant carries its own parameters and exposes the same in-place
/// sampling contract, so bidder code never inspects the distribution kind.
#[derive(Clone)]
pub enum ValuationPrior {
    /// Uniform on `[low, high)`.
    Uniform {
        /// Lower bound of the support.
        low: f64,
        /// Upper bound of the support.
        high: f64,
    },
    /// Gaussian with the given mean and standard deviation. Negative draws
    /// are clipped to zero after sampling.
    Gaussian {
        /// Mean of the distribution.
        mean: f64,
        /// Standard deviation, strictly positive.
        stddev: f64,
    },
    /// An arbitrary sampler supplied by the caller.
    Custom(Arc<dyn ValuationSampler>),
}

impl std::fmt::Debug for ValuationPrior {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValuationPrior::Uniform { low, high } => {
                write!(f, "Uniform[{}, {})", low, high)
            }
            ValuationPrior::Gaussian { mean, stddev } => {
                write!(f, "Gaussian(mean={}, stddev={})", mean, stddev)
            }
            ValuationPrior::Custom(_) => write!(f, "Custom"),
        }
    }
}

impl ValuationPrior {
    /// Check the distribution parameters, failing fast on nonsense.
    pub fn validate(&self) -> Result<()> {
        match *self {
            ValuationPrior::Uniform { low, high } => {
                if !low.is_finite() || !high.is_finite() || low >= high {
                    return Err(AuctionError::InvalidParameter {
                        name: "uniform bounds",
                        value: high - low,
                        constraint: "low must be finite and below high",
                    });
                }
            }
            ValuationPrior::Gaussian { mean, stddev } => {
                if !mean.is_finite() || !stddev.is_finite() || stddev <= 0.0 {
                    return Err(AuctionError::InvalidParameter {
                        name: "stddev",
                        value: stddev,
                        constraint: "must be positive and finite",
                    });
                }
            }
            ValuationPrior::Custom(_) => {}
        }
        Ok(())
    }

    /// Fill `out` with one batch of draws from the prior.
    pub fn sample_into(&self, rng: &mut StdRng, out: &mut BatchMatrix) -> Result<()> {
        match self {
            ValuationPrior::Uniform { low, high } => {
                for row in out.rows_mut() {
                    for v in row.iter_mut() {
                        *v = rng.gen_range(*low..*high);
                    }
                }
            }
            ValuationPrior::Gaussian { mean, stddev } => {
                let normal = Normal::new(*mean, *stddev).map_err(|_| {
                    AuctionError::InvalidParameter {
                        name: "stddev",
                        value: *stddev,
                        constraint: "must be positive and finite",
                    }
                })?;
                for row in out.rows_mut() {
                    for v in row.iter_mut() {
                        *v = normal.sample(rng);
                    }
                }
            }
            ValuationPrior::Custom(sampler) => sampler.sample_into(rng, out)?,
        }
        Ok(())
    }
}

/// Whether the current valuations have been turned into actions yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValuationState {
    /// Actions have been computed for the current valuations.
    Fresh,
    /// Valuations were redrawn since the last action computation.
    Stale,
}

/// Configuration for a [`Bidder`].
///
/// # Example
/// ```
/// use auction_solver::sim::BidderOptions;
///
/// let options = BidderOptions::default()
///     .with_batch_size(4096)
///     .with_seed(42);
/// assert_eq!(options.n_items, 1);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BidderOptions {
    /// Number of parallel game instances per draw.
    pub batch_size: usize,

    /// Number of items the bidder submits bids for.
    pub n_items: usize,

    /// Fixed position in the bid profile, if the setting is asymmetric.
    /// `None` in symmetric environments where the focal slot is always zero.
    pub player_position: Option<usize>,

    /// Sort each valuation row in descending order after drawing.
    ///
    /// Multi-unit auctions interpret bid rows as marginal values for
    /// successive units, which must not increase.
    pub descending_valuations: bool,

    /// Zero out valuations beyond this column index.
    ///
    /// Models a bidder who wants at most this many units.
    pub item_interest_limit: Option<usize>,

    /// Draw one value per instance and repeat it across all items.
    pub constant_marginal_values: bool,

    /// Risk attitude exponent. `1.0` is risk-neutral; values below one are
    /// risk-averse. Utility becomes `payoff^risk` for gains and
    /// `-(-payoff)^risk` for losses.
    pub risk: f64,

    /// Cache actions between valuation draws.
    ///
    /// With caching on, `get_action` recomputes bids only after a redraw.
    pub cache_actions: bool,

    /// Random seed for reproducible valuation draws. `None` seeds from
    /// entropy.
    pub seed: Option<u64>,
}

impl Default for BidderOptions {
    fn default() -> Self {
        Self {
            batch_size: 1024,
            n_items: 1,
            player_position: None,
            descending_valuations: false,
            item_interest_limit: None,
            constant_marginal_values: false,
            risk: 1.0,
            cache_actions: true,
            seed: None,
        }
    }
}

impl BidderOptions {
    /// Create options with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: set the batch size.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Builder method: set the number of items.
    pub fn with_items(mut self, n_items: usize) -> Self {
        self.n_items = n_items;
        self
    }

    /// Builder method: set a fixed player position.
    pub fn with_position(mut self, position: usize) -> Self {
        self.player_position = Some(position);
        self
    }

    /// Builder method: sort valuation rows descending.
    pub fn with_descending_valuations(mut self, enable: bool) -> Self {
        self.descending_valuations = enable;
        self
    }

    /// Builder method: limit interest to the first `limit` items.
    pub fn with_item_interest_limit(mut self, limit: usize) -> Self {
        self.item_interest_limit = Some(limit);
        self
    }

    /// Builder method: repeat one draw across all item columns.
    pub fn with_constant_marginal_values(mut self, enable: bool) -> Self {
        self.constant_marginal_values = enable;
        self
    }

    /// Builder method: set the risk attitude exponent.
    pub fn with_risk(mut self, risk: f64) -> Self {
        self.risk = risk;
        self
    }

    /// Builder method: enable or disable action caching.
    pub fn with_cache_actions(mut self, enable: bool) -> Self {
        self.cache_actions = enable;
        self
    }

    /// Builder method: set the random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Validate the options and return any errors.
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(AuctionError::InvalidParameter {
                name: "batch_size",
                value: 0.0,
                constraint: "must be positive",
            });
        }
        if self.n_items == 0 {
            return Err(AuctionError::InvalidParameter {
                name: "n_items",
                value: 0.0,
                constraint: "must be positive",
            });
        }
        if !self.risk.is_finite() || self.risk <= 0.0 {
            return Err(AuctionError::InvalidParameter {
                name: "risk",
                value: self.risk,
                constraint: "must be positive and finite",
            });
        }
        Ok(())
    }
}

/// A bidder in a Bayesian auction game.
pub struct Bidder {
    /// Valuation prior, common knowledge in the game model.
    prior: ValuationPrior,

    /// The bidding strategy.
    strategy: Arc<dyn Strategy>,

    /// Configuration, fixed after construction.
    options: BidderOptions,

    /// Current batch of private valuations.
    valuations: BatchMatrix,

    /// Cached actions for the current valuations, when caching is enabled.
    cached_actions: Option<BatchMatrix>,

    /// Valuation lifecycle state.
    state: ValuationState,

    /// Random number generator for valuation draws.
    rng: StdRng,
}

impl Bidder {
    /// Create a bidder and draw its first batch of valuations.
    ///
    /// # Arguments
    /// * `prior` - Valuation distribution
    /// * `strategy` - Bidding strategy
    /// * `options` - Bidder configuration
    pub fn new(
        prior: ValuationPrior,
        strategy: Arc<dyn Strategy>,
        options: BidderOptions,
    ) -> Result<Self> {
        options.validate()?;
        prior.validate()?;

        let rng = match options.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut bidder = Self {
            valuations: BatchMatrix::zeros(options.batch_size, options.n_items),
            cached_actions: None,
            state: ValuationState::Stale,
            prior,
            strategy,
            options,
            rng,
        };
        bidder.draw_valuations()?;
        Ok(bidder)
    }

    /// Bidder with a uniform valuation prior on `[low, high)`.
    pub fn uniform(
        low: f64,
        high: f64,
        strategy: Arc<dyn Strategy>,
        options: BidderOptions,
    ) -> Result<Self> {
        Self::new(ValuationPrior::Uniform { low, high }, strategy, options)
    }

    /// Bidder with a Gaussian valuation prior.
    pub fn gaussian(
        mean: f64,
        stddev: f64,
        strategy: Arc<dyn Strategy>,
        options: BidderOptions,
    ) -> Result<Self> {
        Self::new(ValuationPrior::Gaussian { mean, stddev }, strategy, options)
    }

    /// Resample valuations from the prior and invalidate cached actions.
    ///
    /// Draws are post-processed in order: repeat the first column when
    /// marginal values are constant, clip negatives to zero, sort rows
    /// descending when configured, zero columns beyond the interest limit.
    pub fn draw_valuations(&mut self) -> Result<()> {
        self.prior.sample_into(&mut self.rng, &mut self.valuations)?;
        self.post_process_valuations();
        Ok(())
    }

    /// Resample valuations through a correlation device.
    ///
    /// The individual component is drawn from this bidder's own prior and
    /// combined with the group's shared component using the device's mixing
    /// rule. Post-processing matches [`Bidder::draw_valuations`].
    pub fn draw_valuations_correlated(
        &mut self,
        device: &dyn CorrelationDevice,
        common: Option<&BatchMatrix>,
        weights: &Weights,
    ) -> Result<()> {
        self.prior.sample_into(&mut self.rng, &mut self.valuations)?;
        if let Some(common) = common {
            self.valuations = device.mix(&self.valuations, common, weights)?;
        }
        self.post_process_valuations();
        Ok(())
    }

    /// Replace the valuations wholesale, e.g. with a conditional draw.
    pub fn set_valuations(&mut self, valuations: BatchMatrix) -> Result<()> {
        if valuations.batch_size() != self.options.batch_size
            || valuations.n_items() != self.options.n_items
        {
            return Err(AuctionError::ShapeMismatch {
                context: "bidder valuations",
                expected: format!("({}, {})", self.options.batch_size, self.options.n_items),
                actual: format!("({}, {})", valuations.batch_size(), valuations.n_items()),
            });
        }
        self.valuations = valuations;
        self.post_process_valuations();
        Ok(())
    }

    fn post_process_valuations(&mut self) {
        if self.options.constant_marginal_values {
            for row in self.valuations.rows_mut() {
                let v = row[0];
                for x in row.iter_mut() {
                    *x = v;
                }
            }
        }

        self.valuations.clamp_min_zero();

        if self.options.descending_valuations {
            self.valuations.sort_rows_descending();
        }

        if let Some(limit) = self.options.item_interest_limit {
            for row in self.valuations.rows_mut() {
                for x in row.iter_mut().skip(limit) {
                    *x = 0.0;
                }
            }
        }

        self.state = ValuationState::Stale;
    }

    /// Compute bids for the current valuations, or return the cached bids.
    ///
    /// With caching enabled and no redraw since the last call, the returned
    /// actions are bit-identical to the previous ones.
    pub fn get_action(&mut self) -> BatchMatrix {
        if self.options.cache_actions && self.state == ValuationState::Fresh {
            if let Some(actions) = &self.cached_actions {
                return actions.clone();
            }
        }

        let actions = self.strategy.play(&self.valuations);

        if self.options.cache_actions {
            self.cached_actions = Some(actions.clone());
            self.state = ValuationState::Fresh;
        }

        actions
    }

    /// Per-instance utility for a batch of outcomes.
    ///
    /// # Arguments
    /// * `allocations` - This bidder's allocation rows, shape `(batch, items)`
    /// * `payments` - This bidder's payment column, length `batch`
    ///
    /// # Returns
    /// One utility per batch instance; callers decide how to aggregate.
    /// Risk-neutral utility is `sum_i(valuation_i * allocation_i) - payment`;
    /// a non-unit risk exponent bends gains and losses separately.
    pub fn get_utility(&self, allocations: &BatchMatrix, payments: &[f64]) -> Result<Vec<f64>> {
        let batch = self.options.batch_size;
        let items = self.options.n_items;

        if allocations.batch_size() != batch || allocations.n_items() != items {
            return Err(AuctionError::ShapeMismatch {
                context: "allocations for utility",
                expected: format!("({}, {})", batch, items),
                actual: format!("({}, {})", allocations.batch_size(), allocations.n_items()),
            });
        }
        if payments.len() != batch {
            return Err(AuctionError::ShapeMismatch {
                context: "payments for utility",
                expected: format!("{} entries", batch),
                actual: format!("{} entries", payments.len()),
            });
        }

        let risk = self.options.risk;
        let mut utilities = Vec::with_capacity(batch);
        for b in 0..batch {
            let mut payoff = -payments[b];
            for i in 0..items {
                payoff += self.valuations.get(b, i) * allocations.get(b, i);
            }
            let u = if (risk - 1.0).abs() < f64::EPSILON {
                payoff
            } else if payoff >= 0.0 {
                payoff.powf(risk)
            } else {
                -(-payoff).powf(risk)
            };
            utilities.push(u);
        }
        Ok(utilities)
    }

    /// The current valuation batch.
    pub fn valuations(&self) -> &BatchMatrix {
        &self.valuations
    }

    /// The valuation lifecycle state.
    pub fn state(&self) -> ValuationState {
        self.state
    }

    /// The bidder's configuration.
    pub fn options(&self) -> &BidderOptions {
        &self.options
    }

    /// Fixed player position, if any.
    pub fn player_position(&self) -> Option<usize> {
        self.options.player_position
    }

    /// Batch size of every draw.
    pub fn batch_size(&self) -> usize {
        self.options.batch_size
    }

    /// Number of items bid on.
    pub fn n_items(&self) -> usize {
        self.options.n_items
    }

    /// Shared handle to the bidder's strategy.
    pub fn strategy(&self) -> Arc<dyn Strategy> {
        Arc::clone(&self.strategy)
    }
}

/// A player in a complete-information matrix game.
///
/// Carries a fixed position (matrix games are not symmetric) and needs no
/// valuations; its strategy samples action indices directly.
pub struct MatrixGamePlayer {
    strategy: Arc<dyn MatrixStrategy>,
    player_position: usize,
    batch_size: usize,
    rng: StdRng,
}

impl MatrixGamePlayer {
    /// Create a player at a fixed position.
    pub fn new(
        strategy: Arc<dyn MatrixStrategy>,
        player_position: usize,
        batch_size: usize,
        seed: Option<u64>,
    ) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            strategy,
            player_position,
            batch_size,
            rng,
        }
    }

    /// Sample one action per batch instance from the strategy.
    pub fn get_action(&mut self) -> Vec<usize> {
        self.strategy.play(self.batch_size, &mut self.rng)
    }

    /// Utility is the negated payment; matrix games have no allocations.
    pub fn get_utility(&self, payments: &[f64]) -> Vec<f64> {
        payments.iter().map(|p| -p).collect()
    }

    /// This player's fixed position in the action profile.
    pub fn player_position(&self) -> usize {
        self.player_position
    }

    /// Batch size of every action draw.
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }
}
