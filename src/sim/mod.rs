//! Simulation layer: bidders, strategies, correlation, and environments.
//!
//! This module turns the pure mechanisms into playable games. A [`Bidder`]
//! couples a valuation prior with a [`Strategy`] and owns its sampled
//! valuations; an [`AuctionEnvironment`] maintains a pool of opponents and
//! measures any strategy's expected utility against them. Matrix games get
//! the same treatment through [`MatrixGamePlayer`] and
//! [`MatrixGameEnvironment`].
//!
//! # The reward loop
//!
//! Equilibrium search reduces to repeated calls of one primitive:
//!
//! 1. `prepare_iteration()` redraws every pool member's valuations
//! 2. `get_strategy_reward(strategy, ...)` wraps the candidate into a
//!    transient focal bidder, redraws its valuations, and plays it against
//!    the pool
//! 3. the winning candidate is pushed back into the pool, evicting the
//!    oldest member
//!
//! # Correlated valuations
//!
//! Interdependent priors are factored into a [`CorrelationDevice`]: a
//! shared component plus per-instance mixing weights. Devices cover the
//! Bernoulli-weights and constant-weights local models and the common-value
//! mineral-rights model; [`IndependentDevice`] is the trivial case.
//!
//! # Example
//!
//! ```ignore
//! use auction_solver::mechanisms::single_item::VickreyAuction;
//! use auction_solver::sim::{AuctionEnvironment, EnvironmentOptions, TruthfulStrategy};
//!
//! let mut env = AuctionEnvironment::new(
//!     VickreyAuction::new(),
//!     EnvironmentOptions::default().with_batch_size(1 << 16),
//!     to_bidder,
//! )?;
//! env.push_strategy(Arc::new(TruthfulStrategy::new()))?;
//! let reward = env.get_strategy_reward(Arc::new(TruthfulStrategy::new()), true)?;
//! ```

pub mod bidder;
pub mod correlation;
pub mod environment;
pub mod strategy;

// Re-export main types for convenient access
pub use bidder::{
    Bidder, BidderOptions, MatrixGamePlayer, ValuationPrior, ValuationSampler, ValuationState,
};
pub use correlation::{
    BernoulliWeightsDevice, ConstantWeightsDevice, CorrelationDevice, IndependentDevice,
    MineralRightsDevice, Weights,
};
pub use environment::{
    AuctionEnvironment, EnvironmentOptions, MatrixGameEnvironment, StrategyToBidder,
};
pub use strategy::{
    run_fictitious_play, ClosureStrategy, FictitiousPlayStrategy, LinearBidStrategy,
    MatrixStrategy, MixedStrategy, Strategy, TruthfulStrategy,
};
