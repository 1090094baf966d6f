//! # Auction Solver
//!
//! A batched auction simulation core for learning equilibrium bidding
//! strategies in Bayesian auction games.
//!
//! ## Features
//!
//! - **Pure Mechanisms**: Vickrey, first-price, multi-unit, and the LLG
//!   combinatorial auction with core-selecting payment rules
//! - **Batched Play**: Every operation runs over thousands of parallel
//!   game instances in flat row-major buffers
//! - **Opponent Pools**: Environments measure strategies against a FIFO
//!   window of historical opponents
//! - **Correlated Valuations**: Bernoulli-weights, constant-weights, and
//!   mineral-rights common-value models
//! - **Self-Play Learning**: Gradient-free perturbation search with
//!   analytic Bayes-Nash baselines to compare against
//!
//! ## Quick Start
//!
//! ```ignore
//! use auction_solver::experiment::{self, LearnerConfig, SelfPlayLearner, SingleItemRule};
//! use auction_solver::sim::LinearBidStrategy;
//!
//! // 1. Build a preset environment
//! let experiment = experiment::single_item_uniform_symmetric(
//!     SingleItemRule::FirstPrice, 2, 0.0, 1.0, 1.0, 1 << 16, 42)?;
//!
//! // 2. Train a learner in it
//! let mut learner = SelfPlayLearner::new(
//!     experiment.environment, LinearBidStrategy::truthful(), LearnerConfig::default())?;
//! learner.train(500)?;
//!
//! // 3. Compare to the known equilibrium
//! let learned = learner.strategy(); // slope near 0.5
//! ```
//!
//! ## Modules
//!
//! - [`batch`]: flat row-major tensors for bids, allocations, payments
//! - [`mechanisms`]: auction rules mapping bid profiles to outcomes
//! - [`sim`]: bidders, strategies, correlation devices, environments
//! - [`experiment`]: presets, the self-play learner, analytic baselines
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     Experiment Layer                            │
//! │  - Presets (single-item, LLG, multi-unit)                       │
//! │  - Self-play learner      - Analytic BNE baselines              │
//! └─────────────────────────────────────────────────────────────────┘
//!                               │
//!                               │ get_strategy_reward
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     Simulation Layer                            │
//! │  - Bidders (priors, risk)  - Opponent pools                     │
//! │  - Correlation devices     - Matrix-game players                │
//! └─────────────────────────────────────────────────────────────────┘
//!                               │
//!                               │ play(bids) -> outcome
//!                               ▼
//!         ┌─────────────────────┼─────────────────────┐
//!         │                     │                     │
//!         ▼                     ▼                     ▼
//!    ┌─────────┐         ┌───────────┐         ┌───────────┐
//!    │ Single  │         │ Multi-    │         │    LLG    │
//!    │  Item   │         │  Unit     │         │   Core    │
//!    └─────────┘         └───────────┘         └───────────┘
//! ```

#![warn(missing_docs)]

/// Batched tensor types shared by all layers.
///
/// Flat row-major storage for valuations, bids, allocations, and payments.
pub mod batch;

/// Error types for the whole crate.
pub mod error;

/// Mechanism implementations module.
///
/// Pure auction rules: given bids, produce allocations and payments.
pub mod mechanisms;

/// Simulation module.
///
/// Bidders, strategies, correlation devices, and environments.
pub mod sim;

/// Experiment module.
///
/// Presets, the self-play learner, analytic baselines, run outputs.
pub mod experiment;

// Re-export commonly used types at crate root for convenience
pub use batch::{ActionProfile, Allocation, BatchMatrix, BidProfile, Outcome, Payments};
pub use error::{AuctionError, Result};
pub use mechanisms::Mechanism;
pub use sim::{AuctionEnvironment, Bidder, BidderOptions, EnvironmentOptions, Strategy};
