//! Experiment layer: presets, the self-play learner, analytic baselines,
//! and run outputs.
//!
//! An experiment wires one preset setting into an environment, trains a
//! [`SelfPlayLearner`] in it, and writes a [`RunOutput`] comparing the
//! learned strategy to the known equilibrium where one exists:
//!
//! ```text
//!   presets ──> AuctionEnvironment ──> SelfPlayLearner ──> RunOutput
//!                                          │
//!                      analytic baselines ─┘ (reference strategies)
//! ```
//!
//! The studied settings mirror the classic testbed: symmetric single-item
//! auctions under uniform and Gaussian priors, the LLG combinatorial
//! auction with core-selecting payment rules and correlated locals, and
//! multi-unit auctions.

pub mod analytic;
pub mod learner;
pub mod output;
pub mod presets;

// Re-export main types for convenient access
pub use learner::{LearnerConfig, LearnerStats, RewardPoint, SelfPlayLearner};
pub use output::{EpochRecord, LearnedReport, RunCollection, RunMetadata, RunOutput};
pub use presets::{
    llg, multiunit, single_item_gaussian_symmetric, single_item_uniform_symmetric,
    CorrelationModel, Experiment, ExperimentPreset, PriorSpec, SingleItemRule, UnitDemand,
};
