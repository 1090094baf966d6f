//! Ready-made experiment settings.
//!
//! Each constructor builds the mechanism, the valuation priors, and a
//! fully-wired environment for one studied setting, and returns it together
//! with a serializable [`ExperimentPreset`] describing the run. Focal
//! bidders are seeded from a per-preset counter, so repeated strategy
//! evaluations see fresh but reproducible valuation draws.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{AuctionError, Result};
use crate::mechanisms::llg::{LlgAuction, PaymentRule};
use crate::mechanisms::multi_unit::{MultiUnitAuction, MultiUnitPricing};
use crate::mechanisms::single_item::{FirstPriceAuction, VickreyAuction};
use crate::mechanisms::Mechanism;
use crate::sim::bidder::{Bidder, BidderOptions, ValuationPrior};
use crate::sim::correlation::{BernoulliWeightsDevice, ConstantWeightsDevice};
use crate::sim::environment::{AuctionEnvironment, EnvironmentOptions, StrategyToBidder};
use crate::sim::strategy::TruthfulStrategy;

/// Payment rule of a single-item preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SingleItemRule {
    /// Winner pays their own bid.
    FirstPrice,
    /// Winner pays the second-highest bid.
    SecondPrice,
}

impl SingleItemRule {
    /// Parse a rule name. `"vickrey"` is accepted as an alias for
    /// `"second_price"`.
    pub fn parse(name: &str) -> Result<Self> {
        match name {
            "first_price" => Ok(SingleItemRule::FirstPrice),
            "second_price" | "vickrey" => Ok(SingleItemRule::SecondPrice),
            other => Err(AuctionError::UnknownPaymentRule(other.to_string())),
        }
    }

    /// Canonical rule name.
    pub fn name(&self) -> &'static str {
        match self {
            SingleItemRule::FirstPrice => "first_price",
            SingleItemRule::SecondPrice => "second_price",
        }
    }
}

/// Correlation structure between LLG local valuations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CorrelationModel {
    /// Locals draw independently.
    Independent,
    /// Per-instance Bernoulli choice between common and individual draws.
    BernoulliWeights,
    /// Fixed convex mix of common and individual draws.
    ConstantWeights,
}

impl CorrelationModel {
    /// Parse a model name.
    pub fn parse(name: &str) -> Result<Self> {
        match name {
            "independent" => Ok(CorrelationModel::Independent),
            "bernoulli_weights" | "bernoulli" => Ok(CorrelationModel::BernoulliWeights),
            "constant_weights" | "constant" => Ok(CorrelationModel::ConstantWeights),
            other => Err(AuctionError::UnknownPaymentRule(other.to_string())),
        }
    }

    /// Canonical model name.
    pub fn name(&self) -> &'static str {
        match self {
            CorrelationModel::Independent => "independent",
            CorrelationModel::BernoulliWeights => "bernoulli_weights",
            CorrelationModel::ConstantWeights => "constant_weights",
        }
    }
}

/// Valuation prior description for run outputs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PriorSpec {
    /// Uniform on `[low, high)`.
    Uniform {
        /// Inclusive lower bound.
        low: f64,
        /// Exclusive upper bound.
        high: f64,
    },
    /// Normal, clipped at zero by the bidder.
    Gaussian {
        /// Location parameter.
        mean: f64,
        /// Scale parameter.
        stddev: f64,
    },
}

impl PriorSpec {
    fn to_prior(self) -> ValuationPrior {
        match self {
            PriorSpec::Uniform { low, high } => ValuationPrior::Uniform { low, high },
            PriorSpec::Gaussian { mean, stddev } => ValuationPrior::Gaussian { mean, stddev },
        }
    }
}

/// Correlation description for run outputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationSpec {
    /// Model name.
    pub model: String,
    /// Correlation strength in `[0, 1]`.
    pub gamma: f64,
}

/// Serializable description of a preset experiment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentPreset {
    /// Human-readable setting name.
    pub name: String,

    /// Payment rule identifier.
    pub payment_rule: String,

    /// Number of players.
    pub n_players: usize,

    /// Game instances per evaluation batch.
    pub batch_size: usize,

    /// Focal bidder's valuation prior.
    pub prior: PriorSpec,

    /// Risk attitude exponent.
    pub risk: f64,

    /// Correlation structure, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation: Option<CorrelationSpec>,

    /// Base seed of the run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

/// A preset bundled with its ready-to-train environment.
pub struct Experiment {
    /// Run description, for output files.
    pub preset: ExperimentPreset,
    /// Environment wired per the preset.
    pub environment: AuctionEnvironment<Box<dyn Mechanism>>,
}

/// Focal-bidder factory with counter-derived seeds.
///
/// `StdRng::seed_from_u64` mixes the seed, so consecutive counter values
/// give independent streams while keeping runs reproducible.
fn seeded_bidder_factory(
    prior: ValuationPrior,
    options: BidderOptions,
    base_seed: u64,
) -> StrategyToBidder {
    let counter = AtomicU64::new(0);
    Arc::new(move |strategy| {
        let n = counter.fetch_add(1, Ordering::Relaxed);
        Bidder::new(
            prior.clone(),
            strategy,
            options.clone().with_seed(base_seed.wrapping_add(n)),
        )
    })
}

fn validate_symmetric_players(n_players: usize) -> Result<()> {
    if n_players < 2 {
        return Err(AuctionError::InvalidParameter {
            name: "n_players",
            value: n_players as f64,
            constraint: "symmetric presets need at least 2 players",
        });
    }
    Ok(())
}

/// Symmetric single-item auction with uniform valuations.
pub fn single_item_uniform_symmetric(
    rule: SingleItemRule,
    n_players: usize,
    u_lo: f64,
    u_hi: f64,
    risk: f64,
    batch_size: usize,
    seed: u64,
) -> Result<Experiment> {
    validate_symmetric_players(n_players)?;
    let prior_spec = PriorSpec::Uniform {
        low: u_lo,
        high: u_hi,
    };

    let mechanism: Box<dyn Mechanism> = match rule {
        SingleItemRule::FirstPrice => Box::new(FirstPriceAuction::new()),
        SingleItemRule::SecondPrice => Box::new(VickreyAuction::new()),
    };

    let bidder_options = BidderOptions::default()
        .with_batch_size(batch_size)
        .with_risk(risk);
    let environment = AuctionEnvironment::new(
        mechanism,
        EnvironmentOptions::default()
            .with_batch_size(batch_size)
            .with_players(n_players)
            .with_max_pool_size(n_players - 1)
            .with_seed(seed),
        seeded_bidder_factory(prior_spec.to_prior(), bidder_options, seed),
    )?;

    Ok(Experiment {
        preset: ExperimentPreset {
            name: format!("single_item/{}/uniform/{}p", rule.name(), n_players),
            payment_rule: rule.name().to_string(),
            n_players,
            batch_size,
            prior: prior_spec,
            risk,
            correlation: None,
            seed: Some(seed),
        },
        environment,
    })
}

/// Symmetric single-item auction with Gaussian valuations, clipped at zero
/// by the bidders.
pub fn single_item_gaussian_symmetric(
    rule: SingleItemRule,
    n_players: usize,
    mean: f64,
    stddev: f64,
    batch_size: usize,
    seed: u64,
) -> Result<Experiment> {
    validate_symmetric_players(n_players)?;
    let prior_spec = PriorSpec::Gaussian { mean, stddev };

    let mechanism: Box<dyn Mechanism> = match rule {
        SingleItemRule::FirstPrice => Box::new(FirstPriceAuction::new()),
        SingleItemRule::SecondPrice => Box::new(VickreyAuction::new()),
    };

    let bidder_options = BidderOptions::default().with_batch_size(batch_size);
    let environment = AuctionEnvironment::new(
        mechanism,
        EnvironmentOptions::default()
            .with_batch_size(batch_size)
            .with_players(n_players)
            .with_max_pool_size(n_players - 1)
            .with_seed(seed),
        seeded_bidder_factory(prior_spec.to_prior(), bidder_options, seed),
    )?;

    Ok(Experiment {
        preset: ExperimentPreset {
            name: format!("single_item/{}/gaussian/{}p", rule.name(), n_players),
            payment_rule: rule.name().to_string(),
            n_players,
            batch_size,
            prior: prior_spec,
            risk: 1.0,
            correlation: None,
            seed: Some(seed),
        },
        environment,
    })
}

/// The local-local-global combinatorial auction.
///
/// The learner plays the local at slot 0. The pool holds a mirrored local
/// at index 0 (overwrite it with `winner_slots = [0]`) and a truthful
/// global bidder with valuations on `[0, 2)` at index 1. Correlated local
/// models bind slots 0 and 1 to one device.
pub fn llg(
    rule: PaymentRule,
    gamma: f64,
    model: CorrelationModel,
    batch_size: usize,
    seed: u64,
) -> Result<Experiment> {
    if model == CorrelationModel::Independent && gamma != 0.0 {
        return Err(AuctionError::InvalidParameter {
            name: "gamma",
            value: gamma,
            constraint: "must be zero for independent locals",
        });
    }

    let local_prior = ValuationPrior::Uniform {
        low: 0.0,
        high: 1.0,
    };
    let global_prior = ValuationPrior::Uniform {
        low: 0.0,
        high: 2.0,
    };

    let mechanism: Box<dyn Mechanism> = Box::new(LlgAuction::new(rule));
    let bidder_options = BidderOptions::default().with_batch_size(batch_size);

    let mut environment = AuctionEnvironment::new(
        mechanism,
        EnvironmentOptions::default()
            .with_batch_size(batch_size)
            .with_players(3)
            .with_max_pool_size(2)
            .with_seed(seed),
        seeded_bidder_factory(local_prior.clone(), bidder_options.clone(), seed),
    )?;

    // Pool index 0 fills profile slot 1 (the other local), index 1 fills
    // slot 2 (the global).
    environment.push_strategy(Arc::new(TruthfulStrategy::new()))?;
    let global = Bidder::new(
        global_prior,
        Arc::new(TruthfulStrategy::new()),
        bidder_options
            .with_position(2)
            .with_seed(seed.wrapping_add(0x0105)),
    )?;
    environment.push_agent(global)?;

    match model {
        CorrelationModel::Independent => {}
        CorrelationModel::BernoulliWeights => {
            let device = BernoulliWeightsDevice::new(local_prior, batch_size, 1, gamma)?;
            environment.set_correlation(Arc::new(device), vec![0, 1])?;
        }
        CorrelationModel::ConstantWeights => {
            let device = ConstantWeightsDevice::new(local_prior, batch_size, 1, gamma)?;
            environment.set_correlation(Arc::new(device), vec![0, 1])?;
        }
    }

    Ok(Experiment {
        preset: ExperimentPreset {
            name: format!("llg/{}/gamma_{:.2}", rule.name(), gamma),
            payment_rule: rule.name().to_string(),
            n_players: 3,
            batch_size,
            prior: PriorSpec::Uniform {
                low: 0.0,
                high: 1.0,
            },
            risk: 1.0,
            correlation: Some(CorrelationSpec {
                model: model.name().to_string(),
                gamma,
            }),
            seed: Some(seed),
        },
        environment,
    })
}

/// Demand structure of multi-unit bidders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitDemand {
    /// Number of units on offer, and of marginal values per bidder.
    pub units: usize,
    /// Cap on how many units a bidder values; later values are zeroed.
    pub interest_limit: Option<usize>,
    /// Draw one marginal value and repeat it across all units.
    pub constant_marginals: bool,
}

impl Default for UnitDemand {
    fn default() -> Self {
        Self {
            units: 2,
            interest_limit: None,
            constant_marginals: false,
        }
    }
}

impl UnitDemand {
    /// Demand for `units` items with unrestricted marginal values.
    pub fn new(units: usize) -> Self {
        Self {
            units,
            ..Self::default()
        }
    }

    /// Builder method: cap the number of units valued.
    pub fn with_interest_limit(mut self, limit: usize) -> Self {
        self.interest_limit = Some(limit);
        self
    }

    /// Builder method: repeat one draw across all units.
    pub fn with_constant_marginals(mut self, enable: bool) -> Self {
        self.constant_marginals = enable;
        self
    }
}

/// Symmetric multi-unit auction with uniform marginal values.
pub fn multiunit(
    pricing: MultiUnitPricing,
    n_players: usize,
    demand: UnitDemand,
    u_lo: f64,
    u_hi: f64,
    batch_size: usize,
    seed: u64,
) -> Result<Experiment> {
    validate_symmetric_players(n_players)?;
    if demand.units == 0 {
        return Err(AuctionError::InvalidParameter {
            name: "units",
            value: 0.0,
            constraint: "must be positive",
        });
    }
    let prior_spec = PriorSpec::Uniform {
        low: u_lo,
        high: u_hi,
    };

    let mechanism: Box<dyn Mechanism> = Box::new(MultiUnitAuction::new(pricing));

    let mut bidder_options = BidderOptions::default()
        .with_batch_size(batch_size)
        .with_items(demand.units)
        .with_descending_valuations(true)
        .with_constant_marginal_values(demand.constant_marginals);
    if let Some(limit) = demand.interest_limit {
        bidder_options = bidder_options.with_item_interest_limit(limit);
    }

    let environment = AuctionEnvironment::new(
        mechanism,
        EnvironmentOptions::default()
            .with_batch_size(batch_size)
            .with_players(n_players)
            .with_max_pool_size(n_players - 1)
            .with_seed(seed),
        seeded_bidder_factory(prior_spec.to_prior(), bidder_options, seed),
    )?;

    Ok(Experiment {
        preset: ExperimentPreset {
            name: format!(
                "multiunit/{}/{}p_{}u",
                pricing.name(),
                n_players,
                demand.units
            ),
            payment_rule: pricing.name().to_string(),
            n_players,
            batch_size,
            prior: prior_spec,
            risk: 1.0,
            correlation: None,
            seed: Some(seed),
        },
        environment,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::strategy::LinearBidStrategy;

    #[test]
    fn test_rule_and_model_parsing() {
        assert_eq!(
            SingleItemRule::parse("vickrey").unwrap(),
            SingleItemRule::SecondPrice
        );
        assert_eq!(
            SingleItemRule::parse("first_price").unwrap(),
            SingleItemRule::FirstPrice
        );
        assert!(SingleItemRule::parse("all_pay").is_err());

        assert_eq!(
            CorrelationModel::parse("bernoulli").unwrap(),
            CorrelationModel::BernoulliWeights
        );
        assert!(CorrelationModel::parse("mystery").is_err());
    }

    #[test]
    fn test_single_item_preset_measures_truthful_play() {
        let mut experiment = single_item_uniform_symmetric(
            SingleItemRule::SecondPrice,
            2,
            0.0,
            1.0,
            1.0,
            10_000,
            42,
        )
        .unwrap();
        experiment
            .environment
            .push_strategy(Arc::new(TruthfulStrategy::new()))
            .unwrap();

        let reward = experiment
            .environment
            .get_strategy_reward(Arc::new(TruthfulStrategy::new()), true)
            .unwrap();
        assert!(
            (reward - 1.0 / 6.0).abs() < 0.02,
            "truthful second-price reward {} should be near 1/6",
            reward
        );
        assert_eq!(experiment.preset.n_players, 2);
        assert_eq!(experiment.preset.payment_rule, "second_price");
    }

    #[test]
    fn test_llg_preset_wires_local_and_global() {
        let experiment = llg(
            PaymentRule::NearestVcg,
            0.0,
            CorrelationModel::Independent,
            2_000,
            7,
        )
        .unwrap();

        assert_eq!(experiment.environment.size(), 2);
        let positions: Vec<_> = experiment
            .environment
            .agents()
            .map(|a| a.player_position())
            .collect();
        assert_eq!(
            positions,
            vec![None, Some(2)],
            "pool must hold the mirrored local then the global"
        );
        let items: Vec<_> = experiment
            .environment
            .agents()
            .map(|a| a.valuations().n_items())
            .collect();
        assert_eq!(items, vec![1, 1]);
    }

    #[test]
    fn test_llg_preset_rejects_nonzero_gamma_without_model() {
        assert!(llg(
            PaymentRule::Vcg,
            0.5,
            CorrelationModel::Independent,
            1_000,
            1
        )
        .is_err());
    }

    #[test]
    fn test_llg_correlated_preset_rewards_are_nonnegative() {
        // Locals never pay above their bids under core rules, so truthful
        // local play cannot lose money.
        let mut experiment = llg(
            PaymentRule::NearestZero,
            0.5,
            CorrelationModel::BernoulliWeights,
            4_000,
            11,
        )
        .unwrap();
        experiment.environment.prepare_iteration().unwrap();
        let reward = experiment
            .environment
            .get_strategy_reward(Arc::new(TruthfulStrategy::new()), false)
            .unwrap();
        assert!(
            reward >= 0.0,
            "truthful local reward {} must be non-negative",
            reward
        );
    }

    #[test]
    fn test_multiunit_preset_builds_matching_bidders() {
        let mut experiment = multiunit(
            MultiUnitPricing::UniformPrice,
            2,
            UnitDemand::new(2),
            0.0,
            1.0,
            2_000,
            3,
        )
        .unwrap();
        experiment
            .environment
            .push_strategy(Arc::new(LinearBidStrategy::truthful()))
            .unwrap();

        let reward = experiment
            .environment
            .get_strategy_reward(Arc::new(LinearBidStrategy::truthful()), true)
            .unwrap();
        assert!(reward.is_finite());
        assert_eq!(experiment.preset.name, "multiunit/uniform/2p_2u");
    }

    #[test]
    fn test_preset_serde_round_trip() {
        let experiment = single_item_gaussian_symmetric(
            SingleItemRule::FirstPrice,
            3,
            15.0,
            10.0,
            1_000,
            5,
        )
        .unwrap();
        let json = serde_json::to_string(&experiment.preset).unwrap();
        let back: ExperimentPreset = serde_json::from_str(&json).unwrap();
        assert_eq!(back, experiment.preset);
    }
}
