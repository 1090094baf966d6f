//! Gradient-free self-play learner over linear bid strategies.
//!
//! Each epoch the learner redraws the opponent pool, evaluates a population
//! of Gaussian perturbations of the incumbent strategy against the shared
//! environment, keeps the best candidate, and commits it back into the pool.
//! The perturbation scale decays multiplicatively so the search narrows as
//! play stabilizes. Candidates are evaluated sequentially: the environment
//! is a single mutable resource and parallelism lives inside the batch
//! dimension, not across candidates.

use std::sync::Arc;
use std::time::Instant;

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

use crate::error::{AuctionError, Result};
use crate::mechanisms::Mechanism;
use crate::sim::environment::AuctionEnvironment;
use crate::sim::strategy::LinearBidStrategy;

/// Configuration for the self-play learner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearnerConfig {
    /// Number of perturbed candidates evaluated per epoch.
    pub population_size: usize,

    /// Initial standard deviation of parameter perturbations.
    pub sigma: f64,

    /// Multiplicative decay applied to sigma after every epoch.
    pub sigma_decay: f64,

    /// Lower bound sigma never decays below.
    pub sigma_floor: f64,

    /// Pool indices overwritten by each epoch's winner. Empty means the
    /// winner is pushed FIFO instead, evicting the oldest member. Use
    /// explicit indices when pool order encodes player roles.
    pub winner_slots: Vec<usize>,

    /// Random seed for the perturbation noise (`None` = entropy).
    pub seed: Option<u64>,
}

impl Default for LearnerConfig {
    fn default() -> Self {
        Self {
            population_size: 128, // candidates per epoch
            sigma: 1.0,           // initial search radius
            sigma_decay: 0.99,    // per-epoch shrink factor
            sigma_floor: 1e-3,    // never stop exploring entirely
            winner_slots: Vec::new(),
            seed: None,
        }
    }
}

impl LearnerConfig {
    /// Create a config with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Small population and tighter search, for quick runs and tests.
    pub fn quick() -> Self {
        Self {
            population_size: 32,
            sigma: 0.5,
            sigma_decay: 0.95,
            ..Self::default()
        }
    }

    /// Builder method: set the population size.
    pub fn with_population_size(mut self, population_size: usize) -> Self {
        self.population_size = population_size;
        self
    }

    /// Builder method: set the initial perturbation scale.
    pub fn with_sigma(mut self, sigma: f64) -> Self {
        self.sigma = sigma;
        self
    }

    /// Builder method: set the per-epoch sigma decay.
    pub fn with_sigma_decay(mut self, sigma_decay: f64) -> Self {
        self.sigma_decay = sigma_decay;
        self
    }

    /// Builder method: set the sigma floor.
    pub fn with_sigma_floor(mut self, sigma_floor: f64) -> Self {
        self.sigma_floor = sigma_floor;
        self
    }

    /// Builder method: commit winners to fixed pool indices.
    pub fn with_winner_slots(mut self, winner_slots: Vec<usize>) -> Self {
        self.winner_slots = winner_slots;
        self
    }

    /// Builder method: set the random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Validate the configuration and return any errors.
    pub fn validate(&self) -> Result<()> {
        if self.population_size == 0 {
            return Err(AuctionError::InvalidParameter {
                name: "population_size",
                value: 0.0,
                constraint: "must be positive",
            });
        }
        if !self.sigma.is_finite() || self.sigma <= 0.0 {
            return Err(AuctionError::InvalidParameter {
                name: "sigma",
                value: self.sigma,
                constraint: "must be positive and finite",
            });
        }
        if !self.sigma_decay.is_finite() || self.sigma_decay <= 0.0 || self.sigma_decay > 1.0 {
            return Err(AuctionError::InvalidParameter {
                name: "sigma_decay",
                value: self.sigma_decay,
                constraint: "must be in (0, 1]",
            });
        }
        if !self.sigma_floor.is_finite() || self.sigma_floor <= 0.0 {
            return Err(AuctionError::InvalidParameter {
                name: "sigma_floor",
                value: self.sigma_floor,
                constraint: "must be positive and finite",
            });
        }
        Ok(())
    }
}

/// Statistics from a training run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LearnerStats {
    /// Total number of epochs completed.
    pub epochs: u64,

    /// Reward of the most recent epoch's winner.
    pub best_reward: f64,

    /// Current incumbent intercept.
    pub intercept: f64,

    /// Current incumbent slope.
    pub slope: f64,

    /// Current perturbation scale.
    pub sigma: f64,

    /// Total time spent training (in seconds).
    pub elapsed_seconds: f64,

    /// Epochs per second.
    pub epochs_per_second: f64,

    /// History of winner rewards.
    pub reward_history: Vec<RewardPoint>,
}

/// A single reward measurement at a specific epoch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardPoint {
    /// Epoch number when this measurement was taken.
    pub epoch: u64,
    /// Reward of that epoch's winner.
    pub reward: f64,
}

impl LearnerStats {
    /// Create new empty stats.
    pub fn new() -> Self {
        Self::default()
    }

    /// Update epochs per second based on elapsed time.
    pub fn update_rate(&mut self) {
        if self.elapsed_seconds > 0.0 {
            self.epochs_per_second = self.epochs as f64 / self.elapsed_seconds;
        }
    }

    /// Record a winner reward measurement.
    pub fn record_reward(&mut self, epoch: u64, reward: f64) {
        self.best_reward = reward;
        self.reward_history.push(RewardPoint { epoch, reward });
    }
}

/// Perturbation-search learner coupled to one environment.
///
/// # Example
/// ```ignore
/// let mut learner = SelfPlayLearner::new(env, LinearBidStrategy::truthful(), config)?;
/// learner.train(500)?;
/// let learned = learner.strategy();
/// ```
pub struct SelfPlayLearner<M: Mechanism> {
    /// Environment the incumbent and all candidates are measured against.
    env: AuctionEnvironment<M>,

    /// Current incumbent strategy.
    current: LinearBidStrategy,

    /// Learner configuration.
    config: LearnerConfig,

    /// Training statistics.
    stats: LearnerStats,

    /// Epochs completed so far.
    epoch: u64,

    /// Current perturbation scale.
    sigma: f64,

    /// Noise source for perturbations.
    rng: StdRng,
}

impl<M: Mechanism> SelfPlayLearner<M> {
    /// Create a learner around an environment.
    ///
    /// An empty pool is seeded with copies of the initial strategy, one per
    /// opponent slot, so the first epoch has a full profile to play
    /// against. A pre-filled pool (e.g. a fixed truthful opponent) is left
    /// untouched.
    pub fn new(
        mut env: AuctionEnvironment<M>,
        initial: LinearBidStrategy,
        config: LearnerConfig,
    ) -> Result<Self> {
        config.validate()?;

        if env.is_empty() && env.n_players() >= 2 {
            for _ in 0..env.n_players() - 1 {
                env.push_strategy(Arc::new(initial))?;
            }
        }

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let sigma = config.sigma;
        let mut stats = LearnerStats::new();
        stats.intercept = initial.intercept;
        stats.slope = initial.slope;
        stats.sigma = sigma;

        Ok(Self {
            env,
            current: initial,
            config,
            stats,
            epoch: 0,
            sigma,
            rng,
        })
    }

    /// Run a single epoch and return the winner's reward.
    ///
    /// The opponent pool is redrawn once, then the incumbent and every
    /// perturbed candidate are measured against the same pool state. The
    /// incumbent survives ties, so the committed strategy never regresses
    /// under the current evaluation noise.
    pub fn run_epoch(&mut self) -> Result<f64> {
        self.epoch += 1;
        self.env.prepare_iteration()?;

        let noise = Normal::new(0.0, self.sigma).map_err(|_| AuctionError::InvalidParameter {
            name: "sigma",
            value: self.sigma,
            constraint: "must be positive and finite",
        })?;

        let mut best = self.current;
        let mut best_reward = self
            .env
            .get_strategy_reward(Arc::new(self.current), false)?;

        for _ in 0..self.config.population_size {
            let candidate = LinearBidStrategy::new(
                self.current.intercept + noise.sample(&mut self.rng),
                self.current.slope + noise.sample(&mut self.rng),
            );
            let reward = self.env.get_strategy_reward(Arc::new(candidate), false)?;
            if reward > best_reward {
                best_reward = reward;
                best = candidate;
            }
        }

        self.current = best;
        self.commit_winner()?;
        self.sigma = (self.sigma * self.config.sigma_decay).max(self.config.sigma_floor);

        self.stats.best_reward = best_reward;
        self.stats.intercept = self.current.intercept;
        self.stats.slope = self.current.slope;
        self.stats.sigma = self.sigma;

        Ok(best_reward)
    }

    /// Put the epoch winner back into the opponent pool.
    fn commit_winner(&mut self) -> Result<()> {
        if self.env.n_players() < 2 {
            return Ok(());
        }
        if self.config.winner_slots.is_empty() {
            self.env.push_strategy(Arc::new(self.current))
        } else {
            for &index in &self.config.winner_slots {
                self.env
                    .replace_strategy(index, Arc::new(self.current))?;
            }
            Ok(())
        }
    }

    /// Train the learner for a specified number of epochs.
    ///
    /// # Arguments
    /// * `epochs` - Number of epochs to run
    ///
    /// # Returns
    /// Statistics from the training run.
    pub fn train(&mut self, epochs: u64) -> Result<&LearnerStats> {
        let start_time = Instant::now();

        for _ in 0..epochs {
            let reward = self.run_epoch()?;
            self.stats.record_reward(self.epoch, reward);
        }

        self.stats.epochs = self.epoch;
        self.stats.elapsed_seconds = start_time.elapsed().as_secs_f64();
        self.stats.update_rate();

        Ok(&self.stats)
    }

    /// Train with a callback for progress tracking.
    ///
    /// # Arguments
    /// * `epochs` - Number of epochs to run
    /// * `callback_interval` - How often to call the callback
    /// * `callback` - Function called every `callback_interval` epochs
    pub fn train_with_callback<F>(
        &mut self,
        epochs: u64,
        callback_interval: u64,
        mut callback: F,
    ) -> Result<&LearnerStats>
    where
        F: FnMut(&LearnerStats),
    {
        let start_time = Instant::now();

        for i in 0..epochs {
            let reward = self.run_epoch()?;
            self.stats.record_reward(self.epoch, reward);

            if (i + 1) % callback_interval == 0 {
                self.stats.epochs = self.epoch;
                self.stats.elapsed_seconds = start_time.elapsed().as_secs_f64();
                self.stats.update_rate();
                callback(&self.stats);
            }
        }

        self.stats.epochs = self.epoch;
        self.stats.elapsed_seconds = start_time.elapsed().as_secs_f64();
        self.stats.update_rate();

        Ok(&self.stats)
    }

    /// The current incumbent strategy.
    pub fn strategy(&self) -> LinearBidStrategy {
        self.current
    }

    /// Epochs completed so far.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Current perturbation scale.
    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    /// Training statistics.
    pub fn stats(&self) -> &LearnerStats {
        &self.stats
    }

    /// The learner's configuration.
    pub fn config(&self) -> &LearnerConfig {
        &self.config
    }

    /// Reference to the environment.
    pub fn environment(&self) -> &AuctionEnvironment<M> {
        &self.env
    }

    /// Mutable reference to the environment, e.g. for final evaluation
    /// against an analytic opponent.
    pub fn environment_mut(&mut self) -> &mut AuctionEnvironment<M> {
        &mut self.env
    }
}
