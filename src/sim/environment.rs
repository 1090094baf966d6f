//! Environments: batched play of one focal agent against a pool.
//!
//! [`AuctionEnvironment`] drives the Bayesian case. It owns a bounded FIFO
//! pool of opponent bidders and measures a focal agent's expected utility
//! against the field: the focal action fills profile slot 0, pool members
//! fill slots `1..n_players` in groups of `n_players - 1`, and the reward
//! is the batch-mean utility per group averaged again over groups. With two
//! players every pool member is its own group, so the pool acts as a
//! sliding window of historical opponents.
//!
//! [`MatrixGameEnvironment`] drives the complete-information case, where
//! every agent carries a fixed position and the action profile is assembled
//! by position rather than by pool order.

use std::collections::VecDeque;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::batch::{ActionProfile, BatchMatrix, BidProfile};
use crate::error::{AuctionError, Result};
use crate::mechanisms::{MatrixGame, Mechanism};
use crate::sim::bidder::{Bidder, MatrixGamePlayer};
use crate::sim::correlation::{CorrelationDevice, Weights};
use crate::sim::strategy::{MatrixStrategy, Strategy};

/// Builds a transient focal bidder from a bare strategy. Injected by the
/// experiment layer, which knows the prior and bidder configuration.
pub type StrategyToBidder = Arc<dyn Fn(Arc<dyn Strategy>) -> Result<Bidder> + Send + Sync>;

/// Configuration for an [`AuctionEnvironment`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentOptions {
    /// Number of parallel game instances per play.
    pub batch_size: usize,

    /// Number of players the mechanism is played with.
    pub n_players: usize,

    /// Upper bound on the opponent pool. When full, pushing evicts the
    /// oldest member. `None` means unbounded.
    pub max_pool_size: Option<usize>,

    /// Seed for the environment's own randomness (correlation draws).
    pub seed: Option<u64>,
}

impl Default for EnvironmentOptions {
    fn default() -> Self {
        Self {
            batch_size: 1024,
            n_players: 2,
            max_pool_size: None,
            seed: None,
        }
    }
}

impl EnvironmentOptions {
    /// Create options with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: set the batch size.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Builder method: set the player count.
    pub fn with_players(mut self, n_players: usize) -> Self {
        self.n_players = n_players;
        self
    }

    /// Builder method: bound the opponent pool.
    pub fn with_max_pool_size(mut self, max: usize) -> Self {
        self.max_pool_size = Some(max);
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
        if self.n_players == 0 {
            return Err(AuctionError::InvalidParameter {
                name: "n_players",
                value: 0.0,
                constraint: "must be positive",
            });
        }
        Ok(())
    }
}

/// Shared randomness drawn once per iteration for one correlated group.
struct GroupDraw {
    common: Option<BatchMatrix>,
    weights: Weights,
}

/// A correlation device bound to a set of profile slots.
struct CorrelationGroup {
    device: Arc<dyn CorrelationDevice>,
    positions: Vec<usize>,
    draw: Option<GroupDraw>,
}

impl CorrelationGroup {
    fn refresh(&mut self, rng: &mut StdRng) -> Result<()> {
        self.draw = Some(GroupDraw {
            common: self.device.draw_common_component(rng)?,
            weights: self.device.draw_weights(rng),
        });
        Ok(())
    }
}

/// An environment of opponent bidders to measure strategies against.
///
/// # Example
/// ```ignore
/// let mut env = AuctionEnvironment::new(VickreyAuction::new(), options, to_bidder)?;
/// env.push_agent(opponent)?;
/// env.prepare_iteration()?;
/// let reward = env.get_strategy_reward(strategy, false)?;
/// ```
pub struct AuctionEnvironment<M: Mechanism> {
    /// The auction being played.
    mechanism: M,

    /// Opponent pool, oldest first.
    agents: VecDeque<Bidder>,

    /// Configuration, fixed after construction.
    options: EnvironmentOptions,

    /// Correlated valuation groups, usually empty or one (LLG locals).
    correlation_groups: Vec<CorrelationGroup>,

    /// Closure materializing strategies into focal bidders.
    strategy_to_player: StrategyToBidder,

    /// Randomness for correlation draws.
    rng: StdRng,
}

impl<M: Mechanism> AuctionEnvironment<M> {
    /// Create an environment with an empty opponent pool.
    ///
    /// # Arguments
    /// * `mechanism` - The auction to play
    /// * `options` - Batch size, player count, pool bound, seed
    /// * `strategy_to_player` - Wraps a bare strategy into a focal bidder
    pub fn new(
        mechanism: M,
        options: EnvironmentOptions,
        strategy_to_player: StrategyToBidder,
    ) -> Result<Self> {
        options.validate()?;

        let rng = match options.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(Self {
            mechanism,
            agents: VecDeque::new(),
            options,
            correlation_groups: Vec::new(),
            strategy_to_player,
            rng,
        })
    }

    /// Expected utility of a focal agent against the pool.
    ///
    /// The focal agent's valuations are redrawn on every call; its action
    /// occupies profile slot 0. Opponents keep their valuations unless
    /// `redraw_opponent_valuations` is set, which runs
    /// [`AuctionEnvironment::prepare_iteration`] first.
    ///
    /// # Returns
    /// Batch-mean utility per opponent group, averaged over groups.
    pub fn get_reward(
        &mut self,
        agent: &mut Bidder,
        redraw_opponent_valuations: bool,
    ) -> Result<f64> {
        if agent.batch_size() != self.options.batch_size {
            return Err(AuctionError::ShapeMismatch {
                context: "focal agent batch",
                expected: format!("{} rows", self.options.batch_size),
                actual: format!("{} rows", agent.batch_size()),
            });
        }

        self.redraw_focal(agent)?;
        let focal_bid = agent.get_action();

        if redraw_opponent_valuations {
            self.prepare_iteration()?;
        }

        // Degenerate single-player case: play the focal agent alone.
        if self.options.n_players == 1 {
            let profile = BidProfile::from_players(&[focal_bid])?;
            let outcome = self.mechanism.play(&profile)?;
            let utilities = agent.get_utility(
                &outcome.allocations.player_matrix(0),
                &outcome.payments.player_column(0),
            )?;
            return Ok(mean(&utilities));
        }

        let group_size = self.options.n_players - 1;
        if self.agents.is_empty() || self.agents.len() % group_size != 0 {
            return Err(AuctionError::OpponentPool {
                pool: self.agents.len(),
                group: group_size,
            });
        }

        let n_groups = self.agents.len() / group_size;
        let mut total = 0.0;

        for g in 0..n_groups {
            let mut players = Vec::with_capacity(self.options.n_players);
            players.push(focal_bid.clone());
            for k in 0..group_size {
                players.push(self.agents[g * group_size + k].get_action());
            }

            let profile = BidProfile::from_players(&players)?;
            let outcome = self.mechanism.play(&profile)?;
            let utilities = agent.get_utility(
                &outcome.allocations.player_matrix(0),
                &outcome.payments.player_column(0),
            )?;
            total += mean(&utilities);
        }

        Ok(total / n_groups as f64)
    }

    /// Wrap a bare strategy into a transient focal bidder and measure it.
    pub fn get_strategy_reward(
        &mut self,
        strategy: Arc<dyn Strategy>,
        redraw_opponent_valuations: bool,
    ) -> Result<f64> {
        let mut agent = (self.strategy_to_player)(strategy)?;
        self.get_reward(&mut agent, redraw_opponent_valuations)
    }

    /// Append an opponent, evicting the oldest beyond the pool bound.
    pub fn push_agent(&mut self, bidder: Bidder) -> Result<()> {
        if bidder.batch_size() != self.options.batch_size {
            return Err(AuctionError::ShapeMismatch {
                context: "pool agent batch",
                expected: format!("{} rows", self.options.batch_size),
                actual: format!("{} rows", bidder.batch_size()),
            });
        }
        if let Some(max) = self.options.max_pool_size {
            if max == 0 {
                return Ok(());
            }
            while self.agents.len() >= max {
                self.agents.pop_front();
            }
        }
        self.agents.push_back(bidder);
        Ok(())
    }

    /// Wrap a strategy into a bidder and push it into the pool.
    pub fn push_strategy(&mut self, strategy: Arc<dyn Strategy>) -> Result<()> {
        let bidder = (self.strategy_to_player)(strategy)?;
        self.push_agent(bidder)
    }

    /// Overwrite the pool member at `index` in place.
    ///
    /// Used when pool order encodes player roles, e.g. a mirrored local
    /// bidder that must stay in its slot while another member keeps a
    /// fixed strategy.
    pub fn replace_agent(&mut self, index: usize, bidder: Bidder) -> Result<()> {
        if bidder.batch_size() != self.options.batch_size {
            return Err(AuctionError::ShapeMismatch {
                context: "pool agent batch",
                expected: format!("{} rows", self.options.batch_size),
                actual: format!("{} rows", bidder.batch_size()),
            });
        }
        match self.agents.get_mut(index) {
            Some(slot) => {
                *slot = bidder;
                Ok(())
            }
            None => Err(AuctionError::InvalidParameter {
                name: "pool index",
                value: index as f64,
                constraint: "must address a current pool member",
            }),
        }
    }

    /// Wrap a strategy into a bidder and overwrite the pool member at
    /// `index`.
    pub fn replace_strategy(&mut self, index: usize, strategy: Arc<dyn Strategy>) -> Result<()> {
        let bidder = (self.strategy_to_player)(strategy)?;
        self.replace_agent(index, bidder)
    }

    /// Register a correlation device for a set of profile slots.
    ///
    /// Slot 0 is the focal agent; pool members occupy slots `1..n_players`
    /// within their group. The device's shared component is drawn once per
    /// iteration and reused for focal redraws within it.
    pub fn set_correlation(
        &mut self,
        device: Arc<dyn CorrelationDevice>,
        positions: Vec<usize>,
    ) -> Result<()> {
        for &position in &positions {
            if position >= self.options.n_players {
                return Err(AuctionError::InvalidParameter {
                    name: "correlation position",
                    value: position as f64,
                    constraint: "must be a valid profile slot",
                });
            }
        }
        self.correlation_groups.push(CorrelationGroup {
            device,
            positions,
            draw: None,
        });
        Ok(())
    }

    /// Redraw every pool member's valuations and refresh correlated group
    /// state. Call once per simulated generation.
    pub fn prepare_iteration(&mut self) -> Result<()> {
        for group in &mut self.correlation_groups {
            group.refresh(&mut self.rng)?;
        }

        if self.correlation_groups.is_empty() || self.options.n_players < 2 {
            for bidder in &mut self.agents {
                bidder.draw_valuations()?;
            }
            return Ok(());
        }

        let group_size = self.options.n_players - 1;
        for (i, bidder) in self.agents.iter_mut().enumerate() {
            let slot = 1 + (i % group_size);
            let covering = self
                .correlation_groups
                .iter()
                .find(|g| g.positions.contains(&slot));
            match covering {
                Some(group) => {
                    if let Some(draw) = &group.draw {
                        bidder.draw_valuations_correlated(
                            group.device.as_ref(),
                            draw.common.as_ref(),
                            &draw.weights,
                        )?;
                    }
                }
                None => bidder.draw_valuations()?,
            }
        }
        Ok(())
    }

    /// Redraw the focal agent, through its correlation device when slot 0
    /// belongs to a registered group.
    fn redraw_focal(&mut self, agent: &mut Bidder) -> Result<()> {
        for group in &mut self.correlation_groups {
            if group.positions.contains(&0) {
                if group.draw.is_none() {
                    group.refresh(&mut self.rng)?;
                }
                if let Some(draw) = &group.draw {
                    agent.draw_valuations_correlated(
                        group.device.as_ref(),
                        draw.common.as_ref(),
                        &draw.weights,
                    )?;
                }
                return Ok(());
            }
        }
        agent.draw_valuations()
    }

    /// Number of opponents currently in the pool.
    pub fn size(&self) -> usize {
        self.agents.len()
    }

    /// True if the pool holds no opponents.
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Pool members, oldest first.
    pub fn agents(&self) -> impl Iterator<Item = &Bidder> {
        self.agents.iter()
    }

    /// The environment's batch size.
    pub fn batch_size(&self) -> usize {
        self.options.batch_size
    }

    /// The number of players per play.
    pub fn n_players(&self) -> usize {
        self.options.n_players
    }

    /// Reference to the mechanism.
    pub fn mechanism(&self) -> &M {
        &self.mechanism
    }
}

/// An environment for complete-information matrix games.
///
/// Agents carry fixed positions. The action profile defaults to action zero
/// at positions no pool member covers, mirroring how sparse opponent sets
/// are evaluated.
pub struct MatrixGameEnvironment {
    game: MatrixGame,
    agents: Vec<MatrixGamePlayer>,
    batch_size: usize,
}

impl MatrixGameEnvironment {
    /// Create an environment with an empty agent set.
    pub fn new(game: MatrixGame, batch_size: usize) -> Self {
        Self {
            game,
            agents: Vec::new(),
            batch_size,
        }
    }

    /// Add an agent at its fixed position.
    pub fn push_agent(&mut self, player: MatrixGamePlayer) -> Result<()> {
        if player.player_position() >= self.game.n_players() {
            return Err(AuctionError::PlayerCount {
                expected: self.game.n_players(),
                actual: player.player_position(),
            });
        }
        if player.batch_size() != self.batch_size {
            return Err(AuctionError::ShapeMismatch {
                context: "matrix agent batch",
                expected: format!("{} rows", self.batch_size),
                actual: format!("{} rows", player.batch_size()),
            });
        }
        self.agents.push(player);
        Ok(())
    }

    /// Expected utility of a focal agent inserted at `player_position`.
    ///
    /// Pool agents at that position are skipped; every other agent fills
    /// its own recorded position.
    pub fn get_reward(
        &mut self,
        agent: &mut MatrixGamePlayer,
        player_position: usize,
    ) -> Result<f64> {
        let n = self.game.n_players();
        if player_position >= n {
            return Err(AuctionError::PlayerCount {
                expected: n,
                actual: player_position,
            });
        }

        let mut actions = ActionProfile::zeros(self.batch_size, n);

        let focal = agent.get_action();
        if focal.len() != self.batch_size {
            return Err(AuctionError::ShapeMismatch {
                context: "focal matrix actions",
                expected: format!("{} rows", self.batch_size),
                actual: format!("{} rows", focal.len()),
            });
        }
        for (b, &a) in focal.iter().enumerate() {
            actions.set(b, player_position, a);
        }

        for player in &mut self.agents {
            let position = player.player_position();
            if position == player_position {
                continue;
            }
            for (b, &a) in player.get_action().iter().enumerate() {
                actions.set(b, position, a);
            }
        }

        let outcome = self.game.play(&actions)?;
        let payments = outcome.payments.player_column(player_position);
        Ok(mean(&agent.get_utility(&payments)))
    }

    /// Wrap a matrix strategy into a player at `player_position` and
    /// measure it.
    pub fn get_strategy_reward(
        &mut self,
        strategy: Arc<dyn MatrixStrategy>,
        player_position: usize,
    ) -> Result<f64> {
        let mut agent =
            MatrixGamePlayer::new(strategy, player_position, self.batch_size, None);
        self.get_reward(&mut agent, player_position)
    }

    /// Number of agents in the environment.
    pub fn size(&self) -> usize {
        self.agents.len()
    }

    /// True if no agents have been added.
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// The game being played.
    pub fn game(&self) -> &MatrixGame {
        &self.game
    }
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mechanisms::matrix::prisoners_dilemma;
    use crate::mechanisms::single_item::VickreyAuction;
    use crate::sim::bidder::BidderOptions;
    use crate::sim::correlation::BernoulliWeightsDevice;
    use crate::sim::bidder::ValuationPrior;
    use crate::sim::strategy::{LinearBidStrategy, MixedStrategy, TruthfulStrategy};

    const BATCH: usize = 20_000;

    fn to_bidder(seed: u64) -> StrategyToBidder {
        Arc::new(move |strategy| {
            Bidder::uniform(
                0.0,
                1.0,
                strategy,
                BidderOptions::default()
                    .with_batch_size(BATCH)
                    .with_seed(seed),
            )
        })
    }

    fn uniform_bidder(strategy: Arc<dyn Strategy>, seed: u64) -> Bidder {
        Bidder::uniform(
            0.0,
            1.0,
            strategy,
            BidderOptions::default()
                .with_batch_size(BATCH)
                .with_seed(seed),
        )
        .unwrap()
    }

    fn vickrey_env(n_players: usize) -> AuctionEnvironment<VickreyAuction> {
        AuctionEnvironment::new(
            VickreyAuction::new(),
            EnvironmentOptions::default()
                .with_batch_size(BATCH)
                .with_players(n_players)
                .with_seed(3),
            to_bidder(2),
        )
        .unwrap()
    }

    #[test]
    fn test_truthful_self_play_reward_matches_theory() {
        let mut env = vickrey_env(2);
        env.push_agent(uniform_bidder(Arc::new(TruthfulStrategy::new()), 1))
            .unwrap();

        let reward = env
            .get_strategy_reward(Arc::new(TruthfulStrategy::new()), false)
            .unwrap();

        // E[(v0 - v1)+] = 1/6 for independent uniform valuations.
        assert!(
            (reward - 1.0 / 6.0).abs() < 0.01,
            "truthful second-price reward {} should be near 1/6",
            reward
        );
    }

    #[test]
    fn test_reward_averages_over_pool_groups() {
        let mut env = vickrey_env(2);
        env.push_agent(uniform_bidder(Arc::new(TruthfulStrategy::new()), 1))
            .unwrap();
        // A zero bidder concedes every auction at price zero.
        env.push_agent(uniform_bidder(
            Arc::new(LinearBidStrategy::proportional(0.0)),
            4,
        ))
        .unwrap();

        let reward = env
            .get_strategy_reward(Arc::new(TruthfulStrategy::new()), false)
            .unwrap();

        // Against the truthful opponent: 1/6. Against the zero bidder the
        // focal wins at price zero: E[v] = 1/2. Averaged: 1/3.
        assert!(
            (reward - 1.0 / 3.0).abs() < 0.01,
            "pool-averaged reward {} should be near 1/3",
            reward
        );
    }

    #[test]
    fn test_pool_eviction_is_fifo() {
        let mut env = AuctionEnvironment::new(
            VickreyAuction::new(),
            EnvironmentOptions::default()
                .with_batch_size(BATCH)
                .with_max_pool_size(2),
            to_bidder(2),
        )
        .unwrap();

        for position in 0..3 {
            let bidder = Bidder::uniform(
                0.0,
                1.0,
                Arc::new(TruthfulStrategy::new()),
                BidderOptions::default()
                    .with_batch_size(BATCH)
                    .with_position(position)
                    .with_seed(position as u64),
            )
            .unwrap();
            env.push_agent(bidder).unwrap();
        }

        assert_eq!(env.size(), 2);
        let positions: Vec<_> = env.agents().map(|a| a.player_position()).collect();
        assert_eq!(
            positions,
            vec![Some(1), Some(2)],
            "the oldest member must be evicted first"
        );
    }

    #[test]
    fn test_replace_agent_keeps_pool_order() {
        let mut env = vickrey_env(3);
        for position in 0..2 {
            let bidder = Bidder::uniform(
                0.0,
                1.0,
                Arc::new(TruthfulStrategy::new()),
                BidderOptions::default()
                    .with_batch_size(BATCH)
                    .with_position(position)
                    .with_seed(position as u64),
            )
            .unwrap();
            env.push_agent(bidder).unwrap();
        }

        let replacement = Bidder::uniform(
            0.0,
            1.0,
            Arc::new(TruthfulStrategy::new()),
            BidderOptions::default()
                .with_batch_size(BATCH)
                .with_position(9)
                .with_seed(9),
        )
        .unwrap();
        env.replace_agent(0, replacement).unwrap();

        let positions: Vec<_> = env.agents().map(|a| a.player_position()).collect();
        assert_eq!(positions, vec![Some(9), Some(1)]);

        let stray = Bidder::uniform(
            0.0,
            1.0,
            Arc::new(TruthfulStrategy::new()),
            BidderOptions::default().with_batch_size(BATCH),
        )
        .unwrap();
        assert!(env.replace_agent(5, stray).is_err());
    }

    #[test]
    fn test_reward_requires_full_opponent_groups() {
        let mut env = vickrey_env(3);
        env.push_agent(uniform_bidder(Arc::new(TruthfulStrategy::new()), 1))
            .unwrap();

        // Three players need opponents in pairs; one is not enough.
        match env.get_strategy_reward(Arc::new(TruthfulStrategy::new()), false) {
            Err(AuctionError::OpponentPool { pool, group }) => {
                assert_eq!(pool, 1);
                assert_eq!(group, 2);
            }
            other => panic!("expected OpponentPool error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_opponents_redraw_only_on_request() {
        let mut env = vickrey_env(2);
        env.push_agent(uniform_bidder(Arc::new(TruthfulStrategy::new()), 1))
            .unwrap();

        let before: Vec<f64> = env.agents().next().unwrap().valuations().as_slice().to_vec();

        env.get_strategy_reward(Arc::new(TruthfulStrategy::new()), false)
            .unwrap();
        let unchanged: Vec<f64> =
            env.agents().next().unwrap().valuations().as_slice().to_vec();
        assert_eq!(before, unchanged, "flag off must keep opponent valuations");

        env.get_strategy_reward(Arc::new(TruthfulStrategy::new()), true)
            .unwrap();
        let changed: Vec<f64> =
            env.agents().next().unwrap().valuations().as_slice().to_vec();
        assert_ne!(before, changed, "flag on must redraw opponent valuations");
    }

    #[test]
    fn test_prepare_iteration_redraws_pool() {
        let mut env = vickrey_env(2);
        env.push_agent(uniform_bidder(Arc::new(TruthfulStrategy::new()), 1))
            .unwrap();

        let before: Vec<f64> = env.agents().next().unwrap().valuations().as_slice().to_vec();
        env.prepare_iteration().unwrap();
        let after: Vec<f64> = env.agents().next().unwrap().valuations().as_slice().to_vec();
        assert_ne!(before, after);
    }

    #[test]
    fn test_fully_correlated_group_zeroes_the_reward() {
        let mut env = vickrey_env(2);
        let device = BernoulliWeightsDevice::new(
            ValuationPrior::Uniform {
                low: 0.0,
                high: 1.0,
            },
            BATCH,
            1,
            1.0,
        )
        .unwrap();
        env.set_correlation(Arc::new(device), vec![0, 1]).unwrap();
        env.push_agent(uniform_bidder(Arc::new(TruthfulStrategy::new()), 1))
            .unwrap();

        env.prepare_iteration().unwrap();
        let reward = env
            .get_strategy_reward(Arc::new(TruthfulStrategy::new()), false)
            .unwrap();

        // With gamma = 1 both players share the common draw exactly; the
        // focal wins the tie and pays its own value, so utility vanishes.
        assert!(
            reward.abs() < 1e-12,
            "perfectly correlated truthful play must earn zero, got {}",
            reward
        );
    }

    #[test]
    fn test_correlation_position_validation() {
        let mut env = vickrey_env(2);
        let device = BernoulliWeightsDevice::new(
            ValuationPrior::Uniform {
                low: 0.0,
                high: 1.0,
            },
            BATCH,
            1,
            0.5,
        )
        .unwrap();
        assert!(env.set_correlation(Arc::new(device), vec![0, 5]).is_err());
    }

    #[test]
    fn test_matrix_reward_against_fixed_opponent() {
        let mut env = MatrixGameEnvironment::new(prisoners_dilemma(), 64);
        let defector = MatrixGamePlayer::new(
            Arc::new(MixedStrategy::pure(1, 2).unwrap()),
            1,
            64,
            Some(1),
        );
        env.push_agent(defector).unwrap();

        let cooperate = env
            .get_strategy_reward(Arc::new(MixedStrategy::pure(0, 2).unwrap()), 0)
            .unwrap();
        let defect = env
            .get_strategy_reward(Arc::new(MixedStrategy::pure(1, 2).unwrap()), 0)
            .unwrap();

        assert_eq!(cooperate, -3.0, "cooperating against a defector pays -3");
        assert_eq!(defect, -2.0, "defection is the best response");
    }

    #[test]
    fn test_matrix_profile_defaults_to_action_zero() {
        // No pool agent covers position 1, which therefore cooperates.
        let mut env = MatrixGameEnvironment::new(prisoners_dilemma(), 8);
        let reward = env
            .get_strategy_reward(Arc::new(MixedStrategy::pure(1, 2).unwrap()), 0)
            .unwrap();
        assert_eq!(reward, 0.0, "defecting against a cooperator pays 0");
    }

    #[test]
    fn test_matrix_agent_position_validation() {
        let mut env = MatrixGameEnvironment::new(prisoners_dilemma(), 8);
        let stray = MatrixGamePlayer::new(
            Arc::new(MixedStrategy::pure(0, 2).unwrap()),
            7,
            8,
            None,
        );
        assert!(env.push_agent(stray).is_err());
    }
}
