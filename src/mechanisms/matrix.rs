//! Complete-information matrix games.
//!
//! A matrix game stores one payoff tensor of shape
//! `(a_0, a_1, ..., a_{n-1}, n_players)`: one dimension per player (that
//! player's action count) plus a trailing axis holding every player's payoff
//! for the profile. Pure play is direct tensor lookup; mixed-strategy
//! evaluation contracts the tensor with one probability vector per player,
//! one dimension at a time, instead of enumerating profiles.
//!
//! There is nothing to allocate in a matrix game. Outcomes are expressed
//! through payments only: a player's payment is the negated payoff, and a
//! matrix player's utility is the negated payment.

use rustc_hash::FxHashMap;

use crate::batch::{ActionProfile, Allocation, Outcome, Payments};
use crate::error::{AuctionError, Result};

/// An `n_players` normal-form game with a flat payoff tensor.
#[derive(Debug, Clone)]
pub struct MatrixGame {
    /// Action counts per player.
    dims: Vec<usize>,
    /// Row-major payoff tensor, innermost axis = per-player payoffs.
    outcomes: Vec<f64>,
    /// Optional display names, keyed "players" and "actions".
    names: FxHashMap<String, Vec<String>>,
}

impl MatrixGame {
    /// Create a game from its action counts and flat payoff tensor.
    ///
    /// `outcomes` must hold `a_0 · a_1 · ... · a_{n-1} · n_players` entries
    /// in row-major order with the per-player payoff axis innermost.
    pub fn new(dims: Vec<usize>, outcomes: Vec<f64>) -> Result<Self> {
        let n_players = dims.len();
        let expected: usize = dims.iter().product::<usize>() * n_players;
        if n_players == 0 || outcomes.len() != expected {
            return Err(AuctionError::ShapeMismatch {
                context: "matrix game outcomes",
                expected: format!("{} entries for dims {:?}", expected, dims),
                actual: format!("{} entries", outcomes.len()),
            });
        }
        Ok(Self {
            dims,
            outcomes,
            names: FxHashMap::default(),
        })
    }

    /// Attach display names under a key ("players" or "actions").
    pub fn with_names(mut self, key: &str, names: Vec<String>) -> Self {
        self.names.insert(key.to_string(), names);
        self
    }

    /// Number of players.
    pub fn n_players(&self) -> usize {
        self.dims.len()
    }

    /// Number of actions available to `player`.
    pub fn n_actions(&self, player: usize) -> usize {
        self.dims[player]
    }

    /// Readable player name, falling back to the index.
    pub fn player_name(&self, player: usize) -> String {
        match self.names.get("players").and_then(|v| v.get(player)) {
            Some(name) => name.clone(),
            None => player.to_string(),
        }
    }

    /// Readable action name, falling back to the index.
    ///
    /// Only meaningful when all players share an action set.
    pub fn action_name(&self, action: usize) -> String {
        match self.names.get("actions").and_then(|v| v.get(action)) {
            Some(name) => name.clone(),
            None => action.to_string(),
        }
    }

    /// Flat offset of an action profile's payoff vector.
    fn payoff_base(&self, actions: &[usize]) -> usize {
        let mut idx = 0;
        for (a, d) in actions.iter().zip(&self.dims) {
            idx = idx * d + a;
        }
        idx * self.n_players()
    }

    /// Payoff vector for one pure action profile.
    fn payoffs(&self, actions: &[usize]) -> &[f64] {
        let base = self.payoff_base(actions);
        &self.outcomes[base..base + self.n_players()]
    }

    /// Play a batch of pure action profiles.
    ///
    /// Allocations are all zeros; payments are the negated payoffs. Every
    /// action index is validated against its player's action count.
    pub fn play(&self, actions: &ActionProfile) -> Result<Outcome> {
        let n = self.n_players();
        if actions.n_players() != n {
            return Err(AuctionError::PlayerCount {
                expected: n,
                actual: actions.n_players(),
            });
        }

        let batch = actions.batch_size();
        let allocations = Allocation::zeros(batch, n, 1);
        let mut payments = Payments::zeros(batch, n);
        let mut profile = vec![0usize; n];

        for b in 0..batch {
            for p in 0..n {
                let a = actions.get(b, p);
                if a >= self.dims[p] {
                    return Err(AuctionError::InvalidAction {
                        player: p,
                        action: a,
                        n_actions: self.dims[p],
                    });
                }
                profile[p] = a;
            }
            for (p, &payoff) in self.payoffs(&profile).iter().enumerate() {
                payments.set(b, p, -payoff);
            }
        }

        Ok(Outcome {
            allocations,
            payments,
        })
    }

    fn validate_strategies(&self, strategies: &[Vec<f64>]) -> Result<()> {
        if strategies.len() != self.n_players() {
            return Err(AuctionError::PlayerCount {
                expected: self.n_players(),
                actual: strategies.len(),
            });
        }
        for (p, sigma) in strategies.iter().enumerate() {
            if sigma.len() != self.dims[p] {
                return Err(AuctionError::InvalidDistribution {
                    player: p,
                    reason: format!("{} entries for {} actions", sigma.len(), self.dims[p]),
                });
            }
            if sigma.iter().any(|&x| x < 0.0 || !x.is_finite()) {
                return Err(AuctionError::InvalidDistribution {
                    player: p,
                    reason: "negative or non-finite probability".into(),
                });
            }
            let total: f64 = sigma.iter().sum();
            if (total - 1.0).abs() > 1e-6 {
                return Err(AuctionError::InvalidDistribution {
                    player: p,
                    reason: format!("probabilities sum to {}", total),
                });
            }
        }
        Ok(())
    }

    /// Contract player dimension `q` of `data` with the weight vector.
    ///
    /// `dims` is the current shape (player dims, then the payoff axis when
    /// still present). Contracting from the highest player dimension down
    /// keeps lower dimension indices stable.
    fn contract_dim(data: &[f64], dims: &mut Vec<usize>, q: usize, weights: &[f64]) -> Vec<f64> {
        let after: usize = dims[q + 1..].iter().product();
        let size_q = dims[q];
        let block = size_q * after;
        let mut out = vec![0.0; data.len() / size_q];
        for (in_idx, &v) in data.iter().enumerate() {
            let hi = in_idx / block;
            let rem = in_idx % block;
            let i_q = rem / after;
            let lo = rem % after;
            out[hi * after + lo] += weights[i_q] * v;
        }
        dims.remove(q);
        out
    }

    /// Expected payoff vector (one entry per player) under a mixed profile.
    pub fn expected_payoffs(&self, strategies: &[Vec<f64>]) -> Result<Vec<f64>> {
        self.validate_strategies(strategies)?;

        let mut dims = self.dims.clone();
        dims.push(self.n_players());
        let mut data = self.outcomes.clone();
        for q in (0..self.n_players()).rev() {
            data = Self::contract_dim(&data, &mut dims, q, &strategies[q]);
        }
        Ok(data)
    }

    /// One player's expected payoff for each of their own actions, holding
    /// the opponents to their mixed strategies.
    ///
    /// The player's own strategy entry must be supplied but is ignored.
    /// This is the best-response building block.
    pub fn expected_action_payoffs(
        &self,
        strategies: &[Vec<f64>],
        player: usize,
    ) -> Result<Vec<f64>> {
        self.validate_strategies(strategies)?;
        if player >= self.n_players() {
            return Err(AuctionError::PlayerCount {
                expected: self.n_players(),
                actual: player,
            });
        }

        let mut dims = self.dims.clone();
        dims.push(self.n_players());
        let mut data = self.outcomes.clone();
        for q in (0..self.n_players()).rev() {
            if q == player {
                continue;
            }
            data = Self::contract_dim(&data, &mut dims, q, &strategies[q]);
        }

        // Remaining shape is (n_actions[player], n_players); extract the
        // player's own payoff component.
        let n = self.n_players();
        Ok((0..self.dims[player]).map(|a| data[a * n + player]).collect())
    }

    /// Expected payments (negated payoffs) under a mixed profile.
    pub fn play_mixed(&self, strategies: &[Vec<f64>]) -> Result<Vec<f64>> {
        let payoffs = self.expected_payoffs(strategies)?;
        Ok(payoffs.into_iter().map(|u| -u).collect())
    }
}

// Named games from the game-theory literature, used for validation and for
// fictitious-play dynamics.

/// Two-player Prisoner's Dilemma; unique pure equilibrium at (Defect, Defect).
pub fn prisoners_dilemma() -> MatrixGame {
    MatrixGame::new(
        vec![2, 2],
        vec![
            -1.0, -1.0, // CC
            -3.0, 0.0, // CD
            0.0, -3.0, // DC
            -2.0, -2.0, // DD
        ],
    )
    .unwrap()
    .with_names("actions", vec!["Cooperate".into(), "Defect".into()])
}

/// Two-player Battle of the Sexes coordination game.
pub fn battle_of_the_sexes() -> MatrixGame {
    MatrixGame::new(vec![2, 2], vec![3.0, 2.0, 0.0, 0.0, 0.0, 0.0, 2.0, 3.0]).unwrap()
}

/// Two-player Matching Pennies; mixed equilibrium at (1/2, 1/2).
pub fn matching_pennies() -> MatrixGame {
    MatrixGame::new(vec![2, 2], vec![1.0, -1.0, -1.0, 1.0, -1.0, 1.0, 1.0, -1.0]).unwrap()
}

/// Two-player Rock-Paper-Scissors.
pub fn rock_paper_scissors() -> MatrixGame {
    MatrixGame::new(
        vec![3, 3],
        vec![
            0.0, 0.0, -1.0, 1.0, 1.0, -1.0, // Rock row
            1.0, -1.0, 0.0, 0.0, -1.0, 1.0, // Paper row
            -1.0, 1.0, 1.0, -1.0, 0.0, 0.0, // Scissors row
        ],
    )
    .unwrap()
    .with_names("actions", vec!["Rock".into(), "Paper".into(), "Scissors".into()])
}

/// Jordan's three-player anticoordination game (1993). Each player wants to
/// differ from the next one cyclically; fictitious play famously fails to
/// converge here.
pub fn jordan_game() -> MatrixGame {
    MatrixGame::new(
        vec![2, 2, 2],
        vec![
            0.0, 0.0, 0.0, // LLL
            0.0, 1.0, 1.0, // LLR
            1.0, 1.0, 0.0, // LRL
            1.0, 0.0, 1.0, // LRR
            1.0, 0.0, 1.0, // RLL
            1.0, 1.0, 0.0, // RLR
            0.0, 1.0, 1.0, // RRL
            0.0, 0.0, 0.0, // RRR
        ],
    )
    .unwrap()
}

/// Asymmetric three-player game with few symmetries; pins down the
/// n-player tensor indexing.
pub fn three_player_test_game() -> MatrixGame {
    MatrixGame::new(
        vec![2, 2, 2],
        vec![
            2.0, 2.0, 2.0, // LLL
            -1.0, 1.0, 9.0, // LLR
            -1.0, 9.0, 1.0, // LRL
            4.0, 3.0, 3.0, // LRR
            1.0, 2.0, 2.0, // RLL
            -2.0, 1.0, 7.0, // RLR
            -2.0, 7.0, 1.0, // RRL
            3.0, 4.0, 4.0, // RRR
        ],
    )
    .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pure_play_negates_payoffs() {
        let game = prisoners_dilemma();
        let actions = ActionProfile::from_vec(vec![1, 1, 0, 1], 2, 2).unwrap();
        let outcome = game.play(&actions).unwrap();

        // (Defect, Defect): payoffs (-2, -2) -> payments (2, 2).
        assert_eq!(outcome.payments.get(0, 0), 2.0);
        assert_eq!(outcome.payments.get(0, 1), 2.0);
        // (Cooperate, Defect): payoffs (-3, 0) -> payments (3, 0).
        assert_eq!(outcome.payments.get(1, 0), 3.0);
        assert_eq!(outcome.payments.get(1, 1), 0.0);
        // Nothing is ever allocated.
        assert_eq!(outcome.allocations.instance_total(0), 0.0);
    }

    #[test]
    fn test_rock_paper_scissors_lookup() {
        let game = rock_paper_scissors();
        // Rock vs Paper: row player loses.
        let actions = ActionProfile::from_vec(vec![0, 1], 1, 2).unwrap();
        let outcome = game.play(&actions).unwrap();
        assert_eq!(outcome.payments.get(0, 0), 1.0);
        assert_eq!(outcome.payments.get(0, 1), -1.0);
    }

    #[test]
    fn test_out_of_range_action_rejected() {
        let game = matching_pennies();
        let actions = ActionProfile::from_vec(vec![0, 2], 1, 2).unwrap();
        assert!(matches!(
            game.play(&actions),
            Err(AuctionError::InvalidAction {
                player: 1,
                action: 2,
                ..
            })
        ));
    }

    #[test]
    fn test_invalid_distribution_rejected() {
        let game = matching_pennies();
        assert!(game
            .expected_payoffs(&[vec![0.6, 0.6], vec![0.5, 0.5]])
            .is_err());
        assert!(game
            .expected_payoffs(&[vec![-0.1, 1.1], vec![0.5, 0.5]])
            .is_err());
        assert!(game
            .expected_payoffs(&[vec![1.0], vec![0.5, 0.5]])
            .is_err());
    }

    #[test]
    fn test_matching_pennies_uniform_is_fair() {
        let game = matching_pennies();
        let uniform = vec![vec![0.5, 0.5], vec![0.5, 0.5]];
        let payoffs = game.expected_payoffs(&uniform).unwrap();
        assert!(payoffs.iter().all(|u| u.abs() < 1e-12));
    }

    /// Exhaustive enumeration of profiles, weighted by strategy products.
    fn enumerate_expected(game: &MatrixGame, strategies: &[Vec<f64>]) -> Vec<f64> {
        let n = game.n_players();
        let mut totals = vec![0.0; n];
        let mut profile = vec![0usize; n];
        loop {
            let weight: f64 = profile
                .iter()
                .enumerate()
                .map(|(p, &a)| strategies[p][a])
                .product();
            for p in 0..n {
                totals[p] += weight * game.payoffs(&profile)[p];
            }
            // Odometer increment over the action grid.
            let mut carry = n;
            for p in (0..n).rev() {
                profile[p] += 1;
                if profile[p] < game.n_actions(p) {
                    carry = p;
                    break;
                }
                profile[p] = 0;
            }
            if carry == n {
                break;
            }
        }
        totals
    }

    #[test]
    fn test_mixed_evaluation_matches_enumeration() {
        let game = three_player_test_game();
        let strategies = vec![
            vec![0.3, 0.7],
            vec![0.9, 0.1],
            vec![0.25, 0.75],
        ];

        let fast = game.expected_payoffs(&strategies).unwrap();
        let slow = enumerate_expected(&game, &strategies);
        for (p, (a, b)) in fast.iter().zip(&slow).enumerate() {
            assert!(
                (a - b).abs() < 1e-12,
                "player {}: contraction {} vs enumeration {}",
                p,
                a,
                b
            );
        }

        // Payments are the negation.
        let payments = game.play_mixed(&strategies).unwrap();
        for (pay, u) in payments.iter().zip(&fast) {
            assert!((pay + u).abs() < 1e-12);
        }
    }

    #[test]
    fn test_action_payoffs_match_enumeration_per_action() {
        let game = three_player_test_game();
        let strategies = vec![
            vec![0.5, 0.5], // ignored for the queried player
            vec![0.2, 0.8],
            vec![0.6, 0.4],
        ];

        let per_action = game.expected_action_payoffs(&strategies, 0).unwrap();
        assert_eq!(per_action.len(), 2);

        for a in 0..2 {
            let mut pinned = strategies.clone();
            pinned[0] = vec![0.0, 0.0];
            pinned[0][a] = 1.0;
            let expected = enumerate_expected(&game, &pinned)[0];
            assert!(
                (per_action[a] - expected).abs() < 1e-12,
                "action {}: got {}, enumeration {}",
                a,
                per_action[a],
                expected
            );
        }
    }

    #[test]
    fn test_jordan_game_uniform_payoffs() {
        let game = jordan_game();
        let uniform = vec![vec![0.5, 0.5]; 3];
        let payoffs = game.expected_payoffs(&uniform).unwrap();
        // Half of all profiles reward each player with 1.
        for u in payoffs {
            assert!((u - 0.5).abs() < 1e-12);
        }
    }

    #[test]
    fn test_names_fall_back_to_indices() {
        let game = rock_paper_scissors();
        assert_eq!(game.action_name(1), "Paper");
        assert_eq!(game.player_name(0), "0");
    }
}
