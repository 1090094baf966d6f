//! Single-item sealed-bid auctions.
//!
//! Both auctions clear each item column independently: per batch instance and
//! column, the highest bidder wins, first player index taking ties. They
//! differ only in what the winner pays. [`StaticMechanism`] is not an auction
//! at all but a fixed stochastic environment used to smoke-test learners.

use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::batch::{Allocation, BidProfile, Outcome, Payments};
use crate::error::Result;
use crate::mechanisms::{validate_bids, Mechanism};

/// Index of the highest entry, first index winning ties. Returns the value too.
fn argmax_first(values: impl Iterator<Item = f64>) -> (usize, f64) {
    let mut best_idx = 0;
    let mut best = f64::NEG_INFINITY;
    for (i, v) in values.enumerate() {
        if v > best {
            best = v;
            best_idx = i;
        }
    }
    (best_idx, best)
}

/// Clear every item column with first-index argmax and a payment rule.
///
/// `payment` receives (winning bid, second-highest bid) and returns what the
/// winner owes for that column. A winning bid of exactly zero allocates to
/// nobody and charges nothing.
fn clear_single_item<F: Fn(f64, f64) -> f64>(bids: &BidProfile, payment: F) -> Result<Outcome> {
    validate_bids(bids)?;
    let (batch, players, items) = (bids.batch_size(), bids.n_players(), bids.n_items());

    let mut allocations = Allocation::zeros(batch, players, items);
    let mut payments = Payments::zeros(batch, players);

    for b in 0..batch {
        for i in 0..items {
            let (winner, best) = argmax_first((0..players).map(|p| bids.get(b, p, i)));
            if best == 0.0 {
                continue;
            }
            let second = (0..players)
                .filter(|&p| p != winner)
                .map(|p| bids.get(b, p, i))
                .fold(0.0, f64::max);
            allocations.set(b, winner, i, 1.0);
            payments.add(b, winner, payment(best, second));
        }
    }

    Ok(Outcome {
        allocations,
        payments,
    })
}

/// Second-price (Vickrey) sealed-bid auction.
///
/// The winner pays the second-highest bid, which makes truthful bidding a
/// dominant strategy. With a single competitor absent (one player), the
/// second price is zero.
#[derive(Debug, Clone, Copy, Default)]
pub struct VickreyAuction;

impl VickreyAuction {
    /// Create a Vickrey auction.
    pub fn new() -> Self {
        Self
    }
}

impl Mechanism for VickreyAuction {
    fn play(&self, bids: &BidProfile) -> Result<Outcome> {
        clear_single_item(bids, |_best, second| second)
    }
}

/// First-price sealed-bid auction: the winner pays their own bid.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstPriceAuction;

impl FirstPriceAuction {
    /// Create a first-price auction.
    pub fn new() -> Self {
        Self
    }
}

impl Mechanism for FirstPriceAuction {
    fn play(&self, bids: &BidProfile) -> Result<Outcome> {
        clear_single_item(bids, |best, _second| best)
    }
}

/// Stochastic test mechanism with a known closed-form best response.
///
/// Each item is allocated with probability `bid / 10` (clamped to one) and
/// costs `bid² / 20` whether or not it is won. Expected utility for value `v`
/// is `v·b/10 − b²/20`, maximized at `b = v`, so a correct learner drifts
/// toward truthful bidding. Randomness is drawn fresh on every play.
pub struct StaticMechanism {
    rng: Mutex<StdRng>,
}

impl StaticMechanism {
    /// Create with entropy-based randomness.
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Create with a fixed seed for reproducible draws.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl Default for StaticMechanism {
    fn default() -> Self {
        Self::new()
    }
}

impl Mechanism for StaticMechanism {
    fn play(&self, bids: &BidProfile) -> Result<Outcome> {
        validate_bids(bids)?;
        let (batch, players, items) = (bids.batch_size(), bids.n_players(), bids.n_items());

        let mut allocations = Allocation::zeros(batch, players, items);
        let mut payments = Payments::zeros(batch, players);
        let mut rng = self.rng.lock().unwrap();

        for b in 0..batch {
            for p in 0..players {
                for (i, &bid) in bids.bid_row(b, p).iter().enumerate() {
                    if bid >= rng.gen::<f64>() * 10.0 {
                        allocations.set(b, p, i, 1.0);
                    }
                    payments.add(b, p, bid * bid * 0.05);
                }
            }
        }

        Ok(Outcome {
            allocations,
            payments,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::BatchMatrix;

    fn two_player_profile(b0: f64, b1: f64) -> BidProfile {
        BidProfile::from_players(&[
            BatchMatrix::from_vec(vec![b0], 1, 1).unwrap(),
            BatchMatrix::from_vec(vec![b1], 1, 1).unwrap(),
        ])
        .unwrap()
    }

    #[test]
    fn test_vickrey_winner_pays_second_price() {
        let outcome = VickreyAuction::new().play(&two_player_profile(5.0, 3.0)).unwrap();

        assert_eq!(outcome.allocations.get(0, 0, 0), 1.0, "high bidder should win");
        assert_eq!(outcome.allocations.get(0, 1, 0), 0.0, "low bidder should lose");
        assert_eq!(outcome.payments.get(0, 0), 3.0, "winner pays second price");
        assert_eq!(outcome.payments.get(0, 1), 0.0, "loser pays nothing");
    }

    #[test]
    fn test_first_price_winner_pays_own_bid() {
        let outcome = FirstPriceAuction::new()
            .play(&two_player_profile(5.0, 3.0))
            .unwrap();

        assert_eq!(outcome.allocations.get(0, 0, 0), 1.0);
        assert_eq!(outcome.payments.get(0, 0), 5.0, "winner pays own bid");
        assert_eq!(outcome.payments.get(0, 1), 0.0);
    }

    #[test]
    fn test_ties_go_to_first_player() {
        for mech in [
            Box::new(VickreyAuction::new()) as Box<dyn Mechanism>,
            Box::new(FirstPriceAuction::new()),
        ] {
            let outcome = mech.play(&two_player_profile(4.0, 4.0)).unwrap();
            assert_eq!(outcome.allocations.get(0, 0, 0), 1.0, "tie must go to player 0");
            assert_eq!(outcome.allocations.get(0, 1, 0), 0.0);
            assert_eq!(outcome.payments.get(0, 0), 4.0);
        }
    }

    #[test]
    fn test_zero_winning_bid_allocates_nothing() {
        let outcome = VickreyAuction::new().play(&two_player_profile(0.0, 0.0)).unwrap();
        assert_eq!(outcome.allocations.instance_total(0), 0.0);
        assert_eq!(outcome.payments.get(0, 0), 0.0);
        assert_eq!(outcome.payments.get(0, 1), 0.0);
    }

    #[test]
    fn test_vickrey_single_player_pays_zero() {
        let bids = BidProfile::from_players(&[BatchMatrix::from_vec(vec![7.0], 1, 1).unwrap()])
            .unwrap();
        let outcome = VickreyAuction::new().play(&bids).unwrap();
        assert_eq!(outcome.allocations.get(0, 0, 0), 1.0);
        assert_eq!(outcome.payments.get(0, 0), 0.0);
    }

    #[test]
    fn test_item_columns_clear_independently() {
        // Player 0 is highest on column 0, player 1 on column 1.
        let bids = BidProfile::from_players(&[
            BatchMatrix::from_vec(vec![5.0, 1.0], 1, 2).unwrap(),
            BatchMatrix::from_vec(vec![2.0, 4.0], 1, 2).unwrap(),
        ])
        .unwrap();
        let outcome = VickreyAuction::new().play(&bids).unwrap();

        assert_eq!(outcome.allocations.get(0, 0, 0), 1.0);
        assert_eq!(outcome.allocations.get(0, 1, 1), 1.0);
        // Payments accumulate second prices across columns.
        assert_eq!(outcome.payments.get(0, 0), 2.0);
        assert_eq!(outcome.payments.get(0, 1), 1.0);
    }

    #[test]
    fn test_rejects_negative_bids() {
        let outcome = VickreyAuction::new().play(&two_player_profile(-1.0, 3.0));
        assert!(outcome.is_err(), "negative bids must be rejected");
    }

    #[test]
    fn test_static_mechanism_payment_is_quadratic() {
        let mech = StaticMechanism::with_seed(7);
        let outcome = mech.play(&two_player_profile(4.0, 10.0)).unwrap();

        assert!((outcome.payments.get(0, 0) - 0.8).abs() < 1e-12, "4²/20 = 0.8");
        assert!((outcome.payments.get(0, 1) - 5.0).abs() < 1e-12, "10²/20 = 5");
        // A bid of 10 always clears the uniform draw on [0, 10).
        assert_eq!(outcome.allocations.get(0, 1, 0), 1.0);
    }

    #[test]
    fn test_static_mechanism_win_rate_tracks_bid() {
        let mech = StaticMechanism::with_seed(42);
        let batch = 20_000;
        let bids = BidProfile::from_players(&[BatchMatrix::from_vec(
            vec![3.0; batch],
            batch,
            1,
        )
        .unwrap()])
        .unwrap();

        let outcome = mech.play(&bids).unwrap();
        let wins: f64 = (0..batch).map(|b| outcome.allocations.get(b, 0, 0)).sum();
        let rate = wins / batch as f64;
        assert!(
            (rate - 0.3).abs() < 0.02,
            "win rate {} should be near bid/10 = 0.3",
            rate
        );
    }
}
