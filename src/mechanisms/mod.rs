//! Auction mechanisms: the rules that turn bids into outcomes.
//!
//! A mechanism is a pure function over a batch of bid profiles. Given bids of
//! shape `(batch, players, items)` it produces an [`Outcome`]: winner
//! indicators of the same shape and payments of shape `(batch, players)`.
//! Mechanisms never mutate their input and hold no per-play state, so one
//! mechanism object can serve any number of environments.
//!
//! # Available mechanisms
//!
//! - [`single_item`]: Vickrey (second-price) and first-price sealed-bid
//!   auctions, plus a stochastic test mechanism for learner debugging.
//! - [`multi_unit`]: discriminatory, uniform-price, and Vickrey auctions for
//!   `k` identical units with marginal-value bid rows.
//! - [`llg`]: the two-local/one-global combinatorial auction with
//!   core-selecting payment rules.
//! - [`matrix`]: complete-information matrix games with pure and
//!   mixed-strategy evaluation.
//!
//! # Tie-breaking
//!
//! Ties are broken by player index: the first player achieving the maximum
//! wins. This is deterministic and intentional; downstream equilibrium
//! comparisons depend on it.
//!
//! # Example
//!
//! ```
//! use auction_solver::batch::{BatchMatrix, BidProfile};
//! use auction_solver::mechanisms::{Mechanism, single_item::VickreyAuction};
//!
//! let bids = BidProfile::from_players(&[
//!     BatchMatrix::from_vec(vec![5.0], 1, 1).unwrap(),
//!     BatchMatrix::from_vec(vec![3.0], 1, 1).unwrap(),
//! ]).unwrap();
//!
//! let outcome = VickreyAuction::new().play(&bids).unwrap();
//! assert_eq!(outcome.allocations.get(0, 0, 0), 1.0); // high bidder wins
//! assert_eq!(outcome.payments.get(0, 0), 3.0);       // pays second price
//! ```

pub mod llg;
pub mod matrix;
pub mod multi_unit;
pub mod single_item;

// Re-export main types for convenient access
pub use llg::{LlgAuction, PaymentRule};
pub use matrix::{
    battle_of_the_sexes, jordan_game, matching_pennies, prisoners_dilemma, rock_paper_scissors,
    three_player_test_game, MatrixGame,
};
pub use multi_unit::{MultiUnitAuction, MultiUnitPricing};
pub use single_item::{FirstPriceAuction, StaticMechanism, VickreyAuction};

use crate::batch::{BidProfile, Outcome};
use crate::error::{AuctionError, Result};

/// An auction rule mapping a batch of bid profiles to an [`Outcome`].
pub trait Mechanism: Send + Sync {
    /// Clear one batch of auctions.
    ///
    /// # Arguments
    /// * `bids` - Bid profile of shape `(batch, players, items)`. Entries
    ///   must be finite and non-negative.
    ///
    /// # Returns
    /// Allocations of shape `(batch, players, items)` and payments of shape
    /// `(batch, players)`. Losers pay zero unless the rule says otherwise.
    fn play(&self, bids: &BidProfile) -> Result<Outcome>;
}

impl<M: Mechanism + ?Sized> Mechanism for Box<M> {
    fn play(&self, bids: &BidProfile) -> Result<Outcome> {
        (**self).play(bids)
    }
}

impl<M: Mechanism + ?Sized> Mechanism for std::sync::Arc<M> {
    fn play(&self, bids: &BidProfile) -> Result<Outcome> {
        (**self).play(bids)
    }
}

/// Reject profiles containing negative or non-finite bids.
///
/// Called by every mechanism before clearing. A bad bid is a caller bug and
/// surfaces as an error immediately rather than flowing into the clearing
/// arithmetic.
pub fn validate_bids(bids: &BidProfile) -> Result<()> {
    for b in 0..bids.batch_size() {
        for p in 0..bids.n_players() {
            for &v in bids.bid_row(b, p) {
                if !v.is_finite() || v < 0.0 {
                    return Err(AuctionError::InvalidBid {
                        player: p,
                        batch: b,
                        value: v,
                    });
                }
            }
        }
    }
    Ok(())
}

/// Reject profiles whose player count differs from what the mechanism serves.
pub fn validate_player_count(bids: &BidProfile, expected: usize) -> Result<()> {
    if bids.n_players() != expected {
        return Err(AuctionError::PlayerCount {
            expected,
            actual: bids.n_players(),
        });
    }
    Ok(())
}
