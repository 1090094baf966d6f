//! Multi-unit auctions for `k` identical units.
//!
//! Each player submits one bid row of `k` marginal bids (willingness to pay
//! for the first, second, ... unit). Marginal bids must be non-increasing
//! left-to-right; rows violating this are nulled to zero before clearing and
//! therefore cannot win. The `k` highest bids among all `players × k`
//! submitted bids win one unit each, zero bids never winning. The three
//! pricing rules differ only in what winners pay:
//!
//! - **Discriminatory**: each winner pays their own winning bids.
//! - **Uniform price**: every unit trades at the market price, the
//!   `(k+1)`-th highest submitted bid (the highest losing bid).
//! - **Vickrey**: a player winning `q` units pays the `q` highest losing
//!   bids submitted by the *other* players; own losing bids are excluded.
//!
//! Ties at the winning boundary resolve toward the lower flat index, i.e.
//! the lower player index first and the earlier item column within a player.

use crate::batch::{Allocation, BidProfile, Outcome, Payments};
use crate::error::Result;
use crate::mechanisms::{validate_bids, Mechanism};

/// Pricing rule of a [`MultiUnitAuction`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MultiUnitPricing {
    /// Winners pay their own winning bids.
    Discriminatory,
    /// All units trade at the highest losing bid.
    UniformPrice,
    /// Winners pay the highest losing bids of the other players.
    Vickrey,
}

impl MultiUnitPricing {
    /// Canonical rule name.
    pub fn name(&self) -> &'static str {
        match self {
            MultiUnitPricing::Discriminatory => "discriminatory",
            MultiUnitPricing::UniformPrice => "uniform",
            MultiUnitPricing::Vickrey => "vickrey",
        }
    }
}

/// Sealed-bid auction for `k = n_items` identical units.
#[derive(Debug, Clone, Copy)]
pub struct MultiUnitAuction {
    pricing: MultiUnitPricing,
}

impl MultiUnitAuction {
    /// Create an auction with the given pricing rule.
    pub fn new(pricing: MultiUnitPricing) -> Self {
        Self { pricing }
    }

    /// Pay-as-bid auction.
    pub fn discriminatory() -> Self {
        Self::new(MultiUnitPricing::Discriminatory)
    }

    /// Uniform-price auction.
    pub fn uniform_price() -> Self {
        Self::new(MultiUnitPricing::UniformPrice)
    }

    /// Multi-unit Vickrey auction.
    pub fn vickrey() -> Self {
        Self::new(MultiUnitPricing::Vickrey)
    }

    /// The configured pricing rule.
    pub fn pricing(&self) -> MultiUnitPricing {
        self.pricing
    }
}

/// Copy one instance's bids, nulling rows whose marginal bids increase.
fn valid_instance_bids(bids: &BidProfile, b: usize) -> Vec<f64> {
    let items = bids.n_items();
    let mut out = Vec::with_capacity(bids.n_players() * items);
    for p in 0..bids.n_players() {
        let row = bids.bid_row(b, p);
        let valid = row.windows(2).all(|w| w[0] >= w[1]);
        if valid {
            out.extend_from_slice(row);
        } else {
            out.extend(std::iter::repeat(0.0).take(items));
        }
    }
    out
}

/// Flat bid indices sorted by bid descending, index ascending on ties.
fn descending_order(flat: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..flat.len()).collect();
    order.sort_by(|&a, &b| {
        flat[b]
            .partial_cmp(&flat[a])
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.cmp(&b))
    });
    order
}

impl Mechanism for MultiUnitAuction {
    fn play(&self, bids: &BidProfile) -> Result<Outcome> {
        validate_bids(bids)?;
        let (batch, players, items) = (bids.batch_size(), bids.n_players(), bids.n_items());
        let k = items;

        let mut allocations = Allocation::zeros(batch, players, items);
        let mut payments = Payments::zeros(batch, players);

        for b in 0..batch {
            let flat = valid_instance_bids(bids, b);
            let order = descending_order(&flat);

            // Winning bid slots: the k highest positive bids.
            let winners: Vec<usize> = order
                .iter()
                .take(k)
                .copied()
                .filter(|&idx| flat[idx] > 0.0)
                .collect();
            for &idx in &winners {
                allocations.set(b, idx / items, idx % items, 1.0);
            }

            match self.pricing {
                MultiUnitPricing::Discriminatory => {
                    for &idx in &winners {
                        payments.add(b, idx / items, flat[idx]);
                    }
                }
                MultiUnitPricing::UniformPrice => {
                    let price = if order.len() > k { flat[order[k]] } else { 0.0 };
                    for &idx in &winners {
                        payments.add(b, idx / items, price);
                    }
                }
                MultiUnitPricing::Vickrey => {
                    let losing: Vec<usize> = order.iter().skip(k).copied().collect();
                    for p in 0..players {
                        let q = winners.iter().filter(|&&idx| idx / items == p).count();
                        if q == 0 {
                            continue;
                        }
                        // Losing bids of the others, highest first. The order
                        // vector is already sorted, so taking in sequence
                        // while skipping own bids yields the q highest.
                        let due: f64 = losing
                            .iter()
                            .filter(|&&idx| idx / items != p)
                            .take(q)
                            .map(|&idx| flat[idx])
                            .sum();
                        payments.add(b, p, due);
                    }
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
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn profile(rows: &[&[f64]]) -> BidProfile {
        let mats: Vec<BatchMatrix> = rows
            .iter()
            .map(|r| BatchMatrix::from_vec(r.to_vec(), 1, r.len()).unwrap())
            .collect();
        BidProfile::from_players(&mats).unwrap()
    }

    #[test]
    fn test_discriminatory_winners_pay_own_bids() {
        let bids = profile(&[&[4.0, 2.0], &[3.0, 1.0]]);
        let outcome = MultiUnitAuction::discriminatory().play(&bids).unwrap();

        // Top two of {4, 2, 3, 1} are player 0's 4 and player 1's 3.
        assert_eq!(outcome.allocations.get(0, 0, 0), 1.0);
        assert_eq!(outcome.allocations.get(0, 1, 0), 1.0);
        assert_eq!(outcome.payments.get(0, 0), 4.0);
        assert_eq!(outcome.payments.get(0, 1), 3.0);
    }

    #[test]
    fn test_uniform_price_is_highest_losing_bid() {
        let bids = profile(&[&[4.0, 2.0], &[3.0, 1.0]]);
        let outcome = MultiUnitAuction::uniform_price().play(&bids).unwrap();

        // Highest losing bid of {4, 3 | 2, 1} is 2; both winners pay it.
        assert_eq!(outcome.payments.get(0, 0), 2.0);
        assert_eq!(outcome.payments.get(0, 1), 2.0);
        assert_eq!(outcome.allocations.instance_total(0), 2.0);
    }

    #[test]
    fn test_vickrey_pays_losing_bids_of_others() {
        let bids = profile(&[&[5.0, 3.0], &[4.0, 1.0], &[2.0, 0.0]]);
        let outcome = MultiUnitAuction::vickrey().play(&bids).unwrap();

        // Winners: player 0's 5 and player 1's 4.
        // Player 0 owes the highest losing bid not its own: max(1, 2) = 2.
        // Player 1 owes max(3, 2) = 3.
        assert_eq!(outcome.payments.get(0, 0), 2.0);
        assert_eq!(outcome.payments.get(0, 1), 3.0);
        assert_eq!(outcome.payments.get(0, 2), 0.0);
    }

    #[test]
    fn test_one_player_sweeps_both_units() {
        let bids = profile(&[&[5.0, 4.0], &[3.0, 1.0]]);

        let outcome = MultiUnitAuction::vickrey().play(&bids).unwrap();
        assert_eq!(outcome.allocations.units_won(0, 0), 2.0);
        // Both units priced at player 1's losing bids, 3 + 1.
        assert_eq!(outcome.payments.get(0, 0), 4.0);

        let outcome = MultiUnitAuction::uniform_price().play(&bids).unwrap();
        // Market price is the highest losing bid, 3, paid per unit.
        assert_eq!(outcome.payments.get(0, 0), 6.0);
    }

    #[test]
    fn test_increasing_rows_are_nulled() {
        // Player 0's row increases, so it is zeroed and cannot win.
        let bids = profile(&[&[1.0, 6.0], &[3.0, 2.0]]);
        let outcome = MultiUnitAuction::discriminatory().play(&bids).unwrap();

        assert_eq!(outcome.allocations.units_won(0, 0), 0.0);
        assert_eq!(outcome.allocations.units_won(0, 1), 2.0);
        assert_eq!(outcome.payments.get(0, 0), 0.0);
        assert_eq!(outcome.payments.get(0, 1), 5.0);
    }

    #[test]
    fn test_zero_bids_never_win() {
        let bids = profile(&[&[2.0, 0.0], &[0.0, 0.0]]);
        let outcome = MultiUnitAuction::uniform_price().play(&bids).unwrap();

        assert_eq!(outcome.allocations.instance_total(0), 1.0);
        // Only one positive bid, so the clearing price is zero.
        assert_eq!(outcome.payments.get(0, 0), 0.0);
    }

    /// Reference payment rule computed naively per player, mirroring the
    /// textbook definition rather than the sorted-order shortcut.
    fn reference_vickrey(flat: &[f64], items: usize, players: usize) -> Vec<f64> {
        let k = items;
        let order = descending_order(flat);
        let winners: Vec<usize> = order
            .iter()
            .take(k)
            .copied()
            .filter(|&i| flat[i] > 0.0)
            .collect();
        let losing: Vec<usize> = order.iter().skip(k).copied().collect();

        (0..players)
            .map(|p| {
                let q = winners.iter().filter(|&&i| i / items == p).count();
                let mut others: Vec<f64> = losing
                    .iter()
                    .filter(|&&i| i / items != p)
                    .map(|&i| flat[i])
                    .collect();
                others.sort_by(|a, b| b.partial_cmp(a).unwrap());
                others.iter().take(q).sum()
            })
            .collect()
    }

    #[test]
    fn test_vickrey_matches_reference_on_random_batches() {
        let mut rng = StdRng::seed_from_u64(99);
        let auction = MultiUnitAuction::vickrey();

        for _ in 0..200 {
            let players = rng.gen_range(2..5);
            let items = rng.gen_range(1..4);
            let mats: Vec<BatchMatrix> = (0..players)
                .map(|_| {
                    let mut row: Vec<f64> = (0..items).map(|_| rng.gen_range(0.0..10.0)).collect();
                    row.sort_by(|a, b| b.partial_cmp(a).unwrap());
                    BatchMatrix::from_vec(row, 1, items).unwrap()
                })
                .collect();
            let bids = BidProfile::from_players(&mats).unwrap();
            let outcome = auction.play(&bids).unwrap();

            let expected = reference_vickrey(bids.instance_slice(0), items, players);
            for (p, want) in expected.iter().enumerate() {
                assert!(
                    (outcome.payments.get(0, p) - want).abs() < 1e-9,
                    "player {} paid {}, reference says {}",
                    p,
                    outcome.payments.get(0, p),
                    want
                );
            }
        }
    }

    #[test]
    fn test_vickrey_never_exceeds_own_winning_bids() {
        let mut rng = StdRng::seed_from_u64(123);
        let vickrey = MultiUnitAuction::vickrey();
        let discriminatory = MultiUnitAuction::discriminatory();

        for _ in 0..100 {
            let mats: Vec<BatchMatrix> = (0..3)
                .map(|_| {
                    let mut row: Vec<f64> = (0..2).map(|_| rng.gen_range(0.0..5.0)).collect();
                    row.sort_by(|a, b| b.partial_cmp(a).unwrap());
                    BatchMatrix::from_vec(row, 1, 2).unwrap()
                })
                .collect();
            let bids = BidProfile::from_players(&mats).unwrap();

            let v = vickrey.play(&bids).unwrap();
            let d = discriminatory.play(&bids).unwrap();
            for p in 0..3 {
                assert!(
                    v.payments.get(0, p) <= d.payments.get(0, p) + 1e-9,
                    "Vickrey payment must not exceed the winner's own bids"
                );
            }
        }
    }

    #[test]
    fn test_full_supply_allocated_across_batch() {
        let mut rng = StdRng::seed_from_u64(7);
        let batch = 50;
        let items = 3;
        let mats: Vec<BatchMatrix> = (0..2)
            .map(|_| {
                let mut data = Vec::with_capacity(batch * items);
                for _ in 0..batch {
                    let mut row: Vec<f64> =
                        (0..items).map(|_| rng.gen_range(0.1..10.0)).collect();
                    row.sort_by(|a, b| b.partial_cmp(a).unwrap());
                    data.extend(row);
                }
                BatchMatrix::from_vec(data, batch, items).unwrap()
            })
            .collect();
        let bids = BidProfile::from_players(&mats).unwrap();

        let outcome = MultiUnitAuction::uniform_price().play(&bids).unwrap();
        for b in 0..batch {
            assert_eq!(
                outcome.allocations.instance_total(b),
                items as f64,
                "all {} units must clear when every bid is positive",
                items
            );
        }
    }
}
