//! The LLG combinatorial auction.
//!
//! Three bidders, two goods, fixed bundle interests: player 0 wants good
//! {1}, player 1 wants good {2}, player 2 (the "global" bidder) wants the
//! bundle {1,2}. Actions are therefore scalar per player. The locals win
//! their goods iff their bids sum to strictly more than the global bid, so
//! the global bidder takes ties.
//!
//! Payments follow one of the named core-selecting rules from the
//! auction-theory literature (see Ausubel & Milgrom 2006, Bosshard et al.
//! 2017). The piecewise formulas are reproduced exactly, including their
//! case splits on the second local's bid; they are not approximations.

use serde::{Deserialize, Serialize};

use crate::batch::{Allocation, BidProfile, Outcome, Payments};
use crate::error::{AuctionError, Result};
use crate::mechanisms::{validate_bids, validate_player_count, Mechanism};

/// Payment rule of an [`LlgAuction`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentRule {
    /// Winners pay their own bids.
    FirstPrice,
    /// Vickrey-Clarke-Groves payments.
    Vcg,
    /// Core payment nearest to the submitted bids.
    NearestBid,
    /// Core payment nearest to the origin (also known as "proxy").
    NearestZero,
    /// Core payment nearest to the VCG point.
    NearestVcg,
}

impl PaymentRule {
    /// Parse a rule name. `"proxy"` is accepted as an alias for
    /// `"nearest_zero"`; anything else unknown is rejected.
    pub fn parse(name: &str) -> Result<Self> {
        match name {
            "first_price" => Ok(PaymentRule::FirstPrice),
            "vcg" => Ok(PaymentRule::Vcg),
            "nearest_bid" => Ok(PaymentRule::NearestBid),
            "nearest_zero" | "proxy" => Ok(PaymentRule::NearestZero),
            "nearest_vcg" => Ok(PaymentRule::NearestVcg),
            other => Err(AuctionError::UnknownPaymentRule(other.to_string())),
        }
    }

    /// Canonical rule name.
    pub fn name(&self) -> &'static str {
        match self {
            PaymentRule::FirstPrice => "first_price",
            PaymentRule::Vcg => "vcg",
            PaymentRule::NearestBid => "nearest_bid",
            PaymentRule::NearestZero => "nearest_zero",
            PaymentRule::NearestVcg => "nearest_vcg",
        }
    }

    /// All rules, in a stable order.
    pub fn all() -> [PaymentRule; 5] {
        [
            PaymentRule::FirstPrice,
            PaymentRule::Vcg,
            PaymentRule::NearestBid,
            PaymentRule::NearestZero,
            PaymentRule::NearestVcg,
        ]
    }
}

impl std::fmt::Display for PaymentRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Combinatorial auction for the two-local/one-global setting.
#[derive(Debug, Clone, Copy)]
pub struct LlgAuction {
    rule: PaymentRule,
}

impl LlgAuction {
    /// Create an LLG auction with the given payment rule.
    pub fn new(rule: PaymentRule) -> Self {
        Self { rule }
    }

    /// Create from a rule name, failing on unknown names.
    pub fn from_rule_name(name: &str) -> Result<Self> {
        Ok(Self::new(PaymentRule::parse(name)?))
    }

    /// The configured payment rule.
    pub fn rule(&self) -> PaymentRule {
        self.rule
    }

    /// Local winner payments `(p0, p1)` for one instance where the locals
    /// won with bids `(b0, b1)` against global bid `bg`.
    fn local_prices(&self, b0: f64, b1: f64, bg: f64) -> (f64, f64) {
        match self.rule {
            PaymentRule::FirstPrice => (b0, b1),
            PaymentRule::Vcg => ((bg - b1).max(0.0), (bg - b0).max(0.0)),
            PaymentRule::NearestVcg => {
                let vcg0 = (bg - b1).max(0.0);
                let vcg1 = (bg - b0).max(0.0);
                let delta = 0.5 * (bg - vcg0 - vcg1);
                (vcg0 + delta, vcg1 + delta)
            }
            PaymentRule::NearestZero => {
                if bg <= 2.0 * b1 {
                    (0.5 * bg, 0.5 * bg)
                } else {
                    (bg - b1, b1)
                }
            }
            PaymentRule::NearestBid => {
                if bg < b0 - b1 {
                    (bg, 0.0)
                } else {
                    let delta = 0.5 * (b0 + b1 - bg);
                    (b0 - delta, b1 - delta)
                }
            }
        }
    }
}

impl Mechanism for LlgAuction {
    fn play(&self, bids: &BidProfile) -> Result<Outcome> {
        validate_bids(bids)?;
        validate_player_count(bids, 3)?;
        if bids.n_items() != 1 {
            return Err(AuctionError::ShapeMismatch {
                context: "LLG bid profile",
                expected: "1 item column (scalar bundle bids)".into(),
                actual: format!("{} item columns", bids.n_items()),
            });
        }

        let batch = bids.batch_size();
        let mut allocations = Allocation::zeros(batch, 3, 1);
        let mut payments = Payments::zeros(batch, 3);

        for b in 0..batch {
            let (b0, b1, bg) = (bids.get(b, 0, 0), bids.get(b, 1, 0), bids.get(b, 2, 0));

            if b0 + b1 > bg {
                allocations.set(b, 0, 0, 1.0);
                allocations.set(b, 1, 0, 1.0);
                let (p0, p1) = self.local_prices(b0, b1, bg);
                payments.set(b, 0, p0);
                payments.set(b, 1, p1);
            } else {
                allocations.set(b, 2, 0, 1.0);
                let price = match self.rule {
                    PaymentRule::FirstPrice => bg,
                    _ => b0 + b1,
                };
                payments.set(b, 2, price);
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

    fn llg_profile(b0: f64, b1: f64, bg: f64) -> BidProfile {
        BidProfile::from_players(&[
            BatchMatrix::from_vec(vec![b0], 1, 1).unwrap(),
            BatchMatrix::from_vec(vec![b1], 1, 1).unwrap(),
            BatchMatrix::from_vec(vec![bg], 1, 1).unwrap(),
        ])
        .unwrap()
    }

    fn payments_for(rule: PaymentRule, b0: f64, b1: f64, bg: f64) -> (f64, f64, f64) {
        let outcome = LlgAuction::new(rule).play(&llg_profile(b0, b1, bg)).unwrap();
        (
            outcome.payments.get(0, 0),
            outcome.payments.get(0, 1),
            outcome.payments.get(0, 2),
        )
    }

    #[test]
    fn test_first_price_locals_win() {
        let outcome = LlgAuction::new(PaymentRule::FirstPrice)
            .play(&llg_profile(3.0, 4.0, 6.0))
            .unwrap();

        assert_eq!(outcome.allocations.get(0, 0, 0), 1.0);
        assert_eq!(outcome.allocations.get(0, 1, 0), 1.0);
        assert_eq!(outcome.allocations.get(0, 2, 0), 0.0);
        assert_eq!(outcome.payments.get(0, 0), 3.0);
        assert_eq!(outcome.payments.get(0, 1), 4.0);
        assert_eq!(outcome.payments.get(0, 2), 0.0);
    }

    #[test]
    fn test_vcg_local_prices() {
        let (p0, p1, pg) = payments_for(PaymentRule::Vcg, 3.0, 4.0, 6.0);
        assert_eq!(p0, 2.0, "relu(6 - 4)");
        assert_eq!(p1, 3.0, "relu(6 - 3)");
        assert_eq!(pg, 0.0, "losing global pays nothing");
    }

    #[test]
    fn test_global_wins_ties() {
        let outcome = LlgAuction::new(PaymentRule::Vcg)
            .play(&llg_profile(3.0, 3.0, 6.0))
            .unwrap();

        assert_eq!(outcome.allocations.get(0, 2, 0), 1.0, "global must take the tie");
        assert_eq!(outcome.allocations.get(0, 0, 0), 0.0);
        // Winning global pays the locals' sum under non-first-price rules.
        assert_eq!(outcome.payments.get(0, 2), 6.0);
    }

    #[test]
    fn test_global_first_price_pays_own_bid() {
        let (_, _, pg) = payments_for(PaymentRule::FirstPrice, 1.0, 2.0, 6.0);
        assert_eq!(pg, 6.0);
    }

    #[test]
    fn test_nearest_vcg_splits_the_gap() {
        // vcg = (2, 3), delta = (6 - 5) / 2 = 0.5.
        let (p0, p1, _) = payments_for(PaymentRule::NearestVcg, 3.0, 4.0, 6.0);
        assert!((p0 - 2.5).abs() < 1e-12);
        assert!((p1 - 3.5).abs() < 1e-12);
        // Core constraint: local payments cover the global bid exactly.
        assert!((p0 + p1 - 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_nearest_zero_both_cases() {
        // bg <= 2*b1: both pay bg/2.
        let (p0, p1, _) = payments_for(PaymentRule::NearestZero, 4.0, 3.0, 6.0);
        assert_eq!((p0, p1), (3.0, 3.0));

        // bg > 2*b1: prices (bg - b1, b1).
        let (p0, p1, _) = payments_for(PaymentRule::NearestZero, 5.0, 2.0, 6.0);
        assert_eq!((p0, p1), (4.0, 2.0));
    }

    #[test]
    fn test_proxy_is_alias_for_nearest_zero() {
        assert_eq!(PaymentRule::parse("proxy").unwrap(), PaymentRule::NearestZero);
    }

    #[test]
    fn test_nearest_bid_both_cases() {
        // bg < b0 - b1: prices (bg, 0).
        let (p0, p1, _) = payments_for(PaymentRule::NearestBid, 7.0, 1.0, 5.0);
        assert_eq!((p0, p1), (5.0, 0.0));

        // Otherwise both bids shrink by half the surplus.
        // delta = (3 + 4 - 6) / 2 = 0.5.
        let (p0, p1, _) = payments_for(PaymentRule::NearestBid, 3.0, 4.0, 6.0);
        assert!((p0 - 2.5).abs() < 1e-12);
        assert!((p1 - 3.5).abs() < 1e-12);
    }

    #[test]
    fn test_core_rules_cover_global_bid() {
        // When locals win under a nearest-* rule, their payments must sum to
        // at least the losing global bid (core constraint) and no more than
        // their own bids' sum.
        for rule in [
            PaymentRule::NearestVcg,
            PaymentRule::NearestZero,
            PaymentRule::NearestBid,
        ] {
            for &(b0, b1, bg) in &[
                (4.0, 3.0, 6.0),
                (5.0, 2.0, 6.0),
                (6.0, 5.0, 10.0),
                (2.0, 1.9, 3.0),
            ] {
                let (p0, p1, _) = payments_for(rule, b0, b1, bg);
                assert!(
                    p0 + p1 >= bg - 1e-12,
                    "{}: payments {}+{} below global bid {}",
                    rule,
                    p0,
                    p1,
                    bg
                );
                assert!(
                    p0 + p1 <= b0 + b1 + 1e-12,
                    "{}: payments exceed winning bids",
                    rule
                );
            }
        }
    }

    #[test]
    fn test_unknown_rule_fails_at_construction() {
        assert!(matches!(
            LlgAuction::from_rule_name("nearest_core"),
            Err(AuctionError::UnknownPaymentRule(_))
        ));
    }

    #[test]
    fn test_wrong_arity_rejected() {
        let bids = BidProfile::from_players(&[
            BatchMatrix::zeros(1, 1),
            BatchMatrix::zeros(1, 1),
        ])
        .unwrap();
        assert!(matches!(
            LlgAuction::new(PaymentRule::Vcg).play(&bids),
            Err(AuctionError::PlayerCount { expected: 3, actual: 2 })
        ));

        let wide = BidProfile::from_players(&[
            BatchMatrix::zeros(1, 2),
            BatchMatrix::zeros(1, 2),
            BatchMatrix::zeros(1, 2),
        ])
        .unwrap();
        assert!(LlgAuction::new(PaymentRule::Vcg).play(&wide).is_err());
    }
}
