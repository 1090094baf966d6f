//! Closed-form and numeric equilibrium baselines.
//!
//! These are the strategies learned ones are measured against. Uniform
//! first-price has a linear Bayes-Nash equilibrium and a closed-form
//! equilibrium utility; the Gaussian case has no closed form and falls back
//! to quadrature over the opponent-maximum distribution; LLG locals follow
//! the Ausubel-Baranov piecewise forms in the correlation parameter.

use std::f64::consts::{LN_2, SQRT_2};

use crate::error::{AuctionError, Result};
use crate::mechanisms::llg::PaymentRule;
use crate::sim::strategy::{ClosureStrategy, LinearBidStrategy, TruthfulStrategy};

/// Symmetric Bayes-Nash equilibrium of the first-price auction with
/// uniform valuations on `[u_lo, u_hi]` and CRRA-style risk exponent.
///
/// `b(v) = u_lo + (v - u_lo) * (n-1) / (n-1+risk)`, which is linear, so it
/// fits the learner's strategy family exactly.
pub fn fpsb_uniform_bid(n_players: usize, u_lo: f64, risk: f64) -> Result<LinearBidStrategy> {
    validate_players(n_players)?;
    validate_risk(risk)?;
    let shading = (n_players - 1) as f64 / ((n_players - 1) as f64 + risk);
    Ok(LinearBidStrategy::new(u_lo * (1.0 - shading), shading))
}

/// Equilibrium utility of one bidder under [`fpsb_uniform_bid`].
pub fn fpsb_uniform_utility(
    n_players: usize,
    u_lo: f64,
    u_hi: f64,
    risk: f64,
) -> Result<f64> {
    validate_players(n_players)?;
    validate_risk(risk)?;
    if u_hi <= u_lo {
        return Err(AuctionError::InvalidParameter {
            name: "u_hi",
            value: u_hi,
            constraint: "must exceed u_lo",
        });
    }
    let n = n_players as f64;
    Ok((risk * (u_hi - u_lo) / (n - 1.0 + risk)).powf(risk) / (n + risk))
}

/// Equilibrium utility of one truthful bidder in the second-price auction
/// with uniform valuations: `(u_hi - u_lo) / (n (n + 1))`.
pub fn vickrey_uniform_utility(n_players: usize, u_lo: f64, u_hi: f64) -> Result<f64> {
    validate_players(n_players)?;
    if u_hi <= u_lo {
        return Err(AuctionError::InvalidParameter {
            name: "u_hi",
            value: u_hi,
            constraint: "must exceed u_lo",
        });
    }
    let n = n_players as f64;
    Ok((u_hi - u_lo) / (n * (n + 1.0)))
}

/// Numeric symmetric equilibrium of the first-price auction with Gaussian
/// valuations.
///
/// `b(v) = v - (integral of F(x)^(n-1) up to v) / F(v)^(n-1)` where `F` is
/// the value CDF. The integral is evaluated by Simpson quadrature per
/// valuation, so the returned strategy runs rows on the rayon pool.
pub fn fpsb_gaussian_strategy(
    n_players: usize,
    mean: f64,
    stddev: f64,
) -> Result<ClosureStrategy> {
    validate_players(n_players)?;
    if !stddev.is_finite() || stddev <= 0.0 {
        return Err(AuctionError::InvalidParameter {
            name: "stddev",
            value: stddev,
            constraint: "must be positive and finite",
        });
    }

    let exponent = (n_players - 1) as f64;
    let lo = mean - 8.0 * stddev;

    Ok(ClosureStrategy::parallel(move |row: &[f64]| {
        row.iter()
            .map(|&v| {
                if v <= lo {
                    return v;
                }
                let denom = normal_cdf(v, mean, stddev).powf(exponent);
                if denom < 1e-12 {
                    return v;
                }
                let shade = simpson(
                    |x| normal_cdf(x, mean, stddev).powf(exponent),
                    lo,
                    v,
                    256,
                );
                v - shade / denom
            })
            .collect()
    }))
}

/// Ausubel-Baranov equilibrium bid function for an LLG local bidder with
/// correlation `gamma`.
///
/// Locals bid on their single item; the formulas return zero below the
/// participation threshold. The first-price rule has no known closed form
/// and is rejected.
pub fn llg_local_bid(rule: PaymentRule, gamma: f64) -> Result<ClosureStrategy> {
    if !gamma.is_finite() || !(0.0..=1.0).contains(&gamma) {
        return Err(AuctionError::InvalidParameter {
            name: "gamma",
            value: gamma,
            constraint: "must lie in [0, 1]",
        });
    }

    let bid: Box<dyn Fn(f64) -> f64 + Send + Sync> = match rule {
        PaymentRule::Vcg => Box::new(|v| v),
        PaymentRule::NearestZero => {
            if gamma > 1.0 - 1e-9 {
                // gamma -> 1 limit of the closed form.
                Box::new(|v| v)
            } else {
                let g = 1.0 - gamma;
                Box::new(move |v: f64| (1.0 + (v * g + gamma).ln() / g).max(0.0))
            }
        }
        PaymentRule::NearestBid => {
            if gamma > 1.0 - 1e-9 {
                Box::new(|v| 0.5 * v)
            } else {
                let g = 1.0 - gamma;
                Box::new(move |v: f64| ((LN_2 - (2.0 - g * v).ln()) / g).max(0.0))
            }
        }
        PaymentRule::NearestVcg => {
            if gamma > 1.0 - 1e-9 {
                Box::new(|v| 2.0 * v / 3.0)
            } else {
                let g = 1.0 - gamma;
                let scale = 2.0 / (2.0 + gamma);
                let threshold = (3.0 - (9.0 - g * g).sqrt()) / g;
                Box::new(move |v: f64| (scale * (v - threshold)).max(0.0))
            }
        }
        PaymentRule::FirstPrice => {
            return Err(AuctionError::Unsupported(
                "no closed-form local equilibrium under the first-price rule",
            ))
        }
    };

    Ok(ClosureStrategy::new(move |row: &[f64]| {
        row.iter().map(|&v| bid(v)).collect()
    }))
}

/// The LLG global bidder bids truthfully under every core-selecting rule.
pub fn llg_global_bid() -> TruthfulStrategy {
    TruthfulStrategy::new()
}

fn validate_players(n_players: usize) -> Result<()> {
    if n_players < 2 {
        return Err(AuctionError::InvalidParameter {
            name: "n_players",
            value: n_players as f64,
            constraint: "equilibrium forms need at least 2 players",
        });
    }
    Ok(())
}

fn validate_risk(risk: f64) -> Result<()> {
    if !risk.is_finite() || risk <= 0.0 {
        return Err(AuctionError::InvalidParameter {
            name: "risk",
            value: risk,
            constraint: "must be positive and finite",
        });
    }
    Ok(())
}

/// Standard normal CDF via the Abramowitz-Stegun 7.1.26 erf polynomial
/// (absolute error below 1.5e-7, plenty for quadrature baselines).
fn normal_cdf(x: f64, mean: f64, stddev: f64) -> f64 {
    0.5 * (1.0 + erf((x - mean) / (stddev * SQRT_2)))
}

fn erf(x: f64) -> f64 {
    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();
    let t = 1.0 / (1.0 + 0.3275911 * x);
    let poly = t
        * (0.254829592
            + t * (-0.284496736 + t * (1.421413741 + t * (-1.453152027 + t * 1.061405429))));
    sign * (1.0 - poly * (-x * x).exp())
}

/// Composite Simpson rule with an even number of intervals.
fn simpson<F: Fn(f64) -> f64>(f: F, lo: f64, hi: f64, intervals: usize) -> f64 {
    if hi <= lo {
        return 0.0;
    }
    let m = intervals.max(2);
    let n = m + m % 2;
    let h = (hi - lo) / n as f64;

    let mut sum = f(lo) + f(hi);
    for i in 1..n {
        let weight = if i % 2 == 1 { 4.0 } else { 2.0 };
        sum += weight * f(lo + i as f64 * h);
    }
    sum * h / 3.0
}
