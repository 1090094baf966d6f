//! Correlated valuation draws across bidder groups.
//!
//! A [`CorrelationDevice`] produces the pieces a group of bidders combines
//! into dependent valuations: a shared common component, per-draw mixing
//! weights, and the mixing rule itself. The models follow Ausubel & Baranov
//! (2019):
//!
//! - **Independent**: no common component, weight zero.
//! - **Bernoulli weights**: each batch row flips a coin with probability
//!   `gamma`; heads means the whole group shares the common draw for that
//!   row, tails means everyone keeps their own.
//! - **Constant weights**: every draw mixes with the fixed weight
//!   `(gamma - sqrt(gamma (1 - gamma))) / (2 gamma - 1)`, which is `0.5`
//!   at `gamma = 0.5`.
//! - **Mineral rights**: a pure common-value model. Each of three bidders
//!   observes `v_i = 2 s u_i` with shared `s` and private `u_i`, all
//!   uniform on `[0, 1]`. Conditional draws given one observation invert
//!   the joint density `(4 - z^2) / (16 z^2)` on `[0, 2]` (Krishna), using
//!   the Lambert W function for the first coordinate.
//!
//! Inverse-CDF evaluations near the support boundary are clamped into the
//! support rather than rejected; small numerical drift there is expected.

use rand::rngs::StdRng;
use rand::Rng;
use rustc_hash::FxHashMap;

use crate::batch::BatchMatrix;
use crate::error::{AuctionError, Result};
use crate::sim::bidder::ValuationPrior;

/// Mixing weights for one batch of correlated draws.
#[derive(Debug, Clone, PartialEq)]
pub enum Weights {
    /// One weight shared by every batch row.
    Scalar(f64),
    /// One weight per batch row, shared across item columns.
    PerRow(Vec<f64>),
}

impl Weights {
    /// The weight applying to batch row `b`.
    pub fn at_row(&self, b: usize) -> f64 {
        match self {
            Weights::Scalar(w) => *w,
            Weights::PerRow(v) => v[b],
        }
    }

    fn check_batch(&self, batch: usize) -> Result<()> {
        if let Weights::PerRow(v) = self {
            if v.len() != batch {
                return Err(AuctionError::ShapeMismatch {
                    context: "correlation weights",
                    expected: format!("{} rows", batch),
                    actual: format!("{} rows", v.len()),
                });
            }
        }
        Ok(())
    }
}

/// A joint valuation model for one group of bidders.
pub trait CorrelationDevice: Send + Sync {
    /// The correlation parameter `gamma` in `[0, 1]`.
    fn correlation(&self) -> f64;

    /// Short model identifier for logs and result files.
    fn model_name(&self) -> &'static str;

    /// Draw the group's shared component, `None` for independent models.
    fn draw_common_component(&self, rng: &mut StdRng) -> Result<Option<BatchMatrix>>;

    /// Draw the mixing weights for one batch.
    fn draw_weights(&self, rng: &mut StdRng) -> Weights;

    /// Combine a bidder's individual draw with the shared component.
    fn mix(
        &self,
        individual: &BatchMatrix,
        common: &BatchMatrix,
        weights: &Weights,
    ) -> Result<BatchMatrix>;

    /// Draw the other group members' valuations conditional on one member's
    /// observed valuation.
    ///
    /// `positions` names the players the draws are for; the returned map is
    /// keyed by those positions. Row `b` of each result is conditioned on
    /// row `b` of `cond`.
    fn draw_conditional_valuations(
        &self,
        cond: &BatchMatrix,
        positions: &[usize],
        rng: &mut StdRng,
    ) -> Result<FxHashMap<usize, BatchMatrix>>;
}

fn check_same_shape(individual: &BatchMatrix, common: &BatchMatrix) -> Result<()> {
    if individual.batch_size() != common.batch_size()
        || individual.n_items() != common.n_items()
    {
        return Err(AuctionError::ShapeMismatch {
            context: "correlation mix",
            expected: format!("({}, {})", individual.batch_size(), individual.n_items()),
            actual: format!("({}, {})", common.batch_size(), common.n_items()),
        });
    }
    Ok(())
}

/// Convex combination `w * common + (1 - w) * individual`, the mixing rule
/// of the weights models.
fn additive_mix(
    individual: &BatchMatrix,
    common: &BatchMatrix,
    weights: &Weights,
) -> Result<BatchMatrix> {
    check_same_shape(individual, common)?;
    weights.check_batch(individual.batch_size())?;

    let batch = individual.batch_size();
    let items = individual.n_items();
    let mut out = BatchMatrix::zeros(batch, items);
    for b in 0..batch {
        let w = weights.at_row(b);
        for i in 0..items {
            out.set(b, i, w * common.get(b, i) + (1.0 - w) * individual.get(b, i));
        }
    }
    Ok(out)
}

fn validate_correlation(correlation: f64) -> Result<()> {
    if !correlation.is_finite() || !(0.0..=1.0).contains(&correlation) {
        return Err(AuctionError::InvalidParameter {
            name: "correlation",
            value: correlation,
            constraint: "must lie in [0, 1]",
        });
    }
    Ok(())
}

/// No correlation: bidders draw independently.
#[derive(Debug, Clone)]
pub struct IndependentDevice {
    prior: ValuationPrior,
    batch_size: usize,
    n_items: usize,
}

impl IndependentDevice {
    /// Create an independent device over the given marginal prior.
    pub fn new(prior: ValuationPrior, batch_size: usize, n_items: usize) -> Result<Self> {
        prior.validate()?;
        Ok(Self {
            prior,
            batch_size,
            n_items,
        })
    }
}

impl CorrelationDevice for IndependentDevice {
    fn correlation(&self) -> f64 {
        0.0
    }

    fn model_name(&self) -> &'static str {
        "independent"
    }

    fn draw_common_component(&self, _rng: &mut StdRng) -> Result<Option<BatchMatrix>> {
        Ok(None)
    }

    fn draw_weights(&self, _rng: &mut StdRng) -> Weights {
        Weights::Scalar(0.0)
    }

    fn mix(
        &self,
        individual: &BatchMatrix,
        common: &BatchMatrix,
        weights: &Weights,
    ) -> Result<BatchMatrix> {
        additive_mix(individual, common, weights)
    }

    fn draw_conditional_valuations(
        &self,
        cond: &BatchMatrix,
        positions: &[usize],
        rng: &mut StdRng,
    ) -> Result<FxHashMap<usize, BatchMatrix>> {
        if cond.batch_size() != self.batch_size {
            return Err(AuctionError::ShapeMismatch {
                context: "conditioning sample",
                expected: format!("{} rows", self.batch_size),
                actual: format!("{} rows", cond.batch_size()),
            });
        }

        // Independence: conditioning changes nothing, draw fresh marginals.
        let mut draws = FxHashMap::default();
        for &position in positions {
            let mut m = BatchMatrix::zeros(self.batch_size, self.n_items);
            self.prior.sample_into(rng, &mut m)?;
            draws.insert(position, m);
        }
        Ok(draws)
    }
}

/// The Bernoulli weights model: rows are either perfectly correlated or
/// fully independent, with probability `gamma` of the former.
#[derive(Debug, Clone)]
pub struct BernoulliWeightsDevice {
    prior: ValuationPrior,
    batch_size: usize,
    n_items: usize,
    correlation: f64,
}

impl BernoulliWeightsDevice {
    /// Create a Bernoulli weights device.
    ///
    /// `prior` doubles as the distribution of the common component, which
    /// keeps the marginal distribution of each bidder's valuation equal to
    /// the prior for every `gamma`.
    pub fn new(
        prior: ValuationPrior,
        batch_size: usize,
        n_items: usize,
        correlation: f64,
    ) -> Result<Self> {
        prior.validate()?;
        validate_correlation(correlation)?;
        Ok(Self {
            prior,
            batch_size,
            n_items,
            correlation,
        })
    }
}

impl CorrelationDevice for BernoulliWeightsDevice {
    fn correlation(&self) -> f64 {
        self.correlation
    }

    fn model_name(&self) -> &'static str {
        "bernoulli_weights"
    }

    fn draw_common_component(&self, rng: &mut StdRng) -> Result<Option<BatchMatrix>> {
        let mut common = BatchMatrix::zeros(self.batch_size, self.n_items);
        self.prior.sample_into(rng, &mut common)?;
        Ok(Some(common))
    }

    fn draw_weights(&self, rng: &mut StdRng) -> Weights {
        let weights = (0..self.batch_size)
            .map(|_| if rng.gen::<f64>() < self.correlation { 1.0 } else { 0.0 })
            .collect();
        Weights::PerRow(weights)
    }

    fn mix(
        &self,
        individual: &BatchMatrix,
        common: &BatchMatrix,
        weights: &Weights,
    ) -> Result<BatchMatrix> {
        additive_mix(individual, common, weights)
    }

    fn draw_conditional_valuations(
        &self,
        cond: &BatchMatrix,
        positions: &[usize],
        rng: &mut StdRng,
    ) -> Result<FxHashMap<usize, BatchMatrix>> {
        // Given one member's valuation, another member shares it exactly
        // when both rows drew the common component: probability gamma^2.
        // Otherwise the conditional marginal is the prior itself.
        let both_common = self.correlation * self.correlation;
        let mut draws = FxHashMap::default();
        for &position in positions {
            let mut m = BatchMatrix::zeros(cond.batch_size(), self.n_items);
            self.prior.sample_into(rng, &mut m)?;
            for b in 0..cond.batch_size() {
                if rng.gen::<f64>() < both_common {
                    for i in 0..self.n_items {
                        m.set(b, i, cond.get(b, i));
                    }
                }
            }
            draws.insert(position, m);
        }
        Ok(draws)
    }
}

/// The constant weights model: every draw mixes individual and common
/// components with one fixed weight derived from `gamma`.
#[derive(Debug, Clone)]
pub struct ConstantWeightsDevice {
    prior: ValuationPrior,
    batch_size: usize,
    n_items: usize,
    correlation: f64,
    weight: f64,
}

impl ConstantWeightsDevice {
    /// Create a constant weights device; the mixing weight is fixed at
    /// construction.
    pub fn new(
        prior: ValuationPrior,
        batch_size: usize,
        n_items: usize,
        correlation: f64,
    ) -> Result<Self> {
        prior.validate()?;
        validate_correlation(correlation)?;
        // The closed form is 0/0 at gamma = 0.5; its limit is 0.5.
        let weight = if correlation == 0.5 {
            0.5
        } else {
            (correlation - (correlation * (1.0 - correlation)).sqrt())
                / (2.0 * correlation - 1.0)
        };
        Ok(Self {
            prior,
            batch_size,
            n_items,
            correlation,
            weight,
        })
    }

    /// The fixed mixing weight implied by `gamma`.
    pub fn weight(&self) -> f64 {
        self.weight
    }
}

impl CorrelationDevice for ConstantWeightsDevice {
    fn correlation(&self) -> f64 {
        self.correlation
    }

    fn model_name(&self) -> &'static str {
        "constant_weights"
    }

    fn draw_common_component(&self, rng: &mut StdRng) -> Result<Option<BatchMatrix>> {
        let mut common = BatchMatrix::zeros(self.batch_size, self.n_items);
        self.prior.sample_into(rng, &mut common)?;
        Ok(Some(common))
    }

    fn draw_weights(&self, _rng: &mut StdRng) -> Weights {
        Weights::Scalar(self.weight)
    }

    fn mix(
        &self,
        individual: &BatchMatrix,
        common: &BatchMatrix,
        weights: &Weights,
    ) -> Result<BatchMatrix> {
        additive_mix(individual, common, weights)
    }

    fn draw_conditional_valuations(
        &self,
        _cond: &BatchMatrix,
        _positions: &[usize],
        _rng: &mut StdRng,
    ) -> Result<FxHashMap<usize, BatchMatrix>> {
        // The conditional distribution has no closed form under constant
        // weights; nothing downstream needs it.
        Err(AuctionError::Unsupported(
            "conditional sampling under the constant-weights model",
        ))
    }
}

// Signals must stay inside the open support; the marginal's logarithm
// blows up at both endpoints.
const SIGNAL_FLOOR: f64 = 1e-6;
const SIGNAL_CEIL: f64 = 2.0 - 1e-9;

/// The mineral rights common-value model for three bidders.
///
/// Each bidder observes `v_i = 2 s u_i`, so observations live on `[0, 2]`
/// and share the common factor `s`. Mixing is multiplicative with weight
/// one half.
#[derive(Debug, Clone)]
pub struct MineralRightsDevice {
    batch_size: usize,
    correlation: f64,
}

impl MineralRightsDevice {
    /// Create a mineral rights device. Signals are uniform on `[0, 1]` by
    /// model definition; only the batch size and the nominal correlation
    /// parameter vary.
    pub fn new(batch_size: usize, correlation: f64) -> Result<Self> {
        validate_correlation(correlation)?;
        Ok(Self {
            batch_size,
            correlation,
        })
    }
}

impl CorrelationDevice for MineralRightsDevice {
    fn correlation(&self) -> f64 {
        self.correlation
    }

    fn model_name(&self) -> &'static str {
        "mineral_rights"
    }

    fn draw_common_component(&self, rng: &mut StdRng) -> Result<Option<BatchMatrix>> {
        let mut common = BatchMatrix::zeros(self.batch_size, 1);
        for row in common.rows_mut() {
            row[0] = rng.gen::<f64>();
        }
        Ok(Some(common))
    }

    fn draw_weights(&self, _rng: &mut StdRng) -> Weights {
        Weights::Scalar(0.5)
    }

    /// Multiplicative mixing `common * individual / w`; with `w = 0.5` this
    /// is exactly `2 s u`.
    fn mix(
        &self,
        individual: &BatchMatrix,
        common: &BatchMatrix,
        weights: &Weights,
    ) -> Result<BatchMatrix> {
        check_same_shape(individual, common)?;
        weights.check_batch(individual.batch_size())?;

        let batch = individual.batch_size();
        let items = individual.n_items();
        let mut out = BatchMatrix::zeros(batch, items);
        for b in 0..batch {
            let w = weights.at_row(b);
            if w <= 0.0 {
                return Err(AuctionError::InvalidParameter {
                    name: "weight",
                    value: w,
                    constraint: "multiplicative mixing needs a positive weight",
                });
            }
            for i in 0..items {
                out.set(b, i, common.get(b, i) * individual.get(b, i) / w);
            }
        }
        Ok(out)
    }

    fn draw_conditional_valuations(
        &self,
        cond: &BatchMatrix,
        positions: &[usize],
        rng: &mut StdRng,
    ) -> Result<FxHashMap<usize, BatchMatrix>> {
        if positions.len() != 2 {
            return Err(AuctionError::Unsupported(
                "mineral rights conditionals are defined for exactly two opponents",
            ));
        }
        if cond.n_items() != 1 {
            return Err(AuctionError::ShapeMismatch {
                context: "mineral rights conditioning sample",
                expected: "1 item column".to_string(),
                actual: format!("{} item columns", cond.n_items()),
            });
        }

        let batch = cond.batch_size();
        let mut first = BatchMatrix::zeros(batch, 1);
        let mut second = BatchMatrix::zeros(batch, 1);

        for b in 0..batch {
            let z = cond.get(b, 0).clamp(SIGNAL_FLOOR, SIGNAL_CEIL);

            // Chain rule: draw the second observation from its marginal
            // given z, then the third given both.
            let x0 = cond_marginal_icdf(z, rng.gen::<f64>()).clamp(0.0, 2.0);
            let x1 = cond2_icdf(z, x0.max(SIGNAL_FLOOR), rng.gen::<f64>()).clamp(0.0, 2.0);

            // The chain is exchangeable only in distribution; swapping a
            // random half removes the ordering bias between the two slots.
            let (a, b_val) = if rng.gen::<bool>() { (x0, x1) } else { (x1, x0) };
            first.set(b, 0, a);
            second.set(b, 0, b_val);
        }

        let mut draws = FxHashMap::default();
        draws.insert(positions[0], first);
        draws.insert(positions[1], second);
        Ok(draws)
    }
}

/// Inverse CDF of one remaining observation given a single observation `z`.
///
/// The CDF is `f x` below `z` and `c1 + (x - 2 ln x) / c2 - c3` above it,
/// with `f = (z - 2) / (2 z ln(z/2))`. The upper branch inverts through the
/// Lambert W function.
fn cond_marginal_icdf(z: f64, u: f64) -> f64 {
    let ln_half_z = (z / 2.0).ln();
    let f = (z - 2.0) / (2.0 * z * ln_half_z);

    if u < f * z {
        u / f
    } else {
        let c1 = f * z;
        let c2 = 2.0 * ln_half_z;
        let c3 = (z - 2.0 * z.ln()) / (2.0 * ln_half_z);
        // Solving x - 2 ln x = c2 (u - c1 + c3) for x in [z, 2].
        let arg = -1.0 / (2.0 * (c2 * (u - c1 + c3)).exp().sqrt());
        -2.0 * lambert_w_approx(arg, 2)
    }
}

/// Inverse CDF of the third observation given two observations; `z` is
/// their maximum. Closed form, no iteration.
fn cond2_icdf(cond1: f64, cond2: f64, u: f64) -> f64 {
    let z = cond1.max(cond2);
    let f1 = 4.0 * z / (2.0 - z);
    let f2 = (4.0 - z * z) / (16.0 * z * z);

    if u < z * f1 * f2 {
        u / (f1 * f2)
    } else {
        // Invert f1 (f2 z - (x^2 + 4)/(16 x) + (z^2 + 4)/(16 z)) = u,
        // a quadratic in x; the smaller root lies in [z, 2].
        let a = f2 * z + (z * z + 4.0) / (16.0 * z) - u / f1;
        8.0 * a - (64.0 * a * a - 4.0).max(0.0).sqrt()
    }
}

/// Approximate the principal branch of the Lambert W function.
///
/// Positive arguments use Halley iterations from zero; negative arguments
/// (the branch this module exercises, always in `(-1/e, 0)`) use the
/// Winitzki closed-form approximation.
fn lambert_w_approx(z: f64, iters: usize) -> f64 {
    if z > 0.0 {
        let mut a: f64 = 0.0;
        for _ in 0..iters {
            let ea = a.exp();
            let fa = a * ea - z;
            a -= fa / (ea * (a + 1.0) - ((a + 2.0) * fa) / (2.0 * a + 2.0));
        }
        a
    } else {
        let e = std::f64::consts::E;
        let denom = 1.0 / (e - 1.0) - 1.0 / 2.0_f64.sqrt() + 1.0 / (2.0 * e * z + 2.0).sqrt();
        (e * z) / (1.0 + 1.0 / denom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn unit_prior() -> ValuationPrior {
        ValuationPrior::Uniform {
            low: 0.0,
            high: 1.0,
        }
    }

    /// CDF matching `cond_marginal_icdf`, for round-trip checks.
    fn cond_marginal_cdf(z: f64, x: f64) -> f64 {
        let ln_half_z = (z / 2.0).ln();
        let f = (z - 2.0) / (2.0 * z * ln_half_z);
        if x < z {
            f * x
        } else {
            let c1 = f * z;
            let c2 = 2.0 * ln_half_z;
            let c3 = (z - 2.0 * z.ln()) / (2.0 * ln_half_z);
            c1 + (x - 2.0 * x.ln()) / c2 - c3
        }
    }

    /// CDF matching `cond2_icdf`, for round-trip checks.
    fn cond2_cdf(cond1: f64, cond2: f64, x: f64) -> f64 {
        let z = cond1.max(cond2);
        let f1 = 4.0 * z / (2.0 - z);
        let f2 = (4.0 - z * z) / (16.0 * z * z);
        if x < z {
            f1 * f2 * x
        } else {
            f1 * (f2 * z - (x * x + 4.0) / (16.0 * x) + (z * z + 4.0) / (16.0 * z))
        }
    }

    #[test]
    fn test_correlation_validation() {
        assert!(BernoulliWeightsDevice::new(unit_prior(), 8, 1, 1.5).is_err());
        assert!(ConstantWeightsDevice::new(unit_prior(), 8, 1, -0.1).is_err());
        assert!(MineralRightsDevice::new(8, f64::NAN).is_err());
        assert!(BernoulliWeightsDevice::new(unit_prior(), 8, 1, 1.0).is_ok());
    }

    #[test]
    fn test_constant_weight_values() {
        let half = ConstantWeightsDevice::new(unit_prior(), 8, 1, 0.5).unwrap();
        assert_eq!(half.weight(), 0.5);

        let device = ConstantWeightsDevice::new(unit_prior(), 8, 1, 0.75).unwrap();
        let expected = (0.75 - (0.75_f64 * 0.25).sqrt()) / 0.5;
        assert!((device.weight() - expected).abs() < 1e-12);

        // The formula is continuous through the removable singularity.
        let near = ConstantWeightsDevice::new(unit_prior(), 8, 1, 0.500001).unwrap();
        assert!((near.weight() - 0.5).abs() < 1e-3);
    }

    #[test]
    fn test_bernoulli_weights_are_indicator_rows() {
        let device = BernoulliWeightsDevice::new(unit_prior(), 10_000, 2, 0.3).unwrap();
        let mut rng = StdRng::seed_from_u64(11);

        match device.draw_weights(&mut rng) {
            Weights::PerRow(w) => {
                assert!(w.iter().all(|&x| x == 0.0 || x == 1.0));
                let share = w.iter().sum::<f64>() / w.len() as f64;
                assert!(
                    (share - 0.3).abs() < 0.02,
                    "common-component share {} far from gamma",
                    share
                );
            }
            other => panic!("expected per-row weights, got {:?}", other),
        }
    }

    #[test]
    fn test_additive_mix_selects_components() {
        let device = BernoulliWeightsDevice::new(unit_prior(), 2, 1, 0.5).unwrap();
        let individual = BatchMatrix::from_vec(vec![1.0, 3.0], 2, 1).unwrap();
        let common = BatchMatrix::from_vec(vec![10.0, 30.0], 2, 1).unwrap();

        let mixed = device
            .mix(&individual, &common, &Weights::PerRow(vec![1.0, 0.0]))
            .unwrap();
        assert_eq!(mixed.get(0, 0), 10.0, "weight 1 takes the common draw");
        assert_eq!(mixed.get(1, 0), 3.0, "weight 0 keeps the individual draw");

        let blended = device
            .mix(&individual, &common, &Weights::Scalar(0.25))
            .unwrap();
        assert!((blended.get(0, 0) - (0.25 * 10.0 + 0.75 * 1.0)).abs() < 1e-12);

        // Mismatched weight length fails fast.
        assert!(device
            .mix(&individual, &common, &Weights::PerRow(vec![1.0]))
            .is_err());
    }

    #[test]
    fn test_independent_device_has_no_common_component() {
        let device = IndependentDevice::new(unit_prior(), 16, 1).unwrap();
        let mut rng = StdRng::seed_from_u64(0);

        assert!(device.draw_common_component(&mut rng).unwrap().is_none());
        assert_eq!(device.draw_weights(&mut rng), Weights::Scalar(0.0));

        let cond = BatchMatrix::zeros(16, 1);
        let draws = device
            .draw_conditional_valuations(&cond, &[1, 2], &mut rng)
            .unwrap();
        assert_eq!(draws.len(), 2);
        assert!(draws[&1].as_slice().iter().all(|&v| (0.0..1.0).contains(&v)));
    }

    #[test]
    fn test_constant_weights_conditionals_unsupported() {
        let device = ConstantWeightsDevice::new(unit_prior(), 8, 1, 0.4).unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        let cond = BatchMatrix::zeros(8, 1);
        assert!(matches!(
            device.draw_conditional_valuations(&cond, &[1, 2], &mut rng),
            Err(AuctionError::Unsupported(_))
        ));
    }

    #[test]
    fn test_mineral_rights_mix_doubles_product() {
        let device = MineralRightsDevice::new(4, 0.5).unwrap();
        let individual = BatchMatrix::from_vec(vec![0.1, 0.5, 0.9, 1.0], 4, 1).unwrap();
        let common = BatchMatrix::from_vec(vec![0.2, 0.4, 0.6, 0.8], 4, 1).unwrap();

        let mixed = device
            .mix(&individual, &common, &Weights::Scalar(0.5))
            .unwrap();
        for b in 0..4 {
            let expected = 2.0 * individual.get(b, 0) * common.get(b, 0);
            assert!((mixed.get(b, 0) - expected).abs() < 1e-12);
        }

        assert!(device
            .mix(&individual, &common, &Weights::Scalar(0.0))
            .is_err());
    }

    #[test]
    fn test_lambert_w_identity() {
        let w = lambert_w_approx(1.0, 2);
        assert!(
            (w * w.exp() - 1.0).abs() < 1e-3,
            "W(1) e^W(1) = {} should be 1",
            w * w.exp()
        );

        // Exact at the branch point.
        let e = std::f64::consts::E;
        assert!((lambert_w_approx(-1.0 / e, 2) + 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_cond_marginal_icdf_inverts_cdf() {
        for &z in &[0.2, 0.7, 1.3, 1.9] {
            for &x in &[0.05, 0.4, 1.0, 1.6, 1.95] {
                let u = cond_marginal_cdf(z, x);
                if !(0.0..1.0).contains(&u) {
                    continue;
                }
                let back = cond_marginal_icdf(z, u);
                // The Lambert branch carries the Winitzki approximation
                // error; the linear branch is exact.
                let tol = if x < z { 1e-9 } else { 0.05 };
                assert!(
                    (back - x).abs() < tol,
                    "z={}: icdf(cdf({})) = {}",
                    z,
                    x,
                    back
                );
            }
        }
    }

    #[test]
    fn test_cond2_icdf_inverts_cdf_exactly() {
        for &(c1, c2) in &[(0.3, 0.8), (1.2, 0.4), (1.7, 1.7)] {
            for &x in &[0.1, 0.5, 1.0, 1.5, 1.9] {
                let u = cond2_cdf(c1, c2, x);
                if !(0.0..1.0).contains(&u) {
                    continue;
                }
                let back = cond2_icdf(c1, c2, u);
                assert!(
                    (back - x).abs() < 1e-9,
                    "cond=({}, {}): icdf(cdf({})) = {}",
                    c1,
                    c2,
                    x,
                    back
                );
            }
        }
    }

    #[test]
    fn test_mineral_rights_conditionals_stay_in_support() {
        let device = MineralRightsDevice::new(500, 0.5).unwrap();
        let mut rng = StdRng::seed_from_u64(21);

        // Observations v = 2 s u from the model itself.
        let mut cond = BatchMatrix::zeros(500, 1);
        for row in cond.rows_mut() {
            row[0] = 2.0 * rng.gen::<f64>() * rng.gen::<f64>();
        }

        let draws = device
            .draw_conditional_valuations(&cond, &[0, 2], &mut rng)
            .unwrap();
        assert_eq!(draws.len(), 2);
        for position in [0, 2] {
            for &v in draws[&position].as_slice() {
                assert!(
                    (0.0..=2.0).contains(&v) && v.is_finite(),
                    "conditional draw {} outside the support",
                    v
                );
            }
        }

        // Wrong opponent count fails fast.
        assert!(device
            .draw_conditional_valuations(&cond, &[0], &mut rng)
            .is_err());
    }
}
