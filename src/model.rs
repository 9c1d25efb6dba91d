use anyhow::{Result, bail};
use rand::prelude::*;
use rand_distr::Uniform;

/// Linear demand model parameters.
///
/// Immutable once constructed; [`ModelParameters::new`] rejects any set for which
/// the equilibrium prices would be non-finite or negative.
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct ModelParameters {
    alpha: f64,
    beta: f64,
    gamma: f64,
    delta: f64,
}

/// What to do with negative profits.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ProfitPolicy {
    /// Report profits as drawn, negative values included.
    Raw,
    /// Replace negative profits by zero.
    Floored,
}

impl ModelParameters {
    /// Create validated model parameters.
    ///
    /// # Errors
    /// Returns an invalid configuration error unless every value is finite,
    /// `alpha > 0`, `beta > gamma >= 0`, `delta > 0` and the noise interval
    /// `[-1/delta, 1/delta]` has a finite width.
    pub fn new(alpha: f64, beta: f64, gamma: f64, delta: f64) -> Result<Self> {
        if ![alpha, beta, gamma, delta].iter().all(|val| val.is_finite()) {
            bail!("invalid configuration: parameters must be finite");
        }
        if alpha <= 0.0 {
            bail!("invalid configuration: alpha must be positive, but is {alpha}");
        }
        if gamma < 0.0 {
            bail!("invalid configuration: gamma must be non-negative, but is {gamma}");
        }
        if beta <= gamma {
            bail!("invalid configuration: beta ({beta}) must exceed gamma ({gamma})");
        }
        if delta <= 0.0 {
            bail!("invalid configuration: delta must be positive, but is {delta}");
        }
        if !(2.0 / delta).is_finite() {
            bail!("invalid configuration: noise interval for delta = {delta} is unbounded");
        }
        Ok(Self {
            alpha,
            beta,
            gamma,
            delta,
        })
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn beta(&self) -> f64 {
        self.beta
    }

    pub fn gamma(&self) -> f64 {
        self.gamma
    }

    pub fn delta(&self) -> f64 {
        self.delta
    }

    /// Nash price: each firm best-responds to the other.
    pub fn competitive_price(&self) -> f64 {
        self.alpha / (2.0 * self.beta - self.gamma)
    }

    /// Monopoly price: maximizes joint profit.
    pub fn collusive_price(&self) -> f64 {
        self.alpha / (2.0 * (self.beta - self.gamma))
    }

    /// Noise-free profit of a firm pricing at `p_own` against a rival at `p_rival`.
    pub fn demand_profit(&self, p_own: f64, p_rival: f64) -> f64 {
        p_own * (self.alpha - self.beta * p_own + self.gamma * p_rival)
    }

    /// Half-width of the additive noise interval.
    pub fn noise_bound(&self) -> f64 {
        1.0 / self.delta
    }
}

/// Draws noisy profits for a fixed parameter set.
pub struct ProfitModel {
    params: ModelParameters,
    policy: ProfitPolicy,
    noise_dist: Uniform<f64>,
}

impl ProfitModel {
    pub fn new(params: ModelParameters, policy: ProfitPolicy) -> Result<Self> {
        let bound = params.noise_bound();
        let noise_dist = Uniform::new_inclusive(-bound, bound)?;
        Ok(Self {
            params,
            policy,
            noise_dist,
        })
    }

    pub fn params(&self) -> &ModelParameters {
        &self.params
    }

    /// Profit with a fresh noise draw.
    pub fn profit<R: Rng + ?Sized>(&self, p_own: f64, p_rival: f64, rng: &mut R) -> f64 {
        let profit = self.params.demand_profit(p_own, p_rival) + self.noise_dist.sample(rng);
        match self.policy {
            ProfitPolicy::Raw => profit,
            ProfitPolicy::Floored => profit.max(0.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_chacha::ChaCha12Rng;

    fn reference_params(delta: f64) -> ModelParameters {
        ModelParameters::new(0.48, 0.9, 0.6, delta).unwrap()
    }

    #[test]
    fn reference_equilibrium_prices() {
        let params = reference_params(10.0);
        assert!((params.competitive_price() - 0.4).abs() < 1e-12);
        assert!((params.collusive_price() - 0.8).abs() < 1e-12);
    }

    #[test]
    fn equilibrium_prices_are_ordered_and_finite() {
        let mut rng = ChaCha12Rng::seed_from_u64(3);
        for _ in 0..1000 {
            let alpha = rng.random_range(0.01..10.0);
            let gamma = rng.random_range(0.0..5.0);
            let beta = gamma + rng.random_range(0.01..5.0);
            let params = ModelParameters::new(alpha, beta, gamma, 1.0).unwrap();
            let p_d = params.competitive_price();
            let p_m = params.collusive_price();
            assert!(p_d.is_finite() && p_m.is_finite());
            assert!(p_d >= 0.0);
            assert!(p_d < p_m, "alpha {alpha} beta {beta} gamma {gamma}");
        }
    }

    #[test]
    fn equilibrium_derivation_is_bit_identical() {
        let a = reference_params(2.0);
        let b = reference_params(2.0);
        assert_eq!(
            a.competitive_price().to_bits(),
            b.competitive_price().to_bits()
        );
        assert_eq!(a.collusive_price().to_bits(), b.collusive_price().to_bits());
    }

    #[test]
    fn rejects_invalid_parameters() {
        assert!(ModelParameters::new(0.48, 0.6, 0.6, 1.0).is_err());
        assert!(ModelParameters::new(0.48, 0.5, 0.6, 1.0).is_err());
        assert!(ModelParameters::new(0.48, 0.9, -0.1, 1.0).is_err());
        assert!(ModelParameters::new(0.48, 0.9, 0.6, 0.0).is_err());
        assert!(ModelParameters::new(0.0, 0.9, 0.6, 1.0).is_err());
        assert!(ModelParameters::new(f64::NAN, 0.9, 0.6, 1.0).is_err());
        assert!(ModelParameters::new(0.48, f64::INFINITY, 0.6, 1.0).is_err());
        assert!(ModelParameters::new(0.48, 0.9, 0.6, 1e-310).is_err());
        assert!(ModelParameters::new(0.48, 0.9, 0.6, 1e-300).is_ok());
    }

    #[test]
    fn noise_stays_within_bound() {
        let params = reference_params(4.0);
        let model = ProfitModel::new(params, ProfitPolicy::Raw).unwrap();
        let mut rng = ChaCha12Rng::seed_from_u64(11);
        let base = params.demand_profit(0.4, 0.8);
        for _ in 0..10_000 {
            let profit = model.profit(0.4, 0.8, &mut rng);
            assert!((profit - base).abs() <= 0.25 + 1e-12);
        }
    }

    #[test]
    fn floored_profits_are_non_negative() {
        let params = reference_params(1.0);
        let model = ProfitModel::new(params, ProfitPolicy::Floored).unwrap();
        let mut rng = ChaCha12Rng::seed_from_u64(5);
        let mut n_zero = 0;
        for _ in 0..10_000 {
            let profit = model.profit(0.8, 0.4, &mut rng);
            assert!(profit >= 0.0);
            if profit == 0.0 {
                n_zero += 1;
            }
        }
        // Demand profit is zero here, so about half the draws get floored.
        assert!(n_zero > 1000);
    }
}
