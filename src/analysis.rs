use crate::engine::TrialResult;
use crate::environment::N_FIRMS;
use crate::model::ModelParameters;
use crate::stats::{Accumulator, ks_two_sample};

pub trait Obs {
    fn update(&mut self, res: &TrialResult);
    fn report(&self) -> serde_json::Value;
}

/// Share of trials settling on the collusive price.
pub struct CollusionFreq {
    collusive_price: f64,
    acc_arr: [Accumulator; N_FIRMS],
    joint_acc: Accumulator,
}

impl CollusionFreq {
    pub fn new(params: &ModelParameters) -> Self {
        Self {
            collusive_price: params.collusive_price(),
            acc_arr: Default::default(),
            joint_acc: Accumulator::new(),
        }
    }

    /// Per-firm share of collusive trials.
    pub fn shares(&self) -> [f64; N_FIRMS] {
        std::array::from_fn(|i_firm| self.acc_arr[i_firm].mean().unwrap_or(f64::NAN))
    }

    /// Share of trials where both firms collude.
    pub fn joint_share(&self) -> f64 {
        self.joint_acc.mean().unwrap_or(f64::NAN)
    }
}

impl Obs for CollusionFreq {
    fn update(&mut self, res: &TrialResult) {
        let colludes = res.prices.map(|price| price == self.collusive_price);
        for (acc, &flag) in self.acc_arr.iter_mut().zip(colludes.iter()) {
            acc.add(if flag { 1.0 } else { 0.0 });
        }
        let joint = colludes.iter().all(|&flag| flag);
        self.joint_acc.add(if joint { 1.0 } else { 0.0 });
    }

    fn report(&self) -> serde_json::Value {
        serde_json::json!({
            "collusion_freq": {
                "per_firm": self.shares(),
                "joint": self.joint_share(),
            }
        })
    }
}

/// Mean and spread of the summary prices of each firm.
pub struct PriceStats {
    acc_arr: [Accumulator; N_FIRMS],
}

impl PriceStats {
    pub fn new() -> Self {
        Self {
            acc_arr: Default::default(),
        }
    }
}

impl Obs for PriceStats {
    fn update(&mut self, res: &TrialResult) {
        for (acc, &price) in self.acc_arr.iter_mut().zip(res.prices.iter()) {
            acc.add(price);
        }
    }

    fn report(&self) -> serde_json::Value {
        let reports: Vec<_> = self.acc_arr.iter().map(|acc| acc.report()).collect();
        serde_json::json!({ "price_stats": reports })
    }
}

/// Two-sample test comparing the summary prices of both firms.
pub struct Symmetry {
    price_vecs: [Vec<f64>; N_FIRMS],
}

impl Symmetry {
    pub fn new() -> Self {
        Self {
            price_vecs: Default::default(),
        }
    }
}

impl Obs for Symmetry {
    fn update(&mut self, res: &TrialResult) {
        for (vec, &price) in self.price_vecs.iter_mut().zip(res.prices.iter()) {
            vec.push(price);
        }
    }

    fn report(&self) -> serde_json::Value {
        let report = ks_two_sample(&self.price_vecs[0], &self.price_vecs[1]);
        serde_json::json!({ "symmetry": report })
    }
}

/// Runs every observable over the trials of one sweep value.
pub struct Analyzer {
    delta: f64,
    n_trials: usize,
    obs_ptr_vec: Vec<Box<dyn Obs>>,
}

impl Analyzer {
    pub fn new(params: &ModelParameters) -> Self {
        let obs_ptr_vec: Vec<Box<dyn Obs>> = vec![
            Box::new(CollusionFreq::new(params)),
            Box::new(PriceStats::new()),
            Box::new(Symmetry::new()),
        ];
        Self {
            delta: params.delta(),
            n_trials: 0,
            obs_ptr_vec,
        }
    }

    pub fn add_trials(&mut self, trials: &[TrialResult]) {
        for res in trials {
            for obs in &mut self.obs_ptr_vec {
                obs.update(res);
            }
        }
        self.n_trials += trials.len();
    }

    pub fn report(&self) -> serde_json::Value {
        let reports: Vec<_> = self.obs_ptr_vec.iter().map(|obs| obs.report()).collect();
        serde_json::json!({
            "delta": self.delta,
            "n_trials": self.n_trials,
            "observables": reports,
        })
    }
}
