use serde::{Deserialize, Serialize};

/// Running mean and mean of squares of a stream of values.
#[derive(Debug, Clone, Default)]
pub struct Accumulator {
    n_vals: usize,
    mean: f64,
    mean_sq: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AccumulatorReport {
    pub mean: f64,
    pub std_dev: f64,
}

impl Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, val: f64) {
        self.n_vals += 1;
        let weight = 1.0 / self.n_vals as f64;
        self.mean += (val - self.mean) * weight;
        self.mean_sq += (val * val - self.mean_sq) * weight;
    }

    pub fn count(&self) -> usize {
        self.n_vals
    }

    /// Running mean, undefined before the first value.
    pub fn mean(&self) -> Option<f64> {
        (self.n_vals > 0).then_some(self.mean)
    }

    /// Running mean of squares, undefined before the first value.
    pub fn mean_sq(&self) -> Option<f64> {
        (self.n_vals > 0).then_some(self.mean_sq)
    }

    pub fn report(&self) -> AccumulatorReport {
        let n_vals = self.n_vals as f64;
        AccumulatorReport {
            mean: self.mean().unwrap_or(f64::NAN),
            std_dev: if self.n_vals > 1 {
                let var = (self.mean_sq - self.mean * self.mean) * n_vals / (n_vals - 1.0);
                var.max(0.0).sqrt()
            } else {
                f64::NAN
            },
        }
    }
}

/// Low median: the lower-middle element for even lengths, so the result is
/// always one of the inputs. `None` for an empty slice.
pub fn median(vals: &[f64]) -> Option<f64> {
    if vals.is_empty() {
        return None;
    }
    let mut sorted = vals.to_vec();
    let i_mid = (sorted.len() - 1) / 2;
    let (_, &mut mid, _) = sorted.select_nth_unstable_by(i_mid, f64::total_cmp);
    Some(mid)
}

#[derive(Debug, Serialize, Deserialize)]
pub struct KsReport {
    pub statistic: f64,
    pub p_value: f64,
}

/// Two-sample Kolmogorov-Smirnov test with the asymptotic p-value.
pub fn ks_two_sample(a: &[f64], b: &[f64]) -> Option<KsReport> {
    if a.is_empty() || b.is_empty() {
        return None;
    }
    let mut a = a.to_vec();
    let mut b = b.to_vec();
    a.sort_by(f64::total_cmp);
    b.sort_by(f64::total_cmp);

    let n_a = a.len() as f64;
    let n_b = b.len() as f64;
    let (mut i_a, mut i_b) = (0, 0);
    let mut statistic: f64 = 0.0;
    while i_a < a.len() && i_b < b.len() {
        // Step past every copy of the smaller value so ties move both CDFs together.
        let val = a[i_a].min(b[i_b]);
        while i_a < a.len() && a[i_a] <= val {
            i_a += 1;
        }
        while i_b < b.len() && b[i_b] <= val {
            i_b += 1;
        }
        statistic = statistic.max((i_a as f64 / n_a - i_b as f64 / n_b).abs());
    }

    let n_eff = n_a * n_b / (n_a + n_b);
    let lambda = (n_eff.sqrt() + 0.12 + 0.11 / n_eff.sqrt()) * statistic;
    Some(KsReport {
        statistic,
        p_value: kolmogorov_survival(lambda),
    })
}

/// Survival function of the Kolmogorov distribution.
fn kolmogorov_survival(lambda: f64) -> f64 {
    if lambda < 1e-3 {
        return 1.0;
    }
    let mut sum = 0.0;
    let mut sign = 1.0;
    for j in 1..=100 {
        let j = j as f64;
        let term = sign * (-2.0 * j * j * lambda * lambda).exp();
        sum += term;
        if term.abs() < 1e-12 {
            break;
        }
        sign = -sign;
    }
    (2.0 * sum).clamp(0.0, 1.0)
}
