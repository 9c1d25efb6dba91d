use crate::model::{ModelParameters, ProfitPolicy};
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::{fmt::Debug, fs, ops::RangeBounds, path::Path};

/// Demand model parameters shared by every sweep value.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Demand intercept.
    pub alpha: f64,
    /// Own-price sensitivity.
    pub beta: f64,
    /// Cross-price sensitivity.
    pub gamma: f64,
    /// Replace negative profits by zero.
    #[serde(default)]
    pub floor_profit: bool,
}

/// Values of the noise scale to sweep over.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct SweepConfig {
    pub deltas: Vec<f64>,
}

/// Per-trial settings.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct TrialConfig {
    /// Total number of rounds per trial, warm-up included.
    pub n_rounds: usize,
    /// Number of trailing rounds used for the trial summary.
    pub window: usize,
    /// Number of independent trials per sweep value.
    pub n_reps: usize,
    /// Run-level seed. Drawn from the OS when absent.
    pub seed: Option<u64>,
}

/// Simulation configuration parameters.
///
/// Loaded from a TOML file and validated before use.
/// See [`Config::from_file`] for loading.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Config {
    pub model: ModelConfig,
    pub sweep: SweepConfig,
    pub trial: TrialConfig,
}

impl Config {
    /// Load a [`Config`] from a file.
    ///
    /// The file must be TOML-encoded and contain a serialized [`Config`].
    /// Performs validation on all parameters before returning.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, deserialized,
    /// or if the configuration values are invalid.
    pub fn from_file<P: AsRef<Path>>(file: P) -> Result<Self> {
        let file = file.as_ref();
        let contents =
            fs::read_to_string(file).with_context(|| format!("failed to read {file:?}"))?;

        let config = Self::parse(&contents)?;

        Ok(config)
    }

    /// Parse and validate a [`Config`] from a TOML string.
    pub fn parse(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents).context("failed to deserialize config")?;

        config.validate().context("failed to validate config")?;

        Ok(config)
    }

    /// Model parameters for a given noise scale.
    pub fn params(&self, delta: f64) -> Result<ModelParameters> {
        ModelParameters::new(self.model.alpha, self.model.beta, self.model.gamma, delta)
    }

    pub fn policy(&self) -> ProfitPolicy {
        if self.model.floor_profit {
            ProfitPolicy::Floored
        } else {
            ProfitPolicy::Raw
        }
    }

    fn validate(&self) -> Result<()> {
        if self.sweep.deltas.is_empty() {
            bail!("sweep must contain at least one noise scale");
        }
        for &delta in &self.sweep.deltas {
            self.params(delta)
                .with_context(|| format!("invalid model parameters for delta = {delta}"))?;
        }

        check_num(self.trial.n_rounds, 3..=1_000_000_000).context("invalid number of rounds")?;
        check_num(self.trial.window, 1..=self.trial.n_rounds - 2)
            .context("invalid trailing window")?;
        check_num(self.trial.n_reps, 1..=1_000_000).context("invalid number of repetitions")?;

        Ok(())
    }
}

fn check_num<T, R>(num: T, range: R) -> Result<()>
where
    T: PartialOrd + Debug,
    R: RangeBounds<T> + Debug,
{
    if !range.contains(&num) {
        bail!("number must be in the range {range:?}, but is {num:?}");
    }
    Ok(())
}
