use crate::agent::{Agent, N_ACTIONS};
use crate::environment::{Environment, N_FIRMS};
use crate::model::{ModelParameters, ProfitPolicy};
use crate::stats::median;
use anyhow::{Context, Result, bail};
use rand::prelude::*;
use rand_chacha::ChaCha12Rng;
use rand_distr::Uniform;
use serde::{Deserialize, Serialize};

/// Number of forced exploration rounds before the index rule takes over.
pub const N_WARMUP_ROUNDS: usize = 2;

/// Summary of a finished trial: the median price of each firm over the
/// trailing window.
#[derive(Debug, PartialEq, Clone, Copy, Serialize, Deserialize)]
pub struct TrialResult {
    pub prices: [f64; N_FIRMS],
}

/// Stage of a trial.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Phase {
    /// Forced exploration; `round` rounds of it have been played.
    Warming { round: usize },
    /// Index-driven exploitation.
    Running,
    /// All rounds played.
    Finished,
}

/// Simulation engine for a single trial.
///
/// Owns the environment, both agents and the trial's random number generator.
pub struct Engine {
    env: Environment,
    agt_arr: [Agent; N_FIRMS],
    rng: ChaCha12Rng,
    phase: Phase,
    n_rounds: usize,
    window: usize,
    first_actions: [usize; N_FIRMS],
}

impl Engine {
    /// Create a trial whose random stream is derived from `seed` and `i_trial`.
    ///
    /// Only the trailing `window` rounds are kept in the environment log.
    pub fn new(
        params: ModelParameters,
        policy: ProfitPolicy,
        n_rounds: usize,
        window: usize,
        seed: u64,
        i_trial: u64,
    ) -> Result<Self> {
        if n_rounds <= N_WARMUP_ROUNDS {
            bail!("number of rounds must exceed {N_WARMUP_ROUNDS}, but is {n_rounds}");
        }
        if window == 0 || window > n_rounds - N_WARMUP_ROUNDS {
            bail!("window must be in 1..={}, but is {window}", n_rounds - N_WARMUP_ROUNDS);
        }

        let env = Environment::with_retention(params, policy, window)
            .context("failed to construct environment")?;

        let mut rng = ChaCha12Rng::seed_from_u64(seed);
        rng.set_stream(i_trial);

        Ok(Self {
            env,
            agt_arr: [Agent::new(), Agent::new()],
            rng,
            phase: Phase::Warming { round: 0 },
            n_rounds,
            window,
            first_actions: [0; N_FIRMS],
        })
    }

    /// Play the whole trial and summarize it.
    pub fn run(&mut self) -> Result<TrialResult> {
        while self.phase != Phase::Finished {
            self.step_round().context("failed to perform round")?;
        }
        self.summarize()
    }

    /// Play a single round and advance the phase.
    pub fn step_round(&mut self) -> Result<()> {
        let actions = match self.phase {
            Phase::Warming { round: 0 } => {
                // Each firm picks uniformly at random, independently.
                let action_dist = Uniform::new(0, N_ACTIONS)?;
                for action in self.first_actions.iter_mut() {
                    *action = action_dist.sample(&mut self.rng);
                }
                self.force_actions(self.first_actions)?
            }
            Phase::Warming { .. } => {
                // Each firm tries the action it skipped in the first round.
                let complement = self.first_actions.map(|action| N_ACTIONS - 1 - action);
                self.force_actions(complement)?
            }
            Phase::Running => {
                // Both choices are fixed before the environment sees either.
                let mut actions = [0; N_FIRMS];
                for (action, agt) in actions.iter_mut().zip(self.agt_arr.iter_mut()) {
                    *action = agt.select_action()?;
                }
                actions
            }
            Phase::Finished => bail!("trial already finished"),
        };

        let profits = self.env.step(actions, &mut self.rng)?;
        for (agt, profit) in self.agt_arr.iter_mut().zip(profits) {
            agt.update(profit)?;
        }

        self.phase = match self.phase {
            _ if self.env.n_rounds() == self.n_rounds => Phase::Finished,
            Phase::Warming { round } if round + 1 < N_WARMUP_ROUNDS => {
                Phase::Warming { round: round + 1 }
            }
            _ => Phase::Running,
        };

        Ok(())
    }

    fn force_actions(&mut self, actions: [usize; N_FIRMS]) -> Result<[usize; N_FIRMS]> {
        for (agt, &action) in self.agt_arr.iter_mut().zip(actions.iter()) {
            agt.force(action)?;
        }
        Ok(actions)
    }

    /// Median price of each firm over the trailing window.
    pub fn summarize(&self) -> Result<TrialResult> {
        if self.phase != Phase::Finished {
            bail!("trial has not finished");
        }
        let mut prices = [0.0; N_FIRMS];
        for (i_firm, price) in prices.iter_mut().enumerate() {
            let window = self.env.trailing_prices(i_firm, self.window);
            *price = median(&window).context("trailing window is empty")?;
        }
        Ok(TrialResult { prices })
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn agents(&self) -> &[Agent; N_FIRMS] {
        &self.agt_arr
    }

    pub fn environment(&self) -> &Environment {
        &self.env
    }
}
