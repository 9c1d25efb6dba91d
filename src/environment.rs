use crate::agent::N_ACTIONS;
use crate::model::{ModelParameters, ProfitModel, ProfitPolicy};
use anyhow::{Result, bail};
use rand::prelude::*;
use std::collections::VecDeque;

/// Number of competing firms.
pub const N_FIRMS: usize = 2;

/// Prices a firm can choose from: index 0 is competitive, index 1 is collusive.
pub type ActionSpace = [f64; N_ACTIONS];

/// Everything that happened in a single round.
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct Round {
    pub actions: [usize; N_FIRMS],
    pub prices: [f64; N_FIRMS],
    pub profits: [f64; N_FIRMS],
}

/// Duopoly pricing environment.
///
/// Maps the firms' action indices to prices, draws their noisy profits and
/// logs every round. The log may be bounded to the most recent rounds.
pub struct Environment {
    profit_model: ProfitModel,
    action_spaces: [ActionSpace; N_FIRMS],
    log: VecDeque<Round>,
    capacity: Option<usize>,
    n_rounds: usize,
}

impl Environment {
    /// Create an environment keeping the full round log.
    pub fn new(params: ModelParameters, policy: ProfitPolicy) -> Result<Self> {
        Self::build(params, policy, None)
    }

    /// Create an environment that only keeps the last `capacity` rounds.
    pub fn with_retention(
        params: ModelParameters,
        policy: ProfitPolicy,
        capacity: usize,
    ) -> Result<Self> {
        if capacity == 0 {
            bail!("log capacity must be positive");
        }
        Self::build(params, policy, Some(capacity))
    }

    fn build(
        params: ModelParameters,
        policy: ProfitPolicy,
        capacity: Option<usize>,
    ) -> Result<Self> {
        let profit_model = ProfitModel::new(params, policy)?;
        let action_space = [params.competitive_price(), params.collusive_price()];
        Ok(Self {
            profit_model,
            action_spaces: [action_space; N_FIRMS],
            log: VecDeque::with_capacity(capacity.unwrap_or_default()),
            capacity,
            n_rounds: 0,
        })
    }

    /// Play one round and return the profits of both firms.
    pub fn step<R: Rng + ?Sized>(
        &mut self,
        actions: [usize; N_FIRMS],
        rng: &mut R,
    ) -> Result<[f64; N_FIRMS]> {
        let mut prices = [0.0; N_FIRMS];
        for (i_firm, &action) in actions.iter().enumerate() {
            let Some(&price) = self.action_spaces[i_firm].get(action) else {
                bail!("firm {i_firm} chose action {action}, but only {N_ACTIONS} exist");
            };
            prices[i_firm] = price;
        }

        let profits = [
            self.profit_model.profit(prices[0], prices[1], rng),
            self.profit_model.profit(prices[1], prices[0], rng),
        ];

        if self.capacity.is_some_and(|cap| self.log.len() == cap) {
            self.log.pop_front();
        }
        self.log.push_back(Round {
            actions,
            prices,
            profits,
        });
        self.n_rounds += 1;

        Ok(profits)
    }

    pub fn params(&self) -> &ModelParameters {
        self.profit_model.params()
    }

    pub fn action_space(&self, i_firm: usize) -> &ActionSpace {
        &self.action_spaces[i_firm]
    }

    /// Total number of rounds played, including those no longer retained.
    pub fn n_rounds(&self) -> usize {
        self.n_rounds
    }

    /// Retained rounds, oldest first.
    pub fn rounds(&self) -> impl Iterator<Item = &Round> {
        self.log.iter()
    }

    /// Prices of a firm over the last `window` retained rounds.
    pub fn trailing_prices(&self, i_firm: usize, window: usize) -> Vec<f64> {
        let skip = self.log.len().saturating_sub(window);
        self.log
            .iter()
            .skip(skip)
            .map(|round| round.prices[i_firm])
            .collect()
    }
}
