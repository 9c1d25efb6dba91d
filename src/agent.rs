use crate::stats::Accumulator;
use anyhow::{Result, bail};

/// Number of actions available to each firm.
pub const N_ACTIONS: usize = 2;

/// Pricing agent driven by the UCB-tuned index rule.
///
/// Keeps one reward accumulator per action. The visit counts always sum to
/// the number of elapsed rounds.
#[derive(Debug, Clone, Default)]
pub struct Agent {
    acc_arr: [Accumulator; N_ACTIONS],
    last_action: Option<usize>,
    n_rounds: usize,
}

impl Agent {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take an externally chosen action for the current round.
    pub fn force(&mut self, action: usize) -> Result<()> {
        if action >= N_ACTIONS {
            bail!("action must be below {N_ACTIONS}, but is {action}");
        }
        self.last_action = Some(action);
        Ok(())
    }

    /// Choose the action with the greatest UCB-tuned index.
    ///
    /// Ties go to the lowest action index.
    ///
    /// # Errors
    /// Returns a precondition violation if some action has never been sampled.
    pub fn select_action(&mut self) -> Result<usize> {
        let indices = self.indices()?;
        let mut action = 0;
        for (i_act, &index) in indices.iter().enumerate().skip(1) {
            if index > indices[action] {
                action = i_act;
            }
        }
        self.last_action = Some(action);
        Ok(action)
    }

    /// UCB-tuned index of every action.
    pub fn indices(&self) -> Result<[f64; N_ACTIONS]> {
        let ln_t = (self.n_rounds as f64).ln();
        let mut indices = [0.0; N_ACTIONS];
        for (i_act, acc) in self.acc_arr.iter().enumerate() {
            let (Some(mean), Some(mean_sq)) = (acc.mean(), acc.mean_sq()) else {
                bail!("precondition violation: action {i_act} has not been sampled");
            };
            let n = acc.count() as f64;
            let var_bound = mean_sq - mean * mean + (2.0 * ln_t / n).sqrt();
            indices[i_act] = mean + (ln_t / n * var_bound.min(0.25)).sqrt();
        }
        Ok(indices)
    }

    /// Record the reward of the action taken this round.
    pub fn update(&mut self, reward: f64) -> Result<()> {
        let Some(action) = self.last_action else {
            bail!("no action taken before update");
        };
        self.n_rounds += 1;
        self.acc_arr[action].add(reward);
        Ok(())
    }

    pub fn counts(&self) -> [usize; N_ACTIONS] {
        [self.acc_arr[0].count(), self.acc_arr[1].count()]
    }

    pub fn n_rounds(&self) -> usize {
        self.n_rounds
    }

    pub fn last_action(&self) -> Option<usize> {
        self.last_action
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn play(agent: &mut Agent, action: usize, reward: f64) {
        agent.force(action).unwrap();
        agent.update(reward).unwrap();
    }

    #[test]
    fn select_before_sampling_fails() {
        let mut agent = Agent::new();
        assert!(agent.select_action().is_err());

        play(&mut agent, 0, 1.0);
        assert!(agent.select_action().is_err());

        play(&mut agent, 1, 0.5);
        assert!(agent.select_action().is_ok());
    }

    #[test]
    fn update_without_action_fails() {
        let mut agent = Agent::new();
        assert!(agent.update(1.0).is_err());
        assert!(agent.force(N_ACTIONS).is_err());
    }

    #[test]
    fn counts_sum_to_rounds() {
        let mut agent = Agent::new();
        play(&mut agent, 1, 0.2);
        play(&mut agent, 0, 0.1);
        assert_eq!(agent.counts(), [1, 1]);
        assert_eq!(agent.n_rounds(), 2);

        for i_round in 0..50 {
            let action = agent.select_action().unwrap();
            agent.update(0.1 * (action + 1) as f64).unwrap();
            assert_eq!(agent.n_rounds(), 3 + i_round);
            assert_eq!(agent.counts().iter().sum::<usize>(), agent.n_rounds());
        }
    }

    #[test]
    fn index_matches_formula() {
        let mut agent = Agent::new();
        play(&mut agent, 0, 0.2);
        play(&mut agent, 0, 0.4);
        play(&mut agent, 1, 0.5);

        let ln_t = 3.0_f64.ln();
        let mean_0: f64 = 0.3;
        let mean_sq_0: f64 = (0.04 + 0.16) / 2.0;
        let var_0 = mean_sq_0 - mean_0 * mean_0 + (2.0 * ln_t / 2.0).sqrt();
        let index_0 = mean_0 + (ln_t / 2.0 * var_0.min(0.25)).sqrt();
        let var_1 = 0.25 - 0.25 + (2.0 * ln_t).sqrt();
        let index_1 = 0.5 + (ln_t * var_1.min(0.25)).sqrt();

        let indices = agent.indices().unwrap();
        assert!((indices[0] - index_0).abs() < 1e-12);
        assert!((indices[1] - index_1).abs() < 1e-12);
        assert_eq!(agent.select_action().unwrap(), 1);
    }

    #[test]
    fn ties_go_to_lowest_action() {
        let mut agent = Agent::new();
        play(&mut agent, 0, 0.3);
        play(&mut agent, 1, 0.3);
        assert_eq!(agent.select_action().unwrap(), 0);
    }

    #[test]
    fn selection_is_deterministic() {
        let mut agent = Agent::new();
        play(&mut agent, 0, 0.144);
        play(&mut agent, 1, 0.192);
        play(&mut agent, 1, 0.0);

        let mut copy = agent.clone();
        let first = agent.select_action().unwrap();
        let second = agent.select_action().unwrap();
        assert_eq!(first, second);
        assert_eq!(copy.select_action().unwrap(), first);
        assert_eq!(agent.indices().unwrap(), copy.indices().unwrap());
    }
}
