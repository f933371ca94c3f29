//! Regret-driven disclosure.
//!
//! The gate accumulates, per trial, the expected utility of the optimal
//! action and of the action the agent actually took. It opens when at least
//! `interval` trials passed since the last disclosure and the average regret
//! over those trials reaches `tolerance`. Opening resets the sums.

use clue_config::DisclosureConfig;

#[derive(Debug, Clone, PartialEq)]
pub struct DisclosureGate {
    config: DisclosureConfig,
    trial: u64,
    last_disclosure: u64,
    optimal_sum: f64,
    agent_sum: f64,
}

impl DisclosureGate {
    pub fn new(config: DisclosureConfig) -> Self {
        Self {
            config,
            trial: 0,
            last_disclosure: 0,
            optimal_sum: 0.0,
            agent_sum: 0.0,
        }
    }

    pub fn config(&self) -> &DisclosureConfig {
        &self.config
    }

    /// Record one trial and report whether advice should be disclosed.
    pub fn observe(&mut self, optimal_eu: f64, agent_eu: f64) -> bool {
        self.trial += 1;
        self.optimal_sum += optimal_eu;
        self.agent_sum += agent_eu;

        let elapsed = self.trial - self.last_disclosure;
        if elapsed < self.config.interval {
            return false;
        }
        if self.average_regret() < self.config.tolerance {
            return false;
        }
        self.last_disclosure = self.trial;
        self.optimal_sum = 0.0;
        self.agent_sum = 0.0;
        true
    }

    /// Mean regret per trial since the last disclosure.
    pub fn average_regret(&self) -> f64 {
        let elapsed = self.trial - self.last_disclosure;
        if elapsed == 0 {
            return 0.0;
        }
        (self.optimal_sum - self.agent_sum) / elapsed as f64
    }

    pub fn trials_since_disclosure(&self) -> u64 {
        self.trial - self.last_disclosure
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.config);
    }
}
