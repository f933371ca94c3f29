//! Trial loops and batch experiments.
//!
//! A trial is: sample a state, let the agent act, collect the reward, let
//! the panel deliberate, and let the agent learn from the outcome and any
//! advice. Every run gets fresh agents, experts, and environments seeded from
//! the experiment seed, so a batch is reproducible end to end.

use crate::agent::{Agent, ReliabilityHistory, ReliabilityReport, Trial};
use crate::env::{DiagramEnvironment, Environment};
use crate::error::CoreResult;
use crate::expert::{AdviceBundle, Panel};
use crate::learner::GreedyLearner;
use crate::logging::{event_names, generate_run_id, Stage};
use crate::model::InfluenceDiagram;
use crate::oracle::Oracle;
use crate::trust::ClueAgent;
use chrono::{DateTime, Utc};
use clue_common::Assignment;
use clue_config::validate::validate_experiment;
use clue_config::ExperimentConfig;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::rc::Rc;
use tracing::info;

/// Outcome of one run of one agent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunRecord {
    pub agent: String,
    pub panel: Option<String>,
    pub rewards: Vec<f64>,
    /// Per-trial regret against the best expected utility of the sampled
    /// state, present when an oracle was supplied.
    pub regret: Option<Vec<f64>>,
    pub reliability: Option<ReliabilityHistory>,
    /// Belief about each expert after the last trial.
    pub final_reliability: Option<ReliabilityReport>,
}

impl RunRecord {
    pub fn total_reward(&self) -> f64 {
        self.rewards.iter().sum()
    }

    pub fn mean_reward(&self) -> f64 {
        if self.rewards.is_empty() {
            return 0.0;
        }
        self.total_reward() / self.rewards.len() as f64
    }

    pub fn cumulative_regret(&self) -> Option<f64> {
        self.regret.as_ref().map(|r| r.iter().sum())
    }
}

/// Every run of a batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExperimentReport {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub max_expected_utility: f64,
    pub records: Vec<RunRecord>,
}

impl ExperimentReport {
    /// Records for the panel called `name`.
    pub fn for_panel<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a RunRecord> + 'a {
        self.records
            .iter()
            .filter(move |r| r.panel.as_deref() == Some(name))
    }

    /// Records of runs without experts.
    pub fn baseline(&self) -> impl Iterator<Item = &RunRecord> + '_ {
        self.records.iter().filter(|r| r.panel.is_none())
    }
}

/// Seeds for the independent random streams of one run.
///
/// Drawn from a generator seeded with the run seed, so no two streams of a
/// run start from the same generator state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSeeds {
    pub environment: u64,
    pub learner: u64,
    pub trust: u64,
    pub panel: u64,
}

impl RunSeeds {
    pub fn derive(run_seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(run_seed);
        Self {
            environment: rng.random(),
            learner: rng.random(),
            trust: rng.random(),
            panel: rng.random(),
        }
    }
}

fn regret_of(oracle: &Oracle, state: &Assignment, reward: f64) -> CoreResult<f64> {
    Ok(oracle.best_expected_utility(state)? - reward)
}

/// Run `agent` against `panel` for `trials` trials.
pub fn run_panel(
    env: &mut dyn Environment,
    agent: &mut dyn Agent,
    panel: &mut Panel,
    trials: usize,
    oracle: Option<&Oracle>,
) -> CoreResult<RunRecord> {
    agent.reset(&panel.ids());
    panel.reset();
    let mut rewards = Vec::with_capacity(trials);
    let mut regret = oracle.map(|_| Vec::with_capacity(trials));
    for _ in 0..trials {
        let state = env.reset()?;
        let action = agent.act(&state, true)?;
        let reward = env.step(&action)?;
        if let (Some(oracle), Some(regret)) = (oracle, regret.as_mut()) {
            regret.push(regret_of(oracle, &state, reward)?);
        }
        let advice = panel.advise(&state, &action, reward)?;
        agent.learn(
            &Trial {
                state,
                action,
                reward,
            },
            &advice,
        )?;
        rewards.push(reward);
    }
    Ok(RunRecord {
        agent: agent.name().to_string(),
        panel: Some(panel.name().to_string()),
        rewards,
        regret,
        reliability: agent.reliability_history().cloned(),
        final_reliability: agent.reliability_report(),
    })
}

/// Run `agent` alone for `trials` trials.
pub fn run_standard(
    env: &mut dyn Environment,
    agent: &mut dyn Agent,
    trials: usize,
    oracle: Option<&Oracle>,
) -> CoreResult<RunRecord> {
    agent.reset(&[]);
    let silence = AdviceBundle::new();
    let mut rewards = Vec::with_capacity(trials);
    let mut regret = oracle.map(|_| Vec::with_capacity(trials));
    for _ in 0..trials {
        let state = env.reset()?;
        let action = agent.act(&state, true)?;
        let reward = env.step(&action)?;
        if let (Some(oracle), Some(regret)) = (oracle, regret.as_mut()) {
            regret.push(regret_of(oracle, &state, reward)?);
        }
        agent.learn(
            &Trial {
                state,
                action,
                reward,
            },
            &silence,
        )?;
        rewards.push(reward);
    }
    Ok(RunRecord {
        agent: agent.name().to_string(),
        panel: None,
        rewards,
        regret,
        reliability: None,
        final_reliability: None,
    })
}

/// Run every configured panel `config.runs` times on `diagram`.
///
/// The baseline, when enabled, uses the panel index one past the last panel
/// for seed derivation.
pub fn run_experiment(
    config: &ExperimentConfig,
    diagram: Rc<InfluenceDiagram>,
) -> CoreResult<ExperimentReport> {
    validate_experiment(config)?;
    let run_id = generate_run_id();
    let started_at = Utc::now();
    let oracle = Rc::new(Oracle::new(Rc::clone(&diagram))?);
    info!(
        event = event_names::RUN_STARTED,
        stage = %Stage::Run,
        run_id = %run_id,
        panels = config.panels.len(),
        runs = config.runs,
        trials = config.trials,
        "experiment started"
    );

    let mut records = Vec::new();
    for (p, panel_config) in config.panels.iter().enumerate() {
        for r in 0..config.runs {
            let seeds = RunSeeds::derive(config.run_seed(p, r));
            let mut env = DiagramEnvironment::new(Rc::clone(&diagram), seeds.environment);
            let learner = GreedyLearner::for_diagram(
                &diagram,
                &config.learner,
                config.trials,
                seeds.learner,
            )?;
            let mut trust = config.trust.clone();
            trust.seed = seeds.trust;
            let mut agent = ClueAgent::new(learner, trust, config.trials)?;
            let mut panel = Panel::from_config(panel_config, &oracle, seeds.panel)?;
            let record =
                run_panel(&mut env, &mut agent, &mut panel, config.trials, Some(&oracle))?;
            info!(
                event = event_names::RUN_FINISHED,
                stage = %Stage::Run,
                run_id = %run_id,
                panel = %panel_config.name,
                run = r,
                mean_reward = record.mean_reward(),
                regret = record.cumulative_regret().unwrap_or(0.0),
                "panel run finished"
            );
            records.push(record);
        }
    }

    if config.include_baseline {
        let p = config.panels.len();
        for r in 0..config.runs {
            let seeds = RunSeeds::derive(config.run_seed(p, r));
            let mut env = DiagramEnvironment::new(Rc::clone(&diagram), seeds.environment);
            let mut learner = GreedyLearner::for_diagram(
                &diagram,
                &config.learner,
                config.trials,
                seeds.learner,
            )?;
            let record = run_standard(&mut env, &mut learner, config.trials, Some(&oracle))?;
            info!(
                event = event_names::RUN_FINISHED,
                stage = %Stage::Run,
                run_id = %run_id,
                run = r,
                mean_reward = record.mean_reward(),
                regret = record.cumulative_regret().unwrap_or(0.0),
                "baseline run finished"
            );
            records.push(record);
        }
    }

    Ok(ExperimentReport {
        run_id,
        started_at,
        max_expected_utility: oracle.max_expected_utility(),
        records,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DiagramBuilder;
    use crate::oracle::OracleAgent;
    use clue_common::Value;
    use clue_config::{DisclosureConfig, PanelConfig};

    fn matching_game() -> Rc<InfluenceDiagram> {
        let diagram = DiagramBuilder::new()
            .chance("C", Value::boolean_domain())
            .decision("D", Value::boolean_domain(), &["C"])
            .cpt("C", &[], vec![0.5, 0.5])
            .utility(&["C", "D"], vec![1.0, -1.0, -1.0, 1.0])
            .build()
            .unwrap();
        Rc::new(diagram)
    }

    #[test]
    fn test_true_policy_has_no_regret() {
        let diagram = matching_game();
        let oracle = Rc::new(Oracle::new(Rc::clone(&diagram)).unwrap());
        let mut env = DiagramEnvironment::new(diagram, 1);
        let mut agent = OracleAgent::new(Rc::clone(&oracle));
        let record = run_standard(&mut env, &mut agent, 50, Some(&oracle)).unwrap();
        assert_eq!(record.agent, "True Policy");
        assert_eq!(record.total_reward(), 50.0);
        assert_eq!(record.cumulative_regret(), Some(0.0));
    }

    #[test]
    fn test_panel_run_tracks_reliability_each_trial() {
        let diagram = matching_game();
        let oracle = Rc::new(Oracle::new(Rc::clone(&diagram)).unwrap());
        let mut env = DiagramEnvironment::new(Rc::clone(&diagram), 2);
        let learner = GreedyLearner::for_diagram(&diagram, &Default::default(), 40, 2).unwrap();
        let mut agent = ClueAgent::new(learner, Default::default(), 40).unwrap();
        let mut config = PanelConfig::from_reliabilities("good", &[1.0]);
        config.experts[0].disclosure = DisclosureConfig::always();
        let mut panel = Panel::from_config(&config, &oracle, 2).unwrap();
        let record = run_panel(&mut env, &mut agent, &mut panel, 40, None).unwrap();
        assert_eq!(record.rewards.len(), 40);
        assert!(record.regret.is_none());
        let history = record.reliability.unwrap();
        let trace = &history[&clue_common::ExpertId::from("1")];
        assert_eq!(trace.len(), 40);

        let report = record.final_reliability.unwrap();
        let belief = &report[&clue_common::ExpertId::from("1")];
        let (lo, hi) = belief.interval.unwrap();
        assert!(lo <= belief.rho && belief.rho <= hi);
        assert!(belief.evaluations > 0);
    }

    #[test]
    fn test_experiment_covers_panels_runs_and_baseline() {
        let config = ExperimentConfig {
            trials: 20,
            runs: 2,
            panels: vec![
                PanelConfig::from_reliabilities("good", &[0.9]),
                PanelConfig::from_reliabilities("bad", &[0.1]),
            ],
            include_baseline: true,
            ..ExperimentConfig::default()
        };
        let report = run_experiment(&config, matching_game()).unwrap();
        assert_eq!(report.records.len(), 6);
        assert_eq!(report.for_panel("good").count(), 2);
        assert_eq!(report.baseline().count(), 2);
        assert!((report.max_expected_utility - 1.0).abs() < 1e-9);
        assert!(report.run_id.starts_with("run-"));

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["records"].as_array().map(|r| r.len()), Some(6));
        assert!(json["records"][0]["reliability"]["0.9"].is_array());
        assert!(json["records"][0]["final_reliability"]["0.9"]["interval"].is_array());
        assert!(json["records"][4]["final_reliability"].is_null());
    }

    #[test]
    fn test_experiment_is_reproducible() {
        let config = ExperimentConfig {
            trials: 30,
            panels: vec![PanelConfig::from_reliabilities("mixed", &[0.8, 0.4])],
            ..ExperimentConfig::default()
        };
        let first = run_experiment(&config, matching_game()).unwrap();
        let second = run_experiment(&config, matching_game()).unwrap();
        assert_eq!(first.records, second.records);
    }

    struct Stubborn;

    impl Agent for Stubborn {
        fn name(&self) -> &str {
            "Stubborn"
        }

        fn act(&mut self, _state: &Assignment, _explore: bool) -> CoreResult<Assignment> {
            Ok(clue_common::assignment([("D", false)]))
        }

        fn learn(&mut self, _trial: &Trial, _advice: &AdviceBundle) -> CoreResult<()> {
            Ok(())
        }

        fn reset(&mut self, _experts: &[clue_common::ExpertId]) {}
    }

    #[test]
    fn test_regret_charges_reward_against_best_utility() {
        let diagram = matching_game();
        let oracle = Rc::new(Oracle::new(Rc::clone(&diagram)).unwrap());
        let mut env = DiagramEnvironment::new(diagram, 3);
        let record = run_standard(&mut env, &mut Stubborn, 100, Some(&oracle)).unwrap();
        let regret = record.regret.as_ref().unwrap();
        for (r, reward) in regret.iter().zip(&record.rewards) {
            assert!((r - (1.0 - reward)).abs() < 1e-9);
        }
        let total = record.cumulative_regret().unwrap();
        assert!((total - (100.0 - record.total_reward())).abs() < 1e-9);
        assert!(total > 0.0);
    }

    #[test]
    fn test_run_seeds_are_distinct_and_stable() {
        let seeds = RunSeeds::derive(7);
        assert_eq!(seeds, RunSeeds::derive(7));
        assert_ne!(seeds, RunSeeds::derive(8));
        let all = [seeds.environment, seeds.learner, seeds.trust, seeds.panel];
        let unique: std::collections::BTreeSet<_> = all.iter().collect();
        assert_eq!(unique.len(), 4);
        assert!(!all.contains(&7));
    }

    #[test]
    fn test_expert_noise_independent_of_sampled_state() {
        let diagram = matching_game();
        let oracle = Rc::new(Oracle::new(Rc::clone(&diagram)).unwrap());
        let mut config = PanelConfig::from_reliabilities("coin", &[0.5]);
        config.experts[0].disclosure = DisclosureConfig::always();
        let runs = 200;
        let mut aligned = 0;
        for r in 0..runs {
            let seeds = RunSeeds::derive(r);
            let mut env = DiagramEnvironment::new(Rc::clone(&diagram), seeds.environment);
            let mut panel = Panel::from_config(&config, &oracle, seeds.panel).unwrap();
            let state = env.reset().unwrap();
            let action = clue_common::assignment([("D", true)]);
            let bundle = panel.advise(&state, &action, 0.0).unwrap();
            let (_, advice) = bundle.given().next().unwrap();
            let correct = *advice == oracle.act(&state).unwrap();
            if correct == (state["C"] == Value::Bool(false)) {
                aligned += 1;
            }
        }
        assert!((60..=140).contains(&aligned), "aligned = {}", aligned);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = ExperimentConfig {
            trials: 0,
            ..ExperimentConfig::default()
        };
        assert!(run_experiment(&config, matching_game()).is_err());
    }
}
