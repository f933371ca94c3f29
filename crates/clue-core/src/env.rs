//! Environments that sample states and pay out rewards.

use crate::error::CoreResult;
use crate::model::{InfluenceDiagram, Slots};
use clue_common::{merged, Assignment};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::rc::Rc;

pub trait Environment {
    /// Sample a fresh state for the next trial.
    fn reset(&mut self) -> CoreResult<Assignment>;

    /// Reward for `action` in the current state.
    fn step(&mut self, action: &Assignment) -> CoreResult<f64>;
}

/// Samples every chance variable of a diagram and pays the utility table.
#[derive(Debug)]
pub struct DiagramEnvironment {
    diagram: Rc<InfluenceDiagram>,
    seed: u64,
    rng: StdRng,
    state: Assignment,
}

impl DiagramEnvironment {
    pub fn new(diagram: Rc<InfluenceDiagram>, seed: u64) -> Self {
        Self {
            diagram,
            seed,
            rng: StdRng::seed_from_u64(seed),
            state: Assignment::new(),
        }
    }

    pub fn diagram(&self) -> &Rc<InfluenceDiagram> {
        &self.diagram
    }

    /// State sampled by the last `reset`.
    pub fn state(&self) -> &Assignment {
        &self.state
    }

    /// Restart the random stream from the construction seed.
    pub fn reseed(&mut self) {
        self.rng = StdRng::seed_from_u64(self.seed);
    }

    fn sample_row(&mut self, row: &[f64]) -> usize {
        let u = self.rng.random::<f64>();
        let mut acc = 0.0;
        for (i, p) in row.iter().enumerate() {
            acc += p;
            if u < acc {
                return i;
            }
        }
        // Rounding can leave the cumulative mass a hair under 1.
        row.iter().rposition(|p| *p > 0.0).unwrap_or(0)
    }
}

impl Environment for DiagramEnvironment {
    fn reset(&mut self) -> CoreResult<Assignment> {
        let diagram = Rc::clone(&self.diagram);
        let order = diagram.chance_order();
        let mut slots = Slots::new(diagram.num_variables());
        for &id in &order {
            let Some(cpt) = diagram.cpt(id) else {
                continue;
            };
            let row = cpt.cpt_row(&slots)?;
            let position = self.sample_row(row);
            slots.set(id, Some(position));
        }
        self.state = diagram.assignment_from(&slots, &order)?;
        Ok(self.state.clone())
    }

    fn step(&mut self, action: &Assignment) -> CoreResult<f64> {
        let outcome = merged(&self.state, action);
        Ok(self.diagram.utility().value_at(&outcome)?)
    }
}
