//! Expert panels and the advice they hand to agents.

use super::{Expert, NonuniformUnreliableExpert, PartiallyReliableExpert, UnreliableExpert};
use crate::error::CoreResult;
use crate::oracle::Oracle;
use crate::table::StateTable;
use clue_common::{Assignment, ExpertId};
use clue_config::validate::validate_panel;
use clue_config::{DisclosureConfig, PanelConfig, ValidationError};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;
use std::rc::Rc;

/// What each expert said this trial. `None` means the expert stayed silent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AdviceBundle {
    entries: BTreeMap<ExpertId, Option<Assignment>>,
}

impl AdviceBundle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, expert: ExpertId, advice: Option<Assignment>) {
        self.entries.insert(expert, advice);
    }

    /// Advice given by `expert`, if any.
    pub fn get(&self, expert: &ExpertId) -> Option<&Assignment> {
        self.entries.get(expert).and_then(|a| a.as_ref())
    }

    pub fn experts(&self) -> impl Iterator<Item = &ExpertId> + '_ {
        self.entries.keys()
    }

    /// Experts that gave advice, with their advice.
    pub fn given(&self) -> impl Iterator<Item = (&ExpertId, &Assignment)> + '_ {
        self.entries
            .iter()
            .filter_map(|(id, a)| a.as_ref().map(|a| (id, a)))
    }

    /// Whether no expert gave advice.
    pub fn is_silent(&self) -> bool {
        self.given().next().is_none()
    }
}

impl FromIterator<(ExpertId, Option<Assignment>)> for AdviceBundle {
    fn from_iter<I: IntoIterator<Item = (ExpertId, Option<Assignment>)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

pub struct Panel {
    name: String,
    experts: Vec<Box<dyn Expert>>,
}

impl std::fmt::Debug for Panel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Panel")
            .field("name", &self.name)
            .field("experts", &self.ids())
            .finish()
    }
}

impl Panel {
    pub fn new(name: impl Into<String>, experts: Vec<Box<dyn Expert>>) -> Self {
        Self {
            name: name.into(),
            experts,
        }
    }

    /// Panel of [`UnreliableExpert`]s, each seeded from a generator seeded
    /// with `seed`.
    pub fn from_config(config: &PanelConfig, oracle: &Rc<Oracle>, seed: u64) -> CoreResult<Self> {
        validate_panel(config)?;
        let mut seeds = StdRng::seed_from_u64(seed);
        let experts = config
            .experts
            .iter()
            .map(|expert| {
                UnreliableExpert::new(expert, Rc::clone(oracle), seeds.random())
                    .map(|e| Box::new(e) as Box<dyn Expert>)
            })
            .collect::<CoreResult<Vec<_>>>()?;
        Ok(Self::new(config.name.clone(), experts))
    }

    /// Panel of [`NonuniformUnreliableExpert`]s sharing one region map.
    ///
    /// `reliabilities[i]` lists expert `i`'s ρ per region; the expert is named
    /// after that list, e.g. `[0.9, 0.1]`.
    pub fn nonuniform(
        name: impl Into<String>,
        reliabilities: &[Vec<f64>],
        regions: &StateTable<usize>,
        disclosure: DisclosureConfig,
        oracle: &Rc<Oracle>,
        seed: u64,
    ) -> CoreResult<Self> {
        let mut seeds = StdRng::seed_from_u64(seed);
        let experts = reliabilities
            .iter()
            .map(|rhos| {
                NonuniformUnreliableExpert::new(
                    format!("{:?}", rhos),
                    rhos.clone(),
                    regions.clone(),
                    Rc::clone(oracle),
                    disclosure,
                    seeds.random(),
                )
                .map(|e| Box::new(e) as Box<dyn Expert>)
            })
            .collect::<CoreResult<Vec<_>>>()?;
        Self::unique(name.into(), experts)
    }

    /// Panel of [`PartiallyReliableExpert`]s; expert `i` cannot see
    /// `hidden[i]`.
    pub fn partially_reliable(
        name: impl Into<String>,
        hidden: &[Vec<String>],
        disclosure: DisclosureConfig,
        oracle: &Rc<Oracle>,
    ) -> CoreResult<Self> {
        let experts = hidden
            .iter()
            .map(|vars| {
                let label = if vars.is_empty() {
                    "sees all".to_string()
                } else {
                    format!("blind to {}", vars.join(","))
                };
                PartiallyReliableExpert::new(label, vars.as_slice(), Rc::clone(oracle), disclosure)
                    .map(|e| Box::new(e) as Box<dyn Expert>)
            })
            .collect::<CoreResult<Vec<_>>>()?;
        Self::unique(name.into(), experts)
    }

    fn unique(name: String, experts: Vec<Box<dyn Expert>>) -> CoreResult<Self> {
        let mut seen = std::collections::BTreeSet::new();
        for expert in &experts {
            if !seen.insert(expert.id().clone()) {
                return Err(ValidationError::SemanticError(format!(
                    "panel '{}' has two experts named '{}'",
                    name,
                    expert.id()
                ))
                .into());
            }
        }
        Ok(Self::new(name, experts))
    }

    /// Panel with no experts.
    pub fn empty(name: impl Into<String>) -> Self {
        Self::new(name, Vec::new())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.experts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.experts.is_empty()
    }

    pub fn ids(&self) -> Vec<ExpertId> {
        self.experts.iter().map(|e| e.id().clone()).collect()
    }

    /// Let every expert deliberate on the finished trial.
    pub fn advise(
        &mut self,
        state: &Assignment,
        action: &Assignment,
        reward: f64,
    ) -> CoreResult<AdviceBundle> {
        let mut bundle = AdviceBundle::new();
        for expert in &mut self.experts {
            let advice = expert.deliberate(state, action, reward)?;
            bundle.insert(expert.id().clone(), advice);
        }
        Ok(bundle)
    }

    pub fn reset(&mut self) {
        for expert in &mut self.experts {
            expert.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DiagramBuilder;
    use clue_common::{assignment, Value};
    use clue_config::{DisclosureConfig, ExpertConfig};

    fn oracle() -> Rc<Oracle> {
        let diagram = DiagramBuilder::new()
            .chance("C", Value::boolean_domain())
            .decision("D", Value::boolean_domain(), &["C"])
            .cpt("C", &[], vec![0.5, 0.5])
            .utility(&["C", "D"], vec![1.0, -1.0, -1.0, 1.0])
            .build()
            .unwrap();
        Rc::new(Oracle::new(Rc::new(diagram)).unwrap())
    }

    #[test]
    fn test_bundle_accessors() {
        let bundle: AdviceBundle = [
            (ExpertId::from("a"), Some(assignment([("D", true)]))),
            (ExpertId::from("b"), None),
        ]
        .into_iter()
        .collect();
        assert_eq!(bundle.experts().count(), 2);
        assert_eq!(bundle.given().count(), 1);
        assert!(bundle.get(&ExpertId::from("b")).is_none());
        assert!(!bundle.is_silent());
        assert!(AdviceBundle::new().is_silent());
    }

    #[test]
    fn test_panel_names_experts_by_reliability() {
        let config = PanelConfig::from_reliabilities("mixed", &[0.9, 0.3]);
        let panel = Panel::from_config(&config, &oracle(), 1).unwrap();
        assert_eq!(panel.ids(), vec![ExpertId::from("0.9"), ExpertId::from("0.3")]);
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let config = PanelConfig::from_reliabilities("twins", &[0.5, 0.5]);
        assert!(Panel::from_config(&config, &oracle(), 1).is_err());
    }

    #[test]
    fn test_always_disclosing_panel_advises_every_trial() {
        let mut config = PanelConfig::from_reliabilities("one", &[1.0]);
        config.experts[0].disclosure = DisclosureConfig::always();
        let mut panel = Panel::from_config(&config, &oracle(), 1).unwrap();
        let state = assignment([("C", false)]);
        for _ in 0..5 {
            let bundle = panel
                .advise(&state, &assignment([("D", true)]), -1.0)
                .unwrap();
            assert_eq!(
                bundle.get(&ExpertId::from("1")),
                Some(&assignment([("D", false)]))
            );
        }
    }

    fn regions() -> StateTable<usize> {
        let mut regions = StateTable::new(
            crate::table::TableLayout::new([("C", Value::boolean_domain())]).unwrap(),
            0,
        );
        regions.set(&assignment([("C", true)]), 1).unwrap();
        regions
    }

    #[test]
    fn test_nonuniform_panel_shares_regions() {
        let mut panel = Panel::nonuniform(
            "split",
            &[vec![1.0, 0.0], vec![0.0, 1.0]],
            &regions(),
            DisclosureConfig::always(),
            &oracle(),
            4,
        )
        .unwrap();
        assert_eq!(
            panel.ids(),
            vec![ExpertId::from("[1.0, 0.0]"), ExpertId::from("[0.0, 1.0]")]
        );
        let state = assignment([("C", false)]);
        let bundle = panel.advise(&state, &assignment([("D", true)]), -1.0).unwrap();
        assert_eq!(
            bundle.get(&ExpertId::from("[1.0, 0.0]")),
            Some(&assignment([("D", false)]))
        );
        assert_eq!(
            bundle.get(&ExpertId::from("[0.0, 1.0]")),
            Some(&assignment([("D", true)]))
        );
    }

    #[test]
    fn test_nonuniform_panel_rejects_duplicates() {
        let result = Panel::nonuniform(
            "twins",
            &[vec![0.5, 0.5], vec![0.5, 0.5]],
            &regions(),
            DisclosureConfig::default(),
            &oracle(),
            4,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_partially_reliable_panel() {
        let panel = Panel::partially_reliable(
            "sight",
            &[Vec::new(), vec!["C".to_string()]],
            DisclosureConfig::always(),
            &oracle(),
        )
        .unwrap();
        assert_eq!(
            panel.ids(),
            vec![ExpertId::from("sees all"), ExpertId::from("blind to C")]
        );
    }

    #[test]
    fn test_expert_seeds_differ_from_panel_seed() {
        let mut config = PanelConfig::from_reliabilities("coin", &[0.5]);
        config.experts[0].disclosure = DisclosureConfig::always();
        let state = assignment([("C", true)]);
        let mut panel = Panel::from_config(&config, &oracle(), 9).unwrap();
        let mut direct = UnreliableExpert::new(&config.experts[0], oracle(), 9).unwrap();
        let from_panel: Vec<_> = (0..64)
            .map(|_| {
                panel
                    .advise(&state, &assignment([("D", false)]), -1.0)
                    .unwrap()
                    .get(&ExpertId::from("0.5"))
                    .cloned()
            })
            .collect();
        let from_seed: Vec<_> = (0..64)
            .map(|_| Some(direct.advise(&state).unwrap()))
            .collect();
        assert_ne!(from_panel, from_seed);
    }
}
