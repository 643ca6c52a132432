use crate::model::{impl_model_common, BaseOutcome, CallMode, ModelState};
use crate::population::{BasicPopulation, Population};
use crate::size_spec::{SizeSpec, SizeSpecList};
use crate::{reshape, DemographyError};

/// A model of instant population size changes.
///
/// The population keeps its size between trigger generations; at each
/// trigger (relative to the model's start) the population is reshaped
/// to the associated size spec, which may resize, merge or split
/// subpopulations.
///
/// Out-of-order queries are answered by replaying the triggers up to
/// the requested generation against the recorded initial sizes, so
/// they never mutate the population being queried.
pub struct InstantChangeModel {
    pub(crate) state: ModelState,
    triggers: Vec<i64>,
    sizes_at: Vec<Vec<SizeSpec>>,
    remove_empty: bool,
}

impl_model_common!(InstantChangeModel);

impl InstantChangeModel {
    /// A model that changes sizes at generations `triggers`, each to
    /// the matching entry of `sizes_at`.
    ///
    /// Triggers are relative to the model's starting generation, must
    /// be strictly increasing and, for a bounded model, fall within
    /// `0..num_gens`.
    pub fn new<N: Into<SizeSpecList>>(
        num_gens: Option<usize>,
        init_size: N,
        triggers: Vec<usize>,
        sizes_at: Vec<SizeSpecList>,
    ) -> Result<Self, DemographyError> {
        if triggers.len() != sizes_at.len() {
            return Err(DemographyError::SizeMismatch(format!(
                "{} trigger generations but {} size specs",
                triggers.len(),
                sizes_at.len()
            )));
        }
        let state = ModelState::new(num_gens.into(), init_size.into().into())?;
        let triggers: Vec<i64> = triggers.into_iter().map(|g| g as i64).collect();
        for pair in triggers.windows(2) {
            if pair[0] >= pair[1] {
                return Err(DemographyError::OutOfBounds(format!(
                    "trigger generations must be strictly increasing, got {} then {}",
                    pair[0], pair[1]
                )));
            }
        }
        if let Some(num_gens) = state.num_gens.finite() {
            if let Some(last) = triggers.last() {
                if *last >= num_gens {
                    return Err(DemographyError::OutOfBounds(format!(
                        "trigger generation {last} beyond the model horizon {num_gens}"
                    )));
                }
            }
        }
        Ok(Self {
            state,
            triggers,
            sizes_at: sizes_at.into_iter().map(|spec| spec.into()).collect(),
            remove_empty: false,
        })
    }

    /// Remove subpopulations that become empty after a trigger.
    pub fn removing_empty_subpops(mut self) -> Self {
        self.remove_empty = true;
        self
    }

    pub(crate) fn call(
        &mut self,
        pop: &mut dyn Population,
        mode: CallMode,
    ) -> Result<Option<Vec<usize>>, DemographyError> {
        let (_, mode) = self.state.begin(pop, mode)?;
        let (rel_gen, expected) = match self.state.finish(pop)? {
            BaseOutcome::Terminated => return Ok(None),
            BaseOutcome::Running { rel_gen, expected } => (rel_gen, expected),
        };
        if let Some(expected) = expected {
            return Ok(Some(expected));
        }
        match mode {
            CallMode::Sequential => {
                if let Ok(idx) = self.triggers.binary_search(&rel_gen) {
                    reshape::fit(pop, &self.sizes_at[idx], CallMode::Sequential)?;
                    if self.remove_empty {
                        pop.remove_empty_subpops();
                    }
                }
                Ok(Some(pop.subpop_sizes()))
            }
            CallMode::RandomAccessQuery => {
                // replay past triggers on a scratch population
                let mut scratch = BasicPopulation::new(&self.state.init_size);
                for (trigger, spec) in self.triggers.iter().zip(self.sizes_at.iter()) {
                    if *trigger > rel_gen {
                        break;
                    }
                    reshape::fit(&mut scratch, spec, CallMode::Sequential)?;
                    if self.remove_empty {
                        scratch.remove_empty_subpops();
                    }
                }
                Ok(Some(scratch.subpop_sizes()))
            }
        }
    }

    /// Return the model to its uninitialized state.
    pub fn reset(&mut self) {
        self.state.reset();
    }
}

#[cfg(test)]
mod instant_tests {
    use super::*;

    #[test]
    fn sizes_hold_between_triggers() {
        let mut model = InstantChangeModel::new(
            Some(10),
            100_usize,
            vec![5],
            vec![200_usize.into()],
        )
        .unwrap();
        let mut pop = BasicPopulation::new(&[1]);
        let mut trace = vec![];
        loop {
            match model.step(&mut pop).unwrap() {
                Some(sizes) => {
                    pop.resize(&sizes).unwrap();
                    pop.advance_generation();
                    trace.push(sizes[0]);
                }
                None => break,
            }
        }
        assert_eq!(trace, vec![100, 100, 100, 100, 100, 200, 200, 200, 200, 200]);
    }

    #[test]
    fn random_access_replays_triggers() {
        let mut model = InstantChangeModel::new(
            Some(10),
            100_usize,
            vec![3, 6],
            vec![vec![SizeSpec::Fixed(50), SizeSpec::Fixed(50)].into(), 400_usize.into()],
        )
        .unwrap();
        let mut pop = BasicPopulation::new(&[100]);
        // start the model's clock at generation 0
        assert_eq!(model.step(&mut pop).unwrap(), Some(vec![100]));
        pop.set_generation(7);
        assert_eq!(model.step(&mut pop).unwrap(), Some(vec![400]));
        // queried population is untouched
        assert_eq!(pop.subpop_sizes(), vec![100]);
        pop.set_generation(4);
        assert_eq!(model.step(&mut pop).unwrap(), Some(vec![50, 50]));
        pop.set_generation(1);
        assert_eq!(model.step(&mut pop).unwrap(), Some(vec![100]));
        pop.set_generation(10);
        assert_eq!(model.step(&mut pop).unwrap(), None);
    }

    #[test]
    fn trigger_beyond_horizon_rejected() {
        assert!(matches!(
            InstantChangeModel::new(Some(10), 100_usize, vec![10], vec![200_usize.into()]),
            Err(DemographyError::OutOfBounds(_))
        ));
        assert!(matches!(
            InstantChangeModel::new(None, 100_usize, vec![5, 5], vec![1_usize.into(), 2_usize.into()]),
            Err(DemographyError::OutOfBounds(_))
        ));
    }

    #[test]
    fn empty_subpops_can_be_dropped() {
        let mut model = InstantChangeModel::new(
            Some(5),
            vec![SizeSpec::Fixed(100), SizeSpec::Fixed(200)],
            vec![2],
            vec![vec![SizeSpec::Fixed(0), SizeSpec::Dynamic].into()],
        )
        .unwrap()
        .removing_empty_subpops();
        let mut pop = BasicPopulation::new(&[1]);
        for gen in 0..3 {
            pop.set_generation(gen);
            let sizes = model.step(&mut pop).unwrap().unwrap();
            pop.resize(&sizes).unwrap();
        }
        assert_eq!(pop.subpop_sizes(), vec![200]);
    }
}
