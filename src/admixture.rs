use crate::model::{impl_model_common, BaseOutcome, CallMode, ModelState};
use crate::population::Population;
use crate::size_spec::SizeSpecList;
use crate::DemographyError;

/// How two subpopulations admix.
#[derive(Clone, Debug, PartialEq, serde::Deserialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub enum AdmixtureKind {
    /// A new admixed subpopulation is created once, at the start of
    /// the model, from `proportion` individuals of `parent1` and
    /// `1 - proportion` of `parent2`.
    ///
    /// The admixed subpopulation is made as large as the parents
    /// allow: `N = min(N1/mu, N2/(1-mu))`, so that neither parent has
    /// to contribute more individuals than it has.
    HybridIsolation {
        /// First parental subpopulation.
        parent1: usize,
        /// Second parental subpopulation.
        parent2: usize,
        /// Proportion of the admixed subpopulation drawn from `parent1`.
        proportion: f64,
        /// Name for the admixed subpopulation.
        name: Option<String>,
    },
    /// At every generation the recipient keeps `proportion` of its
    /// individuals and replaces the rest with copies from the donor.
    ContinuousGeneFlow {
        /// Subpopulation receiving migrants.
        recipient: usize,
        /// Subpopulation contributing migrants; its own size never
        /// changes.
        donor: usize,
        /// Proportion of the recipient retained each generation.
        proportion: f64,
    },
}

impl AdmixtureKind {
    fn validate(&self) -> Result<(), DemographyError> {
        let (a, b, proportion) = match self {
            AdmixtureKind::HybridIsolation {
                parent1,
                parent2,
                proportion,
                ..
            } => (*parent1, *parent2, *proportion),
            AdmixtureKind::ContinuousGeneFlow {
                recipient,
                donor,
                proportion,
            } => (*recipient, *donor, *proportion),
        };
        if a == b {
            return Err(DemographyError::InvalidSizeSpec(
                "admixture requires two distinct subpopulations".to_owned(),
            ));
        }
        if !(0.0..=1.0).contains(&proportion) {
            return Err(DemographyError::InvalidSizeSpec(format!(
                "admixture proportion {proportion} outside [0, 1]"
            )));
        }
        Ok(())
    }
}

/// An admixture model mixing two subpopulations, either once (hybrid
/// isolation) or continuously (continuous gene flow).  See Long (1991),
/// "The genetic structure of admixed populations", Genetics.
pub struct AdmixtureModel {
    pub(crate) state: ModelState,
    kind: AdmixtureKind,
}

impl_model_common!(AdmixtureModel);

fn hi_size(n1: usize, n2: usize, mu: f64) -> (usize, usize) {
    // the largest admixed population neither parent is too small for:
    // N*mu <= N1 and N*(1-mu) <= N2
    if mu == 0.0 {
        (0, n2)
    } else if mu == 1.0 {
        (n1, 0)
    } else {
        let n = (n1 as f64 / mu).min(n2 as f64 / (1.0 - mu));
        ((n * mu + 0.5) as usize, (n * (1.0 - mu) + 0.5) as usize)
    }
}

impl AdmixtureModel {
    /// An admixture model over a population that starts at `init_size`
    /// and runs for `num_gens` generations.
    pub fn new<N: Into<SizeSpecList>>(
        num_gens: Option<usize>,
        init_size: N,
        kind: AdmixtureKind,
    ) -> Result<Self, DemographyError> {
        kind.validate()?;
        let state = ModelState::new(num_gens.into(), init_size.into().into())?;
        Ok(Self { state, kind })
    }

    fn check_subpop(pop: &dyn Population, subpop: usize) -> Result<(), DemographyError> {
        if subpop >= pop.num_subpops() {
            Err(DemographyError::InvalidSubpopIndex(subpop))
        } else {
            Ok(())
        }
    }

    fn admix(
        &self,
        pop: &mut dyn Population,
        rel_gen: i64,
    ) -> Result<(), DemographyError> {
        match &self.kind {
            AdmixtureKind::HybridIsolation {
                parent1,
                parent2,
                proportion,
                name,
            } => {
                // the admixed subpopulation is created exactly once
                if rel_gen != 0 {
                    return Ok(());
                }
                Self::check_subpop(pop, *parent1)?;
                Self::check_subpop(pop, *parent2)?;
                let n1 = pop.subpop_size(*parent1)?;
                let n2 = pop.subpop_size(*parent2)?;
                let (from1, from2) = hi_size(n1, n2, *proportion);
                let mut counts = vec![0; pop.num_subpops()];
                counts[*parent1] = from1;
                counts[*parent2] = from2;
                pop.draw_subpop(&counts, name.as_deref())?;
                Ok(())
            }
            AdmixtureKind::ContinuousGeneFlow {
                recipient,
                donor,
                proportion,
            } => {
                Self::check_subpop(pop, *recipient)?;
                Self::check_subpop(pop, *donor)?;
                let n1 = pop.subpop_size(*recipient)?;
                let n2 = pop.subpop_size(*donor)?;
                let request = ((n1 as f64 * (1.0 - proportion) + 0.5) as usize).min(n2);
                if request == 0 {
                    return Ok(());
                }
                // shrink the recipient, then top it back up with
                // copies drawn from the donor
                let mut sizes = pop.subpop_sizes();
                sizes[*recipient] = n1 - request;
                pop.resize(&sizes)?;
                let mut counts = vec![0; pop.num_subpops()];
                counts[*donor] = request;
                pop.draw_subpop(&counts, None)?;
                let pool = pop.num_subpops() - 1;
                pop.merge_subpops(&[*recipient, pool], None)?;
                Ok(())
            }
        }
    }

    pub(crate) fn call(
        &mut self,
        pop: &mut dyn Population,
        mode: CallMode,
    ) -> Result<Option<Vec<usize>>, DemographyError> {
        let (_, mode) = self.state.begin(pop, mode)?;
        if mode == CallMode::RandomAccessQuery {
            return Err(DemographyError::UnsupportedRandomAccess(
                "admixture models cannot answer out-of-order size queries".to_owned(),
            ));
        }
        let (rel_gen, expected) = match self.state.finish(pop)? {
            BaseOutcome::Terminated => return Ok(None),
            BaseOutcome::Running { rel_gen, expected } => (rel_gen, expected),
        };
        self.admix(pop, rel_gen)?;
        Ok(Some(expected.unwrap_or_else(|| pop.subpop_sizes())))
    }

    /// Return the model to its uninitialized state.
    pub fn reset(&mut self) {
        self.state.reset();
    }
}
