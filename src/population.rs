use crate::model::GenerationBudget;
use crate::DemographyError;

/// The population abstraction consumed by demographic models.
///
/// The simulation engine owns the individuals and their genotypes; a
/// demographic model only needs the structural surface below.  All
/// resize-like operations propagate existing individuals (duplicating
/// or truncating as needed) and never fabricate genotypes.
pub trait Population {
    /// The population's absolute generation counter.
    fn generation(&self) -> usize;

    /// The replicate index when evolving several replicates, if any.
    fn replicate(&self) -> Option<usize> {
        None
    }

    /// Number of subpopulations.
    fn num_subpops(&self) -> usize;

    /// Size of one subpopulation.
    fn subpop_size(&self, subpop: usize) -> Result<usize, DemographyError>;

    /// Sizes of all subpopulations, in order.
    fn subpop_sizes(&self) -> Vec<usize>;

    /// Names of all subpopulations, in order; unnamed subpopulations
    /// report an empty string.
    fn subpop_names(&self) -> Vec<String>;

    /// Total number of individuals.
    fn total_size(&self) -> usize {
        self.subpop_sizes().iter().sum()
    }

    /// Resize every subpopulation, propagating existing individuals.
    ///
    /// `sizes` must have one entry per subpopulation.
    fn resize(&mut self, sizes: &[usize]) -> Result<(), DemographyError>;

    /// Merge subpopulations into one, which takes the position of the
    /// lowest merged index.  An empty `subpops` merges everything.
    fn merge_subpops(
        &mut self,
        subpops: &[usize],
        name: Option<&str>,
    ) -> Result<(), DemographyError>;

    /// Split one subpopulation, in place, into `sizes.len()` pieces.
    ///
    /// `sizes` must sum to the subpopulation's current size.  `names`
    /// must be empty or have one entry per piece; pieces without a
    /// name keep the name of the subpopulation being split.
    fn split_subpop(
        &mut self,
        subpop: usize,
        sizes: &[usize],
        names: &[String],
    ) -> Result<(), DemographyError>;

    /// Rename one subpopulation.
    fn set_subpop_name(&mut self, subpop: usize, name: &str) -> Result<(), DemographyError>;

    /// Drop all subpopulations of size zero.
    fn remove_empty_subpops(&mut self);

    /// Copy the first `counts[i]` individuals of each subpopulation
    /// into a new subpopulation appended at the end.
    ///
    /// Source subpopulations are left untouched.  `counts` must have
    /// one entry per subpopulation, none exceeding its source's size.
    fn draw_subpop(&mut self, counts: &[usize], name: Option<&str>)
        -> Result<(), DemographyError>;
}

/// Everything an operator may read about the owning model's clock.
///
/// The generation index here is relative to the model, not to the
/// population the operator is applied to.
#[derive(Clone, Copy, Debug)]
pub struct EventContext {
    /// The model's current relative generation.
    pub rel_gen: i64,
    /// The model's total generation budget.
    pub num_gens: GenerationBudget,
    /// The replicate index, if the engine runs replicates.
    pub replicate: Option<usize>,
}

/// What an operator did, returned to the owning model.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OperatorOutcome {
    /// Nothing to report; keep applying operators.
    Continue,
    /// The size vector the next generation should have.  The model
    /// returns this instead of the population's actual sizes; the
    /// actual resize is deferred to the engine for batching.
    ExpectedSize(Vec<usize>),
    /// Terminate the evolutionary run.
    Terminate,
}

/// An operation applied to the population once per model invocation.
///
/// The simulation engine supplies implementations of this trait (a
/// migrator, a terminator); [`DemographicEvent`](crate::DemographicEvent)
/// implements it as well.
pub trait Operator {
    /// Apply the operator.
    fn apply(
        &mut self,
        pop: &mut dyn Population,
        ctx: &EventContext,
    ) -> Result<OperatorOutcome, DemographyError>;
}

#[derive(Clone, Debug)]
struct SubPopulation {
    name: String,
    members: Vec<u64>,
}

/// An in-memory [`Population`] with no genotypes.
///
/// Individuals are opaque tags, which makes propagation observable:
/// growing a subpopulation recycles existing tags and never invents
/// new ones.  This is the implementation the test suites drive, and a
/// convenient way to inspect a demographic model without a simulation
/// engine.
///
/// ```
/// use demography::Population;
///
/// let mut pop = demography::BasicPopulation::new(&[100]);
/// pop.resize(&[250]).unwrap();
/// assert_eq!(pop.total_size(), 250);
/// ```
#[derive(Clone, Debug, Default)]
pub struct BasicPopulation {
    generation: usize,
    replicate: Option<usize>,
    subpops: Vec<SubPopulation>,
    next_tag: u64,
}

impl BasicPopulation {
    /// A population of unnamed subpopulations with the given sizes.
    pub fn new(sizes: &[usize]) -> Self {
        let mut rv = Self::default();
        for size in sizes {
            let members = (rv.next_tag..rv.next_tag + *size as u64).collect();
            rv.next_tag += *size as u64;
            rv.subpops.push(SubPopulation {
                name: String::default(),
                members,
            });
        }
        rv
    }

    /// Set the replicate index reported to operators.
    pub fn set_replicate(&mut self, replicate: Option<usize>) {
        self.replicate = replicate;
    }

    /// Advance the absolute generation counter by one.
    pub fn advance_generation(&mut self) {
        self.generation += 1;
    }

    /// Jump the absolute generation counter, for out-of-order queries.
    pub fn set_generation(&mut self, generation: usize) {
        self.generation = generation;
    }

    /// The identity tags of one subpopulation's individuals.
    ///
    /// # Panics
    ///
    /// If `subpop` is out of range.
    pub fn subpop_tags(&self, subpop: usize) -> &[u64] {
        &self.subpops[subpop].members
    }

    /// The identity tags of every individual, in subpopulation order.
    pub fn tags(&self) -> Vec<u64> {
        self.subpops
            .iter()
            .flat_map(|sp| sp.members.iter().copied())
            .collect()
    }

    fn check_subpop(&self, subpop: usize) -> Result<(), DemographyError> {
        if subpop >= self.subpops.len() {
            Err(DemographyError::InvalidSubpopIndex(subpop))
        } else {
            Ok(())
        }
    }
}

fn propagate(members: &[u64], size: usize, next_tag: &mut u64) -> Vec<u64> {
    if members.is_empty() {
        // nothing to propagate from
        let rv = (*next_tag..*next_tag + size as u64).collect();
        *next_tag += size as u64;
        return rv;
    }
    (0..size).map(|i| members[i % members.len()]).collect()
}

impl Population for BasicPopulation {
    fn generation(&self) -> usize {
        self.generation
    }

    fn replicate(&self) -> Option<usize> {
        self.replicate
    }

    fn num_subpops(&self) -> usize {
        self.subpops.len()
    }

    fn subpop_size(&self, subpop: usize) -> Result<usize, DemographyError> {
        self.check_subpop(subpop)?;
        Ok(self.subpops[subpop].members.len())
    }

    fn subpop_sizes(&self) -> Vec<usize> {
        self.subpops.iter().map(|sp| sp.members.len()).collect()
    }

    fn subpop_names(&self) -> Vec<String> {
        self.subpops.iter().map(|sp| sp.name.clone()).collect()
    }

    fn resize(&mut self, sizes: &[usize]) -> Result<(), DemographyError> {
        if sizes.len() != self.subpops.len() {
            return Err(DemographyError::SizeMismatch(format!(
                "resize with {} sizes applied to {} subpopulations",
                sizes.len(),
                self.subpops.len()
            )));
        }
        for (sp, size) in self.subpops.iter_mut().zip(sizes.iter()) {
            sp.members = propagate(&sp.members, *size, &mut self.next_tag);
        }
        Ok(())
    }

    fn merge_subpops(
        &mut self,
        subpops: &[usize],
        name: Option<&str>,
    ) -> Result<(), DemographyError> {
        let mut merged: Vec<usize> = if subpops.is_empty() {
            (0..self.subpops.len()).collect()
        } else {
            subpops.to_vec()
        };
        merged.sort_unstable();
        merged.dedup();
        for subpop in &merged {
            self.check_subpop(*subpop)?;
        }
        let target = merged[0];
        let mut members = vec![];
        for subpop in &merged {
            members.extend_from_slice(&self.subpops[*subpop].members);
        }
        self.subpops[target].members = members;
        if let Some(name) = name {
            self.subpops[target].name = name.to_owned();
        }
        // back to front so the earlier indexes stay valid
        for subpop in merged.iter().skip(1).rev() {
            self.subpops.remove(*subpop);
        }
        Ok(())
    }

    fn split_subpop(
        &mut self,
        subpop: usize,
        sizes: &[usize],
        names: &[String],
    ) -> Result<(), DemographyError> {
        self.check_subpop(subpop)?;
        if !names.is_empty() && names.len() != sizes.len() {
            return Err(DemographyError::SizeMismatch(format!(
                "{} names given for a split into {} subpopulations",
                names.len(),
                sizes.len()
            )));
        }
        let current = self.subpops[subpop].members.len();
        if sizes.iter().sum::<usize>() != current {
            return Err(DemographyError::SizeMismatch(format!(
                "split sizes {sizes:?} do not sum to subpopulation size {current}"
            )));
        }
        let source = self.subpops.remove(subpop);
        let mut offset = 0;
        for (i, size) in sizes.iter().enumerate() {
            let name = match names.get(i) {
                Some(name) if !name.is_empty() => name.clone(),
                _ => source.name.clone(),
            };
            self.subpops.insert(
                subpop + i,
                SubPopulation {
                    name,
                    members: source.members[offset..offset + size].to_vec(),
                },
            );
            offset += size;
        }
        Ok(())
    }

    fn set_subpop_name(&mut self, subpop: usize, name: &str) -> Result<(), DemographyError> {
        self.check_subpop(subpop)?;
        self.subpops[subpop].name = name.to_owned();
        Ok(())
    }

    fn remove_empty_subpops(&mut self) {
        self.subpops.retain(|sp| !sp.members.is_empty());
    }

    fn draw_subpop(
        &mut self,
        counts: &[usize],
        name: Option<&str>,
    ) -> Result<(), DemographyError> {
        if counts.len() != self.subpops.len() {
            return Err(DemographyError::SizeMismatch(format!(
                "draw with {} counts applied to {} subpopulations",
                counts.len(),
                self.subpops.len()
            )));
        }
        let mut members = vec![];
        for (sp, count) in self.subpops.iter().zip(counts.iter()) {
            if *count > sp.members.len() {
                return Err(DemographyError::SizeMismatch(format!(
                    "cannot draw {count} individuals from a subpopulation of {}",
                    sp.members.len()
                )));
            }
            members.extend_from_slice(&sp.members[..*count]);
        }
        self.subpops.push(SubPopulation {
            name: name.unwrap_or_default().to_owned(),
            members,
        });
        Ok(())
    }
}
