use crate::population::{EventContext, Operator, OperatorOutcome, Population};
use crate::size_spec::{resolved, SizeSpec};
use crate::{reshape, DemographyError};

/// How a model invocation relates to the model's own clock.
///
/// Sequential calls replay the model one generation at a time and may
/// mutate the population's structure.  A random-access query asks
/// "what size should generation `G` have" without replaying the
/// generations in between; structural mutation is forbidden for its
/// duration.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CallMode {
    /// A normal, in-order invocation.
    Sequential,
    /// An out-of-order query; the population must not be mutated.
    RandomAccessQuery,
}

/// A model's total generation budget.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum GenerationBudget {
    /// Run for exactly this many generations.
    Finite(i64),
    /// Run until a terminator ends the evolution.
    Unbounded,
}

impl GenerationBudget {
    /// The budget as a generation count, if bounded.
    pub fn finite(&self) -> Option<i64> {
        match self {
            GenerationBudget::Finite(t) => Some(*t),
            GenerationBudget::Unbounded => None,
        }
    }

    /// `true` if the model runs until terminated.
    pub fn is_unbounded(&self) -> bool {
        matches!(self, GenerationBudget::Unbounded)
    }

    pub(crate) fn exhausted_by(&self, rel_gen: i64) -> bool {
        match self {
            GenerationBudget::Finite(t) => rel_gen >= *t,
            GenerationBudget::Unbounded => false,
        }
    }
}

impl From<Option<usize>> for GenerationBudget {
    fn from(value: Option<usize>) -> Self {
        match value {
            Some(t) => GenerationBudget::Finite(t as i64),
            None => GenerationBudget::Unbounded,
        }
    }
}

impl std::fmt::Display for GenerationBudget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GenerationBudget::Finite(t) => write!(f, "{t}"),
            GenerationBudget::Unbounded => write!(f, "unbounded"),
        }
    }
}

/// Internal generation bookkeeping, absent until the first invocation.
#[derive(Clone, Copy, Debug)]
pub(crate) struct ModelClock {
    pub(crate) start_gen: i64,
    pub(crate) last_gen: i64,
}

/// State common to every demographic model: the initial size spec,
/// attached operators and the generation clock.
pub(crate) struct ModelState {
    pub(crate) raw_init_size: Vec<SizeSpec>,
    pub(crate) init_size: Vec<usize>,
    pub(crate) info_fields: Vec<String>,
    pub(crate) num_gens: GenerationBudget,
    pub(crate) ops: Vec<Box<dyn Operator>>,
    pub(crate) clock: Option<ModelClock>,
}

pub(crate) enum BaseOutcome {
    Terminated,
    Running {
        rel_gen: i64,
        expected: Option<Vec<usize>>,
    },
}

impl ModelState {
    pub(crate) fn new(
        num_gens: GenerationBudget,
        raw_init_size: Vec<SizeSpec>,
    ) -> Result<Self, DemographyError> {
        let init_size = resolved(&raw_init_size)?.unwrap_or_default();
        Ok(Self {
            raw_init_size,
            init_size,
            info_fields: vec![],
            num_gens,
            ops: vec![],
            clock: None,
        })
    }

    pub(crate) fn reset(&mut self) {
        self.clock = None;
    }

    /// First-call initialization plus access-mode detection.
    ///
    /// Returns whether this call initialized the model, and the mode
    /// the rest of the call must run under.
    pub(crate) fn begin(
        &mut self,
        pop: &mut dyn Population,
        requested: CallMode,
    ) -> Result<(bool, CallMode), DemographyError> {
        match self.clock {
            None => {
                if requested == CallMode::RandomAccessQuery {
                    // the population is assumed to already have the
                    // right size; the initial size must be recoverable
                    // from the spec alone
                    self.init_size = resolved(&self.raw_init_size)?
                        .ok_or(DemographyError::DynamicSizeRandomAccess)?;
                } else {
                    reshape::fit(pop, &self.raw_init_size, requested)?;
                    self.init_size = pop.subpop_sizes();
                }
                let gen = pop.generation() as i64;
                self.clock = Some(ModelClock {
                    start_gen: gen,
                    last_gen: gen,
                });
                Ok((true, requested))
            }
            Some(clock) => {
                let mode = if requested == CallMode::RandomAccessQuery
                    || pop.generation() as i64 != clock.last_gen + 1
                {
                    CallMode::RandomAccessQuery
                } else {
                    CallMode::Sequential
                };
                Ok((false, mode))
            }
        }
    }

    /// Clock advancement, budget check and the operator chain.
    pub(crate) fn finish(
        &mut self,
        pop: &mut dyn Population,
    ) -> Result<BaseOutcome, DemographyError> {
        let clock = self
            .clock
            .as_mut()
            .ok_or_else(|| DemographyError::InternalError("finish before begin".to_owned()))?;
        let rel_gen = pop.generation() as i64 - clock.start_gen;
        clock.last_gen = pop.generation() as i64;
        if self.num_gens.exhausted_by(rel_gen) {
            return Ok(BaseOutcome::Terminated);
        }
        let ctx = EventContext {
            rel_gen,
            num_gens: self.num_gens,
            replicate: pop.replicate(),
        };
        let mut expected = None;
        for op in self.ops.iter_mut() {
            match op.apply(pop, &ctx)? {
                OperatorOutcome::Continue => (),
                OperatorOutcome::ExpectedSize(sizes) => expected = Some(sizes),
                OperatorOutcome::Terminate => {
                    self.reset();
                    return Ok(BaseOutcome::Terminated);
                }
            }
        }
        Ok(BaseOutcome::Running { rel_gen, expected })
    }

    /// Start the clock at an arbitrary generation without touching the
    /// population.  Used when a multi-stage model jumps into a child
    /// that has never been invoked.
    pub(crate) fn force_init(&mut self, start_gen: i64) -> Result<(), DemographyError> {
        self.init_size =
            resolved(&self.raw_init_size)?.ok_or(DemographyError::DynamicSizeRandomAccess)?;
        self.clock = Some(ModelClock {
            start_gen,
            last_gen: start_gen,
        });
        Ok(())
    }
}

/// Accessors shared by every concrete model type.
macro_rules! impl_model_common {
    ($type: ty) => {
        impl $type {
            /// Apply the model for the population's current generation.
            ///
            /// Returns the per-subpopulation sizes the next generation
            /// should have, or `None` to signal that evolution should
            /// terminate.  Out-of-order generations are detected and
            /// answered as random-access queries.
            pub fn step(
                &mut self,
                pop: &mut dyn $crate::population::Population,
            ) -> Result<Option<Vec<usize>>, $crate::DemographyError> {
                self.call(pop, $crate::model::CallMode::Sequential)
            }

            /// Answer an explicit out-of-order query for the
            /// population's current generation.
            ///
            /// The population's structure is never mutated; models that
            /// cannot reconstruct their state without replaying return
            /// an error.
            pub fn query(
                &mut self,
                pop: &mut dyn $crate::population::Population,
            ) -> Result<Option<Vec<usize>>, $crate::DemographyError> {
                self.call(pop, $crate::model::CallMode::RandomAccessQuery)
            }

            /// The model's total generation budget.
            pub fn num_gens(&self) -> $crate::model::GenerationBudget {
                self.state.num_gens
            }

            /// Information fields required by attached operators.
            pub fn info_fields(&self) -> &[String] {
                &self.state.info_fields
            }

            /// The resolved initial subpopulation sizes.
            ///
            /// Empty until the first invocation for models with dynamic
            /// initial sizes.
            pub fn init_size(&self) -> &[usize] {
                &self.state.init_size
            }

            /// Attach an operator, applied at every invocation.
            pub fn with_operator(
                mut self,
                op: Box<dyn $crate::population::Operator>,
            ) -> Self {
                self.state.ops.push(op);
                self
            }

            /// Declare information fields required by attached operators.
            pub fn with_info_fields<S: Into<String>, I: IntoIterator<Item = S>>(
                mut self,
                fields: I,
            ) -> Self {
                self.state
                    .info_fields
                    .extend(fields.into_iter().map(|f| f.into()));
                self
            }
        }
    };
}

pub(crate) use impl_model_common;

/// Any demographic model.
///
/// This is the closed set of models this crate defines; a
/// [`MultiStageModel`](crate::MultiStageModel) chains values of this
/// type.
pub enum Model {
    /// Exponential or linear growth.
    Growth(crate::GrowthModel),
    /// Instant population size changes at scheduled generations.
    InstantChange(crate::InstantChangeModel),
    /// Hybrid-isolation or continuous-gene-flow admixture.
    Admixture(crate::AdmixtureModel),
    /// A model driven by demographic events.
    EventBased(crate::EventBasedModel),
    /// An ordered chain of sub-models.
    MultiStage(crate::MultiStageModel),
}

macro_rules! dispatch {
    ($value: expr, $inner: ident => $action: expr) => {
        match $value {
            Model::Growth($inner) => $action,
            Model::InstantChange($inner) => $action,
            Model::Admixture($inner) => $action,
            Model::EventBased($inner) => $action,
            Model::MultiStage($inner) => $action,
        }
    };
}

impl Model {
    /// Apply the model for the population's current generation.
    ///
    /// See [`GrowthModel::step`](crate::GrowthModel::step) for the call
    /// contract.
    pub fn step(
        &mut self,
        pop: &mut dyn Population,
    ) -> Result<Option<Vec<usize>>, DemographyError> {
        self.call(pop, CallMode::Sequential)
    }

    /// Answer an explicit out-of-order query without mutating the
    /// population's structure.
    pub fn query(
        &mut self,
        pop: &mut dyn Population,
    ) -> Result<Option<Vec<usize>>, DemographyError> {
        self.call(pop, CallMode::RandomAccessQuery)
    }

    pub(crate) fn call(
        &mut self,
        pop: &mut dyn Population,
        mode: CallMode,
    ) -> Result<Option<Vec<usize>>, DemographyError> {
        dispatch!(self, m => m.call(pop, mode))
    }

    /// Return the model to its uninitialized state.
    pub fn reset(&mut self) {
        dispatch!(self, m => m.reset())
    }

    /// The model's total generation budget.
    pub fn num_gens(&self) -> GenerationBudget {
        dispatch!(self, m => m.num_gens())
    }

    /// Information fields required by attached operators.
    pub fn info_fields(&self) -> &[String] {
        dispatch!(self, m => m.info_fields())
    }

    /// The resolved initial subpopulation sizes, empty while dynamic.
    pub fn init_size(&self) -> &[usize] {
        dispatch!(self, m => m.init_size())
    }

    pub(crate) fn raw_init_size(&self) -> &[SizeSpec] {
        dispatch!(self, m => &m.state.raw_init_size)
    }

    pub(crate) fn initialized(&self) -> bool {
        dispatch!(self, m => m.state.clock.is_some())
    }

    pub(crate) fn force_init(&mut self, start_gen: i64) -> Result<(), DemographyError> {
        match self {
            Model::Growth(m) => {
                m.state.force_init(start_gen)?;
                m.setup()
            }
            _ => dispatch!(self, m => m.state.force_init(start_gen)),
        }
    }
}

impl From<crate::GrowthModel> for Model {
    fn from(value: crate::GrowthModel) -> Self {
        Model::Growth(value)
    }
}

impl From<crate::InstantChangeModel> for Model {
    fn from(value: crate::InstantChangeModel) -> Self {
        Model::InstantChange(value)
    }
}

impl From<crate::AdmixtureModel> for Model {
    fn from(value: crate::AdmixtureModel) -> Self {
        Model::Admixture(value)
    }
}

impl From<crate::EventBasedModel> for Model {
    fn from(value: crate::EventBasedModel) -> Self {
        Model::EventBased(value)
    }
}

impl From<crate::MultiStageModel> for Model {
    fn from(value: crate::MultiStageModel) -> Self {
        Model::MultiStage(value)
    }
}
