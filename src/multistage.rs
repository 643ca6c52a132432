use crate::model::{BaseOutcome, CallMode, GenerationBudget, Model, ModelState};
use crate::population::{Operator, Population};
use crate::DemographyError;

/// A chain of demographic models applied one after another.
///
/// Each child model runs until it exhausts its generation budget or
/// signals termination, at which point the next child takes over in
/// the same generation.  A child with a zero-generation budget is
/// invoked once, for its structural side effects, and skipped.
///
/// Out-of-order queries locate the child owning the requested
/// generation by accumulating budgets, so earlier children are never
/// replayed.  Jumping into a child that has never been invoked
/// requires that child's initial sizes to be fully specified.
pub struct MultiStageModel {
    pub(crate) state: ModelState,
    models: Vec<Model>,
    current: usize,
    current_start: i64,
}

impl MultiStageModel {
    /// Chain `models` in order.
    ///
    /// The total generation budget is the sum of the children's
    /// budgets, or unbounded if any child is unbounded.  The last
    /// child must last at least one generation.
    pub fn new<M: Into<Model>, I: IntoIterator<Item = M>>(
        models: I,
    ) -> Result<Self, DemographyError> {
        let models: Vec<Model> = models.into_iter().map(|m| m.into()).collect();
        match models.last() {
            None => {
                return Err(DemographyError::OutOfBounds(
                    "a multi-stage model needs at least one stage".to_owned(),
                ))
            }
            Some(last) => {
                if last.num_gens() == GenerationBudget::Finite(0) {
                    return Err(DemographyError::OutOfBounds(
                        "the last stage of a multi-stage model cannot last zero generations"
                            .to_owned(),
                    ));
                }
            }
        }
        let total = models
            .iter()
            .try_fold(0i64, |acc, m| m.num_gens().finite().map(|t| acc + t));
        let mut state = ModelState::new(
            match total {
                Some(total) => GenerationBudget::Finite(total),
                None => GenerationBudget::Unbounded,
            },
            // children reshape the population themselves
            vec![],
        )?;
        state.info_fields = models
            .iter()
            .flat_map(|m| m.info_fields().iter().cloned())
            .collect();
        Ok(Self {
            state,
            models,
            current: 0,
            current_start: 0,
        })
    }

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

    /// Answer an explicit out-of-order query for the population's
    /// current generation.
    pub fn query(
        &mut self,
        pop: &mut dyn Population,
    ) -> Result<Option<Vec<usize>>, DemographyError> {
        self.call(pop, CallMode::RandomAccessQuery)
    }

    /// The model's total generation budget.
    pub fn num_gens(&self) -> GenerationBudget {
        self.state.num_gens
    }

    /// Information fields required by the children's operators.
    pub fn info_fields(&self) -> &[String] {
        &self.state.info_fields
    }

    /// The first child's resolved initial sizes.
    pub fn init_size(&self) -> &[usize] {
        self.models[0].init_size()
    }

    /// Attach an operator, applied at every invocation before the
    /// active child runs.
    pub fn with_operator(mut self, op: Box<dyn Operator>) -> Self {
        self.state.ops.push(op);
        self
    }

    /// Return the model and all of its children to their
    /// uninitialized state.
    pub fn reset(&mut self) {
        self.state.reset();
        self.current = 0;
        self.current_start = 0;
        for model in self.models.iter_mut() {
            model.reset();
        }
    }

    /// Move past the current child until one produces a size vector.
    fn advance(
        &mut self,
        pop: &mut dyn Population,
        rel_gen: i64,
    ) -> Result<Option<Vec<usize>>, DemographyError> {
        self.current += 1;
        self.current_start = rel_gen;
        loop {
            let child = match self.models.get_mut(self.current) {
                Some(child) => child,
                None => {
                    self.reset();
                    return Ok(None);
                }
            };
            if child.num_gens() == GenerationBudget::Finite(0) {
                // applied once for its side effects, then skipped
                child.call(pop, CallMode::Sequential)?;
                self.current += 1;
                continue;
            }
            match child.call(pop, CallMode::Sequential)? {
                Some(sizes) => return Ok(Some(sizes)),
                None => {
                    self.current += 1;
                    continue;
                }
            }
        }
    }

    fn jump(
        &mut self,
        pop: &mut dyn Population,
        rel_gen: i64,
    ) -> Result<Option<Vec<usize>>, DemographyError> {
        let start_gen = self
            .state
            .clock
            .as_ref()
            .map(|clock| clock.start_gen)
            .ok_or_else(|| DemographyError::InternalError("jump before begin".to_owned()))?;
        let mut offset = 0i64;
        for model in self.models.iter_mut() {
            let budget = model.num_gens();
            if budget == GenerationBudget::Finite(0) {
                continue;
            }
            let owns = match budget.finite() {
                None => true,
                Some(t) => rel_gen - offset < t,
            };
            if owns {
                if rel_gen > offset && !model.initialized() {
                    model.force_init(start_gen + offset)?;
                }
                return model.call(pop, CallMode::RandomAccessQuery);
            }
            if let Some(t) = budget.finite() {
                offset += t;
            }
        }
        // finish() terminates before we get here for any generation at
        // or past a finite total, and an unbounded child owns every
        // generation from its offset on
        Err(DemographyError::InternalError(format!(
            "no stage owns generation {rel_gen}"
        )))
    }

    pub(crate) fn call(
        &mut self,
        pop: &mut dyn Population,
        mode: CallMode,
    ) -> Result<Option<Vec<usize>>, DemographyError> {
        let (_, mode) = self.state.begin(pop, mode)?;
        let rel_gen = match self.state.finish(pop)? {
            BaseOutcome::Terminated => {
                if mode == CallMode::Sequential {
                    // keep the children's clocks consistent with ours
                    self.reset();
                }
                return Ok(None);
            }
            BaseOutcome::Running { rel_gen, .. } => rel_gen,
        };
        if mode == CallMode::RandomAccessQuery {
            return self.jump(pop, rel_gen);
        }
        let offset = rel_gen - self.current_start;
        let child = &mut self.models[self.current];
        match child.num_gens() {
            GenerationBudget::Finite(0) => {
                child.call(pop, CallMode::Sequential)?;
                self.advance(pop, rel_gen)
            }
            GenerationBudget::Finite(t) if t <= offset => self.advance(pop, rel_gen),
            _ => match child.call(pop, CallMode::Sequential)? {
                Some(sizes) => Ok(Some(sizes)),
                None => self.advance(pop, rel_gen),
            },
        }
    }
}
