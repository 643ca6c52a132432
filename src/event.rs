use crate::model::{impl_model_common, BaseOutcome, CallMode, ModelState};
use crate::population::{EventContext, Operator, OperatorOutcome, Population};
use crate::size_spec::{RawSize, SizeSpecList};
use crate::{DemographyError, GrowthRates};

/// When an event fires, in generations relative to the owning model.
///
/// An explicit `at` list overrides the `begin`/`end`/`step` schedule.
/// Negative values count from the end of a bounded model: an `at`
/// entry of `-1` means the model's last generation, and a negative
/// `begin` or `end` of `-k` resolves to `num_gens - k + 1`.  Models
/// without a fixed generation count ignore `end` and skip negative
/// `at` entries.
#[derive(Clone, Debug, PartialEq)]
pub struct EventWindow {
    /// First applicable generation.
    pub begin: i64,
    /// Last applicable generation, `-1` for the model's end.
    pub end: i64,
    /// Fire every `step` generations starting from `begin`.
    pub step: i64,
    /// Fire exactly at these generations, overriding the schedule.
    pub at: Vec<i64>,
    /// Fire only for these replicates; `None` means all.
    pub replicates: Option<Vec<usize>>,
}

impl Default for EventWindow {
    fn default() -> Self {
        Self {
            begin: 0,
            end: -1,
            step: 1,
            at: vec![],
            replicates: None,
        }
    }
}

impl EventWindow {
    /// A window that fires exactly at the given generations.
    pub fn at<I: IntoIterator<Item = i64>>(gens: I) -> Self {
        Self {
            at: gens.into_iter().collect(),
            ..Self::default()
        }
    }

    /// A window that fires every generation from `begin` to `end`.
    pub fn between(begin: i64, end: i64) -> Self {
        Self {
            begin,
            end,
            ..Self::default()
        }
    }

    pub(crate) fn applicable(&self, ctx: &EventContext) -> bool {
        if let Some(replicates) = &self.replicates {
            match ctx.replicate {
                Some(rep) if replicates.contains(&rep) => (),
                _ => return false,
            }
        }
        let gen = ctx.rel_gen;
        let num_gens = ctx.num_gens.finite();
        if !self.at.is_empty() {
            return self.at.iter().any(|a| {
                if *a >= 0 {
                    *a == gen
                } else {
                    // relative to the end; meaningless without one
                    match num_gens {
                        Some(total) => total + *a == gen,
                        None => false,
                    }
                }
            });
        }
        match num_gens {
            None => self.begin >= 0 && gen >= self.begin && (gen - self.begin) % self.step == 0,
            Some(total) => {
                let start = if self.begin >= 0 {
                    self.begin
                } else {
                    self.begin + total + 1
                };
                let end = if self.end >= 0 {
                    self.end
                } else {
                    self.end + total + 1
                };
                start <= end && gen >= start && gen <= end && (gen - start) % self.step == 0
            }
        }
    }
}

/// A subpopulation referenced by index or by name.
#[derive(Clone, Debug, PartialEq)]
pub enum SubpopRef {
    /// By position.
    Index(usize),
    /// By name, resolved against the population when the event fires.
    Name(String),
}

impl SubpopRef {
    fn resolve(&self, pop: &dyn Population) -> Result<usize, DemographyError> {
        match self {
            SubpopRef::Index(idx) => {
                if *idx >= pop.num_subpops() {
                    Err(DemographyError::InvalidSubpopIndex(*idx))
                } else {
                    Ok(*idx)
                }
            }
            SubpopRef::Name(name) => pop
                .subpop_names()
                .iter()
                .position(|n| n == name)
                .ok_or_else(|| {
                    DemographyError::InvalidSizeSpec(format!(
                        "no subpopulation with name {name}"
                    ))
                }),
        }
    }
}

impl From<usize> for SubpopRef {
    fn from(value: usize) -> Self {
        SubpopRef::Index(value)
    }
}

impl From<&str> for SubpopRef {
    fn from(value: &str) -> Self {
        SubpopRef::Name(value.to_owned())
    }
}

impl From<String> for SubpopRef {
    fn from(value: String) -> Self {
        SubpopRef::Name(value)
    }
}

fn resolve_selection(
    pop: &dyn Population,
    subpops: &[SubpopRef],
) -> Result<Vec<usize>, DemographyError> {
    if subpops.is_empty() {
        Ok((0..pop.num_subpops()).collect())
    } else {
        subpops.iter().map(|sp| sp.resolve(pop)).collect()
    }
}

fn one_subpop(selected: &[usize], what: &str) -> Result<usize, DemographyError> {
    if selected.len() != 1 {
        return Err(DemographyError::InvalidSizeSpec(format!(
            "a {what} event applies to exactly one subpopulation, {} selected",
            selected.len()
        )));
    }
    Ok(selected[0])
}

/// Carrying capacity for growth events.
#[derive(Clone, Debug, PartialEq)]
pub enum Capacity {
    /// No upper bound.
    Unlimited,
    /// One bound for all selected subpopulations.
    Uniform(usize),
    /// One bound per selected subpopulation.
    PerSubpop(Vec<usize>),
}

impl Capacity {
    fn clamp(
        &self,
        sizes: &mut [usize],
        selected: &[usize],
    ) -> Result<(), DemographyError> {
        match self {
            Capacity::Unlimited => Ok(()),
            Capacity::Uniform(cap) => {
                for sp in selected {
                    sizes[*sp] = sizes[*sp].min(*cap);
                }
                Ok(())
            }
            Capacity::PerSubpop(caps) => {
                if caps.len() != selected.len() {
                    return Err(DemographyError::SizeMismatch(format!(
                        "{} carrying capacities for {} subpopulations",
                        caps.len(),
                        selected.len()
                    )));
                }
                for (sp, cap) in selected.iter().zip(caps.iter()) {
                    sizes[*sp] = sizes[*sp].min(*cap);
                }
                Ok(())
            }
        }
    }
}

/// Source amounts for an [`EventKind::Admixture`] event.
#[derive(Clone, Debug, PartialEq)]
pub enum AdmixtureSizes {
    /// Explicit individual counts per selected subpopulation, clamped
    /// to what each source holds.
    Counts(Vec<usize>),
    /// Proportions per selected subpopulation; the last entry is
    /// adjusted so they sum to one.
    Proportions(Vec<f64>),
}

/// The closed set of demographic events.
#[derive(Clone, Debug, PartialEq)]
pub enum EventKind {
    /// Resize the selected subpopulations, propagating individuals.
    Resize {
        /// One entry per selected subpopulation, or a single entry
        /// applied to each.  `Dynamic` keeps the current size.
        sizes: Vec<RawSize>,
    },
    /// Split one subpopulation into several.
    Split {
        /// Sizes of the resulting subpopulations; proportions resolve
        /// against the source size and must sum to it.
        sizes: Vec<RawSize>,
        /// Optional names for the resulting subpopulations.
        names: Vec<String>,
    },
    /// Merge the selected subpopulations into one.
    Merge {
        /// Name for the merged subpopulation.
        name: Option<String>,
    },
    /// Copy one subpopulation into several, enlarging it first so
    /// that, unlike a split, the results may exceed the source.
    Copy {
        /// Final sizes including the source as the first entry; empty
        /// means one source-sized copy per name.
        sizes: Vec<usize>,
        /// Names for the resulting subpopulations.
        names: Vec<String>,
    },
    /// Expand the selected subpopulations to `N * (1 + r)` each
    /// applicable generation, up to a carrying capacity.
    ExponentialGrowth {
        /// Per-generation growth rate(s).
        rates: GrowthRates,
        /// Upper bound the expansion never exceeds.
        capacity: Capacity,
    },
    /// Add `N0 * r` individuals each applicable generation, where
    /// `N0` is the size observed the first time the event fires.
    LinearGrowth {
        /// Per-generation growth rate(s).
        rates: GrowthRates,
        /// Upper bound the expansion never exceeds.
        capacity: Capacity,
        /// Cached absolute increment, set on first application.
        inc_by: Option<Vec<usize>>,
    },
    /// Mix individuals drawn from the selected subpopulations into a
    /// new subpopulation, or replace an existing one.  Source sizes
    /// are kept constant.
    Admixture {
        /// How many individuals each source contributes.
        sizes: AdmixtureSizes,
        /// Existing subpopulation to replace; `None` appends a new one.
        target: Option<SubpopRef>,
        /// Name for a newly created subpopulation.
        name: Option<String>,
    },
}

impl EventKind {
    /// Growth events only report an expected size vector; everything
    /// else mutates the population's structure.
    fn is_structural(&self) -> bool {
        !matches!(
            self,
            EventKind::ExponentialGrowth { .. } | EventKind::LinearGrowth { .. }
        )
    }
}

fn admixture_counts(
    pop: &dyn Population,
    selected: &[usize],
    sizes: &AdmixtureSizes,
    target: Option<usize>,
) -> Result<Vec<usize>, DemographyError> {
    let mut counts = vec![0; pop.num_subpops()];
    match sizes {
        AdmixtureSizes::Counts(numbers) => {
            if numbers.len() != selected.len() {
                return Err(DemographyError::SizeMismatch(format!(
                    "{} admixture counts for {} subpopulations",
                    numbers.len(),
                    selected.len()
                )));
            }
            for (sp, number) in selected.iter().zip(numbers.iter()) {
                counts[*sp] = (*number).min(pop.subpop_size(*sp)?);
            }
        }
        AdmixtureSizes::Proportions(proportions) => {
            if proportions.len() != selected.len() {
                return Err(DemographyError::SizeMismatch(format!(
                    "{} admixture proportions for {} subpopulations",
                    proportions.len(),
                    selected.len()
                )));
            }
            if proportions.iter().any(|p| *p < 0.0 || *p > 1.0) {
                return Err(DemographyError::InvalidSizeSpec(
                    "admixture proportions must lie in [0, 1]".to_owned(),
                ));
            }
            let head: f64 = proportions[..proportions.len() - 1].iter().sum();
            if head > 1.0 {
                return Err(DemographyError::InvalidSizeSpec(
                    "admixture proportions add up to more than 1".to_owned(),
                ));
            }
            let mut proportions = proportions.clone();
            if let Some(last) = proportions.last_mut() {
                *last = 1.0 - head;
            }
            match target {
                Some(target) => {
                    // the replacement is as large as the subpopulation
                    // it replaces
                    let total = pop.subpop_size(target)? as f64;
                    for (sp, proportion) in selected.iter().zip(proportions.iter()) {
                        counts[*sp] = (total * proportion) as usize;
                    }
                }
                None => {
                    // make the admixed subpopulation as large as the
                    // sources allow
                    let mut found = false;
                    for (idx, sp) in selected.iter().enumerate() {
                        if proportions[idx] == 0.0 {
                            continue;
                        }
                        let total = pop.subpop_size(*sp)? as f64 / proportions[idx];
                        for (sp, proportion) in selected.iter().zip(proportions.iter()) {
                            counts[*sp] = (total * proportion) as usize;
                        }
                        if selected
                            .iter()
                            .map(|sp| Ok(counts[*sp] <= pop.subpop_size(*sp)?))
                            .collect::<Result<Vec<bool>, DemographyError>>()?
                            .iter()
                            .all(|fits| *fits)
                        {
                            found = true;
                            break;
                        }
                    }
                    if !found {
                        return Err(DemographyError::SizeMismatch(
                            "failed to determine the size of the admixed subpopulation"
                                .to_owned(),
                        ));
                    }
                }
            }
        }
    }
    Ok(counts)
}

/// A scheduled, composable demographic change.
///
/// Events behave like operators whose applicability window is
/// expressed in generations relative to the owning model, not to the
/// population.  They are usually attached to an
/// [`EventBasedModel`] but implement [`Operator`] and can be attached
/// to any model.
#[derive(Clone, Debug)]
pub struct DemographicEvent {
    window: EventWindow,
    subpops: Vec<SubpopRef>,
    kind: EventKind,
}

impl DemographicEvent {
    /// An event applicable at every generation, to all subpopulations.
    pub fn new(kind: EventKind) -> Self {
        Self {
            window: EventWindow::default(),
            subpops: vec![],
            kind,
        }
    }

    /// Restrict when the event fires.
    pub fn with_window(mut self, window: EventWindow) -> Self {
        self.window = window;
        self
    }

    /// Restrict which subpopulations the event applies to.
    pub fn with_subpops<S: Into<SubpopRef>, I: IntoIterator<Item = S>>(
        mut self,
        subpops: I,
    ) -> Self {
        self.subpops = subpops.into_iter().map(|sp| sp.into()).collect();
        self
    }

    pub(crate) fn apply_in_mode(
        &mut self,
        pop: &mut dyn Population,
        ctx: &EventContext,
        mode: CallMode,
    ) -> Result<OperatorOutcome, DemographyError> {
        if !self.window.applicable(ctx) {
            return Ok(OperatorOutcome::Continue);
        }
        if mode == CallMode::RandomAccessQuery && self.kind.is_structural() {
            return Err(DemographyError::LockedPopulation);
        }
        let selected = resolve_selection(pop, &self.subpops)?;
        match &mut self.kind {
            EventKind::Resize { sizes } => {
                if sizes.len() != selected.len() && sizes.len() != 1 {
                    return Err(DemographyError::SizeMismatch(format!(
                        "{} sizes for {} subpopulations",
                        sizes.len(),
                        selected.len()
                    )));
                }
                let mut new_sizes = pop.subpop_sizes();
                for (idx, sp) in selected.iter().enumerate() {
                    let size = if sizes.len() == 1 { &sizes[0] } else { &sizes[idx] };
                    new_sizes[*sp] = size.resolve(new_sizes[*sp]);
                }
                pop.resize(&new_sizes)?;
                Ok(OperatorOutcome::Continue)
            }
            EventKind::Split { sizes, names } => {
                let sp = one_subpop(&selected, "split")?;
                let source = pop.subpop_size(sp)?;
                let sizes: Vec<usize> = sizes
                    .iter()
                    .map(|size| match size {
                        RawSize::Dynamic => Err(DemographyError::InvalidSizeSpec(
                            "a split size cannot be dynamic".to_owned(),
                        )),
                        other => Ok(other.resolve(source)),
                    })
                    .collect::<Result<_, _>>()?;
                pop.split_subpop(sp, &sizes, names)?;
                Ok(OperatorOutcome::Continue)
            }
            EventKind::Merge { name } => {
                pop.merge_subpops(&selected, name.as_deref())?;
                Ok(OperatorOutcome::Continue)
            }
            EventKind::Copy { sizes, names } => {
                let sp = one_subpop(&selected, "copy")?;
                let source = pop.subpop_size(sp)?;
                let sizes = if sizes.is_empty() {
                    if names.is_empty() {
                        return Err(DemographyError::InvalidSizeSpec(
                            "a copy event needs sizes or names".to_owned(),
                        ));
                    }
                    vec![source; names.len()]
                } else {
                    sizes.clone()
                };
                let mut new_sizes = pop.subpop_sizes();
                new_sizes[sp] = sizes.iter().sum();
                pop.resize(&new_sizes)?;
                pop.split_subpop(sp, &sizes, names)?;
                Ok(OperatorOutcome::Continue)
            }
            EventKind::ExponentialGrowth { rates, capacity } => {
                let rates = rates.per_subpop(selected.len())?;
                let mut sizes = pop.subpop_sizes();
                for (sp, rate) in selected.iter().zip(rates.iter()) {
                    sizes[*sp] = (sizes[*sp] as f64 * (1.0 + rate)) as usize;
                }
                capacity.clamp(&mut sizes, &selected)?;
                Ok(OperatorOutcome::ExpectedSize(sizes))
            }
            EventKind::LinearGrowth {
                rates,
                capacity,
                inc_by,
            } => {
                let mut sizes = pop.subpop_sizes();
                match inc_by {
                    Some(cached) => {
                        if cached.len() != pop.num_subpops() {
                            return Err(DemographyError::SubpopulationCountChanged(format!(
                                "linear growth event initialized with {} subpopulations, \
                                 population now has {}",
                                cached.len(),
                                pop.num_subpops()
                            )));
                        }
                    }
                    None => {
                        let rates = rates.per_subpop(selected.len())?;
                        let mut increments = vec![0; pop.num_subpops()];
                        for (sp, rate) in selected.iter().zip(rates.iter()) {
                            increments[*sp] = (sizes[*sp] as f64 * rate) as usize;
                        }
                        *inc_by = Some(increments);
                    }
                }
                for (size, inc) in sizes
                    .iter_mut()
                    .zip(inc_by.iter().flatten())
                {
                    *size += *inc;
                }
                capacity.clamp(&mut sizes, &selected)?;
                Ok(OperatorOutcome::ExpectedSize(sizes))
            }
            EventKind::Admixture {
                sizes,
                target,
                name,
            } => {
                let target = match target {
                    Some(target) => Some(target.resolve(pop)?),
                    None => None,
                };
                let counts = admixture_counts(pop, &selected, sizes, target)?;
                match target {
                    None => pop.draw_subpop(&counts, name.as_deref())?,
                    Some(target) => {
                        // draw the pool first, then swap it in for the
                        // replaced subpopulation
                        pop.draw_subpop(&counts, None)?;
                        let pool = pop.num_subpops() - 1;
                        let mut new_sizes = pop.subpop_sizes();
                        new_sizes[target] = 0;
                        pop.resize(&new_sizes)?;
                        pop.merge_subpops(&[target, pool], None)?;
                    }
                }
                Ok(OperatorOutcome::Continue)
            }
        }
    }
}

impl Operator for DemographicEvent {
    fn apply(
        &mut self,
        pop: &mut dyn Population,
        ctx: &EventContext,
    ) -> Result<OperatorOutcome, DemographyError> {
        self.apply_in_mode(pop, ctx, CallMode::Sequential)
    }
}

/// A demographic model driven entirely by events.
///
/// The population size is kept constant at any generation no event
/// applies to.  Growth-style events only report the sizes the next
/// generation should have; structural events mutate the population
/// when they fire.
pub struct EventBasedModel {
    pub(crate) state: ModelState,
    events: Vec<DemographicEvent>,
}

impl_model_common!(EventBasedModel);

impl EventBasedModel {
    /// A model running `events` for `num_gens` generations over a
    /// population starting at `init_size`.
    pub fn new<N: Into<SizeSpecList>>(
        num_gens: Option<usize>,
        init_size: N,
        events: Vec<DemographicEvent>,
    ) -> Result<Self, DemographyError> {
        let state = ModelState::new(num_gens.into(), init_size.into().into())?;
        Ok(Self { state, events })
    }

    pub(crate) fn call(
        &mut self,
        pop: &mut dyn Population,
        mode: CallMode,
    ) -> Result<Option<Vec<usize>>, DemographyError> {
        let (_, mode) = self.state.begin(pop, mode)?;
        let (rel_gen, mut expected) = match self.state.finish(pop)? {
            BaseOutcome::Terminated => return Ok(None),
            BaseOutcome::Running { rel_gen, expected } => (rel_gen, expected),
        };
        let ctx = EventContext {
            rel_gen,
            num_gens: self.state.num_gens,
            replicate: pop.replicate(),
        };
        for event in self.events.iter_mut() {
            match event.apply_in_mode(pop, &ctx, mode)? {
                OperatorOutcome::Continue => (),
                OperatorOutcome::ExpectedSize(sizes) => expected = Some(sizes),
                OperatorOutcome::Terminate => {
                    self.state.reset();
                    return Ok(None);
                }
            }
        }
        Ok(Some(expected.unwrap_or_else(|| pop.subpop_sizes())))
    }

    /// Return the model to its uninitialized state.
    pub fn reset(&mut self) {
        self.state.reset();
    }
}
