use crate::model::{impl_model_common, BaseOutcome, CallMode, GenerationBudget, ModelState};
use crate::population::Population;
use crate::size_spec::{resolved, SizeSpec, SizeSpecList};
use crate::DemographyError;

/// Growth rate(s) for a growth model or a growth event.
#[derive(Clone, Debug, PartialEq, serde::Deserialize)]
#[serde(untagged)]
pub enum GrowthRates {
    /// One rate shared by all subpopulations.
    Uniform(f64),
    /// One rate per subpopulation.
    PerSubpop(Vec<f64>),
}

impl From<f64> for GrowthRates {
    fn from(value: f64) -> Self {
        Self::Uniform(value)
    }
}

impl From<Vec<f64>> for GrowthRates {
    fn from(value: Vec<f64>) -> Self {
        Self::PerSubpop(value)
    }
}

impl GrowthRates {
    pub(crate) fn per_subpop(&self, n: usize) -> Result<Vec<f64>, DemographyError> {
        let rates = match self {
            GrowthRates::Uniform(r) => vec![*r; n],
            GrowthRates::PerSubpop(rates) => {
                if rates.len() != n {
                    return Err(DemographyError::SizeMismatch(format!(
                        "{} growth rates given for {n} subpopulations",
                        rates.len()
                    )));
                }
                rates.clone()
            }
        };
        for rate in &rates {
            if !rate.is_finite() || *rate <= -1.0 {
                return Err(DemographyError::InvalidSizeSpec(format!(
                    "unacceptable growth rate: {rate}"
                )));
            }
        }
        Ok(rates)
    }
}

/// The growth law of a [`GrowthModel`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum GrowthForm {
    /// `N(t) = N0 * (1+r)^t`
    Exponential,
    /// `N(t) = N0 * (1 + r*t)`
    Linear,
}

impl GrowthForm {
    fn grow(&self, n0: usize, rate: f64, t: i64) -> usize {
        let n0 = n0 as f64;
        let grown = match self {
            GrowthForm::Exponential => n0 * (1.0 + rate).powi(t as i32),
            GrowthForm::Linear => n0 * (1.0 + rate * t as f64),
        };
        if grown < 0.0 {
            0
        } else {
            grown.round() as usize
        }
    }

    fn derive_final_size(&self, n0: usize, rate: f64, num_gens: i64) -> usize {
        self.grow(n0, rate, num_gens)
    }

    /// The smallest generation count at which `n0` reaches `nt` under
    /// `rate`; negative when the rate points away from the target.
    fn derive_num_gens(&self, n0: usize, nt: usize, rate: f64) -> Result<i64, DemographyError> {
        if rate == 0.0 {
            return Err(DemographyError::ZeroRate(
                "cannot reach destination size with r=0".to_owned(),
            ));
        }
        let n0 = n0 as f64;
        let nt = nt as f64;
        let t = match self {
            GrowthForm::Exponential => (nt.ln() - n0.ln()) / (1.0 + rate).ln(),
            GrowthForm::Linear => (nt - n0) / (n0 * rate),
        };
        if !t.is_finite() {
            return Err(DemographyError::GenerationOutOfRange(format!(
                "cannot derive a generation count from N0={n0}, NT={nt}, r={rate}"
            )));
        }
        Ok(t.ceil() as i64)
    }

    fn interpolate(
        &self,
        n0: usize,
        nt: usize,
        num_gens: i64,
        t: i64,
    ) -> Result<usize, DemographyError> {
        if t == num_gens - 1 {
            return Ok(nt);
        }
        if t >= num_gens {
            return Err(DemographyError::GenerationOutOfRange(format!(
                "generation {t} out of bound (0 <= t < {num_gens} is expected)"
            )));
        }
        let n0 = n0 as f64;
        let nt = nt as f64;
        let x = t as f64;
        let total = num_gens as f64;
        let interpolated = match self {
            GrowthForm::Exponential => {
                (((x + 1.0) * nt.ln() + (total - x - 1.0) * n0.ln()) / total).exp()
            }
            GrowthForm::Linear => ((x + 1.0) * nt + (total - x - 1.0) * n0) / total,
        };
        Ok(interpolated as usize)
    }
}

#[derive(Clone, Debug)]
struct ResolvedGrowth {
    nt: Vec<usize>,
    rates: Option<Vec<f64>>,
}

/// A population growth model with carrying capacity.
///
/// Evolves a population from size `N0` to `NT` over `T` generations,
/// either exponentially (`r*N(t)` individuals added per generation) or
/// linearly (`r*N0` individuals added per generation).  At least two
/// of `T`, `NT` and `r` must be given; the third is derived on first
/// application.  When all three are given, `NT` acts as a carrying
/// capacity: the population stays constant once it reaches `NT`.
/// Without `r` the sizes are interpolated so that generation `T-1`
/// reports exactly `NT`.
///
/// The initial population is resized (split if necessary) to `N0`.
///
/// ```
/// use demography::GrowthModel;
///
/// let mut model =
///     GrowthModel::exponential(Some(10), 100_usize, Some(1000_usize.into()), None).unwrap();
/// let mut pop = demography::BasicPopulation::new(&[100]);
/// let sizes = model.step(&mut pop).unwrap().unwrap();
/// assert!(sizes[0] > 100 && sizes[0] < 1000);
/// ```
pub struct GrowthModel {
    pub(crate) state: ModelState,
    form: GrowthForm,
    nt_spec: Option<Vec<SizeSpec>>,
    rates: Option<GrowthRates>,
    params: Option<ResolvedGrowth>,
}

impl_model_common!(GrowthModel);

impl GrowthModel {
    /// An exponential growth model.
    pub fn exponential<N: Into<SizeSpecList>>(
        num_gens: Option<usize>,
        init_size: N,
        final_size: Option<SizeSpecList>,
        rates: Option<GrowthRates>,
    ) -> Result<Self, DemographyError> {
        Self::new(GrowthForm::Exponential, num_gens, init_size, final_size, rates)
    }

    /// A linear growth model.
    pub fn linear<N: Into<SizeSpecList>>(
        num_gens: Option<usize>,
        init_size: N,
        final_size: Option<SizeSpecList>,
        rates: Option<GrowthRates>,
    ) -> Result<Self, DemographyError> {
        Self::new(GrowthForm::Linear, num_gens, init_size, final_size, rates)
    }

    fn new<N: Into<SizeSpecList>>(
        form: GrowthForm,
        num_gens: Option<usize>,
        init_size: N,
        final_size: Option<SizeSpecList>,
        rates: Option<GrowthRates>,
    ) -> Result<Self, DemographyError> {
        let missing = [
            num_gens.is_none(),
            final_size.is_none(),
            rates.is_none(),
        ]
        .iter()
        .filter(|missing| **missing)
        .count();
        if missing > 1 {
            return Err(DemographyError::UnderspecifiedGrowth(
                "please specify at least two parameters of T, NT and r".to_owned(),
            ));
        }
        let state = ModelState::new(num_gens.into(), init_size.into().into())?;
        Ok(Self {
            state,
            form,
            nt_spec: final_size.map(|spec| spec.into()),
            rates,
            params: None,
        })
    }

    fn fixed_final_sizes(&self) -> Result<Vec<usize>, DemographyError> {
        let spec = self.nt_spec.as_ref().ok_or_else(|| {
            DemographyError::InternalError("growth setup without NT or r".to_owned())
        })?;
        let nt = resolved(spec)?.ok_or_else(|| {
            DemographyError::InvalidSizeSpec(
                "relative ending population size is not allowed for a growth model".to_owned(),
            )
        })?;
        if nt.len() != self.state.init_size.len() {
            return Err(DemographyError::SizeMismatch(format!(
                "starting and ending populations should have the same number of \
                 subpopulations ({} vs {})",
                self.state.init_size.len(),
                nt.len()
            )));
        }
        Ok(nt)
    }

    /// Resolve `NT`, `T` and per-subpopulation rates once `N0` is
    /// known from the population.
    pub(crate) fn setup(&mut self) -> Result<(), DemographyError> {
        let params = match &self.rates {
            None => ResolvedGrowth {
                nt: self.fixed_final_sizes()?,
                rates: None,
            },
            Some(rates) => {
                let rates = rates.per_subpop(self.state.init_size.len())?;
                match self.state.num_gens {
                    GenerationBudget::Unbounded => {
                        let nt = self.fixed_final_sizes()?;
                        let mut num_gens = i64::MIN;
                        for ((n0, target), rate) in
                            self.state.init_size.iter().zip(nt.iter()).zip(rates.iter())
                        {
                            num_gens =
                                num_gens.max(self.form.derive_num_gens(*n0, *target, *rate)?);
                        }
                        if num_gens < 0 {
                            return Err(DemographyError::GenerationOutOfRange(
                                "cannot reach destination size in this configuration".to_owned(),
                            ));
                        }
                        self.state.num_gens = GenerationBudget::Finite(num_gens.max(1));
                        ResolvedGrowth {
                            nt,
                            rates: Some(rates),
                        }
                    }
                    GenerationBudget::Finite(num_gens) => {
                        let nt = match &self.nt_spec {
                            Some(_) => self.fixed_final_sizes()?,
                            None => self
                                .state
                                .init_size
                                .iter()
                                .zip(rates.iter())
                                .map(|(n0, rate)| {
                                    self.form.derive_final_size(*n0, *rate, num_gens)
                                })
                                .collect(),
                        };
                        ResolvedGrowth {
                            nt,
                            rates: Some(rates),
                        }
                    }
                }
            }
        };
        self.params = Some(params);
        Ok(())
    }

    /// The final subpopulation sizes, available after first invocation.
    pub fn final_size(&self) -> Option<&[usize]> {
        self.params.as_ref().map(|params| params.nt.as_slice())
    }

    pub(crate) fn call(
        &mut self,
        pop: &mut dyn Population,
        mode: CallMode,
    ) -> Result<Option<Vec<usize>>, DemographyError> {
        let (first, _) = self.state.begin(pop, mode)?;
        if first {
            self.setup()?;
        }
        // no random-access special case: growth models never mutate
        // population structure, they only report a size vector
        let rel_gen = match self.state.finish(pop)? {
            BaseOutcome::Terminated => return Ok(None),
            BaseOutcome::Running { rel_gen, .. } => rel_gen,
        };
        let params = self
            .params
            .as_ref()
            .ok_or_else(|| DemographyError::InternalError("growth model not set up".to_owned()))?;
        let sizes = match &params.rates {
            None => {
                let num_gens = self.state.num_gens.finite().ok_or_else(|| {
                    DemographyError::InternalError("interpolating growth without T".to_owned())
                })?;
                let mut sizes = Vec::with_capacity(params.nt.len());
                for (n0, nt) in self.state.init_size.iter().zip(params.nt.iter()) {
                    sizes.push(self.form.interpolate(*n0, *nt, num_gens, rel_gen)?);
                }
                sizes
            }
            Some(rates) => self
                .state
                .init_size
                .iter()
                .zip(params.nt.iter())
                .zip(rates.iter())
                .map(|((n0, nt), rate)| (*nt).min(self.form.grow(*n0, *rate, rel_gen + 1)))
                .collect(),
        };
        Ok(Some(sizes))
    }

    /// Return the model to its uninitialized state.
    pub fn reset(&mut self) {
        self.state.reset();
    }
}

#[cfg(test)]
mod growth_tests {
    use super::*;
    use crate::population::BasicPopulation;

    fn run_to_end(model: &mut GrowthModel, pop: &mut BasicPopulation) -> Vec<Vec<usize>> {
        let mut trace = vec![];
        loop {
            match model.step(pop).unwrap() {
                Some(sizes) => {
                    pop.resize(&sizes).unwrap();
                    pop.advance_generation();
                    trace.push(sizes);
                }
                None => return trace,
            }
        }
    }

    #[test]
    fn interpolation_hits_final_size_exactly() {
        for form in [GrowthForm::Exponential, GrowthForm::Linear] {
            for num_gens in [2, 3, 10, 57] {
                let size = form.interpolate(100, 1000, num_gens, num_gens - 1).unwrap();
                assert_eq!(size, 1000);
                assert!(matches!(
                    form.interpolate(100, 1000, num_gens, num_gens),
                    Err(DemographyError::GenerationOutOfRange(_))
                ));
            }
        }
    }

    #[test]
    fn underspecified_model_rejected() {
        assert!(matches!(
            GrowthModel::exponential(Some(10), 100_usize, None, None),
            Err(DemographyError::UnderspecifiedGrowth(_))
        ));
    }

    #[test]
    fn exponential_interpolated_trace() {
        let mut model =
            GrowthModel::exponential(Some(10), 100_usize, Some(1000_usize.into()), None).unwrap();
        let mut pop = BasicPopulation::new(&[100]);
        let trace = run_to_end(&mut model, &mut pop);
        assert_eq!(trace.len(), 10);
        assert_eq!(trace[9], vec![1000]);
        // monotone growth
        for pair in trace.windows(2) {
            assert!(pair[0][0] <= pair[1][0]);
        }
    }

    #[test]
    fn derived_num_gens_round_trips() {
        // NT derived from T and r must lead back to T
        let form = GrowthForm::Exponential;
        let num_gens = 20;
        let rate = 0.05;
        let nt = form.derive_final_size(100, rate, num_gens);
        let derived = form.derive_num_gens(100, nt, rate).unwrap();
        assert!((derived - num_gens).abs() <= 1, "{derived} vs {num_gens}");

        let form = GrowthForm::Linear;
        let nt = form.derive_final_size(100, rate, num_gens);
        let derived = form.derive_num_gens(100, nt, rate).unwrap();
        assert!((derived - num_gens).abs() <= 1, "{derived} vs {num_gens}");
    }

    #[test]
    fn num_gens_derived_from_rate() {
        let mut model = GrowthModel::exponential(
            None,
            100_usize,
            Some(1000_usize.into()),
            Some(0.1.into()),
        )
        .unwrap();
        assert!(model.num_gens().is_unbounded());
        let mut pop = BasicPopulation::new(&[100]);
        model.step(&mut pop).unwrap().unwrap();
        let derived = model.num_gens().finite().unwrap();
        // ceil(ln(10)/ln(1.1)) = 25
        assert_eq!(derived, 25);
    }

    #[test]
    fn zero_rate_cannot_reach_target() {
        let mut model = GrowthModel::linear(
            None,
            100_usize,
            Some(1000_usize.into()),
            Some(0.0.into()),
        )
        .unwrap();
        let mut pop = BasicPopulation::new(&[100]);
        assert!(matches!(
            model.step(&mut pop),
            Err(DemographyError::ZeroRate(_))
        ));
    }

    #[test]
    fn carrying_capacity_clamps_growth() {
        let mut model = GrowthModel::exponential(
            Some(50),
            100_usize,
            Some(200_usize.into()),
            Some(0.1.into()),
        )
        .unwrap();
        let mut pop = BasicPopulation::new(&[100]);
        let trace = run_to_end(&mut model, &mut pop);
        assert_eq!(trace.len(), 50);
        assert!(trace.iter().all(|sizes| sizes[0] <= 200));
        assert_eq!(trace.last().unwrap(), &vec![200]);
    }

    #[test]
    fn per_subpop_rates_with_split() {
        // subpopulation 1 splits into EU and AS at the start of the
        // growth stage
        let mut model = GrowthModel::exponential(
            Some(10),
            vec![
                SizeSpec::Dynamic,
                SizeSpec::Split(vec![SizeSpec::from((100, "EU")), SizeSpec::from((50, "AS"))]),
            ],
            None,
            Some(vec![0.0, 0.01, 0.02].into()),
        )
        .unwrap();
        let mut pop = BasicPopulation::new(&[500, 200]);
        let sizes = model.step(&mut pop).unwrap().unwrap();
        assert_eq!(pop.subpop_sizes(), vec![500, 100, 50]);
        assert_eq!(pop.subpop_names(), vec!["", "EU", "AS"]);
        assert_eq!(sizes.len(), 3);
        assert_eq!(sizes[0], 500);
    }

    #[test]
    fn linear_growth_with_rate() {
        let mut model = GrowthModel::linear(
            Some(10),
            100_usize,
            None,
            Some(0.1.into()),
        )
        .unwrap();
        let mut pop = BasicPopulation::new(&[100]);
        let sizes = model.step(&mut pop).unwrap().unwrap();
        // N0 * (1 + r) at relative generation 0
        assert_eq!(sizes, vec![110]);
        assert_eq!(model.final_size().unwrap(), &[200]);
    }
}
