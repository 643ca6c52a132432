//! Published demographic models, ready to be stepped.

use crate::multistage::MultiStageModel;
use crate::size_spec::{SizeSpec, SizeSpecList};
use crate::{
    AdmixtureKind, AdmixtureModel, DemographyError, GrowthModel, InstantChangeModel, Model,
};

// a final one-generation stage dropping every subpopulation whose
// name is not in `outcome`, or no stage at all when all survive
fn outcome_filter(
    names: &[&str],
    outcome: &[String],
) -> Result<Option<Model>, DemographyError> {
    let survivors: Vec<SizeSpec> = names
        .iter()
        .map(|name| {
            if outcome.iter().any(|kept| kept == name) {
                SizeSpec::Dynamic
            } else {
                SizeSpec::Fixed(0)
            }
        })
        .collect();
    if survivors.iter().all(|spec| *spec == SizeSpec::Dynamic) {
        return Ok(None);
    }
    Ok(Some(Model::from(
        InstantChangeModel::new(
            Some(1),
            vec![SizeSpec::Dynamic; names.len()],
            vec![0],
            vec![survivors.into()],
        )?
        .removing_empty_subpops(),
    )))
}

/// Parameters of the out-of-Africa model of Gutenkunst et al. (2009),
/// PLoS Genetics, Figure 2 and Table 1.
///
/// All times count **backward** from the end of the evolution, in
/// generations.  The defaults assume 25 years per generation.
#[derive(Clone, Debug, PartialEq)]
pub struct OutOfAfricaParams {
    /// Total length of the evolution, at least [`t_af`](Self::t_af).
    pub total_gens: usize,
    /// Size of the ancestral population.
    pub n_ancestral: usize,
    /// Size of the African population after the ancestral expansion.
    pub n_af: usize,
    /// Size of the out-of-Africa population B at its split from AF.
    pub n_b: usize,
    /// Initial size of the European population.
    pub n_eu0: usize,
    /// Exponential growth rate of the European population.
    pub r_eu: f64,
    /// Initial size of the East Asian population.
    pub n_as0: usize,
    /// Exponential growth rate of the East Asian population.
    pub r_as: f64,
    /// Generations ago the ancestral population expanded into AF.
    pub t_af: usize,
    /// Generations ago population B split from AF.
    pub t_b: usize,
    /// Generations ago EU and AS split from B.
    pub t_eu_as: usize,
    /// Which of `AF`, `EU`, `AS` survive to the end; the others are
    /// dropped in a final one-generation stage.
    pub outcome: Vec<String>,
    /// Divide all sizes and durations by this factor to speed up
    /// scaled-down simulations.
    pub scale: f64,
}

impl OutOfAfricaParams {
    /// The published parameters, evolving for `total_gens` generations.
    pub fn new(total_gens: usize) -> Self {
        Self {
            total_gens,
            n_ancestral: 7300,
            n_af: 12300,
            n_b: 2100,
            n_eu0: 1000,
            r_eu: 0.004,
            n_as0: 510,
            r_as: 0.0055,
            t_af: 220000 / 25,
            t_b: 140000 / 25,
            t_eu_as: 21200 / 25,
            outcome: vec!["AF".to_owned(), "EU".to_owned(), "AS".to_owned()],
            scale: 1.0,
        }
    }

    fn scaled(&self, value: usize) -> usize {
        (value as f64 / self.scale) as usize
    }
}

/// The out-of-Africa model of Gutenkunst et al. (2009) as a
/// three-to-four stage model.
///
/// The ancestral population expands into `AF`, population `B` splits
/// from it, and `B` later splits into the exponentially growing `EU`
/// and `AS`.  Populations not named in
/// [`outcome`](OutOfAfricaParams::outcome) are dropped at the very
/// end.  Migration between the populations is left to the simulation
/// engine; attach its migration operator, configured from a
/// [`MigrationMatrix`](crate::MigrationMatrix), to the model.
pub fn out_of_africa(params: &OutOfAfricaParams) -> Result<Model, DemographyError> {
    if params.total_gens < params.t_af {
        return Err(DemographyError::OutOfBounds(format!(
            "evolution length {} is shorter than the ancestral expansion time {}",
            params.total_gens, params.t_af
        )));
    }
    if params.t_af < params.t_b || params.t_b < params.t_eu_as {
        return Err(DemographyError::OutOfBounds(
            "the out-of-Africa events must be ordered T_AF >= T_B >= T_EU_AS".to_owned(),
        ));
    }
    let mut stages = vec![
        // ancestral population, expanding into AF
        Model::from(InstantChangeModel::new(
            Some(params.scaled(params.total_gens - params.t_b)),
            SizeSpec::from((params.scaled(params.n_ancestral), "Ancestral")),
            vec![params.scaled(params.total_gens - params.t_af)],
            vec![SizeSpecList::from(SizeSpec::from((
                params.scaled(params.n_af),
                "AF",
            )))],
        )?),
        // B splits from AF
        Model::from(InstantChangeModel::new(
            Some(params.scaled(params.t_b - params.t_eu_as)),
            vec![
                SizeSpec::Dynamic,
                SizeSpec::from((params.scaled(params.n_b), "B")),
            ],
            vec![],
            vec![],
        )?),
        // B splits into EU and AS, which grow exponentially
        Model::from(GrowthModel::exponential(
            Some(params.scaled(params.t_eu_as)),
            vec![
                SizeSpec::Dynamic,
                SizeSpec::Split(vec![
                    SizeSpec::from((params.scaled(params.n_eu0), "EU")),
                    SizeSpec::from((params.scaled(params.n_as0), "AS")),
                ]),
            ],
            None,
            Some(vec![0.0, params.r_eu * params.scale, params.r_as * params.scale].into()),
        )?),
    ];
    if let Some(filter) = outcome_filter(&["AF", "EU", "AS"], &params.outcome)? {
        stages.push(filter);
    }
    Ok(MultiStageModel::new(stages)?.into())
}

/// Parameters of the settlement-of-the-New-World model of Gutenkunst
/// et al. (2009), PLoS Genetics, Figure 3 and Table 2.
///
/// All times count **backward** from the end of the evolution, in
/// generations.  The defaults assume 25 years per generation.
#[derive(Clone, Debug, PartialEq)]
pub struct SettlementOfNewWorldParams {
    /// Total length of the evolution, at least [`t_af`](Self::t_af).
    pub total_gens: usize,
    /// Size of the ancestral population.
    pub n_ancestral: usize,
    /// Size of the African population after the ancestral expansion.
    pub n_af: usize,
    /// Size of the out-of-Africa population B at its split from AF.
    pub n_b: usize,
    /// Initial size of the European population.
    pub n_eu0: usize,
    /// Exponential growth rate of the European population.
    pub r_eu: f64,
    /// Initial size of the East Asian population.
    pub n_as0: usize,
    /// Exponential growth rate of the East Asian population.
    pub r_as: f64,
    /// Initial size of the Mexican population.
    pub n_mx0: usize,
    /// Exponential growth rate of the Mexican population.
    pub r_mx: f64,
    /// Generations ago the ancestral population expanded into AF.
    pub t_af: usize,
    /// Generations ago population B split from AF.
    pub t_b: usize,
    /// Generations ago EU and AS split from B.
    pub t_eu_as: usize,
    /// Generations ago MX split from AS.
    pub t_mx: usize,
    /// Proportion of the admixed population drawn from MX; the
    /// remainder comes from EU.
    pub f_mx: f64,
    /// Which of `AF`, `EU`, `AS`, `MX`, `MXL` survive to the end.
    /// Naming `MXL` adds a one-generation hybrid-isolation stage
    /// mixing EU and MX into the admixed `MXL` population.
    pub outcome: Vec<String>,
    /// Divide all sizes and durations by this factor to speed up
    /// scaled-down simulations.
    pub scale: f64,
}

impl SettlementOfNewWorldParams {
    /// The published parameters, evolving for `total_gens` generations.
    pub fn new(total_gens: usize) -> Self {
        Self {
            total_gens,
            n_ancestral: 7300,
            n_af: 12300,
            n_b: 2100,
            n_eu0: 1500,
            r_eu: 0.0023,
            n_as0: 590,
            r_as: 0.0037,
            n_mx0: 800,
            r_mx: 0.005,
            t_af: 220000 / 25,
            t_b: 140000 / 25,
            t_eu_as: 26400 / 25,
            t_mx: 21600 / 25,
            f_mx: 0.48,
            outcome: vec!["MXL".to_owned()],
            scale: 1.0,
        }
    }

    fn scaled(&self, value: usize) -> usize {
        (value as f64 / self.scale) as usize
    }
}

/// The settlement-of-the-New-World model of Gutenkunst et al. (2009)
/// as a four-to-six stage model.
///
/// The shared out-of-Africa history runs as in [`out_of_africa`], then
/// `MX` splits from `AS` and grows exponentially.  When `MXL` is in
/// [`outcome`](SettlementOfNewWorldParams::outcome), a final
/// hybrid-isolation stage mixes `EU` and `MX` into the admixed `MXL`
/// population.  Populations not named in `outcome` are dropped at the
/// very end.  Migration is left to the simulation engine, as for
/// [`out_of_africa`].
pub fn settlement_of_new_world(
    params: &SettlementOfNewWorldParams,
) -> Result<Model, DemographyError> {
    if params.total_gens < params.t_af {
        return Err(DemographyError::OutOfBounds(format!(
            "evolution length {} is shorter than the ancestral expansion time {}",
            params.total_gens, params.t_af
        )));
    }
    if params.t_af < params.t_b || params.t_b < params.t_eu_as || params.t_eu_as < params.t_mx {
        return Err(DemographyError::OutOfBounds(
            "the settlement events must be ordered T_AF >= T_B >= T_EU_AS >= T_MX".to_owned(),
        ));
    }
    let mut stages = vec![
        // ancestral population, expanding into AF
        Model::from(InstantChangeModel::new(
            Some(params.scaled(params.total_gens - params.t_b)),
            SizeSpec::from((params.scaled(params.n_ancestral), "Ancestral")),
            vec![params.scaled(params.total_gens - params.t_af)],
            vec![SizeSpecList::from(SizeSpec::from((
                params.scaled(params.n_af),
                "AF",
            )))],
        )?),
        // B splits from AF
        Model::from(InstantChangeModel::new(
            Some(params.scaled(params.t_b - params.t_eu_as)),
            vec![
                SizeSpec::Dynamic,
                SizeSpec::from((params.scaled(params.n_b), "B")),
            ],
            vec![],
            vec![],
        )?),
        // B splits into EU and AS, which grow exponentially
        Model::from(GrowthModel::exponential(
            Some(params.scaled(params.t_eu_as - params.t_mx)),
            vec![
                SizeSpec::Dynamic,
                SizeSpec::Split(vec![
                    SizeSpec::from((params.scaled(params.n_eu0), "EU")),
                    SizeSpec::from((params.scaled(params.n_as0), "AS")),
                ]),
            ],
            None,
            Some(vec![0.0, params.r_eu * params.scale, params.r_as * params.scale].into()),
        )?),
        // MX splits from AS; the three derived populations keep growing
        Model::from(GrowthModel::exponential(
            Some(params.scaled(params.t_mx)),
            vec![
                SizeSpec::Dynamic,
                SizeSpec::Dynamic,
                SizeSpec::Split(vec![
                    SizeSpec::named(SizeSpec::Dynamic, "AS"),
                    SizeSpec::from((params.scaled(params.n_mx0), "MX")),
                ]),
            ],
            None,
            Some(
                vec![
                    0.0,
                    params.r_eu * params.scale,
                    params.r_as * params.scale,
                    params.r_mx * params.scale,
                ]
                .into(),
            ),
        )?),
    ];
    let with_admixture = params.outcome.iter().any(|kept| kept == "MXL");
    if with_admixture {
        stages.push(Model::from(AdmixtureModel::new(
            Some(1),
            vec![SizeSpec::Dynamic; 4],
            AdmixtureKind::HybridIsolation {
                parent1: 1,
                parent2: 3,
                proportion: 1.0 - params.f_mx,
                name: Some("MXL".to_owned()),
            },
        )?));
    }
    let names: &[&str] = if with_admixture {
        &["AF", "EU", "AS", "MX", "MXL"]
    } else {
        &["AF", "EU", "AS", "MX"]
    };
    if let Some(filter) = outcome_filter(names, &params.outcome)? {
        stages.push(filter);
    }
    Ok(MultiStageModel::new(stages)?.into())
}

/// Parameters of the African/Asian/European model of Schaffner et
/// al. (2005), Genome Research, as implemented in the coalescent
/// simulator cosi.
///
/// All times count **backward** from the end of the evolution, in
/// generations.  The four bottlenecks are parameterized by their
/// intensity `F` (generations over twice the bottleneck size), so a
/// bottleneck lasts 200 generations at size `100 / F`.
#[derive(Clone, Debug, PartialEq)]
pub struct CosiParams {
    /// Total length of the evolution, at least [`t_af`](Self::t_af).
    pub total_gens: usize,
    /// Size of the ancestral population.
    pub n_ancestral: usize,
    /// Size of the African population after the ancestral expansion.
    pub n_af: usize,
    /// Size of the out-of-Africa population, kept by both `Asian` and
    /// `Europe` at their split.
    pub n_ooa: usize,
    /// Modern size of the African population.
    pub n_af1: usize,
    /// Modern size of the Asian population.
    pub n_as1: usize,
    /// Modern size of the European population.
    pub n_eu1: usize,
    /// Generations ago the ancestral population expanded into Africa.
    pub t_af: usize,
    /// Generations ago the out-of-Africa population split from Africa.
    pub t_ooa: usize,
    /// Generations ago the out-of-Africa population split into Asia
    /// and Europe.
    pub t_eu_as: usize,
    /// Generations ago the Asian expansion began.
    pub t_as_exp: usize,
    /// Generations ago the European expansion began.
    pub t_eu_exp: usize,
    /// Generations ago the African expansion began.
    pub t_af_exp: usize,
    /// Intensity of the out-of-Africa bottleneck.
    pub f_ooa: f64,
    /// Intensity of the Asian bottleneck.
    pub f_as: f64,
    /// Intensity of the European bottleneck.
    pub f_eu: f64,
    /// Intensity of the African bottleneck.
    pub f_af: f64,
    /// Divide all sizes and durations by this factor to speed up
    /// scaled-down simulations.
    pub scale: f64,
}

impl CosiParams {
    /// The published parameters, evolving for `total_gens` generations.
    pub fn new(total_gens: usize) -> Self {
        Self {
            total_gens,
            n_ancestral: 12500,
            n_af: 24000,
            n_ooa: 7700,
            n_af1: 100000,
            n_as1: 100000,
            n_eu1: 100000,
            t_af: 17000,
            t_ooa: 3500,
            t_eu_as: 2000,
            t_as_exp: 400,
            t_eu_exp: 350,
            t_af_exp: 200,
            f_ooa: 0.085,
            f_as: 0.067,
            f_eu: 0.020,
            f_af: 0.020,
            scale: 1.0,
        }
    }

    fn scaled(&self, value: usize) -> usize {
        (value as f64 / self.scale) as usize
    }

    fn bottleneck(&self, intensity: f64) -> usize {
        (100.0 / intensity / self.scale) as usize
    }
}

/// The cosi model of Schaffner et al. (2005) as a five stage model.
///
/// The ancestral population expands into `Africa`, the out-of-Africa
/// population splits from it and later splits into `Asian` and
/// `Europe`, each split followed by a 200-generation bottleneck.  The
/// three populations then expand exponentially to their modern sizes,
/// Asia first, then Europe, then Africa.  Migration is left to the
/// simulation engine, as for [`out_of_africa`].
pub fn cosi(params: &CosiParams) -> Result<Model, DemographyError> {
    if params.total_gens < params.t_af {
        return Err(DemographyError::OutOfBounds(format!(
            "evolution length {} is shorter than the ancestral expansion time {}",
            params.total_gens, params.t_af
        )));
    }
    if params.t_af < params.t_ooa
        || params.t_ooa < params.t_eu_as
        || params.t_eu_as < params.t_as_exp
        || params.t_as_exp < params.t_eu_exp
        || params.t_eu_exp < params.t_af_exp
    {
        return Err(DemographyError::OutOfBounds(
            "the cosi events must be ordered \
             T_AF >= T_OoA >= T_EU_AS >= T_AS_exp >= T_EU_exp >= T_AF_exp"
                .to_owned(),
        ));
    }
    // growth rates reaching the modern sizes from the pre-expansion ones
    let r_as = (params.n_as1 as f64 / params.n_ooa as f64).ln() / params.t_as_exp as f64;
    let r_eu = (params.n_eu1 as f64 / params.n_ooa as f64).ln() / params.t_eu_exp as f64;
    let stages = vec![
        // ancestral expansion into Africa, then the out-of-Africa
        // split with its bottleneck and recovery
        Model::from(InstantChangeModel::new(
            Some(params.scaled(params.total_gens - params.t_eu_as)),
            SizeSpec::from((params.scaled(params.n_ancestral), "Ancestral")),
            vec![
                params.scaled(params.total_gens - params.t_af),
                params.scaled(params.total_gens - params.t_ooa),
                params.scaled(params.total_gens - params.t_ooa + 200),
                params.scaled(params.total_gens - params.t_ooa + 400),
            ],
            vec![
                SizeSpecList::from(SizeSpec::from((params.scaled(params.n_af), "Africa"))),
                vec![
                    SizeSpec::from((params.scaled(params.n_af), "Africa")),
                    SizeSpec::from((params.scaled(params.n_ooa), "Out Of Africa")),
                ]
                .into(),
                vec![
                    SizeSpec::Fixed(params.bottleneck(params.f_af)),
                    SizeSpec::Fixed(params.bottleneck(params.f_ooa)),
                ]
                .into(),
                vec![
                    SizeSpec::Fixed(params.scaled(params.n_af)),
                    SizeSpec::Fixed(params.scaled(params.n_ooa)),
                ]
                .into(),
            ],
        )?),
        // Asia and Europe split, each with its own bottleneck
        Model::from(InstantChangeModel::new(
            Some(params.scaled(params.t_eu_as - params.t_as_exp)),
            vec![
                SizeSpec::Fixed(params.scaled(params.n_af)),
                SizeSpec::Split(vec![
                    SizeSpec::from((params.scaled(params.n_ooa), "Asian")),
                    SizeSpec::from((params.scaled(params.n_ooa), "Europe")),
                ]),
            ],
            vec![params.scaled(200), params.scaled(400)],
            vec![
                vec![
                    SizeSpec::Fixed(params.scaled(params.n_af)),
                    SizeSpec::Fixed(params.bottleneck(params.f_as)),
                    SizeSpec::Fixed(params.bottleneck(params.f_eu)),
                ]
                .into(),
                vec![
                    SizeSpec::Fixed(params.scaled(params.n_af)),
                    SizeSpec::Fixed(params.scaled(params.n_ooa)),
                    SizeSpec::Fixed(params.scaled(params.n_ooa)),
                ]
                .into(),
            ],
        )?),
        // the Asian expansion
        Model::from(GrowthModel::exponential(
            Some(params.scaled(params.t_as_exp - params.t_eu_exp)),
            vec![
                SizeSpec::Dynamic,
                SizeSpec::named(SizeSpec::Dynamic, "Modern Asian"),
                SizeSpec::Dynamic,
            ],
            None,
            Some(vec![0.0, r_as * params.scale, 0.0].into()),
        )?),
        // the European expansion joins in
        Model::from(GrowthModel::exponential(
            Some(params.scaled(params.t_eu_exp - params.t_af_exp)),
            vec![
                SizeSpec::Dynamic,
                SizeSpec::Dynamic,
                SizeSpec::named(SizeSpec::Dynamic, "Modern Europe"),
            ],
            None,
            Some(vec![0.0, r_as * params.scale, r_eu * params.scale].into()),
        )?),
        // the African expansion; all three land on their modern sizes
        Model::from(GrowthModel::exponential(
            Some(params.scaled(params.t_af_exp)),
            vec![
                SizeSpec::named(SizeSpec::Dynamic, "Modern Africa"),
                SizeSpec::Dynamic,
                SizeSpec::Dynamic,
            ],
            Some(
                vec![
                    SizeSpec::Fixed(params.scaled(params.n_af1)),
                    SizeSpec::Fixed(params.scaled(params.n_as1)),
                    SizeSpec::Fixed(params.scaled(params.n_eu1)),
                ]
                .into(),
            ),
            None,
        )?),
    ];
    Ok(MultiStageModel::new(stages)?.into())
}

#[cfg(test)]
mod preset_tests {
    use super::*;
    use crate::population::{BasicPopulation, Population};

    fn run(model: &mut Model) -> (Vec<Vec<usize>>, BasicPopulation) {
        let mut pop = BasicPopulation::new(&[10]);
        let mut trace = vec![];
        while let Some(sizes) = model.step(&mut pop).unwrap() {
            pop.resize(&sizes).unwrap();
            pop.advance_generation();
            trace.push(sizes);
        }
        (trace, pop)
    }

    #[test]
    fn scaled_out_of_africa_trace() {
        let mut params = OutOfAfricaParams::new(10000);
        params.scale = 10.0;
        let mut model = out_of_africa(&params).unwrap();
        let (trace, pop) = run(&mut model);
        // (10000 - 5600)/10 + (5600 - 848)/10 + 848/10 generations
        assert_eq!(trace.len(), 440 + 475 + 84);
        // ancestral burn-in, then the AF expansion
        assert_eq!(trace[0], vec![730]);
        assert_eq!(trace[119], vec![730]);
        assert_eq!(trace[120], vec![1230]);
        // B splits off while AF keeps its size
        assert_eq!(trace[440], vec![1230, 210]);
        // EU and AS split from B and grow
        assert_eq!(trace[915], vec![1230, 104, 54]);
        let last = trace.last().unwrap();
        assert_eq!(last[0], 1230);
        assert!(last[1] > 2000 && last[2] > 4000);
        assert_eq!(pop.subpop_names(), vec!["AF", "EU", "AS"]);
    }

    #[test]
    fn outcome_filter_drops_populations() {
        let mut params = OutOfAfricaParams::new(10000);
        params.scale = 10.0;
        params.outcome = vec!["EU".to_owned(), "AS".to_owned()];
        let mut model = out_of_africa(&params).unwrap();
        let (trace, pop) = run(&mut model);
        assert_eq!(trace.len(), 440 + 475 + 84 + 1);
        assert_eq!(trace.last().unwrap().len(), 2);
        assert_eq!(pop.subpop_names(), vec!["EU", "AS"]);
    }

    #[test]
    fn too_short_an_evolution_is_rejected() {
        assert!(matches!(
            out_of_africa(&OutOfAfricaParams::new(100)),
            Err(DemographyError::OutOfBounds(_))
        ));
        assert!(matches!(
            settlement_of_new_world(&SettlementOfNewWorldParams::new(100)),
            Err(DemographyError::OutOfBounds(_))
        ));
        assert!(matches!(
            cosi(&CosiParams::new(100)),
            Err(DemographyError::OutOfBounds(_))
        ));
    }

    #[test]
    fn scaled_settlement_of_new_world_trace() {
        let mut params = SettlementOfNewWorldParams::new(10000);
        params.scale = 10.0;
        let mut model = settlement_of_new_world(&params).unwrap();
        let (trace, pop) = run(&mut model);
        // (10000 - 5600)/10 + (5600 - 1056)/10 + (1056 - 864)/10 +
        // 864/10 generations, then admixture and the outcome filter
        assert_eq!(trace.len(), 440 + 454 + 19 + 86 + 2);
        // ancestral burn-in, then the AF expansion
        assert_eq!(trace[0], vec![730]);
        assert_eq!(trace[119], vec![730]);
        assert_eq!(trace[120], vec![1230]);
        // B splits off while AF keeps its size
        assert_eq!(trace[440], vec![1230, 210]);
        // EU and AS split from B
        assert_eq!(trace[894].len(), 3);
        assert_eq!(trace[894][0], 1230);
        // MX splits from AS at its published initial size, grown once
        assert_eq!(trace[913].len(), 4);
        assert_eq!(trace[913][3], 84);
        // the admixture generation carries all five subpopulations
        assert_eq!(trace[999].len(), 5);
        // only the admixed population survives the default outcome
        let last = trace.last().unwrap();
        assert_eq!(last.len(), 1);
        assert!(last[0] > 2500);
        assert_eq!(pop.subpop_names(), vec!["MXL"]);
    }

    #[test]
    fn settlement_outcome_without_admixture() {
        let mut params = SettlementOfNewWorldParams::new(10000);
        params.scale = 10.0;
        params.outcome = vec!["AF".to_owned(), "EU".to_owned()];
        let mut model = settlement_of_new_world(&params).unwrap();
        let (trace, pop) = run(&mut model);
        // no admixture stage, just the outcome filter
        assert_eq!(trace.len(), 440 + 454 + 19 + 86 + 1);
        assert_eq!(trace.last().unwrap().len(), 2);
        assert_eq!(pop.subpop_names(), vec!["AF", "EU"]);
    }

    #[test]
    fn scaled_cosi_trace() {
        let mut params = CosiParams::new(20000);
        params.scale = 10.0;
        let mut model = cosi(&params).unwrap();
        let (trace, pop) = run(&mut model);
        assert_eq!(trace.len(), 1800 + 160 + 5 + 15 + 20);
        // ancestral burn-in, then the African expansion
        assert_eq!(trace[0], vec![1250]);
        assert_eq!(trace[299], vec![1250]);
        assert_eq!(trace[300], vec![2400]);
        // the out-of-Africa split, its bottleneck, and the recovery
        assert_eq!(trace[1650], vec![2400, 770]);
        assert_eq!(trace[1670], vec![500, 117]);
        assert_eq!(trace[1690], vec![2400, 770]);
        // Asia and Europe split, bottleneck and recover in turn
        assert_eq!(trace[1800], vec![2400, 770, 770]);
        assert_eq!(trace[1820], vec![2400, 149, 500]);
        assert_eq!(trace[1840], vec![2400, 770, 770]);
        // the Asian expansion starts first
        assert_eq!(trace[1960], vec![2400, 819, 770]);
        // everyone lands on the modern sizes
        assert_eq!(trace.last().unwrap(), &vec![10000, 10000, 10000]);
        assert_eq!(
            pop.subpop_names(),
            vec!["Modern Africa", "Modern Asian", "Modern Europe"]
        );
    }

    #[test]
    fn reordered_cosi_events_are_rejected() {
        let mut params = CosiParams::new(20000);
        params.t_af_exp = 380;
        assert!(matches!(
            cosi(&params),
            Err(DemographyError::OutOfBounds(_))
        ));
    }
}
