use demography::{
    island_rates, loads, BasicPopulation, Capacity, DemographicEvent, DemographyError,
    EventBasedModel, EventContext, EventKind, EventWindow, GenerationBudget, GrowthModel,
    InstantChangeModel, Model, Operator, OperatorOutcome, Population, RawSize, SizeSpec,
};

fn run(model: &mut Model, init: &[usize]) -> (Vec<Vec<usize>>, BasicPopulation) {
    let mut pop = BasicPopulation::new(init);
    let mut trace = vec![];
    while let Some(sizes) = model.step(&mut pop).unwrap() {
        pop.resize(&sizes).unwrap();
        pop.advance_generation();
        trace.push(sizes);
    }
    (trace, pop)
}

#[test]
fn exponential_interpolation_hits_the_destination() {
    let mut model = GrowthModel::exponential(Some(10), 100_usize, Some(1000_usize.into()), None)
        .unwrap()
        .into();
    let (trace, _) = run(&mut model, &[100]);
    assert_eq!(trace.len(), 10);
    assert_eq!(trace[0], vec![125]);
    assert_eq!(trace[9], vec![1000]);
    for pair in trace.windows(2) {
        assert!(pair[0][0] < pair[1][0]);
    }
}

#[test]
fn linear_interpolation_hits_the_destination() {
    let mut model = GrowthModel::linear(Some(10), 100_usize, Some(1000_usize.into()), None)
        .unwrap()
        .into();
    let (trace, _) = run(&mut model, &[100]);
    assert_eq!(trace[0], vec![190]);
    assert_eq!(trace[4], vec![550]);
    assert_eq!(trace[9], vec![1000]);
}

#[test]
fn generation_count_derived_from_rate_and_destination() {
    let mut model =
        GrowthModel::exponential(None, 100_usize, Some(1000_usize.into()), Some(0.05.into()))
            .unwrap();
    let mut pop = BasicPopulation::new(&[100]);
    assert_eq!(model.step(&mut pop).unwrap().unwrap(), vec![105]);
    // ceil(ln(10) / ln(1.05))
    assert_eq!(model.num_gens(), GenerationBudget::Finite(48));
    pop.advance_generation();
    let mut count = 1;
    while let Some(sizes) = model.step(&mut pop).unwrap() {
        pop.resize(&sizes).unwrap();
        pop.advance_generation();
        count += 1;
    }
    assert_eq!(count, 48);
    // the destination acts as a carrying capacity near the end
    assert_eq!(pop.subpop_sizes(), vec![1000]);
}

#[test]
fn final_size_derived_from_rate_and_generation_count() {
    let mut model =
        GrowthModel::exponential(Some(10), 100_usize, None, Some(0.1.into())).unwrap();
    let mut pop = BasicPopulation::new(&[100]);
    assert_eq!(model.step(&mut pop).unwrap().unwrap(), vec![110]);
    assert_eq!(model.final_size(), Some(&[259][..]));
}

#[test]
fn underspecified_growth_is_rejected() {
    assert!(matches!(
        GrowthModel::exponential(Some(10), 100_usize, None, None),
        Err(DemographyError::UnderspecifiedGrowth(_))
    ));
    // a zero rate cannot reach a different destination
    let mut model =
        GrowthModel::exponential(None, 100_usize, Some(1000_usize.into()), Some(0.0.into()))
            .unwrap();
    let mut pop = BasicPopulation::new(&[100]);
    assert!(matches!(
        model.step(&mut pop),
        Err(DemographyError::ZeroRate(_))
    ));
    // growth pointing away from the destination never reaches it
    let mut model =
        GrowthModel::exponential(None, 1000_usize, Some(100_usize.into()), Some(0.05.into()))
            .unwrap();
    let mut pop = BasicPopulation::new(&[1000]);
    assert!(matches!(
        model.step(&mut pop),
        Err(DemographyError::GenerationOutOfRange(_))
    ));
}

#[test]
fn initial_sizes_split_and_name_subpopulations() {
    let mut model: Model = InstantChangeModel::new(
        Some(3),
        vec![SizeSpec::Split(vec![
            SizeSpec::named(SizeSpec::Proportion(0.6), "A"),
            SizeSpec::named(SizeSpec::Proportion(0.4), "B"),
        ])],
        vec![],
        vec![],
    )
    .unwrap()
    .into();
    let (trace, pop) = run(&mut model, &[100]);
    assert_eq!(trace[0], vec![60, 40]);
    assert_eq!(pop.subpop_names(), vec!["A", "B"]);
}

#[test]
fn initial_sizes_merge_subpopulations() {
    let mut model: Model = InstantChangeModel::new(Some(3), 150_usize, vec![], vec![])
        .unwrap()
        .into();
    let (trace, pop) = run(&mut model, &[100, 200]);
    assert_eq!(trace[0], vec![150]);
    assert_eq!(pop.num_subpops(), 1);
}

#[test]
fn empty_initial_sizes_leave_the_population_alone() {
    let mut model: Model =
        InstantChangeModel::new(Some(3), Vec::<SizeSpec>::new(), vec![], vec![])
            .unwrap()
            .into();
    let (trace, pop) = run(&mut model, &[123, 456]);
    assert_eq!(trace, vec![vec![123, 456]; 3]);
    assert_eq!(pop.subpop_sizes(), vec![123, 456]);
}

#[test]
fn instant_change_fires_at_its_trigger() {
    let mut model: Model = InstantChangeModel::new(
        Some(10),
        500_usize,
        vec![5],
        vec![SizeSpec::Fixed(1000).into()],
    )
    .unwrap()
    .into();
    let (trace, _) = run(&mut model, &[500]);
    assert_eq!(trace.len(), 10);
    assert_eq!(trace[4], vec![500]);
    assert_eq!(trace[5], vec![1000]);
    assert_eq!(trace[9], vec![1000]);
}

#[test]
fn random_queries_match_the_sequential_trace() {
    let new = || {
        InstantChangeModel::new(
            Some(10),
            500_usize,
            vec![3, 7],
            vec![SizeSpec::Fixed(1000).into(), SizeSpec::Fixed(250).into()],
        )
        .unwrap()
    };
    let mut sequential: Model = new().into();
    let (trace, _) = run(&mut sequential, &[500]);

    let mut model = new();
    let mut pop = BasicPopulation::new(&[500]);
    model.step(&mut pop).unwrap();
    for gen in (0..10).rev() {
        pop.set_generation(gen);
        let sizes = model.query(&mut pop).unwrap().unwrap();
        assert_eq!(sizes, trace[gen], "generation {gen}");
    }
    pop.set_generation(10);
    assert!(model.query(&mut pop).unwrap().is_none());
}

#[test]
fn stages_chain_and_answer_random_queries() {
    let stages = || {
        vec![
            Model::from(InstantChangeModel::new(Some(5), 100_usize, vec![], vec![]).unwrap()),
            Model::from(
                InstantChangeModel::new(
                    Some(3),
                    vec![
                        SizeSpec::named(SizeSpec::Fixed(60), "A"),
                        SizeSpec::named(SizeSpec::Fixed(40), "B"),
                    ],
                    vec![],
                    vec![],
                )
                .unwrap(),
            ),
        ]
    };
    let mut sequential: Model = demography::MultiStageModel::new(stages()).unwrap().into();
    assert_eq!(sequential.num_gens(), GenerationBudget::Finite(8));
    let (trace, pop) = run(&mut sequential, &[100]);
    assert_eq!(trace.len(), 8);
    assert_eq!(trace[4], vec![100]);
    assert_eq!(trace[5], vec![60, 40]);
    assert_eq!(pop.subpop_names(), vec!["A", "B"]);

    // a query jumps over the first stage without replaying it
    let mut model = demography::MultiStageModel::new(stages()).unwrap();
    let mut pop = BasicPopulation::new(&[100]);
    model.step(&mut pop).unwrap();
    pop.set_generation(6);
    assert_eq!(model.query(&mut pop).unwrap().unwrap(), trace[6]);
    assert_eq!(pop.num_subpops(), 1);
}

#[test]
fn events_scheduled_from_the_end_of_the_model() {
    let split = DemographicEvent::new(EventKind::Split {
        sizes: vec![RawSize::Proportion(0.5), RawSize::Proportion(0.5)],
        names: vec!["L".to_owned(), "R".to_owned()],
    })
    .with_subpops([0])
    .with_window(EventWindow::at([-1]));
    let mut model: Model = EventBasedModel::new(Some(10), 100_usize, vec![split])
        .unwrap()
        .into();
    let (trace, pop) = run(&mut model, &[100]);
    assert_eq!(trace.len(), 10);
    assert_eq!(trace[8], vec![100]);
    assert_eq!(trace[9], vec![50, 50]);
    assert_eq!(pop.subpop_names(), vec!["L", "R"]);
}

#[test]
fn growth_event_with_a_step_schedule() {
    let growth = DemographicEvent::new(EventKind::LinearGrowth {
        rates: 0.1.into(),
        capacity: Capacity::Uniform(130),
        inc_by: None,
    })
    .with_window(EventWindow {
        step: 2,
        ..EventWindow::default()
    });
    let mut model = EventBasedModel::new(None, 100_usize, vec![growth]).unwrap();
    let mut pop = BasicPopulation::new(&[100]);
    let mut trace = vec![];
    for _ in 0..6 {
        let sizes = model.step(&mut pop).unwrap().unwrap();
        pop.resize(&sizes).unwrap();
        pop.advance_generation();
        trace.push(sizes[0]);
    }
    // +10 on even generations, up to the carrying capacity
    assert_eq!(trace, vec![110, 110, 120, 120, 130, 130]);
}

#[test]
fn events_filtered_by_replicate() {
    let new = || {
        EventBasedModel::new(
            Some(2),
            100_usize,
            vec![
                DemographicEvent::new(EventKind::Resize {
                    sizes: vec![RawSize::Fixed(999)],
                })
                .with_window(EventWindow {
                    replicates: Some(vec![0]),
                    ..EventWindow::default()
                }),
            ],
        )
        .unwrap()
    };
    let mut pop = BasicPopulation::new(&[100]);
    pop.set_replicate(Some(0));
    assert_eq!(new().step(&mut pop).unwrap().unwrap(), vec![999]);

    let mut pop = BasicPopulation::new(&[100]);
    pop.set_replicate(Some(1));
    assert_eq!(new().step(&mut pop).unwrap().unwrap(), vec![100]);
}

struct StopAfter(i64);

impl Operator for StopAfter {
    fn apply(
        &mut self,
        _pop: &mut dyn Population,
        ctx: &EventContext,
    ) -> Result<OperatorOutcome, DemographyError> {
        if ctx.rel_gen >= self.0 {
            Ok(OperatorOutcome::Terminate)
        } else {
            Ok(OperatorOutcome::Continue)
        }
    }
}

#[test]
fn operators_can_terminate_a_model_early() {
    let mut model: Model = InstantChangeModel::new(Some(10), 100_usize, vec![], vec![])
        .unwrap()
        .with_operator(Box::new(StopAfter(3)))
        .into();
    let (trace, _) = run(&mut model, &[100]);
    assert_eq!(trace.len(), 3);
}

struct PinSizes(Vec<usize>);

impl Operator for PinSizes {
    fn apply(
        &mut self,
        _pop: &mut dyn Population,
        _ctx: &EventContext,
    ) -> Result<OperatorOutcome, DemographyError> {
        Ok(OperatorOutcome::ExpectedSize(self.0.clone()))
    }
}

#[test]
fn operators_can_override_the_expected_sizes() {
    let mut model: Model = InstantChangeModel::new(Some(4), 100_usize, vec![], vec![])
        .unwrap()
        .with_operator(Box::new(PinSizes(vec![42])))
        .into();
    let (trace, _) = run(&mut model, &[100]);
    assert_eq!(trace, vec![vec![42]; 4]);
}

#[test]
fn yaml_specification_runs_end_to_end() {
    let yaml = "
description: burn-in, then a split that grows apart
stages:
  - instant_change:
      T: 5
      N0: 100
  - exponential_growth:
      T: 5
      N0: [[60, AFR], [40, EUR]]
      NT: [600, 400]
";
    let mut model = loads(yaml).unwrap();
    assert_eq!(model.num_gens(), GenerationBudget::Finite(10));
    let (trace, pop) = run(&mut model, &[100]);
    assert_eq!(trace.len(), 10);
    assert_eq!(trace[4], vec![100]);
    assert_eq!(trace[9], vec![600, 400]);
    assert_eq!(pop.subpop_names(), vec!["AFR", "EUR"]);

    // the stream form reads the same document
    let model = demography::load(yaml.as_bytes()).unwrap();
    assert_eq!(model.num_gens(), GenerationBudget::Finite(10));
}

#[test]
fn migration_rates_are_row_stochastic() {
    let matrix = island_rates(0.01, 4).unwrap();
    assert_eq!(matrix.num_subpops(), 4);
    for from in 0..4 {
        let row: f64 = (0..4).map(|to| matrix.rate(from, to)).sum();
        assert!((row - 1.0).abs() < 1e-12);
        assert!((matrix.rate(from, from) - 0.99).abs() < 1e-12);
    }
    let matrix = demography::hierarchical_island_rates(0.01, 0.001, &[2, 2]).unwrap();
    for from in 0..4 {
        let row: f64 = (0..4).map(|to| matrix.rate(from, to)).sum();
        assert!((row - 1.0).abs() < 1e-12);
    }
}

#[test]
fn out_of_africa_preset_runs_to_completion() {
    let mut params = demography::presets::OutOfAfricaParams::new(10000);
    params.scale = 10.0;
    let mut model = demography::presets::out_of_africa(&params).unwrap();
    let (trace, pop) = run(&mut model, &[10]);
    assert_eq!(trace.len(), 999);
    assert_eq!(pop.subpop_names(), vec!["AF", "EU", "AS"]);
}

#[test]
fn settlement_of_new_world_preset_ends_with_the_admixed_population() {
    let mut params = demography::presets::SettlementOfNewWorldParams::new(10000);
    params.scale = 10.0;
    let mut model = demography::presets::settlement_of_new_world(&params).unwrap();
    let (trace, pop) = run(&mut model, &[10]);
    assert_eq!(trace.len(), 1001);
    assert_eq!(pop.subpop_names(), vec!["MXL"]);
}

#[test]
fn cosi_preset_reaches_the_modern_sizes() {
    let mut params = demography::presets::CosiParams::new(20000);
    params.scale = 10.0;
    let mut model = demography::presets::cosi(&params).unwrap();
    let (trace, pop) = run(&mut model, &[10]);
    assert_eq!(trace.len(), 2000);
    assert_eq!(trace.last().unwrap(), &vec![10000, 10000, 10000]);
    assert_eq!(
        pop.subpop_names(),
        vec!["Modern Africa", "Modern Asian", "Modern Europe"]
    );
}
