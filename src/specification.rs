//! Unresolved, serde-friendly counterparts of the model types.
//!
//! A specification document lists demographic stages; resolving it
//! validates each stage and chains them into a single [`Model`].

use serde::Deserialize;

use crate::model::Model;
use crate::multistage::MultiStageModel;
use crate::size_spec::SizeSpecList;
use crate::{
    AdmixtureKind, AdmixtureModel, DemographyError, GrowthModel, GrowthRates,
    InstantChangeModel,
};

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct UnresolvedGrowth {
    #[serde(rename = "T", default)]
    num_gens: Option<usize>,
    #[serde(rename = "N0")]
    init_size: SizeSpecList,
    #[serde(rename = "NT", default)]
    final_size: Option<SizeSpecList>,
    #[serde(rename = "r", default)]
    rates: Option<GrowthRates>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct UnresolvedInstantChange {
    #[serde(rename = "T", default)]
    num_gens: Option<usize>,
    #[serde(rename = "N0")]
    init_size: SizeSpecList,
    #[serde(rename = "G", default)]
    triggers: Vec<usize>,
    #[serde(rename = "NG", default)]
    sizes: Vec<SizeSpecList>,
    #[serde(default)]
    remove_empty_subpops: bool,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct UnresolvedAdmixture {
    #[serde(rename = "T", default)]
    num_gens: Option<usize>,
    #[serde(rename = "N0")]
    init_size: SizeSpecList,
    model: AdmixtureKind,
}

#[derive(Deserialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
enum UnresolvedStage {
    ExponentialGrowth(UnresolvedGrowth),
    LinearGrowth(UnresolvedGrowth),
    InstantChange(UnresolvedInstantChange),
    Admixture(UnresolvedAdmixture),
}

impl UnresolvedStage {
    fn resolve(self) -> Result<Model, DemographyError> {
        match self {
            UnresolvedStage::ExponentialGrowth(stage) => Ok(GrowthModel::exponential(
                stage.num_gens,
                stage.init_size,
                stage.final_size,
                stage.rates,
            )?
            .into()),
            UnresolvedStage::LinearGrowth(stage) => Ok(GrowthModel::linear(
                stage.num_gens,
                stage.init_size,
                stage.final_size,
                stage.rates,
            )?
            .into()),
            UnresolvedStage::InstantChange(stage) => {
                let model = InstantChangeModel::new(
                    stage.num_gens,
                    stage.init_size,
                    stage.triggers,
                    stage.sizes,
                )?;
                Ok(if stage.remove_empty_subpops {
                    model.removing_empty_subpops()
                } else {
                    model
                }
                .into())
            }
            UnresolvedStage::Admixture(stage) => {
                Ok(AdmixtureModel::new(stage.num_gens, stage.init_size, stage.model)?.into())
            }
        }
    }
}

/// The raw, unvalidated form of a specification document.
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct UnresolvedSpecification {
    #[serde(default)]
    #[allow(dead_code)]
    description: String,
    // stages are written as singleton maps, not YAML tags
    #[serde(with = "serde_yaml::with::singleton_map_recursive")]
    stages: Vec<UnresolvedStage>,
}

impl UnresolvedSpecification {
    pub(crate) fn resolve(self) -> Result<Model, DemographyError> {
        let mut models = self
            .stages
            .into_iter()
            .map(|stage| stage.resolve())
            .collect::<Result<Vec<Model>, DemographyError>>()?;
        match models.len() {
            0 => Err(DemographyError::InvalidSizeSpec(
                "the specification contains no stages".to_owned(),
            )),
            1 => Ok(models.remove(0)),
            _ => Ok(MultiStageModel::new(models)?.into()),
        }
    }
}

#[cfg(test)]
mod specification_tests {
    use crate::population::{BasicPopulation, Population};
    use crate::{loads, DemographyError, Model};

    #[test]
    fn single_stage_resolves_to_the_bare_model() {
        let model = loads(
            "
stages:
  - exponential_growth:
      T: 10
      N0: 100
      NT: 1000
",
        )
        .unwrap();
        assert!(matches!(model, Model::Growth(_)));
    }

    #[test]
    fn stages_chain_into_a_multi_stage_model() {
        let mut model = loads(
            "
description: burn-in, then a split with growth
stages:
  - instant_change:
      T: 5
      N0: 100
  - instant_change:
      T: 3
      N0: [[60, AFR], [40, EUR]]
",
        )
        .unwrap();
        assert!(matches!(model, Model::MultiStage(_)));
        let mut pop = BasicPopulation::new(&[100]);
        let mut trace = vec![];
        while let Some(sizes) = model.step(&mut pop).unwrap() {
            pop.resize(&sizes).unwrap();
            pop.advance_generation();
            trace.push(sizes);
        }
        assert_eq!(trace.len(), 8);
        assert_eq!(trace[4], vec![100]);
        assert_eq!(trace[5], vec![60, 40]);
        assert_eq!(pop.subpop_names(), vec!["AFR", "EUR"]);
    }

    #[test]
    fn admixture_stage() {
        let model = loads(
            "
stages:
  - admixture:
      T: 1
      N0: [~, ~]
      model:
        hybrid_isolation:
          parent1: 0
          parent2: 1
          proportion: 0.5
          name: MXL
",
        )
        .unwrap();
        assert!(matches!(model, Model::Admixture(_)));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let result = loads(
            "
stages:
  - exponential_growth:
      T: 10
      N0: 100
      NT: 1000
      carrying_capacity: 5000
",
        );
        assert!(matches!(result, Err(DemographyError::YamlError(_))));
    }

    #[test]
    fn invalid_stages_are_rejected_at_resolution() {
        let result = loads(
            "
stages:
  - exponential_growth:
      T: 10
      N0: 100
",
        );
        assert!(matches!(
            result,
            Err(DemographyError::UnderspecifiedGrowth(_))
        ));
        assert!(matches!(
            loads("stages: []"),
            Err(DemographyError::InvalidSizeSpec(_))
        ));
    }
}
