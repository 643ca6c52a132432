//! Demographic models for forward-time population-genetics
//! simulations.
//!
//! A demographic model decides, generation by generation, how many
//! individuals each subpopulation of an evolving population should
//! have and when structural changes (splits, merges, admixture) must
//! be applied.  The simulation engine owning the population calls the
//! model once per generation through [`Model::step`] (or the `step`
//! method of a concrete model type) and receives either the next
//! generation's size vector or `None`, the signal to stop evolving.
//!
//! Models never own individuals or genotypes.  They drive any
//! implementation of the [`Population`] trait; [`BasicPopulation`]
//! is a genotype-free implementation useful for inspecting a model
//! before plugging in an engine.
//!
//! ```
//! let mut model = demography::InstantChangeModel::new(
//!     Some(10),
//!     1000_usize,
//!     vec![5],
//!     vec![vec![demography::SizeSpec::Fixed(500), demography::SizeSpec::Fixed(500)].into()],
//! )
//! .unwrap();
//! let mut pop = demography::BasicPopulation::new(&[1000]);
//! let mut sizes = vec![];
//! while let Some(next) = model.step(&mut pop).unwrap() {
//!     demography::Population::resize(&mut pop, &next).unwrap();
//!     pop.advance_generation();
//!     sizes.push(next);
//! }
//! assert_eq!(sizes[4], vec![1000]);
//! assert_eq!(sizes[5], vec![500, 500]);
//! ```
//!
//! Models can also be read from YAML specifications via [`loads`] and
//! [`load`]:
//!
//! ```
//! let model = demography::loads(
//!     "
//! stages:
//!   - instant_change:
//!       T: 100
//!       N0: 500
//!   - exponential_growth:
//!       T: 50
//!       N0: [[300, A], [200, B]]
//!       NT: [3000, 2000]
//! ",
//! )
//! .unwrap();
//! assert_eq!(model.num_gens(), demography::GenerationBudget::Finite(150));
//! ```
#![warn(missing_docs)]
#![warn(rustdoc::broken_intra_doc_links)]

mod admixture;
mod error;
mod event;
mod growth;
mod instant;
mod migration;
mod model;
mod multistage;
mod population;
pub mod presets;
mod reshape;
mod size_spec;
mod specification;

pub use admixture::{AdmixtureKind, AdmixtureModel};
pub use error::DemographyError;
pub use event::{
    AdmixtureSizes, Capacity, DemographicEvent, EventBasedModel, EventKind, EventWindow,
    SubpopRef,
};
pub use growth::{GrowthForm, GrowthModel, GrowthRates};
pub use instant::InstantChangeModel;
pub use migration::{
    hierarchical_island_rates, island_rates, stepping_stone_2d_rates, stepping_stone_rates,
    MigrationMatrix,
};
pub use model::{CallMode, GenerationBudget, Model};
pub use multistage::MultiStageModel;
pub use population::{BasicPopulation, EventContext, Operator, OperatorOutcome, Population};
pub use size_spec::{extract, resolved, to_named, NamedEntry, RawSize, SizeSpec, SizeSpecList};

/// Build a [`Model`] from a YAML specification in a string.
pub fn loads(yaml: &str) -> Result<Model, DemographyError> {
    let spec: specification::UnresolvedSpecification = serde_yaml::from_str(yaml)?;
    spec.resolve()
}

/// Build a [`Model`] from a YAML specification in a readable stream.
pub fn load<T: std::io::Read>(reader: T) -> Result<Model, DemographyError> {
    let spec: specification::UnresolvedSpecification = serde_yaml::from_reader(reader)?;
    spec.resolve()
}
