use thiserror::Error;

/// Error type for this crate.
///
/// Demographic models are static configuration; every variant here
/// reflects a configuration mistake or a misuse of the call contract,
/// not a transient condition.  Nothing is retried internally.
///
/// # Example
///
/// A growth model needs at least two of `T`, `NT` and `r`:
///
/// ```
/// let result = demography::GrowthModel::exponential(
///     Some(10),
///     vec![demography::SizeSpec::Fixed(100)],
///     None,
///     None,
/// );
/// assert!(matches!(
///     result,
///     Err(demography::DemographyError::UnderspecifiedGrowth(_))
/// ));
/// ```
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum DemographyError {
    /// A malformed population size descriptor.
    #[error("invalid size spec: {0}")]
    InvalidSizeSpec(String),
    /// Fewer than two of `T`, `NT`, `r` were given to a growth model.
    #[error("underspecified growth model: {0}")]
    UnderspecifiedGrowth(String),
    /// A destination size must be reached but the growth rate is zero.
    #[error("zero growth rate: {0}")]
    ZeroRate(String),
    /// A generation index outside a model's horizon, or a destination
    /// size no generation count can reach under the given rate.
    #[error("generation out of range: {0}")]
    GenerationOutOfRange(String),
    /// A trigger generation or stage length outside the model horizon.
    #[error("out of bounds: {0}")]
    OutOfBounds(String),
    /// Subpopulation counts of a population and a target spec disagree.
    #[error("subpopulation count mismatch: {0}")]
    SizeMismatch(String),
    /// Structural mutation was attempted during a random-access query.
    #[error("cannot change the size of a population during a random-access query")]
    LockedPopulation,
    /// Random access into a model whose initial size is still dynamic.
    #[error("random access to an uninitialized demographic model with dynamic population size")]
    DynamicSizeRandomAccess,
    /// The model cannot answer out-of-order queries at all.
    #[error("unsupported random access: {0}")]
    UnsupportedRandomAccess(String),
    /// A subpopulation index outside the population.
    #[error("subpopulation index {0} out of range")]
    InvalidSubpopIndex(usize),
    /// A cached per-subpopulation state no longer matches the population.
    #[error("subpopulation count changed: {0}")]
    SubpopulationCountChanged(String),
    /// Errors coming from `serde_yaml`.
    #[error(transparent)]
    YamlError(#[from] serde_yaml::Error),
    /// Errors related to invalid internal states.
    /// In general, this error indicates a bug that should be reported.
    #[error("internal error: {0}")]
    InternalError(String),
}
