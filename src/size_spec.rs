use serde::ser::SerializeSeq;
use serde::{Deserialize, Serialize};

use crate::DemographyError;

/// A population size descriptor.
///
/// Wherever a demographic model accepts a size, any of these forms is
/// valid:
///
/// * [`SizeSpec::Fixed`] — an absolute number of individuals.
/// * [`SizeSpec::Proportion`] — a fraction (may exceed 1.0) of the
///   size of the population or subpopulation the spec is applied to.
/// * [`SizeSpec::Dynamic`] — "whatever the size is when the model is
///   first applied".
/// * [`SizeSpec::Named`] — any of the above plus a subpopulation name.
/// * [`SizeSpec::Split`] — a group of specs deriving several output
///   subpopulations from one input subpopulation.
///
/// # In `YAML` input
///
/// Integers are fixed sizes, floats are proportions, `null` is dynamic,
/// a two-element sequence ending in a string is a named size, and any
/// other sequence is a split group:
///
/// ```
/// let yaml = "[null, [[60, EU], [40, AS]]]";
/// let spec: Vec<demography::SizeSpec> =
///     serde_yaml::from_str::<demography::SizeSpecList>(yaml)
///         .unwrap()
///         .into();
/// assert_eq!(spec.len(), 2);
/// assert!(matches!(spec[0], demography::SizeSpec::Dynamic));
/// assert!(matches!(spec[1], demography::SizeSpec::Split(_)));
/// ```
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(try_from = "SizeSpecTrampoline")]
pub enum SizeSpec {
    /// A fixed number of individuals.
    Fixed(usize),
    /// A proportion of a reference count.
    Proportion(f64),
    /// Resolve against the current size at application time.
    Dynamic,
    /// A size with a subpopulation name attached.
    Named(Box<SizeSpec>, String),
    /// One input subpopulation split into several output subpopulations.
    Split(Vec<SizeSpec>),
}

impl SizeSpec {
    /// Attach a subpopulation name to a spec.
    pub fn named<S: Into<String>>(spec: SizeSpec, name: S) -> Self {
        Self::Named(Box::new(spec), name.into())
    }
}

impl From<usize> for SizeSpec {
    fn from(value: usize) -> Self {
        Self::Fixed(value)
    }
}

impl From<f64> for SizeSpec {
    fn from(value: f64) -> Self {
        Self::Proportion(value)
    }
}

impl<S: Into<String>> From<(usize, S)> for SizeSpec {
    fn from(value: (usize, S)) -> Self {
        Self::named(SizeSpec::Fixed(value.0), value.1)
    }
}

/// A raw size with names and grouping stripped away.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RawSize {
    /// A fixed number of individuals.
    Fixed(usize),
    /// A proportion of a reference count.
    Proportion(f64),
    /// Resolve against the current size at application time.
    Dynamic,
}

impl RawSize {
    /// Resolve against a reference count.
    pub fn resolve(&self, current: usize) -> usize {
        match self {
            RawSize::Fixed(n) => *n,
            RawSize::Proportion(p) => (*p * current as f64) as usize,
            RawSize::Dynamic => current,
        }
    }

    /// `true` for [`RawSize::Fixed`].
    pub fn is_fixed(&self) -> bool {
        matches!(self, RawSize::Fixed(_))
    }
}

/// One entry of a fully-resolved named size spec.
#[derive(Clone, Debug, PartialEq)]
pub enum NamedEntry {
    /// A single (possibly named) size.
    Simple {
        /// The raw size.
        size: RawSize,
        /// The subpopulation name; empty string for "unnamed".
        name: String,
    },
    /// A split group of (size, name) pairs.
    Group(Vec<(RawSize, String)>),
}

impl NamedEntry {
    /// `true` for [`NamedEntry::Simple`].
    pub fn is_simple(&self) -> bool {
        matches!(self, NamedEntry::Simple { .. })
    }
}

fn raw_of(spec: &SizeSpec) -> Result<RawSize, DemographyError> {
    match spec {
        SizeSpec::Fixed(n) => Ok(RawSize::Fixed(*n)),
        SizeSpec::Proportion(p) => Ok(RawSize::Proportion(*p)),
        SizeSpec::Dynamic => Ok(RawSize::Dynamic),
        SizeSpec::Named(inner, _) => match inner.as_ref() {
            SizeSpec::Named(_, _) | SizeSpec::Split(_) => Err(DemographyError::InvalidSizeSpec(
                format!("unacceptable population size: {spec:?}"),
            )),
            simple => raw_of(simple),
        },
        SizeSpec::Split(_) => Err(DemographyError::InvalidSizeSpec(format!(
            "unacceptable population size: {spec:?}"
        ))),
    }
}

/// Flatten a size spec into a list of raw sizes.
///
/// Split groups contribute one raw size per member; names are dropped.
/// Anything nested more than one group deep is an error.
pub fn extract(specs: &[SizeSpec]) -> Result<Vec<RawSize>, DemographyError> {
    let mut res = vec![];
    for spec in specs {
        match spec {
            SizeSpec::Split(group) => {
                for member in group {
                    res.push(raw_of(member)?);
                }
            }
            other => res.push(raw_of(other)?),
        }
    }
    Ok(res)
}

/// Convert a size spec into `(size, name)` entries, preserving split
/// groups.
pub fn to_named(specs: &[SizeSpec]) -> Result<Vec<NamedEntry>, DemographyError> {
    let mut res = vec![];
    for spec in specs {
        match spec {
            SizeSpec::Split(group) => {
                let mut members = vec![];
                for member in group {
                    members.push((raw_of(member)?, name_of(member).to_owned()));
                }
                res.push(NamedEntry::Group(members));
            }
            other => res.push(NamedEntry::Simple {
                size: raw_of(other)?,
                name: name_of(other).to_owned(),
            }),
        }
    }
    Ok(res)
}

fn name_of(spec: &SizeSpec) -> &str {
    match spec {
        SizeSpec::Named(_, name) => name,
        _ => "",
    }
}

/// The fixed sizes of a spec, or `None` if any entry is still dynamic
/// or proportional.
pub fn resolved(specs: &[SizeSpec]) -> Result<Option<Vec<usize>>, DemographyError> {
    let raw = extract(specs)?;
    let mut sizes = Vec::with_capacity(raw.len());
    for size in raw {
        match size {
            RawSize::Fixed(n) => sizes.push(n),
            _ => return Ok(None),
        }
    }
    Ok(Some(sizes))
}

/// A top-level list of size specs, one entry per subpopulation.
///
/// This type exists so that `YAML` input may give a bare scalar where a
/// one-element list is meant, the same leniency the input types of the
/// models give.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(from = "SizeSpec")]
pub struct SizeSpecList(pub Vec<SizeSpec>);

impl From<SizeSpec> for SizeSpecList {
    fn from(value: SizeSpec) -> Self {
        match value {
            // a top-level sequence is a per-subpopulation list, not a split
            SizeSpec::Split(entries) => Self(entries),
            single => Self(vec![single]),
        }
    }
}

impl From<Vec<SizeSpec>> for SizeSpecList {
    fn from(value: Vec<SizeSpec>) -> Self {
        Self(value)
    }
}

impl From<usize> for SizeSpecList {
    fn from(value: usize) -> Self {
        Self(vec![SizeSpec::Fixed(value)])
    }
}

impl From<SizeSpecList> for Vec<SizeSpec> {
    fn from(value: SizeSpecList) -> Self {
        value.0
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SizeSpecTrampoline {
    Dynamic(()),
    Int(u64),
    Float(f64),
    Str(String),
    Seq(Vec<SizeSpecTrampoline>),
}

impl TryFrom<SizeSpecTrampoline> for SizeSpec {
    type Error = DemographyError;

    fn try_from(value: SizeSpecTrampoline) -> Result<Self, Self::Error> {
        match value {
            SizeSpecTrampoline::Dynamic(_) => Ok(SizeSpec::Dynamic),
            SizeSpecTrampoline::Int(n) => Ok(SizeSpec::Fixed(n as usize)),
            SizeSpecTrampoline::Float(f) => Ok(SizeSpec::Proportion(f)),
            SizeSpecTrampoline::Str(s) => Err(DemographyError::InvalidSizeSpec(format!(
                "unacceptable population size: {s:?}"
            ))),
            SizeSpecTrampoline::Seq(mut seq) => {
                if seq.len() == 2 && matches!(seq[1], SizeSpecTrampoline::Str(_)) {
                    let name = match seq.pop() {
                        Some(SizeSpecTrampoline::Str(name)) => name,
                        _ => unreachable!(),
                    };
                    let inner = match seq.pop() {
                        Some(inner) => SizeSpec::try_from(inner)?,
                        None => unreachable!(),
                    };
                    Ok(SizeSpec::named(inner, name))
                } else {
                    let mut members = Vec::with_capacity(seq.len());
                    for member in seq {
                        members.push(SizeSpec::try_from(member)?);
                    }
                    Ok(SizeSpec::Split(members))
                }
            }
        }
    }
}

impl Serialize for SizeSpec {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            SizeSpec::Fixed(n) => serializer.serialize_u64(*n as u64),
            SizeSpec::Proportion(p) => serializer.serialize_f64(*p),
            SizeSpec::Dynamic => serializer.serialize_unit(),
            SizeSpec::Named(inner, name) => {
                let mut seq = serializer.serialize_seq(Some(2))?;
                seq.serialize_element(inner.as_ref())?;
                seq.serialize_element(name)?;
                seq.end()
            }
            SizeSpec::Split(members) => {
                let mut seq = serializer.serialize_seq(Some(members.len()))?;
                for member in members {
                    seq.serialize_element(member)?;
                }
                seq.end()
            }
        }
    }
}
