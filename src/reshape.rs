use crate::model::CallMode;
use crate::population::Population;
use crate::size_spec::{to_named, NamedEntry, RawSize, SizeSpec};
use crate::DemographyError;

fn resolve_one(
    pop: &mut dyn Population,
    size: &RawSize,
    name: &str,
) -> Result<(), DemographyError> {
    match size {
        RawSize::Fixed(n) => pop.resize(&[*n])?,
        RawSize::Proportion(p) => {
            let target = (*p * pop.total_size() as f64) as usize;
            pop.resize(&[target])?;
        }
        RawSize::Dynamic => (),
    }
    if !name.is_empty() {
        pop.set_subpop_name(0, name)?;
    }
    Ok(())
}

/// Merge, resize and split a population until it matches `spec`.
///
/// A no-op for an empty spec.  Resizing propagates existing
/// individuals; splits evaluate their member sizes against the
/// pre-resize size of the subpopulation being split, and are applied
/// back to front so earlier indexes stay valid.
pub(crate) fn fit(
    pop: &mut dyn Population,
    spec: &[SizeSpec],
    mode: CallMode,
) -> Result<(), DemographyError> {
    if spec.is_empty() {
        return Ok(());
    }
    if mode == CallMode::RandomAccessQuery {
        return Err(DemographyError::LockedPopulation);
    }
    let named = to_named(spec)?;
    if pop.num_subpops() > 1 {
        if named.len() == 1 {
            match &named[0] {
                NamedEntry::Simple { size, name } => {
                    pop.merge_subpops(&[], None)?;
                    resolve_one(pop, size, name)?;
                }
                NamedEntry::Group(_) => {
                    return Err(DemographyError::SizeMismatch(
                        "cannot merge subpopulations into a split group".to_owned(),
                    ))
                }
            }
        } else if named.len() != pop.num_subpops() {
            return Err(DemographyError::SizeMismatch(format!(
                "{} subpopulations in population, {} required",
                pop.num_subpops(),
                named.len()
            )));
        } else if named.iter().all(|entry| entry.is_simple()) {
            let current = pop.subpop_sizes();
            let mut new_sizes = Vec::with_capacity(named.len());
            for (entry, size) in named.iter().zip(current.iter()) {
                match entry {
                    NamedEntry::Simple { size: raw, .. } => new_sizes.push(raw.resolve(*size)),
                    NamedEntry::Group(_) => unreachable!(),
                }
            }
            pop.resize(&new_sizes)?;
            for (idx, entry) in named.iter().enumerate() {
                if let NamedEntry::Simple { name, .. } = entry {
                    if !name.is_empty() {
                        pop.set_subpop_name(idx, name)?;
                    }
                }
            }
        } else {
            // resize first, then split, so that split sizes can refer
            // to the pre-resize subpopulation sizes
            let current = pop.subpop_sizes();
            let mut new_sizes = Vec::with_capacity(named.len());
            let mut new_names = Vec::with_capacity(named.len());
            let mut splits = vec![];
            for (idx, (entry, size)) in named.iter().zip(current.iter()).enumerate() {
                match entry {
                    NamedEntry::Simple { size: raw, name } => {
                        new_sizes.push(raw.resolve(*size));
                        new_names.push(name.clone());
                    }
                    NamedEntry::Group(members) => {
                        let sizes: Vec<usize> =
                            members.iter().map(|(raw, _)| raw.resolve(*size)).collect();
                        let names: Vec<String> =
                            members.iter().map(|(_, name)| name.clone()).collect();
                        new_sizes.push(sizes.iter().sum());
                        new_names.push(String::default());
                        splits.push((idx, sizes, names));
                    }
                }
            }
            pop.resize(&new_sizes)?;
            for (idx, name) in new_names.iter().enumerate() {
                if !name.is_empty() {
                    pop.set_subpop_name(idx, name)?;
                }
            }
            // back to front by original index
            for (idx, sizes, names) in splits.into_iter().rev() {
                let names = if names.iter().any(|name| !name.is_empty()) {
                    names
                } else {
                    vec![]
                };
                pop.split_subpop(idx, &sizes, &names)?;
            }
        }
    } else if named.len() == 1 {
        match &named[0] {
            NamedEntry::Simple { size, name } => resolve_one(pop, size, name)?,
            NamedEntry::Group(members) => {
                let current = pop.total_size();
                let sizes: Vec<usize> = members
                    .iter()
                    .map(|(raw, _)| raw.resolve(current))
                    .collect();
                let names: Vec<String> =
                    members.iter().map(|(_, name)| name.clone()).collect();
                pop.resize(&[sizes.iter().sum()])?;
                let names = if names.iter().any(|name| !name.is_empty()) {
                    names
                } else {
                    vec![]
                };
                pop.split_subpop(0, &sizes, &names)?;
            }
        }
    } else {
        if !named.iter().all(|entry| entry.is_simple()) {
            return Err(DemographyError::SizeMismatch(format!(
                "cannot fit population with sizes {:?} to {named:?}",
                pop.subpop_sizes()
            )));
        }
        let total = pop.total_size();
        let mut sizes = Vec::with_capacity(named.len());
        let mut names = Vec::with_capacity(named.len());
        for entry in &named {
            if let NamedEntry::Simple { size, name } = entry {
                sizes.push(size.resolve(total));
                names.push(name.clone());
            }
        }
        pop.resize(&[sizes.iter().sum()])?;
        let names = if names.iter().any(|name| !name.is_empty()) {
            names
        } else {
            vec![]
        };
        pop.split_subpop(0, &sizes, &names)?;
    }
    Ok(())
}
