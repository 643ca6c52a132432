use ndarray::Array2;

use crate::DemographyError;

/// A row-stochastic migration rate matrix.
///
/// Entry `(i, j)` is the per-generation probability that an
/// individual of subpopulation `i` migrates to subpopulation `j`.
/// Every row sums to one, the diagonal holding the probability of
/// staying put.
#[derive(Clone, Debug, PartialEq)]
pub struct MigrationMatrix(Array2<f64>);

impl MigrationMatrix {
    /// Validate and wrap a rate matrix.
    pub fn new(rates: Array2<f64>) -> Result<Self, DemographyError> {
        if rates.nrows() != rates.ncols() {
            return Err(DemographyError::SizeMismatch(format!(
                "migration matrix must be square, got {}x{}",
                rates.nrows(),
                rates.ncols()
            )));
        }
        for (idx, row) in rates.rows().into_iter().enumerate() {
            if row.iter().any(|rate| *rate < 0.0 || !rate.is_finite()) {
                return Err(DemographyError::InvalidSizeSpec(format!(
                    "negative or non-finite migration rate in row {idx}"
                )));
            }
            let total: f64 = row.sum();
            if (total - 1.0).abs() > 1e-8 {
                return Err(DemographyError::InvalidSizeSpec(format!(
                    "migration rates in row {idx} sum to {total}, not 1"
                )));
            }
        }
        Ok(Self(rates))
    }

    /// Number of subpopulations the matrix describes.
    pub fn num_subpops(&self) -> usize {
        self.0.nrows()
    }

    /// The migration rate from subpopulation `from` to `to`.
    pub fn rate(&self, from: usize, to: usize) -> f64 {
        self.0[[from, to]]
    }

    /// The underlying rate matrix.
    pub fn as_array(&self) -> &Array2<f64> {
        &self.0
    }
}

fn check_rate(r: f64) -> Result<(), DemographyError> {
    if !(0.0..=1.0).contains(&r) {
        Err(DemographyError::InvalidSizeSpec(format!(
            "migration rate {r} outside [0, 1]"
        )))
    } else {
        Ok(())
    }
}

fn identity() -> MigrationMatrix {
    MigrationMatrix(Array2::from_elem((1, 1), 1.0))
}

/// Migration matrix for an island model of `n` subpopulations: each
/// generation a proportion `r` of every subpopulation emigrates,
/// spread evenly over the other islands.
pub fn island_rates(r: f64, n: usize) -> Result<MigrationMatrix, DemographyError> {
    check_rate(r)?;
    if n < 2 {
        return Ok(identity());
    }
    let mut rates = Array2::from_elem((n, n), r / (n - 1) as f64);
    for sp in 0..n {
        rates[[sp, sp]] = 1.0 - r;
    }
    Ok(MigrationMatrix(rates))
}

/// Migration matrix for a hierarchical island model: islands are
/// grouped, with proportion `r_within` exchanged inside a group and
/// `r_between` with islands of other groups.
pub fn hierarchical_island_rates(
    r_within: f64,
    r_between: f64,
    group_sizes: &[usize],
) -> Result<MigrationMatrix, DemographyError> {
    check_rate(r_within)?;
    check_rate(r_between)?;
    check_rate(r_within + r_between)?;
    let n: usize = group_sizes.iter().sum();
    if n < 2 {
        return Ok(identity());
    }
    let mut group_of = Vec::with_capacity(n);
    for (group, size) in group_sizes.iter().enumerate() {
        group_of.extend(std::iter::repeat(group).take(*size));
    }
    let mut rates = Array2::zeros((n, n));
    for from in 0..n {
        let peers = group_sizes[group_of[from]] - 1;
        let outsiders = n - peers - 1;
        // a lone island in its group has nowhere to send r_within
        let r_within = if peers == 0 { 0.0 } else { r_within };
        let r_between = if outsiders == 0 { 0.0 } else { r_between };
        for to in 0..n {
            rates[[from, to]] = if from == to {
                1.0 - r_within - r_between
            } else if group_of[from] == group_of[to] {
                r_within / peers as f64
            } else {
                r_between / outsiders as f64
            };
        }
    }
    Ok(MigrationMatrix(rates))
}

/// Migration matrix for a one-dimensional stepping stone model of `n`
/// subpopulations in a row.  Interior subpopulations send `r/2` to
/// each neighbor; without `circular` boundaries the end
/// subpopulations send the whole `r` to their only neighbor.
pub fn stepping_stone_rates(
    r: f64,
    n: usize,
    circular: bool,
) -> Result<MigrationMatrix, DemographyError> {
    check_rate(r)?;
    if n < 2 {
        return Ok(identity());
    }
    let mut rates = Array2::zeros((n, n));
    for sp in 0..n {
        rates[[sp, sp]] = 1.0 - r;
        if circular {
            rates[[sp, (sp + 1) % n]] += r / 2.0;
            rates[[sp, (sp + n - 1) % n]] += r / 2.0;
        } else if sp == 0 {
            rates[[sp, 1]] = r;
        } else if sp == n - 1 {
            rates[[sp, n - 2]] = r;
        } else {
            rates[[sp, sp - 1]] = r / 2.0;
            rates[[sp, sp + 1]] = r / 2.0;
        }
    }
    Ok(MigrationMatrix(rates))
}

/// Migration matrix for a two-dimensional stepping stone model over an
/// `m` by `n` grid of patches, row-major.  Central patches have four
/// neighbors, or eight with `diagonal`.  With `circular` boundaries
/// the grid wraps around; otherwise edge patches spread `r` over the
/// neighbors they do have.
pub fn stepping_stone_2d_rates(
    r: f64,
    m: usize,
    n: usize,
    diagonal: bool,
    circular: bool,
) -> Result<MigrationMatrix, DemographyError> {
    check_rate(r)?;
    if m * n < 2 {
        return Ok(identity());
    }
    let mut rates = Array2::zeros((m * n, m * n));
    for row in 0..m as i64 {
        for col in 0..n as i64 {
            let mut offsets = vec![(-1, 0), (1, 0), (0, -1), (0, 1)];
            if diagonal {
                offsets.extend([(-1, -1), (-1, 1), (1, -1), (1, 1)]);
            }
            let mut neighbors = vec![];
            for (dr, dc) in offsets {
                let (nr, nc) = if circular {
                    (
                        (row + dr).rem_euclid(m as i64),
                        (col + dc).rem_euclid(n as i64),
                    )
                } else {
                    let (nr, nc) = (row + dr, col + dc);
                    if nr < 0 || nr >= m as i64 || nc < 0 || nc >= n as i64 {
                        continue;
                    }
                    (nr, nc)
                };
                // on small grids wrapped neighbors may coincide with
                // each other or with the patch itself
                if (nr, nc) != (row, col) && !neighbors.contains(&(nr, nc)) {
                    neighbors.push((nr, nc));
                }
            }
            let from = (row * n as i64 + col) as usize;
            rates[[from, from]] = 1.0 - r;
            for (nr, nc) in &neighbors {
                rates[[from, (nr * n as i64 + nc) as usize]] = r / neighbors.len() as f64;
            }
        }
    }
    Ok(MigrationMatrix(rates))
}
