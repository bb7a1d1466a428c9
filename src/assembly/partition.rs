//! Cell partitioners
use crate::{mesh::Grid, Error, Result, Vert3d};
use log::debug;

/// Cell partitioners
pub trait Partitioner: Sized {
    /// Create a new partitionner to partition the cells of `grid` into `n_parts`
    fn new(grid: &Grid, n_parts: usize) -> Result<Self>;
    /// Compute the partition index of every cell
    fn compute(&self) -> Result<Vec<usize>>;
    /// Get the number of partitions
    fn n_parts(&self) -> usize;
    /// Get the number of cells in each partition
    fn partition_sizes(&self, parts: &[usize]) -> Vec<usize> {
        let mut res = vec![0; self.n_parts()];
        for &i_part in parts {
            res[i_part] += 1;
        }
        res
    }
    /// Compute the imbalance between the partitions
    /// defined as (max(part_sizes) - min(part_sizes)) / mean(part_sizes)
    fn partition_imbalance(&self, parts: &[usize]) -> f64 {
        let sizes = self.partition_sizes(parts);
        let (min, max, sum) = sizes
            .iter()
            .fold((usize::MAX, 0, 0), |a, &b| (a.0.min(b), a.1.max(b), a.2 + b));
        if sum == 0 {
            return 0.0;
        }
        let avg = sum as f64 / sizes.len() as f64;
        (max - min) as f64 / avg
    }
}

/// Recursive coordinate bisection of the cell centers: at each level, every
/// group of cells is split at the median of its widest extent. The number
/// of partitions must be a power of two
pub struct KdTreePartitioner {
    centers: Vec<Vert3d>,
    n_parts: usize,
}

impl KdTreePartitioner {
    /// Cell ids in every partition
    fn groups(&self) -> Vec<Vec<usize>> {
        let mut groups = vec![(0..self.centers.len()).collect::<Vec<_>>()];
        while groups.len() < self.n_parts {
            groups = groups
                .into_iter()
                .flat_map(|g| {
                    let (a, b) = self.bisect(g);
                    [a, b]
                })
                .collect();
        }
        groups
    }

    fn bisect(&self, mut ids: Vec<usize>) -> (Vec<usize>, Vec<usize>) {
        let Some(&first) = ids.first() else {
            return (Vec::new(), Vec::new());
        };
        let mut mini = self.centers[first];
        let mut maxi = mini;
        for &i in &ids {
            let p = self.centers[i];
            for j in 0..3 {
                mini[j] = mini[j].min(p[j]);
                maxi[j] = maxi[j].max(p[j]);
            }
        }
        let axis = (maxi - mini).imax();
        ids.sort_by(|&i, &j| {
            self.centers[i][axis]
                .total_cmp(&self.centers[j][axis])
                .then(i.cmp(&j))
        });
        let right = ids.split_off(ids.len() / 2);
        (ids, right)
    }
}

impl Partitioner for KdTreePartitioner {
    fn new(grid: &Grid, n_parts: usize) -> Result<Self> {
        if n_parts == 0 || !n_parts.is_power_of_two() {
            return Err(Error::from(&format!(
                "kd-tree partitioning requires a power of two number of partitions, got {n_parts}"
            )));
        }
        Ok(Self {
            centers: grid.cell_centers(),
            n_parts,
        })
    }

    fn compute(&self) -> Result<Vec<usize>> {
        let mut res = vec![usize::MAX; self.centers.len()];
        for (i_part, g) in self.groups().iter().enumerate() {
            for &i in g {
                res[i] = i_part;
            }
        }
        debug!(
            "kd-tree partition of {} cells into {} parts, imbalance = {:.2e}",
            res.len(),
            self.n_parts,
            self.partition_imbalance(&res)
        );
        Ok(res)
    }

    fn n_parts(&self) -> usize {
        self.n_parts
    }
}
