use core::fmt;
use serde::Serialize;

/// Summary of an assembled model
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssemblyStats {
    pub n_points: usize,
    pub n_cells: usize,
    pub n_sections: usize,
    /// Number of partitions of every section, in tag order
    pub partitions_per_section: Vec<usize>,
    /// Number of cells with a given `Core` value
    pub cells_per_core: Vec<usize>,
}

impl AssemblyStats {
    /// Total number of partitions
    #[must_use]
    pub fn n_partitions(&self) -> usize {
        self.partitions_per_section.iter().sum()
    }

    /// Max/min ratio of the number of cells per core
    #[must_use]
    pub fn core_imbalance(&self) -> f64 {
        let min = self.cells_per_core.iter().copied().min().unwrap_or(0);
        let max = self.cells_per_core.iter().copied().max().unwrap_or(0);
        if min == 0 {
            f64::INFINITY
        } else {
            max as f64 / min as f64
        }
    }
}

impl fmt::Display for AssemblyStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} points, {} cells, {} sections, {} partitions",
            self.n_points,
            self.n_cells,
            self.n_sections,
            self.n_partitions()
        )
    }
}
