use crate::{
    graph::CSRGraph,
    mesh::{CellType, DataArray, Grid},
    Error, Result, Vert3d,
};
use log::debug;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// First solver tags of the nodes and elements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartTags {
    pub node: usize,
    pub element: usize,
}

impl Default for StartTags {
    fn default() -> Self {
        Self {
            node: 1,
            element: 1,
        }
    }
}

fn to_usize(arr: &DataArray, name: &str) -> Result<Vec<usize>> {
    arr.to_i64()
        .into_iter()
        .map(|x| {
            usize::try_from(x).map_err(|_| -> Box<dyn std::error::Error> {
                Error::from(&format!("negative value {x} in {name}"))
            })
        })
        .collect()
}

/// Read-only snapshot of an assembled grid
#[derive(Debug, Clone)]
pub struct MeshIndex {
    node_coords: Vec<Vert3d>,
    node_ndf: Vec<usize>,
    node_core_map: Vec<Vec<usize>>,
    element_ids: Vec<usize>,
    connectivity: Vec<usize>,
    offsets: Vec<usize>,
    element_centroids: Vec<Vert3d>,
    element_types: Vec<CellType>,
    material_tags: Vec<usize>,
    section_tags: Vec<usize>,
    region_tags: Vec<usize>,
    core_ids: Vec<usize>,
    element_id_to_index: FxHashMap<usize, usize>,
    node_to_elements: CSRGraph,
    start_tags: StartTags,
}

impl MeshIndex {
    /// Build the snapshot. Missing cell arrays are replaced by zeros, element
    /// ids are the `ElementTag` values if present, else the cell indices
    pub fn new(grid: &Grid, start_tags: StartTags) -> Result<Self> {
        grid.check()?;
        let n_cells = grid.n_cells();

        let cell_values = |name: &str| -> Result<Vec<usize>> {
            grid.cell_array(name).map_or_else(
                || {
                    debug!("no {name} cell array, using 0");
                    Ok(vec![0; n_cells])
                },
                |a| to_usize(a, name),
            )
        };

        let element_ids = match grid.cell_array("ElementTag") {
            Some(a) => to_usize(a, "ElementTag")?,
            None => (0..n_cells).collect(),
        };
        let core_ids = cell_values("Core")?;
        let node_ndf = match grid.point_array("ndf") {
            Some(a) => to_usize(a, "ndf")?,
            None => vec![0; grid.n_points()],
        };

        let mut node_core_map = vec![Vec::new(); grid.n_points()];
        for (c, &core) in grid.cells().zip(core_ids.iter()) {
            for &i in c {
                let m: &mut Vec<usize> = &mut node_core_map[i];
                if let Err(j) = m.binary_search(&core) {
                    m.insert(j, core);
                }
            }
        }

        let mut element_id_to_index = FxHashMap::default();
        for (i, &id) in element_ids.iter().enumerate() {
            element_id_to_index.entry(id).or_insert(i);
        }

        let node_to_elements = CSRGraph::transpose(grid.cells(), grid.n_points())?;

        Ok(Self {
            node_coords: grid.points().to_vec(),
            node_ndf,
            node_core_map,
            element_ids,
            connectivity: grid.connectivity().to_vec(),
            offsets: grid.offsets().to_vec(),
            element_centroids: grid.cell_centers(),
            element_types: grid.cell_types().to_vec(),
            material_tags: cell_values("MaterialTag")?,
            section_tags: cell_values("SectionTag")?,
            region_tags: cell_values("Region")?,
            core_ids,
            element_id_to_index,
            node_to_elements,
            start_tags,
        })
    }

    #[must_use]
    pub fn n_nodes(&self) -> usize {
        self.node_coords.len()
    }

    #[must_use]
    pub fn n_elements(&self) -> usize {
        self.element_types.len()
    }

    /// Node ids, i.e. the point indices
    pub fn node_ids(&self) -> impl ExactSizeIterator<Item = usize> {
        0..self.n_nodes()
    }

    #[must_use]
    pub fn node_coords(&self) -> &[Vert3d] {
        &self.node_coords
    }

    #[must_use]
    pub fn node_ndf(&self) -> &[usize] {
        &self.node_ndf
    }

    /// Sorted partitions every node belongs to
    #[must_use]
    pub fn node_core_map(&self) -> &[Vec<usize>] {
        &self.node_core_map
    }

    /// Solver visible element ids
    #[must_use]
    pub fn element_ids(&self) -> &[usize] {
        &self.element_ids
    }

    /// Nodes of the `i`-th element
    #[must_use]
    pub fn element_nodes(&self, i: usize) -> &[usize] {
        &self.connectivity[self.offsets[i]..self.offsets[i + 1]]
    }

    /// Sequential iterator over the element connectivities
    pub fn element_connectivity(&self) -> impl ExactSizeIterator<Item = &[usize]> + '_ {
        (0..self.n_elements()).map(|i| self.element_nodes(i))
    }

    #[must_use]
    pub fn element_centroids(&self) -> &[Vert3d] {
        &self.element_centroids
    }

    #[must_use]
    pub fn element_types(&self) -> &[CellType] {
        &self.element_types
    }

    #[must_use]
    pub fn material_tags(&self) -> &[usize] {
        &self.material_tags
    }

    #[must_use]
    pub fn section_tags(&self) -> &[usize] {
        &self.section_tags
    }

    #[must_use]
    pub fn region_tags(&self) -> &[usize] {
        &self.region_tags
    }

    #[must_use]
    pub fn core_ids(&self) -> &[usize] {
        &self.core_ids
    }

    /// Index of the first element with a given id
    #[must_use]
    pub fn element_index(&self, id: usize) -> Option<usize> {
        self.element_id_to_index.get(&id).copied()
    }

    /// Elements that contain a node
    #[must_use]
    pub fn node_elements(&self, i: usize) -> &[usize] {
        self.node_to_elements.row(i)
    }

    #[must_use]
    pub const fn start_tags(&self) -> StartTags {
        self.start_tags
    }
}
