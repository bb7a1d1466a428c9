//! Unstructured grids of mixed cell types, represented by
//!   - the points
//!   - the cells, stored as a flat connectivity array and an offset table
//!   - a VTK cell type per cell
//!   - named point and cell attribute arrays
mod arrays;
mod mesh_3d;
pub mod simplices;
pub mod surface;
pub mod to_simplices;

use log::debug;
use std::collections::BTreeMap;

use crate::{spatialindex::PointIndex, Error, Result, Vert3d};
pub use arrays::{ArrayValues, DataArray};
pub use mesh_3d::{box_grid, geometric_coords, uniform_coords};

/// Cell types, numbered as in VTK
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CellType {
    Vertex,
    PolyVertex,
    Line,
    Triangle,
    Quad,
    Tetra,
    Hexahedron,
    Wedge,
    Pyramid,
}

const TETRA_FACES: [&[usize]; 4] = [&[0, 1, 3], &[1, 2, 3], &[2, 0, 3], &[0, 2, 1]];
const HEXA_FACES: [&[usize]; 6] = [
    &[0, 4, 7, 3],
    &[1, 2, 6, 5],
    &[0, 1, 5, 4],
    &[3, 7, 6, 2],
    &[0, 3, 2, 1],
    &[4, 5, 6, 7],
];
const WEDGE_FACES: [&[usize]; 5] = [
    &[0, 1, 2],
    &[3, 5, 4],
    &[0, 3, 4, 1],
    &[1, 4, 5, 2],
    &[2, 5, 3, 0],
];
const PYRAMID_FACES: [&[usize]; 5] = [
    &[0, 3, 2, 1],
    &[0, 1, 4],
    &[1, 2, 4],
    &[2, 3, 4],
    &[3, 0, 4],
];

impl CellType {
    /// VTK cell type id
    #[must_use]
    pub const fn vtk_id(self) -> u8 {
        match self {
            Self::Vertex => 1,
            Self::PolyVertex => 2,
            Self::Line => 3,
            Self::Triangle => 5,
            Self::Quad => 9,
            Self::Tetra => 10,
            Self::Hexahedron => 12,
            Self::Wedge => 13,
            Self::Pyramid => 14,
        }
    }

    /// Cell type from a VTK cell type id
    #[must_use]
    pub const fn from_vtk_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(Self::Vertex),
            2 => Some(Self::PolyVertex),
            3 => Some(Self::Line),
            5 => Some(Self::Triangle),
            9 => Some(Self::Quad),
            10 => Some(Self::Tetra),
            12 => Some(Self::Hexahedron),
            13 => Some(Self::Wedge),
            14 => Some(Self::Pyramid),
            _ => None,
        }
    }

    /// Number of points, `None` for poly-vertices
    #[must_use]
    pub const fn n_verts(self) -> Option<usize> {
        match self {
            Self::Vertex => Some(1),
            Self::PolyVertex => None,
            Self::Line => Some(2),
            Self::Triangle => Some(3),
            Self::Quad | Self::Tetra => Some(4),
            Self::Hexahedron => Some(8),
            Self::Wedge => Some(6),
            Self::Pyramid => Some(5),
        }
    }

    /// Topological dimension
    #[must_use]
    pub const fn dim(self) -> usize {
        match self {
            Self::Vertex | Self::PolyVertex => 0,
            Self::Line => 1,
            Self::Triangle | Self::Quad => 2,
            Self::Tetra | Self::Hexahedron | Self::Wedge | Self::Pyramid => 3,
        }
    }

    /// Local faces of volume cells (empty for other cells)
    #[must_use]
    pub const fn faces(self) -> &'static [&'static [usize]] {
        match self {
            Self::Tetra => &TETRA_FACES,
            Self::Hexahedron => &HEXA_FACES,
            Self::Wedge => &WEDGE_FACES,
            Self::Pyramid => &PYRAMID_FACES,
            _ => &[],
        }
    }
}

/// Unstructured grid with point and cell attribute arrays
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Grid {
    points: Vec<Vert3d>,
    connectivity: Vec<usize>,
    offsets: Vec<usize>,
    cell_types: Vec<CellType>,
    point_data: BTreeMap<String, DataArray>,
    cell_data: BTreeMap<String, DataArray>,
}

/// Subset of the cells of a `Grid`, with information about the point and
/// cell ids in the parent grid
pub struct SubGrid {
    /// Grid
    pub grid: Grid,
    /// Indices of the points of `grid` in the parent grid
    pub parent_point_ids: Vec<usize>,
    /// Indices of the cells of `grid` in the parent grid
    pub parent_cell_ids: Vec<usize>,
}

impl Grid {
    /// Create a grid with points and no cells
    #[must_use]
    pub fn new(points: Vec<Vert3d>) -> Self {
        Self {
            points,
            connectivity: Vec::new(),
            offsets: vec![0],
            cell_types: Vec::new(),
            point_data: BTreeMap::new(),
            cell_data: BTreeMap::new(),
        }
    }

    /// Create a grid from points and cells
    pub fn from_cells(points: Vec<Vert3d>, cells: &[(CellType, Vec<usize>)]) -> Result<Self> {
        let mut res = Self::new(points);
        for (ct, c) in cells {
            res.add_cell(*ct, c)?;
        }
        Ok(res)
    }

    #[must_use]
    pub fn n_points(&self) -> usize {
        self.points.len()
    }

    #[must_use]
    pub fn n_cells(&self) -> usize {
        self.cell_types.len()
    }

    #[must_use]
    pub fn point(&self, i: usize) -> Vert3d {
        self.points[i]
    }

    #[must_use]
    pub fn points(&self) -> &[Vert3d] {
        &self.points
    }

    /// Point indices of the `i`-th cell
    #[must_use]
    pub fn cell(&self, i: usize) -> &[usize] {
        &self.connectivity[self.offsets[i]..self.offsets[i + 1]]
    }

    #[must_use]
    pub fn cell_type(&self, i: usize) -> CellType {
        self.cell_types[i]
    }

    #[must_use]
    pub fn cell_types(&self) -> &[CellType] {
        &self.cell_types
    }

    /// Sequential iterator over the cells
    pub fn cells(&self) -> impl ExactSizeIterator<Item = &[usize]> + Clone + '_ {
        (0..self.n_cells()).map(|i| self.cell(i))
    }

    /// Flat connectivity buffer
    #[must_use]
    pub fn connectivity(&self) -> &[usize] {
        &self.connectivity
    }

    /// Offsets of the cells in the connectivity buffer (length = # of cells + 1)
    #[must_use]
    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    /// Add a cell. Cell arrays are not extended
    pub fn add_cell(&mut self, cell_type: CellType, ids: &[usize]) -> Result<()> {
        if let Some(n) = cell_type.n_verts() {
            if n != ids.len() {
                return Err(Error::from(&format!(
                    "{cell_type:?} expects {n} points, got {}",
                    ids.len()
                )));
            }
        }
        if let Some(&i) = ids.iter().find(|&&i| i >= self.n_points()) {
            return Err(Error::from(&format!(
                "invalid point index {i} ({} points)",
                self.n_points()
            )));
        }
        self.connectivity.extend_from_slice(ids);
        self.offsets.push(self.connectivity.len());
        self.cell_types.push(cell_type);
        Ok(())
    }

    /// Append points. Point arrays are not extended
    pub fn add_points<I: IntoIterator<Item = Vert3d>>(&mut self, pts: I) {
        self.points.extend(pts);
    }

    /// Point arrays
    #[must_use]
    pub const fn point_data(&self) -> &BTreeMap<String, DataArray> {
        &self.point_data
    }

    /// Cell arrays
    #[must_use]
    pub const fn cell_data(&self) -> &BTreeMap<String, DataArray> {
        &self.cell_data
    }

    #[must_use]
    pub fn point_array(&self, name: &str) -> Option<&DataArray> {
        self.point_data.get(name)
    }

    #[must_use]
    pub fn cell_array(&self, name: &str) -> Option<&DataArray> {
        self.cell_data.get(name)
    }

    pub fn cell_array_mut(&mut self, name: &str) -> Option<&mut DataArray> {
        self.cell_data.get_mut(name)
    }

    pub fn point_array_mut(&mut self, name: &str) -> Option<&mut DataArray> {
        self.point_data.get_mut(name)
    }

    /// Set (or replace) a point array; it must have one tuple per point
    pub fn set_point_array(&mut self, name: &str, arr: DataArray) -> Result<()> {
        if arr.len() != self.n_points() {
            return Err(Error::from(&format!(
                "point array {name}: {} tuples for {} points",
                arr.len(),
                self.n_points()
            )));
        }
        self.point_data.insert(name.to_string(), arr);
        Ok(())
    }

    /// Set (or replace) a cell array; it must have one tuple per cell
    pub fn set_cell_array(&mut self, name: &str, arr: DataArray) -> Result<()> {
        if arr.len() != self.n_cells() {
            return Err(Error::from(&format!(
                "cell array {name}: {} tuples for {} cells",
                arr.len(),
                self.n_cells()
            )));
        }
        self.cell_data.insert(name.to_string(), arr);
        Ok(())
    }

    /// Check that all arrays have one tuple per point / cell
    pub fn check(&self) -> Result<()> {
        for (name, arr) in &self.point_data {
            if arr.len() != self.n_points() {
                return Err(Error::from(&format!(
                    "point array {name} has {} tuples, expected {}",
                    arr.len(),
                    self.n_points()
                )));
            }
        }
        for (name, arr) in &self.cell_data {
            if arr.len() != self.n_cells() {
                return Err(Error::from(&format!(
                    "cell array {name} has {} tuples, expected {}",
                    arr.len(),
                    self.n_cells()
                )));
            }
        }
        Ok(())
    }

    /// Get the center of the i-th cell, i.e. the mean of its points
    #[must_use]
    pub fn cell_center(&self, i: usize) -> Vert3d {
        let c = self.cell(i);
        let mut res = Vert3d::zeros();
        for &j in c {
            res += self.points[j];
        }
        res / c.len().max(1) as f64
    }

    /// Get the centers of all the cells
    #[must_use]
    pub fn cell_centers(&self) -> Vec<Vert3d> {
        (0..self.n_cells()).map(|i| self.cell_center(i)).collect()
    }

    /// Get the bounding box
    #[must_use]
    pub fn bounding_box(&self) -> Option<(Vert3d, Vert3d)> {
        let first = self.points.first()?;
        let mut mini = *first;
        let mut maxi = *first;
        for p in &self.points {
            for j in 0..3 {
                mini[j] = f64::min(mini[j], p[j]);
                maxi[j] = f64::max(maxi[j], p[j]);
            }
        }
        Some((mini, maxi))
    }

    /// Extract the cells with the given indices. The points used by these
    /// cells are renumbered in order of first appearance
    #[must_use]
    pub fn extract_cells(&self, ids: &[usize]) -> SubGrid {
        let mut new_point_ids = vec![usize::MAX; self.n_points()];
        let mut parent_point_ids = Vec::new();
        for &i in ids {
            for &j in self.cell(i) {
                if new_point_ids[j] == usize::MAX {
                    new_point_ids[j] = parent_point_ids.len();
                    parent_point_ids.push(j);
                }
            }
        }

        let mut grid = Self::new(parent_point_ids.iter().map(|&i| self.points[i]).collect());
        for &i in ids {
            grid.connectivity
                .extend(self.cell(i).iter().map(|&j| new_point_ids[j]));
            grid.offsets.push(grid.connectivity.len());
            grid.cell_types.push(self.cell_types[i]);
        }
        for (name, arr) in &self.point_data {
            grid.point_data
                .insert(name.clone(), arr.select(&parent_point_ids));
        }
        for (name, arr) in &self.cell_data {
            grid.cell_data.insert(name.clone(), arr.select(ids));
        }

        SubGrid {
            grid,
            parent_point_ids,
            parent_cell_ids: ids.to_vec(),
        }
    }

    /// Merge `other` into a copy of `self`
    ///   - the points of `other` are appended and its cells renumbered accordingly
    ///   - if `merge_tol` is not None, the points of `other` closer than the tolerance to
    ///     a point of `self` are identified with it (the existing point keeps its attribute
    ///     values); coincident points within `self` or within `other` are kept
    ///   - arrays are kept only if they exist with the same type in both grids
    pub fn merge(&self, other: &Self, merge_tol: Option<f64>) -> Result<Self> {
        let mut res = self.clone();
        let mut new_ids = Vec::with_capacity(other.n_points());
        let mut added = Vec::with_capacity(other.n_points());

        if let Some(tol) = merge_tol {
            let tree = PointIndex::new(self.points.iter().copied())?;
            for (i, p) in other.points.iter().enumerate() {
                match tree.nearest_vert(p)? {
                    Some((j, d2)) if d2 <= tol * tol => new_ids.push(j),
                    _ => {
                        let j = res.points.len();
                        res.points.push(*p);
                        new_ids.push(j);
                        added.push(i);
                    }
                }
            }
            debug!(
                "merge: {} of {} points identified with existing points",
                other.n_points() - added.len(),
                other.n_points()
            );
        } else {
            let n = res.points.len();
            res.points.extend_from_slice(&other.points);
            new_ids.extend(n..n + other.n_points());
            added.extend(0..other.n_points());
        }

        for (ct, c) in other.cell_types.iter().zip(other.cells()) {
            res.connectivity.extend(c.iter().map(|&j| new_ids[j]));
            res.offsets.push(res.connectivity.len());
            res.cell_types.push(*ct);
        }

        let mut point_data = BTreeMap::new();
        for (name, arr) in &self.point_data {
            match other.point_data.get(name) {
                Some(o) if arr.is_compatible(o) => {
                    let mut arr = arr.clone();
                    arr.extend(&o.select(&added))?;
                    point_data.insert(name.clone(), arr);
                }
                _ => debug!("merge: drop point array {name}"),
            }
        }
        res.point_data = point_data;

        let mut cell_data = BTreeMap::new();
        for (name, arr) in &self.cell_data {
            match other.cell_data.get(name) {
                Some(o) if arr.is_compatible(o) => {
                    let mut arr = arr.clone();
                    arr.extend(o)?;
                    cell_data.insert(name.clone(), arr);
                }
                _ => debug!("merge: drop cell array {name}"),
            }
        }
        res.cell_data = cell_data;

        Ok(res)
    }
}
