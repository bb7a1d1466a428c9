//! Boundary surface of a grid
use super::{simplices::polygon_normal, Grid};
use crate::{Result, Vert3d};
use log::debug;
use rustc_hash::FxHashMap;

/// Boundary surface of a grid
///   - for volume cells, the faces that belong to only one cell, oriented outwards
///   - for cells of lower dimension, all their points are surface points
#[derive(Debug, Clone)]
pub struct Surface {
    /// Surface points
    pub points: Vec<Vert3d>,
    /// Indices of the surface points in the volume grid
    pub parent_ids: Vec<usize>,
    /// Boundary faces (indices in `points`)
    pub faces: Vec<Vec<usize>>,
}

impl Surface {
    /// Extract the boundary surface
    pub fn new(grid: &Grid) -> Result<Self> {
        let mut faces: FxHashMap<Vec<usize>, (usize, usize, usize)> = FxHashMap::default();
        let mut lower_dim = Vec::new();
        for (i_cell, c) in grid.cells().enumerate() {
            let ct = grid.cell_type(i_cell);
            if ct.dim() < 3 {
                lower_dim.extend_from_slice(c);
                continue;
            }
            for (i_face, f) in ct.faces().iter().enumerate() {
                let mut key = f.iter().map(|&i| c[i]).collect::<Vec<_>>();
                key.sort_unstable();
                faces
                    .entry(key)
                    .and_modify(|e| e.0 += 1)
                    .or_insert((1, i_cell, i_face));
            }
        }

        let mut bdy = faces
            .values()
            .filter(|(n, _, _)| *n == 1)
            .map(|&(_, i_cell, i_face)| (i_cell, i_face))
            .collect::<Vec<_>>();
        bdy.sort_unstable();
        debug!("{} boundary faces", bdy.len());

        let mut new_ids = vec![usize::MAX; grid.n_points()];
        let mut parent_ids = Vec::new();
        let mut add_point = |i: usize| {
            if new_ids[i] == usize::MAX {
                new_ids[i] = parent_ids.len();
                parent_ids.push(i);
            }
            new_ids[i]
        };

        let mut res_faces = Vec::with_capacity(bdy.len());
        for (i_cell, i_face) in bdy {
            let c = grid.cell(i_cell);
            let mut f = grid.cell_type(i_cell).faces()[i_face]
                .iter()
                .map(|&i| c[i])
                .collect::<Vec<_>>();
            let pts = f.iter().map(|&i| grid.point(i)).collect::<Vec<_>>();
            let n = polygon_normal(&pts);
            let fc = pts.iter().sum::<Vert3d>() / pts.len() as f64;
            if n.dot(&(fc - grid.cell_center(i_cell))) < 0.0 {
                f.reverse();
            }
            res_faces.push(f.into_iter().map(&mut add_point).collect());
        }
        for i in lower_dim {
            add_point(i);
        }

        Ok(Self {
            points: parent_ids.iter().map(|&i| grid.point(i)).collect(),
            parent_ids,
            faces: res_faces,
        })
    }

    #[must_use]
    pub fn n_points(&self) -> usize {
        self.points.len()
    }

    /// Area weighted normals at the surface points, normalized. Points that do
    /// not belong to a face get a zero normal
    #[must_use]
    pub fn point_normals(&self) -> Vec<Vert3d> {
        let mut res = vec![Vert3d::zeros(); self.n_points()];
        for f in &self.faces {
            let pts = f.iter().map(|&i| self.points[i]).collect::<Vec<_>>();
            let n = polygon_normal(&pts);
            for &i in f {
                res[i] += n;
            }
        }
        for n in &mut res {
            let l = n.norm();
            if l > 1e-12 {
                *n /= l;
            }
        }
        res
    }
}
