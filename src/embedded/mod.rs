//! Embedding of the nodes of a mesh part into the tetrahedra of other mesh parts
//!
//! The surface nodes of the constrained part (optionally offset along their
//! normals) are located in the tetrahedralized retained parts, and a
//! `POLY_VERTEX` cell `[node, t0, t1, t2, t3]` is added to the assembled grid
//! for every located node.
use crate::{
    mesh::{
        simplices::tet_jacobian, surface::Surface, to_simplices::tetrahedralize, ArrayValues,
        CellType, DataArray, Grid,
    },
    mesh_part::{MeshPart, MeshPartRegistry},
    spatialindex::{PointIndex, TetLocator},
    Error, Result, Vert3d,
};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Tolerance used to match the surface points with the constrained nodes
pub const MATCH_TOL: f64 = 1e-6;

/// Tolerance on the barycentric coordinates when locating points
const LOCATE_TOL: f64 = 1e-10;

const fn default_stiffness() -> f64 {
    1.0e18
}

/// Embedded node element, shared by all the embedded nodes of an interface
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EmbeddedElement {
    pub tag: usize,
    /// Penalty stiffness
    #[serde(default = "default_stiffness")]
    pub k: f64,
    /// Constrain the rotations
    #[serde(default)]
    pub rotational: bool,
    /// Constrain the pressure
    #[serde(default)]
    pub pressure: bool,
}

impl EmbeddedElement {
    #[must_use]
    pub const fn new(tag: usize) -> Self {
        Self {
            tag,
            k: default_stiffness(),
            rotational: false,
            pressure: false,
        }
    }
}

/// Keep only the points whose normal is aligned with `direction`, i.e. with a
/// cosine similarity `>= 1 - tol`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalFilter {
    pub direction: [f64; 3],
    pub tol: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddedInterfaceParams {
    pub name: String,
    /// Mesh part whose nodes are embedded
    pub constrained: String,
    /// Mesh parts in which the nodes are embedded
    pub retained: Vec<String>,
    /// Distance along the outward normals by which the constrained nodes are
    /// moved. The moved points are new points of the grid
    #[serde(default)]
    pub offset: Option<f64>,
    /// Normal filter, used only with an offset
    #[serde(default)]
    pub normal_filter: Option<NormalFilter>,
    pub element: EmbeddedElement,
}

/// Result of the embedding: the patched grid and the orientation of the
/// embedded points. The grid must be handed to the model
/// (`Model::apply_embedded_interface`) to replace the assembled mesh
#[derive(Debug, Clone)]
#[must_use]
pub struct EmbeddedNodeInterface {
    name: String,
    element: EmbeddedElement,
    grid: Grid,
    embedded_points: Vec<usize>,
    orientation: BTreeMap<usize, Vert3d>,
    generation: Option<usize>,
}

/// Constrained node and the point actually embedded
struct Candidate {
    node: usize,
    point: Vert3d,
    normal: Vert3d,
}

impl EmbeddedNodeInterface {
    /// Embed the nodes of `params.constrained` into `params.retained`, the mesh
    /// parts being looked up in `parts`
    pub fn new(
        params: &EmbeddedInterfaceParams,
        parts: &MeshPartRegistry,
        assembled: Option<&Grid>,
    ) -> Result<Self> {
        let grid = assembled.ok_or_else(|| -> Box<dyn std::error::Error> {
            Error::from(&format!(
                "embedded interface {}: no mesh has been assembled",
                params.name
            ))
        })?;
        let constrained = parts.get(&params.constrained)?.tag();
        let retained = params
            .retained
            .iter()
            .map(|name| parts.get(name).map(MeshPart::tag))
            .collect::<Result<Vec<_>>>()?;
        Self::from_tags(params, grid, constrained, &retained)
    }

    /// Same as `new`, with the mesh parts given by their tags (`MeshTag_cell`)
    pub fn from_tags(
        params: &EmbeddedInterfaceParams,
        grid: &Grid,
        constrained: usize,
        retained: &[usize],
    ) -> Result<Self> {
        let name = &params.name;
        if retained.is_empty() {
            return Err(Error::from(&format!(
                "embedded interface {name}: no retained mesh part"
            )));
        }
        if retained.contains(&constrained) {
            return Err(Error::from(&format!(
                "embedded interface {name}: the constrained mesh part is also retained"
            )));
        }

        let part_of = grid
            .cell_array("MeshTag_cell")
            .ok_or_else(|| -> Box<dyn std::error::Error> {
                Error::from("the grid has no MeshTag_cell array")
            })?
            .to_i64()
            .into_iter()
            .map(|t| usize::try_from(t).ok())
            .collect::<Vec<_>>();
        let is_retained = part_of
            .iter()
            .map(|t| t.is_some_and(|t| retained.contains(&t)))
            .collect::<Vec<_>>();

        let mut candidates = Self::candidates(params, grid, &part_of, constrained)?;

        let mut is_retained_node = vec![false; grid.n_points()];
        for (c, _) in grid.cells().zip(&is_retained).filter(|&(_, &r)| r) {
            for &i in c {
                is_retained_node[i] = true;
            }
        }
        let n = candidates.len();
        candidates.retain(|c| !is_retained_node[c.node]);
        if candidates.len() < n {
            debug!(
                "{name}: {} nodes belong to the retained mesh parts",
                n - candidates.len()
            );
        }

        let (tets, parents) = tetrahedralize(grid, &is_retained)?;
        let tet_verts = |i: usize| {
            let c = tets.cell(i);
            [
                tets.point(c[0]),
                tets.point(c[1]),
                tets.point(c[2]),
                tets.point(c[3]),
            ]
        };
        let (verts, ids): (Vec<_>, Vec<_>) = (0..tets.n_cells())
            .filter(|&i| tets.cell_type(i) == CellType::Tetra && is_retained[parents[i]])
            .map(|i| (tet_verts(i), i))
            .unzip();
        let n = candidates.len();
        debug!("{name}: locate {n} points in {} tetrahedra", verts.len());
        let locator = TetLocator::new(verts, ids)?;

        let mut located = Vec::with_capacity(candidates.len());
        for c in candidates {
            if let Some(i) = locator.locate(&c.point, LOCATE_TOL)? {
                located.push((c, i));
            }
        }
        if located.len() < n {
            warn!(
                "{name}: {} points are outside of the retained mesh parts and are not embedded",
                n - located.len()
            );
        }

        if located.iter().any(|&(_, i)| tet_jacobian(&tet_verts(i)) <= 0.0) {
            return Err(Error::geometry("negative jacobians"));
        }

        let mut res = grid.clone();
        let first = res.n_points();
        let new_points = params.offset.is_some();
        if new_points {
            res.add_points(located.iter().map(|(c, _)| c.point));
            let names = res.point_data().keys().cloned().collect::<Vec<_>>();
            for arr_name in names {
                if let Some(arr) = res.point_array_mut(&arr_name) {
                    arr.extend_zeros(located.len());
                }
            }
        }

        let mut embedded_points = Vec::with_capacity(located.len());
        let mut orientation = BTreeMap::new();
        for (k, (c, i)) in located.iter().enumerate() {
            let pt = if new_points { first + k } else { c.node };
            let t = tets.cell(*i);
            res.add_cell(CellType::PolyVertex, &[pt, t[0], t[1], t[2], t[3]])?;
            embedded_points.push(pt);
            orientation.insert(pt, c.normal);
        }

        let n_new = located.len();
        let names = res.cell_data().keys().cloned().collect::<Vec<_>>();
        for arr_name in names {
            let Some(arr) = res.cell_array(&arr_name) else {
                continue;
            };
            let values = match arr_name.as_str() {
                "ElementTag" => vec![params.element.tag as i64; n_new],
                "Core" => {
                    let core = arr.to_i64();
                    located.iter().map(|&(_, i)| core[parents[i]]).collect()
                }
                _ => vec![0; n_new],
            };
            let tail = column_like(arr, values)?;
            if let Some(arr) = res.cell_array_mut(&arr_name) {
                arr.extend(&tail)?;
            }
        }
        res.check()?;

        info!(
            "{name}: {n_new} nodes embedded with element {}",
            params.element.tag
        );

        Ok(Self {
            name: name.clone(),
            element: params.element,
            grid: res,
            embedded_points,
            orientation,
            generation: None,
        })
    }

    /// Surface nodes of the constrained part, offset and filtered
    fn candidates(
        params: &EmbeddedInterfaceParams,
        grid: &Grid,
        part_of: &[Option<usize>],
        constrained: usize,
    ) -> Result<Vec<Candidate>> {
        let cells = (0..grid.n_cells())
            .filter(|&i| part_of[i] == Some(constrained))
            .collect::<Vec<_>>();
        if cells.is_empty() {
            return Err(Error::from(&format!(
                "embedded interface {}: no cell belongs to the constrained mesh part",
                params.name
            )));
        }
        let sub = grid.extract_cells(&cells);
        let surface = Surface::new(&sub.grid)?;

        let tree = PointIndex::<3>::new(sub.grid.points().iter().copied())?;
        let normals = surface.point_normals();
        let mut res = Vec::with_capacity(surface.n_points());
        for (p, n) in surface.points.iter().zip(normals) {
            match tree.nearest_vert(p)? {
                Some((i, d2)) if d2 <= MATCH_TOL * MATCH_TOL => res.push(Candidate {
                    node: sub.parent_point_ids[i],
                    point: *p,
                    normal: n,
                }),
                _ => {
                    return Err(Error::geometry(&format!(
                        "surface point ({}, {}, {}) does not match any constrained node",
                        p[0], p[1], p[2]
                    )))
                }
            }
        }

        if let Some(offset) = params.offset {
            if let Some(filter) = &params.normal_filter {
                let d = Vert3d::from(filter.direction);
                let l = d.norm();
                if l < f64::EPSILON {
                    return Err(Error::from("zero normal filter direction"));
                }
                let d = d / l;
                res.retain(|c| c.normal.dot(&d) >= 1.0 - filter.tol);
            }
            for c in &mut res {
                c.point += offset * c.normal;
            }
        }

        Ok(res)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn element(&self) -> &EmbeddedElement {
        &self.element
    }

    /// The patched grid
    #[must_use]
    pub const fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn into_grid(self) -> Grid {
        self.grid
    }

    /// Record the generation of the assembled grid the interface was computed on
    pub const fn with_generation(mut self, generation: usize) -> Self {
        self.generation = Some(generation);
        self
    }

    #[must_use]
    pub const fn generation(&self) -> Option<usize> {
        self.generation
    }

    /// Indices of the embedded points in the patched grid
    #[must_use]
    pub fn embedded_points(&self) -> &[usize] {
        &self.embedded_points
    }

    /// Number of embedded points
    #[must_use]
    pub fn len(&self) -> usize {
        self.embedded_points.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.embedded_points.is_empty()
    }

    /// Outward normal at every embedded point
    #[must_use]
    pub const fn orientation(&self) -> &BTreeMap<usize, Vert3d> {
        &self.orientation
    }
}

/// Single component array with the type of `arr`
fn column_like(arr: &DataArray, values: Vec<i64>) -> Result<DataArray> {
    if arr.n_comp() != 1 {
        let mut res = arr.select(&[]);
        res.extend_zeros(values.len());
        return Ok(res);
    }
    Ok(match arr.values() {
        ArrayValues::UInt16(_) => DataArray::from_u16(
            values
                .into_iter()
                .map(u16::try_from)
                .collect::<std::result::Result<_, _>>()?,
        ),
        ArrayValues::Int32(_) => DataArray::from_i32(
            values
                .into_iter()
                .map(i32::try_from)
                .collect::<std::result::Result<_, _>>()?,
        ),
        ArrayValues::Float32(_) => DataArray::new(
            ArrayValues::Float32(values.into_iter().map(|x| x as f32).collect()),
            1,
        )?,
        ArrayValues::Float64(_) => {
            DataArray::from_f64(values.into_iter().map(|x| x as f64).collect())
        }
    })
}

#[cfg(test)]
mod tests {
    use super::{EmbeddedElement, EmbeddedInterfaceParams, EmbeddedNodeInterface, NormalFilter};
    use crate::{
        assert_delta, error_kind,
        mesh::{box_grid, simplices::tet_bcoords, CellType, DataArray, Grid},
        mesh_part::MeshPartRegistry,
        ErrorKind, Vert3d, FEMORA_MAX_NDF,
    };

    fn stamp(g: &mut Grid, mesh_tag: u16, core: i32, ndf: u16) {
        let (n_points, n_cells) = (g.n_points(), g.n_cells());
        g.set_cell_array("MeshTag_cell", DataArray::from_u16(vec![mesh_tag; n_cells]))
            .unwrap();
        g.set_cell_array("ElementTag", DataArray::from_u16(vec![mesh_tag; n_cells]))
            .unwrap();
        g.set_cell_array("Core", DataArray::from_i32(vec![core; n_cells]))
            .unwrap();
        g.set_point_array("ndf", DataArray::from_u16(vec![ndf; n_points]))
            .unwrap();
        g.set_point_array("Mass", DataArray::zeros_f32(n_points, FEMORA_MAX_NDF))
            .unwrap();
    }

    /// Two retained hexahedra (part 1) and a small constrained hexahedron
    /// (part 2) inside the first one
    fn grid() -> Grid {
        let mut g = box_grid(&[0., 1., 2.], &[0., 1.], &[0., 1.]).unwrap();
        stamp(&mut g, 1, 0, 3);
        g.set_cell_array("Core", DataArray::from_i32(vec![0, 1]))
            .unwrap();
        let mut c = box_grid(&[0.25, 0.75], &[0.25, 0.75], &[0.25, 0.75]).unwrap();
        stamp(&mut c, 2, 2, 6);
        g.merge(&c, None).unwrap()
    }

    fn params(offset: Option<f64>, normal_filter: Option<NormalFilter>) -> EmbeddedInterfaceParams {
        EmbeddedInterfaceParams {
            name: "interface".to_string(),
            constrained: "inner".to_string(),
            retained: vec!["outer".to_string()],
            offset,
            normal_filter,
            element: EmbeddedElement::new(10),
        }
    }

    fn check_located(g: &Grid, i: usize) {
        let c = g.cell(i);
        assert_eq!(g.cell_type(i), CellType::PolyVertex);
        assert_eq!(c.len(), 5);
        let tet = [g.point(c[1]), g.point(c[2]), g.point(c[3]), g.point(c[4])];
        let b = tet_bcoords(&tet, &g.point(c[0])).unwrap();
        assert!(b.iter().all(|&x| x > -1e-8));
    }

    #[test]
    fn test_embed_nodes() {
        let g = grid();
        assert_eq!(g.n_points(), 20);
        let res = EmbeddedNodeInterface::from_tags(&params(None, None), &g, 2, &[1]).unwrap();
        assert_eq!(res.len(), 8);
        let r = res.grid();
        assert_eq!(r.n_points(), 20);
        assert_eq!(r.n_cells(), 11);
        let mut ids = res.embedded_points().to_vec();
        ids.sort_unstable();
        assert_eq!(ids, (12..20).collect::<Vec<_>>());

        let hex0 = [0, 1, 3, 4, 6, 7, 9, 10];
        for i in 3..11 {
            check_located(r, i);
            assert!(r.cell(i)[1..].iter().all(|j| hex0.contains(j)));
        }
        let core = r.cell_array("Core").unwrap().as_i32().unwrap();
        assert_eq!(core[3..], [0; 8]);
        let tags = r.cell_array("ElementTag").unwrap().as_u16().unwrap();
        assert_eq!(tags[..3], [1, 1, 2]);
        assert_eq!(tags[3..], [10; 8]);
        let mesh_tags = r.cell_array("MeshTag_cell").unwrap().as_u16().unwrap();
        assert_eq!(mesh_tags[3..], [0; 8]);
        let ndf = r.point_array("ndf").unwrap().as_u16().unwrap();
        assert_eq!(ndf[12..], [6; 8]);

        // (0.25, 0.25, 0.25)
        let n = res.orientation()[&12];
        let s = 1.0 / 3.0_f64.sqrt();
        for j in 0..3 {
            assert_delta!(n[j], -s, 1e-12);
        }

        // the input is unchanged
        assert_eq!(g.n_cells(), 3);
    }

    #[test]
    fn test_embed_offset() {
        let g = grid();
        let res = EmbeddedNodeInterface::from_tags(&params(Some(0.1), None), &g, 2, &[1]).unwrap();
        assert_eq!(res.len(), 8);
        let r = res.grid();
        assert_eq!(r.n_points(), 28);
        assert_eq!(r.n_cells(), 11);
        r.check().unwrap();

        let ndf = r.point_array("ndf").unwrap().as_u16().unwrap();
        assert_eq!(ndf[20..], [0; 8]);
        assert_eq!(r.point_array("Mass").unwrap().len(), 28);

        for i in 3..11 {
            check_located(r, i);
            let p = r.cell(i)[0];
            assert!(p >= 20);
            let q = r.point(p) - 0.1 * res.orientation()[&p];
            let d = (12..20)
                .map(|j| (r.point(j) - q).norm())
                .fold(f64::MAX, f64::min);
            assert!(d < 1e-12);
        }
    }

    #[test]
    fn test_embed_filter() {
        let g = grid();
        let filter = NormalFilter {
            direction: [2.0, 0.0, 0.0],
            tol: 0.5,
        };
        let res =
            EmbeddedNodeInterface::from_tags(&params(Some(0.1), Some(filter)), &g, 2, &[1])
                .unwrap();
        assert_eq!(res.len(), 4);
        let r = res.grid();
        assert_eq!(r.n_points(), 24);
        for &p in res.embedded_points() {
            assert_delta!(r.point(p)[0], 0.75 + 0.1 / 3.0_f64.sqrt(), 1e-12);
        }

        // all the points are moved outside of the retained part
        let res =
            EmbeddedNodeInterface::from_tags(&params(Some(1.0), Some(filter)), &g, 2, &[1])
                .unwrap();
        assert!(res.is_empty());
        assert_eq!(res.grid().n_points(), 20);
        assert_eq!(res.grid().n_cells(), 3);
    }

    #[test]
    fn test_retained_nodes() {
        let mut g = box_grid(&[0., 1., 2.], &[0., 1.], &[0., 1.]).unwrap();
        g.add_points([Vert3d::new(0.5, 0.5, 0.5)]);
        g.add_cell(CellType::Line, &[0, 12]).unwrap();
        g.set_cell_array("MeshTag_cell", DataArray::from_u16(vec![1, 1, 2]))
            .unwrap();
        g.set_cell_array("Core", DataArray::from_i32(vec![0, 1, 1]))
            .unwrap();

        let res = EmbeddedNodeInterface::from_tags(&params(None, None), &g, 2, &[1]).unwrap();
        assert_eq!(res.embedded_points(), [12]);
        let r = res.grid();
        assert_eq!(r.n_cells(), 4);
        check_located(r, 3);
        assert_eq!(r.cell_array("Core").unwrap().as_i32().unwrap()[3], 0);
        // lines have no normal
        assert_delta!(res.orientation()[&12].norm(), 0.0, 1e-12);
    }

    #[test]
    fn test_negative_jacobians() {
        let verts = vec![
            Vert3d::new(0., 0., 0.),
            Vert3d::new(1., 0., 0.),
            Vert3d::new(1., 1., 0.),
            Vert3d::new(0., 1., 0.),
            Vert3d::new(0., 0., 1.),
            Vert3d::new(1., 0., 1.),
            Vert3d::new(1., 1., 1.),
            Vert3d::new(0., 1., 1.),
            Vert3d::new(0.5, 0.5, 0.5),
        ];
        let mut g = Grid::from_cells(
            verts,
            &[
                (CellType::Hexahedron, vec![4, 5, 6, 7, 0, 1, 2, 3]),
                (CellType::Vertex, vec![8]),
            ],
        )
        .unwrap();
        g.set_cell_array("MeshTag_cell", DataArray::from_u16(vec![1, 2]))
            .unwrap();

        let err = EmbeddedNodeInterface::from_tags(&params(None, None), &g, 2, &[1]).unwrap_err();
        assert_eq!(error_kind(err.as_ref()), Some(ErrorKind::Geometry));
        assert!(err.to_string().contains("negative jacobians"));
    }

    #[test]
    fn test_invalid() {
        let g = grid();
        assert!(EmbeddedNodeInterface::from_tags(&params(None, None), &g, 2, &[]).is_err());
        assert!(EmbeddedNodeInterface::from_tags(&params(None, None), &g, 2, &[1, 2]).is_err());
        // no constrained cell
        assert!(EmbeddedNodeInterface::from_tags(&params(None, None), &g, 3, &[1]).is_err());

        let parts = MeshPartRegistry::new();
        let err = EmbeddedNodeInterface::new(&params(None, None), &parts, None).unwrap_err();
        assert_eq!(error_kind(err.as_ref()), Some(ErrorKind::Value));
        let err = EmbeddedNodeInterface::new(&params(None, None), &parts, Some(&g)).unwrap_err();
        assert_eq!(error_kind(err.as_ref()), Some(ErrorKind::Key));
    }
}
