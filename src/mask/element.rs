use super::{difference, intersection, sorted_unique, union, MeshIndex, NodeMask};
use crate::{mesh::CellType, Error, Result};
use std::sync::Arc;

/// Selection of elements of a `MeshIndex`
#[derive(Debug, Clone)]
pub struct ElementMask {
    mesh: Arc<MeshIndex>,
    ids: Vec<usize>,
}

impl ElementMask {
    /// Select the given elements (invalid indices are ignored)
    #[must_use]
    pub fn new(mesh: Arc<MeshIndex>, ids: &[usize]) -> Self {
        let n = mesh.n_elements();
        let ids = sorted_unique(ids.iter().copied().filter(|&i| i < n));
        Self { mesh, ids }
    }

    pub(super) const fn from_sorted(mesh: Arc<MeshIndex>, ids: Vec<usize>) -> Self {
        Self { mesh, ids }
    }

    /// Select all the elements
    #[must_use]
    pub fn all(mesh: Arc<MeshIndex>) -> Self {
        let ids = (0..mesh.n_elements()).collect();
        Self { mesh, ids }
    }

    #[must_use]
    pub const fn mesh(&self) -> &Arc<MeshIndex> {
        &self.mesh
    }

    /// Selected element indices, sorted
    #[must_use]
    pub fn ids(&self) -> &[usize] {
        &self.ids
    }

    #[must_use]
    pub fn to_list(&self) -> Vec<usize> {
        self.ids.clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Solver tags of the selected elements
    #[must_use]
    pub fn to_tags(&self, start_tag: Option<usize>) -> Vec<usize> {
        let start = start_tag.unwrap_or(self.mesh.start_tags().element);
        self.ids.iter().map(|&i| i + start).collect()
    }

    fn with_ids(&self, ids: Vec<usize>) -> Self {
        Self {
            mesh: self.mesh.clone(),
            ids,
        }
    }

    /// Keep the elements for which `f(mesh_index, element_index)` is true
    #[must_use]
    pub fn by_predicate<F: Fn(&MeshIndex, usize) -> bool>(&self, f: F) -> Self {
        self.with_ids(
            self.ids
                .iter()
                .copied()
                .filter(|&i| f(self.mesh.as_ref(), i))
                .collect(),
        )
    }

    /// Keep the elements in `ids`
    #[must_use]
    pub fn by_ids(&self, ids: &[usize]) -> Self {
        self.with_ids(intersection(&self.ids, &sorted_unique(ids.iter().copied())))
    }

    /// Keep the elements inside a box (bounds included): the centroid if
    /// `use_centroid`, else any of their nodes
    #[must_use]
    pub fn by_bbox(&self, min: [f64; 3], max: [f64; 3], use_centroid: bool) -> Self {
        let inside = |j: usize, x: f64| x >= min[j] && x <= max[j];
        if use_centroid {
            self.by_predicate(|m, i| {
                let c = m.element_centroids()[i];
                (0..3).all(|j| inside(j, c[j]))
            })
        } else {
            self.by_predicate(|m, i| {
                m.element_nodes(i).iter().any(|&k| {
                    let p = m.node_coords()[k];
                    (0..3).all(|j| inside(j, p[j]))
                })
            })
        }
    }

    /// Keep the elements of a given cell type
    #[must_use]
    pub fn by_type(&self, cell_type: CellType) -> Self {
        self.by_predicate(|m, i| m.element_types()[i] == cell_type)
    }

    #[must_use]
    pub fn by_material(&self, tag: usize) -> Self {
        self.by_predicate(|m, i| m.material_tags()[i] == tag)
    }

    #[must_use]
    pub fn by_section(&self, tag: usize) -> Self {
        self.by_predicate(|m, i| m.section_tags()[i] == tag)
    }

    #[must_use]
    pub fn by_region(&self, tag: usize) -> Self {
        self.by_predicate(|m, i| m.region_tags()[i] == tag)
    }

    #[must_use]
    pub fn by_core(&self, core: usize) -> Self {
        self.by_predicate(|m, i| m.core_ids()[i] == core)
    }

    /// Keep the elements created from a given element (`ElementTag`)
    #[must_use]
    pub fn by_element_tag(&self, tag: usize) -> Self {
        self.by_predicate(|m, i| m.element_ids()[i] == tag)
    }

    /// Nodes of the selected elements
    #[must_use]
    pub fn to_nodes(&self) -> NodeMask {
        let ids = sorted_unique(
            self.ids
                .iter()
                .flat_map(|&i| self.mesh.element_nodes(i).iter().copied()),
        );
        NodeMask::new(self.mesh.clone(), &ids)
    }

    fn check_same(&self, other: &Self) -> Result<()> {
        if Arc::ptr_eq(&self.mesh, &other.mesh) {
            Ok(())
        } else {
            Err(Error::from("the masks are defined on different meshes"))
        }
    }

    pub fn union(&self, other: &Self) -> Result<Self> {
        self.check_same(other)?;
        Ok(self.with_ids(union(&self.ids, &other.ids)))
    }

    pub fn intersection(&self, other: &Self) -> Result<Self> {
        self.check_same(other)?;
        Ok(self.with_ids(intersection(&self.ids, &other.ids)))
    }

    pub fn difference(&self, other: &Self) -> Result<Self> {
        self.check_same(other)?;
        Ok(self.with_ids(difference(&self.ids, &other.ids)))
    }
}
