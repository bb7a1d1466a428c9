use super::{
    difference, intersection, sorted_unique, union, ElementMask, MeshIndex,
};
use crate::{Error, Result, Vert3d};
use std::sync::Arc;

/// Selection of nodes of a `MeshIndex`
#[derive(Debug, Clone)]
pub struct NodeMask {
    mesh: Arc<MeshIndex>,
    ids: Vec<usize>,
}

impl NodeMask {
    /// Select the given nodes (invalid ids are ignored)
    #[must_use]
    pub fn new(mesh: Arc<MeshIndex>, ids: &[usize]) -> Self {
        let n = mesh.n_nodes();
        let ids = sorted_unique(ids.iter().copied().filter(|&i| i < n));
        Self { mesh, ids }
    }

    /// Select all the nodes
    #[must_use]
    pub fn all(mesh: Arc<MeshIndex>) -> Self {
        let ids = mesh.node_ids().collect();
        Self { mesh, ids }
    }

    #[must_use]
    pub const fn mesh(&self) -> &Arc<MeshIndex> {
        &self.mesh
    }

    /// Selected node ids, sorted
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

    /// Solver tags of the selected nodes
    #[must_use]
    pub fn to_tags(&self, start_tag: Option<usize>) -> Vec<usize> {
        let start = start_tag.unwrap_or(self.mesh.start_tags().node);
        self.ids.iter().map(|&i| i + start).collect()
    }

    fn with_ids(&self, ids: Vec<usize>) -> Self {
        Self {
            mesh: self.mesh.clone(),
            ids,
        }
    }

    /// Keep the nodes for which `f(node_id, coordinates)` is true
    #[must_use]
    pub fn by_predicate<F: Fn(usize, &Vert3d) -> bool>(&self, f: F) -> Self {
        let coords = self.mesh.node_coords();
        self.with_ids(
            self.ids
                .iter()
                .copied()
                .filter(|&i| f(i, &coords[i]))
                .collect(),
        )
    }

    /// Keep the nodes in `ids`
    #[must_use]
    pub fn by_ids(&self, ids: &[usize]) -> Self {
        self.with_ids(intersection(&self.ids, &sorted_unique(ids.iter().copied())))
    }

    /// Keep the nodes inside a box (bounds included)
    #[must_use]
    pub fn by_bbox(&self, min: [f64; 3], max: [f64; 3]) -> Self {
        self.by_predicate(|_, p| (0..3).all(|j| p[j] >= min[j] && p[j] <= max[j]))
    }

    /// Keep the nodes at a distance lower or equal to `radius` from `point`
    #[must_use]
    pub fn near_point(&self, point: [f64; 3], radius: f64) -> Self {
        let c = Vert3d::from(point);
        let r2 = radius * radius;
        self.by_predicate(|_, p| (p - c).norm_squared() <= r2)
    }

    /// Keep the nodes at a distance lower or equal to `radius` from the
    /// segment `[p1, p2]`
    #[must_use]
    pub fn along_line(&self, p1: [f64; 3], p2: [f64; 3], radius: f64) -> Self {
        let a = Vert3d::from(p1);
        let b = Vert3d::from(p2);
        let u = b - a;
        let l2 = u.norm_squared();
        if l2 == 0.0 {
            return self.near_point(p1, radius);
        }
        let r2 = radius * radius;
        self.by_predicate(|_, p| {
            let t = ((p - a).dot(&u) / l2).clamp(0.0, 1.0);
            (p - (a + t * u)).norm_squared() <= r2
        })
    }

    /// Keep the nodes with one coordinate in `[vmin, vmax]`. `axis` is `x`, `y`
    /// or `z` (case insensitive)
    pub fn along_axis(&self, axis: &str, vmin: f64, vmax: f64) -> Result<Self> {
        let j = match axis.to_lowercase().as_str() {
            "x" => 0,
            "y" => 1,
            "z" => 2,
            _ => {
                return Err(Error::from(&format!(
                    "invalid axis {axis}, expected x, y or z"
                )))
            }
        };
        Ok(self.by_predicate(|_, p| p[j] >= vmin && p[j] <= vmax))
    }

    /// Keep the nodes that belong to a partition
    #[must_use]
    pub fn by_core(&self, core: usize) -> Self {
        let m = self.mesh.node_core_map();
        self.by_predicate(|i, _| m[i].binary_search(&core).is_ok())
    }

    /// Elements with at least one node in the selection
    #[must_use]
    pub fn touching_elements(&self) -> ElementMask {
        let ids = self
            .ids
            .iter()
            .flat_map(|&i| self.mesh.node_elements(i).iter().copied());
        ElementMask::from_sorted(self.mesh.clone(), sorted_unique(ids))
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

#[cfg(test)]
mod tests {
    use super::NodeMask;
    use crate::{
        mask::{MeshIndex, StartTags},
        mesh::{box_grid, uniform_coords, DataArray},
    };
    use rand::{rngs::StdRng, Rng, SeedableRng};
    use std::sync::Arc;

    fn index() -> Arc<MeshIndex> {
        let x = uniform_coords(0.0, 4.0, 4).unwrap();
        let y = uniform_coords(0.0, 2.0, 2).unwrap();
        let z = uniform_coords(0.0, 1.0, 1).unwrap();
        let mut g = box_grid(&x, &y, &z).unwrap();
        let core = g
            .cell_centers()
            .iter()
            .map(|c| i32::from(c[0] > 2.0))
            .collect();
        g.set_cell_array("Core", DataArray::from_i32(core)).unwrap();
        Arc::new(MeshIndex::new(&g, StartTags::default()).unwrap())
    }

    #[test]
    fn test_by_ids() {
        let idx = index();
        let all = NodeMask::all(idx.clone());
        assert_eq!(all.len(), 30);

        let m = all.by_ids(&[]);
        assert_eq!(m.len(), 0);
        assert!(m.is_empty());

        let m = all.by_ids(&[7, 3, 3, 100]);
        assert_eq!(m.to_list(), [3, 7]);
        assert_eq!(m.to_tags(None), [4, 8]);
        assert_eq!(m.to_tags(Some(10)), [13, 17]);

        let m = NodeMask::new(idx, &[4, 2, 4, 31]);
        assert_eq!(m.ids(), [2, 4]);
    }

    #[test]
    fn test_bbox() {
        let idx = index();
        let all = NodeMask::all(idx.clone());
        let mut rng = StdRng::seed_from_u64(2);
        for _ in 0..10 {
            let a = [4.0 * rng.random::<f64>(), 2.0 * rng.random::<f64>(), rng.random()];
            let b = [4.0 * rng.random::<f64>(), 2.0 * rng.random::<f64>(), rng.random()];
            let min = [a[0].min(b[0]), a[1].min(b[1]), a[2].min(b[2])];
            let max = [a[0].max(b[0]), a[1].max(b[1]), a[2].max(b[2])];
            let expected = idx
                .node_coords()
                .iter()
                .enumerate()
                .filter(|(_, p)| (0..3).all(|j| p[j] >= min[j] && p[j] <= max[j]))
                .map(|(i, _)| i)
                .collect::<Vec<_>>();
            assert_eq!(all.by_bbox(min, max).to_list(), expected);
        }

        // bounds are included
        let m = all.by_bbox([1.0, 0.0, 0.0], [1.0, 2.0, 1.0]);
        assert_eq!(m.len(), 6);
    }

    #[test]
    fn test_near_point() {
        let all = NodeMask::all(index());
        let m = all.near_point([1.0, 1.0, 0.0], 1.0);
        // (1,1,0) and its 4 neighbors in the z = 0 plane, (1,1,1)
        assert_eq!(m.len(), 6);
        let m2 = all.near_point([1.0, 1.0, 0.0], 1.0);
        assert_eq!(m.to_list(), m2.to_list());
        assert_eq!(all.len(), 30);
    }

    #[test]
    fn test_along_line() {
        let all = NodeMask::all(index());
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..10 {
            let p = [4.0 * rng.random::<f64>(), 2.0 * rng.random::<f64>(), rng.random()];
            let r = 1.5 * rng.random::<f64>();
            assert_eq!(
                all.along_line(p, p, r).to_list(),
                all.near_point(p, r).to_list()
            );
        }

        // the segment is clamped
        let m = all.along_line([0.0, 0.0, 0.0], [2.0, 0.0, 0.0], 0.1);
        assert_eq!(m.len(), 3);
        for &i in m.ids() {
            let p = m.mesh().node_coords()[i];
            assert!(p[0] <= 2.0 && p[1] == 0.0 && p[2] == 0.0);
        }
    }

    #[test]
    fn test_along_axis() {
        let all = NodeMask::all(index());
        let m = all.along_axis("X", 0.5, 1.5).unwrap();
        assert_eq!(m.len(), 6);
        assert!(m
            .ids()
            .iter()
            .all(|&i| (m.mesh().node_coords()[i][0] - 1.0).abs() < 1e-12));
        assert_eq!(all.along_axis("z", 1.0, 1.0).unwrap().len(), 15);
        assert!(all.along_axis("w", 0.0, 1.0).is_err());
    }

    #[test]
    fn test_core_and_touching() {
        let all = NodeMask::all(index());
        let c0 = all.by_core(0);
        let c1 = all.by_core(1);
        // the x = 2 plane is shared
        assert_eq!(c0.intersection(&c1).unwrap().len(), 6);
        assert_eq!(c0.union(&c1).unwrap().len(), 30);
        assert_eq!(c0.difference(&c1).unwrap().len(), 12);

        let m = all.by_bbox([0.0, 0.0, 0.0], [0.0, 0.0, 0.0]);
        assert_eq!(m.touching_elements().to_list(), [0]);
        let m = all.by_bbox([2.0, 1.0, 0.0], [2.0, 1.0, 0.0]);
        assert_eq!(m.touching_elements().len(), 4);

        let other = NodeMask::all(index());
        assert!(all.union(&other).is_err());
    }
}
