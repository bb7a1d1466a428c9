//! Indices to efficiently locate the nearest vertices or the tetrahedra
//! containing a point
use crate::{mesh::simplices::tet_bcoords, Error, Result, Vert3d};
use kdtree::distance::squared_euclidean;
use nalgebra::SVector;

type Tree<const D: usize> = kdtree::KdTree<f64, usize, [f64; D]>;

fn to_array<const D: usize>(pt: &SVector<f64, D>) -> [f64; D] {
    std::array::from_fn(|i| pt[i])
}

fn kdtree_error(e: kdtree::ErrorKind) -> Box<dyn std::error::Error> {
    Error::from(&format!("kdtree: {e:?}"))
}

/// Point index based on `kdtree`
pub struct PointIndex<const D: usize> {
    tree: Tree<D>,
}

impl<const D: usize> PointIndex<D> {
    /// Create a PointIndex from vertices
    pub fn new<I: Iterator<Item = SVector<f64, D>>>(verts: I) -> Result<Self> {
        let mut res = Self {
            tree: kdtree::KdTree::new(D),
        };
        for (i, pt) in verts.enumerate() {
            res.add(&pt, i)?;
        }
        Ok(res)
    }

    /// Add a vertex with index `i`
    pub fn add(&mut self, pt: &SVector<f64, D>, i: usize) -> Result<()> {
        self.tree.add(to_array(pt), i).map_err(kdtree_error)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Get the index of the nearest point & the squared distance, `None` if
    /// the index is empty
    pub fn nearest_vert(&self, pt: &SVector<f64, D>) -> Result<Option<(usize, f64)>> {
        let r = self
            .tree
            .nearest(pt.as_slice(), 1, &squared_euclidean)
            .map_err(kdtree_error)?;
        Ok(r.first().map(|&(d, &i)| (i, d)))
    }

    /// Get the indices of the points closer than `r` to `pt`, sorted by distance
    pub fn within(&self, pt: &SVector<f64, D>, r: f64) -> Result<Vec<usize>> {
        let res = self
            .tree
            .within(pt.as_slice(), r * r, &squared_euclidean)
            .map_err(kdtree_error)?;
        Ok(res.into_iter().map(|(_, &i)| i).collect())
    }
}

/// Locate the tetrahedron that contains a point among a set of tetrahedra
pub struct TetLocator {
    tets: Vec<[Vert3d; 4]>,
    ids: Vec<usize>,
    centers: PointIndex<3>,
    radius: f64,
}

impl TetLocator {
    /// Create a locator from tetrahedra (vertex coordinates) and their ids
    pub fn new(tets: Vec<[Vert3d; 4]>, ids: Vec<usize>) -> Result<Self> {
        if tets.len() != ids.len() {
            return Err(Error::from(&format!(
                "{} tetrahedra for {} ids",
                tets.len(),
                ids.len()
            )));
        }
        let centers = tets
            .iter()
            .map(|t| t.iter().sum::<Vert3d>() / 4.0)
            .collect::<Vec<_>>();
        let radius = tets
            .iter()
            .zip(centers.iter())
            .flat_map(|(t, c)| t.iter().map(move |v| (v - c).norm()))
            .fold(0.0, f64::max);
        Ok(Self {
            centers: PointIndex::new(centers.into_iter())?,
            tets,
            ids,
            radius,
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tets.is_empty()
    }

    /// Find the id of a tetrahedron that contains `pt` (up to a relative
    /// tolerance `eps` on the barycentric coordinates). If several contain it,
    /// the one with the lowest id is returned
    pub fn locate(&self, pt: &Vert3d, eps: f64) -> Result<Option<usize>> {
        if self.is_empty() {
            return Ok(None);
        }
        let mut res: Option<usize> = None;
        for i in self.centers.within(pt, self.radius * (1.0 + eps))? {
            let Some(b) = tet_bcoords(&self.tets[i], pt) else {
                continue;
            };
            if b.iter().all(|&x| x >= -eps) {
                let id = self.ids[i];
                res = Some(res.map_or(id, |j| j.min(id)));
            }
        }
        Ok(res)
    }
}

#[cfg(test)]
mod tests {
    use super::{PointIndex, TetLocator};
    use crate::{
        mesh::{box_grid, to_simplices::hex2tets},
        Vert3d,
    };
    use rand::{rngs::StdRng, Rng, SeedableRng};

    #[test]
    fn test_nearest() {
        let mut rng = StdRng::seed_from_u64(0);
        let pts = (0..100)
            .map(|_| Vert3d::new(rng.random(), rng.random(), rng.random()))
            .collect::<Vec<_>>();
        let mut tree = PointIndex::new(pts.iter().copied()).unwrap();
        assert_eq!(tree.len(), 100);

        for _ in 0..20 {
            let p = Vert3d::new(rng.random(), rng.random(), rng.random());
            let (i, d) = tree.nearest_vert(&p).unwrap().unwrap();
            let (j, d_ref) = pts
                .iter()
                .enumerate()
                .map(|(j, q)| (j, (p - q).norm_squared()))
                .min_by(|a, b| a.1.total_cmp(&b.1))
                .unwrap();
            assert_eq!(i, j);
            assert!((d - d_ref).abs() < 1e-12);
        }

        let p = Vert3d::new(2., 2., 2.);
        tree.add(&p, 100).unwrap();
        assert_eq!(tree.nearest_vert(&p).unwrap().unwrap().0, 100);
        assert_eq!(tree.within(&p, 0.1).unwrap(), [100]);
    }

    #[test]
    fn test_empty() {
        let tree = PointIndex::<3>::new(std::iter::empty()).unwrap();
        assert!(tree.is_empty());
        assert!(tree.nearest_vert(&Vert3d::zeros()).unwrap().is_none());
    }

    #[test]
    fn test_locate() {
        let g = box_grid(&[0., 1., 2.], &[0., 1.], &[0., 1.]).unwrap();
        let mut tets = Vec::new();
        let mut ids = Vec::new();
        for i in 0..g.n_cells() {
            for (j, t) in hex2tets(g.cell(i)).iter().enumerate() {
                tets.push(t.map(|k| g.point(k)));
                ids.push(5 * i + j);
            }
        }
        let loc = TetLocator::new(tets, ids).unwrap();
        assert_eq!(loc.len(), 10);

        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..50 {
            let p = Vert3d::new(2.0 * rng.random::<f64>(), rng.random(), rng.random());
            let i = loc.locate(&p, 1e-10).unwrap().unwrap();
            assert_eq!(i / 5, usize::from(p[0] > 1.0));
        }
        assert!(loc
            .locate(&Vert3d::new(3., 0.5, 0.5), 1e-10)
            .unwrap()
            .is_none());
    }
}
