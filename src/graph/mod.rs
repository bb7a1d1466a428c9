//! Basic graphs to compute and store connectivities that can not be stored in
//! simple 2d arrays
use crate::{Error, Result};

/// CSR representation of a graph
#[derive(Debug, Default, Clone)]
pub struct CSRGraph {
    ptr: Vec<usize>,
    indices: Vec<usize>,
}

impl CSRGraph {
    /// Compute the vertex to element connectivity from an element to vertex
    /// connectivity with elements of arbitrary sizes. A vertex repeated in an
    /// element appears only once in the element list of that vertex
    pub fn transpose<'a>(
        elems: impl Iterator<Item = &'a [usize]> + Clone,
        n_verts: usize,
    ) -> Result<Self> {
        let mut ptr = vec![0; n_verts + 1];
        for e in elems.clone() {
            for &i in e {
                if i >= n_verts {
                    return Err(Error::from(&format!(
                        "invalid vertex index {i} ({n_verts} vertices)"
                    )));
                }
                ptr[i + 1] += 1;
            }
        }
        for i in 0..n_verts {
            ptr[i + 1] += ptr[i];
        }

        let mut fill = ptr.clone();
        let mut indices = vec![usize::MAX; ptr[n_verts]];
        for (i_elem, e) in elems.enumerate() {
            for &i in e {
                // the element list of a vertex is filled in increasing element order
                if fill[i] > ptr[i] && indices[fill[i] - 1] == i_elem {
                    continue;
                }
                indices[fill[i]] = i_elem;
                fill[i] += 1;
            }
        }

        // drop the slots left empty by repeated vertices
        let mut new_ptr = Vec::with_capacity(n_verts + 1);
        new_ptr.push(0);
        let mut new_indices = Vec::with_capacity(indices.len());
        for i in 0..n_verts {
            new_indices.extend_from_slice(&indices[ptr[i]..fill[i]]);
            new_ptr.push(new_indices.len());
        }

        Ok(Self {
            ptr: new_ptr,
            indices: new_indices,
        })
    }

    /// Get the neighbors of the `i`th vertex
    #[must_use]
    pub fn row(&self, i: usize) -> &[usize] {
        let start = self.ptr[i];
        let end = self.ptr[i + 1];
        &self.indices[start..end]
    }
}

#[cfg(test)]
mod tests {
    use super::CSRGraph;

    #[test]
    fn test_transpose() {
        let elems: Vec<Vec<usize>> = vec![vec![0, 1, 2], vec![1, 3], vec![2, 3, 4, 0]];
        let g = CSRGraph::transpose(elems.iter().map(Vec::as_slice), 6).unwrap();

        assert_eq!(g.row(0), [0, 2]);
        assert_eq!(g.row(1), [0, 1]);
        assert_eq!(g.row(2), [0, 2]);
        assert_eq!(g.row(3), [1, 2]);
        assert_eq!(g.row(4), [2]);
        assert!(g.row(5).is_empty());
    }

    #[test]
    fn test_transpose_repeated() {
        let elems: Vec<Vec<usize>> = vec![vec![0, 1, 0], vec![1]];
        let g = CSRGraph::transpose(elems.iter().map(Vec::as_slice), 2).unwrap();
        assert_eq!(g.row(0), [0]);
        assert_eq!(g.row(1), [0, 1]);
    }

    #[test]
    fn test_invalid() {
        let elems: Vec<Vec<usize>> = vec![vec![0, 3]];
        assert!(CSRGraph::transpose(elems.iter().map(Vec::as_slice), 2).is_err());
    }
}
