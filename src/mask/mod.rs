//! Node / element selections over a read-only snapshot of the assembled grid
mod element;
mod index;
mod node;

use crate::{
    events::{AssemblyEvent, EventBus, EventKind},
    mesh::Grid,
    Error, Result,
};
use log::debug;
use std::{cell::RefCell, rc::Rc, sync::Arc};

pub use element::ElementMask;
pub use index::{MeshIndex, StartTags};
pub use node::NodeMask;

fn sorted_unique<I: IntoIterator<Item = usize>>(ids: I) -> Vec<usize> {
    let mut res = ids.into_iter().collect::<Vec<_>>();
    res.sort_unstable();
    res.dedup();
    res
}

/// Intersection of two sorted lists
fn intersection(a: &[usize], b: &[usize]) -> Vec<usize> {
    let mut res = Vec::with_capacity(a.len().min(b.len()));
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                res.push(a[i]);
                i += 1;
                j += 1;
            }
        }
    }
    res
}

/// Union of two sorted lists
fn union(a: &[usize], b: &[usize]) -> Vec<usize> {
    let mut res = Vec::with_capacity(a.len() + b.len());
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            std::cmp::Ordering::Less => {
                res.push(a[i]);
                i += 1;
            }
            std::cmp::Ordering::Greater => {
                res.push(b[j]);
                j += 1;
            }
            std::cmp::Ordering::Equal => {
                res.push(a[i]);
                i += 1;
                j += 1;
            }
        }
    }
    res.extend_from_slice(&a[i..]);
    res.extend_from_slice(&b[j..]);
    res
}

/// Elements of `a` not in `b` (sorted lists)
fn difference(a: &[usize], b: &[usize]) -> Vec<usize> {
    a.iter()
        .copied()
        .filter(|x| b.binary_search(x).is_err())
        .collect()
}

#[derive(Debug, Default)]
struct CacheState {
    index: Option<Arc<MeshIndex>>,
    start_tags: StartTags,
}

/// Cache of the `MeshIndex` of the assembled grid. Once subscribed to an
/// `EventBus`, the index is rebuilt every time a grid is assembled
#[derive(Debug, Default, Clone)]
pub struct MaskManager {
    state: Rc<RefCell<CacheState>>,
}

impl MaskManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the index on `PostAssemble` events
    pub fn subscribe(&self, bus: &mut EventBus) -> usize {
        let state = self.state.clone();
        bus.subscribe(EventKind::PostAssemble, move |e| {
            if let AssemblyEvent::PostAssemble(grid) = e {
                let mut state = state.borrow_mut();
                debug!("rebuild the mesh index after assembly");
                let index = MeshIndex::new(grid, state.start_tags)?;
                state.index = Some(Arc::new(index));
            }
            Ok(())
        })
    }

    /// Set the start tags used by the next index. The current index is dropped
    pub fn set_start_tags(&self, start_tags: StartTags) {
        let mut state = self.state.borrow_mut();
        state.start_tags = start_tags;
        state.index = None;
    }

    #[must_use]
    pub fn start_tags(&self) -> StartTags {
        self.state.borrow().start_tags
    }

    /// Drop the current index
    pub fn invalidate(&self) {
        self.state.borrow_mut().index = None;
    }

    #[must_use]
    pub fn is_built(&self) -> bool {
        self.state.borrow().index.is_some()
    }

    /// Rebuild the index from a grid
    pub fn rebuild(&self, grid: &Grid) -> Result<Arc<MeshIndex>> {
        let mut state = self.state.borrow_mut();
        let index = Arc::new(MeshIndex::new(grid, state.start_tags)?);
        state.index = Some(index.clone());
        Ok(index)
    }

    /// Get the current index, or build it from the assembled grid
    pub fn from_assembled(&self, assembled: Option<&Grid>) -> Result<Arc<MeshIndex>> {
        if let Some(index) = &self.state.borrow().index {
            return Ok(index.clone());
        }
        let grid = assembled.ok_or_else(|| -> Box<dyn std::error::Error> {
            Error::from("no mesh has been assembled")
        })?;
        self.rebuild(grid)
    }

    /// Mask selecting all the nodes
    pub fn nodes(&self, assembled: Option<&Grid>) -> Result<NodeMask> {
        Ok(NodeMask::all(self.from_assembled(assembled)?))
    }

    /// Mask selecting all the elements
    pub fn elements(&self, assembled: Option<&Grid>) -> Result<ElementMask> {
        Ok(ElementMask::all(self.from_assembled(assembled)?))
    }
}

#[cfg(test)]
mod tests {
    use super::{difference, intersection, union, MaskManager, StartTags};
    use crate::{
        events::{AssemblyEvent, EventBus},
        mesh::box_grid,
    };
    use std::sync::Arc;

    #[test]
    fn test_set_ops() {
        let a = [1, 3, 5, 7];
        let b = [2, 3, 4, 7, 9];
        assert_eq!(intersection(&a, &b), [3, 7]);
        assert_eq!(union(&a, &b), [1, 2, 3, 4, 5, 7, 9]);
        assert_eq!(difference(&a, &b), [1, 5]);
        assert!(intersection(&a, &[]).is_empty());
    }

    #[test]
    fn test_manager() {
        let masks = MaskManager::new();
        assert!(masks.from_assembled(None).is_err());
        assert!(masks.nodes(None).is_err());

        let g = box_grid(&[0., 1., 2.], &[0., 1.], &[0., 1.]).unwrap();
        let idx = masks.from_assembled(Some(&g)).unwrap();
        assert_eq!(idx.n_nodes(), 12);
        // cached
        let idx2 = masks.from_assembled(None).unwrap();
        assert!(Arc::ptr_eq(&idx, &idx2));
        assert_eq!(masks.elements(None).unwrap().len(), 2);

        // rebuilt on assembly
        let mut bus = EventBus::new();
        masks.subscribe(&mut bus);
        let g = box_grid(&[0., 1., 2., 3.], &[0., 1.], &[0., 1.]).unwrap();
        bus.publish(&AssemblyEvent::PostAssemble(&g)).unwrap();
        let idx3 = masks.from_assembled(None).unwrap();
        assert!(!Arc::ptr_eq(&idx, &idx3));
        assert_eq!(idx3.n_elements(), 3);

        masks.set_start_tags(StartTags {
            node: 0,
            element: 10,
        });
        assert!(!masks.is_built());
        let e = masks.elements(Some(&g)).unwrap();
        assert_eq!(e.by_ids(&[0]).to_tags(None), [10]);
        let n = masks.nodes(None).unwrap();
        assert_eq!(n.by_ids(&[5]).to_tags(None), [5]);
    }
}
