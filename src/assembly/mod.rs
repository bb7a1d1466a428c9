//! Assembly of mesh parts into sections, and of sections into the global grid
mod partition;
mod section;
mod stats;

use crate::{
    events::{AssemblyEvent, EventBus},
    mesh::Grid,
    mesh_part::MeshPartRegistry,
    Error, Result, MERGE_TOL,
};
use log::{debug, info};
use std::collections::BTreeMap;

pub use partition::{KdTreePartitioner, Partitioner};
pub use section::{AssemblySection, PartitionAlgorithm, SectionParams};
pub use stats::AssemblyStats;

/// Optional progress callback, called with a percentage and a message
pub struct Progress<'a>(Option<&'a mut dyn FnMut(f64, &str)>);

impl<'a> Progress<'a> {
    #[must_use]
    pub fn new(callback: &'a mut dyn FnMut(f64, &str)) -> Self {
        Self(Some(callback))
    }

    #[must_use]
    pub const fn none() -> Self {
        Self(None)
    }

    /// Call the callback, if any
    pub fn report(&mut self, percent: f64, msg: &str) {
        if let Some(f) = self.0.as_mut() {
            f(percent, msg);
        }
    }
}

/// Owner of the assembly sections and of the assembled grid
#[derive(Debug, Default)]
pub struct Assembler {
    sections: BTreeMap<usize, AssemblySection>,
    assembled_mesh: Option<Grid>,
    generation: usize,
}

impl Assembler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Lowest unused tag, starting from 1
    fn next_free_tag(&self) -> usize {
        let mut tag = 1;
        while self.sections.contains_key(&tag) {
            tag += 1;
        }
        tag
    }

    /// Create and register a section. Nothing is registered if the creation fails
    pub fn create_section(
        &mut self,
        registry: &MeshPartRegistry,
        params: &SectionParams,
        progress: &mut Progress<'_>,
    ) -> Result<usize> {
        let mut section = AssemblySection::new(registry, params, progress)?;
        let tag = self.next_free_tag();
        section.set_tag(tag);
        self.sections.insert(tag, section);
        debug!("assembly section {tag} registered");
        Ok(tag)
    }

    /// Get a section by tag
    pub fn get_section(&self, tag: usize) -> Result<&AssemblySection> {
        self.sections
            .get(&tag)
            .ok_or_else(|| -> Box<dyn std::error::Error> {
                Error::key(&format!("assembly section {tag} does not exist"))
            })
    }

    /// Sorted section tags
    #[must_use]
    pub fn list_assembly_sections(&self) -> Vec<usize> {
        self.sections.keys().copied().collect()
    }

    /// Iterator over the sections, in tag order
    pub fn sections(&self) -> impl Iterator<Item = &AssemblySection> {
        self.sections.values()
    }

    #[must_use]
    pub fn n_sections(&self) -> usize {
        self.sections.len()
    }

    /// Delete a section. The remaining sections are retagged `1..n`
    pub fn delete_section(&mut self, tag: usize) -> Result<AssemblySection> {
        let res = self
            .sections
            .remove(&tag)
            .ok_or_else(|| -> Box<dyn std::error::Error> {
                Error::key(&format!("assembly section {tag} does not exist"))
            })?;
        self.retag_sections();
        Ok(res)
    }

    /// Reassign the tags `1..n` in the current tag order
    fn retag_sections(&mut self) {
        let sections = std::mem::take(&mut self.sections);
        for (i, (old_tag, mut section)) in sections.into_iter().enumerate() {
            let tag = i + 1;
            if tag != old_tag {
                debug!("assembly section {old_tag} -> {tag}");
            }
            section.set_tag(tag);
            self.sections.insert(tag, section);
        }
    }

    /// Remove all the sections and the assembled mesh
    pub fn clear(&mut self) {
        self.sections.clear();
        self.delete_assembled_mesh();
    }

    /// Merge all the sections, in tag order, into the assembled grid. The
    /// `Core` values of every section are offset by the number of partitions of
    /// the previous sections. The grid is stored once the `PostAssemble` and
    /// `ResolveCoreConflicts` subscribers succeeded; on error, the previous
    /// assembled grid is kept
    pub fn assemble(
        &mut self,
        bus: &mut EventBus,
        merge_points: bool,
        progress: &mut Progress<'_>,
    ) -> Result<&Grid> {
        if self.sections.is_empty() {
            return Err(Error::from("No assembly sections have been created"));
        }
        bus.publish(&AssemblyEvent::PreAssemble)?;

        let tol = if merge_points { Some(MERGE_TOL) } else { None };
        let n = self.sections.len();
        let mut acc: Option<Grid> = None;
        let mut offset = 0;
        for (i, (tag, section)) in self.sections.iter().enumerate() {
            progress.report(
                100.0 * i as f64 / n as f64,
                &format!("merging assembly section {tag}"),
            );
            let mut mesh = section
                .mesh()
                .ok_or_else(|| -> Box<dyn std::error::Error> {
                    Error::from("no mesh to assemble")
                })?
                .clone();
            if offset > 0 {
                let shift = i32::try_from(offset)?;
                let core = mesh
                    .cell_array_mut("Core")
                    .and_then(|a| a.as_i32_mut())
                    .ok_or_else(|| -> Box<dyn std::error::Error> {
                        Error::from(&format!("section {tag} has no Core array"))
                    })?;
                for c in core.iter_mut() {
                    *c += shift;
                }
            }
            acc = Some(match acc {
                None => mesh,
                Some(a) => a.merge(&mesh, tol)?,
            });
            offset += section.num_partitions();
        }
        let mesh = acc.ok_or_else(|| -> Box<dyn std::error::Error> {
            Error::from("no mesh to assemble")
        })?;
        progress.report(100.0, "done");
        info!(
            "assembled {n} sections: {} points, {} cells, {offset} partitions",
            mesh.n_points(),
            mesh.n_cells()
        );

        bus.publish(&AssemblyEvent::PostAssemble(&mesh))?;
        bus.publish(&AssemblyEvent::ResolveCoreConflicts)?;

        self.generation += 1;
        let mesh: &Grid = self.assembled_mesh.insert(mesh);
        Ok(mesh)
    }

    #[must_use]
    pub const fn assembled_mesh(&self) -> Option<&Grid> {
        self.assembled_mesh.as_ref()
    }

    /// Counter incremented every time the assembled grid is replaced or deleted
    #[must_use]
    pub const fn generation(&self) -> usize {
        self.generation
    }

    /// Replace the assembled grid
    pub fn set_assembled_mesh(&mut self, grid: Grid) {
        self.assembled_mesh = Some(grid);
        self.generation += 1;
    }

    pub fn delete_assembled_mesh(&mut self) {
        self.assembled_mesh = None;
        self.generation += 1;
    }

    /// Statistics of the assembled grid
    pub fn stats(&self) -> Result<AssemblyStats> {
        let mesh = self
            .assembled_mesh
            .as_ref()
            .ok_or_else(|| -> Box<dyn std::error::Error> {
                Error::from("no mesh has been assembled")
            })?;
        let partitions_per_section = self
            .sections
            .values()
            .map(AssemblySection::num_partitions)
            .collect::<Vec<_>>();
        let mut cells_per_core = vec![0; partitions_per_section.iter().sum::<usize>()];
        if let Some(core) = mesh.cell_array("Core") {
            for c in core.to_i64() {
                let c = usize::try_from(c)?;
                if c >= cells_per_core.len() {
                    cells_per_core.resize(c + 1, 0);
                }
                cells_per_core[c] += 1;
            }
        }
        Ok(AssemblyStats {
            n_points: mesh.n_points(),
            n_cells: mesh.n_cells(),
            n_sections: self.sections.len(),
            partitions_per_section,
            cells_per_core,
        })
    }
}
