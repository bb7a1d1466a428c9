//! Model context: mesh parts, assembly, masks and embedded interfaces
use crate::{
    assembly::{Assembler, AssemblyStats, Progress, SectionParams},
    embedded::{EmbeddedInterfaceParams, EmbeddedNodeInterface},
    events::EventBus,
    mask::{ElementMask, MaskManager, NodeMask, StartTags},
    mesh::Grid,
    mesh_part::{Element, MeshPartRegistry, Region},
    Error, Result,
};
use log::info;
use serde::{Deserialize, Serialize};
use std::{fs::File, io::BufReader, path::Path};

/// Mesh part definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeshPartConfig {
    pub name: String,
    /// Mesh part type name, e.g. `UniformRectangularGrid`
    #[serde(rename = "type")]
    pub part_type: String,
    #[serde(default)]
    pub params: serde_json::Value,
    pub element: Element,
    #[serde(default)]
    pub region: Region,
}

const fn default_merge_points() -> bool {
    true
}

/// Model definition, read from a json file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub mesh_parts: Vec<MeshPartConfig>,
    pub sections: Vec<SectionParams>,
    /// Merge the coincident points of different sections
    #[serde(default = "default_merge_points")]
    pub merge_points: bool,
    #[serde(default)]
    pub start_tags: StartTags,
    #[serde(default)]
    pub embedded_interfaces: Vec<EmbeddedInterfaceParams>,
}

impl ModelConfig {
    pub fn from_file<P: AsRef<Path>>(file_name: P) -> Result<Self> {
        let file = File::open(file_name)?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }
}

/// Everything needed to build a model. The masks are rebuilt each time the
/// model is assembled
#[derive(Debug)]
pub struct Model {
    parts: MeshPartRegistry,
    assembler: Assembler,
    events: EventBus,
    masks: MaskManager,
}

impl Default for Model {
    fn default() -> Self {
        Self::new()
    }
}

impl Model {
    #[must_use]
    pub fn new() -> Self {
        let mut events = EventBus::new();
        let masks = MaskManager::new();
        masks.subscribe(&mut events);
        Self {
            parts: MeshPartRegistry::new(),
            assembler: Assembler::new(),
            events,
            masks,
        }
    }

    /// Create a model from its definition: the mesh parts and sections are
    /// created, the model is assembled and the embedded interfaces are applied
    pub fn from_config(config: &ModelConfig, progress: &mut Progress<'_>) -> Result<Self> {
        let mut model = Self::new();
        model.set_start_tags(config.start_tags);
        for part in &config.mesh_parts {
            model.parts.create_mesh_part(
                &part.name,
                &part.part_type,
                &part.params,
                part.element.clone(),
                part.region,
            )?;
        }
        for section in &config.sections {
            model.create_section(section, progress)?;
        }
        model.assemble(config.merge_points, progress)?;
        for params in &config.embedded_interfaces {
            model.embed_nodes(params)?;
        }
        Ok(model)
    }

    #[must_use]
    pub const fn parts(&self) -> &MeshPartRegistry {
        &self.parts
    }

    pub fn parts_mut(&mut self) -> &mut MeshPartRegistry {
        &mut self.parts
    }

    #[must_use]
    pub const fn assembler(&self) -> &Assembler {
        &self.assembler
    }

    /// Event bus, to subscribe to the assembly events
    pub fn events_mut(&mut self) -> &mut EventBus {
        &mut self.events
    }

    #[must_use]
    pub const fn masks(&self) -> &MaskManager {
        &self.masks
    }

    /// Set the start tags used by the masks
    pub fn set_start_tags(&mut self, start_tags: StartTags) {
        self.masks.set_start_tags(start_tags);
    }

    /// Create an assembly section and return its tag
    pub fn create_section(
        &mut self,
        params: &SectionParams,
        progress: &mut Progress<'_>,
    ) -> Result<usize> {
        self.assembler.create_section(&self.parts, params, progress)
    }

    /// Delete an assembly section; the other sections are retagged
    pub fn delete_section(&mut self, tag: usize) -> Result<()> {
        self.assembler.delete_section(tag)?;
        Ok(())
    }

    /// Assemble all the sections
    pub fn assemble(&mut self, merge_points: bool, progress: &mut Progress<'_>) -> Result<&Grid> {
        if let Err(e) = self
            .assembler
            .assemble(&mut self.events, merge_points, progress)
        {
            // the index may have been built for the rejected grid
            self.masks.invalidate();
            return Err(e);
        }
        self.assembler
            .assembled_mesh()
            .ok_or_else(|| -> Box<dyn std::error::Error> { Error::from("no assembled mesh") })
    }

    #[must_use]
    pub const fn assembled_mesh(&self) -> Option<&Grid> {
        self.assembler.assembled_mesh()
    }

    pub fn stats(&self) -> Result<AssemblyStats> {
        self.assembler.stats()
    }

    /// Mask selecting all the nodes of the assembled grid
    pub fn nodes(&self) -> Result<NodeMask> {
        self.masks.nodes(self.assembler.assembled_mesh())
    }

    /// Mask selecting all the elements of the assembled grid
    pub fn elements(&self) -> Result<ElementMask> {
        self.masks.elements(self.assembler.assembled_mesh())
    }

    /// Compute an embedded interface on the assembled grid
    pub fn embedded_interface(
        &self,
        params: &EmbeddedInterfaceParams,
    ) -> Result<EmbeddedNodeInterface> {
        Ok(
            EmbeddedNodeInterface::new(params, &self.parts, self.assembler.assembled_mesh())?
                .with_generation(self.assembler.generation()),
        )
    }

    /// Replace the assembled grid by the grid patched by an embedded interface,
    /// and rebuild the masks. The interface must have been computed on the
    /// current assembled grid
    pub fn apply_embedded_interface(&mut self, interface: EmbeddedNodeInterface) -> Result<()> {
        let n = interface.len();
        let name = interface.name().to_string();
        if interface.generation() != Some(self.assembler.generation()) {
            return Err(Error::from(&format!(
                "embedded interface {name} was not computed on the current assembled mesh"
            )));
        }
        let grid = interface.into_grid();
        self.masks.rebuild(&grid)?;
        self.assembler.set_assembled_mesh(grid);
        info!("embedded interface {name} applied: {n} nodes");
        Ok(())
    }

    /// Compute and apply an embedded interface, returns the number of
    /// embedded nodes
    pub fn embed_nodes(&mut self, params: &EmbeddedInterfaceParams) -> Result<usize> {
        let interface = self.embedded_interface(params)?;
        let n = interface.len();
        self.apply_embedded_interface(interface)?;
        Ok(n)
    }
}
