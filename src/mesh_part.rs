//! Named mesh parts: a locally generated grid with one element, material and
//! region association
use crate::{
    mesh::{box_grid, geometric_coords, uniform_coords, Grid},
    Error, Result,
};
use log::debug;
use serde::{Deserialize, Serialize};

/// Element associated with a mesh part
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Element {
    pub tag: usize,
    pub element_type: String,
    /// Degrees of freedom per node
    pub ndof: usize,
    #[serde(default)]
    pub material_tag: usize,
    #[serde(default)]
    pub section_tag: usize,
}

impl Element {
    #[must_use]
    pub fn new(tag: usize, element_type: &str, ndof: usize) -> Self {
        Self {
            tag,
            element_type: element_type.to_string(),
            ndof,
            material_tag: 0,
            section_tag: 0,
        }
    }

    #[must_use]
    pub const fn with_material(mut self, material_tag: usize) -> Self {
        self.material_tag = material_tag;
        self
    }

    #[must_use]
    pub const fn with_section(mut self, section_tag: usize) -> Self {
        self.section_tag = section_tag;
        self
    }
}

/// Region, `0` is the default global region
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub tag: usize,
}

/// Mesh part generators
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum MeshPartType {
    /// Box with `nx x ny x nz` uniform hexahedra
    UniformRectangularGrid {
        x_min: f64,
        y_min: f64,
        z_min: f64,
        x_max: f64,
        y_max: f64,
        z_max: f64,
        nx: usize,
        ny: usize,
        nz: usize,
    },
    /// Box with explicit grid line coordinates
    CustomRectangularGrid {
        x: Vec<f64>,
        y: Vec<f64>,
        z: Vec<f64>,
    },
    /// Box with element sizes in geometric progression along each axis
    GeometricRectangularGrid {
        x_min: f64,
        y_min: f64,
        z_min: f64,
        x_max: f64,
        y_max: f64,
        z_max: f64,
        nx: usize,
        ny: usize,
        nz: usize,
        #[serde(default = "unit_ratio")]
        x_ratio: f64,
        #[serde(default = "unit_ratio")]
        y_ratio: f64,
        #[serde(default = "unit_ratio")]
        z_ratio: f64,
    },
    /// User supplied grid
    #[serde(skip)]
    ExternalMesh(Grid),
}

const fn unit_ratio() -> f64 {
    1.0
}

impl MeshPartType {
    /// Names of the available mesh part types
    #[must_use]
    pub const fn type_names() -> [&'static str; 4] {
        [
            "UniformRectangularGrid",
            "CustomRectangularGrid",
            "GeometricRectangularGrid",
            "ExternalMesh",
        ]
    }

    /// Name of the mesh part type
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::UniformRectangularGrid { .. } => "UniformRectangularGrid",
            Self::CustomRectangularGrid { .. } => "CustomRectangularGrid",
            Self::GeometricRectangularGrid { .. } => "GeometricRectangularGrid",
            Self::ExternalMesh(_) => "ExternalMesh",
        }
    }

    /// Create a mesh part type from its name and a JSON object holding its
    /// parameters
    pub fn from_name(name: &str, params: &serde_json::Value) -> Result<Self> {
        if !Self::type_names().contains(&name) {
            return Err(Error::key(&format!(
                "unknown mesh part type {name}, available types: {}",
                Self::type_names().join(", ")
            )));
        }
        if name == "ExternalMesh" {
            return Err(Error::from(
                "ExternalMesh parts are created from a grid, not from parameters",
            ));
        }
        let mut params = match params {
            serde_json::Value::Object(m) => m.clone(),
            serde_json::Value::Null => serde_json::Map::new(),
            _ => return Err(Error::from("mesh part parameters must be an object")),
        };
        params.insert("type".into(), serde_json::Value::String(name.into()));
        Ok(serde_json::from_value(serde_json::Value::Object(params))?)
    }

    /// Generate the grid
    pub fn build(&self) -> Result<Grid> {
        match self {
            Self::UniformRectangularGrid {
                x_min,
                y_min,
                z_min,
                x_max,
                y_max,
                z_max,
                nx,
                ny,
                nz,
            } => box_grid(
                &uniform_coords(*x_min, *x_max, *nx)?,
                &uniform_coords(*y_min, *y_max, *ny)?,
                &uniform_coords(*z_min, *z_max, *nz)?,
            ),
            Self::CustomRectangularGrid { x, y, z } => box_grid(x, y, z),
            Self::GeometricRectangularGrid {
                x_min,
                y_min,
                z_min,
                x_max,
                y_max,
                z_max,
                nx,
                ny,
                nz,
                x_ratio,
                y_ratio,
                z_ratio,
            } => box_grid(
                &geometric_coords(*x_min, *x_max, *nx, *x_ratio)?,
                &geometric_coords(*y_min, *y_max, *ny, *y_ratio)?,
                &geometric_coords(*z_min, *z_max, *nz, *z_ratio)?,
            ),
            Self::ExternalMesh(g) => {
                g.check()?;
                Ok(g.clone())
            }
        }
    }
}

/// Mesh part, immutable once created
#[derive(Debug, Clone)]
pub struct MeshPart {
    tag: usize,
    user_name: String,
    part_type: &'static str,
    mesh: Grid,
    element: Element,
    region: Region,
}

impl MeshPart {
    #[must_use]
    pub const fn tag(&self) -> usize {
        self.tag
    }

    #[must_use]
    pub fn user_name(&self) -> &str {
        &self.user_name
    }

    #[must_use]
    pub const fn part_type(&self) -> &'static str {
        self.part_type
    }

    #[must_use]
    pub const fn mesh(&self) -> &Grid {
        &self.mesh
    }

    #[must_use]
    pub const fn element(&self) -> &Element {
        &self.element
    }

    #[must_use]
    pub const fn region(&self) -> Region {
        self.region
    }
}

/// Mesh parts by user name
#[derive(Debug, Default)]
pub struct MeshPartRegistry {
    parts: Vec<MeshPart>,
    next_tag: usize,
}

impl MeshPartRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            parts: Vec::new(),
            next_tag: 1,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Create a mesh part from a type name and its parameters
    pub fn create_mesh_part(
        &mut self,
        user_name: &str,
        type_name: &str,
        params: &serde_json::Value,
        element: Element,
        region: Region,
    ) -> Result<&MeshPart> {
        let part_type = MeshPartType::from_name(type_name, params)?;
        self.add_mesh_part(user_name, &part_type, element, region)
    }

    /// Create a mesh part
    pub fn add_mesh_part(
        &mut self,
        user_name: &str,
        part_type: &MeshPartType,
        element: Element,
        region: Region,
    ) -> Result<&MeshPart> {
        if user_name.is_empty() {
            return Err(Error::from("mesh part names cannot be empty"));
        }
        if self.parts.iter().any(|p| p.user_name == user_name) {
            return Err(Error::from(&format!(
                "mesh part {user_name} already exists"
            )));
        }
        let mesh = part_type.build()?;
        if mesh.n_cells() == 0 {
            return Err(Error::from(&format!("mesh part {user_name} has no cells")));
        }
        let tag = self.next_tag.max(1);
        self.next_tag = tag + 1;
        debug!(
            "mesh part {user_name}: tag {tag}, {} points, {} cells",
            mesh.n_points(),
            mesh.n_cells()
        );
        self.parts.push(MeshPart {
            tag,
            user_name: user_name.to_string(),
            part_type: part_type.type_name(),
            mesh,
            element,
            region,
        });
        Ok(&self.parts[self.parts.len() - 1])
    }

    /// Get a mesh part by name
    pub fn get(&self, user_name: &str) -> Result<&MeshPart> {
        self.parts
            .iter()
            .find(|p| p.user_name == user_name)
            .ok_or_else(|| -> Box<dyn std::error::Error> {
                Error::key(&format!("mesh part {user_name} does not exist"))
            })
    }

    /// Delete a mesh part. The tags of the other parts are not modified
    pub fn delete(&mut self, user_name: &str) -> Result<MeshPart> {
        let i = self
            .parts
            .iter()
            .position(|p| p.user_name == user_name)
            .ok_or_else(|| -> Box<dyn std::error::Error> {
                Error::key(&format!("mesh part {user_name} does not exist"))
            })?;
        Ok(self.parts.remove(i))
    }

    /// Names of the mesh parts, in tag order
    #[must_use]
    pub fn list(&self) -> Vec<&str> {
        self.parts.iter().map(|p| p.user_name.as_str()).collect()
    }

    /// Iterator over the mesh parts, in tag order
    pub fn iter(&self) -> impl Iterator<Item = &MeshPart> {
        self.parts.iter()
    }

    pub fn clear(&mut self) {
        self.parts.clear();
        self.next_tag = 1;
    }
}
