use super::{
    partition::{KdTreePartitioner, Partitioner},
    Progress,
};
use crate::{
    mesh::{DataArray, Grid},
    mesh_part::{MeshPart, MeshPartRegistry},
    to_u16, Error, Result, FEMORA_MAX_NDF, MERGE_TOL,
};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Partitioning algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PartitionAlgorithm {
    /// Recursive bisection of the cell centers
    #[default]
    #[serde(rename = "kd-tree")]
    KdTree,
}

impl PartitionAlgorithm {
    /// Number of partitions actually used when `n` are requested
    #[must_use]
    pub const fn n_parts(self, n: usize) -> usize {
        match self {
            Self::KdTree => n.next_power_of_two(),
        }
    }
}

impl FromStr for PartitionAlgorithm {
    type Err = Box<dyn std::error::Error>;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "kd-tree" => Ok(Self::KdTree),
            _ => Err(Error::from(&format!(
                "invalid partition algorithm {s}, only kd-tree is available"
            ))),
        }
    }
}

impl fmt::Display for PartitionAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::KdTree => write!(f, "kd-tree"),
        }
    }
}

fn default_num_partitions() -> usize {
    1
}

fn default_partition_algorithm() -> String {
    "kd-tree".into()
}

const fn default_merging_points() -> bool {
    true
}

/// Parameters used to create an `AssemblySection`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionParams {
    /// Names of the mesh parts, in merge order
    pub meshparts: Vec<String>,
    #[serde(default = "default_num_partitions")]
    pub num_partitions: usize,
    #[serde(default = "default_partition_algorithm")]
    pub partition_algorithm: String,
    #[serde(default = "default_merging_points")]
    pub merging_points: bool,
}

impl Default for SectionParams {
    fn default() -> Self {
        Self {
            meshparts: Vec::new(),
            num_partitions: default_num_partitions(),
            partition_algorithm: default_partition_algorithm(),
            merging_points: default_merging_points(),
        }
    }
}

impl SectionParams {
    #[must_use]
    pub fn new(meshparts: &[&str], num_partitions: usize) -> Self {
        Self {
            meshparts: meshparts.iter().map(|s| (*s).to_string()).collect(),
            num_partitions,
            ..Self::default()
        }
    }
}

/// A set of mesh parts merged into a single partitioned grid
#[derive(Debug, Clone)]
pub struct AssemblySection {
    tag: Option<usize>,
    meshparts_list: Vec<String>,
    num_partitions: usize,
    partition_algorithm: PartitionAlgorithm,
    merging_points: bool,
    mesh: Option<Grid>,
}

impl AssemblySection {
    /// Validate the parameters and assemble the mesh parts. The section has no
    /// tag until it is registered in an `Assembler`
    pub fn new(
        registry: &MeshPartRegistry,
        params: &SectionParams,
        progress: &mut Progress,
    ) -> Result<Self> {
        if params.meshparts.is_empty() {
            return Err(Error::from("at least one mesh part is required"));
        }
        if params.num_partitions == 0 {
            return Err(Error::from("the number of partitions must be at least 1"));
        }
        let partition_algorithm = params.partition_algorithm.parse::<PartitionAlgorithm>()?;
        let parts = params
            .meshparts
            .iter()
            .map(|name| registry.get(name))
            .collect::<Result<Vec<_>>>()?;

        let mut res = Self {
            tag: None,
            meshparts_list: params.meshparts.clone(),
            num_partitions: partition_algorithm.n_parts(params.num_partitions),
            partition_algorithm,
            merging_points: params.merging_points,
            mesh: None,
        };
        if res.num_partitions != params.num_partitions {
            debug!(
                "{} partitions requested, using {}",
                params.num_partitions, res.num_partitions
            );
        }
        res.check_dofs(&parts);
        res.mesh = Some(res.assemble_mesh(&parts, progress)?);
        Ok(res)
    }

    /// Warn about the mesh parts whose points are merged with the points of
    /// the first part while having a different number of dofs; returns their names
    fn check_dofs<'a>(&self, parts: &[&'a MeshPart]) -> Vec<&'a str> {
        let mut res = Vec::new();
        if !self.merging_points {
            return res;
        }
        let ndof = parts[0].element().ndof;
        for &p in &parts[1..] {
            if p.element().ndof != ndof {
                warn!(
                    "merging points of mesh parts with different numbers of dofs: {} ({}) and {} ({})",
                    parts[0].user_name(),
                    ndof,
                    p.user_name(),
                    p.element().ndof
                );
                res.push(p.user_name());
            }
        }
        res
    }

    /// Copy the grid of a mesh part with its element / material / region data
    fn stamped_grid(part: &MeshPart) -> Result<Grid> {
        let mut g = part.mesh().clone();
        let n_cells = g.n_cells();
        let n_points = g.n_points();
        let elem = part.element();

        for (name, value, what) in [
            ("ElementTag", elem.tag, "element tag"),
            ("MaterialTag", elem.material_tag, "material tag"),
            ("SectionTag", elem.section_tag, "section tag"),
            ("Region", part.region().tag, "region tag"),
            ("MeshTag_cell", part.tag(), "mesh part tag"),
        ] {
            let v = to_u16(value, what)?;
            g.set_cell_array(name, DataArray::from_u16(vec![v; n_cells]))?;
        }
        for (name, value, what) in [
            ("ndf", elem.ndof, "ndf"),
            ("MeshPartTag_pointdata", part.tag(), "mesh part tag"),
        ] {
            let v = to_u16(value, what)?;
            g.set_point_array(name, DataArray::from_u16(vec![v; n_points]))?;
        }

        let has_mass = g
            .point_array("Mass")
            .is_some_and(|m| m.is_compatible(&DataArray::zeros_f32(0, FEMORA_MAX_NDF)));
        if !has_mass {
            g.set_point_array("Mass", DataArray::zeros_f32(n_points, FEMORA_MAX_NDF))?;
        }

        Ok(g)
    }

    fn assemble_mesh(&self, parts: &[&MeshPart], progress: &mut Progress) -> Result<Grid> {
        let tol = if self.merging_points {
            Some(MERGE_TOL)
        } else {
            None
        };

        let n = parts.len();
        let mut acc: Option<Grid> = None;
        for (i, part) in parts.iter().enumerate() {
            progress.report(
                80.0 * i as f64 / n as f64,
                &format!("merging mesh part {}", part.user_name()),
            );
            let g = Self::stamped_grid(part)?;
            acc = Some(match acc {
                None => g,
                Some(a) => a.merge(&g, tol)?,
            });
        }
        let mut mesh = acc.ok_or_else(|| -> Box<dyn std::error::Error> {
            Error::from("no mesh part to assemble")
        })?;

        progress.report(80.0, "partitioning");
        let core = if self.num_partitions > 1 {
            let parts = match self.partition_algorithm {
                PartitionAlgorithm::KdTree => {
                    KdTreePartitioner::new(&mesh, self.num_partitions)?.compute()?
                }
            };
            parts
                .into_iter()
                .map(i32::try_from)
                .collect::<std::result::Result<Vec<_>, _>>()?
        } else {
            vec![0; mesh.n_cells()]
        };
        mesh.set_cell_array("Core", DataArray::from_i32(core))?;
        progress.report(100.0, "done");

        info!(
            "assembled {} mesh parts: {} points, {} cells, {} partitions",
            n,
            mesh.n_points(),
            mesh.n_cells(),
            self.num_partitions
        );

        Ok(mesh)
    }

    /// Tag, only available once the section is registered
    pub fn tag(&self) -> Result<usize> {
        self.tag.ok_or_else(|| -> Box<dyn std::error::Error> {
            Error::from("the assembly section has not been registered yet")
        })
    }

    pub(crate) const fn set_tag(&mut self, tag: usize) {
        self.tag = Some(tag);
    }

    #[must_use]
    pub fn meshparts_list(&self) -> &[String] {
        &self.meshparts_list
    }

    #[must_use]
    pub const fn num_partitions(&self) -> usize {
        self.num_partitions
    }

    #[must_use]
    pub const fn partition_algorithm(&self) -> PartitionAlgorithm {
        self.partition_algorithm
    }

    #[must_use]
    pub const fn merging_points(&self) -> bool {
        self.merging_points
    }

    #[must_use]
    pub const fn mesh(&self) -> Option<&Grid> {
        self.mesh.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::{AssemblySection, PartitionAlgorithm, SectionParams};
    use crate::{
        assembly::Progress,
        error_kind,
        mesh_part::{Element, MeshPartRegistry, MeshPartType, Region},
        ErrorKind, FEMORA_MAX_NDF,
    };

    fn cube(x0: f64, n: usize) -> MeshPartType {
        MeshPartType::UniformRectangularGrid {
            x_min: x0,
            y_min: 0.,
            z_min: 0.,
            x_max: x0 + 1.0,
            y_max: 1.,
            z_max: 1.,
            nx: n,
            ny: n,
            nz: n,
        }
    }

    fn registry() -> MeshPartRegistry {
        let mut reg = MeshPartRegistry::new();
        reg.add_mesh_part(
            "a",
            &cube(0.0, 2),
            Element::new(1, "stdBrick", 3).with_material(1),
            Region::default(),
        )
        .unwrap();
        reg.add_mesh_part(
            "b",
            &cube(1.0, 2),
            Element::new(2, "stdBrick", 6).with_material(2),
            Region { tag: 3 },
        )
        .unwrap();
        reg
    }

    #[test]
    fn test_power_of_two() {
        let reg = registry();
        for (k, expected) in [(1, 1), (3, 4), (5, 8), (8, 8)] {
            let s = AssemblySection::new(
                &reg,
                &SectionParams::new(&["a"], k),
                &mut Progress::none(),
            )
            .unwrap();
            assert_eq!(s.num_partitions(), expected);
            let core = s.mesh().unwrap().cell_array("Core").unwrap().to_i64();
            assert!(core.iter().all(|&c| c >= 0 && c < expected as i64));
        }
    }

    #[test]
    fn test_invalid() {
        let reg = registry();
        let mut params = SectionParams::new(&["a"], 2);
        params.partition_algorithm = "octree".into();
        let err = AssemblySection::new(&reg, &params, &mut Progress::none()).unwrap_err();
        assert_eq!(error_kind(err.as_ref()), Some(ErrorKind::Value));

        let err = AssemblySection::new(&reg, &SectionParams::new(&[], 2), &mut Progress::none())
            .unwrap_err();
        assert_eq!(error_kind(err.as_ref()), Some(ErrorKind::Value));

        let err = AssemblySection::new(&reg, &SectionParams::new(&["a"], 0), &mut Progress::none())
            .unwrap_err();
        assert_eq!(error_kind(err.as_ref()), Some(ErrorKind::Value));

        let err = AssemblySection::new(
            &reg,
            &SectionParams::new(&["a", "c"], 1),
            &mut Progress::none(),
        )
        .unwrap_err();
        assert_eq!(error_kind(err.as_ref()), Some(ErrorKind::Key));

        assert_eq!(
            "kd-tree".parse::<PartitionAlgorithm>().unwrap(),
            PartitionAlgorithm::KdTree
        );
    }

    #[test]
    fn test_merge_different_dofs() {
        // "a" has 3 dofs per node and "b" 6: the points are merged anyway
        let reg = registry();
        let parts = [reg.get("a").unwrap(), reg.get("b").unwrap()];
        let s = AssemblySection::new(
            &reg,
            &SectionParams::new(&["a", "b"], 1),
            &mut Progress::none(),
        )
        .unwrap();
        assert_eq!(s.check_dofs(&parts), ["b"]);
        assert!(s.check_dofs(&[parts[0], parts[0]]).is_empty());
        assert_eq!(s.mesh().unwrap().n_points(), 45);

        let mut params = SectionParams::new(&["a", "b"], 1);
        params.merging_points = false;
        let s = AssemblySection::new(&reg, &params, &mut Progress::none()).unwrap();
        assert!(s.check_dofs(&parts).is_empty());
    }

    #[test]
    fn test_merge() {
        let reg = registry();
        let mut calls = Vec::new();
        let mut cb = |pct: f64, msg: &str| calls.push((pct, msg.to_string()));
        let s = AssemblySection::new(
            &reg,
            &SectionParams::new(&["a", "b"], 2),
            &mut Progress::new(&mut cb),
        )
        .unwrap();
        assert!(s.tag().is_err());
        assert_eq!(s.meshparts_list(), ["a", "b"]);

        let g = s.mesh().unwrap();
        assert_eq!(g.n_cells(), 16);
        // 27 points per part, 9 shared on the x = 1 face
        assert_eq!(g.n_points(), 45);
        g.check().unwrap();

        let mat = g.cell_array("MaterialTag").unwrap().as_u16().unwrap();
        assert_eq!(&mat[..8], [1; 8]);
        assert_eq!(&mat[8..], [2; 8]);
        let region = g.cell_array("Region").unwrap().as_u16().unwrap();
        assert_eq!(&region[8..], [3; 8]);
        let mesh_tag = g.cell_array("MeshTag_cell").unwrap().as_u16().unwrap();
        assert_eq!(&mesh_tag[..8], [1; 8]);
        assert_eq!(&mesh_tag[8..], [2; 8]);

        // the shared points keep the values of the first part
        let ndf = g.point_array("ndf").unwrap().as_u16().unwrap();
        assert_eq!(ndf.iter().filter(|&&x| x == 3).count(), 27);
        assert_eq!(ndf.iter().filter(|&&x| x == 6).count(), 18);

        let mass = g.point_array("Mass").unwrap();
        assert_eq!(mass.n_comp(), FEMORA_MAX_NDF);
        assert_eq!(mass.len(), 45);

        // two partitions, split along x
        let core = g.cell_array("Core").unwrap().as_i32().unwrap();
        assert_eq!(&core[..8], [0; 8]);
        assert_eq!(&core[8..], [1; 8]);

        assert!(!calls.is_empty());
        assert!((calls[calls.len() - 1].0 - 100.0).abs() < 1e-12);
    }

    #[test]
    fn test_no_merge() {
        let reg = registry();
        let mut params = SectionParams::new(&["a", "b"], 1);
        params.merging_points = false;
        let s = AssemblySection::new(&reg, &params, &mut Progress::none()).unwrap();
        let g = s.mesh().unwrap();
        assert_eq!(g.n_points(), 54);
        let core = g.cell_array("Core").unwrap().as_i32().unwrap();
        assert!(core.iter().all(|&c| c == 0));
    }
}
