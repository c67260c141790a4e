//! Problem configuration.
//!
//! Reads TOML files describing the mesh, material, load, support, solver and
//! output of an elasticity run. Every section has defaults, and the default
//! configuration is the reference cantilever: a 5 × 1 × 1 beam clamped at
//! x = 0 and pulled down by a traction on x = 5.
//!
//! ```toml
//! [mesh]
//! x = { start = 0.0, end = 5.0, cells = 14 }
//! y = { start = 0.0, end = 1.0, cells = 4 }
//! z = [0.0, 0.25, 0.5, 0.75, 1.0]
//!
//! [load]
//! traction = [0.0, -10.0, 0.0]
//! selector = { axis = "x", value = 5.0 }
//! ```

use crate::element::gauss::MAX_ORDER;
use crate::error::{Error, Result};
use crate::material::Material;
use crate::mesh::{linspace, Selector};
use crate::solver::SolverConfig;
use crate::types::{Axis, Vec3};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// One axis partition of the tensor grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PartitionSpec {
    /// `cells` equal intervals between `start` and `end`.
    Uniform { start: f64, end: f64, cells: usize },
    /// Explicit, strictly increasing coordinates.
    Explicit(Vec<f64>),
}

impl PartitionSpec {
    /// Coordinates of the partition.
    pub fn coordinates(&self) -> Vec<f64> {
        match self {
            PartitionSpec::Uniform { start, end, cells } => linspace(*start, *end, cells + 1),
            PartitionSpec::Explicit(values) => values.clone(),
        }
    }

    fn validate(&self, axis: Axis) -> Result<()> {
        match self {
            PartitionSpec::Uniform { start, end, cells } => {
                if *cells == 0 {
                    return Err(Error::Config(format!("mesh.{}: cells must be positive", axis)));
                }
                if !(start.is_finite() && end.is_finite() && start < end) {
                    return Err(Error::Config(format!(
                        "mesh.{}: need finite start < end, got {} and {}",
                        axis, start, end
                    )));
                }
            }
            PartitionSpec::Explicit(values) => {
                if values.len() < 2 {
                    return Err(Error::Config(format!(
                        "mesh.{}: need at least two coordinates",
                        axis
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Axis partitions of the tensor grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeshConfig {
    pub x: PartitionSpec,
    pub y: PartitionSpec,
    pub z: PartitionSpec,
}

impl Default for MeshConfig {
    fn default() -> Self {
        Self {
            x: PartitionSpec::Uniform {
                start: 0.0,
                end: 5.0,
                cells: 14,
            },
            y: PartitionSpec::Uniform {
                start: 0.0,
                end: 1.0,
                cells: 4,
            },
            z: PartitionSpec::Uniform {
                start: 0.0,
                end: 1.0,
                cells: 4,
            },
        }
    }
}

/// Surface traction and optional body force.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadConfig {
    /// Traction vector, force per unit area.
    pub traction: [f64; 3],
    /// Boundary facets whose centroid lies on this plane carry the traction.
    pub selector: Selector,
    /// Body force per unit volume applied to every cell.
    pub body_force: Option<[f64; 3]>,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            traction: [0.0, -10.0, 0.0],
            selector: Selector::plane(Axis::X, 5.0),
            body_force: None,
        }
    }
}

impl LoadConfig {
    pub fn traction_vector(&self) -> Vec3 {
        Vec3::from(self.traction)
    }
}

/// Clamped support: all displacement components of the selected nodes are zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SupportConfig {
    pub selector: Selector,
}

impl Default for SupportConfig {
    fn default() -> Self {
        Self {
            selector: Selector::plane(Axis::X, 0.0),
        }
    }
}

/// Output file and visualization settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// `.vtk` (legacy) or `.vtu` (XML).
    pub path: PathBuf,
    /// Factor applied to displacements when moving the mesh for display.
    pub displacement_scale: f64,
    /// Name of the exported axial strain cell field.
    pub field_name: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("elasticity.vtk"),
            displacement_scale: 1e5,
            field_name: String::from("exx"),
        }
    }
}

/// Unit labels, used only for reporting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnitsConfig {
    pub length: String,
    pub force: String,
    pub stress: String,
}

impl Default for UnitsConfig {
    fn default() -> Self {
        Self {
            length: String::from("m"),
            force: String::from("N"),
            stress: String::from("Pa"),
        }
    }
}

/// Complete description of one elasticity run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProblemConfig {
    /// Gauss points per direction for cell and facet integration.
    pub quadrature_order: usize,
    pub mesh: MeshConfig,
    pub material: Material,
    pub load: LoadConfig,
    pub support: SupportConfig,
    pub solver: SolverConfig,
    pub output: OutputConfig,
    pub units: UnitsConfig,
}

impl Default for ProblemConfig {
    fn default() -> Self {
        Self {
            quadrature_order: 2,
            mesh: MeshConfig::default(),
            material: Material {
                youngs_modulus: 1e9,
                poissons_ratio: 0.3,
            },
            load: LoadConfig::default(),
            support: SupportConfig::default(),
            solver: SolverConfig::default(),
            output: OutputConfig::default(),
            units: UnitsConfig::default(),
        }
    }
}

impl ProblemConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: ProblemConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text).map_err(|e| match e {
            Error::Config(msg) => Error::Config(format!("{}: {}", path.display(), msg)),
            other => other,
        })
    }

    /// Serialize back to TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))
    }

    /// Check value ranges that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        for (axis, partition) in Axis::ALL.iter().zip([&self.mesh.x, &self.mesh.y, &self.mesh.z]) {
            partition.validate(*axis)?;
        }
        if !(1..=MAX_ORDER).contains(&self.quadrature_order) {
            return Err(Error::Config(format!(
                "quadrature_order must be in 1..={}, got {}",
                MAX_ORDER, self.quadrature_order
            )));
        }
        self.material.validate()?;
        self.solver.validate()?;

        if self.load.traction.iter().any(|t| !t.is_finite()) {
            return Err(Error::Config("load.traction must be finite".into()));
        }
        if let Some(f) = self.load.body_force {
            if f.iter().any(|v| !v.is_finite()) {
                return Err(Error::Config("load.body_force must be finite".into()));
            }
        }
        for (name, selector) in [("load", &self.load.selector), ("support", &self.support.selector)] {
            if !(selector.value.is_finite() && selector.tolerance >= 0.0) {
                return Err(Error::Config(format!(
                    "{}.selector needs a finite value and a non-negative tolerance",
                    name
                )));
            }
        }
        if !self.output.displacement_scale.is_finite() {
            return Err(Error::Config("output.displacement_scale must be finite".into()));
        }
        if self.output.field_name.trim().is_empty() {
            return Err(Error::Config("output.field_name must not be empty".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::SolverType;

    #[test]
    fn test_default_is_reference_cantilever() {
        let config = ProblemConfig::default();
        config.validate().unwrap();
        assert_eq!(config.mesh.x.coordinates().len(), 15);
        assert_eq!(config.mesh.y.coordinates().len(), 5);
        assert_eq!(config.material.youngs_modulus, 1e9);
        assert_eq!(config.load.traction, [0.0, -10.0, 0.0]);
        assert_eq!(config.output.displacement_scale, 1e5);
        assert_eq!(config.output.path, PathBuf::from("elasticity.vtk"));
        assert_eq!(config.output.field_name, "exx");
    }

    #[test]
    fn test_empty_document_gives_defaults() {
        let config = ProblemConfig::from_toml_str("").unwrap();
        assert_eq!(config, ProblemConfig::default());
    }

    #[test]
    fn test_parse_full_document() {
        let text = r#"
            quadrature_order = 3

            [mesh]
            x = { start = 0.0, end = 2.0, cells = 4 }
            y = [0.0, 0.5, 1.0]
            z = { start = -1.0, end = 1.0, cells = 2 }

            [material]
            youngs_modulus = 210e9
            poissons_ratio = 0.25

            [load]
            traction = [0.0, 0.0, -1e3]
            selector = { axis = "x", value = 2.0, tolerance = 1e-9 }
            body_force = [0.0, 0.0, -9.81]

            [support]
            selector = { axis = "x", value = 0.0 }

            [solver]
            type = "iterative"
            tolerance = 1e-12

            [output]
            path = "beam.vtu"
            displacement_scale = 100.0
            field_name = "strain_xx"

            [units]
            length = "mm"
        "#;
        let config = ProblemConfig::from_toml_str(text).unwrap();
        assert_eq!(config.quadrature_order, 3);
        assert_eq!(config.mesh.x.coordinates(), vec![0.0, 0.5, 1.0, 1.5, 2.0]);
        assert_eq!(config.mesh.y, PartitionSpec::Explicit(vec![0.0, 0.5, 1.0]));
        assert_eq!(config.material.poissons_ratio, 0.25);
        assert_eq!(config.load.selector.tolerance, 1e-9);
        assert_eq!(config.load.body_force, Some([0.0, 0.0, -9.81]));
        assert_eq!(config.solver.solver_type, SolverType::Iterative);
        assert_eq!(config.solver.max_iterations, SolverConfig::default().max_iterations);
        assert_eq!(config.output.path, PathBuf::from("beam.vtu"));
        assert_eq!(config.units.length, "mm");
        assert_eq!(config.units.force, "N");
    }

    #[test]
    fn test_invalid_values_rejected() {
        let cases = [
            "quadrature_order = 0",
            "[mesh]\nx = { start = 1.0, end = 0.0, cells = 4 }\ny = [0.0, 1.0]\nz = [0.0, 1.0]",
            "[mesh]\nx = [0.0]\ny = [0.0, 1.0]\nz = [0.0, 1.0]",
            "[material]\nyoungs_modulus = -1.0\npoissons_ratio = 0.3",
            "[material]\nyoungs_modulus = 1.0\npoissons_ratio = 0.5",
            "[output]\nfield_name = \"  \"",
            "[support]\nselector = { axis = \"x\", value = 0.0, tolerance = -1.0 }",
        ];
        for text in cases {
            assert!(ProblemConfig::from_toml_str(text).is_err(), "accepted: {}", text);
        }
    }

    #[test]
    fn test_parse_errors_are_config_errors() {
        let result = ProblemConfig::from_toml_str("[solver]\ntype = \"multigrid\"");
        assert!(matches!(result, Err(Error::Config(_))));
        let result = ProblemConfig::from_toml_str("[load]\nselector = { axis = \"w\", value = 0.0 }");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_toml_round_trip() {
        let config = ProblemConfig::default();
        let text = config.to_toml_string().unwrap();
        assert_eq!(ProblemConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn test_missing_file() {
        let result = ProblemConfig::from_file("/nonexistent/brick.toml");
        assert!(matches!(result, Err(Error::Io(_))));
    }
}
