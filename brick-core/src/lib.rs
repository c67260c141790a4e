//! brick core - linear elasticity on structured hexahedral grids.
//!
//! Finite element library with:
//! - Tensor-product Hex8 meshes with boundary facet selection
//! - Trilinear vector bases for cells and bilinear traces for facets
//! - Form-based parallel assembly using Rayon into CSR sparse matrices
//! - Dirichlet condensation with direct and iterative linear solvers
//! - Strain recovery and VTK export
//!
//! # Architecture
//!
//! The pipeline is built around these abstractions:
//!
//! - [`Mesh`]: Connectivity, nodal coordinates and boundary facets
//! - [`Basis`] trait: Quadrature data and DOF numbering ([`CellBasis`], [`FacetBasis`])
//! - [`BilinearForm`], [`LinearForm`], [`Functional`]: integrands evaluated per quadrature point
//! - [`Solver`] trait: Linear system solution strategies
//! - [`run`]: the configured end-to-end problem, returning a [`Solution`]
//!
//! # Example
//!
//! ```no_run
//! use brick_core::{run, ProblemConfig};
//!
//! let solution = run(&ProblemConfig::default())?;
//! println!("tip deflection: {:?}", solution.tip_deflection(5.0));
//! solution.export("elasticity.vtk", 1e5)?;
//! # Ok::<(), brick_core::Error>(())
//! ```

pub mod assembly;
pub mod basis;
pub mod boundary;
pub mod config;
pub mod element;
pub mod error;
pub mod export;
pub mod form;
pub mod material;
pub mod mesh;
pub mod postprocess;
pub mod problem;
pub mod solver;
pub mod sparse;
pub mod types;

pub use basis::{Basis, CellBasis, DofMap, FacetBasis};
pub use boundary::{condense, CondensedSystem, DirichletSet};
pub use config::ProblemConfig;
pub use element::{Element, VectorElement};
pub use error::{Error, Result};
pub use form::{BilinearForm, Functional, LinearElasticity, LinearForm, StrainComponent, Traction};
pub use material::Material;
pub use mesh::{Mesh, Selector};
pub use problem::{run, Solution};
pub use solver::{Solver, SolverConfig, SolverType};
pub use sparse::CsrMatrix;
pub use types::{Axis, Point3, StrainTensor, Vec3};
