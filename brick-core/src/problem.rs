//! End-to-end elasticity run.
//!
//! [`run`] drives the whole pipeline for a [`ProblemConfig`]: mesh, bases,
//! stiffness and load assembly, support condensation, solve and strain
//! recovery. The returned [`Solution`] is the only way to reach
//! [`Solution::export`], so a failed run never writes an output file.

use crate::assembly::{assemble_matrix, assemble_vector};
use crate::basis::{Basis, CellBasis, FacetBasis};
use crate::boundary::{condense, DirichletSet};
use crate::config::ProblemConfig;
use crate::error::{Error, Result};
use crate::export::write_vtk_with_points;
use crate::form::{BodyForce, LinearElasticity, StrainComponent, Traction, VonMises};
use crate::mesh::{Mesh, Selector};
use crate::postprocess::elemental_mean;
use crate::solver::{select_solver, solve_condensed, SolveStats};
use crate::types::{Axis, Vec3};
use std::path::Path;
use tracing::{debug, info, warn};

/// Name of the exported von Mises cell field.
pub const VON_MISES_FIELD: &str = "von_mises";

/// Name of the exported nodal displacement field.
pub const DISPLACEMENT_FIELD: &str = "displacement";

/// Result of a successful run.
#[derive(Debug, Clone)]
pub struct Solution {
    /// Undeformed mesh.
    pub mesh: Mesh,
    /// Nodal displacements, interleaved per node.
    pub displacement: Vec<f64>,
    /// Volume-averaged ε_xx per cell.
    pub exx: Vec<f64>,
    /// Volume-averaged von Mises stress per cell.
    pub von_mises: Vec<f64>,
    /// Sum of the assembled load vector per axis.
    pub load_resultant: Vec3,
    /// Linear solve statistics.
    pub stats: SolveStats,
    /// Cell field name used for `exx` on export.
    pub field_name: String,
}

impl Solution {
    /// Displacement vector of one node.
    pub fn node_displacement(&self, node: usize) -> Option<Vec3> {
        let base = 3 * node;
        self.displacement
            .get(base..base + 3)
            .map(|u| Vec3::new(u[0], u[1], u[2]))
    }

    /// Mean displacement over the nodes lying on `selector`.
    pub fn mean_displacement(&self, selector: &Selector) -> Option<Vec3> {
        let nodes = self.mesh.nodes_satisfying(|p| selector.contains(p));
        if nodes.is_empty() {
            return None;
        }
        let sum = nodes
            .iter()
            .filter_map(|&n| self.node_displacement(n))
            .fold(Vec3::zeros(), |acc, u| acc + u);
        Some(sum / nodes.len() as f64)
    }

    /// Mean y-displacement of the nodes on the plane x = `x`.
    pub fn tip_deflection(&self, x: f64) -> Option<f64> {
        self.mean_displacement(&Selector::plane(Axis::X, x))
            .map(|u| u[Axis::Y.index()])
    }

    /// Node with the largest displacement magnitude, and that magnitude.
    pub fn max_displacement(&self) -> (usize, f64) {
        (0..self.mesh.n_nodes())
            .filter_map(|n| self.node_displacement(n).map(|u| (n, u.norm())))
            .fold((0, 0.0), |best, cur| if cur.1 > best.1 { cur } else { best })
    }

    /// Mesh with nodes moved by `scale` times the displacement.
    pub fn displaced_mesh(&self, scale: f64) -> Result<Mesh> {
        self.mesh.translated(&self.displacement, scale)
    }

    /// Write the displaced mesh with displacement, ε_xx and von Mises fields.
    pub fn export(&self, path: impl AsRef<Path>, scale: f64) -> Result<()> {
        let displaced = self.displaced_mesh(scale)?;
        write_vtk_with_points(
            path,
            &displaced,
            &[(DISPLACEMENT_FIELD, self.displacement.as_slice())],
            &[
                (self.field_name.as_str(), self.exx.as_slice()),
                (VON_MISES_FIELD, self.von_mises.as_slice()),
            ],
        )
    }
}

/// Build the tensor mesh described by the configuration.
pub fn build_mesh(config: &ProblemConfig) -> Result<Mesh> {
    Mesh::init_tensor(
        &config.mesh.x.coordinates(),
        &config.mesh.y.coordinates(),
        &config.mesh.z.coordinates(),
    )
}

/// Solve the elasticity problem described by `config`.
pub fn run(config: &ProblemConfig) -> Result<Solution> {
    config.validate()?;
    info!(
        length = %config.units.length,
        force = %config.units.force,
        stress = %config.units.stress,
        "starting elasticity run"
    );

    let mesh = build_mesh(config)?;
    info!(n_nodes = mesh.n_nodes(), n_elements = mesh.n_elements(), "built mesh");

    let order = config.quadrature_order;
    let basis = CellBasis::new(&mesh, order)?;

    let load_selector = config.load.selector;
    let load_facets = mesh.facets_satisfying(|p| load_selector.contains(p));
    if load_facets.is_empty() {
        return Err(Error::EmptySelection(format!(
            "no boundary facet lies on the load plane {} = {}",
            load_selector.axis, load_selector.value
        )));
    }
    let facet_basis = FacetBasis::new(&mesh, &load_facets, order)?;
    debug!(n_facets = load_facets.len(), area = facet_basis.area(), "selected load facets");

    let support_selector = config.support.selector;
    let support_nodes = mesh.nodes_satisfying(|p| support_selector.contains(p));
    if support_nodes.is_empty() {
        return Err(Error::EmptySelection(format!(
            "no node lies on the support plane {} = {}",
            support_selector.axis, support_selector.value
        )));
    }
    let fixed = DirichletSet::clamp_nodes(basis.dofmap(), &support_nodes);

    let material = config.material;
    let elasticity = LinearElasticity::new(material.lame_lambda(), material.lame_mu());
    let stiffness = assemble_matrix(&basis, &elasticity)?;
    info!(n_dofs = basis.n_dofs(), nnz = stiffness.nnz(), "assembled stiffness");

    let traction = config.load.traction_vector();
    let mut rhs = assemble_vector(&facet_basis, &Traction { t: traction })?;
    if let Some(f) = config.load.body_force {
        let body = assemble_vector(&basis, &BodyForce { f: Vec3::from(f) })?;
        for (r, b) in rhs.iter_mut().zip(body) {
            *r += b;
        }
    }
    if traction.norm() == 0.0 && config.load.body_force.map_or(true, |f| Vec3::from(f).norm() == 0.0) {
        warn!("all loads are zero; the solution will be zero");
    }
    let load_resultant = resultant(&rhs);
    info!(
        fx = load_resultant[0],
        fy = load_resultant[1],
        fz = load_resultant[2],
        "assembled loads"
    );

    let system = condense(&stiffness, &rhs, &fixed)?;
    info!(n_fixed = fixed.len(), n_free = system.n_free(), "applied supports");

    let solver = select_solver(&config.solver, system.n_free());
    let (displacement, stats) = solve_condensed(&system, solver.as_ref())?;

    let field = basis.interpolate(&displacement)?;
    let exx = elemental_mean(&basis, &StrainComponent::XX, &field)?;
    let von_mises = elemental_mean(&basis, &VonMises { elasticity }, &field)?;

    let solution = Solution {
        mesh,
        displacement,
        exx,
        von_mises,
        load_resultant,
        stats,
        field_name: config.output.field_name.clone(),
    };
    let (node, umax) = solution.max_displacement();
    info!(node, max_displacement = umax, "recovered strains");
    Ok(solution)
}

fn resultant(rhs: &[f64]) -> Vec3 {
    rhs.chunks_exact(3)
        .fold(Vec3::zeros(), |acc, f| acc + Vec3::new(f[0], f[1], f[2]))
}
