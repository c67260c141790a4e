//! Finite element assembly.
//!
//! Assembles global matrices and vectors from forms evaluated on a basis.
//! Element contributions are computed in parallel with Rayon, then scattered
//! into the global triplet builder in element order so the assembled system
//! does not depend on thread scheduling.

use crate::basis::{Basis, LocalBasis};
use crate::error::{Error, Result};
use crate::form::{BilinearForm, LinearForm};
use crate::sparse::{CsrMatrix, TripletMatrix};
use nalgebra::{DMatrix, DVector};
use rayon::prelude::*;
use tracing::debug;

fn non_finite(local: &LocalBasis, what: &str) -> Error {
    if local.has_gradients() {
        Error::Assembly(format!("non-finite entry in element {} {}", local.element, what))
    } else {
        Error::Assembly(format!(
            "non-finite entry in {} on a facet of element {}: the form reads gradients, \
             which facet bases do not provide",
            what, local.element
        ))
    }
}

/// Dense element matrix of a bilinear form on one local basis.
///
/// Evaluates the form once per quadrature point per pair of local basis
/// functions: K_ab = Σ_q a(φ_b, φ_a; x_q) dx_q.
pub fn element_matrix<B: BilinearForm>(local: &LocalBasis, form: &B) -> DMatrix<f64> {
    let n = local.n_dofs();
    let mut ke = DMatrix::zeros(n, n);

    for (q, data) in local.points.iter().enumerate() {
        let functions: Vec<_> = (0..n).map(|a| local.function(q, a)).collect();
        for (a, v) in functions.iter().enumerate() {
            for (b, u) in functions.iter().enumerate() {
                ke[(a, b)] += form.evaluate(u, v, &data.point) * data.dx;
            }
        }
    }

    ke
}

/// Dense element vector of a linear form on one local basis.
pub fn element_vector<L: LinearForm>(local: &LocalBasis, form: &L) -> DVector<f64> {
    let n = local.n_dofs();
    let mut fe = DVector::zeros(n);

    for (q, data) in local.points.iter().enumerate() {
        for a in 0..n {
            fe[a] += form.evaluate(&local.function(q, a), &data.point) * data.dx;
        }
    }

    fe
}

/// Assemble the global sparse matrix of a bilinear form.
///
/// # Example
///
/// ```
/// use brick_core::assembly::assemble_matrix;
/// use brick_core::basis::CellBasis;
/// use brick_core::form::LinearElasticity;
/// use brick_core::mesh::Mesh;
///
/// let mesh = Mesh::init_tensor(&[0.0, 1.0], &[0.0, 1.0], &[0.0, 1.0]).unwrap();
/// let basis = CellBasis::new(&mesh, 2).unwrap();
/// let k = assemble_matrix(&basis, &LinearElasticity::new(1.0, 1.0)).unwrap();
/// assert_eq!(k.nrows(), 24);
/// ```
pub fn assemble_matrix<Bs, B>(basis: &Bs, form: &B) -> Result<CsrMatrix>
where
    Bs: Basis,
    B: BilinearForm,
{
    let n_dofs = basis.n_dofs();
    let locals = basis.local_bases();

    let element_matrices: Vec<DMatrix<f64>> = locals
        .par_iter()
        .map(|local| element_matrix(local, form))
        .collect();

    let nnz_estimate = locals.iter().map(|l| l.n_dofs() * l.n_dofs()).sum();
    let mut triplet = TripletMatrix::with_capacity(n_dofs, n_dofs, nnz_estimate);
    for (local, ke) in locals.iter().zip(&element_matrices) {
        if ke.iter().any(|v| !v.is_finite()) {
            return Err(non_finite(local, "matrix"));
        }
        triplet.add_submatrix(&local.dofs, ke);
    }

    debug!(
        n_dofs,
        n_elements = locals.len(),
        triplets = triplet.nnz(),
        "assembled bilinear form"
    );
    triplet.to_csr()
}

/// Assemble the global load vector of a linear form.
pub fn assemble_vector<Bs, L>(basis: &Bs, form: &L) -> Result<Vec<f64>>
where
    Bs: Basis,
    L: LinearForm,
{
    let locals = basis.local_bases();
    let element_vectors: Vec<DVector<f64>> = locals
        .par_iter()
        .map(|local| element_vector(local, form))
        .collect();

    let mut rhs = vec![0.0; basis.n_dofs()];
    for (local, fe) in locals.iter().zip(&element_vectors) {
        if fe.iter().any(|v| !v.is_finite()) {
            return Err(non_finite(local, "vector"));
        }
        for (&dof, &value) in local.dofs.iter().zip(fe.iter()) {
            rhs[dof] += value;
        }
    }

    debug!(n_dofs = rhs.len(), n_elements = locals.len(), "assembled linear form");
    Ok(rhs)
}
