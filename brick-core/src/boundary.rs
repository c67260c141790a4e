//! Dirichlet boundary conditions and static condensation.
//!
//! Prescribed DOFs are eliminated from the assembled system: only free rows
//! and columns are kept, and the known values move to the right-hand side,
//!
//! ```text
//! K_II u_I = f_I - K_ID u_D
//! ```
//!
//! The full solution is rebuilt with [`CondensedSystem::expand`].

use crate::basis::DofMap;
use crate::error::{Error, Result};
use crate::sparse::{CsrMatrix, TripletMatrix};
use crate::types::Axis;
use std::collections::BTreeMap;
use tracing::debug;

/// Prescribed displacement values, keyed by global DOF.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DirichletSet {
    values: BTreeMap<usize, f64>,
}

impl DirichletSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fix every listed DOF to zero. Duplicates are merged.
    pub fn from_dofs(dofs: &[usize]) -> Self {
        let mut set = Self::new();
        for &dof in dofs {
            set.fix(dof, 0.0);
        }
        set
    }

    /// Fix all components of the given nodes to zero.
    pub fn clamp_nodes(dofmap: &DofMap, nodes: &[usize]) -> Self {
        Self::from_dofs(&dofmap.element_dofs(nodes))
    }

    /// Fix one component of the given nodes to `value`.
    pub fn fix_component(&mut self, dofmap: &DofMap, nodes: &[usize], axis: Axis, value: f64) {
        for &node in nodes {
            self.fix(dofmap.node_dof(node, axis.index()), value);
        }
    }

    /// Prescribe `value` at `dof`, replacing any previous value.
    pub fn fix(&mut self, dof: usize, value: f64) {
        self.values.insert(dof, value);
    }

    pub fn contains(&self, dof: usize) -> bool {
        self.values.contains_key(&dof)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Prescribed DOFs in ascending order.
    pub fn dofs(&self) -> impl Iterator<Item = usize> + '_ {
        self.values.keys().copied()
    }

    /// (dof, value) pairs in ascending DOF order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.values.iter().map(|(&d, &v)| (d, v))
    }
}

/// Free-DOF system left after eliminating prescribed DOFs.
#[derive(Debug, Clone)]
pub struct CondensedSystem {
    /// K_II.
    pub matrix: CsrMatrix,
    /// f_I - K_ID u_D.
    pub rhs: Vec<f64>,
    /// Global index of each reduced DOF, ascending.
    pub free_dofs: Vec<usize>,
    /// Size of the full system.
    pub n_dofs: usize,
    /// Prescribed values carried into the expanded solution.
    pub prescribed: DirichletSet,
}

impl CondensedSystem {
    /// Number of free DOFs.
    pub fn n_free(&self) -> usize {
        self.free_dofs.len()
    }

    /// Scatter a reduced solution back into a full-length vector, filling
    /// prescribed DOFs with their values.
    pub fn expand(&self, reduced: &[f64]) -> Result<Vec<f64>> {
        if reduced.len() != self.n_free() {
            return Err(Error::Solver(format!(
                "Reduced solution has {} entries, expected {}",
                reduced.len(),
                self.n_free()
            )));
        }
        let mut full = vec![0.0; self.n_dofs];
        for (&dof, &value) in self.free_dofs.iter().zip(reduced) {
            full[dof] = value;
        }
        for (dof, value) in self.prescribed.iter() {
            full[dof] = value;
        }
        Ok(full)
    }
}

/// Eliminate the prescribed DOFs of `fixed` from `K u = f`.
pub fn condense(matrix: &CsrMatrix, rhs: &[f64], fixed: &DirichletSet) -> Result<CondensedSystem> {
    let n_dofs = matrix.nrows();
    if matrix.ncols() != n_dofs {
        return Err(Error::Solver("Matrix must be square".into()));
    }
    if rhs.len() != n_dofs {
        return Err(Error::Solver(format!(
            "RHS has {} entries, matrix has {} rows",
            rhs.len(),
            n_dofs
        )));
    }
    if let Some(dof) = fixed.dofs().find(|&d| d >= n_dofs) {
        return Err(Error::Solver(format!(
            "Prescribed DOF {} out of range for {} DOFs",
            dof, n_dofs
        )));
    }

    // usize::MAX marks prescribed DOFs
    let mut reduced_index = vec![usize::MAX; n_dofs];
    let mut prescribed = vec![None; n_dofs];
    for (dof, value) in fixed.iter() {
        prescribed[dof] = Some(value);
    }
    let free_dofs: Vec<usize> = (0..n_dofs).filter(|&d| prescribed[d].is_none()).collect();
    for (i, &dof) in free_dofs.iter().enumerate() {
        reduced_index[dof] = i;
    }

    let n_free = free_dofs.len();
    let mut triplet = TripletMatrix::with_capacity(n_free, n_free, matrix.nnz());
    let mut reduced_rhs = vec![0.0; n_free];

    for (row, k_row) in matrix.row_iter().enumerate() {
        let r = reduced_index[row];
        if r == usize::MAX {
            continue;
        }
        let mut value = rhs[row];
        for (&col, &k) in k_row.col_indices().iter().zip(k_row.values()) {
            match prescribed[col] {
                Some(u_d) => value -= k * u_d,
                None => triplet.add(r, reduced_index[col], k),
            }
        }
        reduced_rhs[r] = value;
    }

    debug!(n_dofs, n_free, n_fixed = fixed.len(), "condensed system");

    Ok(CondensedSystem {
        matrix: triplet.to_csr()?,
        rhs: reduced_rhs,
        free_dofs,
        n_dofs,
        prescribed: fixed.clone(),
    })
}
