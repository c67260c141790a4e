//! Linear system solvers.
//!
//! Provides direct and iterative solvers for the condensed system K u = f.
//!
//! # Solver Backends
//!
//! - [`FaerCholeskySolver`]: Sparse Cholesky factorization using the faer library.
//!   The default for the symmetric positive definite matrices left after
//!   eliminating supports.
//! - [`DenseLUSolver`]: nalgebra dense LU, for small problems and tests.
//! - [`ConjugateGradientSolver`]: Jacobi-preconditioned CG, matrix-free apart
//!   from the CSR product. Used for large problems under [`SolverType::Auto`].
//!
//! Every solver checks its answer: a non-finite entry or a relative residual
//! ‖Kx − b‖ / ‖b‖ above [`RESIDUAL_TOLERANCE`] is reported as
//! [`Error::SingularMatrix`], so a NaN never leaves this module.

use crate::boundary::CondensedSystem;
use crate::error::{Error, Result};
use crate::sparse::{matvec, norm, CsrMatrix};
use faer::linalg::cholesky::llt::factor::LltError;
use faer::linalg::solvers::Solve;
use faer::sparse::linalg::solvers::{Llt, SymbolicLlt};
use faer::sparse::linalg::LltError as SparseLltError;
use faer::sparse::{SparseColMat, Triplet};
use faer::Side;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;
use tracing::{debug, info};

/// Largest accepted relative residual of a returned solution.
pub const RESIDUAL_TOLERANCE: f64 = 1e-6;

/// Strategy for solving K u = f on a square CSR matrix.
pub trait Solver: Send + Sync {
    /// Solution of `matrix · x = rhs`, verified against the residual bound.
    fn solve(&self, matrix: &CsrMatrix, rhs: &[f64]) -> Result<Vec<f64>>;

    /// Solve and report timing and the achieved residual.
    fn solve_with_stats(&self, matrix: &CsrMatrix, rhs: &[f64]) -> Result<(Vec<f64>, SolveStats)> {
        let start = Instant::now();
        let x = self.solve(matrix, rhs)?;
        let stats = SolveStats {
            solver: self.name().to_string(),
            iterations: None,
            residual: Some(relative_residual(matrix, rhs, &x)),
            time_seconds: start.elapsed().as_secs_f64(),
        };
        Ok((x, stats))
    }

    /// Solver name for diagnostics.
    fn name(&self) -> &str;
}

/// Solver selection strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SolverType {
    /// Sparse Cholesky.
    Direct,
    /// Jacobi-preconditioned conjugate gradient.
    Iterative,
    /// Direct below `auto_threshold` DOFs, iterative above.
    #[default]
    Auto,
}

impl fmt::Display for SolverType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolverType::Direct => write!(f, "direct"),
            SolverType::Iterative => write!(f, "iterative"),
            SolverType::Auto => write!(f, "auto"),
        }
    }
}

impl std::str::FromStr for SolverType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "direct" => Ok(SolverType::Direct),
            "iterative" => Ok(SolverType::Iterative),
            "auto" => Ok(SolverType::Auto),
            other => Err(Error::Config(format!("unknown solver type '{}'", other))),
        }
    }
}

/// Solver configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Solver type to use.
    #[serde(rename = "type")]
    pub solver_type: SolverType,
    /// Relative tolerance for iterative solvers.
    pub tolerance: f64,
    /// Maximum iterations for iterative solvers.
    pub max_iterations: usize,
    /// Problem size threshold for auto-selection (direct below, iterative above).
    pub auto_threshold: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            solver_type: SolverType::Auto,
            tolerance: 1e-10,
            max_iterations: 10000,
            auto_threshold: 100_000, // 100k DOFs
        }
    }
}

impl SolverConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.tolerance > 0.0 && self.tolerance < 1.0) {
            return Err(Error::Config(format!(
                "solver tolerance must be in (0, 1), got {}",
                self.tolerance
            )));
        }
        if self.max_iterations == 0 {
            return Err(Error::Config("solver max_iterations must be positive".into()));
        }
        Ok(())
    }
}

/// Solution statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct SolveStats {
    /// Solver name used.
    pub solver: String,
    /// Number of iterations (for iterative solvers).
    pub iterations: Option<usize>,
    /// Final relative residual ‖Kx − b‖ / ‖b‖.
    pub residual: Option<f64>,
    /// Wall-clock time in seconds.
    pub time_seconds: f64,
}

/// ‖Kx − b‖ / ‖b‖, or ‖Kx‖ when b = 0.
pub fn relative_residual(matrix: &CsrMatrix, rhs: &[f64], x: &[f64]) -> f64 {
    let kx = matvec(matrix, x);
    let r: Vec<f64> = kx.iter().zip(rhs).map(|(a, b)| a - b).collect();
    let b_norm = norm(rhs);
    if b_norm > 0.0 {
        norm(&r) / b_norm
    } else {
        norm(&r)
    }
}

/// Reject non-finite solutions and solutions that do not satisfy the system.
fn verify_solution(matrix: &CsrMatrix, rhs: &[f64], x: &[f64], solver: &str) -> Result<()> {
    if x.iter().any(|v| !v.is_finite()) {
        return Err(Error::SingularMatrix(format!(
            "{} produced a non-finite solution",
            solver
        )));
    }
    let residual = relative_residual(matrix, rhs, x);
    if !(residual <= RESIDUAL_TOLERANCE) {
        return Err(Error::SingularMatrix(format!(
            "{} residual {:.3e} exceeds {:.0e}; the system is singular or ill-conditioned",
            solver, residual, RESIDUAL_TOLERANCE
        )));
    }
    Ok(())
}

fn check_dimensions(matrix: &CsrMatrix, rhs: &[f64]) -> Result<()> {
    if matrix.nrows() != matrix.ncols() {
        return Err(Error::Solver("Matrix must be square".into()));
    }
    if matrix.nrows() != rhs.len() {
        return Err(Error::Solver("RHS size mismatch".into()));
    }
    Ok(())
}

/// Direct solver using nalgebra dense LU factorization.
///
/// Converts the matrix to dense storage, so only suitable for small systems.
#[derive(Debug, Clone, Copy, Default)]
pub struct DenseLUSolver;

impl DenseLUSolver {
    pub fn new() -> Self {
        Self
    }
}

impl Solver for DenseLUSolver {
    fn solve(&self, matrix: &CsrMatrix, rhs: &[f64]) -> Result<Vec<f64>> {
        use nalgebra::{DMatrix, DVector};

        check_dimensions(matrix, rhs)?;
        if rhs.is_empty() {
            return Ok(vec![]);
        }

        let dense = DMatrix::from(matrix);
        let b = DVector::from_column_slice(rhs);

        let lu = dense.lu();
        let solution = lu
            .solve(&b)
            .ok_or_else(|| Error::SingularMatrix("LU factorization failed".into()))?;

        let x = solution.as_slice().to_vec();
        verify_solution(matrix, rhs, &x, self.name())?;
        Ok(x)
    }

    fn name(&self) -> &str {
        "Dense LU"
    }
}

/// Convert a nalgebra-sparse CSR matrix to a faer CSC matrix.
fn csr_to_faer_csc(csr: &CsrMatrix) -> Result<SparseColMat<usize, f64>> {
    let triplets: Vec<Triplet<usize, usize, f64>> = csr
        .triplet_iter()
        .map(|(row, col, &val)| Triplet { row, col, val })
        .collect();

    SparseColMat::try_new_from_triplets(csr.nrows(), csr.ncols(), &triplets)
        .map_err(|e| Error::Solver(format!("Failed to build CSC matrix: {:?}", e)))
}

fn map_llt_error(e: SparseLltError) -> Error {
    match e {
        SparseLltError::Numeric(LltError::NonPositivePivot { index }) => Error::SingularMatrix(
            format!("Matrix is not positive definite at pivot {}", index),
        ),
        other => Error::Solver(format!("Sparse Cholesky error: {:?}", other)),
    }
}

/// Sparse Cholesky solver using the faer library.
///
/// Uses faer's sparse LLᵀ factorization with a fill-reducing ordering, which
/// suits the symmetric positive definite stiffness matrices of a supported
/// body.
///
/// # Example
///
/// ```
/// use brick_core::solver::{FaerCholeskySolver, Solver};
/// use brick_core::sparse::TripletMatrix;
///
/// let mut t = TripletMatrix::new(2, 2);
/// t.add(0, 0, 2.0);
/// t.add(1, 1, 4.0);
/// let x = FaerCholeskySolver::new().solve(&t.to_csr().unwrap(), &[2.0, 2.0]).unwrap();
/// assert!((x[1] - 0.5).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct FaerCholeskySolver;

impl FaerCholeskySolver {
    /// Create a new sparse Cholesky solver.
    pub fn new() -> Self {
        Self
    }
}

impl Solver for FaerCholeskySolver {
    fn solve(&self, matrix: &CsrMatrix, rhs: &[f64]) -> Result<Vec<f64>> {
        check_dimensions(matrix, rhs)?;
        let n = rhs.len();
        if n == 0 {
            return Ok(vec![]);
        }

        let csc = csr_to_faer_csc(matrix)?;

        let symbolic = SymbolicLlt::try_new(csc.symbolic().as_ref(), Side::Lower)
            .map_err(|e| Error::Solver(format!("Symbolic Cholesky analysis failed: {:?}", e)))?;
        let llt = Llt::try_new_with_symbolic(symbolic, csc.as_ref(), Side::Lower)
            .map_err(map_llt_error)?;

        let b = faer::Mat::from_fn(n, 1, |i, _| rhs[i]);
        let sol = llt.solve(&b);
        let x: Vec<f64> = (0..n).map(|i| sol[(i, 0)]).collect();

        verify_solution(matrix, rhs, &x, self.name())?;
        Ok(x)
    }

    fn name(&self) -> &str {
        "faer Sparse Cholesky (LLᵀ)"
    }
}

/// Conjugate gradient with a Jacobi (diagonal) preconditioner.
#[derive(Debug, Clone)]
pub struct ConjugateGradientSolver {
    tolerance: f64,
    max_iterations: usize,
}

impl ConjugateGradientSolver {
    pub fn new() -> Self {
        Self {
            tolerance: 1e-10,
            max_iterations: 10000,
        }
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Run CG, returning the solution and the iteration count.
    fn iterate(&self, matrix: &CsrMatrix, rhs: &[f64]) -> Result<(Vec<f64>, usize)> {
        let n = rhs.len();
        let b_norm = norm(rhs);
        if b_norm == 0.0 {
            return Ok((vec![0.0; n], 0));
        }

        let mut inv_diag = vec![0.0; n];
        for (i, row) in matrix.row_iter().enumerate() {
            let d = row
                .col_indices()
                .iter()
                .zip(row.values())
                .find(|(j, _)| **j == i)
                .map(|(_, &v)| v)
                .unwrap_or(0.0);
            if !(d > 0.0) {
                return Err(Error::SingularMatrix(format!(
                    "non-positive diagonal {} at row {}",
                    d, i
                )));
            }
            inv_diag[i] = 1.0 / d;
        }

        let mut x = vec![0.0; n];
        let mut r = rhs.to_vec();
        let mut z: Vec<f64> = r.iter().zip(&inv_diag).map(|(ri, di)| ri * di).collect();
        let mut p = z.clone();
        let mut rz: f64 = r.iter().zip(&z).map(|(a, b)| a * b).sum();

        for iteration in 1..=self.max_iterations {
            let ap = matvec(matrix, &p);
            let p_ap: f64 = p.iter().zip(&ap).map(|(a, b)| a * b).sum();
            if !(p_ap > 0.0) {
                return Err(Error::SingularMatrix(format!(
                    "search direction with non-positive curvature at iteration {}",
                    iteration
                )));
            }
            let alpha = rz / p_ap;

            for i in 0..n {
                x[i] += alpha * p[i];
                r[i] -= alpha * ap[i];
            }

            let r_norm = norm(&r);
            if r_norm <= self.tolerance * b_norm {
                return Ok((x, iteration));
            }

            for i in 0..n {
                z[i] = r[i] * inv_diag[i];
            }
            let rz_new: f64 = r.iter().zip(&z).map(|(a, b)| a * b).sum();
            let beta = rz_new / rz;
            rz = rz_new;

            for i in 0..n {
                p[i] = z[i] + beta * p[i];
            }
        }

        Err(Error::Solver(format!(
            "conjugate gradient did not converge in {} iterations",
            self.max_iterations
        )))
    }
}

impl Default for ConjugateGradientSolver {
    fn default() -> Self {
        Self::new()
    }
}

impl Solver for ConjugateGradientSolver {
    fn solve(&self, matrix: &CsrMatrix, rhs: &[f64]) -> Result<Vec<f64>> {
        self.solve_with_stats(matrix, rhs).map(|(x, _)| x)
    }

    fn solve_with_stats(&self, matrix: &CsrMatrix, rhs: &[f64]) -> Result<(Vec<f64>, SolveStats)> {
        check_dimensions(matrix, rhs)?;
        let start = Instant::now();
        let (x, iterations) = self.iterate(matrix, rhs)?;
        verify_solution(matrix, rhs, &x, self.name())?;
        debug!(iterations, "conjugate gradient converged");

        let stats = SolveStats {
            solver: self.name().to_string(),
            iterations: Some(iterations),
            residual: Some(relative_residual(matrix, rhs, &x)),
            time_seconds: start.elapsed().as_secs_f64(),
        };
        Ok((x, stats))
    }

    fn name(&self) -> &str {
        "Jacobi-preconditioned CG"
    }
}

/// Select solver based on configuration and problem size.
pub fn select_solver(config: &SolverConfig, n_dofs: usize) -> Box<dyn Solver> {
    let iterative = || {
        Box::new(
            ConjugateGradientSolver::new()
                .with_tolerance(config.tolerance)
                .with_max_iterations(config.max_iterations),
        ) as Box<dyn Solver>
    };
    match config.solver_type {
        SolverType::Direct => Box::new(FaerCholeskySolver::new()),
        SolverType::Iterative => iterative(),
        SolverType::Auto if n_dofs < config.auto_threshold => Box::new(FaerCholeskySolver::new()),
        SolverType::Auto => iterative(),
    }
}

/// Solve a condensed system and expand the result to all DOFs.
pub fn solve_condensed(
    system: &CondensedSystem,
    solver: &dyn Solver,
) -> Result<(Vec<f64>, SolveStats)> {
    let (reduced, stats) = if system.n_free() == 0 {
        let stats = SolveStats {
            solver: "none (all DOFs prescribed)".to_string(),
            iterations: None,
            residual: None,
            time_seconds: 0.0,
        };
        (Vec::new(), stats)
    } else {
        solver.solve_with_stats(&system.matrix, &system.rhs)?
    };

    info!(
        solver = %stats.solver,
        n_free = system.n_free(),
        time_seconds = stats.time_seconds,
        "solved linear system"
    );
    Ok((system.expand(&reduced)?, stats))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boundary::{condense, DirichletSet};
    use crate::sparse::TripletMatrix;
    use approx::assert_relative_eq;

    /// CSR copy of a small dense matrix given row by row.
    fn csr(rows: &[&[f64]]) -> CsrMatrix {
        let mut t = TripletMatrix::new(rows.len(), rows.len());
        for (i, row) in rows.iter().enumerate() {
            for (j, &v) in row.iter().enumerate() {
                t.add(i, j, v);
            }
        }
        t.to_csr().unwrap()
    }

    /// Free-free spring chain with unit stiffness.
    fn floating_springs(n: usize) -> CsrMatrix {
        let mut t = TripletMatrix::new(n, n);
        for e in 0..n - 1 {
            t.add_submatrix(
                &[e, e + 1],
                &nalgebra::DMatrix::from_row_slice(2, 2, &[1.0, -1.0, -1.0, 1.0]),
            );
        }
        t.to_csr().unwrap()
    }

    /// Tridiagonal SPD matrix with diagonal `diag(i)` and off-diagonal -1.
    fn tridiagonal(n: usize, diag: impl Fn(usize) -> f64) -> CsrMatrix {
        let mut t = TripletMatrix::new(n, n);
        for i in 0..n {
            t.add(i, i, diag(i));
            if i + 1 < n {
                t.add(i, i + 1, -1.0);
                t.add(i + 1, i, -1.0);
            }
        }
        t.to_csr().unwrap()
    }

    fn all_solvers() -> Vec<Box<dyn Solver>> {
        vec![
            Box::new(DenseLUSolver::new()),
            Box::new(FaerCholeskySolver::new()),
            Box::new(ConjugateGradientSolver::new()),
        ]
    }

    #[test]
    fn test_all_solvers_agree_on_spd() {
        // [4 2; 2 3] x = [4; 5] has x = (0.25, 1.5)
        let matrix = csr(&[&[4.0, 2.0], &[2.0, 3.0]]);
        for solver in all_solvers() {
            let x = solver.solve(&matrix, &[4.0, 5.0]).unwrap();
            assert_relative_eq!(x[0], 0.25, epsilon = 1e-9);
            assert_relative_eq!(x[1], 1.5, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_cholesky_three_by_three() {
        // x = (-3/16, 11/8, 3/4)
        let matrix = csr(&[&[4.0, 2.0, 0.0], &[2.0, 5.0, 2.0], &[0.0, 2.0, 3.0]]);
        let x = FaerCholeskySolver::new().solve(&matrix, &[2.0, 8.0, 5.0]).unwrap();
        for (xi, expected) in x.iter().zip([-0.1875, 1.375, 0.75]) {
            assert_relative_eq!(*xi, expected, epsilon = 1e-10);
        }
    }

    #[test]
    fn test_empty_system() {
        let matrix = TripletMatrix::new(0, 0).to_csr().unwrap();
        for solver in all_solvers() {
            assert!(solver.solve(&matrix, &[]).unwrap().is_empty(), "{}", solver.name());
        }
    }

    #[test]
    fn test_rhs_mismatch() {
        let matrix = csr(&[&[1.0, 0.0], &[0.0, 1.0]]);
        for solver in all_solvers() {
            assert!(matches!(
                solver.solve(&matrix, &[1.0, 2.0, 3.0]),
                Err(Error::Solver(_))
            ));
        }
    }

    #[test]
    fn test_cholesky_rejects_indefinite_matrix() {
        // Eigenvalues 3 and -1
        let matrix = csr(&[&[1.0, 2.0], &[2.0, 1.0]]);
        let result = FaerCholeskySolver::new().solve(&matrix, &[1.0, 1.0]);
        assert!(matches!(result, Err(Error::SingularMatrix(_))));
    }

    #[test]
    fn test_floating_structure_is_singular() {
        let matrix = floating_springs(4);
        let rhs = [0.0, 0.0, 0.0, 1.0];
        let direct: [Box<dyn Solver>; 2] = [
            Box::new(DenseLUSolver::new()),
            Box::new(FaerCholeskySolver::new()),
        ];
        for solver in direct {
            let result = solver.solve(&matrix, &rhs);
            assert!(
                matches!(result, Err(Error::SingularMatrix(_))),
                "{} returned {:?}",
                solver.name(),
                result
            );
        }

        // The net load is never balanced, so CG cannot converge either
        let cg = ConjugateGradientSolver::new().with_max_iterations(200);
        assert!(cg.solve(&matrix, &rhs).is_err());
    }

    #[test]
    fn test_cg_reports_iterations() {
        let n = 20;
        let matrix = tridiagonal(n, |_| 4.0);
        let rhs: Vec<f64> = (0..n).map(|i| (i as f64).sin()).collect();

        let (x, stats) = ConjugateGradientSolver::new().solve_with_stats(&matrix, &rhs).unwrap();
        let iterations = stats.iterations.unwrap();
        assert!(iterations > 0 && iterations <= 2 * n);
        assert!(stats.residual.unwrap() < 1e-9);

        let direct = FaerCholeskySolver::new().solve(&matrix, &rhs).unwrap();
        for (a, b) in x.iter().zip(&direct) {
            assert_relative_eq!(a, b, epsilon = 1e-8);
        }
    }

    #[test]
    fn test_cg_iteration_limit() {
        let n = 50;
        let matrix = tridiagonal(n, |i| 2.0 + i as f64);
        let solver = ConjugateGradientSolver::new().with_max_iterations(2);
        assert!(matches!(solver.solve(&matrix, &vec![1.0; n]), Err(Error::Solver(_))));
    }

    #[test]
    fn test_select_solver() {
        let mut config = SolverConfig::default();
        assert_eq!(select_solver(&config, 100).name(), FaerCholeskySolver.name());
        assert_eq!(select_solver(&config, 1_000_000).name(), ConjugateGradientSolver::new().name());

        config.solver_type = SolverType::Iterative;
        assert_eq!(select_solver(&config, 10).name(), ConjugateGradientSolver::new().name());
        config.solver_type = SolverType::Direct;
        assert_eq!(select_solver(&config, 1_000_000).name(), FaerCholeskySolver.name());
    }

    #[test]
    fn test_solver_type_parsing() {
        assert_eq!("Direct".parse::<SolverType>().unwrap(), SolverType::Direct);
        assert_eq!("auto".parse::<SolverType>().unwrap(), SolverType::Auto);
        assert!(matches!("multigrid".parse::<SolverType>(), Err(Error::Config(_))));
        assert_eq!(SolverType::Iterative.to_string(), "iterative");
    }

    #[test]
    fn test_solve_condensed_restores_prescribed_values() {
        // Spring chain pinned at u0 = 0 with u3 = 3: u = [0, 1, 2, 3]
        let matrix = floating_springs(4);
        let mut fixed = DirichletSet::new();
        fixed.fix(0, 0.0);
        fixed.fix(3, 3.0);
        let system = condense(&matrix, &[0.0; 4], &fixed).unwrap();

        let (u, stats) = solve_condensed(&system, &FaerCholeskySolver::new()).unwrap();
        for (i, v) in u.iter().enumerate() {
            assert_relative_eq!(*v, i as f64, epsilon = 1e-12);
        }
        assert!(stats.residual.unwrap() < 1e-12);
    }

    #[test]
    fn test_solve_condensed_all_fixed() {
        let matrix = floating_springs(2);
        let mut fixed = DirichletSet::new();
        fixed.fix(0, 1.0);
        fixed.fix(1, 2.0);
        let system = condense(&matrix, &[0.0; 2], &fixed).unwrap();
        let (u, stats) = solve_condensed(&system, &DenseLUSolver::new()).unwrap();
        assert_eq!(u, vec![1.0, 2.0]);
        assert_eq!(stats.iterations, None);
    }
}
