//! Variational forms evaluated at quadrature points.
//!
//! A form is a pure function of the test function (and, for bilinear forms,
//! the trial function) evaluated at one quadrature point, together with the
//! point's geometric data. The assembler calls it once per quadrature point
//! per element pair of local basis functions and weights the result by the
//! integration measure.
//!
//! Closures with the matching signature implement the traits directly:
//!
//! ```
//! use brick_core::form::{FunctionValue, LinearForm, QuadPoint};
//!
//! let weight_y = |v: &FunctionValue, _: &QuadPoint| -2.0 * v.value[1];
//! fn takes_form<L: LinearForm>(_: &L) {}
//! takes_form(&weight_y);
//! ```

use crate::types::{Gradient3, Point3, StrainTensor, Vec3};
use nalgebra::Matrix3;

/// Value and gradient of a vector field (or one vector basis function) at a
/// quadrature point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FunctionValue {
    /// Field value.
    pub value: Vec3,
    /// Gradient, row i = component, column j = ∂/∂x_j.
    pub grad: Gradient3,
}

impl FunctionValue {
    /// Zero value and gradient.
    pub fn zero() -> Self {
        Self {
            value: Vec3::zeros(),
            grad: Gradient3::zeros(),
        }
    }

    /// Symmetric part of the gradient.
    pub fn sym_grad(&self) -> Matrix3<f64> {
        (self.grad + self.grad.transpose()) * 0.5
    }

    /// Small-strain tensor of the field.
    pub fn strain(&self) -> StrainTensor {
        StrainTensor::from_gradient(&self.grad)
    }
}

/// Geometric data of a quadrature point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuadPoint {
    /// Physical location.
    pub x: Point3,
    /// Outward unit normal on facets, `None` inside cells.
    pub normal: Option<Vec3>,
    /// Index of the owning mesh element.
    pub element: usize,
}

/// Bilinear form a(u, v).
pub trait BilinearForm: Sync {
    /// Integrand for trial function `u` and test function `v`.
    fn evaluate(&self, u: &FunctionValue, v: &FunctionValue, w: &QuadPoint) -> f64;
}

/// Linear form l(v).
pub trait LinearForm: Sync {
    /// Integrand for test function `v`.
    fn evaluate(&self, v: &FunctionValue, w: &QuadPoint) -> f64;
}

/// Scalar functional of a known field.
pub trait Functional: Sync {
    /// Integrand for field `u`.
    fn evaluate(&self, u: &FunctionValue, w: &QuadPoint) -> f64;
}

impl<F> BilinearForm for F
where
    F: Fn(&FunctionValue, &FunctionValue, &QuadPoint) -> f64 + Sync,
{
    fn evaluate(&self, u: &FunctionValue, v: &FunctionValue, w: &QuadPoint) -> f64 {
        self(u, v, w)
    }
}

impl<F> LinearForm for F
where
    F: Fn(&FunctionValue, &QuadPoint) -> f64 + Sync,
{
    fn evaluate(&self, v: &FunctionValue, w: &QuadPoint) -> f64 {
        self(v, w)
    }
}

impl<F> Functional for F
where
    F: Fn(&FunctionValue, &QuadPoint) -> f64 + Sync,
{
    fn evaluate(&self, u: &FunctionValue, w: &QuadPoint) -> f64 {
        self(u, w)
    }
}

/// Isotropic linear elasticity: ∫ σ(ε(u)) : ε(v) with σ = 2μ ε + λ tr(ε) I.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearElasticity {
    /// Lamé's first parameter λ.
    pub lambda: f64,
    /// Shear modulus μ.
    pub mu: f64,
}

impl LinearElasticity {
    pub fn new(lambda: f64, mu: f64) -> Self {
        Self { lambda, mu }
    }

    /// Stress for a given strain matrix.
    pub fn stress(&self, strain: &Matrix3<f64>) -> Matrix3<f64> {
        strain * (2.0 * self.mu) + Matrix3::identity() * (self.lambda * strain.trace())
    }
}

impl BilinearForm for LinearElasticity {
    fn evaluate(&self, u: &FunctionValue, v: &FunctionValue, _w: &QuadPoint) -> f64 {
        self.stress(&u.sym_grad()).dot(&v.sym_grad())
    }
}

/// Constant surface traction: ∫ t · v over the facets of the basis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Traction {
    pub t: Vec3,
}

impl LinearForm for Traction {
    fn evaluate(&self, v: &FunctionValue, _w: &QuadPoint) -> f64 {
        self.t.dot(&v.value)
    }
}

/// Constant volume load: ∫ f · v over the cells of the basis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyForce {
    pub f: Vec3,
}

impl LinearForm for BodyForce {
    fn evaluate(&self, v: &FunctionValue, _w: &QuadPoint) -> f64 {
        self.f.dot(&v.value)
    }
}

/// Strain component ε_ij = sym(∇u)_ij of a displacement field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrainComponent {
    pub i: usize,
    pub j: usize,
}

impl StrainComponent {
    /// ε_xx.
    pub const XX: StrainComponent = StrainComponent { i: 0, j: 0 };
}

impl Functional for StrainComponent {
    fn evaluate(&self, u: &FunctionValue, _w: &QuadPoint) -> f64 {
        u.strain().component(self.i, self.j)
    }
}

/// Von Mises equivalent stress of the elastic stress field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VonMises {
    pub elasticity: LinearElasticity,
}

impl Functional for VonMises {
    fn evaluate(&self, u: &FunctionValue, _w: &QuadPoint) -> f64 {
        let s = self.elasticity.stress(&u.sym_grad());
        let normal = (s[(0, 0)] - s[(1, 1)]).powi(2)
            + (s[(1, 1)] - s[(2, 2)]).powi(2)
            + (s[(2, 2)] - s[(0, 0)]).powi(2);
        let shear = s[(0, 1)].powi(2) + s[(1, 2)].powi(2) + s[(0, 2)].powi(2);
        (0.5 * normal + 3.0 * shear).sqrt()
    }
}
