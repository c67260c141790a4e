//! Core data types for FEA operations.
//!
//! This module defines fundamental types used throughout brick:
//! - Geometric primitives (points, vectors, coordinate axes)
//! - The small-strain tensor derived from a displacement gradient

use nalgebra::{Matrix3, Matrix6, Vector3, Vector6};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A point in 3D space.
pub type Point3 = Vector3<f64>;

/// A 3D vector (displacement, traction, etc.).
pub type Vec3 = Vector3<f64>;

/// Displacement gradient ∂u_i/∂x_j, row i = component, column j = direction.
pub type Gradient3 = Matrix3<f64>;

/// Spatial coordinate axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    /// All three axes in order.
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    /// Component index (0, 1 or 2).
    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Axis::X => "x",
            Axis::Y => "y",
            Axis::Z => "z",
        };
        f.write_str(name)
    }
}

/// Symmetric strain tensor in Voigt notation.
///
/// Components are ordered as: [ε_xx, ε_yy, ε_zz, γ_xy, γ_yz, γ_xz]
/// where γ = 2ε for engineering shear strain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrainTensor(pub Vector6<f64>);

impl StrainTensor {
    /// Create a new strain tensor from Voigt components.
    pub fn new(components: [f64; 6]) -> Self {
        Self(Vector6::from_row_slice(&components))
    }

    /// Zero strain state.
    pub fn zero() -> Self {
        Self(Vector6::zeros())
    }

    /// Small strain ε = (∇u + ∇uᵀ) / 2 of a displacement gradient.
    pub fn from_gradient(grad: &Gradient3) -> Self {
        Self::new([
            grad[(0, 0)],
            grad[(1, 1)],
            grad[(2, 2)],
            grad[(0, 1)] + grad[(1, 0)],
            grad[(1, 2)] + grad[(2, 1)],
            grad[(0, 2)] + grad[(2, 0)],
        ])
    }

    /// Tensor component ε_ij (not the engineering shear).
    pub fn component(&self, i: usize, j: usize) -> f64 {
        self.to_matrix()[(i, j)]
    }

    /// Compute volumetric strain.
    pub fn volumetric(&self) -> f64 {
        self.0[0] + self.0[1] + self.0[2]
    }

    /// Extract the full 3x3 symmetric strain matrix.
    pub fn to_matrix(&self) -> Matrix3<f64> {
        let e = &self.0;
        // Note: off-diagonal terms are γ/2 = ε
        Matrix3::new(
            e[0],       e[3] / 2.0, e[5] / 2.0,
            e[3] / 2.0, e[1],       e[4] / 2.0,
            e[5] / 2.0, e[4] / 2.0, e[2],
        )
    }
}

/// Constitutive matrix (material stiffness) in Voigt notation.
///
/// Maps strain tensor to stress tensor: σ = D * ε
pub type ConstitutiveMatrix = Matrix6<f64>;

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_volumetric_strain() {
        let strain = StrainTensor::new([0.001, 0.002, 0.003, 0.0, 0.0, 0.0]);
        assert_relative_eq!(strain.volumetric(), 0.006, epsilon = 1e-15);
    }

    #[test]
    fn test_strain_from_gradient_is_symmetric_part() {
        // Pure rotation gradient carries no strain
        let rotation = Gradient3::new(
            0.0, -0.1, 0.0,
            0.1, 0.0, 0.0,
            0.0, 0.0, 0.0,
        );
        let strain = StrainTensor::from_gradient(&rotation);
        assert_relative_eq!(strain.0.norm(), 0.0, epsilon = 1e-15);

        let shear = Gradient3::new(
            0.002, 0.004, 0.0,
            0.0, 0.0, 0.0,
            0.0, 0.0, -0.001,
        );
        let strain = StrainTensor::from_gradient(&shear);
        assert_relative_eq!(strain.component(0, 0), 0.002, epsilon = 1e-15);
        assert_relative_eq!(strain.component(0, 1), 0.002, epsilon = 1e-15);
        assert_relative_eq!(strain.component(1, 0), 0.002, epsilon = 1e-15);
        assert_relative_eq!(strain.component(2, 2), -0.001, epsilon = 1e-15);
    }

    #[test]
    fn test_axis_index() {
        assert_eq!(Axis::X.index(), 0);
        assert_eq!(Axis::Y.index(), 1);
        assert_eq!(Axis::Z.index(), 2);
        assert_eq!(Axis::Y.to_string(), "y");
    }
}
