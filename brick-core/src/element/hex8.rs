//! Trilinear brick (Hex8).
//!
//! Reference cell [-1, 1]³ with one node per corner. The shape function of
//! the node at reference corner (a, b, c) is
//!
//! ```text
//! N = (1 + aξ)(1 + bη)(1 + cζ) / 8
//! ```
//!
//! Local numbering walks the bottom face (ζ = -1) counter-clockwise seen from
//! above, then the top face in the same order:
//!
//! ```text
//!     ζ = +1:  7 --- 6        ζ = -1:  3 --- 2
//!              |     |                 |     |
//!              4 --- 5                 0 --- 1
//! ```

use crate::element::gauss::gauss_hex;
use crate::element::{Element, GaussPoint};
use crate::error::{Error, Result};
use crate::types::{Point3, Vec3};
use nalgebra::Matrix3;

/// Reference corner (ξ, η, ζ) of each local node.
pub const REFERENCE_NODES: [[f64; 3]; 8] = [
    [-1.0, -1.0, -1.0],
    [1.0, -1.0, -1.0],
    [1.0, 1.0, -1.0],
    [-1.0, 1.0, -1.0],
    [-1.0, -1.0, 1.0],
    [1.0, -1.0, 1.0],
    [1.0, 1.0, 1.0],
    [-1.0, 1.0, 1.0],
];

#[derive(Debug, Clone, Copy, Default)]
pub struct Hex8;

/// Isoparametric map evaluated at one reference point.
#[derive(Debug, Clone)]
pub struct Hex8Map {
    /// Physical location of the reference point.
    pub point: Point3,
    /// Jacobian determinant.
    pub det_j: f64,
    /// Shape function values.
    pub values: [f64; 8],
    /// Shape function gradients in physical coordinates.
    pub gradients: [Vec3; 8],
}

impl Hex8 {
    /// J_ij = ∂x_j/∂ξ_i, so physical gradients are J⁻¹ ∇_ξ N.
    fn jacobian(coords: &[Point3; 8], dn: &[Vec3]) -> Matrix3<f64> {
        dn.iter()
            .zip(coords)
            .fold(Matrix3::zeros(), |j, (d, x)| j + d * x.transpose())
    }

    /// Evaluate the isoparametric map of a physical cell at `xi`.
    ///
    /// Inverted or degenerate cells (det J <= 0) are reported as mesh errors.
    pub fn map(&self, coords: &[Point3; 8], xi: &[f64; 3]) -> Result<Hex8Map> {
        let n = self.shape_functions(xi);
        let dn = self.shape_derivatives(xi);
        let j = Self::jacobian(coords, &dn);

        let det_j = j.determinant();
        if !(det_j > 0.0) {
            return Err(Error::Mesh(format!(
                "Non-positive Jacobian determinant ({}) indicates an inverted element",
                det_j
            )));
        }
        let j_inv = j
            .try_inverse()
            .ok_or_else(|| Error::Mesh("Jacobian is singular".into()))?;

        let values: [f64; 8] = std::array::from_fn(|a| n[a]);
        let gradients: [Vec3; 8] = std::array::from_fn(|a| j_inv * dn[a]);
        let point = coords
            .iter()
            .zip(&values)
            .fold(Point3::zeros(), |p, (x, &na)| p + x * na);

        Ok(Hex8Map {
            point,
            det_j,
            values,
            gradients,
        })
    }
}

impl Element for Hex8 {
    fn n_nodes(&self) -> usize {
        8
    }

    fn ref_dim(&self) -> usize {
        3
    }

    fn shape_functions(&self, xi: &[f64; 3]) -> Vec<f64> {
        REFERENCE_NODES
            .iter()
            .map(|c| (0..3).map(|d| 1.0 + c[d] * xi[d]).product::<f64>() / 8.0)
            .collect()
    }

    fn shape_derivatives(&self, xi: &[f64; 3]) -> Vec<Vec3> {
        REFERENCE_NODES
            .iter()
            .map(|c| {
                let f = [1.0 + c[0] * xi[0], 1.0 + c[1] * xi[1], 1.0 + c[2] * xi[2]];
                Vec3::new(c[0] * f[1] * f[2], f[0] * c[1] * f[2], f[0] * f[1] * c[2]) / 8.0
            })
            .collect()
    }

    fn quadrature(&self, order: usize) -> Vec<GaussPoint> {
        gauss_hex(order)
    }
}
