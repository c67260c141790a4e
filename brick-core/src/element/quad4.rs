//! 4-node bilinear quadrilateral (Quad4) embedded in 3D.
//!
//! Used as the trace of the Hex8 basis on a boundary facet: restricted to a
//! face, the trilinear shape functions reduce to the bilinear ones of the
//! face's four nodes. Node order follows [`crate::mesh::HEX8_FACES`]:
//!
//! ```text
//!     3-------2
//!     |       |      η
//!     |       |      ^
//!     0-------1      +--> ξ
//! ```

use crate::element::gauss::gauss_quad;
use crate::element::{Element, GaussPoint};
use crate::error::{Error, Result};
use crate::types::{Point3, Vec3};

const XI: [f64; 4] = [-1.0, 1.0, 1.0, -1.0];
const ETA: [f64; 4] = [-1.0, -1.0, 1.0, 1.0];

/// Bilinear quadrilateral surface element.
#[derive(Debug, Clone, Copy, Default)]
pub struct Quad4;

/// Surface map evaluated at one reference point.
#[derive(Debug, Clone)]
pub struct Quad4Map {
    /// Physical location of the reference point.
    pub point: Point3,
    /// Area scaling |∂x/∂ξ × ∂x/∂η|.
    pub det_j: f64,
    /// Outward unit normal.
    pub normal: Vec3,
    /// Shape function values.
    pub values: [f64; 4],
}

impl Quad4 {
    /// Evaluate the surface map of a facet at `xi` (ζ ignored).
    pub fn map(&self, coords: &[Point3; 4], xi: &[f64; 3]) -> Result<Quad4Map> {
        let n = self.shape_functions(xi);
        let dn = self.shape_derivatives(xi);

        let mut point = Point3::zeros();
        let mut t_xi = Vec3::zeros();
        let mut t_eta = Vec3::zeros();
        for i in 0..4 {
            point += coords[i] * n[i];
            t_xi += coords[i] * dn[i][0];
            t_eta += coords[i] * dn[i][1];
        }

        let cross = t_xi.cross(&t_eta);
        let det_j = cross.norm();
        if !(det_j > 0.0) {
            return Err(Error::Mesh(format!(
                "Degenerate facet with surface Jacobian {}",
                det_j
            )));
        }

        Ok(Quad4Map {
            point,
            det_j,
            normal: cross / det_j,
            values: [n[0], n[1], n[2], n[3]],
        })
    }
}

impl Element for Quad4 {
    fn n_nodes(&self) -> usize {
        4
    }

    fn ref_dim(&self) -> usize {
        2
    }

    fn shape_functions(&self, xi: &[f64; 3]) -> Vec<f64> {
        (0..4)
            .map(|i| 0.25 * (1.0 + XI[i] * xi[0]) * (1.0 + ETA[i] * xi[1]))
            .collect()
    }

    fn shape_derivatives(&self, xi: &[f64; 3]) -> Vec<Vec3> {
        (0..4)
            .map(|i| {
                Vec3::new(
                    0.25 * XI[i] * (1.0 + ETA[i] * xi[1]),
                    0.25 * (1.0 + XI[i] * xi[0]) * ETA[i],
                    0.0,
                )
            })
            .collect()
    }

    fn quadrature(&self, order: usize) -> Vec<GaussPoint> {
        gauss_quad(order)
    }
}
