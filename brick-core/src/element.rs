//! Reference finite elements.
//!
//! The [`Element`] trait describes a scalar Lagrange element on its reference
//! cell: shape functions and their reference derivatives. Vector-valued fields
//! such as displacement use [`VectorElement`], which repeats a scalar element
//! once per spatial dimension.
//!
//! # Submodules
//!
//! - [`gauss`] - Gauss quadrature rules for numerical integration
//! - [`hex8`] - trilinear hexahedron
//! - [`quad4`] - bilinear quadrilateral (trace of Hex8 on a facet)

use crate::types::Vec3;

pub mod gauss;
pub mod hex8;
pub mod quad4;

pub use gauss::{gauss_1d, gauss_hex, gauss_quad, GaussPoint};
pub use hex8::Hex8;
pub use quad4::Quad4;

/// Scalar reference element interface.
///
/// Elements must be thread-safe (Send + Sync) so bases can be built in parallel.
pub trait Element: Send + Sync {
    /// Number of nodes in this element.
    fn n_nodes(&self) -> usize;

    /// Dimension of the reference cell (3 for Hex8, 2 for Quad4).
    fn ref_dim(&self) -> usize;

    /// Shape function values at a reference point.
    fn shape_functions(&self, xi: &[f64; 3]) -> Vec<f64>;

    /// Shape function derivatives with respect to the reference coordinates.
    ///
    /// Entry i holds (∂N_i/∂ξ, ∂N_i/∂η, ∂N_i/∂ζ); unused directions are zero.
    fn shape_derivatives(&self, xi: &[f64; 3]) -> Vec<Vec3>;

    /// Gauss rule with `order` points per reference direction.
    fn quadrature(&self, order: usize) -> Vec<GaussPoint>;
}

/// Vector-valued element built by repeating a scalar element per component.
///
/// Local degrees of freedom are interleaved: local dof `a` belongs to node
/// `a / dim` and component `a % dim`.
#[derive(Debug, Clone, Copy, Default)]
pub struct VectorElement<E> {
    scalar: E,
    dim: usize,
}

impl<E: Element> VectorElement<E> {
    /// Repeat `scalar` once per spatial dimension `dim`.
    pub fn new(scalar: E, dim: usize) -> Self {
        Self { scalar, dim }
    }

    /// The underlying scalar element.
    pub fn scalar(&self) -> &E {
        &self.scalar
    }

    /// Degrees of freedom per node.
    pub fn dofs_per_node(&self) -> usize {
        self.dim
    }

    /// Total local degrees of freedom.
    pub fn n_dofs(&self) -> usize {
        self.scalar.n_nodes() * self.dim
    }

    /// (node, component) owning local dof `a`.
    #[inline]
    pub fn split_dof(&self, a: usize) -> (usize, usize) {
        (a / self.dim, a % self.dim)
    }
}
