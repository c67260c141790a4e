//! Global bases: DOF numbering plus precomputed quadrature data.
//!
//! A basis pairs the vector-valued element with a mesh. For every element (or
//! facet) it stores the global DOF indices, and for every quadrature point
//! the shape function values, physical gradients and integration measure.
//! Assembly and post-processing only iterate over this data.
//!
//! - [`CellBasis`]: Hex8 volume integration over all cells.
//! - [`FacetBasis`]: bilinear trace on a selected set of boundary facets.

use crate::element::{Element, Hex8, Quad4, VectorElement};
use crate::error::{Error, Result};
use crate::form::{FunctionValue, QuadPoint};
use crate::mesh::{Facet, Mesh};
use crate::types::{Axis, Gradient3, Point3, Vec3};
use rayon::prelude::*;

/// Spatial dimension of the displacement field.
pub const DIM: usize = 3;

/// Degree-of-freedom numbering for a vector field with `dim` components per
/// node, interleaved as `dof = dim * node + component`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DofMap {
    n_nodes: usize,
    dim: usize,
}

impl DofMap {
    pub fn new(n_nodes: usize, dim: usize) -> Self {
        Self { n_nodes, dim }
    }

    /// Total number of DOFs.
    pub fn n_dofs(&self) -> usize {
        self.n_nodes * self.dim
    }

    /// Components per node.
    pub fn dofs_per_node(&self) -> usize {
        self.dim
    }

    /// Global DOF of one node component.
    #[inline]
    pub fn node_dof(&self, node: usize, component: usize) -> usize {
        node * self.dim + component
    }

    /// All nodal DOFs belonging to one spatial axis, in node order.
    pub fn nodal_dofs(&self, axis: Axis) -> Vec<usize> {
        (0..self.n_nodes)
            .map(|n| self.node_dof(n, axis.index()))
            .collect()
    }

    /// Global DOFs of an element's nodes, interleaved per node.
    pub fn element_dofs(&self, nodes: &[usize]) -> Vec<usize> {
        nodes
            .iter()
            .flat_map(|&node| (0..self.dim).map(move |d| node * self.dim + d))
            .collect()
    }

    /// All DOFs of the mesh nodes satisfying `predicate`.
    pub fn dofs_satisfying<F>(&self, mesh: &Mesh, predicate: F) -> Vec<usize>
    where
        F: Fn(&Point3) -> bool,
    {
        self.element_dofs(&mesh.nodes_satisfying(predicate))
    }
}

/// Precomputed data at one quadrature point.
#[derive(Debug, Clone)]
pub struct PointData {
    /// Geometric data passed to forms.
    pub point: QuadPoint,
    /// Integration measure (det J times weight).
    pub dx: f64,
    /// Scalar shape function values, one per local node.
    pub values: Vec<f64>,
    /// Scalar shape function gradients. Empty on facet bases, which only
    /// carry traces.
    pub gradients: Vec<Vec3>,
}

/// Quadrature data of one element or facet.
#[derive(Debug, Clone)]
pub struct LocalBasis {
    /// Owning mesh element.
    pub element: usize,
    /// Global node indices of the local nodes.
    pub nodes: Vec<usize>,
    /// Global DOFs, interleaved per local node.
    pub dofs: Vec<usize>,
    /// Quadrature points.
    pub points: Vec<PointData>,
}

impl LocalBasis {
    /// Whether the quadrature points carry shape function gradients.
    pub fn has_gradients(&self) -> bool {
        self.points.iter().all(|p| !p.gradients.is_empty())
    }

    /// Number of local DOFs.
    pub fn n_dofs(&self) -> usize {
        self.dofs.len()
    }

    /// Value and gradient of vector basis function `a` at point `q`.
    ///
    /// Local dof `a` is the component `a % 3` of local node `a / 3`. Without
    /// gradients the returned `grad` is NaN, so a form that reads it yields
    /// a non-finite result that assembly rejects.
    pub fn function(&self, q: usize, a: usize) -> FunctionValue {
        let (node, comp) = (a / DIM, a % DIM);
        let data = &self.points[q];

        let mut value = Vec3::zeros();
        value[comp] = data.values[node];
        let grad = match data.gradients.get(node) {
            Some(g) => {
                let mut grad = Gradient3::zeros();
                grad.set_row(comp, &g.transpose());
                grad
            }
            None => Gradient3::from_element(f64::NAN),
        };

        FunctionValue { value, grad }
    }

    /// Interpolate a global DOF vector at point `q`. The gradient is NaN
    /// when the basis has none.
    pub fn interpolate(&self, q: usize, u: &[f64]) -> FunctionValue {
        let data = &self.points[q];
        let mut field = FunctionValue::zero();
        for (local, &node) in self.nodes.iter().enumerate() {
            let un = Vec3::new(u[DIM * node], u[DIM * node + 1], u[DIM * node + 2]);
            field.value += un * data.values[local];
        }
        if data.gradients.is_empty() {
            field.grad = Gradient3::from_element(f64::NAN);
        } else {
            for (local, &node) in self.nodes.iter().enumerate() {
                let un = Vec3::new(u[DIM * node], u[DIM * node + 1], u[DIM * node + 2]);
                field.grad += un * data.gradients[local].transpose();
            }
        }
        field
    }

    /// Sum of the integration measure (cell volume or facet area).
    pub fn measure(&self) -> f64 {
        self.points.iter().map(|p| p.dx).sum()
    }
}

/// Interface shared by volume and facet bases.
pub trait Basis: Sync {
    /// Global DOF numbering.
    fn dofmap(&self) -> &DofMap;

    /// Per-element quadrature data.
    fn local_bases(&self) -> &[LocalBasis];

    /// Total number of global DOFs.
    fn n_dofs(&self) -> usize {
        self.dofmap().n_dofs()
    }

    /// Solution interpolated at every quadrature point.
    fn interpolate(&self, u: &[f64]) -> Result<InterpolatedField> {
        if u.len() != self.n_dofs() {
            return Err(Error::Element(format!(
                "Field has {} entries, basis has {} DOFs",
                u.len(),
                self.n_dofs()
            )));
        }
        let values = self
            .local_bases()
            .par_iter()
            .map(|lb| (0..lb.points.len()).map(|q| lb.interpolate(q, u)).collect())
            .collect();
        Ok(InterpolatedField { values })
    }
}

/// Field values per local basis and quadrature point.
#[derive(Debug, Clone)]
pub struct InterpolatedField {
    /// `values[e][q]` is the field at point q of local basis e.
    pub values: Vec<Vec<FunctionValue>>,
}

/// Hex8 vector basis integrated over every cell of a mesh.
#[derive(Debug, Clone)]
pub struct CellBasis {
    element: VectorElement<Hex8>,
    dofmap: DofMap,
    locals: Vec<LocalBasis>,
}

impl CellBasis {
    /// Build the basis with `order` Gauss points per direction (2 is exact
    /// for the stiffness of box-shaped cells).
    pub fn new(mesh: &Mesh, order: usize) -> Result<Self> {
        check_order(order)?;
        let element = VectorElement::new(Hex8, DIM);
        let dofmap = DofMap::new(mesh.n_nodes(), DIM);
        let rule = element.scalar().quadrature(order);

        let locals = mesh
            .cells()
            .par_iter()
            .enumerate()
            .map(|(idx, cell)| {
                let coords = cell.map(|n| mesh.nodes()[n]);
                let points = rule
                    .iter()
                    .map(|gp| {
                        let map = element.scalar().map(&coords, &gp.coords).map_err(|e| {
                            Error::Mesh(format!("element {}: {}", idx, e))
                        })?;
                        Ok(PointData {
                            point: QuadPoint {
                                x: map.point,
                                normal: None,
                                element: idx,
                            },
                            dx: map.det_j * gp.weight,
                            values: map.values.to_vec(),
                            gradients: map.gradients.to_vec(),
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(LocalBasis {
                    element: idx,
                    nodes: cell.to_vec(),
                    dofs: dofmap.element_dofs(cell),
                    points,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            element,
            dofmap,
            locals,
        })
    }

    /// The vector element of this basis.
    pub fn element(&self) -> &VectorElement<Hex8> {
        &self.element
    }

    /// All DOFs of nodes satisfying `predicate`.
    pub fn get_dofs<F>(&self, mesh: &Mesh, predicate: F) -> Vec<usize>
    where
        F: Fn(&Point3) -> bool,
    {
        self.dofmap.dofs_satisfying(mesh, predicate)
    }

    /// Element volumes.
    pub fn volumes(&self) -> Vec<f64> {
        self.locals.iter().map(LocalBasis::measure).collect()
    }
}

impl Basis for CellBasis {
    fn dofmap(&self) -> &DofMap {
        &self.dofmap
    }

    fn local_bases(&self) -> &[LocalBasis] {
        &self.locals
    }
}

/// Vector basis restricted to a set of boundary facets.
///
/// Stores shape values only. Forms on this basis may use `value`; reading
/// `grad` makes assembly fail.
#[derive(Debug, Clone)]
pub struct FacetBasis {
    element: VectorElement<Quad4>,
    dofmap: DofMap,
    locals: Vec<LocalBasis>,
}

impl FacetBasis {
    /// Build the basis on `facets` with `order` Gauss points per direction.
    ///
    /// An empty facet list is an error: a load applied to nothing is almost
    /// certainly a wrong selection.
    pub fn new(mesh: &Mesh, facets: &[Facet], order: usize) -> Result<Self> {
        check_order(order)?;
        if facets.is_empty() {
            return Err(Error::EmptySelection(
                "facet basis built on zero facets".into(),
            ));
        }
        let element = VectorElement::new(Quad4, DIM);
        let dofmap = DofMap::new(mesh.n_nodes(), DIM);
        let rule = element.scalar().quadrature(order);

        let locals = facets
            .iter()
            .map(|facet| {
                let coords = mesh.facet_coords(facet);
                let points = rule
                    .iter()
                    .map(|gp| {
                        let map = element.scalar().map(&coords, &gp.coords)?;
                        Ok(PointData {
                            point: QuadPoint {
                                x: map.point,
                                normal: Some(map.normal),
                                element: facet.element,
                            },
                            dx: map.det_j * gp.weight,
                            values: map.values.to_vec(),
                            gradients: Vec::new(),
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(LocalBasis {
                    element: facet.element,
                    nodes: facet.nodes.to_vec(),
                    dofs: dofmap.element_dofs(&facet.nodes),
                    points,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            element,
            dofmap,
            locals,
        })
    }

    /// The vector element of this basis.
    pub fn element(&self) -> &VectorElement<Quad4> {
        &self.element
    }

    /// Total area of the selected facets.
    pub fn area(&self) -> f64 {
        self.locals.iter().map(LocalBasis::measure).sum()
    }
}

impl Basis for FacetBasis {
    fn dofmap(&self) -> &DofMap {
        &self.dofmap
    }

    fn local_bases(&self) -> &[LocalBasis] {
        &self.locals
    }
}

fn check_order(order: usize) -> Result<()> {
    if !(1..=crate::element::gauss::MAX_ORDER).contains(&order) {
        return Err(Error::Element(format!(
            "quadrature order must be in 1..={}, got {}",
            crate::element::gauss::MAX_ORDER,
            order
        )));
    }
    Ok(())
}
