//! Field recovery from the displacement solution.
//!
//! After solving K u = f, derived quantities are evaluated per element:
//! 1. Interpolate u at every quadrature point ([`Basis::interpolate`])
//! 2. Evaluate a [`Functional`] on the interpolated value and gradient
//! 3. Integrate over the element, optionally dividing by its volume
//!
//! Element results are computed in parallel and returned in element order.

use crate::basis::{Basis, InterpolatedField};
use crate::error::{Error, Result};
use crate::form::Functional;
use crate::mesh::Mesh;
use crate::types::StrainTensor;
use rayon::prelude::*;

fn check_field<B: Basis>(basis: &B, field: &InterpolatedField) -> Result<()> {
    let locals = basis.local_bases();
    let matches = field.values.len() == locals.len()
        && locals
            .iter()
            .zip(&field.values)
            .all(|(lb, vals)| lb.points.len() == vals.len());
    if !matches {
        return Err(Error::Element(
            "interpolated field does not match the basis quadrature layout".into(),
        ));
    }
    Ok(())
}

/// Integral of a functional over each element of the basis.
pub fn elemental<B, F>(basis: &B, functional: &F, field: &InterpolatedField) -> Result<Vec<f64>>
where
    B: Basis,
    F: Functional,
{
    check_field(basis, field)?;
    let integrals: Vec<f64> = basis
        .local_bases()
        .par_iter()
        .zip(field.values.par_iter())
        .map(|(lb, vals)| {
            lb.points
                .iter()
                .zip(vals)
                .map(|(data, u)| functional.evaluate(u, &data.point) * data.dx)
                .sum::<f64>()
        })
        .collect();

    if let Some((lb, _)) = basis
        .local_bases()
        .iter()
        .zip(&integrals)
        .find(|(_, v)| !v.is_finite())
    {
        return Err(Error::Element(format!(
            "functional is not finite on element {}{}",
            lb.element,
            if lb.has_gradients() { "" } else { " (facet bases have no gradients)" }
        )));
    }
    Ok(integrals)
}

/// Volume average of a functional over each element.
///
/// # Example
///
/// ```
/// use brick_core::basis::{Basis, CellBasis};
/// use brick_core::form::StrainComponent;
/// use brick_core::mesh::Mesh;
/// use brick_core::postprocess::elemental_mean;
///
/// let mesh = Mesh::init_tensor(&[0.0, 2.0], &[0.0, 1.0], &[0.0, 1.0]).unwrap();
/// let basis = CellBasis::new(&mesh, 2).unwrap();
/// // Uniform stretch u_x = 0.001 x
/// let u: Vec<f64> = mesh.nodes().iter().flat_map(|p| [1e-3 * p[0], 0.0, 0.0]).collect();
/// let field = basis.interpolate(&u).unwrap();
/// let exx = elemental_mean(&basis, &StrainComponent::XX, &field).unwrap();
/// assert!((exx[0] - 1e-3).abs() < 1e-15);
/// ```
pub fn elemental_mean<B, F>(basis: &B, functional: &F, field: &InterpolatedField) -> Result<Vec<f64>>
where
    B: Basis,
    F: Functional,
{
    let integrals = elemental(basis, functional, field)?;
    Ok(integrals
        .into_iter()
        .zip(basis.local_bases())
        .map(|(value, lb)| value / lb.measure())
        .collect())
}

/// Volume-averaged small-strain tensor of each element.
pub fn element_strains<B: Basis>(basis: &B, field: &InterpolatedField) -> Result<Vec<StrainTensor>> {
    check_field(basis, field)?;
    if let Some(lb) = basis.local_bases().iter().find(|lb| !lb.has_gradients()) {
        return Err(Error::Element(format!(
            "strains need gradients, which the basis lacks on element {}",
            lb.element
        )));
    }
    Ok(basis
        .local_bases()
        .par_iter()
        .zip(field.values.par_iter())
        .map(|(lb, vals)| {
            let mut sum = StrainTensor::zero().0;
            for (data, u) in lb.points.iter().zip(vals) {
                sum += u.strain().0 * data.dx;
            }
            StrainTensor(sum / lb.measure())
        })
        .collect())
}

/// Average per-element values onto the nodes each element touches.
pub fn nodal_average(mesh: &Mesh, cell_values: &[f64]) -> Result<Vec<f64>> {
    if cell_values.len() != mesh.n_elements() {
        return Err(Error::Element(format!(
            "{} cell values for {} elements",
            cell_values.len(),
            mesh.n_elements()
        )));
    }

    let mut sums = vec![0.0; mesh.n_nodes()];
    let mut counts = vec![0usize; mesh.n_nodes()];
    for (cell, &value) in mesh.cells().iter().zip(cell_values) {
        for &node in cell {
            sums[node] += value;
            counts[node] += 1;
        }
    }

    Ok(sums
        .into_iter()
        .zip(counts)
        .map(|(sum, count)| if count > 0 { sum / count as f64 } else { 0.0 })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basis::{CellBasis, FacetBasis};
    use crate::form::{FunctionValue, LinearElasticity, QuadPoint, StrainComponent, VonMises};
    use crate::mesh::linspace;
    use approx::assert_relative_eq;

    fn bar() -> Mesh {
        Mesh::init_tensor(&linspace(0.0, 3.0, 4), &[0.0, 1.0], &[0.0, 0.5]).unwrap()
    }

    fn field_from<Fn3>(mesh: &Mesh, f: Fn3) -> Vec<f64>
    where
        Fn3: Fn(f64, f64, f64) -> [f64; 3],
    {
        mesh.nodes().iter().flat_map(|p| f(p[0], p[1], p[2])).collect()
    }

    #[test]
    fn test_uniform_extension() {
        let mesh = bar();
        let basis = CellBasis::new(&mesh, 2).unwrap();
        let u = field_from(&mesh, |x, y, z| [2e-3 * x, -6e-4 * y, -6e-4 * z]);
        let field = basis.interpolate(&u).unwrap();

        let exx = elemental_mean(&basis, &StrainComponent::XX, &field).unwrap();
        assert_eq!(exx.len(), 3);
        for v in &exx {
            assert_relative_eq!(*v, 2e-3, epsilon = 1e-15);
        }

        for strain in element_strains(&basis, &field).unwrap() {
            assert_relative_eq!(strain.component(1, 1), -6e-4, epsilon = 1e-15);
            assert_relative_eq!(strain.component(0, 1), 0.0, epsilon = 1e-15);
            assert_relative_eq!(strain.volumetric(), 8e-4, epsilon = 1e-15);
        }
    }

    #[test]
    fn test_elemental_integral_scales_with_volume() {
        // Each cell is 1 × 1 × 0.5
        let mesh = bar();
        let basis = CellBasis::new(&mesh, 2).unwrap();
        let field = basis.interpolate(&vec![0.0; basis.n_dofs()]).unwrap();
        let one = |_: &FunctionValue, _: &QuadPoint| 1.0;
        for v in elemental(&basis, &one, &field).unwrap() {
            assert_relative_eq!(v, 0.5, epsilon = 1e-14);
        }
    }

    #[test]
    fn test_shear_field() {
        // u_x = -0.001 (y - 0.5): simple shear, no axial strain
        let mesh = Mesh::init_tensor(&[0.0, 1.0], &linspace(0.0, 1.0, 3), &[0.0, 1.0]).unwrap();
        let basis = CellBasis::new(&mesh, 2).unwrap();
        let u = field_from(&mesh, |_, y, _| [-1e-3 * (y - 0.5), 0.0, 0.0]);
        let field = basis.interpolate(&u).unwrap();
        let exx = elemental_mean(&basis, &StrainComponent::XX, &field).unwrap();
        assert_relative_eq!(exx[0], 0.0, epsilon = 1e-15);

        let exy = elemental_mean(&basis, &StrainComponent { i: 0, j: 1 }, &field).unwrap();
        for v in exy {
            assert_relative_eq!(v, -5e-4, epsilon = 1e-15);
        }
    }

    #[test]
    fn test_von_mises_uniaxial() {
        let mesh = bar();
        let basis = CellBasis::new(&mesh, 2).unwrap();
        let u = field_from(&mesh, |x, _, _| [1e-3 * x, 0.0, 0.0]);
        let field = basis.interpolate(&u).unwrap();
        let vm = VonMises {
            elasticity: LinearElasticity::new(0.0, 500.0),
        };
        for v in elemental_mean(&basis, &vm, &field).unwrap() {
            assert_relative_eq!(v, 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_nodal_average() {
        let mesh = bar();
        let nodal = nodal_average(&mesh, &[1.0, 2.0, 4.0]).unwrap();
        assert_eq!(nodal.len(), mesh.n_nodes());
        // x = 0 nodes touch cell 0 only; x = 1 nodes touch cells 0 and 1
        assert_relative_eq!(nodal[0], 1.0);
        assert_relative_eq!(nodal[1], 1.5);
        assert_relative_eq!(nodal[3], 4.0);
        assert!(nodal_average(&mesh, &[1.0]).is_err());
    }

    #[test]
    fn test_mismatched_field_rejected() {
        let mesh = bar();
        let basis = CellBasis::new(&mesh, 2).unwrap();
        let other = CellBasis::new(&mesh, 1).unwrap();
        let field = other.interpolate(&vec![0.0; other.n_dofs()]).unwrap();
        assert!(elemental(&basis, &StrainComponent::XX, &field).is_err());
    }

    #[test]
    fn test_facet_fields_have_values_but_no_strains() {
        let mesh = bar();
        let facets = mesh.facets_satisfying(|p| p[0] == 3.0);
        let basis = FacetBasis::new(&mesh, &facets, 2).unwrap();
        let u = field_from(&mesh, |x, _, _| [0.0, 1e-3 * x, 0.0]);
        let field = basis.interpolate(&u).unwrap();

        let uy = |u: &FunctionValue, _: &QuadPoint| u.value[1];
        let mean = elemental_mean(&basis, &uy, &field).unwrap();
        assert_relative_eq!(mean[0], 3e-3, epsilon = 1e-15);

        assert!(matches!(
            elemental(&basis, &StrainComponent::XX, &field),
            Err(Error::Element(_))
        ));
        assert!(matches!(element_strains(&basis, &field), Err(Error::Element(_))));
    }
}
