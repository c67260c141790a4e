//! Isotropic linear elastic material.
//!
//! Configured by Young's modulus and Poisson's ratio; the elasticity form
//! works with the Lamé parameters derived from them.

use crate::error::{Error, Result};
use crate::types::ConstitutiveMatrix;
use serde::{Deserialize, Serialize};

/// Lamé parameters (λ, μ) from Young's modulus and Poisson's ratio.
///
/// λ = Eν / ((1+ν)(1−2ν)), μ = E / (2(1+ν)).
pub fn lame_parameters(youngs_modulus: f64, poissons_ratio: f64) -> (f64, f64) {
    let e = youngs_modulus;
    let nu = poissons_ratio;
    (e * nu / ((1.0 + nu) * (1.0 - 2.0 * nu)), e / (2.0 * (1.0 + nu)))
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Material {
    /// Young's modulus E, in stress units.
    pub youngs_modulus: f64,
    /// Poisson's ratio ν.
    pub poissons_ratio: f64,
}

impl Material {
    /// Validated material. E must be positive and ν in (-1, 0.5).
    pub fn new(youngs_modulus: f64, poissons_ratio: f64) -> Result<Self> {
        let material = Self {
            youngs_modulus,
            poissons_ratio,
        };
        material.validate()?;
        Ok(material)
    }

    /// Reject constants outside the stable isotropic range. Deserialized
    /// materials bypass [`Material::new`] and are checked here.
    pub fn validate(&self) -> Result<()> {
        let (e, nu) = (self.youngs_modulus, self.poissons_ratio);
        if !(e.is_finite() && e > 0.0) {
            return Err(Error::InvalidMaterial(format!(
                "Young's modulus must be positive and finite, got {}",
                e
            )));
        }
        if !(nu > -1.0 && nu < 0.5) {
            return Err(Error::InvalidMaterial(format!(
                "Poisson's ratio must lie in (-1, 0.5), got {}",
                nu
            )));
        }
        Ok(())
    }

    /// Lamé's first parameter λ.
    pub fn lame_lambda(&self) -> f64 {
        lame_parameters(self.youngs_modulus, self.poissons_ratio).0
    }

    /// Shear modulus μ.
    pub fn lame_mu(&self) -> f64 {
        lame_parameters(self.youngs_modulus, self.poissons_ratio).1
    }

    /// Voigt stiffness D with σ = D ε, shear rows acting on engineering
    /// strains γ = 2ε.
    pub fn constitutive_3d(&self) -> ConstitutiveMatrix {
        let (lambda, mu) = lame_parameters(self.youngs_modulus, self.poissons_ratio);
        let mut d = ConstitutiveMatrix::zeros();
        for i in 0..3 {
            for j in 0..3 {
                d[(i, j)] = lambda;
            }
            d[(i, i)] += 2.0 * mu;
            d[(i + 3, i + 3)] = mu;
        }
        d
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_accepts_reference_material() {
        let mat = Material::new(1e9, 0.3).unwrap();
        assert_eq!(mat.youngs_modulus, 1e9);
        assert_eq!(mat.poissons_ratio, 0.3);
    }

    #[test]
    fn test_rejects_unstable_constants() {
        for (e, nu) in [
            (0.0, 0.3),
            (-5.0, 0.3),
            (f64::INFINITY, 0.3),
            (f64::NAN, 0.3),
            (1e9, 0.5),
            (1e9, -1.0),
            (1e9, f64::NAN),
        ] {
            assert!(
                matches!(Material::new(e, nu), Err(Error::InvalidMaterial(_))),
                "accepted E = {}, nu = {}",
                e,
                nu
            );
        }
    }

    #[test]
    fn test_lame_parameters() {
        // E = 1e9, ν = 0.3: λ = 0.3e9 / (1.3 · 0.4), μ = 1e9 / 2.6
        let (lambda, mu) = lame_parameters(1e9, 0.3);
        assert_relative_eq!(lambda, 0.3e9 / 0.52, max_relative = 1e-12);
        assert_relative_eq!(mu, 1e9 / 2.6, max_relative = 1e-12);

        let mat = Material::new(1e9, 0.3).unwrap();
        assert_relative_eq!(mat.lame_lambda(), lambda);
        assert_relative_eq!(mat.lame_mu(), mu);

        // ν = 0 decouples the normal directions
        assert_eq!(lame_parameters(2.0, 0.0), (0.0, 1.0));
    }

    #[test]
    fn test_uniaxial_stress_recovers_youngs_modulus() {
        // Strain state of a bar under uniaxial stress: εx = 1, εy = εz = -ν
        let mat = Material::new(7e10, 0.25).unwrap();
        let d = mat.constitutive_3d();
        let strain = nalgebra::Vector6::new(1.0, -0.25, -0.25, 0.0, 0.0, 0.0);
        let stress = d * strain;
        assert_relative_eq!(stress[0], 7e10, max_relative = 1e-12);
        assert_relative_eq!(stress[1], 0.0, epsilon = 1e-3);
        assert_relative_eq!(stress[2], 0.0, epsilon = 1e-3);
        assert_eq!(d, d.transpose());
    }
}
