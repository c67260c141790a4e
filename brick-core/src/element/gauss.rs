//! Gauss-Legendre quadrature on the reference interval, square and cube.
//!
//! The 1D nodes are the roots of the Legendre polynomial P_n, found by Newton
//! iteration; the square and cube rules are tensor products of the 1D rule.
//!
//! ```
//! use brick_core::element::gauss::{gauss_1d, gauss_hex};
//!
//! // ∫_{-1}^{1} x² dx = 2/3 with the 2-point rule
//! let integral: f64 = gauss_1d(2).iter().map(|&(x, w)| x * x * w).sum();
//! assert!((integral - 2.0 / 3.0).abs() < 1e-14);
//!
//! // 2×2×2 rule: weights sum to the reference volume
//! let volume: f64 = gauss_hex(2).iter().map(|gp| gp.weight).sum();
//! assert!((volume - 8.0).abs() < 1e-14);
//! ```

use std::f64::consts::PI;

/// Largest per-direction point count accepted from configuration.
pub const MAX_ORDER: usize = 4;

/// Quadrature point on a reference cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaussPoint {
    /// Reference coordinates [ξ, η, ζ]; unused directions are zero.
    pub coords: [f64; 3],
    pub weight: f64,
}

/// P_n(x) and P_n'(x) by the three-term recurrence. Requires n >= 1.
fn legendre(n: usize, x: f64) -> (f64, f64) {
    let (mut prev, mut cur) = (1.0, x);
    for k in 2..=n {
        let k = k as f64;
        let next = ((2.0 * k - 1.0) * x * cur - (k - 1.0) * prev) / k;
        prev = cur;
        cur = next;
    }
    let derivative = n as f64 * (x * cur - prev) / (x * x - 1.0);
    (cur, derivative)
}

/// The n-point rule on [-1, 1] as (node, weight) pairs, nodes ascending.
///
/// Exact for polynomials up to degree 2n - 1. `n = 0` gives an empty rule.
pub fn gauss_1d(n: usize) -> Vec<(f64, f64)> {
    let mut rule: Vec<(f64, f64)> = (0..n)
        .map(|i| {
            // Chebyshev-like starting guess, descending in i
            let mut x = (PI * (i as f64 + 0.75) / (n as f64 + 0.5)).cos();
            for _ in 0..100 {
                let (p, dp) = legendre(n, x);
                let dx = p / dp;
                x -= dx;
                if dx.abs() < 1e-16 {
                    break;
                }
            }
            let (_, dp) = legendre(n, x);
            (x, 2.0 / ((1.0 - x * x) * dp * dp))
        })
        .collect();
    rule.reverse();
    rule
}

/// Tensor product of the n-point rule over the first `dim` directions.
fn tensor_rule(n: usize, dim: usize) -> Vec<GaussPoint> {
    let line = gauss_1d(n);
    let mut points = vec![GaussPoint {
        coords: [0.0; 3],
        weight: 1.0,
    }];
    for axis in 0..dim {
        points = points
            .iter()
            .flat_map(|p| {
                line.iter().map(move |&(x, w)| {
                    let mut coords = p.coords;
                    coords[axis] = x;
                    GaussPoint {
                        coords,
                        weight: p.weight * w,
                    }
                })
            })
            .collect();
    }
    points
}

/// n³ points on [-1, 1]³. n = 2 integrates the trilinear stiffness of
/// box-shaped cells exactly.
pub fn gauss_hex(n: usize) -> Vec<GaussPoint> {
    tensor_rule(n, 3)
}

/// n² points on [-1, 1]², with ζ = 0.
pub fn gauss_quad(n: usize) -> Vec<GaussPoint> {
    tensor_rule(n, 2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_known_nodes() {
        let two = gauss_1d(2);
        assert_relative_eq!(two[1].0, 1.0 / 3.0_f64.sqrt(), epsilon = 1e-15);
        assert_relative_eq!(two[0].1, 1.0, epsilon = 1e-14);

        let three = gauss_1d(3);
        assert_relative_eq!(three[1].0, 0.0, epsilon = 1e-15);
        assert_relative_eq!(three[1].1, 8.0 / 9.0, epsilon = 1e-14);
        assert_relative_eq!(three[2].0, 0.6_f64.sqrt(), epsilon = 1e-15);
        assert_relative_eq!(three[2].1, 5.0 / 9.0, epsilon = 1e-14);

        assert!(gauss_1d(0).is_empty());
    }

    #[test]
    fn test_rule_is_symmetric_and_sorted() {
        for n in 1..=8 {
            let rule = gauss_1d(n);
            assert_eq!(rule.len(), n);
            assert!(rule.windows(2).all(|w| w[0].0 < w[1].0));
            for (a, b) in rule.iter().zip(rule.iter().rev()) {
                assert_relative_eq!(a.0, -b.0, epsilon = 1e-14);
                assert_relative_eq!(a.1, b.1, epsilon = 1e-13);
            }
        }
    }

    #[test]
    fn test_exact_up_to_degree_2n_minus_1() {
        for n in 1..=6 {
            let rule = gauss_1d(n);
            for degree in 0..2 * n {
                let integral: f64 = rule.iter().map(|&(x, w)| x.powi(degree as i32) * w).sum();
                let exact = if degree % 2 == 0 {
                    2.0 / (degree as f64 + 1.0)
                } else {
                    0.0
                };
                assert_relative_eq!(integral, exact, epsilon = 1e-13);
            }
        }
    }

    #[test]
    fn test_tensor_rules() {
        for n in 1..=MAX_ORDER {
            let hex = gauss_hex(n);
            assert_eq!(hex.len(), n * n * n);
            assert_relative_eq!(hex.iter().map(|gp| gp.weight).sum::<f64>(), 8.0, epsilon = 1e-13);

            let quad = gauss_quad(n);
            assert_eq!(quad.len(), n * n);
            assert_relative_eq!(quad.iter().map(|gp| gp.weight).sum::<f64>(), 4.0, epsilon = 1e-13);
            assert!(quad.iter().all(|gp| gp.coords[2] == 0.0));
        }
    }

    #[test]
    fn test_hex_rule_integrates_mixed_product() {
        // ∫ ξ² (1 + η) ζ⁴ over [-1, 1]³ = (2/3) · 2 · (2/5)
        let integral: f64 = gauss_hex(3)
            .iter()
            .map(|gp| {
                let [x, y, z] = gp.coords;
                x * x * (1.0 + y) * z.powi(4) * gp.weight
            })
            .sum();
        assert_relative_eq!(integral, 8.0 / 15.0, epsilon = 1e-13);
    }
}
