//! Structured hexahedral mesh.
//!
//! Stores nodal coordinates and Hex8 connectivity for tensor-product grids,
//! and derives boundary facets addressable by geometric predicates.
//!
//! Nodes are numbered with x varying fastest: node (i, j, k) has index
//! `i + nx * (j + ny * k)`. Cells use the Hex8 local numbering (bottom face
//! counter-clockwise, then top face), so every cell of a tensor grid has a
//! positive Jacobian.

use crate::error::{Error, Result};
use crate::types::{Axis, Point3};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Local node indices of the six Hex8 faces, ordered so that
/// (p1 - p0) × (p3 - p0) points out of the element.
pub const HEX8_FACES: [[usize; 4]; 6] = [
    [0, 3, 2, 1], // ζ = -1
    [4, 5, 6, 7], // ζ = +1
    [0, 1, 5, 4], // η = -1
    [1, 2, 6, 5], // ξ = +1
    [2, 3, 7, 6], // η = +1
    [3, 0, 4, 7], // ξ = -1
];

/// `n` equally spaced values from `start` to `end` inclusive.
pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            let mut values: Vec<f64> = (0..n).map(|i| start + step * i as f64).collect();
            // Pin the last value so facet predicates like `x == end` match exactly
            values[n - 1] = end;
            values
        }
    }
}

/// A boundary face of a hexahedral cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Facet {
    /// Owning element index.
    pub element: usize,
    /// Local face index into [`HEX8_FACES`].
    pub local_face: usize,
    /// Global node indices, outward orientation.
    pub nodes: [usize; 4],
}

/// Axis-aligned plane used to select facets and nodes from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Selector {
    /// Axis normal to the plane.
    pub axis: Axis,
    /// Plane coordinate.
    pub value: f64,
    /// Absolute matching tolerance; zero means exact equality.
    #[serde(default)]
    pub tolerance: f64,
}

impl Selector {
    /// Plane `axis == value` with exact matching.
    pub fn plane(axis: Axis, value: f64) -> Self {
        Self {
            axis,
            value,
            tolerance: 0.0,
        }
    }

    /// Whether a point lies on the plane.
    pub fn contains(&self, point: &Point3) -> bool {
        (point[self.axis.index()] - self.value).abs() <= self.tolerance
    }
}

/// Structured hexahedral finite element mesh.
#[derive(Debug, Clone)]
pub struct Mesh {
    /// Nodal coordinates.
    nodes: Vec<Point3>,
    /// Hex8 connectivity.
    cells: Vec<[usize; 8]>,
}

impl Mesh {
    /// Tensor-product hexahedral grid over three axis partitions.
    ///
    /// Each partition must contain at least two finite, strictly increasing
    /// coordinates.
    pub fn init_tensor(x: &[f64], y: &[f64], z: &[f64]) -> Result<Self> {
        for (axis, partition) in Axis::ALL.iter().zip([x, y, z]) {
            check_partition(*axis, partition)?;
        }

        let (nx, ny, nz) = (x.len(), y.len(), z.len());
        let node_index = |i: usize, j: usize, k: usize| i + nx * (j + ny * k);

        let mut nodes = Vec::with_capacity(nx * ny * nz);
        for &zk in z {
            for &yj in y {
                for &xi in x {
                    nodes.push(Point3::new(xi, yj, zk));
                }
            }
        }

        let mut cells = Vec::with_capacity((nx - 1) * (ny - 1) * (nz - 1));
        for k in 0..nz - 1 {
            for j in 0..ny - 1 {
                for i in 0..nx - 1 {
                    cells.push([
                        node_index(i, j, k),
                        node_index(i + 1, j, k),
                        node_index(i + 1, j + 1, k),
                        node_index(i, j + 1, k),
                        node_index(i, j, k + 1),
                        node_index(i + 1, j, k + 1),
                        node_index(i + 1, j + 1, k + 1),
                        node_index(i, j + 1, k + 1),
                    ]);
                }
            }
        }

        Ok(Self { nodes, cells })
    }

    /// Number of nodes in the mesh.
    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Number of elements in the mesh.
    pub fn n_elements(&self) -> usize {
        self.cells.len()
    }

    /// Get nodal coordinates.
    pub fn nodes(&self) -> &[Point3] {
        &self.nodes
    }

    /// Get element connectivity.
    pub fn cells(&self) -> &[[usize; 8]] {
        &self.cells
    }

    /// Get coordinates for an element's nodes.
    pub fn element_coords(&self, elem_idx: usize) -> Option<[Point3; 8]> {
        let cell = self.cells.get(elem_idx)?;
        Some(cell.map(|i| self.nodes[i]))
    }

    /// Get coordinates for a facet's nodes.
    pub fn facet_coords(&self, facet: &Facet) -> [Point3; 4] {
        facet.nodes.map(|i| self.nodes[i])
    }

    /// Centroid of a facet.
    pub fn facet_centroid(&self, facet: &Facet) -> Point3 {
        self.facet_coords(facet).iter().sum::<Point3>() / 4.0
    }

    /// Facets that belong to exactly one element, in element order.
    pub fn boundary_facets(&self) -> Vec<Facet> {
        let face_key = |cell: &[usize; 8], face: &[usize; 4]| {
            let mut key = face.map(|l| cell[l]);
            key.sort_unstable();
            key
        };

        let mut counts: HashMap<[usize; 4], usize> = HashMap::with_capacity(self.cells.len() * 6);
        for cell in &self.cells {
            for face in &HEX8_FACES {
                *counts.entry(face_key(cell, face)).or_insert(0) += 1;
            }
        }

        let mut facets = Vec::new();
        for (element, cell) in self.cells.iter().enumerate() {
            for (local_face, face) in HEX8_FACES.iter().enumerate() {
                if counts[&face_key(cell, face)] == 1 {
                    facets.push(Facet {
                        element,
                        local_face,
                        nodes: face.map(|l| cell[l]),
                    });
                }
            }
        }
        facets
    }

    /// Boundary facets whose centroid satisfies `predicate`.
    pub fn facets_satisfying<F>(&self, predicate: F) -> Vec<Facet>
    where
        F: Fn(&Point3) -> bool,
    {
        self.boundary_facets()
            .into_iter()
            .filter(|facet| predicate(&self.facet_centroid(facet)))
            .collect()
    }

    /// Boundary facets whose four vertices all satisfy `predicate`.
    pub fn facets_with_all_nodes<F>(&self, predicate: F) -> Vec<Facet>
    where
        F: Fn(&Point3) -> bool,
    {
        self.boundary_facets()
            .into_iter()
            .filter(|facet| facet.nodes.iter().all(|&n| predicate(&self.nodes[n])))
            .collect()
    }

    /// Indices of nodes satisfying `predicate`.
    pub fn nodes_satisfying<F>(&self, predicate: F) -> Vec<usize>
    where
        F: Fn(&Point3) -> bool,
    {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, p)| predicate(p))
            .map(|(i, _)| i)
            .collect()
    }

    /// New mesh with every node moved by `scale * u_node`.
    ///
    /// `displacement` holds three interleaved components per node.
    pub fn translated(&self, displacement: &[f64], scale: f64) -> Result<Mesh> {
        if displacement.len() != 3 * self.nodes.len() {
            return Err(Error::Mesh(format!(
                "Displacement has {} entries, expected {}",
                displacement.len(),
                3 * self.nodes.len()
            )));
        }

        let nodes = self
            .nodes
            .iter()
            .zip(displacement.chunks_exact(3))
            .map(|(p, u)| p + Point3::new(u[0], u[1], u[2]) * scale)
            .collect();

        Ok(Mesh {
            nodes,
            cells: self.cells.clone(),
        })
    }

    /// Compute mesh bounding box.
    pub fn bounds(&self) -> Option<(Point3, Point3)> {
        if self.nodes.is_empty() {
            return None;
        }

        let mut min = self.nodes[0];
        let mut max = self.nodes[0];

        for node in &self.nodes[1..] {
            for i in 0..3 {
                min[i] = min[i].min(node[i]);
                max[i] = max[i].max(node[i]);
            }
        }

        Some((min, max))
    }
}

fn check_partition(axis: Axis, partition: &[f64]) -> Result<()> {
    if partition.len() < 2 {
        return Err(Error::Mesh(format!(
            "Partition along {} needs at least 2 coordinates, got {}",
            axis,
            partition.len()
        )));
    }
    if let Some(bad) = partition.iter().find(|v| !v.is_finite()) {
        return Err(Error::Mesh(format!(
            "Partition along {} contains non-finite coordinate {}",
            axis, bad
        )));
    }
    if let Some(i) = partition.windows(2).position(|w| w[1] <= w[0]) {
        return Err(Error::Mesh(format!(
            "Partition along {} is not strictly increasing at index {} ({} -> {})",
            axis,
            i + 1,
            partition[i],
            partition[i + 1]
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_grid(n: usize) -> Mesh {
        let p = linspace(0.0, 1.0, n + 1);
        Mesh::init_tensor(&p, &p, &p).unwrap()
    }

    #[test]
    fn test_linspace() {
        let v = linspace(0.0, 5.0, 15);
        assert_eq!(v.len(), 15);
        assert_eq!(v[0], 0.0);
        assert_eq!(v[14], 5.0);
        assert!(v.windows(2).all(|w| w[1] > w[0]));
        assert!(linspace(0.0, 1.0, 0).is_empty());
    }

    #[test]
    fn test_tensor_mesh_counts() {
        let x = linspace(0.0, 5.0, 15);
        let y = linspace(0.0, 1.0, 5);
        let z = linspace(0.0, 1.0, 5);
        let mesh = Mesh::init_tensor(&x, &y, &z).unwrap();
        assert_eq!(mesh.n_nodes(), 15 * 5 * 5);
        assert_eq!(mesh.n_elements(), 14 * 4 * 4);
    }

    #[test]
    fn test_node_ordering_x_fastest() {
        let mesh = Mesh::init_tensor(&[0.0, 1.0, 2.0], &[0.0, 1.0], &[0.0, 1.0]).unwrap();
        assert_eq!(mesh.nodes()[1], Point3::new(1.0, 0.0, 0.0));
        assert_eq!(mesh.nodes()[3], Point3::new(0.0, 1.0, 0.0));
        assert_eq!(mesh.nodes()[6], Point3::new(0.0, 0.0, 1.0));
        assert_eq!(mesh.cells()[1], [1, 2, 5, 4, 7, 8, 11, 10]);
    }

    #[test]
    fn test_rejects_non_increasing_partition() {
        assert!(Mesh::init_tensor(&[0.0, 1.0, 1.0], &[0.0, 1.0], &[0.0, 1.0]).is_err());
        assert!(Mesh::init_tensor(&[0.0, 2.0, 1.0], &[0.0, 1.0], &[0.0, 1.0]).is_err());
        assert!(Mesh::init_tensor(&[0.0], &[0.0, 1.0], &[0.0, 1.0]).is_err());
        assert!(Mesh::init_tensor(&[0.0, f64::NAN], &[0.0, 1.0], &[0.0, 1.0]).is_err());
    }

    #[test]
    fn test_boundary_facet_count() {
        // 2x2x2 grid: 6 sides * 4 faces each
        let mesh = unit_grid(2);
        assert_eq!(mesh.boundary_facets().len(), 24);

        let mesh = unit_grid(1);
        assert_eq!(mesh.boundary_facets().len(), 6);
    }

    #[test]
    fn test_facet_orientation_outward() {
        let mesh = unit_grid(2);
        let center = Point3::new(0.5, 0.5, 0.5);
        for facet in mesh.boundary_facets() {
            let p = mesh.facet_coords(&facet);
            let normal = (p[1] - p[0]).cross(&(p[3] - p[0]));
            let outward = mesh.facet_centroid(&facet) - center;
            assert!(normal.dot(&outward) > 0.0, "facet {:?} points inward", facet);
        }
    }

    #[test]
    fn test_facets_satisfying_plane() {
        let mesh = unit_grid(3);
        let facets = mesh.facets_satisfying(|p| p[0] == 1.0);
        assert_eq!(facets.len(), 9);
        for facet in &facets {
            for &n in &facet.nodes {
                assert_eq!(mesh.nodes()[n][0], 1.0);
            }
        }
        assert_eq!(mesh.facets_with_all_nodes(|p| p[0] == 1.0), facets);
        assert!(mesh.facets_satisfying(|p| p[0] == 0.5).is_empty());
    }

    #[test]
    fn test_selector_matches_plane() {
        let sel = Selector::plane(Axis::Z, 1.0);
        assert!(sel.contains(&Point3::new(0.3, 0.2, 1.0)));
        assert!(!sel.contains(&Point3::new(0.3, 0.2, 0.999)));

        let loose = Selector {
            tolerance: 1e-2,
            ..sel
        };
        assert!(loose.contains(&Point3::new(0.3, 0.2, 0.999)));
    }

    #[test]
    fn test_translated() {
        let mesh = unit_grid(1);
        let mut u = vec![0.0; 3 * mesh.n_nodes()];
        u[1] = -0.5; // node 0, y
        let moved = mesh.translated(&u, 2.0).unwrap();
        assert_eq!(moved.nodes()[0], Point3::new(0.0, -1.0, 0.0));
        assert_eq!(moved.nodes()[7], mesh.nodes()[7]);
        assert!(mesh.translated(&u[..3], 1.0).is_err());
    }

    #[test]
    fn test_bounds() {
        let mesh = Mesh::init_tensor(&[-1.0, 1.0], &[-2.0, 2.0], &[-3.0, 3.0]).unwrap();
        let (min, max) = mesh.bounds().unwrap();
        assert_eq!(min, Point3::new(-1.0, -2.0, -3.0));
        assert_eq!(max, Point3::new(1.0, 2.0, 3.0));
    }
}
