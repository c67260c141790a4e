//! VTK export of meshes and result fields.
//!
//! Writes an unstructured grid of hexahedra through `vtkio`. The file format
//! follows the extension: `.vtk` for the legacy ASCII format, `.vtu` for XML.

use crate::error::{Error, Result};
use crate::mesh::Mesh;
use std::path::Path;
use tracing::info;
use vtkio::model::{
    Attribute, Attributes, ByteOrder, CellType, Cells, DataArray, DataSet, ElementType, IOBuffer,
    UnstructuredGridPiece, Version, VertexNumbers, Vtk,
};

/// Named per-cell scalar field.
pub type CellField<'a> = (&'a str, &'a [f64]);

/// Named per-node vector field, three interleaved components per node.
pub type PointField<'a> = (&'a str, &'a [f64]);

/// Write `mesh` with per-cell scalar fields.
///
/// Each field must hold exactly one value per cell.
pub fn write_vtk(path: impl AsRef<Path>, mesh: &Mesh, cell_data: &[CellField<'_>]) -> Result<()> {
    write_vtk_with_points(path, mesh, &[], cell_data)
}

/// Write `mesh` with per-node vector fields and per-cell scalar fields.
pub fn write_vtk_with_points(
    path: impl AsRef<Path>,
    mesh: &Mesh,
    point_data: &[PointField<'_>],
    cell_data: &[CellField<'_>],
) -> Result<()> {
    let path = path.as_ref();
    let legacy = match path.extension().and_then(|e| e.to_str()) {
        Some("vtk") => true,
        Some("vtu") => false,
        _ => {
            return Err(Error::Export(format!(
                "unsupported output extension for {} (expected .vtk or .vtu)",
                path.display()
            )))
        }
    };

    let vtk = build_vtk(mesh, point_data, cell_data)?;
    let written = if legacy {
        vtk.export_ascii(path)
    } else {
        vtk.export(path)
    };
    written.map_err(|e| Error::Export(format!("{}: {:?}", path.display(), e)))?;

    info!(
        path = %path.display(),
        n_cells = mesh.n_elements(),
        n_fields = cell_data.len() + point_data.len(),
        "wrote VTK file"
    );
    Ok(())
}

fn build_vtk(mesh: &Mesh, point_data: &[PointField<'_>], cell_data: &[CellField<'_>]) -> Result<Vtk> {
    let n_cells = mesh.n_elements();
    let n_nodes = mesh.n_nodes();

    let mut cell_attributes = Vec::with_capacity(cell_data.len());
    for &(name, values) in cell_data {
        if values.len() != n_cells {
            return Err(Error::Export(format!(
                "cell field '{}' has {} values for {} cells",
                name,
                values.len(),
                n_cells
            )));
        }
        cell_attributes.push(Attribute::DataArray(DataArray {
            name: name.to_string(),
            elem: ElementType::Scalars {
                num_comp: 1,
                lookup_table: None,
            },
            data: IOBuffer::F64(values.to_vec()),
        }));
    }

    let mut point_attributes = Vec::with_capacity(point_data.len());
    for &(name, values) in point_data {
        if values.len() != 3 * n_nodes {
            return Err(Error::Export(format!(
                "point field '{}' has {} values for {} nodes",
                name,
                values.len(),
                n_nodes
            )));
        }
        point_attributes.push(Attribute::DataArray(DataArray {
            name: name.to_string(),
            elem: ElementType::Vectors,
            data: IOBuffer::F64(values.to_vec()),
        }));
    }

    let points: Vec<f64> = mesh.nodes().iter().flat_map(|p| [p[0], p[1], p[2]]).collect();
    // Legacy layout: vertex count followed by the vertex indices of each cell
    let vertices: Vec<u32> = mesh
        .cells()
        .iter()
        .flat_map(|cell| std::iter::once(8).chain(cell.iter().map(|&n| n as u32)))
        .collect();

    Ok(Vtk {
        version: Version { major: 4, minor: 2 },
        title: String::from("brick elasticity result"),
        // Legacy binary readers expect big-endian data
        byte_order: ByteOrder::BigEndian,
        file_path: None,
        data: DataSet::inline(UnstructuredGridPiece {
            points: IOBuffer::F64(points),
            cells: Cells {
                cell_verts: VertexNumbers::Legacy {
                    num_cells: n_cells as u32,
                    vertices,
                },
                types: vec![CellType::Hexahedron; n_cells],
            },
            data: Attributes {
                point: point_attributes,
                cell: cell_attributes,
            },
        }),
    })
}
