//! Mesh-set validation, shared by all three exporters.
//!
//! Grounded in the `obj_converter`/`png_converter` validation idiom:
//! build a descriptive error naming the offending value, fail before any
//! bytes are written: all errors are fatal, no partial output.

use crate::error::ExportError;
use crate::types::MeshSet;

/// Validate structural invariants for every mesh in `meshes`.
///
/// Checks, per color, in order: `positions.len() == normals.len()`,
/// `faces.len() % 3 == 0`, and every face index `< positions.len()`.
pub fn validate(meshes: &MeshSet) -> Result<(), ExportError> {
    for (color, mesh) in meshes.iter() {
        if mesh.positions.len() != mesh.normals.len() {
            return Err(ExportError::MalformedMesh {
                color: color.to_u32(),
                reason: format!(
                    "{} positions but {} normals",
                    mesh.positions.len(),
                    mesh.normals.len()
                ),
            });
        }
        if mesh.faces.len() % 3 != 0 {
            return Err(ExportError::MalformedMesh {
                color: color.to_u32(),
                reason: format!("{} face indices is not a multiple of 3", mesh.faces.len()),
            });
        }
        for &idx in &mesh.faces {
            if idx as usize >= mesh.positions.len() {
                return Err(ExportError::MalformedMesh {
                    color: color.to_u32(),
                    reason: format!(
                        "face index {idx} out of range for {} positions",
                        mesh.positions.len()
                    ),
                });
            }
        }
        log::debug!(
            "color #{:06x}: {} vertices, {} triangles",
            color.to_u32(),
            mesh.positions.len(),
            mesh.triangle_count()
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Color, Mesh};

    fn tri() -> Mesh {
        Mesh {
            positions: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            normals: vec![[0.0, 0.0, 1.0], [0.0, 0.0, 1.0], [0.0, 0.0, 1.0]],
            faces: vec![0, 1, 2],
        }
    }

    #[test]
    fn accepts_valid_mesh() {
        let mut set = MeshSet::new();
        set.insert(Color::new(255, 0, 0), tri());
        assert!(validate(&set).is_ok());
    }

    #[test]
    fn accepts_empty_mesh_set() {
        assert!(validate(&MeshSet::new()).is_ok());
    }

    #[test]
    fn accepts_mesh_with_zero_faces() {
        let mut set = MeshSet::new();
        set.insert(
            Color::new(0, 0, 0),
            Mesh {
                positions: vec![[0.0, 0.0, 0.0]],
                normals: vec![[0.0, 1.0, 0.0]],
                faces: vec![],
            },
        );
        assert!(validate(&set).is_ok());
    }

    #[test]
    fn rejects_mismatched_normals() {
        let mut set = MeshSet::new();
        let mut mesh = tri();
        mesh.normals.pop();
        set.insert(Color::new(1, 2, 3), mesh);
        let err = validate(&set).unwrap_err();
        assert!(matches!(err, ExportError::MalformedMesh { color, .. } if color == 0x010203));
    }

    #[test]
    fn rejects_non_triangle_face_count() {
        let mut set = MeshSet::new();
        let mut mesh = tri();
        mesh.faces.push(0);
        set.insert(Color::new(0, 0, 0), mesh);
        assert!(matches!(
            validate(&set).unwrap_err(),
            ExportError::MalformedMesh { .. }
        ));
    }

    #[test]
    fn rejects_out_of_range_face_index() {
        let mut set = MeshSet::new();
        let mut mesh = tri();
        mesh.faces[2] = 99;
        set.insert(Color::new(0, 0, 0), mesh);
        assert!(matches!(
            validate(&set).unwrap_err(),
            ExportError::MalformedMesh { .. }
        ));
    }
}
