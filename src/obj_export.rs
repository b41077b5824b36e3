//! Line-oriented ASCII OBJ/MTL writer. The simplest of the three
//! exporters: no intern tables, no binary layout, just ordered text lines.

use crate::error::ExportError;
use crate::mesh_intake;
use crate::types::{ExportOptions, MeshSet, ObjArtifacts};

/// Export `meshes` to an OBJ + MTL pair. Vertex indices are 1-based and
/// accumulated globally across colors: a mesh's indices are offset by the
/// total vertex count of every mesh written before it.
pub fn export_obj(meshes: &MeshSet, options: &ExportOptions) -> Result<ObjArtifacts, ExportError> {
    mesh_intake::validate(meshes)?;
    log::info!(
        "exporting {} color(s) to {}.obj + {}",
        meshes.len(),
        options.obj_name,
        options.mtl_name
    );

    let mut obj_lines = Vec::new();
    obj_lines.push(format!("mtllib {}", options.mtl_name));

    let mut mtl_lines = Vec::new();

    let mut vertex_offset: u32 = 0;
    for (id, (color, mesh)) in meshes.iter().enumerate() {
        obj_lines.push(format!("g m{id}"));
        obj_lines.push(format!("usemtl k{id}"));
        for p in &mesh.positions {
            obj_lines.push(format!("v {} {} {}", p[0], p[1], p[2]));
        }
        for n in &mesh.normals {
            obj_lines.push(format!("vn {} {} {}", n[0], n[1], n[2]));
        }
        for tri in mesh.faces.chunks_exact(3) {
            let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| i + vertex_offset + 1);
            obj_lines.push(format!("f {a}//{a} {b}//{b} {c}//{c}"));
        }
        vertex_offset += mesh.positions.len() as u32;

        let [r, g, b] = color.normalized();
        mtl_lines.push(format!("newmtl k{id}"));
        mtl_lines.push("Ns 163".to_string());
        mtl_lines.push("Ni 0.001".to_string());
        mtl_lines.push("illum 2".to_string());
        mtl_lines.push("Ka 0.20 0.20 0.20".to_string());
        mtl_lines.push(format!("Kd {r} {g} {b}"));
        mtl_lines.push("Ks 0.25 0.25 0.25".to_string());
    }

    Ok(ObjArtifacts {
        obj: obj_lines.join("\n"),
        mtl: mtl_lines.join("\n"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Color, Mesh};

    fn single_triangle() -> MeshSet {
        let mut meshes = MeshSet::new();
        meshes.insert(
            Color::new(255, 0, 0),
            Mesh {
                positions: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
                normals: vec![[0.0, 0.0, 1.0]; 3],
                faces: vec![0, 1, 2],
            },
        );
        meshes
    }

    #[test]
    fn s2_single_triangle_matches_literal_output() {
        let options = ExportOptions {
            mtl_name: "foo.mtl".to_string(),
            ..ExportOptions::default()
        };
        let artifacts = export_obj(&single_triangle(), &options).unwrap();

        let expected_obj = "mtllib foo.mtl\ng m0\nusemtl k0\nv 0 0 0\nv 1 0 0\nv 0 1 0\n\
            vn 0 0 1\nvn 0 0 1\nvn 0 0 1\nf 1//1 2//2 3//3";
        assert_eq!(artifacts.obj, expected_obj);

        let expected_mtl = "newmtl k0\nNs 163\nNi 0.001\nillum 2\nKa 0.20 0.20 0.20\nKd 1 0 0\nKs 0.25 0.25 0.25";
        assert_eq!(artifacts.mtl, expected_mtl);
    }

    #[test]
    fn vertex_indices_accumulate_globally_across_colors() {
        let mut meshes = single_triangle();
        meshes.insert(
            Color::new(0, 255, 0),
            Mesh {
                positions: vec![[2.0, 0.0, 0.0], [3.0, 0.0, 0.0], [2.0, 1.0, 0.0]],
                normals: vec![[0.0, 0.0, 1.0]; 3],
                faces: vec![0, 1, 2],
            },
        );
        let artifacts = export_obj(&meshes, &ExportOptions::default()).unwrap();
        assert!(artifacts.obj.contains("f 4//4 5//5 6//6"));
    }

    #[test]
    fn rejects_malformed_mesh() {
        let mut meshes = MeshSet::new();
        meshes.insert(
            Color::new(1, 2, 3),
            Mesh {
                positions: vec![[0.0, 0.0, 0.0]],
                normals: vec![],
                faces: vec![],
            },
        );
        let err = export_obj(&meshes, &ExportOptions::default()).unwrap_err();
        assert!(matches!(err, ExportError::MalformedMesh { .. }));
    }
}
