//! Builds the scene tree from a [`MeshSet`] and serializes it to a
//! USDZ archive via the Crate writer and the ZIP container.

use crate::crate_writer;
use crate::error::ExportError;
use crate::mesh_intake;
use crate::types::{ExportOptions, MeshSet};
use crate::usd_tree::{AttrValue, MetadataValue, Specifier, Tree, ValueType};
use crate::zip_writer;

const USDC_NAME: &str = "tmp.usdc";

/// Export `meshes` to a USDZ archive: `Root -> ar (Xform) -> Materials (Scope)`
/// holding one `k<id>` Material per color, with sibling `m<id>` Mesh prims
/// under `ar` bound to their material. `options` is accepted for API
/// symmetry with the OBJ/GLB exporters but has no USDZ-specific knobs yet.
pub fn export_usdz(meshes: &MeshSet, _options: &ExportOptions) -> Result<Vec<u8>, ExportError> {
    mesh_intake::validate(meshes)?;
    log::info!("exporting {} color(s) to USDZ", meshes.len());
    let tree = build_tree(meshes);
    let usdc_bytes = crate_writer::write(&tree)?;
    log::debug!("usdc payload is {} bytes before ZIP framing", usdc_bytes.len());
    Ok(zip_writer::build_usdz(USDC_NAME, &usdc_bytes))
}

fn build_tree(meshes: &MeshSet) -> Tree {
    let mut tree = Tree::new();
    let ar = tree.add_prim(tree.root_id(), "ar", Specifier::Def, "Xform");
    tree.set_prim_metadata(
        ar,
        "assetInfo",
        MetadataValue::Dictionary(vec![("name".to_string(), "ar".to_string())]),
    );
    tree.set_prim_metadata(ar, "kind", MetadataValue::Str("component".to_string()));

    let materials_scope = tree.add_prim(ar, "Materials", Specifier::Def, "Scope");

    for (id, (color, mesh)) in meshes.iter().enumerate() {
        let material = tree.add_prim(materials_scope, format!("k{id}"), Specifier::Def, "Material");
        add_material_contents(&mut tree, material, *color);

        let mesh_prim = tree.add_prim(ar, format!("m{id}"), Specifier::Def, "Mesh");
        add_mesh_contents(&mut tree, mesh_prim, material, mesh);
    }

    tree.assign_indices();
    tree.assign_jumps();
    tree
}

fn add_material_contents(tree: &mut Tree, material: crate::usd_tree::NodeId, color: crate::types::Color) {
    let shader = tree.add_prim(material, "surfaceShader", Specifier::Def, "Shader");

    let info_id = tree.add_attribute(
        shader,
        "info:id",
        AttrValue::Token("UsdPreviewSurface".to_string()),
        ValueType::Token,
        "token",
        false,
    );
    tree.add_qualifier(info_id, "uniform");

    tree.add_attribute(
        shader,
        "inputs:diffuseColor",
        AttrValue::Vec3fScalar(color.normalized()),
        ValueType::Vec3fScalar,
        "color3f",
        false,
    );
    tree.add_attribute(
        shader,
        "inputs:roughness",
        AttrValue::Float(0.2),
        ValueType::Float,
        "float",
        false,
    );
    let shader_output = tree.add_attribute(
        shader,
        "outputs:surface",
        AttrValue::None,
        ValueType::Token,
        "token",
        false,
    );

    tree.add_attribute(
        material,
        "outputs:surface",
        AttrValue::Connection(shader_output),
        ValueType::Token,
        "token",
        false,
    );
}

fn add_mesh_contents(
    tree: &mut Tree,
    mesh_prim: crate::usd_tree::NodeId,
    material: crate::usd_tree::NodeId,
    mesh: &crate::types::Mesh,
) {
    tree.add_attribute(
        mesh_prim,
        "material:binding",
        AttrValue::Relationship(material),
        ValueType::PathRelationship,
        "rel",
        false,
    );
    tree.add_attribute(
        mesh_prim,
        "doubleSided",
        AttrValue::Bool(false),
        ValueType::Bool,
        "bool",
        false,
    );

    let face_counts: Vec<i32> = vec![3; mesh.triangle_count()];
    tree.add_attribute(
        mesh_prim,
        "faceVertexCounts",
        AttrValue::Int32Array(face_counts),
        ValueType::Int32Array,
        "int[]",
        true,
    );

    let face_indices: Vec<i32> = mesh.faces.iter().map(|&f| f as i32).collect();
    tree.add_attribute(
        mesh_prim,
        "faceVertexIndices",
        AttrValue::Int32Array(face_indices),
        ValueType::Int32Array,
        "int[]",
        true,
    );

    tree.add_attribute(
        mesh_prim,
        "points",
        AttrValue::Vec3fArray(mesh.positions.clone()),
        ValueType::Vec3fArray,
        "point3f[]",
        true,
    );

    let normals = tree.add_attribute(
        mesh_prim,
        "primvars:normals",
        AttrValue::Vec3fArray(mesh.normals.clone()),
        ValueType::Vec3fArray,
        "normal3f[]",
        true,
    );
    tree.set_attribute_metadata(normals, "interpolation", MetadataValue::Str("vertex".to_string()));

    let subdivision = tree.add_attribute(
        mesh_prim,
        "subdivisionScheme",
        AttrValue::Token("none".to_string()),
        ValueType::Token,
        "token",
        false,
    );
    tree.add_qualifier(subdivision, "uniform");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Color, Mesh};

    fn triangle(color: Color) -> (Color, Mesh) {
        (
            color,
            Mesh {
                positions: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
                normals: vec![[0.0, 0.0, 1.0]; 3],
                faces: vec![0, 1, 2],
            },
        )
    }

    #[test]
    fn build_tree_empty_has_ar_and_materials_only() {
        let tree = build_tree(&MeshSet::new());
        let ar_id = tree.root().children[0];
        let ar = tree.prim(ar_id);
        assert_eq!(ar.name, "ar");
        assert_eq!(ar.children.len(), 1);
        let materials = tree.prim(ar.children[0]);
        assert_eq!(materials.name, "Materials");
        assert!(materials.children.is_empty());
    }

    #[test]
    fn build_tree_two_colors_creates_k_and_m_prims() {
        let mut meshes = MeshSet::new();
        meshes.insert(Color::new(255, 0, 0), triangle(Color::new(255, 0, 0)).1);
        meshes.insert(Color::new(0, 255, 0), triangle(Color::new(0, 255, 0)).1);

        let tree = build_tree(&meshes);
        let ar_id = tree.root().children[0];
        let ar = tree.prim(ar_id);

        // ar's children: Materials, then m0, m1.
        assert_eq!(ar.children.len(), 3);
        let materials = tree.prim(ar.children[0]);
        assert_eq!(materials.children.len(), 2);
        assert_eq!(tree.prim(materials.children[0]).name, "k0");
        assert_eq!(tree.prim(materials.children[1]).name, "k1");
        assert_eq!(tree.prim(ar.children[1]).name, "m0");
        assert_eq!(tree.prim(ar.children[2]).name, "m1");
    }

    #[test]
    fn export_usdz_empty_mesh_set_is_64_byte_aligned_zip() {
        let archive = export_usdz(&MeshSet::new(), &ExportOptions::default()).unwrap();
        assert_eq!(&archive[0..4], &[0x50, 0x4b, 0x03, 0x04]);

        let pos = archive
            .windows(8)
            .position(|w| w == b"PXR-USDC")
            .expect("tmp.usdc payload present");
        assert_eq!(pos % 64, 0);
    }

    #[test]
    fn export_usdz_two_colors_round_trips_without_error() {
        let mut meshes = MeshSet::new();
        meshes.insert(Color::new(255, 0, 0), triangle(Color::new(255, 0, 0)).1);
        meshes.insert(Color::new(0, 255, 0), triangle(Color::new(0, 255, 0)).1);
        let archive = export_usdz(&meshes, &ExportOptions::default()).unwrap();
        assert_eq!(&archive[0..4], &[0x50, 0x4b, 0x03, 0x04]);
    }

    #[test]
    fn export_usdz_rejects_malformed_mesh() {
        let mut meshes = MeshSet::new();
        meshes.insert(
            Color::new(1, 2, 3),
            Mesh {
                positions: vec![[0.0, 0.0, 0.0]],
                normals: vec![[0.0, 0.0, 1.0]],
                faces: vec![0, 1, 2],
            },
        );
        let err = export_usdz(&meshes, &ExportOptions::default()).unwrap_err();
        assert!(matches!(err, ExportError::MalformedMesh { .. }));
    }
}
