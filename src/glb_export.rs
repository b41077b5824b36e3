//! glTF 2.0 binary (GLB) writer: a JSON manifest plus an interleaved
//! binary buffer, wrapped in the two-chunk GLB container.

use serde_json::{json, Value};

use crate::byte_sink::ByteSink;
use crate::error::ExportError;
use crate::mesh_intake;
use crate::types::{ExportOptions, MeshSet};

const MAGIC: &[u8; 4] = b"glTF";
const VERSION: u32 = 2;
const JSON_CHUNK_TYPE: &[u8; 4] = b"JSON";
const BIN_CHUNK_TYPE: &[u8; 4] = b"BIN\0";

const COMPONENT_TYPE_UNSIGNED_INT: u32 = 5125;
const COMPONENT_TYPE_FLOAT: u32 = 5126;
const TARGET_ARRAY_BUFFER: u32 = 34962;
const TARGET_ELEMENT_ARRAY_BUFFER: u32 = 34963;

/// Export `meshes` to a single GLB buffer: one scene, one node, one mesh with
/// one primitive per color, three accessors/bufferViews per primitive.
pub fn export_glb(meshes: &MeshSet, options: &ExportOptions) -> Result<Vec<u8>, ExportError> {
    mesh_intake::validate(meshes)?;
    log::info!("exporting {} color(s) to GLB", meshes.len());

    let mut bin = ByteSink::new();
    let mut buffer_views = Vec::new();
    let mut accessors = Vec::new();
    let mut primitives = Vec::new();
    let mut materials = Vec::new();

    for (id, (color, mesh)) in meshes.iter().enumerate() {
        let indices_view = buffer_views.len();
        let indices_offset = bin.tell();
        for &idx in &mesh.faces {
            bin.write_u32(idx);
        }
        buffer_views.push(json!({
            "buffer": 0,
            "byteOffset": indices_offset,
            "byteLength": mesh.faces.len() * 4,
            "target": TARGET_ELEMENT_ARRAY_BUFFER,
        }));
        let indices_accessor = accessors.len();
        accessors.push(json!({
            "bufferView": indices_view,
            "componentType": COMPONENT_TYPE_UNSIGNED_INT,
            "count": mesh.faces.len(),
            "type": "SCALAR",
        }));

        let positions_view = buffer_views.len();
        let positions_offset = bin.tell();
        for p in &mesh.positions {
            bin.write_f32(p[0]);
            bin.write_f32(p[1]);
            bin.write_f32(p[2]);
        }
        buffer_views.push(json!({
            "buffer": 0,
            "byteOffset": positions_offset,
            "byteLength": mesh.positions.len() * 12,
            "target": TARGET_ARRAY_BUFFER,
        }));
        let (min, max) = mesh.bounding_box();
        let positions_accessor = accessors.len();
        accessors.push(json!({
            "bufferView": positions_view,
            "componentType": COMPONENT_TYPE_FLOAT,
            "count": mesh.positions.len(),
            "type": "VEC3",
            "min": min,
            "max": max,
        }));

        let normals_view = buffer_views.len();
        let normals_offset = bin.tell();
        for n in &mesh.normals {
            bin.write_f32(n[0]);
            bin.write_f32(n[1]);
            bin.write_f32(n[2]);
        }
        buffer_views.push(json!({
            "buffer": 0,
            "byteOffset": normals_offset,
            "byteLength": mesh.normals.len() * 12,
            "target": TARGET_ARRAY_BUFFER,
        }));
        let normals_accessor = accessors.len();
        accessors.push(json!({
            "bufferView": normals_view,
            "componentType": COMPONENT_TYPE_FLOAT,
            "count": mesh.normals.len(),
            "type": "VEC3",
        }));

        primitives.push(json!({
            "attributes": {
                "POSITION": positions_accessor,
                "NORMAL": normals_accessor,
            },
            "indices": indices_accessor,
            "material": id,
        }));

        let [r, g, b] = color.normalized();
        materials.push(json!({
            "pbrMetallicRoughness": {
                "baseColorFactor": [r, g, b, 1.0],
                "metallicFactor": 0.0,
                "roughnessFactor": 0.5,
            },
        }));
    }

    let manifest: Value = json!({
        "asset": { "version": "2.0", "generator": options.glb_generator },
        "scene": 0,
        "scenes": [{ "nodes": [0] }],
        "nodes": [{ "mesh": 0 }],
        "meshes": [{ "primitives": primitives }],
        "materials": materials,
        "accessors": accessors,
        "bufferViews": buffer_views,
        "buffers": [{ "byteLength": bin.tell() }],
    });

    let mut json_bytes = serde_json::to_vec(&manifest).map_err(|e| ExportError::Io(e.into()))?;
    while json_bytes.len() % 4 != 0 {
        json_bytes.push(0x20);
    }

    let mut bin_bytes = bin.into_vec();
    while bin_bytes.len() % 4 != 0 {
        bin_bytes.push(0x00);
    }

    let total_len = 12 + 8 + json_bytes.len() + 8 + bin_bytes.len();

    let mut out = ByteSink::new();
    out.write_bytes(MAGIC);
    out.write_u32(VERSION);
    out.write_u32(total_len as u32);

    out.write_u32(json_bytes.len() as u32);
    out.write_bytes(JSON_CHUNK_TYPE);
    out.write_bytes(&json_bytes);

    out.write_u32(bin_bytes.len() as u32);
    out.write_bytes(BIN_CHUNK_TYPE);
    out.write_bytes(&bin_bytes);

    Ok(out.into_vec())
}
