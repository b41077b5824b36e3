//! Exports colored triangle meshes to three interchange formats: ASCII
//! OBJ/MTL, binary glTF (GLB), and binary USD Crate wrapped in a USDZ
//! archive. See each module for the format it owns.

/// Error types for mesh export.
pub mod error;

/// Core type definitions: colors, meshes, mesh sets, export options.
pub mod types;

/// Shared structural validation run by every exporter before it writes anything.
pub mod mesh_intake;

/// Append-only little-endian byte buffer used by the binary writers.
pub mod byte_sink;

/// Single-block LZ4 compression used by the USD Crate writer.
pub mod lz4;

/// USD's delta + common-value + 2-bit-code integer array coding.
pub mod usd_int_coding;

/// Minimal STORED-only ZIP container builder, for wrapping USDZ payloads.
pub mod zip_writer;

/// Arena-based USD scene-graph tree: the model shared by the Crate writer.
pub mod usd_tree;

/// USD Crate ("usdc") binary format writer.
pub mod crate_writer;

/// OBJ + MTL ASCII text writer.
pub mod obj_export;

/// glTF binary (GLB) writer.
pub mod glb_export;

/// USDZ archive writer: builds the scene tree and serializes it via `crate_writer`.
pub mod usdz_export;

pub use error::ExportError;
pub use types::{Color, ExportOptions, Mesh, MeshSet, ObjArtifacts};

/// Export `meshes` to an OBJ + MTL pair.
pub fn export_obj(meshes: &MeshSet, options: &ExportOptions) -> Result<ObjArtifacts, ExportError> {
    obj_export::export_obj(meshes, options)
}

/// Export `meshes` to a single GLB buffer.
pub fn export_glb(meshes: &MeshSet, options: &ExportOptions) -> Result<Vec<u8>, ExportError> {
    glb_export::export_glb(meshes, options)
}

/// Export `meshes` to a USDZ archive.
pub fn export_usdz(meshes: &MeshSet, options: &ExportOptions) -> Result<Vec<u8>, ExportError> {
    usdz_export::export_usdz(meshes, options)
}
