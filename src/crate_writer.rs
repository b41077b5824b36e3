//! Walks a [`Tree`] and emits a USD Crate file body: the six-section
//! interned-table layout plus a table of contents.

use std::collections::HashMap;

use crate::byte_sink::ByteSink;
use crate::error::ExportError;
use crate::lz4;
use crate::usd_int_coding;
use crate::usd_tree::{AttrValue, MetadataValue, NodeId, Tree, ValueType};

const BOOTSTRAP_SIZE: usize = 88;
const PATH_LIST_OP: u8 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SpecType {
    PseudoRoot,
    Prim,
    Attribute,
    Relationship,
}

impl SpecType {
    fn code(self) -> i32 {
        match self {
            SpecType::PseudoRoot => 1,
            SpecType::Prim => 2,
            SpecType::Attribute => 3,
            SpecType::Relationship => 4,
        }
    }
}

fn value_type_code(vt: ValueType) -> u8 {
    match vt {
        ValueType::Token => 0,
        ValueType::TokenArray => 1,
        ValueType::TokenVector => 2,
        ValueType::Int32Array => 3,
        ValueType::Float => 4,
        ValueType::Vec3fScalar => 5,
        ValueType::Vec3fArray => 6,
        ValueType::Bool => 7,
        ValueType::Variability => 8,
        ValueType::Specifier => 9,
        ValueType::Dictionary => 10,
        ValueType::PathConnection => 11,
        ValueType::PathRelationship => 12,
    }
}

/// Bit 48..55 reserved for the value-type tag of the internal `DoubleVector`
/// pointer format used only inside `timeSamples` blobs — one past the 13
/// public [`ValueType`] codes.
const DOUBLE_VECTOR_TAG: u8 = 13;

fn pack_rep64(value_type: u8, inline: bool, compressed: bool, array: bool, payload: u64) -> u64 {
    let mut rep = payload & 0x0000_FFFF_FFFF_FFFF;
    rep |= (value_type as u64) << 48;
    if compressed {
        rep |= 1 << 61;
    }
    if inline {
        rep |= 1 << 62;
    }
    if array {
        rep |= 1 << 63;
    }
    rep
}

/// Append a compact "6+1+1" pointer: 48-bit little-endian offset, a 1-byte
/// value-type tag, and a reserved zero byte.
fn push_pointer(buf: &mut Vec<u8>, offset: u64, tag: u8) {
    buf.extend_from_slice(&(offset as u32).to_le_bytes());
    buf.extend_from_slice(&((offset >> 32) as u16).to_le_bytes());
    buf.push(tag);
    buf.push(0);
}

/// Walks a [`Tree`] and produces the Crate file bytes.
pub fn write(tree: &Tree) -> Result<Vec<u8>, ExportError> {
    let mut writer = CrateWriter::new();
    writer.write_root(tree)?;
    writer.finish()
}

struct CrateWriter {
    tokens: Vec<String>,
    token_index: HashMap<String, i32>,
    strings: Vec<i32>,
    fields: Vec<(i32, u64)>,
    field_index: HashMap<(i32, u64), i32>,
    field_sets: Vec<i32>,
    field_set_start: HashMap<Vec<i32>, i32>,
    paths: Vec<(u32, i32, i32)>,
    specs: Vec<(u32, i32, i32)>,
    body: ByteSink,
    blob_cache: HashMap<Vec<u8>, u64>,
    shared_frames_offset: Option<u64>,
}

impl CrateWriter {
    fn new() -> Self {
        Self {
            tokens: Vec::new(),
            token_index: HashMap::new(),
            strings: Vec::new(),
            fields: Vec::new(),
            field_index: HashMap::new(),
            field_sets: Vec::new(),
            field_set_start: HashMap::new(),
            paths: Vec::new(),
            specs: Vec::new(),
            body: ByteSink::new(),
            blob_cache: HashMap::new(),
            shared_frames_offset: None,
        }
    }

    fn intern_token(&mut self, s: &str) -> i32 {
        if let Some(&idx) = self.token_index.get(s) {
            return idx;
        }
        let idx = self.tokens.len() as i32;
        self.tokens.push(s.to_string());
        self.token_index.insert(s.to_string(), idx);
        idx
    }

    /// Append a new entry to the strings table; not deduplicated, since the
    /// strings table is a permutation/multiset over tokens.
    fn intern_string(&mut self, s: &str) -> i32 {
        let tok = self.intern_token(s);
        self.strings.push(tok);
        (self.strings.len() - 1) as i32
    }

    fn token_indices(&mut self, values: &[String]) -> Vec<i32> {
        values.iter().map(|v| self.intern_token(v)).collect()
    }

    /// Write `bytes` to the out-of-line data region (right after the 88-byte
    /// bootstrap), deduplicating on exact byte identity, and return the
    /// resulting absolute file offset.
    fn write_blob(&mut self, bytes: Vec<u8>) -> u64 {
        if let Some(&offset) = self.blob_cache.get(&bytes) {
            return offset;
        }
        let offset = BOOTSTRAP_SIZE as u64 + self.body.tell() as u64;
        self.body.write_bytes(&bytes);
        self.blob_cache.insert(bytes, offset);
        offset
    }

    fn field(&mut self, name_token: i32, rep: u64) -> i32 {
        if let Some(&idx) = self.field_index.get(&(name_token, rep)) {
            return idx;
        }
        let idx = self.fields.len() as i32;
        self.fields.push((name_token, rep));
        self.field_index.insert((name_token, rep), idx);
        idx
    }

    fn register_field_set(&mut self, fields: Vec<i32>) -> i32 {
        if let Some(&start) = self.field_set_start.get(&fields) {
            return start;
        }
        let start = self.field_sets.len() as i32;
        self.field_sets.extend_from_slice(&fields);
        self.field_sets.push(-1);
        self.field_set_start.insert(fields, start);
        start
    }

    fn lz4_int_coded(&self, values: &[i32]) -> Result<Vec<u8>, ExportError> {
        lz4::compress_block_padded(&usd_int_coding::encode(values))
    }

    // ---- per-ValueType field writers -------------------------------------

    fn field_specifier(&mut self, name: &str, value: crate::usd_tree::Specifier) -> i32 {
        let tok = self.intern_token(name);
        let rep = pack_rep64(value_type_code(ValueType::Specifier), true, false, false, value.code() as u64);
        self.field(tok, rep)
    }

    fn field_bool(&mut self, name: &str, value: bool) -> i32 {
        let tok = self.intern_token(name);
        let rep = pack_rep64(value_type_code(ValueType::Bool), true, false, false, value as u64);
        self.field(tok, rep)
    }

    fn field_variability(&mut self, name: &str, value: bool) -> i32 {
        let tok = self.intern_token(name);
        let rep = pack_rep64(value_type_code(ValueType::Variability), true, false, false, value as u64);
        self.field(tok, rep)
    }

    fn field_token(&mut self, name: &str, value: &str) -> i32 {
        let tok = self.intern_token(name);
        let val_tok = self.intern_token(value);
        let rep = pack_rep64(value_type_code(ValueType::Token), true, false, false, val_tok as u64);
        self.field(tok, rep)
    }

    fn field_token_array(&mut self, name: &str, values: &[String]) -> i32 {
        let tok = self.intern_token(name);
        let idxs = self.token_indices(values);
        let mut blob = Vec::with_capacity(8 + idxs.len() * 4);
        blob.extend_from_slice(&(idxs.len() as u64).to_le_bytes());
        for i in &idxs {
            blob.extend_from_slice(&i.to_le_bytes());
        }
        let offset = self.write_blob(blob);
        let rep = pack_rep64(value_type_code(ValueType::TokenArray), false, false, true, offset);
        self.field(tok, rep)
    }

    fn field_token_vector(&mut self, name: &str, values: &[String]) -> i32 {
        let tok = self.intern_token(name);
        let idxs = self.token_indices(values);
        let mut blob = Vec::with_capacity(8 + idxs.len() * 4 + 4);
        blob.extend_from_slice(&(idxs.len() as u64).to_le_bytes());
        for i in &idxs {
            blob.extend_from_slice(&i.to_le_bytes());
        }
        blob.extend_from_slice(&[0u8; 4]);
        let offset = self.write_blob(blob);
        let rep = pack_rep64(value_type_code(ValueType::TokenVector), false, false, true, offset);
        self.field(tok, rep)
    }

    fn field_path_list_op(&mut self, name: &str, path_index: u32, value_type: ValueType) -> i32 {
        let tok = self.intern_token(name);
        let mut blob = Vec::with_capacity(1 + 8 + 4);
        blob.push(PATH_LIST_OP);
        blob.extend_from_slice(&1u64.to_le_bytes());
        blob.extend_from_slice(&(path_index as i32).to_le_bytes());
        let offset = self.write_blob(blob);
        let rep = pack_rep64(value_type_code(value_type), false, false, false, offset);
        self.field(tok, rep)
    }

    fn field_path_vector(&mut self, name: &str, path_index: u32, value_type: ValueType) -> i32 {
        let tok = self.intern_token(name);
        let mut blob = Vec::with_capacity(8 + 4);
        blob.extend_from_slice(&1u64.to_le_bytes());
        blob.extend_from_slice(&(path_index as i32).to_le_bytes());
        let offset = self.write_blob(blob);
        let rep = pack_rep64(value_type_code(value_type), false, false, false, offset);
        self.field(tok, rep)
    }

    fn field_int_array(&mut self, name: &str, values: &[i32]) -> Result<i32, ExportError> {
        let tok = self.intern_token(name);
        let mut blob = Vec::new();
        blob.extend_from_slice(&(values.len() as u64).to_le_bytes());
        let compressed = values.len() >= 16;
        if compressed {
            blob.extend_from_slice(&self.lz4_int_coded(values)?);
        } else {
            for v in values {
                blob.extend_from_slice(&v.to_le_bytes());
            }
        }
        let offset = self.write_blob(blob);
        let rep = pack_rep64(value_type_code(ValueType::Int32Array), false, compressed, true, offset);
        Ok(self.field(tok, rep))
    }

    fn field_float(&mut self, name: &str, value: f32) -> i32 {
        let tok = self.intern_token(name);
        let rep = pack_rep64(value_type_code(ValueType::Float), true, false, false, value.to_bits() as u64);
        self.field(tok, rep)
    }

    fn field_vec3f_array(&mut self, name: &str, values: &[[f32; 3]]) -> i32 {
        let tok = self.intern_token(name);
        let mut blob = Vec::with_capacity(8 + values.len() * 12);
        blob.extend_from_slice(&(values.len() as u64).to_le_bytes());
        for v in values {
            for c in v {
                blob.extend_from_slice(&c.to_le_bytes());
            }
        }
        let offset = self.write_blob(blob);
        let rep = pack_rep64(value_type_code(ValueType::Vec3fArray), false, false, true, offset);
        self.field(tok, rep)
    }

    fn field_vec3f_scalar(&mut self, name: &str, value: [f32; 3]) -> i32 {
        let tok = self.intern_token(name);
        let mut blob = Vec::with_capacity(12);
        for c in value {
            blob.extend_from_slice(&c.to_le_bytes());
        }
        let offset = self.write_blob(blob);
        let rep = pack_rep64(value_type_code(ValueType::Vec3fScalar), false, false, false, offset);
        self.field(tok, rep)
    }

    fn field_dictionary(&mut self, name: &str, entries: &[(String, String)]) -> i32 {
        let tok = self.intern_token(name);
        let str_pairs: Vec<(i32, i32)> = entries
            .iter()
            .map(|(k, v)| (self.intern_string(k), self.intern_string(v)))
            .collect();
        let mut blob = Vec::with_capacity(8 + entries.len() * 20);
        blob.extend_from_slice(&(entries.len() as u64).to_le_bytes());
        for (ki, vi) in str_pairs {
            blob.extend_from_slice(&ki.to_le_bytes());
            blob.extend_from_slice(&8u64.to_le_bytes());
            blob.extend_from_slice(&vi.to_le_bytes());
            blob.extend_from_slice(&1074397184i32.to_le_bytes());
        }
        let offset = self.write_blob(blob);
        let rep = pack_rep64(value_type_code(ValueType::Dictionary), false, false, false, offset);
        self.field(tok, rep)
    }

    fn field_default_value(&mut self, value_type: ValueType, value: &AttrValue) -> Result<i32, ExportError> {
        match (value_type, value) {
            (ValueType::Token, AttrValue::Token(s)) => Ok(self.field_token("default", s)),
            (ValueType::TokenArray, AttrValue::TokenArray(v)) => Ok(self.field_token_array("default", v)),
            (ValueType::Int32Array, AttrValue::Int32Array(v)) => self.field_int_array("default", v),
            (ValueType::Float, AttrValue::Float(f)) => Ok(self.field_float("default", *f)),
            (ValueType::Vec3fScalar, AttrValue::Vec3fScalar(v)) => Ok(self.field_vec3f_scalar("default", *v)),
            (ValueType::Vec3fArray, AttrValue::Vec3fArray(v)) => Ok(self.field_vec3f_array("default", v)),
            (ValueType::Bool, AttrValue::Bool(b)) => Ok(self.field_bool("default", *b)),
            (other, _) => Err(ExportError::UnsupportedValueType {
                attribute: "default".to_string(),
                value_type: format!("{other:?}"),
            }),
        }
    }

    /// Write one time sample's value out-of-line, returning its `(offset, tag)`
    /// pointer. Only the scalar shapes actually reachable via timeSamples are
    /// supported, since no exporter in this crate exercises animation.
    fn write_sample_payload(&mut self, value: &AttrValue) -> Result<(u64, u8), ExportError> {
        match value {
            AttrValue::Token(s) => {
                let idx = self.intern_token(s);
                let offset = self.write_blob(idx.to_le_bytes().to_vec());
                Ok((offset, value_type_code(ValueType::Token)))
            }
            AttrValue::Float(f) => {
                let offset = self.write_blob(f.to_bits().to_le_bytes().to_vec());
                Ok((offset, value_type_code(ValueType::Float)))
            }
            AttrValue::Vec3fScalar(v) => {
                let mut blob = Vec::with_capacity(12);
                for c in v {
                    blob.extend_from_slice(&c.to_le_bytes());
                }
                let offset = self.write_blob(blob);
                Ok((offset, value_type_code(ValueType::Vec3fScalar)))
            }
            AttrValue::Bool(b) => {
                let offset = self.write_blob(vec![*b as u8]);
                Ok((offset, value_type_code(ValueType::Bool)))
            }
            other => Err(ExportError::UnsupportedValueType {
                attribute: "timeSamples".to_string(),
                value_type: format!("{other:?}"),
            }),
        }
    }

    fn field_time_samples(&mut self, samples: &[(f64, AttrValue)]) -> Result<i32, ExportError> {
        let name_tok = self.intern_token("timeSamples");
        let n = samples.len();

        let mut sample_pointers = Vec::with_capacity(n);
        for (_, value) in samples {
            sample_pointers.push(self.write_sample_payload(value)?);
        }

        let double_vector_offset = match self.shared_frames_offset {
            Some(offset) => offset,
            None => {
                let frames_block_start = BOOTSTRAP_SIZE as u64 + self.body.tell() as u64;
                self.body.write_u64(8 + n as u64 * 8);
                let double_vector_offset = BOOTSTRAP_SIZE as u64 + self.body.tell() as u64;
                debug_assert_eq!(double_vector_offset, frames_block_start + 8);
                self.body.write_u64(n as u64);
                for (t, _) in samples {
                    self.body.write_f64(*t);
                }
                self.shared_frames_offset = Some(double_vector_offset);
                double_vector_offset
            }
        };

        let field_start = BOOTSTRAP_SIZE as u64 + self.body.tell() as u64;
        let mut tail = Vec::with_capacity(8 + n * 8);
        push_pointer(&mut tail, double_vector_offset, DOUBLE_VECTOR_TAG);
        tail.extend_from_slice(&8u64.to_le_bytes());
        tail.extend_from_slice(&(n as u64).to_le_bytes());
        for (offset, tag) in sample_pointers {
            push_pointer(&mut tail, offset, tag);
        }
        self.body.write_bytes(&tail);

        let rep = pack_rep64(value_type_code(ValueType::Token), false, false, false, field_start);
        Ok(self.field(name_tok, rep))
    }

    fn metadata_fields(
        &mut self,
        owner_name: &str,
        metadata: &[(String, MetadataValue)],
        tree: &Tree,
        fields: &mut Vec<i32>,
    ) -> Result<(), ExportError> {
        for (key, value) in metadata {
            if key == "references" {
                return Err(ExportError::UnimplementedMetadata {
                    prim: owner_name.to_string(),
                    key: key.clone(),
                });
            }
            let idx = match value {
                MetadataValue::PrimRef(target) => {
                    let target_path = tree.prim(*target).path_index;
                    self.field_path_list_op(key, target_path, ValueType::PathRelationship)
                }
                MetadataValue::Dictionary(entries) => self.field_dictionary(key, entries),
                MetadataValue::Str(s) => self.field_token(key, s),
                MetadataValue::Float(f) => self.field_float(key, *f as f32),
                MetadataValue::Bool(b) => self.field_bool(key, *b),
            };
            fields.push(idx);
        }
        Ok(())
    }

    // ---- tree walk ---------------------------------------------------------

    fn write_root(&mut self, tree: &Tree) -> Result<(), ExportError> {
        let root = tree.root();
        let mut fields = Vec::new();
        self.metadata_fields("/", &root.metadata, tree, &mut fields)?;
        if !root.children.is_empty() {
            let names: Vec<String> = root.children.iter().map(|&c| tree.prim(c).name.clone()).collect();
            fields.push(self.field_token_vector("primChildren", &names));
        }
        let field_set_start = self.register_field_set(fields);
        self.specs.push((root.path_index, field_set_start, SpecType::PseudoRoot.code()));
        let name_tok = self.intern_token("");
        self.paths.push((root.path_index, -name_tok, root.jump));

        for &child in &root.children {
            self.write_prim(tree, child)?;
        }
        Ok(())
    }

    fn write_prim(&mut self, tree: &Tree, id: NodeId) -> Result<(), ExportError> {
        let prim = tree.prim(id);
        let mut fields = Vec::new();
        fields.push(self.field_specifier("specifier", prim.specifier));
        fields.push(self.field_token("typeName", &prim.type_name));
        self.metadata_fields(&prim.name, &prim.metadata, tree, &mut fields)?;
        if !prim.attributes.is_empty() {
            let names: Vec<String> = prim.attributes.iter().map(|&a| tree.attribute(a).name.clone()).collect();
            fields.push(self.field_token_vector("properties", &names));
        }
        if !prim.children.is_empty() {
            let names: Vec<String> = prim.children.iter().map(|&c| tree.prim(c).name.clone()).collect();
            fields.push(self.field_token_vector("primChildren", &names));
        }

        let field_set_start = self.register_field_set(fields);
        self.specs.push((prim.path_index, field_set_start, SpecType::Prim.code()));
        let name_tok = self.intern_token(&prim.name);
        self.paths.push((prim.path_index, -name_tok, prim.jump));

        for &child in &prim.children {
            self.write_prim(tree, child)?;
        }
        for &attr in &prim.attributes {
            self.write_attribute(tree, attr)?;
        }
        Ok(())
    }

    fn write_attribute(&mut self, tree: &Tree, id: NodeId) -> Result<(), ExportError> {
        let attr = tree.attribute(id);
        let mut fields = Vec::new();
        let spec_type = match &attr.value {
            AttrValue::Connection(target) => {
                fields.push(self.field_token("typeName", &attr.type_name));
                for q in &attr.qualifiers {
                    fields.push(self.field_bool(q, true));
                }
                let target_path = tree.attribute(*target).path_index;
                fields.push(self.field_path_list_op("connectionPaths", target_path, ValueType::PathConnection));
                fields.push(self.field_path_vector("connectionChildren", target_path, ValueType::PathConnection));
                SpecType::Attribute
            }
            AttrValue::Relationship(target) => {
                fields.push(self.field_variability("variability", true));
                let target_path = tree.prim(*target).path_index;
                fields.push(self.field_path_list_op("targetPaths", target_path, ValueType::PathRelationship));
                fields.push(self.field_path_vector("targetChildren", target_path, ValueType::PathRelationship));
                SpecType::Relationship
            }
            _ => {
                fields.push(self.field_token("typeName", &attr.type_name));
                for q in &attr.qualifiers {
                    fields.push(self.field_bool(q, true));
                }
                self.metadata_fields(&attr.name, &attr.metadata, tree, &mut fields)?;
                if !matches!(attr.value, AttrValue::None) {
                    fields.push(self.field_default_value(attr.value_type, &attr.value)?);
                }
                if let Some(samples) = &attr.time_samples {
                    if !samples.is_empty() {
                        fields.push(self.field_time_samples(samples)?);
                    } else {
                        log::warn!(
                            "attribute {:?} has a time_samples entry with zero samples; \
                             no timeSamples field or frames block will be written",
                            attr.name
                        );
                    }
                }
                SpecType::Attribute
            }
        };

        let field_set_start = self.register_field_set(fields);
        self.specs.push((attr.path_index, field_set_start, spec_type.code()));
        let name_tok = self.intern_token(&attr.name);
        // Design note: attributes do *not* negate their token, unlike prims/root.
        self.paths.push((attr.path_index, name_tok, attr.jump));
        Ok(())
    }

    // ---- final assembly -----------------------------------------------------

    fn finish(self) -> Result<Vec<u8>, ExportError> {
        let mut out = ByteSink::new();
        out.write_bytes(b"PXR-USDC");
        out.write_bytes(&[0, 7, 0, 0, 0, 0, 0, 0]);
        let toc_offset_pos = out.tell();
        out.write_u64(0);
        out.write_bytes(&[0u8; 64]);
        debug_assert_eq!(out.tell(), BOOTSTRAP_SIZE);

        out.write_bytes(self.body.as_slice());

        let mut sections: Vec<(&str, usize, usize)> = Vec::new();

        let start = out.tell();
        {
            let mut tok_bytes = Vec::new();
            for t in &self.tokens {
                tok_bytes.extend_from_slice(t.as_bytes());
                tok_bytes.push(0);
            }
            let compressed = lz4::compress_block_padded(&tok_bytes)?;
            out.write_u64(self.tokens.len() as u64);
            out.write_u64(tok_bytes.len() as u64);
            out.write_u64(compressed.len() as u64);
            out.write_bytes(&compressed);
        }
        sections.push(("TOKENS", start, out.tell() - start));

        let start = out.tell();
        out.write_u64(self.strings.len() as u64);
        for &s in &self.strings {
            out.write_i32(s);
        }
        sections.push(("STRINGS", start, out.tell() - start));

        let start = out.tell();
        {
            let token_idxs: Vec<i32> = self.fields.iter().map(|(t, _)| *t).collect();
            let coded = self.lz4_int_coded(&token_idxs)?;
            out.write_u64(self.fields.len() as u64);
            out.write_u64(coded.len() as u64);
            out.write_bytes(&coded);

            let mut rep_bytes = Vec::with_capacity(self.fields.len() * 8);
            for (_, rep) in &self.fields {
                rep_bytes.extend_from_slice(&rep.to_le_bytes());
            }
            let compressed = lz4::compress_block_padded(&rep_bytes)?;
            out.write_u64(compressed.len() as u64);
            out.write_bytes(&compressed);
        }
        sections.push(("FIELDS", start, out.tell() - start));

        let start = out.tell();
        {
            let coded = self.lz4_int_coded(&self.field_sets)?;
            out.write_u64(self.field_sets.len() as u64);
            out.write_u64(coded.len() as u64);
            out.write_bytes(&coded);
        }
        sections.push(("FIELDSETS", start, out.tell() - start));

        let start = out.tell();
        {
            let path_idxs: Vec<i32> = self.paths.iter().map(|(p, _, _)| *p as i32).collect();
            let tok_idxs: Vec<i32> = self.paths.iter().map(|(_, t, _)| *t).collect();
            let jumps: Vec<i32> = self.paths.iter().map(|(_, _, j)| *j).collect();
            out.write_u64(self.paths.len() as u64);
            out.write_u64(self.paths.len() as u64);
            for arr in [&path_idxs, &tok_idxs, &jumps] {
                let coded = self.lz4_int_coded(arr)?;
                out.write_u64(coded.len() as u64);
                out.write_bytes(&coded);
            }
        }
        sections.push(("PATHS", start, out.tell() - start));

        let start = out.tell();
        {
            let path_idxs: Vec<i32> = self.specs.iter().map(|(p, _, _)| *p as i32).collect();
            let fs_idxs: Vec<i32> = self.specs.iter().map(|(_, f, _)| *f).collect();
            let types: Vec<i32> = self.specs.iter().map(|(_, _, t)| *t).collect();
            out.write_u64(self.specs.len() as u64);
            for arr in [&path_idxs, &fs_idxs, &types] {
                let coded = self.lz4_int_coded(arr)?;
                out.write_u64(coded.len() as u64);
                out.write_bytes(&coded);
            }
        }
        sections.push(("SPECS", start, out.tell() - start));

        let toc_start = out.tell();
        out.write_u64(sections.len() as u64);
        for (name, start, size) in &sections {
            let mut name_bytes = [0u8; 16];
            let nb = name.as_bytes();
            name_bytes[..nb.len()].copy_from_slice(nb);
            out.write_bytes(&name_bytes);
            out.write_u64(*start as u64);
            out.write_u64(*size as u64);
        }

        out.patch(toc_offset_pos, &(toc_start as u64).to_le_bytes());
        Ok(out.into_vec())
    }
}
