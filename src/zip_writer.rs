//! USDZ archive container: a ZIP file holding exactly one STORED (uncompressed)
//! entry, with its payload padded to a 64-byte boundary for USDZ runtimes that
//! mmap the archive directly.

use crate::byte_sink::ByteSink;

const LOCAL_HEADER_SIG: u32 = 0x0403_4b50;
const CENTRAL_DIR_SIG: u32 = 0x0201_4b50;
const EOCD_SIG: u32 = 0x0605_4b50;
const ALIGNMENT: usize = 64;
const EXTRA_FIELD_ID: u16 = 0x0001;

/// Build a USDZ archive containing one entry named `name` with `payload` as
/// its (uncompressed) contents. The payload starts at a file offset that is
/// a multiple of 64 bytes.
pub fn build_usdz(name: &str, payload: &[u8]) -> Vec<u8> {
    let name_bytes = name.as_bytes();
    let name_len = name_bytes.len();

    // extraSize = 64 - ((34 + nameLen) mod 64); recorded extra length
    // is extraSize + 4 (the extra field's own header ID + size fields).
    let base = 34 + name_len;
    let extra_size = ALIGNMENT - (base % ALIGNMENT);
    let extra_len_field = extra_size + 4;

    let mut sink = ByteSink::new();
    let local_header_offset = sink.tell();

    sink.write_u32(LOCAL_HEADER_SIG);
    sink.write_u16(20); // version needed to extract
    sink.write_u16(0); // general purpose bit flag
    sink.write_u16(0); // compression method: STORED
    sink.write_u16(0); // last mod file time
    sink.write_u16(0); // last mod file date
    sink.write_u32(0); // crc-32
    sink.write_u32(payload.len() as u32); // compressed size
    sink.write_u32(payload.len() as u32); // uncompressed size
    sink.write_u16(name_len as u16);
    sink.write_u16(extra_len_field as u16);
    sink.write_bytes(name_bytes);
    sink.write_u16(EXTRA_FIELD_ID);
    sink.write_u16(extra_size as u16);
    sink.write_bytes(&vec![0u8; extra_size]);

    debug_assert_eq!(sink.tell() % ALIGNMENT, 0, "payload must start 64-byte aligned");
    sink.write_bytes(payload);

    let central_dir_offset = sink.tell();
    sink.write_u32(CENTRAL_DIR_SIG);
    sink.write_u16(20); // version made by
    sink.write_u16(20); // version needed to extract
    sink.write_u16(0); // general purpose bit flag
    sink.write_u16(0); // compression method
    sink.write_u16(0); // last mod file time
    sink.write_u16(0); // last mod file date
    sink.write_u32(0); // crc-32
    sink.write_u32(payload.len() as u32); // compressed size
    sink.write_u32(payload.len() as u32); // uncompressed size
    sink.write_u16(name_len as u16);
    sink.write_u16(0); // extra field length (central directory)
    sink.write_u16(0); // file comment length
    sink.write_u16(0); // disk number start
    sink.write_u16(0); // internal file attributes
    sink.write_u32(0); // external file attributes
    sink.write_u32(local_header_offset as u32);
    sink.write_bytes(name_bytes);

    let central_dir_size = sink.tell() - central_dir_offset;

    sink.write_u32(EOCD_SIG);
    sink.write_u16(0); // disk number
    sink.write_u16(0); // disk with central directory
    sink.write_u16(1); // entries on this disk
    sink.write_u16(1); // total entries
    sink.write_u32(central_dir_size as u32);
    sink.write_u32(central_dir_offset as u32);
    sink.write_u16(0); // comment length

    sink.into_vec()
}
