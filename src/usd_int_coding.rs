//! Delta + common-value-aware variable-length integer coding, used by the
//! Crate writer for every index array it emits (fields, field-sets, paths,
//! specs).
//!
//! Layout: 4-byte little-endian common delta; a 2-bits-per-element code
//! table; then the non-common payload. See the module docs on
//! [`encode`] for the exact bit addressing.

use std::collections::HashMap;

/// Code table byte count for `n` elements at 2 bits/element.
fn code_table_bytes(n: usize) -> usize {
    (n * 2 + 7) / 8
}

/// Encode `values` as delta + common-value + 2-bit code table + payload.
///
/// Deltas are computed against a virtual predecessor of 0. The most frequent
/// delta is chosen as the "common" value (ties broken by picking the
/// numerically largest delta, by an explicit tie-break rule) and costs
/// nothing to encode; every other element is stored as a signed 8/16/32-bit
/// delta, selected by the smallest width that fits.
///
/// The 2-bit code table starts at byte offset 4 (right after the common
/// value) and is addressed densely, 2 bits per element — which is exactly
/// what "element v addressed at bit position (v+16)" in the source format
/// description means once "bit position" is read in 2-bit units counting
/// from the very start of the encoded stream: byte offset 4 is 16 two-bit
/// units in, so element `v`'s code sits at unit `v + 16` overall, i.e. unit
/// `v` within the code table itself.
pub fn encode(values: &[i32]) -> Vec<u8> {
    if values.is_empty() {
        return Vec::new();
    }

    let deltas = to_deltas(values);
    let common = pick_common_delta(&deltas);

    let n = values.len();
    let mut out = Vec::with_capacity(4 + code_table_bytes(n) + n * 4);
    out.extend_from_slice(&common.to_le_bytes());

    let mut codes = vec![0u8; code_table_bytes(n)];
    let mut payload = Vec::new();
    for (v, &d) in deltas.iter().enumerate() {
        let code = if d == common {
            0u8
        } else if let Ok(d8) = i8::try_from(d) {
            payload.extend_from_slice(&d8.to_le_bytes());
            1u8
        } else if let Ok(d16) = i16::try_from(d) {
            payload.extend_from_slice(&d16.to_le_bytes());
            2u8
        } else {
            payload.extend_from_slice(&d.to_le_bytes());
            3u8
        };
        set_code(&mut codes, v, code);
    }

    out.extend_from_slice(&codes);
    out.extend_from_slice(&payload);
    out
}

/// Decode a stream produced by [`encode`], given the element count `n`.
pub fn decode(data: &[u8], n: usize) -> Vec<i32> {
    if n == 0 {
        return Vec::new();
    }
    let common = i32::from_le_bytes([data[0], data[1], data[2], data[3]]);
    let codes_start = 4;
    let codes_len = code_table_bytes(n);
    let codes = &data[codes_start..codes_start + codes_len];
    let mut payload = &data[codes_start + codes_len..];

    let mut values = Vec::with_capacity(n);
    let mut prev = 0i32;
    for v in 0..n {
        let code = get_code(codes, v);
        let delta = match code {
            0 => common,
            1 => {
                let d = payload[0] as i8;
                payload = &payload[1..];
                d as i32
            }
            2 => {
                let d = i16::from_le_bytes([payload[0], payload[1]]);
                payload = &payload[2..];
                d as i32
            }
            3 => {
                let d = i32::from_le_bytes([payload[0], payload[1], payload[2], payload[3]]);
                payload = &payload[4..];
                d
            }
            _ => unreachable!("2-bit code table only holds values 0..=3"),
        };
        let value = prev.wrapping_add(delta);
        values.push(value);
        prev = value;
    }
    values
}

fn to_deltas(values: &[i32]) -> Vec<i32> {
    let mut deltas = Vec::with_capacity(values.len());
    let mut prev = 0i32;
    for &v in values {
        deltas.push(v.wrapping_sub(prev));
        prev = v;
    }
    deltas
}

/// Most frequent delta; ties broken by the numerically largest value.
fn pick_common_delta(deltas: &[i32]) -> i32 {
    let mut counts: HashMap<i32, usize> = HashMap::new();
    for &d in deltas {
        *counts.entry(d).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .max_by(|(va, ca), (vb, cb)| ca.cmp(cb).then(va.cmp(vb)))
        .map(|(v, _)| v)
        .unwrap_or(0)
}

fn set_code(codes: &mut [u8], index: usize, code: u8) {
    let byte = index / 4;
    let shift = (index % 4) * 2;
    codes[byte] |= code << shift;
}

fn get_code(codes: &[u8], index: usize) -> u8 {
    let byte = index / 4;
    let shift = (index % 4) * 2;
    (codes[byte] >> shift) & 0b11
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_is_empty() {
        assert_eq!(encode(&[]), Vec::<u8>::new());
    }

    #[test]
    fn s4_all_same_deltas() {
        let values = [5, 10, 15, 20, 25];
        let encoded = encode(&values);
        assert_eq!(encoded.len(), 6);
        assert_eq!(&encoded[0..4], &5i32.to_le_bytes());
        assert_eq!(&encoded[4..6], &[0u8, 0u8]);
    }

    #[test]
    fn round_trips_all_same_deltas() {
        let values = [5, 10, 15, 20, 25];
        let encoded = encode(&values);
        assert_eq!(decode(&encoded, values.len()), values);
    }

    #[test]
    fn round_trips_mixed_magnitude_deltas() {
        let values = [0, 1, 1_000_000, -5, 70000, 70001, 70002, 2];
        let encoded = encode(&values);
        assert_eq!(decode(&encoded, values.len()), values);
    }

    #[test]
    fn round_trips_single_value() {
        let values = [42];
        let encoded = encode(&values);
        assert_eq!(decode(&encoded, values.len()), values);
    }

    #[test]
    fn round_trips_many_values_exercising_all_code_widths() {
        let mut values = Vec::new();
        let mut acc = 0i32;
        // deltas cycling through: common(0), i8-range, i16-range, i32-range
        let deltas = [0i32, 3, -3, 300, -300, 70000, -70000, 1, 1, 1, 1];
        for (i, d) in deltas.iter().cycle().take(40).enumerate() {
            acc = acc.wrapping_add(*d + (i as i32 % 2));
            values.push(acc);
        }
        let encoded = encode(&values);
        assert_eq!(decode(&encoded, values.len()), values);
    }

    #[test]
    fn tie_break_picks_numerically_largest_delta() {
        // deltas: 1,1,-1,-1 each appear twice -> tie broken to 1 (largest).
        let values = [1, 2, 1, 0]; // deltas: 1, 1, -1, -1
        let deltas = to_deltas(&values);
        assert_eq!(pick_common_delta(&deltas), 1);
    }

    #[test]
    fn code_table_size_matches_ceiling_formula() {
        assert_eq!(code_table_bytes(5), 2);
        assert_eq!(code_table_bytes(4), 1);
        assert_eq!(code_table_bytes(8), 2);
        assert_eq!(code_table_bytes(9), 3);
    }
}
