//! # Parquet Encoding Helpers
//!
//! Little-endian "plain" encoders for the physical types, bit-packed boolean
//! encoding, length-prefixed byte arrays, the RLE/bit-packed hybrid used for
//! levels and dictionary indices, and dictionary construction for byte-array
//! columns.
//!
//! Booleans and hybrid bit-packed runs are packed LSB-first per the Parquet
//! format.

use std::collections::HashMap;

use crate::error::{ParquetError, Result};
use crate::models::types::column::ColumnValues;
use crate::utils::{bit_width, write_uleb128};

// Primitive encoders

/// Encode `i32` values using Parquet plain little-endian format, appending to `out`.
pub fn encode_int32_plain(data: &[i32], out: &mut Vec<u8>) {
    for v in data {
        out.extend_from_slice(&v.to_le_bytes());
    }
}

/// Encode `i64` values using Parquet plain little-endian format, appending to `out`.
pub fn encode_int64_plain(data: &[i64], out: &mut Vec<u8>) {
    for v in data {
        out.extend_from_slice(&v.to_le_bytes());
    }
}

pub fn encode_float32_plain(data: &[f32], out: &mut Vec<u8>) {
    for v in data {
        out.extend_from_slice(&v.to_le_bytes());
    }
}

pub fn encode_float64_plain(data: &[f64], out: &mut Vec<u8>) {
    for v in data {
        out.extend_from_slice(&v.to_le_bytes());
    }
}

/// Encode booleans bit-packed (LSB-first), appending to `out`.
pub fn encode_bool_bitpacked(values: &[bool], out: &mut Vec<u8>) {
    let mut byte = 0u8;
    let mut bit = 0;
    for &v in values {
        if v {
            byte |= 1 << bit;
        }
        bit += 1;
        if bit == 8 {
            out.push(byte);
            byte = 0;
            bit = 0;
        }
    }
    if bit != 0 {
        out.push(byte); // upper bits stay zero
    }
}

// Byte arrays

/// Encode variable-length byte arrays as `u32` LE length + payload per value.
pub fn encode_byte_array_plain<T: AsRef<[u8]>>(values: &[T], out: &mut Vec<u8>) -> Result<()> {
    for v in values {
        let bytes = v.as_ref();
        if bytes.len() > u32::MAX as usize {
            return Err(ParquetError::InvalidColumn(format!(
                "byte array >4 GiB ({} bytes)",
                bytes.len()
            )));
        }
        out.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
        out.extend_from_slice(bytes);
    }
    Ok(())
}

/// Encode fixed-width byte arrays back to back. Every value must be `width` bytes.
pub fn encode_fixed_len_plain<T: AsRef<[u8]>>(
    values: &[T],
    width: usize,
    out: &mut Vec<u8>,
) -> Result<()> {
    for v in values {
        let bytes = v.as_ref();
        if bytes.len() != width {
            return Err(ParquetError::InvalidColumn(format!(
                "fixed-length value of {} bytes, expected {width}",
                bytes.len()
            )));
        }
        out.extend_from_slice(bytes);
    }
    Ok(())
}

/// Big-endian two's complement of `v`, truncated to `width` bytes.
pub fn decimal_to_fixed_be(v: i128, width: usize) -> Result<Vec<u8>> {
    let full = v.to_be_bytes();
    let width = width.min(16);
    let (head, tail) = full.split_at(16 - width);
    // Dropped bytes must be pure sign extension.
    let sign = if v < 0 { 0xFF } else { 0x00 };
    let fits = head.iter().all(|&b| b == sign) && tail.first().is_none_or(|&b| (b & 0x80 != 0) == (v < 0));
    if !fits {
        return Err(ParquetError::InvalidColumn(format!(
            "decimal {v} does not fit in {width} bytes"
        )));
    }
    Ok(tail.to_vec())
}

/// Bytes needed to hold any unscaled decimal of `precision` digits.
pub fn decimal_byte_width(precision: u8) -> usize {
    let bits = (precision as f64) * std::f64::consts::LOG2_10 + 1.0;
    ((bits / 8.0).ceil() as usize).max(1)
}

// RLE / bit-packed hybrid

/// Pack `values` at `bit_width` bits each, LSB-first, appending whole bytes to `out`.
fn bit_pack(values: &[u32], bit_width: u8, out: &mut Vec<u8>) {
    let bw = bit_width as usize;
    let start = out.len();
    out.resize(start + (values.len() * bw).div_ceil(8), 0);
    let mut bit = 0usize;
    for &v in values {
        for b in 0..bw {
            if (v >> b) & 1 != 0 {
                out[start + bit / 8] |= 1 << (bit % 8);
            }
            bit += 1;
        }
    }
}

fn flush_literals(literals: &mut Vec<u32>, bit_width: u8, out: &mut Vec<u8>) {
    if literals.is_empty() {
        return;
    }
    let groups = literals.len().div_ceil(8);
    literals.resize(groups * 8, 0);
    write_uleb128(((groups as u64) << 1) | 1, out);
    bit_pack(literals, bit_width, out);
    literals.clear();
}

fn write_rle_run(value: u32, run: usize, bit_width: u8, out: &mut Vec<u8>) {
    write_uleb128((run as u64) << 1, out);
    let bytes = (bit_width as usize).div_ceil(8);
    out.extend_from_slice(&value.to_le_bytes()[..bytes]);
}

/// Encode `values` with the RLE/bit-packed hybrid at `bit_width`, appending to `out`.
///
/// Runs of 8 or more equal values become RLE runs. Everything else is
/// bit-packed in groups of 8; only the final group is zero-padded.
pub fn encode_hybrid(values: &[u32], bit_width: u8, out: &mut Vec<u8>) {
    let mut literals: Vec<u32> = Vec::new();
    let mut i = 0;
    while i < values.len() {
        let v = values[i];
        let mut run = 1;
        while i + run < values.len() && values[i + run] == v {
            run += 1;
        }
        if run >= 8 && literals.len() % 8 == 0 {
            flush_literals(&mut literals, bit_width, out);
            write_rle_run(v, run, bit_width, out);
            i += run;
        } else if run >= 8 {
            // Top the literal buffer up to a group boundary from the run.
            let fill = 8 - literals.len() % 8;
            literals.extend(std::iter::repeat_n(v, fill));
            i += fill;
        } else {
            literals.extend_from_slice(&values[i..i + run]);
            i += run;
        }
    }
    flush_literals(&mut literals, bit_width, out);
}

/// Encode levels for a V1 data page: `u32` LE byte length followed by the hybrid stream.
pub fn encode_levels_v1(levels: &[u32], max_level: u32, out: &mut Vec<u8>) {
    let mut body = Vec::new();
    encode_hybrid(levels, bit_width(max_level), &mut body);
    out.extend_from_slice(&(body.len() as u32).to_le_bytes());
    out.extend_from_slice(&body);
}

/// Encode levels for a V2 data page: the bare hybrid stream.
pub fn encode_levels_v2(levels: &[u32], max_level: u32, out: &mut Vec<u8>) {
    encode_hybrid(levels, bit_width(max_level), out);
}

/// Encode dictionary indices: one bit-width byte followed by the hybrid stream.
pub fn encode_dictionary_indices(indices: &[u32], out: &mut Vec<u8>) {
    let max = indices.iter().copied().max().unwrap_or(0);
    let bw = bit_width(max).max(1);
    out.push(bw);
    encode_hybrid(indices, bw, out);
}

// Dictionary

/// Dense dictionary and per-value indices for a byte-array column.
#[derive(Debug)]
pub struct DictionaryEncoding {
    pub dictionary: ColumnValues,
    pub indices: Vec<u32>,
}

fn index_values<'a, I>(values: I, len: usize) -> (Vec<usize>, Vec<u32>)
where
    I: Iterator<Item = &'a [u8]>,
{
    let mut seen: HashMap<&'a [u8], u32> = HashMap::new();
    let mut firsts = Vec::new();
    let mut indices = Vec::with_capacity(len);
    for (i, v) in values.enumerate() {
        let next = seen.len() as u32;
        let idx = *seen.entry(v).or_insert_with(|| {
            firsts.push(i);
            next
        });
        indices.push(idx);
    }
    (firsts, indices)
}

/// Build a dictionary for string or binary `values` when it pays off: the
/// distinct count must be at most half the number of values.
pub fn build_dictionary(values: &ColumnValues) -> Option<DictionaryEncoding> {
    let len = values.len();
    if len < 2 {
        return None;
    }
    let (firsts, indices) = match values {
        ColumnValues::Utf8(v) => index_values(v.iter().map(|s| s.as_bytes()), len),
        ColumnValues::ByteArray(v) => index_values(v.iter().map(|b| b.as_slice()), len),
        _ => return None,
    };
    if firsts.len() * 2 > len {
        return None;
    }
    Some(DictionaryEncoding {
        dictionary: values.gather(&firsts),
        indices,
    })
}
