//! Parquet decoding helpers

use minarrow::Vec64;

use crate::error::{ParquetError, Result};
use crate::utils::{bit_width, read_i32_le, read_uleb128};

// Primitive decoders

fn check_len(buf: &[u8], count: usize, width: usize, what: &str) -> Result<()> {
    if buf.len() < count * width {
        return Err(ParquetError::Format(format!(
            "{what}: need {} bytes for {count} values, page has {}",
            count * width,
            buf.len()
        )));
    }
    Ok(())
}

pub fn decode_int32_plain(buf: &[u8], count: usize) -> Result<Vec64<i32>> {
    check_len(buf, count, 4, "decode_int32_plain")?;
    Ok(buf[..count * 4]
        .chunks_exact(4)
        .map(|c| i32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

pub fn decode_int64_plain(buf: &[u8], count: usize) -> Result<Vec64<i64>> {
    check_len(buf, count, 8, "decode_int64_plain")?;
    Ok(buf[..count * 8]
        .chunks_exact(8)
        .map(|c| i64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]))
        .collect())
}

pub fn decode_float32_plain(buf: &[u8], count: usize) -> Result<Vec64<f32>> {
    check_len(buf, count, 4, "decode_float32_plain")?;
    Ok(buf[..count * 4]
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

pub fn decode_float64_plain(buf: &[u8], count: usize) -> Result<Vec64<f64>> {
    check_len(buf, count, 8, "decode_float64_plain")?;
    Ok(buf[..count * 8]
        .chunks_exact(8)
        .map(|c| f64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]))
        .collect())
}

/// Bit-packed booleans, LSB-first.
pub fn decode_bool_plain(buf: &[u8], count: usize) -> Result<Vec64<bool>> {
    if buf.len() < count.div_ceil(8) {
        return Err(ParquetError::Format("decode_bool_plain: truncated page".into()));
    }
    Ok((0..count).map(|i| (buf[i / 8] >> (i % 8)) & 1 == 1).collect())
}

// Byte arrays

/// Length-prefixed byte arrays.
pub fn decode_byte_array_plain(buf: &[u8], count: usize) -> Result<Vec<Vec<u8>>> {
    let mut out = Vec::with_capacity(count);
    let mut pos = 0;
    for _ in 0..count {
        let len = read_i32_le(buf, pos)? as u32 as usize;
        pos += 4;
        let bytes = buf.get(pos..pos + len).ok_or_else(|| {
            ParquetError::Format(format!("byte array of {len} bytes overruns page at {pos}"))
        })?;
        out.push(bytes.to_vec());
        pos += len;
    }
    Ok(out)
}

pub fn decode_string_plain(buf: &[u8], count: usize) -> Result<Vec<String>> {
    decode_byte_array_plain(buf, count)?
        .into_iter()
        .map(|b| String::from_utf8(b).map_err(ParquetError::from))
        .collect()
}

pub fn decode_fixed_len_plain(buf: &[u8], count: usize, width: usize) -> Result<Vec<Vec<u8>>> {
    check_len(buf, count, width, "decode_fixed_len_plain")?;
    if width == 0 {
        return Ok(vec![Vec::new(); count]);
    }
    Ok(buf[..count * width].chunks_exact(width).map(<[u8]>::to_vec).collect())
}

/// Sign-extend a big-endian two's complement integer of up to 16 bytes.
pub fn decimal_from_be(bytes: &[u8]) -> Result<i128> {
    if bytes.len() > 16 {
        return Err(ParquetError::Format(format!(
            "decimal of {} bytes exceeds 128 bits",
            bytes.len()
        )));
    }
    let fill = if bytes.first().is_some_and(|b| b & 0x80 != 0) { 0xFF } else { 0x00 };
    let mut full = [fill; 16];
    full[16 - bytes.len()..].copy_from_slice(bytes);
    Ok(i128::from_be_bytes(full))
}

const JULIAN_DAY_OF_EPOCH: i64 = 2_440_588;
const MILLIS_PER_DAY: i64 = 86_400_000;

/// INT96 (nanos-of-day LE i64, Julian day LE i32) as milliseconds since the epoch.
pub fn int96_to_millis(bytes: &[u8]) -> Result<i64> {
    let b: [u8; 12] = bytes
        .try_into()
        .map_err(|_| ParquetError::Format(format!("INT96 of {} bytes", bytes.len())))?;
    let nanos = i64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]);
    let day = i32::from_le_bytes([b[8], b[9], b[10], b[11]]) as i64;
    Ok((day - JULIAN_DAY_OF_EPOCH) * MILLIS_PER_DAY + nanos / 1_000_000)
}

// RLE / bit-packed hybrid

/// Decode `count` values from a hybrid stream. Returns the values and the bytes consumed.
///
/// A bit width of 0 means every value is 0.
pub fn decode_hybrid(buf: &[u8], bit_width: u8, count: usize) -> Result<(Vec<u32>, usize)> {
    if bit_width > 32 {
        return Err(ParquetError::Format(format!("invalid bit width {bit_width}")));
    }
    let mut out = Vec::with_capacity(count);
    let mut pos = 0;
    let bw = bit_width as usize;
    let mask = if bw == 32 { u32::MAX } else { (1u32 << bw) - 1 };

    while out.len() < count {
        if pos >= buf.len() {
            if bw == 0 {
                out.resize(count, 0);
                break;
            }
            return Err(ParquetError::Format(format!(
                "hybrid stream ended after {} of {count} values",
                out.len()
            )));
        }
        let (header, used) = read_uleb128(&buf[pos..])?;
        pos += used;
        let needed = count - out.len();

        if header & 1 == 0 {
            let run = (header >> 1) as usize;
            let width = bw.div_ceil(8);
            let raw = buf
                .get(pos..pos + width)
                .ok_or_else(|| ParquetError::Format("truncated RLE value".into()))?;
            let mut v = [0u8; 4];
            v[..width].copy_from_slice(raw);
            let value = u32::from_le_bytes(v) & mask;
            pos += width;
            out.extend(std::iter::repeat_n(value, run.min(needed)));
        } else {
            let values = (header >> 1) as usize * 8;
            let bytes = values * bw / 8;
            // Writers may truncate the final run; missing bits read as zero.
            let avail = bytes.min(buf.len() - pos);
            let run = &buf[pos..pos + avail];
            for i in 0..values.min(needed) {
                let mut v = 0u32;
                for b in 0..bw {
                    let bit = i * bw + b;
                    if run.get(bit / 8).is_some_and(|byte| (byte >> (bit % 8)) & 1 != 0) {
                        v |= 1 << b;
                    }
                }
                out.push(v);
            }
            pos += avail;
        }
    }
    Ok((out, pos))
}

/// Legacy BIT_PACKED levels: MSB-first, no length prefix.
pub fn decode_bit_packed_levels(buf: &[u8], max_level: u32, count: usize) -> Result<(Vec<u32>, usize)> {
    let bw = bit_width(max_level) as usize;
    let bytes = (count * bw).div_ceil(8);
    if buf.len() < bytes {
        return Err(ParquetError::Format("truncated bit-packed levels".into()));
    }
    let mut out = Vec::with_capacity(count);
    for i in 0..count {
        let mut v = 0u32;
        for b in 0..bw {
            let bit = i * bw + b;
            let set = (buf[bit / 8] >> (7 - bit % 8)) & 1;
            v = (v << 1) | set as u32;
        }
        out.push(v);
    }
    Ok((out, bytes))
}

/// V1 page levels: `u32` LE length then a hybrid stream. Returns levels and bytes consumed.
pub fn decode_levels_v1(buf: &[u8], max_level: u32, count: usize) -> Result<(Vec<u32>, usize)> {
    if max_level == 0 {
        return Ok((vec![0; count], 0));
    }
    let len = read_i32_le(buf, 0)? as u32 as usize;
    let body = buf
        .get(4..4 + len)
        .ok_or_else(|| ParquetError::Format(format!("level block of {len} bytes overruns page")))?;
    let (levels, _) = decode_hybrid(body, bit_width(max_level), count)?;
    Ok((levels, 4 + len))
}

/// V2 page levels: a bare hybrid stream of known byte length.
pub fn decode_levels_v2(buf: &[u8], max_level: u32, count: usize) -> Result<Vec<u32>> {
    if max_level == 0 {
        return Ok(vec![0; count]);
    }
    Ok(decode_hybrid(buf, bit_width(max_level), count)?.0)
}

/// Dictionary indices: bit-width byte followed by a hybrid stream.
pub fn decode_dictionary_indices(buf: &[u8], count: usize) -> Result<Vec<u32>> {
    if count == 0 {
        return Ok(Vec::new());
    }
    let (&bw, rest) = buf
        .split_first()
        .ok_or_else(|| ParquetError::Format("empty dictionary index stream".into()))?;
    Ok(decode_hybrid(rest, bw, count)?.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::encoders::parquet::data::{
        encode_byte_array_plain, encode_dictionary_indices, encode_levels_v1,
    };

    #[test]
    fn test_decode_int32_plain() {
        let buf = [1u8, 0, 0, 0, 0xFF, 0xFF, 0xFF, 0xFF];
        assert_eq!(decode_int32_plain(&buf, 2).unwrap().as_slice(), &[1, -1]);
        assert!(decode_int32_plain(&buf, 3).is_err());
    }

    #[test]
    fn test_decode_bool_plain() {
        let v = decode_bool_plain(&[0b0000_0101], 3).unwrap();
        assert_eq!(v.as_slice(), &[true, false, true]);
    }

    #[test]
    fn test_decode_string_plain() {
        let mut buf = Vec::new();
        encode_byte_array_plain(&["one", "two"], &mut buf).unwrap();
        assert_eq!(decode_string_plain(&buf, 2).unwrap(), vec!["one", "two"]);
        assert!(decode_string_plain(&buf[..5], 2).is_err());
    }

    #[test]
    fn test_decimal_from_be() {
        assert_eq!(decimal_from_be(&[0xFF, 0x7F]).unwrap(), -129);
        assert_eq!(decimal_from_be(&[0x01, 0x00]).unwrap(), 256);
    }

    #[test]
    fn test_int96_epoch() {
        let mut b = [0u8; 12];
        b[..8].copy_from_slice(&1_000_000i64.to_le_bytes());
        b[8..].copy_from_slice(&2_440_589i32.to_le_bytes());
        assert_eq!(int96_to_millis(&b).unwrap(), MILLIS_PER_DAY + 1);
    }

    #[test]
    fn test_hybrid_reference_example() {
        let (v, used) = decode_hybrid(&[0x03, 0x88, 0xC6, 0xFA], 3, 8).unwrap();
        assert_eq!(v, vec![0, 1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(used, 4);
    }

    #[test]
    fn test_bit_packed_levels_msb_first() {
        // Same values as the hybrid example, MSB-first
        let (v, used) = decode_bit_packed_levels(&[0x05, 0x39, 0x77], 7, 8).unwrap();
        assert_eq!(v, vec![0, 1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(used, 3);
    }

    #[test]
    fn test_levels_v1() {
        let levels = vec![1, 0, 1, 1, 1, 1, 1, 1, 1, 1, 0];
        let mut buf = Vec::new();
        encode_levels_v1(&levels, 1, &mut buf);
        let (out, used) = decode_levels_v1(&buf, 1, levels.len()).unwrap();
        assert_eq!(out, levels);
        assert_eq!(used, buf.len());
        assert_eq!(decode_levels_v1(&[], 0, 2).unwrap(), (vec![0, 0], 0));
    }

    #[test]
    fn test_dictionary_indices() {
        let idx = vec![3, 3, 3, 3, 3, 3, 3, 3, 3, 0, 1];
        let mut buf = Vec::new();
        encode_dictionary_indices(&idx, &mut buf);
        assert_eq!(decode_dictionary_indices(&buf, idx.len()).unwrap(), idx);
    }
}
