use crate::error::{ParquetError, Result};

/// Number of bits needed to store `max_level` (0 for 0).
#[inline]
pub fn bit_width(max_level: u32) -> u8 {
    (32 - max_level.leading_zeros()) as u8
}

/// Append `v` as ULEB128 to `out`.
#[inline]
pub fn write_uleb128(mut v: u64, out: &mut Vec<u8>) {
    loop {
        let byte = (v & 0x7F) as u8;
        v >>= 7;
        if v == 0 {
            out.push(byte);
            break;
        }
        out.push(byte | 0x80);
    }
}

/// Read a ULEB128 value from the front of `buf`, returning `(value, consumed)`.
#[inline]
pub fn read_uleb128(buf: &[u8]) -> Result<(u64, usize)> {
    let mut val: u64 = 0;
    let mut shift = 0;
    for (i, &b) in buf.iter().enumerate() {
        val |= ((b & 0x7F) as u64) << shift;
        if b & 0x80 == 0 {
            return Ok((val, i + 1));
        }
        shift += 7;
        if shift >= 64 {
            return Err(ParquetError::Format("ULEB128 too large".into()));
        }
    }
    Err(ParquetError::UnexpectedEof("truncated ULEB128".into()))
}

#[inline]
pub fn zigzag_encode(v: i64) -> u64 {
    ((v << 1) ^ (v >> 63)) as u64
}

#[inline]
pub fn zigzag_decode(v: u64) -> i64 {
    ((v >> 1) as i64) ^ -((v & 1) as i64)
}

/// Read a little-endian `i32` at `pos`, failing on truncation.
#[inline]
pub fn read_i32_le(buf: &[u8], pos: usize) -> Result<i32> {
    let bytes: [u8; 4] = buf
        .get(pos..pos + 4)
        .and_then(|s| s.try_into().ok())
        .ok_or_else(|| ParquetError::Format(format!("expected 4 bytes at offset {pos}")))?;
    Ok(i32::from_le_bytes(bytes))
}

/// Joins path segments with `.`.
pub fn join_path<S: AsRef<str>>(parts: &[S]) -> String {
    let mut out = String::new();
    for (i, p) in parts.iter().enumerate() {
        if i > 0 {
            out.push('.');
        }
        out.push_str(p.as_ref());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uleb128_roundtrip_multibyte() {
        let mut out = Vec::new();
        write_uleb128(300, &mut out);
        assert_eq!(out, vec![0xAC, 0x02]);
        assert_eq!(read_uleb128(&out).unwrap(), (300, 2));
    }

    #[test]
    fn uleb128_truncated_is_eof() {
        assert!(matches!(
            read_uleb128(&[0x80]),
            Err(ParquetError::UnexpectedEof(_))
        ));
    }

    #[test]
    fn zigzag_small_values() {
        assert_eq!(zigzag_encode(0), 0);
        assert_eq!(zigzag_encode(-1), 1);
        assert_eq!(zigzag_encode(1), 2);
        assert_eq!(zigzag_decode(3), -2);
        assert_eq!(zigzag_decode(zigzag_encode(i64::MIN)), i64::MIN);
    }

    #[test]
    fn bit_width_of_levels() {
        assert_eq!(bit_width(0), 0);
        assert_eq!(bit_width(1), 1);
        assert_eq!(bit_width(2), 2);
        assert_eq!(bit_width(3), 2);
        assert_eq!(bit_width(4), 3);
    }
}
