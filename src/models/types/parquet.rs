//! # Parquet Format Enumerations
//!
//! Physical types, repetition markers, legacy converted-type annotations,
//! encodings and page types, with the numeric ids defined in `parquet.thrift`.
//! Ids outside the known range are kept as `None` by the `from_i32` helpers so
//! that callers decide whether an unknown tag is fatal.

use std::fmt;

/// Parquet physical types as defined in `parquet.thrift`.
///
/// These represent the low-level storage format for values in Parquet
/// files, independent of higher-level logical annotations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PhysicalType {
    /// Bitpacked Boolean
    Boolean = 0,
    /// 32-bit signed integer.
    Int32 = 1,
    /// 64-bit signed integer.
    Int64 = 2,
    /// 96-bit legacy timestamp (nanos-of-day + julian day).
    Int96 = 3,
    /// 32-bit IEEE floating point.
    Float = 4,
    /// 64-bit IEEE floating point.
    Double = 5,
    /// Variable-length byte array (used for strings and binary data).
    ByteArray = 6,
    /// Byte array of `type_length` bytes.
    FixedLenByteArray = 7,
}

impl PhysicalType {
    /// Return the Parquet `i32` type ID corresponding to this physical type.
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Convert from a Parquet `i32` type ID into a [`PhysicalType`].
    ///
    /// Returns `None` if the ID does not match a known type.
    pub fn from_i32(val: i32) -> Option<Self> {
        match val {
            0 => Some(Self::Boolean),
            1 => Some(Self::Int32),
            2 => Some(Self::Int64),
            3 => Some(Self::Int96),
            4 => Some(Self::Float),
            5 => Some(Self::Double),
            6 => Some(Self::ByteArray),
            7 => Some(Self::FixedLenByteArray),
            _ => None,
        }
    }
}

impl fmt::Display for PhysicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Boolean => "BOOLEAN",
            Self::Int32 => "INT32",
            Self::Int64 => "INT64",
            Self::Int96 => "INT96",
            Self::Float => "FLOAT",
            Self::Double => "DOUBLE",
            Self::ByteArray => "BYTE_ARRAY",
            Self::FixedLenByteArray => "FIXED_LEN_BYTE_ARRAY",
        };
        f.write_str(s)
    }
}

/// Field repetition marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Repetition {
    #[default]
    Required = 0,
    Optional = 1,
    Repeated = 2,
}

impl Repetition {
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    pub fn from_i32(val: i32) -> Option<Self> {
        match val {
            0 => Some(Self::Required),
            1 => Some(Self::Optional),
            2 => Some(Self::Repeated),
            _ => None,
        }
    }
}

/// Legacy `ConvertedType` annotations.
///
/// Only the annotations the built-in handlers understand are named; the
/// rest round-trip through [`ConvertedType::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConvertedType {
    Utf8,
    Map,
    MapKeyValue,
    List,
    Enum,
    Decimal,
    Date,
    TimeMillis,
    TimeMicros,
    TimestampMillis,
    TimestampMicros,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Int8,
    Int16,
    Int32,
    Int64,
    Json,
    Bson,
    Interval,
    Other(i32),
}

impl ConvertedType {
    pub fn as_i32(self) -> i32 {
        match self {
            Self::Utf8 => 0,
            Self::Map => 1,
            Self::MapKeyValue => 2,
            Self::List => 3,
            Self::Enum => 4,
            Self::Decimal => 5,
            Self::Date => 6,
            Self::TimeMillis => 7,
            Self::TimeMicros => 8,
            Self::TimestampMillis => 9,
            Self::TimestampMicros => 10,
            Self::Uint8 => 11,
            Self::Uint16 => 12,
            Self::Uint32 => 13,
            Self::Uint64 => 14,
            Self::Int8 => 15,
            Self::Int16 => 16,
            Self::Int32 => 17,
            Self::Int64 => 18,
            Self::Json => 19,
            Self::Bson => 20,
            Self::Interval => 21,
            Self::Other(v) => v,
        }
    }

    pub fn from_i32(val: i32) -> Self {
        match val {
            0 => Self::Utf8,
            1 => Self::Map,
            2 => Self::MapKeyValue,
            3 => Self::List,
            4 => Self::Enum,
            5 => Self::Decimal,
            6 => Self::Date,
            7 => Self::TimeMillis,
            8 => Self::TimeMicros,
            9 => Self::TimestampMillis,
            10 => Self::TimestampMicros,
            11 => Self::Uint8,
            12 => Self::Uint16,
            13 => Self::Uint32,
            14 => Self::Uint64,
            15 => Self::Int8,
            16 => Self::Int16,
            17 => Self::Int32,
            18 => Self::Int64,
            19 => Self::Json,
            20 => Self::Bson,
            21 => Self::Interval,
            other => Self::Other(other),
        }
    }
}

/// Parquet page and level encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Encoding {
    Plain = 0,
    PlainDictionary = 2,
    Rle = 3,
    BitPacked = 4,
    DeltaBinaryPacked = 5,
    DeltaLengthByteArray = 6,
    DeltaByteArray = 7,
    RleDictionary = 8,
    ByteStreamSplit = 9,
}

impl Encoding {
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    pub fn from_i32(val: i32) -> Option<Self> {
        match val {
            0 => Some(Self::Plain),
            2 => Some(Self::PlainDictionary),
            3 => Some(Self::Rle),
            4 => Some(Self::BitPacked),
            5 => Some(Self::DeltaBinaryPacked),
            6 => Some(Self::DeltaLengthByteArray),
            7 => Some(Self::DeltaByteArray),
            8 => Some(Self::RleDictionary),
            9 => Some(Self::ByteStreamSplit),
            _ => None,
        }
    }

    /// Whether data pages with this encoding carry dictionary indices.
    pub fn is_dictionary(self) -> bool {
        matches!(self, Self::PlainDictionary | Self::RleDictionary)
    }
}

/// Page type tag in a page header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageType {
    DataPage = 0,
    IndexPage = 1,
    DictionaryPage = 2,
    DataPageV2 = 3,
}

impl PageType {
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    pub fn from_i32(v: i32) -> Option<Self> {
        match v {
            0 => Some(Self::DataPage),
            1 => Some(Self::IndexPage),
            2 => Some(Self::DictionaryPage),
            3 => Some(Self::DataPageV2),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn physical_type_ids_follow_parquet_thrift() {
        assert_eq!(PhysicalType::Float.as_i32(), 4);
        assert_eq!(PhysicalType::Double.as_i32(), 5);
        assert_eq!(PhysicalType::from_i32(7), Some(PhysicalType::FixedLenByteArray));
        assert_eq!(PhysicalType::from_i32(8), None);
    }

    #[test]
    fn converted_type_preserves_unknown_ids() {
        assert_eq!(ConvertedType::from_i32(3), ConvertedType::List);
        assert_eq!(ConvertedType::from_i32(42), ConvertedType::Other(42));
        assert_eq!(ConvertedType::Other(42).as_i32(), 42);
    }
}
