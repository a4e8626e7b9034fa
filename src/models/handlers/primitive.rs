//! Leaf handlers: one [`PrimitiveHandler`] per [`LeafKind`].

use crate::constants::INT96_LEN;
use crate::error::{ParquetError, Result};
use crate::models::decoders::parquet::{
    decimal_from_be, decode_bool_plain, decode_byte_array_plain, decode_fixed_len_plain,
    decode_float32_plain, decode_float64_plain, decode_int32_plain, decode_int64_plain,
    decode_string_plain, int96_to_millis,
};
use crate::models::encoders::parquet::data::{
    decimal_byte_width, decimal_to_fixed_be, encode_bool_bitpacked, encode_byte_array_plain,
    encode_fixed_len_plain, encode_float32_plain, encode_float64_plain, encode_int32_plain,
    encode_int64_plain,
};
use crate::models::handlers::TypeRegistry;
use crate::models::types::column::ColumnValues;
use crate::models::types::metadata::SchemaElement;
use crate::models::types::parquet::{ConvertedType, PhysicalType, Repetition};
use crate::models::types::schema::{DataField, DataType, Field};
use crate::options::ParquetOptions;
use crate::traits::type_handler::{TypeHandler, TypeSignature};

/// Family of leaf values a [`PrimitiveHandler`] reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeafKind {
    Boolean,
    Int32,
    Int64,
    Float,
    Double,
    String,
    Binary,
    Date,
    TimestampMillis,
    TimestampMicros,
    Decimal,
    FixedLenBinary,
    /// Legacy 96-bit timestamps. Read only.
    Int96,
}

impl LeafKind {
    pub const ALL: [LeafKind; 13] = [
        LeafKind::Boolean,
        LeafKind::Int32,
        LeafKind::Int64,
        LeafKind::Float,
        LeafKind::Double,
        LeafKind::String,
        LeafKind::Binary,
        LeafKind::Date,
        LeafKind::TimestampMillis,
        LeafKind::TimestampMicros,
        LeafKind::Decimal,
        LeafKind::FixedLenBinary,
        LeafKind::Int96,
    ];

    fn for_data_type(data_type: DataType) -> LeafKind {
        match data_type {
            DataType::Boolean => LeafKind::Boolean,
            DataType::Int32 => LeafKind::Int32,
            DataType::Int64 => LeafKind::Int64,
            DataType::Float => LeafKind::Float,
            DataType::Double => LeafKind::Double,
            DataType::String => LeafKind::String,
            DataType::Binary => LeafKind::Binary,
            DataType::FixedLenBinary(_) => LeafKind::FixedLenBinary,
            DataType::Date => LeafKind::Date,
            DataType::TimestampMillis => LeafKind::TimestampMillis,
            DataType::TimestampMicros => LeafKind::TimestampMicros,
            DataType::Decimal { .. } => LeafKind::Decimal,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PrimitiveHandler {
    kind: LeafKind,
}

impl PrimitiveHandler {
    pub const fn new(kind: LeafKind) -> Self {
        Self { kind }
    }

    pub fn kind(&self) -> LeafKind {
        self.kind
    }
}

fn leaf_repetition(f: &DataField) -> Repetition {
    if f.repeated {
        Repetition::Repeated
    } else if f.nullable {
        Repetition::Optional
    } else {
        Repetition::Required
    }
}

fn type_length(element: &SchemaElement) -> Result<usize> {
    match element.type_length {
        Some(n) if n >= 0 => Ok(n as usize),
        _ => Err(ParquetError::Metadata(format!(
            "'{}' is FIXED_LEN_BYTE_ARRAY without a type length",
            element.name
        ))),
    }
}

fn wrong_values(element: &SchemaElement, expected: &str, values: &ColumnValues) -> ParquetError {
    ParquetError::InvalidColumn(format!(
        "'{}' expects {expected} values, got {}",
        element.name,
        values.type_name()
    ))
}

fn encode_decimal(values: &[i128], element: &SchemaElement, out: &mut Vec<u8>) -> Result<()> {
    let out_of_range = |v: i128| {
        ParquetError::InvalidColumn(format!(
            "decimal {v} out of range for '{}' ({:?})",
            element.name, element.physical_type
        ))
    };
    match element.physical_type {
        Some(PhysicalType::Int32) => {
            for &v in values {
                let n = i32::try_from(v).map_err(|_| out_of_range(v))?;
                out.extend_from_slice(&n.to_le_bytes());
            }
        }
        Some(PhysicalType::Int64) => {
            for &v in values {
                let n = i64::try_from(v).map_err(|_| out_of_range(v))?;
                out.extend_from_slice(&n.to_le_bytes());
            }
        }
        Some(PhysicalType::FixedLenByteArray) => {
            let width = type_length(element)?;
            for &v in values {
                out.extend_from_slice(&decimal_to_fixed_be(v, width)?);
            }
        }
        other => {
            return Err(ParquetError::HandlerNotFound(format!(
                "decimal stored as {other:?} in '{}'",
                element.name
            )));
        }
    }
    Ok(())
}

fn decode_decimal(buf: &[u8], count: usize, element: &SchemaElement) -> Result<Vec<i128>> {
    Ok(match element.physical_type {
        Some(PhysicalType::Int32) => decode_int32_plain(buf, count)?.iter().map(|&v| v as i128).collect(),
        Some(PhysicalType::Int64) => decode_int64_plain(buf, count)?.iter().map(|&v| v as i128).collect(),
        Some(PhysicalType::FixedLenByteArray) => decode_fixed_len_plain(buf, count, type_length(element)?)?
            .iter()
            .map(|b| decimal_from_be(b))
            .collect::<Result<_>>()?,
        other => {
            return Err(ParquetError::HandlerNotFound(format!(
                "decimal stored as {other:?} in '{}'",
                element.name
            )));
        }
    })
}

impl TypeHandler for PrimitiveHandler {
    fn name(&self) -> &'static str {
        match self.kind {
            LeafKind::Boolean => "boolean",
            LeafKind::Int32 => "int32",
            LeafKind::Int64 => "int64",
            LeafKind::Float => "float",
            LeafKind::Double => "double",
            LeafKind::String => "string",
            LeafKind::Binary => "binary",
            LeafKind::Date => "date",
            LeafKind::TimestampMillis => "timestamp-millis",
            LeafKind::TimestampMicros => "timestamp-micros",
            LeafKind::Decimal => "decimal",
            LeafKind::FixedLenBinary => "fixed-len-binary",
            LeafKind::Int96 => "int96",
        }
    }

    fn signatures(&self) -> Vec<TypeSignature> {
        use ConvertedType as C;
        use PhysicalType as P;
        let leaf = TypeSignature::leaf;
        match self.kind {
            LeafKind::Boolean => vec![leaf(P::Boolean, None)],
            LeafKind::Int32 => [None, Some(C::Int8), Some(C::Int16), Some(C::Int32), Some(C::Uint8), Some(C::Uint16), Some(C::Uint32), Some(C::TimeMillis)]
                .into_iter()
                .map(|c| leaf(P::Int32, c))
                .collect(),
            LeafKind::Int64 => [None, Some(C::Int64), Some(C::Uint64), Some(C::TimeMicros)]
                .into_iter()
                .map(|c| leaf(P::Int64, c))
                .collect(),
            LeafKind::Float => vec![leaf(P::Float, None)],
            LeafKind::Double => vec![leaf(P::Double, None)],
            LeafKind::String => vec![
                leaf(P::ByteArray, Some(C::Utf8)),
                leaf(P::ByteArray, Some(C::Enum)),
                leaf(P::ByteArray, Some(C::Json)),
            ],
            LeafKind::Binary => vec![leaf(P::ByteArray, None), leaf(P::ByteArray, Some(C::Bson))],
            LeafKind::Date => vec![leaf(P::Int32, Some(C::Date))],
            LeafKind::TimestampMillis => vec![leaf(P::Int64, Some(C::TimestampMillis))],
            LeafKind::TimestampMicros => vec![leaf(P::Int64, Some(C::TimestampMicros))],
            LeafKind::Decimal => vec![
                leaf(P::Int32, Some(C::Decimal)),
                leaf(P::Int64, Some(C::Decimal)),
                leaf(P::FixedLenByteArray, Some(C::Decimal)),
            ],
            LeafKind::FixedLenBinary => vec![
                leaf(P::FixedLenByteArray, None),
                leaf(P::FixedLenByteArray, Some(C::Interval)),
            ],
            LeafKind::Int96 => vec![leaf(P::Int96, None)],
        }
    }

    fn handles_field(&self, field: &Field) -> bool {
        match field {
            Field::Data(f) => self.kind != LeafKind::Int96 && LeafKind::for_data_type(f.data_type) == self.kind,
            _ => false,
        }
    }

    fn describe_as_logical_field(
        &self,
        elements: &[SchemaElement],
        index: usize,
        _children: Vec<Field>,
        options: &ParquetOptions,
    ) -> Result<Field> {
        let el = &elements[index];
        let data_type = match self.kind {
            LeafKind::Boolean => DataType::Boolean,
            LeafKind::Int32 => DataType::Int32,
            LeafKind::Int64 => DataType::Int64,
            LeafKind::Float => DataType::Float,
            LeafKind::Double => DataType::Double,
            LeafKind::String => DataType::String,
            LeafKind::Binary => DataType::Binary,
            LeafKind::Date => DataType::Date,
            LeafKind::TimestampMillis => DataType::TimestampMillis,
            LeafKind::TimestampMicros => DataType::TimestampMicros,
            LeafKind::Decimal => DataType::Decimal {
                precision: el.precision.unwrap_or(0).clamp(0, 38) as u8,
                scale: el.scale.unwrap_or(0).clamp(i8::MIN as i32, i8::MAX as i32) as i8,
            },
            LeafKind::FixedLenBinary => DataType::FixedLenBinary(type_length(el)?),
            LeafKind::Int96 if options.treat_big_integers_as_dates => DataType::TimestampMillis,
            LeafKind::Int96 => DataType::FixedLenBinary(INT96_LEN),
        };
        let rep = el.repetition_or_required();
        Ok(DataField::new(el.name.clone(), data_type)
            .with_nullable(rep == Repetition::Optional)
            .with_repeated(rep == Repetition::Repeated)
            .into())
    }

    fn describe_as_physical_elements(
        &self,
        field: &Field,
        _registry: &TypeRegistry,
        out: &mut Vec<SchemaElement>,
    ) -> Result<()> {
        let Field::Data(f) = field else {
            return Err(ParquetError::Internal(format!("{} cannot describe a container", self.name())));
        };
        let rep = leaf_repetition(f);
        let leaf = |p| SchemaElement::leaf(f.name.clone(), p, rep);
        let el = match f.data_type {
            DataType::Boolean => leaf(PhysicalType::Boolean),
            DataType::Int32 => leaf(PhysicalType::Int32),
            DataType::Int64 => leaf(PhysicalType::Int64),
            DataType::Float => leaf(PhysicalType::Float),
            DataType::Double => leaf(PhysicalType::Double),
            DataType::String => leaf(PhysicalType::ByteArray).with_converted_type(ConvertedType::Utf8),
            DataType::Binary => leaf(PhysicalType::ByteArray),
            DataType::FixedLenBinary(n) => SchemaElement {
                type_length: Some(n as i32),
                ..leaf(PhysicalType::FixedLenByteArray)
            },
            DataType::Date => leaf(PhysicalType::Int32).with_converted_type(ConvertedType::Date),
            DataType::TimestampMillis => {
                leaf(PhysicalType::Int64).with_converted_type(ConvertedType::TimestampMillis)
            }
            DataType::TimestampMicros => {
                leaf(PhysicalType::Int64).with_converted_type(ConvertedType::TimestampMicros)
            }
            DataType::Decimal { precision, scale } => {
                let (physical, width) = match precision {
                    0..=9 => (PhysicalType::Int32, None),
                    10..=18 => (PhysicalType::Int64, None),
                    _ => (PhysicalType::FixedLenByteArray, Some(decimal_byte_width(precision) as i32)),
                };
                SchemaElement {
                    type_length: width,
                    precision: Some(precision as i32),
                    scale: Some(scale as i32),
                    ..leaf(physical).with_converted_type(ConvertedType::Decimal)
                }
            }
        };
        out.push(el);
        Ok(())
    }

    fn encode(&self, values: &ColumnValues, element: &SchemaElement, out: &mut Vec<u8>) -> Result<()> {
        match (self.kind, values) {
            (LeafKind::Boolean, ColumnValues::Boolean(v)) => encode_bool_bitpacked(v.as_slice(), out),
            (LeafKind::Int32 | LeafKind::Date, ColumnValues::Int32(v)) => encode_int32_plain(v.as_slice(), out),
            (LeafKind::Int64 | LeafKind::TimestampMillis | LeafKind::TimestampMicros, ColumnValues::Int64(v)) => {
                encode_int64_plain(v.as_slice(), out)
            }
            (LeafKind::Float, ColumnValues::Float(v)) => encode_float32_plain(v.as_slice(), out),
            (LeafKind::Double, ColumnValues::Double(v)) => encode_float64_plain(v.as_slice(), out),
            (LeafKind::String | LeafKind::Binary, ColumnValues::Utf8(v)) => encode_byte_array_plain(v, out)?,
            (LeafKind::String | LeafKind::Binary, ColumnValues::ByteArray(v)) => encode_byte_array_plain(v, out)?,
            (LeafKind::FixedLenBinary, ColumnValues::ByteArray(v)) => {
                encode_fixed_len_plain(v, type_length(element)?, out)?
            }
            (LeafKind::Int96, ColumnValues::ByteArray(v)) => encode_fixed_len_plain(v, INT96_LEN, out)?,
            (LeafKind::Decimal, ColumnValues::Decimal(v)) => encode_decimal(v, element, out)?,
            (kind, values) => return Err(wrong_values(element, &format!("{kind:?}"), values)),
        }
        Ok(())
    }

    fn decode(
        &self,
        buf: &[u8],
        count: usize,
        element: &SchemaElement,
        options: &ParquetOptions,
    ) -> Result<ColumnValues> {
        Ok(match self.kind {
            LeafKind::Boolean => ColumnValues::Boolean(decode_bool_plain(buf, count)?),
            LeafKind::Int32 | LeafKind::Date => ColumnValues::Int32(decode_int32_plain(buf, count)?),
            LeafKind::Int64 | LeafKind::TimestampMillis | LeafKind::TimestampMicros => {
                ColumnValues::Int64(decode_int64_plain(buf, count)?)
            }
            LeafKind::Float => ColumnValues::Float(decode_float32_plain(buf, count)?),
            LeafKind::Double => ColumnValues::Double(decode_float64_plain(buf, count)?),
            LeafKind::String => ColumnValues::Utf8(decode_string_plain(buf, count)?),
            LeafKind::Binary => ColumnValues::ByteArray(decode_byte_array_plain(buf, count)?),
            LeafKind::FixedLenBinary => {
                ColumnValues::ByteArray(decode_fixed_len_plain(buf, count, type_length(element)?)?)
            }
            LeafKind::Int96 => {
                let raw = decode_fixed_len_plain(buf, count, INT96_LEN)?;
                if options.treat_big_integers_as_dates {
                    ColumnValues::Int64(raw.iter().map(|b| int96_to_millis(b)).collect::<Result<_>>()?)
                } else {
                    ColumnValues::ByteArray(raw)
                }
            }
            LeafKind::Decimal => ColumnValues::Decimal(decode_decimal(buf, count, element)?),
        })
    }
}
