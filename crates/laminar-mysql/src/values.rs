//! Rendering of columnar batches as MySQL `VALUES` tuples.
//!
//! [`ValuesFormatter`] is the seam the statement builder renders tuple text
//! through; [`MySqlValuesFormatter`] is the stock implementation.
//!
//! Output shape: `(1,'a'),(2,NULL)`. Strings are single-quoted with MySQL
//! backslash escapes, or written as `X'..'` hex literals when their bytes
//! are not UTF-8. Dates, datetimes and UUIDs are quoted literals.

use arrow_array::cast::AsArray;
use arrow_array::types::{
    Date32Type, Float32Type, Float64Type, Int16Type, Int32Type, Int64Type, Int8Type,
    TimestampSecondType, UInt16Type, UInt32Type, UInt64Type, UInt8Type,
};
use arrow_array::{Array, ArrayRef, RecordBatch};
use arrow_schema::DataType;

use crate::error::{ConnectorError, ValueError};
use crate::types::{day_number_to_date, ColumnType};

/// Renders the rows of a batch as a comma-separated list of value tuples.
pub trait ValuesFormatter {
    /// Appends the tuples for every row of `batch` to `out`.
    ///
    /// # Errors
    ///
    /// Returns `ConnectorError::UnsupportedType` for columns without a MySQL
    /// rendering and `ConnectorError::ConversionFailed` for values MySQL
    /// cannot represent.
    fn format_values(&self, batch: &RecordBatch, out: &mut String) -> Result<(), ConnectorError>;
}

/// Formatter producing MySQL literal syntax.
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlValuesFormatter;

impl ValuesFormatter for MySqlValuesFormatter {
    fn format_values(&self, batch: &RecordBatch, out: &mut String) -> Result<(), ConnectorError> {
        let schema = batch.schema();
        let columns = schema
            .fields()
            .iter()
            .zip(batch.columns())
            .map(|(field, array)| {
                ColumnType::from_arrow(field.data_type()).map(|ty| (field.name().as_str(), ty, array))
            })
            .collect::<Result<Vec<_>, _>>()?;

        for row in 0..batch.num_rows() {
            if row > 0 {
                out.push(',');
            }
            out.push('(');
            for (i, (name, ty, array)) in columns.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_cell(out, array, *ty, row).map_err(|e| e.for_column(*name))?;
            }
            out.push(')');
        }
        Ok(())
    }
}

fn write_cell(
    out: &mut String,
    array: &ArrayRef,
    ty: ColumnType,
    row: usize,
) -> Result<(), ValueError> {
    if array.is_null(row) {
        out.push_str("NULL");
        return Ok(());
    }
    match ty {
        ColumnType::Int8 => out.push_str(&array.as_primitive::<Int8Type>().value(row).to_string()),
        ColumnType::Int16 => {
            out.push_str(&array.as_primitive::<Int16Type>().value(row).to_string());
        }
        ColumnType::Int32 => {
            out.push_str(&array.as_primitive::<Int32Type>().value(row).to_string());
        }
        ColumnType::Int64 => {
            out.push_str(&array.as_primitive::<Int64Type>().value(row).to_string());
        }
        ColumnType::UInt8 => {
            out.push_str(&array.as_primitive::<UInt8Type>().value(row).to_string());
        }
        ColumnType::UInt16 => {
            out.push_str(&array.as_primitive::<UInt16Type>().value(row).to_string());
        }
        ColumnType::UInt32 => {
            out.push_str(&array.as_primitive::<UInt32Type>().value(row).to_string());
        }
        ColumnType::UInt64 => {
            out.push_str(&array.as_primitive::<UInt64Type>().value(row).to_string());
        }
        ColumnType::Float32 => {
            let v = array.as_primitive::<Float32Type>().value(row);
            if !v.is_finite() {
                return Err(non_finite(v, ty));
            }
            out.push_str(&v.to_string());
        }
        ColumnType::Float64 => {
            let v = array.as_primitive::<Float64Type>().value(row);
            if !v.is_finite() {
                return Err(non_finite(v, ty));
            }
            out.push_str(&v.to_string());
        }
        ColumnType::String => match array.data_type() {
            DataType::Utf8 => push_quoted(out, array.as_string::<i32>().value(row)),
            _ => push_bytes(out, array.as_binary::<i32>().value(row)),
        },
        ColumnType::Date => {
            let days = array.as_primitive::<Date32Type>().value(row);
            let date = day_number_to_date(days).ok_or_else(|| ValueError::OutOfRange {
                value: days.to_string(),
                target: ty.name(),
            })?;
            out.push('\'');
            out.push_str(&date.format("%Y-%m-%d").to_string());
            out.push('\'');
        }
        ColumnType::DateTime => {
            let secs = array.as_primitive::<TimestampSecondType>().value(row);
            let dt = chrono::DateTime::from_timestamp(secs, 0).ok_or_else(|| {
                ValueError::OutOfRange {
                    value: secs.to_string(),
                    target: ty.name(),
                }
            })?;
            out.push('\'');
            out.push_str(&dt.format("%Y-%m-%d %H:%M:%S").to_string());
            out.push('\'');
        }
        ColumnType::Uuid => {
            let bytes = array.as_fixed_size_binary().value(row);
            let id = uuid::Uuid::from_slice(bytes).map_err(|_| ValueError::Malformed {
                text: format!("{bytes:02x?}"),
                target: ty.name(),
            })?;
            out.push('\'');
            out.push_str(&id.hyphenated().to_string());
            out.push('\'');
        }
    }
    Ok(())
}

fn non_finite(v: impl ToString, ty: ColumnType) -> ValueError {
    ValueError::OutOfRange {
        value: v.to_string(),
        target: ty.name(),
    }
}

/// Appends raw string bytes as a MySQL literal: quoted text when the bytes
/// are UTF-8, a hex literal otherwise.
pub fn push_bytes(out: &mut String, bytes: &[u8]) {
    match std::str::from_utf8(bytes) {
        Ok(s) => push_quoted(out, s),
        Err(_) => push_hex(out, bytes),
    }
}

fn push_hex(out: &mut String, bytes: &[u8]) {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    out.reserve(bytes.len() * 2 + 3);
    out.push_str("X'");
    for b in bytes {
        out.push(char::from(HEX[usize::from(b >> 4)]));
        out.push(char::from(HEX[usize::from(b & 0x0f)]));
    }
    out.push('\'');
}

/// Appends `s` as a single-quoted MySQL string literal.
pub fn push_quoted(out: &mut String, s: &str) {
    out.reserve(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\0' => out.push_str("\\0"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\x08' => out.push_str("\\b"),
            '\x1a' => out.push_str("\\Z"),
            c => out.push(c),
        }
    }
    out.push('\'');
}
