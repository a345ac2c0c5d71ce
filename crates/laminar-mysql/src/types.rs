//! MySQL bridge type map.
//!
//! Pairs each supported column type with the Arrow storage it is read into
//! and converts driver values into that storage representation.
//!
//! | Column type | Arrow storage | Conversion |
//! |---|---|---|
//! | `Int8`..`Int64`, `UInt8`..`UInt64` | matching integer array | range checked |
//! | `Float32`, `Float64` | `Float32` / `Float64` | |
//! | `String` | `Binary` | raw bytes, no escaping |
//! | `Date` | `Date32` | days since 1970-01-01 |
//! | `DateTime` | `Timestamp(Second, None)` | seconds since the Unix epoch, UTC |
//! | `UUID` | `FixedSizeBinary(16)` | parsed from canonical text |

// Multiple match arms returning the same type is intentional in the mapping tables.
#![allow(clippy::match_same_arms)]

use std::fmt;
use std::str::FromStr;

use arrow_schema::{DataType, TimeUnit};
use chrono::{Datelike, NaiveDate, NaiveDateTime};

use crate::error::{ConnectorError, ValueError};
use crate::value::ExternalValue;

/// Days between 0001-01-01 (CE day 1) and 1970-01-01.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// Semantic column types understood by the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    /// 8-bit signed integer.
    Int8,
    /// 16-bit signed integer.
    Int16,
    /// 32-bit signed integer.
    Int32,
    /// 64-bit signed integer.
    Int64,
    /// 8-bit unsigned integer.
    UInt8,
    /// 16-bit unsigned integer.
    UInt16,
    /// 32-bit unsigned integer.
    UInt32,
    /// 64-bit unsigned integer.
    UInt64,
    /// 32-bit float.
    Float32,
    /// 64-bit float.
    Float64,
    /// Byte string, stored as raw bytes.
    String,
    /// Calendar date.
    Date,
    /// Date and time with second precision.
    DateTime,
    /// 128-bit unique identifier.
    Uuid,
}

impl ColumnType {
    /// All supported column types.
    pub const ALL: [ColumnType; 14] = [
        ColumnType::Int8,
        ColumnType::Int16,
        ColumnType::Int32,
        ColumnType::Int64,
        ColumnType::UInt8,
        ColumnType::UInt16,
        ColumnType::UInt32,
        ColumnType::UInt64,
        ColumnType::Float32,
        ColumnType::Float64,
        ColumnType::String,
        ColumnType::Date,
        ColumnType::DateTime,
        ColumnType::Uuid,
    ];

    /// Returns the display name of the type.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            ColumnType::Int8 => "Int8",
            ColumnType::Int16 => "Int16",
            ColumnType::Int32 => "Int32",
            ColumnType::Int64 => "Int64",
            ColumnType::UInt8 => "UInt8",
            ColumnType::UInt16 => "UInt16",
            ColumnType::UInt32 => "UInt32",
            ColumnType::UInt64 => "UInt64",
            ColumnType::Float32 => "Float32",
            ColumnType::Float64 => "Float64",
            ColumnType::String => "String",
            ColumnType::Date => "Date",
            ColumnType::DateTime => "DateTime",
            ColumnType::Uuid => "UUID",
        }
    }

    /// Returns the Arrow storage type for this column type.
    #[must_use]
    pub fn to_arrow(self) -> DataType {
        match self {
            ColumnType::Int8 => DataType::Int8,
            ColumnType::Int16 => DataType::Int16,
            ColumnType::Int32 => DataType::Int32,
            ColumnType::Int64 => DataType::Int64,
            ColumnType::UInt8 => DataType::UInt8,
            ColumnType::UInt16 => DataType::UInt16,
            ColumnType::UInt32 => DataType::UInt32,
            ColumnType::UInt64 => DataType::UInt64,
            ColumnType::Float32 => DataType::Float32,
            ColumnType::Float64 => DataType::Float64,
            ColumnType::String => DataType::Binary,
            ColumnType::Date => DataType::Date32,
            ColumnType::DateTime => DataType::Timestamp(TimeUnit::Second, None),
            ColumnType::Uuid => DataType::FixedSizeBinary(16),
        }
    }

    /// Maps an Arrow storage type back to its column type.
    ///
    /// `Utf8` is accepted as `String` so UTF-8 batches can be written.
    ///
    /// # Errors
    ///
    /// Returns `ConnectorError::UnsupportedType` for Arrow types with no
    /// MySQL bridge mapping.
    pub fn from_arrow(dt: &DataType) -> Result<Self, ConnectorError> {
        let ty = match dt {
            DataType::Int8 => ColumnType::Int8,
            DataType::Int16 => ColumnType::Int16,
            DataType::Int32 => ColumnType::Int32,
            DataType::Int64 => ColumnType::Int64,
            DataType::UInt8 => ColumnType::UInt8,
            DataType::UInt16 => ColumnType::UInt16,
            DataType::UInt32 => ColumnType::UInt32,
            DataType::UInt64 => ColumnType::UInt64,
            DataType::Float32 => ColumnType::Float32,
            DataType::Float64 => ColumnType::Float64,
            DataType::Binary | DataType::Utf8 => ColumnType::String,
            DataType::Date32 => ColumnType::Date,
            DataType::Timestamp(TimeUnit::Second, None) => ColumnType::DateTime,
            DataType::FixedSizeBinary(16) => ColumnType::Uuid,
            other => return Err(ConnectorError::UnsupportedType(other.to_string())),
        };
        Ok(ty)
    }

    /// Returns the value stored for NULL input in a non-nullable column.
    #[must_use]
    pub fn default_value(self) -> StorageValue {
        match self {
            ColumnType::Int8 => StorageValue::Int8(0),
            ColumnType::Int16 => StorageValue::Int16(0),
            ColumnType::Int32 => StorageValue::Int32(0),
            ColumnType::Int64 => StorageValue::Int64(0),
            ColumnType::UInt8 => StorageValue::UInt8(0),
            ColumnType::UInt16 => StorageValue::UInt16(0),
            ColumnType::UInt32 => StorageValue::UInt32(0),
            ColumnType::UInt64 => StorageValue::UInt64(0),
            ColumnType::Float32 => StorageValue::Float32(0.0),
            ColumnType::Float64 => StorageValue::Float64(0.0),
            ColumnType::String => StorageValue::String(Vec::new()),
            ColumnType::Date => StorageValue::Date(0),
            ColumnType::DateTime => StorageValue::DateTime(0),
            ColumnType::Uuid => StorageValue::Uuid([0; 16]),
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ColumnType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        ColumnType::ALL
            .into_iter()
            .find(|ty| ty.name().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| format!("unknown column type: '{trimmed}'"))
    }
}

/// A converted value in the representation its column storage expects.
#[derive(Debug, Clone, PartialEq)]
pub enum StorageValue {
    /// `Int8` storage.
    Int8(i8),
    /// `Int16` storage.
    Int16(i16),
    /// `Int32` storage.
    Int32(i32),
    /// `Int64` storage.
    Int64(i64),
    /// `UInt8` storage.
    UInt8(u8),
    /// `UInt16` storage.
    UInt16(u16),
    /// `UInt32` storage.
    UInt32(u32),
    /// `UInt64` storage.
    UInt64(u64),
    /// `Float32` storage.
    Float32(f32),
    /// `Float64` storage.
    Float64(f64),
    /// `String` storage: the cell's bytes as delivered.
    String(Vec<u8>),
    /// Days since 1970-01-01.
    Date(i32),
    /// Seconds since the Unix epoch.
    DateTime(i64),
    /// UUID bytes in big-endian field order.
    Uuid([u8; 16]),
}

/// Converts a non-NULL driver value into `ty`'s storage representation.
///
/// # Errors
///
/// Returns `ValueError` when the value is malformed, out of range, or of a
/// variant the column type does not accept (including NULL).
pub fn convert(ty: ColumnType, value: &ExternalValue) -> Result<StorageValue, ValueError> {
    let target = ty.name();
    let converted = match ty {
        ColumnType::Int8 => StorageValue::Int8(narrow_signed(to_i64(value, target)?, target)?),
        ColumnType::Int16 => StorageValue::Int16(narrow_signed(to_i64(value, target)?, target)?),
        ColumnType::Int32 => StorageValue::Int32(narrow_signed(to_i64(value, target)?, target)?),
        ColumnType::Int64 => StorageValue::Int64(to_i64(value, target)?),
        ColumnType::UInt8 => {
            StorageValue::UInt8(narrow_unsigned(to_u64(value, target)?, target)?)
        }
        ColumnType::UInt16 => {
            StorageValue::UInt16(narrow_unsigned(to_u64(value, target)?, target)?)
        }
        ColumnType::UInt32 => {
            StorageValue::UInt32(narrow_unsigned(to_u64(value, target)?, target)?)
        }
        ColumnType::UInt64 => StorageValue::UInt64(to_u64(value, target)?),
        #[allow(clippy::cast_possible_truncation)]
        ColumnType::Float32 => StorageValue::Float32(to_f64(value, target)? as f32),
        ColumnType::Float64 => StorageValue::Float64(to_f64(value, target)?),
        ColumnType::String => StorageValue::String(to_bytes(value, target)?),
        ColumnType::Date => StorageValue::Date(to_day_number(value, target)?),
        ColumnType::DateTime => StorageValue::DateTime(to_epoch_seconds(value, target)?),
        ColumnType::Uuid => StorageValue::Uuid(to_uuid(value, target)?),
    };
    Ok(converted)
}

/// Returns the days since 1970-01-01 for a calendar date.
#[must_use]
pub fn date_to_day_number(date: NaiveDate) -> i32 {
    date.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE
}

/// Returns the calendar date for a day number, if representable.
#[must_use]
pub fn day_number_to_date(days: i32) -> Option<NaiveDate> {
    days.checked_add(UNIX_EPOCH_DAYS_FROM_CE)
        .and_then(NaiveDate::from_num_days_from_ce_opt)
}

// ── Helpers ─────────────────────────────────────────────────────────

fn unexpected(value: &ExternalValue, target: &'static str) -> ValueError {
    ValueError::UnexpectedVariant {
        found: value.kind(),
        target,
    }
}

fn malformed(text: &str, target: &'static str) -> ValueError {
    ValueError::Malformed {
        text: text.to_string(),
        target,
    }
}

fn text<'a>(bytes: &'a [u8], target: &'static str) -> Result<&'a str, ValueError> {
    std::str::from_utf8(bytes).map_err(|_| malformed(&String::from_utf8_lossy(bytes), target))
}

fn to_i64(value: &ExternalValue, target: &'static str) -> Result<i64, ValueError> {
    match value {
        ExternalValue::SignedInt(v) => Ok(*v),
        ExternalValue::UnsignedInt(v) => i64::try_from(*v).map_err(|_| ValueError::OutOfRange {
            value: v.to_string(),
            target,
        }),
        ExternalValue::String(_) | ExternalValue::Bytes(_) => {
            let s = text(value.as_bytes().unwrap_or_default(), target)?;
            s.trim().parse().map_err(|_| malformed(s, target))
        }
        other => Err(unexpected(other, target)),
    }
}

fn to_u64(value: &ExternalValue, target: &'static str) -> Result<u64, ValueError> {
    match value {
        ExternalValue::UnsignedInt(v) => Ok(*v),
        ExternalValue::SignedInt(v) => u64::try_from(*v).map_err(|_| ValueError::OutOfRange {
            value: v.to_string(),
            target,
        }),
        ExternalValue::String(_) | ExternalValue::Bytes(_) => {
            let s = text(value.as_bytes().unwrap_or_default(), target)?;
            s.trim().parse().map_err(|_| malformed(s, target))
        }
        other => Err(unexpected(other, target)),
    }
}

fn narrow_signed<T: TryFrom<i64>>(v: i64, target: &'static str) -> Result<T, ValueError> {
    T::try_from(v).map_err(|_| ValueError::OutOfRange {
        value: v.to_string(),
        target,
    })
}

fn narrow_unsigned<T: TryFrom<u64>>(v: u64, target: &'static str) -> Result<T, ValueError> {
    T::try_from(v).map_err(|_| ValueError::OutOfRange {
        value: v.to_string(),
        target,
    })
}

#[allow(clippy::cast_precision_loss)]
fn to_f64(value: &ExternalValue, target: &'static str) -> Result<f64, ValueError> {
    match value {
        ExternalValue::Double(v) => Ok(*v),
        ExternalValue::Float(v) => Ok(f64::from(*v)),
        ExternalValue::SignedInt(v) => Ok(*v as f64),
        ExternalValue::UnsignedInt(v) => Ok(*v as f64),
        ExternalValue::String(_) | ExternalValue::Bytes(_) => {
            let s = text(value.as_bytes().unwrap_or_default(), target)?;
            s.trim().parse().map_err(|_| malformed(s, target))
        }
        other => Err(unexpected(other, target)),
    }
}

fn to_bytes(value: &ExternalValue, target: &'static str) -> Result<Vec<u8>, ValueError> {
    match value {
        ExternalValue::String(s) => Ok(s.as_bytes().to_vec()),
        ExternalValue::Bytes(b) => Ok(b.clone()),
        other => Err(unexpected(other, target)),
    }
}

fn ymd_to_day_number(y: i32, m: u32, d: u32, target: &'static str) -> Result<i32, ValueError> {
    // MySQL zero date.
    if y == 0 && m == 0 && d == 0 {
        return Ok(0);
    }
    NaiveDate::from_ymd_opt(y, m, d)
        .map(date_to_day_number)
        .ok_or_else(|| malformed(&format!("{y:04}-{m:02}-{d:02}"), target))
}

fn to_day_number(value: &ExternalValue, target: &'static str) -> Result<i32, ValueError> {
    match value {
        ExternalValue::Date(y, m, d) | ExternalValue::DateTime(y, m, d, ..) => {
            ymd_to_day_number(*y, *m, *d, target)
        }
        ExternalValue::String(_) | ExternalValue::Bytes(_) => {
            let s = text(value.as_bytes().unwrap_or_default(), target)?.trim();
            if s.starts_with("0000-00-00") {
                return Ok(0);
            }
            let date_part = s.get(..10).unwrap_or(s);
            NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
                .map(date_to_day_number)
                .map_err(|_| malformed(s, target))
        }
        other => Err(unexpected(other, target)),
    }
}

fn to_epoch_seconds(value: &ExternalValue, target: &'static str) -> Result<i64, ValueError> {
    match value {
        ExternalValue::Date(y, m, d) => {
            ymd_to_day_number(*y, *m, *d, target).map(|days| i64::from(days) * 86_400)
        }
        ExternalValue::DateTime(y, mo, d, h, mi, s, _) => {
            if *y == 0 && *mo == 0 && *d == 0 {
                return Ok(0);
            }
            NaiveDate::from_ymd_opt(*y, *mo, *d)
                .and_then(|date| date.and_hms_opt(*h, *mi, *s))
                .map(|dt| dt.and_utc().timestamp())
                .ok_or_else(|| malformed(&value.to_string(), target))
        }
        ExternalValue::String(_) | ExternalValue::Bytes(_) => {
            let s = text(value.as_bytes().unwrap_or_default(), target)?.trim();
            if s.starts_with("0000-00-00") {
                return Ok(0);
            }
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
                return Ok(dt.and_utc().timestamp());
            }
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .map(|date| i64::from(date_to_day_number(date)) * 86_400)
                .map_err(|_| malformed(s, target))
        }
        other => Err(unexpected(other, target)),
    }
}

fn to_uuid(value: &ExternalValue, target: &'static str) -> Result<[u8; 16], ValueError> {
    match value {
        ExternalValue::Bytes(b) if b.len() == 16 => {
            let mut raw = [0u8; 16];
            raw.copy_from_slice(b);
            Ok(raw)
        }
        ExternalValue::String(_) | ExternalValue::Bytes(_) => {
            let s = text(value.as_bytes().unwrap_or_default(), target)?;
            uuid::Uuid::parse_str(s.trim())
                .map(uuid::Uuid::into_bytes)
                .map_err(|_| malformed(s, target))
        }
        other => Err(unexpected(other, target)),
    }
}
