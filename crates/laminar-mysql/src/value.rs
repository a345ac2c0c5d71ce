//! Values as handed over by a MySQL driver.
//!
//! [`ExternalValue`] is the per-cell tagged union a connection produces for
//! each fetched row. Text-protocol drivers deliver almost everything as
//! [`ExternalValue::Bytes`]; binary-protocol drivers use the typed variants.

use std::fmt;

/// A single cell value produced by the external driver.
#[derive(Debug, Clone, PartialEq)]
pub enum ExternalValue {
    /// SQL NULL.
    Null,
    /// Signed integer.
    SignedInt(i64),
    /// Unsigned integer.
    UnsignedInt(u64),
    /// Single-precision float.
    Float(f32),
    /// Double-precision float.
    Double(f64),
    /// Text that has already been decoded.
    String(String),
    /// Raw bytes (text protocol cells, BLOBs).
    Bytes(Vec<u8>),
    /// Date (year, month, day).
    Date(i32, u32, u32),
    /// Datetime (year, month, day, hour, minute, second, microsecond).
    DateTime(i32, u32, u32, u32, u32, u32, u32),
}

/// One fetched row, in result-set column order.
pub type ExternalRow = Vec<ExternalValue>;

impl ExternalValue {
    /// Returns true if the value is NULL.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, ExternalValue::Null)
    }

    /// Returns the raw byte span for text-like values.
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            ExternalValue::String(s) => Some(s.as_bytes()),
            ExternalValue::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Returns the variant name, used in conversion errors.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            ExternalValue::Null => "NULL",
            ExternalValue::SignedInt(_) => "signed integer",
            ExternalValue::UnsignedInt(_) => "unsigned integer",
            ExternalValue::Float(_) => "float",
            ExternalValue::Double(_) => "double",
            ExternalValue::String(_) => "string",
            ExternalValue::Bytes(_) => "bytes",
            ExternalValue::Date(..) => "date",
            ExternalValue::DateTime(..) => "datetime",
        }
    }
}

impl fmt::Display for ExternalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExternalValue::Null => write!(f, "NULL"),
            ExternalValue::SignedInt(v) => write!(f, "{v}"),
            ExternalValue::UnsignedInt(v) => write!(f, "{v}"),
            ExternalValue::Float(v) => write!(f, "{v}"),
            ExternalValue::Double(v) => write!(f, "{v}"),
            ExternalValue::String(s) => write!(f, "{s}"),
            ExternalValue::Bytes(b) => write!(f, "{}", String::from_utf8_lossy(b)),
            ExternalValue::Date(y, m, d) => write!(f, "{y:04}-{m:02}-{d:02}"),
            ExternalValue::DateTime(y, mo, d, h, mi, s, us) => {
                if *us > 0 {
                    write!(f, "{y:04}-{mo:02}-{d:02} {h:02}:{mi:02}:{s:02}.{us:06}")
                } else {
                    write!(f, "{y:04}-{mo:02}-{d:02} {h:02}:{mi:02}:{s:02}")
                }
            }
        }
    }
}

impl From<&str> for ExternalValue {
    fn from(s: &str) -> Self {
        ExternalValue::Bytes(s.as_bytes().to_vec())
    }
}

impl From<Option<&str>> for ExternalValue {
    fn from(s: Option<&str>) -> Self {
        s.map_or(ExternalValue::Null, ExternalValue::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null() {
        assert!(ExternalValue::Null.is_null());
        assert!(!ExternalValue::SignedInt(0).is_null());
        assert_eq!(ExternalValue::Null.to_string(), "NULL");
    }

    #[test]
    fn test_as_bytes() {
        assert_eq!(
            ExternalValue::String("abc".into()).as_bytes(),
            Some(&b"abc"[..])
        );
        assert_eq!(ExternalValue::from("xyz").as_bytes(), Some(&b"xyz"[..]));
        assert_eq!(ExternalValue::UnsignedInt(1).as_bytes(), None);
    }

    #[test]
    fn test_from_optional_text() {
        assert_eq!(ExternalValue::from(None::<&str>), ExternalValue::Null);
        assert_eq!(
            ExternalValue::from(Some("1")),
            ExternalValue::Bytes(b"1".to_vec())
        );
    }

    #[test]
    fn test_datetime_display() {
        let v = ExternalValue::DateTime(2024, 6, 15, 14, 30, 45, 0);
        assert_eq!(v.to_string(), "2024-06-15 14:30:45");

        let v = ExternalValue::DateTime(2024, 6, 15, 14, 30, 45, 500_000);
        assert_eq!(v.to_string(), "2024-06-15 14:30:45.500000");

        assert_eq!(ExternalValue::Date(2024, 1, 2).to_string(), "2024-01-02");
    }
}
