//! Column storage used while assembling a batch on the read path.
//!
//! [`ColumnBuilder`] wraps one typed Arrow builder per [`ColumnType`], so a
//! batch's columns always come out as exactly the declared storage kind.

use std::sync::Arc;

use arrow_array::builder::{
    BinaryBuilder, Date32Builder, FixedSizeBinaryBuilder, Float32Builder, Float64Builder,
    Int16Builder, Int32Builder, Int64Builder, Int8Builder, TimestampSecondBuilder, UInt16Builder,
    UInt32Builder, UInt64Builder, UInt8Builder,
};
use arrow_array::ArrayRef;

use crate::error::ConnectorError;
use crate::types::{ColumnType, StorageValue};

/// Growable column storage for one bridge column.
#[derive(Debug)]
pub enum ColumnBuilder {
    /// `Int8` storage.
    Int8(Int8Builder),
    /// `Int16` storage.
    Int16(Int16Builder),
    /// `Int32` storage.
    Int32(Int32Builder),
    /// `Int64` storage.
    Int64(Int64Builder),
    /// `UInt8` storage.
    UInt8(UInt8Builder),
    /// `UInt16` storage.
    UInt16(UInt16Builder),
    /// `UInt32` storage.
    UInt32(UInt32Builder),
    /// `UInt64` storage.
    UInt64(UInt64Builder),
    /// `Float32` storage.
    Float32(Float32Builder),
    /// `Float64` storage.
    Float64(Float64Builder),
    /// `String` storage (raw bytes).
    String(BinaryBuilder),
    /// `Date` storage (days since epoch).
    Date(Date32Builder),
    /// `DateTime` storage (seconds since epoch).
    DateTime(TimestampSecondBuilder),
    /// `UUID` storage (16-byte fixed binary).
    Uuid(FixedSizeBinaryBuilder),
}

impl ColumnBuilder {
    /// Creates empty storage for `ty` with room for `capacity` rows.
    #[must_use]
    pub fn with_capacity(ty: ColumnType, capacity: usize) -> Self {
        match ty {
            ColumnType::Int8 => Self::Int8(Int8Builder::with_capacity(capacity)),
            ColumnType::Int16 => Self::Int16(Int16Builder::with_capacity(capacity)),
            ColumnType::Int32 => Self::Int32(Int32Builder::with_capacity(capacity)),
            ColumnType::Int64 => Self::Int64(Int64Builder::with_capacity(capacity)),
            ColumnType::UInt8 => Self::UInt8(UInt8Builder::with_capacity(capacity)),
            ColumnType::UInt16 => Self::UInt16(UInt16Builder::with_capacity(capacity)),
            ColumnType::UInt32 => Self::UInt32(UInt32Builder::with_capacity(capacity)),
            ColumnType::UInt64 => Self::UInt64(UInt64Builder::with_capacity(capacity)),
            ColumnType::Float32 => Self::Float32(Float32Builder::with_capacity(capacity)),
            ColumnType::Float64 => Self::Float64(Float64Builder::with_capacity(capacity)),
            ColumnType::String => Self::String(BinaryBuilder::with_capacity(capacity, capacity * 16)),
            ColumnType::Date => Self::Date(Date32Builder::with_capacity(capacity)),
            ColumnType::DateTime => Self::DateTime(TimestampSecondBuilder::with_capacity(capacity)),
            ColumnType::Uuid => Self::Uuid(FixedSizeBinaryBuilder::with_capacity(capacity, 16)),
        }
    }

    /// Returns the column type this storage holds.
    #[must_use]
    pub fn column_type(&self) -> ColumnType {
        match self {
            Self::Int8(_) => ColumnType::Int8,
            Self::Int16(_) => ColumnType::Int16,
            Self::Int32(_) => ColumnType::Int32,
            Self::Int64(_) => ColumnType::Int64,
            Self::UInt8(_) => ColumnType::UInt8,
            Self::UInt16(_) => ColumnType::UInt16,
            Self::UInt32(_) => ColumnType::UInt32,
            Self::UInt64(_) => ColumnType::UInt64,
            Self::Float32(_) => ColumnType::Float32,
            Self::Float64(_) => ColumnType::Float64,
            Self::String(_) => ColumnType::String,
            Self::Date(_) => ColumnType::Date,
            Self::DateTime(_) => ColumnType::DateTime,
            Self::Uuid(_) => ColumnType::Uuid,
        }
    }

    /// Produces an empty builder of the same concrete storage kind.
    #[must_use]
    pub fn empty_like(&self, capacity: usize) -> Self {
        Self::with_capacity(self.column_type(), capacity)
    }

    /// Appends a converted value.
    ///
    /// # Errors
    ///
    /// Returns `ConnectorError::SchemaMismatch` if the value's storage kind
    /// does not match this column.
    pub fn append(&mut self, value: StorageValue) -> Result<(), ConnectorError> {
        match (self, value) {
            (Self::Int8(b), StorageValue::Int8(v)) => b.append_value(v),
            (Self::Int16(b), StorageValue::Int16(v)) => b.append_value(v),
            (Self::Int32(b), StorageValue::Int32(v)) => b.append_value(v),
            (Self::Int64(b), StorageValue::Int64(v)) => b.append_value(v),
            (Self::UInt8(b), StorageValue::UInt8(v)) => b.append_value(v),
            (Self::UInt16(b), StorageValue::UInt16(v)) => b.append_value(v),
            (Self::UInt32(b), StorageValue::UInt32(v)) => b.append_value(v),
            (Self::UInt64(b), StorageValue::UInt64(v)) => b.append_value(v),
            (Self::Float32(b), StorageValue::Float32(v)) => b.append_value(v),
            (Self::Float64(b), StorageValue::Float64(v)) => b.append_value(v),
            (Self::String(b), StorageValue::String(v)) => b.append_value(v),
            (Self::Date(b), StorageValue::Date(v)) => b.append_value(v),
            (Self::DateTime(b), StorageValue::DateTime(v)) => b.append_value(v),
            (Self::Uuid(b), StorageValue::Uuid(v)) => b.append_value(v)?,
            (builder, value) => {
                return Err(ConnectorError::SchemaMismatch(format!(
                    "cannot append {value:?} to {} column",
                    builder.column_type()
                )))
            }
        }
        Ok(())
    }

    /// Appends a NULL slot: a zeroed value plus a null marker.
    pub fn append_null(&mut self) {
        match self {
            Self::Int8(b) => b.append_null(),
            Self::Int16(b) => b.append_null(),
            Self::Int32(b) => b.append_null(),
            Self::Int64(b) => b.append_null(),
            Self::UInt8(b) => b.append_null(),
            Self::UInt16(b) => b.append_null(),
            Self::UInt32(b) => b.append_null(),
            Self::UInt64(b) => b.append_null(),
            Self::Float32(b) => b.append_null(),
            Self::Float64(b) => b.append_null(),
            Self::String(b) => b.append_null(),
            Self::Date(b) => b.append_null(),
            Self::DateTime(b) => b.append_null(),
            Self::Uuid(b) => b.append_null(),
        }
    }

    /// Appends the type's default value without a null marker.
    ///
    /// # Errors
    ///
    /// Propagates Arrow errors from the underlying builder.
    pub fn append_default(&mut self) -> Result<(), ConnectorError> {
        let default = self.column_type().default_value();
        self.append(default)
    }

    /// Returns the number of rows appended so far.
    #[must_use]
    pub fn len(&self) -> usize {
        use arrow_array::builder::ArrayBuilder;
        match self {
            Self::Int8(b) => b.len(),
            Self::Int16(b) => b.len(),
            Self::Int32(b) => b.len(),
            Self::Int64(b) => b.len(),
            Self::UInt8(b) => b.len(),
            Self::UInt16(b) => b.len(),
            Self::UInt32(b) => b.len(),
            Self::UInt64(b) => b.len(),
            Self::Float32(b) => b.len(),
            Self::Float64(b) => b.len(),
            Self::String(b) => b.len(),
            Self::Date(b) => b.len(),
            Self::DateTime(b) => b.len(),
            Self::Uuid(b) => b.len(),
        }
    }

    /// Returns true if nothing has been appended.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Finishes the column into an Arrow array, leaving the builder empty.
    pub fn finish(&mut self) -> ArrayRef {
        match self {
            Self::Int8(b) => Arc::new(b.finish()),
            Self::Int16(b) => Arc::new(b.finish()),
            Self::Int32(b) => Arc::new(b.finish()),
            Self::Int64(b) => Arc::new(b.finish()),
            Self::UInt8(b) => Arc::new(b.finish()),
            Self::UInt16(b) => Arc::new(b.finish()),
            Self::UInt32(b) => Arc::new(b.finish()),
            Self::UInt64(b) => Arc::new(b.finish()),
            Self::Float32(b) => Arc::new(b.finish()),
            Self::Float64(b) => Arc::new(b.finish()),
            Self::String(b) => Arc::new(b.finish()),
            Self::Date(b) => Arc::new(b.finish()),
            Self::DateTime(b) => Arc::new(b.finish()),
            Self::Uuid(b) => Arc::new(b.finish()),
        }
    }
}
