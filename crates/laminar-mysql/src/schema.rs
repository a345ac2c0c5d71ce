//! Bridge schema: the resolved column list a bridge is bound to.
//!
//! A [`BridgeSchema`] is an ordered list of `(name, type, nullable)` entries.
//! It is supplied by the caller after reconciliation with the remote table
//! and is immutable once a bridge holds it.

use std::sync::Arc;

use arrow_schema::{Field, Schema, SchemaRef};

use crate::error::ConnectorError;
use crate::types::ColumnType;

/// One column of a bridge schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    /// Column name.
    pub name: String,
    /// Semantic column type.
    pub column_type: ColumnType,
    /// Whether the column accepts NULL.
    pub nullable: bool,
}

impl ColumnSpec {
    /// Creates a new column spec.
    #[must_use]
    pub fn new(name: impl Into<String>, column_type: ColumnType, nullable: bool) -> Self {
        Self {
            name: name.into(),
            column_type,
            nullable,
        }
    }

    /// Returns the Arrow field for this column.
    #[must_use]
    pub fn to_field(&self) -> Field {
        Field::new(&self.name, self.column_type.to_arrow(), self.nullable)
    }
}

/// Ordered column list bound to a read or write bridge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeSchema {
    columns: Vec<ColumnSpec>,
}

impl BridgeSchema {
    /// Creates a schema from column specs.
    #[must_use]
    pub fn new(columns: Vec<ColumnSpec>) -> Self {
        Self { columns }
    }

    /// Parses a column list such as `id UInt32, name Nullable(String)`.
    ///
    /// # Errors
    ///
    /// Returns `ConnectorError::ConfigurationError` for malformed entries and
    /// `ConnectorError::UnsupportedType` for unknown type names.
    pub fn parse(definition: &str) -> Result<Self, ConnectorError> {
        let mut columns = Vec::new();
        for entry in definition.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (name, type_name) = entry.split_once(char::is_whitespace).ok_or_else(|| {
                ConnectorError::ConfigurationError(format!(
                    "column definition '{entry}' must be '<name> <type>'"
                ))
            })?;
            let type_name = type_name.trim();
            let (type_name, nullable) = match type_name
                .strip_prefix("Nullable(")
                .and_then(|inner| inner.strip_suffix(')'))
            {
                Some(inner) => (inner, true),
                None => (type_name, false),
            };
            let column_type = type_name
                .parse::<ColumnType>()
                .map_err(ConnectorError::UnsupportedType)?;
            columns.push(ColumnSpec::new(name, column_type, nullable));
        }
        Ok(Self { columns })
    }

    /// Builds a bridge schema from an Arrow schema.
    ///
    /// # Errors
    ///
    /// Returns `ConnectorError::UnsupportedType` if any field has an Arrow
    /// type without a MySQL bridge mapping.
    pub fn from_arrow(schema: &Schema) -> Result<Self, ConnectorError> {
        let columns = schema
            .fields()
            .iter()
            .map(|f| {
                ColumnType::from_arrow(f.data_type())
                    .map(|ty| ColumnSpec::new(f.name().as_str(), ty, f.is_nullable()))
                    .map_err(|_| {
                        ConnectorError::UnsupportedType(format!(
                            "column '{}' has type {}",
                            f.name(),
                            f.data_type()
                        ))
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { columns })
    }

    /// Returns the Arrow schema batches of this bridge carry.
    #[must_use]
    pub fn to_arrow(&self) -> SchemaRef {
        Arc::new(Schema::new(
            self.columns.iter().map(ColumnSpec::to_field).collect::<Vec<_>>(),
        ))
    }

    /// Returns a schema containing only `names`, in the requested order.
    ///
    /// # Errors
    ///
    /// Returns `ConnectorError::SchemaMismatch` if a name is not present.
    pub fn project<S: AsRef<str>>(&self, names: &[S]) -> Result<Self, ConnectorError> {
        let columns = names
            .iter()
            .map(|name| {
                let name = name.as_ref();
                self.column(name).cloned().ok_or_else(|| {
                    ConnectorError::SchemaMismatch(format!("there is no column '{name}' in table"))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { columns })
    }

    /// Looks up a column by name.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Returns all columns in order.
    #[must_use]
    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    /// Returns the number of columns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Returns true if the schema has no columns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow_schema::DataType;

    fn users() -> BridgeSchema {
        BridgeSchema::new(vec![
            ColumnSpec::new("id", ColumnType::UInt32, false),
            ColumnSpec::new("name", ColumnType::String, true),
            ColumnSpec::new("created", ColumnType::DateTime, false),
        ])
    }

    #[test]
    fn test_to_arrow() {
        let arrow = users().to_arrow();
        assert_eq!(arrow.fields().len(), 3);
        assert_eq!(arrow.field(0).data_type(), &DataType::UInt32);
        assert!(!arrow.field(0).is_nullable());
        assert_eq!(arrow.field(1).data_type(), &DataType::Binary);
        assert!(arrow.field(1).is_nullable());
    }

    #[test]
    fn test_from_arrow_round_trip() {
        let schema = users();
        let back = BridgeSchema::from_arrow(&schema.to_arrow()).unwrap();
        assert_eq!(back, schema);
    }

    #[test]
    fn test_from_arrow_unsupported() {
        let arrow = Schema::new(vec![Field::new("flag", DataType::Boolean, false)]);
        let err = BridgeSchema::from_arrow(&arrow).unwrap_err();
        assert!(matches!(err, ConnectorError::UnsupportedType(_)));
        assert!(err.to_string().contains("flag"));
    }

    #[test]
    fn test_parse_definition() {
        let schema = BridgeSchema::parse("id UInt32, name Nullable(String), uid UUID").unwrap();
        assert_eq!(schema.len(), 3);
        assert_eq!(schema.columns()[0], ColumnSpec::new("id", ColumnType::UInt32, false));
        assert_eq!(schema.columns()[1], ColumnSpec::new("name", ColumnType::String, true));
        assert_eq!(schema.columns()[2].column_type, ColumnType::Uuid);
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            BridgeSchema::parse("id").unwrap_err(),
            ConnectorError::ConfigurationError(_)
        ));
        assert!(matches!(
            BridgeSchema::parse("id Decimal").unwrap_err(),
            ConnectorError::UnsupportedType(_)
        ));
    }

    #[test]
    fn test_project() {
        let projected = users().project(&["name", "id"]).unwrap();
        assert_eq!(projected.len(), 2);
        assert_eq!(projected.columns()[0].name, "name");
        assert_eq!(projected.columns()[1].name, "id");
    }

    #[test]
    fn test_project_unknown_column() {
        let err = users().project(&["missing"]).unwrap_err();
        assert!(matches!(err, ConnectorError::SchemaMismatch(_)));
    }
}
