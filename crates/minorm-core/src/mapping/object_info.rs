//! The mapped-type contract and the value sets derived from it.

use crate::error::{Error, Result};
use crate::mapping::{ColumnInfo, IdentifierStrategy, TableInfo};
use crate::query::SqlArgument;
use crate::row::Row;
use crate::value::Value;

/// The contract a mapped type fulfils.
///
/// Implementations are hand-written or generated by an external mapping
/// layer; this crate only consumes the finished metadata. `table_info` is
/// called once per process per type — resolution is cached by the
/// [registry](super::ObjectInfoRegistry).
pub trait Model: Send + Sync + Sized + 'static {
    /// Build the finished table metadata for this type.
    ///
    /// Errors are mapping faults: the type cannot be used with the ORM.
    fn table_info() -> Result<TableInfo>;

    /// Materialize an instance from a result row.
    fn from_row(row: &Row) -> Result<Self>;

    /// Extract the value this instance stores in the given mapped column.
    fn column_value(&self, column: &ColumnInfo) -> Value;

    /// Assign the identifier property from a database value.
    ///
    /// The value has already been converted to the identifier column's
    /// declared storage type.
    fn set_identifier_value(&mut self, value: Value) -> Result<()>;
}

/// A type's resolved mapping: the table metadata plus the value-extraction
/// operations the session pipeline needs.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectInfo {
    table_info: TableInfo,
}

impl ObjectInfo {
    /// Wrap validated table metadata.
    #[must_use]
    pub const fn new(table_info: TableInfo) -> Self {
        Self { table_info }
    }

    /// The table metadata.
    #[must_use]
    pub const fn table_info(&self) -> &TableInfo {
        &self.table_info
    }

    /// The instance's identifier value.
    pub fn identifier_value<M: Model>(&self, instance: &M) -> Result<Value> {
        let identifier = self.table_info.identifier_column_or_error()?;
        Ok(instance.column_value(identifier))
    }

    /// Whether the instance's identifier still holds its default value.
    pub fn has_default_identifier_value<M: Model>(&self, instance: &M) -> Result<bool> {
        Ok(self.identifier_value(instance)?.is_default_identifier())
    }

    /// The ordered argument list for an INSERT of this instance.
    ///
    /// One argument per insertable column in definition order; the identifier
    /// column is present only when the strategy is
    /// [`IdentifierStrategy::Assigned`].
    #[must_use]
    pub fn insert_values<M: Model>(&self, instance: &M) -> Vec<SqlArgument> {
        self.table_info
            .columns()
            .iter()
            .filter(|column| column.is_insertable())
            .map(|column| SqlArgument::new(instance.column_value(column), column.sql_type()))
            .collect()
    }

    /// The ordered argument list for an UPDATE of this instance.
    ///
    /// Updatable columns in definition order, with the identifier value
    /// appended last for the WHERE clause.
    pub fn update_values<M: Model>(&self, instance: &M) -> Result<Vec<SqlArgument>> {
        let identifier = self.table_info.identifier_column_or_error()?;

        let mut arguments: Vec<SqlArgument> = self
            .table_info
            .columns()
            .iter()
            .filter(|column| column.is_updatable())
            .map(|column| SqlArgument::new(instance.column_value(column), column.sql_type()))
            .collect();

        arguments.push(SqlArgument::new(
            instance.column_value(identifier),
            identifier.sql_type(),
        ));

        Ok(arguments)
    }

    /// Check that the instance's identifier state agrees with the strategy
    /// before an INSERT.
    pub fn verify_instance_for_insert<M: Model>(&self, instance: &M) -> Result<()> {
        // A table without an identifier column can always be inserted into.
        if self.table_info.identifier_column().is_none() {
            return Ok(());
        }

        let has_default = self.has_default_identifier_value(instance)?;

        match self.table_info.identifier_strategy() {
            IdentifierStrategy::Assigned if has_default => Err(Error::IdentifierNotSet {
                operation: "inserted",
            }),
            IdentifierStrategy::DbGenerated | IdentifierStrategy::Sequence if !has_default => {
                Err(Error::IdentifierAlreadySet)
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SqlType;

    #[derive(Debug, Clone, Default)]
    struct Customer {
        id: i64,
        name: String,
        credit_limit: Option<i32>,
    }

    impl Model for Customer {
        fn table_info() -> Result<TableInfo> {
            TableInfo::new(
                vec![
                    ColumnInfo::new("Id", SqlType::BigInt).identifier(),
                    ColumnInfo::new("Name", SqlType::Text),
                    ColumnInfo::new("CreditLimit", SqlType::Int),
                ],
                IdentifierStrategy::DbGenerated,
                "Customers",
                Some("Sales"),
            )
        }

        fn from_row(row: &Row) -> Result<Self> {
            Ok(Self {
                id: row.get("Id").and_then(Value::as_i64).unwrap_or_default(),
                name: row
                    .get("Name")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                credit_limit: row.get("CreditLimit").and_then(|v| match v {
                    Value::Int(i) => Some(*i),
                    _ => None,
                }),
            })
        }

        fn column_value(&self, column: &ColumnInfo) -> Value {
            match column.column_name() {
                "Id" => Value::BigInt(self.id),
                "Name" => Value::Text(self.name.clone()),
                _ => self.credit_limit.map(Value::Int).unwrap_or(Value::Null),
            }
        }

        fn set_identifier_value(&mut self, value: Value) -> Result<()> {
            self.id = value.as_i64().unwrap_or_default();
            Ok(())
        }
    }

    fn object_info() -> ObjectInfo {
        ObjectInfo::new(Customer::table_info().unwrap())
    }

    #[test]
    fn test_insert_values_exclude_db_generated_identifier() {
        let customer = Customer {
            id: 0,
            name: "Fred".to_string(),
            credit_limit: Some(100),
        };

        let values = object_info().insert_values(&customer);

        assert_eq!(values.len(), 2);
        assert_eq!(values[0].value(), &Value::Text("Fred".to_string()));
        assert_eq!(values[1].value(), &Value::Int(100));
    }

    #[test]
    fn test_update_values_append_identifier_last() {
        let customer = Customer {
            id: 42,
            name: "Fred".to_string(),
            credit_limit: None,
        };

        let values = object_info().update_values(&customer).unwrap();

        assert_eq!(values.len(), 3);
        assert_eq!(values[0].value(), &Value::Text("Fred".to_string()));
        assert_eq!(values[1].value(), &Value::Null);
        assert_eq!(values[2].value(), &Value::BigInt(42));
        assert_eq!(values[2].sql_type(), SqlType::BigInt);
    }

    #[test]
    fn test_verify_insert_rejects_preset_db_generated_identifier() {
        let customer = Customer {
            id: 42,
            ..Customer::default()
        };

        let error = object_info().verify_instance_for_insert(&customer).unwrap_err();
        assert!(matches!(error, Error::IdentifierAlreadySet));
    }

    #[test]
    fn test_verify_insert_accepts_unset_db_generated_identifier() {
        let customer = Customer::default();
        assert!(object_info().verify_instance_for_insert(&customer).is_ok());
    }

    #[test]
    fn test_has_default_identifier_value() {
        let info = object_info();

        let unsaved = Customer::default();
        assert!(info.has_default_identifier_value(&unsaved).unwrap());

        let saved = Customer {
            id: 7,
            ..Customer::default()
        };
        assert!(!info.has_default_identifier_value(&saved).unwrap());
    }
}
