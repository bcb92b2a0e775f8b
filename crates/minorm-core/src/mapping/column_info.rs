//! Column metadata.

use crate::types::SqlType;

/// Metadata about one mapped column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    /// Database column name.
    column_name: &'static str,
    /// The declared storage type for the column.
    sql_type: SqlType,
    /// Whether the column participates in INSERT statements.
    allow_insert: bool,
    /// Whether the column participates in UPDATE statements.
    allow_update: bool,
    /// Whether this column is the table identifier (primary key).
    is_identifier: bool,
    /// The sequence the identifier is drawn from, for
    /// [`IdentifierStrategy::Sequence`](super::IdentifierStrategy::Sequence).
    sequence_name: Option<&'static str>,
}

impl ColumnInfo {
    /// Create column metadata with insert and update allowed.
    #[must_use]
    pub const fn new(column_name: &'static str, sql_type: SqlType) -> Self {
        Self {
            column_name,
            sql_type,
            allow_insert: true,
            allow_update: true,
            is_identifier: false,
            sequence_name: None,
        }
    }

    /// Mark this column as the table identifier.
    #[must_use]
    pub const fn identifier(mut self) -> Self {
        self.is_identifier = true;
        self
    }

    /// Set whether the column participates in INSERT statements.
    #[must_use]
    pub const fn allow_insert(mut self, value: bool) -> Self {
        self.allow_insert = value;
        self
    }

    /// Set whether the column participates in UPDATE statements.
    #[must_use]
    pub const fn allow_update(mut self, value: bool) -> Self {
        self.allow_update = value;
        self
    }

    /// Set the sequence the identifier value is drawn from.
    #[must_use]
    pub const fn sequence_name(mut self, name: &'static str) -> Self {
        self.sequence_name = Some(name);
        self
    }

    /// The database column name.
    #[must_use]
    pub const fn column_name(&self) -> &'static str {
        self.column_name
    }

    /// The declared storage type.
    #[must_use]
    pub const fn sql_type(&self) -> SqlType {
        self.sql_type
    }

    /// Whether the column participates in INSERT statements.
    #[must_use]
    pub const fn is_insertable(&self) -> bool {
        self.allow_insert
    }

    /// Whether the column participates in UPDATE statements.
    #[must_use]
    pub const fn is_updatable(&self) -> bool {
        self.allow_update
    }

    /// Whether this column is the table identifier.
    #[must_use]
    pub const fn is_identifier(&self) -> bool {
        self.is_identifier
    }

    /// The sequence name, when one is mapped.
    #[must_use]
    pub const fn get_sequence_name(&self) -> Option<&'static str> {
        self.sequence_name
    }
}
