//! Table metadata and its construction-time validation.

use std::collections::HashSet;

use crate::error::{Error, Result};
use crate::mapping::ColumnInfo;

/// How a table's identifier value is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdentifierStrategy {
    /// The application assigns the identifier before insert.
    Assigned,
    /// The database generates the identifier during insert and it is fetched
    /// (or returned) afterwards.
    #[default]
    DbGenerated,
    /// The identifier is drawn from a named database sequence.
    Sequence,
}

/// Information about the database table a type is mapped to.
///
/// Immutable once built. The construction invariants — unique column names,
/// at most one identifier column, a sequence name when the strategy demands
/// one — are validated exactly once here and violations are fatal mapping
/// errors for the type.
#[derive(Debug, Clone, PartialEq)]
pub struct TableInfo {
    columns: Vec<ColumnInfo>,
    identifier_strategy: IdentifierStrategy,
    name: &'static str,
    schema: Option<&'static str>,
    identifier_index: Option<usize>,
    insert_column_count: usize,
    update_column_count: usize,
}

impl TableInfo {
    /// Build and validate table metadata.
    ///
    /// The identifier column is normalized while building: it is insertable
    /// only when the strategy is [`IdentifierStrategy::Assigned`] and is never
    /// updatable, so the derived insert/update column sets always respect the
    /// strategy regardless of how the column flags were authored.
    pub fn new(
        columns: Vec<ColumnInfo>,
        identifier_strategy: IdentifierStrategy,
        name: &'static str,
        schema: Option<&'static str>,
    ) -> Result<Self> {
        let assigned = matches!(identifier_strategy, IdentifierStrategy::Assigned);

        let columns: Vec<ColumnInfo> = columns
            .into_iter()
            .map(|column| {
                if column.is_identifier() {
                    column.allow_insert(assigned).allow_update(false)
                } else {
                    column
                }
            })
            .collect();

        let table = Self {
            identifier_index: columns.iter().position(ColumnInfo::is_identifier),
            insert_column_count: columns.iter().filter(|c| c.is_insertable()).count(),
            update_column_count: columns.iter().filter(|c| c.is_updatable()).count(),
            columns,
            identifier_strategy,
            name,
            schema,
        };

        table.validate_columns()?;

        Ok(table)
    }

    /// The mapped columns, in definition order.
    #[must_use]
    pub fn columns(&self) -> &[ColumnInfo] {
        &self.columns
    }

    /// The identifier column, when one is mapped.
    #[must_use]
    pub fn identifier_column(&self) -> Option<&ColumnInfo> {
        self.identifier_index.map(|index| &self.columns[index])
    }

    /// The identifier column, or the mapping error naming this table.
    pub fn identifier_column_or_error(&self) -> Result<&ColumnInfo> {
        self.identifier_column().ok_or_else(|| Error::NoIdentifierColumn {
            table: self.qualified_name(),
        })
    }

    /// The identifier strategy used by the table.
    #[must_use]
    pub const fn identifier_strategy(&self) -> IdentifierStrategy {
        self.identifier_strategy
    }

    /// The number of insertable columns.
    #[must_use]
    pub const fn insert_column_count(&self) -> usize {
        self.insert_column_count
    }

    /// The number of updatable columns.
    #[must_use]
    pub const fn update_column_count(&self) -> usize {
        self.update_column_count
    }

    /// The table name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// The schema the table lives in, when one is mapped.
    #[must_use]
    pub const fn schema(&self) -> Option<&'static str> {
        self.schema
    }

    /// The unescaped `schema.name` (or bare name) for this table.
    #[must_use]
    pub fn qualified_name(&self) -> String {
        match self.schema {
            Some(schema) => format!("{schema}.{}", self.name),
            None => self.name.to_string(),
        }
    }

    fn validate_columns(&self) -> Result<()> {
        let mut seen = HashSet::new();

        for column in &self.columns {
            if !seen.insert(column.column_name()) {
                return Err(Error::mapping(format!(
                    "the column '{}' has been mapped multiple times for the table '{}'",
                    column.column_name(),
                    self.qualified_name()
                )));
            }
        }

        if self.columns.iter().filter(|c| c.is_identifier()).count() > 1 {
            return Err(Error::mapping(format!(
                "multiple columns have been mapped as the identifier for the table '{}'",
                self.qualified_name()
            )));
        }

        if matches!(self.identifier_strategy, IdentifierStrategy::Sequence) {
            if let Some(identifier) = self.identifier_column() {
                if identifier
                    .get_sequence_name()
                    .is_none_or(|sequence| sequence.is_empty())
                {
                    return Err(Error::mapping(format!(
                        "the identifier '{}' has been mapped using IdentifierStrategy::Sequence \
                         but no sequence name has been specified",
                        identifier.column_name()
                    )));
                }
            }
        }

        Ok(())
    }
}
