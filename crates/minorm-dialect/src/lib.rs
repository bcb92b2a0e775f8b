//! Per-database SQL generation for the minorm micro ORM.
//!
//! Every difference between the supported databases — identifier delimiters,
//! parameter markers, paging syntax, how a generated identifier is read back —
//! is isolated behind the [`Dialect`] enum. Callers never branch on database
//! type; they hold the dialect value they were configured with and ask it to
//! build [`SqlQuery`] values.
//!
//! # Design
//!
//! One variant per database, each a constant syntax table over
//! [`SqlCharacters`], selected once at configuration time. Building SQL is
//! pure string work: no I/O, no suspension points, no shared state.
//!
//! # Example
//!
//! ```ignore
//! let dialect = Dialect::MsSql2012;
//! let query = dialect.build_select_sql_query(&table_info, &Value::BigInt(7))?;
//! assert_eq!(
//!     query.command_text(),
//!     "SELECT [Id],[Name] FROM [Sales].[Customers] WHERE ([Id] = @p0)"
//! );
//! ```

mod paging;

use minorm_core::{
    ColumnInfo, Error, IdentifierStrategy, ObjectDelta, Result, SqlArgument, SqlCharacters,
    SqlQuery, TableInfo, Value,
};

/// A supported SQL dialect.
///
/// `MsSql2005` and `MsSql2012` differ only in paging syntax (windowed
/// `ROW_NUMBER()` against `OFFSET … FETCH`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// Microsoft SQL Server 2005/2008.
    MsSql2005,
    /// Microsoft SQL Server 2012 or later.
    MsSql2012,
    /// MySQL / MariaDB.
    MySql,
    /// PostgreSQL.
    PostgreSql,
    /// SQLite.
    Sqlite,
    /// Firebird 3 or later.
    Firebird,
}

impl Dialect {
    /// The syntax characters for this dialect.
    #[must_use]
    pub const fn sql_characters(self) -> SqlCharacters {
        match self {
            Dialect::MsSql2005 | Dialect::MsSql2012 => SqlCharacters::MsSql,
            Dialect::MySql => SqlCharacters::MySql,
            Dialect::PostgreSql => SqlCharacters::PostgreSql,
            Dialect::Sqlite => SqlCharacters::Sqlite,
            Dialect::Firebird => SqlCharacters::Firebird,
        }
    }

    /// Whether a generated identifier must be fetched with a separate query
    /// built by [`Dialect::build_select_insert_id_sql_query`].
    ///
    /// When `false` the insert statement itself returns the identifier
    /// (`RETURNING` clause) and is executed as a scalar query.
    #[must_use]
    pub const fn supports_select_inserted_identifier(self) -> bool {
        match self {
            Dialect::MsSql2005 | Dialect::MsSql2012 | Dialect::MySql | Dialect::Sqlite => true,
            Dialect::PostgreSql | Dialect::Firebird => false,
        }
    }

    /// Build `SELECT <columns> FROM <table> WHERE <identifier> = ?` with one
    /// argument bound to the identifier's storage type.
    pub fn build_select_sql_query(
        self,
        table_info: &TableInfo,
        identifier: &Value,
    ) -> Result<SqlQuery> {
        let characters = self.sql_characters();
        let identifier_column = table_info.identifier_column_or_error()?;

        let command_text = format!(
            "SELECT {} FROM {} WHERE ({} = {})",
            self.column_list(table_info),
            characters.escape_sql(&table_info.qualified_name()),
            characters.escape_sql(identifier_column.column_name()),
            characters.parameter_name(0),
        );

        tracing::debug!(dialect = ?self, table = table_info.name(), "built select by identifier");

        Ok(SqlQuery::with_arguments(
            command_text,
            vec![SqlArgument::new(
                identifier.clone(),
                identifier_column.sql_type(),
            )],
        ))
    }

    /// Build `SELECT <columns> FROM <table>` with no predicate.
    #[must_use]
    pub fn build_select_all_sql_query(self, table_info: &TableInfo) -> SqlQuery {
        let characters = self.sql_characters();

        SqlQuery::new(format!(
            "SELECT {} FROM {}",
            self.column_list(table_info),
            characters.escape_sql(&table_info.qualified_name()),
        ))
    }

    /// Build `INSERT INTO <table> (<columns>) VALUES (<parameters>)`.
    ///
    /// `values` is the instance's insert value list (one argument per
    /// insertable column in definition order). Dialects which return the
    /// generated identifier from the insert itself append a `RETURNING`
    /// clause; sequence-backed identifiers are drawn inline from the mapped
    /// sequence.
    pub fn build_insert_sql_query(
        self,
        table_info: &TableInfo,
        values: Vec<SqlArgument>,
    ) -> Result<SqlQuery> {
        let characters = self.sql_characters();
        let strategy = table_info.identifier_strategy();

        let mut columns: Vec<String> = Vec::with_capacity(table_info.insert_column_count() + 1);
        let mut placeholders: Vec<String> = Vec::with_capacity(values.len() + 1);

        if matches!(strategy, IdentifierStrategy::Sequence) {
            let identifier = table_info.identifier_column_or_error()?;
            let sequence = identifier.get_sequence_name().unwrap_or_default();

            let expression = match self {
                Dialect::PostgreSql => format!("nextval('{sequence}')"),
                Dialect::Firebird => format!("NEXT VALUE FOR {sequence}"),
                Dialect::MsSql2005 | Dialect::MsSql2012 | Dialect::MySql | Dialect::Sqlite => {
                    return Err(Error::mapping(format!(
                        "IdentifierStrategy::Sequence is not supported by the {self:?} dialect"
                    )));
                }
            };

            columns.push(characters.escape_sql(identifier.column_name()));
            placeholders.push(expression);
        }

        for (index, column) in table_info
            .columns()
            .iter()
            .filter(|column| column.is_insertable())
            .enumerate()
        {
            columns.push(characters.escape_sql(column.column_name()));
            placeholders.push(characters.parameter_name(index));
        }

        let mut command_text = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            characters.escape_sql(&table_info.qualified_name()),
            columns.join(","),
            placeholders.join(","),
        );

        if !self.supports_select_inserted_identifier()
            && !matches!(strategy, IdentifierStrategy::Assigned)
        {
            let identifier = table_info.identifier_column_or_error()?;
            command_text.push_str(" RETURNING ");
            command_text.push_str(&characters.escape_sql(identifier.column_name()));
        }

        tracing::debug!(dialect = ?self, table = table_info.name(), "built insert");

        Ok(SqlQuery::with_arguments(command_text, values))
    }

    /// Build `UPDATE <table> SET <columns> WHERE <identifier> = ?`.
    ///
    /// `values` is the instance's update value list: updatable columns in
    /// definition order with the identifier appended last.
    pub fn build_update_sql_query(
        self,
        table_info: &TableInfo,
        values: Vec<SqlArgument>,
    ) -> Result<SqlQuery> {
        let characters = self.sql_characters();
        let identifier_column = table_info.identifier_column_or_error()?;

        let assignments: Vec<String> = table_info
            .columns()
            .iter()
            .filter(|column| column.is_updatable())
            .enumerate()
            .map(|(index, column)| {
                format!(
                    "{} = {}",
                    characters.escape_sql(column.column_name()),
                    characters.parameter_name(index)
                )
            })
            .collect();

        let command_text = format!(
            "UPDATE {} SET {} WHERE ({} = {})",
            characters.escape_sql(&table_info.qualified_name()),
            assignments.join(","),
            characters.escape_sql(identifier_column.column_name()),
            characters.parameter_name(assignments.len()),
        );

        tracing::debug!(dialect = ?self, table = table_info.name(), "built update");

        Ok(SqlQuery::with_arguments(command_text, values))
    }

    /// Build an UPDATE restricted to the changed columns carried by a delta.
    ///
    /// The caller guarantees the delta carries at least one change; the
    /// identifier lands in the WHERE clause as the final argument.
    pub fn build_update_sql_query_for_delta(self, delta: &ObjectDelta) -> Result<SqlQuery> {
        let characters = self.sql_characters();
        let table_info = delta.object_info().table_info();
        let identifier_column = table_info.identifier_column_or_error()?;

        let mut assignments: Vec<String> = Vec::with_capacity(delta.change_count());
        let mut arguments: Vec<SqlArgument> = Vec::with_capacity(delta.change_count() + 1);

        for (index, (column_name, new_value)) in delta.changes().iter().enumerate() {
            assignments.push(format!(
                "{} = {}",
                characters.escape_sql(column_name),
                characters.parameter_name(index)
            ));

            // Use the mapped storage type when the column is known.
            let argument = match self.find_column(table_info, column_name) {
                Some(column) => SqlArgument::new(new_value.clone(), column.sql_type()),
                None => SqlArgument::from(new_value.clone()),
            };
            arguments.push(argument);
        }

        arguments.push(SqlArgument::new(
            delta.identifier().clone(),
            identifier_column.sql_type(),
        ));

        let command_text = format!(
            "UPDATE {} SET {} WHERE ({} = {})",
            characters.escape_sql(&table_info.qualified_name()),
            assignments.join(","),
            characters.escape_sql(identifier_column.column_name()),
            characters.parameter_name(delta.change_count()),
        );

        Ok(SqlQuery::with_arguments(command_text, arguments))
    }

    /// Build `DELETE FROM <table> WHERE <identifier> = ?`.
    pub fn build_delete_sql_query(
        self,
        table_info: &TableInfo,
        identifier: &Value,
    ) -> Result<SqlQuery> {
        let characters = self.sql_characters();
        let identifier_column = table_info.identifier_column_or_error()?;

        let command_text = format!(
            "DELETE FROM {} WHERE ({} = {})",
            characters.escape_sql(&table_info.qualified_name()),
            characters.escape_sql(identifier_column.column_name()),
            characters.parameter_name(0),
        );

        tracing::debug!(dialect = ?self, table = table_info.name(), "built delete");

        Ok(SqlQuery::with_arguments(
            command_text,
            vec![SqlArgument::new(
                identifier.clone(),
                identifier_column.sql_type(),
            )],
        ))
    }

    /// Wrap a select query as a count of the rows it matches.
    ///
    /// The FROM and WHERE sections of the original statement are kept and the
    /// column list is replaced with `COUNT(*)`; any ORDER BY is dropped. The
    /// original arguments travel with the count query.
    pub fn count_query(self, sql_query: &SqlQuery) -> Result<SqlQuery> {
        use minorm_core::{Clauses, SqlString};

        let parsed = SqlString::parse(sql_query.command_text(), Clauses::FROM | Clauses::WHERE);

        let from = parsed.from().ok_or_else(|| {
            Error::invalid_argument(
                "sql_query",
                "a count query can only be built from a SELECT statement with a FROM clause",
            )
        })?;

        let mut command_text = format!("SELECT COUNT(*) FROM {from}");

        if let Some(predicate) = parsed.where_clause() {
            command_text.push_str(" WHERE ");
            command_text.push_str(predicate);
        }

        Ok(SqlQuery::with_arguments(
            command_text,
            sql_query.arguments().to_vec(),
        ))
    }

    /// Build the dialect's "fetch the identifier generated by the last
    /// insert" query.
    ///
    /// Only meaningful when
    /// [`supports_select_inserted_identifier`](Dialect::supports_select_inserted_identifier)
    /// is `true`; the RETURNING-based dialects have no separate query.
    pub fn build_select_insert_id_sql_query(self, _table_info: &TableInfo) -> Result<SqlQuery> {
        let command_text = match self {
            Dialect::MsSql2005 | Dialect::MsSql2012 => "SELECT SCOPE_IDENTITY()",
            Dialect::MySql => "SELECT LAST_INSERT_ID()",
            Dialect::Sqlite => "SELECT last_insert_rowid()",
            Dialect::PostgreSql | Dialect::Firebird => {
                return Err(Error::invalid_argument(
                    "dialect",
                    format!(
                        "the {self:?} dialect returns the inserted identifier from the insert \
                         statement itself; there is no separate identifier query"
                    ),
                ));
            }
        };

        Ok(SqlQuery::new(command_text))
    }

    fn column_list(self, table_info: &TableInfo) -> String {
        let characters = self.sql_characters();

        table_info
            .columns()
            .iter()
            .map(|column| characters.escape_sql(column.column_name()))
            .collect::<Vec<_>>()
            .join(",")
    }

    fn find_column<'a>(
        self,
        table_info: &'a TableInfo,
        column_name: &str,
    ) -> Option<&'a ColumnInfo> {
        table_info
            .columns()
            .iter()
            .find(|column| column.column_name() == column_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use minorm_core::SqlType;

    fn customers(strategy: IdentifierStrategy) -> TableInfo {
        TableInfo::new(
            vec![
                ColumnInfo::new("Id", SqlType::BigInt).identifier(),
                ColumnInfo::new("Name", SqlType::Text),
                ColumnInfo::new("CreditLimit", SqlType::Int),
            ],
            strategy,
            "Customers",
            Some("Sales"),
        )
        .unwrap()
    }

    fn sequence_customers() -> TableInfo {
        TableInfo::new(
            vec![
                ColumnInfo::new("Id", SqlType::BigInt)
                    .identifier()
                    .sequence_name("customer_id_seq"),
                ColumnInfo::new("Name", SqlType::Text),
            ],
            IdentifierStrategy::Sequence,
            "Customers",
            None,
        )
        .unwrap()
    }

    fn name_argument() -> SqlArgument {
        SqlArgument::new(Value::Text("Fred".to_string()), SqlType::Text)
    }

    fn credit_argument() -> SqlArgument {
        SqlArgument::new(Value::Int(100), SqlType::Int)
    }

    #[test]
    fn test_select_by_identifier_mssql() {
        let table = customers(IdentifierStrategy::DbGenerated);
        let query = Dialect::MsSql2012
            .build_select_sql_query(&table, &Value::BigInt(7))
            .unwrap();

        assert_eq!(
            query.command_text(),
            "SELECT [Id],[Name],[CreditLimit] FROM [Sales].[Customers] WHERE ([Id] = @p0)"
        );
        assert_eq!(query.arguments().len(), 1);
        assert_eq!(query.arguments()[0].value(), &Value::BigInt(7));
        assert_eq!(query.arguments()[0].sql_type(), SqlType::BigInt);
    }

    #[test]
    fn test_select_by_identifier_postgres_uses_colon_markers() {
        let table = customers(IdentifierStrategy::DbGenerated);
        let query = Dialect::PostgreSql
            .build_select_sql_query(&table, &Value::BigInt(7))
            .unwrap();

        assert_eq!(
            query.command_text(),
            "SELECT \"Id\",\"Name\",\"CreditLimit\" FROM \"Sales\".\"Customers\" WHERE (\"Id\" = :p0)"
        );
    }

    #[test]
    fn test_select_all() {
        let table = customers(IdentifierStrategy::DbGenerated);
        let query = Dialect::MySql.build_select_all_sql_query(&table);

        assert_eq!(
            query.command_text(),
            "SELECT `Id`,`Name`,`CreditLimit` FROM `Sales`.`Customers`"
        );
        assert!(query.arguments().is_empty());
    }

    #[test]
    fn test_insert_excludes_db_generated_identifier() {
        let table = customers(IdentifierStrategy::DbGenerated);
        let query = Dialect::MsSql2012
            .build_insert_sql_query(&table, vec![name_argument(), credit_argument()])
            .unwrap();

        assert_eq!(
            query.command_text(),
            "INSERT INTO [Sales].[Customers] ([Name],[CreditLimit]) VALUES (@p0,@p1)"
        );
        assert_eq!(query.arguments().len(), 2);
    }

    #[test]
    fn test_insert_includes_assigned_identifier() {
        let table = customers(IdentifierStrategy::Assigned);
        let id = SqlArgument::new(Value::BigInt(7), SqlType::BigInt);
        let query = Dialect::MsSql2012
            .build_insert_sql_query(&table, vec![id, name_argument(), credit_argument()])
            .unwrap();

        assert_eq!(
            query.command_text(),
            "INSERT INTO [Sales].[Customers] ([Id],[Name],[CreditLimit]) VALUES (@p0,@p1,@p2)"
        );
        assert_eq!(query.arguments().len(), 3);
    }

    #[test]
    fn test_insert_postgres_returns_identifier() {
        let table = customers(IdentifierStrategy::DbGenerated);
        let query = Dialect::PostgreSql
            .build_insert_sql_query(&table, vec![name_argument(), credit_argument()])
            .unwrap();

        assert_eq!(
            query.command_text(),
            "INSERT INTO \"Sales\".\"Customers\" (\"Name\",\"CreditLimit\") VALUES (:p0,:p1) \
             RETURNING \"Id\""
        );
    }

    #[test]
    fn test_insert_postgres_sequence_draws_inline() {
        let table = sequence_customers();
        let query = Dialect::PostgreSql
            .build_insert_sql_query(&table, vec![name_argument()])
            .unwrap();

        assert_eq!(
            query.command_text(),
            "INSERT INTO \"Customers\" (\"Id\",\"Name\") VALUES (nextval('customer_id_seq'),:p0) \
             RETURNING \"Id\""
        );
        assert_eq!(query.arguments().len(), 1);
    }

    #[test]
    fn test_insert_firebird_sequence_draws_inline() {
        let table = sequence_customers();
        let query = Dialect::Firebird
            .build_insert_sql_query(&table, vec![name_argument()])
            .unwrap();

        assert_eq!(
            query.command_text(),
            "INSERT INTO \"Customers\" (\"Id\",\"Name\") VALUES (NEXT VALUE FOR customer_id_seq,@p0) \
             RETURNING \"Id\""
        );
    }

    #[test]
    fn test_insert_sequence_unsupported_dialects_report_mapping_error() {
        let table = sequence_customers();

        for dialect in [
            Dialect::MsSql2005,
            Dialect::MsSql2012,
            Dialect::MySql,
            Dialect::Sqlite,
        ] {
            let error = dialect
                .build_insert_sql_query(&table, vec![name_argument()])
                .unwrap_err();
            assert!(matches!(error, Error::Mapping(_)), "{dialect:?}");
        }
    }

    #[test]
    fn test_update_sets_columns_and_filters_on_identifier() {
        let table = customers(IdentifierStrategy::DbGenerated);
        let values = vec![
            name_argument(),
            credit_argument(),
            SqlArgument::new(Value::BigInt(42), SqlType::BigInt),
        ];
        let query = Dialect::MsSql2012
            .build_update_sql_query(&table, values)
            .unwrap();

        assert_eq!(
            query.command_text(),
            "UPDATE [Sales].[Customers] SET [Name] = @p0,[CreditLimit] = @p1 WHERE ([Id] = @p2)"
        );
        assert_eq!(query.arguments().len(), 3);
        assert_eq!(query.arguments()[2].value(), &Value::BigInt(42));
    }

    #[test]
    fn test_delta_update_only_touches_changed_columns() {
        use minorm_core::{Model, Row};

        #[derive(Debug)]
        struct Customer;

        impl Model for Customer {
            fn table_info() -> minorm_core::Result<TableInfo> {
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

            fn from_row(_row: &Row) -> minorm_core::Result<Self> {
                Ok(Self)
            }

            fn column_value(&self, _column: &ColumnInfo) -> Value {
                Value::Null
            }

            fn set_identifier_value(&mut self, _value: Value) -> minorm_core::Result<()> {
                Ok(())
            }
        }

        let mut delta = ObjectDelta::new::<Customer>(42_i64).unwrap();
        delta.add_change("Name", "Fred");

        let query = Dialect::MsSql2012
            .build_update_sql_query_for_delta(&delta)
            .unwrap();

        assert_eq!(
            query.command_text(),
            "UPDATE [Sales].[Customers] SET [Name] = @p0 WHERE ([Id] = @p1)"
        );
        assert_eq!(query.arguments().len(), 2);
        // The changed column picks up its mapped storage type.
        assert_eq!(query.arguments()[0].sql_type(), SqlType::Text);
        assert_eq!(query.arguments()[1].value(), &Value::BigInt(42));
    }

    #[test]
    fn test_delete_by_identifier() {
        let table = customers(IdentifierStrategy::DbGenerated);
        let query = Dialect::MySql
            .build_delete_sql_query(&table, &Value::BigInt(9))
            .unwrap();

        assert_eq!(
            query.command_text(),
            "DELETE FROM `Sales`.`Customers` WHERE (`Id` = @p0)"
        );
        assert_eq!(query.arguments().len(), 1);
    }

    #[test]
    fn test_operations_require_an_identifier_column() {
        let table = TableInfo::new(
            vec![ColumnInfo::new("Name", SqlType::Text)],
            IdentifierStrategy::DbGenerated,
            "AuditLog",
            None,
        )
        .unwrap();

        let error = Dialect::MySql
            .build_select_sql_query(&table, &Value::BigInt(1))
            .unwrap_err();
        assert!(matches!(error, Error::NoIdentifierColumn { .. }));

        let error = Dialect::MySql
            .build_delete_sql_query(&table, &Value::BigInt(1))
            .unwrap_err();
        assert!(matches!(error, Error::NoIdentifierColumn { .. }));
    }

    #[test]
    fn test_count_query_keeps_from_and_where() {
        let query = SqlQuery::with_arguments(
            "SELECT [Id],[Name] FROM [Customers] WHERE [Status] = @p0 ORDER BY [Name]",
            vec![SqlArgument::new(Value::Int(1), SqlType::Int)],
        );

        let count = Dialect::MsSql2012.count_query(&query).unwrap();

        assert_eq!(
            count.command_text(),
            "SELECT COUNT(*) FROM [Customers] WHERE [Status] = @p0"
        );
        assert_eq!(count.arguments(), query.arguments());
    }

    #[test]
    fn test_count_query_without_predicate() {
        let query = SqlQuery::new("SELECT Id FROM Customers");
        let count = Dialect::MySql.count_query(&query).unwrap();

        assert_eq!(count.command_text(), "SELECT COUNT(*) FROM Customers");
    }

    #[test]
    fn test_count_query_rejects_non_select_text() {
        let query = SqlQuery::new("EXEC GetCustomers");
        let error = Dialect::MsSql2012.count_query(&query).unwrap_err();

        assert!(matches!(
            error,
            Error::InvalidArgument {
                parameter: "sql_query",
                ..
            }
        ));
    }

    #[test]
    fn test_select_insert_id_queries() {
        let table = customers(IdentifierStrategy::DbGenerated);

        assert_eq!(
            Dialect::MsSql2012
                .build_select_insert_id_sql_query(&table)
                .unwrap()
                .command_text(),
            "SELECT SCOPE_IDENTITY()"
        );
        assert_eq!(
            Dialect::MySql
                .build_select_insert_id_sql_query(&table)
                .unwrap()
                .command_text(),
            "SELECT LAST_INSERT_ID()"
        );
        assert_eq!(
            Dialect::Sqlite
                .build_select_insert_id_sql_query(&table)
                .unwrap()
                .command_text(),
            "SELECT last_insert_rowid()"
        );
    }

    #[test]
    fn test_returning_dialects_have_no_select_insert_id_query() {
        let table = customers(IdentifierStrategy::DbGenerated);

        assert!(!Dialect::PostgreSql.supports_select_inserted_identifier());
        assert!(!Dialect::Firebird.supports_select_inserted_identifier());
        assert!(
            Dialect::PostgreSql
                .build_select_insert_id_sql_query(&table)
                .is_err()
        );
    }
}
