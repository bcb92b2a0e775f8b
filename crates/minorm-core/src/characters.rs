//! Per-dialect SQL syntax characters.

use std::fmt::Write as _;

/// The syntax characters for one database family.
///
/// One variant exists per supported database; each is a constant syntax table
/// selected once at configuration time. [`SqlCharacters::Empty`] is the
/// raw-SQL mode used when no dialect has been chosen: identifiers pass through
/// unescaped and parameters are positional `?` markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SqlCharacters {
    /// No dialect: no identifier escaping, positional `?` parameters.
    #[default]
    Empty,
    /// Microsoft SQL Server.
    MsSql,
    /// MySQL.
    MySql,
    /// PostgreSQL.
    PostgreSql,
    /// SQLite.
    Sqlite,
    /// Firebird.
    Firebird,
}

impl SqlCharacters {
    /// The left identifier delimiter; empty means no escaping.
    #[must_use]
    pub const fn left_delimiter(self) -> &'static str {
        match self {
            SqlCharacters::Empty => "",
            SqlCharacters::MsSql => "[",
            SqlCharacters::MySql => "`",
            SqlCharacters::PostgreSql | SqlCharacters::Sqlite | SqlCharacters::Firebird => "\"",
        }
    }

    /// The right identifier delimiter; empty means no escaping.
    #[must_use]
    pub const fn right_delimiter(self) -> &'static str {
        match self {
            SqlCharacters::Empty => "",
            SqlCharacters::MsSql => "]",
            SqlCharacters::MySql => "`",
            SqlCharacters::PostgreSql | SqlCharacters::Sqlite | SqlCharacters::Firebird => "\"",
        }
    }

    /// The parameter marker prefix (`?` when parameters are positional).
    #[must_use]
    pub const fn sql_parameter(self) -> &'static str {
        match self {
            SqlCharacters::Empty => "?",
            SqlCharacters::PostgreSql => ":",
            SqlCharacters::MsSql
            | SqlCharacters::MySql
            | SqlCharacters::Sqlite
            | SqlCharacters::Firebird => "@",
        }
    }

    /// Whether parameters are named (`@p0`) rather than positional (`?`).
    #[must_use]
    pub const fn supports_named_parameters(self) -> bool {
        !matches!(self, SqlCharacters::Empty)
    }

    /// The keyword which invokes a stored procedure; empty when the database
    /// has no stored procedures.
    #[must_use]
    pub const fn stored_procedure_invocation_command(self) -> &'static str {
        match self {
            SqlCharacters::Empty | SqlCharacters::Sqlite => "",
            SqlCharacters::MsSql => "EXEC",
            SqlCharacters::MySql => "CALL",
            SqlCharacters::PostgreSql => "SELECT",
            SqlCharacters::Firebird => "EXECUTE PROCEDURE",
        }
    }

    /// Whether the database supports stored procedures at all.
    #[must_use]
    pub const fn supports_stored_procedures(self) -> bool {
        !self.stored_procedure_invocation_command().is_empty()
    }

    /// The statement separator recognised inside batched command text.
    #[must_use]
    pub const fn statement_separator(self) -> &'static str {
        ";"
    }

    /// The parameter name for the given zero-based index.
    ///
    /// Pure and deterministic: positional dialects always get `?`, named
    /// dialects get `{prefix}p{index}`.
    #[must_use]
    pub fn parameter_name(self, index: usize) -> String {
        if self.supports_named_parameters() {
            let mut name = String::with_capacity(4);
            let _ = write!(name, "{}p{index}", self.sql_parameter());
            name
        } else {
            self.sql_parameter().to_string()
        }
    }

    /// Whether the identifier is already wrapped in this dialect's delimiters.
    #[must_use]
    pub fn is_escaped(self, identifier: &str) -> bool {
        if self.left_delimiter().is_empty() {
            return false;
        }

        identifier.starts_with(self.left_delimiter()) && identifier.ends_with(self.right_delimiter())
    }

    /// Wrap an identifier in the dialect's delimiters.
    ///
    /// With empty delimiters the identifier passes through unchanged. An
    /// already escaped identifier is never wrapped twice, and dotted names
    /// (`schema.table`) are escaped segment by segment.
    #[must_use]
    pub fn escape_sql(self, identifier: &str) -> String {
        if self.left_delimiter().is_empty() || self.is_escaped(identifier) {
            return identifier.to_string();
        }

        if !identifier.contains('.') {
            return format!(
                "{}{}{}",
                self.left_delimiter(),
                identifier,
                self.right_delimiter()
            );
        }

        identifier
            .split('.')
            .map(|segment| {
                format!(
                    "{}{}{}",
                    self.left_delimiter(),
                    segment,
                    self.right_delimiter()
                )
            })
            .collect::<Vec<_>>()
            .join(".")
    }
}
