//! Command binding and query batching for the minorm micro ORM.
//!
//! The driver is the last stop before a query reaches the connection: it
//! validates a [`SqlQuery`]'s placeholder/argument correspondence, classifies
//! the text as plain SQL or a stored-procedure invocation, binds the
//! arguments to named parameters, and — when the database can execute several
//! statements in one round trip — combines multiple queries into a single
//! batched command with collision-free parameter names.
//!
//! Classification is heuristic by design: the text is never parsed beyond
//! lexical scanning. A statement which *starts* with the invocation keyword,
//! contains no statement separator, and (for dialects whose keyword is
//! `SELECT`) no `FROM` clause is treated as a procedure call. Ordinary text
//! can be crafted to trip this; see the tests for the documented boundary.

use std::collections::HashMap;
use std::sync::{OnceLock, RwLock};

use regex::Regex;

use minorm_core::{
    Command, CommandKind, Error, Parameter, ParameterDirection, Result, SqlCharacters, SqlQuery,
    sql_utility,
};

/// Thread-safe cache of compiled procedure-name patterns.
///
/// One pattern exists per invocation keyword, so the cache stays tiny; it
/// avoids recompiling on every command build.
#[derive(Debug, Default)]
struct RegexCache {
    cache: RwLock<HashMap<String, Regex>>,
}

impl RegexCache {
    fn get_or_compile(&self, pattern: &str) -> Result<Regex> {
        {
            let cache = self
                .cache
                .read()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            if let Some(regex) = cache.get(pattern) {
                return Ok(regex.clone());
            }
        }

        let regex = Regex::new(pattern)
            .map_err(|e| Error::execution_message(format!("invalid procedure pattern: {e}")))?;

        let mut cache = self
            .cache
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        cache.insert(pattern.to_string(), regex.clone());

        Ok(regex)
    }
}

fn regex_cache() -> &'static RegexCache {
    static CACHE: OnceLock<RegexCache> = OnceLock::new();
    CACHE.get_or_init(RegexCache::default)
}

/// The per-database strategy for turning [`SqlQuery`] values into executable
/// commands and batched round trips.
///
/// Driver values are immutable after construction and freely shareable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbDriver {
    characters: SqlCharacters,
    supports_batched_queries: bool,
    /// Whether a `FROM` clause disqualifies text from being a procedure call.
    /// Needed when the invocation keyword is `SELECT`, which ordinary queries
    /// also start with.
    from_clause_disqualifies: bool,
}

impl DbDriver {
    /// The driver for Microsoft SQL Server.
    #[must_use]
    pub const fn ms_sql() -> Self {
        Self {
            characters: SqlCharacters::MsSql,
            supports_batched_queries: true,
            from_clause_disqualifies: false,
        }
    }

    /// The driver for MySQL / MariaDB.
    #[must_use]
    pub const fn my_sql() -> Self {
        Self {
            characters: SqlCharacters::MySql,
            supports_batched_queries: true,
            from_clause_disqualifies: false,
        }
    }

    /// The driver for PostgreSQL.
    #[must_use]
    pub const fn postgre_sql() -> Self {
        Self {
            characters: SqlCharacters::PostgreSql,
            supports_batched_queries: true,
            from_clause_disqualifies: true,
        }
    }

    /// The driver for SQLite.
    #[must_use]
    pub const fn sqlite() -> Self {
        Self {
            characters: SqlCharacters::Sqlite,
            supports_batched_queries: true,
            from_clause_disqualifies: false,
        }
    }

    /// The driver for Firebird. Firebird executes one statement per command,
    /// so batching is unavailable and the session falls back to sequential
    /// execution.
    #[must_use]
    pub const fn firebird() -> Self {
        Self {
            characters: SqlCharacters::Firebird,
            supports_batched_queries: false,
            from_clause_disqualifies: false,
        }
    }

    /// The syntax characters this driver binds with.
    #[must_use]
    pub const fn sql_characters(&self) -> SqlCharacters {
        self.characters
    }

    /// Whether the database can execute multiple statements in one round trip.
    #[must_use]
    pub const fn supports_batched_queries(&self) -> bool {
        self.supports_batched_queries
    }

    /// Classify command text as a stored-procedure invocation.
    ///
    /// True only when the dialect supports stored procedures, the text starts
    /// with the invocation keyword, the text is not already a batch (no
    /// statement separator), and — where the keyword collides with ordinary
    /// query syntax — the text has no `FROM` clause.
    #[must_use]
    pub fn is_stored_procedure_call(&self, command_text: &str) -> bool {
        if !self.characters.supports_stored_procedures() {
            return false;
        }

        if self.from_clause_disqualifies && contains_ignore_case(command_text, "FROM") {
            return false;
        }

        starts_with_ignore_case(
            command_text,
            self.characters.stored_procedure_invocation_command(),
        ) && !command_text.contains(self.characters.statement_separator())
    }

    /// The text to execute: the bare procedure name for procedure calls, the
    /// full text otherwise.
    pub fn command_text(&self, command_text: &str) -> Result<String> {
        if !self.is_stored_procedure_call(command_text) {
            return Ok(command_text.to_string());
        }

        let keyword = self.characters.stored_procedure_invocation_command();
        let pattern = format!(r"(?i)^\s*{}\s+([A-Za-z_][A-Za-z0-9_.$]*)", regex::escape(keyword));
        let regex = regex_cache().get_or_compile(&pattern)?;

        if let Some(captures) = regex.captures(command_text) {
            if let Some(name) = captures.get(1) {
                return Ok(name.as_str().to_string());
            }
        }

        Ok(command_text[keyword.len()..].trim().to_string())
    }

    /// Bind a query's arguments and produce an executable [`Command`].
    ///
    /// Exactly one parameter is created per *distinct* placeholder name, in
    /// first-appearance order; a name referenced several times in the text
    /// still consumes a single argument. A count mismatch between distinct
    /// placeholders and supplied arguments is surfaced before anything
    /// reaches the database.
    pub fn build_command(&self, sql_query: &SqlQuery) -> Result<Command> {
        let text = sql_query.command_text();

        let parameters = if self.characters.supports_named_parameters() {
            let names = sql_utility::get_parameter_names(text);

            if names.len() != sql_query.arguments().len() {
                return Err(Error::ArgumentsCountMismatch {
                    expected: names.len(),
                    actual: sql_query.arguments().len(),
                });
            }

            names
                .into_iter()
                .zip(sql_query.arguments().iter().cloned())
                .map(|(name, argument)| Parameter {
                    name,
                    argument,
                    direction: ParameterDirection::Input,
                })
                .collect()
        } else {
            let count = sql_utility::count_positional_parameters(text);

            if count != sql_query.arguments().len() {
                return Err(Error::ArgumentsCountMismatch {
                    expected: count,
                    actual: sql_query.arguments().len(),
                });
            }

            sql_query
                .arguments()
                .iter()
                .cloned()
                .map(|argument| Parameter {
                    name: self.characters.sql_parameter().to_string(),
                    argument,
                    direction: ParameterDirection::Input,
                })
                .collect()
        };

        let kind = if self.is_stored_procedure_call(text) {
            CommandKind::StoredProcedure
        } else {
            CommandKind::Text
        };

        let command = Command {
            text: self.command_text(text)?,
            kind,
            parameters,
            timeout: sql_query.timeout,
        };

        tracing::debug!(
            kind = ?command.kind,
            parameters = command.parameters.len(),
            text = %command.text,
            "built command"
        );

        Ok(command)
    }

    /// Combine two queries into one batched query.
    pub fn combine(&self, query_a: &SqlQuery, query_b: &SqlQuery) -> Result<SqlQuery> {
        self.combine_all([query_a, query_b])
    }

    /// Combine any number of queries into one batched query.
    ///
    /// Statements are joined with the statement separator, arguments are
    /// concatenated in source order, and each subsequent statement's
    /// placeholders are renumbered past the arguments that precede it so no
    /// names collide. Stored-procedure calls pass through with their original
    /// parameter names: their placeholders are not sequential markers and
    /// rewriting them would corrupt the call. The combined timeout is the
    /// maximum of the source timeouts.
    pub fn combine_all<'a>(
        &self,
        queries: impl IntoIterator<Item = &'a SqlQuery>,
    ) -> Result<SqlQuery> {
        let mut command_text = String::new();
        let mut arguments = Vec::new();
        let mut timeout = 0_u32;
        let mut combined_any = false;

        for sql_query in queries {
            combined_any = true;
            timeout = timeout.max(sql_query.timeout);
            arguments.extend_from_slice(sql_query.arguments());

            if !command_text.is_empty() {
                command_text.push_str(self.characters.statement_separator());
                command_text.push_str("\r\n");
            }

            if self.is_stored_procedure_call(sql_query.command_text()) {
                command_text.push_str(sql_query.command_text());
            } else {
                command_text.push_str(&sql_utility::renumber_parameters(
                    sql_query.command_text(),
                    arguments.len(),
                ));
            }
        }

        if !combined_any {
            return Err(Error::invalid_argument(
                "sql_queries",
                "at least one query is required to combine",
            ));
        }

        tracing::debug!(arguments = arguments.len(), "combined batched query");

        let mut combined = SqlQuery::with_arguments(command_text, arguments);
        combined.timeout = timeout;

        Ok(combined)
    }
}

fn starts_with_ignore_case(text: &str, prefix: &str) -> bool {
    text.len() >= prefix.len()
        && text.as_bytes()[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes())
}

fn contains_ignore_case(text: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return true;
    }

    text.as_bytes()
        .windows(needle.len())
        .any(|window| window.eq_ignore_ascii_case(needle.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use minorm_core::{SqlArgument, SqlType, Value};

    fn text_argument(text: &str) -> SqlArgument {
        SqlArgument::new(Value::Text(text.to_string()), SqlType::Text)
    }

    fn int_argument(value: i32) -> SqlArgument {
        SqlArgument::new(Value::Int(value), SqlType::Int)
    }

    mod build_command {
        use super::*;

        // The argument count check must cater for the same argument being
        // referenced twice in the text.
        #[test]
        fn test_same_parameter_used_twice_binds_once() {
            let sql_query = SqlQuery::with_arguments(
                "SELECT * FROM `Table` WHERE `Table`.`Id` = @p0 AND `Table`.`Value1` = @p1 \
                 OR @p1 IS NULL",
                vec![int_argument(100), text_argument("hello")],
            );

            let command = DbDriver::my_sql().build_command(&sql_query).unwrap();

            assert_eq!(command.text, sql_query.command_text());
            assert_eq!(command.kind, CommandKind::Text);
            assert_eq!(command.parameters.len(), 2);

            assert_eq!(command.parameters[0].name, "@p0");
            assert_eq!(command.parameters[0].argument, sql_query.arguments()[0]);
            assert_eq!(command.parameters[0].direction, ParameterDirection::Input);

            assert_eq!(command.parameters[1].name, "@p1");
            assert_eq!(command.parameters[1].argument, sql_query.arguments()[1]);
        }

        #[test]
        fn test_argument_count_mismatch_is_rejected() {
            let sql_query = SqlQuery::with_arguments(
                "SELECT * FROM `Table` WHERE `Id` = @p0 AND `Name` = @p1",
                vec![int_argument(1)],
            );

            let error = DbDriver::my_sql().build_command(&sql_query).unwrap_err();

            match error {
                Error::ArgumentsCountMismatch { expected, actual } => {
                    assert_eq!(expected, 2);
                    assert_eq!(actual, 1);
                }
                other => panic!("expected ArgumentsCountMismatch, got {other:?}"),
            }
        }

        #[test]
        fn test_stored_procedure_without_parameters() {
            let sql_query = SqlQuery::new("CALL GetTableContents");

            let command = DbDriver::my_sql().build_command(&sql_query).unwrap();

            assert_eq!(command.text, "GetTableContents");
            assert_eq!(command.kind, CommandKind::StoredProcedure);
            assert!(command.parameters.is_empty());
        }

        #[test]
        fn test_stored_procedure_with_parameters_keeps_names() {
            let sql_query = SqlQuery::with_arguments(
                "CALL GetTableContents @identifier, @Cust_Name",
                vec![int_argument(100), text_argument("hello")],
            );

            let command = DbDriver::my_sql().build_command(&sql_query).unwrap();

            assert_eq!(command.text, "GetTableContents");
            assert_eq!(command.kind, CommandKind::StoredProcedure);
            assert_eq!(command.parameters.len(), 2);
            assert_eq!(command.parameters[0].name, "@identifier");
            assert_eq!(command.parameters[1].name, "@Cust_Name");
        }

        #[test]
        fn test_postgres_select_procedure_with_parenthesised_parameters() {
            let sql_query = SqlQuery::with_arguments(
                "SELECT GetTableContents (:identifier, :Cust_Name)",
                vec![int_argument(100), text_argument("hello")],
            );

            let command = DbDriver::postgre_sql().build_command(&sql_query).unwrap();

            assert_eq!(command.text, "GetTableContents");
            assert_eq!(command.kind, CommandKind::StoredProcedure);
            assert_eq!(command.parameters.len(), 2);
            assert_eq!(command.parameters[0].name, ":identifier");
        }

        #[test]
        fn test_timeout_is_carried_onto_the_command() {
            let mut sql_query = SqlQuery::new("SELECT 1");
            sql_query.timeout = 180;

            let command = DbDriver::ms_sql().build_command(&sql_query).unwrap();

            assert_eq!(command.timeout, 180);
        }
    }

    mod classification {
        use super::*;

        #[test]
        fn test_plain_select_is_not_a_procedure() {
            let driver = DbDriver::postgre_sql();
            assert!(!driver.is_stored_procedure_call("SELECT \"Id\" FROM \"Customers\""));
        }

        #[test]
        fn test_select_without_from_is_a_procedure_on_postgres() {
            let driver = DbDriver::postgre_sql();
            assert!(driver.is_stored_procedure_call("SELECT GetTableContents"));
        }

        #[test]
        fn test_batched_text_is_never_a_procedure() {
            let driver = DbDriver::my_sql();
            assert!(!driver.is_stored_procedure_call("CALL A;\r\nCALL B"));
        }

        #[test]
        fn test_sqlite_has_no_procedures() {
            let driver = DbDriver::sqlite();
            assert!(!driver.is_stored_procedure_call("CALL GetTableContents"));
            assert!(!driver.is_stored_procedure_call("EXEC GetTableContents"));
        }

        #[test]
        fn test_case_insensitive_keyword() {
            let driver = DbDriver::ms_sql();
            assert!(driver.is_stored_procedure_call("exec GetCustomers"));
        }

        // Known heuristic boundary: the classifier scans text lexically, it
        // does not parse. Scalar selects with no FROM clause on PostgreSql,
        // or an EXEC-prefixed fragment on SQL Server, classify as procedure
        // calls even when the author meant ordinary SQL. Documented, not
        // fixed: resolving it would require a SQL parser, which is out of
        // scope by design.
        #[test]
        fn test_heuristic_boundary_scalar_select_misclassifies() {
            let driver = DbDriver::postgre_sql();
            assert!(driver.is_stored_procedure_call("SELECT version()"));
        }
    }

    mod combine {
        use super::*;

        fn first_query() -> SqlQuery {
            let mut query = SqlQuery::with_arguments(
                "SELECT `Column1`, `Column2`, `Column3` FROM `dbo`.`Table1` WHERE `Column1` = @p0 \
                 AND `Column2` > @p1",
                vec![text_argument("Foo"), int_argument(100)],
            );
            query.timeout = 38;
            query
        }

        fn second_query() -> SqlQuery {
            let mut query = SqlQuery::with_arguments(
                "SELECT `Column_1`, `Column_2` FROM `dbo`.`Table_2` WHERE (`Column_1` = @p0 \
                 OR @p0 IS NULL) AND `Column_2` < @p1",
                vec![text_argument("Bar"), int_argument(-1)],
            );
            query.timeout = 42;
            query
        }

        #[test]
        fn test_combined_text_is_separated_and_renumbered() {
            let combined = DbDriver::my_sql()
                .combine(&first_query(), &second_query())
                .unwrap();

            assert_eq!(
                combined.command_text(),
                "SELECT `Column1`, `Column2`, `Column3` FROM `dbo`.`Table1` WHERE `Column1` = @p0 \
                 AND `Column2` > @p1;\r\n\
                 SELECT `Column_1`, `Column_2` FROM `dbo`.`Table_2` WHERE (`Column_1` = @p2 \
                 OR @p2 IS NULL) AND `Column_2` < @p3"
            );
        }

        #[test]
        fn test_combined_arguments_are_concatenated_in_source_order() {
            let first = first_query();
            let second = second_query();
            let combined = DbDriver::my_sql().combine(&first, &second).unwrap();

            assert_eq!(combined.arguments().len(), 4);
            assert_eq!(combined.arguments()[0], first.arguments()[0]);
            assert_eq!(combined.arguments()[1], first.arguments()[1]);
            assert_eq!(combined.arguments()[2], second.arguments()[0]);
            assert_eq!(combined.arguments()[3], second.arguments()[1]);
        }

        #[test]
        fn test_combined_timeout_is_the_maximum() {
            let combined = DbDriver::my_sql()
                .combine(&first_query(), &second_query())
                .unwrap();
            assert_eq!(combined.timeout, 42);
        }

        #[test]
        fn test_combine_all_matches_pairwise_combine() {
            let driver = DbDriver::my_sql();
            let queries = [first_query(), second_query()];

            let from_slice = driver.combine_all(&queries).unwrap();
            let pairwise = driver.combine(&queries[0], &queries[1]).unwrap();

            assert_eq!(from_slice, pairwise);
            assert_eq!(from_slice.timeout, pairwise.timeout);
        }

        // Re-writing parameters must not happen when the query is a stored
        // procedure call, wherever it sits in the combine sequence.
        #[test]
        fn test_stored_procedure_parameters_are_not_renumbered() {
            let procedure =
                SqlQuery::with_arguments("CALL CustomersByStatus @StatusId", vec![int_argument(2)]);

            let combined = DbDriver::my_sql().combine(&first_query(), &procedure).unwrap();

            assert_eq!(
                combined.command_text(),
                "SELECT `Column1`, `Column2`, `Column3` FROM `dbo`.`Table1` WHERE `Column1` = @p0 \
                 AND `Column2` > @p1;\r\nCALL CustomersByStatus @StatusId"
            );
            assert_eq!(combined.arguments().len(), 3);
        }

        #[test]
        fn test_stored_procedure_first_shifts_following_statement() {
            let procedure =
                SqlQuery::with_arguments("CALL CustomersByStatus @StatusId", vec![int_argument(2)]);

            let combined = DbDriver::my_sql().combine(&procedure, &second_query()).unwrap();

            // The procedure's argument still occupies slot 0, so the second
            // statement renumbers to @p1/@p2.
            assert_eq!(
                combined.command_text(),
                "CALL CustomersByStatus @StatusId;\r\n\
                 SELECT `Column_1`, `Column_2` FROM `dbo`.`Table_2` WHERE (`Column_1` = @p1 \
                 OR @p1 IS NULL) AND `Column_2` < @p2"
            );
        }

        #[test]
        fn test_combined_command_binds_every_distinct_parameter() {
            let driver = DbDriver::my_sql();
            let combined = driver.combine(&first_query(), &second_query()).unwrap();

            let command = driver.build_command(&combined).unwrap();

            assert_eq!(command.kind, CommandKind::Text);
            assert_eq!(command.parameters.len(), 4);
            assert_eq!(command.parameters[2].name, "@p2");
            assert_eq!(command.parameters[3].name, "@p3");
        }

        #[test]
        fn test_combining_nothing_is_an_argument_error() {
            let error = DbDriver::my_sql().combine_all(&[]).unwrap_err();
            assert!(matches!(
                error,
                Error::InvalidArgument {
                    parameter: "sql_queries",
                    ..
                }
            ));
        }

        #[test]
        fn test_batching_capabilities() {
            assert!(DbDriver::ms_sql().supports_batched_queries());
            assert!(DbDriver::my_sql().supports_batched_queries());
            assert!(DbDriver::postgre_sql().supports_batched_queries());
            assert!(DbDriver::sqlite().supports_batched_queries());
            assert!(!DbDriver::firebird().supports_batched_queries());
        }
    }
}
