//! Dialect-specific paging syntax.
//!
//! Whatever the syntax — `LIMIT offset,count`, `OFFSET … FETCH`, or a
//! windowed `ROW_NUMBER()` wrapper — a paged query always carries exactly two
//! new trailing arguments, offset then count, after the original query's
//! arguments. Dialects whose syntax wants the count first reference the
//! markers by name instead of reordering the values.

use minorm_core::{
    Clauses, Error, PagingOptions, Result, SqlArgument, SqlQuery, SqlString, SqlType, Value,
};

use crate::Dialect;

impl Dialect {
    /// Wrap a select query in this dialect's paging syntax.
    ///
    /// Fails with [`Error::PagingOptionsNone`] when no offset/count pair was
    /// supplied.
    pub fn page_query(self, sql_query: &SqlQuery, paging_options: PagingOptions) -> Result<SqlQuery> {
        let (Some(offset), Some(count)) = (paging_options.offset(), paging_options.count()) else {
            return Err(Error::PagingOptionsNone);
        };

        let characters = self.sql_characters();

        let offset_marker = characters.parameter_name(sql_query.arguments().len());
        let count_marker = characters.parameter_name(sql_query.arguments().len() + 1);

        let command_text = match self {
            Dialect::MsSql2005 => {
                row_number_page_text(sql_query.command_text(), &offset_marker, &count_marker)?
            }
            Dialect::MsSql2012 | Dialect::Firebird => {
                let mut text = sql_query.command_text().to_string();

                if self == Dialect::MsSql2012 {
                    let parsed = SqlString::parse(sql_query.command_text(), Clauses::ORDER_BY);
                    // OFFSET/FETCH is only valid after an ORDER BY.
                    if parsed.order_by().is_none() {
                        text.push_str(" ORDER BY (SELECT NULL)");
                    }
                }

                text.push_str(" OFFSET ");
                text.push_str(&offset_marker);
                text.push_str(" ROWS FETCH NEXT ");
                text.push_str(&count_marker);
                text.push_str(" ROWS ONLY");
                text
            }
            Dialect::MySql => {
                format!(
                    "{} LIMIT {offset_marker},{count_marker}",
                    sql_query.command_text()
                )
            }
            Dialect::PostgreSql | Dialect::Sqlite => {
                format!(
                    "{} LIMIT {count_marker} OFFSET {offset_marker}",
                    sql_query.command_text()
                )
            }
        };

        let mut arguments = sql_query.arguments().to_vec();
        arguments.push(SqlArgument::new(Value::BigInt(offset), SqlType::BigInt));
        arguments.push(SqlArgument::new(Value::BigInt(count), SqlType::BigInt));

        Ok(SqlQuery::with_arguments(command_text, arguments))
    }
}

/// Wrap a select in a `ROW_NUMBER()` window for servers without OFFSET/FETCH.
///
/// The original ORDER BY moves into the window function; without one the
/// window orders over `(SELECT NULL)`, i.e. the server's natural order.
fn row_number_page_text(
    command_text: &str,
    offset_marker: &str,
    count_marker: &str,
) -> Result<String> {
    let parsed = SqlString::parse(
        command_text,
        Clauses::SELECT | Clauses::FROM | Clauses::WHERE | Clauses::ORDER_BY,
    );

    let (Some(select), Some(from)) = (parsed.select(), parsed.from()) else {
        return Err(Error::invalid_argument(
            "sql_query",
            "a paged query can only be built from a SELECT statement with a FROM clause",
        ));
    };

    let order_by = parsed.order_by().unwrap_or("(SELECT NULL)");

    let mut text = format!(
        "SELECT {select} FROM (SELECT {select}, ROW_NUMBER() OVER (ORDER BY {order_by}) \
         AS [_RowNumber] FROM {from}"
    );

    if let Some(predicate) = parsed.where_clause() {
        text.push_str(" WHERE ");
        text.push_str(predicate);
    }

    text.push_str(&format!(
        ") AS [_PagedResults] WHERE ([_RowNumber] > {offset_marker} \
         AND [_RowNumber] <= {offset_marker} + {count_marker})"
    ));

    Ok(text)
}
