//! The connection contract implemented by database drivers.

use std::future::Future;

use asupersync::{Cx, Outcome};

use crate::error::{Error, Result};
use crate::query::SqlArgument;
use crate::row::Row;
use crate::value::Value;

/// How a command's text should be interpreted by the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommandKind {
    /// Plain SQL statement text.
    #[default]
    Text,
    /// The text is a stored procedure name to invoke.
    StoredProcedure,
}

/// The direction of a bound parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParameterDirection {
    /// The parameter carries a value into the database.
    #[default]
    Input,
    /// The parameter receives a value from the database.
    Output,
}

/// A named parameter bound to a command.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    /// The dialect-specific parameter name, e.g. `@p0`.
    pub name: String,
    /// The value and its declared storage type.
    pub argument: SqlArgument,
    /// The parameter direction. The driver only emits input parameters.
    pub direction: ParameterDirection,
}

/// An executable command: validated text plus bound parameters.
///
/// Commands are produced by the driver from a
/// [`SqlQuery`](crate::query::SqlQuery); the session never hands raw query
/// text to a connection.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    /// The statement text, or the bare procedure name for
    /// [`CommandKind::StoredProcedure`].
    pub text: String,
    /// How the text should be interpreted.
    pub kind: CommandKind,
    /// The bound parameters, one per distinct placeholder.
    pub parameters: Vec<Parameter>,
    /// Command timeout in seconds.
    pub timeout: u32,
}

/// A database connection capable of executing bound commands.
///
/// One connection is owned exclusively by one session for its whole lifetime.
/// Every method takes a [`Cx`] so in-flight work is cancel-correct; building
/// and binding never suspend, only these calls do.
pub trait Connection: Send + Sync {
    /// Execute a command and stream back every row of its single result set.
    fn query(
        &self,
        cx: &Cx,
        command: &Command,
    ) -> impl Future<Output = Outcome<Vec<Row>, Error>> + Send;

    /// Execute a batched command and return one row set per statement, in
    /// statement order.
    fn query_batch(
        &self,
        cx: &Cx,
        command: &Command,
    ) -> impl Future<Output = Outcome<Vec<Vec<Row>>, Error>> + Send;

    /// Execute a command and return the first column of the first row of the
    /// first result set which produces rows, or `None` when nothing does.
    fn query_scalar(
        &self,
        cx: &Cx,
        command: &Command,
    ) -> impl Future<Output = Outcome<Option<Value>, Error>> + Send;

    /// Execute a command that returns no rows; yields the affected row count.
    fn execute(
        &self,
        cx: &Cx,
        command: &Command,
    ) -> impl Future<Output = Outcome<u64, Error>> + Send;

    /// Release the connection.
    fn close(self, cx: &Cx) -> impl Future<Output = Result<()>> + Send;
}
