//! Parameterized SQL queries and their arguments.

use serde::{Deserialize, Serialize};

use crate::types::SqlType;
use crate::value::Value;

/// The default command timeout, in seconds.
pub const DEFAULT_TIMEOUT_SECONDS: u32 = 30;

/// A value paired with its declared storage type.
///
/// Arguments are positional: their order must match the order of the distinct
/// parameter placeholders in the command text they accompany.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SqlArgument {
    value: Value,
    sql_type: SqlType,
}

impl SqlArgument {
    /// Create a new argument with an explicit storage type.
    #[must_use]
    pub const fn new(value: Value, sql_type: SqlType) -> Self {
        Self { value, sql_type }
    }

    /// The runtime value.
    #[must_use]
    pub const fn value(&self) -> &Value {
        &self.value
    }

    /// The declared storage type.
    #[must_use]
    pub const fn sql_type(&self) -> SqlType {
        self.sql_type
    }
}

impl From<Value> for SqlArgument {
    /// Infer a storage type from the value variant.
    fn from(value: Value) -> Self {
        let sql_type = match &value {
            Value::Null | Value::Text(_) => SqlType::Text,
            Value::Bool(_) => SqlType::Bool,
            Value::Int(_) => SqlType::Int,
            Value::BigInt(_) => SqlType::BigInt,
            Value::Double(_) => SqlType::Double,
            Value::Decimal(_) => SqlType::Decimal,
            Value::Bytes(_) => SqlType::Bytes,
            Value::Date(_) => SqlType::Date,
            Value::Timestamp(_) => SqlType::Timestamp,
            Value::Json(_) => SqlType::Json,
        };

        Self { value, sql_type }
    }
}

/// A SQL command text plus its ordered argument list.
///
/// Two queries compare equal when their command text and arguments match; the
/// timeout does not participate in equality. The invariant that the number of
/// distinct placeholders in the text equals the argument count is enforced
/// when the query is bound to a command, not at construction, because
/// combining queries rewrites the text first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SqlQuery {
    command_text: String,
    arguments: Vec<SqlArgument>,
    /// Command timeout in seconds. Mutable so callers can extend long-running
    /// queries after construction.
    pub timeout: u32,
}

impl SqlQuery {
    /// Create a query with no arguments.
    pub fn new(command_text: impl Into<String>) -> Self {
        Self::with_arguments(command_text, Vec::new())
    }

    /// Create a query with the given ordered arguments.
    pub fn with_arguments(command_text: impl Into<String>, arguments: Vec<SqlArgument>) -> Self {
        Self {
            command_text: command_text.into(),
            arguments,
            timeout: DEFAULT_TIMEOUT_SECONDS,
        }
    }

    /// The SQL command text.
    #[must_use]
    pub fn command_text(&self) -> &str {
        &self.command_text
    }

    /// The ordered argument list.
    #[must_use]
    pub fn arguments(&self) -> &[SqlArgument] {
        &self.arguments
    }
}

impl PartialEq for SqlQuery {
    fn eq(&self, other: &Self) -> bool {
        self.command_text == other.command_text && self.arguments == other.arguments
    }
}
