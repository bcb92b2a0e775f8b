//! Core types and traits for the minorm micro ORM.
//!
//! `minorm-core` is the **foundation layer** for the entire workspace. It defines
//! the data types and contracts that all other crates build on.
//!
//! # Role In The Architecture
//!
//! - **Contract layer**: [`Connection`] is implemented by database drivers,
//!   [`Model`] by mapped types (or the code that generates them).
//! - **Data model**: [`SqlQuery`], [`SqlArgument`], [`Row`], and [`Value`]
//!   represent query inputs/outputs shared across the dialect, driver, and
//!   session crates.
//! - **Mapping metadata**: [`TableInfo`] and [`ColumnInfo`] describe how a type
//!   maps to a table; [`ObjectInfo`] derives the insert/update/identifier value
//!   sets from that metadata.
//! - **SQL text plumbing**: [`SqlCharacters`] supplies per-database syntax,
//!   `sql_utility` scans command text for parameter placeholders, and
//!   [`SqlString`] splits a select statement into clauses.
//! - **Structured concurrency**: re-exports `Cx` and `Outcome` from asupersync
//!   so every async database operation is cancel-correct.
//!
//! # Who Uses This Crate
//!
//! - `minorm-dialect` consumes [`TableInfo`] and [`SqlCharacters`] to build SQL.
//! - `minorm-driver` binds [`SqlQuery`] values to executable [`Command`]s and
//!   combines queries into batches.
//! - `minorm-session` depends on [`Connection`], [`Row`], and the mapping layer
//!   for its execution pipeline.
//!
//! Most applications should use the `minorm` facade; reach for `minorm-core`
//! directly when writing drivers or advanced integrations.

// Re-export asupersync primitives for structured concurrency
pub use asupersync::{Budget, Cx, Outcome, RegionId, TaskId};

pub mod characters;
pub mod connection;
pub mod convert;
pub mod error;
pub mod mapping;
pub mod paging;
pub mod query;
pub mod row;
pub mod sql_string;
pub mod sql_utility;
pub mod types;
pub mod value;

pub use characters::SqlCharacters;
pub use connection::{Command, CommandKind, Connection, Parameter, ParameterDirection};
pub use error::{Error, Result};
pub use mapping::{
    ColumnInfo, IdentifierStrategy, Model, ObjectDelta, ObjectInfo, ObjectInfoRegistry, TableInfo,
};
pub use paging::{PagedResult, PagingOptions};
pub use query::{SqlArgument, SqlQuery};
pub use row::Row;
pub use sql_string::{Clauses, SqlString};
pub use types::SqlType;
pub use value::Value;
