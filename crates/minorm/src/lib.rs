//! minorm — a micro ORM for Rust.
//!
//! minorm maps plain structs to relational tables, generates dialect-correct
//! parameterized SQL for CRUD, paging and batching, and executes it through a
//! pluggable [`Connection`] abstraction. It is deliberately small: no change
//! tracking, no unit of work, no query planner — a [`Session`] is one logical
//! unit of work that builds SQL through a [`Dialect`], binds it through a
//! [`DbDriver`], and streams rows back into your types.
//!
//! # Quick Start
//!
//! ```ignore
//! use minorm::prelude::*;
//!
//! let mut session = Session::new(connection, Dialect::MySql, DbDriver::my_sql());
//!
//! // Immediate reads.
//! let customer: Option<Customer> = unwrap_outcome(session.single(&cx, 12).await);
//!
//! // Deferred reads, flushed in one batched round trip.
//! let fred = session.include_single::<Customer>(12)?;
//! let total = session.include_scalar(&SqlQuery::new("SELECT COUNT(*) FROM `Customers`"))?;
//! session.execute_pending_queries(&cx).await;
//! println!("{:?} of {:?}", fred.value()?, total.value()?);
//!
//! // Writes round-trip database-generated identifiers.
//! let mut new_customer = Customer::new("Fred");
//! session.insert(&cx, &mut new_customer).await;
//! assert!(new_customer.id > 0);
//! ```
//!
//! # Crate Layout
//!
//! This crate is a facade over the workspace layers:
//!
//! - [`minorm_core`] — values, queries, mapping metadata, the [`Connection`]
//!   contract, paging primitives.
//! - [`minorm_dialect`] — per-database SQL generation ([`Dialect`]).
//! - [`minorm_driver`] — command binding and query batching ([`DbDriver`]).
//! - [`minorm_session`] — the execution pipeline ([`Session`]).

pub use minorm_core::{
    ColumnInfo, Command, CommandKind, Connection, Cx, Error, IdentifierStrategy, Model,
    ObjectDelta, ObjectInfo, ObjectInfoRegistry, Outcome, PagedResult, PagingOptions, Parameter,
    ParameterDirection, Result, Row, SqlArgument, SqlCharacters, SqlQuery, SqlType, TableInfo,
    Value,
};
pub use minorm_dialect::Dialect;
pub use minorm_driver::DbDriver;
pub use minorm_session::{
    DeleteListener, Include, IncludeMany, IncludeScalar, InsertListener, Session,
    SessionListeners, UpdateListener,
};

/// The commonly used minorm types, importable in one line.
pub mod prelude {
    pub use minorm_core::{
        ColumnInfo, Connection, Cx, Error, IdentifierStrategy, Model, ObjectDelta, Outcome,
        PagedResult, PagingOptions, Result, Row, SqlArgument, SqlQuery, SqlType, TableInfo, Value,
    };
    pub use minorm_dialect::Dialect;
    pub use minorm_driver::DbDriver;
    pub use minorm_session::{
        DeleteListener, Include, IncludeMany, IncludeScalar, InsertListener, Session,
        SessionListeners, UpdateListener,
    };
}
