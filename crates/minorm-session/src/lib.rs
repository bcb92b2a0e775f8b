//! Session execution pipeline for the minorm micro ORM.
//!
//! A [`Session`] is one logical unit of work against one connection: it
//! builds queries through its [`Dialect`], binds them through its
//! [`DbDriver`], and executes them against the [`Connection`] it owns
//! exclusively. Reads can run immediately or be deferred as *includes* and
//! flushed together — in a single batched round trip when the database
//! supports it. Writes run inside ordered listener chains and round-trip
//! database-generated identifiers back onto the instance.
//!
//! # Design Philosophy
//!
//! - **Explicit over implicit**: deferred reads resolve only when
//!   `execute_pending_queries` is called; reading earlier is an error.
//! - **Ownership clarity**: the session owns the connection; closing the
//!   session is a one-way door and every later call fails with
//!   [`Error::SessionClosed`] before any other validation runs.
//! - **Cancellation is not failure**: every suspending call threads the
//!   caller's [`Cx`] through, and a cancelled operation surfaces as
//!   `Outcome::Cancelled`, never as an [`Error`].
//!
//! # Example
//!
//! ```ignore
//! let mut session = Session::new(connection, Dialect::MySql, DbDriver::my_sql());
//!
//! // Deferred reads, one round trip.
//! let customer = session.include_single::<Customer>(12)?;
//! let count = session.include_scalar(&SqlQuery::new("SELECT COUNT(*) FROM `Customers`"))?;
//! session.execute_pending_queries(&cx).await?;
//!
//! // Writes with identifier round-tripping.
//! let mut fred = Customer::new("Fred");
//! session.insert(&cx, &mut fred).await?;
//! assert!(fred.id > 0);
//! ```

mod include;
mod listeners;

use std::any::Any;
use std::sync::OnceLock;

use asupersync::{Cx, Outcome};

use minorm_core::{
    Connection, Error, IdentifierStrategy, Model, ObjectDelta, PagedResult, PagingOptions, Result,
    Row, SqlQuery, Value, convert, mapping::object_info_of,
};
use minorm_dialect::Dialect;
use minorm_driver::DbDriver;

pub use include::{Include, IncludeMany, IncludeScalar};
pub use listeners::{DeleteListener, InsertListener, SessionListeners, UpdateListener};

/// Propagate the non-`Ok` arms of an [`Outcome`], yielding the `Ok` value.
macro_rules! try_outcome {
    ($outcome:expr) => {
        match $outcome {
            Outcome::Ok(value) => value,
            Outcome::Err(e) => return Outcome::Err(e),
            Outcome::Cancelled(r) => return Outcome::Cancelled(r),
            Outcome::Panicked(p) => return Outcome::Panicked(p),
        }
    };
}

/// Lift a [`Result`] into an [`Outcome`], propagating the error arm.
macro_rules! try_result {
    ($result:expr) => {
        match $result {
            Ok(value) => value,
            Err(e) => return Outcome::Err(e),
        }
    };
}

/// A queued deferred read: the query plus the closure that demultiplexes its
/// rows into the include handle.
struct PendingQuery {
    sql_query: SqlQuery,
    resolver: Box<dyn FnOnce(Vec<Row>) -> Result<()> + Send>,
}

impl std::fmt::Debug for PendingQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingQuery")
            .field("sql_query", &self.sql_query)
            .finish_non_exhaustive()
    }
}

/// One logical unit of work against one connection.
///
/// A session is not safe for overlapping operations on the same instance;
/// callers serialize access externally (typically by simply owning it).
#[derive(Debug)]
pub struct Session<C: Connection> {
    connection: Option<C>,
    dialect: Dialect,
    driver: DbDriver,
    listeners: SessionListeners,
    pending: Vec<PendingQuery>,
}

impl<C: Connection> Session<C> {
    /// Create a session with no listeners.
    #[must_use]
    pub fn new(connection: C, dialect: Dialect, driver: DbDriver) -> Self {
        Self::with_listeners(connection, dialect, driver, SessionListeners::new())
    }

    /// Create a session with the given listener chains.
    #[must_use]
    pub fn with_listeners(
        connection: C,
        dialect: Dialect,
        driver: DbDriver,
        listeners: SessionListeners,
    ) -> Self {
        Self {
            connection: Some(connection),
            dialect,
            driver,
            listeners,
            pending: Vec::new(),
        }
    }

    /// The dialect this session builds SQL with.
    #[must_use]
    pub const fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// The driver this session binds commands with.
    #[must_use]
    pub const fn driver(&self) -> &DbDriver {
        &self.driver
    }

    /// Whether the session has been closed.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.connection.is_none()
    }

    /// The number of deferred reads waiting for a flush.
    #[must_use]
    pub fn pending_query_count(&self) -> usize {
        self.pending.len()
    }

    /// Close the session and release its connection. Idempotent; every
    /// operation after the first close fails with [`Error::SessionClosed`].
    pub async fn close(&mut self, cx: &Cx) -> Result<()> {
        self.pending.clear();

        match self.connection.take() {
            Some(connection) => connection.close(cx).await,
            None => Ok(()),
        }
    }

    fn open_connection(&self) -> Result<&C> {
        self.connection.as_ref().ok_or(Error::SessionClosed)
    }

    // ========================================================================
    // Immediate reads
    // ========================================================================

    /// Fetch a single instance by its identifier.
    pub async fn single<M: Model>(
        &self,
        cx: &Cx,
        identifier: impl Into<Value> + Send,
    ) -> Outcome<Option<M>, Error> {
        try_result!(self.open_connection());

        let object_info = try_result!(object_info_of::<M>());
        let sql_query = try_result!(
            self.dialect
                .build_select_sql_query(object_info.table_info(), &identifier.into())
        );

        let rows = try_outcome!(self.query_rows(cx, &sql_query).await);

        match rows.into_iter().next() {
            Some(row) => Outcome::Ok(Some(try_result!(M::from_row(&row)))),
            None => Outcome::Ok(None),
        }
    }

    /// Fetch every instance matched by the query.
    #[tracing::instrument(level = "debug", skip_all)]
    pub async fn fetch<M: Model>(&self, cx: &Cx, sql_query: &SqlQuery) -> Outcome<Vec<M>, Error> {
        try_result!(self.open_connection());

        let rows = try_outcome!(self.query_rows(cx, sql_query).await);

        Outcome::Ok(try_result!(materialize::<M>(rows)))
    }

    /// Fetch the instance matched by the query, failing when the query
    /// matches more than one row.
    pub async fn fetch_single<M: Model>(
        &self,
        cx: &Cx,
        sql_query: &SqlQuery,
    ) -> Outcome<Option<M>, Error> {
        try_result!(self.open_connection());

        let rows = try_outcome!(self.query_rows(cx, sql_query).await);

        if rows.len() > 1 {
            return Outcome::Err(Error::SingleRecordExpected);
        }

        match rows.into_iter().next() {
            Some(row) => Outcome::Ok(Some(try_result!(M::from_row(&row)))),
            None => Outcome::Ok(None),
        }
    }

    /// Fetch every row of the mapped table.
    pub async fn fetch_all<M: Model>(&self, cx: &Cx) -> Outcome<Vec<M>, Error> {
        try_result!(self.open_connection());

        let object_info = try_result!(object_info_of::<M>());
        let sql_query = self
            .dialect
            .build_select_all_sql_query(object_info.table_info());

        let rows = try_outcome!(self.query_rows(cx, &sql_query).await);

        Outcome::Ok(try_result!(materialize::<M>(rows)))
    }

    /// Execute a statement and return the affected row count.
    pub async fn execute(&self, cx: &Cx, sql_query: &SqlQuery) -> Outcome<u64, Error> {
        try_result!(self.open_connection());
        self.execute_sql_query(cx, sql_query).await
    }

    /// Execute a query and return the first column of its first row.
    pub async fn execute_scalar(
        &self,
        cx: &Cx,
        sql_query: &SqlQuery,
    ) -> Outcome<Option<Value>, Error> {
        let connection = try_result!(self.open_connection());
        let command = try_result!(self.driver.build_command(sql_query));

        connection.query_scalar(cx, &command).await
    }

    /// Run the count and page queries for one page of results.
    ///
    /// Both queries execute in a single round trip when the driver supports
    /// batching, otherwise sequentially — count first, then page.
    #[tracing::instrument(level = "debug", skip_all)]
    pub async fn paged<M: Model>(
        &self,
        cx: &Cx,
        sql_query: &SqlQuery,
        paging_options: PagingOptions,
    ) -> Outcome<PagedResult<M>, Error> {
        let connection = try_result!(self.open_connection());

        let (Some(skip), Some(take)) = (paging_options.offset(), paging_options.count()) else {
            return Outcome::Err(Error::PagingOptionsNone);
        };

        let count_query = try_result!(self.dialect.count_query(sql_query));
        let page_query = try_result!(self.dialect.page_query(sql_query, paging_options));

        let (total_results, rows) = if self.driver.supports_batched_queries() {
            let combined = try_result!(self.driver.combine(&count_query, &page_query));
            let command = try_result!(self.driver.build_command(&combined));

            let mut row_sets = try_outcome!(connection.query_batch(cx, &command).await);

            if row_sets.len() != 2 {
                return Outcome::Err(Error::execution_message(format!(
                    "a paged query produces 2 result sets, the connection returned {}",
                    row_sets.len()
                )));
            }

            let rows = row_sets.pop().unwrap_or_default();
            let count_rows = row_sets.pop().unwrap_or_default();

            (try_result!(scalar_count(&count_rows)), rows)
        } else {
            let count_rows = try_outcome!(self.query_rows(cx, &count_query).await);
            let rows = try_outcome!(self.query_rows(cx, &page_query).await);

            (try_result!(scalar_count(&count_rows)), rows)
        };

        let results = try_result!(materialize::<M>(rows));
        let page = (skip / take) + 1;

        tracing::debug!(page, total_results, "paged query completed");

        Outcome::Ok(PagedResult::new(page, results, take, total_results))
    }

    // ========================================================================
    // Deferred reads
    // ========================================================================

    /// Register a deferred fetch-by-identifier.
    pub fn include_single<M: Model>(
        &mut self,
        identifier: impl Into<Value>,
    ) -> Result<Include<M>> {
        self.open_connection()?;

        let object_info = object_info_of::<M>()?;
        let sql_query = self
            .dialect
            .build_select_sql_query(object_info.table_info(), &identifier.into())?;

        Ok(self.enqueue_single(sql_query))
    }

    /// Register a deferred multi-row fetch.
    pub fn include_many<M: Model>(&mut self, sql_query: &SqlQuery) -> Result<IncludeMany<M>> {
        self.open_connection()?;
        Ok(self.enqueue_many(sql_query.clone()))
    }

    /// Register a deferred fetch of every row of the mapped table.
    pub fn include_all<M: Model>(&mut self) -> Result<IncludeMany<M>> {
        self.open_connection()?;

        let object_info = object_info_of::<M>()?;
        let sql_query = self
            .dialect
            .build_select_all_sql_query(object_info.table_info());

        Ok(self.enqueue_many(sql_query))
    }

    /// Register a deferred scalar fetch.
    pub fn include_scalar(&mut self, sql_query: &SqlQuery) -> Result<IncludeScalar> {
        self.open_connection()?;

        let include = IncludeScalar::new();
        let cell = include.cell();

        self.pending.push(PendingQuery {
            sql_query: sql_query.clone(),
            resolver: Box::new(move |rows| {
                let value = match rows.first() {
                    Some(row) if row.len() != 1 => return Err(Error::ScalarColumnMismatch),
                    Some(row) => row.get_index(0).cloned(),
                    None => None,
                };
                let _ = cell.set(value);
                Ok(())
            }),
        });

        Ok(include)
    }

    /// Execute every deferred read registered so far.
    ///
    /// With two or more pending queries and a batching driver, all of them
    /// combine into one command and one round trip; the result sets are
    /// demultiplexed back to their handles in registration order. Otherwise
    /// each query executes as its own command, in registration order.
    #[tracing::instrument(level = "debug", skip_all)]
    pub async fn execute_pending_queries(&mut self, cx: &Cx) -> Outcome<(), Error> {
        try_result!(self.open_connection());

        if self.pending.is_empty() {
            return Outcome::Ok(());
        }

        let pending = std::mem::take(&mut self.pending);

        tracing::debug!(
            queries = pending.len(),
            batched = self.driver.supports_batched_queries() && pending.len() > 1,
            "executing pending queries"
        );

        if self.driver.supports_batched_queries() && pending.len() > 1 {
            let combined = try_result!(
                self.driver
                    .combine_all(pending.iter().map(|p| &p.sql_query))
            );

            let row_sets = try_outcome!(self.query_batch_rows(cx, &combined).await);

            if row_sets.len() != pending.len() {
                return Outcome::Err(Error::execution_message(format!(
                    "{} pending queries were batched but the connection returned {} result sets",
                    pending.len(),
                    row_sets.len()
                )));
            }

            for (entry, rows) in pending.into_iter().zip(row_sets) {
                try_result!((entry.resolver)(rows));
            }
        } else {
            for entry in pending {
                let rows = try_outcome!(self.query_rows(cx, &entry.sql_query).await);
                try_result!((entry.resolver)(rows));
            }
        }

        Outcome::Ok(())
    }

    // ========================================================================
    // Writes
    // ========================================================================

    /// Insert an instance.
    ///
    /// Before-listeners run in registration order, then the insert executes
    /// per the identifier strategy. A database-generated identifier is
    /// converted to the identifier column's storage type and assigned to the
    /// instance before the after-listeners run in reverse registration order.
    #[tracing::instrument(level = "debug", skip_all)]
    pub async fn insert<M: Model>(&self, cx: &Cx, instance: &mut M) -> Outcome<(), Error> {
        try_result!(self.open_connection());

        for listener in self.listeners.insert_listeners() {
            try_result!(listener.before_insert(instance as &mut dyn Any));
        }

        let object_info = try_result!(object_info_of::<M>());
        try_result!(object_info.verify_instance_for_insert(instance));

        let table_info = object_info.table_info();
        let insert_query = try_result!(
            self.dialect
                .build_insert_sql_query(table_info, object_info.insert_values(instance))
        );

        let assigned = matches!(
            table_info.identifier_strategy(),
            IdentifierStrategy::Assigned
        );

        let scalar = if !assigned && self.dialect.supports_select_inserted_identifier() {
            let select_id_query =
                try_result!(self.dialect.build_select_insert_id_sql_query(table_info));

            if self.driver.supports_batched_queries() {
                let combined = try_result!(self.driver.combine(&insert_query, &select_id_query));
                try_outcome!(self.execute_scalar(cx, &combined).await)
            } else {
                try_outcome!(self.execute_sql_query(cx, &insert_query).await);
                try_outcome!(self.execute_scalar(cx, &select_id_query).await)
            }
        } else if !assigned {
            // The insert itself returns the identifier (RETURNING clause).
            try_outcome!(self.execute_scalar(cx, &insert_query).await)
        } else {
            try_outcome!(self.execute_sql_query(cx, &insert_query).await);
            None
        };

        let identifier = match scalar.filter(|value| !value.is_null()) {
            Some(value) => {
                let column = try_result!(table_info.identifier_column_or_error());
                let converted = try_result!(convert::to_sql_type(value, column.sql_type()));
                try_result!(instance.set_identifier_value(converted.clone()));

                tracing::debug!(table = table_info.name(), "assigned generated identifier");

                Some(converted)
            }
            None => None,
        };

        for listener in self.listeners.insert_listeners().iter().rev() {
            try_result!(listener.after_insert(instance as &mut dyn Any, identifier.as_ref()));
        }

        Outcome::Ok(())
    }

    /// Update an instance's row, returning whether exactly one row changed.
    #[tracing::instrument(level = "debug", skip_all)]
    pub async fn update<M: Model>(&self, cx: &Cx, instance: &mut M) -> Outcome<bool, Error> {
        try_result!(self.open_connection());

        for listener in self.listeners.update_listeners() {
            try_result!(listener.before_update(instance as &mut dyn Any));
        }

        let object_info = try_result!(object_info_of::<M>());

        if try_result!(object_info.has_default_identifier_value(instance)) {
            return Outcome::Err(Error::IdentifierNotSet {
                operation: "updated",
            });
        }

        let sql_query = try_result!(self.dialect.build_update_sql_query(
            object_info.table_info(),
            try_result!(object_info.update_values(instance)),
        ));

        let rows_affected = try_outcome!(self.execute_sql_query(cx, &sql_query).await);

        for listener in self.listeners.update_listeners().iter().rev() {
            try_result!(listener.after_update(instance as &mut dyn Any, rows_affected));
        }

        Outcome::Ok(rows_affected == 1)
    }

    /// Apply a partial update. Listeners do not fire for delta updates.
    pub async fn update_delta(&self, cx: &Cx, delta: &ObjectDelta) -> Outcome<bool, Error> {
        try_result!(self.open_connection());

        if delta.change_count() == 0 {
            return Outcome::Err(Error::NoChangesInDelta);
        }

        let sql_query = try_result!(self.dialect.build_update_sql_query_for_delta(delta));
        let rows_affected = try_outcome!(self.execute_sql_query(cx, &sql_query).await);

        Outcome::Ok(rows_affected == 1)
    }

    /// Delete an instance's row, returning whether exactly one row vanished.
    #[tracing::instrument(level = "debug", skip_all)]
    pub async fn delete<M: Model>(&self, cx: &Cx, instance: &mut M) -> Outcome<bool, Error> {
        try_result!(self.open_connection());

        for listener in self.listeners.delete_listeners() {
            try_result!(listener.before_delete(instance as &mut dyn Any));
        }

        let object_info = try_result!(object_info_of::<M>());
        let identifier = try_result!(object_info.identifier_value(instance));

        if identifier.is_default_identifier() {
            return Outcome::Err(Error::IdentifierNotSet {
                operation: "deleted",
            });
        }

        let sql_query = try_result!(
            self.dialect
                .build_delete_sql_query(object_info.table_info(), &identifier)
        );

        let rows_affected = try_outcome!(self.execute_sql_query(cx, &sql_query).await);

        for listener in self.listeners.delete_listeners().iter().rev() {
            try_result!(listener.after_delete(instance as &mut dyn Any, rows_affected));
        }

        Outcome::Ok(rows_affected == 1)
    }

    /// Delete the row of `M` with the given identifier. Listeners do not fire
    /// for deletes by identifier.
    pub async fn delete_by_id<M: Model>(
        &self,
        cx: &Cx,
        identifier: impl Into<Value> + Send,
    ) -> Outcome<bool, Error> {
        try_result!(self.open_connection());

        let object_info = try_result!(object_info_of::<M>());
        let sql_query = try_result!(
            self.dialect
                .build_delete_sql_query(object_info.table_info(), &identifier.into())
        );

        let rows_affected = try_outcome!(self.execute_sql_query(cx, &sql_query).await);

        Outcome::Ok(rows_affected == 1)
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn enqueue_single<M: Model>(&mut self, sql_query: SqlQuery) -> Include<M> {
        let include = Include::new();
        let cell = include.cell();

        self.pending.push(PendingQuery {
            sql_query,
            resolver: Box::new(move |rows| {
                if rows.len() > 1 {
                    return Err(Error::SingleRecordExpected);
                }

                let value = match rows.into_iter().next() {
                    Some(row) => Some(M::from_row(&row)?),
                    None => None,
                };
                let _ = cell.set(value);
                Ok(())
            }),
        });

        include
    }

    fn enqueue_many<M: Model>(&mut self, sql_query: SqlQuery) -> IncludeMany<M> {
        let include = IncludeMany::new();
        let cell: std::sync::Arc<OnceLock<Vec<M>>> = include.cell();

        self.pending.push(PendingQuery {
            sql_query,
            resolver: Box::new(move |rows| {
                let _ = cell.set(materialize::<M>(rows)?);
                Ok(())
            }),
        });

        include
    }

    async fn query_rows(&self, cx: &Cx, sql_query: &SqlQuery) -> Outcome<Vec<Row>, Error> {
        let connection = try_result!(self.open_connection());
        let command = try_result!(self.driver.build_command(sql_query));

        connection.query(cx, &command).await
    }

    async fn query_batch_rows(
        &self,
        cx: &Cx,
        sql_query: &SqlQuery,
    ) -> Outcome<Vec<Vec<Row>>, Error> {
        let connection = try_result!(self.open_connection());
        let command = try_result!(self.driver.build_command(sql_query));

        connection.query_batch(cx, &command).await
    }

    async fn execute_sql_query(&self, cx: &Cx, sql_query: &SqlQuery) -> Outcome<u64, Error> {
        let connection = try_result!(self.open_connection());
        let command = try_result!(self.driver.build_command(sql_query));

        connection.execute(cx, &command).await
    }
}

fn materialize<M: Model>(rows: Vec<Row>) -> Result<Vec<M>> {
    rows.iter().map(M::from_row).collect()
}

fn scalar_count(rows: &[Row]) -> Result<i64> {
    rows.first()
        .and_then(|row| row.get_index(0))
        .and_then(Value::as_i64)
        .ok_or_else(|| {
            Error::execution_message("the count query did not return a numeric scalar")
        })
}
