//! Ordered listener chains around insert, update and delete.
//!
//! Listeners are plain values in an ordered list, invoked by straightforward
//! iteration: before-hooks in registration order, after-hooks in reverse, so
//! the last-registered listener wraps the operation innermost. The list is
//! built once at configuration time and treated as immutable while an
//! operation runs.

use std::any::Any;
use std::sync::Arc;

use minorm_core::{Result, Value};

/// Hooks around a session insert.
///
/// The instance is passed type-erased; downcast to the concrete model type to
/// inspect or mutate it.
pub trait InsertListener: Send + Sync {
    /// Invoked before the insert query is built.
    fn before_insert(&self, instance: &mut dyn Any) -> Result<()> {
        let _ = instance;
        Ok(())
    }

    /// Invoked after the insert executed. `identifier` carries the generated
    /// identifier when one was produced, already converted to the mapped
    /// storage type and assigned to the instance.
    fn after_insert(&self, instance: &mut dyn Any, identifier: Option<&Value>) -> Result<()> {
        let _ = (instance, identifier);
        Ok(())
    }
}

/// Hooks around a session update.
pub trait UpdateListener: Send + Sync {
    /// Invoked before the update query is built.
    fn before_update(&self, instance: &mut dyn Any) -> Result<()> {
        let _ = instance;
        Ok(())
    }

    /// Invoked after the update executed with the affected row count.
    fn after_update(&self, instance: &mut dyn Any, rows_affected: u64) -> Result<()> {
        let _ = (instance, rows_affected);
        Ok(())
    }
}

/// Hooks around a session delete.
pub trait DeleteListener: Send + Sync {
    /// Invoked before the delete query is built.
    fn before_delete(&self, instance: &mut dyn Any) -> Result<()> {
        let _ = instance;
        Ok(())
    }

    /// Invoked after the delete executed with the affected row count.
    fn after_delete(&self, instance: &mut dyn Any, rows_affected: u64) -> Result<()> {
        let _ = (instance, rows_affected);
        Ok(())
    }
}

/// The ordered listener collections supplied to a session.
#[derive(Clone, Default)]
pub struct SessionListeners {
    insert_listeners: Vec<Arc<dyn InsertListener>>,
    update_listeners: Vec<Arc<dyn UpdateListener>>,
    delete_listeners: Vec<Arc<dyn DeleteListener>>,
}

impl SessionListeners {
    /// An empty listener collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an insert listener.
    #[must_use]
    pub fn with_insert_listener(mut self, listener: Arc<dyn InsertListener>) -> Self {
        self.insert_listeners.push(listener);
        self
    }

    /// Append an update listener.
    #[must_use]
    pub fn with_update_listener(mut self, listener: Arc<dyn UpdateListener>) -> Self {
        self.update_listeners.push(listener);
        self
    }

    /// Append a delete listener.
    #[must_use]
    pub fn with_delete_listener(mut self, listener: Arc<dyn DeleteListener>) -> Self {
        self.delete_listeners.push(listener);
        self
    }

    /// The insert listeners, in registration order.
    #[must_use]
    pub fn insert_listeners(&self) -> &[Arc<dyn InsertListener>] {
        &self.insert_listeners
    }

    /// The update listeners, in registration order.
    #[must_use]
    pub fn update_listeners(&self) -> &[Arc<dyn UpdateListener>] {
        &self.update_listeners
    }

    /// The delete listeners, in registration order.
    #[must_use]
    pub fn delete_listeners(&self) -> &[Arc<dyn DeleteListener>] {
        &self.delete_listeners
    }
}

impl std::fmt::Debug for SessionListeners {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionListeners")
            .field("insert_listeners", &self.insert_listeners.len())
            .field("update_listeners", &self.update_listeners.len())
            .field("delete_listeners", &self.delete_listeners.len())
            .finish()
    }
}
