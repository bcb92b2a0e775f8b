//! The process-wide mapping metadata registry.
//!
//! Metadata resolution runs once per type and the result is shared by every
//! session for the life of the process. The registry is read far more often
//! than it is written, so it keeps its whole map inside an `Arc` snapshot:
//! readers clone the snapshot handle and work lock-free against an immutable
//! map, while the rare writer installs a brand-new map in one swap
//! (copy-on-write, add-only — entries are never evicted or replaced).

use std::any::{TypeId, type_name};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock};

use crate::error::Result;
use crate::mapping::{Model, ObjectInfo};

type Snapshot = Arc<HashMap<TypeId, Arc<ObjectInfo>>>;

/// Cache of resolved [`ObjectInfo`] values keyed by type.
#[derive(Debug, Default)]
pub struct ObjectInfoRegistry {
    snapshot: RwLock<Snapshot>,
}

static GLOBAL: OnceLock<ObjectInfoRegistry> = OnceLock::new();

impl ObjectInfoRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry instance.
    #[must_use]
    pub fn global() -> &'static ObjectInfoRegistry {
        GLOBAL.get_or_init(ObjectInfoRegistry::new)
    }

    /// Resolve the object info for `M`, building and caching it on first use.
    ///
    /// Mapping errors are returned to the caller and are *not* cached: the
    /// type simply never enters the registry.
    pub fn of<M: Model>(&self) -> Result<Arc<ObjectInfo>> {
        let key = TypeId::of::<M>();

        let snapshot = self.read_snapshot();
        if let Some(info) = snapshot.get(&key) {
            tracing::debug!(model = type_name::<M>(), "retrieved object info");
            return Ok(Arc::clone(info));
        }

        tracing::debug!(model = type_name::<M>(), "creating object info");
        let info = Arc::new(ObjectInfo::new(M::table_info()?));

        let mut guard = self
            .snapshot
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        // Another thread may have resolved the type while we built ours.
        if let Some(existing) = guard.get(&key) {
            return Ok(Arc::clone(existing));
        }

        let mut next: HashMap<TypeId, Arc<ObjectInfo>> = HashMap::clone(&guard);
        next.insert(key, Arc::clone(&info));
        *guard = Arc::new(next);

        Ok(info)
    }

    /// The number of types resolved so far.
    #[must_use]
    pub fn resolved_count(&self) -> usize {
        self.read_snapshot().len()
    }

    fn read_snapshot(&self) -> Snapshot {
        Arc::clone(
            &self
                .snapshot
                .read()
                .unwrap_or_else(std::sync::PoisonError::into_inner),
        )
    }
}

/// Resolve the object info for `M` through the process-wide registry.
pub fn object_info_of<M: Model>() -> Result<Arc<ObjectInfo>> {
    ObjectInfoRegistry::global().of::<M>()
}
