//! Mapping metadata: how a type maps to a table.
//!
//! Discovery (attributes, conventions, reflection) is out of scope for this
//! workspace — the types here are the *finished* metadata a mapping layer
//! produces. [`Model`] is the contract a mapped type fulfils, [`TableInfo`]
//! and [`ColumnInfo`] describe the table shape, [`ObjectInfo`] derives value
//! sets from an instance, and the registry caches resolved metadata
//! process-wide.

mod column_info;
mod delta;
mod object_info;
mod registry;
mod table_info;

pub use column_info::ColumnInfo;
pub use delta::ObjectDelta;
pub use object_info::{Model, ObjectInfo};
pub use registry::{ObjectInfoRegistry, object_info_of};
pub use table_info::{IdentifierStrategy, TableInfo};
