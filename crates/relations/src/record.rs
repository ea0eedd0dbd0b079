//! Record abstraction shared by collections, managers and repositories

use std::any::Any;
use std::collections::HashMap;
use std::fmt::{self, Debug};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Attribute hash used when creating records through a collection
pub type Attributes = HashMap<String, serde_json::Value>;

/// Shared reference to a record held by the identity map
pub type RecordRef = Arc<dyn Record>;

/// A record managed by the entity repository
///
/// Records are handed around as [`RecordRef`]s; two references denote the same
/// record when they point at the same allocation (see [`same_record`]).
pub trait Record: Debug + Send + Sync + 'static {
    /// Type key of the concrete model, e.g. `"comment"`
    fn type_key(&self) -> &str;

    /// Identifier of the record (server id or client-generated id)
    fn id(&self) -> String;

    /// Remote locator for the members of `association`, if the payload carried one
    fn link(&self, _association: &str) -> Option<String> {
        None
    }

    /// Access to the concrete record for downcasting
    fn as_any(&self) -> &dyn Any;
}

/// Identity of a record across types
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordKey {
    pub type_key: String,
    pub id: String,
}

impl RecordKey {
    pub fn new(type_key: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            type_key: type_key.into(),
            id: id.into(),
        }
    }

    pub fn of(record: &dyn Record) -> Self {
        Self::new(record.type_key(), record.id())
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.type_key, self.id)
    }
}

/// True when both references point at the same record instance
pub fn same_record(a: &RecordRef, b: &RecordRef) -> bool {
    std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
}
