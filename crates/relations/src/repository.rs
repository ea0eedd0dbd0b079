//! Entity repository boundary used by relationship collections

use async_trait::async_trait;

use crate::error::RelationResult;
use crate::many_array::ManyArray;
use crate::metadata::RelationshipMeta;
use crate::record::{Attributes, RecordRef};

/// Identity-mapped record store consulted by relationship collections
///
/// Errors returned here reach reload callers unchanged.
#[async_trait]
pub trait EntityRepository: Send + Sync {
    /// Fetch the members behind `link` and populate `array`
    ///
    /// Implementations drive the array's loading protocol
    /// (`set_expected_count` / `signal_member_loaded`) while populating it.
    /// Completion of the returned future settles the fetch.
    async fn find_related(
        &self,
        owner: RecordRef,
        link: &str,
        meta: &RelationshipMeta,
        array: ManyArray,
    ) -> RelationResult<()>;

    /// Refresh one record in place
    async fn reload_record(&self, record: RecordRef) -> RelationResult<RecordRef>;

    /// Create a new record of `type_key`
    fn create_record(&self, type_key: &str, attributes: Attributes) -> RelationResult<RecordRef>;
}
