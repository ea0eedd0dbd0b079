//! Relationship managers - bookkeeping behind one association edge
//!
//! A collection never writes inverse state itself; it reports every
//! structural change to its [`RelationshipManager`]. [`InverseRelationship`]
//! is the in-memory manager used when no persistence layer supplies one.

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;

use crate::error::{RelationError, RelationResult};
use crate::metadata::RelationshipMeta;
use crate::record::{Record, RecordKey, RecordRef};

/// Receives add/remove notifications for one association edge
pub trait RelationshipManager: Send + Sync {
    /// Records were inserted into the collection at `index`
    ///
    /// Must establish the inverse reference on each record and tolerate records
    /// that are already members, since a collection may hold a record at more
    /// than one position.
    fn add_records(&self, records: &[RecordRef], index: usize) -> RelationResult<()>;

    /// Records were taken out of the collection
    ///
    /// Must clear the inverse reference of each record that no longer occupies
    /// any position.
    fn remove_records(&self, records: &[RecordRef]) -> RelationResult<()>;
}

/// Inverse references shared by every edge of one association
///
/// Maps `(member, inverse name)` to the owner the member currently points at.
#[derive(Debug, Default)]
pub struct InverseMap {
    entries: DashMap<(RecordKey, String), RecordKey>,
}

impl InverseMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, member: &RecordKey, inverse: &str) -> Option<RecordKey> {
        self.entries
            .get(&(member.clone(), inverse.to_string()))
            .map(|owner| owner.value().clone())
    }

    /// Point `member` at `owner`, returning the owner it pointed at before
    pub fn set(&self, member: RecordKey, inverse: &str, owner: RecordKey) -> Option<RecordKey> {
        self.entries.insert((member, inverse.to_string()), owner)
    }

    /// Clear the inverse of `member` if it still points at `owner`
    pub fn clear_if(&self, member: &RecordKey, inverse: &str, owner: &RecordKey) -> bool {
        self.entries
            .remove_if(&(member.clone(), inverse.to_string()), |_, current| current == owner)
            .is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// In-memory manager for one owner's association
///
/// Keeps its own ordered member list, positioned by the indexes the collection
/// reports, and maintains the members' inverse references in an [`InverseMap`].
/// A record added at several positions is listed once and stays a member until
/// every occurrence has been removed.
#[derive(Debug)]
pub struct InverseRelationship {
    owner: RecordKey,
    meta: RelationshipMeta,
    inverse_name: String,
    members: RwLock<Vec<Member>>,
    inverses: Arc<InverseMap>,
}

#[derive(Debug)]
struct Member {
    key: RecordKey,
    occurrences: usize,
}

impl InverseRelationship {
    pub fn new(owner: &dyn Record, meta: RelationshipMeta, inverses: Arc<InverseMap>) -> Self {
        let inverse_name = meta
            .inverse
            .clone()
            .unwrap_or_else(|| owner.type_key().to_string());
        Self {
            owner: RecordKey::of(owner),
            meta,
            inverse_name,
            members: RwLock::new(Vec::new()),
            inverses,
        }
    }

    pub fn owner(&self) -> &RecordKey {
        &self.owner
    }

    pub fn meta(&self) -> &RelationshipMeta {
        &self.meta
    }

    /// Members in the order reported by the collection
    pub fn members(&self) -> Vec<RecordKey> {
        self.members.read().iter().map(|member| member.key.clone()).collect()
    }

    pub fn contains(&self, record: &dyn Record) -> bool {
        let key = RecordKey::of(record);
        self.members.read().iter().any(|member| member.key == key)
    }

    /// Number of positions `record` occupies in the collection
    pub fn occurrences(&self, record: &dyn Record) -> usize {
        let key = RecordKey::of(record);
        self.members
            .read()
            .iter()
            .find(|member| member.key == key)
            .map_or(0, |member| member.occurrences)
    }

    /// The owner `record` currently points back to through this association
    pub fn inverse_of(&self, record: &dyn Record) -> Option<RecordKey> {
        self.inverses.get(&RecordKey::of(record), &self.inverse_name)
    }

    fn check_type(&self, record: &dyn Record) -> RelationResult<()> {
        if self.meta.polymorphic || record.type_key() == self.meta.related_type {
            return Ok(());
        }
        Err(RelationError::TypeMismatch {
            expected: self.meta.related_type.clone(),
            actual: record.type_key().to_string(),
        })
    }
}

impl RelationshipManager for InverseRelationship {
    fn add_records(&self, records: &[RecordRef], index: usize) -> RelationResult<()> {
        for record in records {
            self.check_type(record.as_ref())?;
        }

        let mut members = self.members.write();
        let mut position = index.min(members.len());

        for record in records {
            let key = RecordKey::of(record.as_ref());
            if let Some(member) = members.iter_mut().find(|member| member.key == key) {
                member.occurrences += 1;
                tracing::debug!(
                    "{} already belongs to {}.{} ({} occurrences)",
                    key,
                    self.owner,
                    self.meta.name,
                    member.occurrences
                );
                continue;
            }

            members.insert(
                position,
                Member {
                    key: key.clone(),
                    occurrences: 1,
                },
            );
            position += 1;

            if let Some(previous) = self.inverses.set(key.clone(), &self.inverse_name, self.owner.clone()) {
                if previous != self.owner {
                    tracing::debug!(
                        "Moved inverse '{}' of {} from {} to {}",
                        self.inverse_name,
                        key,
                        previous,
                        self.owner
                    );
                }
            }
        }

        Ok(())
    }

    fn remove_records(&self, records: &[RecordRef]) -> RelationResult<()> {
        let mut members = self.members.write();

        for record in records {
            let key = RecordKey::of(record.as_ref());
            let position = match members.iter().position(|member| member.key == key) {
                Some(position) => position,
                None => continue,
            };

            members[position].occurrences -= 1;
            if members[position].occurrences == 0 {
                members.remove(position);
                self.inverses.clear_if(&key, &self.inverse_name, &self.owner);
            }
        }

        Ok(())
    }
}
