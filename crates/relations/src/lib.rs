//! # elif-relations: has-many relationship collections for elif.rs
//!
//! A [`ManyArray`] is the live, ordered view over the "many" side of an
//! association. It is created empty and unloaded, filled by an
//! [`EntityRepository`] that reports member completion one by one, and it
//! forwards every positional mutation to the association's
//! [`RelationshipManager`], which owns the inverse references.
//!
//! ```rust
//! use std::any::Any;
//! use std::sync::Arc;
//!
//! use async_trait::async_trait;
//! use elif_relations::*;
//!
//! #[derive(Debug)]
//! struct Post { id: u64 }
//!
//! impl Record for Post {
//!     fn type_key(&self) -> &str { "post" }
//!     fn id(&self) -> String { self.id.to_string() }
//!     fn as_any(&self) -> &dyn Any { self }
//! }
//!
//! struct Store;
//!
//! #[async_trait]
//! impl EntityRepository for Store {
//!     async fn find_related(
//!         &self,
//!         _owner: RecordRef,
//!         _link: &str,
//!         _meta: &RelationshipMeta,
//!         array: ManyArray,
//!     ) -> RelationResult<()> {
//!         array.set_expected_count(0)
//!     }
//!
//!     async fn reload_record(&self, record: RecordRef) -> RelationResult<RecordRef> {
//!         Ok(record)
//!     }
//!
//!     fn create_record(&self, type_key: &str, _attributes: Attributes) -> RelationResult<RecordRef> {
//!         Err(RelationError::Repository(format!("no factory for {}", type_key)))
//!     }
//! }
//!
//! let post: RecordRef = Arc::new(Post { id: 1 });
//! let meta = RelationshipMeta::has_many("comments", "comment").with_inverse("post");
//! let manager = Arc::new(InverseRelationship::new(post.as_ref(), meta.clone(), Arc::new(InverseMap::new())));
//! let comments = ManyArray::new(&post, meta, manager, Arc::new(Store));
//!
//! comments.set_expected_count(0).unwrap();
//! assert!(comments.is_loaded());
//!
//! # tokio_test::block_on(async {
//! // Without a link on the owner every member is reloaded individually
//! let reloaded = comments.reload().await.unwrap();
//! assert!(reloaded.ptr_eq(&comments));
//! # });
//! ```

pub mod collection;
pub mod config;
pub mod deferred;
pub mod error;
pub mod events;
pub mod loading;
pub mod manager;
pub mod many_array;
pub mod metadata;
pub mod observers;
pub mod record;
pub mod repository;

// Re-export core types
pub use collection::*;
pub use config::*;
pub use deferred::*;
pub use error::*;
pub use events::*;
pub use loading::*;
pub use manager::*;
pub use many_array::*;
pub use metadata::*;
pub use observers::*;
pub use record::*;
pub use repository::*;
