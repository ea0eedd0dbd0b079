//! ManyArray - the live, lazily-loaded collection behind a has-many association
//!
//! A `ManyArray` embeds an [`OrderedCollection`] of member records and routes
//! every positional mutation through [`ManyArray::replace_content`], which
//! reports the structural change to the association's
//! [`RelationshipManager`] before the splice is applied. Loading is tracked
//! member by member, and reloads either go through the owner's link or
//! refresh each current member individually.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use futures::future::{BoxFuture, FutureExt};
use futures::stream::{FuturesUnordered, TryStreamExt};
use parking_lot::{Mutex, RwLock};
use tokio::sync::watch;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::collection::OrderedCollection;
use crate::config::{ManyArrayConfig, ReloadPolicy};
use crate::deferred::{Deferred, WeakDeferred};
use crate::error::{RelationError, RelationResult};
use crate::events::{ManyArrayEvent, ManyArrayObserver};
use crate::loading::{LoadState, LoadTracker};
use crate::manager::RelationshipManager;
use crate::metadata::RelationshipMeta;
use crate::observers::{dispatch, ObserverRegistry};
use crate::record::{same_record, Attributes, Record, RecordKey, RecordRef};
use crate::repository::EntityRepository;

/// Handle on the collection of records behind one owner's has-many association
///
/// Clones are cheap and refer to the same collection; use [`ManyArray::ptr_eq`]
/// to compare identity.
#[derive(Clone)]
pub struct ManyArray {
    inner: Arc<ManyArrayInner>,
}

struct ManyArrayInner {
    owner: Weak<dyn Record>,
    owner_key: RecordKey,
    meta: RelationshipMeta,
    manager: Arc<dyn RelationshipManager>,
    repository: Arc<dyn EntityRepository>,
    config: ManyArrayConfig,
    state: Mutex<ManyArrayState>,
    observers: RwLock<ObserverRegistry>,
    loaded: watch::Sender<bool>,
    reloads: Mutex<ReloadState>,
    in_flight: Arc<AtomicUsize>,
}

#[derive(Default)]
struct ManyArrayState {
    content: OrderedCollection<RecordRef>,
    load: LoadTracker,
}

#[derive(Default)]
struct ReloadState {
    generation: u64,
    pending: Option<(u64, WeakDeferred<ManyArray>)>,
}

impl ReloadState {
    /// The registered reload, unless every handle on it has been dropped
    fn in_flight(&self) -> Option<Deferred<ManyArray>> {
        self.pending.as_ref().and_then(|(_, pending)| pending.upgrade())
    }
}

/// Counts one reload as in flight until its operation completes or is dropped
struct InFlight(Arc<AtomicUsize>);

impl InFlight {
    fn enter(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter.clone())
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl ManyArray {
    /// Create an empty, unloaded collection for `meta.name` on `owner`
    pub fn new(
        owner: &RecordRef,
        meta: RelationshipMeta,
        manager: Arc<dyn RelationshipManager>,
        repository: Arc<dyn EntityRepository>,
    ) -> Self {
        Self::with_config(owner, meta, manager, repository, ManyArrayConfig::default())
    }

    pub fn with_config(
        owner: &RecordRef,
        meta: RelationshipMeta,
        manager: Arc<dyn RelationshipManager>,
        repository: Arc<dyn EntityRepository>,
        config: ManyArrayConfig,
    ) -> Self {
        let (loaded, _) = watch::channel(false);
        Self {
            inner: Arc::new(ManyArrayInner {
                owner: Arc::downgrade(owner),
                owner_key: RecordKey::of(owner.as_ref()),
                meta,
                manager,
                repository,
                config,
                state: Mutex::new(ManyArrayState::default()),
                observers: RwLock::new(ObserverRegistry::new()),
                loaded,
                reloads: Mutex::new(ReloadState::default()),
                in_flight: Arc::new(AtomicUsize::new(0)),
            }),
        }
    }

    // ---- Accessors ----

    /// Name of the association on the owner
    pub fn name(&self) -> &str {
        &self.inner.meta.name
    }

    pub fn meta(&self) -> &RelationshipMeta {
        &self.inner.meta
    }

    pub fn config(&self) -> &ManyArrayConfig {
        &self.inner.config
    }

    /// The owning record, unless it has been dropped
    pub fn owner(&self) -> Option<RecordRef> {
        self.inner.owner.upgrade()
    }

    pub fn owner_key(&self) -> &RecordKey {
        &self.inner.owner_key
    }

    pub fn is_polymorphic(&self) -> bool {
        self.inner.meta.polymorphic
    }

    pub fn is_loaded(&self) -> bool {
        self.inner.state.lock().load.is_loaded()
    }

    pub fn load_state(&self) -> LoadState {
        if self.inner.in_flight.load(Ordering::SeqCst) > 0 {
            return LoadState::Reloading;
        }
        self.inner.state.lock().load.state()
    }

    /// Members still expected to signal completion in the current cycle
    pub fn loading_records_count(&self) -> usize {
        self.inner.state.lock().load.remaining()
    }

    pub fn len(&self) -> usize {
        self.inner.state.lock().content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.state.lock().content.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<RecordRef> {
        self.inner.state.lock().content.get(index).cloned()
    }

    /// Snapshot of the current members, in association order
    pub fn records(&self) -> Vec<RecordRef> {
        self.inner.state.lock().content.to_vec()
    }

    pub fn index_of(&self, record: &RecordRef) -> Option<usize> {
        let state = self.inner.state.lock();
        state.content.iter().position(|member| same_record(member, record))
    }

    pub fn contains(&self, record: &RecordRef) -> bool {
        self.index_of(record).is_some()
    }

    /// True when both handles refer to the same collection
    pub fn ptr_eq(&self, other: &ManyArray) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    // ---- Observation ----

    pub fn observe(&self, observer: Arc<dyn ManyArrayObserver>) {
        self.inner.observers.write().register(observer);
    }

    pub fn unobserve(&self, observer: &Arc<dyn ManyArrayObserver>) -> bool {
        self.inner.observers.write().unregister(observer)
    }

    /// Resolves once every expected member has loaded
    pub async fn until_loaded(&self) {
        let mut loaded = self.inner.loaded.subscribe();
        // The sender lives as long as `self`, so waiting cannot fail.
        let _ = loaded.wait_for(|loaded| *loaded).await;
    }

    fn notify(&self, event: ManyArrayEvent) {
        let observers = self.inner.observers.read().snapshot();
        dispatch(&observers, self.name(), &event);
    }

    // ---- Loading protocol ----

    /// Record how many members must signal completion before the collection is loaded
    pub fn set_expected_count(&self, count: usize) -> RelationResult<()> {
        let loaded = {
            let mut state = self.inner.state.lock();
            self.tolerate(state.load.expect(count))?
        };

        tracing::debug!(
            "{}.{} expects {} member(s) to load",
            self.inner.owner_key,
            self.name(),
            count
        );

        if loaded {
            self.finish_load();
        }
        Ok(())
    }

    /// One member finished loading
    pub fn signal_member_loaded(&self) -> RelationResult<()> {
        let loaded = {
            let mut state = self.inner.state.lock();
            self.tolerate(state.load.complete_one())?
        };

        if loaded {
            self.finish_load();
        }
        Ok(())
    }

    fn tolerate(&self, result: RelationResult<bool>) -> RelationResult<bool> {
        match result {
            Err(RelationError::LoadProtocol(message)) if !*self.inner.config.get_strict_load_protocol() => {
                tracing::warn!(
                    "Ignoring load protocol violation on {}.{}: {}",
                    self.inner.owner_key,
                    self.name(),
                    message
                );
                Ok(false)
            }
            other => other,
        }
    }

    fn finish_load(&self) {
        self.inner.loaded.send_replace(true);
        tracing::debug!("{}.{} loaded", self.inner.owner_key, self.name());
        self.notify(ManyArrayEvent::DidLoad);
    }

    // ---- Mutation ----

    /// Report the replacement of `remove` members at `index` by `inserted`
    ///
    /// Removals are forwarded before insertions; the content itself is left
    /// untouched. Out-of-range positions are rejected before any notification.
    pub fn replace_content(
        &self,
        index: usize,
        remove: usize,
        inserted: &[RecordRef],
    ) -> RelationResult<()> {
        let state = self.inner.state.lock();
        forward_replace(self.inner.manager.as_ref(), &state.content, index, remove, inserted)
    }

    /// Replace `remove` members at `index` with `inserted`, returning the removed members
    pub fn replace(
        &self,
        index: usize,
        remove: usize,
        inserted: Vec<RecordRef>,
    ) -> RelationResult<Vec<RecordRef>> {
        self.splice_with(|_| Some((index, remove)), inserted)
    }

    /// Append a record to the end of the collection
    pub fn push(&self, record: RecordRef) -> RelationResult<()> {
        self.push_records(vec![record])
    }

    pub fn push_records(&self, records: Vec<RecordRef>) -> RelationResult<()> {
        self.splice_with(|content| Some((content.len(), 0)), records)
            .map(|_| ())
    }

    pub fn insert_at(&self, index: usize, record: RecordRef) -> RelationResult<()> {
        self.replace(index, 0, vec![record]).map(|_| ())
    }

    pub fn remove_at(&self, index: usize) -> RelationResult<RecordRef> {
        let mut removed = self.replace(index, 1, Vec::new())?;
        // A successful one-element splice always yields exactly one record.
        removed.pop().ok_or_else(|| RelationError::OutOfBounds {
            index,
            remove: 1,
            len: self.len(),
        })
    }

    /// Remove `record` if it is a member, returning whether it was
    pub fn remove_record(&self, record: &RecordRef) -> RelationResult<bool> {
        let removed = self.splice_with(
            |content| {
                content
                    .iter()
                    .position(|member| same_record(member, record))
                    .map(|index| (index, 1))
            },
            Vec::new(),
        )?;
        Ok(!removed.is_empty())
    }

    /// Remove every member
    pub fn clear(&self) -> RelationResult<Vec<RecordRef>> {
        self.splice_with(|content| Some((0, content.len())), Vec::new())
    }

    /// Replace the whole content with `records`
    pub fn set_records(&self, records: Vec<RecordRef>) -> RelationResult<Vec<RecordRef>> {
        self.splice_with(|content| Some((0, content.len())), records)
    }

    /// Locate the splice under the content lock, forward it, then apply it
    fn splice_with<F>(&self, locate: F, inserted: Vec<RecordRef>) -> RelationResult<Vec<RecordRef>>
    where
        F: FnOnce(&OrderedCollection<RecordRef>) -> Option<(usize, usize)>,
    {
        let (change, removed) = {
            let mut state = self.inner.state.lock();
            let (index, remove) = match locate(&state.content) {
                Some(position) => position,
                None => return Ok(Vec::new()),
            };
            if remove == 0 && inserted.is_empty() {
                return Ok(Vec::new());
            }

            forward_replace(
                self.inner.manager.as_ref(),
                &state.content,
                index,
                remove,
                &inserted,
            )?;
            state.content.splice(index, remove, inserted)?
        };

        self.notify(ManyArrayEvent::DidChange(change));
        Ok(removed)
    }

    // ---- Creation ----

    /// Create a record of the association's type and append it
    ///
    /// Polymorphic associations cannot infer the type to create and fail
    /// before the repository is consulted.
    pub fn create_record(&self, attributes: Attributes) -> RelationResult<RecordRef> {
        let meta = &self.inner.meta;
        if meta.polymorphic {
            tracing::error!(
                "Refusing to create '{}' records through polymorphic relationship {}.{}",
                meta.related_type,
                self.inner.owner_key,
                meta.name
            );
            return Err(RelationError::PolymorphicCreate {
                association: meta.name.clone(),
                related_type: meta.related_type.clone(),
            });
        }

        let record = self
            .inner
            .repository
            .create_record(&meta.related_type, attributes)?;
        self.push(record.clone())?;
        Ok(record)
    }

    // ---- Reloading ----

    /// The reload currently in flight, if any
    pub fn pending_reload(&self) -> Option<Deferred<ManyArray>> {
        self.inner.reloads.lock().in_flight()
    }

    /// Reload the association, resolving to this same collection
    ///
    /// With a link on the owner the repository refetches the members through
    /// it; otherwise every current member is reloaded concurrently and the
    /// first failure rejects the reload. Overlapping calls follow the
    /// configured [`ReloadPolicy`].
    ///
    /// Called from within a Tokio runtime the reload is driven by a spawned
    /// task and makes progress whether or not the returned handle is awaited.
    pub fn reload(&self) -> Deferred<ManyArray> {
        let name = self.name().to_string();
        let label = format!(
            "{} {} : {}",
            self.inner.config.get_label_prefix(),
            self.inner.owner_key,
            name
        );

        let mut reloads = self.inner.reloads.lock();
        if let Some(pending) = reloads.in_flight() {
            match *self.inner.config.get_reload_policy() {
                ReloadPolicy::Coalesce => {
                    tracing::debug!("Joining in-flight reload of {}.{}", self.inner.owner_key, name);
                    return pending;
                }
                ReloadPolicy::Reject => {
                    tracing::warn!("Rejecting overlapping reload of {}.{}", self.inner.owner_key, name);
                    return Deferred::rejected(label, RelationError::ReloadInProgress(name));
                }
                ReloadPolicy::Independent => {}
            }
        }

        let owner = match self.inner.owner.upgrade() {
            Some(owner) => owner,
            None => return Deferred::rejected(label, RelationError::OwnerReleased(name)),
        };

        let operation = match owner.link(&name) {
            Some(link) => {
                tracing::debug!("Reloading {}.{} from link {}", self.inner.owner_key, name, link);
                self.reload_from_link(link)
            }
            None => {
                tracing::debug!("Reloading {}.{} member by member", self.inner.owner_key, name);
                self.reload_members()
            }
        };

        reloads.generation += 1;
        let generation = reloads.generation;
        let in_flight = InFlight::enter(&self.inner.in_flight);
        let inner = Arc::downgrade(&self.inner);

        let deferred = Deferred::from_future(label, async move {
            let result = operation.await;
            let array = ManyArray {
                inner: inner.upgrade().ok_or_else(|| RelationError::Released(name))?,
            };
            array.finish_reload(generation, &result);
            drop(in_flight);
            result.map(|()| array)
        });

        // Only a weak handle is kept, so an abandoned reload releases its state.
        reloads.pending = deferred.downgrade().map(|pending| (generation, pending));
        drop(reloads);

        // Inside a runtime the reload starts right away; otherwise on first poll.
        if let Ok(runtime) = Handle::try_current() {
            let driver = deferred.clone();
            runtime.spawn(async move {
                let _ = driver.await;
            });
        }

        deferred
    }

    fn reload_from_link(&self, link: String) -> BoxFuture<'static, RelationResult<()>> {
        let owner = self.inner.owner.clone();
        let inner = Arc::downgrade(&self.inner);
        let repository = self.inner.repository.clone();
        let meta = self.inner.meta.clone();

        async move {
            let owner = owner
                .upgrade()
                .ok_or_else(|| RelationError::OwnerReleased(meta.name.clone()))?;
            let array = ManyArray {
                inner: inner
                    .upgrade()
                    .ok_or_else(|| RelationError::Released(meta.name.clone()))?,
            };
            repository.find_related(owner, &link, &meta, array).await
        }
        .boxed()
    }

    fn reload_members(&self) -> BoxFuture<'static, RelationResult<()>> {
        let records = self.records();
        let repository = self.inner.repository.clone();

        async move {
            // Without a Tokio runtime the member reloads are polled in place.
            let runtime = Handle::try_current().ok();
            let mut reloads: FuturesUnordered<_> = records
                .into_iter()
                .map(|record| {
                    let repository = repository.clone();
                    let reload = async move { repository.reload_record(record).await }.boxed();
                    match &runtime {
                        Some(runtime) => join_member(runtime.spawn(reload)).boxed(),
                        None => reload,
                    }
                })
                .collect();

            // Returning early drops the remaining handles, which detaches their tasks.
            while reloads.try_next().await?.is_some() {}
            Ok(())
        }
        .boxed()
    }

    fn finish_reload(&self, generation: u64, result: &RelationResult<()>) {
        {
            let mut reloads = self.inner.reloads.lock();
            if matches!(&reloads.pending, Some((pending, _)) if *pending == generation) {
                reloads.pending = None;
            }
        }

        match result {
            Ok(()) => tracing::debug!("Reloaded {}.{}", self.inner.owner_key, self.name()),
            Err(error) => tracing::warn!(
                "Failed to reload {}.{}: {}",
                self.inner.owner_key,
                self.name(),
                error
            ),
        }
    }
}

async fn join_member(handle: JoinHandle<RelationResult<RecordRef>>) -> RelationResult<RecordRef> {
    handle.await?
}

/// Tell `manager` about a replacement, removals strictly before insertions
fn forward_replace(
    manager: &dyn RelationshipManager,
    content: &OrderedCollection<RecordRef>,
    index: usize,
    remove: usize,
    inserted: &[RecordRef],
) -> RelationResult<()> {
    let removed = content.slice(index, remove)?;
    if !removed.is_empty() {
        manager.remove_records(removed)?;
    }
    if !inserted.is_empty() {
        manager.add_records(inserted, index)?;
    }
    Ok(())
}

impl fmt::Debug for ManyArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("ManyArray")
            .field("owner", &self.inner.owner_key)
            .field("name", &self.inner.meta.name)
            .field("len", &state.content.len())
            .field("load_state", &state.load.state())
            .finish()
    }
}
