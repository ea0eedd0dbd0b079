//! Deferred results - labelled, shareable handles on in-flight operations

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::future::{BoxFuture, FutureExt, Shared, WeakShared};

use crate::error::{RelationError, RelationResult};

/// Handle on an asynchronous operation and its eventual value
///
/// Clones share the same underlying operation, so every holder observes the
/// same outcome. The operation only makes progress while some clone is polled.
pub struct Deferred<T> {
    label: Arc<str>,
    inner: Shared<BoxFuture<'static, RelationResult<T>>>,
}

impl<T> Deferred<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn from_future<F>(label: impl Into<String>, future: F) -> Self
    where
        F: Future<Output = RelationResult<T>> + Send + 'static,
    {
        let label: String = label.into();
        Self {
            label: label.into(),
            inner: future.boxed().shared(),
        }
    }

    /// An already settled, successful deferred
    pub fn resolved(label: impl Into<String>, value: T) -> Self {
        Self::from_future(label, futures::future::ready(Ok(value)))
    }

    /// An already settled, failed deferred
    pub fn rejected(label: impl Into<String>, error: RelationError) -> Self {
        Self::from_future(label, futures::future::ready(Err(error)))
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// The outcome, if the operation has already completed
    pub fn peek(&self) -> Option<&RelationResult<T>> {
        self.inner.peek()
    }

    pub fn is_settled(&self) -> bool {
        self.peek().is_some()
    }

    /// True when both handles share the same operation
    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.inner.ptr_eq(&other.inner)
    }

    /// Weak handle that does not keep the operation alive
    ///
    /// Returns `None` once this handle has already yielded its outcome.
    pub fn downgrade(&self) -> Option<WeakDeferred<T>> {
        self.inner.downgrade().map(|inner| WeakDeferred {
            label: self.label.clone(),
            inner,
        })
    }
}

/// Non-owning counterpart of [`Deferred`]
///
/// Once every [`Deferred`] clone is dropped the operation is dropped with
/// them, and [`WeakDeferred::upgrade`] returns `None`.
pub struct WeakDeferred<T> {
    label: Arc<str>,
    inner: WeakShared<BoxFuture<'static, RelationResult<T>>>,
}

impl<T> WeakDeferred<T> {
    pub fn upgrade(&self) -> Option<Deferred<T>> {
        self.inner.upgrade().map(|inner| Deferred {
            label: self.label.clone(),
            inner,
        })
    }
}

impl<T> Clone for WeakDeferred<T> {
    fn clone(&self) -> Self {
        Self {
            label: self.label.clone(),
            inner: self.inner.clone(),
        }
    }
}

impl<T> Clone for Deferred<T> {
    fn clone(&self) -> Self {
        Self {
            label: self.label.clone(),
            inner: self.inner.clone(),
        }
    }
}

impl<T> Future for Deferred<T>
where
    T: Clone,
{
    type Output = RelationResult<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.inner).poll(cx)
    }
}

impl<T> fmt::Debug for Deferred<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deferred")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}
