//! Load tracking - expected/completed member counts for one load cycle

use serde::{Deserialize, Serialize};

use crate::error::{RelationError, RelationResult};

/// Observable loading state of a relationship collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoadState {
    /// No load cycle has started yet
    Unloaded,
    /// Members are still signalling completion
    Loading,
    /// Every expected member has loaded
    Loaded,
    /// A reload is in flight
    Reloading,
}

/// Paired expected/completed counters for member load completion
///
/// `loaded` is only ever set, never cleared: a new cycle keeps the collection
/// readable while the fresh members come in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadTracker {
    expected: Option<usize>,
    completed: usize,
    loaded: bool,
}

impl LoadTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a cycle expecting `count` completions
    ///
    /// Returns `true` when the collection became loaded immediately (`count == 0`).
    pub fn expect(&mut self, count: usize) -> RelationResult<bool> {
        if self.is_outstanding() {
            return Err(RelationError::LoadProtocol(format!(
                "expected count set to {} while {} of {} members are still loading",
                count,
                self.remaining(),
                self.expected.unwrap_or_default()
            )));
        }

        self.expected = Some(count);
        self.completed = 0;

        if count == 0 {
            self.loaded = true;
            return Ok(true);
        }
        Ok(false)
    }

    /// Record one member completion
    ///
    /// Returns `true` on the signal that completes the cycle.
    pub fn complete_one(&mut self) -> RelationResult<bool> {
        let expected = match self.expected {
            Some(expected) if self.completed < expected => expected,
            Some(expected) => {
                return Err(RelationError::LoadProtocol(format!(
                    "member loaded after all {} expected members completed",
                    expected
                )))
            }
            None => {
                return Err(RelationError::LoadProtocol(
                    "member loaded before an expected count was set".to_string(),
                ))
            }
        };

        self.completed += 1;
        if self.completed == expected {
            self.loaded = true;
            return Ok(true);
        }
        Ok(false)
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// True while a cycle has unfinished members
    pub fn is_outstanding(&self) -> bool {
        matches!(self.expected, Some(expected) if self.completed < expected)
    }

    pub fn remaining(&self) -> usize {
        self.expected
            .map(|expected| expected - self.completed)
            .unwrap_or_default()
    }

    pub fn expected(&self) -> Option<usize> {
        self.expected
    }

    pub fn completed(&self) -> usize {
        self.completed
    }

    pub fn state(&self) -> LoadState {
        if self.is_outstanding() {
            LoadState::Loading
        } else if self.loaded {
            LoadState::Loaded
        } else {
            LoadState::Unloaded
        }
    }
}
