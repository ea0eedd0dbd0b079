//! Relationship collection configuration types and builders

use serde::{Deserialize, Serialize};
use service_builder::builder;

/// How a collection answers `reload()` while a previous reload is still in flight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReloadPolicy {
    /// Hand out the in-flight reload instead of starting a new one
    Coalesce,
    /// Fail the new reload with `RelationError::ReloadInProgress`
    Reject,
    /// Every call runs its own full reload cycle
    Independent,
}

impl Default for ReloadPolicy {
    fn default() -> Self {
        Self::Coalesce
    }
}

/// Configuration for has-many relationship collections
#[derive(Debug, Clone, Serialize, Deserialize)]
#[builder]
pub struct ManyArrayConfig {
    /// Behavior of overlapping reloads
    #[builder(default = "ReloadPolicy::Coalesce", getter)]
    pub reload_policy: ReloadPolicy,

    /// Treat surplus load-completion signals as errors instead of warnings
    #[builder(default = "true", getter)]
    pub strict_load_protocol: bool,

    /// Prefix for the label attached to reload deferreds
    #[builder(default = "\"elif: async has-many reloading\".to_string()", getter)]
    pub label_prefix: String,
}

impl Default for ManyArrayConfig {
    fn default() -> Self {
        Self {
            reload_policy: ReloadPolicy::Coalesce,
            strict_load_protocol: true,
            label_prefix: "elif: async has-many reloading".to_string(),
        }
    }
}

impl ManyArrayConfigBuilder {
    /// Overlapping reloads are refused and protocol misuse is an error
    pub fn strict() -> Self {
        Self::new()
            .reload_policy(ReloadPolicy::Reject)
            .strict_load_protocol(true)
    }

    /// Every reload runs independently and surplus signals are only logged
    pub fn legacy() -> Self {
        Self::new()
            .reload_policy(ReloadPolicy::Independent)
            .strict_load_protocol(false)
    }
}
