//! Tree store trait definition.
//!
//! This module defines the common interface for the hierarchical key/value
//! stores the toolkit reads from and writes to.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use crate::error::StoreError;

/// Result of a store operation.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Trait for hierarchical key/value store backends.
///
/// Paths are slash separated; `/` addresses the whole tree. A `null` node is
/// indistinguishable from an absent one.
#[async_trait]
pub trait TreeStore: Send + Sync {
    /// Reads the value at `path`.
    ///
    /// Returns `None` if nothing is stored there.
    async fn read(&self, path: &str) -> StoreResult<Option<Value>>;

    /// Writes `value` at `path`; `None` removes the node.
    async fn write(&self, path: &str, value: Option<Value>) -> StoreResult<()>;

    /// Gets the backend type name.
    fn backend_type(&self) -> &'static str;
}

#[async_trait]
impl TreeStore for Box<dyn TreeStore> {
    async fn read(&self, path: &str) -> StoreResult<Option<Value>> {
        (**self).read(path).await
    }

    async fn write(&self, path: &str, value: Option<Value>) -> StoreResult<()> {
        (**self).write(path, value).await
    }

    fn backend_type(&self) -> &'static str {
        (**self).backend_type()
    }
}

#[async_trait]
impl<S: TreeStore + ?Sized> TreeStore for Arc<S> {
    async fn read(&self, path: &str) -> StoreResult<Option<Value>> {
        (**self).read(path).await
    }

    async fn write(&self, path: &str, value: Option<Value>) -> StoreResult<()> {
        (**self).write(path, value).await
    }

    fn backend_type(&self) -> &'static str {
        (**self).backend_type()
    }
}
