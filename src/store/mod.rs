//! Store module: the hierarchical key/value store the toolkit operates on.
//!
//! This module provides the store trait, an in-memory and a JSON-file
//! backend, the path/tree helpers every mutation goes through, and an editor
//! that records operations into a recording session.

mod backend;
mod editor;
mod file;
mod memory;
pub mod path;

pub use backend::{StoreResult, TreeStore};
pub use editor::TreeEditor;
pub use file::JsonFileStore;
pub use memory::MemoryStore;
