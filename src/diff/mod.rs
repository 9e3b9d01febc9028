//! Diff module for comparing tree snapshots.
//!
//! This module computes structural differences between two trees and lets a
//! reviewer select which changes are written back to the store.

mod engine;
mod review;

pub use engine::{DiffChange, DiffEngine, DiffKind, ROOT_LABEL};
pub use review::{parse_user_value, ApplyReport, DiffReview};
