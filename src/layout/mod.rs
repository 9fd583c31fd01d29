//! Live view bookkeeping for one layout.

mod lifecycle;
mod priority;

pub use lifecycle::{DestroyReason, LayoutDeps, LayoutEvent, ViewLifecycle};
pub use priority::{ViewRank, sort_by_priority};
