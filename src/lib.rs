//! Drag-and-drop ordering for posts and hierarchical pages.
//!
//! The core is the incremental renumbering protocol in
//! [`application::reorder`]: a client drives bounded batches against the
//! admin listener until every sibling group touched by a move has contiguous
//! ordinals again.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
pub mod presentation;
