//! Application services: the renumbering protocol and the admin surfaces
//! built around it.

pub mod access;
pub mod error;
pub mod listing;
pub mod nonce;
pub mod public_listing;
pub mod registry;
pub mod reorder;
pub mod repos;
pub mod settings;
