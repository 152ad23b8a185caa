//! HTML views for the admin surface.

pub mod admin;
pub mod views;
