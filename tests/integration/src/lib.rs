//! Integration test utilities for the leveling engine
//!
//! This crate provides recording collaborators and a wired-up test world
//! for end-to-end scenarios over the in-memory or PostgreSQL store.

pub mod fixtures;
pub mod helpers;

pub use fixtures::*;
pub use helpers::*;
