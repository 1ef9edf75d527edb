//! Shared foundational types for the loom node substrate.
//!
//! This crate provides interned identifiers, content hashing for persisted
//! units, and the source locations carried by every node.

#![warn(missing_docs)]

pub mod hash;
pub mod ident;
pub mod loc;

pub use hash::ContentHash;
pub use ident::{Ident, Interner};
pub use loc::Loc;
