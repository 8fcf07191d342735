//! Adapters that live inside the domain crate for convenience.
//!
//! The in-memory store backs unit tests and local demo runs. Real stores
//! (DynamoDB, SQLite) live in separate crates.

pub mod memory_repo;
