//! # list-store
//!
//! Observable state for the application's list of lists.
//!
//! ## Store (generic primitive)
//!
//! - `Store<T>` - Value container that calls subscribers synchronously on every change
//! - `Derived<T>` - Read-only store computed from another store
//! - `Subscription` - RAII handle; dropping it unsubscribes
//! - `Readable` / `Writable` - Traits for code that only needs one side
//!
//! ## Lists
//!
//! - `List` - An id/name record
//! - `ListStore` - `Store<Vec<List>>`, created with three seed records by `new_list_store`

pub mod lists;
pub mod store;

// Re-export main types for convenience
pub use lists::{new_list_store, seed, List, ListStore};
pub use store::{Derived, Readable, Store, Subscription, Writable};
