//! Database layer for casework
//!
//! Every read and write goes through a typed [`Collection`] accessor backed
//! either by MongoDB or by an in-memory map with the same filter semantics.

pub mod collection;
pub mod collections;
pub mod filter;
pub mod finders;
pub mod memory;
pub mod mongo;
pub mod schemas;
pub mod store;
pub mod update;

pub use collection::{parse_id, Collection};
pub use collections::Collections;
pub use filter::{Filter, Page, Pagination, Predicate, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
pub use memory::MemoryStore;
pub use mongo::{MongoClient, MongoCollection};
pub use store::{DocumentStore, Entity};
pub use update::Update;
