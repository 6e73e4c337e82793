//! Casework - case management API for community services organizations
//!
//! A GraphQL API over organizations, case workers, contacts, engagements,
//! services and service answers. Every read and write is scoped to the
//! organizations the caller holds a role in.
//!
//! ## Layers
//!
//! - **db**: documents, collection accessors, MongoDB and in-memory stores
//! - **refs**: stored-reference resolution with per-relationship policy
//! - **interactors**: one handler per operation, applying org scoping
//! - **graphql**: schema roots binding each field to its interactor
//! - **publisher**: per-organization and per-user subscription channels
//! - **server**: hyper HTTP server, GraphQL over HTTP and WebSocket

pub mod auth;
pub mod config;
pub mod context;
pub mod db;
pub mod dto;
pub mod graphql;
pub mod interactors;
pub mod publisher;
pub mod refs;
pub mod routes;
pub mod server;
pub mod types;

pub use config::Args;
pub use server::{run, AppState};
pub use types::{CaseworkError, Result};
