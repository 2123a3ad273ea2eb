//! PeopleChain document store.
//!
//! A collection-scoped JSON document store with REST CRUD semantics, the
//! persistence component the PeopleChain Monitor clients talk to under
//! `/api/db`.

pub mod config;
pub mod server;
