//! Hallgate: entity-level access control for the hall administration system.
//!
//! Decides whether an authenticated principal may act on a specific entity
//! instance (a worker, employer, trust benefit record, or dispatch job),
//! by evaluating registered policies composed of permission checks and
//! relationship ("linkage") predicates, with a bounded LRU/TTL decision
//! cache in front.
//!
//! See `DESIGN.md` for architecture notes.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod api;
pub mod cache;
pub mod config;
pub mod directory;
pub mod engine;
pub mod linkage;
pub mod logging;
pub mod policy;
pub mod types;
