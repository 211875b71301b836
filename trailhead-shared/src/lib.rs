//! # Trailhead Shared Library
//!
//! Domain types, persistence and authentication primitives used by the
//! Trailhead API server.
//!
//! ## Module Organization
//!
//! - `auth`: Token signing, password hashing, reset tokens and roles
//! - `db`: Postgres pool and migrations
//! - `models`: Tours, reviews, users and bookings with their validation rules
//! - `query`: The query-modifier chain used by list endpoints
//! - `store`: Per-entity repository traits with Postgres and in-memory backends
//! - `services`: External collaborators (mail, payments)

pub mod auth;
pub mod db;
pub mod models;
pub mod query;
pub mod services;
pub mod store;

/// Current version of the Trailhead shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
