//! # Trailhead API Server Library
//!
//! This library provides the HTTP layer of Trailhead, a tour booking
//! service: a REST API under `/api/v1` plus a handful of page routes.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `extract`: Request extractors (JSON bodies, current user)
//! - `factory`: Generic CRUD handlers shared by every resource
//! - `middleware`: Session gates, role checks, development error detail
//! - `routes`: API route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod extract;
pub mod factory;
pub mod middleware;
pub mod routes;
