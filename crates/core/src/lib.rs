//! Shopfloor Core - Shared types and service plumbing.
//!
//! This crate provides the pieces shared by both Shopfloor services:
//! - `catalog` - Product and category management
//! - `users` - Registration, login, profiles and addresses
//! - `cli` - Command-line tools for migrations and bootstrap
//!
//! # Architecture
//!
//! The default build contains only types and pure functions - no database
//! access, no HTTP. Two features opt into heavier pieces:
//!
//! - `postgres` - `sqlx` encode/decode implementations for the core types
//! - `server` - JWT issuing/verification, axum auth middleware, telemetry,
//!   Prometheus metrics and the health endpoints both services expose
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, email addresses, roles, slugs and SKUs
//! - [`api`] - JSON response envelope and pagination
//! - [`config`] - Environment variable helpers
//! - [`validation`] - Collecting validation messages and optional-field helpers
//! - `auth` - Claims, token keys and middleware (`server` feature)
//! - `server` - Telemetry, metrics, request IDs and health checks (`server` feature)

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod config;
pub mod types;
pub mod validation;

#[cfg(feature = "server")]
pub mod auth;
#[cfg(feature = "server")]
pub mod server;

pub use api::{ApiResponse, Page, PageMeta, Pagination, PaginationError};
pub use types::*;
