//! Vitalis storefront library.
//!
//! The service behind the supplement storefront: pricing quotes, a
//! session-backed cart, subscription order placement, account sessions
//! against an identity provider, and admin CRUD over the backing tables.
//! Everything is exposed as a library so the binary, the CLI, and the
//! integration tests share one router and one set of adapters.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod identity;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod store;

pub use routes::app;
