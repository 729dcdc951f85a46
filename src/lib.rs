//! SPA edge router
//!
//! Serves a deployed single-page application from an asset store: static
//! assets are returned as stored, every other missing route falls back to
//! the application's root document so the client-side router can render it.

pub mod config;
pub mod handler;
pub mod http;
pub mod logger;
pub mod server;
pub mod store;
