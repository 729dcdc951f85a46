//! Request handler module
//!
//! Applies the SPA routing policy on top of an asset store.

pub mod router;

// Re-export main entry point
pub use router::{EdgeRouter, RouteOutcome, Routed, RouterError};
