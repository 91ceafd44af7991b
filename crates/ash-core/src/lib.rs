//! ashtray/crates/ash-core/src/lib.rs
//!
//! The central domain logic and interface definitions for Ashtray.

pub mod error;
pub mod models;
pub mod services;
pub mod traits;

// Re-exporting for easier access in other crates
pub use error::*;
pub use models::*;
pub use traits::*;
