//! Voyage AI embedding backend.

mod backend;
mod types;

pub use backend::{VoyageBackend, VoyageConfig};
