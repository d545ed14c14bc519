//! Embedding providers.
//!
//! Every provider maps text to fixed-length vectors whose length equals
//! [`EmbeddingProvider::dimensions`]. Callers check that contract; a
//! provider that breaks it surfaces as a dimension mismatch.

pub mod provider;
pub mod providers;

pub use provider::{create_provider, EmbeddingProvider};
