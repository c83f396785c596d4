//! Model persistence
//!
//! Models are stored as versioned JSON envelopes so the artifact stays
//! inspectable and unknown versions are rejected instead of coerced.

mod serializer;
mod versioning;

pub use serializer::{load_model, save_model};
pub use versioning::{ModelVersion, FORMAT_MAGIC};
