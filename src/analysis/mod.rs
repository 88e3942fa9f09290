//! Analysis and result aggregation modules
//!
//! Combines all stage outputs into the final analysis:
//! - Result types
//! - Fallback loop policy
//! - Confidence scoring
//! - Metadata

pub mod confidence;
pub mod fallback;
pub mod metadata;
pub mod result;
