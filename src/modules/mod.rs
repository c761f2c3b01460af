//! Modules layer - Infrastructure adapters
//!
//! Blob storage and the extraction job queue.

pub mod queue;
pub mod storage;
