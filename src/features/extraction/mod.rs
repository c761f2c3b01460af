//! Background metadata extraction: per-format extractors, the service that
//! runs one attempt, and the worker that drives the job queue.

pub mod error;
pub mod extractors;
pub mod retry;
pub mod services;
pub mod workers;

pub use error::ExtractionError;
pub use extractors::{DocConverter, LibreOfficeConverter};
pub use services::ExtractionService;
pub use workers::ExtractionWorker;
