pub mod extraction_worker;

pub use extraction_worker::ExtractionWorker;
