//! File access and upload policy. Pure functions, no I/O.

mod access;
mod upload;

pub use access::{authorize, decide, AccessDecision, FileAction, ReadScope};
pub use upload::{max_upload_bytes, validate_upload, UploadRejection};
