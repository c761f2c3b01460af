mod file;
mod file_metadata;

pub use file::{CreateFile, File, Visibility};
pub use file_metadata::FileMetadata;
