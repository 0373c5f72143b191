//! External-interface modules: the image archive collaborator and metadata
//! parsing

pub mod archive;
pub mod metadata;

pub use archive::{fetch_with_retry, ArchiveQuery, DateRange, ImageArchive, Region};
pub use metadata::MtlFile;
