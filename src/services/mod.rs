pub mod archive_packager;
pub mod artifact_writer;
pub mod download;
pub mod image_loader;
pub mod progress;
pub mod result_registry;

pub use archive_packager::ArchivePackager;
pub use artifact_writer::ArtifactWriter;
pub use download::{DownloadArtifact, DownloadRequest, DownloadService};
pub use image_loader::ImageLoader;
pub use progress::{LogReporter, ProgressEvent, ProgressReporter, ProgressTracker};
pub use result_registry::ResultRegistry;
