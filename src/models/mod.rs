pub mod image;
pub mod loaders;
pub mod restoration;
pub mod source_file;

pub use image::DecodedImage;
pub use loaders::{load_all_source_files, load_source_file};
pub use restoration::{RestorationResult, RunState, RunSummary, WatermarkInfo};
pub use source_file::SourceFile;
