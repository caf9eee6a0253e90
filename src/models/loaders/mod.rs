pub mod source_loader;

pub use source_loader::{load_all_source_files, load_source_file, mime_type_for_path};
