pub mod image_loader;
pub mod toml_loader;

pub use image_loader::{load_images_in_dir, scan_student_dirs, StudentSubmission};
pub use toml_loader::{load_master_key, save_master_key, MasterKeyFile};
