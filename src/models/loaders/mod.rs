pub mod course_loader;
pub mod toml_loader;

pub use course_loader::CourseCatalog;
pub use toml_loader::load_job_file;
