pub mod chat_db;
pub mod database;
pub mod media;
pub mod models;

pub use chat_db::ChatDatabase;
pub use media::MediaUploader;

use std::fs;
use std::path::Path;

/// Ensure the directory holding `file` exists
pub fn ensure_parent_dir(file: &Path) -> std::io::Result<()> {
    match file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent),
        _ => Ok(()),
    }
}
