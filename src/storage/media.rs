use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::error::{CompanionError, Result};

use super::chat_db::ChatDatabase;
use super::models::MediaItem;

/// Copies user files into the uploads directory and records them in the library.
pub struct MediaUploader {
    uploads_dir: PathBuf,
}

impl MediaUploader {
    pub fn new(uploads_dir: impl Into<PathBuf>) -> Self {
        Self {
            uploads_dir: uploads_dir.into(),
        }
    }

    pub fn upload(
        &self,
        db: &ChatDatabase,
        session_id: Option<&str>,
        source: &Path,
    ) -> Result<MediaItem> {
        let file_name = source
            .file_name()
            .and_then(|name| name.to_str())
            .filter(|name| !name.is_empty())
            .ok_or_else(|| {
                CompanionError::Validation(format!("not a file: {}", source.display()))
            })?;
        if !source.is_file() {
            return Err(CompanionError::Validation(format!(
                "not a file: {}",
                source.display()
            )));
        }

        let file_type = guess_mime(source);
        let folder = if file_type.starts_with("image/") {
            "images"
        } else {
            "files"
        };
        let target_dir = self.uploads_dir.join(folder);
        fs::create_dir_all(&target_dir)?;

        let target = target_dir.join(format!("{}_{}", Utc::now().timestamp_millis(), file_name));
        fs::copy(source, &target)?;
        let target = fs::canonicalize(&target).unwrap_or(target);
        let file_url = format!("file://{}", target.display());

        let item = db.insert_media(session_id, file_name, &file_url, file_type)?;
        log::info!("Uploaded {} to {}", file_name, target.display());
        Ok(item)
    }
}

fn guess_mime(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "svg" => "image/svg+xml",
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        "md" => "text/markdown",
        "json" => "application/json",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "webm" => "audio/webm",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn images_and_files_land_in_separate_folders() {
        let source_dir = tempfile::tempdir().unwrap();
        let uploads = tempfile::tempdir().unwrap();
        let photo = source_dir.path().join("Sunset.PNG");
        let notes = source_dir.path().join("journal.txt");
        fs::write(&photo, b"\x89PNG").unwrap();
        fs::write(&notes, "dear diary").unwrap();

        let db = ChatDatabase::in_memory().unwrap();
        let uploader = MediaUploader::new(uploads.path());

        let image = uploader.upload(&db, None, &photo).unwrap();
        assert_eq!(image.file_type, "image/png");
        assert!(image.file_url.starts_with("file://"));
        assert!(image.file_url.contains("images"));

        let file = uploader.upload(&db, None, &notes).unwrap();
        assert_eq!(file.file_type, "text/plain");
        let copied = fs::read_dir(uploads.path().join("files")).unwrap().count();
        assert_eq!(copied, 1);

        assert_eq!(db.media_library().unwrap().len(), 2);
    }

    #[test]
    fn missing_source_is_rejected() {
        let uploads = tempfile::tempdir().unwrap();
        let db = ChatDatabase::in_memory().unwrap();
        let uploader = MediaUploader::new(uploads.path());

        let err = uploader
            .upload(&db, None, &uploads.path().join("nope.png"))
            .unwrap_err();
        assert!(matches!(err, CompanionError::Validation(_)));
        assert!(db.media_library().unwrap().is_empty());
    }
}
