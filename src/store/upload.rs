//! File-picker upload path
//!
//! Produces an [`ImageArtifact`] from a user-selected file. Only image files
//! are accepted, and files above the configured size limit are rejected.

use std::fs;
use std::path::Path;

use log::{debug, info};

use super::artifact::{ArtifactOrigin, ArtifactView, ImageArtifact};
use super::image_store::SharedImageStore;
use crate::core::config::UploadConfig;
use crate::core::error::UploadError;

/// Guess content type from file extension
fn guess_content_type(name: &str) -> Option<&'static str> {
    let extension = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())?;

    match extension.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "heic" | "heif" => Some("image/heic"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "bmp" => Some("image/bmp"),
        "tif" | "tiff" => Some("image/tiff"),
        "mov" => Some("video/quicktime"),
        "mp4" | "m4v" => Some("video/mp4"),
        "txt" => Some("text/plain"),
        "pdf" => Some("application/pdf"),
        _ => None,
    }
}

impl ImageArtifact {
    /// Build an upload artifact from a file on disk
    pub fn from_file<P: AsRef<Path>>(path: P, config: &UploadConfig) -> Result<Self, UploadError> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| UploadError::NoFileName(path.to_path_buf()))?
            .to_string();

        let io_error = |e: std::io::Error| UploadError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        };

        let size = fs::metadata(path).map_err(io_error)?.len();
        if config.max_file_size > 0 && size > config.max_file_size {
            return Err(UploadError::TooLarge {
                name,
                size,
                max: config.max_file_size,
            });
        }

        let declared = guess_content_type(&name);
        if let Some(mime) = declared {
            if !mime.starts_with("image/") {
                return Err(UploadError::NotAnImage { name });
            }
        }

        let bytes = fs::read(path).map_err(io_error)?;

        // Trust the content over the extension when the decoder recognizes it
        let mime_type = match image::guess_format(&bytes) {
            Ok(format) => format.to_mime_type(),
            Err(_) => match declared {
                Some("image/heic") => "image/heic",
                _ => return Err(UploadError::NotAnImage { name }),
            },
        };
        debug!("Upload '{}' detected as {}", name, mime_type);

        Ok(Self::new(bytes, mime_type, &name, ArtifactOrigin::Upload))
    }
}

/// Read a user-selected file and make it the store's current image
pub fn upload_image<P: AsRef<Path>>(
    store: &SharedImageStore,
    path: P,
    config: &UploadConfig,
) -> Result<ArtifactView, UploadError> {
    let artifact = ImageArtifact::from_file(path.as_ref(), config)?;
    info!("Uploading {}", path.as_ref().display());
    Ok(store.set_image(artifact))
}
