use actix_multipart::Field;
use futures::TryStreamExt;
use log::info;
use std::env;
use std::path::Path;
use tokio::io::AsyncWriteExt;

/// Per-file upload cap, matching the original 10MB limit.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("file exceeds the {} byte upload limit", MAX_UPLOAD_BYTES)]
    TooLarge,
    #[error("{0}")]
    WrongType(String),
    #[error("multipart error: {0}")]
    Multipart(actix_multipart::MultipartError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<actix_multipart::MultipartError> for UploadError {
    fn from(e: actix_multipart::MultipartError) -> Self {
        UploadError::Multipart(e)
    }
}

impl UploadError {
    /// Multer-style mapping: size and type violations are the client's
    /// fault, everything else is a server error.
    pub fn to_response(&self) -> actix_web::HttpResponse {
        match self {
            UploadError::TooLarge | UploadError::WrongType(_) => {
                actix_web::HttpResponse::BadRequest()
                    .json(serde_json::json!({ "error": self.to_string() }))
            }
            _ => actix_web::HttpResponse::InternalServerError()
                .json(serde_json::json!({ "error": "Internal server error" })),
        }
    }
}

pub struct SavedFile {
    pub file_name: String,
    pub url: String,
}

pub fn is_image(field: &Field) -> bool {
    field
        .content_type()
        .map(|mime| mime.essence_str().starts_with("image/"))
        .unwrap_or(false)
}

pub fn is_video(field: &Field) -> bool {
    field
        .content_type()
        .map(|mime| mime.essence_str().starts_with("video/"))
        .unwrap_or(false)
}

/// Unique on-disk name: a v4 uuid plus the original file extension.
pub fn unique_file_name(original: Option<&str>) -> String {
    let extension = original
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{}", ext))
        .unwrap_or_default();
    format!("{}{}", uuid::Uuid::new_v4(), extension)
}

/// Public URL for a stored file: base host + /uploads/ + file name.
pub fn public_url(file_name: &str) -> String {
    let base_url =
        env::var("API_BASE_URL").unwrap_or_else(|_| "http://localhost:4000".to_string());
    format!("{}/uploads/{}", base_url.trim_end_matches('/'), file_name)
}

/// Drain a file field to disk under `dir`, enforcing the size cap.
pub async fn save_file(field: &mut Field, dir: &str) -> Result<SavedFile, UploadError> {
    let original = field.content_disposition().get_filename().map(String::from);
    let file_name = unique_file_name(original.as_deref());
    let path = Path::new(dir).join(&file_name);

    let mut file = tokio::fs::File::create(&path).await?;
    let mut written: usize = 0;
    while let Some(chunk) = field.try_next().await? {
        written += chunk.len();
        if written > MAX_UPLOAD_BYTES {
            drop(file);
            tokio::fs::remove_file(&path).await.ok();
            return Err(UploadError::TooLarge);
        }
        file.write_all(&chunk).await?;
    }
    file.flush().await?;

    info!("Stored upload {} ({} bytes)", file_name, written);
    Ok(SavedFile {
        url: public_url(&file_name),
        file_name,
    })
}

/// Drain a text field into a string.
pub async fn read_text(field: &mut Field) -> Result<String, UploadError> {
    let mut data = Vec::new();
    while let Some(chunk) = field.try_next().await? {
        if data.len() + chunk.len() > MAX_UPLOAD_BYTES {
            return Err(UploadError::TooLarge);
        }
        data.extend_from_slice(&chunk);
    }
    Ok(String::from_utf8_lossy(&data).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_names_keep_the_extension() {
        let name = unique_file_name(Some("clip.mp4"));
        assert!(name.ends_with(".mp4"));
        assert!(name.len() > ".mp4".len() + 30);
    }

    #[test]
    fn unique_names_without_extension() {
        let name = unique_file_name(Some("README"));
        assert!(!name.contains('.'));
        let name = unique_file_name(None);
        assert!(!name.contains('.'));
    }

    #[test]
    fn unique_names_do_not_repeat() {
        assert_ne!(unique_file_name(Some("a.png")), unique_file_name(Some("a.png")));
    }

    #[test]
    fn public_urls_join_cleanly() {
        std::env::set_var("API_BASE_URL", "http://media.test:4000/");
        assert_eq!(public_url("x.png"), "http://media.test:4000/uploads/x.png");
        std::env::remove_var("API_BASE_URL");
    }
}
