use crate::config::{AppConfig, UploadConfig};
use crate::error::ApiError;
use crate::models::product::FormFields;
use actix_multipart::{Field, Multipart};
use actix_web::dev::Payload;
use actix_web::http::header::CONTENT_TYPE;
use actix_web::web::Data;
use actix_web::{FromRequest, HttpRequest};
use futures::future::LocalBoxFuture;
use futures::StreamExt;
use rand::Rng;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

/// Cap on a single text field of the form.
const MAX_FIELD_BYTES: usize = 1024 * 1024;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Wrong file format: {0:?}")]
    UnsupportedType(String),

    #[error("File too large, the limit is {limit} bytes")]
    TooLarge { limit: u64 },

    #[error("Field value too long: {0}")]
    FieldTooLarge(String),

    #[error("Unexpected field: {0:?}")]
    UnexpectedField(String),

    #[error("Malformed multipart body: {0}")]
    Multipart(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// An image written to the upload directory.
#[derive(Debug, Clone)]
pub struct StoredImage {
    pub filename: String,
    pub path: PathBuf,
    pub content_type: String,
    pub size: u64,
}

impl StoredImage {
    /// Removes the file. Failures are logged, the file is already orphaned.
    pub async fn discard(&self) {
        if let Err(err) = tokio::fs::remove_file(&self.path).await {
            log::warn!("Could not remove {}: {}", self.path.display(), err);
        }
    }
}

/// The parsed create-product form: at most one stored image plus text fields.
///
/// Extracting this runs the upload stage. A request that is not
/// `multipart/form-data` yields an empty upload; a rejected file short-circuits
/// the request before the handler runs and leaves nothing on disk.
#[derive(Debug, Default)]
pub struct ProductUpload {
    pub image: Option<StoredImage>,
    pub fields: FormFields,
}

impl ProductUpload {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

impl FromRequest for ProductUpload {
    type Error = ApiError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let config = req.app_data::<Data<AppConfig>>().cloned();
        let is_multipart = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_ascii_lowercase().starts_with("multipart/form-data"))
            .unwrap_or(false);

        let multipart = if is_multipart {
            Some(Multipart::new(req.headers(), payload.take()))
        } else {
            None
        };

        Box::pin(async move {
            let config = config.ok_or_else(|| {
                ApiError::Internal("application config is not registered".to_owned())
            })?;

            let mut upload = ProductUpload::default();
            let mut multipart = match multipart {
                Some(multipart) => multipart,
                None => return Ok(upload),
            };

            if let Err(err) = read_multipart(&mut multipart, &config.upload, &mut upload).await {
                if let Some(image) = upload.image.take() {
                    image.discard().await;
                }

                log::warn!("Upload rejected: {}", err);
                return Err(ApiError::from_upload(&config, err));
            }

            if let Some(image) = &upload.image {
                log::debug!(
                    "Stored {} ({}, {} bytes)",
                    image.filename,
                    image.content_type,
                    image.size
                );
            }

            Ok(upload)
        })
    }
}

async fn read_multipart(
    multipart: &mut Multipart,
    settings: &UploadConfig,
    upload: &mut ProductUpload,
) -> Result<(), UploadError> {
    while let Some(field) = multipart.next().await {
        let mut field = field.map_err(|e| UploadError::Multipart(e.to_string()))?;
        let name = field.name().unwrap_or_default().to_owned();
        let original = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .map(str::to_owned);

        match original {
            Some(original) => {
                if name != settings.field_name || upload.image.is_some() {
                    return Err(UploadError::UnexpectedField(name));
                }

                let content_type = field
                    .content_type()
                    .map(|mime| mime.essence_str().to_owned())
                    .unwrap_or_default();

                if !settings.allows(&content_type) {
                    return Err(UploadError::UnsupportedType(content_type));
                }

                let image = save_image(&mut field, settings, &name, &original, content_type).await?;
                upload.image = Some(image);
            }
            None => {
                let value = read_text(&mut field, &name).await?;
                upload.fields.insert(name, value);
            }
        }
    }

    Ok(())
}

async fn save_image(
    field: &mut Field,
    settings: &UploadConfig,
    field_name: &str,
    original: &str,
    content_type: String,
) -> Result<StoredImage, UploadError> {
    tokio::fs::create_dir_all(&settings.dir).await?;

    let filename = image_filename(field_name, original);
    let path = settings.dir.join(&filename);
    let mut file = File::create(&path).await?;

    let mut image = StoredImage {
        filename,
        path,
        content_type,
        size: 0,
    };

    match write_limited(field, &mut file, settings.max_bytes).await {
        Ok(size) => {
            image.size = size;
            Ok(image)
        }
        Err(err) => {
            drop(file);
            image.discard().await;
            Err(err)
        }
    }
}

async fn write_limited(field: &mut Field, file: &mut File, limit: u64) -> Result<u64, UploadError> {
    let mut size = 0u64;

    while let Some(chunk) = field.next().await {
        let chunk = chunk.map_err(|e| UploadError::Multipart(e.to_string()))?;
        size += chunk.len() as u64;

        if size > limit {
            return Err(UploadError::TooLarge { limit });
        }

        file.write_all(&chunk).await?;
    }

    file.flush().await?;
    Ok(size)
}

async fn read_text(field: &mut Field, name: &str) -> Result<String, UploadError> {
    let mut data = Vec::new();

    while let Some(chunk) = field.next().await {
        let chunk = chunk.map_err(|e| UploadError::Multipart(e.to_string()))?;
        if data.len() + chunk.len() > MAX_FIELD_BYTES {
            return Err(UploadError::FieldTooLarge(name.to_owned()));
        }
        data.extend_from_slice(&chunk);
    }

    Ok(String::from_utf8_lossy(&data).into_owned())
}

/// `<field>-<unix millis>-<random>.<ext>`, with the extension taken from the
/// client's file name when it has a plain alphanumeric one.
pub fn image_filename(field_name: &str, original: &str) -> String {
    let timestamp = chrono::Utc::now().timestamp_millis();
    let suffix: u32 = rand::thread_rng().gen_range(0..=1_000_000_000);

    match extension(original) {
        Some(ext) => format!("{}-{}-{}.{}", field_name, timestamp, suffix, ext),
        None => format!("{}-{}-{}", field_name, timestamp, suffix),
    }
}

fn extension(original: &str) -> Option<&str> {
    Path::new(original)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filename_has_field_timestamp_random_and_extension() {
        let filename = image_filename("productImage", "holiday photo.PNG");
        let (stem, ext) = filename.rsplit_once('.').unwrap();
        let parts = stem.split('-').collect::<Vec<_>>();

        assert_eq!(ext, "PNG");
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "productImage");
        assert!(parts[1].parse::<i64>().unwrap() > 0);
        assert!(parts[2].parse::<u32>().unwrap() <= 1_000_000_000);
    }

    #[test]
    fn odd_extensions_are_dropped() {
        assert_eq!(extension("a.tar.gz"), Some("gz"));
        assert_eq!(extension("../../etc/passwd"), None);
        assert_eq!(extension(".png"), None);
        assert_eq!(extension("x.p g"), None);

        let filename = image_filename("productImage", "README");
        assert_eq!(filename.matches('-').count(), 2);
        assert!(!filename.contains('.'));
    }
}
