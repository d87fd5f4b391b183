//! Single-file multipart upload extractor.

use crate::errors::AppError;
use axum::extract::{FromRequest, Multipart, Request};
use bytes::Bytes;

/// Name of the multipart field carrying the file
pub const UPLOAD_FIELD: &str = "image";

/// The `image` field of a `multipart/form-data` request.
///
/// Other fields are ignored. A request without the field, or with an empty
/// file, is rejected with `INVALID_UPLOAD`.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

impl<S> FromRequest<S> for ImageUpload
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(|e| AppError::InvalidUpload(e.body_text()))?;

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::InvalidUpload(e.body_text()))?
        {
            if field.name() != Some(UPLOAD_FIELD) {
                continue;
            }

            let file_name = field
                .file_name()
                .map(sanitize_file_name)
                .unwrap_or_else(|| "upload".to_string());
            let content_type = field.content_type().map(str::to_string);
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::InvalidUpload(e.body_text()))?;

            if bytes.is_empty() {
                return Err(AppError::InvalidUpload(format!(
                    "field '{}' is empty",
                    UPLOAD_FIELD
                )));
            }

            return Ok(ImageUpload {
                file_name,
                content_type,
                bytes,
            });
        }

        Err(AppError::InvalidUpload(format!(
            "missing multipart field '{}'",
            UPLOAD_FIELD
        )))
    }
}

/// Keep only the final path component so uploads cannot escape their directory
fn sanitize_file_name(raw: &str) -> String {
    let name = raw
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();

    if name.is_empty() || name == "." || name == ".." {
        "upload".to_string()
    } else {
        name.to_string()
    }
}
