//! Request extractors that reject with a JSON [`AppError`](crate::AppError)
//! body instead of axum's plain-text rejections.

pub mod query;
pub mod upload;
pub mod validated_json;

pub use query::QueryParams;
pub use upload::ImageUpload;
pub use validated_json::ValidatedJson;
