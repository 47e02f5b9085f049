use thiserror::Error;

pub type Result<T> = std::result::Result<T, CatalogError>;

#[derive(Debug, Error)]
pub enum CatalogError {
    /// Caller-supplied data broke a structural rule.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// A storage integrity rule was violated, e.g. an item pointing at an unknown category.
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    /// Neither the requested asset nor the default asset exists.
    #[error("not found: {0}")]
    NotFound(String),

    #[error("database error: {0}")]
    Database(rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image encoding error: {0}")]
    Image(#[from] image::ImageError),
}

impl From<rusqlite::Error> for CatalogError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(ref failure, ref message)
                if failure.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                let detail = message.clone().unwrap_or_else(|| failure.to_string());
                CatalogError::ConstraintViolation(detail)
            }
            other => CatalogError::Database(other),
        }
    }
}
