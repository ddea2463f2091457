#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Invalid artifact coordinates '{coords}': {reason}")]
    InvalidCoordinates { coords: String, reason: &'static str },
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;
