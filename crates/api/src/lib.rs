//! Data handed to the packager by the resolver and the code generators.

pub mod error;
pub mod models;

pub use error::{ApiError, ApiResult};
pub use models::*;
