//! Utility module - shared error types, logging and validation helpers

pub mod error;
pub mod geo;
pub mod logger;
pub mod result;
pub mod validation;

pub use error::{ApiResponse, AppError, FieldError};
pub use error::{ok, ok_with_message};
pub use result::AppResult;
