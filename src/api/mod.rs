//! REST API module.
//!
//! Contains all API routes and handlers for the portal.

mod auth;
mod berita;
mod collection;
mod keaktifan;
mod messages;
mod pembayaran;
mod profile;
mod santri;
mod users;

pub use auth::*;
pub use berita::*;
pub use collection::*;
pub use keaktifan::*;
pub use messages::*;
pub use pembayaran::*;
pub use profile::*;
pub use santri::*;
pub use users::*;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::errors::AppError;

/// Success response envelope.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// Response type that can be either success or error.
pub type ApiResult<T> = Result<ApiResponse<T>, AppError>;

/// Create a successful API response.
pub fn success<T: Serialize>(data: T) -> ApiResult<T> {
    Ok(ApiResponse::new(data))
}

/// A file pulled out of a multipart payload.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}
