//! HTTP surface: health endpoint, auth check and token creation.

mod routes;
mod server;

use axum::response::{IntoResponse, Response};

pub use routes::{router, AppState};
pub use server::HttpServer;

use crate::auth::AuthError;

/// Base path of every authenticated endpoint.
pub const API_BASE_PATH: &str = "/api/v1/";

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        (self.status(), self.code()).into_response()
    }
}
