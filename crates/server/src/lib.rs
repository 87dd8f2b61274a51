use axum::{Json, http::StatusCode, response::IntoResponse};

use serde::Serialize;
pub use server::{ServerState, router, run_with_listener, spawn_with_listener};
pub use signature::{sign, verify};

mod server;
mod signature;

pub enum ServerError {
    Unauthorized(String),
    Generic(String),
}

#[derive(Serialize)]
struct Error {
    error: String,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        let (status, error) = match self {
            ServerError::Unauthorized(err) => {
                tracing::warn!("rejected webhook: {err}");
                (StatusCode::UNAUTHORIZED, err)
            }
            ServerError::Generic(err) => (StatusCode::BAD_REQUEST, err),
        };

        (status, Json(Error { error })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unauthorized_maps_to_401() {
        let res = ServerError::Unauthorized("bad".to_string()).into_response();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn generic_maps_to_400() {
        let res = ServerError::Generic("bad".to_string()).into_response();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }
}
