use crate::server::ServerError;
use axum::{
    extract::FromRequest,
    http::{HeaderValue, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// JSON body extractor/response whose rejection routes through [`ServerError`],
/// so malformed bodies share the error surface with everything else.
#[derive(FromRequest, Debug, Clone, Copy, Default)]
#[from_request(via(axum::Json), rejection(ServerError))]
pub struct Json<T>(pub T);

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        let body = match serde_json::to_vec(&self.0) {
            Ok(body) => body,
            Err(err) => return ServerError::JsonResponse(err).into_response(),
        };

        (
            [(
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/json"),
            )],
            body,
        )
            .into_response()
    }
}
