use rocket::response::{Responder, Response};
use rocket::{
    http::{ContentType, Status},
    response,
    serde::json::Json,
    Request,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Serialize, Debug)]
pub struct ApiError {
    err: String,
}

impl ApiError {
    pub(crate) fn new(err: String) -> ApiError {
        ApiError { err }
    }

    pub fn message(&self) -> &str {
        &self.err
    }
}

#[derive(Debug)]
pub struct ErrorResponse<T = ApiError> {
    json: Json<T>,
    status: Status,
}

impl ErrorResponse<ApiError> {
    pub(crate) fn new(status: Status, err: String) -> ErrorResponse<ApiError> {
        ErrorResponse {
            json: Json(ApiError { err }),
            status,
        }
    }

    pub(crate) fn not_found(what: &str) -> ErrorResponse<ApiError> {
        Self::new(Status { code: 404 }, format!("Couldn't find {}", what))
    }

    pub(crate) fn forbidden(err: &str) -> ErrorResponse<ApiError> {
        Self::new(Status { code: 403 }, err.to_string())
    }

    pub(crate) fn bad_request(err: impl Into<String>) -> ErrorResponse<ApiError> {
        Self::new(Status { code: 400 }, err.into())
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn message(&self) -> &str {
        self.json.message()
    }
}

impl<'r, T: serde::Serialize> Responder<'r, 'static> for ErrorResponse<T> {
    fn respond_to(self, req: &'r Request) -> response::Result<'static> {
        Response::build_from(self.json.respond_to(req)?)
            .status(self.status)
            .header(ContentType::JSON)
            .ok()
    }
}

/// Failures talking to the payment gateway.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("gateway request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("gateway answered {status} on {operation}: {body}")]
    Status {
        operation: &'static str,
        status: u16,
        body: String,
    },

    #[error("unexpected gateway response: {0}")]
    Malformed(String),

    #[error("gateway is not configured: missing {0}")]
    NotConfigured(&'static str),
}

impl From<GatewayError> for ErrorResponse {
    fn from(err: GatewayError) -> Self {
        ErrorResponse::new(Status { code: 502 }, format!("Payment gateway error: {}", err))
    }
}

/// Maps a diesel error to a 404 for missing rows and a 500 otherwise.
pub(crate) fn db_error(what: &str) -> impl FnOnce(diesel::result::Error) -> ErrorResponse + '_ {
    move |err| match err {
        diesel::result::Error::NotFound => ErrorResponse::not_found(what),
        err => ErrorResponse::new(
            Status { code: 500 },
            format!("Couldn't access {}: {}", what, err),
        ),
    }
}

#[catch(401)]
pub(crate) fn unauthorized() -> Json<ApiError> {
    Json(ApiError::new("Login required".to_string()))
}

#[catch(403)]
pub(crate) fn forbidden() -> Json<ApiError> {
    Json(ApiError::new("Permission denied".to_string()))
}

#[catch(404)]
pub(crate) fn not_found() -> Json<ApiError> {
    Json(ApiError::new("Not found".to_string()))
}

#[catch(422)]
pub(crate) fn unprocessable() -> Json<ApiError> {
    Json(ApiError::new("Invalid form data".to_string()))
}

#[catch(500)]
pub(crate) fn internal_error() -> Json<ApiError> {
    Json(ApiError::new("Internal server error".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gateway_errors_become_bad_gateway() {
        let response: ErrorResponse = GatewayError::Status {
            operation: "create order",
            status: 422,
            body: "UNPROCESSABLE_ENTITY".to_string(),
        }
        .into();

        assert_eq!(response.status().code, 502);
        assert!(response.message().contains("create order"));
        assert!(response.message().contains("422"));
    }

    #[test]
    fn missing_rows_map_to_not_found() {
        let response = db_error("rental")(diesel::result::Error::NotFound);
        assert_eq!(response.status().code, 404);
        assert_eq!(response.message(), "Couldn't find rental");

        let response = db_error("rental")(diesel::result::Error::RollbackTransaction);
        assert_eq!(response.status().code, 500);
    }
}
