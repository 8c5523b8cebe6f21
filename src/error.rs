use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::extraction::LabTestRecord;

#[derive(Error, Debug)]
pub enum LabError {
    #[error(
        "Tesseract OCR is not properly installed. Please install Tesseract OCR and ensure it's in your PATH."
    )]
    EngineUnavailable,

    #[error("File must be an image")]
    NotAnImage,

    #[error("Missing file in request")]
    MissingFile,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Failed to decode image: {0}")]
    ImageDecode(String),

    #[error("OCR failed: {0}")]
    Ocr(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl LabError {
    pub fn status(&self) -> StatusCode {
        match self {
            LabError::NotAnImage | LabError::MissingFile | LabError::InvalidRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            LabError::EngineUnavailable
            | LabError::ImageDecode(_)
            | LabError::Ocr(_)
            | LabError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Body for rejected requests
#[derive(Serialize)]
pub struct DetailResponse {
    pub detail: String,
}

/// Body for requests that reached processing and failed
#[derive(Serialize)]
pub struct FailureResponse {
    pub is_success: bool,
    pub error: String,
    pub data: Vec<LabTestRecord>,
}

impl IntoResponse for LabError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_client_error() {
            let body = Json(DetailResponse {
                detail: self.to_string(),
            });
            return (status, body).into_response();
        }

        tracing::error!("Error processing image: {}", self);

        let body = Json(FailureResponse {
            is_success: false,
            error: self.to_string(),
            data: Vec::new(),
        });

        (status, body).into_response()
    }
}
