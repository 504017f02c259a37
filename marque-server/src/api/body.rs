//! Request body extractor
//!
//! Book, bookmark and quote writes accept JSON, url-encoded forms, or
//! multipart forms (the only way to send a cover file). All three end up
//! as the same [`Fields`] map so validation is shared.

use std::collections::HashMap;

use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, Multipart, Request},
    http::header::CONTENT_TYPE,
    Form,
};
use marque_common::validation::Fields;
use serde_json::Value;
use tracing::debug;

use crate::covers::{CoverUpload, COVER_FIELD};
use crate::error::ApiError;

/// Parsed request body: text fields plus an optional cover upload
#[derive(Debug, Default)]
pub struct RequestBody {
    pub fields: Fields,
    pub cover: Option<CoverUpload>,
}

fn content_type(req: &Request) -> String {
    req.headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase()
}

#[async_trait]
impl<S> FromRequest<S> for RequestBody
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = content_type(&req);

        if content_type.starts_with("multipart/form-data") {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| ApiError::BadRequest(e.body_text()))?;
            return read_multipart(multipart).await;
        }

        if content_type.starts_with("application/x-www-form-urlencoded") {
            let Form(form) = Form::<HashMap<String, String>>::from_request(req, state)
                .await
                .map_err(|e| ApiError::BadRequest(e.body_text()))?;
            let fields = form
                .into_iter()
                .map(|(k, v)| (k, Value::String(v)))
                .collect();
            return Ok(Self {
                fields,
                cover: None,
            });
        }

        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;
        parse_json(&bytes)
    }
}

/// JSON object body; an empty body is an empty object
fn parse_json(bytes: &[u8]) -> Result<RequestBody, ApiError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(RequestBody::default());
    }

    match serde_json::from_slice::<Value>(bytes) {
        Ok(Value::Object(fields)) => Ok(RequestBody {
            fields,
            cover: None,
        }),
        Ok(_) => Err(ApiError::BadRequest(
            "The request body must be a JSON object.".to_string(),
        )),
        Err(e) => Err(ApiError::BadRequest(format!("Malformed JSON body: {}", e))),
    }
}

async fn read_multipart(mut multipart: Multipart) -> Result<RequestBody, ApiError> {
    let mut body = RequestBody::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.body_text()))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        if name == COVER_FIELD && field.file_name().is_some() {
            let file_name = field.file_name().map(str::to_string);
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::BadRequest(e.body_text()))?;

            // An empty file input (nothing chosen) is no upload at all
            if bytes.is_empty() {
                continue;
            }

            debug!("Received cover upload {:?} ({} bytes)", file_name, bytes.len());
            body.cover = Some(CoverUpload {
                file_name,
                bytes: bytes.to_vec(),
            });
            continue;
        }

        let text = field
            .text()
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;
        body.fields.insert(name, Value::String(text));
    }

    Ok(body)
}
