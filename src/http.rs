//! The HTTP edge.
//!
//! Requests and responses are plain values so that the authorization
//! pipeline in [`crate::auth`] can inspect and rewrite them before they hit
//! the wire.  [`Transport`] is the seam between that pipeline and the
//! network; [`ReqwestTransport`] is the production implementation.
//!
//! Non-success responses are turned into [`Error`] exactly once, by
//! [`decode_error`].

use std::time::Duration;

use bytes::Bytes;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{Client as ReqwestClient, Method, multipart};
use serde::Deserialize;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{Error, Result};

/////////////////////////////////////////// ApiRequest ///////////////////////////////////////////

/// Body of an outgoing request.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// No body.
    Empty,
    /// A JSON document.
    Json(serde_json::Value),
    /// A `multipart/form-data` form.
    Multipart(Vec<FormPart>),
}

/// One field of a multipart form.
#[derive(Debug, Clone, PartialEq)]
pub struct FormPart {
    /// Field name.
    pub name: String,
    /// Field value.
    pub value: FormValue,
}

/// Value of a multipart form field.
#[derive(Debug, Clone, PartialEq)]
pub enum FormValue {
    /// A text field.
    Text(String),
    /// A file field.
    File {
        /// File name sent in the part's content disposition.
        file_name: String,
        /// MIME type of the part.
        content_type: String,
        /// File content.
        content: Bytes,
    },
}

impl FormPart {
    /// Creates a text field.
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: FormValue::Text(value.into()),
        }
    }

    /// Creates a file field.
    pub fn file(
        name: impl Into<String>,
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        content: Bytes,
    ) -> Self {
        Self {
            name: name.into(),
            value: FormValue::File {
                file_name: file_name.into(),
                content_type: content_type.into(),
                content,
            },
        }
    }
}

/// An outgoing request, before authorization.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    /// HTTP method.
    pub method: Method,
    /// Absolute URL, including any query string.
    pub url: String,
    /// Request headers.
    pub headers: HeaderMap,
    /// Request body.
    pub body: RequestBody,
}

impl ApiRequest {
    /// Creates a request with no headers and no body.
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HeaderMap::new(),
            body: RequestBody::Empty,
        }
    }

    /// Creates a GET request.
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    /// Creates a POST request.
    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    /// Creates a PATCH request.
    pub fn patch(url: impl Into<String>) -> Self {
        Self::new(Method::PATCH, url)
    }

    /// Sets a JSON body.
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self> {
        self.body = RequestBody::Json(serde_json::to_value(body)?);
        Ok(self)
    }

    /// Sets a multipart body.
    pub fn multipart(mut self, parts: Vec<FormPart>) -> Self {
        self.body = RequestBody::Multipart(parts);
        self
    }

    /// Sets `Authorization: Bearer {token}`.
    pub fn with_bearer(mut self, token: &str) -> Result<Self> {
        let value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|e| {
            Error::validation(
                format!("token is not a valid header value: {e}"),
                Some("token".to_string()),
            )
        })?;
        self.headers.insert(AUTHORIZATION, value);
        Ok(self)
    }

    /// The bearer token attached to this request, if any.
    pub fn bearer_token(&self) -> Option<&str> {
        self.headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
    }
}

/////////////////////////////////////////// ApiResponse //////////////////////////////////////////

/// A response as received from the transport, whatever its status.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    /// HTTP status code.
    pub status: u16,
    /// Raw response body.
    pub body: Bytes,
}

impl ApiResponse {
    /// Creates a response from a status and raw body.
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Creates a response with an empty body.
    pub fn empty(status: u16) -> Self {
        Self::new(status, Bytes::new())
    }

    /// Creates a response whose body is `value` encoded as JSON.
    pub fn from_json<T: Serialize + ?Sized>(status: u16, value: &T) -> Result<Self> {
        Ok(Self::new(status, serde_json::to_vec(value)?))
    }

    /// Returns true for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Decodes the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(|e| {
            Error::serialization(
                format!("Failed to parse response: {e}"),
                Some(Box::new(e)),
            )
        })
    }
}

//////////////////////////////////////////// Transport ///////////////////////////////////////////

/// Sends requests to the network.
///
/// Implementations return `Ok` for every response that arrived, including
/// 4xx and 5xx ones; `Err` is reserved for failures where no response was
/// received.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// Executes one request.
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse>;
}

/// A [`Transport`] backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: ReqwestClient,
    timeout: Duration,
}

impl ReqwestTransport {
    /// Creates a transport with the given per-request timeout.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = ReqwestClient::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                Error::http_client(
                    format!("Failed to build HTTP client: {e}"),
                    Some(Box::new(e)),
                )
            })?;
        Ok(Self { client, timeout })
    }

    fn map_send_error(&self, e: reqwest::Error) -> Error {
        if e.is_timeout() {
            Error::timeout(
                format!("Request timed out: {e}"),
                Some(self.timeout.as_secs_f64()),
            )
        } else if e.is_connect() {
            Error::connection(format!("Connection error: {e}"), Some(Box::new(e)))
        } else {
            Error::http_client(format!("Request failed: {e}"), Some(Box::new(e)))
        }
    }
}

fn build_form(parts: Vec<FormPart>) -> Result<multipart::Form> {
    let mut form = multipart::Form::new();
    for part in parts {
        form = match part.value {
            FormValue::Text(text) => form.text(part.name, text),
            FormValue::File {
                file_name,
                content_type,
                content,
            } => {
                let file = multipart::Part::bytes(content.to_vec())
                    .file_name(file_name)
                    .mime_str(&content_type)
                    .map_err(|e| {
                        Error::validation(
                            format!("invalid content type {content_type}: {e}"),
                            Some("file".to_string()),
                        )
                    })?;
                form.part(part.name, file)
            }
        };
    }
    Ok(form)
}

#[async_trait::async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse> {
        let mut builder = self
            .client
            .request(request.method, &request.url)
            .headers(request.headers);
        builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(&value),
            RequestBody::Multipart(parts) => builder.multipart(build_form(parts)?),
        };

        let response = builder.send().await.map_err(|e| self.map_send_error(e))?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(|e| {
            Error::http_client(
                format!("Failed to read response body: {e}"),
                Some(Box::new(e)),
            )
        })?;
        Ok(ApiResponse { status, body })
    }
}

/////////////////////////////////////////// decode_error //////////////////////////////////////////

/// Converts a non-success response into an [`Error`].
pub fn decode_error(response: &ApiResponse) -> Error {
    #[derive(Deserialize)]
    struct ErrorBody {
        code: Option<String>,
        message: Option<String>,
        error: Option<String>,
    }

    let text = String::from_utf8_lossy(&response.body).into_owned();
    let parsed = serde_json::from_slice::<ErrorBody>(&response.body).ok();
    let code = parsed.as_ref().and_then(|b| b.code.clone());
    let message = parsed
        .as_ref()
        .and_then(|b| b.message.clone().or_else(|| b.error.clone()))
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| {
            if text.trim().is_empty() {
                format!("HTTP {}", response.status)
            } else {
                text
            }
        });

    match response.status {
        400 | 422 => Error::bad_request(message, code),
        401 => Error::authentication(message),
        403 => Error::permission(message),
        404 => Error::not_found(message),
        408 => Error::timeout(message, None),
        409 => Error::conflict(message, code),
        500 => Error::internal_server(message),
        502..=504 => Error::service_unavailable(message),
        status => Error::api(status, code, message),
    }
}

/////////////////////////////////////////////// tests //////////////////////////////////////////////

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use super::*;

    type Responder = Box<dyn Fn(&ApiRequest) -> Result<ApiResponse> + Send + Sync>;

    /// An in-process transport that records every request and answers from
    /// a closure.  Each call yields once before answering so that concurrent
    /// callers interleave the way they would on a real network.
    pub(crate) struct ScriptedTransport {
        requests: Mutex<Vec<ApiRequest>>,
        responder: Responder,
    }

    impl ScriptedTransport {
        pub(crate) fn new(
            responder: impl Fn(&ApiRequest) -> Result<ApiResponse> + Send + Sync + 'static,
        ) -> std::sync::Arc<Self> {
            std::sync::Arc::new(Self {
                requests: Mutex::new(Vec::new()),
                responder: Box::new(responder),
            })
        }

        pub(crate) fn requests(&self) -> Vec<ApiRequest> {
            self.requests.lock().unwrap().clone()
        }

        pub(crate) fn count(&self, path: &str) -> usize {
            self.requests
                .lock()
                .unwrap()
                .iter()
                .filter(|r| r.url.ends_with(path))
                .count()
        }
    }

    #[async_trait::async_trait]
    impl Transport for ScriptedTransport {
        async fn execute(&self, request: ApiRequest) -> Result<ApiResponse> {
            self.requests.lock().unwrap().push(request.clone());
            tokio::task::yield_now().await;
            (self.responder)(&request)
        }
    }

    pub(crate) fn json(status: u16, value: serde_json::Value) -> Result<ApiResponse> {
        ApiResponse::from_json(status, &value)
    }

    pub(crate) fn user_json() -> serde_json::Value {
        serde_json::json!({
            "id": "u-1",
            "email": "ada@example.com",
            "username": "ada",
            "role": "USER"
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_json_error_body() {
        let response = ApiResponse::new(
            409,
            r#"{"code":"EMAIL_TAKEN","message":"Email already used"}"#,
        );
        let err = decode_error(&response);
        assert!(err.is_conflict());
        assert_eq!(err.message(), "Email already used");
        assert_eq!(err.auth_form_message(true), "This email is already in use.");
    }

    #[test]
    fn decode_spring_style_body() {
        let response = ApiResponse::new(401, r#"{"status":401,"error":"Unauthorized"}"#);
        let err = decode_error(&response);
        assert!(err.is_authentication());
        assert_eq!(err.message(), "Unauthorized");
    }

    #[test]
    fn decode_plain_text_and_empty_bodies() {
        let err = decode_error(&ApiResponse::new(502, "bad gateway"));
        assert!(err.is_server_error());
        assert_eq!(err.message(), "bad gateway");

        let err = decode_error(&ApiResponse::empty(418));
        assert_eq!(err.status_code(), Some(418));
        assert_eq!(err.message(), "HTTP 418");
    }

    #[test]
    fn bearer_roundtrip() {
        let request = ApiRequest::get("http://localhost/api/chat")
            .with_bearer("tok")
            .unwrap();
        assert_eq!(request.bearer_token(), Some("tok"));
        assert_eq!(
            request.headers.get(AUTHORIZATION).unwrap(),
            "Bearer tok"
        );
    }

    #[test]
    fn json_response_decoding() {
        let response = ApiResponse::new(200, "true");
        assert!(response.is_success());
        assert!(response.json::<bool>().unwrap());
        let err = ApiResponse::new(200, "nope").json::<bool>().unwrap_err();
        assert!(matches!(err, Error::Serialization { .. }));
    }

    #[test]
    fn build_form_rejects_bad_mime() {
        let parts = vec![FormPart::file("file", "a.pdf", "not a mime", Bytes::new())];
        assert!(build_form(parts).is_err());
        let parts = vec![
            FormPart::text("message", "hi"),
            FormPart::file("file", "a.pdf", "application/pdf", Bytes::from_static(b"%PDF")),
        ];
        assert!(build_form(parts).is_ok());
    }
}
