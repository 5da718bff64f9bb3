//! Error types for the Aura client.
//!
//! Every failure the client can observe is mapped onto [`Error`] exactly once:
//! HTTP failures are decoded at the transport edge (see [`crate::http`]),
//! local validation failures are raised where the input is checked.

use std::error;
use std::fmt;
use std::io;
use std::sync::Arc;

/// The main error type for the Aura client.
#[derive(Clone, Debug)]
pub enum Error {
    /// A generic API error with a status code we do not map specifically.
    Api {
        /// HTTP status code.
        status_code: u16,
        /// Machine-readable error code from the response body.
        code: Option<String>,
        /// Human-readable error message.
        message: String,
    },

    /// The server rejected the credential (HTTP 401).
    Authentication {
        /// Human-readable error message.
        message: String,
    },

    /// The credential is valid but lacks permission (HTTP 403).
    Permission {
        /// Human-readable error message.
        message: String,
    },

    /// Resource not found (HTTP 404).
    NotFound {
        /// Human-readable error message.
        message: String,
    },

    /// The request conflicts with existing state (HTTP 409).
    Conflict {
        /// Human-readable error message.
        message: String,
        /// Machine-readable error code from the response body.
        code: Option<String>,
    },

    /// Bad request due to invalid parameters (HTTP 400 or 422).
    BadRequest {
        /// Human-readable error message.
        message: String,
        /// Machine-readable error code from the response body.
        code: Option<String>,
    },

    /// The request timed out.
    Timeout {
        /// Human-readable error message.
        message: String,
        /// Duration of the timeout in seconds.
        duration: Option<f64>,
    },

    /// Connection error.
    Connection {
        /// Human-readable error message.
        message: String,
        /// Underlying cause.
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    },

    /// Server returned a 500 internal error.
    InternalServer {
        /// Human-readable error message.
        message: String,
    },

    /// Server is overloaded or unavailable (HTTP 502-504).
    ServiceUnavailable {
        /// Human-readable error message.
        message: String,
    },

    /// Error during JSON serialization or deserialization.
    Serialization {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    },

    /// I/O error.
    Io {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        source: Arc<io::Error>,
    },

    /// HTTP client error.
    HttpClient {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    },

    /// Local validation of user input failed.
    Validation {
        /// Human-readable error message.
        message: String,
        /// Input that failed validation.
        param: Option<String>,
    },

    /// A URL parsing or manipulation error.
    Url {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        source: Option<url::ParseError>,
    },

    /// A file was rejected by the attachment policy.
    Attachment {
        /// Human-readable error message.
        message: String,
    },

    /// A chat request is already in flight for this conversation.
    Busy {
        /// Human-readable error message.
        message: String,
    },
}

impl Error {
    /// Creates a new API error.
    pub fn api(status_code: u16, code: Option<String>, message: impl Into<String>) -> Self {
        Error::Api {
            status_code,
            code,
            message: message.into(),
        }
    }

    /// Creates a new authentication error.
    pub fn authentication(message: impl Into<String>) -> Self {
        Error::Authentication {
            message: message.into(),
        }
    }

    /// Creates a new permission error.
    pub fn permission(message: impl Into<String>) -> Self {
        Error::Permission {
            message: message.into(),
        }
    }

    /// Creates a new not found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Error::NotFound {
            message: message.into(),
        }
    }

    /// Creates a new conflict error.
    pub fn conflict(message: impl Into<String>, code: Option<String>) -> Self {
        Error::Conflict {
            message: message.into(),
            code,
        }
    }

    /// Creates a new bad request error.
    pub fn bad_request(message: impl Into<String>, code: Option<String>) -> Self {
        Error::BadRequest {
            message: message.into(),
            code,
        }
    }

    /// Creates a new timeout error.
    pub fn timeout(message: impl Into<String>, duration: Option<f64>) -> Self {
        Error::Timeout {
            message: message.into(),
            duration,
        }
    }

    /// Creates a new connection error.
    pub fn connection(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::Connection {
            message: message.into(),
            source: source.map(Arc::from),
        }
    }

    /// Creates a new internal server error.
    pub fn internal_server(message: impl Into<String>) -> Self {
        Error::InternalServer {
            message: message.into(),
        }
    }

    /// Creates a new service unavailable error.
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Error::ServiceUnavailable {
            message: message.into(),
        }
    }

    /// Creates a new serialization error.
    pub fn serialization(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::Serialization {
            message: message.into(),
            source: source.map(Arc::from),
        }
    }

    /// Creates a new I/O error.
    pub fn io(message: impl Into<String>, source: io::Error) -> Self {
        Error::Io {
            message: message.into(),
            source: Arc::new(source),
        }
    }

    /// Creates a new HTTP client error.
    pub fn http_client(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::HttpClient {
            message: message.into(),
            source: source.map(Arc::from),
        }
    }

    /// Creates a new validation error.
    pub fn validation(message: impl Into<String>, param: Option<String>) -> Self {
        Error::Validation {
            message: message.into(),
            param,
        }
    }

    /// Creates a new URL error.
    pub fn url(message: impl Into<String>, source: Option<url::ParseError>) -> Self {
        Error::Url {
            message: message.into(),
            source,
        }
    }

    /// Creates a new attachment policy error.
    pub fn attachment(message: impl Into<String>) -> Self {
        Error::Attachment {
            message: message.into(),
        }
    }

    /// Creates a new busy error.
    pub fn busy(message: impl Into<String>) -> Self {
        Error::Busy {
            message: message.into(),
        }
    }

    /// Returns true if this error is an HTTP 401.
    pub fn is_authentication(&self) -> bool {
        matches!(self, Error::Authentication { .. })
    }

    /// Returns true if this error is related to permissions.
    pub fn is_permission(&self) -> bool {
        matches!(self, Error::Permission { .. })
    }

    /// Returns true if this error is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }

    /// Returns true if this error is a conflict.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::Conflict { .. })
    }

    /// Returns true if this error is a bad request.
    pub fn is_bad_request(&self) -> bool {
        matches!(self, Error::BadRequest { .. })
    }

    /// Returns true if this error is a timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout { .. })
    }

    /// Returns true if this error is a connection error.
    pub fn is_connection(&self) -> bool {
        matches!(self, Error::Connection { .. })
    }

    /// Returns true if this error is a server error.
    pub fn is_server_error(&self) -> bool {
        matches!(
            self,
            Error::InternalServer { .. } | Error::ServiceUnavailable { .. }
        )
    }

    /// Returns true if this error is a validation error.
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation { .. })
    }

    /// Returns true if this error came from the attachment policy.
    pub fn is_attachment(&self) -> bool {
        matches!(self, Error::Attachment { .. })
    }

    /// Returns true if the request was refused because another one is in flight.
    pub fn is_busy(&self) -> bool {
        matches!(self, Error::Busy { .. })
    }

    /// Returns true if resubmitting the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Api { status_code, .. } => matches!(status_code, 408 | 429 | 500..=599),
            Error::Timeout { .. } => true,
            Error::Connection { .. } => true,
            Error::HttpClient { .. } => true,
            Error::ServiceUnavailable { .. } => true,
            Error::InternalServer { .. } => true,
            _ => false,
        }
    }

    /// Returns the HTTP status code associated with this error, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::Api { status_code, .. } => Some(*status_code),
            Error::Authentication { .. } => Some(401),
            Error::Permission { .. } => Some(403),
            Error::NotFound { .. } => Some(404),
            Error::Conflict { .. } => Some(409),
            Error::InternalServer { .. } => Some(500),
            _ => None,
        }
    }

    /// Returns the human-readable message carried by this error.
    pub fn message(&self) -> &str {
        match self {
            Error::Api { message, .. }
            | Error::Authentication { message }
            | Error::Permission { message }
            | Error::NotFound { message }
            | Error::Conflict { message, .. }
            | Error::BadRequest { message, .. }
            | Error::Timeout { message, .. }
            | Error::Connection { message, .. }
            | Error::InternalServer { message }
            | Error::ServiceUnavailable { message }
            | Error::Serialization { message, .. }
            | Error::Io { message, .. }
            | Error::HttpClient { message, .. }
            | Error::Validation { message, .. }
            | Error::Url { message, .. }
            | Error::Attachment { message }
            | Error::Busy { message } => message,
        }
    }

    /// Translates a login or register failure into text suitable for the form.
    ///
    /// A register attempt that fails with 409, or whose message says the
    /// email is already taken, gets a dedicated message.  A login attempt
    /// rejected with 401 is reported as bad credentials.  Anything else is
    /// generic.
    pub fn auth_form_message(&self, is_register: bool) -> &'static str {
        let message = self.message().to_lowercase();
        let email_already_used = self.is_conflict()
            || (message.contains("email")
                && (message.contains("already")
                    || message.contains("exist")
                    || message.contains("used")));

        if is_register && email_already_used {
            return "This email is already in use.";
        }
        if !is_register && self.is_authentication() {
            return "Incorrect email or password.";
        }
        "Something went wrong. Please try again."
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Api {
                status_code,
                code,
                message,
            } => {
                if let Some(code) = code {
                    write!(f, "API error {status_code} ({code}): {message}")
                } else {
                    write!(f, "API error {status_code}: {message}")
                }
            }
            Error::Authentication { message } => {
                write!(f, "Authentication error: {message}")
            }
            Error::Permission { message } => {
                write!(f, "Permission error: {message}")
            }
            Error::NotFound { message } => {
                write!(f, "Resource not found: {message}")
            }
            Error::Conflict { message, code } => {
                if let Some(code) = code {
                    write!(f, "Conflict ({code}): {message}")
                } else {
                    write!(f, "Conflict: {message}")
                }
            }
            Error::BadRequest { message, code } => {
                if let Some(code) = code {
                    write!(f, "Bad request ({code}): {message}")
                } else {
                    write!(f, "Bad request: {message}")
                }
            }
            Error::Timeout { message, duration } => {
                if let Some(duration) = duration {
                    write!(f, "Timeout error: {message} ({duration} seconds)")
                } else {
                    write!(f, "Timeout error: {message}")
                }
            }
            Error::Connection { message, .. } => {
                write!(f, "Connection error: {message}")
            }
            Error::InternalServer { message } => {
                write!(f, "Internal server error: {message}")
            }
            Error::ServiceUnavailable { message } => {
                write!(f, "Service unavailable: {message}")
            }
            Error::Serialization { message, .. } => {
                write!(f, "Serialization error: {message}")
            }
            Error::Io { message, .. } => {
                write!(f, "I/O error: {message}")
            }
            Error::HttpClient { message, .. } => {
                write!(f, "HTTP client error: {message}")
            }
            Error::Validation { message, param } => {
                if let Some(param) = param {
                    write!(f, "Validation error: {message} (parameter: {param})")
                } else {
                    write!(f, "Validation error: {message}")
                }
            }
            Error::Url { message, .. } => {
                write!(f, "URL error: {message}")
            }
            Error::Attachment { message } => {
                write!(f, "Attachment rejected: {message}")
            }
            Error::Busy { message } => {
                write!(f, "Busy: {message}")
            }
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Error::Connection { source, .. } => source
                .as_ref()
                .map(|e| e.as_ref() as &(dyn error::Error + 'static)),
            Error::Serialization { source, .. } => source
                .as_ref()
                .map(|e| e.as_ref() as &(dyn error::Error + 'static)),
            Error::Io { source, .. } => Some(source),
            Error::HttpClient { source, .. } => source
                .as_ref()
                .map(|e| e.as_ref() as &(dyn error::Error + 'static)),
            Error::Url { source, .. } => {
                source.as_ref().map(|e| e as &(dyn error::Error + 'static))
            }
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::io(err.to_string(), err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::serialization(format!("JSON error: {err}"), Some(Box::new(err)))
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::url(format!("URL parse error: {err}"), Some(err))
    }
}

/// A specialized Result type for Aura operations.
pub type Result<T> = std::result::Result<T, Error>;
