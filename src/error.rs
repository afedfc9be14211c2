use serde::Deserialize;

/// Errors raised by the record layer.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Generic failure reported by the remote API.
    #[error("{code}: {message}{}", context_suffix(.context))]
    Remote {
        code: String,
        message: String,
        context: Option<String>,
    },

    /// The server refused a single-record fetch because it selects too many fields.
    #[error("query too complicated: {message}{}", context_suffix(.context))]
    QueryTooComplicated {
        message: String,
        context: Option<String>,
    },

    #[error("object not found: {context}")]
    ObjectNotFound { context: String },

    #[error("undefined field `{field}` on {type_name}")]
    UndefinedField { type_name: String, field: String },

    #[error("no mapping for record type `{0}`")]
    UnmappedType(String),

    /// More than one custom-field naming convention matched the same accessor.
    #[error("accessor `{field}` on {type_name} is ambiguous between {}", .candidates.join(" and "))]
    AmbiguousReference {
        type_name: String,
        field: String,
        candidates: Vec<String>,
    },

    #[error("invalid {field_type} value `{value}` for field `{field}`")]
    Coercion {
        field: String,
        field_type: String,
        value: String,
    },

    #[error("{0} record has no id yet")]
    Unsaved(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("unexpected response: {0}")]
    Protocol(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

fn context_suffix(context: &Option<String>) -> String {
    context
        .as_ref()
        .map(|c| format!(" ({c})"))
        .unwrap_or_default()
}

impl Error {
    pub fn is_query_too_complicated(&self) -> bool {
        matches!(self, Error::QueryTooComplicated { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::ObjectNotFound { .. })
    }
}

/// One entry of the error array the API returns on a failed call
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerError {
    pub error_code: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub fields: Vec<String>,
}

impl ServerError {
    /// Pull the first error entry out of a response body.
    ///
    /// The API answers with a JSON array of errors, occasionally a bare
    /// object. Anything else is reported as `HTTP_<status>` with the raw body.
    pub fn from_body(status: u16, body: &str) -> Self {
        if let Ok(mut errors) = serde_json::from_str::<Vec<ServerError>>(body) {
            if !errors.is_empty() {
                return errors.swap_remove(0);
            }
        }
        if let Ok(error) = serde_json::from_str::<ServerError>(body) {
            return error;
        }
        Self {
            error_code: format!("HTTP_{status}"),
            message: body.to_string(),
            fields: Vec::new(),
        }
    }
}

/// Turns a server error code into a typed [`Error`].
pub trait ErrorClassifier: Send + Sync {
    fn classify(&self, code: &str, message: &str, context: Option<&str>) -> Error;
}

/// Classifier for the codes control flow depends on; everything else is [`Error::Remote`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultClassifier;

impl ErrorClassifier for DefaultClassifier {
    fn classify(&self, code: &str, message: &str, context: Option<&str>) -> Error {
        match code {
            "QUERY_TOO_COMPLICATED" => Error::QueryTooComplicated {
                message: message.to_string(),
                context: context.map(str::to_string),
            },
            "NOT_FOUND" | "ENTITY_IS_DELETED" => Error::ObjectNotFound {
                context: context.unwrap_or(message).to_string(),
            },
            _ => Error::Remote {
                code: code.to_string(),
                message: message.to_string(),
                context: context.map(str::to_string),
            },
        }
    }
}
