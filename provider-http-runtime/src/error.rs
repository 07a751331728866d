//! The error taxonomy from the component design: each variant maps to one
//! row of the error-handling table and drives a specific status/retry
//! transition in the reconcilers.
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// A jq template failed to parse or evaluate.
    #[error("failed to generate request: {0}")]
    Template(#[from] httpjq::Error),

    /// A templated URL didn't parse as `scheme://host/...`.
    #[error("invalid url {0}")]
    InvalidUrl(String),

    /// Neither `action` nor `method` resolved to a concrete HTTP method.
    #[error("no method specified")]
    NoMethod,

    /// The declared mapping for this action doesn't exist.
    #[error("{0}")]
    MissingMapping(String),

    /// DNS/TLS/timeout/connection failure — the call never got a response.
    #[error("transport error: {0}")]
    Transport(String),

    /// The call completed but the server returned a 4xx/5xx.
    #[error("HTTP {method} request failed with status code {status}")]
    HttpStatus { method: String, status: u16 },

    /// The response didn't satisfy `expectedResponseCheck`/`expectedResponse`.
    #[error("response does not match expected criteria")]
    ResponseNotExpected,

    /// A secret reference or key inside it could not be resolved.
    #[error("secret {namespace}/{name} does not contain key {key}")]
    MissingSecretKey {
        namespace: String,
        name: String,
        key: String,
    },

    /// The secret store lookup itself failed (not found, access denied, ...).
    #[error("failed to resolve secret {0}/{1}: {2}")]
    SecretResolution(String, String, String),

    /// TLS material failed to parse into a usable client configuration.
    #[error("{0}")]
    TlsConfig(String),

    /// The DEFAULT `IsUpToDate` check needed to compare JSON bodies, but the
    /// observed response body didn't parse as one.
    #[error("response body is not a valid JSON string: {0}")]
    InvalidResponseBody(String),

    /// A CUSTOM check's `logic` expression didn't evaluate to a bool.
    #[error("{field} JQ filter should return a boolean, but returned error: {detail}")]
    CustomCheckNotBool { field: String, detail: String },

    /// Kubernetes API call (status update, secret create/update) failed.
    #[error("kube api error: {0}")]
    Kube(#[from] kube::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
