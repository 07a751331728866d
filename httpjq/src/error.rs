use thiserror::Error;

/// Errors produced while compiling or evaluating a query expression.
#[derive(Debug, Error)]
pub enum Error {
    /// The expression failed to parse or compile.
    #[error("failed to parse given mapping - {expr} jq error: {detail}")]
    Parse {
        /// The offending expression.
        expr: String,
        /// The underlying parser/compiler message.
        detail: String,
    },

    /// Evaluation failed at runtime (e.g. indexing into a non-object).
    #[error("failed to parse given mapping - {expr} jq error: {detail}")]
    Eval {
        /// The offending expression.
        expr: String,
        /// The underlying evaluation message.
        detail: String,
    },

    /// The query produced no output at all.
    #[error("query should return at least one value")]
    NoResult,

    /// The query produced a value, but not a string where one was required.
    #[error("failed to parse string: {0}")]
    NotAString(serde_json::Value),

    /// The query produced a value, but not an object where one was required.
    #[error("failed to parse map: {0}")]
    NotAMap(serde_json::Value),

    /// The query produced a value, but not a bool where one was required.
    #[error("failed to parse bool: {0}")]
    NotABool(serde_json::Value),
}
