//! Error types for the value codec.

/// Errors raised while converting values to or from the wire.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The value kind has no MySQL representation.
    #[error("Value of kind '{kind}' cannot be sent to MySQL")]
    UnsupportedValue {
        /// Kind of the rejected value.
        kind: &'static str,
    },

    /// A DECIMAL column returned text that is not a number.
    #[error("Malformed DECIMAL value: '{0}'")]
    MalformedDecimal(String),

    /// A list or map could not be serialized as JSON.
    #[error("JSON encoding error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for codec operations.
pub type Result<T> = std::result::Result<T, CodecError>;
