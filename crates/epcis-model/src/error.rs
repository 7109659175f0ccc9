/// Closed taxonomy of failures the conversion pipeline can surface.
///
/// Every variant here corresponds to an error code in the spec's error
/// taxonomy; callers should match on these, not on `Display` text.
#[derive(Debug, thiserror::Error)]
pub enum ConversionError {
    #[error("schemaVersion attribute not found within scan budget")]
    UnknownVersion,

    #[error("unsupported schema version: {0}")]
    UnsupportedVersion(String),

    #[error("no conversion plan for {from_format:?} {from_version} -> {to_format:?} {to_version}")]
    UnsupportedConversion {
        from_format: crate::spec::Format,
        from_version: crate::spec::Version,
        to_format: crate::spec::Format,
        to_version: crate::spec::Version,
    },

    #[error("unsupported media type: {0}")]
    UnsupportedMediaType(String),

    #[error("malformed input: {0}")]
    MalformedInput(String),

    #[error("invalid identifier '{value}': {reason}")]
    InvalidIdentifier { value: String, reason: String },

    #[error("GCP length could not be inferred for '{0}' and none was provided")]
    UnknownGcpLength(String),

    #[error("validation failed for event #{sequence}: {reason}")]
    ValidationFailed { sequence: u64, reason: String },

    #[error("upstream stalled: no chunk received within the timeout")]
    UpstreamStalled,

    #[error("conversion aborted by caller")]
    ConversionAborted,
}

pub type ConversionResult<T> = Result<T, ConversionError>;
