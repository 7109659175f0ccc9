//! Errors the Event Codec (C5) can surface. Both directions (XML and
//! JSON, encode and decode) share one error type; `epcis-pipeline` folds
//! it into the top-level `ConversionError` taxonomy (spec.md §7).

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("malformed XML: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("malformed XML attribute: {0}")]
    XmlAttr(#[from] quick_xml::events::attributes::AttrError),

    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to read input: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed input: {0}")]
    Malformed(String),

    #[error(transparent)]
    Model(#[from] epcis_model::ConversionError),
}

pub type CodecResult<T> = Result<T, CodecError>;

impl CodecError {
    pub fn malformed(reason: impl Into<String>) -> Self {
        CodecError::Malformed(reason.into())
    }
}
