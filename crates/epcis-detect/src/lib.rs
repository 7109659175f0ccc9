//! C1 Prefix Scanner: detects the EPCIS schema version from a bounded
//! prefix of the input without moving the caller's logical stream
//! position. See `spec.md` §4.1.

use std::io::{Read, Seek, SeekFrom};

use epcis_model::Version;
use regex::Regex;

/// Read budget: the scanner gives up after this many bytes regardless of
/// whether a match was found.
const MAX_SCAN_BYTES: usize = 1_000_000;
/// The scanner grows its read window this many bytes at a time, so a match
/// near the start of the input is found (and the stream reset) cheaply.
const SCAN_INCREMENT: usize = 64;

#[derive(Debug, thiserror::Error)]
pub enum DetectError {
    #[error("schemaVersion attribute not found within scan budget")]
    UnknownVersion,
    #[error("unsupported schema version: {0}")]
    UnsupportedVersion(String),
    #[error("failed to read from input: {0}")]
    Io(#[from] std::io::Error),
}

lazy_static::lazy_static! {
    // Matches both XML (`schemaVersion="2.0"`) and JSON (`"schemaVersion":"2.0"`)
    // spellings with a single pattern: an optional quote around the attribute
    // name, `=` or `:`, optional whitespace/quote, then the version literal.
    static ref SCHEMA_VERSION_RE: Regex =
        Regex::new(r#"schemaVersion["']?\s*[:=]\s*["']?(\d+\.\d+(?:\.\d+)?)"#).unwrap();
}

/// Scans `reader` for a `schemaVersion` attribute, returning the detected
/// [`Version`]. `reader` is always left at the position it started from,
/// whether the scan succeeds or fails — this is the "resettable byte
/// stream" contract of spec.md §4.1.
#[tracing::instrument(level = "debug", skip(reader))]
pub fn scan_version<R: Read + Seek>(reader: &mut R) -> Result<Version, DetectError> {
    let start = reader.stream_position()?;
    let result = scan_inner(reader);
    reader.seek(SeekFrom::Start(start))?;
    result
}

fn scan_inner<R: Read>(reader: &mut R) -> Result<Version, DetectError> {
    let mut buf = Vec::with_capacity(SCAN_INCREMENT);
    let mut chunk = [0u8; SCAN_INCREMENT];

    loop {
        let read = reader.read(&mut chunk)?;
        if read == 0 {
            tracing::debug!(scanned = buf.len(), "reached end of input without a match");
            return Err(DetectError::UnknownVersion);
        }
        buf.extend_from_slice(&chunk[..read]);

        if let Some(captures) = SCHEMA_VERSION_RE.captures(&String::from_utf8_lossy(&buf)) {
            let literal = captures.get(1).unwrap().as_str();
            return Version::parse(literal).ok_or_else(|| {
                tracing::warn!(literal, "schemaVersion literal is not a supported version");
                DetectError::UnsupportedVersion(literal.to_string())
            });
        }

        if buf.len() >= MAX_SCAN_BYTES {
            tracing::debug!(scanned = buf.len(), "exhausted scan budget without a match");
            return Err(DetectError::UnknownVersion);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn detects_json_schema_version() {
        let mut input = Cursor::new(br#"{"@context":[],"schemaVersion":"2.0","type":"EPCISDocument"}"#.to_vec());
        assert_eq!(scan_version(&mut input).unwrap(), Version::V2_0);
    }

    #[test]
    fn detects_xml_schema_version() {
        let mut input = Cursor::new(
            br#"<epcis:EPCISDocument xmlns:epcis="urn:epcglobal:epcis:xsd:1" schemaVersion="1.2" creationDate="x">"#
                .to_vec(),
        );
        assert_eq!(scan_version(&mut input).unwrap(), Version::V1_2);
    }

    #[test]
    fn does_not_move_the_caller_logical_position() {
        let mut input = Cursor::new(br#"{"schemaVersion":"2.0"}"#.to_vec());
        input.set_position(3);
        scan_version(&mut input).unwrap();
        assert_eq!(input.position(), 3);
    }

    #[test]
    fn reset_happens_on_failure_too() {
        let mut input = Cursor::new(b"no version attribute here at all".to_vec());
        input.set_position(5);
        let err = scan_version(&mut input).unwrap_err();
        assert!(matches!(err, DetectError::UnknownVersion));
        assert_eq!(input.position(), 5);
    }

    #[test]
    fn unsupported_version_literal_is_rejected() {
        let mut input = Cursor::new(br#"{"schemaVersion":"3.1"}"#.to_vec());
        let err = scan_version(&mut input).unwrap_err();
        assert!(matches!(err, DetectError::UnsupportedVersion(v) if v == "3.1"));
    }
}
