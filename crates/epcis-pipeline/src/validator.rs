//! Pluggable per-event validator. XSD/JSON-Schema validation itself is out
//! of scope (spec.md §1: "invoked as a pluggable validator trait"); this
//! crate only defines the seam a caller's validator plugs into, the way
//! `epcis-context::ContextHandler` defines a seam for `@context`
//! interpretation rather than implementing one itself.

use epcis_model::Event;

/// Runs against one decoded, transformed, identifier-rewritten event
/// before it reaches the collector. Whether a failure aborts the
/// conversion or is skipped is `ConversionSpec::on_failure`'s call, not
/// this trait's (spec.md §4.9).
pub trait Validator {
    fn validate(&self, event: &Event) -> Result<(), String>;
}
