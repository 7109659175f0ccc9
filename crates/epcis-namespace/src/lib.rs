//! C2 Namespace Resolver: tracks document-level and per-event XML
//! namespace prefix↔URI bindings, and exposes the effective set at any
//! point during a conversion. See `spec.md` §4.2.
//!
//! One resolver is created per conversion and threaded through the
//! parser, serializer, and event mapper (spec.md §9's replacement for the
//! source's process-wide singleton).

use std::collections::HashSet;

lazy_static::lazy_static! {
    /// Prefixes that are always recognized but never re-declared per event,
    /// because they are either XML-fundamental or identify the EPCIS
    /// schema itself.
    static ref PROTECTED_PREFIXES: HashSet<&'static str> =
        ["xml", "xsi", "xsd", "rdfs", "owl"].into_iter().collect();

    static ref PROTECTED_URIS: HashSet<&'static str> = [
        "http://www.w3.org/2001/XMLSchema-instance",
        "http://www.w3.org/2001/XMLSchema",
        "http://www.w3.org/2000/01/rdf-schema#",
        "http://www.w3.org/2002/07/owl#",
        "urn:epcglobal:epcis:xsd:1",
        "urn:epcglobal:epcis:xsd:2",
        "urn:epcglobal:epcis-query:xsd:1",
        "urn:epcglobal:epcis-query:xsd:2",
    ]
    .into_iter()
    .collect();
}

/// `cbvmda` is legitimately re-declared inside per-event ILMD even when it
/// is already bound at document scope, so it is exempt from the
/// already-at-document-scope suppression rule applied to every other
/// namespace (spec.md §4.2).
const CBVMDA_PREFIX: &str = "cbvmda";

#[derive(Debug, Clone, Default)]
struct Scope {
    prefix_to_uri: Vec<(String, String)>,
}

impl Scope {
    fn populate(&mut self, uri: &str, prefix: &str) {
        if self.prefix_to_uri.iter().any(|(p, u)| p == prefix && u == uri) {
            return;
        }
        self.prefix_to_uri.push((prefix.to_string(), uri.to_string()));
    }

    fn contains_uri(&self, uri: &str) -> bool {
        self.prefix_to_uri.iter().any(|(_, u)| u == uri)
    }

    fn all(&self) -> &[(String, String)] {
        &self.prefix_to_uri
    }
}

#[derive(Debug, Clone, Default)]
pub struct NamespaceResolver {
    document: Scope,
    event: Scope,
}

impl NamespaceResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `uri` to `prefix` at document scope. Invariant: prefixes are
    /// unique within a scope — the caller is responsible for not reusing a
    /// prefix for two different URIs within the same document.
    pub fn populate_document(&mut self, uri: &str, prefix: &str) {
        self.document.populate(uri, prefix);
    }

    /// Binds `uri` to `prefix` at event scope, for the event currently
    /// being processed.
    pub fn populate_event(&mut self, uri: &str, prefix: &str) {
        self.event.populate(uri, prefix);
    }

    pub fn all_document(&self) -> &[(String, String)] {
        self.document.all()
    }

    pub fn all_event(&self) -> &[(String, String)] {
        self.event.all()
    }

    /// Clears event-scope bindings after an event has been fully emitted.
    pub fn reset_event(&mut self) {
        self.event = Scope::default();
    }

    /// Clears all bindings at document end.
    pub fn reset_all(&mut self) {
        self.document = Scope::default();
        self.event = Scope::default();
    }

    /// The namespace bindings this resolver implies are already visible at
    /// a given point: document scope plus whatever has been populated for
    /// the current event.
    pub fn effective(&self) -> impl Iterator<Item = (&str, &str)> {
        self.document
            .all()
            .iter()
            .chain(self.event.all().iter())
            .map(|(p, u)| (p.as_str(), u.as_str()))
    }

    /// The event-scope namespace declarations that should actually be
    /// emitted on the wire: protected prefixes are never re-emitted, and
    /// any URI already bound at document scope is suppressed unless its
    /// prefix is `cbvmda` (spec.md §4.2).
    pub fn event_scope_for_emission(&self) -> Vec<(&str, &str)> {
        self.event
            .all()
            .iter()
            .filter(|(prefix, uri)| {
                if PROTECTED_PREFIXES.contains(prefix.as_str()) || PROTECTED_URIS.contains(uri.as_str()) {
                    return false;
                }
                if prefix == CBVMDA_PREFIX {
                    return true;
                }
                !self.document.contains_uri(uri)
            })
            .map(|(p, u)| (p.as_str(), u.as_str()))
            .collect()
    }

    pub fn is_protected_prefix(prefix: &str) -> bool {
        PROTECTED_PREFIXES.contains(prefix)
    }

    pub fn is_protected_uri(uri: &str) -> bool {
        PROTECTED_URIS.contains(uri)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn event_scope_suppresses_uris_already_at_document_scope() {
        let mut resolver = NamespaceResolver::new();
        resolver.populate_document("https://example.com/ext/", "ext");
        resolver.populate_event("https://example.com/ext/", "ext");
        resolver.populate_event("https://example.com/new/", "new1");

        let emitted = resolver.event_scope_for_emission();
        assert_eq!(emitted, vec![("new1", "https://example.com/new/")]);
    }

    #[test]
    fn cbvmda_is_exempt_from_document_scope_suppression() {
        let mut resolver = NamespaceResolver::new();
        resolver.populate_document("urn:epcglobal:cbv:mda", "cbvmda");
        resolver.populate_event("urn:epcglobal:cbv:mda", "cbvmda");

        let emitted = resolver.event_scope_for_emission();
        assert_eq!(emitted, vec![("cbvmda", "urn:epcglobal:cbv:mda")]);
    }

    #[test]
    fn protected_prefixes_are_never_emitted_per_event() {
        let mut resolver = NamespaceResolver::new();
        resolver.populate_event("http://www.w3.org/2001/XMLSchema-instance", "xsi");
        assert!(resolver.event_scope_for_emission().is_empty());
    }

    #[test]
    fn reset_event_clears_only_the_event_scope() {
        let mut resolver = NamespaceResolver::new();
        resolver.populate_document("https://example.com/ext/", "ext");
        resolver.populate_event("https://example.com/other/", "other");
        resolver.reset_event();
        assert_eq!(resolver.all_event().len(), 0);
        assert_eq!(resolver.all_document().len(), 1);
    }
}
