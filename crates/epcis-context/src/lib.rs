//! C3 Context Handler Registry: interprets and produces the JSON-LD
//! `@context` array. See `spec.md` §4.3.
//!
//! Generalizes the teacher's first-match dispatch (compare
//! `parser::format::parser_for`'s `match` over a closed format set) into an
//! explicit, registration-time list of handlers rather than a hardcoded
//! `match` — spec.md §9 calls for "a small registry trait... no hidden
//! plugin loading", so handlers are registered by the caller, not
//! discovered via any service-lookup mechanism.

use epcis_model::ContextBinding;
use epcis_namespace::NamespaceResolver;

/// A pluggable interpreter/producer of the `@context` array. Exactly one
/// handler is selected per document: the first whose [`ContextHandler::matches`]
/// returns true, falling back to the default handler (spec.md §4.3).
pub trait ContextHandler: Send + Sync {
    /// The canonical context URL this handler emits as the first `@context`
    /// entry when producing JSON output.
    fn canonical_url(&self) -> &str;

    /// Whether `context`'s first entry (an already-parsed document's
    /// `@context` array) binds to this handler.
    fn matches(&self, context: &ContextBinding) -> bool {
        context.canonical_url() == Some(self.canonical_url())
    }

    /// Builds the `@context` array for JSON output: the canonical URL plus
    /// any of `doc_namespaces` not already implied by the URL itself.
    fn build_context(&self, doc_namespaces: &[(String, String)]) -> ContextBinding {
        let mut binding = ContextBinding::default();
        binding
            .entries
            .push(epcis_model::ContextEntry::CanonicalUrl(self.canonical_url().to_string()));
        for (prefix, uri) in doc_namespaces {
            if !self.implies(prefix, uri) {
                binding.push_namespace(prefix.clone(), uri.clone());
            }
        }
        binding
    }

    /// Whether this handler's canonical context already implies the given
    /// prefix↔URI binding (and so it must not be redundantly declared).
    fn implies(&self, _prefix: &str, _uri: &str) -> bool {
        false
    }

    /// Populates `resolver` with the document-scope namespaces this
    /// handler's canonical context implies, when parsing JSON input into
    /// XML output.
    fn populate_namespaces(&self, _resolver: &mut NamespaceResolver) {}

    /// The `GS1-Extensions` header token that selects this handler when
    /// producing output (spec.md §6). `None` for the default handler.
    fn extension_token(&self) -> Option<&str> {
        None
    }
}

/// The EPCIS 2.0 canonical JSON-LD context. Implies the standard
/// `cbvmda` business-vocabulary namespace without it ever appearing as a
/// separate `@context` entry.
pub struct DefaultContextHandler;

const EPCIS_2_0_CONTEXT_URL: &str = "https://ref.gs1.org/standards/epcis/2.0.0/epcis-context.jsonld";
const CBVMDA_URI: &str = "urn:epcglobal:cbv:mda";

impl ContextHandler for DefaultContextHandler {
    fn canonical_url(&self) -> &str {
        EPCIS_2_0_CONTEXT_URL
    }

    fn implies(&self, prefix: &str, uri: &str) -> bool {
        prefix == "cbvmda" && uri == CBVMDA_URI
    }

    fn populate_namespaces(&self, resolver: &mut NamespaceResolver) {
        resolver.populate_document(CBVMDA_URI, "cbvmda");
    }
}

/// A GS1-region context variant, selected via the `GS1-Extensions` header
/// (spec.md §6) rather than by inspecting the document itself when
/// producing output; when parsing, it is selected the normal way, by its
/// canonical URL appearing first in `@context`.
pub struct RegionContextHandler {
    pub extension_token: &'static str,
    pub canonical_url: &'static str,
    pub implied_namespaces: &'static [(&'static str, &'static str)],
}

impl ContextHandler for RegionContextHandler {
    fn canonical_url(&self) -> &str {
        self.canonical_url
    }

    fn implies(&self, prefix: &str, uri: &str) -> bool {
        self.implied_namespaces.iter().any(|(p, u)| *p == prefix && *u == uri)
    }

    fn populate_namespaces(&self, resolver: &mut NamespaceResolver) {
        for (prefix, uri) in self.implied_namespaces {
            resolver.populate_document(uri, prefix);
        }
    }

    fn extension_token(&self) -> Option<&str> {
        Some(self.extension_token)
    }
}

/// A national healthcare profile, named in spec.md §4.3's rationale as the
/// motivating example of a region context that "must round-trip without
/// leaking into document scope".
pub const GS1_EGYPT_HEALTHCARE: RegionContextHandler = RegionContextHandler {
    extension_token: "gs1egypthc",
    canonical_url: "https://ref.gs1.org/standards/epcis/2.0.0/epcis-context-gs1egypthc.jsonld",
    implied_namespaces: &[("gs1egypthc", "https://ref.gs1.org/gs1egypthc/")],
};

/// First-match-wins registry of [`ContextHandler`]s, with the default
/// handler always registered last as the fallback.
pub struct ContextHandlerRegistry {
    handlers: Vec<Box<dyn ContextHandler>>,
    default: Box<dyn ContextHandler>,
}

impl ContextHandlerRegistry {
    pub fn new(default: Box<dyn ContextHandler>) -> Self {
        ContextHandlerRegistry { handlers: Vec::new(), default }
    }

    pub fn with_builtin_handlers() -> Self {
        let mut registry = ContextHandlerRegistry::new(Box::new(DefaultContextHandler));
        registry.register(Box::new(GS1_EGYPT_HEALTHCARE));
        registry
    }

    pub fn register(&mut self, handler: Box<dyn ContextHandler>) {
        self.handlers.push(handler);
    }

    /// Selects the handler whose namespaces match `context`, when parsing
    /// JSON input (spec.md §4.3 rule 1).
    pub fn select_for_parsing(&self, context: &ContextBinding) -> &dyn ContextHandler {
        self.handlers
            .iter()
            .find(|h| h.matches(context))
            .map(|h| h.as_ref())
            .unwrap_or(self.default.as_ref())
    }

    /// Selects the handler to use when producing JSON output, driven by the
    /// `GS1-Extensions` header token rather than document inspection.
    pub fn select_for_building(&self, extension_token: Option<&str>) -> &dyn ContextHandler {
        match extension_token {
            Some(token) => self
                .handlers
                .iter()
                .find(|h| h.extension_token() == Some(token))
                .map(|h| h.as_ref())
                .unwrap_or(self.default.as_ref()),
            None => self.default.as_ref(),
        }
    }
}
