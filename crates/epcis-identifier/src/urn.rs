//! Parsing and building of EPC URNs and GS1 Digital Link Web URIs
//! (spec.md §4.4).

use epcis_model::ConversionError;

fn invalid(value: &str, reason: &str) -> ConversionError {
    ConversionError::InvalidIdentifier { value: value.to_string(), reason: reason.to_string() }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrnNamespace {
    Id,
    IdPat,
    Class,
}

#[derive(Debug, Clone)]
pub struct ParsedUrn {
    pub namespace: UrnNamespace,
    pub scheme: String,
    pub components: Vec<String>,
}

/// Splits an `urn:epc:{id,idpat,class}:<scheme>:<dot-separated components>`
/// string into its parts. An `idpat` URN's trailing `*` component is
/// consumed into `namespace` rather than kept in `components`.
pub fn parse_urn(urn: &str) -> Result<ParsedUrn, ConversionError> {
    let rest = urn.strip_prefix("urn:epc:").ok_or_else(|| invalid(urn, "missing urn:epc: prefix"))?;
    let (namespace, rest) = if let Some(r) = rest.strip_prefix("id:") {
        (UrnNamespace::Id, r)
    } else if let Some(r) = rest.strip_prefix("idpat:") {
        (UrnNamespace::IdPat, r)
    } else if let Some(r) = rest.strip_prefix("class:") {
        (UrnNamespace::Class, r)
    } else {
        return Err(invalid(urn, "unrecognized urn:epc: namespace"));
    };
    let mut parts = rest.splitn(2, ':');
    let scheme = parts.next().filter(|s| !s.is_empty()).ok_or_else(|| invalid(urn, "missing scheme"))?;
    let tail = parts.next().ok_or_else(|| invalid(urn, "missing identifier components"))?;
    let mut components: Vec<String> = tail.split('.').map(|s| s.to_string()).collect();
    if namespace == UrnNamespace::IdPat {
        if components.last().map(String::as_str) != Some("*") {
            return Err(invalid(urn, "idpat identifier must end in '*'"));
        }
        components.pop();
    }
    Ok(ParsedUrn { namespace, scheme: scheme.to_string(), components })
}

pub fn build_urn(namespace: UrnNamespace, scheme: &str, components: &[String]) -> String {
    let joined = components.join(".");
    match namespace {
        UrnNamespace::Id => format!("urn:epc:id:{scheme}:{joined}"),
        UrnNamespace::Class => format!("urn:epc:class:{scheme}:{joined}"),
        UrnNamespace::IdPat => format!("urn:epc:idpat:{scheme}:{joined}.*"),
    }
}

pub const DEFAULT_HOST: &str = "https://id.gs1.org";

#[derive(Debug, Clone)]
pub struct ParsedWebUri {
    pub host: String,
    pub segments: Vec<(String, String)>,
}

/// Splits a GS1 Digital Link Web URI into its host and `(AI, value)` path
/// segment pairs, in document order.
pub fn parse_web_uri(uri: &str) -> Result<ParsedWebUri, ConversionError> {
    let (scheme, rest) = uri.split_once("://").ok_or_else(|| invalid(uri, "not an absolute URL"))?;
    let (host, path) = rest.split_once('/').ok_or_else(|| invalid(uri, "URL has no path"))?;
    let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if parts.is_empty() || parts.len() % 2 != 0 {
        return Err(invalid(uri, "path is not a sequence of AI/value pairs"));
    }
    let segments = parts.chunks_exact(2).map(|c| (c[0].to_string(), c[1].to_string())).collect();
    Ok(ParsedWebUri { host: format!("{scheme}://{host}"), segments })
}

/// Builds a canonical Web URI from AI/value pairs, always under
/// [`DEFAULT_HOST`] — this converter only ever produces its own canonical
/// form, never echoes a caller-supplied resolver host.
pub fn build_web_uri(pairs: &[(&str, &str)]) -> String {
    let mut uri = DEFAULT_HOST.to_string();
    for (ai, value) in pairs {
        uri.push('/');
        uri.push_str(ai);
        uri.push('/');
        uri.push_str(value);
    }
    uri
}
