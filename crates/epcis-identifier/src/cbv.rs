//! CBV (Core Business Vocabulary) code translation: URN form
//! (`urn:epcglobal:cbv:bizstep:shipping`) ↔ Web-URI form
//! (`https://ref.gs1.org/cbv/BizStep-shipping`) — spec.md §4.4's closing
//! paragraph, "CBV codes ... follow an analogous URN-form ↔ Web-URI-form
//! table" to the identifier table above it.
//!
//! Only the four CBV vocabularies the Event model actually carries are
//! covered: business step, disposition, business-transaction type, and
//! source/destination type. Unknown codes pass through unchanged, in
//! keeping with `No_Preference`/`Never_Translates` being the default for
//! any code this table doesn't recognize.

/// One `(urn_suffix, web_uri_segment)` pair for a CBV vocabulary, e.g.
/// `("shipping", "BizStep-shipping")` under the `bizstep` vocabulary.
struct Vocabulary {
    urn_prefix: &'static str,
    web_prefix: &'static str,
    segment_label: &'static str,
}

const BIZSTEP: Vocabulary =
    Vocabulary { urn_prefix: "urn:epcglobal:cbv:bizstep:", web_prefix: "https://ref.gs1.org/cbv/BizStep-", segment_label: "BizStep-" };
const DISPOSITION: Vocabulary =
    Vocabulary { urn_prefix: "urn:epcglobal:cbv:disp:", web_prefix: "https://ref.gs1.org/cbv/Disp-", segment_label: "Disp-" };
const BIZTRANSACTION: Vocabulary = Vocabulary {
    urn_prefix: "urn:epcglobal:cbv:btt:",
    web_prefix: "https://ref.gs1.org/cbv/BTT-",
    segment_label: "BTT-",
};
const SOURCE_DEST: Vocabulary =
    Vocabulary { urn_prefix: "urn:epcglobal:cbv:sdt:", web_prefix: "https://ref.gs1.org/cbv/SDT-", segment_label: "SDT-" };

const VOCABULARIES: &[Vocabulary] = &[BIZSTEP, DISPOSITION, BIZTRANSACTION, SOURCE_DEST];

/// Rewrites a CBV code from URN form to Web-URI form. Returns the input
/// unchanged if it does not match any known vocabulary's URN prefix
/// (passthrough, matching the Identifier Transcoder's `No_Preference`
/// behavior for unrecognized values).
pub fn cbv_to_web_uri(code: &str) -> String {
    for vocab in VOCABULARIES {
        if let Some(suffix) = code.strip_prefix(vocab.urn_prefix) {
            return format!("{}{}", vocab.web_prefix, suffix);
        }
    }
    code.to_string()
}

/// Rewrites a CBV code from Web-URI form to URN form.
pub fn cbv_to_urn(code: &str) -> String {
    for vocab in VOCABULARIES {
        if let Some(suffix) = code.strip_prefix(vocab.web_prefix) {
            return format!("{}{}", vocab.urn_prefix, suffix);
        }
        // Tolerate the alternate `.../cbv/BizStep-shipping` vs
        // `.../cbv/bizstep/shipping` spellings some producers emit by also
        // matching on the bare segment label.
        if let Some(idx) = code.find(vocab.segment_label) {
            let suffix = &code[idx + vocab.segment_label.len()..];
            return format!("{}{}", vocab.urn_prefix, suffix);
        }
    }
    code.to_string()
}
