use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::report::text::lenient_opt_text;

pub const PDF_FALLBACK_TITLE: &str = "PDF Reference";
pub const SOURCE_FALLBACK_TITLE: &str = "Source";

/// A citation entry from a report's shared `references` list.
/// Inline references may carry only a url.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    #[serde(default, deserialize_with = "lenient_opt_text", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_text", skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_text", skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Reference {
    /// Stand-in for a url that no reference entry describes.
    pub fn fallback(url: &str) -> Self {
        let title = if url.to_ascii_lowercase().ends_with(".pdf") {
            PDF_FALLBACK_TITLE
        } else {
            SOURCE_FALLBACK_TITLE
        };
        Self {
            id: None,
            title: Some(title.to_string()),
            url: Some(url.to_string()),
        }
    }

    /// Label shown on a reference chip.
    pub fn display_title(&self) -> &str {
        self.title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(SOURCE_FALLBACK_TITLE)
    }
}

/// Resolve a field's reference pointers against the report's reference list.
///
/// Ids are resolved first, in order; then urls, in order. A url is emitted at
/// most once, whether it came from an id match, a url match or a synthesized
/// fallback. Ids without a matching reference are dropped. Blank pointers are
/// ignored.
pub fn resolve_references(ids: &[String], urls: &[String], references: &[Reference]) -> Vec<Reference> {
    let mut resolved = Vec::new();
    if ids.is_empty() && urls.is_empty() {
        return resolved;
    }

    let mut seen_ids: HashSet<&str> = HashSet::new();
    let mut seen_urls: HashSet<String> = HashSet::new();

    for id in ids.iter().map(|id| id.trim()).filter(|id| !id.is_empty()) {
        if !seen_ids.insert(id) {
            continue;
        }
        let Some(reference) = references.iter().find(|r| r.id.as_deref() == Some(id)) else {
            continue;
        };
        if let Some(url) = &reference.url {
            // Two ids pointing at one document still yield a single chip.
            if !seen_urls.insert(url.clone()) {
                continue;
            }
        }
        resolved.push(reference.clone());
    }

    for url in urls.iter().map(|url| url.trim()).filter(|url| !url.is_empty()) {
        if !seen_urls.insert(url.to_string()) {
            continue;
        }
        match references.iter().find(|r| r.url.as_deref() == Some(url)) {
            Some(reference) => resolved.push(reference.clone()),
            None => resolved.push(Reference::fallback(url)),
        }
    }

    resolved
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::{Reference, resolve_references};

    fn reference(id: Option<&str>, title: Option<&str>, url: Option<&str>) -> Reference {
        Reference {
            id: id.map(str::to_string),
            title: title.map(str::to_string),
            url: url.map(str::to_string),
        }
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn no_pointers_resolve_to_nothing() {
        let refs = vec![reference(Some("a"), Some("Act X"), Some("http://x"))];
        assert!(resolve_references(&[], &[], &refs).is_empty());
    }

    #[test]
    fn id_match_suppresses_the_same_url() {
        let act = reference(Some("a"), Some("Act X"), Some("http://x/y.pdf"));
        let resolved = resolve_references(&strings(&["a"]), &strings(&["http://x/y.pdf"]), &[act.clone()]);
        assert_eq!(resolved, vec![act]);
    }

    #[test]
    fn unknown_pdf_url_gets_pdf_fallback() {
        let resolved = resolve_references(&[], &strings(&["http://z/doc.pdf"]), &[]);
        assert_eq!(
            resolved,
            vec![reference(None, Some("PDF Reference"), Some("http://z/doc.pdf"))]
        );
    }

    #[test]
    fn unknown_html_url_gets_source_fallback() {
        let resolved = resolve_references(&[], &strings(&["https://indiankanoon.org/doc/1/"]), &[]);
        assert_eq!(resolved[0].title.as_deref(), Some("Source"));
    }

    #[test]
    fn pdf_detection_ignores_case() {
        let resolved = resolve_references(&[], &strings(&["http://z/DOC.PDF"]), &[]);
        assert_eq!(resolved[0].title.as_deref(), Some("PDF Reference"));
    }

    #[test]
    fn url_only_references_are_matched_by_url() {
        let inline = reference(None, Some("Notification 2023"), Some("http://gov/notif"));
        let resolved = resolve_references(&[], &strings(&["http://gov/notif"]), &[inline.clone()]);
        assert_eq!(resolved, vec![inline]);
    }

    #[test]
    fn ids_precede_urls_and_duplicates_are_dropped() {
        let refs = vec![
            reference(Some("r1"), Some("ID Act"), Some("http://a")),
            reference(Some("r2"), Some("Wages Code"), Some("http://b")),
            reference(None, Some("Circular"), Some("http://c")),
        ];
        let resolved = resolve_references(
            &strings(&["r2", "missing", "r1", "r2"]),
            &strings(&["http://c", "http://a", "http://d.pdf", "http://c", "http://d.pdf"]),
            &refs,
        );
        let titles: Vec<&str> = resolved.iter().map(|r| r.display_title()).collect();
        assert_eq!(titles, vec!["Wages Code", "ID Act", "Circular", "PDF Reference"]);

        let urls: Vec<&str> = resolved.iter().filter_map(|r| r.url.as_deref()).collect();
        let unique: HashSet<&str> = urls.iter().copied().collect();
        assert_eq!(urls.len(), unique.len());
    }

    #[test]
    fn distinct_ids_sharing_a_url_yield_one_entry() {
        let refs = vec![
            reference(Some("s25f"), Some("Section 25F"), Some("http://ida.pdf")),
            reference(Some("s25n"), Some("Section 25N"), Some("http://ida.pdf")),
        ];
        let resolved = resolve_references(&strings(&["s25f", "s25n"]), &[], &refs);
        assert_eq!(resolved, vec![refs[0].clone()]);
    }

    #[test]
    fn unmatched_ids_alone_resolve_to_empty() {
        let refs = vec![reference(Some("a"), Some("Act"), None)];
        assert!(resolve_references(&strings(&["b"]), &[], &refs).is_empty());
    }

    #[test]
    fn blank_pointers_are_ignored() {
        let resolved = resolve_references(&strings(&["  "]), &strings(&["", " "]), &[]);
        assert!(resolved.is_empty());
    }

    #[test]
    fn untitled_reference_displays_as_source() {
        assert_eq!(reference(Some("a"), Some(" "), None).display_title(), "Source");
    }
}
