//! Allowlist HTML sanitizer for uploaded pages.
//!
//! Policy model: an explicit set of allowed tags, a per-tag attribute
//! allowlist, and a small global attribute set (`class`, `id`) that applies
//! everywhere. Anything else is rewritten out. The four script-bearing tags
//! (`script`, `iframe`, `object`, `embed`) are not deleted outright — they
//! become empty inert containers so naively-written pages degrade predictably
//! instead of losing layout slots. URL-bearing attributes are restricted to
//! `http`/`https`/`mailto` (plus `data:` for image sources).
//!
//! The whole thing is idempotent: sanitizing already-sanitized output is a
//! no-op.

use lol_html::html_content::ContentType;
use lol_html::{RewriteStrSettings, doc_comments, element, rewrite_str};
use std::collections::{HashMap, HashSet};

use super::upload_service::UploadError;

/// Static configuration for the sanitizer, supplied once at process start.
#[derive(Debug, Clone)]
pub struct SanitizerPolicy {
    allowed_tags: HashSet<&'static str>,
    tag_attributes: HashMap<&'static str, &'static [&'static str]>,
    global_attributes: HashSet<&'static str>,
    url_schemes: HashSet<&'static str>,
}

const ALLOWED_TAGS: &[&str] = &[
    "html", "head", "title", "body", "h1", "h2", "h3", "h4", "h5", "h6", "p", "div", "span", "a",
    "img", "ul", "ol", "li", "dl", "dt", "dd", "br", "hr", "strong", "em", "b", "i", "u", "small",
    "sub", "sup", "blockquote", "pre", "code", "table", "caption", "thead", "tbody", "tfoot", "tr",
    "th", "td", "section", "article", "header", "footer", "nav", "main", "aside", "figure",
    "figcaption",
];

const GLOBAL_ATTRIBUTES: &[&str] = &["class", "id"];

const URL_SCHEMES: &[&str] = &["http", "https", "mailto"];

/// Tags that can pull in executable content. Rewritten, not removed.
const INERT_REWRITES: &[(&str, &str)] = &[
    ("script", "span"),
    ("iframe", "div"),
    ("object", "div"),
    ("embed", "div"),
];

/// Disallowed tags whose content parses as raw text or RCDATA. Unwrapping
/// these would re-emit that text verbatim, where it becomes live markup on
/// the served page, so tag and content are dropped together.
const DROP_WITH_CONTENT: &[&str] = &[
    "style",
    "noscript",
    "xmp",
    "noembed",
    "noframes",
    "textarea",
    "plaintext",
];

impl Default for SanitizerPolicy {
    fn default() -> Self {
        let mut tag_attributes: HashMap<&'static str, &'static [&'static str]> = HashMap::new();
        tag_attributes.insert("a", &["href", "title", "rel", "target"]);
        tag_attributes.insert("img", &["src", "alt", "title", "width", "height"]);
        tag_attributes.insert("th", &["colspan", "rowspan"]);
        tag_attributes.insert("td", &["colspan", "rowspan"]);

        Self {
            allowed_tags: ALLOWED_TAGS.iter().copied().collect(),
            tag_attributes,
            global_attributes: GLOBAL_ATTRIBUTES.iter().copied().collect(),
            url_schemes: URL_SCHEMES.iter().copied().collect(),
        }
    }
}

impl SanitizerPolicy {
    fn attribute_allowed(&self, tag: &str, attr: &str) -> bool {
        if self.global_attributes.contains(attr) {
            return true;
        }
        self.tag_attributes
            .get(tag)
            .is_some_and(|attrs| attrs.contains(&attr))
    }

    /// Scheme gate for `href`/`src` values. Relative URLs pass; an explicit
    /// scheme must be on the allowlist. `data:` is tolerated on image
    /// sources only.
    fn url_allowed(&self, tag: &str, attr: &str, value: &str) -> bool {
        match extract_scheme(value) {
            None => true,
            Some(scheme) => {
                if scheme == "data" && tag == "img" && attr == "src" {
                    return true;
                }
                self.url_schemes.contains(scheme.as_str())
            }
        }
    }
}

/// Pull the scheme off a URL-ish value, if it has one.
///
/// ASCII whitespace and control bytes are stripped first, since browsers
/// ignore them inside scheme names (`java\tscript:` is still live).
fn extract_scheme(value: &str) -> Option<String> {
    let cleaned: String = value
        .chars()
        .filter(|c| !c.is_ascii_whitespace() && !c.is_ascii_control())
        .collect();
    for (idx, ch) in cleaned.char_indices() {
        match ch {
            ':' => return Some(cleaned[..idx].to_ascii_lowercase()),
            '/' | '?' | '#' => return None,
            _ => {}
        }
    }
    None
}

/// Rewrites untrusted HTML into the policy's safe subset.
///
/// Built once at startup and shared; `sanitize` never mutates state.
#[derive(Debug, Clone, Default)]
pub struct HtmlSanitizer {
    policy: SanitizerPolicy,
}

impl HtmlSanitizer {
    pub fn new(policy: SanitizerPolicy) -> Self {
        Self { policy }
    }

    /// Sanitize one document. Malformed markup degrades gracefully through
    /// the parser; only an internal rewriter fault is an error.
    pub fn sanitize(&self, raw: &str) -> Result<String, UploadError> {
        let policy = &self.policy;
        rewrite_str(
            raw,
            RewriteStrSettings {
                element_content_handlers: vec![element!("*", |el| {
                    let tag = el.tag_name();

                    if let Some(&(_, inert)) =
                        INERT_REWRITES.iter().find(|&&(from, _)| from == tag)
                    {
                        let names: Vec<String> =
                            el.attributes().iter().map(|a| a.name()).collect();
                        for name in names {
                            if !policy.global_attributes.contains(name.as_str()) {
                                el.remove_attribute(&name);
                            }
                        }
                        el.set_tag_name(inert)?;
                        el.set_inner_content("", ContentType::Text);
                        return Ok(());
                    }

                    if !policy.allowed_tags.contains(tag.as_str()) {
                        // Raw-text carriers go wholesale; for everything else
                        // the children are promoted so benign markup stays
                        // visible.
                        if DROP_WITH_CONTENT.contains(&tag.as_str()) {
                            el.remove();
                        } else {
                            el.remove_and_keep_content();
                        }
                        return Ok(());
                    }

                    let names: Vec<String> = el.attributes().iter().map(|a| a.name()).collect();
                    for name in names {
                        if !policy.attribute_allowed(&tag, &name) {
                            el.remove_attribute(&name);
                            continue;
                        }
                        if name == "href" || name == "src" {
                            if let Some(value) = el.get_attribute(&name) {
                                if !policy.url_allowed(&tag, &name, &value) {
                                    el.remove_attribute(&name);
                                }
                            }
                        }
                    }
                    Ok(())
                })],
                document_content_handlers: vec![doc_comments!(|c| {
                    c.remove();
                    Ok(())
                })],
                ..RewriteStrSettings::default()
            },
        )
        .map_err(|err| UploadError::Sanitization(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sanitizer() -> HtmlSanitizer {
        HtmlSanitizer::default()
    }

    #[test]
    fn script_becomes_inert_span() {
        let out = sanitizer().sanitize("<script>alert(1)</script>").unwrap();
        assert!(!out.contains("<script"));
        assert!(!out.contains("alert(1)"));
        assert!(out.contains("<span"));
    }

    #[test]
    fn script_keeps_only_global_attributes() {
        let out = sanitizer()
            .sanitize(r#"<script id="x" src="https://evil.example/a.js">1</script>"#)
            .unwrap();
        assert!(out.contains(r#"<span id="x">"#));
        assert!(!out.contains("src"));
    }

    #[test]
    fn iframe_becomes_div() {
        let out = sanitizer()
            .sanitize(r#"<iframe src="https://example.com"></iframe>"#)
            .unwrap();
        assert!(!out.contains("<iframe"));
        assert!(out.contains("<div"));
    }

    #[test]
    fn javascript_src_is_stripped() {
        let out = sanitizer()
            .sanitize(r#"<img src="javascript:alert(1)">"#)
            .unwrap();
        assert!(out.contains("<img"));
        assert!(!out.contains("javascript"));
    }

    #[test]
    fn obfuscated_scheme_is_still_stripped() {
        let out = sanitizer()
            .sanitize("<a href=\"java\tscript:alert(1)\">x</a>")
            .unwrap();
        assert!(!out.contains("script:"));
    }

    #[test]
    fn data_url_allowed_on_img_only() {
        let s = sanitizer();
        let img = s
            .sanitize(r#"<img src="data:image/png;base64,AAAA">"#)
            .unwrap();
        assert!(img.contains("data:image/png"));
        let link = s.sanitize(r#"<a href="data:text/html,hi">x</a>"#).unwrap();
        assert!(!link.contains("data:"));
    }

    #[test]
    fn relative_and_http_links_survive() {
        let s = sanitizer();
        let out = s
            .sanitize(r#"<a href="/about.html">a</a><a href="https://example.com">b</a>"#)
            .unwrap();
        assert!(out.contains(r#"href="/about.html""#));
        assert!(out.contains(r#"href="https://example.com""#));
    }

    #[test]
    fn unknown_tags_are_unwrapped() {
        let out = sanitizer()
            .sanitize("<marquee><b>hi</b></marquee>")
            .unwrap();
        assert!(!out.contains("marquee"));
        assert!(out.contains("<b>hi</b>"));
    }

    #[test]
    fn style_content_is_dropped() {
        let out = sanitizer()
            .sanitize("<style>body { display: none }</style><p>x</p>")
            .unwrap();
        assert!(!out.contains("display"));
        assert!(out.contains("<p>x</p>"));
    }

    #[test]
    fn raw_text_elements_are_dropped_with_their_content() {
        let s = sanitizer();
        let out = s
            .sanitize("<noscript><img src=x onerror=alert(1)></noscript>")
            .unwrap();
        assert!(!out.contains("onerror"));
        assert!(!out.contains("<img"));

        let out = s.sanitize("<xmp><script>alert(1)</script></xmp>").unwrap();
        assert!(!out.contains("script"));

        let out = s.sanitize("<textarea><b>x</b></textarea><p>y</p>").unwrap();
        assert!(!out.contains("<b>"));
        assert!(out.contains("<p>y</p>"));
    }

    #[test]
    fn disallowed_attributes_are_removed() {
        let out = sanitizer()
            .sanitize(r#"<p onclick="alert(1)" class="c" id="i">x</p>"#)
            .unwrap();
        assert!(!out.contains("onclick"));
        assert!(out.contains(r#"class="c""#));
        assert!(out.contains(r#"id="i""#));
    }

    #[test]
    fn comments_are_removed() {
        let out = sanitizer().sanitize("<p>a</p><!-- secret --><p>b</p>").unwrap();
        assert!(!out.contains("secret"));
    }

    #[test]
    fn sanitize_is_idempotent() {
        let s = sanitizer();
        let inputs = [
            "<h1>hi</h1>",
            "<script>alert(1)</script><p onclick=x>y</p>",
            r#"<div class="a"><marquee>m</marquee><img src="javascript:x"></div>"#,
            "<p>unclosed <b>bold",
            "<style>p{}</style><!-- c --><iframe src=//x></iframe>",
            "<noscript><img src=x onerror=alert(1)></noscript>",
            "<noframes><p>x</p></noframes><textarea><script>a</script></textarea>",
        ];
        for input in inputs {
            let once = s.sanitize(input).unwrap();
            let twice = s.sanitize(&once).unwrap();
            assert_eq!(once, twice, "not idempotent for {input:?}");
        }
    }
}
