use regex::{Captures, Regex};
use std::sync::OnceLock;
use url::Url;

use crate::protocol::{SlideCoordinate, SourceposRecord};

/// Meta tag carrying the directory relative assets resolve against
pub const META_BASE_URI: &str = "document-base-uri";
/// Meta tag carrying the render's reload identifier
pub const META_RELOAD_ID: &str = "reload-id";
/// Meta tag carrying the `h,v` slide to restore after loading
pub const META_SLIDE_INDICES: &str = "slide-indices";
/// Attribute pandoc's `sourcepos` extension writes on generated elements
pub const POSITION_ATTRIBUTE: &str = "data-pos";

fn meta_regex() -> &'static Regex {
    static META_REGEX: OnceLock<Regex> = OnceLock::new();
    META_REGEX.get_or_init(|| Regex::new(r"(?i)<meta\b([^>]*)>").expect("Invalid meta regex"))
}

fn attribute_regex() -> &'static Regex {
    static ATTRIBUTE_REGEX: OnceLock<Regex> = OnceLock::new();
    ATTRIBUTE_REGEX.get_or_init(|| {
        Regex::new(r#"([A-Za-z_:][-A-Za-z0-9_:.]*)\s*=\s*(?:"([^"]*)"|'([^']*)')"#)
            .expect("Invalid attribute regex")
    })
}

fn asset_regex() -> &'static Regex {
    static ASSET_REGEX: OnceLock<Regex> = OnceLock::new();
    ASSET_REGEX.get_or_init(|| {
        Regex::new(r#"(\s(?:data-src|src)\s*=\s*")([^"]*)(")"#).expect("Invalid asset regex")
    })
}

fn section_regex() -> &'static Regex {
    static SECTION_REGEX: OnceLock<Regex> = OnceLock::new();
    SECTION_REGEX.get_or_init(|| {
        Regex::new(r"(?i)<(/?)section\b([^>]*)>").expect("Invalid section regex")
    })
}

/// Value of attribute `name` in the attribute text of a start tag, with
/// entities decoded.
pub fn attribute_value(attributes: &str, name: &str) -> Option<String> {
    attribute_regex()
        .captures_iter(attributes)
        .find(|captures| captures[1].eq_ignore_ascii_case(name))
        .and_then(|captures| captures.get(2).or_else(|| captures.get(3)))
        .map(|value| html_escape::decode_html_entities(value.as_str()).into_owned())
}

/// Content of the first `<meta name="...">` tag with the given name.
pub fn read_meta(html: &str, name: &str) -> Option<String> {
    meta_regex().captures_iter(html).find_map(|captures| {
        let attributes = &captures[1];
        match attribute_value(attributes, "name") {
            Some(meta_name) if meta_name == name => attribute_value(attributes, "content"),
            _ => None,
        }
    })
}

/// Build a `<meta>` tag the renderer can read back with [`read_meta`].
pub fn meta_tag(name: &str, content: &str) -> String {
    format!(
        r#"<meta name="{}" content="{}">"#,
        html_escape::encode_double_quoted_attribute(name),
        html_escape::encode_double_quoted_attribute(content)
    )
}

/// Values the controller embeds in a rendered document for the renderer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BootstrapHints {
    pub base_uri: Option<Url>,
    pub reload_id: Option<String>,
    pub target: Option<SlideCoordinate>,
}

impl BootstrapHints {
    pub fn from_html(html: &str) -> Self {
        let base_uri = read_meta(html, META_BASE_URI).and_then(|value| match Url::parse(&value) {
            Ok(url) => Some(url),
            Err(e) => {
                log::warn!("Ignoring invalid base URI {value:?}: {e}");
                None
            }
        });
        Self {
            base_uri,
            reload_id: read_meta(html, META_RELOAD_ID),
            target: read_meta(html, META_SLIDE_INDICES)
                .and_then(|value| SlideCoordinate::parse_indices(&value)),
        }
    }
}

/// Absolute form of `reference` against `base`, or `None` when the
/// reference is already absolute or cannot be joined.
pub fn resolve_asset(reference: &str, base: &Url) -> Option<String> {
    if Url::parse(reference).is_ok() {
        return None;
    }
    base.join(reference).ok().map(String::from)
}

/// Result of rewriting asset references in a document.
#[derive(Debug, Clone, PartialEq)]
pub struct Rewrite {
    pub html: String,
    pub replaced: usize,
}

/// Rewrite every relative `src` / `data-src` attribute into an absolute URL.
///
/// The render surface resolves relative paths against its own origin rather
/// than the source document's directory.
pub fn absolutize_asset_refs(html: &str, base: &Url) -> Rewrite {
    let mut replaced = 0;
    let html = asset_regex()
        .replace_all(html, |captures: &Captures<'_>| {
            let reference = html_escape::decode_html_entities(&captures[2]);
            match resolve_asset(&reference, base) {
                Some(absolute) => {
                    replaced += 1;
                    format!(
                        "{}{}{}",
                        &captures[1],
                        html_escape::encode_double_quoted_attribute(&absolute),
                        &captures[3]
                    )
                }
                None => captures[0].to_string(),
            }
        })
        .into_owned();
    Rewrite { html, replaced }
}

/// Shape of a deck and the annotations found on its slides.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeckScan {
    /// Number of vertical slides in each horizontal position (at least 1)
    pub stacks: Vec<u32>,
    /// One record per annotated slide, in document order
    pub records: Vec<SourceposRecord>,
}

/// Walk the `<section>` elements of a reveal.js document.
///
/// Top-level sections are horizontal slides; sections nested one level are
/// the vertical slides of a stack. A stack's own annotation is reported at
/// vertical index 0. Sections nested deeper are slide content and are not
/// counted. Slides without a position annotation are skipped.
pub fn scan_deck(html: &str) -> DeckScan {
    let mut records = Vec::new();
    // Number of nested sections seen in each top-level section.
    let mut children: Vec<u32> = Vec::new();
    let mut depth = 0usize;

    for captures in section_regex().captures_iter(html) {
        if !captures[1].is_empty() {
            depth = depth.saturating_sub(1);
            continue;
        }

        let attributes = &captures[2];
        if depth == 0 {
            children.push(0);
        }
        let horizontal = children.len().saturating_sub(1) as u32;
        let coordinate = match depth {
            0 => Some(SlideCoordinate::new(horizontal, 0)),
            1 => children.last_mut().map(|count| {
                let vertical = *count;
                *count += 1;
                SlideCoordinate::new(horizontal, vertical)
            }),
            _ => None,
        };

        if let Some(coordinate) = coordinate
            && let Some(sourcepos) = attribute_value(attributes, POSITION_ATTRIBUTE)
        {
            records.push(SourceposRecord::new(sourcepos, coordinate));
        }
        if !attributes.trim_end().ends_with('/') {
            depth += 1;
        }
    }

    DeckScan {
        stacks: children.iter().map(|count| (*count).max(1)).collect(),
        records,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn base() -> Url {
        Url::parse("https://host/doc/").unwrap()
    }

    #[test]
    fn test_resolve_relative_reference() {
        assert_eq!(
            resolve_asset("img/a.png", &base()),
            Some("https://host/doc/img/a.png".to_string())
        );
        assert_eq!(
            resolve_asset("../shared/logo.svg", &base()),
            Some("https://host/shared/logo.svg".to_string())
        );
    }

    #[test]
    fn test_absolute_reference_untouched() {
        assert_eq!(resolve_asset("https://cdn.example/x.png", &base()), None);
        assert_eq!(resolve_asset("data:image/png;base64,AAAA", &base()), None);
    }

    #[test]
    fn test_absolutize_rewrites_only_relative_refs() {
        let html = r#"<img data-src="img/a.png"><script src="https://cdn.example/reveal.js"></script><img src="b c.png">"#;

        let rewrite = absolutize_asset_refs(html, &base());

        assert_eq!(rewrite.replaced, 2);
        assert_eq!(
            rewrite.html,
            r#"<img data-src="https://host/doc/img/a.png"><script src="https://cdn.example/reveal.js"></script><img src="https://host/doc/b%20c.png">"#
        );
    }

    #[test]
    fn test_read_meta_tags() {
        let html = format!(
            "<head>{}{}<meta charset=\"utf-8\"></head>",
            meta_tag(META_BASE_URI, "https://host/doc/"),
            meta_tag(META_SLIDE_INDICES, "2,1")
        );

        assert_eq!(
            read_meta(&html, META_BASE_URI),
            Some("https://host/doc/".to_string())
        );
        assert_eq!(read_meta(&html, META_RELOAD_ID), None);

        let hints = BootstrapHints::from_html(&html);
        assert_eq!(hints.base_uri, Some(base()));
        assert_eq!(hints.target, Some(SlideCoordinate::new(2, 1)));
        assert_eq!(hints.reload_id, None);
    }

    #[test]
    fn test_meta_content_is_entity_decoded() {
        let tag = meta_tag("note", r#"a "quoted" & value"#);
        assert_eq!(read_meta(&tag, "note"), Some(r#"a "quoted" & value"#.to_string()));
    }

    #[test]
    fn test_scan_flat_deck() {
        let html = r#"
<div class="slides">
<section id="title-slide"><h1>Talk</h1></section>
<section id="one" class="slide level2" data-pos="deck.md@3:1-5:1"><h2>One</h2></section>
<section id="two" class="slide level2"><h2>Two</h2></section>
<section id="three" class="slide level2" data-pos="deck.md@9:1-12:1"><h2>Three</h2></section>
</div>"#;

        let scan = scan_deck(html);

        assert_eq!(scan.stacks, vec![1, 1, 1, 1]);
        assert_eq!(
            scan.records,
            vec![
                SourceposRecord::new("deck.md@3:1-5:1", SlideCoordinate::new(1, 0)),
                SourceposRecord::new("deck.md@9:1-12:1", SlideCoordinate::new(3, 0)),
            ]
        );
    }

    #[test]
    fn test_scan_vertical_stacks() {
        let html = r#"
<section data-pos="d@1:1-1:9"><h1>Solo</h1></section>
<section>
  <section class="title-slide slide level1" data-pos="d@3:1-3:9"><h1>Part</h1></section>
  <section class="slide level2" data-pos="d@5:1-8:1"><h2>A</h2>
    <section data-pos="d@6:1-6:5">nested content</section>
  </section>
  <section class="slide level2" data-pos="d@9:1-12:1"><h2>B</h2></section>
</section>
<section data-pos="d@14:1-15:1"><h1>End</h1></section>"#;

        let scan = scan_deck(html);

        assert_eq!(scan.stacks, vec![1, 3, 1]);
        assert_eq!(
            scan.records,
            vec![
                SourceposRecord::new("d@1:1-1:9", SlideCoordinate::new(0, 0)),
                SourceposRecord::new("d@3:1-3:9", SlideCoordinate::new(1, 0)),
                SourceposRecord::new("d@5:1-8:1", SlideCoordinate::new(1, 1)),
                SourceposRecord::new("d@9:1-12:1", SlideCoordinate::new(1, 2)),
                SourceposRecord::new("d@14:1-15:1", SlideCoordinate::new(2, 0)),
            ]
        );
    }
}
