use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

use super::dom::{Document, NodeId};
use super::symbols::{
    classify_declaration, dash_anchor, parse_dash_anchor, SymbolTable, DASH_ANCHOR_CLASS,
};

/// Element levels between a symbol's `<a name>` and the section wrapping its
/// declaration: a > h3 > div > div > div.titlepage > div.section.
/// This mirrors the DocBook XSL layout and breaks if that layout changes.
pub const DECLARATION_DEPTH: usize = 5;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PageReport {
    /// Markers that matched a known symbol.
    pub matched: usize,
    /// Matches whose kind was set from a declaration block.
    pub refined: usize,
    /// Anchors actually inserted.
    pub injected: usize,
}

/// The `<pre>` holding a marker's declaration, found by climbing
/// [`DECLARATION_DEPTH`] element levels and taking the first `<pre>` below.
pub fn declaration_block(doc: &Document, marker: NodeId) -> Option<NodeId> {
    let section = doc.ancestor(marker, DECLARATION_DEPTH)?;
    doc.first_descendant_by_tag(section, "pre")
}

/// Refine kinds and inject Dash anchors for every known symbol marker.
pub fn annotate_page(doc: &mut Document, table: &mut SymbolTable) -> PageReport {
    let mut report = PageReport::default();
    let markers = doc.elements_with_attr("a", "name");

    for marker in markers {
        let Some(name) = doc.attr(marker, "name").map(str::to_string) else {
            continue;
        };
        let Some(symbol) = table.get(&name) else {
            continue;
        };
        report.matched += 1;

        let mut kind = symbol.kind;
        if let Some(kind_from_decl) = declaration_block(doc, marker)
            .and_then(|pre| classify_declaration(&doc.text_content(pre)))
        {
            kind = kind_from_decl;
            report.refined += 1;
        }
        table.set_kind(&name, kind);

        if already_injected(doc, marker, &name) {
            debug!("Anchor for {} already present, skipping", name);
            continue;
        }
        let anchor_name = dash_anchor(kind, &name);
        let anchor = doc.create_element(
            "a",
            &[("name", anchor_name.as_str()), ("class", DASH_ANCHOR_CLASS)],
        );
        doc.insert_after(marker, anchor);
        report.injected += 1;
    }

    report
}

/// A page processed by an earlier run has the Dash anchor directly after
/// the marker.
fn already_injected(doc: &Document, marker: NodeId, name: &str) -> bool {
    doc.next_element_sibling(marker)
        .filter(|&next| doc.tag_name(next) == Some("a") && doc.has_class(next, DASH_ANCHOR_CLASS))
        .and_then(|next| doc.attr(next, "name"))
        .and_then(parse_dash_anchor)
        .is_some_and(|(_, existing)| existing == name)
}

/// Annotate one content page in place. Pages without any change are not
/// rewritten.
pub fn annotate_file(path: &Path, table: &mut SymbolTable) -> Result<PageReport> {
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read {:?}", path))?;
    let mut doc = Document::parse_bytes(&bytes);
    let report = annotate_page(&mut doc, table);

    if report.injected > 0 {
        let html = doc
            .to_html()
            .with_context(|| format!("Failed to serialize {:?}", path))?;
        std::fs::write(path, html).with_context(|| format!("Failed to write {:?}", path))?;
    }
    Ok(report)
}
