use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

use super::dom::{Document, NodeId};
use super::symbols::{guess_kind, Symbol, SymbolTable};

/// Read the generated index page and seed the symbol table.
pub fn load(path: &Path) -> Result<SymbolTable> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read index page {:?}", path))?;
    Ok(extract(&Document::parse_bytes(&bytes)))
}

/// One symbol per `<dt>` term. The link usually sits in the term itself;
/// some generator versions put it in the matching `<dd>` instead.
pub fn extract(doc: &Document) -> SymbolTable {
    let mut table = SymbolTable::new();

    for dt in doc.elements_by_tag("dt") {
        let link = first_link(doc, dt).or_else(|| {
            doc.next_element_sibling(dt)
                .filter(|&dd| doc.tag_name(dd) == Some("dd"))
                .and_then(|dd| first_link(doc, dd))
        });
        let Some(link) = link else {
            debug!("Index term without a link: {:?}", doc.text_content(dt).trim());
            continue;
        };

        let text = doc.text_content(link);
        let Some(name) = text.split_whitespace().next() else {
            debug!("Index link without text: {:?}", doc.attr(link, "href"));
            continue;
        };
        let location = doc.attr(link, "href").unwrap_or_default().trim();

        table.insert(Symbol {
            name: name.to_string(),
            kind: guess_kind(name),
            location: location.to_string(),
        });
    }

    table
}

fn first_link(doc: &Document, id: NodeId) -> Option<NodeId> {
    doc.descendants(id)
        .into_iter()
        .find(|&n| doc.tag_name(n) == Some("a") && doc.attr(n, "href").is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::symbols::Kind;

    #[test]
    fn fixture_index() {
        let table = load(Path::new("tests/fixtures/html/ix01.html")).unwrap();
        assert_eq!(table.len(), 6);

        let v = table.get("igraph_vector_t").unwrap();
        assert_eq!(v.kind, Kind::Type);
        assert_eq!(v.location, "igraph-Vectors.html#igraph_vector_t");

        assert_eq!(table.get("igraph_rngtype_mt19937").unwrap().kind, Kind::Type);
        assert_eq!(table.get("igraph_add_edge").unwrap().kind, Kind::Function);
    }

    #[test]
    fn preserves_index_order() {
        let table = load(Path::new("tests/fixtures/html/ix01.html")).unwrap();
        let first = table.iter().next().unwrap();
        assert_eq!(first.name, "igraph_add_edge");
    }

    #[test]
    fn link_inside_description() {
        let doc = Document::parse(
            r#"<dl><dt>igraph_foo</dt><dd><a href=" igraph-Foo.html#igraph_foo ">igraph_foo — does foo</a></dd></dl>"#,
        );
        let table = extract(&doc);
        assert_eq!(table.get("igraph_foo").unwrap().location, "igraph-Foo.html#igraph_foo");
    }

    #[test]
    fn terms_without_links_are_skipped() {
        let doc = Document::parse("<dl><dt>just text</dt><dd>nothing here</dd></dl>");
        assert!(extract(&doc).is_empty());
    }

    #[test]
    fn no_definition_list_is_empty() {
        let doc = Document::parse("<html><body><p>No index</p></body></html>");
        assert!(extract(&doc).is_empty());
    }

    #[test]
    fn missing_page_is_an_error() {
        assert!(load(Path::new("tests/fixtures/html/does-not-exist.html")).is_err());
    }
}
