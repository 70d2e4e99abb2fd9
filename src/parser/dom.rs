//! Owned HTML tree with the handful of queries the indexer needs.
//!
//! html5ever parses into an `RcDom`, which is copied into a flat arena so
//! nodes can be addressed by index and mutated without `RefCell` juggling.
//! Serialization goes back through html5ever's serializer, writing into an
//! ASCII-only buffer.

use std::io::{self, Write};

use html5ever::serialize::{HtmlSerializer, SerializeOpts, Serializer};
use html5ever::tendril::TendrilSink;
use html5ever::{parse_document, LocalName, Namespace, QualName};
use markup5ever_rcdom::{Handle, NodeData as RcNodeData, RcDom};

const HTML_NS: &str = "http://www.w3.org/1999/xhtml";

/// Elements whose text the serializer writes verbatim.
const RAW_TEXT_ELEMENTS: &[&str] = &[
    "style", "script", "xmp", "iframe", "noembed", "noframes", "plaintext", "noscript",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
pub enum NodeData {
    Document,
    Doctype {
        name: String,
        public_id: String,
        system_id: String,
    },
    Element {
        name: QualName,
        attrs: Vec<(QualName, String)>,
    },
    Text(String),
    Comment(String),
    ProcessingInstruction { target: String, contents: String },
}

#[derive(Debug, Clone)]
pub struct Node {
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub data: NodeData,
}

#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
}

impl Document {
    /// Parse a complete HTML document. html5ever never fails on bad markup,
    /// it repairs it the way a browser would.
    pub fn parse(html: &str) -> Document {
        let dom = parse_document(RcDom::default(), Default::default()).one(html);
        let mut doc = Document { nodes: Vec::new() };
        doc.copy_from(&dom.document, None);
        doc
    }

    /// Decode raw page bytes: UTF-8 when valid, ISO-8859-1 otherwise.
    pub fn parse_bytes(bytes: &[u8]) -> Document {
        match std::str::from_utf8(bytes) {
            Ok(s) => Document::parse(s),
            Err(_) => {
                let latin1: String = bytes.iter().map(|&b| b as char).collect();
                Document::parse(&latin1)
            }
        }
    }

    fn copy_from(&mut self, handle: &Handle, parent: Option<NodeId>) -> NodeId {
        let data = match &handle.data {
            RcNodeData::Document => NodeData::Document,
            RcNodeData::Doctype {
                name,
                public_id,
                system_id,
            } => NodeData::Doctype {
                name: name.to_string(),
                public_id: public_id.to_string(),
                system_id: system_id.to_string(),
            },
            RcNodeData::Text { contents } => NodeData::Text(contents.borrow().to_string()),
            RcNodeData::Comment { contents } => NodeData::Comment(contents.to_string()),
            RcNodeData::Element { name, attrs, .. } => NodeData::Element {
                name: name.clone(),
                attrs: attrs
                    .borrow()
                    .iter()
                    .map(|a| (a.name.clone(), a.value.to_string()))
                    .collect(),
            },
            RcNodeData::ProcessingInstruction { target, contents } => {
                NodeData::ProcessingInstruction {
                    target: target.to_string(),
                    contents: contents.to_string(),
                }
            }
        };
        let id = self.push(Node {
            parent,
            children: Vec::new(),
            data,
        });

        // <template> keeps its children in a separate fragment
        let template = match &handle.data {
            RcNodeData::Element {
                template_contents, ..
            } => template_contents.borrow().clone(),
            _ => None,
        };
        let children: Vec<Handle> = match template {
            Some(fragment) => fragment.children.borrow().clone(),
            None => handle.children.borrow().clone(),
        };
        for child in &children {
            let child_id = self.copy_from(child, Some(id));
            self.nodes[id.0].children.push(child_id);
        }
        id
    }

    fn push(&mut self, node: Node) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        match &self.node(id).data {
            NodeData::Element { name, .. } => Some(&*name.local),
            _ => None,
        }
    }

    pub fn attr(&self, id: NodeId, attr: &str) -> Option<&str> {
        match &self.node(id).data {
            NodeData::Element { attrs, .. } => attrs
                .iter()
                .find(|(n, _)| &*n.local == attr)
                .map(|(_, v)| v.as_str()),
            _ => None,
        }
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.attr(id, "class")
            .is_some_and(|c| c.split_whitespace().any(|c| c == class))
    }

    /// All nodes below `id` in document order, `id` itself excluded.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.node(id).children.iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.node(next).children.iter().rev().copied());
        }
        out
    }

    /// Elements carrying `attr`, in document order.
    pub fn elements_with_attr(&self, tag: &str, attr: &str) -> Vec<NodeId> {
        self.descendants(self.root())
            .into_iter()
            .filter(|&n| self.tag_name(n) == Some(tag) && self.attr(n, attr).is_some())
            .collect()
    }

    pub fn elements_by_tag(&self, tag: &str) -> Vec<NodeId> {
        self.descendants(self.root())
            .into_iter()
            .filter(|&n| self.tag_name(n) == Some(tag))
            .collect()
    }

    /// Walks `depth` element parents up. The document node does not count,
    /// so asking past `<html>` yields `None`.
    pub fn ancestor(&self, id: NodeId, depth: usize) -> Option<NodeId> {
        let mut current = id;
        for _ in 0..depth {
            let parent = self.node(current).parent?;
            self.tag_name(parent)?;
            current = parent;
        }
        Some(current)
    }

    pub fn first_descendant_by_tag(&self, id: NodeId, tag: &str) -> Option<NodeId> {
        self.descendants(id)
            .into_iter()
            .find(|&n| self.tag_name(n) == Some(tag))
    }

    pub fn text_content(&self, id: NodeId) -> String {
        let mut text = String::new();
        if let NodeData::Text(t) = &self.node(id).data {
            text.push_str(t);
        }
        for n in self.descendants(id) {
            if let NodeData::Text(t) = &self.node(n).data {
                text.push_str(t);
            }
        }
        text
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.node(id).parent?;
        let siblings = &self.node(parent).children;
        let pos = siblings.iter().position(|&c| c == id)?;
        siblings.get(pos + 1).copied()
    }

    /// Following element sibling, skipping whitespace-only text.
    pub fn next_element_sibling(&self, id: NodeId) -> Option<NodeId> {
        let mut current = self.next_sibling(id)?;
        loop {
            match &self.node(current).data {
                NodeData::Element { .. } => return Some(current),
                NodeData::Text(t) if t.trim().is_empty() => {}
                _ => return None,
            }
            current = self.next_sibling(current)?;
        }
    }

    /// New detached HTML element.
    pub fn create_element(&mut self, tag: &str, attrs: &[(&str, &str)]) -> NodeId {
        let name = QualName::new(None, Namespace::from(HTML_NS), LocalName::from(tag));
        let attrs = attrs
            .iter()
            .map(|(k, v)| {
                (
                    QualName::new(None, Namespace::from(""), LocalName::from(*k)),
                    v.to_string(),
                )
            })
            .collect();
        self.push(Node {
            parent: None,
            children: Vec::new(),
            data: NodeData::Element { name, attrs },
        })
    }

    /// Attach the detached `node` right after `sibling` under the same parent.
    pub fn insert_after(&mut self, sibling: NodeId, node: NodeId) {
        let Some(parent) = self.node(sibling).parent else {
            return;
        };
        let siblings = &mut self.nodes[parent.0].children;
        let pos = siblings
            .iter()
            .position(|&c| c == sibling)
            .map_or(siblings.len(), |p| p + 1);
        siblings.insert(pos, node);
        self.nodes[node.0].parent = Some(parent);
    }

    /// Serialize the whole document. Non-ASCII characters in text and
    /// attribute values become numeric character references; raw text
    /// (`<script>`, `<style>`, ...) and comments are written as UTF-8.
    pub fn to_html(&self) -> io::Result<String> {
        let mut ser = HtmlSerializer::new(AsciiWriter::default(), SerializeOpts::default());
        self.serialize_node(self.root(), &mut ser)?;
        ser.writer.finish()
    }

    fn in_raw_text(&self, id: NodeId) -> bool {
        self.node(id)
            .parent
            .and_then(|p| self.tag_name(p))
            .is_some_and(|tag| RAW_TEXT_ELEMENTS.contains(&tag))
    }

    fn serialize_node(&self, id: NodeId, s: &mut HtmlSerializer<AsciiWriter>) -> io::Result<()> {
        match &self.node(id).data {
            NodeData::Element { name, attrs } => {
                s.writer.escape = true;
                s.start_elem(name.clone(), attrs.iter().map(|(n, v)| (n, v.as_str())))?;
                for &child in &self.node(id).children {
                    self.serialize_node(child, s)?;
                }
                s.end_elem(name.clone())
            }
            NodeData::Document => {
                for &child in &self.node(id).children {
                    self.serialize_node(child, s)?;
                }
                Ok(())
            }
            // html5ever only writes the doctype name, which would drop a
            // legacy PUBLIC/SYSTEM id and flip the page out of quirks mode.
            NodeData::Doctype {
                name,
                public_id,
                system_id,
            } => {
                s.writer.escape = false;
                s.writer
                    .write_all(doctype_html(name, public_id, system_id).as_bytes())
            }
            NodeData::Text(t) => {
                s.writer.escape = !self.in_raw_text(id);
                s.write_text(t)
            }
            NodeData::Comment(c) => {
                s.writer.escape = false;
                s.write_comment(c)
            }
            NodeData::ProcessingInstruction { target, contents } => {
                s.writer.escape = false;
                s.write_processing_instruction(target, contents)
            }
        }
    }
}

fn doctype_html(name: &str, public_id: &str, system_id: &str) -> String {
    let mut out = format!("<!DOCTYPE {}", name);
    if !public_id.is_empty() {
        out.push_str(&format!(" PUBLIC \"{}\"", public_id));
        if !system_id.is_empty() {
            out.push_str(&format!(" \"{}\"", system_id));
        }
    } else if !system_id.is_empty() {
        out.push_str(&format!(" SYSTEM \"{}\"", system_id));
    }
    out.push('>');
    out
}

/// Output sink for the serializer. While `escape` is set, non-ASCII
/// characters are written as `&#N;`. A UTF-8 sequence split across two
/// writes is held back until it is complete.
#[derive(Default)]
struct AsciiWriter {
    out: String,
    pending: Vec<u8>,
    escape: bool,
}

impl AsciiWriter {
    fn finish(self) -> io::Result<String> {
        if !self.pending.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "serializer output ended inside a UTF-8 sequence",
            ));
        }
        Ok(self.out)
    }
}

impl Write for AsciiWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.pending.extend_from_slice(buf);
        let complete = match std::str::from_utf8(&self.pending) {
            Ok(s) => s.len(),
            Err(e) if e.error_len().is_none() => e.valid_up_to(),
            Err(e) => return Err(io::Error::new(io::ErrorKind::InvalidData, e)),
        };
        let rest = self.pending.split_off(complete);
        let text = String::from_utf8(std::mem::replace(&mut self.pending, rest))
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        if !self.escape || text.is_ascii() {
            self.out.push_str(&text);
        } else {
            for c in text.chars() {
                if c.is_ascii() {
                    self.out.push(c);
                } else {
                    self.out.push_str(&format!("&#{};", c as u32));
                }
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
