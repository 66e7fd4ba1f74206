//! Order-preserving XML tree for WordprocessingML
//!
//! `word/document.xml` interleaves heterogeneous siblings (paragraphs,
//! tables, section markers) whose order is semantically significant, so the
//! tree keeps every child in document order and every attribute in source
//! order. Namespace prefixes (`w:`) are opaque substrings of element and
//! attribute names and are never reinterpreted.
//!
//! Nodes live in an arena addressed by [`NodeId`] handles; parents hold
//! child handles in a `Vec`, which makes find-or-create upserts cheap and
//! serialization a plain depth-first walk.

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use super::error::DocxError;

/// Handle into an [`XmlTree`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// A single XML node.
#[derive(Debug, Clone, PartialEq)]
pub enum XmlNode {
    Element(Element),
    Text(String),
    Comment(String),
}

/// An element with ordered attributes and ordered children.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Element {
    pub name: String,
    /// Attribute order is preserved through parse → mutate → build.
    pub attrs: Vec<(String, String)>,
    pub children: Vec<NodeId>,
}

/// Captured `<?xml …?>` declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct XmlDecl {
    pub version: String,
    pub encoding: Option<String>,
    pub standalone: Option<String>,
}

/// Order-preserving XML document tree.
#[derive(Debug, Clone, Default)]
pub struct XmlTree {
    nodes: Vec<XmlNode>,
    roots: Vec<NodeId>,
    decl: Option<XmlDecl>,
}

impl XmlTree {
    /// Parse XML bytes into a tree, preserving sibling order, whitespace
    /// text nodes and all attributes.
    pub fn parse(xml: &[u8]) -> Result<Self, DocxError> {
        let text = std::str::from_utf8(xml)
            .map_err(|e| DocxError::MalformedXml(format!("invalid UTF-8: {e}")))?;
        let mut reader = Reader::from_str(text);

        let mut tree = XmlTree::default();
        let mut stack: Vec<NodeId> = Vec::new();

        loop {
            match reader.read_event()? {
                Event::Decl(decl) => {
                    tree.decl = Some(parse_decl(&decl)?);
                }
                Event::Start(start) => {
                    let id = tree.push_node(XmlNode::Element(element_from_start(&start)?));
                    tree.attach(&stack, id);
                    stack.push(id);
                }
                Event::Empty(start) => {
                    let id = tree.push_node(XmlNode::Element(element_from_start(&start)?));
                    tree.attach(&stack, id);
                }
                Event::End(_) => {
                    // Tag-name matching is checked by the reader itself.
                    if stack.pop().is_none() {
                        return Err(DocxError::MalformedXml(
                            "closing tag without matching opening tag".into(),
                        ));
                    }
                }
                Event::Text(t) => {
                    let text = t.unescape()?.into_owned();
                    let id = tree.push_node(XmlNode::Text(text));
                    tree.attach(&stack, id);
                }
                Event::CData(t) => {
                    let text = String::from_utf8_lossy(&t.into_inner()).into_owned();
                    let id = tree.push_node(XmlNode::Text(text));
                    tree.attach(&stack, id);
                }
                Event::Comment(t) => {
                    let raw = String::from_utf8_lossy(t.as_ref()).into_owned();
                    let id = tree.push_node(XmlNode::Comment(raw));
                    tree.attach(&stack, id);
                }
                // Processing instructions and doctypes do not occur in
                // WordprocessingML parts.
                Event::PI(_) | Event::DocType(_) => {}
                Event::Eof => break,
            }
        }

        if !stack.is_empty() {
            return Err(DocxError::MalformedXml("unexpected end of input".into()));
        }
        Ok(tree)
    }

    /// Serialize the tree back to bytes.
    ///
    /// The declaration is re-emitted if the source had one, otherwise a
    /// standard UTF-8 declaration is injected. Childless elements are
    /// written self-closing. Output re-parses to an equivalent tree.
    pub fn build(&self) -> Result<Vec<u8>, DocxError> {
        let mut writer = Writer::new(Vec::new());

        match &self.decl {
            Some(decl) => {
                writer.write_event(Event::Decl(BytesDecl::new(
                    &decl.version,
                    decl.encoding.as_deref(),
                    decl.standalone.as_deref(),
                )))?;
            }
            None => {
                writer.write_event(Event::Decl(BytesDecl::new(
                    "1.0",
                    Some("UTF-8"),
                    Some("yes"),
                )))?;
            }
        }

        for &root in &self.roots {
            self.write_node(&mut writer, root)?;
        }
        Ok(writer.into_inner())
    }

    fn write_node(&self, writer: &mut Writer<Vec<u8>>, id: NodeId) -> Result<(), DocxError> {
        match &self.nodes[id.0] {
            XmlNode::Element(el) => {
                let mut start = BytesStart::new(el.name.as_str());
                for (key, value) in &el.attrs {
                    start.push_attribute((key.as_str(), value.as_str()));
                }
                if el.children.is_empty() {
                    writer.write_event(Event::Empty(start))?;
                } else {
                    writer.write_event(Event::Start(start))?;
                    for &child in &el.children {
                        self.write_node(writer, child)?;
                    }
                    writer.write_event(Event::End(BytesEnd::new(el.name.as_str())))?;
                }
            }
            XmlNode::Text(text) => {
                writer.write_event(Event::Text(BytesText::new(text)))?;
            }
            XmlNode::Comment(raw) => {
                writer.write_event(Event::Comment(BytesText::from_escaped(raw.as_str())))?;
            }
        }
        Ok(())
    }

    fn push_node(&mut self, node: XmlNode) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        id
    }

    fn attach(&mut self, stack: &[NodeId], id: NodeId) {
        match stack.last() {
            Some(&parent) => {
                if let XmlNode::Element(el) = &mut self.nodes[parent.0] {
                    el.children.push(id);
                }
            }
            None => self.roots.push(id),
        }
    }

    /// Top-level nodes in document order.
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn node(&self, id: NodeId) -> &XmlNode {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut XmlNode {
        &mut self.nodes[id.0]
    }

    /// Borrow a node as an element, if it is one.
    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match &self.nodes[id.0] {
            XmlNode::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        match &mut self.nodes[id.0] {
            XmlNode::Element(el) => Some(el),
            _ => None,
        }
    }

    /// First root element (the document element), if any.
    pub fn root_element(&self) -> Option<NodeId> {
        self.roots
            .iter()
            .copied()
            .find(|&id| matches!(self.nodes[id.0], XmlNode::Element(_)))
    }

    /// First direct child element with the given (prefixed) tag name.
    pub fn find_child(&self, parent: NodeId, tag: &str) -> Option<NodeId> {
        let el = self.element(parent)?;
        el.children
            .iter()
            .copied()
            .find(|&c| self.element(c).is_some_and(|e| e.name == tag))
    }

    /// All direct child elements with the given tag name, in order.
    pub fn find_children(&self, parent: NodeId, tag: &str) -> Vec<NodeId> {
        match self.element(parent) {
            Some(el) => el
                .children
                .iter()
                .copied()
                .filter(|&c| self.element(c).is_some_and(|e| e.name == tag))
                .collect(),
            None => Vec::new(),
        }
    }

    /// All descendant elements with the given tag name, depth-first.
    pub fn find_descendants(&self, parent: NodeId, tag: &str) -> Vec<NodeId> {
        let mut found = Vec::new();
        self.collect_descendants(parent, tag, &mut found);
        found
    }

    fn collect_descendants(&self, id: NodeId, tag: &str, found: &mut Vec<NodeId>) {
        if let Some(el) = self.element(id) {
            for &child in &el.children {
                if self.element(child).is_some_and(|e| e.name == tag) {
                    found.push(child);
                }
                self.collect_descendants(child, tag, found);
            }
        }
    }

    pub fn get_attr(&self, id: NodeId, key: &str) -> Option<&str> {
        self.element(id)?
            .attrs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Set or update an attribute; existing attributes keep their position.
    pub fn set_attr(&mut self, id: NodeId, key: &str, value: &str) {
        if let Some(el) = self.element_mut(id) {
            match el.attrs.iter_mut().find(|(k, _)| k == key) {
                Some(pair) => pair.1 = value.to_string(),
                None => el.attrs.push((key.to_string(), value.to_string())),
            }
        }
    }

    pub fn remove_attr(&mut self, id: NodeId, key: &str) {
        if let Some(el) = self.element_mut(id) {
            el.attrs.retain(|(k, _)| k != key);
        }
    }

    /// Concatenated text of all descendant text nodes.
    pub fn get_text(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        match &self.nodes[id.0] {
            XmlNode::Text(t) => out.push_str(t),
            XmlNode::Element(el) => {
                for &child in &el.children {
                    self.collect_text(child, out);
                }
            }
            XmlNode::Comment(_) => {}
        }
    }

    /// Replace the element's content with a single text node. An empty
    /// string just clears the content.
    pub fn set_text(&mut self, id: NodeId, text: &str) {
        if text.is_empty() {
            if let Some(el) = self.element_mut(id) {
                el.children.clear();
            }
            return;
        }
        let text_id = self.push_node(XmlNode::Text(text.to_string()));
        if let Some(el) = self.element_mut(id) {
            el.children.clear();
            el.children.push(text_id);
        }
    }

    /// Append a new empty element as the last child of `parent`.
    pub fn append_element(&mut self, parent: NodeId, tag: &str) -> NodeId {
        let id = self.push_node(XmlNode::Element(Element {
            name: tag.to_string(),
            ..Element::default()
        }));
        if let Some(el) = self.element_mut(parent) {
            el.children.push(id);
        }
        id
    }

    /// Insert a new empty element as the *first* child of `parent`.
    pub fn insert_element_first(&mut self, parent: NodeId, tag: &str) -> NodeId {
        let id = self.push_node(XmlNode::Element(Element {
            name: tag.to_string(),
            ..Element::default()
        }));
        if let Some(el) = self.element_mut(parent) {
            el.children.insert(0, id);
        }
        id
    }

    /// Remove all direct child elements with the given tag name.
    pub fn remove_children(&mut self, parent: NodeId, tag: &str) {
        let to_remove: Vec<NodeId> = self.find_children(parent, tag);
        if to_remove.is_empty() {
            return;
        }
        if let Some(el) = self.element_mut(parent) {
            el.children.retain(|c| !to_remove.contains(c));
        }
    }

    /// Merge-or-create property upsert.
    ///
    /// If a direct child with `tag` exists, its attributes are updated
    /// key-by-key and attributes not named in `attrs` survive untouched;
    /// otherwise a new child is appended. Running the same upsert twice
    /// yields the same tree, which is what makes the formatting engine
    /// idempotent.
    pub fn set_ordered_prop(&mut self, parent: NodeId, tag: &str, attrs: &[(&str, &str)]) -> NodeId {
        let id = match self.find_child(parent, tag) {
            Some(id) => id,
            None => self.append_element(parent, tag),
        };
        for &(key, value) in attrs {
            self.set_attr(id, key, value);
        }
        id
    }

    /// Return the `w:pPr` of a paragraph, creating it as the first child if
    /// absent (OOXML requires paragraph properties before content).
    pub fn ensure_ppr(&mut self, paragraph: NodeId) -> NodeId {
        self.ensure_first_child(paragraph, "w:pPr")
    }

    /// Return the `w:rPr` of a run, creating it as the first child if absent.
    pub fn ensure_rpr(&mut self, run: NodeId) -> NodeId {
        self.ensure_first_child(run, "w:rPr")
    }

    fn ensure_first_child(&mut self, parent: NodeId, tag: &str) -> NodeId {
        match self.find_child(parent, tag) {
            Some(id) => id,
            None => self.insert_element_first(parent, tag),
        }
    }
}

fn element_from_start(start: &BytesStart) -> Result<Element, DocxError> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut attrs = Vec::new();
    for attr in start.attributes() {
        let attr = attr?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        attrs.push((key, value));
    }
    Ok(Element {
        name,
        attrs,
        children: Vec::new(),
    })
}

fn parse_decl(decl: &BytesDecl) -> Result<XmlDecl, DocxError> {
    let version = String::from_utf8_lossy(decl.version()?.as_ref()).into_owned();
    let encoding = match decl.encoding() {
        Some(enc) => Some(String::from_utf8_lossy(enc?.as_ref()).into_owned()),
        None => None,
    };
    let standalone = match decl.standalone() {
        Some(sa) => Some(String::from_utf8_lossy(sa?.as_ref()).into_owned()),
        None => None,
    };
    Ok(XmlDecl {
        version,
        encoding,
        standalone,
    })
}
