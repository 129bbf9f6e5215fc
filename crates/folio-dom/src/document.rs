//! Arena-backed document tree.
//!
//! Nodes live in a single vector owned by the [`Document`] and are addressed
//! through copyable [`NodeId`] handles. Classes and inline styles are stored
//! in their `class` and `style` attributes, the same way a browser reflects
//! them, so serialising a node always shows its current state.

use crate::geometry::Rect;
use crate::selector::Selector;

/// Handle to a node inside a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// Payload of a node.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeData {
    /// The document itself, parent of `<html>`
    Document,

    /// An element with its lowercase tag name and attributes in source order
    Element {
        tag: String,
        attrs: Vec<(String, String)>,
    },

    /// Character data
    Text(String),
}

#[derive(Debug, Clone)]
struct Node {
    data: NodeData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    rect: Option<Rect>,
}

/// Elements that never have children or a closing tag.
pub(crate) const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Elements whose content is raw text.
pub(crate) const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

const ROOT: NodeId = NodeId(0);

/// An HTML document held in memory.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    html: NodeId,
    head: NodeId,
    body: NodeId,
}

impl Document {
    /// Create an empty document with an `<html>`, `<head>` and `<body>`.
    pub fn new() -> Self {
        let mut doc = Self {
            nodes: vec![Node {
                data: NodeData::Document,
                parent: None,
                children: Vec::new(),
                rect: None,
            }],
            html: ROOT,
            head: ROOT,
            body: ROOT,
        };

        let html = doc.create_element("html");
        let head = doc.create_element("head");
        let body = doc.create_element("body");
        doc.append_child(ROOT, html);
        doc.append_child(html, head);
        doc.append_child(html, body);

        doc.html = html;
        doc.head = head;
        doc.body = body;
        doc
    }

    pub fn root(&self) -> NodeId {
        ROOT
    }

    pub fn html(&self) -> NodeId {
        self.html
    }

    pub fn head(&self) -> NodeId {
        self.head
    }

    pub fn body(&self) -> NodeId {
        self.body
    }

    /// Create a detached element.
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.push(NodeData::Element {
            tag: tag.to_ascii_lowercase(),
            attrs: Vec::new(),
        })
    }

    /// Create a detached text node.
    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push(NodeData::Text(text.to_string()))
    }

    fn push(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            data,
            parent: None,
            children: Vec::new(),
            rect: None,
        });
        id
    }

    pub fn data(&self, node: NodeId) -> &NodeData {
        &self.nodes[node.0].data
    }

    pub fn is_element(&self, node: NodeId) -> bool {
        matches!(self.data(node), NodeData::Element { .. })
    }

    /// Lowercase tag name, `None` for text and the document root.
    pub fn tag_name(&self, node: NodeId) -> Option<&str> {
        match self.data(node) {
            NodeData::Element { tag, .. } => Some(tag),
            _ => None,
        }
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes[node.0].parent
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        &self.nodes[node.0].children
    }

    /// Child nodes that are elements.
    pub fn element_children(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(node)
            .iter()
            .copied()
            .filter(move |&child| self.is_element(child))
    }

    /// Ancestors from the parent up to the document root.
    pub fn ancestors(&self, node: NodeId) -> Ancestors<'_> {
        Ancestors {
            doc: self,
            next: self.parent(node),
        }
    }

    /// Descendants in document order, excluding `node` itself.
    pub fn descendants(&self, node: NodeId) -> Descendants<'_> {
        Descendants {
            doc: self,
            stack: self.children(node).iter().rev().copied().collect(),
        }
    }

    /// Whether `node` is `ancestor` or one of its descendants.
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        node == ancestor || self.ancestors(node).any(|a| a == ancestor)
    }

    /// Whether the node is attached to the document.
    pub fn is_connected(&self, node: NodeId) -> bool {
        self.contains(ROOT, node)
    }

    /// Append `child` as the last child of `parent`, detaching it first.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        debug_assert!(!self.contains(child, parent), "cannot append an ancestor");
        self.detach(child);
        self.nodes[parent.0].children.push(child);
        self.nodes[child.0].parent = Some(parent);
    }

    /// Insert `child` as the first child of `parent`, detaching it first.
    pub fn prepend_child(&mut self, parent: NodeId, child: NodeId) {
        debug_assert!(!self.contains(child, parent), "cannot prepend an ancestor");
        self.detach(child);
        self.nodes[parent.0].children.insert(0, child);
        self.nodes[child.0].parent = Some(parent);
    }

    /// Remove a node from its parent. The node and its subtree stay valid.
    pub fn detach(&mut self, node: NodeId) {
        if let Some(parent) = self.nodes[node.0].parent.take() {
            self.nodes[parent.0].children.retain(|&c| c != node);
        }
    }

    /// Append text to `parent`, merging with a trailing text node.
    pub fn append_text(&mut self, parent: NodeId, text: &str) -> NodeId {
        if let Some(&last) = self.children(parent).last() {
            if let NodeData::Text(existing) = &mut self.nodes[last.0].data {
                existing.push_str(text);
                return last;
            }
        }

        let node = self.create_text(text);
        self.append_child(parent, node);
        node
    }

    /// Attributes in source order. Empty for non-elements.
    pub fn attributes(&self, node: NodeId) -> &[(String, String)] {
        match self.data(node) {
            NodeData::Element { attrs, .. } => attrs,
            _ => &[],
        }
    }

    pub fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        self.attributes(node)
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn has_attribute(&self, node: NodeId, name: &str) -> bool {
        self.attribute(node, name).is_some()
    }

    /// Set an attribute. Ignored for non-elements.
    pub fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) {
        let Some(attrs) = self.attrs_mut(node) else {
            return;
        };

        match attrs.iter_mut().find(|(key, _)| key.eq_ignore_ascii_case(name)) {
            Some((_, existing)) => *existing = value.to_string(),
            None => attrs.push((name.to_ascii_lowercase(), value.to_string())),
        }
    }

    /// Remove an attribute, returning its previous value.
    pub fn remove_attribute(&mut self, node: NodeId, name: &str) -> Option<String> {
        let attrs = self.attrs_mut(node)?;
        let index = attrs
            .iter()
            .position(|(key, _)| key.eq_ignore_ascii_case(name))?;
        Some(attrs.remove(index).1)
    }

    fn attrs_mut(&mut self, node: NodeId) -> Option<&mut Vec<(String, String)>> {
        match &mut self.nodes[node.0].data {
            NodeData::Element { attrs, .. } => Some(attrs),
            _ => None,
        }
    }

    pub fn element_id(&self, node: NodeId) -> Option<&str> {
        self.attribute(node, "id")
    }

    /// First connected element with the given id, in document order.
    pub fn element_by_id(&self, id: &str) -> Option<NodeId> {
        if id.is_empty() {
            return None;
        }
        self.descendants(ROOT)
            .find(|&node| self.element_id(node) == Some(id))
    }

    pub fn classes(&self, node: NodeId) -> impl Iterator<Item = &str> {
        self.attribute(node, "class")
            .unwrap_or("")
            .split_ascii_whitespace()
    }

    pub fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.classes(node).any(|c| c == class)
    }

    pub fn add_class(&mut self, node: NodeId, class: &str) {
        if self.has_class(node, class) || !self.is_element(node) {
            return;
        }

        let mut classes: Vec<&str> = self.classes(node).collect();
        classes.push(class);
        let value = classes.join(" ");
        self.set_attribute(node, "class", &value);
    }

    pub fn remove_class(&mut self, node: NodeId, class: &str) {
        if !self.has_class(node, class) {
            return;
        }

        let value = self
            .classes(node)
            .filter(|&c| c != class)
            .collect::<Vec<_>>()
            .join(" ");
        self.set_attribute(node, "class", &value);
    }

    /// Add or remove a class depending on `present`.
    pub fn set_class(&mut self, node: NodeId, class: &str, present: bool) {
        if present {
            self.add_class(node, class);
        } else {
            self.remove_class(node, class);
        }
    }

    /// Value of an inline style property.
    pub fn style(&self, node: NodeId, property: &str) -> Option<&str> {
        self.attribute(node, "style")?
            .split(';')
            .filter_map(|decl| {
                let (name, value) = decl.split_once(':')?;
                name.trim()
                    .eq_ignore_ascii_case(property)
                    .then(|| value.trim())
            })
            .last()
    }

    /// Set an inline style property. An empty value removes the property.
    pub fn set_style(&mut self, node: NodeId, property: &str, value: &str) {
        let mut decls: Vec<(String, String)> = self
            .attribute(node, "style")
            .unwrap_or("")
            .split(';')
            .filter_map(|decl| {
                let (name, value) = decl.split_once(':')?;
                let name = name.trim();
                (!name.eq_ignore_ascii_case(property))
                    .then(|| (name.to_string(), value.trim().to_string()))
            })
            .collect();

        if !value.is_empty() {
            decls.push((property.to_string(), value.to_string()));
        }

        if decls.is_empty() {
            self.remove_attribute(node, "style");
        } else {
            let style = decls
                .iter()
                .map(|(name, value)| format!("{}: {}", name, value))
                .collect::<Vec<_>>()
                .join("; ");
            self.set_attribute(node, "style", &style);
        }
    }

    /// Concatenated character data of the node and its descendants.
    pub fn text_content(&self, node: NodeId) -> String {
        let mut text = String::new();
        if let NodeData::Text(t) = self.data(node) {
            text.push_str(t);
        }
        for descendant in self.descendants(node) {
            if let NodeData::Text(t) = self.data(descendant) {
                text.push_str(t);
            }
        }
        text
    }

    /// Layout box in document coordinates, if one was assigned.
    pub fn rect(&self, node: NodeId) -> Option<Rect> {
        self.nodes[node.0].rect
    }

    pub fn set_rect(&mut self, node: NodeId, rect: Rect) {
        self.nodes[node.0].rect = Some(rect);
    }

    /// First descendant of `ctx` matching `selector`.
    pub fn query(&self, ctx: NodeId, selector: &Selector) -> Option<NodeId> {
        self.descendants(ctx)
            .find(|&node| selector.matches(self, node, ctx))
    }

    /// All descendants of `ctx` matching `selector`, in document order.
    pub fn query_all(&self, ctx: NodeId, selector: &Selector) -> Vec<NodeId> {
        self.descendants(ctx)
            .filter(|&node| selector.matches(self, node, ctx))
            .collect()
    }

    /// Nearest inclusive ancestor matching `selector`.
    pub fn closest(&self, node: NodeId, selector: &Selector) -> Option<NodeId> {
        std::iter::once(node)
            .chain(self.ancestors(node))
            .find(|&candidate| selector.matches(self, candidate, node))
    }

    pub fn matches(&self, node: NodeId, selector: &Selector) -> bool {
        selector.matches(self, node, node)
    }

    /// Serialise the whole document.
    pub fn to_html(&self) -> String {
        let mut out = String::from("<!DOCTYPE html>\n");
        self.write_node(self.html, &mut out);
        out
    }

    /// Serialise a node including its own tag.
    pub fn outer_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.write_node(node, &mut out);
        out
    }

    /// Serialise the children of a node.
    pub fn inner_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        for &child in self.children(node) {
            self.write_node(child, &mut out);
        }
        out
    }

    fn write_node(&self, node: NodeId, out: &mut String) {
        match self.data(node) {
            NodeData::Document => {
                for &child in self.children(node) {
                    self.write_node(child, out);
                }
            }
            NodeData::Text(text) => {
                let raw = self
                    .parent(node)
                    .and_then(|p| self.tag_name(p))
                    .is_some_and(|tag| RAW_TEXT_ELEMENTS.contains(&tag));
                if raw {
                    out.push_str(text);
                } else {
                    escape_into(text, false, out);
                }
            }
            NodeData::Element { tag, attrs } => {
                out.push('<');
                out.push_str(tag);
                for (name, value) in attrs {
                    out.push(' ');
                    out.push_str(name);
                    out.push_str("=\"");
                    escape_into(value, true, out);
                    out.push('"');
                }
                out.push('>');

                if VOID_ELEMENTS.contains(&tag.as_str()) {
                    return;
                }

                for &child in self.children(node) {
                    self.write_node(child, out);
                }

                out.push_str("</");
                out.push_str(tag);
                out.push('>');
            }
        }
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

fn escape_into(text: &str, attribute: bool, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
}

/// Iterator over the ancestors of a node.
pub struct Ancestors<'a> {
    doc: &'a Document,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.doc.parent(current);
        Some(current)
    }
}

/// Pre-order iterator over the descendants of a node.
pub struct Descendants<'a> {
    doc: &'a Document,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let node = self.stack.pop()?;
        self.stack
            .extend(self.doc.children(node).iter().rev().copied());
        Some(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn list_doc() -> (Document, NodeId) {
        let mut doc = Document::new();
        let ul = doc.create_element("ul");
        for label in ["One", "Two"] {
            let li = doc.create_element("li");
            doc.append_text(li, label);
            doc.append_child(ul, li);
        }
        let body = doc.body();
        doc.append_child(body, ul);
        (doc, ul)
    }

    #[test]
    fn creates_document_skeleton() {
        let doc = Document::new();

        assert_eq!(doc.tag_name(doc.html()), Some("html"));
        assert_eq!(doc.parent(doc.body()), Some(doc.html()));
        assert_eq!(
            doc.to_html(),
            "<!DOCTYPE html>\n<html><head></head><body></body></html>"
        );
    }

    #[test]
    fn appends_and_prepends_children() {
        let (mut doc, ul) = list_doc();
        let first = doc.create_element("li");
        doc.prepend_child(ul, first);

        assert_eq!(doc.children(ul).len(), 3);
        assert_eq!(doc.children(ul)[0], first);
        assert!(doc.is_connected(first));
    }

    #[test]
    fn moving_a_node_detaches_it() {
        let (mut doc, ul) = list_doc();
        let second = doc.children(ul)[1];
        let body = doc.body();
        doc.append_child(body, second);

        assert_eq!(doc.children(ul).len(), 1);
        assert_eq!(doc.parent(second), Some(body));
    }

    #[test]
    fn manages_classes() {
        let mut doc = Document::new();
        let body = doc.body();

        doc.add_class(body, "is-preload");
        doc.add_class(body, "is-touch");
        doc.add_class(body, "is-touch");
        assert_eq!(doc.attribute(body, "class"), Some("is-preload is-touch"));

        doc.remove_class(body, "is-preload");
        assert!(!doc.has_class(body, "is-preload"));
        assert!(doc.has_class(body, "is-touch"));

        doc.set_class(body, "scrolled", true);
        doc.set_class(body, "is-touch", false);
        assert_eq!(doc.classes(body).collect::<Vec<_>>(), vec!["scrolled"]);
    }

    #[test]
    fn manages_inline_styles() {
        let mut doc = Document::new();
        let body = doc.body();

        doc.set_style(body, "overflow", "hidden");
        doc.set_style(body, "color", "red");
        assert_eq!(doc.style(body, "overflow"), Some("hidden"));
        assert_eq!(doc.attribute(body, "style"), Some("overflow: hidden; color: red"));

        doc.set_style(body, "overflow", "");
        assert_eq!(doc.style(body, "overflow"), None);

        doc.set_style(body, "color", "");
        assert!(!doc.has_attribute(body, "style"));
    }

    #[test]
    fn finds_elements_by_id() {
        let (mut doc, ul) = list_doc();
        doc.set_attribute(ul, "id", "menu");

        assert_eq!(doc.element_by_id("menu"), Some(ul));
        assert_eq!(doc.element_by_id("missing"), None);
        assert_eq!(doc.element_by_id(""), None);

        doc.detach(ul);
        assert_eq!(doc.element_by_id("menu"), None);
    }

    #[test]
    fn collects_text_content() {
        let (doc, ul) = list_doc();
        assert_eq!(doc.text_content(ul), "OneTwo");
    }

    #[test]
    fn merges_adjacent_text() {
        let mut doc = Document::new();
        let p = doc.create_element("p");
        doc.append_text(p, "Fish ");
        doc.append_text(p, "& Chips");

        assert_eq!(doc.children(p).len(), 1);
        assert_eq!(doc.outer_html(p), "<p>Fish &amp; Chips</p>");
    }

    #[test]
    fn serialises_attributes_and_void_elements() {
        let mut doc = Document::new();
        let img = doc.create_element("img");
        doc.set_attribute(img, "alt", "say \"hi\"");
        doc.set_attribute(img, "data-src", "/a.jpg");

        assert_eq!(
            doc.outer_html(img),
            r#"<img alt="say &quot;hi&quot;" data-src="/a.jpg">"#
        );
    }

    #[test]
    fn removes_attributes() {
        let mut doc = Document::new();
        let img = doc.create_element("img");
        doc.set_attribute(img, "data-src", "/a.jpg");

        assert_eq!(doc.remove_attribute(img, "data-src"), Some("/a.jpg".to_string()));
        assert_eq!(doc.remove_attribute(img, "data-src"), None);
    }

    #[test]
    fn walks_descendants_in_document_order() {
        let (doc, ul) = list_doc();
        let tags: Vec<_> = doc
            .descendants(ul)
            .map(|n| doc.tag_name(n).unwrap_or("#text"))
            .collect();

        assert_eq!(tags, vec!["li", "#text", "li", "#text"]);
    }
}
