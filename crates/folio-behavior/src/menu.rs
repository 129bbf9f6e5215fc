//! Mobile menu model.
//!
//! The desktop navigation list is read into a tree of [`MenuNode`]s, which
//! [`build_mobile_menu`] flattens into the structure of the mobile panel:
//! every link is tagged with its nesting depth and submenus follow their
//! parent link as nested lists.

use folio_dom::{Document, NodeId};

use crate::error::{compile, BehaviorError};

/// A linked item of the desktop navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuNode {
    pub label: String,
    pub href: String,
    pub children: Vec<MenuNode>,
}

impl MenuNode {
    pub fn new(label: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            href: href.into(),
            children: Vec::new(),
        }
    }

    pub fn with_children(mut self, children: Vec<MenuNode>) -> Self {
        self.children = children;
        self
    }
}

/// A link in the mobile panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MobileLink {
    pub label: String,
    pub href: String,
    pub depth: usize,
}

impl MobileLink {
    /// Value of the link's `class` attribute.
    pub fn class_name(&self) -> String {
        format!("link depth-{}", self.depth)
    }

    /// Classes of the indentation spans, one per level.
    pub fn indent_classes(&self) -> Vec<String> {
        (1..=self.depth).map(|level| format!("indent-{level}")).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MobileEntry {
    Link(MobileLink),
    Nested(MobileList),
}

/// One list level of the mobile panel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MobileList {
    pub entries: Vec<MobileEntry>,
}

impl MobileList {
    /// Every link in document order.
    pub fn links(&self) -> Vec<&MobileLink> {
        let mut links = Vec::new();
        self.collect_links(&mut links);
        links
    }

    fn collect_links<'a>(&'a self, out: &mut Vec<&'a MobileLink>) {
        for entry in &self.entries {
            match entry {
                MobileEntry::Link(link) => out.push(link),
                MobileEntry::Nested(list) => list.collect_links(out),
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Flatten a menu tree into mobile panel lists.
pub fn build_mobile_menu(items: &[MenuNode]) -> MobileList {
    build_level(items, 0)
}

fn build_level(items: &[MenuNode], depth: usize) -> MobileList {
    let mut entries = Vec::with_capacity(items.len());
    for item in items {
        entries.push(MobileEntry::Link(MobileLink {
            label: item.label.clone(),
            href: item.href.clone(),
            depth,
        }));
        if !item.children.is_empty() {
            entries.push(MobileEntry::Nested(build_level(&item.children, depth + 1)));
        }
    }
    MobileList { entries }
}

/// Read the menu tree under a `<ul>`.
///
/// Each direct `<li>` contributes its first link, if it has one, and the
/// items of its direct child list. Items without a link are skipped along
/// with their submenu.
pub fn read_menu(doc: &Document, list: NodeId) -> Result<Vec<MenuNode>, BehaviorError> {
    let items = compile(":scope > li")?;
    let anchor = compile("a")?;
    let submenu = compile(":scope > ul")?;

    read_level(doc, list, &items, &anchor, &submenu)
}

fn read_level(
    doc: &Document,
    list: NodeId,
    items: &folio_dom::Selector,
    anchor: &folio_dom::Selector,
    submenu: &folio_dom::Selector,
) -> Result<Vec<MenuNode>, BehaviorError> {
    let mut nodes = Vec::new();
    for item in doc.query_all(list, items) {
        let Some(link) = doc.query(item, anchor) else {
            continue;
        };

        let children = match doc.query(item, submenu) {
            Some(sub) => read_level(doc, sub, items, anchor, submenu)?,
            None => Vec::new(),
        };

        nodes.push(MenuNode {
            label: doc.text_content(link),
            href: doc.attribute(link, "href").unwrap_or_default().to_string(),
            children,
        });
    }
    Ok(nodes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_dom::{parse_html, select};
    use pretty_assertions::assert_eq;

    #[test]
    fn reads_nested_navigation() {
        let doc = parse_html(
            r##"<nav id="nav"><ul>
                <li><a href="/">Home</a></li>
                <li><a href="/work">Work</a>
                    <ul>
                        <li><a href="/work/a">A</a></li>
                        <li><span>No link</span></li>
                    </ul>
                </li>
                <li>Plain</li>
            </ul></nav>"##,
        )
        .unwrap();
        let list = select(&doc, "#nav ul").unwrap().unwrap();

        let menu = read_menu(&doc, list).unwrap();
        assert_eq!(
            menu,
            vec![
                MenuNode::new("Home", "/"),
                MenuNode::new("Work", "/work")
                    .with_children(vec![MenuNode::new("A", "/work/a")]),
            ]
        );
    }

    #[test]
    fn tags_links_with_depth() {
        let menu = vec![
            MenuNode::new("Home", "/"),
            MenuNode::new("Work", "/work").with_children(vec![MenuNode::new("A", "/work/a")
                .with_children(vec![MenuNode::new("Deep", "/work/a/deep")])]),
        ];

        let mobile = build_mobile_menu(&menu);
        let depths: Vec<(&str, usize)> = mobile
            .links()
            .into_iter()
            .map(|link| (link.label.as_str(), link.depth))
            .collect();

        assert_eq!(
            depths,
            vec![("Home", 0), ("Work", 0), ("A", 1), ("Deep", 2)]
        );
        assert_eq!(mobile.entries.len(), 3);
        assert!(matches!(mobile.entries[2], MobileEntry::Nested(_)));
    }

    #[test]
    fn indentation_matches_depth() {
        let link = MobileLink {
            label: "Deep".to_string(),
            href: "/deep".to_string(),
            depth: 2,
        };

        assert_eq!(link.class_name(), "link depth-2");
        assert_eq!(link.indent_classes(), vec!["indent-1", "indent-2"]);

        let top = MobileLink { depth: 0, ..link };
        assert!(top.indent_classes().is_empty());
    }

    #[test]
    fn empty_menu_builds_empty_list() {
        assert!(build_mobile_menu(&[]).is_empty());
    }
}
