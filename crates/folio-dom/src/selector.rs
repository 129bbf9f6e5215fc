//! CSS selector parsing and matching.
//!
//! Supports the subset of selectors the site behaviour needs: type, universal,
//! id, class and attribute selectors, compound selectors, descendant and
//! child combinators, `:scope`, and comma-separated lists.

use crate::document::{Document, NodeId};

/// Errors produced while parsing a selector.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectorError {
    #[error("Empty selector")]
    Empty,

    #[error("Unexpected '{found}' at position {position}")]
    Unexpected { found: char, position: usize },

    #[error("Expected a name at position {0}")]
    ExpectedName(usize),

    #[error("Unterminated attribute selector starting at position {0}")]
    UnterminatedAttribute(usize),

    #[error("Unsupported pseudo-class ':{0}'")]
    UnsupportedPseudo(String),
}

/// A parsed selector list.
#[derive(Debug, Clone, PartialEq)]
pub struct Selector {
    alternatives: Vec<Complex>,
}

#[derive(Debug, Clone, PartialEq)]
struct Complex {
    parts: Vec<Part>,
}

#[derive(Debug, Clone, PartialEq)]
struct Part {
    /// Relation to the previous part. Ignored for the first part.
    combinator: Combinator,
    compound: Compound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

#[derive(Debug, Clone, PartialEq, Default)]
struct Compound {
    scope: bool,
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<AttrMatch>,
}

#[derive(Debug, Clone, PartialEq)]
struct AttrMatch {
    name: String,
    op: AttrOp,
    value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttrOp {
    Exists,
    Equals,
    Prefix,
    Suffix,
    Contains,
    Word,
}

impl Selector {
    /// Parse a selector list such as `img[data-src], img[loading="lazy"]`.
    pub fn parse(source: &str) -> Result<Self, SelectorError> {
        let mut parser = Parser {
            chars: source.chars().collect(),
            pos: 0,
        };
        let alternatives = parser.parse_list()?;
        Ok(Self { alternatives })
    }

    /// Whether `node` matches, with `scope` as the `:scope` element.
    pub fn matches(&self, doc: &Document, node: NodeId, scope: NodeId) -> bool {
        self.alternatives
            .iter()
            .any(|complex| matches_parts(doc, node, &complex.parts, scope))
    }
}

impl std::str::FromStr for Selector {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// First element in the document matching `selector`.
pub fn select(doc: &Document, selector: &str) -> Result<Option<NodeId>, SelectorError> {
    let selector = Selector::parse(selector)?;
    Ok(doc.query(doc.root(), &selector))
}

/// All elements in the document matching `selector`, in document order.
pub fn select_all(doc: &Document, selector: &str) -> Result<Vec<NodeId>, SelectorError> {
    let selector = Selector::parse(selector)?;
    Ok(doc.query_all(doc.root(), &selector))
}

fn matches_parts(doc: &Document, node: NodeId, parts: &[Part], scope: NodeId) -> bool {
    let Some((last, rest)) = parts.split_last() else {
        return false;
    };

    if !last.compound.matches(doc, node, scope) {
        return false;
    }

    if rest.is_empty() {
        return true;
    }

    match last.combinator {
        Combinator::Child => doc
            .parent(node)
            .is_some_and(|parent| matches_parts(doc, parent, rest, scope)),
        Combinator::Descendant => doc
            .ancestors(node)
            .any(|ancestor| matches_parts(doc, ancestor, rest, scope)),
    }
}

impl Compound {
    fn matches(&self, doc: &Document, node: NodeId, scope: NodeId) -> bool {
        if self.scope && node != scope {
            return false;
        }

        let Some(tag) = doc.tag_name(node) else {
            // `:scope` alone may refer to the document root
            return self.scope
                && self.tag.is_none()
                && self.id.is_none()
                && self.classes.is_empty()
                && self.attrs.is_empty();
        };

        if let Some(expected) = &self.tag {
            if expected != tag {
                return false;
            }
        }

        if let Some(id) = &self.id {
            if doc.element_id(node) != Some(id.as_str()) {
                return false;
            }
        }

        if !self.classes.iter().all(|class| doc.has_class(node, class)) {
            return false;
        }

        self.attrs.iter().all(|attr| attr.matches(doc, node))
    }
}

impl AttrMatch {
    fn matches(&self, doc: &Document, node: NodeId) -> bool {
        let Some(actual) = doc.attribute(node, &self.name) else {
            return false;
        };

        let expected = self.value.as_str();
        match self.op {
            AttrOp::Exists => true,
            AttrOp::Equals => actual == expected,
            AttrOp::Prefix => !expected.is_empty() && actual.starts_with(expected),
            AttrOp::Suffix => !expected.is_empty() && actual.ends_with(expected),
            AttrOp::Contains => !expected.is_empty() && actual.contains(expected),
            AttrOp::Word => actual.split_ascii_whitespace().any(|word| word == expected),
        }
    }
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn unexpected(&self) -> SelectorError {
        match self.peek() {
            Some(found) => SelectorError::Unexpected {
                found,
                position: self.pos,
            },
            None => SelectorError::ExpectedName(self.pos),
        }
    }

    /// Skip whitespace, returning whether any was skipped.
    fn skip_whitespace(&mut self) -> bool {
        let start = self.pos;
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
        self.pos > start
    }

    fn parse_list(&mut self) -> Result<Vec<Complex>, SelectorError> {
        self.skip_whitespace();
        if self.peek().is_none() {
            return Err(SelectorError::Empty);
        }

        let mut list = Vec::new();
        loop {
            self.skip_whitespace();
            list.push(self.parse_complex()?);
            self.skip_whitespace();

            match self.peek() {
                None => break,
                Some(',') => self.pos += 1,
                Some(_) => return Err(self.unexpected()),
            }
        }

        Ok(list)
    }

    fn parse_complex(&mut self) -> Result<Complex, SelectorError> {
        let mut parts = Vec::new();
        let mut combinator = Combinator::Descendant;

        loop {
            let compound = self.parse_compound()?;
            parts.push(Part {
                combinator,
                compound,
            });

            let had_whitespace = self.skip_whitespace();
            match self.peek() {
                None | Some(',') => break,
                Some('>') => {
                    self.pos += 1;
                    self.skip_whitespace();
                    combinator = Combinator::Child;
                }
                Some(_) if had_whitespace => combinator = Combinator::Descendant,
                Some(_) => return Err(self.unexpected()),
            }
        }

        Ok(Complex { parts })
    }

    fn parse_compound(&mut self) -> Result<Compound, SelectorError> {
        let start = self.pos;
        let mut compound = Compound::default();

        match self.peek() {
            Some('*') => self.pos += 1,
            Some(c) if is_name_char(c) => {
                compound.tag = Some(self.parse_name()?.to_ascii_lowercase());
            }
            _ => {}
        }

        loop {
            match self.peek() {
                Some('#') => {
                    self.pos += 1;
                    compound.id = Some(self.parse_name()?);
                }
                Some('.') => {
                    self.pos += 1;
                    compound.classes.push(self.parse_name()?);
                }
                Some('[') => {
                    compound.attrs.push(self.parse_attribute()?);
                }
                Some(':') => {
                    self.pos += 1;
                    let pseudo = self.parse_name()?;
                    if !pseudo.eq_ignore_ascii_case("scope") {
                        return Err(SelectorError::UnsupportedPseudo(pseudo));
                    }
                    compound.scope = true;
                }
                _ => break,
            }
        }

        if self.pos == start {
            return Err(self.unexpected());
        }

        Ok(compound)
    }

    fn parse_name(&mut self) -> Result<String, SelectorError> {
        let start = self.pos;
        while self.peek().is_some_and(is_name_char) {
            self.pos += 1;
        }

        if self.pos == start {
            return Err(self.unexpected());
        }

        Ok(self.chars[start..self.pos].iter().collect())
    }

    fn parse_attribute(&mut self) -> Result<AttrMatch, SelectorError> {
        let open = self.pos;
        self.pos += 1;
        self.skip_whitespace();

        let name = self.parse_name()?.to_ascii_lowercase();
        self.skip_whitespace();

        let op = match self.peek() {
            Some(']') => {
                self.pos += 1;
                return Ok(AttrMatch {
                    name,
                    op: AttrOp::Exists,
                    value: String::new(),
                });
            }
            Some('=') => {
                self.pos += 1;
                AttrOp::Equals
            }
            Some(c @ ('^' | '$' | '*' | '~')) => {
                self.pos += 1;
                if self.peek() != Some('=') {
                    return Err(self.unexpected());
                }
                self.pos += 1;
                match c {
                    '^' => AttrOp::Prefix,
                    '$' => AttrOp::Suffix,
                    '*' => AttrOp::Contains,
                    _ => AttrOp::Word,
                }
            }
            None => return Err(SelectorError::UnterminatedAttribute(open)),
            Some(_) => return Err(self.unexpected()),
        };

        self.skip_whitespace();
        let value = match self.peek() {
            Some(quote @ ('"' | '\'')) => {
                self.pos += 1;
                let start = self.pos;
                while self.peek().is_some_and(|c| c != quote) {
                    self.pos += 1;
                }
                if self.peek().is_none() {
                    return Err(SelectorError::UnterminatedAttribute(open));
                }
                let value: String = self.chars[start..self.pos].iter().collect();
                self.pos += 1;
                value
            }
            None => return Err(SelectorError::UnterminatedAttribute(open)),
            Some(_) => self.parse_name()?,
        };

        self.skip_whitespace();
        match self.peek() {
            Some(']') => self.pos += 1,
            None => return Err(SelectorError::UnterminatedAttribute(open)),
            Some(_) => return Err(self.unexpected()),
        }

        Ok(AttrMatch { name, op, value })
    }
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_' || !c.is_ascii()
}
