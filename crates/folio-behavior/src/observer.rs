//! Intersection observers.
//!
//! An observer watches target elements and reports when they enter or leave
//! the viewport, grown or shrunk by a root margin. A target counts as
//! intersecting once the visible fraction of its box reaches the observer's
//! threshold; a threshold of zero accepts any overlap, including boxes that
//! only touch the root edge.

use std::collections::BTreeMap;
use std::rc::Rc;
use std::str::FromStr;

use folio_dom::{Document, NodeId, Rect};

use crate::error::BehaviorError;
use crate::runtime::{Page, Viewport};

/// Handle to an observer registered with a [`Page`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(u64);

pub(crate) type ObserverCallback = Rc<dyn Fn(&mut Page, &[IntersectionEntry], ObserverId)>;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Length {
    Px(f64),
    Percent(f64),
}

impl Length {
    fn parse(token: &str) -> Option<Self> {
        if let Some(value) = token.strip_suffix("px") {
            value.parse().ok().map(Length::Px)
        } else if let Some(value) = token.strip_suffix('%') {
            value.parse().ok().map(Length::Percent)
        } else if token == "0" {
            Some(Length::Px(0.0))
        } else {
            None
        }
    }

    fn resolve(self, basis: f64) -> f64 {
        match self {
            Length::Px(value) => value,
            Length::Percent(percent) => basis * percent / 100.0,
        }
    }
}

/// Margin applied to the viewport before intersection testing.
///
/// Parsed from CSS margin shorthand with one to four `px` or `%` values.
/// Percentages of the top and bottom edges refer to the viewport height,
/// those of the left and right edges to its width. Negative values shrink
/// the root.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RootMargin {
    top: Length,
    right: Length,
    bottom: Length,
    left: Length,
}

impl RootMargin {
    pub const ZERO: RootMargin = RootMargin {
        top: Length::Px(0.0),
        right: Length::Px(0.0),
        bottom: Length::Px(0.0),
        left: Length::Px(0.0),
    };

    pub fn parse(source: &str) -> Result<Self, BehaviorError> {
        let invalid = || BehaviorError::RootMargin(source.to_string());
        let lengths = source
            .split_whitespace()
            .map(Length::parse)
            .collect::<Option<Vec<_>>>()
            .ok_or_else(invalid)?;

        let (top, right, bottom, left) = match lengths.as_slice() {
            [] => return Ok(Self::ZERO),
            [all] => (*all, *all, *all, *all),
            [vertical, horizontal] => (*vertical, *horizontal, *vertical, *horizontal),
            [top, horizontal, bottom] => (*top, *horizontal, *bottom, *horizontal),
            [top, right, bottom, left] => (*top, *right, *bottom, *left),
            _ => return Err(invalid()),
        };

        Ok(Self {
            top,
            right,
            bottom,
            left,
        })
    }

    /// The root rectangle after applying this margin to `root`.
    pub fn apply(&self, root: &Rect) -> Rect {
        root.expand(
            self.top.resolve(root.height),
            self.right.resolve(root.width),
            self.bottom.resolve(root.height),
            self.left.resolve(root.width),
        )
    }
}

impl Default for RootMargin {
    fn default() -> Self {
        Self::ZERO
    }
}

impl FromStr for RootMargin {
    type Err = BehaviorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Configuration of an observer.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ObserverOptions {
    pub root_margin: RootMargin,
    /// Visible fraction of the target, from 0 to 1, required to intersect
    pub threshold: f64,
}

impl ObserverOptions {
    pub fn new(root_margin: &str, threshold: f64) -> Result<Self, BehaviorError> {
        Ok(Self {
            root_margin: RootMargin::parse(root_margin)?,
            threshold,
        })
    }
}

/// A change in a target's intersection with the root.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntersectionEntry {
    pub target: NodeId,
    pub is_intersecting: bool,
    pub intersection_ratio: f64,
    pub bounding_client_rect: Rect,
}

/// Measure `target` against the viewport.
pub(crate) fn measure(
    doc: &Document,
    viewport: &Viewport,
    options: &ObserverOptions,
    target: NodeId,
) -> IntersectionEntry {
    let detached = IntersectionEntry {
        target,
        is_intersecting: false,
        intersection_ratio: 0.0,
        bounding_client_rect: Rect::default(),
    };

    if !doc.is_connected(target) {
        return detached;
    }
    let Some(rect) = doc.rect(target) else {
        return detached;
    };

    let client = rect.translate(0.0, -viewport.scroll_y);
    let root = options.root_margin.apply(&viewport.client_rect());

    let Some(overlap) = client.intersection(&root) else {
        return IntersectionEntry {
            bounding_client_rect: client,
            ..detached
        };
    };

    let area = client.area();
    let ratio = if area > 0.0 {
        (overlap.area() / area).min(1.0)
    } else {
        1.0
    };

    IntersectionEntry {
        target,
        is_intersecting: ratio >= options.threshold,
        intersection_ratio: ratio,
        bounding_client_rect: client,
    }
}

pub(crate) struct Observer {
    options: ObserverOptions,
    callback: ObserverCallback,
    /// Observed targets with the intersecting state last reported
    targets: Vec<(NodeId, Option<bool>)>,
}

/// Registry of the observers on a page.
#[derive(Default)]
pub(crate) struct Observers {
    next_id: u64,
    observers: BTreeMap<ObserverId, Observer>,
}

impl Observers {
    pub(crate) fn create(&mut self, options: ObserverOptions, callback: ObserverCallback) -> ObserverId {
        self.next_id += 1;
        let id = ObserverId(self.next_id);
        self.observers.insert(
            id,
            Observer {
                options,
                callback,
                targets: Vec::new(),
            },
        );
        id
    }

    pub(crate) fn observe(&mut self, id: ObserverId, target: NodeId) -> bool {
        let Some(observer) = self.observers.get_mut(&id) else {
            return false;
        };
        if observer.targets.iter().any(|(node, _)| *node == target) {
            return false;
        }
        observer.targets.push((target, None));
        true
    }

    pub(crate) fn unobserve(&mut self, id: ObserverId, target: NodeId) -> bool {
        let Some(observer) = self.observers.get_mut(&id) else {
            return false;
        };
        let before = observer.targets.len();
        observer.targets.retain(|(node, _)| *node != target);
        observer.targets.len() != before
    }

    pub(crate) fn disconnect(&mut self, id: ObserverId) -> bool {
        self.observers.remove(&id).is_some()
    }

    pub(crate) fn ids(&self) -> Vec<ObserverId> {
        self.observers.keys().copied().collect()
    }

    pub(crate) fn targets(&self, id: ObserverId) -> Vec<NodeId> {
        self.observers
            .get(&id)
            .map(|observer| observer.targets.iter().map(|(node, _)| *node).collect())
            .unwrap_or_default()
    }

    pub(crate) fn len(&self) -> usize {
        self.observers.len()
    }

    /// Measure every target of `id`, returning the entries whose state changed.
    pub(crate) fn collect(
        &mut self,
        id: ObserverId,
        doc: &Document,
        viewport: &Viewport,
    ) -> Option<(ObserverCallback, Vec<IntersectionEntry>)> {
        let observer = self.observers.get_mut(&id)?;
        let options = observer.options;

        let mut entries = Vec::new();
        for (target, reported) in &mut observer.targets {
            let entry = measure(doc, viewport, &options, *target);
            if *reported != Some(entry.is_intersecting) {
                *reported = Some(entry.is_intersecting);
                entries.push(entry);
            }
        }

        if entries.is_empty() {
            None
        } else {
            Some((Rc::clone(&observer.callback), entries))
        }
    }
}
