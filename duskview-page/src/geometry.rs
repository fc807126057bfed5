//! # Overlay Geometry
//!
//! Works out where the overlay container must sit so that it covers its
//! video, whatever CSS layout the page uses. Three tiers, first match wins:
//!
//! 1. the video has an inline `top/right/bottom/left`: copy all four inline values
//! 2. the stylesheet positions it: copy all four computed values
//! 3. neither: offset of the video from its positioning ancestor, `top`/`left` only
//!
//! Tier 3 leaves `right`/`bottom` alone; the container's size already
//! follows the video so two edges are enough.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::host::{Edge, NodeId, PageHost, Rect};

/// `property: value;` inside a serialized style attribute
static STYLE_DECLARATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([a-zA-Z-]+)\s*:\s*([^;]*);").expect("valid style declaration regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementTier {
    Inline,
    Stylesheet,
    Offset,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OverlayPlacement {
    pub tier: PlacementTier,
    pub top: Option<String>,
    pub right: Option<String>,
    pub bottom: Option<String>,
    pub left: Option<String>,
}

impl OverlayPlacement {
    pub fn edge(&self, edge: Edge) -> Option<&str> {
        match edge {
            Edge::Top => self.top.as_deref(),
            Edge::Right => self.right.as_deref(),
            Edge::Bottom => self.bottom.as_deref(),
            Edge::Left => self.left.as_deref(),
        }
    }

    /// Write the placement onto a node's inline style
    pub fn apply(&self, host: &mut dyn PageHost, node: NodeId) {
        for edge in Edge::ALL {
            if let Some(value) = self.edge(edge) {
                host.set_inline_style(node, edge.css_name(), value);
            }
        }
    }

    /// Non-empty declarations, e.g. `top: 10px; left: 20px;`
    pub fn to_css(&self) -> String {
        Edge::ALL
            .iter()
            .filter_map(|edge| match self.edge(*edge) {
                Some(value) if !value.is_empty() => Some(format!("{}: {};", edge.css_name(), value)),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn copied(tier: PlacementTier, mut read: impl FnMut(Edge) -> String) -> Self {
        Self {
            tier,
            top: Some(read(Edge::Top)),
            right: Some(read(Edge::Right)),
            bottom: Some(read(Edge::Bottom)),
            left: Some(read(Edge::Left)),
        }
    }
}

fn is_set(value: &str) -> bool {
    !value.is_empty() && value != "auto"
}

/// Nearest ancestor positioned `relative` or `fixed`, starting at the parent.
/// Falls back to the document element.
pub fn find_positioning_ancestor(host: &dyn PageHost, node: NodeId) -> NodeId {
    let mut current = host.parent(node);
    while let Some(ancestor) = current {
        let position = host.computed_style(ancestor, "position");
        if position == "relative" || position == "fixed" {
            return ancestor;
        }
        current = host.parent(ancestor);
    }
    host.document_element()
}

/// Bounding box in document coordinates
pub fn document_coordinates(host: &dyn PageHost, node: NodeId) -> Rect {
    let (scroll_x, scroll_y) = host.scroll_offset();
    host.bounding_rect(node).translate(scroll_x, scroll_y)
}

pub fn compute_overlay_placement(host: &dyn PageHost, video: NodeId, ancestor: NodeId) -> OverlayPlacement {
    if Edge::ALL.iter().any(|e| is_set(&host.inline_style(video, e.css_name()))) {
        tracing::debug!("Placement from inline video position");
        return OverlayPlacement::copied(PlacementTier::Inline, |e| host.inline_style(video, e.css_name()));
    }

    if Edge::ALL.iter().any(|e| is_set(&host.computed_style(video, e.css_name()))) {
        tracing::debug!("Placement from stylesheet video position");
        return OverlayPlacement::copied(PlacementTier::Stylesheet, |e| {
            host.computed_style(video, e.css_name())
        });
    }

    let parent = document_coordinates(host, ancestor);
    let own = document_coordinates(host, video);
    tracing::debug!(
        "Placement from offset: top {} left {}",
        own.top - parent.top,
        own.left - parent.left
    );

    OverlayPlacement {
        tier: PlacementTier::Offset,
        top: Some(format!("{}px", own.top - parent.top)),
        right: None,
        bottom: None,
        left: Some(format!("{}px", own.left - parent.left)),
    }
}

/// Value of one property in a serialized inline style, empty when absent.
///
/// `extract_style_value("top: 0px; left: 277.333px;", "left") == "277.333px"`
pub fn extract_style_value(declaration: &str, property: &str) -> String {
    STYLE_DECLARATION
        .captures_iter(declaration)
        .find(|caps| &caps[1] == property)
        .map(|caps| caps[2].trim().to_string())
        .unwrap_or_default()
}
