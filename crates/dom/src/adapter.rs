//! Selector matching over a [`Document`].

use crate::{Document, NodeKey, NodeKind};
use anyhow::{Error, anyhow};
use css_selectors::{ElementAdapter, SelectorList, matches_selector_list, parse_selector_list};

impl ElementAdapter for Document {
    type Handle = NodeKey;

    fn parent(&self, element: NodeKey) -> Option<NodeKey> {
        Self::parent(self, element).filter(|&parent| self.is_element(parent))
    }

    fn previous_sibling_element(&self, element: NodeKey) -> Option<NodeKey> {
        let id = self.node_id(element).ok()?;
        id.preceding_siblings(&self.dom)
            .filter(|&sibling| sibling != id)
            .filter_map(|sibling| self.dom.get(sibling))
            .map(|entry| entry.get())
            .find(|node| matches!(node.kind, NodeKind::Element { .. }))
            .map(|node| node.key)
    }

    fn tag_name(&self, element: NodeKey) -> &str {
        Self::tag_name(self, element).unwrap_or_default()
    }

    fn element_id(&self, element: NodeKey) -> Option<&str> {
        self.attribute(element, "id")
    }

    fn has_class(&self, element: NodeKey, class: &str) -> bool {
        self.attribute(element, "class")
            .is_some_and(|classes| classes.split_ascii_whitespace().any(|token| token == class))
    }

    fn attr(&self, element: NodeKey, name: &str) -> Option<&str> {
        self.attribute(element, name)
    }
}

/// Parse a selector string, attaching the source text to any error.
///
/// # Errors
/// Returns an error if the selector is malformed.
pub fn compile_selector(selector: &str) -> Result<SelectorList, Error> {
    parse_selector_list(selector).map_err(|err| anyhow!("invalid selector `{selector}`: {err}"))
}

impl Document {
    /// True if `node` is an element matching `selectors`.
    pub fn matches(&self, node: NodeKey, selectors: &SelectorList) -> bool {
        self.is_element(node) && matches_selector_list(self, node, selectors)
    }

    /// Every element under `root` matching `selectors`, in document order.
    /// `root` itself is never included.
    pub fn query_selector_all(&self, root: NodeKey, selectors: &SelectorList) -> Vec<NodeKey> {
        self.descendant_elements(root)
            .into_iter()
            .filter(|&node| matches_selector_list(self, node, selectors))
            .collect()
    }

    /// The first element under `root` matching `selectors`.
    pub fn query_selector(&self, root: NodeKey, selectors: &SelectorList) -> Option<NodeKey> {
        self.descendant_elements(root)
            .into_iter()
            .find(|&node| matches_selector_list(self, node, selectors))
    }
}
