//! Selectors Level 3 element matching for watched subtrees.
//! Reference: <https://www.w3.org/TR/selectors-3/>
//!
//! This module implements the subset needed to decide which elements a watch
//! is interested in:
//! - Type, universal, class, id, attribute presence and attribute equals selectors
//! - Combinators: descendant, child, adjacent sibling, general sibling
//! - Selector groups separated by commas
//!
//! Parsing is strict: malformed selectors are reported as [`SelectorError`]
//! instead of being silently reinterpreted.

mod error;
mod matcher;
mod parser;

// Re-export public API
pub use error::SelectorError;
pub use matcher::{matches_complex, matches_compound, matches_selector_list};
pub use parser::{parse_complex_selector, parse_selector_list};

/// An adapter that abstracts DOM access for selector matching.
/// Implement this for your DOM layer.
pub trait ElementAdapter {
    type Handle: Copy + Eq;

    /// Parent element if any.
    /// Selectors 3 §11: Combinators (for tree relationships)
    fn parent(&self, element: Self::Handle) -> Option<Self::Handle>;

    /// Previous sibling element (skip non-elements if your DOM has mixed nodes).
    /// Selectors 3 §11: Sibling combinators
    fn previous_sibling_element(&self, element: Self::Handle) -> Option<Self::Handle>;

    /// Tag name in ASCII lowercase (per HTML parsing conventions).
    /// Selectors 3 §5: Type selectors
    fn tag_name(&self, element: Self::Handle) -> &str;

    /// Returns Some(id) if the element has an id attribute, else None.
    /// Selectors 3 §7: ID selectors
    fn element_id(&self, element: Self::Handle) -> Option<&str>;

    /// True if the element has the given class token.
    /// Selectors 3 §6: Class selectors
    fn has_class(&self, element: Self::Handle, class: &str) -> bool;

    /// Returns the attribute value if present.
    /// Selectors 3 §8: Attribute selectors
    fn attr(&self, element: Self::Handle, name: &str) -> Option<&str>;
}

/// Simple selectors (subset).
/// Selectors 3 §5, 6, 7, 8
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum SimpleSelector {
    Type(String),
    Class(String),
    IdSelector(String),
    /// `[attr]`
    AttrExists(String),
    /// `[attr=value]`, value compared case-sensitively.
    AttrEquals { name: String, value: String },
    /// `*`
    Universal,
}

/// A compound selector is a sequence of simple selectors (no combinators).
/// Selectors 3 §5: Simple selector sequences
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct CompoundSelector {
    pub simples: Vec<SimpleSelector>,
}

/// Combinators between compounds.
/// Selectors 3 §11: Combinators
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Combinator {
    Descendant,
    Child,
    AdjacentSibling,
    GeneralSibling,
}

/// A complex selector is one or more compounds separated by combinators.
/// Selectors 3 §3, 11
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct ComplexSelector {
    pub first: CompoundSelector,
    pub rest: Vec<(Combinator, CompoundSelector)>,
}

/// A selector list separated by commas.
/// Selectors 3 §4: Groups of selectors
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct SelectorList {
    pub selectors: Vec<ComplexSelector>,
}
