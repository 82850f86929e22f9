//! Arena-backed document tree with batched mutation records.
//!
//! The [`Document`] owns every node in an `indextree` arena and hands out
//! stable [`NodeKey`] identities. Structural and attribute edits queue
//! [`MutationRecord`]s which are published as one batch per
//! [`Document::checkpoint`], after which every registered [`DOMSubscriber`]
//! drains its own [`UpdateStream`].

pub mod adapter;
pub mod config;
pub mod document;
pub mod parser;
pub mod printing;
pub mod updating;

pub use config::DocumentConfig;
pub use document::Document;
pub use updating::{DOMSubscriber, DOMUpdate, MutationBatch, MutationRecord, UpdateStream};

use smallvec::SmallVec;

/// A 64-bit stable key for DOM nodes. Keys are minted per document and never reused,
/// so a key keeps naming the same node across removal and reinsertion.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, PartialOrd, Ord)]
pub struct NodeKey(pub u64);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum NodeKind {
    #[default]
    Document,
    Element { tag: String },
    Text { text: String },
    Comment { text: String },
}

#[derive(Debug, Clone)]
pub struct DOMNode {
    pub key: NodeKey,
    pub kind: NodeKind,
    pub attrs: SmallVec<(String, String), 4>,
}

impl DOMNode {
    pub(crate) fn new(key: NodeKey, kind: NodeKind) -> Self {
        Self {
            key,
            kind,
            attrs: SmallVec::new(),
        }
    }

    /// Lowercase tag name for elements.
    pub fn tag(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Element { tag } => Some(tag),
            _ => None,
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}
