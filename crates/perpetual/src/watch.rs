use crate::{Handle, Value, WatchOptions, register};
use anyhow::{Error, bail};
use dom::{Document, NodeKey};

/// Registration as a method on tree scopes.
///
/// A [`Document`] watches its content root unless the options name another
/// root; a [`Scoped`] view always watches the node it was created for.
pub trait Watch {
    fn document_mut(&mut self) -> &mut Document;

    /// The root this scope passes implicitly, if any.
    fn bound_root(&self) -> Option<NodeKey>;

    /// Watch with default options.
    ///
    /// # Errors
    /// See [`register`].
    fn watch(&mut self, selector: &str) -> Result<Handle, Error> {
        self.watch_with(selector, WatchOptions::default())
    }

    /// # Errors
    /// See [`register`].
    fn watch_with(&mut self, selector: &str, options: WatchOptions) -> Result<Handle, Error> {
        let options = WatchOptions {
            scope_root: self.bound_root().or(options.scope_root),
            ..options
        };
        register(self.document_mut(), selector, options)
    }

    /// A view that watches under `root`.
    fn scoped(&mut self, root: NodeKey) -> Scoped<'_> {
        Scoped {
            document: self.document_mut(),
            root,
        }
    }
}

impl Watch for Document {
    fn document_mut(&mut self) -> &mut Document {
        self
    }

    fn bound_root(&self) -> Option<NodeKey> {
        None
    }
}

/// An element-scoped view of a document.
pub struct Scoped<'doc> {
    document: &'doc mut Document,
    root: NodeKey,
}

impl Scoped<'_> {
    pub const fn root(&self) -> NodeKey {
        self.root
    }
}

impl Watch for Scoped<'_> {
    fn document_mut(&mut self) -> &mut Document {
        self.document
    }

    fn bound_root(&self) -> Option<NodeKey> {
        Some(self.root)
    }
}

/// Map an element to its text content.
///
/// # Errors
/// Returns an error if the item is not a node.
pub fn text_of(document: &Document, item: &Value) -> Result<Value, Error> {
    match item.as_node() {
        Some(node) => Ok(Value::String(document.text_content(node))),
        None => bail!("text_of expects an element, got {item:?}"),
    }
}
