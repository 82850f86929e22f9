use crate::pipeline::Operation;
use crate::registration::Shared;
use crate::{Value, WatchOptions};
use anyhow::Error;
use core::cmp::Ordering;
use core::fmt;
use dom::{Document, NodeKey};
use std::rc::Rc;

/// The chainable side of a watch.
///
/// Every chain method appends one operation and hands the handle back. Clones
/// share the same pipeline, seen-set and result log.
#[derive(Clone)]
pub struct Handle {
    shared: Rc<Shared>,
}

impl fmt::Debug for Handle {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.debug_struct("Handle")
            .field("selector", &self.shared.selector)
            .field("root", &self.shared.root)
            .field("operations", &self.shared.operations.borrow())
            .field("seen", &self.seen_len())
            .finish_non_exhaustive()
    }
}

impl Handle {
    pub(crate) const fn new(shared: Rc<Shared>) -> Self {
        Self { shared }
    }

    fn push(self, operation: Operation) -> Self {
        self.shared.operations.borrow_mut().push(operation);
        self
    }

    #[must_use]
    pub fn for_each<F>(self, visitor: F) -> Self
    where
        F: Fn(&Document, &Value) -> Result<(), Error> + 'static,
    {
        self.push(Operation::for_each(visitor))
    }

    #[must_use]
    pub fn map<F>(self, mapper: F) -> Self
    where
        F: Fn(&Document, &Value) -> Result<Value, Error> + 'static,
    {
        self.push(Operation::map(mapper))
    }

    #[must_use]
    pub fn filter<F>(self, predicate: F) -> Self
    where
        F: Fn(&Document, &Value) -> Result<bool, Error> + 'static,
    {
        self.push(Operation::filter(predicate))
    }

    /// Sort each element's sequence, and keep the whole result log ordered
    /// by this comparator after every dispatch.
    #[must_use]
    pub fn sort<F>(self, comparator: F) -> Self
    where
        F: Fn(&Document, &Value, &Value) -> Result<Ordering, Error> + 'static,
    {
        self.push(Operation::sort(comparator))
    }

    #[must_use]
    pub fn reduce<F>(self, reducer: F, initial: impl Into<Value>) -> Self
    where
        F: Fn(&Document, Value, &Value) -> Result<Value, Error> + 'static,
    {
        self.push(Operation::reduce(reducer, initial.into()))
    }

    #[must_use]
    pub fn every<F>(self, predicate: F) -> Self
    where
        F: Fn(&Document, &Value) -> Result<bool, Error> + 'static,
    {
        self.push(Operation::every(predicate))
    }

    #[must_use]
    pub fn some<F>(self, predicate: F) -> Self
    where
        F: Fn(&Document, &Value) -> Result<bool, Error> + 'static,
    {
        self.push(Operation::some(predicate))
    }

    #[must_use]
    pub fn find<F>(self, predicate: F) -> Self
    where
        F: Fn(&Document, &Value) -> Result<bool, Error> + 'static,
    {
        self.push(Operation::find(predicate))
    }

    /// Every pipeline output so far, in the order elements were dispatched,
    /// or in comparator order when the chain contains a `sort`.
    pub fn results(&self) -> Vec<Value> {
        self.shared.results.borrow().clone()
    }

    /// The result log as JSON.
    ///
    /// # Errors
    /// Returns an error if a value cannot be represented in JSON.
    pub fn results_json(&self) -> Result<serde_json::Value, Error> {
        Ok(serde_json::to_value(&*self.shared.results.borrow())?)
    }

    /// How many times an element was run through the pipeline.
    pub fn dispatched(&self) -> usize {
        self.shared.dispatched.get()
    }

    pub fn has_seen(&self, node: NodeKey) -> bool {
        self.shared.seen.borrow().contains(&node)
    }

    pub fn seen_len(&self) -> usize {
        self.shared.seen.borrow().len()
    }

    pub fn operation_count(&self) -> usize {
        self.shared.operations.borrow().len()
    }

    pub fn selector(&self) -> &str {
        &self.shared.selector
    }

    pub fn scope_root(&self) -> NodeKey {
        self.shared.root
    }

    pub fn options(&self) -> WatchOptions {
        self.shared.options
    }
}
