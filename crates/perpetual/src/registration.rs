use crate::pipeline::{self, Operation};
use crate::{Handle, Value, WatchOptions};
use anyhow::{Error, ensure};
use core::cell::{Cell, RefCell};
use css_selectors::SelectorList;
use dom::adapter::compile_selector;
use dom::{DOMSubscriber, DOMUpdate, Document, NodeKey, UpdateStream};
use log::{debug, trace};
use std::collections::HashSet;
use std::rc::Rc;
use tracing::info_span;

/// State shared between a registration and every clone of its [`Handle`].
///
/// Each cell is borrowed only for the duration of a single read or write, so
/// pipeline functions may append operations or inspect results mid-dispatch.
pub(crate) struct Shared {
    pub(crate) selector: String,
    pub(crate) selectors: SelectorList,
    pub(crate) root: NodeKey,
    pub(crate) options: WatchOptions,
    pub(crate) operations: RefCell<Vec<Operation>>,
    pub(crate) seen: RefCell<HashSet<NodeKey>>,
    pub(crate) results: RefCell<Vec<Value>>,
    pub(crate) dispatched: Cell<usize>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Origin {
    Existing,
    Inserted,
}

/// The document-side half of a watch: owns the update stream and the
/// snapshot of elements that matched at registration.
struct Registration {
    shared: Rc<Shared>,
    stream: UpdateStream,
    existing: Option<Vec<NodeKey>>,
}

impl Registration {
    fn process(&self, document: &Document, element: NodeKey, origin: Origin) -> Result<(), Error> {
        let shared = &self.shared;
        let first_sight = shared.seen.borrow_mut().insert(element);
        let reprocess = origin == Origin::Inserted && shared.options.match_reappearance;
        if !first_sight && !reprocess {
            trace!("{element:?} already dispatched for `{}`", shared.selector);
            return Ok(());
        }
        let operations = shared.operations.borrow().clone();
        trace!(
            "dispatching {element:?} through {} operations for `{}`",
            operations.len(),
            shared.selector
        );
        let outputs = pipeline::run(document, &operations, vec![Value::Node(element)])?;
        let produced = !outputs.is_empty();
        shared.results.borrow_mut().extend(outputs);
        shared.dispatched.set(shared.dispatched.get().saturating_add(1));
        if produced {
            self.resequence(document, &operations)?;
        }
        Ok(())
    }

    /// Keep the result log ordered by the last `sort` in the chain. Each
    /// dispatch reevaluates the order with the comparator in effect then.
    fn resequence(&self, document: &Document, operations: &[Operation]) -> Result<(), Error> {
        let Some(comparator) = operations.iter().rev().find_map(Operation::comparator) else {
            return Ok(());
        };
        let log = self.shared.results.borrow().clone();
        let sorted = pipeline::sort_items(document, comparator, log)?;
        *self.shared.results.borrow_mut() = sorted;
        Ok(())
    }
}

impl DOMSubscriber for Registration {
    fn on_checkpoint(&mut self, document: &Document) -> Result<(), Error> {
        let _span = info_span!("perpetual.dispatch", selector = %self.shared.selector).entered();

        if let Some(existing) = self.existing.take() {
            debug!(
                "processing {} existing matches for `{}`",
                existing.len(),
                self.shared.selector
            );
            for element in existing {
                if document.is_alive(element) {
                    self.process(document, element, Origin::Existing)?;
                }
            }
        }

        let root = self.shared.root;
        for record in self.stream.drain_records()? {
            match &record.update {
                DOMUpdate::ChildList { added, .. } if record.is_within(root) => {
                    for &node in added {
                        if document.matches(node, &self.shared.selectors) {
                            self.process(document, node, Origin::Inserted)?;
                        }
                    }
                }
                DOMUpdate::Destroyed { nodes } => {
                    let mut seen = self.shared.seen.borrow_mut();
                    let before = seen.len();
                    for node in nodes {
                        seen.remove(node);
                    }
                    if seen.len() != before {
                        trace!("pruned {} destroyed elements", before - seen.len());
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }
}

/// Start watching `selector` under the scope chosen by `options`.
///
/// Elements that already match are captured now and dispatched at the next
/// [`Document::checkpoint`], together with anything inserted in the meantime.
/// Operations chained onto the returned handle before that checkpoint apply
/// to all of them.
///
/// # Errors
/// Returns an error if the selector is malformed or the explicit scope root is
/// not a node of `document`.
pub fn register(
    document: &mut Document,
    selector: &str,
    options: WatchOptions,
) -> Result<Handle, Error> {
    let selectors = compile_selector(selector)?;
    let root = match options.scope_root {
        Some(root) => {
            ensure!(
                document.is_alive(root),
                "scope root {root:?} is not a node of this document"
            );
            root
        }
        None => document.content_root(),
    };
    let existing = options
        .match_existing
        .then(|| document.query_selector_all(root, &selectors));
    let shared = Rc::new(Shared {
        selector: selector.to_owned(),
        selectors,
        root,
        options,
        operations: RefCell::new(Vec::new()),
        seen: RefCell::new(HashSet::new()),
        results: RefCell::new(Vec::new()),
        dispatched: Cell::new(0),
    });
    let registration = Registration {
        shared: Rc::clone(&shared),
        stream: document.subscribe(),
        existing,
    };
    debug!(
        "watching `{selector}` under {root:?} (existing: {}, reappearance: {})",
        options.match_existing, options.match_reappearance
    );
    document.observe(Rc::new(RefCell::new(registration)));
    Ok(Handle::new(shared))
}
