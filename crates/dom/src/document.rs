use crate::updating::{DOMSubscriber, DOMUpdate, MutationBatch, MutationRecord, UpdateStream};
use crate::{DOMNode, DocumentConfig, NodeKey, NodeKind};
use anyhow::{Error, anyhow, bail, ensure};
use core::cell::RefCell;
use core::mem::{replace, take};
use indextree::{Arena, NodeId};
use log::{debug, trace};
use smallvec::SmallVec;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::info_span;

/// A document tree.
///
/// Nodes live in an arena and are addressed by [`NodeKey`]. Every edit queues a
/// [`MutationRecord`]; records are published in one batch per
/// [`checkpoint`](Self::checkpoint).
pub struct Document {
    pub(crate) dom: Arena<DOMNode>,
    pub(crate) root: NodeId,
    keys: HashMap<NodeKey, NodeId>,
    next_key: u64,
    next_seq: u64,
    pending: Vec<MutationRecord>,
    update_sender: broadcast::Sender<MutationBatch>,
    subscribers: Vec<Rc<RefCell<dyn DOMSubscriber>>>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// An empty HTML document: `#document > html > (head, body)`.
    /// Configuration is read from the environment.
    pub fn new() -> Self {
        Self::with_config(&DocumentConfig::from_env())
    }

    /// An empty HTML document using an explicit configuration.
    pub fn with_config(config: &DocumentConfig) -> Self {
        let mut document = Self::bare(config);
        let html = document.alloc(NodeKind::Element { tag: "html".into() });
        let head = document.alloc(NodeKind::Element { tag: "head".into() });
        let body = document.alloc(NodeKind::Element { tag: "body".into() });
        document.attach_unrecorded(document.root, html);
        document.attach_unrecorded(html, head);
        document.attach_unrecorded(html, body);
        document
    }

    /// A document holding only the document node.
    pub(crate) fn bare(config: &DocumentConfig) -> Self {
        let mut dom = Arena::new();
        let root = dom.new_node(DOMNode::new(NodeKey(0), NodeKind::Document));
        let (update_sender, _) = broadcast::channel(config.update_capacity.max(1));
        let mut keys = HashMap::new();
        keys.insert(NodeKey(0), root);
        Self {
            dom,
            root,
            keys,
            next_key: 1,
            next_seq: 0,
            pending: Vec::new(),
            update_sender,
            subscribers: Vec::new(),
        }
    }

    // -----------------------
    // Node creation
    // -----------------------

    /// Mint a key and allocate a detached node.
    pub(crate) fn alloc(&mut self, kind: NodeKind) -> NodeId {
        let key = NodeKey(self.next_key);
        self.next_key = self.next_key.saturating_add(1);
        let id = self.dom.new_node(DOMNode::new(key, kind));
        self.keys.insert(key, id);
        id
    }

    /// Append without queuing a record. Only used while building a fresh tree.
    pub(crate) fn attach_unrecorded(&mut self, parent: NodeId, child: NodeId) {
        parent.append(child, &mut self.dom);
    }

    /// Create a detached element. The tag is stored in ASCII lowercase.
    pub fn create_element(&mut self, tag: &str) -> NodeKey {
        let id = self.alloc(NodeKind::Element {
            tag: tag.to_ascii_lowercase(),
        });
        self.key_of(id)
    }

    /// Create a detached text node.
    pub fn create_text(&mut self, text: &str) -> NodeKey {
        let id = self.alloc(NodeKind::Text { text: text.into() });
        self.key_of(id)
    }

    /// Create a detached comment node.
    pub fn create_comment(&mut self, text: &str) -> NodeKey {
        let id = self.alloc(NodeKind::Comment { text: text.into() });
        self.key_of(id)
    }

    // -----------------------
    // Structural edits
    // -----------------------

    /// Append `child` as the last child of `parent`, moving it if it is attached elsewhere.
    ///
    /// # Errors
    /// See [`insert_children`](Self::insert_children).
    pub fn append_child(&mut self, parent: NodeKey, child: NodeKey) -> Result<(), Error> {
        self.insert_children(parent, &[child], None)
    }

    /// Append several children at once; they are reported in a single record.
    ///
    /// # Errors
    /// See [`insert_children`](Self::insert_children).
    pub fn append_children(&mut self, parent: NodeKey, children: &[NodeKey]) -> Result<(), Error> {
        self.insert_children(parent, children, None)
    }

    /// Insert `child` before `reference`, or append when `reference` is `None`.
    ///
    /// # Errors
    /// See [`insert_children`](Self::insert_children).
    pub fn insert_before(
        &mut self,
        parent: NodeKey,
        child: NodeKey,
        reference: Option<NodeKey>,
    ) -> Result<(), Error> {
        self.insert_children(parent, &[child], reference)
    }

    /// Insert `children`, in order, before `reference` (or at the end).
    ///
    /// Children already attached somewhere are detached first, which queues a
    /// removal record for their old parent. The insertion itself is queued as a
    /// single child-list record listing every added node.
    ///
    /// # Errors
    /// Returns an error if any key is unknown, the parent cannot hold children,
    /// `reference` is not a child of `parent`, or an insertion would create a cycle.
    pub fn insert_children(
        &mut self,
        parent: NodeKey,
        children: &[NodeKey],
        reference: Option<NodeKey>,
    ) -> Result<(), Error> {
        let parent_id = self.node_id(parent)?;
        ensure!(
            matches!(
                self.node_data(parent_id)?.kind,
                NodeKind::Document | NodeKind::Element { .. }
            ),
            "{parent:?} cannot have children"
        );
        let reference_id = reference.map(|key| self.node_id(key)).transpose()?;
        if let Some(reference_id) = reference_id {
            ensure!(
                self.parent_id(reference_id) == Some(parent_id),
                "{reference:?} is not a child of {parent:?}"
            );
        }
        let mut child_ids = Vec::with_capacity(children.len());
        for &child in children {
            let child_id = self.node_id(child)?;
            ensure!(child_id != self.root, "the document node cannot be inserted");
            ensure!(
                Some(child_id) != reference_id,
                "{child:?} cannot be inserted before itself"
            );
            ensure!(
                !self.ancestor_ids(parent_id).contains(&child_id),
                "inserting {child:?} into {parent:?} would create a cycle"
            );
            child_ids.push(child_id);
        }
        if child_ids.is_empty() {
            return Ok(());
        }

        for &child_id in &child_ids {
            self.detach_recorded(child_id);
            let inserted = match reference_id {
                Some(reference_id) => reference_id.checked_insert_before(child_id, &mut self.dom),
                None => parent_id.checked_append(child_id, &mut self.dom),
            };
            inserted.map_err(|err| anyhow!("cannot insert into {parent:?}: {err:?}"))?;
        }
        self.queue(
            parent_id,
            DOMUpdate::ChildList {
                added: children.to_vec(),
                removed: Vec::new(),
            },
        );
        Ok(())
    }

    /// Detach `node` from its parent. The node keeps its identity and subtree and
    /// can be reinserted later. Does nothing for parentless nodes.
    ///
    /// # Errors
    /// Returns an error if the key is unknown or names the document node.
    pub fn remove(&mut self, node: NodeKey) -> Result<(), Error> {
        let id = self.node_id(node)?;
        ensure!(id != self.root, "the document node cannot be removed");
        self.detach_recorded(id);
        Ok(())
    }

    /// Detach `child` from `parent`.
    ///
    /// # Errors
    /// Returns an error if either key is unknown or `child` is not a child of `parent`.
    pub fn remove_child(&mut self, parent: NodeKey, child: NodeKey) -> Result<(), Error> {
        let parent_id = self.node_id(parent)?;
        let child_id = self.node_id(child)?;
        ensure!(
            self.parent_id(child_id) == Some(parent_id),
            "{child:?} is not a child of {parent:?}"
        );
        self.detach_recorded(child_id);
        Ok(())
    }

    /// Detach `node` and drop its whole subtree from the arena. Every key in the
    /// subtree becomes unknown and a [`DOMUpdate::Destroyed`] record lists them.
    ///
    /// # Errors
    /// Returns an error if the key is unknown or names the document node.
    pub fn destroy(&mut self, node: NodeKey) -> Result<(), Error> {
        let id = self.node_id(node)?;
        ensure!(id != self.root, "the document node cannot be destroyed");
        self.detach_recorded(id);
        let nodes: Vec<NodeKey> = id
            .descendants(&self.dom)
            .filter_map(|descendant| self.dom.get(descendant))
            .map(|entry| entry.get().key)
            .collect();
        for key in &nodes {
            self.keys.remove(key);
        }
        id.remove_subtree(&mut self.dom);
        trace!("destroyed {} nodes under {node:?}", nodes.len());
        let mut path = SmallVec::new();
        path.push(node);
        self.push_record(node, path, DOMUpdate::Destroyed { nodes });
        Ok(())
    }

    /// Set an attribute on an element. Names are stored in ASCII lowercase.
    ///
    /// # Errors
    /// Returns an error if the key is unknown or not an element.
    pub fn set_attribute(&mut self, node: NodeKey, name: &str, value: &str) -> Result<(), Error> {
        let id = self.element_id(node)?;
        let name = name.to_ascii_lowercase();
        let entry = self.node_data_mut(id)?;
        let old_value = match entry.attrs.iter_mut().find(|(key, _)| *key == name) {
            Some(pair) => Some(replace(&mut pair.1, value.into())),
            None => {
                entry.attrs.push((name.clone(), value.into()));
                None
            }
        };
        self.queue(id, DOMUpdate::Attribute { name, old_value });
        Ok(())
    }

    /// Remove an attribute from an element; absent attributes are ignored.
    ///
    /// # Errors
    /// Returns an error if the key is unknown or not an element.
    pub fn remove_attribute(&mut self, node: NodeKey, name: &str) -> Result<(), Error> {
        let id = self.element_id(node)?;
        let name = name.to_ascii_lowercase();
        let entry = self.node_data_mut(id)?;
        let Some(index) = entry.attrs.iter().position(|(key, _)| *key == name) else {
            return Ok(());
        };
        let (_, old_value) = entry.attrs.remove(index);
        self.queue(
            id,
            DOMUpdate::Attribute {
                name,
                old_value: Some(old_value),
            },
        );
        Ok(())
    }

    /// Replace the data of a text or comment node.
    ///
    /// # Errors
    /// Returns an error if the key is unknown or names an element or the document.
    pub fn set_text(&mut self, node: NodeKey, text: &str) -> Result<(), Error> {
        let id = self.node_id(node)?;
        let old_value = match &mut self.node_data_mut(id)?.kind {
            NodeKind::Text { text: data } | NodeKind::Comment { text: data } => {
                replace(data, text.into())
            }
            _ => bail!("{node:?} is not a character data node"),
        };
        self.queue(id, DOMUpdate::CharacterData { old_value });
        Ok(())
    }

    // -----------------------
    // Mutation delivery
    // -----------------------

    /// Open an independent update stream starting at the current point.
    pub fn subscribe(&self) -> UpdateStream {
        UpdateStream::new(self.update_sender.subscribe(), self.next_seq)
    }

    /// Register a subscriber to be called at every checkpoint, in registration order.
    /// Subscribers live as long as the document.
    pub fn observe(&mut self, subscriber: Rc<RefCell<dyn DOMSubscriber>>) {
        self.subscribers.push(subscriber);
        debug!("document now has {} subscribers", self.subscribers.len());
    }

    /// Number of records queued since the last checkpoint.
    pub fn pending_records(&self) -> usize {
        self.pending.len()
    }

    /// Publish every queued record as one batch, then run each subscriber to
    /// completion in registration order.
    ///
    /// # Errors
    /// The first subscriber error aborts the checkpoint and is returned. Later
    /// subscribers still find the batch in their streams at the next checkpoint.
    pub fn checkpoint(&mut self) -> Result<(), Error> {
        let _span = info_span!("dom.checkpoint").entered();
        let records = take(&mut self.pending);
        if !records.is_empty() {
            trace!("publishing batch of {} mutation records", records.len());
            if self.update_sender.send(Arc::new(records)).is_err() {
                trace!("no update streams are listening");
            }
        }
        let subscribers: Vec<_> = self.subscribers.iter().map(Rc::clone).collect();
        for subscriber in subscribers {
            let mut guard = subscriber
                .try_borrow_mut()
                .map_err(|_| anyhow!("DOM subscriber re-entered during a checkpoint"))?;
            guard.on_checkpoint(self)?;
        }
        Ok(())
    }

    fn queue(&mut self, target: NodeId, update: DOMUpdate) {
        let path: SmallVec<NodeKey, 8> = self
            .ancestor_ids(target)
            .into_iter()
            .filter_map(|id| self.dom.get(id))
            .map(|entry| entry.get().key)
            .collect();
        let key = self.key_of(target);
        self.push_record(key, path, update);
    }

    fn push_record(&mut self, target: NodeKey, path: SmallVec<NodeKey, 8>, update: DOMUpdate) {
        let seq = self.next_seq;
        self.next_seq = self.next_seq.saturating_add(1);
        self.pending.push(MutationRecord {
            seq,
            target,
            path,
            update,
        });
    }

    /// Detach from the current parent, queuing a removal record if there was one.
    fn detach_recorded(&mut self, id: NodeId) {
        let Some(parent_id) = self.parent_id(id) else {
            return;
        };
        let key = self.key_of(id);
        id.detach(&mut self.dom);
        self.queue(
            parent_id,
            DOMUpdate::ChildList {
                added: Vec::new(),
                removed: vec![key],
            },
        );
    }

    // -----------------------
    // Lookups
    // -----------------------

    pub(crate) fn node_id(&self, key: NodeKey) -> Result<NodeId, Error> {
        self.keys
            .get(&key)
            .copied()
            .ok_or_else(|| anyhow!("unknown node {key:?}"))
    }

    fn element_id(&self, key: NodeKey) -> Result<NodeId, Error> {
        let id = self.node_id(key)?;
        ensure!(
            matches!(self.node_data(id)?.kind, NodeKind::Element { .. }),
            "{key:?} is not an element"
        );
        Ok(id)
    }

    fn node_data(&self, id: NodeId) -> Result<&DOMNode, Error> {
        self.dom
            .get(id)
            .map(|entry| entry.get())
            .ok_or_else(|| anyhow!("node {id:?} is missing from the arena"))
    }

    fn node_data_mut(&mut self, id: NodeId) -> Result<&mut DOMNode, Error> {
        self.dom
            .get_mut(id)
            .map(|entry| entry.get_mut())
            .ok_or_else(|| anyhow!("node {id:?} is missing from the arena"))
    }

    pub(crate) fn key_of(&self, id: NodeId) -> NodeKey {
        self.dom.get(id).map_or(NodeKey(0), |entry| entry.get().key)
    }

    pub(crate) fn parent_id(&self, id: NodeId) -> Option<NodeId> {
        self.dom.get(id).and_then(|entry| entry.parent())
    }

    /// `id` followed by its ancestors, innermost first.
    fn ancestor_ids(&self, id: NodeId) -> Vec<NodeId> {
        let mut chain = vec![id];
        let mut current = self.parent_id(id);
        while let Some(ancestor) = current {
            chain.push(ancestor);
            current = self.parent_id(ancestor);
        }
        chain
    }

    /// Node data by key, if the node is alive.
    pub fn get(&self, key: NodeKey) -> Option<&DOMNode> {
        let id = self.keys.get(&key)?;
        self.dom.get(*id).map(|entry| entry.get())
    }

    /// The document node.
    pub fn document_node(&self) -> NodeKey {
        self.key_of(self.root)
    }

    /// The first element child of the document node.
    pub fn document_element(&self) -> Option<NodeKey> {
        self.children(self.document_node())
            .into_iter()
            .find(|&child| self.is_element(child))
    }

    /// The `<body>` child of the document element.
    pub fn body(&self) -> Option<NodeKey> {
        let html = self.document_element()?;
        self.children(html)
            .into_iter()
            .find(|&child| self.tag_name(child) == Some("body"))
    }

    /// The default scope for watches: body, else the document element, else the document node.
    pub fn content_root(&self) -> NodeKey {
        self.body()
            .or_else(|| self.document_element())
            .unwrap_or_else(|| self.document_node())
    }

    /// True while the node exists in the arena (attached or not).
    pub fn is_alive(&self, key: NodeKey) -> bool {
        self.keys.contains_key(&key)
    }

    pub fn is_element(&self, key: NodeKey) -> bool {
        self.tag_name(key).is_some()
    }

    pub fn kind(&self, key: NodeKey) -> Option<&NodeKind> {
        self.get(key).map(|node| &node.kind)
    }

    pub fn tag_name(&self, key: NodeKey) -> Option<&str> {
        self.get(key).and_then(DOMNode::tag)
    }

    pub fn attribute(&self, key: NodeKey, name: &str) -> Option<&str> {
        self.get(key).and_then(|node| node.attr(name))
    }

    pub fn parent(&self, key: NodeKey) -> Option<NodeKey> {
        let id = self.keys.get(&key)?;
        self.parent_id(*id).map(|parent| self.key_of(parent))
    }

    pub fn children(&self, key: NodeKey) -> Vec<NodeKey> {
        self.keys.get(&key).map_or_else(Vec::new, |id| {
            id.children(&self.dom).map(|child| self.key_of(child)).collect()
        })
    }

    /// Inclusive containment: a node contains itself.
    pub fn contains(&self, ancestor: NodeKey, node: NodeKey) -> bool {
        let (Some(&ancestor_id), Some(&id)) = (self.keys.get(&ancestor), self.keys.get(&node))
        else {
            return false;
        };
        self.ancestor_ids(id).contains(&ancestor_id)
    }

    /// True if the node is attached to the document.
    pub fn is_connected(&self, key: NodeKey) -> bool {
        self.contains(self.document_node(), key)
    }

    /// Elements under `root` in document order, excluding `root` itself.
    pub fn descendant_elements(&self, root: NodeKey) -> Vec<NodeKey> {
        let Some(&root_id) = self.keys.get(&root) else {
            return Vec::new();
        };
        root_id
            .descendants(&self.dom)
            .filter(|&id| id != root_id)
            .filter_map(|id| self.dom.get(id))
            .map(|entry| entry.get())
            .filter(|node| matches!(node.kind, NodeKind::Element { .. }))
            .map(|node| node.key)
            .collect()
    }

    /// Concatenated text of the node: its own data for text and comment nodes,
    /// otherwise the data of every descendant text node in document order.
    pub fn text_content(&self, key: NodeKey) -> String {
        let Some(&id) = self.keys.get(&key) else {
            return String::new();
        };
        let mut out = String::new();
        match self.dom.get(id).map(|entry| &entry.get().kind) {
            Some(NodeKind::Text { text } | NodeKind::Comment { text }) => out.push_str(text),
            Some(_) => {
                for descendant in id.descendants(&self.dom) {
                    if let Some(NodeKind::Text { text }) =
                        self.dom.get(descendant).map(|entry| &entry.get().kind)
                    {
                        out.push_str(text);
                    }
                }
            }
            None => {}
        }
        out
    }
}
