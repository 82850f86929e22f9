//! HTML5 parsing using html5ever.

use crate::{Document, DocumentConfig, NodeKind};
use anyhow::{Error, anyhow};
use html5ever::tendril::TendrilSink as _;
use html5ever::{ParseOpts, parse_document};
use indextree::NodeId;
use log::debug;
use markup5ever_rcdom::{Handle, NodeData as RcNodeData, RcDom};
use tracing::info_span;

impl Document {
    /// Parse an HTML document. Configuration is read from the environment.
    ///
    /// The tree is built without queuing mutation records, so nothing parsed
    /// here is reported to update streams.
    ///
    /// # Errors
    /// Returns an error if the parser fails to read the input.
    pub fn parse_html(html: &str) -> Result<Self, Error> {
        Self::parse_html_with_config(html, &DocumentConfig::from_env())
    }

    /// Parse an HTML document using an explicit configuration.
    ///
    /// # Errors
    /// Returns an error if the parser fails to read the input.
    pub fn parse_html_with_config(html: &str, config: &DocumentConfig) -> Result<Self, Error> {
        let _span = info_span!("dom.parse_html", bytes = html.len()).entered();
        let dom: RcDom = parse_document(RcDom::default(), ParseOpts::default())
            .from_utf8()
            .read_from(&mut html.as_bytes())
            .map_err(|err| anyhow!("failed to read HTML input: {err}"))?;
        let mut document = Self::bare(config);
        let root = document.root;
        for child in dom.document.children.borrow().iter() {
            document.convert_node(child, root);
        }
        debug!("parsed {} nodes", document.dom.len());
        Ok(document)
    }

    /// Copy an html5ever node and its subtree under `parent`.
    fn convert_node(&mut self, rc_node: &Handle, parent: NodeId) {
        match &rc_node.data {
            RcNodeData::Text { contents } => {
                let text = contents.borrow().to_string();
                let node = self.alloc(NodeKind::Text { text });
                self.attach_unrecorded(parent, node);
            }
            RcNodeData::Comment { contents } => {
                let node = self.alloc(NodeKind::Comment {
                    text: contents.to_string(),
                });
                self.attach_unrecorded(parent, node);
            }
            RcNodeData::Element { name, attrs, .. } => {
                let node = self.alloc(NodeKind::Element {
                    tag: name.local.to_ascii_lowercase().to_string(),
                });
                if let Some(entry) = self.dom.get_mut(node) {
                    let data = entry.get_mut();
                    for attr in attrs.borrow().iter() {
                        let attr_name = attr.name.local.to_ascii_lowercase().to_string();
                        data.attrs.push((attr_name, attr.value.to_string()));
                    }
                }
                self.attach_unrecorded(parent, node);
                for child in rc_node.children.borrow().iter() {
                    self.convert_node(child, node);
                }
            }
            RcNodeData::Document
            | RcNodeData::Doctype { .. }
            | RcNodeData::ProcessingInstruction { .. } => {}
        }
    }
}
