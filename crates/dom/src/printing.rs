use core::fmt;

use crate::{DOMNode, Document, NodeKey, NodeKind};
use indextree::NodeId;

use serde_json::{Map, Value, json};

// -----------------------
// Module-scope helpers
// -----------------------

fn flush_text(children: &mut Vec<Value>, text_buf: &mut String) {
    if !text_buf.trim().is_empty() {
        children.push(json!({ "type": "text", "text": text_buf.clone() }));
    }
    text_buf.clear();
}

fn sorted_attrs(node: &DOMNode) -> Vec<(&str, &str)> {
    let mut pairs: Vec<(&str, &str)> = node
        .attrs
        .iter()
        .map(|(name, value)| (name.as_str(), value.as_str()))
        .collect();
    pairs.sort_unstable_by(|left, right| left.0.cmp(right.0));
    pairs
}

fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(ch),
        }
    }
    out
}

/// Adjacent text nodes are merged and whitespace-only runs dropped.
fn coalesce_children(document: &Document, id: NodeId) -> Vec<Value> {
    let mut children = Vec::new();
    let mut text_buf = String::new();
    for child in id.children(&document.dom) {
        let Some(entry) = document.dom.get(child) else {
            continue;
        };
        if let NodeKind::Text { text } = &entry.get().kind {
            text_buf.push_str(text);
            continue;
        }
        flush_text(&mut children, &mut text_buf);
        let value = node_to_json(document, child);
        if !value.is_null() {
            children.push(value);
        }
    }
    flush_text(&mut children, &mut text_buf);
    children
}

fn node_to_json(document: &Document, id: NodeId) -> Value {
    let Some(entry) = document.dom.get(id) else {
        return Value::Null;
    };
    let node = entry.get();
    match &node.kind {
        NodeKind::Document => {
            json!({ "type": "document", "children": coalesce_children(document, id) })
        }
        NodeKind::Element { tag } => {
            let mut attrs_obj = Map::new();
            for (name, value) in sorted_attrs(node) {
                attrs_obj.insert(name.to_owned(), Value::String(value.to_owned()));
            }
            json!({
                "type": "element",
                "tag": tag,
                "attrs": Value::Object(attrs_obj),
                "children": coalesce_children(document, id),
            })
        }
        NodeKind::Text { text } => {
            if text.trim().is_empty() {
                Value::Null
            } else {
                json!({ "type": "text", "text": text })
            }
        }
        NodeKind::Comment { text } => json!({ "type": "comment", "text": text }),
    }
}

fn write_indent(fmt: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
    for _ in 0..depth {
        fmt.write_str("  ")?;
    }
    Ok(())
}

fn fmt_node(
    document: &Document,
    id: NodeId,
    fmt: &mut fmt::Formatter<'_>,
    depth: usize,
) -> fmt::Result {
    let Some(entry) = document.dom.get(id) else {
        return Ok(());
    };
    let node = entry.get();
    match &node.kind {
        NodeKind::Document => {
            write_indent(fmt, depth)?;
            writeln!(fmt, "#document")?;
        }
        NodeKind::Element { tag } => {
            write_indent(fmt, depth)?;
            write!(fmt, "<{tag}")?;
            for (name, value) in sorted_attrs(node) {
                write!(fmt, " {name}=\"{}\"", escape_text(value))?;
            }
            writeln!(fmt, "> #{}", node.key.0)?;
        }
        NodeKind::Text { text } => {
            // Whitespace-only text is noise in snapshots.
            if text.chars().all(char::is_whitespace) {
                return Ok(());
            }
            write_indent(fmt, depth)?;
            writeln!(fmt, "\"{}\"", escape_text(text))?;
            return Ok(());
        }
        NodeKind::Comment { text } => {
            write_indent(fmt, depth)?;
            writeln!(fmt, "<!--{}-->", escape_text(text))?;
            return Ok(());
        }
    }
    for child in id.children(&document.dom) {
        fmt_node(document, child, fmt, depth + 1)?;
    }
    if let NodeKind::Element { tag } = &node.kind {
        write_indent(fmt, depth)?;
        writeln!(fmt, "</{tag}>")?;
    }
    Ok(())
}

impl fmt::Debug for Document {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(fmt, "Document")?;
        fmt_node(self, self.root, fmt, 0)
    }
}

impl Document {
    /// Build a deterministic JSON representation of the tree.
    /// Schema:
    /// - Document: { "type":"document", "children":[ ... ] }
    /// - Element: { "type":"element", "tag": "div", "attrs": {..}, "children":[ ... ] }
    /// - Text: { "type":"text", "text":"..." }
    /// - Comment: { "type":"comment", "text":"..." }
    pub fn to_json_value(&self) -> Value {
        node_to_json(self, self.root)
    }

    /// JSON for the subtree rooted at `node`, or `null` if the node is gone.
    pub fn subtree_to_json(&self, node: NodeKey) -> Value {
        self.node_id(node)
            .map_or(Value::Null, |id| node_to_json(self, id))
    }

    /// Pretty JSON string for snapshots and test comparisons.
    pub fn to_json_string(&self) -> String {
        serde_json::to_string_pretty(&self.to_json_value()).unwrap_or_else(|_| String::from("{}"))
    }
}
