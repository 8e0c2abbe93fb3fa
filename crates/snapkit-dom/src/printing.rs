//! Deterministic markup serialization, used for logging and by renderers
//! that key their output on tree state.

use std::fmt::Write;

use crate::document::Document;
use crate::node::{NodeId, NodeKind};
use crate::DomError;

fn escape_text(out: &mut String, text: &str) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
}

fn escape_attr(out: &mut String, value: &str) {
    for c in value.chars() {
        match c {
            '"' => out.push_str("&quot;"),
            '&' => out.push_str("&amp;"),
            _ => out.push(c),
        }
    }
}

fn write_node(doc: &Document, id: NodeId, out: &mut String) {
    let Ok(node) = doc.node(id) else {
        return;
    };
    match &node.kind {
        NodeKind::Text(text) => escape_text(out, text),
        NodeKind::Comment(data) => {
            let _ = write!(out, "<!--{}-->", data);
        }
        NodeKind::Element { tag, style } => {
            let _ = write!(out, "<{}", tag);
            if !style.is_empty() {
                out.push_str(" style=\"");
                escape_attr(out, &style.to_css());
                out.push('"');
            }
            out.push('>');
            for &child in node.children() {
                write_node(doc, child, out);
            }
            let _ = write!(out, "</{}>", tag);
        }
    }
}

impl Document {
    /// Serialize the whole root container.
    pub fn to_markup(&self) -> String {
        let mut out = String::new();
        write_node(self, self.body(), &mut out);
        out
    }

    /// Serialize the subtree rooted at `node`, attached or not.
    pub fn markup_of(&self, node: NodeId) -> Result<String, DomError> {
        self.check(node)?;
        let mut out = String::new();
        write_node(self, node, &mut out);
        Ok(out)
    }
}
