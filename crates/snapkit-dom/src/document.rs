//! Node arena and tree operations.

use tokio::task::AbortHandle;
use tracing::{debug, trace};

use crate::events::{FailureHook, ListenerRegistry};
use crate::node::{Node, NodeId, NodeKind, Style};
use crate::{Atom, DomError};

/// A structural change, recorded for renderer collaborators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    ChildAppended { parent: NodeId, child: NodeId },
    ChildRemoved { parent: NodeId, child: NodeId },
    StyleChanged { node: NodeId, property: String },
    /// The document was emptied and a new generation started.
    Reset,
}

/// The node arena rooted at a singleton `body` element.
///
/// Detached subtrees stay in the arena until the next [`Document::reset`],
/// so they can be re-attached with their structure intact.
pub struct Document {
    nodes: Vec<Node>,
    generation: u32,
    body: NodeId,
    pub(crate) listeners: ListenerRegistry,
    pub(crate) failure_hook: Option<FailureHook>,
    /// Listener tasks that suspended during dispatch.
    pending: Vec<AbortHandle>,
    mutations: Vec<Mutation>,
}

impl Document {
    /// Create a document holding only the root container.
    pub fn new() -> Self {
        let mut doc = Self {
            nodes: Vec::new(),
            generation: 0,
            body: NodeId::new(0, 0),
            listeners: ListenerRegistry::default(),
            failure_hook: None,
            pending: Vec::new(),
            mutations: Vec::new(),
        };
        doc.body = doc.alloc(NodeKind::Element {
            tag: Atom::from("body"),
            style: Style::new(),
        });
        doc
    }

    /// The root container every test tree attaches under.
    pub fn body(&self) -> NodeId {
        self.body
    }

    /// Current generation. Handles from older generations are stale.
    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Number of nodes allocated in this generation, detached ones included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Empty the root container and drop every node, listener and pending
    /// mutation. Suspended listener tasks are aborted and never resume. All
    /// previously issued handles become stale.
    pub fn reset(&mut self) {
        let dropped = self.nodes.len().saturating_sub(1);
        let listeners = self.listeners.len();
        let aborted = self.pending_listeners();
        for task in self.pending.drain(..) {
            task.abort();
        }

        self.generation = self.generation.wrapping_add(1);
        self.nodes.clear();
        self.listeners.clear();
        self.failure_hook = None;
        self.mutations.clear();
        self.body = self.alloc(NodeKind::Element {
            tag: Atom::from("body"),
            style: Style::new(),
        });
        self.mutations.push(Mutation::Reset);

        debug!(
            generation = self.generation,
            dropped, listeners, aborted, "Document reset"
        );
    }

    /// Listener tasks spawned by dispatch that have not finished yet.
    pub fn pending_listeners(&self) -> usize {
        self.pending.iter().filter(|task| !task.is_finished()).count()
    }

    pub(crate) fn track_listener(&mut self, task: AbortHandle) {
        self.pending.retain(|task| !task.is_finished());
        self.pending.push(task);
    }

    fn alloc(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId::new(self.nodes.len(), self.generation);
        self.nodes.push(Node::new(kind));
        id
    }

    pub(crate) fn check(&self, id: NodeId) -> Result<(), DomError> {
        if id.generation != self.generation || id.index() >= self.nodes.len() {
            return Err(DomError::StaleNode(id));
        }
        Ok(())
    }

    /// Look up a node.
    pub fn node(&self, id: NodeId) -> Result<&Node, DomError> {
        self.check(id)?;
        Ok(&self.nodes[id.index()])
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, DomError> {
        self.check(id)?;
        Ok(&mut self.nodes[id.index()])
    }

    pub fn parent(&self, id: NodeId) -> Result<Option<NodeId>, DomError> {
        Ok(self.node(id)?.parent)
    }

    pub fn children(&self, id: NodeId) -> Result<&[NodeId], DomError> {
        Ok(&self.node(id)?.children)
    }

    /// Create a text node. Always succeeds.
    pub fn create_text(&mut self, content: impl Into<String>) -> NodeId {
        let id = self.alloc(NodeKind::Text(content.into()));
        trace!(?id, "Created text node");
        id
    }

    /// Create a comment node. Comments take part in tree order but carry no
    /// rendered content.
    pub fn create_comment(&mut self, data: impl Into<String>) -> NodeId {
        self.alloc(NodeKind::Comment(data.into()))
    }

    /// Create an element with a copy of `style` and the given children
    /// appended in order.
    pub fn create(
        &mut self,
        tag: &str,
        style: impl Into<Style>,
        children: impl IntoIterator<Item = NodeId>,
    ) -> Result<NodeId, DomError> {
        let children: Vec<NodeId> = children.into_iter().collect();
        // Nothing moves unless every child can be appended.
        for &child in &children {
            self.check(child)?;
        }

        let id = self.alloc(NodeKind::Element {
            tag: Atom::from(tag),
            style: style.into(),
        });
        if let Some(&body) = children.iter().find(|&&child| child == self.body) {
            return Err(DomError::HierarchyRequest {
                parent: id,
                child: body,
                reason: "the root container cannot be moved",
            });
        }
        trace!(?id, tag, children = children.len(), "Created element");

        for child in children {
            self.append(id, child)?;
        }
        Ok(id)
    }

    /// Append `child` as the last child of `parent`, detaching it from its
    /// previous parent first.
    pub fn append(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.check(child)?;
        if !self.node(parent)?.is_element() {
            return Err(DomError::NotAnElement(parent));
        }
        if child == self.body {
            return Err(DomError::HierarchyRequest {
                parent,
                child,
                reason: "the root container cannot be moved",
            });
        }
        if self.contains(child, parent)? {
            return Err(DomError::HierarchyRequest {
                parent,
                child,
                reason: "a node cannot be appended to itself or its descendant",
            });
        }

        if let Some(old_parent) = self.nodes[child.index()].parent {
            self.unlink(old_parent, child);
            self.mutations.push(Mutation::ChildRemoved {
                parent: old_parent,
                child,
            });
        }

        self.nodes[parent.index()].children.push(child);
        self.nodes[child.index()].parent = Some(parent);
        self.mutations
            .push(Mutation::ChildAppended { parent, child });

        trace!(?parent, ?child, "Appended child");
        Ok(())
    }

    /// Detach `child` (and its subtree) from `parent`.
    ///
    /// Fails with [`DomError::DetachedNode`] when `child` is not currently a
    /// child of `parent`.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<NodeId, DomError> {
        self.check(parent)?;
        if self.node(child)?.parent != Some(parent) {
            return Err(DomError::DetachedNode { parent, child });
        }

        self.unlink(parent, child);
        self.nodes[child.index()].parent = None;
        self.mutations.push(Mutation::ChildRemoved { parent, child });

        debug!(?parent, ?child, "Removed child");
        Ok(child)
    }

    fn unlink(&mut self, parent: NodeId, child: NodeId) {
        let siblings = &mut self.nodes[parent.index()].children;
        if let Some(pos) = siblings.iter().position(|&c| c == child) {
            siblings.remove(pos);
        }
    }

    /// Set an inline style property on an element.
    pub fn set_style(
        &mut self,
        node: NodeId,
        property: &str,
        value: impl Into<String>,
    ) -> Result<(), DomError> {
        match &mut self.node_mut(node)?.kind {
            NodeKind::Element { style, .. } => style.set(property, value),
            _ => return Err(DomError::NotAnElement(node)),
        }
        self.mutations.push(Mutation::StyleChanged {
            node,
            property: property.to_string(),
        });
        Ok(())
    }

    /// Whether `ancestor` is `node` or one of its ancestors.
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> Result<bool, DomError> {
        self.check(ancestor)?;
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return Ok(true);
            }
            current = self.node(id)?.parent;
        }
        Ok(false)
    }

    /// Whether `node` is reachable from the root container.
    pub fn is_connected(&self, node: NodeId) -> Result<bool, DomError> {
        self.contains(self.body, node)
    }

    /// Pre-order traversal of the subtree below `root`, excluding `root`.
    pub fn descendants(&self, root: NodeId) -> Result<Descendants<'_>, DomError> {
        let mut stack = self.children(root)?.to_vec();
        stack.reverse();
        Ok(Descendants { doc: self, stack })
    }

    /// Concatenated text of all text nodes in the subtree, in tree order.
    /// A text or comment node yields its own data.
    pub fn text_content(&self, node: NodeId) -> Result<String, DomError> {
        match &self.node(node)?.kind {
            NodeKind::Text(data) | NodeKind::Comment(data) => return Ok(data.clone()),
            NodeKind::Element { .. } => {}
        }
        let mut out = String::new();
        for id in self.descendants(node)? {
            if let NodeKind::Text(text) = &self.nodes[id.index()].kind {
                out.push_str(text);
            }
        }
        Ok(out)
    }

    /// Mutations recorded since the last drain.
    pub fn mutations(&self) -> &[Mutation] {
        &self.mutations
    }

    /// Drain the mutation log.
    pub fn take_mutations(&mut self) -> Vec<Mutation> {
        std::mem::take(&mut self.mutations)
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

/// Pre-order iterator over a subtree.
pub struct Descendants<'a> {
    doc: &'a Document,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.stack.pop()?;
        self.stack
            .extend(self.doc.nodes[id.index()].children.iter().rev().copied());
        Some(id)
    }
}
