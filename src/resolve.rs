/// Predictor resolution for loosely structured bundle envelopes.
///
/// Bundles written by the training binaries are typed (`ModelBundle`) and
/// need no search. Bundles assembled by other tooling can instead ship a
/// `Container`: an arena of nested mappings, sequences and named objects
/// that holds the fitted predictor somewhere inside it. Nodes refer to each
/// other by id, so a container may legitimately reference an ancestor.
///
/// Resolution order:
/// 1. If the root is a mapping, the conventional keys `model`, `pipeline`,
///    `estimator`, `clf` (in that order) are checked for a predictor value.
/// 2. Otherwise a depth-first walk from the root, visiting every node at
///    most once, returns the first predictor encountered.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::pipeline::Pipeline;

/// Keys checked on a root mapping before any deep search.
pub const CONVENTIONAL_KEYS: [&str; 4] = ["model", "pipeline", "estimator", "clf"];

/// Index of a node inside a `Container`.
pub type NodeId = usize;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("no predictor reachable from the container root")]
    NotFound,
}

/// One node of a bundle envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Node<P> {
    /// Key/value entries, searched in entry order.
    Map(Vec<(String, NodeId)>),
    /// Elements, searched in order.
    Seq(Vec<NodeId>),
    /// A named object with attribute fields, searched in field order.
    Object {
        type_name: String,
        fields: Vec<(String, NodeId)>,
    },
    Text(String),
    Number(f64),
    /// A fitted, predict-capable object.
    Predictor(Box<P>),
}

/// Arena-backed bundle envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Container<P = Pipeline> {
    nodes: Vec<Node<P>>,
    root: NodeId,
}

impl<P> Default for Container<P> {
    fn default() -> Self {
        Self { nodes: Vec::new(), root: 0 }
    }
}

impl<P> Container<P> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a node and returns its id. The first node pushed is the root
    /// until `set_root` says otherwise.
    pub fn push(&mut self, node: Node<P>) -> NodeId {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    /// Replaces an existing node, returning the previous one. Used to close
    /// references that can only be known after children are pushed.
    pub fn replace(&mut self, id: NodeId, node: Node<P>) -> Option<Node<P>> {
        self.nodes.get_mut(id).map(|slot| std::mem::replace(slot, node))
    }

    pub fn set_root(&mut self, id: NodeId) {
        self.root = id;
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> Option<&Node<P>> {
        self.nodes.get(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn predictor_at(&self, id: NodeId) -> Option<&P> {
        match self.nodes.get(id) {
            Some(Node::Predictor(p)) => Some(p.as_ref()),
            _ => None,
        }
    }

    /// Consumes the container and returns the predictor stored at `id`.
    pub fn into_predictor(mut self, id: NodeId) -> Option<P> {
        if id >= self.nodes.len() {
            return None;
        }
        match self.nodes.swap_remove(id) {
            Node::Predictor(p) => Some(*p),
            _ => None,
        }
    }
}

/// Finds the id of the predictor node, following the resolution order.
pub fn locate<P>(container: &Container<P>) -> Result<NodeId, ResolveError> {
    let root = container.root();

    if let Some(Node::Map(entries)) = container.node(root) {
        for key in CONVENTIONAL_KEYS {
            let hit = entries
                .iter()
                .find(|(k, id)| k == key && container.predictor_at(*id).is_some());
            if let Some((_, id)) = hit {
                return Ok(*id);
            }
        }
    }

    let mut visited = vec![false; container.len()];
    let mut stack = vec![root];

    while let Some(id) = stack.pop() {
        match visited.get_mut(id) {
            Some(seen) if !*seen => *seen = true,
            _ => continue, // already visited or dangling
        }

        let children: Vec<NodeId> = match container.node(id) {
            Some(Node::Predictor(_)) => return Ok(id),
            Some(Node::Map(entries)) => entries.iter().map(|(_, c)| *c).collect(),
            Some(Node::Object { fields, .. }) => fields.iter().map(|(_, c)| *c).collect(),
            Some(Node::Seq(items)) => items.clone(),
            _ => continue,
        };

        // Reverse so the first child is popped first.
        stack.extend(children.into_iter().rev());
    }

    Err(ResolveError::NotFound)
}

/// Returns a reference to the predictor inside `container`.
pub fn resolve<P>(container: &Container<P>) -> Result<&P, ResolveError> {
    let id = locate(container)?;
    container.predictor_at(id).ok_or(ResolveError::NotFound)
}

/// Consumes `container` and returns the owned predictor.
pub fn resolve_owned<P>(container: Container<P>) -> Result<P, ResolveError> {
    let id = locate(&container)?;
    container.into_predictor(id).ok_or(ResolveError::NotFound)
}
