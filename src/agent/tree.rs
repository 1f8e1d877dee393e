//! Arena of agents with parent/child links stored as indices.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use super::context::InvocationContext;
use super::{router, Agent, EventStream};
use crate::error::BraidError;

/// Index of an agent inside its [`AgentTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AgentId(usize);

impl AgentId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Composition-time description of an agent and its children.
pub struct AgentNode {
    agent: Arc<dyn Agent>,
    children: Vec<AgentNode>,
}

impl AgentNode {
    pub fn new(agent: impl Agent + 'static) -> Self {
        Self::from_arc(Arc::new(agent))
    }

    pub fn from_arc(agent: Arc<dyn Agent>) -> Self {
        Self {
            agent,
            children: Vec::new(),
        }
    }

    pub fn with_child(mut self, child: AgentNode) -> Self {
        self.children.push(child);
        self
    }

    /// Add a leaf child.
    pub fn with_agent(self, agent: impl Agent + 'static) -> Self {
        self.with_child(AgentNode::new(agent))
    }

    pub fn with_children(mut self, children: impl IntoIterator<Item = AgentNode>) -> Self {
        self.children.extend(children);
        self
    }
}

struct TreeEntry {
    agent: Arc<dyn Agent>,
    parent: Option<AgentId>,
    children: Vec<AgentId>,
}

/// Immutable agent hierarchy. The root is always [`AgentTree::root`].
pub struct AgentTree {
    entries: Vec<TreeEntry>,
}

impl AgentTree {
    /// Flatten a composed hierarchy. Agent names must be unique.
    pub fn build(root: AgentNode) -> Result<Arc<Self>, BraidError> {
        let mut tree = AgentTree {
            entries: Vec::new(),
        };
        let mut names = HashSet::new();
        tree.insert(root, None, &mut names)?;
        Ok(Arc::new(tree))
    }

    fn insert(
        &mut self,
        node: AgentNode,
        parent: Option<AgentId>,
        names: &mut HashSet<String>,
    ) -> Result<AgentId, BraidError> {
        let name = node.agent.name().to_string();
        if name.is_empty() {
            return Err(BraidError::Configuration("agent name must not be empty".into()));
        }
        if !names.insert(name.clone()) {
            return Err(BraidError::Configuration(format!(
                "duplicate agent name '{name}' in agent tree"
            )));
        }
        let id = AgentId(self.entries.len());
        self.entries.push(TreeEntry {
            agent: node.agent,
            parent,
            children: Vec::new(),
        });
        for child in node.children {
            let child_id = self.insert(child, Some(id), names)?;
            self.entries[id.0].children.push(child_id);
        }
        Ok(id)
    }

    pub fn root(&self) -> AgentId {
        AgentId(0)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn agent(&self, id: AgentId) -> &Arc<dyn Agent> {
        &self.entries[id.0].agent
    }

    pub fn name(&self, id: AgentId) -> &str {
        self.entries[id.0].agent.name()
    }

    pub fn parent(&self, id: AgentId) -> Option<AgentId> {
        self.entries[id.0].parent
    }

    pub fn children(&self, id: AgentId) -> &[AgentId] {
        &self.entries[id.0].children
    }

    /// Depth-first, self-first search of the subtree rooted at `from`.
    pub fn find_in_subtree(&self, from: AgentId, name: &str) -> Option<AgentId> {
        if self.name(from) == name {
            return Some(from);
        }
        self.children(from)
            .iter()
            .find_map(|child| self.find_in_subtree(*child, name))
    }

    pub fn find(&self, name: &str) -> Option<AgentId> {
        self.find_in_subtree(self.root(), name)
    }

    /// Whether `id` and every ancestor up to the root can hold a conversation
    /// across turns.
    pub fn holds_conversation(&self, id: AgentId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            if !self.agent(node).is_transfer_capable() {
                return false;
            }
            current = self.parent(node);
        }
        true
    }

    /// Resolve a transfer target seen from `from`: its own subtree first,
    /// then the whole tree.
    pub fn resolve_transfer(&self, from: AgentId, name: &str) -> Option<AgentId> {
        self.find_in_subtree(from, name).or_else(|| self.find(name))
    }
}

impl fmt::Debug for AgentTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.entries.iter().map(|e| e.agent.name()).collect();
        f.debug_struct("AgentTree").field("agents", &names).finish()
    }
}

/// An agent's handle on its place in the tree for one run.
#[derive(Clone)]
pub struct AgentScope {
    pub tree: Arc<AgentTree>,
    pub id: AgentId,
    pub ctx: InvocationContext,
}

impl AgentScope {
    pub fn new(tree: Arc<AgentTree>, id: AgentId, ctx: InvocationContext) -> Self {
        Self { tree, id, ctx }
    }

    pub fn name(&self) -> &str {
        self.tree.name(self.id)
    }

    pub fn children(&self) -> &[AgentId] {
        self.tree.children(self.id)
    }

    pub fn parent(&self) -> Option<AgentId> {
        self.tree.parent(self.id)
    }

    /// Name and description of every direct child.
    pub fn child_summaries(&self) -> Vec<(String, String)> {
        self.children()
            .iter()
            .map(|child| {
                let agent = self.tree.agent(*child);
                (agent.name().to_string(), agent.description().to_string())
            })
            .collect()
    }

    /// Run another agent of this tree through the router.
    pub fn run_agent(&self, id: AgentId, ctx: InvocationContext) -> EventStream {
        router::run(self.tree.clone(), id, ctx)
    }
}

impl fmt::Debug for AgentScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentScope")
            .field("agent", &self.name())
            .field("ctx", &self.ctx)
            .finish()
    }
}
