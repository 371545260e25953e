use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of a node below a hierarchy root
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Section,
    Group,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Section => write!(f, "section"),
            NodeKind::Group => write!(f, "group"),
        }
    }
}

/// Kind of a store object a reference or snapshot root points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    Notebook,
    Group,
    Section,
}

/// How much of the hierarchy below a reference a fetch returns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HierarchyScope {
    /// Only the referenced object
    SelfOnly,
    /// The object and its immediate children, without grandchildren
    Children,
    /// The full subtree
    Subtree,
}

/// A section or section group inside a snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    /// Store-local identifier; empty for nodes not yet known to any store
    pub id: String,
    pub name: String,
    pub kind: NodeKind,
    /// Only meaningful for groups
    pub is_recycle_bin: bool,
    pub color: Option<String>,
    /// Always empty for sections
    pub children: Vec<Node>,
}

impl Node {
    pub fn section(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind: NodeKind::Section,
            is_recycle_bin: false,
            color: None,
            children: Vec::new(),
        }
    }

    pub fn group(id: impl Into<String>, name: impl Into<String>, children: Vec<Node>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind: NodeKind::Group,
            is_recycle_bin: false,
            color: None,
            children,
        }
    }

    pub fn recycle_bin(id: impl Into<String>, name: impl Into<String>, children: Vec<Node>) -> Self {
        Self {
            is_recycle_bin: true,
            ..Self::group(id, name, children)
        }
    }

    pub fn is_section(&self) -> bool {
        self.kind == NodeKind::Section
    }

    pub fn is_group(&self) -> bool {
        self.kind == NodeKind::Group
    }

    /// Number of nodes below this one
    pub fn descendant_count(&self) -> usize {
        self.children.iter().map(|c| 1 + c.descendant_count()).sum()
    }

    /// Copy of this node with its children dropped
    pub fn shallow(&self) -> Self {
        Self {
            children: Vec::new(),
            ..self.clone()
        }
    }

    /// Ids of this node and every node below it, in pre-order
    pub fn subtree_ids(&self) -> Vec<String> {
        let mut ids = vec![self.id.clone()];
        for child in &self.children {
            ids.extend(child.subtree_ids());
        }
        ids
    }
}

/// Point-in-time snapshot of one store object and (depending on scope) what lies below it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tree {
    pub id: String,
    /// Display name; the nickname for notebooks
    pub name: String,
    pub kind: ObjectKind,
    /// Storage location, reported for notebooks
    pub path: Option<String>,
    pub children: Vec<Node>,
}

impl Tree {
    pub fn notebook(id: impl Into<String>, name: impl Into<String>, children: Vec<Node>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind: ObjectKind::Notebook,
            path: None,
            children,
        }
    }

    /// Total number of nodes below the root
    pub fn descendant_count(&self) -> usize {
        self.children.iter().map(|c| 1 + c.descendant_count()).sum()
    }

    pub fn find(&self, id: &str) -> Option<&Node> {
        find_in(&self.children, id)
    }

    pub fn find_mut(&mut self, id: &str) -> Option<&mut Node> {
        find_in_mut(&mut self.children, id)
    }

    /// Whether `id` is the root or any node below it
    pub fn contains(&self, id: &str) -> bool {
        self.id == id || self.find(id).is_some()
    }

    /// Find a node by its slash-separated name path, e.g. `"Projects/Ideas"`
    pub fn find_by_path(&self, path: &str) -> Option<&Node> {
        let mut nodes = &self.children;
        let mut found = None;
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            let node = nodes.iter().find(|n| n.name == segment)?;
            nodes = &node.children;
            found = Some(node);
        }
        found
    }

    /// Detach the node with `id` from wherever it sits in the tree
    pub fn remove(&mut self, id: &str) -> Option<Node> {
        remove_in(&mut self.children, id)
    }

    /// Apply a fetch scope to this snapshot
    pub fn scoped(mut self, scope: HierarchyScope) -> Self {
        match scope {
            HierarchyScope::SelfOnly => self.children.clear(),
            HierarchyScope::Children => {
                self.children = self.children.iter().map(Node::shallow).collect();
            }
            HierarchyScope::Subtree => {}
        }
        self
    }

    /// Indented rendering of names and nesting, ids omitted.
    ///
    /// Groups end with `/`, recycle bins are tagged. Two trees with equal
    /// outlines have the same names, kinds and nesting.
    pub fn outline(&self) -> String {
        let mut out = String::new();
        write_outline(&self.children, 0, &mut out);
        out
    }
}

fn find_in<'a>(nodes: &'a [Node], id: &str) -> Option<&'a Node> {
    for node in nodes {
        if node.id == id {
            return Some(node);
        }
        if let Some(found) = find_in(&node.children, id) {
            return Some(found);
        }
    }
    None
}

fn find_in_mut<'a>(nodes: &'a mut [Node], id: &str) -> Option<&'a mut Node> {
    for node in nodes.iter_mut() {
        if node.id == id {
            return Some(node);
        }
        if let Some(found) = find_in_mut(&mut node.children, id) {
            return Some(found);
        }
    }
    None
}

fn remove_in(nodes: &mut Vec<Node>, id: &str) -> Option<Node> {
    if let Some(pos) = nodes.iter().position(|n| n.id == id) {
        return Some(nodes.remove(pos));
    }
    nodes.iter_mut().find_map(|n| remove_in(&mut n.children, id))
}

fn write_outline(nodes: &[Node], depth: usize, out: &mut String) {
    for node in nodes {
        out.push_str(&"  ".repeat(depth));
        out.push_str(&node.name);
        if node.is_group() {
            out.push('/');
            if node.is_recycle_bin {
                out.push_str(" [recycle bin]");
            }
        }
        out.push('\n');
        write_outline(&node.children, depth + 1, out);
    }
}
