//! In-memory index of saved query names, keyed by `/`-separated path.

use crate::query::{Method, Query};

const INDENT: &str = "    ";

/// One path segment. Each node owns its children, so there are no cycles.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryTree {
    label: String,
    children: Vec<QueryTree>,
    /// `name (METHOD)` entries for queries ending at this node.
    leaves: Vec<String>,
}

impl QueryTree {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn with_label(label: &str) -> Self {
        Self {
            label: label.to_string(),
            ..Self::default()
        }
    }

    /// Index every query by its name.
    pub fn from_queries<'a>(queries: impl IntoIterator<Item = &'a Query>) -> Self {
        let mut tree = Self::new();
        for query in queries {
            tree.insert_name(&query.name, query.method);
        }
        tree
    }

    pub fn insert_name(&mut self, name: &str, method: Method) {
        let segments: Vec<&str> = name.split('/').collect();
        self.insert(&segments, method);
    }

    /// Walk down `segments`, reusing existing nodes, and add the last
    /// segment as a leaf.
    pub fn insert(&mut self, segments: &[&str], method: Method) {
        match segments {
            [] => {}
            [leaf] => self.leaves.push(format!("{} ({})", leaf, method)),
            [head, rest @ ..] => self.child_mut(head).insert(rest, method),
        }
    }

    fn child_mut(&mut self, label: &str) -> &mut QueryTree {
        let idx = match self.children.iter().position(|c| c.label == label) {
            Some(idx) => idx,
            None => {
                self.children.push(Self::with_label(label));
                self.children.len() - 1
            }
        };
        &mut self.children[idx]
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[must_use]
    pub fn children(&self) -> &[QueryTree] {
        &self.children
    }

    #[must_use]
    pub fn leaves(&self) -> &[String] {
        &self.leaves
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.children.is_empty() && self.leaves.is_empty()
    }

    /// Render this node, its leaves, then its children. `depth` is the
    /// number of levels below this node to show; `None` shows everything.
    #[must_use]
    pub fn render(&self, depth: Option<usize>, prefix: &str) -> String {
        let mut out = format!("{}/{}\n", prefix, self.label);
        let leaf_prefix = format!("{}{}", prefix, INDENT);
        for leaf in &self.leaves {
            out.push_str(&format!("{}/{}\n", leaf_prefix, leaf));
        }
        let child_depth = match depth {
            Some(0) => return out,
            Some(n) => Some(n - 1),
            None => None,
        };
        for child in &self.children {
            out.push_str(&child.render(child_depth, &leaf_prefix));
        }
        out
    }
}
