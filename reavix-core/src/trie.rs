//! Segment trie for path templates: literal children plus at most one parameter child per node.
//!
//! Nodes live in an arena owned by the trie and refer to each other by [`NodeId`], so adding
//! children never invalidates ids handed out earlier.
//!
//! Matching is greedy: at every level a literal child whose label equals the segment wins over
//! the parameter child, and that choice is never revisited. Given `/a/b/c` and `/a/:x/d`,
//! the request `/a/b/d` does not match. Only one parameter name can exist at a given depth
//! under a given parent; a second template using another name at that position shares the
//! existing branch and captures under the first name.

use crate::security::RateLimit;
use crate::CoreError;

/// Leading character of a capture segment (`/users/:id`).
pub const PARAM_MARKER: char = ':';

/// Stable handle of a node inside a [`PathTrie`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

const ROOT: NodeId = NodeId(0);

/// One captured path parameter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PathParam {
    pub name: String,
    pub value: String,
}

impl PathParam {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug)]
struct TrieNode<T> {
    label: String,
    literal_children: Vec<NodeId>,
    param_child: Option<NodeId>,
    value: Option<T>,
    rate_limit: Option<RateLimit>,
}

impl<T> TrieNode<T> {
    fn new(label: &str) -> Self {
        Self {
            label: label.to_owned(),
            literal_children: Vec::new(),
            param_child: None,
            value: None,
            rate_limit: None,
        }
    }
}

/// Successful match: the terminal value, captures in left-to-right order, and the node's rate limit.
#[derive(Debug)]
pub struct TrieMatch<'a, T> {
    pub value: &'a T,
    pub params: Vec<PathParam>,
    pub rate_limit: Option<&'a RateLimit>,
}

#[derive(Clone, Copy, Debug)]
enum Segment<'a> {
    Literal(&'a str),
    Param(&'a str),
}

/// Non-empty `/`-separated segments of `path`.
pub fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

fn parse_template(path: &str) -> Result<Vec<Segment<'_>>, CoreError> {
    segments(path)
        .map(|s| match s.strip_prefix(PARAM_MARKER) {
            Some("") => Err(CoreError::InvalidArgument(format!(
                "empty parameter name in {:?}",
                path
            ))),
            Some(name) => Ok(Segment::Param(name)),
            None => Ok(Segment::Literal(s)),
        })
        .collect()
}

#[derive(Debug)]
pub struct PathTrie<T> {
    nodes: Vec<TrieNode<T>>,
    len: usize,
}

impl<T> PathTrie<T> {
    pub fn new() -> Self {
        Self {
            nodes: vec![TrieNode::new("")],
            len: 0,
        }
    }

    fn node(&self, id: NodeId) -> &TrieNode<T> {
        &self.nodes[id.0]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut TrieNode<T> {
        &mut self.nodes[id.0]
    }

    fn push(&mut self, label: &str) -> NodeId {
        self.nodes.push(TrieNode::new(label));
        NodeId(self.nodes.len() - 1)
    }

    fn literal_child(&self, parent: NodeId, label: &str) -> Option<NodeId> {
        self.node(parent)
            .literal_children
            .iter()
            .copied()
            .find(|&c| self.node(c).label == label)
    }

    fn param_child(&self, parent: NodeId) -> Option<NodeId> {
        self.node(parent).param_child
    }

    /// Insert `value` at `path`, creating missing nodes. Returns the value previously stored
    /// at that node, if any. The template is validated before anything is created, so a
    /// failed insert leaves the trie untouched.
    pub fn insert(&mut self, path: &str, value: T) -> Result<Option<T>, CoreError> {
        let template = parse_template(path)?;
        let mut current = ROOT;
        for segment in template {
            current = match segment {
                Segment::Literal(label) => match self.literal_child(current, label) {
                    Some(child) => child,
                    None => {
                        let child = self.push(label);
                        self.node_mut(current).literal_children.push(child);
                        child
                    }
                },
                Segment::Param(name) => match self.param_child(current) {
                    Some(child) => {
                        let existing = &self.node(child).label;
                        if existing != name {
                            tracing::warn!(
                                path,
                                existing = %existing,
                                requested = name,
                                "parameter branch already exists; sharing it under the existing name"
                            );
                        }
                        child
                    }
                    None => {
                        let child = self.push(name);
                        self.node_mut(current).param_child = Some(child);
                        child
                    }
                },
            };
        }
        let previous = self.node_mut(current).value.replace(value);
        if previous.is_none() {
            self.len += 1;
        }
        Ok(previous)
    }

    /// Node reached by following `path` as a template: `:name` segments take the parameter
    /// branch, everything else the literal branch.
    fn find_template(&self, path: &str) -> Option<NodeId> {
        let template = parse_template(path).ok()?;
        let mut current = ROOT;
        for segment in template {
            current = match segment {
                Segment::Literal(label) => self.literal_child(current, label)?,
                Segment::Param(_) => self.param_child(current)?,
            };
        }
        Some(current)
    }

    /// Value stored for a template, e.g. `get("/users/:id")`.
    pub fn get(&self, path: &str) -> Option<&T> {
        self.find_template(path)
            .and_then(|id| self.node(id).value.as_ref())
    }

    /// Attach a rate limit to the terminal node of a registered template.
    /// Returns false when the template has no value.
    pub fn set_rate_limit(&mut self, path: &str, limit: RateLimit) -> bool {
        match self.find_template(path) {
            Some(id) if self.node(id).value.is_some() => {
                self.node_mut(id).rate_limit = Some(limit);
                true
            }
            _ => false,
        }
    }

    /// Match a concrete request path.
    pub fn match_path(&self, path: &str) -> Option<TrieMatch<'_, T>> {
        let mut current = ROOT;
        let mut params = Vec::new();
        for segment in segments(path) {
            if let Some(child) = self.literal_child(current, segment) {
                current = child;
                continue;
            }
            let child = self.param_child(current)?;
            params.push(PathParam::new(self.node(child).label.as_str(), segment));
            current = child;
        }
        let node = self.node(current);
        node.value.as_ref().map(|value| TrieMatch {
            value,
            params,
            rate_limit: node.rate_limit.as_ref(),
        })
    }

    /// Number of terminal nodes (registered paths).
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of nodes including the root.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

impl<T> Default for PathTrie<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names<'m>(m: &'m TrieMatch<'_, u32>) -> Vec<(&'m str, &'m str)> {
        m.params
            .iter()
            .map(|p| (p.name.as_str(), p.value.as_str()))
            .collect()
    }

    #[test]
    fn empty_segments_collapse() {
        let mut t = PathTrie::new();
        t.insert("//api///users/", 1).unwrap();
        assert_eq!(*t.match_path("/api/users").unwrap().value, 1);
        assert_eq!(*t.match_path("api/users//").unwrap().value, 1);
        assert_eq!(t.node_count(), 3);
    }

    #[test]
    fn root_path_matches_root_node() {
        let mut t = PathTrie::new();
        assert!(t.match_path("/").is_none());
        t.insert("/", 7).unwrap();
        assert_eq!(*t.match_path("").unwrap().value, 7);
        assert_eq!(*t.match_path("///").unwrap().value, 7);
    }

    #[test]
    fn literal_beats_parameter() {
        let mut t = PathTrie::new();
        t.insert("/users/static", 1).unwrap();
        t.insert("/users/:id", 2).unwrap();

        let m = t.match_path("/users/static").unwrap();
        assert_eq!(*m.value, 1);
        assert!(m.params.is_empty());

        let m = t.match_path("/users/42").unwrap();
        assert_eq!(*m.value, 2);
        assert_eq!(names(&m), vec![("id", "42")]);
    }

    #[test]
    fn params_captured_in_order() {
        let mut t = PathTrie::new();
        t.insert("/a/:x/b/:y", 1).unwrap();
        let m = t.match_path("/a/1/b/2").unwrap();
        assert_eq!(names(&m), vec![("x", "1"), ("y", "2")]);
    }

    #[test]
    fn prefix_without_value_is_not_a_match() {
        let mut t = PathTrie::new();
        t.insert("/api/users/list", 1).unwrap();
        assert!(t.match_path("/api/users").is_none());
        assert!(t.match_path("/api/users/list/extra").is_none());
    }

    #[test]
    fn literal_choice_is_never_backtracked() {
        let mut t = PathTrie::new();
        t.insert("/a/b/c", 1).unwrap();
        t.insert("/a/:x/d", 2).unwrap();
        assert!(t.match_path("/a/b/d").is_none());
        assert_eq!(*t.match_path("/a/z/d").unwrap().value, 2);
    }

    #[test]
    fn second_parameter_name_shares_branch() {
        let mut t = PathTrie::new();
        t.insert("/users/:id", 1).unwrap();
        t.insert("/users/:name/posts", 2).unwrap();
        let m = t.match_path("/users/bob/posts").unwrap();
        assert_eq!(*m.value, 2);
        assert_eq!(names(&m), vec![("id", "bob")]);
    }

    #[test]
    fn reinsert_overwrites_without_new_leaf() {
        let mut t = PathTrie::new();
        assert_eq!(t.insert("/x", 1).unwrap(), None);
        assert_eq!(t.insert("/x", 2).unwrap(), Some(1));
        assert_eq!(t.len(), 1);
        assert_eq!(*t.match_path("/x").unwrap().value, 2);
    }

    #[test]
    fn empty_parameter_name_is_rejected_without_mutation() {
        let mut t: PathTrie<u32> = PathTrie::new();
        assert!(t.insert("/a/:/b", 1).is_err());
        assert_eq!(t.node_count(), 1);
        assert!(t.is_empty());
    }

    #[test]
    fn rate_limit_only_on_registered_templates() {
        let mut t = PathTrie::new();
        t.insert("/api/:id", 1).unwrap();
        let limit = RateLimit {
            requests_per_second: 5,
            burst: 10,
        };
        assert!(!t.set_rate_limit("/api", limit.clone()));
        assert!(t.set_rate_limit("/api/:id", limit.clone()));
        assert_eq!(t.match_path("/api/9").unwrap().rate_limit, Some(&limit));
        assert_eq!(t.get("/api/:id"), Some(&1));
    }
}
