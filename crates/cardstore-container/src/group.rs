//! Groups: named links to sub-groups and datasets, plus scalar attributes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::dataset::Dataset;
use crate::error::{ContainerError, Result};

/// Scalar attribute attached to a group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttrValue {
    Int(i64),
    Float(f64),
    Str(String),
}

impl AttrValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            AttrValue::Int(v) => Some(*v),
            _ => None,
        }
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::Str(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue::Str(value)
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        AttrValue::Int(value)
    }
}

impl From<f64> for AttrValue {
    fn from(value: f64) -> Self {
        AttrValue::Float(value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    Group(Group),
    Dataset(Dataset),
}

impl Node {
    pub fn as_group(&self) -> Option<&Group> {
        match self {
            Node::Group(g) => Some(g),
            Node::Dataset(_) => None,
        }
    }

    pub fn as_dataset(&self) -> Option<&Dataset> {
        match self {
            Node::Dataset(d) => Some(d),
            Node::Group(_) => None,
        }
    }
}

/// A group. Children iterate in link-name order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Group {
    attrs: BTreeMap<String, AttrValue>,
    children: BTreeMap<String, Node>,
}

pub(crate) fn check_name(name: &str) -> Result<()> {
    if name.is_empty() || name == "." || name == ".." || name.contains('/') {
        return Err(ContainerError::InvalidName {
            name: name.to_string(),
        });
    }
    Ok(())
}

impl Group {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.children.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&Node> {
        self.children.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.children.keys().map(String::as_str)
    }

    pub fn children(&self) -> impl Iterator<Item = (&str, &Node)> {
        self.children.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Create a new empty sub-group. Fails if the name is already linked.
    pub fn create_group(&mut self, name: &str) -> Result<&mut Group> {
        check_name(name)?;
        if self.children.contains_key(name) {
            return Err(ContainerError::AlreadyExists {
                path: name.to_string(),
            });
        }
        let node = self
            .children
            .entry(name.to_string())
            .or_insert_with(|| Node::Group(Group::new()));
        match node {
            Node::Group(g) => Ok(g),
            Node::Dataset(_) => Err(ContainerError::NotAGroup {
                path: name.to_string(),
            }),
        }
    }

    /// Return the named sub-group, creating it when missing.
    pub fn require_group(&mut self, name: &str) -> Result<&mut Group> {
        check_name(name)?;
        let node = self
            .children
            .entry(name.to_string())
            .or_insert_with(|| Node::Group(Group::new()));
        match node {
            Node::Group(g) => Ok(g),
            Node::Dataset(_) => Err(ContainerError::NotAGroup {
                path: name.to_string(),
            }),
        }
    }

    /// Link a dataset under `name`. Fails if the name is already linked.
    pub fn create_dataset(&mut self, name: &str, dataset: Dataset) -> Result<()> {
        check_name(name)?;
        if self.children.contains_key(name) {
            return Err(ContainerError::AlreadyExists {
                path: name.to_string(),
            });
        }
        self.children
            .insert(name.to_string(), Node::Dataset(dataset));
        Ok(())
    }

    pub fn group(&self, name: &str) -> Result<&Group> {
        match self.children.get(name) {
            Some(Node::Group(g)) => Ok(g),
            Some(Node::Dataset(_)) => Err(ContainerError::NotAGroup {
                path: name.to_string(),
            }),
            None => Err(ContainerError::NotFound {
                path: name.to_string(),
            }),
        }
    }

    pub fn dataset(&self, name: &str) -> Result<&Dataset> {
        match self.children.get(name) {
            Some(Node::Dataset(d)) => Ok(d),
            Some(Node::Group(_)) => Err(ContainerError::NotADataset {
                path: name.to_string(),
            }),
            None => Err(ContainerError::NotFound {
                path: name.to_string(),
            }),
        }
    }

    /// Resolve a `/`-separated path relative to this group.
    pub fn lookup(&self, path: &str) -> Result<&Node> {
        let mut parts = path.split('/').filter(|p| !p.is_empty()).peekable();
        let mut current = self;
        let mut walked = String::new();
        while let Some(part) = parts.next() {
            if !walked.is_empty() {
                walked.push('/');
            }
            walked.push_str(part);
            let node = current.children.get(part).ok_or_else(|| ContainerError::NotFound {
                path: walked.clone(),
            })?;
            if parts.peek().is_none() {
                return Ok(node);
            }
            current = node.as_group().ok_or_else(|| ContainerError::NotAGroup {
                path: walked.clone(),
            })?;
        }
        Err(ContainerError::InvalidName {
            name: path.to_string(),
        })
    }

    pub fn set_attr(&mut self, name: &str, value: impl Into<AttrValue>) {
        self.attrs.insert(name.to_string(), value.into());
    }

    pub fn attr(&self, name: &str) -> Option<&AttrValue> {
        self.attrs.get(name)
    }

    pub fn attr_str(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).and_then(AttrValue::as_str)
    }

    pub fn attrs(&self) -> impl Iterator<Item = (&str, &AttrValue)> {
        self.attrs.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Depth-first walk over every link below this group.
    ///
    /// `visit` receives the full path of each node, its depth (1 for direct
    /// children) and the node itself; a group is visited before its children.
    pub fn visit<F>(&self, mut visit: F)
    where
        F: FnMut(&str, usize, &Node),
    {
        fn walk<F: FnMut(&str, usize, &Node)>(group: &Group, prefix: &str, depth: usize, f: &mut F) {
            for (name, node) in &group.children {
                let path = if prefix.is_empty() {
                    name.clone()
                } else {
                    format!("{prefix}/{name}")
                };
                f(&path, depth, node);
                if let Node::Group(child) = node {
                    walk(child, &path, depth + 1, f);
                }
            }
        }
        walk(self, "", 1, &mut visit);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::ArrayData;

    #[test]
    fn duplicate_links_are_rejected() {
        let mut root = Group::new();
        root.create_group("nodes").unwrap();
        assert!(matches!(
            root.create_group("nodes"),
            Err(ContainerError::AlreadyExists { .. })
        ));
        assert!(matches!(
            root.create_dataset("nodes", Dataset::scalar_int(1)),
            Err(ContainerError::AlreadyExists { .. })
        ));
    }

    #[test]
    fn names_with_separators_are_invalid() {
        let mut root = Group::new();
        assert!(matches!(
            root.create_group("a/b"),
            Err(ContainerError::InvalidName { .. })
        ));
        assert!(matches!(
            root.create_group(""),
            Err(ContainerError::InvalidName { .. })
        ));
    }

    #[test]
    fn lookup_walks_nested_groups() {
        let mut root = Group::new();
        let grid = root.create_group("nodes").unwrap().create_group("GRID").unwrap();
        grid.create_dataset("keys", Dataset::array(ArrayData::Int(vec![1, 2])))
            .unwrap();

        let node = root.lookup("nodes/GRID/keys").unwrap();
        assert_eq!(node.as_dataset().unwrap().as_ints(), Some(&[1, 2][..]));
        assert!(matches!(
            root.lookup("nodes/GRID/keys/x"),
            Err(ContainerError::NotAGroup { .. })
        ));
        assert!(matches!(
            root.lookup("nodes/CORD2R"),
            Err(ContainerError::NotFound { .. })
        ));
    }

    #[test]
    fn children_iterate_in_name_order() {
        let mut root = Group::new();
        for name in ["10", "2", "1"] {
            root.create_group(name).unwrap();
        }
        let names: Vec<&str> = root.names().collect();
        assert_eq!(names, vec!["1", "10", "2"]);
    }

    #[test]
    fn visit_reports_full_paths() {
        let mut root = Group::new();
        root.create_group("a")
            .unwrap()
            .create_dataset("x", Dataset::scalar_int(1))
            .unwrap();
        let mut seen = Vec::new();
        root.visit(|path, depth, _| seen.push((path.to_string(), depth)));
        assert_eq!(seen, vec![("a".to_string(), 1), ("a/x".to_string(), 2)]);
    }
}
