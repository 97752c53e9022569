use crate::publish::{PublishContext, PublishInstance};
use anyhow::{bail, format_err};
use glob::Pattern;
use indexmap::IndexMap;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Transform,
    Mesh,
    Set,
    Container,
    Other,
}

/// The slice of a host scene graph that the publish plugins read.
///
/// Node names are the host's unique names. Queries on unknown nodes return errors.
pub trait SceneQuery {
    /// Members of an object set, in set order.
    fn set_members(&self, set: &str) -> anyhow::Result<Vec<String>>;

    /// Direct children of a node.
    fn children(&self, node: &str) -> anyhow::Result<Vec<String>>;

    /// All descendants of a node, depth first.
    fn descendants(&self, node: &str) -> anyhow::Result<Vec<String>> {
        let mut out = vec![];
        let mut stack: Vec<String> = self.children(node)?.into_iter().rev().collect();
        while let Some(next) = stack.pop() {
            stack.extend(self.children(&next)?.into_iter().rev());
            out.push(next);
        }
        Ok(out)
    }

    fn node_kind(&self, node: &str) -> Option<NodeKind>;

    fn is_intermediate(&self, node: &str) -> bool;

    /// Names matching a `*`/`?` wildcard pattern, in scene order.
    fn ls(&self, pattern: &str) -> Vec<String>;

    fn get_attribute(&self, node: &str, attr: &str) -> anyhow::Result<String>;

    /// Flat, row-major local matrix of a transform.
    fn local_matrix(&self, node: &str) -> anyhow::Result<Vec<f64>>;

    fn is_transform(&self, node: &str) -> bool {
        self.node_kind(node) == Some(NodeKind::Transform)
    }
}

/// Strips the DAG path, so `|grp|Asset_Wood_GEO` becomes `Asset_Wood_GEO`.
pub fn short_name(node: &str) -> &str {
    node.rsplit('|').next().unwrap_or(node)
}

/// Compiles an `ls`-style wildcard. Bad patterns match nothing.
pub fn compile_wildcard(pattern: &str) -> Option<Pattern> {
    match Pattern::new(pattern) {
        Ok(p) => Some(p),
        Err(e) => {
            log::warn!("Ignoring bad node pattern [{}]: {}", pattern, e);
            None
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SnapshotNode {
    pub kind: NodeKind,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub intermediate: bool,
    #[serde(default)]
    pub attributes: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub matrix: Option<Vec<f64>>,
    /// Set when the host could not list this node's children.
    #[serde(default)]
    pub unreadable: bool,
}

/// A JSON dump of a host scene, plus the publish instances collected from it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SceneSnapshot {
    #[serde(default)]
    pub context: PublishContext,
    #[serde(default)]
    pub nodes: IndexMap<String, SnapshotNode>,
    #[serde(default)]
    pub sets: IndexMap<String, Vec<String>>,
    #[serde(default)]
    pub instances: Vec<PublishInstance>,
}

impl SceneSnapshot {
    pub fn load(path: &Path) -> anyhow::Result<SceneSnapshot> {
        let reader = BufReader::new(File::open(path)?);
        let snapshot: SceneSnapshot = serde_json::from_reader(reader)
            .map_err(|e| format_err!("Could not parse scene snapshot {}: {}", path.display(), e))?;
        snapshot.check_parents()?;
        Ok(snapshot)
    }

    pub fn from_json(json: &str) -> anyhow::Result<SceneSnapshot> {
        let snapshot: SceneSnapshot = serde_json::from_str(json)?;
        snapshot.check_parents()?;
        Ok(snapshot)
    }

    fn check_parents(&self) -> anyhow::Result<()> {
        for (name, node) in &self.nodes {
            if let Some(parent) = &node.parent {
                if !self.nodes.contains_key(parent) {
                    bail!("Node [{}] has unknown parent [{}]", name, parent);
                }
            }
        }
        Ok(())
    }

    fn node(&self, name: &str) -> anyhow::Result<&SnapshotNode> {
        self.nodes
            .get(name)
            .ok_or_else(|| format_err!("No object matches name: {}", name))
    }
}

impl SceneQuery for SceneSnapshot {
    fn set_members(&self, set: &str) -> anyhow::Result<Vec<String>> {
        self.sets
            .get(set)
            .cloned()
            .ok_or_else(|| format_err!("No object set named: {}", set))
    }

    fn children(&self, node: &str) -> anyhow::Result<Vec<String>> {
        if self.node(node)?.unreadable {
            bail!("Could not list children of {}", node);
        }
        Ok(self
            .nodes
            .iter()
            .filter(|(_, n)| n.parent.as_deref() == Some(node))
            .map(|(name, _)| name.clone())
            .collect())
    }

    fn descendants(&self, node: &str) -> anyhow::Result<Vec<String>> {
        // Unreadable nodes still show up, their subtree is just not walked.
        let mut out = vec![];
        let mut stack: Vec<String> = self.children(node)?.into_iter().rev().collect();
        while let Some(next) = stack.pop() {
            if let Ok(children) = self.children(&next) {
                stack.extend(children.into_iter().rev());
            }
            out.push(next);
        }
        Ok(out)
    }

    fn node_kind(&self, node: &str) -> Option<NodeKind> {
        self.nodes.get(node).map(|n| n.kind)
    }

    fn is_intermediate(&self, node: &str) -> bool {
        self.nodes.get(node).map_or(false, |n| n.intermediate)
    }

    fn ls(&self, pattern: &str) -> Vec<String> {
        let pattern = match compile_wildcard(pattern) {
            Some(p) => p,
            None => return vec![],
        };
        self.nodes
            .keys()
            .filter(|name| pattern.matches(short_name(name)))
            .cloned()
            .collect()
    }

    fn get_attribute(&self, node: &str, attr: &str) -> anyhow::Result<String> {
        let value = self
            .node(node)?
            .attributes
            .get(attr)
            .ok_or_else(|| format_err!("No attribute {}.{}", node, attr))?;
        Ok(match value {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }

    fn local_matrix(&self, node: &str) -> anyhow::Result<Vec<f64>> {
        let n = self.node(node)?;
        if n.kind != NodeKind::Transform {
            bail!("{} is not a transform", node);
        }
        Ok(n.matrix
            .clone()
            .unwrap_or_else(|| crate::matrix::flatten(&crate::matrix::IDENTITY).collect()))
    }
}
