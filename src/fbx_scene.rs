use crate::checks::is_fbx_binary;
use crate::scene::{compile_wildcard, short_name, NodeKind, SceneQuery};
use crate::utils::{get_models, model_name, parent_model};
use anyhow::{bail, format_err};
use fbxcel_dom::any::AnyDocument;
use fbxcel_dom::v7400::object::model::TypedModelHandle;
use fbxcel_dom::v7400::object::ObjectId;
use fbxcel_dom::v7400::Document;
use indexmap::IndexMap;
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

#[derive(Debug, Clone)]
struct FbxNode {
    kind: NodeKind,
    parent: Option<String>,
}

/// Parent of every top-level model.
pub const WORLD: &str = "|";

/// The model hierarchy of a binary FBX export, keyed by DAG path (`|root|child`).
///
/// FBX keeps no object sets, containers or custom attributes, so only the hierarchy queries work.
/// Transforms are not read either: layouts are only extracted from scene snapshots.
#[derive(Debug, Clone)]
pub struct FbxScene {
    nodes: IndexMap<String, FbxNode>,
}

impl FbxScene {
    pub fn load(path: &Path) -> anyhow::Result<FbxScene> {
        if !is_fbx_binary::verify(path)? {
            bail!("{} is not saved in FBX binary format.", path.display());
        }

        let reader = BufReader::new(File::open(path)?);
        match AnyDocument::from_seekable_reader(reader)? {
            AnyDocument::V7400(_, doc) => FbxScene::from_document(&doc),
            _ => bail!("Got FBX document of unsupported version: {}", path.display()),
        }
    }

    pub fn from_document(doc: &Document) -> anyhow::Result<FbxScene> {
        let mut paths: HashMap<ObjectId, String> = HashMap::new();
        let mut scene = FbxScene {
            nodes: IndexMap::new(),
        };
        scene.nodes.insert(
            WORLD.to_owned(),
            FbxNode {
                kind: NodeKind::Other,
                parent: None,
            },
        );

        for model in get_models(doc) {
            // Walk up to the first ancestor with a known path.
            let mut chain = vec![model.clone()];
            while let Some(parent) = parent_model(chain.last().unwrap_or(&model)) {
                if paths.contains_key(&parent.object_id()) {
                    break;
                }
                if chain.iter().any(|m| m.object_id() == parent.object_id()) {
                    bail!("Model [{}] is parented to itself", model_name(&parent));
                }
                chain.push(parent);
            }

            for node in chain.into_iter().rev() {
                if paths.contains_key(&node.object_id()) {
                    continue;
                }
                let parent_path =
                    parent_model(&node).and_then(|p| paths.get(&p.object_id()).cloned());
                let path = format!(
                    "{}|{}",
                    parent_path.as_deref().unwrap_or(""),
                    model_name(&node)
                );

                scene.nodes.insert(
                    path.clone(),
                    FbxNode {
                        kind: NodeKind::Transform,
                        parent: Some(parent_path.unwrap_or_else(|| WORLD.to_owned())),
                    },
                );

                // Maya keeps mesh data on a shape node under the transform.
                if let TypedModelHandle::Mesh(_) = node {
                    scene.nodes.insert(
                        format!("{}|{}Shape", path, model_name(&node)),
                        FbxNode {
                            kind: NodeKind::Mesh,
                            parent: Some(path.clone()),
                        },
                    );
                }

                paths.insert(node.object_id(), path);
            }
        }

        // Object order in the file is arbitrary, path order gives parents before children.
        scene.nodes.sort_keys();
        Ok(scene)
    }

    pub fn model_count(&self) -> usize {
        self.nodes
            .values()
            .filter(|n| n.kind == NodeKind::Transform)
            .count()
    }

    fn node(&self, name: &str) -> anyhow::Result<&FbxNode> {
        self.nodes
            .get(name)
            .ok_or_else(|| format_err!("No object matches name: {}", name))
    }
}

impl SceneQuery for FbxScene {
    fn set_members(&self, set: &str) -> anyhow::Result<Vec<String>> {
        bail!("FBX files do not store object sets ({})", set)
    }

    fn children(&self, node: &str) -> anyhow::Result<Vec<String>> {
        self.node(node)?;
        Ok(self
            .nodes
            .iter()
            .filter(|(_, n)| n.parent.as_deref() == Some(node))
            .map(|(name, _)| name.clone())
            .collect())
    }

    fn node_kind(&self, node: &str) -> Option<NodeKind> {
        self.nodes.get(node).map(|n| n.kind)
    }

    fn is_intermediate(&self, _node: &str) -> bool {
        false
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
        bail!("FBX files do not store custom attributes ({}.{})", node, attr)
    }

    fn local_matrix(&self, node: &str) -> anyhow::Result<Vec<f64>> {
        bail!("FBX scenes are not read for transforms ({})", node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::model_names::get_invalid;
    use crate::config::ShaderList;
    use std::path::PathBuf;

    fn fixture(name: &str) -> PathBuf {
        let mut d = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
        d.push("tests/fixtures");
        d.push(name);
        d
    }

    #[test]
    fn builds_dag_paths_from_model_links() {
        let scene = FbxScene::load(&fixture("maya_export_good.fbx")).unwrap();

        assert_eq!(scene.model_count(), 3);
        assert_eq!(scene.children(WORLD).unwrap(), vec!["|Chair_GRP"]);
        assert_eq!(
            scene.children("|Chair_GRP").unwrap(),
            vec!["|Chair_GRP|Leg1_Wood_GEO", "|Chair_GRP|Seat_Fabric_MESH"]
        );
        assert_eq!(
            scene.children("|Chair_GRP|Leg1_Wood_GEO").unwrap(),
            vec!["|Chair_GRP|Leg1_Wood_GEO|Leg1_Wood_GEOShape"]
        );
        assert_eq!(
            scene.node_kind("|Chair_GRP|Leg1_Wood_GEO|Leg1_Wood_GEOShape"),
            Some(NodeKind::Mesh)
        );
        assert_eq!(scene.node_kind(WORLD), Some(NodeKind::Other));
        assert_eq!(scene.ls("*_GRP"), vec!["|Chair_GRP"]);
        assert!(scene.children("|Missing").is_err());
    }

    #[test]
    fn model_names_are_checked_below_the_world() {
        let good = FbxScene::load(&fixture("maya_export_good.fbx")).unwrap();
        assert!(get_invalid(&good, WORLD, &ShaderList::default()).unwrap().is_empty());

        let bad = FbxScene::load(&fixture("maya_export_bad.fbx")).unwrap();
        let shaders: ShaderList = ["Wood", "Metal"].iter().copied().collect();
        assert_eq!(
            get_invalid(&bad, WORLD, &shaders).unwrap(),
            vec!["Shade_Glass_GEO", "pCube1"]
        );
    }

    #[test]
    fn only_hierarchy_is_available() {
        let scene = FbxScene::load(&fixture("maya_export_good.fbx")).unwrap();
        assert!(scene.local_matrix("|Chair_GRP").is_err());
        assert!(scene.set_members("modelMain").is_err());
        assert!(scene.get_attribute("|Chair_GRP", "representation").is_err());
    }

    #[test]
    fn ascii_files_are_refused() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ascii_export.fbx");
        std::fs::write(&path, "; FBX 7.4.0 project file\n").unwrap();
        assert!(FbxScene::load(&path).is_err());
    }
}
