use crate::assets::AssetLookup;
use crate::matrix::{
    build_ue_transform_from_maya_transform, convert_matrix_to_4x4_list, flatten, matrix_from_flat,
};
use crate::publish::{OutputArtifact, PublishContext, PublishInstance};
use crate::scene::SceneQuery;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

/// Marker node every loaded container lives under.
pub const PROJECT_CONTAINER: &str = "AVALON_CONTAINERS";

/// Remaps Maya's Y-up axes onto Unreal's Z-up axes.
pub const BASIS: [[i32; 4]; 4] = [[1, 0, 0, 0], [0, 0, 1, 0], [0, 1, 0, 0], [0, 0, 0, 1]];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayoutRecord {
    pub product_type: Option<String>,
    pub instance_name: String,
    pub representation: String,
    pub version: String,
    pub transform_matrix: Vec<[f64; 4]>,
    pub basis: [[i32; 4]; 4],
}

/// Splits off the namespace, so `chair_01:geo` gives `chair_01`.
fn group_name(asset: &str) -> &str {
    asset.split(':').next().unwrap_or(asset)
}

fn warn_skipped(asset: &str, why: &str) {
    log::warn!("{} {}", asset, why);
    log::warn!("It may not be properly loaded after published");
}

/// The nodes that get a layout record for one set member.
fn placed_assets(
    scene: &impl SceneQuery,
    instance: &PublishInstance,
    member: &str,
) -> Vec<String> {
    if !instance.group_loaded_assets {
        return vec![member.to_owned()];
    }

    match scene.children(member) {
        Ok(children) => {
            if children.is_empty() {
                log::warn!("Group {} has no loaded assets", member);
            }
            children
        }
        Err(e) => {
            log::warn!("Could not list loaded assets under {}: {}", member, e);
            vec![]
        }
    }
}

fn layout_record(
    scene: &impl SceneQuery,
    assets: &impl AssetLookup,
    context: &PublishContext,
    asset: &str,
) -> anyhow::Result<Option<LayoutRecord>> {
    let pattern = format!("{}*_CON", glob::Pattern::escape(group_name(asset)));
    let container = match scene.ls(&pattern).into_iter().next() {
        Some(c) => c,
        None => {
            warn_skipped(asset, "isn't from the loader");
            return Ok(None);
        }
    };

    let representation_id = scene.get_attribute(&container, "representation")?;
    let representation = assets.representation_by_id(&context.project_name, &representation_id)?;

    let local = matrix_from_flat(&scene.local_matrix(asset)?)?;
    let ue = build_ue_transform_from_maya_transform(&local);

    Ok(Some(LayoutRecord {
        product_type: representation.product_type().map(str::to_owned),
        instance_name: scene.get_attribute(&container, "namespace")?,
        representation: representation_id,
        version: representation.version_id,
        transform_matrix: convert_matrix_to_4x4_list(flatten(&ue))?,
        basis: BASIS,
    }))
}

/// Collects a layout record for every loaded asset in the instance's set.
pub fn collect(
    scene: &impl SceneQuery,
    assets: &impl AssetLookup,
    context: &PublishContext,
    instance: &PublishInstance,
) -> anyhow::Result<Vec<LayoutRecord>> {
    let members = scene.set_members(&instance.name)?;
    let has_project_container = !scene.ls(PROJECT_CONTAINER).is_empty();

    let mut records = vec![];
    for member in members {
        if !has_project_container {
            log::warn!("Project container is not found!");
            log::warn!("The asset(s) may not be properly loaded after published");
            continue;
        }

        for asset in placed_assets(scene, instance, &member) {
            if let Some(record) = layout_record(scene, assets, context, &asset)? {
                records.push(record);
            }
        }
    }
    Ok(records)
}

pub fn write_layout(path: &Path, records: &[LayoutRecord]) -> anyhow::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, records)?;
    writer.flush()?;
    Ok(())
}

/// Writes `<instance>.json` into `staging_dir` and registers it on the instance as the `json`
/// representation.
pub fn extract(
    scene: &impl SceneQuery,
    assets: &impl AssetLookup,
    context: &PublishContext,
    instance: &mut PublishInstance,
    staging_dir: &Path,
) -> anyhow::Result<OutputArtifact> {
    log::debug!("Performing extraction..");
    let records = collect(scene, assets, context, instance)?;

    fs::create_dir_all(staging_dir)?;
    let file_name = format!("{}.json", instance.name);
    write_layout(&staging_dir.join(&file_name), &records)?;

    let artifact = OutputArtifact {
        name: "json".to_owned(),
        ext: "json".to_owned(),
        files: vec![file_name],
        staging_dir: staging_dir.to_owned(),
    };
    instance.representations.push(artifact.clone());

    log::debug!(
        "Extracted instance '{}' to: {}",
        instance.name,
        staging_dir.display()
    );
    Ok(artifact)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::RepresentationCatalog;
    use crate::matrix::MatrixError;
    use crate::scene::SceneSnapshot;

    const CATALOG: &str = r#"[
        { "project": "demo", "id": "rep-chair", "versionId": "ver-7", "context": { "product": { "type": "model" } } },
        { "project": "demo", "id": "rep-lamp", "versionId": "ver-2", "context": { "family": "rig" } }
    ]"#;

    const SCENE: &str = r#"{
        "context": { "project_name": "demo" },
        "nodes": {
            "AVALON_CONTAINERS": { "kind": "set" },
            "chair_01_CON": { "kind": "container", "attributes": { "representation": "rep-chair", "namespace": "chair_01" } },
            "lamp_01_CON": { "kind": "container", "attributes": { "representation": "rep-lamp", "namespace": "lamp_01" } },
            "chair_01:root": { "kind": "transform", "matrix": [1,0,0,0, 0,1,0,0, 0,0,1,0, 10,20,30,1] },
            "lamp_01:root": { "kind": "transform" },
            "stray": { "kind": "transform" },
            "props_GRP": { "kind": "transform" },
            "lamp_02:root": { "kind": "transform", "parent": "props_GRP" },
            "chair_02:root": { "kind": "transform", "parent": "props_GRP" },
            "chair_02_CON": { "kind": "container", "attributes": { "representation": "rep-chair", "namespace": "chair_02" } }
        },
        "sets": {
            "layoutMain": ["chair_01:root", "stray", "lamp_01:root"],
            "layoutGrouped": ["props_GRP"]
        }
    }"#;

    fn load() -> (SceneSnapshot, RepresentationCatalog) {
        (
            SceneSnapshot::from_json(SCENE).unwrap(),
            RepresentationCatalog::from_json(CATALOG).unwrap(),
        )
    }

    #[test]
    fn builds_records_for_loaded_assets() {
        let (scene, catalog) = load();
        let instance = PublishInstance::new("layoutMain", &["layout"]);
        let records = collect(&scene, &catalog, &scene.context, &instance).unwrap();

        assert_eq!(records.len(), 2);
        let chair = &records[0];
        assert_eq!(chair.product_type.as_deref(), Some("model"));
        assert_eq!(chair.instance_name, "chair_01");
        assert_eq!(chair.representation, "rep-chair");
        assert_eq!(chair.version, "ver-7");
        assert_eq!(chair.transform_matrix[3], [10.0, -20.0, 30.0, 1.0]);
        assert_eq!(chair.basis, BASIS);
        assert_eq!(records[1].product_type.as_deref(), Some("rig"));
    }

    #[test]
    fn grouped_assets_get_one_record_per_child() {
        let (scene, catalog) = load();
        let mut instance = PublishInstance::new("layoutGrouped", &["layout"]);
        instance.group_loaded_assets = true;
        let records = collect(&scene, &catalog, &scene.context, &instance).unwrap();

        // lamp_02 has no container, so only chair_02 is placed.
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].instance_name, "chair_02");
    }

    #[test]
    fn missing_project_container_writes_empty_document() {
        let mut scene = SceneSnapshot::from_json(SCENE).unwrap();
        scene.nodes.shift_remove("AVALON_CONTAINERS");
        let catalog = RepresentationCatalog::from_json(CATALOG).unwrap();
        let mut instance = PublishInstance::new("layoutMain", &["layout"]);
        let dir = tempfile::tempdir().unwrap();

        let artifact = extract(&scene, &catalog, &scene.context, &mut instance, dir.path()).unwrap();

        let written = fs::read_to_string(dir.path().join("layoutMain.json")).unwrap();
        assert_eq!(written, "[]");
        assert_eq!(artifact.files, vec!["layoutMain.json"]);
        assert_eq!(instance.representations, vec![artifact]);
    }

    #[test]
    fn writes_pretty_json() {
        let (scene, catalog) = load();
        let mut instance = PublishInstance::new("layoutMain", &["layout"]);
        let dir = tempfile::tempdir().unwrap();
        let staging = dir.path().join("staging");

        extract(&scene, &catalog, &scene.context, &mut instance, &staging).unwrap();

        let written = fs::read_to_string(staging.join("layoutMain.json")).unwrap();
        assert!(written.starts_with("[\n  {\n    \"product_type\": \"model\",\n"));
        let parsed: serde_json::Value = serde_json::from_str(&written).unwrap();
        assert_eq!(parsed[0]["basis"][1], serde_json::json!([0, 0, 1, 0]));
        assert_eq!(parsed[1]["transform_matrix"][1][1], serde_json::json!(1.0));
    }

    #[test]
    fn malformed_matrix_fails() {
        let json = SCENE.replace(
            r#""lamp_01:root": { "kind": "transform" }"#,
            r#""lamp_01:root": { "kind": "transform", "matrix": [1, 2, 3] }"#,
        );
        let scene = SceneSnapshot::from_json(&json).unwrap();
        let catalog = RepresentationCatalog::from_json(CATALOG).unwrap();
        let instance = PublishInstance::new("layoutMain", &["layout"]);

        let err = collect(&scene, &catalog, &scene.context, &instance).unwrap_err();
        assert_eq!(
            err.downcast_ref::<MatrixError>(),
            Some(&MatrixError::ElementCount { found: 3 })
        );
    }

    #[test]
    fn unknown_representation_fails() {
        let (scene, _) = load();
        let catalog = RepresentationCatalog::default();
        let instance = PublishInstance::new("layoutMain", &["layout"]);
        assert!(collect(&scene, &catalog, &scene.context, &instance).is_err());
    }
}
