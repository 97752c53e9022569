use crate::config::ShaderList;
use crate::publish::PublishValidationError;
use crate::scene::{short_name, SceneQuery};
use lazy_static::lazy_static;
use regex::Regex;

// Only anchored at the start, trailing text after the suffix is accepted.
lazy_static! {
    static ref MODEL_NAME: Regex =
        Regex::new(r"^[\da-zA-Z]+_(?P<shader>[\da-zA-Z]+)_(GEO|MESH)").unwrap();
}

pub const TITLE: &str = "Model names are invalid";

pub const DESCRIPTION: &str = "### Model content is invalid

Must match required naming convention:

- `AssetPart_IDmaterial_GEO`";

/// A transform is a group when it has children and all of them are transforms. When the children
/// can't be listed it is checked like a mesh.
fn is_group(scene: &impl SceneQuery, node: &str) -> bool {
    match scene.children(node) {
        Ok(children) if !children.is_empty() => children.iter().all(|c| scene.is_transform(c)),
        _ => false,
    }
}

/// Everything below the instance. An instance backed by an object set covers the descendants of
/// each set member, otherwise the instance names a node directly.
fn instance_descendants(scene: &impl SceneQuery, instance: &str) -> anyhow::Result<Vec<String>> {
    let members = match scene.set_members(instance) {
        Ok(members) => members,
        Err(_) => return scene.descendants(instance),
    };

    let mut out: Vec<String> = vec![];
    for member in members {
        for node in scene.descendants(&member)? {
            if !out.contains(&node) {
                out.push(node);
            }
        }
    }
    Ok(out)
}

/// Returns the short names of every mesh transform below `instance` that breaks the
/// `<Part>_<shader>_GEO` convention. When `shaders` is non-empty the shader part must be one of them.
pub fn get_invalid(
    scene: &impl SceneQuery,
    instance: &str,
    shaders: &ShaderList,
) -> anyhow::Result<Vec<String>> {
    let mut invalid: Vec<String> = vec![];

    let transforms = instance_descendants(scene, instance)?
        .into_iter()
        .filter(|n| !scene.is_intermediate(n))
        .filter(|n| scene.is_transform(n))
        .filter(|n| !is_group(scene, n));

    for node in transforms {
        let name = short_name(&node);
        let reason = match MODEL_NAME.captures(name) {
            None => Some(format!("invalid name on: {}", name)),
            Some(caps) => {
                let shader = &caps["shader"];
                if !shaders.is_empty() && !shaders.contains(shader) {
                    Some(format!("invalid materialID on: {} ({})", name, shader))
                } else {
                    None
                }
            }
        };

        if let Some(reason) = reason {
            log::error!("{}", reason);
            if !invalid.iter().any(|n| n == name) {
                invalid.push(name.to_owned());
            }
        }
    }

    Ok(invalid)
}

/// Fails with a single aggregate [`PublishValidationError`] when any model name in the instance
/// is invalid. Scene query failures come back as other errors.
pub fn verify(scene: &impl SceneQuery, instance: &str, shaders: &ShaderList) -> anyhow::Result<()> {
    let invalid = get_invalid(scene, instance, shaders)?;
    if invalid.is_empty() {
        return Ok(());
    }

    Err(PublishValidationError {
        title: TITLE.to_owned(),
        message: format!("{}.", TITLE),
        description: DESCRIPTION.to_owned(),
        invalid,
    }
    .into())
}
