use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PublishContext {
    #[serde(default)]
    pub project_name: String,
}

/// One publish instance as collected from the scene. Its name is also the name of the object
/// set (or root node) holding its contents.
#[derive(Debug, Clone, Deserialize)]
pub struct PublishInstance {
    pub name: String,
    #[serde(default)]
    pub families: Vec<String>,
    #[serde(default = "default_active")]
    pub active: bool,
    /// Set members are groups of loaded assets, rather than the assets themselves.
    #[serde(default)]
    pub group_loaded_assets: bool,
    #[serde(skip)]
    pub representations: Vec<OutputArtifact>,
}

fn default_active() -> bool {
    true
}

impl PublishInstance {
    pub fn new(name: &str, families: &[&str]) -> PublishInstance {
        PublishInstance {
            name: name.to_owned(),
            families: families.iter().map(|f| f.to_string()).collect(),
            active: true,
            group_loaded_assets: false,
            representations: vec![],
        }
    }

    pub fn has_family(&self, family: &str) -> bool {
        self.families.iter().any(|f| f == family)
    }
}

/// A file produced by an extractor, handed back to the publishing framework.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputArtifact {
    pub name: String,
    pub ext: String,
    pub files: Vec<String>,
    pub staging_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{title}: {}", .invalid.join(", "))]
pub struct PublishValidationError {
    pub title: String,
    pub message: String,
    /// Markdown shown to the artist.
    pub description: String,
    /// Nodes that failed, so the caller can select them.
    pub invalid: Vec<String>,
}
