use anyhow::format_err;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductInfo {
    #[serde(rename = "type", default)]
    pub product_type: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RepresentationContext {
    #[serde(default)]
    pub product: Option<ProductInfo>,
    /// Older publishes only carry the family.
    #[serde(default)]
    pub family: Option<String>,
}

/// A published, versioned file record in the asset-management system.
#[derive(Debug, Clone, Deserialize)]
pub struct Representation {
    pub id: String,
    #[serde(rename = "versionId")]
    pub version_id: String,
    #[serde(default)]
    pub context: RepresentationContext,
}

impl Representation {
    pub fn product_type(&self) -> Option<&str> {
        self.context
            .product
            .as_ref()
            .and_then(|p| p.product_type.as_deref())
            .filter(|t| !t.is_empty())
            .or(self.context.family.as_deref())
    }
}

/// Resolves representation ids through the asset-management service.
pub trait AssetLookup {
    fn representation_by_id(&self, project: &str, id: &str) -> anyhow::Result<Representation>;
}

#[derive(Debug, Clone, Deserialize)]
struct CatalogEntry {
    #[serde(default)]
    project: Option<String>,
    #[serde(flatten)]
    representation: Representation,
}

/// Representations exported from the asset service to a JSON array. Entries without a
/// `project` resolve for any project.
#[derive(Debug, Clone, Default)]
pub struct RepresentationCatalog {
    entries: HashMap<String, Vec<CatalogEntry>>,
}

impl RepresentationCatalog {
    pub fn load(path: &Path) -> anyhow::Result<RepresentationCatalog> {
        let reader = BufReader::new(File::open(path)?);
        let entries: Vec<CatalogEntry> = serde_json::from_reader(reader)
            .map_err(|e| format_err!("Could not parse catalog {}: {}", path.display(), e))?;
        Ok(Self::from_entries(entries))
    }

    pub fn from_json(json: &str) -> anyhow::Result<RepresentationCatalog> {
        Ok(Self::from_entries(serde_json::from_str(json)?))
    }

    fn from_entries(entries: Vec<CatalogEntry>) -> RepresentationCatalog {
        let mut catalog = RepresentationCatalog::default();
        for entry in entries {
            catalog
                .entries
                .entry(entry.representation.id.clone())
                .or_insert_with(Vec::new)
                .push(entry);
        }
        catalog
    }
}

impl AssetLookup for RepresentationCatalog {
    fn representation_by_id(&self, project: &str, id: &str) -> anyhow::Result<Representation> {
        self.entries
            .get(id)
            .and_then(|entries| {
                entries
                    .iter()
                    .find(|e| e.project.as_deref().map_or(true, |p| p == project))
            })
            .map(|e| e.representation.clone())
            .ok_or_else(|| format_err!("Representation {} not found in project {}", id, project))
    }
}
