use std::fs;
use std::path::{Path, PathBuf};

/// Location of the shader list, relative to the studio tools root.
pub const SHADER_LIST_PATH: &str = "hosts/Maya/presets/shaders/sh_simple_list.txt";

/// Env var the command line falls back to when no shader root is given.
pub const SHADER_ROOT_ENV: &str = "ACACIA";

#[derive(Debug, Clone, Default)]
pub struct ShaderListConfig {
    pub root: Option<PathBuf>,
}

impl ShaderListConfig {
    pub fn new(root: impl Into<PathBuf>) -> ShaderListConfig {
        ShaderListConfig {
            root: Some(root.into()),
        }
    }

    pub fn list_path(&self) -> Option<PathBuf> {
        self.root.as_ref().map(|r| r.join(SHADER_LIST_PATH))
    }

    /// Reads the allowed shader tokens. This hits the disk every call so edits to the list apply
    /// to the next run. A missing root or file gives an empty list, which disables the check.
    pub fn load(&self) -> ShaderList {
        let path = match self.list_path() {
            Some(p) => p,
            None => {
                log::warn!("No shader root configured, checking model names against the pattern only.");
                return ShaderList::default();
            }
        };
        match read_shader_list(&path) {
            Ok(list) => list,
            Err(e) => {
                log::debug!("Could not read shader list {}: {}", path.display(), e);
                ShaderList::default()
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShaderList(pub Vec<String>);

impl ShaderList {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, shader: &str) -> bool {
        self.0.iter().any(|s| s == shader)
    }
}

impl<S: Into<String>> FromIterator<S> for ShaderList {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        ShaderList(iter.into_iter().map(Into::into).collect())
    }
}

pub fn read_shader_list(path: &Path) -> anyhow::Result<ShaderList> {
    let text = fs::read_to_string(path)?;
    Ok(text.lines().map(str::trim_end).collect())
}
