//! Publish checks for Maya scenes headed to Unreal: model naming validation and layout export.

pub mod assets;
pub mod checks;
pub mod config;
pub mod extractors;
pub mod fbx_scene;
pub mod matrix;
pub mod publish;
pub mod scene;
mod utils;
