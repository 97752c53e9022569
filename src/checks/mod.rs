pub mod is_fbx_binary;
pub mod model_names;
