use content_inspector::ContentType::BINARY;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Only the binary FBX format can be loaded. ASCII exports from Maya are rejected.
pub fn verify(path: &Path) -> anyhow::Result<bool> {
    let mut bytes = Vec::<u8>::new();
    File::open(path)?.read_to_end(&mut bytes)?;
    Ok(content_inspector::inspect(&bytes) == BINARY)
}
