//! Optional requirements manifest (`requirements.txt` style).

use std::{fs, io, path::Path};

use tracing::{info, warn};

/// Requirement lines of the manifest at `path`. A missing file is an empty manifest.
pub fn read_requirements(path: &Path) -> Vec<String> {
    match fs::read_to_string(path) {
        Ok(text) => parse_requirements(&text),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            info!("{} not found, no manifest requirements", path.display());
            Vec::new()
        }
        Err(e) => {
            warn!("cannot read manifest {}: {}", path.display(), e);
            Vec::new()
        }
    }
}

pub fn parse_requirements(text: &str) -> Vec<String> {
    text.lines()
        .map(|line| match line.find(" #") {
            Some(idx) => &line[..idx],
            None => line,
        })
        .map(str::trim)
        // Option lines such as `-r other.txt`, `-e .` or `--index-url`.
        .filter(|line| !line.is_empty() && !line.starts_with('#') && !line.starts_with('-'))
        .map(str::to_string)
        .collect()
}
