//! Staging of uploaded scripts on disk for the length of one run.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Context, Result};
use tracing::warn;

/// An uploaded file written under the staging directory; removed on drop.
#[derive(Debug)]
pub struct StagedScript {
    path: PathBuf,
}

impl StagedScript {
    /// Write `contents` to `<dir>/<file_name>`. Directory parts of the
    /// uploaded name are discarded.
    pub fn write(dir: &Path, file_name: &str, contents: &[u8]) -> Result<Self> {
        let name = Path::new(file_name)
            .file_name()
            .ok_or_else(|| anyhow!("invalid file name: {}", file_name))?;
        fs::create_dir_all(dir)
            .with_context(|| format!("creating staging dir {}", dir.display()))?;
        let path = dir.join(name);
        fs::write(&path, contents).with_context(|| format!("writing {}", path.display()))?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StagedScript {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            warn!("failed to remove staged file {}: {}", self.path.display(), e);
        }
    }
}
